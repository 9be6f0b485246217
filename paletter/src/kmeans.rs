//! Provides the implementation for mini-batch k-means over sRGB samples
//!
//! Centroids are seeded with k-means++ on a random sample of the image
//! and then refined with random mini-batches,
//! each centroid moving towards the mean of its batch members with a learning rate of `1 / samples seen`.
//! Once the centroids settle, every sample is assigned to its nearest centroid
//! to get the final colors and weights.

use crate::{BarOrder, Error, Result};
use palette::Srgb;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// A color with components in `0.0..=1.0` used while fitting
type Color = Srgb<f32>;

/// Squared euclidean distance between two colors
fn squared_distance(x: Color, y: Color) -> f32 {
	let dr = x.red - y.red;
	let dg = x.green - y.green;
	let db = x.blue - y.blue;
	dr * dr + dg * dg + db * db
}

/// Parameters for mini-batch k-means
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmeansParams {
	/// Number of random samples drawn for each iteration
	///
	/// Images with at most this many pixels are processed whole every iteration.
	pub batch_size: u32,
	/// Maximum number of mini-batch iterations
	pub max_iter: u32,
	/// Stop once the centroids move less than this in total during one iteration
	///
	/// Distances are measured with color components in `0.0..=1.0`.
	pub convergence_threshold: f32,
}

impl Default for KmeansParams {
	fn default() -> Self {
		Self {
			batch_size: 1024,
			max_iter: 100,
			convergence_threshold: 0.001,
		}
	}
}

/// One color of a palette
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster {
	/// Mean color of the samples in this cluster
	pub centroid: Srgb<u8>,
	/// Fraction of all samples in this cluster
	pub weight: f64,
	/// Number of samples in this cluster
	pub count: u64,
}

/// The clusters found in a set of samples
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
	/// One entry per requested cluster, including empty ones
	clusters: Vec<Cluster>,
	/// Number of elapsed iterations
	iterations: u32,
	/// Sum of squared distances from each sample to its centroid
	variance: f64,
}

impl ClusterResult {
	/// Create a result from centroids and the number of samples assigned to each.
	///
	/// Weights are `count / total`, or `0.0` everywhere if there are no samples.
	#[must_use]
	pub fn from_counts(centroids: &[Srgb<u8>], counts: &[u64]) -> Self {
		debug_assert_eq!(centroids.len(), counts.len());
		let total = counts.iter().sum::<u64>();

		#[allow(clippy::cast_precision_loss)]
		let clusters = centroids
			.iter()
			.zip(counts)
			.map(|(&centroid, &count)| Cluster {
				centroid,
				weight: if total == 0 { 0.0 } else { count as f64 / total as f64 },
				count,
			})
			.collect();

		Self { clusters, iterations: 0, variance: 0.0 }
	}

	/// The clusters in the order they were produced
	#[must_use]
	pub fn clusters(&self) -> &[Cluster] {
		&self.clusters
	}

	/// Consume the result, returning its clusters
	#[must_use]
	pub fn into_clusters(self) -> Vec<Cluster> {
		self.clusters
	}

	/// Number of clusters, including empty ones
	#[must_use]
	pub fn len(&self) -> usize {
		self.clusters.len()
	}

	/// Whether there are no clusters
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.clusters.is_empty()
	}

	/// Number of mini-batch iterations run
	#[must_use]
	pub const fn iterations(&self) -> u32 {
		self.iterations
	}

	/// Sum of squared distances from each sample to its centroid (components in `0.0..=1.0`)
	///
	/// A lower variance indicates a better fit.
	#[must_use]
	pub const fn variance(&self) -> f64 {
		self.variance
	}

	/// Sort the clusters by descending weight, keeping the produced order for ties
	#[must_use]
	pub fn sorted_by_weight(mut self) -> Self {
		self.clusters.sort_by(|x, y| f64::total_cmp(&y.weight, &x.weight));
		self
	}

	/// Arrange the clusters in the given order
	#[must_use]
	pub fn ordered(self, order: BarOrder) -> Self {
		match order {
			BarOrder::Clusters => self,
			BarOrder::Weight => self.sorted_by_weight(),
		}
	}
}

/// Data for each center/centroid
struct CenterData {
	/// The centroid point
	centroid: Vec<Color>,
	/// Number of batch samples that have been assigned to this center so far
	seen: Vec<u64>,
}

impl CenterData {
	/// Create a [`CenterData`] with the given number of centers
	fn new(k: u8) -> Self {
		Self {
			centroid: Vec::with_capacity(usize::from(k)),
			seen: vec![0; usize::from(k)],
		}
	}
}

/// Per center totals for the current mini-batch
struct BatchData {
	/// Vector sum of the batch samples in each center
	sum: Vec<Srgb<f64>>,
	/// Number of batch samples in each center
	count: Vec<u32>,
}

impl BatchData {
	/// Create a [`BatchData`] with the given number of centers
	fn new(k: u8) -> Self {
		let k = usize::from(k);
		Self {
			sum: vec![Srgb::new(0.0, 0.0, 0.0); k],
			count: vec![0; k],
		}
	}

	/// Reset data for the next batch
	fn reset(&mut self) {
		self.sum.fill(Srgb::new(0.0, 0.0, 0.0));
		self.count.fill(0);
	}

	/// Add a sample to the given center
	fn add(&mut self, center: u8, color: Color) {
		let i = usize::from(center);
		let sum = &mut self.sum[i];
		sum.red += f64::from(color.red);
		sum.green += f64::from(color.green);
		sum.blue += f64::from(color.blue);
		self.count[i] += 1;
	}
}

/// Draw the samples used to choose the initial centroids
fn initial_samples(samples: &[Srgb<u8>], size: usize, rng: &mut impl Rng) -> Vec<Color> {
	if samples.len() <= size {
		samples.iter().map(|srgb| srgb.into_format()).collect()
	} else {
		(0..size)
			.map(|_| samples[rng.gen_range(0..samples.len())].into_format())
			.collect()
	}
}

/// Choose the starting centroids using the k-means++ algorithm
///
/// If there are fewer distinct colors than `k`, the remaining centroids repeat the ones already chosen.
fn kmeans_plus_plus(k: u8, rng: &mut impl Rng, colors: &[Color], centroids: &mut Vec<Color>) {
	use rand::{
		distributions::{WeightedError::*, WeightedIndex},
		prelude::Distribution,
	};

	let k = usize::from(k);
	let mut weights = vec![f32::INFINITY; colors.len()];

	// Pick any random first centroid
	centroids.push(colors[rng.gen_range(0..colors.len())]);

	// Pick each next centroid with a weighted probability based off the squared distance to its closest centroid
	for i in 1..k {
		let centroid = centroids[i - 1];
		for (weight, &color) in weights.iter_mut().zip(colors) {
			*weight = f32::min(*weight, squared_distance(color, centroid));
		}

		match WeightedIndex::new(&weights) {
			Ok(sampler) => centroids.push(colors[sampler.sample(rng)]),
			Err(AllWeightsZero) => break, // all points exactly match a centroid
			Err(InvalidWeight | NoItem | TooMany) => {
				unreachable!("distances are >= 0 and colors is not empty")
			},
		}
	}

	let distinct = centroids.len();
	for i in distinct..k {
		centroids.push(centroids[i % distinct]);
	}
}

/// For each pair of centers, update their distances and sort each center's row by increasing distance
///
/// Each entry holds one fourth of the squared distance between the two centers.
/// The sort is stable, so centers at the same distance stay in index order.
// i and j are < centroids.len() <= u8::MAX
#[allow(clippy::cast_possible_truncation)]
fn update_distances(centroids: &[Color], distances: &mut [(u8, f32)]) {
	let k = centroids.len();
	for i in 0..k {
		let ci = centroids[i];
		distances[i * k + i] = (i as u8, 0.0);
		for j in (i + 1)..k {
			let cj = centroids[j];
			let dist = squared_distance(ci, cj) / 4.0;
			distances[j * k + i] = (i as u8, dist);
			distances[i * k + j] = (j as u8, dist);
		}
	}

	for row in distances.chunks_exact_mut(k) {
		row.sort_by(|(_, x), (_, y)| f32::total_cmp(x, y));
	}
}

/// Find the center closest to `color`, starting the search from center `start`
///
/// Returns the center and the squared distance to it.
/// Centers that are more than twice as far from `start` as `color` is are skipped.
fn nearest(color: Color, start: u8, centroids: &[Color], distances: &[(u8, f32)]) -> (u8, f32) {
	let k = centroids.len();
	let ci = usize::from(start);
	let dist = squared_distance(color, centroids[ci]);

	let mut min_dist = dist;
	let mut min_center = start;
	for &(other_center, half_dist) in &distances[(ci * k + 1)..((ci + 1) * k)] {
		if dist < half_dist {
			break;
		}

		let other_dist = squared_distance(color, centroids[usize::from(other_center)]);
		if other_dist < min_dist {
			min_dist = other_dist;
			min_center = other_center;
		}
	}

	(min_center, min_dist)
}

/// Move each center towards the mean of its batch samples and return the total distance moved
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn update_centroids(centers: &mut CenterData, batch: &BatchData) -> f32 {
	let mut total_delta = 0.0;
	for (((centroid, seen), sum), &n) in centers
		.centroid
		.iter_mut()
		.zip(&mut centers.seen)
		.zip(&batch.sum)
		.zip(&batch.count)
	{
		if n == 0 {
			continue;
		}

		*seen += u64::from(n);
		let rate = f64::from(n) / *seen as f64;
		let n = f64::from(n);

		let old = *centroid;
		let step = |c: f32, sum: f64| (f64::from(c) + rate * (sum / n - f64::from(c))) as f32;
		*centroid = Srgb::new(
			step(old.red, sum.red),
			step(old.green, sum.green),
			step(old.blue, sum.blue),
		);

		total_delta += squared_distance(old, *centroid).sqrt();
	}

	total_delta
}

/// Run one iteration on a random mini-batch and return the total distance moved by the centers
fn minibatch_step(
	rng: &mut impl Rng,
	samples: &[Srgb<u8>],
	batch_size: usize,
	centers: &mut CenterData,
	distances: &[(u8, f32)],
	batch: &mut BatchData,
) -> f32 {
	batch.reset();
	for _ in 0..batch_size {
		let color = samples[rng.gen_range(0..samples.len())].into_format();
		let (center, _) = nearest(color, 0, &centers.centroid, distances);
		batch.add(center, color);
	}

	update_centroids(centers, batch)
}

/// Run one iteration over every sample and return the total distance moved by the centers
fn full_batch_step(
	samples: &[Srgb<u8>],
	centers: &mut CenterData,
	distances: &[(u8, f32)],
	batch: &mut BatchData,
) -> f32 {
	batch.reset();
	for srgb in samples {
		let color = srgb.into_format();
		let (center, _) = nearest(color, 0, &centers.centroid, distances);
		batch.add(center, color);
	}

	update_centroids(centers, batch)
}

/// Totals from assigning every sample to its nearest center
struct Tally {
	/// Channel sums of the samples in each center
	sum: Vec<[u64; 3]>,
	/// Number of samples in each center
	count: Vec<u64>,
	/// Sum of squared distances to the assigned centers
	variance: f64,
}

impl Tally {
	/// Create an empty [`Tally`] for `k` centers
	fn new(k: usize) -> Self {
		Self {
			sum: vec![[0; 3]; k],
			count: vec![0; k],
			variance: 0.0,
		}
	}

	/// Assign a sample, starting the search at `start`, and return its center
	fn add(&mut self, srgb: Srgb<u8>, start: u8, centroids: &[Color], distances: &[(u8, f32)]) -> u8 {
		let (center, dist) = nearest(srgb.into_format(), start, centroids, distances);
		let i = usize::from(center);
		let sum = &mut self.sum[i];
		sum[0] += u64::from(srgb.red);
		sum[1] += u64::from(srgb.green);
		sum[2] += u64::from(srgb.blue);
		self.count[i] += 1;
		self.variance += f64::from(dist);
		center
	}

	/// Combine two tallies
	fn merge(mut self, other: Self) -> Self {
		for (sum, other) in self.sum.iter_mut().zip(&other.sum) {
			for (x, y) in sum.iter_mut().zip(other) {
				*x += y;
			}
		}
		for (count, other) in self.count.iter_mut().zip(&other.count) {
			*count += other;
		}
		self.variance += other.variance;
		self
	}

	/// Turn the totals into the final clusters
	///
	/// Non-empty clusters use the exact mean of their samples, empty ones keep the fitted centroid.
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
	fn into_result(self, centroids: &[Color], iterations: u32) -> ClusterResult {
		let colors = self
			.sum
			.iter()
			.zip(&self.count)
			.zip(centroids)
			.map(|((sum, &n), centroid)| {
				if n == 0 {
					centroid.into_format()
				} else {
					let mean = |sum: u64| (sum as f64 / n as f64).round() as u8;
					Srgb::new(mean(sum[0]), mean(sum[1]), mean(sum[2]))
				}
			})
			.collect::<Vec<_>>();

		ClusterResult {
			iterations,
			variance: self.variance,
			..ClusterResult::from_counts(&colors, &self.count)
		}
	}
}

/// Assign every sample to its nearest center
///
/// Neighboring pixels tend to share a center, so each search starts from the previous sample's center.
#[cfg(not(feature = "threads"))]
fn assign_all(samples: &[Srgb<u8>], centroids: &[Color], distances: &[(u8, f32)]) -> Tally {
	let mut tally = Tally::new(centroids.len());
	let mut center = 0;
	for &srgb in samples {
		center = tally.add(srgb, center, centroids, distances);
	}
	tally
}

/// Assign every sample to its nearest center
///
/// Neighboring pixels tend to share a center, so each search starts from the previous sample's center.
#[cfg(feature = "threads")]
fn assign_all(samples: &[Srgb<u8>], centroids: &[Color], distances: &[(u8, f32)]) -> Tally {
	use rayon::prelude::*;

	let k = centroids.len();
	samples
		.par_iter()
		.with_min_len((samples.len() / rayon::current_num_threads()).max(1))
		.fold(
			|| (Tally::new(k), 0),
			|(mut tally, center), &srgb| {
				let center = tally.add(srgb, center, centroids, distances);
				(tally, center)
			},
		)
		.map(|(tally, _)| tally)
		.reduce(|| Tally::new(k), Tally::merge)
}

/// Cluster `samples` into exactly `k` colors using mini-batch k-means.
///
/// Every requested cluster is returned, so clusters may be empty (weight `0.0`)
/// when the samples have fewer than `k` distinct colors.
/// `k` is a `u8`, so at most 255 clusters can be requested.
///
/// # Errors
/// [`Error::EmptySamples`] if `samples` is empty
/// and [`Error::InvalidClusterCount`] if `k` is `0` or greater than the number of samples.
pub fn run(samples: &[Srgb<u8>], k: u8, params: &KmeansParams, seed: u64) -> Result<ClusterResult> {
	if samples.is_empty() {
		return Err(Error::EmptySamples);
	}

	if k == 0 || usize::from(k) > samples.len() {
		return Err(Error::InvalidClusterCount {
			requested: usize::from(k),
			samples: samples.len(),
		});
	}

	let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
	let batch_size = usize::try_from(params.batch_size).unwrap_or(usize::MAX).max(1);

	let mut centers = CenterData::new(k);
	let initial = initial_samples(samples, batch_size.saturating_mul(3).max(usize::from(k)), &mut rng);
	kmeans_plus_plus(k, &mut rng, &initial, &mut centers.centroid);
	drop(initial);

	let mut distances = vec![(0, 0.0); usize::from(k) * usize::from(k)];
	let mut batch = BatchData::new(k);

	let mut iterations = 0;
	let mut total_delta = f32::INFINITY;
	while iterations < params.max_iter && total_delta > params.convergence_threshold {
		update_distances(&centers.centroid, &mut distances);
		total_delta = if samples.len() <= batch_size {
			full_batch_step(samples, &mut centers, &distances, &mut batch)
		} else {
			minibatch_step(&mut rng, samples, batch_size, &mut centers, &distances, &mut batch)
		};
		iterations += 1;
	}

	update_distances(&centers.centroid, &mut distances);
	let result = assign_all(samples, &centers.centroid, &distances).into_result(&centers.centroid, iterations);

	tracing::debug!(
		"k-means found {} colors in {} iterations with variance {:.4}",
		k,
		result.iterations,
		result.variance
	);

	Ok(result)
}
