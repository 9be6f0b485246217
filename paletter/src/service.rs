//! Wiring loading, clustering, and rendering into one call

use crate::{kmeans, render, ClusterResult, ImageFileSource, KmeansParams, PixelSource, RenderOptions, Result};
use image::RgbImage;
use palette::Srgb;
use std::{
	path::{Path, PathBuf},
	time::Instant,
};

/// Clusters samples into colors and draws them
///
/// Only [`PaletteBackend::cluster`] is required,
/// drawing and saving default to the bar renderer in [`render`].
pub trait PaletteBackend {
	/// Cluster `samples` into exactly `k` colors with their weights.
	///
	/// # Errors
	/// [`Error::EmptySamples`](crate::Error::EmptySamples) or
	/// [`Error::InvalidClusterCount`](crate::Error::InvalidClusterCount).
	fn cluster(&self, samples: &[Srgb<u8>], k: u8, seed: u64) -> Result<ClusterResult>;

	/// Draw the clusters as a strip of bars.
	///
	/// # Errors
	/// See [`render::render`].
	fn render(&self, result: &ClusterResult, width: u32, height: u32, weighted: bool) -> Result<RgbImage> {
		render::render(result, width, height, weighted)
	}

	/// Save a drawn palette at the given density.
	///
	/// # Errors
	/// See [`render::save`].
	fn save(&self, image: &RgbImage, dpi: u32, path: &Path) -> Result<()> {
		render::save(image, dpi, path)
	}
}

/// Mini-batch k-means with the bar renderer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KmeansBackend {
	/// Parameters for every clustering run
	pub params: KmeansParams,
}

impl KmeansBackend {
	/// Create a backend with the given k-means parameters
	#[must_use]
	pub const fn new(params: KmeansParams) -> Self {
		Self { params }
	}
}

impl PaletteBackend for KmeansBackend {
	fn cluster(&self, samples: &[Srgb<u8>], k: u8, seed: u64) -> Result<ClusterResult> {
		kmeans::run(samples, k, &self.params, seed)
	}
}

/// Generates palette images from image files.
///
/// The service keeps no state between calls,
/// so one instance can serve concurrent calls from multiple threads.
#[derive(Debug, Clone, Default)]
pub struct PaletteService<S = ImageFileSource, B = KmeansBackend> {
	/// Loads the input image
	source: S,
	/// Clusters and draws the palette
	backend: B,
}

impl PaletteService {
	/// A service that loads images with the `image` crate and clusters with mini-batch k-means
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

impl<S: PixelSource, B: PaletteBackend> PaletteService<S, B> {
	/// A service using the given stages
	pub const fn with_backends(source: S, backend: B) -> Self {
		Self { source, backend }
	}

	/// Render the palette of the image at `input` and save it as PNG at `output`.
	///
	/// # Errors
	/// Any error from validating `options` or from the loading, clustering, rendering, or saving stage.
	/// Nothing is written to `output` unless every earlier stage succeeded.
	pub fn generate(&self, input: impl AsRef<Path>, output: impl AsRef<Path>, options: &RenderOptions) -> Result<()> {
		self.generate_palette(input, output, options).map(drop)
	}

	/// Same as [`PaletteService::generate`], but also returns the clusters in the order they were drawn.
	///
	/// # Errors
	/// See [`PaletteService::generate`].
	pub fn generate_palette(
		&self,
		input: impl AsRef<Path>,
		output: impl AsRef<Path>,
		options: &RenderOptions,
	) -> Result<ClusterResult> {
		let (input, output) = (input.as_ref(), output.as_ref());
		options.validate()?;

		let start = Instant::now();

		let samples = time!("Image loading", self.source.load(input))?;
		let result = time!("Clustering", self.backend.cluster(&samples, options.colors, options.seed))?;
		drop(samples);

		let result = result.ordered(options.order);
		let image = time!(
			"Rendering",
			self.backend.render(&result, options.width, options.height, options.weighted)
		)?;
		time!("Saving", self.backend.save(&image, options.dpi, output))?;

		tracing::info!(
			"generated {} color palette for {} in {}ms",
			result.len(),
			input.display(),
			start.elapsed().as_millis()
		);

		Ok(result)
	}
}

/// The output path used when none is given: the input path followed by `_processed.png`
#[must_use]
pub fn default_output_path(input: impl AsRef<Path>) -> PathBuf {
	let mut path = input.as_ref().as_os_str().to_owned();
	path.push("_processed.png");
	PathBuf::from(path)
}
