//! Drawing clusters as a strip of colored bars and saving it as PNG

use crate::{ClusterResult, Error, Result};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, Rgb, RgbImage};
use palette::Srgb;
use std::{
	borrow::Cow,
	fs::{self, File},
	io::Write,
	ops::Range,
	path::Path,
};

/// The density of one logical palette pixel, in dots per inch
pub const REFERENCE_DPI: u32 = 100;

/// The pixel drawn for a centroid
fn to_rgb(color: Srgb<u8>) -> Rgb<u8> {
	Rgb([color.red, color.green, color.blue])
}

/// Horizontal pixel ranges of each bar, in cluster order.
///
/// Uniform bars split `width` into equal parts with the last bar ending at `width`.
/// Weighted bars start where the previous bar ended and are `weight * width` wide,
/// rounded to the nearest pixel and clamped to `width`.
#[must_use]
pub fn bar_bounds(result: &ClusterResult, width: u32, weighted: bool) -> Vec<Range<u32>> {
	let k = result.len();
	let mut bounds = Vec::with_capacity(k);

	if weighted {
		let width = f64::from(width);
		let mut start = 0.0;
		let mut pixel_start = 0;
		for cluster in result.clusters() {
			let end = f64::min(start + cluster.weight * width, width);

			// end is in 0.0..=width
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			let pixel_end = (end.round() as u32).max(pixel_start);

			bounds.push(pixel_start..pixel_end);
			start = end;
			pixel_start = pixel_end;
		}
	} else {
		// k is small and width is a u32, so the products fit in a u64
		let k = k as u64;
		let width_u64 = u64::from(width);
		#[allow(clippy::cast_possible_truncation)]
		let boundary = |i: u64| (i * width_u64 / k) as u32;
		for i in 0..k {
			let end = if i + 1 == k { width } else { boundary(i + 1) };
			bounds.push(boundary(i)..end);
		}
	}

	bounds
}

/// Draw the clusters as a `width` by `height` strip of solid bars.
///
/// # Errors
/// [`Error::InvalidDimensions`] if `width` or `height` is `0`
/// and [`Error::EmptyPalette`] if there are no clusters.
pub fn render(result: &ClusterResult, width: u32, height: u32, weighted: bool) -> Result<RgbImage> {
	if width == 0 || height == 0 {
		return Err(Error::InvalidDimensions { width, height });
	}

	if result.is_empty() {
		return Err(Error::EmptyPalette);
	}

	// Color of each pixel column, then repeated for every row
	let mut columns = vec![Rgb([0, 0, 0]); width as usize];
	for (cluster, bounds) in result.clusters().iter().zip(bar_bounds(result, width, weighted)) {
		columns[bounds.start as usize..bounds.end as usize].fill(to_rgb(cluster.centroid));
	}

	Ok(RgbImage::from_fn(width, height, |x, _| columns[x as usize]))
}

/// Pixel dimensions of a logical `width` by `height` image saved at `dpi`
///
/// # Errors
/// [`Error::InvalidDpi`] if `dpi` is `0` and [`Error::ScaleOverflow`] if a scaled side does not fit in a `u32`.
pub fn scaled_dimensions(width: u32, height: u32, dpi: u32) -> Result<(u32, u32)> {
	if dpi == 0 {
		return Err(Error::InvalidDpi);
	}

	let scale = |side: u32| {
		let scaled = (u64::from(side) * u64::from(dpi) + u64::from(REFERENCE_DPI / 2)) / u64::from(REFERENCE_DPI);
		u32::try_from(scaled.max(1)).map_err(|_| Error::ScaleOverflow { width, height, dpi })
	};

	Ok((scale(width)?, scale(height)?))
}

/// Resize with nearest neighbor sampling so that no colors are blended at bar edges
///
/// `imageops::resize` with `FilterType::Nearest` can still mix two source pixels on half-pixel ties.
#[allow(clippy::cast_possible_truncation)]
fn scale_nearest(image: &RgbImage, width: u32, height: u32) -> RgbImage {
	let (src_width, src_height) = image.dimensions();
	// Each quotient is < src_width or src_height
	let src = |dst: u32, dst_len: u32, src_len: u32| (u64::from(dst) * u64::from(src_len) / u64::from(dst_len)) as u32;
	RgbImage::from_fn(width, height, |x, y| {
		*image.get_pixel(src(x, width, src_width), src(y, height, src_height))
	})
}

/// Save a rendered palette as PNG, scaled by `dpi / REFERENCE_DPI`.
///
/// The image is encoded in memory before anything is written,
/// and a partially written file is removed if writing fails.
/// A file that cannot be opened for writing is never removed.
///
/// # Errors
/// [`Error::InvalidDpi`], [`Error::ScaleOverflow`], [`Error::Encode`], or [`Error::Write`].
pub fn save(image: &RgbImage, dpi: u32, path: &Path) -> Result<()> {
	let (width, height) = scaled_dimensions(image.width(), image.height(), dpi)?;

	let scaled = if (width, height) == image.dimensions() {
		Cow::Borrowed(image)
	} else {
		Cow::Owned(scale_nearest(image, width, height))
	};

	let mut png = Vec::new();
	PngEncoder::new(&mut png)
		.write_image(scaled.as_raw(), width, height, ColorType::Rgb8)
		.map_err(Error::Encode)?;

	// An existing file is left untouched if it cannot be opened
	let mut file = File::create(path).map_err(|source| Error::Write { path: path.to_owned(), source })?;

	if let Err(source) = file.write_all(&png) {
		drop(file);
		// Nothing useful can be done if the partial file cannot be removed either
		let _ = fs::remove_file(path);
		return Err(Error::Write { path: path.to_owned(), source });
	}

	tracing::debug!("saved {}x{} palette to {}", width, height, path.display());

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ErrorKind;

	fn palette_of(counts: &[u64]) -> ClusterResult {
		#[allow(clippy::cast_possible_truncation)]
		let colors = (0..counts.len())
			.map(|i| Srgb::new(i as u8 * 40, 255 - i as u8 * 40, 7))
			.collect::<Vec<_>>();
		ClusterResult::from_counts(&colors, counts)
	}

	fn widths(bounds: &[Range<u32>]) -> Vec<u32> {
		bounds.iter().map(|b| b.end - b.start).collect()
	}

	#[test]
	fn uniform_bars_split_width_evenly() {
		let bounds = bar_bounds(&palette_of(&[5, 1, 1, 9, 3]), 300, false);
		assert_eq!(bounds, vec![0..60, 60..120, 120..180, 180..240, 240..300]);
	}

	#[test]
	fn uniform_bars_tile_width_with_remainder() {
		let bounds = bar_bounds(&palette_of(&[1; 7]), 100, false);
		assert_eq!(bounds.first().map(|b| b.start), Some(0));
		assert_eq!(bounds.last().map(|b| b.end), Some(100));
		for pair in bounds.windows(2) {
			assert_eq!(pair[0].end, pair[1].start);
		}
		assert_eq!(widths(&bounds).iter().sum::<u32>(), 100);
	}

	#[test]
	fn weighted_bars_follow_weights() {
		let bounds = bar_bounds(&palette_of(&[50, 50]), 300, true);
		for width in widths(&bounds) {
			assert!((148..=152).contains(&width));
		}

		let bounds = bar_bounds(&palette_of(&[1, 2, 1]), 200, true);
		assert_eq!(bounds, vec![0..50, 50..150, 150..200]);
	}

	#[test]
	fn weighted_bars_stay_in_bounds() {
		let bounds = bar_bounds(&palette_of(&[1, 1, 1]), 100, true);
		assert_eq!(bounds.last().map(|b| b.end), Some(100));
		assert_eq!(widths(&bounds).iter().sum::<u32>(), 100);
	}

	#[test]
	fn empty_clusters_have_no_weighted_width() {
		let result = palette_of(&[3, 0, 1]);

		let weighted = bar_bounds(&result, 80, true);
		assert_eq!(widths(&weighted), vec![60, 0, 20]);

		let uniform = bar_bounds(&result, 90, false);
		assert_eq!(widths(&uniform), vec![30, 30, 30]);
	}

	#[test]
	fn render_fills_bars_with_centroids() {
		let result = palette_of(&[1, 3]);
		let image = render(&result, 40, 3, true).expect("valid dimensions");

		assert_eq!(image.dimensions(), (40, 3));
		let first = to_rgb(result.clusters()[0].centroid);
		let second = to_rgb(result.clusters()[1].centroid);
		for y in 0..3 {
			assert_eq!(*image.get_pixel(0, y), first);
			assert_eq!(*image.get_pixel(9, y), first);
			assert_eq!(*image.get_pixel(10, y), second);
			assert_eq!(*image.get_pixel(39, y), second);
		}
	}

	#[test]
	fn render_rejects_empty_dimensions() {
		let result = palette_of(&[1]);
		assert!(matches!(render(&result, 0, 10, false), Err(Error::InvalidDimensions { width: 0, height: 10 })));
		assert!(matches!(render(&result, 10, 0, true), Err(Error::InvalidDimensions { .. })));
		assert!(matches!(render(&palette_of(&[]), 10, 10, false), Err(Error::EmptyPalette)));
	}

	#[test]
	fn scaled_dimensions_follow_dpi() {
		assert_eq!(scaled_dimensions(300, 300, 1200).ok(), Some((3600, 3600)));
		assert_eq!(scaled_dimensions(300, 150, 100).ok(), Some((300, 150)));
		assert_eq!(scaled_dimensions(30, 10, 50).ok(), Some((15, 5)));
		assert_eq!(scaled_dimensions(1, 1, 1).ok(), Some((1, 1)));
		assert!(matches!(scaled_dimensions(1, 1, 0), Err(Error::InvalidDpi)));
		assert!(matches!(scaled_dimensions(u32::MAX, 1, 200), Err(Error::ScaleOverflow { .. })));
	}

	#[test]
	fn save_round_trips_scaled_image() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("palette.png");

		let result = palette_of(&[1, 1, 1, 1, 1]);
		let image = render(&result, 50, 10, false).expect("valid dimensions");
		save(&image, 200, &path).expect("saved palette");

		let decoded = image::open(&path).expect("decoded palette").into_rgb8();
		assert_eq!(decoded.dimensions(), (100, 20));

		// Each 10 pixel bar becomes 20 pixels wide
		for (i, cluster) in result.clusters().iter().enumerate() {
			#[allow(clippy::cast_possible_truncation)]
			let x = i as u32 * 20;
			let color = to_rgb(cluster.centroid);
			assert_eq!(*decoded.get_pixel(x, 0), color);
			assert_eq!(*decoded.get_pixel(x + 19, 19), color);
		}
	}

	#[test]
	fn save_to_missing_directory_fails_without_output() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("missing").join("palette.png");

		let image = render(&palette_of(&[1, 1]), 10, 10, false).expect("valid dimensions");
		let err = save(&image, 100, &path).expect_err("directory does not exist");

		assert_eq!(err.kind(), ErrorKind::Render);
		assert!(!path.exists());
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn save_over_busy_file_keeps_it() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("busy");
		fs::copy("/bin/sleep", &path).expect("copied executable");

		// A running executable cannot be opened for writing
		let mut child = std::process::Command::new(&path).arg("5").spawn().expect("started executable");

		let image = render(&palette_of(&[1, 1]), 10, 10, false).expect("valid dimensions");
		let result = save(&image, 100, &path);

		child.kill().expect("stopped executable");
		child.wait().expect("reaped executable");

		let err = result.expect_err("file is busy");
		assert!(matches!(err, Error::Write { .. }));
		assert!(path.exists());
		assert_eq!(fs::metadata(&path).map(|m| m.len()).ok(), fs::metadata("/bin/sleep").map(|m| m.len()).ok());
	}

	#[test]
	fn save_replaces_existing_file() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("palette.png");
		fs::write(&path, b"old palette").expect("wrote old file");

		let image = render(&palette_of(&[1, 1]), 10, 4, false).expect("valid dimensions");
		save(&image, 100, &path).expect("saved palette");

		let decoded = image::open(&path).expect("decoded palette").into_rgb8();
		assert_eq!(decoded, image);
	}
}
