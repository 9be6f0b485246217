//! Loading image files into color samples

use crate::{Error, Result};
use palette::Srgb;
use std::path::Path;

/// Something that turns an image file into one color sample per pixel
pub trait PixelSource {
	/// Load the file at `path` as a row-major list of [`Srgb<u8>`] samples.
	///
	/// # Errors
	/// [`Error::ImageLoad`] if the file cannot be read or decoded.
	fn load(&self, path: &Path) -> Result<Vec<Srgb<u8>>>;
}

/// Loads any format supported by the enabled `image` codecs (JPEG and PNG are always available)
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileSource;

impl PixelSource for ImageFileSource {
	fn load(&self, path: &Path) -> Result<Vec<Srgb<u8>>> {
		let image = image::open(path).map_err(|source| Error::ImageLoad { path: path.to_owned(), source })?;

		// Drops alpha and converts grayscale or 16 bit images to 8 bit RGB
		let rgb = image.into_rgb8();
		tracing::debug!("loaded {}x{} image from {}", rgb.width(), rgb.height(), path.display());

		Ok(palette::cast::from_component_slice(rgb.as_raw()).to_vec())
	}
}
