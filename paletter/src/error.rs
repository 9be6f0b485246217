//! Error type shared by every stage of the pipeline

use std::{io, path::PathBuf};
use thiserror::Error;

/// Result type used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;

/// The pipeline stage an [`Error`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The input image could not be read or decoded
	ImageLoad,
	/// The requested number of clusters cannot be computed from the samples
	Clustering,
	/// The palette could not be drawn or written
	Render,
	/// A textual setting could not be parsed
	Config,
}

/// Errors returned by the palette pipeline
#[derive(Debug, Error)]
pub enum Error {
	/// The input file is missing, unreadable, or not a decodable image
	#[error("failed to load image {}: {source}", path.display())]
	ImageLoad {
		/// Path of the input image
		path: PathBuf,
		/// Underlying decoding or I/O error
		#[source]
		source: image::ImageError,
	},

	/// There are no samples to cluster
	#[error("cannot cluster an empty set of samples")]
	EmptySamples,

	/// `k` is zero or larger than the number of samples
	#[error("invalid cluster count: requested {requested}, but only {samples} samples are available")]
	InvalidClusterCount {
		/// Requested number of clusters
		requested: usize,
		/// Number of available samples
		samples: usize,
	},

	/// The number of palette colors is outside of the supported range
	#[error("palette colors must be in {min}..={max}, got {colors}")]
	ColorsOutOfRange {
		/// Requested number of colors
		colors: u8,
		/// Smallest supported number of colors
		min: u8,
		/// Largest supported number of colors
		max: u8,
	},

	/// Width or height of the palette is zero
	#[error("palette dimensions must be non-zero, got {width}x{height}")]
	InvalidDimensions {
		/// Requested width
		width: u32,
		/// Requested height
		height: u32,
	},

	/// The print density is zero
	#[error("dpi must be non-zero")]
	InvalidDpi,

	/// Scaling the palette to the requested density overflows the image dimensions
	#[error("palette of {width}x{height} cannot be scaled to {dpi} dpi")]
	ScaleOverflow {
		/// Logical width
		width: u32,
		/// Logical height
		height: u32,
		/// Requested density
		dpi: u32,
	},

	/// There are no clusters to draw
	#[error("cannot render a palette without colors")]
	EmptyPalette,

	/// The palette could not be encoded as PNG
	#[error("failed to encode palette: {0}")]
	Encode(#[source] image::ImageError),

	/// The output file could not be written
	#[error("failed to write palette to {}: {source}", path.display())]
	Write {
		/// Path of the output file
		path: PathBuf,
		/// Underlying I/O error
		#[source]
		source: io::Error,
	},

	/// A bar style other than `Uniform` or `Weighted`
	#[error("unknown bar style {0:?}, expected Uniform or Weighted")]
	UnknownBars(String),

	/// A color count that is not a number
	#[error("invalid number of colors {0:?}")]
	InvalidColors(String),
}

impl Error {
	/// The pipeline stage this error originated from
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		use Error::*;

		match self {
			ImageLoad { .. } => ErrorKind::ImageLoad,
			EmptySamples | InvalidClusterCount { .. } | ColorsOutOfRange { .. } => ErrorKind::Clustering,
			InvalidDimensions { .. } | InvalidDpi | ScaleOverflow { .. } | EmptyPalette | Encode(_) | Write { .. } => {
				ErrorKind::Render
			},
			UnknownBars(_) | InvalidColors(_) => ErrorKind::Config,
		}
	}
}
