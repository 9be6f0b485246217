//! Specifies the CLI and handles arg parsing

use clap::{Parser, ValueEnum};
use paletter::{BarOrder, RenderOptions, MAX_COLORS, MIN_COLORS};
use std::{
	fmt::{Debug, Display},
	num::ParseIntError,
	ops::RangeBounds,
	path::PathBuf,
	str::FromStr,
};

/// Orders for the palette bars
#[derive(Copy, Clone, ValueEnum)]
pub enum SortOutput {
	/// The order k-means produced the colors in
	Clusters,
	/// Descending number of pixels
	Weight,
}

impl From<SortOutput> for BarOrder {
	fn from(sort: SortOutput) -> Self {
		match sort {
			SortOutput::Clusters => BarOrder::Clusters,
			SortOutput::Weight => BarOrder::Weight,
		}
	}
}

/// Render the dominant colors of an image as a PNG strip of colored bars.
///
/// The colors are found by mini-batch k-means clustering of the image's pixels.
#[derive(Parser)]
#[command(version)]
pub struct Options {
	/// The path to the input image
	pub image: PathBuf,

	/// Where to save the palette
	///
	/// Defaults to the input path followed by `_processed.png`.
	#[arg(short, long)]
	pub output: Option<PathBuf>,

	/// The number of colors in the palette
	#[arg(short = 'k', long, default_value_t = 5, value_parser = parse_valid_colors)]
	pub colors: u8,

	/// Make each bar as wide as its share of the image's pixels instead of using equal widths
	#[arg(short, long)]
	pub weighted: bool,

	/// The width of the palette in logical pixels
	#[arg(long, default_value_t = 300, value_parser = parse_positive)]
	pub width: u32,

	/// The height of the palette in logical pixels
	#[arg(long, default_value_t = 300, value_parser = parse_positive)]
	pub height: u32,

	/// The print density of the saved palette
	///
	/// One logical pixel is 1/100 of an inch,
	/// so the saved image is scaled by dpi / 100.
	#[arg(long, default_value_t = 1200, value_parser = parse_positive)]
	pub dpi: u32,

	/// The order to draw the bars in
	#[arg(short, long, default_value = "clusters")]
	pub sort: SortOutput,

	/// The number of random pixels used in each k-means iteration
	#[arg(long, default_value_t = 1024, value_parser = parse_positive)]
	pub batch_size: u32,

	/// The maximum number of k-means iterations
	#[arg(short = 'i', long, default_value_t = 100)]
	pub max_iter: u32,

	/// The seed value used for the random number generator
	#[arg(long, default_value_t = 0)]
	pub seed: u64,

	/// Print each color as a hexcode with its share of the image
	#[arg(short, long)]
	pub print: bool,

	/// The number of threads to use
	///
	/// A value of 0 uses one thread per logical core.
	#[cfg(feature = "threads")]
	#[arg(short = 't', long, default_value_t = 0)]
	pub threads: u8,

	/// Log more details, repeat for even more (-v, -vv, -vvv)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

impl Options {
	/// The library options described by these arguments
	pub fn render_options(&self) -> RenderOptions {
		RenderOptions {
			width: self.width,
			height: self.height,
			dpi: self.dpi,
			colors: self.colors,
			weighted: self.weighted,
			order: self.sort.into(),
			seed: self.seed,
		}
	}
}

/// Parse an integer value and ensure it is in the provided, valid range
fn parse_int_in_range<T>(s: &str, range: impl RangeBounds<T> + Debug) -> Result<T, String>
where
	T: FromStr<Err = ParseIntError> + Display + PartialOrd,
{
	let value: T = s.parse().map_err(|e| format!("{e}"))?;
	if range.contains(&value) {
		Ok(value)
	} else {
		Err(format!("{value} is not in {range:?}"))
	}
}

/// Parse the number of colors and ensure it is in `MIN_COLORS..=MAX_COLORS`
fn parse_valid_colors(s: &str) -> Result<u8, String> {
	parse_int_in_range(s, MIN_COLORS..=MAX_COLORS)
}

/// Parse a dimension and ensure it is not `0`
fn parse_positive(s: &str) -> Result<u32, String> {
	parse_int_in_range(s, 1..)
}
