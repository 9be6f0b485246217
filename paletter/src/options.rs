//! Caller supplied configuration for generating a palette

use crate::{Error, Result};
use std::{fmt, str::FromStr};

/// Smallest number of colors a palette is generated with
pub const MIN_COLORS: u8 = 2;

/// Largest number of colors a palette is generated with
pub const MAX_COLORS: u8 = 7;

/// The order the bars are drawn in, from left to right
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BarOrder {
	/// The order the clusters were produced in
	#[default]
	Clusters,
	/// Descending weight, ties keep their cluster order
	Weight,
}

/// How the width of each bar is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bars {
	/// Every bar has the same width
	#[default]
	Uniform,
	/// Each bar is as wide as its share of the image's pixels
	Weighted,
}

impl Bars {
	/// Whether bar widths follow cluster weights
	#[must_use]
	pub const fn is_weighted(self) -> bool {
		matches!(self, Self::Weighted)
	}
}

impl From<bool> for Bars {
	fn from(weighted: bool) -> Self {
		if weighted {
			Self::Weighted
		} else {
			Self::Uniform
		}
	}
}

impl FromStr for Bars {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let s = s.trim();
		if s.eq_ignore_ascii_case("uniform") {
			Ok(Self::Uniform)
		} else if s.eq_ignore_ascii_case("weighted") {
			Ok(Self::Weighted)
		} else {
			Err(Error::UnknownBars(s.to_owned()))
		}
	}
}

impl fmt::Display for Bars {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::Uniform => "Uniform",
			Self::Weighted => "Weighted",
		})
	}
}

/// Parse a number of colors and ensure it is in `MIN_COLORS..=MAX_COLORS`
///
/// # Errors
/// [`Error::InvalidColors`] if `s` is not a number
/// and [`Error::ColorsOutOfRange`] if it is outside of the supported range.
pub fn parse_colors(s: &str) -> Result<u8> {
	let s = s.trim();
	let colors = s.parse::<u8>().map_err(|_| Error::InvalidColors(s.to_owned()))?;
	check_colors(colors)?;
	Ok(colors)
}

/// Ensure `colors` is in `MIN_COLORS..=MAX_COLORS`
fn check_colors(colors: u8) -> Result<()> {
	if (MIN_COLORS..=MAX_COLORS).contains(&colors) {
		Ok(())
	} else {
		Err(Error::ColorsOutOfRange { colors, min: MIN_COLORS, max: MAX_COLORS })
	}
}

/// Options for a single palette generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
	/// Logical width of the palette in pixels
	pub width: u32,
	/// Logical height of the palette in pixels
	pub height: u32,
	/// Print density of the saved image
	pub dpi: u32,
	/// Number of colors (bars) in the palette
	pub colors: u8,
	/// Whether bar widths follow cluster weights
	pub weighted: bool,
	/// The order the bars are drawn in
	pub order: BarOrder,
	/// Seed for the clustering random number generator
	pub seed: u64,
}

impl Default for RenderOptions {
	/// `300x300` pixels at `1200` dpi with `5` uniform bars.
	///
	/// The saved image is `3600x3600`, which is accepted by common photo sharing services.
	fn default() -> Self {
		Self {
			width: 300,
			height: 300,
			dpi: 1200,
			colors: 5,
			weighted: false,
			order: BarOrder::Clusters,
			seed: 0,
		}
	}
}

impl RenderOptions {
	/// Options with the given bar style and number of colors, leaving everything else at the default
	#[must_use]
	pub fn with_settings(bars: Bars, colors: u8) -> Self {
		Self {
			colors,
			weighted: bars.is_weighted(),
			..Self::default()
		}
	}

	/// The bar style these options describe
	#[must_use]
	pub fn bars(&self) -> Bars {
		Bars::from(self.weighted)
	}

	/// Check the options before any work is done.
	///
	/// # Errors
	/// [`Error::ColorsOutOfRange`], [`Error::InvalidDimensions`], or [`Error::InvalidDpi`].
	pub fn validate(&self) -> Result<()> {
		check_colors(self.colors)?;

		if self.width == 0 || self.height == 0 {
			return Err(Error::InvalidDimensions { width: self.width, height: self.height });
		}

		if self.dpi == 0 {
			return Err(Error::InvalidDpi);
		}

		Ok(())
	}
}
