//! Extract the dominant colors of an image and render them as a palette strip.
//!
//! The pipeline has three stages, each behind a small trait so that alternative backends can be swapped in:
//!
//! 1. a [`PixelSource`] loads an image file into a flat list of [`Srgb<u8>`] samples,
//! 2. a [`PaletteBackend`] clusters the samples into `k` colors with their weights
//!    and draws them as a strip of colored bars,
//! 3. the bars are saved as a PNG whose pixel size honors the requested print density.
//!
//! [`PaletteService`] wires the stages together.
//!
//! # Examples
//!
//! ## Generate a palette with the default options.
//!
//! ```no_run
//! use paletter::{PaletteService, RenderOptions};
//!
//! let service = PaletteService::new();
//! service.generate("photo.jpg", "photo.jpg_processed.png", &RenderOptions::default())?;
//! # Ok::<(), paletter::Error>(())
//! ```
//!
//! ## Weighted bars, 3 colors, sorted by weight.
//!
//! ```no_run
//! use paletter::{BarOrder, PaletteService, RenderOptions};
//!
//! let options = RenderOptions {
//! 	colors: 3,
//! 	weighted: true,
//! 	order: BarOrder::Weight,
//! 	..RenderOptions::default()
//! };
//!
//! let palette = PaletteService::new().generate_palette("photo.jpg", "palette.png", &options)?;
//! for cluster in palette.clusters() {
//! 	println!("{:X} {:.1}%", cluster.centroid, cluster.weight * 100.0);
//! }
//! # Ok::<(), paletter::Error>(())
//! ```
//!
//! ## Run the stages by hand.
//!
//! ```no_run
//! use paletter::{kmeans, render, ImageFileSource, KmeansParams, PixelSource};
//! use std::path::Path;
//!
//! let samples = ImageFileSource.load(Path::new("photo.png"))?;
//! let result = kmeans::run(&samples, 5, &KmeansParams::default(), 42)?;
//! let bars = render::render(&result, 300, 50, true)?;
//! render::save(&bars, 300, Path::new("bars.png"))?;
//! # Ok::<(), paletter::Error>(())
//! ```
//!
//! # Arguments
//!
//! ## Colors
//!
//! The number of bars in the palette, i.e. the `k` of k-means.
//! [`PaletteService`] accepts `2..=7` colors, the range the palette is designed to display.
//! [`kmeans::run`] itself accepts any `k` between `1` and the number of samples.
//!
//! If the image has fewer distinct colors than `k`,
//! the surplus clusters duplicate an existing color and end up with a weight of `0.0`.
//!
//! ## Weighted
//!
//! With uniform bars every color gets the same width.
//! With weighted bars each color's width is proportional to the fraction of pixels assigned to it,
//! so zero weight clusters disappear from the strip.
//!
//! ## DPI
//!
//! One logical pixel is drawn at 100 dots per inch.
//! The saved PNG is scaled by `dpi / 100`, so the default `300x300` palette at `1200` dpi is saved as `3600x3600`.
//!
//! ## Seed
//!
//! The value used to seed the random number generator used to pick initial centroids and mini-batches.
//! The same seed on the same image gives the same palette.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::unreadable_literal)]

pub use palette::Srgb;

/// Run an expression, logging how long it took at the debug level
macro_rules! time {
	($name: literal, $func_call: expr) => {{
		let start = std::time::Instant::now();
		let result = $func_call;
		tracing::debug!("{} took {}ms", $name, start.elapsed().as_millis());
		result
	}};
}

mod error;
pub mod kmeans;
mod options;
mod pixels;
pub mod render;
mod service;

pub use error::{Error, ErrorKind, Result};
pub use kmeans::{Cluster, ClusterResult, KmeansParams};
pub use options::{parse_colors, BarOrder, Bars, RenderOptions, MAX_COLORS, MIN_COLORS};
pub use pixels::{ImageFileSource, PixelSource};
pub use service::{default_output_path, KmeansBackend, PaletteBackend, PaletteService};
