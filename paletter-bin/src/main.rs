//! Render the dominant colors of an image as a PNG strip of colored bars.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

mod cli;

use cli::Options;

use std::{
    fmt::{self, Display},
    path::Path,
    process::ExitCode,
};

use clap::Parser;
use colored::Colorize;
use paletter::{ClusterResult, KmeansBackend, KmeansParams, PaletteService};
use tracing_subscriber::{fmt as log_fmt, EnvFilter};

/// Error cases for a palette run
#[derive(Debug)]
enum RunError {
    /// Failed to start the worker threads
    #[cfg(feature = "threads")]
    ThreadPool(rayon::ThreadPoolBuildError),
    /// Failed to generate the palette
    Palette(paletter::Error),
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            #[cfg(feature = "threads")]
            RunError::ThreadPool(e) => write!(f, "Failed to start the thread pool: {e}"),
            RunError::Palette(e) => write!(f, "{e}"),
        }
    }
}

impl From<paletter::Error> for RunError {
    fn from(e: paletter::Error) -> Self {
        RunError::Palette(e)
    }
}

fn main() -> ExitCode {
    let options = Options::parse();

    init_logging(options.verbose);

    let result = run_generate(&options);

    // Returning Result<_> uses Debug printing instead of Display
    if let Err(e) = result {
        eprintln!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Send log messages to stderr, with more detail for each `-v`
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    log_fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds a thread pool and then runs `generate`
#[cfg(feature = "threads")]
fn run_generate(options: &Options) -> Result<(), RunError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(usize::from(options.threads))
        .build()
        .map_err(RunError::ThreadPool)?;

    pool.install(|| generate(options))
}

/// Runs `generate` on a single thread
#[cfg(not(feature = "threads"))]
fn run_generate(options: &Options) -> Result<(), RunError> {
    generate(options)
}

/// Generate and save the palette of the input image, then print it if asked to
fn generate(options: &Options) -> Result<(), RunError> {
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| paletter::default_output_path(&options.image));

    let params = KmeansParams {
        batch_size: options.batch_size,
        max_iter: options.max_iter,
        ..KmeansParams::default()
    };
    let service = PaletteService::with_backends(paletter::ImageFileSource, KmeansBackend::new(params));

    let palette = service.generate_palette(&options.image, &output, &options.render_options())?;
    tracing::info!("saved palette to {}", output.display());

    if options.print {
        print_palette(&palette, &output);
    }

    Ok(())
}

/// Print each color as a swatch followed by its hexcode and share of the image
fn print_palette(palette: &ClusterResult, output: &Path) {
    println!("{}", output.display());
    for line in palette_lines(palette) {
        println!("{line}");
    }
}

/// One line per cluster, in drawing order
fn palette_lines(palette: &ClusterResult) -> Vec<String> {
    palette
        .clusters()
        .iter()
        .map(|cluster| {
            let color = cluster.centroid;
            format!(
                "{} {color:X} {:>5.1}%",
                "   ".on_truecolor(color.red, color.green, color.blue),
                cluster.weight * 100.0
            )
        })
        .collect()
}
