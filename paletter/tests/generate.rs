use image::{codecs::jpeg::JpegEncoder, ImageBuffer, Rgb, RgbImage};
use paletter::{Bars, ErrorKind, PaletteService, RenderOptions, Srgb};
use std::path::Path;

fn halves(width: u32, height: u32) -> RgbImage {
	ImageBuffer::from_fn(width, height, |x, _| {
		if x < width / 2 {
			Rgb([255, 0, 0])
		} else {
			Rgb([0, 0, 255])
		}
	})
}

fn small_options(bars: Bars, colors: u8) -> RenderOptions {
	RenderOptions {
		width: 300,
		height: 20,
		dpi: 100,
		..RenderOptions::with_settings(bars, colors)
	}
}

fn decode(path: &Path) -> RgbImage {
	image::open(path).expect("decoded palette").into_rgb8()
}

#[test]
fn weighted_halves_give_two_even_bars() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("halves.png");
	let output = dir.path().join("halves_processed.png");
	halves(64, 32).save(&input).expect("saved input");

	let palette = PaletteService::new()
		.generate_palette(&input, &output, &small_options(Bars::Weighted, 2))
		.expect("generated palette");

	let mut colors = palette.clusters().iter().map(|c| c.centroid).collect::<Vec<_>>();
	colors.sort_by_key(|c| c.blue);
	assert_eq!(colors, vec![Srgb::new(255, 0, 0), Srgb::new(0, 0, 255)]);

	let image = decode(&output);
	assert_eq!(image.dimensions(), (300, 20));

	// Count the columns of the first bar's color
	let first = image.get_pixel(0, 0);
	let first_width = (0..300).take_while(|&x| image.get_pixel(x, 10) == first).count();
	assert!((148..=152).contains(&first_width), "first bar is {first_width}px wide");
	assert_ne!(image.get_pixel(299, 19), first);
}

#[test]
fn uniform_bars_have_equal_widths() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("gradient.png");
	let output = dir.path().join("gradient_processed.png");

	let gradient: RgbImage = ImageBuffer::from_fn(50, 50, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 128]));
	gradient.save(&input).expect("saved input");

	let palette = PaletteService::new()
		.generate_palette(&input, &output, &small_options(Bars::Uniform, 5))
		.expect("generated palette");
	assert_eq!(palette.len(), 5);

	let image = decode(&output);
	for (i, cluster) in palette.clusters().iter().enumerate() {
		let start = i as u32 * 60;
		let color = Rgb([cluster.centroid.red, cluster.centroid.green, cluster.centroid.blue]);
		assert_eq!(*image.get_pixel(start, 0), color);
		assert_eq!(*image.get_pixel(start + 59, 19), color);
	}
}

#[test]
fn more_colors_than_present_still_succeeds() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("flat.png");
	let output = dir.path().join("flat_processed.png");
	ImageBuffer::from_pixel(16, 16, Rgb([20u8, 140, 60])).save(&input).expect("saved input");

	let palette = PaletteService::new()
		.generate_palette(&input, &output, &small_options(Bars::Weighted, 7))
		.expect("generated palette");

	assert_eq!(palette.len(), 7);
	let nonempty = palette.clusters().iter().filter(|c| c.count > 0).collect::<Vec<_>>();
	assert_eq!(nonempty.len(), 1);
	assert_eq!(nonempty[0].centroid, Srgb::new(20, 140, 60));
	assert!((nonempty[0].weight - 1.0).abs() < 1e-12);

	// Only the single color is visible
	let image = decode(&output);
	assert!(image.pixels().all(|p| *p == Rgb([20, 140, 60])));
}

#[test]
fn jpeg_input_is_supported() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("photo.jpg");
	let output = dir.path().join("photo.jpg_processed.png");

	let image = halves(32, 32);
	let mut file = std::fs::File::create(&input).expect("created input");
	JpegEncoder::new_with_quality(&mut file, 95).encode_image(&image).expect("encoded jpeg");
	drop(file);

	PaletteService::new()
		.generate(&input, &output, &small_options(Bars::Uniform, 2))
		.expect("generated palette");

	assert_eq!(decode(&output).dimensions(), (300, 20));
}

#[test]
fn dpi_scales_saved_image() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("halves.png");
	let output = dir.path().join("halves_processed.png");
	halves(8, 8).save(&input).expect("saved input");

	let options = RenderOptions {
		width: 30,
		height: 10,
		dpi: 300,
		colors: 2,
		..RenderOptions::default()
	};
	PaletteService::new().generate(&input, &output, &options).expect("generated palette");

	assert_eq!(decode(&output).dimensions(), (90, 30));
}

#[test]
fn missing_input_is_an_image_load_error() {
	let dir = tempfile::tempdir().expect("temp dir");
	let output = dir.path().join("out.png");

	let err = PaletteService::new()
		.generate(dir.path().join("nope.jpg"), &output, &RenderOptions::default())
		.expect_err("missing input");

	assert_eq!(err.kind(), ErrorKind::ImageLoad);
	assert!(!output.exists());
}

#[test]
fn concurrent_calls_are_independent() {
	let dir = tempfile::tempdir().expect("temp dir");
	let input = dir.path().join("halves.png");
	halves(40, 40).save(&input).expect("saved input");

	let service = PaletteService::new();
	std::thread::scope(|scope| {
		for i in 0..4 {
			let (service, input, dir) = (&service, &input, dir.path());
			scope.spawn(move || {
				let output = dir.join(format!("out{i}.png"));
				service
					.generate(input, &output, &small_options(Bars::Weighted, 2))
					.expect("generated palette");
				assert_eq!(decode(&output).dimensions(), (300, 20));
			});
		}
	});
}
