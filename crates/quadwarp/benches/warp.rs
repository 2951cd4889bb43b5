use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quadwarp::core::{
    calculate_preview_scale, compute_homography, make_preview, warp_image, warp_image_preview,
    Original, Point, Quad, RgbaImage, WarpParams,
};

fn photo(width: usize, height: usize) -> RgbaImage {
    let mut img = RgbaImage::new(width, height).expect("alloc");
    for y in 0..height {
        for x in 0..width {
            img.put_pixel(x, y, [(x % 251) as u8, (y % 241) as u8, ((x ^ y) & 0xff) as u8, 255]);
        }
    }
    img
}

fn tilted_quad(width: f64, height: f64) -> Quad {
    Quad::new(
        Point::new(0.10 * width, 0.10 * height),
        Point::new(0.90 * width, 0.12 * height),
        Point::new(0.88 * width, 0.90 * height),
        Point::new(0.12 * width, 0.88 * height),
    )
}

fn bench_homography(c: &mut Criterion) {
    let quad = tilted_quad(1000.0, 1000.0);
    let rect = Quad::<Original>::rect(780.0, 780.0);
    c.bench_function("homography_rect_to_quad", |b| {
        b.iter(|| compute_homography(black_box(&rect), black_box(&quad)))
    });
}

fn bench_warp(c: &mut Criterion) {
    let params = WarpParams::default();
    let mut group = c.benchmark_group("warp_image");
    group.sample_size(10);
    for side in [500usize, 1000, 2000] {
        let src = photo(side, side);
        let quad = tilted_quad(side as f64, side as f64);
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
            b.iter(|| warp_image(black_box(&src.view()), black_box(&quad), &params))
        });
    }
    group.finish();
}

fn bench_preview_warp(c: &mut Criterion) {
    let src = photo(3000, 2000);
    let scale = calculate_preview_scale(3000, 2000, 1000).expect("valid scale");
    let preview = make_preview(&src, &scale).expect("preview");
    let quad = scale.quad_to_preview(&tilted_quad(3000.0, 2000.0));
    let params = WarpParams::default();
    c.bench_function("warp_image_preview_1000", |b| {
        b.iter(|| warp_image_preview(black_box(&preview.view()), black_box(&quad), &params))
    });
}

criterion_group!(benches, bench_homography, bench_warp, bench_preview_warp);
criterion_main!(benches);
