use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use glyphfit::document::{build_isolation, find_glyphs, Document, IsolationConfig};
use glyphfit::geometry::{convex_hull, fit_ellipse, fit_quality, AxisEllipse, FitConfig};
use glyphfit::raster::{segment, SegmentConfig};
use glyphfit::ShapeKind;

fn make_contour(n: usize, seed: u64) -> Vec<[f64; 2]> {
    let e = AxisEllipse::new(200.0, 150.0, 42.0, 48.0);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / n as f64;
            let [x, y] = e.point_at(t);
            [x + rng.gen_range(-0.4..0.4), y + rng.gen_range(-0.4..0.4)]
        })
        .collect()
}

/// White raster with a black elliptical ring; `gap` opens it on the right.
fn make_ring_raster(w: u32, h: u32, gap: bool) -> RgbaImage {
    let (cx, cy, a, b, t) = (w as f64 / 2.0, h as f64 / 2.0, 41.0, 45.0, 9.0);
    RgbaImage::from_fn(w, h, |x, y| {
        let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
        let outer = (dx / a).powi(2) + (dy / b).powi(2) <= 1.0;
        let inner = (dx / (a - t)).powi(2) + (dy / (b - t)).powi(2) < 1.0;
        let in_gap = gap && dy.atan2(dx).abs() < 0.6;
        if outer && !inner && !in_gap {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

fn bench_ellipse_fit(c: &mut Criterion) {
    let cfg = FitConfig::default();
    let closed = make_contour(360, 7);
    let open: Vec<[f64; 2]> = closed
        .iter()
        .copied()
        .filter(|p| (p[1] - 150.0).atan2(p[0] - 200.0).abs() > 0.6)
        .collect();

    c.bench_function("ellipse_fit_closed_360pts", |b| {
        b.iter(|| black_box(fit_ellipse(black_box(&closed), ShapeKind::Closed, &cfg).ok()))
    });
    c.bench_function("ellipse_fit_open_hull", |b| {
        b.iter(|| black_box(fit_ellipse(black_box(&open), ShapeKind::Open, &cfg).ok()))
    });

    let hull = convex_hull(&closed).expect("hull");
    let fit = AxisEllipse::new(200.0, 150.0, 42.0, 48.0);
    c.bench_function("fit_quality_360pts", |b| {
        b.iter(|| black_box(fit_quality(black_box(&closed), &hull, &fit)))
    });
}

fn bench_segment(c: &mut Criterion) {
    let cfg = SegmentConfig::default();
    let ring = make_ring_raster(400, 300, false);
    let open = make_ring_raster(400, 300, true);

    c.bench_function("segment_ring_400x300", |b| {
        b.iter(|| black_box(segment(black_box(&ring), [255, 255, 255], &cfg).ok()))
    });
    c.bench_function("segment_open_ring_400x300", |b| {
        b.iter(|| black_box(segment(black_box(&open), [255, 255, 255], &cfg).ok()))
    });
}

fn bench_isolation(c: &mut Criterion) {
    let mut svg = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">"#,
    );
    for row in 0..20 {
        svg.push_str(&format!(
            r#"<rect x="0" y="{}" width="400" height="10" fill="silver"/><text x="10" y="{}" font-size="12">CO<tspan dy="2">OC</tspan> flow {}</text>"#,
            row * 15,
            row * 15 + 12,
            row
        ));
    }
    svg.push_str("</svg>");
    let doc = Document::parse(&svg).expect("document");
    let occurrences = find_glyphs(&doc, "OC");
    let cfg = IsolationConfig::default();

    c.bench_function("isolation_80_glyphs", |b| {
        b.iter(|| {
            let n: usize = occurrences
                .iter()
                .filter_map(|o| build_isolation(&doc, o, &cfg).ok())
                .map(|iso| iso.to_svg_string().len())
                .sum();
            black_box(n)
        })
    });
}

criterion_group!(hotpaths, bench_ellipse_fit, bench_segment, bench_isolation);
criterion_main!(hotpaths);
