use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use glyphfit::document::Document;
use glyphfit::geometry::{convex_hull, fit_ellipse, fit_quality, AxisEllipse, FitConfig, GeometryError};
use glyphfit::{ShapeKind, Viewport, ViewportTransform};

#[test]
fn viewport_round_trip_holds_inside_the_viewport() {
    let docs = [
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200"/>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200" viewBox="-50 25 600 400"/>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="64pt" height="10cm" viewBox="3 4 30 40" preserveAspectRatio="xMidYMax slice"/>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="80" height="20" viewBox="0 0 40 40" preserveAspectRatio="none"/>"#,
    ];
    let mut rng = StdRng::seed_from_u64(17);
    for svg in docs {
        let vp = Viewport::from_document(&Document::parse(svg).unwrap()).unwrap();
        for zoom in [1.0, 2.5, 10.0] {
            let t = ViewportTransform::from_zoom(&vp, zoom);
            let [vx, vy, vw, vh] = vp.view_box;
            for _ in 0..200 {
                let p = [vx + rng.gen::<f64>() * vw, vy + rng.gen::<f64>() * vh];
                let q = t.to_doc(t.to_pixels(p));
                assert_relative_eq!(q[0], p[0], epsilon = 1e-9 * (1.0 + vw));
                assert_relative_eq!(q[1], p[1], epsilon = 1e-9 * (1.0 + vh));
            }
        }
    }
}

#[test]
fn perfect_ellipse_is_recovered_and_scores_ideal() {
    let truth = AxisEllipse::new(31.5, -12.25, 4.1, 5.3);
    // Bunched sampling: denser near the top of the ellipse.
    let points: Vec<[f64; 2]> = (0..400)
        .map(|i| {
            let u = i as f64 / 400.0;
            truth.point_at(std::f64::consts::TAU * u * u)
        })
        .collect();
    let fit = fit_ellipse(&points, ShapeKind::Closed, &FitConfig::default()).unwrap();
    let e = fit.ellipse;
    assert_relative_eq!(e.cx, truth.cx, epsilon = 0.005 * truth.semi_y);
    assert_relative_eq!(e.cy, truth.cy, epsilon = 0.005 * truth.semi_y);
    assert_relative_eq!(e.semi_x, truth.semi_x, max_relative = 0.005);
    assert_relative_eq!(e.semi_y, truth.semi_y, max_relative = 0.005);

    let hull = convex_hull(&points).unwrap();
    let m = fit_quality(&points, &hull, &e);
    assert!(m.mean_boundary < 1e-3);
    assert!(m.max_boundary < 1e-2);
    assert!(m.hull_coverage > 0.99);
}

#[test]
fn three_points_fit_two_points_fail() {
    let three = [[0.0, 0.0], [4.0, 0.5], [1.0, 3.0]];
    let hull = convex_hull(&three).unwrap();
    assert_eq!(hull.vertices.len(), 3);
    let fit = fit_ellipse(&three, ShapeKind::Closed, &FitConfig::default()).unwrap();
    assert!(fit.ellipse.is_valid());

    let two = [[0.0, 0.0], [4.0, 0.5], [0.0, 0.0]];
    assert!(matches!(
        convex_hull(&two),
        Err(GeometryError::TooFewPoints { distinct: 2 })
    ));
    assert!(fit_ellipse(&two, ShapeKind::Open, &FitConfig::default()).is_err());

    let collinear = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
    assert!(matches!(
        convex_hull(&collinear),
        Err(GeometryError::Collinear { .. })
    ));
}

#[test]
fn hull_order_does_not_depend_on_input_order() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut points: Vec<[f64; 2]> = (0..300)
        .map(|_| [rng.gen_range(-10.0..10.0), rng.gen_range(-5.0..5.0)])
        .collect();
    let a = convex_hull(&points).unwrap();
    points.reverse();
    let b = convex_hull(&points).unwrap();
    assert_eq!(a, b);
    assert!(a.area() > 0.0);
}
