//! Real text through the external rasterizer. Each test returns early when
//! `rsvg-convert` is not installed.

use image::RgbaImage;

use glyphfit::document::{build_isolation, find_glyphs, Document, IsolationConfig};
use glyphfit::{
    BoundaryPoints, CommandRenderer, GlyphFitter, GlyphStage, PipelineConfig, Renderer,
    RendererConfig, ShapeKind, Verdict, Viewport, ViewportTransform,
};

fn rsvg() -> Option<CommandRenderer> {
    let renderer = CommandRenderer::new(RendererConfig::default(), "#ffffff");
    match renderer.probe() {
        Ok(()) => Some(renderer),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

fn dark(img: &RgbaImage, x: u32, y: u32) -> bool {
    let p = img.get_pixel(x, y).0;
    let luma = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
    p[3] > 127 && luma < 128.0
}

#[test]
fn real_o_and_c_at_zoom_ten() {
    let Some(renderer) = rsvg() else { return };
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20">
  <text x="5" y="15" font-family="sans-serif" font-size="12" fill="#000000">O C</text>
</svg>"##;
    let fitter = GlyphFitter::new(PipelineConfig::default(), renderer).unwrap();
    let report = fitter.fit_document_str("oc.svg", svg);
    assert!(report.error.is_none(), "{:?}", report.error);
    assert_eq!(report.raster_size, Some([400, 200]));
    assert_eq!(report.results.len(), 2);

    let o = &report.results[0];
    assert_eq!(o.occurrence.ch, 'O');
    assert_eq!(o.verdict, Verdict::Accepted, "metrics {:?}", o.metrics);
    let m = o.metrics.unwrap();
    let e = o.fit.as_ref().unwrap().ellipse;
    assert!((e.semi_y / (0.5 * m.glyph_height) - 1.0).abs() < 0.05, "{:?} {:?}", e, m);
    // Cap height of a sans face at 12 units, mapped back from the raster.
    assert!(e.semi_y > 3.0 && e.semi_y < 5.5, "{:?}", e);
    let extent_px = 2.0 * e.semi_y * 10.0;
    assert!(extent_px > 60.0 && extent_px < 130.0, "{}", extent_px);

    // Real open glyphs sit near the center-offset limit, so only require a
    // sound fit here, not acceptance.
    let c = &report.results[1];
    assert_eq!(c.occurrence.ch, 'C');
    assert_eq!(c.occurrence.shape, ShapeKind::Open);
    assert_eq!(c.stage, GlyphStage::Validated, "{:?}", c.verdict);
    assert_eq!(c.boundary_points, Some(BoundaryPoints::Silhouette));
    let m = c.metrics.unwrap();
    let e = c.fit.as_ref().unwrap().ellipse;
    assert!(m.center_offset < 0.1, "{:?}", m);
    assert!((e.semi_y / (0.5 * m.glyph_height) - 1.0).abs() < 0.1, "{:?} {:?}", e, m);
    assert!(e.cx > o.fit.as_ref().unwrap().ellipse.cx);
}

#[test]
fn isolations_add_up_to_the_full_render() {
    let Some(renderer) = rsvg() else { return };
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="60" height="24" viewBox="0 0 60 24">
  <text x="4" y="16" font-family="sans-serif" font-size="12" fill="#000000">CO<tspan dx="1.5" dy="-2">OC</tspan></text>
</svg>"##;
    let doc = Document::parse(svg).unwrap();
    let vp = Viewport::from_document(&doc).unwrap();
    let size = ViewportTransform::from_zoom(&vp, 10.0).raster_size;
    let full = renderer.render(svg, size).unwrap();

    let occurrences = find_glyphs(&doc, "OC");
    assert_eq!(occurrences.len(), 4);
    let parts: Vec<RgbaImage> = occurrences
        .iter()
        .map(|occ| {
            let iso = build_isolation(&doc, occ, &IsolationConfig::default()).unwrap();
            renderer.render(&iso.to_svg_string(), size).unwrap()
        })
        .collect();

    let (mut ink, mut mismatched) = (0usize, 0usize);
    for y in 0..size[1] {
        for x in 0..size[0] {
            let a = dark(&full, x, y);
            let b = parts.iter().any(|p| dark(p, x, y));
            ink += a as usize;
            mismatched += (a != b) as usize;
        }
    }
    assert!(ink > 2000, "{}", ink);
    // Only anti-aliased edge pixels may flip across the threshold.
    assert!(mismatched * 100 < ink, "{} of {}", mismatched, ink);
}
