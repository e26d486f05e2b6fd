use std::path::Path;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::config::{ConfigError, PipelineConfig};
use super::result::{
    BatchReport, BoundaryPoints, DocumentReport, FailureReason, FitResult, GlyphStage, HullSummary, Verdict,
};
use super::summary::{BatchSummary, DocumentSummary};
use crate::document::{build_isolation, find_glyphs, Document, GlyphOccurrence, ShapeKind};
use crate::geometry::{convex_hull, fit_ellipse, fit_quality_on, silhouette};
use crate::raster::segment;
use crate::render::{RenderError, Renderer};
use crate::viewport::{Viewport, ViewportTransform};

/// Errors that stop a whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Config(ConfigError),
    /// The readiness probe failed; no glyph can be rendered.
    RendererUnavailable { renderer: String, source: RenderError },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{}", e),
            Self::RendererUnavailable { renderer, source } => {
                write!(f, "renderer '{}' is unavailable: {}", renderer, source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::RendererUnavailable { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Run the renderer's readiness probe once.
pub fn probe_renderer(renderer: &dyn Renderer) -> Result<(), PipelineError> {
    renderer
        .probe()
        .map_err(|source| PipelineError::RendererUnavailable {
            renderer: renderer.name().to_string(),
            source,
        })
}

/// Shared, read-only state for every glyph of one document.
struct GlyphContext<'a> {
    doc: &'a Document,
    viewport: &'a Viewport,
    transform: ViewportTransform,
    background: [u8; 3],
    cfg: &'a PipelineConfig,
    renderer: &'a dyn Renderer,
}

/// Isolate → render → segment → map → hull → fit → quality → accept.
///
/// Never panics on bad input; every failure ends as a `Failed` verdict.
fn process_glyph(ctx: &GlyphContext<'_>, occ: &GlyphOccurrence) -> FitResult {
    let mut res = FitResult::new(occ.clone(), ctx.transform.raster_size);
    let id = occ.id;

    if !occ.axis_aligned {
        tracing::warn!(
            glyph = id,
            ch = %occ.ch,
            "glyph is rotated or skewed; axis-aligned fit is approximate"
        );
        if ctx.cfg.reject_transformed {
            return res.fail(
                FailureReason::NotAxisAligned,
                "rotated or skewed glyphs are not supported",
            );
        }
    }

    let iso = match build_isolation(ctx.doc, occ, &ctx.cfg.isolation) {
        Ok(iso) => iso,
        Err(e) => {
            tracing::warn!(glyph = id, error = %e, "isolation failed");
            return res.fail(FailureReason::StructuralError, e.to_string());
        }
    };
    res.stage = GlyphStage::Isolated;
    tracing::debug!(glyph = id, ch = %occ.ch, sub_runs = iso.records.len(), "isolated");

    let raster = match ctx
        .renderer
        .render(&iso.to_svg_string(), ctx.transform.raster_size)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(glyph = id, error = %e, "render failed");
            return res.fail(FailureReason::RenderFailure, e.to_string());
        }
    };
    res.stage = GlyphStage::Rendered;

    // Map with the size actually produced so contours stay in document units.
    let actual = [raster.width(), raster.height()];
    let transform = if actual == ctx.transform.raster_size {
        ctx.transform
    } else {
        tracing::warn!(
            glyph = id,
            requested = ?ctx.transform.raster_size,
            actual = ?actual,
            "renderer returned a different raster size"
        );
        ViewportTransform::new(ctx.viewport, actual)
    };
    res.raster_size = actual;

    let seg = match segment(&raster, ctx.background, &ctx.cfg.segment) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(glyph = id, ch = %occ.ch, error = %e, "nothing visible after isolation");
            return res.fail(FailureReason::EmptyRaster, e.to_string());
        }
    };
    res.stage = GlyphStage::Segmented;
    res.foreground_px = Some(seg.foreground_px);
    res.contour_points = Some(seg.contour.len());
    tracing::debug!(
        glyph = id,
        threshold = seg.threshold,
        contour_points = seg.contour.len(),
        "segmented"
    );

    let contour: Vec<[f64; 2]> = seg.contour.iter().map(|&p| transform.to_doc(p)).collect();
    let hull = match convex_hull(&contour) {
        Ok(h) => h,
        Err(e) => return res.fail(FailureReason::DegenerateGeometry, e.to_string()),
    };
    res.hull = Some(HullSummary::from(&hull));

    let fit = match fit_ellipse(&contour, occ.shape, &ctx.cfg.fit) {
        Ok(f) => f,
        Err(e) => return res.fail(FailureReason::DegenerateGeometry, e.to_string()),
    };
    res.stage = GlyphStage::Fit;

    let boundary = match occ.shape {
        ShapeKind::Closed => None,
        ShapeKind::Open => {
            let px = transform.length_x_to_doc(1.0).max(transform.length_y_to_doc(1.0));
            Some(silhouette(&contour, &hull, ctx.cfg.silhouette_tol_px * px))
                .filter(|s| s.len() >= 3)
        }
    };
    res.boundary_points = Some(if boundary.is_some() {
        BoundaryPoints::Silhouette
    } else {
        BoundaryPoints::Contour
    });
    let boundary_points = boundary.as_deref().unwrap_or(&contour);
    let metrics = fit_quality_on(&contour, boundary_points, &hull, &fit.ellipse);
    let converged = fit.converged;
    res.fit = Some(fit);
    res.metrics = Some(metrics);

    if !converged {
        tracing::warn!(glyph = id, ch = %occ.ch, "ellipse fit did not converge");
        if ctx.cfg.reject_unconverged {
            return res.fail(
                FailureReason::FitDidNotConverge,
                "optimizer reached its iteration budget",
            );
        }
    }

    res.stage = GlyphStage::Validated;
    res.verdict = match ctx.cfg.acceptance.evaluate(&metrics, occ.shape) {
        None => Verdict::Accepted,
        Some(violation) => Verdict::Rejected { violation },
    };
    tracing::debug!(glyph = id, ch = %occ.ch, verdict = res.verdict.code(), "validated");
    res
}

fn build_pool(parallelism: usize) -> Option<ThreadPool> {
    if parallelism == 0 {
        return None;
    }
    match ThreadPoolBuilder::new().num_threads(parallelism).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(error = %e, "falling back to the global thread pool");
            None
        }
    }
}

fn process_document_in(
    name: &str,
    svg: &str,
    cfg: &PipelineConfig,
    renderer: &dyn Renderer,
    pool: Option<&ThreadPool>,
) -> DocumentReport {
    let background = match cfg.validate().and_then(|()| cfg.background_rgb()) {
        Ok(bg) => bg,
        Err(e) => return DocumentReport::failed(name, e),
    };
    let doc = match Document::parse(svg) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(document = name, error = %e, "unreadable document");
            return DocumentReport::failed(name, e);
        }
    };
    let viewport = match Viewport::from_document(&doc) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(document = name, error = %e, "unusable viewport");
            return DocumentReport::failed(name, e);
        }
    };
    let transform = ViewportTransform::from_zoom(&viewport, cfg.zoom);
    let occurrences = find_glyphs(&doc, &cfg.letters);
    tracing::debug!(
        document = name,
        glyphs = occurrences.len(),
        raster = ?transform.raster_size,
        "document parsed"
    );

    let ctx = GlyphContext {
        doc: &doc,
        viewport: &viewport,
        transform,
        background,
        cfg,
        renderer,
    };
    let run = || -> Vec<FitResult> {
        occurrences
            .par_iter()
            .map(|occ| process_glyph(&ctx, occ))
            .collect()
    };
    let results = match pool {
        Some(p) => p.install(run),
        None => run(),
    };

    let summary = DocumentSummary::from_results(&results);
    tracing::info!(
        document = name,
        glyphs = summary.total,
        accepted = summary.accepted,
        rejected = summary.rejected,
        failed = summary.failed,
        "document done"
    );
    DocumentReport {
        name: name.to_string(),
        viewport: Some(viewport),
        raster_size: Some(transform.raster_size),
        results,
        summary,
        error: None,
    }
}

/// Process one SVG document given as text.
pub fn process_document_str(
    name: &str,
    svg: &str,
    cfg: &PipelineConfig,
    renderer: &dyn Renderer,
) -> DocumentReport {
    let pool = build_pool(cfg.parallelism);
    process_document_in(name, svg, cfg, renderer, pool.as_ref())
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn process_path_in(
    path: &Path,
    cfg: &PipelineConfig,
    renderer: &dyn Renderer,
    pool: Option<&ThreadPool>,
) -> DocumentReport {
    let name = document_name(path);
    match std::fs::read_to_string(path) {
        Ok(svg) => process_document_in(&name, &svg, cfg, renderer, pool),
        Err(e) => {
            tracing::warn!(document = %path.display(), error = %e, "cannot read document");
            DocumentReport::failed(name, e)
        }
    }
}

/// Process one SVG file. A read failure yields a report with `error` set.
pub fn process_document_path(
    path: &Path,
    cfg: &PipelineConfig,
    renderer: &dyn Renderer,
) -> DocumentReport {
    let pool = build_pool(cfg.parallelism);
    process_path_in(path, cfg, renderer, pool.as_ref())
}

/// Process documents sequentially, each with its own parallel glyph fan-out.
pub fn process_batch<P: AsRef<Path>>(
    paths: &[P],
    cfg: &PipelineConfig,
    renderer: &dyn Renderer,
) -> BatchReport {
    let pool = build_pool(cfg.parallelism);
    let documents: Vec<DocumentReport> = paths
        .iter()
        .map(|p| process_path_in(p.as_ref(), cfg, renderer, pool.as_ref()))
        .collect();
    let summary = BatchSummary::from_reports(&documents);
    tracing::info!(
        documents = summary.documents,
        documents_failed = summary.documents_failed,
        glyphs = summary.glyphs.total,
        accepted = summary.glyphs.accepted,
        "batch done"
    );
    BatchReport { documents, summary }
}
