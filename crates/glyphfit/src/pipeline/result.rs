use serde::{Deserialize, Serialize};

use super::summary::{BatchSummary, DocumentSummary};
use crate::document::GlyphOccurrence;
use crate::geometry::{ConvexHull, EllipseFit, FitMetrics};
use crate::viewport::Viewport;

/// Last stage a glyph reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphStage {
    Discovered,
    Isolated,
    Rendered,
    Segmented,
    Fit,
    Validated,
}

/// Why a glyph ended in the `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The occurrence could not be located or split in its run.
    StructuralError,
    /// The renderer failed or returned unusable output.
    RenderFailure,
    /// The isolation rendered nothing visible.
    EmptyRaster,
    /// Too few distinct contour points for a hull or a fit.
    DegenerateGeometry,
    /// The optimizer hit its budget and unconverged fits are rejected.
    FitDidNotConverge,
    /// The glyph is rotated or skewed and such glyphs are rejected.
    NotAxisAligned,
}

impl FailureReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::StructuralError => "structural_error",
            Self::RenderFailure => "render_failure",
            Self::EmptyRaster => "empty_raster",
            Self::DegenerateGeometry => "degenerate_geometry",
            Self::FitDidNotConverge => "fit_did_not_converge",
            Self::NotAxisAligned => "not_axis_aligned",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Quality metrics subject to acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMetric {
    CenterOffset,
    MeanBoundary,
    MaxBoundary,
    HullCoverage,
    AspectRatio,
}

impl QualityMetric {
    pub const ALL: [QualityMetric; 5] = [
        Self::CenterOffset,
        Self::MeanBoundary,
        Self::MaxBoundary,
        Self::HullCoverage,
        Self::AspectRatio,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::CenterOffset => "center_offset",
            Self::MeanBoundary => "mean_boundary",
            Self::MaxBoundary => "max_boundary",
            Self::HullCoverage => "hull_coverage",
            Self::AspectRatio => "aspect_ratio",
        }
    }

    pub fn value(self, m: &FitMetrics) -> f64 {
        match self {
            Self::CenterOffset => m.center_offset,
            Self::MeanBoundary => m.mean_boundary,
            Self::MaxBoundary => m.max_boundary,
            Self::HullCoverage => m.hull_coverage,
            Self::AspectRatio => m.aspect_ratio,
        }
    }
}

/// A threshold the fit did not meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityViolation {
    pub metric: QualityMetric,
    pub observed: f64,
    /// The bound that was crossed.
    pub limit: f64,
}

/// Outcome of one glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected { violation: QualityViolation },
    Failed { reason: FailureReason, message: String },
}

impl Verdict {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Point set the boundary-distance metrics were measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPoints {
    /// Every contour point.
    Contour,
    /// Contour points on the hull boundary, skipping the inner edge of an
    /// open glyph.
    Silhouette,
}

/// Compact description of the contour hull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HullSummary {
    pub vertices: usize,
    pub area: f64,
    pub perimeter: f64,
}

impl From<&ConvexHull> for HullSummary {
    fn from(hull: &ConvexHull) -> Self {
        Self {
            vertices: hull.vertices.len(),
            area: hull.area(),
            perimeter: hull.perimeter(),
        }
    }
}

/// Everything recorded for one glyph occurrence.
///
/// Geometry (`fit`, `metrics`, `hull`, `nominal_center`) is in document user
/// units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub occurrence: GlyphOccurrence,
    pub stage: GlyphStage,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<EllipseFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FitMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull: Option<HullSummary>,
    /// Center of the nominal layout box.
    pub nominal_center: [f64; 2],
    /// Raster size the glyph was rendered at.
    pub raster_size: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_px: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour_points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_points: Option<BoundaryPoints>,
}

impl FitResult {
    pub(crate) fn new(occurrence: GlyphOccurrence, raster_size: [u32; 2]) -> Self {
        let nominal_center = occurrence.nominal_box.center();
        Self {
            occurrence,
            stage: GlyphStage::Discovered,
            verdict: Verdict::Failed {
                reason: FailureReason::StructuralError,
                message: "not processed".to_string(),
            },
            fit: None,
            metrics: None,
            hull: None,
            nominal_center,
            raster_size,
            foreground_px: None,
            contour_points: None,
            boundary_points: None,
        }
    }

    pub(crate) fn fail(mut self, reason: FailureReason, message: impl Into<String>) -> Self {
        self.verdict = Verdict::Failed {
            reason,
            message: message.into(),
        };
        self
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.verdict {
            Verdict::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn violation(&self) -> Option<&QualityViolation> {
        match &self.verdict {
            Verdict::Rejected { violation } => Some(violation),
            _ => None,
        }
    }
}

/// Results for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raster_size: Option<[u32; 2]>,
    pub results: Vec<FitResult>,
    pub summary: DocumentSummary,
    /// Set when the document could not be processed at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    /// Report for a document that failed before any glyph was processed.
    pub fn failed(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            viewport: None,
            raster_size: None,
            results: Vec::new(),
            summary: DocumentSummary::default(),
            error: Some(error.to_string()),
        }
    }
}

/// Results for a batch of documents, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub summary: BatchSummary,
}
