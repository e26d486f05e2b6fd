use serde::{Deserialize, Serialize};

use super::result::{QualityMetric, QualityViolation};
use crate::document::{parse_color, IsolationConfig, ShapeKind};
use crate::geometry::{FitConfig, FitMetrics};
use crate::raster::SegmentConfig;
use crate::render::RendererConfig;

/// Thresholds a fit must meet to be accepted.
///
/// Upper bounds are exclusive, the coverage floor is exclusive, and aspect
/// ranges (vertical over horizontal semi-axis) are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptancePolicy {
    pub max_center_offset: f64,
    pub max_mean_boundary: f64,
    pub max_max_boundary: f64,
    pub min_hull_coverage: f64,
    /// `[min, max]` aspect ratio for closed glyphs.
    pub closed_aspect: [f64; 2],
    /// `[min, max]` aspect ratio for open glyphs.
    pub open_aspect: [f64; 2],
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            max_center_offset: 0.05,
            max_mean_boundary: 0.05,
            max_max_boundary: 0.15,
            min_hull_coverage: 0.85,
            closed_aspect: [0.95, 1.4],
            open_aspect: [0.95, 1.6],
        }
    }
}

impl AcceptancePolicy {
    /// Aspect range for `shape`.
    pub fn aspect_range(&self, shape: ShapeKind) -> [f64; 2] {
        match shape {
            ShapeKind::Closed => self.closed_aspect,
            ShapeKind::Open => self.open_aspect,
        }
    }

    /// First violated threshold, checked in the order center offset, mean
    /// boundary, max boundary, hull coverage, aspect ratio. NaN fails every
    /// check.
    pub fn evaluate(&self, m: &FitMetrics, shape: ShapeKind) -> Option<QualityViolation> {
        let below = |metric, observed: f64, limit: f64| {
            (!(observed < limit)).then_some(QualityViolation {
                metric,
                observed,
                limit,
            })
        };
        if let Some(v) = below(QualityMetric::CenterOffset, m.center_offset, self.max_center_offset)
            .or_else(|| below(QualityMetric::MeanBoundary, m.mean_boundary, self.max_mean_boundary))
            .or_else(|| below(QualityMetric::MaxBoundary, m.max_boundary, self.max_max_boundary))
        {
            return Some(v);
        }
        if !(m.hull_coverage > self.min_hull_coverage) {
            return Some(QualityViolation {
                metric: QualityMetric::HullCoverage,
                observed: m.hull_coverage,
                limit: self.min_hull_coverage,
            });
        }
        let [lo, hi] = self.aspect_range(shape);
        let a = m.aspect_ratio;
        if !(a >= lo && a <= hi) {
            return Some(QualityViolation {
                metric: QualityMetric::AspectRatio,
                observed: a,
                limit: if a < lo { lo } else { hi },
            });
        }
        None
    }
}

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target characters.
    pub letters: String,
    /// Raster pixels per document user unit.
    pub zoom: f64,
    /// Worker threads for the per-glyph fan-out; 0 uses rayon's default.
    pub parallelism: usize,
    /// Turn unconverged fits into `fit_did_not_converge` failures instead of
    /// evaluating them.
    pub reject_unconverged: bool,
    /// Fail rotated or skewed glyphs up front instead of fitting them with
    /// an axis-aligned model.
    pub reject_transformed: bool,
    /// Distance from the hull (raster pixels) within which contour points of
    /// open glyphs count as silhouette.
    pub silhouette_tol_px: f64,
    pub isolation: IsolationConfig,
    pub segment: SegmentConfig,
    pub fit: FitConfig,
    pub acceptance: AcceptancePolicy,
    pub renderer: RendererConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            letters: "OC".to_string(),
            zoom: 10.0,
            parallelism: 0,
            reject_unconverged: false,
            reject_transformed: false,
            silhouette_tol_px: 1.5,
            isolation: IsolationConfig::default(),
            segment: SegmentConfig::default(),
            fit: FitConfig::default(),
            acceptance: AcceptancePolicy::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Background colour as RGB.
    pub fn background_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_color(&self.isolation.background).ok_or_else(|| {
            ConfigError(format!(
                "unsupported background colour '{}'",
                self.isolation.background
            ))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.letters.trim().is_empty() {
            return Err(ConfigError("no target letters".to_string()));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(ConfigError(format!("zoom must be positive, got {}", self.zoom)));
        }
        if !(self.silhouette_tol_px.is_finite() && self.silhouette_tol_px >= 0.0) {
            return Err(ConfigError(format!(
                "silhouette tolerance must be non-negative, got {}",
                self.silhouette_tol_px
            )));
        }
        self.background_rgb()?;
        Ok(())
    }
}
