//! glyphfit: locate "O" and "C" glyphs in SVG diagrams and fit axis-aligned
//! ellipses to their rendered shape.
//!
//! The pipeline stages are:
//!
//! 1. **Document** – parse the SVG, resolve text runs and per-character
//!    positions, discover target occurrences.
//! 2. **Isolation** – per occurrence, a document copy in which only that
//!    character is painted; its run is split into one `tspan` per character
//!    without moving any glyph.
//! 3. **Render** – an external rasterizer turns the copy into pixels.
//! 4. **Raster** – Otsu threshold, closing, largest component, outer contour.
//! 5. **Viewport** – exact pixel ↔ document mapping.
//! 6. **Geometry** – convex hull, geometric least-squares axis-aligned
//!    ellipse, fit-quality metrics.
//! 7. **Pipeline** – per-glyph state machine, acceptance policy, summaries.
//!
//! # Public API
//! - [`GlyphFitter`] as the primary entry point
//! - [`PipelineConfig`] and its nested configs for tuning
//! - the [`Renderer`] trait for plugging in a rasterizer
//! - result and summary structures, all serde-serializable

pub mod api;
pub mod document;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod viewport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::GlyphFitter;
pub use document::{GlyphOccurrence, IsolationConfig, ShapeKind};
pub use geometry::{AxisEllipse, EllipseFit, FitConfig, FitMetrics};
pub use pipeline::{
    AcceptancePolicy, BatchReport, BatchSummary, BoundaryPoints, DocumentReport, DocumentSummary,
    FailureReason, FitResult, GlyphStage, PipelineConfig, PipelineError, QualityMetric, Verdict,
};
pub use raster::SegmentConfig;
pub use render::{CommandRenderer, RenderError, Renderer, RendererConfig};
pub use viewport::{Viewport, ViewportTransform};
