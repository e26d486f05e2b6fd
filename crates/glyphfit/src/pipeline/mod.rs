//! Glyph fitting pipeline.
//!
//! This module wires the stages together per glyph:
//! discover -> isolate -> render -> segment -> map to document -> hull/fit ->
//! quality -> accept/reject.
//!
//! Algorithmic primitives live in `crate::document`, `crate::raster`,
//! `crate::geometry` and `crate::viewport`. The pipeline layer owns stage
//! boundaries, failure tagging, acceptance policy and aggregation.
//!
//! Entry points:
//! - `process_document_str`: one document given as text
//! - `process_document_path`: one document read from disk
//! - `process_batch`: several documents, one report each plus a batch summary
//! - `probe_renderer`: the one-time readiness check that is fatal on failure

mod config;
mod result;
mod run;
mod summary;

pub use config::{AcceptancePolicy, ConfigError, PipelineConfig};
pub use result::{
    BatchReport, BoundaryPoints, DocumentReport, FailureReason, FitResult, GlyphStage, HullSummary, QualityMetric,
    QualityViolation, Verdict,
};
pub use run::{
    probe_renderer, process_batch, process_document_path, process_document_str, PipelineError,
};
pub use summary::{BatchSummary, DocumentSummary, MetricDistribution};
