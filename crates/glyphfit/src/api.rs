//! High-level fitting API.
//!
//! [`GlyphFitter`] is the primary entry point. It owns a [`PipelineConfig`]
//! and a [`Renderer`] whose readiness was checked once at construction, and
//! provides convenience methods for single documents and batches.

use std::path::Path;

use crate::document::{find_glyphs, Document, DocumentError, GlyphOccurrence};
use crate::pipeline::{self, BatchReport, DocumentReport, PipelineConfig, PipelineError};
use crate::render::{CommandRenderer, Renderer};

/// Primary fitting interface.
///
/// Create once, fit many documents.
///
/// # Examples
///
/// ```no_run
/// use glyphfit::{GlyphFitter, PipelineConfig};
///
/// let fitter = GlyphFitter::with_command_renderer(PipelineConfig::default()).unwrap();
/// let report = fitter.fit_document_path(std::path::Path::new("diagram.svg"));
/// println!("{} of {} glyphs accepted", report.summary.accepted, report.summary.total);
/// ```
pub struct GlyphFitter {
    config: PipelineConfig,
    renderer: Box<dyn Renderer>,
}

impl GlyphFitter {
    /// Validate `config` and probe `renderer`; either failure is fatal.
    pub fn new(config: PipelineConfig, renderer: impl Renderer + 'static) -> Result<Self, PipelineError> {
        config.validate()?;
        pipeline::probe_renderer(&renderer)?;
        Ok(Self {
            config,
            renderer: Box::new(renderer),
        })
    }

    /// Use the external renderer described by `config.renderer`, drawing on
    /// the isolation background colour.
    pub fn with_command_renderer(config: PipelineConfig) -> Result<Self, PipelineError> {
        let renderer = CommandRenderer::new(config.renderer.clone(), config.isolation.background.clone());
        Self::new(config, renderer)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mutable access for tuning between runs. Settings are re-validated by
    /// every document run.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Target occurrences in `svg` without rendering anything.
    pub fn discover(&self, svg: &str) -> Result<Vec<GlyphOccurrence>, DocumentError> {
        let doc = Document::parse(svg)?;
        Ok(find_glyphs(&doc, &self.config.letters))
    }

    pub fn fit_document_str(&self, name: &str, svg: &str) -> DocumentReport {
        pipeline::process_document_str(name, svg, &self.config, self.renderer.as_ref())
    }

    pub fn fit_document_path(&self, path: &Path) -> DocumentReport {
        pipeline::process_document_path(path, &self.config, self.renderer.as_ref())
    }

    pub fn fit_batch<P: AsRef<Path>>(&self, paths: &[P]) -> BatchReport {
        pipeline::process_batch(paths, &self.config, self.renderer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Verdict;
    use crate::test_utils::{single_glyph_svg, BrokenRenderer, SyntheticRenderer};

    #[test]
    fn unavailable_renderer_is_fatal() {
        let err = GlyphFitter::new(PipelineConfig::default(), BrokenRenderer).err().unwrap();
        assert!(matches!(err, PipelineError::RendererUnavailable { .. }));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let cfg = PipelineConfig {
            zoom: -1.0,
            ..PipelineConfig::default()
        };
        let err = GlyphFitter::new(cfg, SyntheticRenderer::default()).err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn fits_and_discovers() {
        let mut fitter = GlyphFitter::new(PipelineConfig::default(), SyntheticRenderer::default()).unwrap();
        let svg = single_glyph_svg('O', 12.0);
        assert_eq!(fitter.discover(&svg).unwrap().len(), 1);
        let report = fitter.fit_document_str("o.svg", &svg);
        assert_eq!(report.results[0].verdict, Verdict::Accepted);

        fitter.config_mut().letters = "C".to_string();
        assert!(fitter.discover(&svg).unwrap().is_empty());
        assert!(fitter.fit_document_str("o.svg", &svg).results.is_empty());
    }
}
