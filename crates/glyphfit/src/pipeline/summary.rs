//! Per-document and per-batch aggregation of glyph results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::result::{DocumentReport, FailureReason, FitResult, QualityMetric, Verdict};

/// Nearest-rank percentile of an ascending slice; 0 when empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * q.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Distribution of one metric over the finite values observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDistribution {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
}

impl MetricDistribution {
    /// `None` when no value is finite.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
        if v.is_empty() {
            return None;
        }
        v.sort_by(f64::total_cmp);
        let n = v.len();
        Some(Self {
            count: n,
            min: v[0],
            max: v[n - 1],
            mean: v.iter().sum::<f64>() / n as f64,
            median: percentile(&v, 0.5),
            p95: percentile(&v, 0.95),
        })
    }
}

/// Counts and metric distributions over a set of glyph results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    /// Fits that hit the optimizer budget, whatever their verdict.
    pub unconverged: usize,
    pub failures: BTreeMap<FailureReason, usize>,
    pub rejections: BTreeMap<QualityMetric, usize>,
    /// Distributions over every glyph that produced metrics.
    pub metrics: BTreeMap<QualityMetric, MetricDistribution>,
}

impl DocumentSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a FitResult>) -> Self {
        let mut s = Self::default();
        let mut values: BTreeMap<QualityMetric, Vec<f64>> = BTreeMap::new();
        for r in results {
            s.total += 1;
            match &r.verdict {
                Verdict::Accepted => s.accepted += 1,
                Verdict::Rejected { violation } => {
                    s.rejected += 1;
                    *s.rejections.entry(violation.metric).or_default() += 1;
                }
                Verdict::Failed { reason, .. } => {
                    s.failed += 1;
                    *s.failures.entry(*reason).or_default() += 1;
                }
            }
            if r.fit.as_ref().is_some_and(|f| !f.converged) {
                s.unconverged += 1;
            }
            if let Some(m) = &r.metrics {
                for metric in QualityMetric::ALL {
                    values.entry(metric).or_default().push(metric.value(m));
                }
            }
        }
        s.metrics = values
            .into_iter()
            .filter_map(|(k, v)| MetricDistribution::from_values(v).map(|d| (k, d)))
            .collect();
        s
    }

    /// Fraction of glyphs accepted; 0 when there are none.
    pub fn acceptance_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.accepted as f64 / self.total as f64
        }
    }
}

/// Aggregate over every document of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub documents: usize,
    /// Documents that could not be processed at all.
    pub documents_failed: usize,
    /// Summary over all glyphs of all documents.
    pub glyphs: DocumentSummary,
}

impl BatchSummary {
    pub fn from_reports(reports: &[DocumentReport]) -> Self {
        Self {
            documents: reports.len(),
            documents_failed: reports.iter().filter(|r| r.error.is_some()).count(),
            glyphs: DocumentSummary::from_results(reports.iter().flat_map(|r| r.results.iter())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_nearest_rank() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 0.5), 3.0);
        assert_eq!(percentile(&v, 1.0), 5.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn distribution_skips_non_finite() {
        let d = MetricDistribution::from_values([0.3, f64::INFINITY, 0.1, f64::NAN, 0.2]).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.min, 0.1);
        assert_eq!(d.max, 0.3);
        assert_relative_eq!(d.mean, 0.2, epsilon = 1e-12);
        assert_eq!(d.median, 0.2);
        assert!(MetricDistribution::from_values([f64::NAN]).is_none());
    }

    #[test]
    fn empty_summary() {
        let s = DocumentSummary::from_results(std::iter::empty());
        assert_eq!(s.total, 0);
        assert_eq!(s.acceptance_rate(), 0.0);
        assert!(s.metrics.is_empty());
    }
}
