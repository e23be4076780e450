//! Metrics handed to an external report writer
//!
//! The narrative itself is produced by a [`ReportGenerator`] living outside this crate. This
//! module only assembles what it is given and keeps its failures away from the caller.
use std::fmt::Write;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::solution::{ExchangeFlux, StaticAnalysis};
use crate::optimize::envelope::ProductionEnvelope;
use crate::simulation::dynamic::{DynamicResult, ToxicityAlert};

/// Returned in place of a report when the generator fails
pub const FALLBACK_REPORT: &str =
    "The report engine is currently unavailable. Please try again later.";

/// Reference state a simulation is compared against
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub growth_rate: f64,
    pub byproducts: Vec<ExchangeFlux>,
}

/// Everything a report is written from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsContext {
    pub model_id: String,
    pub growth_rate: f64,
    pub byproducts: Vec<ExchangeFlux>,
    pub carbon_loss_index: f64,
    pub shadow_prices: IndexMap<String, f64>,
    pub toxicity_alerts: Vec<ToxicityAlert>,
    /// `max_yield` of a production envelope, if one was computed
    pub max_yield: Option<f64>,
    pub baseline: Option<BaselineMetrics>,
}

impl MetricsContext {
    pub fn from_analysis(model_id: &str, analysis: &StaticAnalysis) -> Self {
        MetricsContext {
            model_id: model_id.to_string(),
            growth_rate: analysis.growth_rate,
            byproducts: analysis.byproducts.clone(),
            carbon_loss_index: analysis.carbon_loss_index,
            shadow_prices: analysis.shadow_prices.clone(),
            ..Default::default()
        }
    }

    pub fn with_dynamic(mut self, result: &DynamicResult) -> Self {
        self.toxicity_alerts = result.toxicity_alerts.clone();
        self
    }

    pub fn with_envelope(mut self, envelope: &ProductionEnvelope) -> Self {
        self.max_yield = Some(envelope.max_yield);
        self
    }

    pub fn with_baseline(mut self, baseline: &StaticAnalysis) -> Self {
        self.baseline = Some(BaselineMetrics {
            growth_rate: baseline.growth_rate,
            byproducts: baseline.byproducts.clone(),
        });
        self
    }

    /// Plain text block describing the metrics, sections without data are left out
    pub fn render(&self) -> String {
        let mut text = String::new();
        // writing into a String can't fail
        let _ = writeln!(text, "[Simulation metrics: {}]", self.model_id);
        let _ = writeln!(text, "- Growth rate: {:.4}", self.growth_rate);
        let _ = writeln!(text, "- Byproducts: {}", format_fluxes(&self.byproducts));
        let _ = writeln!(text, "- Carbon loss index: {}%", self.carbon_loss_index);
        let _ = writeln!(
            text,
            "- Shadow prices: {}",
            format_pairs(self.shadow_prices.iter().map(|(id, v)| (id.as_str(), *v)))
        );
        if !self.toxicity_alerts.is_empty() {
            let alerts: Vec<String> = self
                .toxicity_alerts
                .iter()
                .map(|a| format!("{} {} mM at t={}", a.byproduct, a.concentration, a.time))
                .collect();
            let _ = writeln!(text, "- Toxicity alerts: {}", alerts.join("; "));
        }
        if let Some(max_yield) = self.max_yield {
            let _ = writeln!(text, "- Production envelope: Max Yield={}", max_yield);
        }
        if let Some(baseline) = &self.baseline {
            let _ = writeln!(text, "\n[Baseline comparison]");
            let _ = writeln!(text, "- Baseline growth rate: {:.4}", baseline.growth_rate);
            let _ = writeln!(
                text,
                "- Growth rate change: {:+.4}",
                self.growth_rate - baseline.growth_rate
            );
            let _ = writeln!(
                text,
                "- Baseline byproducts: {}",
                format_fluxes(&baseline.byproducts)
            );
        }
        text
    }
}

fn format_pairs<'a>(pairs: impl Iterator<Item = (&'a str, f64)>) -> String {
    let parts: Vec<String> = pairs.map(|(id, v)| format!("{}: {}", id, v)).collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

fn format_fluxes(fluxes: &[ExchangeFlux]) -> String {
    format_pairs(fluxes.iter().map(|f| (f.id.as_str(), f.value)))
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report generator unavailable: {0}")]
    Unavailable(String),
    #[error("Report generator returned an empty response")]
    EmptyResponse,
}

/// External service turning a question and the rendered metrics into a narrative
pub trait ReportGenerator {
    fn generate(&self, question: &str, metrics: &str) -> Result<String, ReportError>;
}

/// Ask `generator` for a report on `context`, any failure yields [`FALLBACK_REPORT`]
pub fn generate_report(
    generator: &dyn ReportGenerator,
    question: &str,
    context: &MetricsContext,
) -> String {
    let metrics = context.render();
    match generator.generate(question, &metrics) {
        Ok(report) if !report.trim().is_empty() => report,
        Ok(_) => {
            log::warn!("{}", ReportError::EmptyResponse);
            FALLBACK_REPORT.to_string()
        }
        Err(err) => {
            log::warn!("{}", err);
            FALLBACK_REPORT.to_string()
        }
    }
}
