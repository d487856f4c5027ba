//! Payload rendering for the CLI output formats.
//!
//! JSON is the canonical form; Markdown and summary are presentation only
//! and never feed back into calculations.

use crate::decision::{PosttestAssessment, TestPlan, TierRecommendation};
use crate::store::{HypothesisStatus, ProblemRecord};
use dpe_common::OutputFormat;
use dpe_math::{LikelihoodRatios, OutcomePlan};
use serde::Serialize;
use std::fmt::Write;

/// A payload with human renderings alongside its JSON form.
pub trait Render: Serialize {
    fn to_markdown(&self) -> String;
    fn to_summary(&self) -> String;
}

/// Render a payload in the requested format.
pub fn render<T: Render>(format: OutputFormat, payload: &T) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(payload),
        OutputFormat::Md => Ok(payload.to_markdown()),
        OutputFormat::Summary => Ok(payload.to_summary()),
    }
}

/// Fixed-precision probability, for display only.
pub fn fmt_probability(p: f64) -> String {
    format!("{:.4}", p)
}

/// Likelihood ratio with the certainty sentinel spelled out.
pub fn fmt_ratio(lr: f64) -> String {
    if lr.is_infinite() {
        "Infinity".to_string()
    } else {
        format!("{:.4}", lr)
    }
}

impl Render for TierRecommendation {
    fn to_markdown(&self) -> String {
        format!(
            "# Action tier\n\n| probability | test threshold | treatment threshold | tier |\n|---|---|---|---|\n| {} | {} | {} | `{}` |\n\n{}\n",
            fmt_probability(self.probability),
            fmt_probability(self.thresholds.test_threshold),
            fmt_probability(self.thresholds.treatment_threshold),
            self.tier,
            self.rationale
        )
    }

    fn to_summary(&self) -> String {
        format!("{} p={}", self.tier, fmt_probability(self.probability))
    }
}

impl Render for LikelihoodRatios {
    fn to_markdown(&self) -> String {
        format!(
            "# Likelihood ratios\n\n| LR+ | LR- |\n|---|---|\n| {} | {} |\n",
            fmt_ratio(self.lr_positive),
            fmt_ratio(self.lr_negative)
        )
    }

    fn to_summary(&self) -> String {
        format!(
            "LR+={} LR-={}",
            fmt_ratio(self.lr_positive),
            fmt_ratio(self.lr_negative)
        )
    }
}

impl Render for OutcomePlan {
    fn to_markdown(&self) -> String {
        format!(
            "# Both outcomes\n\n| pretest | if positive | if negative |\n|---|---|---|\n| {} | {} | {} |\n",
            fmt_probability(self.pretest_probability),
            fmt_probability(self.posttest_if_positive),
            fmt_probability(self.posttest_if_negative)
        )
    }

    fn to_summary(&self) -> String {
        format!(
            "pre={} pos={} neg={}",
            fmt_probability(self.pretest_probability),
            fmt_probability(self.posttest_if_positive),
            fmt_probability(self.posttest_if_negative)
        )
    }
}

impl Render for PosttestAssessment {
    fn to_markdown(&self) -> String {
        let mut out = String::from("# Posttest probability\n\n| step | prior | LR | posterior | evidence |\n|---|---|---|---|---|\n");
        for (i, (step, summary)) in self.steps.iter().zip(&self.evidence).enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} ({:?}) |",
                i + 1,
                fmt_probability(step.prior),
                fmt_ratio(step.likelihood_ratio),
                fmt_probability(step.posterior),
                summary.strength,
                summary.direction
            );
        }
        let _ = write!(
            out,
            "\n**Posttest:** {}  \n**Tier:** `{}`: {}\n",
            fmt_probability(self.posttest_probability),
            self.recommendation.tier,
            self.recommendation.rationale
        );
        out
    }

    fn to_summary(&self) -> String {
        format!(
            "{} -> {} ({})",
            fmt_probability(self.pretest_probability),
            fmt_probability(self.posttest_probability),
            self.recommendation.tier
        )
    }
}

impl Render for TestPlan {
    fn to_markdown(&self) -> String {
        let mut out = format!(
            "# Test plan\n\n| result | probability | tier |\n|---|---|---|\n| now | {} | `{}` |\n| positive | {} | `{}` |\n| negative | {} | `{}` |\n\n",
            fmt_probability(self.outcomes.pretest_probability),
            self.current_tier,
            fmt_probability(self.outcomes.posttest_if_positive),
            self.tier_if_positive,
            fmt_probability(self.outcomes.posttest_if_negative),
            self.tier_if_negative
        );
        if self.changes_management {
            out.push_str("At least one result changes management.\n");
        } else {
            out.push_str("Neither result changes management at these thresholds.\n");
        }
        if let Some(ratios) = &self.threshold_ratios {
            let _ = write!(
                out,
                "\nLR needed to reach treatment: {}; to fall to the test threshold: {}\n",
                fmt_ratio(ratios.to_treatment_threshold),
                fmt_ratio(ratios.to_test_threshold)
            );
        }
        out
    }

    fn to_summary(&self) -> String {
        format!(
            "{} | +:{} -:{} | changes_management={}",
            self.current_tier, self.tier_if_positive, self.tier_if_negative, self.changes_management
        )
    }
}

impl Render for ProblemRecord {
    fn to_markdown(&self) -> String {
        let mut active: Vec<_> = self.hypotheses.iter().filter(|h| h.is_active()).collect();
        active.sort_by_key(|h| h.rank);
        let mut out = format!(
            "# Problem {}\n\n| rank | diagnosis | pretest | current | evidence |\n|---|---|---|---|---|\n",
            self.problem_id
        );
        for h in &active {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                h.rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
                h.diagnosis_id,
                fmt_probability(h.pretest_probability),
                fmt_probability(h.current_probability),
                h.evidence.len()
            );
        }
        let retired: Vec<_> = self.hypotheses.iter().filter(|h| !h.is_active()).collect();
        if !retired.is_empty() {
            out.push_str("\n## Retired\n\n");
            for h in retired {
                let _ = writeln!(
                    out,
                    "- {} ({}, p={})",
                    h.diagnosis_id,
                    h.status,
                    fmt_probability(h.current_probability)
                );
            }
        }
        out
    }

    fn to_summary(&self) -> String {
        let count = |status: HypothesisStatus| {
            self.hypotheses
                .iter()
                .filter(|h| h.status == status)
                .count()
        };
        let leading = self
            .hypotheses
            .iter()
            .find(|h| h.rank == Some(1))
            .map(|h| {
                format!(
                    " leading={} p={}",
                    h.diagnosis_id,
                    fmt_probability(h.current_probability)
                )
            })
            .unwrap_or_default();
        format!(
            "{} active={} ruled_out={} confirmed={}{}",
            self.problem_id,
            count(HypothesisStatus::Active),
            count(HypothesisStatus::RuledOut),
            count(HypothesisStatus::Confirmed),
            leading
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::recommend_tier;
    use dpe_config::TierThresholds;
    use dpe_math::derive_likelihood_ratios;

    #[test]
    fn json_is_default_payload() {
        let rec = recommend_tier(0.5, &TierThresholds::default()).unwrap();
        let json = render(OutputFormat::Json, &rec).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tier"], "order_test");
    }

    #[test]
    fn summary_spells_out_infinity() {
        let lrs = derive_likelihood_ratios(0.9, 1.0).unwrap();
        assert_eq!(
            render(OutputFormat::Summary, &lrs).unwrap(),
            "LR+=Infinity LR-=0.1000"
        );
    }

    #[test]
    fn markdown_has_table() {
        let rec = recommend_tier(0.95, &TierThresholds::default()).unwrap();
        let md = render(OutputFormat::Md, &rec).unwrap();
        assert!(md.starts_with("# Action tier"));
        assert!(md.contains("`treat_empirically`"));
    }
}
