//! # Validator Skill
//!
//! Cross-checks everything the run has produced so far. The only node kind
//! that receives the full result map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;

use super::{AgentOutput, NodeContext};

const FULL_CONFIDENCE: f64 = 0.95;
const UNCITED_CONFIDENCE: f64 = 0.82;
const EMPTY_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub confidence: f64,
    pub suggestions: Vec<String>,
}

impl Validation {
    pub fn render(&self) -> String {
        let verdict = if self.issues.is_empty() {
            "No issues.".to_string()
        } else {
            self.issues.join(" ")
        };
        format!(
            "Validation complete. Confidence {}%. {}",
            (self.confidence * 100.0).round() as u32,
            verdict
        )
    }
}

/// Score a result map
pub fn validate(results: &BTreeMap<String, String>) -> Validation {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut confidence = FULL_CONFIDENCE;

    if results.is_empty() {
        issues.push("Not enough agent results.".to_string());
        suggestions.push("Try again or contact the responsible officer.".to_string());
        confidence = EMPTY_CONFIDENCE;
    } else if !results.values().any(|r| r.contains("Article")) {
        issues.push("No statute citation found, confidence may be lower.".to_string());
        suggestions.push("Re-check the legal agent's result.".to_string());
        confidence = UNCITED_CONFIDENCE;
    }

    Validation {
        is_valid: issues.is_empty(),
        issues,
        confidence,
        suggestions,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorSkill {
    profile: SimulationProfile,
}

impl ValidatorSkill {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }

    pub async fn handle(&self, _node: &Node, ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        self.profile.pause().await;
        let empty = BTreeMap::new();
        let results = ctx.all_results.as_ref().unwrap_or(&empty);
        Ok(AgentOutput::text(validate(results).render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cited_results_pass() {
        let v = validate(&results(&[("n1", "Building Act Article 38 reviewed")]));
        assert!(v.is_valid);
        assert_eq!(v.render(), "Validation complete. Confidence 95%. No issues.");
    }

    #[test]
    fn test_uncited_results_lower_confidence() {
        let v = validate(&results(&[("n1", "something")]));
        assert!(!v.is_valid);
        assert_eq!(v.confidence, UNCITED_CONFIDENCE);
    }

    #[test]
    fn test_empty_results() {
        let v = validate(&BTreeMap::new());
        assert_eq!(v.confidence, EMPTY_CONFIDENCE);
        assert!(v.render().contains("Confidence 60%"));
    }
}
