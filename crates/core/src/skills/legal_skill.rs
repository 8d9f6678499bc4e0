//! # Legal Skill
//!
//! Statute lookup for a node's task, plus the best-effort citation lookup
//! the orchestrator runs once per attempt.

use serde::Serialize;

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;
use crate::tools::legal_search::{self, LegalCitation};

use super::master_skill::Category;
use super::{AgentOutput, NodeContext};

/// Citations returned per lookup
pub const CITATION_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalAnalysis {
    pub analysis: String,
    pub citations: Vec<LegalCitation>,
    pub is_compliant: bool,
    pub risks: Vec<String>,
}

impl LegalAnalysis {
    /// Analysis followed by one line per risk
    pub fn render(&self) -> String {
        if self.risks.is_empty() {
            return self.analysis.clone();
        }
        let risks = self
            .risks
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\nRisks:\n{}", self.analysis, risks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LegalSkill {
    profile: SimulationProfile,
}

impl LegalSkill {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }

    /// Analyze a task against the statute corpus
    pub async fn run(&self, query: &str) -> LegalAnalysis {
        let citations = legal_search::citations(query, CITATION_LIMIT);
        self.profile.pause().await;

        let (analysis, risks) = match Category::detect(query) {
            Category::Restaurant => (
                "Food Sanitation Act Article 36 (facility standards), Article 37 (business permit) and Article 41 (sanitation education) reviewed. Sanitation education must be completed before the business report. Kitchen and restroom facility standards need to be confirmed.".to_string(),
                vec![
                    "Business report is refused without completed sanitation education".to_string(),
                    "Fine if kitchen facility standards are not met".to_string(),
                ],
            ),
            Category::Relocation => (
                "Resident Registration Act Article 10: the move-in must be reported within 14 days. The head of household may report for the members. Six linked petitions are processed automatically.".to_string(),
                vec!["Fine of 50,000 won after 14 days".to_string()],
            ),
            Category::Welfare => (
                "Employment Insurance Act Article 40 (job-seeking benefit requirements): at least 180 insured days within the 18 months before separation. Involuntary separation (layoff, recommended resignation) qualifies. Apply within 12 months.".to_string(),
                vec!["Eligibility lapses 12 months after separation".to_string()],
            ),
            Category::General => (
                format!(
                    "Searched statutes related to \"{}\". {} relevant article(s) found.",
                    query,
                    citations.len()
                ),
                Vec::new(),
            ),
        };

        LegalAnalysis {
            analysis,
            citations,
            is_compliant: true,
            risks,
        }
    }

    /// Citations for a whole request. Empty when nothing matches.
    pub async fn citations(&self, query: &str) -> Vec<LegalCitation> {
        self.profile.pause().await;
        legal_search::citations(query, CITATION_LIMIT)
    }

    pub async fn handle(&self, node: &Node, _ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        let analysis = self.run(&node.description).await;
        Ok(AgentOutput::text(analysis.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restaurant_analysis_lists_risks() {
        let skill = LegalSkill::new(SimulationProfile::instant());
        let analysis = skill.run("Review permit requirements for a restaurant").await;
        assert!(analysis.analysis.contains("Article 37"));
        assert_eq!(analysis.risks.len(), 2);
        assert!(!analysis.citations.is_empty());
        assert!(analysis.render().contains("Risks:"));
    }

    #[tokio::test]
    async fn test_citations_capped_and_empty_on_miss() {
        let skill = LegalSkill::new(SimulationProfile::instant());
        assert!(skill.citations("unemployment benefit welfare").await.len() <= CITATION_LIMIT);
        assert!(skill.citations("zzz qqq").await.is_empty());
    }

    #[tokio::test]
    async fn test_general_query_reports_count() {
        let skill = LegalSkill::new(SimulationProfile::instant());
        let analysis = skill.run("privacy consent").await;
        assert!(analysis.analysis.contains("relevant article(s) found"));
        assert!(analysis.risks.is_empty());
    }
}
