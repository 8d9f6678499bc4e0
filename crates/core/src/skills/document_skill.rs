//! # Document Skill
//!
//! Builds the checklist of documents a petition needs and marks the ones
//! public data and MyData can fill in automatically.

use serde::Serialize;

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;

use super::master_skill::Category;
use super::{AgentOutput, NodeContext};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentStatus {
    Required,
    AutoFilled,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DocumentInfo {
    fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DocumentStatus::Required,
            source: None,
        }
    }

    fn auto_filled(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DocumentStatus::AutoFilled,
            source: Some(source.to_string()),
        }
    }

    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DocumentStatus::Pending,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChecklist {
    pub documents: Vec<DocumentInfo>,
    pub auto_fillable: Vec<String>,
    pub instructions: String,
}

impl DocumentChecklist {
    fn new(documents: Vec<DocumentInfo>, instructions: String) -> Self {
        let auto_fillable = documents
            .iter()
            .filter(|d| d.status == DocumentStatus::AutoFilled)
            .map(|d| d.name.clone())
            .collect();
        Self {
            documents,
            auto_fillable,
            instructions,
        }
    }

    /// Instructions followed by the document list
    pub fn render(&self) -> String {
        let lines = self
            .documents
            .iter()
            .map(|d| match (&d.status, &d.source) {
                (DocumentStatus::AutoFilled, Some(source)) => {
                    format!("- {} (auto-filled from {})", d.name, source)
                }
                (DocumentStatus::Pending, _) => format!("- {} (pending)", d.name),
                _ => format!("- {}", d.name),
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}", self.instructions, lines)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentSkill {
    profile: SimulationProfile,
}

impl DocumentSkill {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }

    pub async fn run(&self, task: &str) -> DocumentChecklist {
        self.profile.pause().await;
        checklist_for(task)
    }

    pub async fn handle(&self, node: &Node, _ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        let checklist = self.run(&node.description).await;
        Ok(AgentOutput::text(checklist.render()))
    }
}

fn checklist_for(task: &str) -> DocumentChecklist {
    match Category::detect(task) {
        Category::Restaurant => DocumentChecklist::new(
            vec![
                DocumentInfo::required("Business report form"),
                DocumentInfo::auto_filled("Building register", "Public Data Portal"),
                DocumentInfo::auto_filled("Lease agreement", "MyData"),
                DocumentInfo::required("Food sanitation education certificate"),
                DocumentInfo::required("Health certificate"),
            ],
            "2 of the 5 documents for the business report are filled in from MyData and public data. Submit them to the district office sanitation team after the education.".to_string(),
        ),
        Category::Relocation => DocumentChecklist::new(
            vec![
                DocumentInfo::auto_filled("Move-in report form", "Government24"),
                DocumentInfo::required("ID card"),
                DocumentInfo::auto_filled("Lease agreement", "MyData"),
            ],
            "The move-in report can be filed online on Government24 or at the community center. Bring your ID card.".to_string(),
        ),
        Category::Welfare => DocumentChecklist::new(
            vec![
                DocumentInfo::pending("Separation confirmation (filed by employer)"),
                DocumentInfo::required("ID card"),
                DocumentInfo::required("Copy of bankbook"),
            ],
            "Employment insurance history is checked automatically. Your former employer files the separation confirmation with the employment center. Register on the job portal before visiting.".to_string(),
        ),
        Category::General => DocumentChecklist::new(
            vec![
                DocumentInfo::required("Application form"),
                DocumentInfo::required("ID card"),
            ],
            format!(
                "These are the basic documents for {}. Ask the responsible agency whether anything else is needed.",
                task
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restaurant_checklist() {
        let skill = DocumentSkill::new(SimulationProfile::instant());
        let checklist = skill.run("Prepare the restaurant business report").await;
        assert_eq!(checklist.documents.len(), 5);
        assert_eq!(
            checklist.auto_fillable,
            vec!["Building register".to_string(), "Lease agreement".to_string()]
        );
        assert!(checklist
            .render()
            .contains("- Lease agreement (auto-filled from MyData)"));
    }

    #[tokio::test]
    async fn test_welfare_checklist_has_pending_item() {
        let skill = DocumentSkill::new(SimulationProfile::instant());
        let checklist = skill.run("unemployment benefit application").await;
        assert!(checklist
            .documents
            .iter()
            .any(|d| d.status == DocumentStatus::Pending));
        assert!(checklist.auto_fillable.is_empty());
    }

    #[test]
    fn test_status_wire_name() {
        let json = serde_json::to_value(DocumentInfo::auto_filled("x", "y")).unwrap();
        assert_eq!(json["status"], "auto-filled");
    }
}
