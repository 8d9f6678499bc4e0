//! # Scheduler Skill
//!
//! Lays out agency visits on consecutive days starting five days out.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;

use super::{AgentOutput, NodeContext};

/// Days between today and the first visit
const LEAD_DAYS: i64 = 5;
/// Hours budgeted per visit
const HOURS_PER_TASK: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub time: &'static str,
    pub task: String,
    pub location: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub schedule: Vec<ScheduleEntry>,
    pub optimized_route: String,
    pub estimated_total: String,
}

impl Schedule {
    pub fn render(&self) -> String {
        let mut lines = vec![self.estimated_total.clone()];
        lines.extend(
            self.schedule
                .iter()
                .map(|e| format!("- {} {} {} @ {}", e.date, e.time, e.task, e.location)),
        );
        lines.push(self.optimized_route.clone());
        lines.join("\n")
    }
}

/// Pure scheduling from a fixed start date
pub fn build_schedule(tasks: &[String], today: NaiveDate) -> Schedule {
    let start = today + Duration::days(LEAD_DAYS);
    let schedule = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| ScheduleEntry {
            date: start + Duration::days(i as i64),
            time: if i == 0 { "09:00" } else { "14:00" },
            task: task.clone(),
            location: if i % 2 == 0 {
                "District office civil affairs desk"
            } else {
                "Employment center or responsible agency"
            },
        })
        .collect();

    Schedule {
        schedule,
        optimized_route: if tasks.len() > 1 {
            "Subway route covers all visits in about 45 minutes of travel".to_string()
        } else {
            "Visit the agency directly".to_string()
        },
        estimated_total: format!(
            "Estimated total time: {} hours",
            tasks.len() * HOURS_PER_TASK
        ),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerSkill {
    profile: SimulationProfile,
}

impl SchedulerSkill {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }

    pub async fn run(&self, tasks: &[String]) -> Schedule {
        self.profile.pause().await;
        build_schedule(tasks, Local::now().date_naive())
    }

    pub async fn handle(&self, node: &Node, _ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        let schedule = self.run(&[node.description.clone()]).await;
        Ok(AgentOutput::text(schedule.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_dates_and_slots() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let tasks = vec!["Education".to_string(), "Report".to_string()];
        let schedule = build_schedule(&tasks, today);

        assert_eq!(schedule.schedule[0].date, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
        assert_eq!(schedule.schedule[1].date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(schedule.schedule[0].time, "09:00");
        assert_eq!(schedule.schedule[1].time, "14:00");
        assert_eq!(schedule.estimated_total, "Estimated total time: 4 hours");
        assert!(schedule.optimized_route.contains("Subway"));
    }

    #[test]
    fn test_single_visit() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let schedule = build_schedule(&["Visit".to_string()], today);
        assert_eq!(schedule.schedule[0].date, NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
        assert_eq!(schedule.optimized_route, "Visit the agency directly");
        assert!(schedule.render().starts_with("Estimated total time: 2 hours"));
    }
}
