//! # Mock Government APIs
//!
//! Canned responses standing in for public-sector data portals. Each call
//! sleeps for a short, jittered delay and may fail when the simulation
//! profile injects failures.

use std::time::Instant;

use chrono::{Duration as ChronoDuration, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::models::SimulationProfile;

/// Government service a node talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    BuildingRegistry,
    ResidentRegistration,
    EmploymentInsurance,
    HealthInsurance,
    VehicleRegistration,
    FoodEducation,
    WelfareBenefits,
    Generic,
}

/// Checked in order, first hit wins
const KEYWORDS: &[(ApiKind, &[&str])] = &[
    (ApiKind::BuildingRegistry, &["건축물", "building"]),
    (
        ApiKind::ResidentRegistration,
        &["전입", "move-in", "resident registration"],
    ),
    (
        ApiKind::EmploymentInsurance,
        &["고용보험", "실업", "employment insurance", "unemployment"],
    ),
    (ApiKind::HealthInsurance, &["건강보험", "health insurance"]),
    (ApiKind::VehicleRegistration, &["자동차", "vehicle"]),
    (
        ApiKind::FoodEducation,
        &["위생교육", "식품위생교육", "hygiene education", "sanitation education"],
    ),
    (ApiKind::WelfareBenefits, &["복지", "welfare"]),
];

impl ApiKind {
    pub fn all() -> &'static [ApiKind] {
        &[
            ApiKind::BuildingRegistry,
            ApiKind::ResidentRegistration,
            ApiKind::EmploymentInsurance,
            ApiKind::HealthInsurance,
            ApiKind::VehicleRegistration,
            ApiKind::FoodEducation,
            ApiKind::WelfareBenefits,
            ApiKind::Generic,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiKind::BuildingRegistry => "building_registry",
            ApiKind::ResidentRegistration => "resident_registration",
            ApiKind::EmploymentInsurance => "employment_insurance",
            ApiKind::HealthInsurance => "health_insurance",
            ApiKind::VehicleRegistration => "vehicle_registration",
            ApiKind::FoodEducation => "food_education",
            ApiKind::WelfareBenefits => "welfare_benefits",
            ApiKind::Generic => "generic",
        }
    }

    /// Exact wire name, `None` for anything unrecognized
    pub fn parse(name: &str) -> Option<ApiKind> {
        Self::all().iter().copied().find(|k| k.as_str() == name)
    }

    /// Pick a service from free text (a node's label and description)
    pub fn infer(text: &str) -> ApiKind {
        let text = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(kind, _)| *kind)
            .unwrap_or(ApiKind::Generic)
    }

    pub fn endpoint(self) -> String {
        format!("/api/gov/{}", self.as_str())
    }
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed mock call
#[derive(Debug, Clone)]
pub struct GovApiResponse {
    pub kind: ApiKind,
    pub endpoint: String,
    pub data: Value,
    /// Milliseconds
    pub response_time: u64,
}

/// Entry point for every mock service
#[derive(Debug, Clone, Default)]
pub struct GovApi {
    profile: SimulationProfile,
}

impl GovApi {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }

    /// Call one service. `params` is echoed where the real service would use it.
    pub async fn call(&self, kind: ApiKind, params: &Value) -> Result<GovApiResponse, AgentError> {
        let start = Instant::now();
        let endpoint = kind.endpoint();
        self.profile.pause().await;

        if self.profile.should_fail() {
            tracing::warn!(%endpoint, "injected government API failure");
            return Err(AgentError::Upstream {
                endpoint,
                status: 503,
            });
        }

        let data = respond(kind, params);
        Ok(GovApiResponse {
            kind,
            endpoint,
            data,
            response_time: start.elapsed().as_millis() as u64,
        })
    }
}

fn confirmation_number(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("{}-{}", prefix, tail)
}

fn param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn respond(kind: ApiKind, params: &Value) -> Value {
    let today = Local::now().date_naive();
    match kind {
        ApiKind::BuildingRegistry => json!({
            "address": param(params, "address").unwrap_or("address not provided"),
            "buildingUse": "Class 1 neighborhood facility",
            "floorArea": 85,
            "floors": 1,
            "approvalDate": "2010-06-15",
            "ownerName": "H***",
            "isEligibleForRestaurant": true,
        }),
        ApiKind::ResidentRegistration => {
            let members = params
                .get("members")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            json!({
                "confirmationNumber": confirmation_number("MOI"),
                "processedAt": Utc::now().to_rfc3339(),
                "newAddress": param(params, "newAddress").unwrap_or("address not provided"),
                "memberCount": members + 1,
                "derivedServices": [
                    "Health insurance address change",
                    "Vehicle registration update",
                    "Driver license address change",
                    "National pension address change",
                    "Child allowance address change",
                    "Daycare transfer request",
                ],
            })
        }
        ApiKind::EmploymentInsurance => json!({
            "insuredDays": 683,
            "currentEmployer": "*** Co., Ltd.",
            "employmentStartDate": "2023-11-01",
            "separationDate": today.to_string(),
            "separationReason": "Recommended resignation",
            "isEligible": true,
            "estimatedDailyBenefit": 66000,
            "estimatedPayDays": 180,
        }),
        ApiKind::HealthInsurance => json!({
            "success": true,
            "effectiveDate": today.to_string(),
            "confirmationNumber": confirmation_number("NHIS"),
        }),
        ApiKind::VehicleRegistration => json!({
            "success": true,
            "message": "Vehicle registration address changes require a visit to the nearest registration office.",
            "requiresVisit": true,
        }),
        ApiKind::FoodEducation => {
            let first = today + ChronoDuration::days(5);
            let second = first + ChronoDuration::days(7);
            json!({
                "schedules": [
                    {
                        "date": first.to_string(),
                        "time": "09:00",
                        "location": "Seoul Food Sanitation Education Center, Mapo",
                        "capacity": 30,
                        "remaining": 12,
                        "onlineAvailable": true,
                    },
                    {
                        "date": second.to_string(),
                        "time": "14:00",
                        "location": "Seoul Food Sanitation Education Center, Gangnam",
                        "capacity": 30,
                        "remaining": 8,
                        "onlineAvailable": true,
                    },
                ],
            })
        }
        ApiKind::WelfareBenefits => json!({
            "benefits": [
                {
                    "name": "National Employment Support Program",
                    "description": "Job search services plus a job-seeking allowance",
                    "amount": "500,000 won per month for 6 months",
                    "eligibility": "Ages 15-69, household income criteria met",
                    "applicationUrl": "https://www.kua.go.kr",
                },
                {
                    "name": "Emergency Welfare Support",
                    "description": "Emergency living costs for a sudden crisis",
                    "amount": "Up to 1,620,000 won per month",
                    "eligibility": "Crisis event plus income criteria met",
                    "applicationUrl": "https://www.129.go.kr",
                },
                {
                    "name": "Health Insurance Premium Deferral",
                    "description": "Six-month premium deferral for the unemployed",
                    "amount": "6-month deferral",
                    "eligibility": "Apply within 6 months of job loss",
                    "applicationUrl": "https://www.nhis.or.kr",
                },
            ],
        }),
        ApiKind::Generic => json!({
            "success": true,
            "message": "generic API call completed",
            "data": params,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_text() {
        assert_eq!(ApiKind::infer("건축물대장 조회"), ApiKind::BuildingRegistry);
        assert_eq!(ApiKind::infer("Submit move-in report"), ApiKind::ResidentRegistration);
        assert_eq!(ApiKind::infer("실업 이력 확인"), ApiKind::EmploymentInsurance);
        assert_eq!(ApiKind::infer("Update Health Insurance"), ApiKind::HealthInsurance);
        assert_eq!(ApiKind::infer("자동차등록 변경"), ApiKind::VehicleRegistration);
        assert_eq!(ApiKind::infer("위생교육 일정"), ApiKind::FoodEducation);
        assert_eq!(ApiKind::infer("복지 혜택"), ApiKind::WelfareBenefits);
        assert_eq!(ApiKind::infer("something else"), ApiKind::Generic);
    }

    #[test]
    fn test_parse_wire_names() {
        for kind in ApiKind::all() {
            assert_eq!(ApiKind::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(ApiKind::parse("nope"), None);
        assert_eq!(ApiKind::Generic.endpoint(), "/api/gov/generic");
    }

    #[tokio::test]
    async fn test_building_registry_echoes_address() {
        let api = GovApi::new(SimulationProfile::instant());
        let res = api
            .call(ApiKind::BuildingRegistry, &json!({"address": "Mapo-gu 12"}))
            .await
            .unwrap();
        assert_eq!(res.endpoint, "/api/gov/building_registry");
        assert_eq!(res.data["address"], "Mapo-gu 12");
        assert_eq!(res.data["isEligibleForRestaurant"], true);
    }

    #[tokio::test]
    async fn test_resident_registration_counts_members() {
        let api = GovApi::new(SimulationProfile::instant());
        let res = api
            .call(
                ApiKind::ResidentRegistration,
                &json!({"newAddress": "Seoul", "members": ["a", "b"]}),
            )
            .await
            .unwrap();
        assert_eq!(res.data["memberCount"], 3);
        assert!(res.data["confirmationNumber"]
            .as_str()
            .unwrap()
            .starts_with("MOI-"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let api = GovApi::new(SimulationProfile {
            api_failure_rate: 1.0,
            ..SimulationProfile::instant()
        });
        let err = api.call(ApiKind::Generic, &json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::Upstream { status: 503, .. }));
    }
}
