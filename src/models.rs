use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incentive {
    pub id: String,
    pub name: String,
    pub target: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: String,
    pub incentive_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}

impl Contribution {
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewContribution {
    pub incentive_id: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub client_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIncentive {
    pub name: String,
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert(Contribution),
    Delete(Contribution),
}

#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub totals: HashMap<String, f64>,
    pub logs: HashMap<String, Vec<Contribution>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierProgress {
    pub target: f64,
    pub achieved: f64,
    pub percent: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierSummary {
    pub activity: TierProgress,
    pub sales_tier2: TierProgress,
    pub sales_tier3: TierProgress,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub incentive_id: String,
    // Number or numeric string; parsed in submit.
    pub amount: serde_json::Value,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub deduction: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub contribution: Contribution,
    pub total: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateIncentiveRequest {
    pub name: String,
    pub target: f64,
}

#[derive(Debug, Serialize)]
pub struct IncentiveProgress {
    pub id: String,
    pub name: String,
    pub target: f64,
    pub total: f64,
    pub percent: f64,
    pub remaining: f64,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub incentive_id: String,
    pub incentive_name: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub incentives: Vec<IncentiveProgress>,
    pub tiers: TierSummary,
    pub recent_activity: Vec<ActivityEntry>,
}
