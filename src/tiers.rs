use crate::models::{Incentive, TierProgress, TierSummary};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TierConfig {
    pub activity_names: Vec<String>,
    pub sales_name: String,
    pub sales_fallback_target: f64,
    pub stretch_target: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            activity_names: vec![
                "New Jobs".to_string(),
                "Reviews".to_string(),
                "Referrals".to_string(),
            ],
            sales_name: "Sales Incentive - Tier 2".to_string(),
            sales_fallback_target: 100_000.0,
            stretch_target: 250_000.0,
        }
    }
}

pub fn percent_of(achieved: f64, target: f64) -> f64 {
    if target > 0.0 {
        (achieved / target).min(1.0)
    } else {
        0.0
    }
}

pub fn remaining_of(achieved: f64, target: f64) -> f64 {
    (target - achieved).max(0.0)
}

fn progress(achieved: f64, target: f64) -> TierProgress {
    TierProgress {
        target,
        achieved,
        percent: percent_of(achieved, target),
        remaining: remaining_of(achieved, target),
    }
}

pub fn build_tier_summary(
    incentives: &[Incentive],
    totals: &HashMap<String, f64>,
    config: &TierConfig,
) -> TierSummary {
    let mut activity_target = 0.0;
    let mut activity_achieved = 0.0;
    for incentive in incentives {
        if config.activity_names.iter().any(|name| name == &incentive.name) {
            activity_target += incentive.target;
            activity_achieved += totals.get(&incentive.id).copied().unwrap_or(0.0);
        }
    }

    let sales = incentives
        .iter()
        .find(|incentive| incentive.name == config.sales_name);
    let sales_target = sales
        .map(|incentive| incentive.target)
        .unwrap_or(config.sales_fallback_target);
    let sales_achieved = sales
        .and_then(|incentive| totals.get(&incentive.id))
        .copied()
        .unwrap_or(0.0);

    TierSummary {
        activity: progress(activity_achieved, activity_target),
        sales_tier2: progress(sales_achieved, sales_target),
        // Tier 3 reuses tier 2's achieved value against the stretch target.
        sales_tier3: progress(sales_achieved, config.stretch_target),
    }
}
