use crate::models::{Aggregates, Contribution};
use std::collections::HashMap;

pub fn build_aggregates(contributions: &[Contribution]) -> Aggregates {
    let mut agg = Aggregates::default();

    for contribution in contributions {
        *agg.totals
            .entry(contribution.incentive_id.clone())
            .or_insert(0.0) += contribution.amount;
        agg.logs
            .entry(contribution.incentive_id.clone())
            .or_default()
            .push(contribution.clone());
    }

    for log in agg.logs.values_mut() {
        log.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    agg
}

pub fn insert_newest_first(log: &mut Vec<Contribution>, contribution: Contribution) {
    let position = log
        .iter()
        .position(|existing| existing.created_at <= contribution.created_at)
        .unwrap_or(log.len());
    log.insert(position, contribution);
}

pub fn recent_activity(logs: &HashMap<String, Vec<Contribution>>, limit: usize) -> Vec<Contribution> {
    let mut merged: Vec<Contribution> = logs.values().flatten().cloned().collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged.truncate(limit);
    merged
}
