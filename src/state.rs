use crate::aggregate::{build_aggregates, insert_newest_first};
use crate::models::{Contribution, Incentive};
use crate::store::SharedStore;
use crate::tiers::TierConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct Dashboard {
    pub incentives: Vec<Incentive>,
    pub totals: HashMap<String, f64>,
    pub logs: HashMap<String, Vec<Contribution>>,
    // Keys of our own optimistic writes; a feed event carrying one is an echo.
    applied_keys: HashSet<String>,
}

impl Dashboard {
    /// Applied keys survive a rebuild so a late echo is still recognized.
    pub fn rebuild(&mut self, incentives: Vec<Incentive>, contributions: &[Contribution]) {
        let aggregates = build_aggregates(contributions);
        self.incentives = incentives;
        self.totals = aggregates.totals;
        self.logs = aggregates.logs;
    }

    pub fn total_for(&self, incentive_id: &str) -> f64 {
        self.totals.get(incentive_id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, contribution: &Contribution) -> bool {
        self.logs
            .get(&contribution.incentive_id)
            .is_some_and(|log| log.iter().any(|c| c.id == contribution.id))
    }

    pub fn is_echo(&self, contribution: &Contribution) -> bool {
        contribution
            .client_key
            .as_ref()
            .is_some_and(|key| self.applied_keys.contains(key))
    }

    pub fn apply_insert(&mut self, contribution: Contribution) -> bool {
        if self.contains(&contribution) {
            return false;
        }

        *self
            .totals
            .entry(contribution.incentive_id.clone())
            .or_insert(0.0) += contribution.amount;
        let log = self.logs.entry(contribution.incentive_id.clone()).or_default();
        insert_newest_first(log, contribution);
        true
    }

    pub fn apply_local(&mut self, placeholder: Contribution) {
        if let Some(key) = &placeholder.client_key {
            self.applied_keys.insert(key.clone());
        }
        self.apply_insert(placeholder);
    }

    /// When a rebuild already removed the placeholder, the confirmed row
    /// is merged instead so it ends up present exactly once.
    pub fn confirm(&mut self, placeholder_id: &str, confirmed: Contribution) {
        let incentive_id = confirmed.incentive_id.clone();
        let log = self.logs.entry(incentive_id.clone()).or_default();

        if let Some(position) = log.iter().position(|c| c.id == placeholder_id) {
            let removed = log.remove(position);
            let delta = confirmed.amount - removed.amount;
            insert_newest_first(log, confirmed);
            if delta != 0.0 {
                *self.totals.entry(incentive_id).or_insert(0.0) += delta;
            }
        } else {
            self.apply_insert(confirmed);
        }
    }

    pub fn rollback(&mut self, placeholder: &Contribution) {
        if let Some(log) = self.logs.get_mut(&placeholder.incentive_id) {
            if let Some(position) = log.iter().position(|c| c.id == placeholder.id) {
                let removed = log.remove(position);
                *self
                    .totals
                    .entry(placeholder.incentive_id.clone())
                    .or_insert(0.0) -= removed.amount;
            }
        }
        if let Some(key) = &placeholder.client_key {
            self.applied_keys.remove(key);
        }
    }

    pub fn push_incentive(&mut self, incentive: Incentive) {
        if self.incentives.iter().any(|existing| existing.id == incentive.id) {
            return;
        }
        self.incentives.push(incentive);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub board: Arc<Mutex<Dashboard>>,
    pub tiers: Arc<TierConfig>,
}

impl AppState {
    pub fn new(store: SharedStore, tiers: TierConfig) -> Self {
        Self {
            store,
            board: Arc::new(Mutex::new(Dashboard::default())),
            tiers: Arc::new(tiers),
        }
    }
}
