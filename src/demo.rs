use crate::models::{ChangeEvent, Contribution, Incentive, NewContribution, NewIncentive};
use crate::store::{ContributionStore, StoreError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};
use uuid::Uuid;

/// Stand-in for the hosted store when no service settings are configured.
pub struct DemoStore {
    path: PathBuf,
    data: Mutex<DemoData>,
    events: broadcast::Sender<ChangeEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoData {
    pub incentives: Vec<Incentive>,
    pub contributions: Vec<Contribution>,
}

impl DemoStore {
    pub async fn open(path: PathBuf) -> Self {
        let data = load_data(&path).await;
        let (events, _) = broadcast::channel(64);
        Self {
            path,
            data: Mutex::new(data),
            events,
        }
    }
}

#[async_trait]
impl ContributionStore for DemoStore {
    async fn fetch_incentives(&self) -> Result<Vec<Incentive>, StoreError> {
        let data = self.data.lock().await;
        let mut incentives = data.incentives.clone();
        incentives.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(incentives)
    }

    async fn fetch_contributions(&self) -> Result<Vec<Contribution>, StoreError> {
        Ok(self.data.lock().await.contributions.clone())
    }

    async fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError> {
        let record = Contribution {
            id: Uuid::new_v4().to_string(),
            incentive_id: new.incentive_id,
            amount: new.amount,
            note: new.note,
            created_at: Utc::now(),
            client_key: Some(new.client_key),
        };

        let mut data = self.data.lock().await;
        data.contributions.push(record.clone());
        if let Err(err) = persist_data(&self.path, &data).await {
            data.contributions.pop();
            return Err(err);
        }
        drop(data);

        let _ = self.events.send(ChangeEvent::Insert(record.clone()));
        Ok(record)
    }

    async fn insert_incentive(&self, new: NewIncentive) -> Result<Incentive, StoreError> {
        let record = Incentive {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            target: new.target,
            created_at: Utc::now(),
        };

        let mut data = self.data.lock().await;
        data.incentives.push(record.clone());
        if let Err(err) = persist_data(&self.path, &data).await {
            data.incentives.pop();
            return Err(err);
        }

        Ok(record)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

async fn load_data(path: &Path) -> DemoData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse demo data file, reseeding: {err}");
                seed_data()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no demo data file at {}, seeding sample data", path.display());
            seed_data()
        }
        Err(err) => {
            error!("failed to read demo data file, reseeding: {err}");
            seed_data()
        }
    }
}

async fn persist_data(path: &Path, data: &DemoData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}

fn seed_data() -> DemoData {
    let now = Utc::now();
    let incentive = |id: &str, name: &str, target: f64, days_ago: i64| Incentive {
        id: id.to_string(),
        name: name.to_string(),
        target,
        created_at: now - Duration::days(days_ago),
    };
    let contribution =
        |id: &str, incentive_id: &str, amount: f64, note: &str, hours_ago: i64| Contribution {
            id: id.to_string(),
            incentive_id: incentive_id.to_string(),
            amount,
            note: Some(note.to_string()),
            created_at: now - Duration::hours(hours_ago),
            client_key: None,
        };

    DemoData {
        incentives: vec![
            incentive("inc-new-jobs", "New Jobs", 40.0, 31),
            incentive("inc-reviews", "Reviews", 60.0, 30),
            incentive("inc-referrals", "Referrals", 25.0, 29),
            incentive("inc-sales-t2", "Sales Incentive - Tier 2", 100_000.0, 28),
        ],
        contributions: vec![
            contribution("seed-1", "inc-new-jobs", 6.0, "kickoff week", 72),
            contribution("seed-2", "inc-reviews", 9.0, "follow-up calls", 30),
            contribution("seed-3", "inc-sales-t2", 18_500.0, "Henderson contract", 20),
            contribution("seed-4", "inc-new-jobs", -1.0, "duplicate entry removed", 6),
        ],
    }
}
