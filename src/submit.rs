use crate::models::{
    Contribution, CreateIncentiveRequest, Incentive, NewContribution, NewIncentive, SubmitRequest,
    SubmitResponse, LOCAL_ID_PREFIX,
};
use crate::state::AppState;
use crate::store::StoreError;
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A rejected write is rolled back, not retried.
pub async fn submit_contribution(
    state: &AppState,
    request: SubmitRequest,
) -> Result<SubmitResponse, SubmitError> {
    let incentive_id = request.incentive_id.trim().to_string();
    if incentive_id.is_empty() {
        return Err(SubmitError::Invalid("incentive_id must not be empty".to_string()));
    }

    let Some(value) = parse_amount(&request.amount) else {
        return Err(SubmitError::Invalid(
            "amount must be a nonzero finite number".to_string(),
        ));
    };
    // The flag decides the direction; the input's own sign is ignored.
    let delta = if request.deduction {
        -value.abs()
    } else {
        value.abs()
    };

    let note = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(String::from);

    let key = Uuid::new_v4().to_string();
    let placeholder = Contribution {
        id: format!("{LOCAL_ID_PREFIX}{key}"),
        incentive_id: incentive_id.clone(),
        amount: delta,
        note: note.clone(),
        created_at: Utc::now(),
        client_key: Some(key.clone()),
    };

    // The lock is released before the store write so feed events keep applying.
    {
        let mut board = state.board.lock().await;
        board.apply_local(placeholder.clone());
    }

    let new = NewContribution {
        incentive_id,
        amount: delta,
        note,
        client_key: key,
    };

    match state.store.insert_contribution(new).await {
        Ok(confirmed) => {
            let mut board = state.board.lock().await;
            board.confirm(&placeholder.id, confirmed.clone());
            let total = board.total_for(&confirmed.incentive_id);
            Ok(SubmitResponse {
                contribution: confirmed,
                total,
            })
        }
        Err(err) => {
            let mut board = state.board.lock().await;
            board.rollback(&placeholder);
            Err(SubmitError::Store(err))
        }
    }
}

pub async fn create_incentive(
    state: &AppState,
    request: CreateIncentiveRequest,
) -> Result<Incentive, SubmitError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(SubmitError::Invalid("name must not be empty".to_string()));
    }
    if !request.target.is_finite() || request.target <= 0.0 {
        return Err(SubmitError::Invalid(
            "target must be a positive number".to_string(),
        ));
    }

    let created = state
        .store
        .insert_incentive(NewIncentive {
            name,
            target: request.target,
        })
        .await?;

    let mut board = state.board.lock().await;
    board.push_incentive(created.clone());
    Ok(created)
}

pub fn parse_amount(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (value.is_finite() && value != 0.0).then_some(value)
}
