use crate::aggregate::recent_activity;
use crate::errors::AppError;
use crate::models::{
    ActivityEntry, CreateIncentiveRequest, DashboardResponse, Incentive, IncentiveProgress,
    SubmitRequest, SubmitResponse,
};
use crate::state::{AppState, Dashboard};
use crate::submit;
use crate::tiers::{build_tier_summary, percent_of, remaining_of};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_ACTIVITY_LIMIT: usize = 25;
const MAX_ACTIVITY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    limit: Option<usize>,
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let board = state.board.lock().await;
    let incentives = board
        .incentives
        .iter()
        .map(|incentive| progress_row(incentive, board.total_for(&incentive.id)))
        .collect();
    let tiers = build_tier_summary(&board.incentives, &board.totals, &state.tiers);
    let recent_activity = activity_entries(&board, DEFAULT_ACTIVITY_LIMIT);

    Json(DashboardResponse {
        incentives,
        tiers,
        recent_activity,
    })
}

pub async fn get_incentives(State(state): State<AppState>) -> Json<Vec<Incentive>> {
    let board = state.board.lock().await;
    Json(board.incentives.clone())
}

pub async fn get_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<ActivityEntry>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .min(MAX_ACTIVITY_LIMIT);
    let board = state.board.lock().await;
    Json(activity_entries(&board, limit))
}

pub async fn post_contribution(
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let response = submit::submit_contribution(&state, payload).await?;
    Ok(Json(response))
}

pub async fn post_incentive(
    State(state): State<AppState>,
    Json(payload): Json<CreateIncentiveRequest>,
) -> Result<Json<Incentive>, AppError> {
    let created = submit::create_incentive(&state, payload).await?;
    Ok(Json(created))
}

fn progress_row(incentive: &Incentive, total: f64) -> IncentiveProgress {
    IncentiveProgress {
        id: incentive.id.clone(),
        name: incentive.name.clone(),
        target: incentive.target,
        total,
        percent: percent_of(total, incentive.target),
        remaining: remaining_of(total, incentive.target),
    }
}

fn activity_entries(board: &Dashboard, limit: usize) -> Vec<ActivityEntry> {
    let names: HashMap<&str, &str> = board
        .incentives
        .iter()
        .map(|incentive| (incentive.id.as_str(), incentive.name.as_str()))
        .collect();

    recent_activity(&board.logs, limit)
        .into_iter()
        .map(|contribution| ActivityEntry {
            incentive_name: names
                .get(contribution.incentive_id.as_str())
                .map(|name| (*name).to_string())
                .unwrap_or_else(|| contribution.incentive_id.clone()),
            id: contribution.id,
            incentive_id: contribution.incentive_id,
            amount: contribution.amount,
            note: contribution.note,
            created_at: contribution.created_at,
        })
        .collect()
}
