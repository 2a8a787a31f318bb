use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::{NaiveDate, Utc};
use futures::{stream, Stream};
use serde::Deserialize;

use crate::auth::{SignInRequest, SignUpRequest};
use crate::backend::extract::{BearerToken, CurrentUser};
use crate::backend::AppState;
use crate::database::models::{Contribution, NewBudget, NewGoal, NewTransaction, SettingsPatch};
use crate::error::AppResult;

pub async fn health() -> &'static str {
    "Backend is running"
}

// ============= Auth =============

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state.auth.sign_up(&req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.auth.sign_in(&req).await?))
}

pub async fn sign_out(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<StatusCode> {
    state.auth.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

// ============= Transactions =============

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_transactions(&user.id).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewTransaction>,
) -> AppResult<impl IntoResponse> {
    let tx = state.store.add_transaction(&user.id, new).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.get_transaction(&user.id, &id).await?))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(new): Json<NewTransaction>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.update_transaction(&user.id, &id, new).await?))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete_transaction(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent events: one `snapshot` event with the full list on connect
/// and another after every change.
pub async fn transaction_stream(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let feed = state.store.subscribe_transactions(&user.id).await?;

    let events = stream::unfold((feed, true), |(mut feed, first)| async move {
        if !first && feed.changed().await.is_err() {
            return None;
        }
        let snapshot = feed.borrow_and_update().clone();
        let event = Event::default()
            .event("snapshot")
            .json_data(&*snapshot)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(event), (feed, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ============= Budgets =============

pub async fn list_budgets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.budget_progress(&user.id).await?))
}

pub async fn create_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewBudget>,
) -> AppResult<impl IntoResponse> {
    let budget = state.store.add_budget(&user.id, new).await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.remove_budget(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============= Goals =============

pub async fn list_goals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.goal_progress(&user.id).await?))
}

pub async fn create_goal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewGoal>,
) -> AppResult<impl IntoResponse> {
    let goal = state.store.add_goal(&user.id, new).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn contribute(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(contribution): Json<Contribution>,
) -> AppResult<impl IntoResponse> {
    let goal = state.store.contribute(&user.id, &id, contribution).await?;
    Ok(Json(crate::analytics::goal_progress(&goal)))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete_goal(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============= Settings & dashboard =============

pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.load_settings(&user).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(patch): Json<SettingsPatch>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.update_settings(&user, patch).await?))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Last day of the spending trend; defaults to today (UTC).
    pub today: Option<NaiveDate>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<impl IntoResponse> {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.store.dashboard(&user, today).await?))
}
