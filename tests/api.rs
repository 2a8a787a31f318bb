mod common;

use std::time::Duration;

use anyhow::Result;
use axum::body::{to_bytes, Body, BodyDataStream};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use finance_tracker::analytics::{BudgetProgress, Dashboard, GoalProgress};
use finance_tracker::auth::Session;
use finance_tracker::backend::router;
use finance_tracker::database::models::{Transaction, UserSettings};
use rust_decimal_macros::dec;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::memory_state;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Vec<u8>)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

async fn signed_up(app: &Router, email: &str) -> Result<Session> {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "password": "hunter22", "display_name": "Ada" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn health_needs_no_token() -> Result<()> {
    let app = router(memory_state().await?);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Backend is running");
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let app = router(memory_state().await?);

    let (status, body) = send(&app, Method::GET, "/api/transactions", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: Value = serde_json::from_slice(&body)?;
    assert!(error["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/api/me", Some("forged"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn auth_round_trip_over_http() -> Result<()> {
    let app = router(memory_state().await?);
    let session = signed_up(&app, "ada@example.com").await?;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-one" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/api/me", Some(&session.token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let me: Value = serde_json::from_slice(&body)?;
    assert_eq!(me["email"], "ada@example.com");

    let (status, _) =
        send(&app, Method::POST, "/api/auth/signout", Some(&session.token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/api/me", Some(&session.token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn transaction_crud_over_http() -> Result<()> {
    let app = router(memory_state().await?);
    let token = signed_up(&app, "ada@example.com").await?.token;
    let token = Some(token.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transactions",
        token,
        Some(json!({
            "date": "2024-03-04",
            "description": "Lunch",
            "category": "Food",
            "type": "Expense",
            "amount": 2500
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let created: Transaction = serde_json::from_slice(&body)?;
    assert_eq!(created.amount, dec!(2500));

    let uri = format!("/api/transactions/{}", created.id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        token,
        Some(json!({
            "date": "2024-03-04",
            "description": "Lunch with team",
            "category": "Food",
            "type": "Expense",
            "amount": 7200.5
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let updated: Transaction = serde_json::from_slice(&body)?;
    assert_eq!(updated.description, "Lunch with team");
    assert_eq!(updated.amount, dec!(7200.5));

    let (status, body) = send(&app, Method::GET, "/api/transactions", token, None).await?;
    assert_eq!(status, StatusCode::OK);
    let list: Vec<Transaction> = serde_json::from_slice(&body)?;
    assert_eq!(list.len(), 1);

    let (status, _) = send(&app, Method::DELETE, &uri, token, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, token, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/transactions",
        token,
        Some(json!({
            "date": "2024-03-04",
            "description": "",
            "category": "Food",
            "type": "Expense",
            "amount": 1
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn one_user_cannot_touch_another_users_records() -> Result<()> {
    let app = router(memory_state().await?);
    let ada = signed_up(&app, "ada@example.com").await?.token;
    let bob = signed_up(&app, "bob@example.com").await?.token;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/transactions",
        Some(&ada),
        Some(json!({
            "date": "2024-03-04",
            "description": "Rent",
            "category": "Bills",
            "type": "Expense",
            "amount": 20000
        })),
    )
    .await?;
    let tx: Transaction = serde_json::from_slice(&body)?;

    let uri = format!("/api/transactions/{}", tx.id);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, Method::GET, "/api/transactions", Some(&bob), None).await?;
    let list: Vec<Transaction> = serde_json::from_slice(&body)?;
    assert!(list.is_empty());
    Ok(())
}

#[tokio::test]
async fn budgets_goals_and_dashboard_over_http() -> Result<()> {
    let app = router(memory_state().await?);
    let token = signed_up(&app, "ada@example.com").await?.token;
    let token = Some(token.as_str());

    send(
        &app,
        Method::POST,
        "/api/transactions",
        token,
        Some(json!({
            "date": "2024-03-09",
            "description": "Market",
            "category": "Food",
            "type": "Expense",
            "amount": 3000
        })),
    )
    .await?;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/budgets",
        token,
        Some(json!({ "category": "Food", "limit": 12000 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = send(&app, Method::GET, "/api/budgets", token, None).await?;
    let budgets: Vec<BudgetProgress> = serde_json::from_slice(&body)?;
    assert_eq!(budgets[0].spent, dec!(3000));
    assert_eq!(budgets[0].percent, 25.0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/goals",
        token,
        Some(json!({ "title": "Bike", "target": 500 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let goal: Value = serde_json::from_slice(&body)?;
    let goal_id = goal["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/goals/{goal_id}/contributions"),
        token,
        Some(json!({ "amount": 800 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let progress: GoalProgress = serde_json::from_slice(&body)?;
    assert_eq!(progress.goal.saved, dec!(500));
    assert!(progress.completed);

    let (status, body) =
        send(&app, Method::GET, "/api/dashboard?today=2024-03-10", token, None).await?;
    assert_eq!(status, StatusCode::OK);
    let dash: Dashboard = serde_json::from_slice(&body)?;
    assert_eq!(dash.summary.expenses, dec!(3000));
    assert_eq!(dash.trend.len(), 7);
    assert_eq!(dash.trend[5].amount, dec!(3000));

    let (status, body) =
        send(&app, Method::GET, "/api/dashboard?today=-262143-01-01", token, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body)?;
    assert!(error["error"].as_str().is_some_and(|m| m.contains("out of range")));
    Ok(())
}

/// Reads body chunks until one whole server-sent event has arrived,
/// skipping keep-alive comments.
async fn next_event(body: &mut BodyDataStream) -> Result<String> {
    let mut text = String::new();
    loop {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("event stream ended"))??;
        text.push_str(std::str::from_utf8(&chunk)?);
        if let Some(end) = text.find("\n\n") {
            let event = text[..end].to_string();
            if !event.starts_with(':') {
                return Ok(event);
            }
            text.drain(..end + 2);
        }
    }
}

fn event_data(event: &str) -> Result<Vec<Transaction>> {
    let data: String = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    Ok(serde_json::from_str(&data)?)
}

#[tokio::test]
async fn transaction_stream_pushes_a_snapshot_per_change() -> Result<()> {
    let app = router(memory_state().await?);
    let session = signed_up(&app, "ada@example.com").await?;
    let token = Some(session.token.as_str());

    let (status, _) = send(&app, Method::GET, "/api/transactions/stream", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/transactions/stream")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()?
        .starts_with("text/event-stream"));
    let mut body = response.into_body().into_data_stream();

    let first = next_event(&mut body).await?;
    assert!(first.starts_with("event: snapshot"));
    assert!(event_data(&first)?.is_empty());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/transactions",
        token,
        Some(json!({
            "date": "2024-03-04",
            "description": "Groceries",
            "category": "Food",
            "type": "Expense",
            "amount": 4200
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let second = next_event(&mut body).await?;
    assert!(second.starts_with("event: snapshot"));
    let listed = event_data(&second)?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description, "Groceries");
    assert_eq!(listed[0].amount, dec!(4200));
    Ok(())
}

#[tokio::test]
async fn settings_patch_merges_over_defaults() -> Result<()> {
    let app = router(memory_state().await?);
    let token = signed_up(&app, "ada@example.com").await?.token;
    let token = Some(token.as_str());

    let (_, body) = send(&app, Method::GET, "/api/settings", token, None).await?;
    let initial: UserSettings = serde_json::from_slice(&body)?;
    assert_eq!(initial.currency, "NGN");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        token,
        Some(json!({ "currency": "EUR", "privacy": { "profileVisible": false, "dataSharing": true } })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let saved: UserSettings = serde_json::from_slice(&body)?;
    assert_eq!(saved.currency, "EUR");
    assert!(saved.privacy.data_sharing);
    assert_eq!(saved.language, "English");
    assert!(saved.updated_at.is_some());
    Ok(())
}
