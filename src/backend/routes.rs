use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/signin", post(handlers::sign_in))
        .route("/api/auth/signout", post(handlers::sign_out))
        .route("/api/me", get(handlers::me))
        .route(
            "/api/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/api/transactions/stream", get(handlers::transaction_stream))
        .route(
            "/api/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route(
            "/api/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/api/budgets/:id", axum::routing::delete(handlers::delete_budget))
        .route("/api/goals", get(handlers::list_goals).post(handlers::create_goal))
        .route("/api/goals/:id/contributions", post(handlers::contribute))
        .route("/api/goals/:id", axum::routing::delete(handlers::delete_goal))
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/api/dashboard", get(handlers::dashboard))
}
