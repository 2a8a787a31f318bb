mod common;

use anyhow::Result;
use chrono::Duration;
use finance_tracker::auth::{AuthService, SignInRequest, SignUpRequest};
use finance_tracker::{app_state, open_database, AppError};

use common::{memory_config, memory_state, sign_up};

fn credentials(email: &str, password: &str) -> SignInRequest {
    SignInRequest {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn sign_up_then_sign_in_with_normalized_email() -> Result<()> {
    let state = memory_state().await?;
    let created = sign_up(&state, "Ada@Example.com ").await?;
    assert_eq!(created.user.email, "ada@example.com");
    assert_eq!(created.user.display_name.as_deref(), Some("Ada"));

    let session = state
        .auth
        .sign_in(&credentials("ADA@example.com", "hunter22"))
        .await?;
    assert_eq!(session.user.id, created.user.id);
    assert_ne!(session.token, created.token);

    // both sessions stay valid independently
    assert_eq!(state.auth.authenticate(&created.token).await?.id, created.user.id);
    assert_eq!(state.auth.authenticate(&session.token).await?.id, created.user.id);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<()> {
    let state = memory_state().await?;
    sign_up(&state, "ada@example.com").await?;
    let err = sign_up(&state, "ADA@example.com").await.unwrap_err();
    let err = err.downcast::<AppError>()?;
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn sign_up_validates_email_and_password() -> Result<()> {
    let state = memory_state().await?;
    let short = SignUpRequest {
        email: "ada@example.com".into(),
        password: "12345".into(),
        display_name: None,
    };
    assert!(matches!(state.auth.sign_up(&short).await, Err(AppError::Validation(_))));

    let bad_email = SignUpRequest {
        email: "not-an-email".into(),
        password: "hunter22".into(),
        display_name: None,
    };
    assert!(matches!(state.auth.sign_up(&bad_email).await, Err(AppError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let state = memory_state().await?;
    sign_up(&state, "ada@example.com").await?;

    let wrong = state.auth.sign_in(&credentials("ada@example.com", "nope-nope")).await;
    let unknown = state.auth.sign_in(&credentials("eve@example.com", "hunter22")).await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    Ok(())
}

#[tokio::test]
async fn sign_out_revokes_the_token_and_is_idempotent() -> Result<()> {
    let state = memory_state().await?;
    let session = sign_up(&state, "ada@example.com").await?;

    state.auth.sign_out(&session.token).await?;
    assert!(matches!(
        state.auth.authenticate(&session.token).await,
        Err(AppError::Unauthorized)
    ));
    state.auth.sign_out(&session.token).await?;
    state.auth.sign_out("garbage").await?;
    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_rejected_and_purged() -> Result<()> {
    let config = memory_config();
    let pool = open_database(&config).await?;
    let state = app_state(pool.clone(), &config);
    let expired = AuthService::new(pool, Duration::seconds(-1));
    let session = expired
        .sign_up(&SignUpRequest {
            email: "ada@example.com".into(),
            password: "hunter22".into(),
            display_name: None,
        })
        .await?;

    assert!(matches!(
        state.auth.authenticate(&session.token).await,
        Err(AppError::Unauthorized)
    ));
    assert_eq!(state.auth.purge_expired_sessions().await?, 1);
    assert_eq!(state.auth.purge_expired_sessions().await?, 0);
    Ok(())
}
