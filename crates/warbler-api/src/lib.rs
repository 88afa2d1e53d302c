pub mod auth;
pub mod error;
pub mod likes;
pub mod messages;
pub mod pages;
pub mod session;
pub mod users;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tracing::error;

use crate::auth::AppState;
use crate::error::AppError;

/// rusqlite is synchronous; run repository calls off the async runtime.
/// The closure's own `Result` is returned as a value so callers can still
/// inspect the error (e.g. for unique-constraint handling).
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::Database(anyhow::anyhow!("blocking task failed: {}", e))
    })
}

pub fn router(state: AppState) -> Router {
    tracing::debug!("Creating application router");

    Router::new()
        .route("/", get(messages::home))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/messages/new",
            get(messages::new_message_page).post(messages::create_message),
        )
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route("/messages/{message_id}/like", post(likes::toggle_like))
        .route(
            "/users/profile",
            get(users::edit_profile_page).post(users::update_profile),
        )
        .route("/users/{user_id}", get(users::show_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::resolve_session,
        ))
        .with_state(state)
}
