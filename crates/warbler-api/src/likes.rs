use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::AppError;
use crate::session::{self, ACCESS_UNAUTHORIZED, Session};

/// Toggle the acting user's like on a message: adds it when absent,
/// removes it when present.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    Path(message_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    };

    let db = state.clone();
    let mid = message_id.to_string();
    crate::blocking(move || db.db.get_message(&mid))
        .await??
        .ok_or(AppError::NotFound)?;

    let like_id = Uuid::new_v4();
    let db = state.clone();
    let lid = like_id.to_string();
    let mid = message_id.to_string();
    let uid = user.id.to_string();
    let added = crate::blocking(move || db.db.toggle_like(&lid, &mid, &uid)).await??;

    debug!(
        "user {} {} message {}",
        user.id,
        if added { "liked" } else { "unliked" },
        message_id
    );

    Ok(session::redirect("/"))
}
