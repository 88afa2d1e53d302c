//! Cookie sessions and flash notices.
//!
//! The session cookie carries an opaque id; the matching row in the
//! `sessions` table is the single marker of who is logged in. Middleware
//! resolves it once per request into a [`Session`] extension so every
//! authorization check works from an explicit value instead of ambient
//! state.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "warbler_session";
pub const FLASH_COOKIE: &str = "flash";

/// The notice shown whenever an unauthenticated or non-owner request tries
/// to mutate state.
pub const ACCESS_UNAUTHORIZED: &str = "Access unauthorized.";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<CurrentUser>,
}

impl Session {
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }
}

/// Resolve the session cookie to the acting user and stash the result in
/// request extensions. Always inserts a [`Session`], present user or not.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let jar = CookieJar::from_headers(req.headers());

    let user = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            // Blocking session lookup runs off the async runtime
            let db = state.clone();
            let session_id = cookie.value().to_string();
            tokio::task::spawn_blocking(move || db.db.get_session_user(&session_id))
                .await
                .map_err(|e| {
                    error!("spawn_blocking join error: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                })?
                .map_err(|e| {
                    error!("session lookup failed: {:#}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                })?
                .and_then(|row| match row.id.parse::<Uuid>() {
                    Ok(id) => Some(CurrentUser { id, username: row.username }),
                    Err(e) => {
                        warn!("Corrupt user id '{}' on session: {}", row.id, e);
                        None
                    }
                })
        }
        None => None,
    };

    req.extensions_mut().insert(Session { user });
    Ok(next.run(req).await)
}

/// Open a session for a freshly authenticated user and attach its cookie.
pub async fn open_session(
    state: &AppState,
    jar: CookieJar,
    user_id: Uuid,
) -> Result<CookieJar, AppError> {
    let session_id = Uuid::new_v4().to_string();

    let db = state.clone();
    let sid = session_id.clone();
    let uid = user_id.to_string();
    crate::blocking(move || db.db.create_session(&sid, &uid)).await??;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .build();
    Ok(jar.add(cookie))
}

/// Drop the session row (if any) and clear the cookie.
pub async fn close_session(state: &AppState, jar: CookieJar) -> Result<CookieJar, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let db = state.clone();
        let sid = cookie.value().to_string();
        crate::blocking(move || db.db.delete_session(&sid)).await??;
    }
    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/").build()))
}

/// 302 Found, the redirect status the original browser flows use.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

/// Redirect while queueing a one-shot notice for the next rendered page.
pub fn flash_redirect(jar: CookieJar, to: &str, notice: &str) -> (CookieJar, Response) {
    let cookie = Cookie::build((FLASH_COOKIE, urlencoding::encode(notice).into_owned()))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), redirect(to))
}

/// Consume the pending flash notice, removing its cookie.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let notice = urlencoding::decode(cookie.value())
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| cookie.value().to_string());
            let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/").build());
            (jar, Some(notice))
        }
        None => (jar, None),
    }
}
