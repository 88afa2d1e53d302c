use axum::{
    Extension,
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use warbler_db::models::MessageRow;
use warbler_types::forms::{FormErrors, MessageForm};
use warbler_types::models::Message;

use crate::auth::AppState;
use crate::error::AppError;
use crate::pages;
use crate::session::{self, ACCESS_UNAUTHORIZED, Session};

pub async fn home(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, flash) = session::take_flash(jar);

    let db = state.clone();
    let rows = crate::blocking(move || db.db.recent_messages(100)).await??;
    let messages: Vec<Message> = rows.into_iter().map(to_view).collect();

    Ok((
        jar,
        Html(pages::home_page(current.user(), flash.as_deref(), &messages)),
    ))
}

pub async fn new_message_page(
    Extension(current): Extension<Session>,
    jar: CookieJar,
) -> Response {
    let Some(user) = current.user() else {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return (jar, resp).into_response();
    };

    Html(pages::new_message_page(Some(user), "", &FormErrors::default())).into_response()
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    };

    // Invalid text re-renders the submission page; nothing is persisted.
    if let Err(errors) = form.validate() {
        return Ok(Html(pages::new_message_page(Some(user), &form.text, &errors)).into_response());
    }

    let message_id = Uuid::new_v4();
    let db = state.clone();
    let mid = message_id.to_string();
    let uid = user.id.to_string();
    let text = form.text.clone();
    crate::blocking(move || db.db.insert_message(&mid, &uid, &text)).await??;

    Ok(session::redirect(&format!("/users/{}", user.id)))
}

pub async fn show_message(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    Path(message_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let db = state.clone();
    let mid = message_id.to_string();
    let row = crate::blocking(move || db.db.get_message(&mid))
        .await??
        .ok_or(AppError::NotFound)?;

    let (jar, flash) = session::take_flash(jar);
    let message = to_view(row);

    Ok((
        jar,
        Html(pages::message_page(current.user(), flash.as_deref(), &message)),
    )
        .into_response())
}

pub async fn delete_message(
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
    let row = crate::blocking(move || db.db.get_message(&mid))
        .await??
        .ok_or(AppError::NotFound)?;

    // Only the owner may delete.
    if row.user_id != user.id.to_string() {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    }

    let db = state.clone();
    crate::blocking(move || db.db.delete_message(&row.id)).await??;
    Ok(session::redirect(&format!("/users/{}", user.id)))
}

/// Map a DB row to the view model, tolerating corrupt rows the same way the
/// rest of the app does: log and degrade rather than fail the whole page.
pub(crate) fn to_view(row: MessageRow) -> Message {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt message id '{}': {}", row.id, e);
        Uuid::default()
    });
    let user_id = row.user_id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user_id '{}' on message '{}': {}", row.user_id, row.id, e);
        Uuid::default()
    });
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on message '{}'", row.created_at, row.id);
        DateTime::default()
    });

    Message {
        id,
        user_id,
        username: row.username,
        text: row.text,
        created_at,
        like_count: usize::try_from(row.like_count).unwrap_or(0),
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Accept RFC 3339 as well, parse naive values as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
                .ok()
        })
}
