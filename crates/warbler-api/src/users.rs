use axum::{
    Extension,
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::DateTime;
use tracing::warn;
use uuid::Uuid;

use warbler_db::models::UserRow;
use warbler_db::queries::is_unique_violation;
use warbler_types::forms::{FieldError, FormErrors, UserUpdateForm};
use warbler_types::models::{Message, User};

use crate::auth::{self, AppState};
use crate::error::AppError;
use crate::messages::{parse_timestamp, to_view};
use crate::pages;
use crate::session::{self, ACCESS_UNAUTHORIZED, Session};

pub async fn show_user(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let db = state.clone();
    let uid = user_id.to_string();
    let row = crate::blocking(move || db.db.get_user_by_id(&uid))
        .await??
        .ok_or(AppError::NotFound)?;

    let db = state.clone();
    let owner_id = row.id.clone();
    let rows = crate::blocking(move || db.db.messages_for_user(&owner_id)).await??;
    let messages: Vec<Message> = rows.into_iter().map(to_view).collect();

    let (jar, flash) = session::take_flash(jar);
    let profile = to_profile(row);

    Ok((
        jar,
        Html(pages::user_page(
            current.user(),
            flash.as_deref(),
            &profile,
            &messages,
        )),
    )
        .into_response())
}

pub async fn edit_profile_page(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    };

    let db = state.clone();
    let uid = user.id.to_string();
    let row = crate::blocking(move || db.db.get_user_by_id(&uid))
        .await??
        .ok_or(AppError::NotFound)?;

    let form = UserUpdateForm {
        username: row.username,
        email: row.email,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        password: String::new(),
    };

    Ok(Html(pages::edit_profile_page(user, &form, &FormErrors::default(), None)).into_response())
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<UserUpdateForm>,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    };

    if let Err(errors) = form.validate() {
        return Ok(Html(pages::edit_profile_page(user, &form, &errors, None)).into_response());
    }

    let db = state.clone();
    let uid = user.id.to_string();
    let row = crate::blocking(move || db.db.get_user_by_id(&uid))
        .await??
        .ok_or(AppError::NotFound)?;

    // Profile changes require the current password.
    if !auth::verify_password(&form.password, &row.password) {
        let (jar, resp) = session::flash_redirect(jar, "/", ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    }

    let db = state.clone();
    let username = form.username.clone();
    let email = form.email.clone();
    let image_url = form.image_url.clone();
    let header_image_url = form.header_image_url.clone();
    let bio = form.bio.clone();
    let updated = crate::blocking(move || {
        db.db.update_user(
            &row.id,
            &username,
            &email,
            &image_url,
            &header_image_url,
            bio.as_deref().filter(|bio| !bio.is_empty()),
        )
    })
    .await?;

    if let Err(err) = updated {
        if is_unique_violation(&err) {
            let errors = FormErrors(vec![FieldError {
                field: "username",
                message: "Username already taken.".to_string(),
            }]);
            return Ok(Html(pages::edit_profile_page(user, &form, &errors, None)).into_response());
        }
        return Err(AppError::Database(err));
    }

    Ok(session::redirect(&format!("/users/{}", user.id)))
}

fn to_profile(row: UserRow) -> User {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("Corrupt user id '{}': {}", row.id, e);
        Uuid::default()
    });
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on user '{}'", row.created_at, row.id);
        DateTime::default()
    });

    User {
        id,
        username: row.username,
        email: row.email,
        image_url: Some(row.image_url),
        header_image_url: Some(row.header_image_url),
        bio: row.bio,
        created_at,
    }
}
