use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension,
    extract::{Form, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use warbler_db::Database;
use warbler_db::queries::is_unique_violation;
use warbler_types::forms::{FieldError, FormErrors, LoginForm, UserAddForm};

use crate::error::AppError;
use crate::pages;
use crate::session::{self, Session};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

pub async fn signup_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = session::take_flash(jar);
    (
        jar,
        Html(pages::signup_page(None, &FormErrors::default(), flash.as_deref())),
    )
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UserAddForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        return Ok(Html(pages::signup_page(Some(&form), &errors, None)).into_response());
    }

    let password_hash = hash_password(&form.password)?;
    let user_id = Uuid::new_v4();

    let db = state.clone();
    let uid = user_id.to_string();
    let username = form.username.clone();
    let email = form.email.clone();
    let image_url = form.image_url.clone();
    let created = crate::blocking(move || {
        db.db.create_user(
            &uid,
            &username,
            &email,
            &password_hash,
            image_url.as_deref().filter(|url| !url.is_empty()),
        )
    })
    .await?;

    if let Err(err) = created {
        if is_unique_violation(&err) {
            let errors = FormErrors(vec![FieldError {
                field: "username",
                message: "Username already taken.".to_string(),
            }]);
            return Ok(Html(pages::signup_page(Some(&form), &errors, None)).into_response());
        }
        return Err(AppError::Database(err));
    }

    let jar = session::open_session(&state, jar, user_id).await?;
    Ok((jar, session::redirect("/")).into_response())
}

pub async fn login_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = session::take_flash(jar);
    (
        jar,
        Html(pages::login_page(None, &FormErrors::default(), flash.as_deref())),
    )
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        return Ok(Html(pages::login_page(Some(&form), &errors, None)).into_response());
    }

    let db = state.clone();
    let username = form.username.clone();
    let user = match crate::blocking(move || db.db.get_user_by_username(&username)).await?? {
        Some(user) if verify_password(&form.password, &user.password) => user,
        // Same rendering for unknown user and bad password.
        _ => {
            return Ok(Html(pages::login_page(
                Some(&form),
                &FormErrors::default(),
                Some("Invalid credentials."),
            ))
            .into_response());
        }
    };

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| AppError::Database(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let jar = session::open_session(&state, jar, user_id).await?;
    Ok((jar, session::redirect("/")).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<Session>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.user().is_none() {
        let (jar, resp) = session::flash_redirect(jar, "/", session::ACCESS_UNAUTHORIZED);
        return Ok((jar, resp).into_response());
    }

    let jar = session::close_session(&state, jar).await?;
    let (jar, resp) = session::flash_redirect(jar, "/login", "You have successfully logged out.");
    Ok((jar, resp).into_response())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
