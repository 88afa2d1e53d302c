//! Server-rendered HTML. Pages are plain strings assembled with
//! `html_escape` for user content; no template engine.

use html_escape::{encode_double_quoted_attribute, encode_text};
use warbler_types::forms::{FormErrors, LoginForm, UserAddForm, UserUpdateForm};
use warbler_types::models::{Message, User};

use crate::session::CurrentUser;

fn layout(title: &str, viewer: Option<&CurrentUser>, flash: Option<&str>, body: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            r#"<a href="/users/{id}">@{name}</a>
            <a href="/messages/new">New message</a>
            <form method="POST" action="/logout" class="inline"><button>Log out</button></form>"#,
            id = user.id,
            name = encode_text(&user.username),
        ),
        None => r#"<a href="/login">Log in</a> <a href="/signup">Sign up</a>"#.to_string(),
    };

    let notice = flash
        .map(|msg| format!(r#"<div class="flash">{}</div>"#, encode_text(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} | Warbler</title></head>
<body>
<nav><a href="/">Warbler</a> {nav}</nav>
{notice}
<main>
{body}
</main>
</body>
</html>"#,
        title = encode_text(title),
    )
}

fn field_error(errors: &FormErrors, field: &str) -> String {
    errors
        .for_field(field)
        .map(|msg| format!(r#"<span class="form-error">{}</span>"#, encode_text(msg)))
        .unwrap_or_default()
}

fn message_item(message: &Message) -> String {
    format!(
        r#"<li class="message">
  <a href="/messages/{id}">{text}</a>
  <a href="/users/{user_id}">@{username}</a>
  <span class="likes">{likes}</span>
</li>"#,
        id = message.id,
        text = encode_text(&message.text),
        user_id = message.user_id,
        username = encode_text(&message.username),
        likes = message.like_count,
    )
}

fn message_list(messages: &[Message]) -> String {
    let items: String = messages.iter().map(message_item).collect();
    format!("<ul class=\"messages\">\n{items}\n</ul>")
}

pub fn home_page(viewer: Option<&CurrentUser>, flash: Option<&str>, messages: &[Message]) -> String {
    let body = message_list(messages);
    layout("Home", viewer, flash, &body)
}

pub fn message_page(viewer: Option<&CurrentUser>, flash: Option<&str>, message: &Message) -> String {
    let mut actions = String::new();
    if let Some(user) = viewer {
        actions.push_str(&format!(
            r#"<form method="POST" action="/messages/{}/like"><button>Like</button></form>"#,
            message.id,
        ));
        if user.id == message.user_id {
            actions.push_str(&format!(
                r#"<form method="POST" action="/messages/{}/delete"><button>Delete</button></form>"#,
                message.id,
            ));
        }
    }

    let body = format!(
        r#"<article class="message-detail">
<p>{text}</p>
<p><a href="/users/{user_id}">@{username}</a> — {likes} likes</p>
{actions}
</article>"#,
        text = encode_text(&message.text),
        user_id = message.user_id,
        username = encode_text(&message.username),
        likes = message.like_count,
    );
    layout("Message", viewer, flash, &body)
}

pub fn new_message_page(viewer: Option<&CurrentUser>, text: &str, errors: &FormErrors) -> String {
    let body = format!(
        r#"<form method="POST" action="/messages/new">
  <textarea name="text" placeholder="What's happening?">{text}</textarea>
  {error}
  <button>Add my message!</button>
</form>"#,
        text = encode_text(text),
        error = field_error(errors, "text"),
    );
    layout("New message", viewer, None, &body)
}

pub fn signup_page(form: Option<&UserAddForm>, errors: &FormErrors, notice: Option<&str>) -> String {
    let (username, email, image_url) = match form {
        Some(f) => (
            f.username.as_str(),
            f.email.as_str(),
            f.image_url.as_deref().unwrap_or(""),
        ),
        None => ("", "", ""),
    };

    let body = format!(
        r#"<h2>Join Warbler today.</h2>
<form method="POST" action="/signup">
  <input name="username" placeholder="Username" value="{username}"> {e_username}
  <input name="email" placeholder="E-mail" value="{email}"> {e_email}
  <input name="password" type="password" placeholder="Password"> {e_password}
  <input name="image_url" placeholder="(Optional) Image URL" value="{image_url}">
  <button>Sign me up!</button>
</form>"#,
        username = encode_double_quoted_attribute(username),
        email = encode_double_quoted_attribute(email),
        image_url = encode_double_quoted_attribute(image_url),
        e_username = field_error(errors, "username"),
        e_email = field_error(errors, "email"),
        e_password = field_error(errors, "password"),
    );
    layout("Sign up", None, notice, &body)
}

pub fn login_page(form: Option<&LoginForm>, errors: &FormErrors, notice: Option<&str>) -> String {
    let username = form.map(|f| f.username.as_str()).unwrap_or("");

    let body = format!(
        r#"<h2>Welcome back.</h2>
<form method="POST" action="/login">
  <input name="username" placeholder="Username" value="{username}"> {e_username}
  <input name="password" type="password" placeholder="Password"> {e_password}
  <button>Log in</button>
</form>"#,
        username = encode_double_quoted_attribute(username),
        e_username = field_error(errors, "username"),
        e_password = field_error(errors, "password"),
    );
    layout("Log in", None, notice, &body)
}

pub fn user_page(
    viewer: Option<&CurrentUser>,
    flash: Option<&str>,
    profile: &User,
    messages: &[Message],
) -> String {
    let bio = profile
        .bio
        .as_deref()
        .map(|bio| format!("<p class=\"bio\">{}</p>", encode_text(bio)))
        .unwrap_or_default();

    let edit_link = match viewer {
        Some(user) if user.id == profile.id => {
            r#"<a href="/users/profile">Edit profile</a>"#.to_string()
        }
        _ => String::new(),
    };

    let body = format!(
        r#"<header class="profile">
  <img src="{image}" alt="">
  <h2>@{username}</h2>
  {bio}
  {edit_link}
</header>
{messages}"#,
        image = encode_double_quoted_attribute(profile.image_url.as_deref().unwrap_or("")),
        username = encode_text(&profile.username),
        messages = message_list(messages),
    );
    layout(&profile.username, viewer, flash, &body)
}

pub fn edit_profile_page(
    viewer: &CurrentUser,
    form: &UserUpdateForm,
    errors: &FormErrors,
    notice: Option<&str>,
) -> String {
    let body = format!(
        r#"<h2>Edit your profile.</h2>
<form method="POST" action="/users/profile">
  <input name="username" placeholder="Username" value="{username}"> {e_username}
  <input name="email" placeholder="E-mail" value="{email}"> {e_email}
  <input name="image_url" placeholder="Image" value="{image_url}"> {e_image}
  <input name="header_image_url" placeholder="Header Image" value="{header_image_url}"> {e_header}
  <textarea name="bio" placeholder="Bio">{bio}</textarea> {e_bio}
  <input name="password" type="password" placeholder="Enter your password"> {e_password}
  <button>Save changes</button>
</form>"#,
        username = encode_double_quoted_attribute(&form.username),
        email = encode_double_quoted_attribute(&form.email),
        image_url = encode_double_quoted_attribute(&form.image_url),
        header_image_url = encode_double_quoted_attribute(&form.header_image_url),
        bio = encode_text(form.bio.as_deref().unwrap_or("")),
        e_username = field_error(errors, "username"),
        e_email = field_error(errors, "email"),
        e_image = field_error(errors, "image_url"),
        e_header = field_error(errors, "header_image_url"),
        e_bio = field_error(errors, "bio"),
        e_password = field_error(errors, "password"),
    );
    layout("Edit profile", Some(viewer), notice, &body)
}

pub fn not_found_page() -> String {
    layout("Not found", None, None, "<p>Sorry, that page does not exist.</p>")
}

pub fn error_page() -> String {
    layout(
        "Error",
        None,
        None,
        "<p>Something went wrong on our end. Please try again.</p>",
    )
}
