//! Declarative form validation: each form is a mapping from field name to an
//! ordered list of rules. Rules run in order on submission; the first failing
//! rule supplies that field's error message. Optional fields accept absence
//! (or an empty submission) without error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), String> {
        match self {
            Rule::Required => {
                if value.trim().is_empty() {
                    Err("This field is required.".to_string())
                } else {
                    Ok(())
                }
            }
            Rule::Email => {
                if email_regex().is_match(value) {
                    Ok(())
                } else {
                    Err("Invalid email address.".to_string())
                }
            }
            Rule::MinLength(min) => {
                if value.chars().count() < *min {
                    Err(format!("Must be at least {} characters long.", min))
                } else {
                    Ok(())
                }
            }
            Rule::MaxLength(max) => {
                if value.chars().count() > *max {
                    Err(format!("Must be at most {} characters long.", max))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile")
    })
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub optional: bool,
    pub rules: &'static [Rule],
}

#[derive(Debug, Clone, Copy)]
pub struct FormDef {
    pub fields: &'static [FieldDef],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(pub Vec<FieldError>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == name)
            .map(|e| e.message.as_str())
    }
}

impl FormDef {
    /// Validate submitted values against this definition. `value_of` returns
    /// the submitted value for a field name, or `None` when the field was
    /// absent from the submission.
    pub fn validate<'a, F>(&self, value_of: F) -> Result<(), FormErrors>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut errors = Vec::new();

        for field in self.fields {
            let value = value_of(field.name).unwrap_or("");
            if field.optional && value.is_empty() {
                continue;
            }
            for rule in field.rules {
                if let Err(message) = rule.check(value) {
                    errors.push(FieldError { field: field.name, message });
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FormErrors(errors))
        }
    }
}

// -- Form definitions --

pub const MESSAGE_FORM: FormDef = FormDef {
    fields: &[FieldDef { name: "text", optional: false, rules: &[Rule::Required] }],
};

pub const USER_ADD_FORM: FormDef = FormDef {
    fields: &[
        FieldDef { name: "username", optional: false, rules: &[Rule::Required, Rule::MaxLength(30)] },
        FieldDef { name: "email", optional: false, rules: &[Rule::Required, Rule::Email] },
        FieldDef { name: "password", optional: false, rules: &[Rule::Required, Rule::MinLength(6)] },
        FieldDef { name: "image_url", optional: true, rules: &[] },
    ],
};

pub const LOGIN_FORM: FormDef = FormDef {
    fields: &[
        FieldDef { name: "username", optional: false, rules: &[Rule::Required] },
        FieldDef { name: "password", optional: false, rules: &[Rule::Required, Rule::MinLength(6)] },
    ],
};

pub const USER_UPDATE_FORM: FormDef = FormDef {
    fields: &[
        FieldDef { name: "username", optional: false, rules: &[Rule::Required, Rule::MaxLength(30)] },
        FieldDef { name: "email", optional: false, rules: &[Rule::Required, Rule::Email] },
        FieldDef { name: "image_url", optional: false, rules: &[Rule::Required] },
        FieldDef { name: "header_image_url", optional: false, rules: &[Rule::Required] },
        FieldDef { name: "bio", optional: true, rules: &[Rule::MaxLength(250)] },
        FieldDef { name: "password", optional: false, rules: &[Rule::Required, Rule::MinLength(12)] },
    ],
};

/// Logout carries no fields; the definition exists so the handler path is
/// uniform with every other submission.
pub const LOGOUT_FORM: FormDef = FormDef { fields: &[] };

/// Likes are a bare toggle with no submitted fields.
pub const LIKE_FORM: FormDef = FormDef { fields: &[] };

// -- Typed submissions --

fn present(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub text: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        MESSAGE_FORM.validate(|name| match name {
            "text" => present(&self.text),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserAddForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub image_url: Option<String>,
}

impl UserAddForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        USER_ADD_FORM.validate(|name| match name {
            "username" => present(&self.username),
            "email" => present(&self.email),
            "password" => present(&self.password),
            "image_url" => self.image_url.as_deref().and_then(present),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        LOGIN_FORM.validate(|name| match name {
            "username" => present(&self.username),
            "password" => present(&self.password),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserUpdateForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub header_image_url: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl UserUpdateForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        USER_UPDATE_FORM.validate(|name| match name {
            "username" => present(&self.username),
            "email" => present(&self.email),
            "image_url" => present(&self.image_url),
            "header_image_url" => present(&self.header_image_url),
            "bio" => self.bio.as_deref().and_then(present),
            "password" => present(&self.password),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_is_required() {
        let form = MessageForm { text: String::new() };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.for_field("text"), Some("This field is required."));

        let form = MessageForm { text: "   ".to_string() };
        assert!(form.validate().is_err());

        let form = MessageForm { text: "Hello".to_string() };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn signup_rejects_malformed_email() {
        let form = UserAddForm {
            username: "testuser".to_string(),
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
            image_url: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.for_field("email"), Some("Invalid email address."));
        assert!(errors.for_field("username").is_none());
    }

    #[test]
    fn signup_accepts_valid_input_without_image() {
        let form = UserAddForm {
            username: "testuser".to_string(),
            email: "test@test.com".to_string(),
            password: "secret1".to_string(),
            image_url: None,
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn signup_password_minimum_is_six() {
        let form = UserAddForm {
            username: "testuser".to_string(),
            email: "test@test.com".to_string(),
            password: "short".to_string(),
            image_url: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field("password"),
            Some("Must be at least 6 characters long.")
        );
    }

    #[test]
    fn username_capped_at_thirty_characters() {
        let form = UserAddForm {
            username: "x".repeat(31),
            email: "test@test.com".to_string(),
            password: "secret1".to_string(),
            image_url: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field("username"),
            Some("Must be at most 30 characters long.")
        );
    }

    #[test]
    fn update_password_minimum_is_twelve() {
        let form = UserUpdateForm {
            username: "testuser".to_string(),
            email: "test@test.com".to_string(),
            image_url: "/img.png".to_string(),
            header_image_url: "/header.png".to_string(),
            bio: None,
            password: "elevenchars".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field("password"),
            Some("Must be at least 12 characters long.")
        );
    }

    #[test]
    fn optional_bio_accepts_absence_but_enforces_cap() {
        let mut form = UserUpdateForm {
            username: "testuser".to_string(),
            email: "test@test.com".to_string(),
            image_url: "/img.png".to_string(),
            header_image_url: "/header.png".to_string(),
            bio: None,
            password: "longenoughpassword".to_string(),
        };
        assert!(form.validate().is_ok());

        form.bio = Some("b".repeat(251));
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field("bio"),
            Some("Must be at most 250 characters long.")
        );
    }

    #[test]
    fn rules_run_in_order_and_stop_at_first_failure() {
        // Empty email fails Required before the email-shape rule runs.
        let form = UserAddForm {
            username: "testuser".to_string(),
            email: String::new(),
            password: "secret1".to_string(),
            image_url: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.for_field("email"), Some("This field is required."));
    }

    #[test]
    fn empty_forms_always_validate() {
        assert!(LOGOUT_FORM.validate(|_| None).is_ok());
        assert!(LIKE_FORM.validate(|_| None).is_ok());
    }
}
