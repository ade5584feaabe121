use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::csrf::CsrfGuard;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_DATE: &str = "Not a valid date value.";

// Error messages keyed by form field name
pub type FieldErrors = BTreeMap<&'static str, String>;

pub trait Validate {
    type Valid;

    fn validate(&self, csrf: &CsrfGuard) -> Result<Self::Valid, FieldErrors>;
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, REQUIRED.to_string());
    }
}

fn csrf_token(errors: &mut FieldErrors, csrf: &CsrfGuard, token: &str) {
    if let Some(message) = csrf.check(token) {
        errors.insert("csrf_token", message.to_string());
    }
}

fn finish<T>(errors: FieldErrors, valid: impl FnOnce() -> T) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(valid())
    } else {
        Err(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn validate_credentials(
    csrf: &CsrfGuard,
    token: &str,
    email: &str,
    password: &str,
) -> Result<Credentials, FieldErrors> {
    let mut errors = FieldErrors::new();
    csrf_token(&mut errors, csrf, token);
    required(&mut errors, "email", email);
    required(&mut errors, "password", password);
    finish(errors, || Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginSchema {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginSchema {
    type Valid = Credentials;

    fn validate(&self, csrf: &CsrfGuard) -> Result<Credentials, FieldErrors> {
        validate_credentials(csrf, &self.csrf_token, &self.email, &self.password)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterSchema {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for RegisterSchema {
    type Valid = Credentials;

    fn validate(&self, csrf: &CsrfGuard) -> Result<Credentials, FieldErrors> {
        validate_credentials(csrf, &self.csrf_token, &self.email, &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodoList {
    pub title: String,
    pub subtitle: String,
    pub date: NaiveDate,
}

// Struct representing the request body for creating a new todo list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoListSchema {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub date: String,
}

impl Validate for CreateTodoListSchema {
    type Valid = NewTodoList;

    fn validate(&self, csrf: &CsrfGuard) -> Result<NewTodoList, FieldErrors> {
        let mut errors = FieldErrors::new();
        csrf_token(&mut errors, csrf, &self.csrf_token);
        required(&mut errors, "title", &self.title);
        required(&mut errors, "subtitle", &self.subtitle);

        // A blank date fails to parse like any other malformed one
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d");
        if date.is_err() {
            errors.insert("date", INVALID_DATE.to_string());
        }

        match date {
            Ok(date) if errors.is_empty() => Ok(NewTodoList {
                title: self.title.clone(),
                subtitle: self.subtitle.clone(),
                date,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub todo_name: String,
    pub done: bool,
    pub text: String,
}

// Struct representing the request body for creating a new Todo
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoSchema {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub todo_name: String,
    // Checkbox: browsers omit the field entirely when unchecked
    pub done: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl CreateTodoSchema {
    pub fn is_done(&self) -> bool {
        self.done
            .as_deref()
            .map_or(false, |value| !matches!(value.trim(), "" | "false"))
    }
}

impl Validate for CreateTodoSchema {
    type Valid = NewTodo;

    fn validate(&self, csrf: &CsrfGuard) -> Result<NewTodo, FieldErrors> {
        let mut errors = FieldErrors::new();
        csrf_token(&mut errors, csrf, &self.csrf_token);
        required(&mut errors, "todo_name", &self.todo_name);
        required(&mut errors, "text", &self.text);
        finish(errors, || NewTodo {
            todo_name: self.todo_name.clone(),
            done: self.is_done(),
            text: self.text.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::csrf::{CsrfKey, INVALID_TOKEN, MISSING_TOKEN};

    const NONCE: &str = "nonce";

    #[fixture]
    fn key() -> CsrfKey {
        CsrfKey::new("secret")
    }

    fn guard(key: &CsrfKey) -> CsrfGuard<'_> {
        CsrfGuard::new(key, Some(NONCE.to_string()))
    }

    #[rstest]
    #[case("", "pw", &["email"])]
    #[case("a@x.com", "", &["password"])]
    #[case("   ", "\t", &["email", "password"])]
    fn login_requires_both_fields(
        key: CsrfKey,
        #[case] email: &str,
        #[case] password: &str,
        #[case] missing: &[&str],
    ) {
        let form = LoginSchema {
            csrf_token: key.sign(NONCE),
            email: email.to_string(),
            password: password.to_string(),
        };
        let errors = form.validate(&guard(&key)).unwrap_err();
        let fields: Vec<_> = errors.keys().copied().collect();
        assert_eq!(fields, missing);
        assert!(errors.values().all(|message| message == REQUIRED));
    }

    #[rstest]
    fn register_accepts_filled_form(key: CsrfKey) {
        let form = RegisterSchema {
            csrf_token: key.sign(NONCE),
            email: " a@x.com ".to_string(),
            password: "pw1".to_string(),
        };
        assert_eq!(
            form.validate(&guard(&key)).unwrap(),
            Credentials {
                email: "a@x.com".to_string(),
                password: "pw1".to_string(),
            }
        );
    }

    #[rstest]
    #[case("", MISSING_TOKEN)]
    #[case("forged", INVALID_TOKEN)]
    fn every_form_checks_the_csrf_token(
        key: CsrfKey,
        #[case] token: &str,
        #[case] message: &str,
    ) {
        let guard = guard(&key);
        let login = LoginSchema {
            csrf_token: token.to_string(),
            email: "a@x.com".to_string(),
            password: "pw".to_string(),
        };
        let list = CreateTodoListSchema {
            csrf_token: token.to_string(),
            title: "Groceries".to_string(),
            subtitle: "weekly".to_string(),
            date: "2026-10-18".to_string(),
        };
        let todo = CreateTodoSchema {
            csrf_token: token.to_string(),
            todo_name: "Milk".to_string(),
            done: None,
            text: "2 litres".to_string(),
        };

        for errors in [
            login.validate(&guard).unwrap_err(),
            list.validate(&guard).unwrap_err(),
            todo.validate(&guard).unwrap_err(),
        ] {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors["csrf_token"], message);
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("18/10/2026")]
    #[case("2026-02-30")]
    fn list_date_must_be_iso(key: CsrfKey, #[case] date: &str) {
        let form = CreateTodoListSchema {
            csrf_token: key.sign(NONCE),
            title: "Groceries".to_string(),
            subtitle: "weekly".to_string(),
            date: date.to_string(),
        };
        let errors = form.validate(&guard(&key)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["date"], INVALID_DATE);
    }

    #[rstest]
    fn list_collects_every_missing_field(key: CsrfKey) {
        let form = CreateTodoListSchema {
            csrf_token: key.sign(NONCE),
            ..Default::default()
        };
        let errors = form.validate(&guard(&key)).unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            ["date", "subtitle", "title"]
        );
    }

    #[rstest]
    fn list_parses_date(key: CsrfKey) {
        let form = CreateTodoListSchema {
            csrf_token: key.sign(NONCE),
            title: "Groceries".to_string(),
            subtitle: "weekly".to_string(),
            date: "2026-10-18".to_string(),
        };
        let list = form.validate(&guard(&key)).unwrap();
        assert_eq!(list.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(""), false)]
    #[case(Some("false"), false)]
    #[case(Some("y"), true)]
    #[case(Some("on"), true)]
    fn todo_done_checkbox(key: CsrfKey, #[case] done: Option<&str>, #[case] expected: bool) {
        let form = CreateTodoSchema {
            csrf_token: key.sign(NONCE),
            todo_name: "Milk".to_string(),
            done: done.map(str::to_string),
            text: "2 litres".to_string(),
        };
        assert_eq!(form.validate(&guard(&key)).unwrap().done, expected);
    }

    #[rstest]
    fn todo_requires_name_and_text(key: CsrfKey) {
        let form = CreateTodoSchema {
            csrf_token: key.sign(NONCE),
            ..Default::default()
        };
        let errors = form.validate(&guard(&key)).unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            ["text", "todo_name"]
        );
    }
}
