// src/services/login.rs

//! Login form discovery.
//!
//! Finds the first form on a login page that has a password input, keeps
//! every named field's default value (hidden tokens included) and fills in
//! the configured credentials.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::LoginConfig;
use crate::utils::resolve_url;

/// Field names tried, in order, for the username.
const USER_FIELD_CANDIDATES: [&str; 4] = ["username", "user", "email", "login"];

/// A filled-in login form ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Absolute submission URL
    pub action: String,
    /// Url-encoded form fields, in document order
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }
}

/// Build the login submission from the page HTML.
///
/// Returns `None` when no form with a usable password field exists.
pub fn build_login_form(html: &str, page_url: &Url, login: &LoginConfig) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let form_sel = Selector::parse("form").ok()?;
    let input_sel = Selector::parse("input").ok()?;

    for form in document.select(&form_sel) {
        let inputs: Vec<ElementRef> = form.select(&input_sel).collect();

        let Some(password_field) = inputs
            .iter()
            .find(|input| input_type(input) == "password")
            .and_then(|input| input.value().attr("name"))
        else {
            continue;
        };

        let mut fields = Vec::new();
        for input in &inputs {
            if let Some(name) = input.value().attr("name") {
                let value = input.value().attr("value").unwrap_or("");
                fields.push((name.to_string(), value.to_string()));
            }
        }

        let Some(user_field) = detect_user_field(&inputs) else {
            continue;
        };

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => resolve_url(page_url, action),
            _ => page_url.to_string(),
        };

        let mut submission = LoginForm { action, fields };
        submission.set(&user_field, &login.username);
        submission.set(password_field, &login.password);
        for (name, value) in &login.extra {
            submission.set(name, value);
        }
        return Some(submission);
    }

    None
}

fn input_type(input: &ElementRef) -> String {
    input
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

/// Username field: a well-known name first, else the first visible
/// non-password field.
fn detect_user_field(inputs: &[ElementRef]) -> Option<String> {
    let names: Vec<(&str, String)> = inputs
        .iter()
        .filter_map(|input| input.value().attr("name").map(|name| (name, input_type(input))))
        .collect();

    for candidate in USER_FIELD_CANDIDATES {
        if let Some((name, _)) = names
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(candidate))
        {
            return Some(name.to_string());
        }
    }

    names
        .iter()
        .find(|(name, kind)| {
            !name.to_lowercase().contains("pass")
                && !matches!(kind.as_str(), "hidden" | "submit" | "button" | "checkbox")
        })
        .map(|(name, _)| name.to_string())
}
