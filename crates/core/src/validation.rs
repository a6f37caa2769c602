//! Client-side form validation
//!
//! Every form is checked before anything is sent to the backend. Errors are
//! collected per field so the UI can show each one next to its input.

use crate::types::ContactForm;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

const REQUIRED: &str = "This field is required";
const NOT_ALLOWED: &str = "This character is not allowed";

/// Characters accepted as the "special" class in passwords
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PHONE_MIN_LEN: usize = 7;
pub const PHONE_MAX_LEN: usize = 15;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d+\-()]+$").expect("valid phone regex"));
static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ' -]+$").expect("valid city regex")
});

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All problems found in one form
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message recorded for `field`
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Credentials entered on the login screen
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

/// Fields of the sign-up screen
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !EMAIL_RE.is_match(self.email.trim()) {
            errors.add("email", "Enter a valid email address");
        }

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if let Some(message) = password_policy(&self.password) {
            errors.add("password", message);
        }

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }

        errors.into_result()
    }

    /// Credentials to log in with once registration succeeded
    pub fn login_form(&self) -> LoginForm {
        LoginForm::new(self.email.trim(), self.password.clone())
    }
}

/// First password rule `password` breaks, if any
pub fn password_policy(password: &str) -> Option<&'static str> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Some("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one digit.");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Some("Password must contain at least one special character.");
    }
    None
}

impl ContactForm {
    /// Check the form the same way for create and update
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", REQUIRED);
        }

        if self.telephones.is_empty() {
            errors.add("telephones", "At least one phone number is required");
        }

        let mut seen = HashSet::new();
        for (index, phone) in self.telephones.iter().enumerate() {
            let field = format!("telephones.{index}.number");
            let number = phone.number.as_str();
            let len = number.chars().count();

            if number.is_empty() {
                errors.add(field, REQUIRED);
            } else if len > PHONE_MAX_LEN {
                errors.add(field, "Value should be at most 15 characters");
            } else if len < PHONE_MIN_LEN {
                errors.add(field, "Value should be at least 7 characters");
            } else if !PHONE_RE.is_match(number) {
                errors.add(field, NOT_ALLOWED);
            } else if !seen.insert(number) {
                errors.add(field, "Duplicate telephone numbers are not allowed");
            }
        }

        if let Some(city) = self.city.as_deref()
            && !city.is_empty()
            && !CITY_RE.is_match(city)
        {
            errors.add("city", NOT_ALLOWED);
        }

        errors.into_result()
    }
}

/// Reject blank search queries, returning the trimmed query otherwise
pub fn validate_search_query(query: &str) -> Result<&str, ValidationErrors> {
    let query = query.trim();
    if query.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("q", "Search query is required.");
        return Err(errors);
    }
    Ok(query)
}
