//! Credential checks done before handing off to the auth provider, and
//! friendly messages for the provider's error codes.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref UPPERCASE: Regex = Regex::new(r"[A-Z]").expect("valid regex");
    static ref LOWERCASE: Regex = Regex::new(r"[a-z]").expect("valid regex");
    static ref DIGIT: Regex = Regex::new(r"[0-9]").expect("valid regex");
    static ref SPECIAL: Regex = Regex::new(r"[^A-Za-z0-9\s]").expect("valid regex");
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Login,
    Signup,
}

/// Password strength rules, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl PasswordRule {
    pub const ALL: [PasswordRule; 5] = [
        PasswordRule::MinLength,
        PasswordRule::Uppercase,
        PasswordRule::Lowercase,
        PasswordRule::Digit,
        PasswordRule::Special,
    ];

    pub fn is_satisfied(&self, password: &str) -> bool {
        match self {
            PasswordRule::MinLength => password.chars().count() >= MIN_PASSWORD_LENGTH,
            PasswordRule::Uppercase => UPPERCASE.is_match(password),
            PasswordRule::Lowercase => LOWERCASE.is_match(password),
            PasswordRule::Digit => DIGIT.is_match(password),
            PasswordRule::Special => SPECIAL.is_match(password),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PasswordRule::MinLength => "Password must be at least 8 characters",
            PasswordRule::Uppercase => "Password must contain an uppercase letter",
            PasswordRule::Lowercase => "Password must contain a lowercase letter",
            PasswordRule::Digit => "Password must contain a number",
            PasswordRule::Special => "Password must contain a special character",
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required");
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err("Please enter a valid email address"),
    }
}

/// Returns every rule the password fails.
pub fn validate_password(password: &str) -> Vec<PasswordRule> {
    PasswordRule::ALL
        .into_iter()
        .filter(|rule| !rule.is_satisfied(password))
        .collect()
}

/// Human-readable failures for a login or sign-up attempt.
///
/// Password strength is only enforced on sign-up; a login only needs a
/// non-empty password.
pub fn validate_credentials(email: &str, password: &str, mode: AuthMode) -> Vec<String> {
    let mut errors = Vec::new();
    if let Err(e) = validate_email(email) {
        errors.push(e.to_string());
    }
    match mode {
        AuthMode::Login => {
            if password.is_empty() {
                errors.push("Password is required".to_string());
            }
        }
        AuthMode::Signup => errors.extend(
            validate_password(password)
                .iter()
                .map(|rule| rule.message().to_string()),
        ),
    }
    errors
}

/// Maps an auth provider error code to a message fit for the user.
pub fn auth_error_message(code: &str) -> &'static str {
    match code {
        "auth/invalid-email" => "Please enter a valid email address.",
        "auth/user-disabled" => "This account has been disabled.",
        "auth/user-not-found" => "No account found with this email.",
        "auth/wrong-password" | "auth/invalid-credential" => "Incorrect email or password.",
        "auth/email-already-in-use" => "An account with this email already exists.",
        "auth/weak-password" => "Password is too weak.",
        "auth/too-many-requests" => "Too many attempts. Please try again later.",
        "auth/network-request-failed" => "Network error. Check your connection and try again.",
        "auth/popup-closed-by-user" => "Sign-in was cancelled.",
        _ => "Something went wrong. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_requires_at_sign() {
        assert!(validate_email("someone@example.com").is_ok());
        assert!(validate_email("someone.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("someone@").is_err());
        assert!(validate_email("   ").is_err());
    }

    #[test]
    fn test_each_password_rule() {
        assert_eq!(validate_password("Str0ng!pass"), vec![]);
        assert_eq!(validate_password("Sh0rt!"), vec![PasswordRule::MinLength]);
        assert_eq!(validate_password("lower0!case"), vec![PasswordRule::Uppercase]);
        assert_eq!(validate_password("UPPER0!CASE"), vec![PasswordRule::Lowercase]);
        assert_eq!(validate_password("NoDigits!here"), vec![PasswordRule::Digit]);
        assert_eq!(validate_password("NoSpecial123"), vec![PasswordRule::Special]);
        assert_eq!(validate_password("").len(), 5);
    }

    #[test]
    fn test_login_skips_strength_rules() {
        assert!(validate_credentials("a@b.c", "weak", AuthMode::Login).is_empty());
        assert_eq!(
            validate_credentials("a@b.c", "", AuthMode::Login),
            vec!["Password is required".to_string()]
        );
    }

    #[test]
    fn test_signup_reports_all_failures() {
        let errors = validate_credentials("nope", "abc", AuthMode::Signup);
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[0], "Please enter a valid email address");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            auth_error_message("auth/wrong-password"),
            "Incorrect email or password."
        );
        assert_eq!(
            auth_error_message("auth/something-new"),
            "Something went wrong. Please try again."
        );
    }
}
