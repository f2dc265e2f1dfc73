use std::sync::LazyLock;

use regex::Regex;

const MAX_INPUT_LEN: usize = 500;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;
const TOTP_LEN: usize = 6;

/// Login form input after client-side checks.
#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub totp_code: Option<String>,
}

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]").unwrap());
static SCRIPT_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)javascript:").unwrap());
/// `on<word>=` attribute openers such as `onclick =`; `\w` is ASCII here.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i-u)on\w+\s*=").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Strips markup and script fragments from free-text input.
pub fn sanitize_input(input: &str) -> String {
    let s = MARKUP.replace_all(input, "");
    let s = SCRIPT_SCHEME.replace_all(&s, "");
    let s = EVENT_HANDLER.replace_all(&s, "");
    s.trim().chars().take(MAX_INPUT_LEN).collect()
}

/// `local@domain.tld` with no whitespace, at most 254 characters.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL.is_match(email)
}

pub fn validate_login(
    email: &str,
    password: &str,
    totp_code: Option<&str>,
) -> Result<Credentials, &'static str> {
    let email = sanitize_input(&email.to_lowercase());
    if !is_valid_email(&email) {
        return Err("Please enter a valid email address");
    }

    let password_len = password.chars().count();
    if password_len < MIN_PASSWORD_LEN {
        return Err("The password must be at least 6 characters long");
    }
    if password_len > MAX_PASSWORD_LEN {
        return Err("The password is too long");
    }

    let totp_code = totp_code
        .map(sanitize_input)
        .filter(|code| code.chars().count() == TOTP_LEN);

    Ok(Credentials {
        email,
        password: password.to_string(),
        totp_code,
    })
}
