//! Email address shape check.

use std::sync::LazyLock;

use regex::Regex;

/// `local@domain.tld`: no whitespace, exactly one `@`, at least one dot after it.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Returns `true` when `candidate` has the `local@domain.tld` shape.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Local part of an address, used as a display name when none was given.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
