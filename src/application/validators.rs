use validator::ValidateEmail;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates an entrant display name: 2-50 characters after trimming.
pub fn is_valid_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len)
}

/// Validates a plausible phone string. Strict formats are left to the
/// upstream form layer; here we only require 7-15 digits with optional
/// "+", separators, and parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    if phone.is_empty() {
        return false;
    }

    let mut digits = 0usize;
    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => digits += 1,
            '+' if i == 0 => {}
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return false,
        }
    }
    (7..=15).contains(&digits)
}

/// Validates a referral code in our issued format: "ONE" followed by
/// exactly 6 uppercase alphanumeric characters.
pub fn is_valid_referral_code(code: &str) -> bool {
    let Some(suffix) = code.strip_prefix("ONE") else {
        return false;
    };
    suffix.len() == 6
        && suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
