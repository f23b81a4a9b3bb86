//! Client-side validation for interactive input.
//!
//! These mirror the backend's registration rules so obviously bad input
//! fails before a request is made; the backend remains authoritative.

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A display name: non-empty, no digits.
pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err("Name cannot contain numbers".to_string());
    }
    Ok(())
}

/// A well-formed email address: one `@` with a dotted, non-empty domain.
pub fn validate_email(email: &str) -> Result<(), String> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !trimmed.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err("Enter a valid email address".to_string())
    }
}

/// Password length rule.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// An intake time in 24h `HH:MM` form.
pub fn validate_time_hhmm(time: &str) -> Result<(), String> {
    let parts: Vec<&str> = time.split(':').collect();
    let valid = parts.len() == 2
        && parts[0].len() == 2
        && parts[1].len() == 2
        && matches!(parts[0].parse::<u8>(), Ok(h) if h < 24)
        && matches!(parts[1].parse::<u8>(), Ok(m) if m < 60);

    if valid {
        Ok(())
    } else {
        Err(format!("Invalid time '{}': expected HH:MM", time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rejects_digits_and_blank() {
        assert!(validate_name("Ana García").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Ana2").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana.garcia@sub.example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@").is_err());
        assert!(validate_email("ana@exa mple.com").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("ana@.com").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn time_format() {
        assert!(validate_time_hhmm("08:00").is_ok());
        assert!(validate_time_hhmm("23:59").is_ok());
        assert!(validate_time_hhmm("24:00").is_err());
        assert!(validate_time_hhmm("8:00").is_err());
        assert!(validate_time_hhmm("08:60").is_err());
        assert!(validate_time_hhmm("0800").is_err());
    }
}
