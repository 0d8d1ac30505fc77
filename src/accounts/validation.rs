//! Input rules for account registration.

const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 50;

/// Trimmed, lower-cased form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("email must be an email".to_string());
    };

    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if well_formed {
        Ok(())
    } else {
        Err("email must be an email".to_string())
    }
}

/// 6 to 50 characters with an upper-case letter, a lower-case letter and a
/// digit or symbol.
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(format!(
            "password must be longer than or equal to {} characters",
            PASSWORD_MIN_LEN
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(format!(
            "password must be shorter than or equal to {} characters",
            PASSWORD_MAX_LEN
        ));
    }

    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit_or_symbol = password
        .chars()
        .any(|c| c.is_ascii_digit() || !c.is_alphanumeric());

    if password.starts_with('.') || !(has_upper && has_lower && has_digit_or_symbol) {
        return Err(
            "The password must have a Uppercase, lowercase letter and a number".to_string(),
        );
    }

    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    if full_name.trim().is_empty() {
        Err("full_name must be longer than or equal to 1 characters".to_string())
    } else {
        Ok(())
    }
}

/// Run all registration rules and collect every failure.
pub fn validate_registration(email: &str, password: &str, full_name: &str) -> Vec<String> {
    [
        validate_email(email),
        validate_password(password),
        validate_full_name(full_name),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emails() {
        assert!(validate_email("ann@shop.test").is_ok());
        assert!(validate_email("a.b+c@mail.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@shop.test").is_err());
        assert!(validate_email("ann@localhost").is_err());
        assert!(validate_email("ann@@shop.test").is_err());
        assert!(validate_email("an n@shop.test").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ann@Shop.TEST "), "ann@shop.test");
    }

    #[test]
    fn test_passwords() {
        assert!(validate_password("Abc123").is_ok());
        assert!(validate_password("Abcdef!").is_ok());

        assert!(validate_password("Ab1").is_err());
        assert!(validate_password("abc123").is_err());
        assert!(validate_password("ABC123").is_err());
        assert!(validate_password("Abcdef").is_err());
        assert!(validate_password(".Abc123").is_err());
        assert!(validate_password(&format!("Ab1{}", "x".repeat(48))).is_err());
    }

    #[test]
    fn test_registration_collects_all_errors() {
        let errors = validate_registration("bad", "short", "  ");
        assert_eq!(errors.len(), 3);

        assert!(validate_registration("ann@shop.test", "Abc123", "Ann").is_empty());
    }
}
