//! Syntactic e-mail address validation (RFC 5322 dot-atom subset).
//!
//! No DNS or mailbox checks: an address is accepted when its local part is a
//! dot-atom and its domain is a dotted sequence of letter-digit-hyphen labels.

use thiserror::Error;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email address is empty")]
    Empty,

    #[error("email address is longer than 254 characters")]
    TooLong,

    #[error("email address must contain exactly one '@'")]
    MissingAt,

    #[error("invalid local part: {0}")]
    LocalPart(&'static str),

    #[error("invalid domain: {0}")]
    Domain(&'static str),
}

/// RFC 5322 `atext`.
fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn validate_local(local: &str) -> Result<(), EmailError> {
    if local.is_empty() {
        return Err(EmailError::LocalPart("empty"));
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(EmailError::LocalPart("longer than 64 characters"));
    }
    for atom in local.split('.') {
        if atom.is_empty() {
            return Err(EmailError::LocalPart("leading, trailing or repeated dot"));
        }
        if !atom.chars().all(is_atext) {
            return Err(EmailError::LocalPart("unexpected character"));
        }
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), EmailError> {
    if domain.is_empty() {
        return Err(EmailError::Domain("empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(EmailError::Domain("longer than 253 characters"));
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(EmailError::Domain("needs at least two labels"));
    }
    for label in &labels {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(EmailError::Domain("labels must be 1 to 63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(EmailError::Domain("labels cannot start or end with '-'"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(EmailError::Domain("unexpected character"));
        }
    }
    if labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(EmailError::Domain("top-level label cannot be numeric"));
    }
    Ok(())
}

pub fn validate_email(address: &str) -> Result<(), EmailError> {
    if address.is_empty() {
        return Err(EmailError::Empty);
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err(EmailError::TooLong);
    }
    let (local, domain) = match address.split_once('@') {
        Some((l, d)) if !d.contains('@') => (l, d),
        _ => return Err(EmailError::MissingAt),
    };
    validate_local(local)?;
    validate_domain(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_common_addresses() {
        for ok in [
            "owner@shop.example.com",
            "first.last@example.in",
            "o'brien+tag@mail-server.co.uk",
            "x@a.io",
        ] {
            assert_eq!(validate_email(ok), Ok(()), "{ok}");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(validate_email(""), Err(EmailError::Empty));
        assert_eq!(validate_email("not-an-email"), Err(EmailError::MissingAt));
        assert_eq!(validate_email("a@b@c.com"), Err(EmailError::MissingAt));
        assert!(matches!(validate_email(".lead@example.com"), Err(EmailError::LocalPart(_))));
        assert!(matches!(validate_email("two..dots@example.com"), Err(EmailError::LocalPart(_))));
        assert!(matches!(validate_email("sp ace@example.com"), Err(EmailError::LocalPart(_))));
        assert!(matches!(validate_email("user@localhost"), Err(EmailError::Domain(_))));
        assert!(matches!(validate_email("user@-bad.com"), Err(EmailError::Domain(_))));
        assert!(matches!(validate_email("user@example..com"), Err(EmailError::Domain(_))));
        assert!(matches!(validate_email("user@10.0.0.1"), Err(EmailError::Domain(_))));
    }

    #[test]
    fn enforces_length_limits() {
        let local = "a".repeat(65);
        assert!(matches!(
            validate_email(&format!("{local}@example.com")),
            Err(EmailError::LocalPart(_))
        ));
        let label = "b".repeat(64);
        assert!(matches!(
            validate_email(&format!("a@{label}.com")),
            Err(EmailError::Domain(_))
        ));
        let long = format!("a@{}.com", vec!["c".repeat(60); 5].join("."));
        assert_eq!(validate_email(&long), Err(EmailError::TooLong));
    }

    proptest! {
        #[test]
        fn generated_dot_atom_addresses_are_accepted(
            local in "[a-z0-9]{1,20}(\\.[a-z0-9_+-]{1,10}){0,2}",
            host in "[a-z0-9]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let address = format!("{local}@{host}.{tld}");
            prop_assert_eq!(validate_email(&address), Ok(()));
        }
    }
}
