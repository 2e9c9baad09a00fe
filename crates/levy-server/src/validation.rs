//! Input validation for form and JSON payloads. Every check fails with a
//! field-level [`ApiError::Validation`].

use std::net::Ipv4Addr;

use crate::envelope::ApiError;
use crate::store::PageQuery;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// A present, non-blank string field, trimmed.
pub fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::field(field, format!("{field} is required"))),
    }
}

/// Dotted-quad IPv4 without leading zeros.
pub fn ipv4(field: &'static str, value: &str) -> Result<Ipv4Addr, ApiError> {
    let invalid = || ApiError::field(field, format!("{field} must be a valid IPv4 address"));

    let octets: Vec<&str> = value.trim().split('.').collect();
    if octets.len() != 4 {
        return Err(invalid());
    }
    for octet in &octets {
        let well_formed = !octet.is_empty()
            && octet.len() <= 3
            && octet.bytes().all(|b| b.is_ascii_digit())
            && !(octet.len() > 1 && octet.starts_with('0'));
        if !well_formed {
            return Err(invalid());
        }
    }
    value.trim().parse().map_err(|_| invalid())
}

/// Plate numbers are stored upper-case; letters, digits, `-` and spaces.
pub fn plate_number(value: &str) -> Result<String, ApiError> {
    let plate = value.trim().to_ascii_uppercase();
    let ok = (2..=16).contains(&plate.len())
        && plate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ');
    if ok {
        Ok(plate)
    } else {
        Err(ApiError::field(
            "plateNumber",
            "plateNumber must be 2-16 letters, digits, spaces or dashes",
        ))
    }
}

/// 17-character VIN; I, O and Q never appear in a VIN.
pub fn vin(value: &str) -> Result<String, ApiError> {
    let vin = value.trim().to_ascii_uppercase();
    let ok = vin.len() == 17
        && vin
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, 'I' | 'O' | 'Q'));
    if ok {
        Ok(vin)
    } else {
        Err(ApiError::field("vin", "vin must be 17 characters excluding I, O and Q"))
    }
}

pub fn email(value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_ascii_lowercase();
    let ok = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if ok && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(ApiError::field("email", "email must be a valid address"))
    }
}

pub fn phone(value: &str) -> Result<String, ApiError> {
    let phone = value.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if (7..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(phone.to_owned())
    } else {
        Err(ApiError::field("phone", "phone must be 7-15 digits"))
    }
}

/// Defaults to page 1 of [`DEFAULT_PER_PAGE`], capped at [`MAX_PER_PAGE`].
pub fn page_query(page: Option<u32>, per_page: Option<u32>) -> PageQuery {
    PageQuery {
        page: page.unwrap_or(1).max(1),
        per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        let err = required("walletId", &None).unwrap_err();
        assert_eq!(err.to_string(), "walletId is required");
        assert!(required("walletId", &Some("   ".into())).is_err());
        assert_eq!(required("walletId", &Some(" w-1 ".into())).unwrap(), "w-1");
    }

    #[test]
    fn ipv4_accepts_dotted_quads_only() {
        assert_eq!(
            ipv4("ip", "192.168.0.1").unwrap(),
            Ipv4Addr::new(192, 168, 0, 1)
        );
        assert!(ipv4("ip", "0.0.0.0").is_ok());
        for bad in ["256.1.1.1", "1.2.3", "1.2.3.4.5", "01.2.3.4", "a.b.c.d", "1..2.3", "::1"] {
            assert!(ipv4("ip", bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn plate_numbers_are_normalised() {
        assert_eq!(plate_number(" abc-123de ").unwrap(), "ABC-123DE");
        assert!(plate_number("A").is_err());
        assert!(plate_number("ABC_123").is_err());
    }

    #[test]
    fn vin_rejects_ambiguous_letters() {
        assert!(vin("1HGCM82633A004352").is_ok());
        assert!(vin("1HGCM82633A00435O").is_err());
        assert!(vin("SHORT").is_err());
    }

    #[test]
    fn email_and_phone_shapes() {
        assert_eq!(email("Ada@Example.NG").unwrap(), "ada@example.ng");
        assert!(email("ada@localhost").is_err());
        assert!(email("no-at-sign").is_err());
        assert!(phone("+2348012345678").is_ok());
        assert!(phone("080-123").is_err());
    }

    #[test]
    fn page_query_is_clamped() {
        assert_eq!(
            page_query(None, None),
            PageQuery {
                page: 1,
                per_page: DEFAULT_PER_PAGE
            }
        );
        assert_eq!(page_query(Some(0), Some(1000)).per_page, MAX_PER_PAGE);
        assert_eq!(page_query(Some(0), Some(0)), PageQuery { page: 1, per_page: 1 });
    }
}
