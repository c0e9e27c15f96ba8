//! IBAN and BIC format validation (no network call).

use crate::core::{BicError, IbanError};

/// IBAN length per country of the SEPA scheme.
const IBAN_LENGTHS: &[(&str, usize)] = &[
    ("AD", 24),
    ("AT", 20),
    ("BE", 16),
    ("BG", 22),
    ("CH", 21),
    ("CY", 28),
    ("CZ", 24),
    ("DE", 22),
    ("DK", 18),
    ("EE", 20),
    ("ES", 24),
    ("FI", 18),
    ("FR", 27),
    ("GB", 22),
    ("GI", 23),
    ("GR", 27),
    ("HR", 21),
    ("HU", 28),
    ("IE", 22),
    ("IS", 26),
    ("IT", 27),
    ("LI", 21),
    ("LT", 20),
    ("LU", 20),
    ("LV", 21),
    ("MC", 27),
    ("MT", 31),
    ("NL", 18),
    ("NO", 15),
    ("PL", 28),
    ("PT", 25),
    ("RO", 24),
    ("SE", 24),
    ("SI", 19),
    ("SK", 24),
    ("SM", 27),
    ("VA", 22),
];

/// Validate an IBAN: country length and ISO 7064 mod-97 check digits.
///
/// Spaces are ignored and letters uppercased. Returns the compact form.
///
/// ```
/// use gendoc::epc::validate_iban;
///
/// assert_eq!(
///     validate_iban("FR76 3000 6000 0112 3456 7890 189").unwrap(),
///     "FR7630006000011234567890189"
/// );
/// assert!(validate_iban("FR76 3000 6000 0112 3456 7890 188").is_err());
/// ```
pub fn validate_iban(input: &str) -> Result<String, IbanError> {
    let iban: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let err = |reason: &str| IbanError {
        value: iban.clone(),
        reason: reason.into(),
    };

    if iban.len() < 5 || !iban.is_ascii() {
        return Err(err("too short or not ASCII"));
    }
    if !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(err("only letters and digits are allowed"));
    }
    let (country, rest) = iban.split_at(2);
    if !country.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(err("must start with a 2-letter country code"));
    }
    if !rest[..2].chars().all(|c| c.is_ascii_digit()) {
        return Err(err("check digits must be numeric"));
    }

    let expected = IBAN_LENGTHS
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, len)| *len)
        .ok_or_else(|| err(&format!("country {country} is not in the SEPA scheme")))?;
    if iban.len() != expected {
        return Err(err(&format!(
            "{country} IBANs have {expected} characters, got {}",
            iban.len()
        )));
    }

    if mod97(&iban) != 1 {
        return Err(err("check digits do not match (mod 97)"));
    }
    Ok(iban)
}

/// Remainder of the rearranged IBAN (first four characters moved to the
/// end, letters as 10..35) modulo 97, computed digit by digit.
fn mod97(iban: &str) -> u32 {
    let rearranged = iban[4..].chars().chain(iban[..4].chars());
    let mut remainder = 0u32;
    for c in rearranged {
        let value = match c.to_digit(36) {
            Some(v) => v,
            None => return 0,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder
}

/// Validate a BIC (ISO 9362): 8 or 11 characters, institution and country
/// letters, alphanumeric location and branch.
///
/// Returns the compact uppercase form.
pub fn validate_bic(input: &str) -> Result<String, BicError> {
    let bic: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let err = |reason: &str| BicError {
        value: bic.clone(),
        reason: reason.into(),
    };

    if bic.len() != 8 && bic.len() != 11 {
        return Err(err("must be 8 or 11 characters"));
    }
    if !bic.is_ascii() {
        return Err(err("only letters and digits are allowed"));
    }
    if !bic[..6].chars().all(|c| c.is_ascii_uppercase()) {
        return Err(err("institution and country code must be letters"));
    }
    if !bic[6..].chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(err("location and branch code must be letters or digits"));
    }
    Ok(bic)
}
