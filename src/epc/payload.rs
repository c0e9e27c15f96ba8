use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::iban::{validate_bic, validate_iban};
use crate::core::{BicError, FinalizedDocument, GendocError};

/// Maximum payload size in bytes (EPC069-12).
pub const MAX_PAYLOAD_BYTES: usize = 331;

/// Maximum characters per field; longer values are truncated.
pub const MAX_BENEFICIARY_NAME: usize = 70;
pub const MAX_STRUCTURED_REFERENCE: usize = 35;
pub const MAX_UNSTRUCTURED_REMITTANCE: usize = 140;
pub const MAX_ORIGINATOR_INFO: usize = 70;

const MIN_AMOUNT: Decimal = dec!(0.01);
const MAX_AMOUNT: Decimal = dec!(999999999.99);

/// EPC QR code version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EpcVersion {
    /// BIC mandatory.
    V001,
    /// BIC optional inside the EEA.
    #[default]
    V002,
}

impl EpcVersion {
    pub fn code(&self) -> &'static str {
        match self {
            Self::V001 => "001",
            Self::V002 => "002",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "001" => Some(Self::V001),
            "002" => Some(Self::V002),
            _ => None,
        }
    }
}

/// Character set indicator; every field must be representable in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CharacterSet {
    #[default]
    Utf8,
    Iso8859_1,
    Iso8859_15,
}

impl CharacterSet {
    /// Indicator digit written on line 3.
    pub fn code(&self) -> u8 {
        match self {
            Self::Utf8 => 1,
            Self::Iso8859_1 => 2,
            Self::Iso8859_15 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Iso8859_15 => "ISO-8859-15",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Utf8),
            "2" => Some(Self::Iso8859_1),
            "8" => Some(Self::Iso8859_15),
            _ => None,
        }
    }

    /// Whether `c` can be written in this character set. Control
    /// characters are never allowed.
    pub fn contains(&self, c: char) -> bool {
        if c.is_control() {
            return false;
        }
        match self {
            Self::Utf8 => true,
            Self::Iso8859_1 => (c as u32) <= 0xFF,
            Self::Iso8859_15 => match c {
                '€' | 'Š' | 'š' | 'Ž' | 'ž' | 'Œ' | 'œ' | 'Ÿ' => true,
                '¤' | '¦' | '¨' | '´' | '¸' | '¼' | '½' | '¾' => false,
                _ => (c as u32) <= 0xFF,
            },
        }
    }

    /// Encoded size of `text` in bytes.
    pub fn encoded_len(&self, text: &str) -> usize {
        match self {
            Self::Utf8 => text.len(),
            Self::Iso8859_1 | Self::Iso8859_15 => text.chars().count(),
        }
    }
}

/// Remittance information: a structured creditor reference or free text,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remittance {
    /// ISO 11649 creditor reference (e.g. "RF18539007547034"), max 35.
    Structured(String),
    /// Free text, max 140.
    Unstructured(String),
}

/// Beneficiary account of the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerBankDetails {
    pub beneficiary_name: String,
    pub iban: String,
    pub bic: Option<String>,
}

impl PayerBankDetails {
    pub fn new(beneficiary_name: impl Into<String>, iban: impl Into<String>) -> Self {
        Self {
            beneficiary_name: beneficiary_name.into(),
            iban: iban.into(),
            bic: None,
        }
    }

    pub fn bic(mut self, bic: impl Into<String>) -> Self {
        self.bic = Some(bic.into());
        self
    }
}

/// Encoding options for one payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpcOptions {
    pub version: EpcVersion,
    pub charset: CharacterSet,
    /// ISO 20022 purpose code (4 letters), e.g. "SALA" for salaries.
    pub purpose: Option<String>,
    /// Defaults to the document number as unstructured text.
    pub remittance: Option<Remittance>,
    /// Beneficiary to originator information.
    pub information: Option<String>,
}

impl EpcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: EpcVersion) -> Self {
        self.version = version;
        self
    }

    pub fn charset(mut self, charset: CharacterSet) -> Self {
        self.charset = charset;
        self
    }

    pub fn purpose(mut self, code: impl Into<String>) -> Self {
        self.purpose = Some(code.into());
        self
    }

    pub fn remittance(mut self, remittance: Remittance) -> Self {
        self.remittance = Some(remittance);
        self
    }

    pub fn information(mut self, text: impl Into<String>) -> Self {
        self.information = Some(text.into());
        self
    }
}

/// The twelve fields of an EPC QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpcPayload {
    pub version: EpcVersion,
    pub charset: CharacterSet,
    pub bic: Option<String>,
    pub beneficiary_name: String,
    pub iban: String,
    /// Euro amount, two decimals.
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub remittance: Option<Remittance>,
    pub information: Option<String>,
}

impl EpcPayload {
    /// Payload text: twelve lines joined by `\n`, absent fields blank.
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Size in bytes in the declared character set.
    pub fn byte_len(&self) -> usize {
        self.charset.encoded_len(&self.text())
    }
}

impl fmt::Display for EpcPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (structured, unstructured) = match &self.remittance {
            Some(Remittance::Structured(r)) => (r.as_str(), ""),
            Some(Remittance::Unstructured(r)) => ("", r.as_str()),
            None => ("", ""),
        };
        let lines = [
            "BCD".to_string(),
            self.version.code().to_string(),
            self.charset.code().to_string(),
            "SCT".to_string(),
            self.bic.clone().unwrap_or_default(),
            self.beneficiary_name.clone(),
            self.iban.clone(),
            format_amount(self.amount),
            self.purpose.clone().unwrap_or_default(),
            structured.to_string(),
            unstructured.to_string(),
            self.information.clone().unwrap_or_default(),
        ];
        f.write_str(&lines.join("\n"))
    }
}

/// "EUR" + amount with a dot and exactly two decimals.
fn format_amount(amount: Decimal) -> String {
    format!("EUR{:.2}", amount.round_dp(2))
}

/// Build the payment payload for a finalized document.
///
/// The amount is the document's amount due (grand total or net salary).
pub fn encode(
    doc: &FinalizedDocument,
    bank: &PayerBankDetails,
    options: &EpcOptions,
) -> Result<EpcPayload, GendocError> {
    let document = doc.id().to_string();

    let iban = validate_iban(&bank.iban).map_err(|source| GendocError::InvalidIban {
        document: document.clone(),
        source,
    })?;
    let bic = match bank.bic.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        Some(b) => Some(validate_bic(b).map_err(|source| GendocError::InvalidBic {
            document: document.clone(),
            source,
        })?),
        None if options.version == EpcVersion::V001 => {
            return Err(GendocError::InvalidBic {
                document,
                source: BicError {
                    value: String::new(),
                    reason: "version 001 requires a BIC".into(),
                },
            });
        }
        None => None,
    };

    if doc.currency_code() != "EUR" {
        return Err(GendocError::UnsupportedCurrency {
            document,
            currency: doc.currency_code().to_string(),
        });
    }
    let amount = doc.amount_due().round_dp(2);
    if amount < MIN_AMOUNT || amount > MAX_AMOUNT {
        return Err(GendocError::InvalidAmount { document, amount });
    }

    let charset = options.charset;
    let beneficiary_name = field(
        &document,
        "beneficiary_name",
        bank.beneficiary_name.trim(),
        MAX_BENEFICIARY_NAME,
        charset,
    )?;
    if beneficiary_name.is_empty() {
        return Err(GendocError::InvalidField {
            document,
            field: "beneficiary_name",
            reason: "is required".into(),
        });
    }

    let purpose = match options.purpose.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if p.len() == 4 && p.chars().all(|c| c.is_ascii_uppercase()) => Some(p.to_string()),
        Some(p) => {
            return Err(GendocError::InvalidField {
                document,
                field: "purpose",
                reason: format!("'{p}' must be 4 uppercase letters"),
            });
        }
        None => None,
    };

    let remittance = match &options.remittance {
        Some(Remittance::Structured(r)) => Remittance::Structured(field(
            &document,
            "structured_reference",
            r.trim(),
            MAX_STRUCTURED_REFERENCE,
            charset,
        )?),
        Some(Remittance::Unstructured(r)) => Remittance::Unstructured(field(
            &document,
            "unstructured_remittance",
            r.trim(),
            MAX_UNSTRUCTURED_REMITTANCE,
            charset,
        )?),
        None => Remittance::Unstructured(field(
            &document,
            "unstructured_remittance",
            &document,
            MAX_UNSTRUCTURED_REMITTANCE,
            charset,
        )?),
    };

    let information = match options.information.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(field(
            &document,
            "information",
            text,
            MAX_ORIGINATOR_INFO,
            charset,
        )?),
        _ => None,
    };

    let payload = EpcPayload {
        version: options.version,
        charset,
        bic,
        beneficiary_name,
        iban,
        amount,
        purpose,
        remittance: Some(remittance),
        information,
    };

    let bytes = payload.byte_len();
    if bytes > MAX_PAYLOAD_BYTES {
        return Err(GendocError::PayloadTooLarge { document, bytes });
    }
    tracing::debug!(document = %document, bytes, "encoded EPC payload");
    Ok(payload)
}

/// Truncate to `max` characters (with a warning) and check the charset.
fn field(
    document: &str,
    name: &'static str,
    value: &str,
    max: usize,
    charset: CharacterSet,
) -> Result<String, GendocError> {
    let count = value.chars().count();
    let value: String = if count > max {
        tracing::warn!(
            document,
            field = name,
            length = count,
            max,
            "EPC field truncated"
        );
        value.chars().take(max).collect()
    } else {
        value.to_string()
    };

    if let Some(character) = value.chars().find(|c| !charset.contains(*c)) {
        return Err(GendocError::UnsupportedCharacter {
            document: document.to_string(),
            field: name,
            character,
            charset: charset.name(),
        });
    }
    Ok(value)
}

/// Parse payload text back into its fields.
///
/// Trailing optional lines may be omitted; `\r\n` line ends are accepted,
/// and so is one terminator after the last line.
pub fn decode(text: &str) -> Result<EpcPayload, GendocError> {
    let malformed = |msg: String| GendocError::MalformedPayload(msg);
    let text = text
        .strip_suffix('\n')
        .map(|t| t.strip_suffix('\r').unwrap_or(t))
        .unwrap_or(text);
    let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    if lines.len() < 8 || lines.len() > 12 {
        return Err(malformed(format!(
            "expected 8 to 12 lines, got {}",
            lines.len()
        )));
    }
    let line = |i: usize| lines.get(i).copied().unwrap_or("");
    let optional = |i: usize| Some(line(i).to_string()).filter(|s| !s.is_empty());

    if line(0) != "BCD" {
        return Err(malformed(format!("service tag '{}' is not BCD", line(0))));
    }
    let version = EpcVersion::from_code(line(1))
        .ok_or_else(|| malformed(format!("unsupported version '{}'", line(1))))?;
    let charset = CharacterSet::from_code(line(2))
        .ok_or_else(|| malformed(format!("unsupported character set '{}'", line(2))))?;
    if line(3) != "SCT" {
        return Err(malformed(format!(
            "identification code '{}' is not SCT",
            line(3)
        )));
    }

    let bic = match optional(4) {
        Some(b) => Some(validate_bic(&b).map_err(|e| malformed(format!("BIC {e}")))?),
        None if version == EpcVersion::V001 => {
            return Err(malformed("version 001 requires a BIC".into()));
        }
        None => None,
    };
    let beneficiary_name = line(5).to_string();
    if beneficiary_name.is_empty() {
        return Err(malformed("missing beneficiary name".into()));
    }
    let iban = validate_iban(line(6)).map_err(|e| malformed(format!("IBAN {e}")))?;

    let amount_text = line(7)
        .strip_prefix("EUR")
        .ok_or_else(|| malformed(format!("amount '{}' must start with EUR", line(7))))?;
    let amount = Decimal::from_str(amount_text)
        .map_err(|e| malformed(format!("amount '{amount_text}': {e}")))?;
    if amount < MIN_AMOUNT || amount > MAX_AMOUNT {
        return Err(malformed(format!("amount {amount} outside the EPC range")));
    }

    let remittance = match (optional(9), optional(10)) {
        (Some(_), Some(_)) => {
            return Err(malformed(
                "structured and unstructured remittance are exclusive".into(),
            ));
        }
        (Some(r), None) => Some(Remittance::Structured(r)),
        (None, Some(r)) => Some(Remittance::Unstructured(r)),
        (None, None) => None,
    };

    Ok(EpcPayload {
        version,
        charset,
        bic,
        beneficiary_name,
        iban,
        amount,
        purpose: optional(8),
        remittance,
        information: optional(11),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_membership() {
        assert!(CharacterSet::Utf8.contains('ł'));
        assert!(!CharacterSet::Utf8.contains('\n'));
        assert!(CharacterSet::Iso8859_1.contains('é'));
        assert!(!CharacterSet::Iso8859_1.contains('€'));
        assert!(CharacterSet::Iso8859_15.contains('€'));
        assert!(!CharacterSet::Iso8859_15.contains('¤'));
        assert!(!CharacterSet::Iso8859_15.contains('ł'));
    }

    #[test]
    fn encoded_len_per_charset() {
        assert_eq!(CharacterSet::Utf8.encoded_len("é"), 2);
        assert_eq!(CharacterSet::Iso8859_1.encoded_len("é"), 1);
    }

    #[test]
    fn amount_format() {
        assert_eq!(format_amount(dec!(120)), "EUR120.00");
        assert_eq!(format_amount(dec!(0.5)), "EUR0.50");
        assert_eq!(format_amount(dec!(1234.56)), "EUR1234.56");
    }

    #[test]
    fn decode_rejects_bad_header() {
        assert!(decode("").is_err());
        assert!(decode("XYZ\n002\n1\nSCT\n\nA\nDE89370400440532013000\nEUR1.00").is_err());
        assert!(decode("BCD\n003\n1\nSCT\n\nA\nDE89370400440532013000\nEUR1.00").is_err());
        assert!(decode("BCD\n002\n5\nSCT\n\nA\nDE89370400440532013000\nEUR1.00").is_err());
    }

    #[test]
    fn decode_accepts_omitted_trailing_lines() {
        let p = decode("BCD\r\n002\r\n1\r\nSCT\r\n\r\nA\r\nDE89370400440532013000\r\nEUR1.00").unwrap();
        assert_eq!(p.amount, dec!(1.00));
        assert_eq!(p.bic, None);
        assert_eq!(p.remittance, None);
    }

    #[test]
    fn decode_rejects_both_remittances() {
        let text = "BCD\n002\n1\nSCT\n\nA\nDE89370400440532013000\nEUR1.00\n\nRF18\nfree\n";
        assert!(decode(text).is_err());
    }
}
