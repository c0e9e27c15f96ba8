use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised anywhere in the document pipeline.
///
/// Every variant names the document, source row, field or archive sequence
/// number it concerns. Use [`GendocError::class`] to decide whether a failure
/// aborts the batch, the document, or only one artifact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GendocError {
    /// A source row is missing a mandatory field or holds an unusable value.
    #[error("row {row}, field '{field}': {reason}")]
    MalformedRow {
        /// 0-based index of the row in the source sequence.
        row: usize,
        /// Column name as it appears in the source.
        field: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// A date cell matched none of the accepted formats.
    #[error("row {row}, field '{field}': unparsable date '{value}'")]
    UnparsableDate {
        row: usize,
        field: String,
        value: String,
    },

    /// A rate needed for computation is absent from the rate table.
    #[error("document {document}: no rate table entry for {rate}")]
    InvalidRate { document: String, rate: String },

    /// Net salary would be negative.
    #[error("document {document}: net salary would be negative ({net})")]
    NegativeResult { document: String, net: Decimal },

    /// An amount exceeds the range of exact decimal arithmetic.
    #[error("document {document}: {amount} overflows decimal arithmetic")]
    AmountOverflow {
        document: String,
        /// Which amount could not be computed, e.g. "lines[0].amount".
        amount: String,
    },

    /// IBAN failed format or mod-97 validation.
    #[error("document {document}: invalid IBAN: {source}")]
    InvalidIban {
        document: String,
        #[source]
        source: IbanError,
    },

    /// BIC failed length or charset validation.
    #[error("document {document}: invalid BIC: {source}")]
    InvalidBic {
        document: String,
        #[source]
        source: BicError,
    },

    /// A QR field holds a character outside the declared character set.
    #[error("document {document}: field '{field}' contains {character:?}, not representable in {charset}")]
    UnsupportedCharacter {
        document: String,
        field: &'static str,
        character: char,
        charset: &'static str,
    },

    /// A required QR field is empty or does not follow its code format.
    #[error("document {document}: field '{field}' {reason}")]
    InvalidField {
        document: String,
        field: &'static str,
        reason: String,
    },

    /// Payment amount outside the EPC range of 0.01 to 999999999.99.
    #[error("document {document}: amount {amount} outside the EPC range")]
    InvalidAmount { document: String, amount: Decimal },

    /// SEPA credit transfers are denominated in euro only.
    #[error("document {document}: currency {currency} cannot be paid by SEPA credit transfer")]
    UnsupportedCurrency { document: String, currency: String },

    /// Encoded EPC payload exceeds 331 bytes.
    #[error("document {document}: EPC payload is {bytes} bytes, maximum is 331")]
    PayloadTooLarge { document: String, bytes: usize },

    /// The QR payload text could not be parsed back.
    #[error("malformed EPC payload: {0}")]
    MalformedPayload(String),

    /// Unknown or inconsistent accounting dialect.
    #[error("unsupported accounting dialect: {0}")]
    UnsupportedDialect(String),

    /// A ledger category has no account in the dialect's mapping.
    #[error("document {document}: no account mapped for category '{category}'")]
    UnmappedAccount { document: String, category: String },

    /// Archive verification found a broken link.
    #[error("archive chain broken at sequence {sequence_number}: {reason}")]
    ChainBroken {
        sequence_number: u64,
        reason: ChainBreak,
    },

    /// Archive storage failed; the append did not happen.
    #[error("archive persistence failed: {0}")]
    Persistence(String),

    /// One or more record invariants failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder or configuration misuse.
    #[error("builder error: {0}")]
    Builder(String),
}

/// How far a failure propagates in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad source data; the whole batch is rejected.
    Input,
    /// Missing rates, dialects or accounts, or amounts out of range; fatal
    /// to one document.
    Configuration,
    /// QR payload could not be produced; other artifacts are unaffected.
    FormatCompliance,
    /// Tampering detected; requires manual investigation.
    Integrity,
    /// Archive storage failure; fatal to one document.
    Persistence,
    /// Programmatic misuse of builders.
    Usage,
}

impl GendocError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedRow { .. } | Self::UnparsableDate { .. } => ErrorClass::Input,
            Self::InvalidRate { .. }
            | Self::NegativeResult { .. }
            | Self::AmountOverflow { .. }
            | Self::UnsupportedDialect(_)
            | Self::UnmappedAccount { .. } => ErrorClass::Configuration,
            Self::InvalidIban { .. }
            | Self::InvalidBic { .. }
            | Self::UnsupportedCharacter { .. }
            | Self::InvalidField { .. }
            | Self::InvalidAmount { .. }
            | Self::UnsupportedCurrency { .. }
            | Self::PayloadTooLarge { .. }
            | Self::MalformedPayload(_) => ErrorClass::FormatCompliance,
            Self::ChainBroken { .. } => ErrorClass::Integrity,
            Self::Persistence(_) => ErrorClass::Persistence,
            Self::Validation(_) | Self::Builder(_) => ErrorClass::Usage,
        }
    }
}

/// Why an archive entry failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBreak {
    /// Sequence number is not the previous one plus one.
    SequenceGap { expected: u64, found: u64 },
    /// Recomputed content hash differs from the stored one.
    ContentMismatch { stored: String, computed: String },
    /// Entry's document id differs from the stored snapshot's id.
    DocumentIdMismatch { entry: String, snapshot: String },
    /// previous_hash does not match the preceding entry's content hash.
    LinkMismatch { expected: String, found: String },
}

impl fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceGap { expected, found } => {
                write!(f, "expected sequence {expected}, found {found}")
            }
            Self::ContentMismatch { stored, computed } => {
                write!(f, "content hash {computed} does not match stored {stored}")
            }
            Self::DocumentIdMismatch { entry, snapshot } => {
                write!(f, "entry names document {entry} but snapshot is {snapshot}")
            }
            Self::LinkMismatch { expected, found } => {
                write!(f, "previous hash {found} does not match {expected}")
            }
        }
    }
}

/// IBAN format error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}': {reason}")]
pub struct IbanError {
    /// The rejected input (spaces removed).
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// BIC format error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}': {reason}")]
pub struct BicError {
    pub value: String,
    pub reason: String,
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "lines[2].vat_rate").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
