//! # gendoc
//!
//! Invoice and payslip pipeline for French businesses: tabular source rows
//! become computed documents, SEPA payment QR payloads, accounting export
//! lines (FEC, Sage, Cegid) and entries in a hash-chained legal archive.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use gendoc::core::*;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
//!     .issuer(PartyBuilder::new("Votre Entreprise SARL").registration_id("12345678900012").build())
//!     .recipient(PartyBuilder::new("Client SA").build())
//!     .add_line(LineItemBuilder::new("Conseil", dec!(10), dec!(150)).vat_rate(dec!(0.20)).build())
//!     .build()
//!     .unwrap();
//!
//! let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
//! assert_eq!(doc.amount_due(), dec!(1800.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Document types, validation, numbering, rate tables, computation, row normalization |
//! | `epc` (default) | SEPA EPC QR payload encoding and decoding, IBAN/BIC checks |
//! | `export` (default) | FEC, Sage and Cegid accounting export lines |
//! | `archive` (default) | SHA-256 hash-chained legal archive |
//! | `batch` (default) | Parallel pipeline over a whole source file |
//! | `csv` | Read decoded CSV text into source rows |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod normalize;

#[cfg(feature = "epc")]
pub mod epc;

#[cfg(feature = "export")]
pub mod export;

#[cfg(feature = "archive")]
pub mod archive;

#[cfg(feature = "batch")]
pub mod batch;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
