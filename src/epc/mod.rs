//! SEPA payment QR payloads (EPC069-12, "GiroCode").
//!
//! [`encode`] turns a finalized document into the twelve-line text that a
//! QR renderer draws on the invoice or payslip. Banking apps scan it to
//! prefill a SEPA credit transfer. The payload is a static payment aid:
//! nothing here initiates a transfer.
//!
//! ```
//! use gendoc::core::*;
//! use gendoc::epc::*;
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
//!     .issuer(PartyBuilder::new("Votre Entreprise").build())
//!     .recipient(PartyBuilder::new("Client SA").build())
//!     .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50)).build())
//!     .build()
//!     .unwrap();
//! let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
//!
//! let bank = PayerBankDetails::new("Votre Entreprise", "FR76 3000 6000 0112 3456 7890 189")
//!     .bic("BNPAFRPP");
//! let payload = encode(&doc, &bank, &EpcOptions::default()).unwrap();
//! assert!(payload.text().contains("\nEUR120.00\n"));
//!
//! let back = decode(&payload.text()).unwrap();
//! assert_eq!(back.amount, dec!(120.00));
//! ```

mod iban;
mod payload;

pub use iban::*;
pub use payload::*;
