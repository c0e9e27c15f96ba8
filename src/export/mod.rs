//! Accounting exports: FEC, Sage and Cegid ledgers.
//!
//! A [`DialectSpec`] describes the target layout. [`export`] turns one
//! finalized document into balanced ledger lines and [`render`] writes
//! them as delimited text ready for import.
//!
//! ```
//! use gendoc::export::*;
//!
//! let sage = DialectSpec::builtin("sage").unwrap();
//! assert_eq!(sage.delimiter, ';');
//! assert!(DialectSpec::builtin("ciel").is_err());
//! ```

mod accounts;
mod dialect;
mod ledger;
mod render;

pub use accounts::*;
pub use dialect::*;
pub use ledger::*;
pub use render::*;
