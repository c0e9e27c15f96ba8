//! Core document types, validation, numbering, rate tables and computation.
//!
//! Every other module consumes the [`FinalizedDocument`] produced by
//! [`compute`].

mod builder;
mod compute;
mod error;
mod numbering;
mod rates;
mod types;
mod validation;

pub use builder::*;
pub use compute::*;
pub use error::*;
pub use numbering::*;
pub use rates::*;
pub use types::*;
pub use validation::*;
