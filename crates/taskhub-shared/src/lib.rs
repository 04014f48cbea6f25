//! # taskhub-shared
//!
//! Types shared by the TaskHub server, store and client: the domain model as
//! it travels over the wire, the enums behind every status column, and the
//! rules (validation, ordering, progress) that both sides must agree on.

pub mod constants;
pub mod error;
pub mod ordering;
pub mod progress;
pub mod protocol;
pub mod types;
pub mod validation;

pub use error::{ParseEnumError, ValidationErrors};
