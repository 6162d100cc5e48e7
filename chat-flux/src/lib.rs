//! Ambient infrastructure shared by the networking and binary crates: structured
//! logging, credential hashing and the error taxonomy for fatal startup failures.

pub mod credential;
pub mod error;
pub mod logging;

pub use error::ChatError;
