//! Everything for handling Issuer Action Code (IAC) values.
//!
//! Information for this can be found in EMV Book 3, under section `10.7`.

// Modules
mod default;
mod denial;
mod online;

// Public Exports
pub use self::{default::*, denial::*, online::*};
