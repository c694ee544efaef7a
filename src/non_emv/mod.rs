//! Non-EMV data objects that still show up on contactless transactions, most
//! notably the MSR service code carried in Track 2 equivalent data.

mod service_code;

pub use self::service_code::*;
