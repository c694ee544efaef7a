//! Types for transaction data that must never outlive the transaction and
//! must never appear in a log line.
//!
//! Each type wraps its raw bytes in a `zeroize`-backed buffer so the
//! destructor clears the memory regardless of which path (success, error,
//! cancel) drops the value - see [`crate::transaction`] for where these are
//! registered for transaction-exit zeroization.

use std::fmt::{self, Debug, Formatter};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::util::mask_pan_digits;

/// A cardholder's Primary Account Number, as a decimal digit string.
///
/// [`Debug`] is implemented by hand so that masked digits, never the raw
/// PAN, ever reach a log or panic message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pan(String);

impl Pan {
	#[must_use]
	pub fn new(digits: String) -> Self {
		Self(digits)
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// A projection safe to place in logs or the outcome envelope: first 6
	/// and last 4 digits, the rest masked.
	#[must_use]
	pub fn masked(&self) -> String {
		mask_pan_digits(&self.0)
	}
}

impl Debug for Pan {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Pan").field(&self.masked()).finish()
	}
}

/// Track 2 equivalent data (PAN ‖ separator ‖ expiry ‖ service code ‖
/// discretionary data), as read from the card.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Track2Equivalent(Vec<u8>);

impl Track2Equivalent {
	#[must_use]
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl Debug for Track2Equivalent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Track2Equivalent").field(&"<redacted>").finish()
	}
}

/// An application cryptogram returned by GENERATE AC or COMPUTE
/// CRYPTOGRAPHIC CHECKSUM.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Cryptogram(Vec<u8>);

impl Cryptogram {
	#[must_use]
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn to_hex(&self) -> String {
		crate::util::bytes_to_hex_string(&self.0)
	}
}

impl Debug for Cryptogram {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Cryptogram").field(&"<redacted>").finish()
	}
}

/// An ISO 9564 PIN block. Out of scope for transaction processing (PIN
/// entry is an external capability, per the crate's scope), but the type
/// exists so embedders who do carry PIN blocks through this crate's data
/// store get the same zeroize guarantee as the other sensitive fields.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinBlock(Vec<u8>);

impl PinBlock {
	#[must_use]
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl Debug for PinBlock {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("PinBlock").field(&"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	use super::Pan;

	#[test]
	fn masked_preserves_first_six_last_four() {
		let pan = Pan::new("4761740000000012".to_owned());
		assert_eq!(pan.masked(), "476174******0012");
	}

	#[test]
	fn debug_never_prints_raw_digits() {
		let pan = Pan::new("4761740000000012".to_owned());
		let debug_str = format!("{pan:?}");
		assert!(!debug_str.contains("4761740000000012"));
	}
}
