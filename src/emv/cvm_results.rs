//! Everything for handling Cardholder Verification Method (CVM) Results values.
//!
//! Information for this can be found in EMV Book 4, under section `A4`.

// Uses
use std::cmp::Ordering;

use crate::{
	emv::{bitflag_values::BitflagValue, cv_rule::CardholderVerificationRule},
	enum_repr_fallible,
	error::ParseError,
};

// Struct Implementation
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CardholderVerificationMethodResults {
	pub cv_rule: CardholderVerificationRule,
	pub result: CvmResult,
}

enum_repr_fallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CvmResult: u8, ParseError, { |_| ParseError::NonCompliant } {
	Unknown =    0b00 => "Unknown",
	Failed =     0b01 => "Failed",
	Successful = 0b10 => "Successful",
}
}

impl TryFrom<&[u8]> for CardholderVerificationMethodResults {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		if raw_bytes.len() != Self::NUM_BYTES {
			return Err(ParseError::ByteCountIncorrect {
				r#type: Ordering::Equal,
				expected: Self::NUM_BYTES,
				found: raw_bytes.len(),
			});
		}
		let mut bytes = [0u8; Self::NUM_BYTES];
		for (index, byte) in raw_bytes.iter().enumerate() {
			bytes[index] = byte & Self::USED_BITS_MASK[index];
		}

		Ok(Self {
			cv_rule: CardholderVerificationRule::try_from(&bytes[0..2])?,
			result: CvmResult::try_from(bytes[2])?,
		})
	}
}

impl BitflagValue for CardholderVerificationMethodResults {
	const NUM_BYTES: usize = 3;
	const USED_BITS_MASK: &'static [u8] = &[0b0111_1111, 0b1111_1111, 0b1111_1111];

	fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = self.cv_rule.to_bytes();
		bytes.push(u8::from(self.result));
		bytes
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	use crate::wrong_byte_count;

	wrong_byte_count!(super::CardholderVerificationMethodResults, 3);
}
