//! Everything for handling Cardholder Verification Method (CVM) Lists.
//!
//! Information for this can be found in EMV Book 3, under section `10.5`.

// Uses
use std::cmp::Ordering;

use super::{bitflag_values::BitflagValue, cv_rule::CardholderVerificationRule};
use crate::{error::ParseError, util::byte_slice_to_u32};

// Constants
const MIN_BYTES: usize = 8;

// Struct Implementation
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CardholderVerificationMethodList {
	pub x_value: u32,
	pub y_value: u32,
	pub cv_rules: Vec<CardholderVerificationRule>,
}

impl TryFrom<&[u8]> for CardholderVerificationMethodList {
	type Error = ParseError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		if bytes.len() < MIN_BYTES {
			return Err(ParseError::ByteCountIncorrect {
				r#type: Ordering::Greater,
				expected: MIN_BYTES,
				found: bytes.len(),
			});
		}

		let x_value = byte_slice_to_u32(&bytes[0..4]);
		let y_value = byte_slice_to_u32(&bytes[4..8]);
		let mut cv_rules =
			Vec::with_capacity((bytes.len() - MIN_BYTES) / CardholderVerificationRule::NUM_BYTES);
		for byte_pair in bytes[8..].chunks(CardholderVerificationRule::NUM_BYTES) {
			cv_rules.push(CardholderVerificationRule::try_from(byte_pair)?);
		}

		Ok(Self {
			x_value,
			y_value,
			cv_rules,
		})
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	use super::CardholderVerificationMethodList;
	use crate::{
		emv::cv_rule::{CardholderVerificationRule, CvMethod, CvmCondition},
		error::ParseError,
	};

	#[test]
	fn too_few_bytes_is_an_error() {
		let result = CardholderVerificationMethodList::try_from([0x00; 7].as_slice());
		assert_eq!(
			result,
			Err(ParseError::ByteCountIncorrect {
				r#type: std::cmp::Ordering::Greater,
				expected: 8,
				found: 7,
			})
		);
	}

	#[test]
	fn parses_x_y_and_cv_rules() {
		let mut bytes = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x27, 0x10];
		bytes.extend_from_slice(&[0b0101_1110, 0x03]);

		let parsed = CardholderVerificationMethodList::try_from(bytes.as_slice()).unwrap();
		assert_eq!(parsed.x_value, 0);
		assert_eq!(parsed.y_value, 10_000);
		assert_eq!(
			parsed.cv_rules,
			vec![CardholderVerificationRule {
				continue_if_unsuccessful: true,
				method: Some(CvMethod::Signature).into(),
				condition: Some(CvmCondition::TerminalSupported).into(),
			}]
		);
	}
}
