//! Everything for handling the Issuer Application Data (IAD).
//!
//! Information for this can be found in EMV Book 3, under section `C7`.

// Uses
use std::cmp::Ordering;

use super::{CardVerificationResults, CommonCoreIdentifier, FormatCode};
use crate::error::ParseError;

// Constants
const NUM_BYTES: usize = 32;

// Struct Implementation
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IssuerApplicationData {
	pub cci: CommonCoreIdentifier,
	pub format_specific_data: FormatSpecificData,
}

impl TryFrom<&[u8]> for IssuerApplicationData {
	type Error = ParseError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		if bytes.len() != NUM_BYTES {
			return Err(ParseError::ByteCountIncorrect {
				r#type: Ordering::Equal,
				expected: NUM_BYTES,
				found: bytes.len(),
			});
		}

		// Byte 0 is the length of EMVCo-defined data in the IAD
		// Byte 16 is the length of the Issuer-Discretionary Data field in the IAD
		if bytes[0] != 0x0F || bytes[16] != 0x0F {
			return Err(ParseError::NonCcdCompliant);
		}

		let cci = CommonCoreIdentifier::try_from(&bytes[1..=1])?;
		let format_specific_data =
			FormatSpecificData::parse_format_data(cci.iad_format_code, bytes)?;

		Ok(Self {
			cci,
			format_specific_data,
		})
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FormatSpecificData {
	A {
		dki: u8,
		cvr: CardVerificationResults,
		counter_bytes: [u8; 8],
		issuer_discretionary_data: [u8; 15],
	},
}

impl FormatSpecificData {
	/// Parse the IAD according to the specified format.
	///
	/// Expects the entire IAD contents, including the non-format-specific
	/// parts.
	pub fn parse_format_data(format_code: FormatCode, bytes: &[u8]) -> Result<Self, ParseError> {
		match format_code {
			FormatCode::A => {
				let dki = bytes[2];

				let cvr = CardVerificationResults::try_from(&bytes[3..8])?;

				let mut counter_bytes = [0u8; 8];
				counter_bytes.copy_from_slice(&bytes[8..16]);

				let mut issuer_discretionary_data = [0u8; 15];
				issuer_discretionary_data.copy_from_slice(&bytes[17..32]);

				Ok(Self::A {
					dki,
					cvr,
					counter_bytes,
					issuer_discretionary_data,
				})
			}
		}
	}
}

impl PartialEq<FormatCode> for FormatSpecificData {
	fn eq(&self, other: &FormatCode) -> bool {
		match self {
			Self::A { .. } => *other == FormatCode::A,
		}
	}
}
impl PartialEq<FormatSpecificData> for FormatCode {
	fn eq(&self, other: &FormatSpecificData) -> bool {
		other.eq(self)
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	use super::{FormatSpecificData, IssuerApplicationData};
	use crate::error::ParseError;

	#[test]
	fn wrong_byte_count() {
		let result = IssuerApplicationData::try_from([0x00; NUM_BYTES_TEST - 1].as_slice());
		assert_eq!(
			result,
			Err(ParseError::ByteCountIncorrect {
				r#type: std::cmp::Ordering::Equal,
				expected: NUM_BYTES_TEST,
				found: NUM_BYTES_TEST - 1,
			})
		);
	}
	const NUM_BYTES_TEST: usize = 32;

	#[test]
	fn non_ccd_compliant_without_length_markers() {
		let mut bytes = [0u8; NUM_BYTES_TEST];
		bytes[0] = 0x0E;
		bytes[16] = 0x0F;

		assert_eq!(
			IssuerApplicationData::try_from(bytes.as_slice()),
			Err(ParseError::NonCcdCompliant)
		);
	}

	#[test]
	fn parses_format_a() {
		let mut bytes = [0u8; NUM_BYTES_TEST];
		bytes[0] = 0x0F;
		bytes[1] = 0b1010_0110; // Format A, AES
		bytes[2] = 0x12; // DKI
		bytes[3..8].copy_from_slice(&[0, 0, 0, 0, 0]); // CVR, all-zero is valid
		bytes[16] = 0x0F;

		let parsed = IssuerApplicationData::try_from(bytes.as_slice()).unwrap();
		assert!(matches!(
			parsed.format_specific_data,
			FormatSpecificData::A { dki: 0x12, .. }
		));
	}
}
