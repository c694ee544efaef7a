//! Everything for handling Card Verification Results (CVR) values.
//!
//! Information for this can be found in EMV Book 3, under section `C7.3`.

// Uses
use std::cmp::Ordering;

use crate::{
	emv::bitflag_values::BitflagValue,
	enum_repr_fallible,
	error::ParseError,
};

// Struct Implementation
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CardVerificationResults {
	// Byte 1 Values
	pub gen_ac_2_application_cryptogram_type: GenAc2ApplicationCryptogramType,
	pub gen_ac_1_application_cryptogram_type: GenAc1ApplicationCryptogramType,
	pub cda_performed: bool,
	pub offline_dda_performed: bool,
	pub issuer_authentication_not_performed: bool,
	pub issuer_authentication_failed: bool,
	// Byte 2 Values
	pub pin_try_count: u8,
	pub offline_pin_verification_performed: bool,
	pub offline_pin_verification_failed: bool,
	pub pin_try_limit_exceeded: bool,
	pub last_online_transaction_not_completed: bool,
	// Byte 3 Values
	pub offline_transaction_count_limit_lower_exceeded: bool,
	pub offline_transaction_count_limit_upper_exceeded: bool,
	pub offline_cumulative_amount_limit_lower_exceeded: bool,
	pub offline_cumulative_amount_limit_upper_exceeded: bool,
	pub issuer_discretionary_bit_1: bool,
	pub issuer_discretionary_bit_2: bool,
	pub issuer_discretionary_bit_3: bool,
	pub issuer_discretionary_bit_4: bool,
	// Byte 4 Values
	pub successful_issuer_script_commands_with_secure_messaging: u8,
	pub issuer_script_processing_failed: bool,
	pub offline_data_authentication_failed_on_previous_transaction: bool,
	pub go_online_on_next_transaction: bool,
	pub unable_to_go_online: bool,
}

enum_repr_fallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GenAc1ApplicationCryptogramType: u8, ParseError, { |_| ParseError::NonCcdCompliant } {
	Aac  = 0b00 => "AAC (Application Authentication Cryptogram)",
	Tc   = 0b01 => "TC (Transaction Certificate)",
	Arqc = 0b10 => "ARQC (Authorization Request Cryptogram)",
	Rfu  = 0b11 => "RFU (Reserved For Use)",
}
}

enum_repr_fallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GenAc2ApplicationCryptogramType: u8, ParseError, { |_| ParseError::NonCcdCompliant } {
	Aac                     = 0b00 => "AAC (Application Authentication Cryptogram)",
	Tc                      = 0b01 => "TC (Transaction Certificate)",
	SecondGenAcNotRequested = 0b10 => "Second GENERATE AC not requested",
	Rfu                     = 0b11 => "RFU (Reserved For Use)",
}
}

impl TryFrom<&[u8]> for CardVerificationResults {
	type Error = ParseError;

	#[rustfmt::skip]
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
			gen_ac_2_application_cryptogram_type: {
				GenAc2ApplicationCryptogramType::try_from((0b1100_0000 & bytes[0]) >> 6)?
			},
			gen_ac_1_application_cryptogram_type: {
				GenAc1ApplicationCryptogramType::try_from((0b0011_0000 & bytes[0]) >> 4)?
			},
			cda_performed:                                              0b0000_1000 & bytes[0] > 0,
			offline_dda_performed:                                      0b0000_0100 & bytes[0] > 0,
			issuer_authentication_not_performed:                        0b0000_0010 & bytes[0] > 0,
			issuer_authentication_failed:                               0b0000_0001 & bytes[0] > 0,
			pin_try_count:                                            ((0b1111_0000 & bytes[1]) >> 4),
			offline_pin_verification_performed:                         0b0000_1000 & bytes[1] > 0,
			offline_pin_verification_failed:                            0b0000_0100 & bytes[1] > 0,
			pin_try_limit_exceeded:                                     0b0000_0010 & bytes[1] > 0,
			last_online_transaction_not_completed:                      0b0000_0001 & bytes[1] > 0,
			offline_transaction_count_limit_lower_exceeded:             0b1000_0000 & bytes[2] > 0,
			offline_transaction_count_limit_upper_exceeded:             0b0100_0000 & bytes[2] > 0,
			offline_cumulative_amount_limit_lower_exceeded:             0b0010_0000 & bytes[2] > 0,
			offline_cumulative_amount_limit_upper_exceeded:             0b0001_0000 & bytes[2] > 0,
			issuer_discretionary_bit_1:                                 0b0000_1000 & bytes[2] > 0,
			issuer_discretionary_bit_2:                                 0b0000_0100 & bytes[2] > 0,
			issuer_discretionary_bit_3:                                 0b0000_0010 & bytes[2] > 0,
			issuer_discretionary_bit_4:                                 0b0000_0001 & bytes[2] > 0,
			successful_issuer_script_commands_with_secure_messaging:  ((0b1111_0000 & bytes[3]) >> 4),
			issuer_script_processing_failed:                            0b0000_1000 & bytes[3] > 0,
			offline_data_authentication_failed_on_previous_transaction: 0b0000_0100 & bytes[3] > 0,
			go_online_on_next_transaction:                              0b0000_0010 & bytes[3] > 0,
			unable_to_go_online:                                        0b0000_0001 & bytes[3] > 0,
		})
	}
}

impl BitflagValue for CardVerificationResults {
	const NUM_BYTES: usize = 5;
	const USED_BITS_MASK: &'static [u8] = &[
		0b1111_1111,
		0b1111_1111,
		0b1111_1111,
		0b1111_1111,
		0b0000_0000,
	];

	#[rustfmt::skip]
	fn to_bytes(&self) -> Vec<u8> {
		vec![
			(u8::from(self.gen_ac_2_application_cryptogram_type) << 6)
				| (u8::from(self.gen_ac_1_application_cryptogram_type) << 4)
				| u8::from(self.cda_performed) << 3
				| u8::from(self.offline_dda_performed) << 2
				| u8::from(self.issuer_authentication_not_performed) << 1
				| u8::from(self.issuer_authentication_failed),
			(self.pin_try_count << 4)
				| u8::from(self.offline_pin_verification_performed) << 3
				| u8::from(self.offline_pin_verification_failed) << 2
				| u8::from(self.pin_try_limit_exceeded) << 1
				| u8::from(self.last_online_transaction_not_completed),
			u8::from(self.offline_transaction_count_limit_lower_exceeded) << 7
				| u8::from(self.offline_transaction_count_limit_upper_exceeded) << 6
				| u8::from(self.offline_cumulative_amount_limit_lower_exceeded) << 5
				| u8::from(self.offline_cumulative_amount_limit_upper_exceeded) << 4
				| u8::from(self.issuer_discretionary_bit_1) << 3
				| u8::from(self.issuer_discretionary_bit_2) << 2
				| u8::from(self.issuer_discretionary_bit_3) << 1
				| u8::from(self.issuer_discretionary_bit_4),
			(self.successful_issuer_script_commands_with_secure_messaging << 4)
				| u8::from(self.issuer_script_processing_failed) << 3
				| u8::from(self.offline_data_authentication_failed_on_previous_transaction) << 2
				| u8::from(self.go_online_on_next_transaction) << 1
				| u8::from(self.unable_to_go_online),
			0x00,
		]
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::wrong_byte_count;

	// Tests
	wrong_byte_count!(super::CardVerificationResults, 5);

	#[test]
	fn round_trip() {
		let bytes = [0b1011_0101, 0b0010_1001, 0b1100_0011, 0b0101_0110, 0x00];
		let parsed = super::CardVerificationResults::try_from(bytes.as_slice()).unwrap();
		assert_eq!(parsed.to_bytes(), bytes);
	}
}
