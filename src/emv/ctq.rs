//! Everything for handling Card Transaction Qualifier (CTQ) values, EMV tag
//! `0x9F6C`.
//!
//! The CTQ is a contactless-specific card data object (not part of base EMV
//! Book 3/4) that tells the terminal which fallback/CVM behaviours the card
//! is asking for. Layout follows the common contactless kernel usage shared
//! by Visa qVSDC and the Mastercard/PayPass-adjacent kernels.

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CardTransactionQualifiers: 2 {
	0 {
		pub online_pin_required: bool =   0b1000_0000 => "Online PIN required",
		pub signature_required: bool =    0b0100_0000 => "Signature required",
		pub go_online_if_oda_fails: bool = 0b0010_0000
			=> "Go online if offline data authentication fails",
		pub switch_interface_if_oda_fails_and_cvm_required: bool = 0b0001_0000
			=> "Switch interface if offline data authentication fails and a CVM is required",
		pub go_online_if_application_expired: bool = 0b0000_1000
			=> "Go online if the application has expired",
		pub switch_interface_for_cash: bool = 0b0000_0100
			=> "Switch interface for cash transactions",
		pub switch_interface_for_cashback: bool = 0b0000_0010
			=> "Switch interface for cashback transactions",
	}
	1 {
		pub consumer_device_cvm_performed: bool = 0b1000_0000
			=> "Consumer Device CVM was performed",
		pub card_supports_issuer_update_processing: bool = 0b0100_0000
			=> "Card supports issuer update processing at the POS",
	}
}
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	// Tests
	wrong_byte_count!(super::CardTransactionQualifiers, 2);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let mut ctq =
			super::CardTransactionQualifiers::try_from([0x00; 2].as_slice()).unwrap();
		ctq.online_pin_required = true;
		ctq.consumer_device_cvm_performed = true;
		let bytes = ctq.to_bytes();
		assert_eq!(bytes, vec![0b1000_0000, 0b1000_0000]);
		let round_tripped =
			super::CardTransactionQualifiers::try_from(bytes.as_slice()).unwrap();
		assert_eq!(ctq, round_tripped);
	}
}
