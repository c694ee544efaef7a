//! Everything for handling Terminal Transaction Qualifier (TTQ) values, EMV
//! tag `0x9F66`.
//!
//! The TTQ is the terminal-side counterpart to the card's
//! [`CardTransactionQualifiers`](super::CardTransactionQualifiers) - it is
//! built by the terminal and sent to the card as part of the PDOL response,
//! announcing which contactless modes and fallback behaviours this reader
//! supports.

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalTransactionQualifiers: 4 {
	0 {
		pub msd_supported: bool =                0b1000_0000 => "Mag-stripe mode (MSD) is supported",
		pub vsdc_supported: bool =               0b0100_0000 => "VSDC is supported",
		pub qvsdc_supported: bool =               0b0010_0000 => "qVSDC is supported",
		pub emv_contact_chip_supported: bool =    0b0001_0000 => "EMV contact chip is supported",
		pub offline_only_reader: bool =           0b0000_1000 => "Reader is offline-only",
		pub online_pin_supported: bool =          0b0000_0100 => "Online PIN is supported",
		pub signature_supported: bool =           0b0000_0010 => "Signature is supported",
		pub oda_for_online_authorizations_supported: bool = 0b0000_0001
			=> "Offline Data Authentication for online authorisations is supported",
	}
	1 {
		pub online_cryptogram_required: bool =    0b1000_0000 => "Online cryptogram required",
		pub cvm_required: bool =                  0b0100_0000 => "CVM required",
		pub contact_chip_offline_pin_supported: bool = 0b0010_0000
			=> "(Contact) chip offline PIN is supported",
	}
	2 {
		pub issuer_update_processing_supported: bool = 0b1000_0000
			=> "Issuer update processing is supported",
		pub consumer_device_cvm_supported: bool = 0b0100_0000
			=> "Consumer Device CVM is supported",
	}
	3 {}
}
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	// Tests
	wrong_byte_count!(super::TerminalTransactionQualifiers, 4);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let mut ttq =
			super::TerminalTransactionQualifiers::try_from([0x00; 4].as_slice()).unwrap();
		ttq.qvsdc_supported = true;
		ttq.consumer_device_cvm_supported = true;
		let bytes = ttq.to_bytes();
		assert_eq!(bytes, vec![0b0010_0000, 0x00, 0b0100_0000, 0x00]);
		let round_tripped =
			super::TerminalTransactionQualifiers::try_from(bytes.as_slice()).unwrap();
		assert_eq!(ttq, round_tripped);
	}
}
