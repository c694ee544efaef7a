//! Everything for handling Terminal Capabilities values.
//!
//! Information for this can be found in EMV Book 4, under section `A2`.

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalCapabilities: 3 {
	// Card Data Input Capabilities
	0 {
		pub input_manual_key_entry: bool = 0b1000_0000 => "Manual key entry",
		pub input_magnetic_stripe: bool =  0b0100_0000 => "Magnetic stripe",
		pub input_icc: bool =              0b0010_0000 => "IC with contacts",
	}
	// CVM Capabilities
	1 {
		pub cvm_plaintext_pin_for_icc_verification: bool =      0b1000_0000
			=> "Plaintext PIN for ICC verification",
		pub cvm_enciphered_pin_for_online_verification: bool =  0b0100_0000
			=> "Enciphered PIN for online verification",
		pub cvm_signature: bool =                               0b0010_0000
			=> "Signature (paper)",
		pub cvm_enciphered_pin_for_offline_verification: bool = 0b0001_0000
			=> "Enciphered PIN for offline verification",
		pub cvm_no_cvm_required: bool =                         0b0000_1000
			=> "No CVM Required",
	}
	// Security Capabilities
	2 {
		pub security_sda: bool =          0b1000_0000 => "SDA (Static Data Authentication)",
		pub security_dda: bool =          0b0100_0000 => "DDA (Dynamic Data Authentication)",
		pub security_card_capture: bool = 0b0010_0000 => "Card capture (ATM retaining the card)",
		pub security_cda: bool =          0b0000_1000 => "CDA (Combined Data Authentication)",
	}
}
}

// Unit Tests
#[cfg(test)]
mod tests {
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	wrong_byte_count!(super::TerminalCapabilities, 3);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let bytes = [0b1110_0000, 0b1111_1000, 0b1110_1000];
		let parsed = super::TerminalCapabilities::try_from(bytes.as_slice()).unwrap();
		assert_eq!(parsed.to_bytes(), bytes);
	}
}
