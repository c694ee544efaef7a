//! Everything for handling Terminal Verification Results (TVR) values.
//!
//! Information for this can be found in EMV Book 3, under section `C5`.

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalVerificationResults: 5 {
	0 {
		pub offline_data_authentication_not_performed: bool = 0b1000_0000
			=> "Offline data authentication was not performed",
		pub sda_failed: bool =                                0b0100_0000
			=> (Error, "SDA (Static Data Authentication) failed"),
		pub icc_data_missing: bool =                          0b0010_0000
			=> (Error, "ICC data missing"),
		pub terminal_card_exception: bool =                   0b0001_0000
			=> (Error, "Card appears on terminal exception file"),
		pub dda_failed: bool =                                0b0000_1000
			=> (Error, "DDA (Dynamic Data Authentication) failed"),
		pub cda_failed: bool =                                0b0000_0100
			=> (Error, "CDA (Combined Data Authentication) failed"),
	}
	1 {
		pub icc_terminal_version_mismatch: bool = 0b1000_0000
			=> (Warning, "ICC and terminal have different application versions"),
		pub expired_application: bool =           0b0100_0000
			=> (Error, "Expired application"),
		pub application_not_yet_effective: bool = 0b0010_0000
			=> (Error, "Application not yet effective"),
		pub requested_service_not_allowed: bool = 0b0001_0000
			=> (Error, "Requested service not allowed for card product"),
		pub new_card: bool =                      0b0000_1000
			=> (Warning, "New card"),
		pub relay_resistance_threshold_exceeded: bool = 0b0000_0100
			=> (Error, "Relay resistance time threshold exceeded (Mastercard RRP extension)"),
	}
	2 {
		pub cardholder_verification_unsuccessful: bool = 0b1000_0000
			=> (Warning, "Cardholder verification was not successful"),
		pub unrecognized_cvm: bool =                     0b0100_0000
			=> (Warning, "Unrecognised CVM (Cardholder Verification Method)"),
		pub pin_try_limit_exceeded: bool =               0b0010_0000
			=> (Error, "PIN try limit exceeded"),
		pub pin_entry_required_but_no_pinpad: bool =     0b0001_0000
			=> (Error, "PIN entry required and PIN pad not present or not working"),
		pub pin_entry_required_but_no_entry: bool =      0b0000_1000
			=> (Warning, "PIN entry required, PIN pad present, but PIN was not entered (PIN \
							  bypass)"),
		pub online_pin_entered: bool =                   0b0000_0100
			=> "Online PIN entered",
	}
	3 {
		pub transaction_exceeds_floor_limit: bool =            0b1000_0000
			=> "Transaction exceeds floor limit",
		pub consecutive_offline_limit_lower_exceeded: bool =   0b0100_0000
			=> "Lower consecutive offline limit exceeded",
		pub consecutive_offline_limit_upper_exceeded: bool =   0b0010_0000
			=> "Upper consecutive offline limit exceeded",
		pub transaction_selected_for_online_processing: bool = 0b0001_0000
			=> "Transaction selected randomly for online processing",
		pub merchant_forced_transaction_online: bool =         0b0000_1000
			=> "Merchant forced transaction online",
	}
	4 {
		pub default_tdol_used: bool =                            0b1000_0000
			=> "Default TDOL (Transaction Certificate Data Object List) used",
		pub issuer_authentication_failed: bool =                 0b0100_0000
			=> (Error, "Issuer authentication failed"),
		pub script_processing_failed_before_final_gen_ac: bool = 0b0010_0000
			=> (Error, "Script processing failed before final GENERATE AC"),
		pub script_processing_failed_after_final_gen_ac: bool =  0b0001_0000
			=> (Error, "Script processing failed after final GENERATE AC"),
	}
}
}

impl TerminalVerificationResults {
	/// Whether any bit set in `self` is also set in either `iac` or `tac`,
	/// per the action-code matching rule: bitwise OR the two action codes,
	/// then AND with the TVR; non-zero in any of the 5 bytes is a match.
	#[must_use]
	pub fn matches_action_code(&self, iac: &[u8; 5], tac: &[u8; 5]) -> bool {
		let tvr_bytes = {
			use crate::emv::bitflag_values::BitflagValue;
			self.to_bytes()
		};
		(0..5).any(|i| (tvr_bytes[i] & (iac[i] | tac[i])) != 0)
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	// Tests
	wrong_byte_count!(super::TerminalVerificationResults, 5);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let mut tvr = super::TerminalVerificationResults::try_from([0x00; 5].as_slice()).unwrap();
		tvr.sda_failed = true;
		tvr.expired_application = true;
		let bytes = tvr.to_bytes();
		let round_tripped = super::TerminalVerificationResults::try_from(bytes.as_slice()).unwrap();
		assert_eq!(tvr, round_tripped);
	}

	#[test]
	fn matches_action_code_is_bitwise_or_then_and() {
		let mut tvr = super::TerminalVerificationResults::try_from([0x00; 5].as_slice()).unwrap();
		tvr.expired_application = true;
		let iac = [0x00, 0x40, 0x00, 0x00, 0x00];
		let tac = [0x00; 5];
		assert!(tvr.matches_action_code(&iac, &tac));
		assert!(!tvr.matches_action_code(&[0x00; 5], &[0x00; 5]));
	}
}
