//! Everything for handling Application Usage Control (AUC) values.
//!
//! Information for this can be found in EMV Book 3, under section `C2`.

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ApplicationUsageControl: 2 {
	0 {
		pub valid_for_domestic_cash: bool =        0b1000_0000 => "Valid for domestic cash transactions",
		pub valid_for_international_cash: bool =   0b0100_0000
			=> "Valid for international cash transactions",
		pub valid_for_domestic_goods: bool =       0b0010_0000 => "Valid for domestic goods",
		pub valid_for_international_goods: bool =  0b0001_0000 => "Valid for international goods",
		pub valid_for_domestic_services: bool =    0b0000_1000 => "Valid for domestic services",
		pub valid_for_international_services: bool = 0b0000_0100
			=> "Valid for international services",
		pub valid_at_atms: bool =                  0b0000_0010 => "Valid at ATMs",
		pub valid_at_terminals_other_than_atms: bool = 0b0000_0001
			=> "Valid at terminals other than ATMs",
	}
	1 {
		pub domestic_cashback_allowed: bool =      0b1000_0000 => "Domestic cashback allowed",
		pub international_cashback_allowed: bool = 0b0100_0000 => "International cashback allowed",
	}
}
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	// Tests
	wrong_byte_count!(super::ApplicationUsageControl, 2);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let mut auc = super::ApplicationUsageControl::try_from([0x00; 2].as_slice()).unwrap();
		auc.valid_for_domestic_cash = true;
		auc.domestic_cashback_allowed = true;
		let bytes = auc.to_bytes();
		assert_eq!(bytes, vec![0b1000_0000, 0b1000_0000]);
		let round_tripped =
			super::ApplicationUsageControl::try_from(bytes.as_slice()).unwrap();
		assert_eq!(auc, round_tripped);
	}
}
