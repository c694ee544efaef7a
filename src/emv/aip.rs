//! Everything for handling Application Interchange Profile (AIP) values.
//!
//! Information for this can be found in EMV Book 3, under section `C1`, with
//! the contactless-specific byte 2 bits coming from EMV Contactless Book C-2
//! / C-3 (the Relay Resistance Protocol indicator).

// Uses
use crate::bitflag_value;

// Struct Implementation
bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ApplicationInterchangeProfile: 2 {
	0 {
		pub sda_supported: bool =               0b0100_0000 => "Static Data Authentication is supported",
		pub dda_supported: bool =               0b0010_0000 => "Dynamic Data Authentication is supported",
		pub cardholder_verification_supported: bool = 0b0001_0000
			=> "Cardholder verification is supported",
		pub terminal_risk_management_performed: bool = 0b0000_1000
			=> "Terminal risk management is to be performed",
		pub issuer_authentication_supported: bool = 0b0000_0100
			=> "Issuer authentication is supported",
		pub mag_stripe_mode_supported: bool =   0b0000_0010
			=> "Mag-stripe mode (PayPass-style CVC3) is supported",
		pub cda_supported: bool =               0b0000_0001
			=> "Combined DDA/Application Cryptogram Generation (CDA) is supported",
	}
	1 {
		pub relay_resistance_protocol_supported: bool = 0b1000_0000
			=> "Relay Resistance Protocol is supported",
	}
}
}

impl ApplicationInterchangeProfile {
	/// The preferred offline data authentication method for this card, per
	/// the precedence rule CDA > DDA > SDA; `None` if the card supports none
	/// of them (and so is restricted to the mag-stripe/no-ODA path).
	#[must_use]
	pub fn preferred_oda_method(&self) -> Option<OdaMethod> {
		if self.cda_supported {
			Some(OdaMethod::Cda)
		} else if self.dda_supported {
			Some(OdaMethod::Dda)
		} else if self.sda_supported {
			Some(OdaMethod::Sda)
		} else {
			None
		}
	}
}

/// Which offline data authentication method a transaction will use, chosen
/// from the card's advertised [`ApplicationInterchangeProfile`] capabilities.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OdaMethod {
	Sda,
	/// Also covers fDDA (fast DDA), which reuses DDA's signature scheme but
	/// is performed during GPO instead of a dedicated INTERNAL AUTHENTICATE
	/// exchange.
	Dda,
	Cda,
}

// Unit Tests
#[cfg(test)]
mod tests {
	// Uses
	use crate::{emv::bitflag_values::BitflagValue, wrong_byte_count};

	// Tests
	wrong_byte_count!(super::ApplicationInterchangeProfile, 2);

	#[test]
	fn round_trip_preserves_unused_bits_zero() {
		let mut aip =
			super::ApplicationInterchangeProfile::try_from([0x00; 2].as_slice()).unwrap();
		aip.dda_supported = true;
		aip.relay_resistance_protocol_supported = true;
		let bytes = aip.to_bytes();
		assert_eq!(bytes, vec![0b0010_0000, 0b1000_0000]);
		let round_tripped =
			super::ApplicationInterchangeProfile::try_from(bytes.as_slice()).unwrap();
		assert_eq!(aip, round_tripped);
	}

	#[test]
	fn preferred_oda_method_follows_cda_dda_sda_precedence() {
		let mut aip =
			super::ApplicationInterchangeProfile::try_from([0x00; 2].as_slice()).unwrap();
		assert_eq!(aip.preferred_oda_method(), None);

		aip.sda_supported = true;
		assert_eq!(aip.preferred_oda_method(), Some(super::OdaMethod::Sda));

		aip.dda_supported = true;
		assert_eq!(aip.preferred_oda_method(), Some(super::OdaMethod::Dda));

		aip.cda_supported = true;
		assert_eq!(aip.preferred_oda_method(), Some(super::OdaMethod::Cda));
	}
}
