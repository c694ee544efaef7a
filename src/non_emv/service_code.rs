//! Everything for handling MSR service codes.
//!
//! Information for this can be found in [ISO/IEC 7813](https://www.iso.org/standard/43317.html).
//!
//! Relevant for the magnetic-stripe-equivalent Track 2 data carried by
//! Mastercard PayPass MStripe / qVSDC MSD contactless transactions.

// Uses
use std::cmp::Ordering;

use crate::{
	enum_no_repr_infallible,
	error::ParseError,
	util::{bytes_to_str, parse_str_to_u16},
};

// Struct Implementation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceCode {
	pub number: u16,
	pub interchange: Interchange,
	pub technology: Technology,
	pub authorisation_processing: AuthorisationProcessing,
	pub allowed_services: AllowedServices,
	pub pin_requirements: PinRequirements,
}

enum_no_repr_infallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Interchange: u8 {
	International = 1 | 2 => "International",
	National      = 5 | 6 => "National",
	Private       = 7     => "Private",
	Test          = 9     => "Test",
	Rfu           = _     => "RFU",
}
}

enum_no_repr_infallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Technology: u8 {
	IntegratedCircuitCard = 2 | 6 => "Integrated circuit card (ICC)",
	MagneticStripeOnly    = _     => "Magnetic stripe only (MSR)",
}
}

enum_no_repr_infallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuthorisationProcessing: u8 {
	Normal                          = 0 => "Normal",
	ByIssuer                        = 2 => "By issuer only (no offline authorisation)",
	ByIssuerUnlessExplicitAgreement = 4 => "By issuer only unless an explicit bilateral agreement \
											applies (no offline authorisation)",
	Rfu                             = _ => "RFU",
}
}

enum_no_repr_infallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllowedServices: u8 {
	NoRestrictions       = 0 | 1 | 6 => "No restrictions",
	GoodsAndServicesOnly = 2 | 5 | 7 => "Goods and services only",
	AtmOnly              = 3         => "ATM only",
	CashOnly             = 4         => "Cash only",
	Rfu                  = _         => "RFU",
}
}

enum_no_repr_infallible! {
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PinRequirements: u8 {
	None                  = 0 | 3 | 5 => "None",
	PinRequired           = 6 | 7     => "PIN required",
	PromptIfPinpadPresent = _         => "Prompt for PIN if PIN pad is present",
}
}

impl TryFrom<u16> for ServiceCode {
	type Error = ParseError;

	fn try_from(number: u16) -> Result<Self, Self::Error> {
		if number > 999 {
			return Err(ParseError::InvalidNumber);
		}

		let position_1 = ((number % 1000) / 100) as u8;
		let position_2 = ((number % 100) / 10) as u8;
		let position_3 = (number % 10) as u8;

		Ok(Self {
			number,
			interchange: Interchange::from(position_1),
			technology: Technology::from(position_1),
			authorisation_processing: AuthorisationProcessing::from(position_2),
			allowed_services: AllowedServices::from(position_3),
			pin_requirements: PinRequirements::from(position_3),
		})
	}
}

impl TryFrom<&[u8]> for ServiceCode {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		const NUM_BYTES: usize = 2;

		if raw_bytes.len() != NUM_BYTES {
			return Err(ParseError::ByteCountIncorrect {
				r#type: Ordering::Equal,
				expected: NUM_BYTES,
				found: raw_bytes.len(),
			});
		}

		parse_str_to_u16(bytes_to_str(raw_bytes).as_str()).and_then(Self::try_from)
	}
}

// Unit Tests
#[cfg(test)]
mod tests {
	use super::{AllowedServices, AuthorisationProcessing, Interchange, PinRequirements, ServiceCode, Technology};

	#[test]
	fn decodes_each_position() {
		let parsed = ServiceCode::try_from(201u16).unwrap();
		assert_eq!(parsed.interchange, Interchange::International);
		assert_eq!(parsed.technology, Technology::IntegratedCircuitCard);
		assert_eq!(parsed.authorisation_processing, AuthorisationProcessing::Normal);
		assert_eq!(parsed.allowed_services, AllowedServices::GoodsAndServicesOnly);
		assert_eq!(parsed.pin_requirements, PinRequirements::None);
	}

	#[test]
	fn number_over_999_is_invalid() {
		assert_eq!(
			ServiceCode::try_from(1000u16),
			Err(crate::error::ParseError::InvalidNumber)
		);
	}
}
