//! Terminal Action Codes (TAC): the acquirer-configured counterpart to the
//! issuer's Action Codes in [`crate::emv::iac`], same 5-byte TVR-shaped
//! layout per EMV Book 4 §A2.
//!
//! A card only ever carries Issuer Action Codes; Terminal Action Codes live
//! in the terminal's own configuration and are supplied by the acquirer.
//! The risk/TAA transition in EMV Book 4 §6.3.6 always consults both, OR'd
//! together bit-for-bit before the AND against the TVR.

use crate::{error::ParseError, TerminalVerificationResults};

/// Mirrors [`crate::emv::iac::IssuerActionCodeDefault`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalActionCodeDefault {
	pub tvr: TerminalVerificationResults,
}

impl Default for TerminalActionCodeDefault {
	fn default() -> Self {
		Self {
			tvr: all_ones_tvr(),
		}
	}
}

impl TryFrom<&[u8]> for TerminalActionCodeDefault {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

/// Mirrors [`crate::emv::iac::IssuerActionCodeOnline`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalActionCodeOnline {
	pub tvr: TerminalVerificationResults,
}

impl Default for TerminalActionCodeOnline {
	fn default() -> Self {
		Self {
			tvr: all_ones_tvr(),
		}
	}
}

impl TryFrom<&[u8]> for TerminalActionCodeOnline {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

/// Mirrors [`crate::emv::iac::IssuerActionCodeDenial`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalActionCodeDenial {
	pub tvr: TerminalVerificationResults,
}

impl Default for TerminalActionCodeDenial {
	fn default() -> Self {
		Self {
			tvr: TerminalVerificationResults::try_from([0x00; 5].as_slice())
				.expect("default value for `Terminal Action Code - Denial` couldn't be parsed"),
		}
	}
}

impl TryFrom<&[u8]> for TerminalActionCodeDenial {
	type Error = ParseError;

	fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
		Ok(Self {
			tvr: TerminalVerificationResults::try_from(raw_bytes)?,
		})
	}
}

fn all_ones_tvr() -> TerminalVerificationResults {
	TerminalVerificationResults::try_from([0xFFu8; 5].as_slice())
		.expect("all-ones TVR value couldn't be parsed")
}

/// The terminal's full set of configured action codes, supplied once at
/// kernel construction (typically sourced from [`crate::config::Config`]).
#[derive(Clone, Debug, Default)]
pub struct TerminalActionCodes {
	pub default: TerminalActionCodeDefault,
	pub online: TerminalActionCodeOnline,
	pub denial: TerminalActionCodeDenial,
}

#[cfg(test)]
mod tests {
	use super::{TerminalActionCodeDefault, TerminalActionCodeDenial, TerminalActionCodeOnline};
	use crate::emv::bitflag_values::BitflagValue;

	#[test]
	fn default_and_online_default_to_all_ones() {
		assert_eq!(
			TerminalActionCodeDefault::default().tvr.to_bytes(),
			vec![0xFF; 5]
		);
		assert_eq!(
			TerminalActionCodeOnline::default().tvr.to_bytes(),
			vec![0xFF; 5]
		);
	}

	#[test]
	fn denial_defaults_to_all_zeroes() {
		assert_eq!(
			TerminalActionCodeDenial::default().tvr.to_bytes(),
			vec![0x00; 5]
		);
	}
}
