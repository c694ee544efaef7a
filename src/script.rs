//! Issuer script processing: tag `0x71` (pre-AC) and `0x72` (post-AC)
//! templates, each a TLV-wrapped list of `0x86` "Issuer Script Command"
//! APDU templates plus an optional `0x9F18` Issuer Script Identifier.
//!
//! Not named by the distilled spec, but required to exercise the
//! issuer-script authenticator capability described in §6 - see
//! `SPEC_FULL.md`'s supplemented script-processing detail.

use crate::{
	apdu::{ResponseApdu, SwClass},
	capabilities::{CommsError, Transceiver},
	emv::ber_tlv,
	error::KernelError,
};

const TAG_ISSUER_SCRIPT_COMMAND: [u8; 1] = [0x86];
const TAG_ISSUER_SCRIPT_IDENTIFIER: [u8; 2] = [0x9F, 0x18];

/// A parsed issuer script template (the contents of a `0x71` or `0x72`
/// tag): an ordered list of command APDUs to replay against the card.
#[derive(Clone, Debug, Default)]
pub struct IssuerScript {
	pub identifier: Option<Vec<u8>>,
	pub commands: Vec<Vec<u8>>,
}

impl IssuerScript {
	/// Parses a script template's raw TLV bytes (the value carried inside
	/// the `0x71`/`0x72` tag, not including that tag's own header).
	///
	/// # Errors
	/// Returns [`crate::error::ParseError`] if the bytes aren't valid
	/// BER-TLV.
	pub fn parse(bytes: &[u8]) -> Result<Self, crate::error::ParseError> {
		let block = ber_tlv::parse(bytes)?;
		let mut script = Self::default();
		for node in &block.nodes {
			if node.tag.tag == TAG_ISSUER_SCRIPT_COMMAND {
				script.commands.push(node.tag.data.clone());
			} else if node.tag.tag == TAG_ISSUER_SCRIPT_IDENTIFIER {
				script.identifier = Some(node.tag.data.clone());
			}
		}
		Ok(script)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}
}

/// Whether a script command failure should abort remaining script
/// processing. Per §4.4: abort on any command whose SW the script policy
/// marks fatal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptAbortPolicy {
	/// Abort remaining commands in this script template on the first `6xxx`
	/// class SW.
	AbortOnFirstError,
	/// Keep issuing remaining commands even if one fails.
	ContinueOnError,
}

/// The outcome of running an [`IssuerScript`] against the card.
#[derive(Clone, Debug)]
pub struct ScriptRunResult {
	pub commands_executed: usize,
	pub aborted: bool,
}

/// Drives `script`'s commands through `transceiver` in order, aborting per
/// `policy` on a fatal status word.
///
/// # Errors
/// Returns [`KernelError::CapabilityError`] if the transceiver reports a
/// communication failure.
pub fn run<T: Transceiver + ?Sized>(
	script: &IssuerScript,
	transceiver: &mut T,
	policy: ScriptAbortPolicy,
) -> Result<ScriptRunResult, KernelError> {
	let mut commands_executed = 0;
	for command in &script.commands {
		let raw = transceiver
			.transceive(command)
			.map_err(|err| capability_error(&err))?;
		commands_executed += 1;

		let response = ResponseApdu::parse(&raw)?;
		let is_fatal_class = response.sw1() & 0xF0 == 0x60 && response.classify() != SwClass::Success;
		if is_fatal_class && policy == ScriptAbortPolicy::AbortOnFirstError {
			return Ok(ScriptRunResult {
				commands_executed,
				aborted: true,
			});
		}
	}

	Ok(ScriptRunResult {
		commands_executed,
		aborted: false,
	})
}

fn capability_error(err: &CommsError) -> KernelError {
	KernelError::CapabilityError {
		which: "Transceiver",
		detail: err.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::{run, IssuerScript, ScriptAbortPolicy};
	use crate::capabilities::testing::ScriptedTransceiver;

	#[test]
	fn parses_single_command_with_identifier() {
		let mut bytes = vec![0x9F, 0x18, 0x02, 0x00, 0x01];
		bytes.extend_from_slice(&[0x86, 0x04, 0x84, 0x10, 0x00, 0x00]);
		let script = IssuerScript::parse(&bytes).unwrap();
		assert_eq!(script.identifier, Some(vec![0x00, 0x01]));
		assert_eq!(script.commands, vec![vec![0x84, 0x10, 0x00, 0x00]]);
	}

	#[test]
	fn runs_commands_in_order_and_stops_on_fatal_sw() {
		let script = IssuerScript {
			identifier: None,
			commands: vec![vec![0x84, 0x10, 0x00, 0x00], vec![0x84, 0x20, 0x00, 0x00]],
		};
		let mut transceiver = ScriptedTransceiver::new()
			.expect(vec![0x84, 0x10, 0x00, 0x00], vec![0x90, 0x00])
			.expect(vec![0x84, 0x20, 0x00, 0x00], vec![0x6A, 0x81]);

		let result = run(&script, &mut transceiver, ScriptAbortPolicy::AbortOnFirstError).unwrap();
		assert_eq!(result.commands_executed, 2);
		assert!(result.aborted);
	}
}
