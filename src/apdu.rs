//! The APDU layer: ISO 7816-4 command encoding and status-word
//! classification, per §4.3.

use crate::error::KernelError;

/// A command APDU, encoded per ISO 7816-4 cases 1-4.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandApdu {
	pub cla: u8,
	pub ins: u8,
	pub p1: u8,
	pub p2: u8,
	pub data: Vec<u8>,
	/// `Le`, if the command expects response data. `None` selects case
	/// 1/3 encoding (no `Le` byte); `Some(0)` requests "as much as the card
	/// has" (encoded as `0x00`, or `0x0000` in extended form).
	pub le: Option<u16>,
	pub extended_length: bool,
}

impl CommandApdu {
	#[must_use]
	pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
		Self {
			cla,
			ins,
			p1,
			p2,
			data: Vec::new(),
			le: None,
			extended_length: false,
		}
	}

	#[must_use]
	pub fn with_data(mut self, data: Vec<u8>) -> Self {
		self.data = data;
		self
	}

	#[must_use]
	pub fn with_le(mut self, le: u16) -> Self {
		self.le = Some(le);
		self
	}

	#[must_use]
	pub fn with_extended_length(mut self, extended: bool) -> Self {
		self.extended_length = extended;
		self
	}

	/// Encodes the command to its wire bytes, choosing case 1-4 short form,
	/// or extended length encoding when `extended_length` is set and the
	/// data or expected response don't fit in short form.
	#[must_use]
	pub fn encode(&self) -> Vec<u8> {
		let needs_extended = self.extended_length
			&& (self.data.len() > 255 || matches!(self.le, Some(le) if le > 256));

		let mut out = vec![self.cla, self.ins, self.p1, self.p2];

		if needs_extended {
			if !self.data.is_empty() {
				out.push(0x00);
				out.extend((self.data.len() as u16).to_be_bytes());
				out.extend(&self.data);
			}
			if let Some(le) = self.le {
				if self.data.is_empty() {
					out.push(0x00);
				}
				if le == 0 {
					out.extend([0x00, 0x00]);
				} else {
					out.extend(le.to_be_bytes());
				}
			}
		} else {
			if !self.data.is_empty() {
				out.push(self.data.len() as u8);
				out.extend(&self.data);
			}
			if let Some(le) = self.le {
				out.push(le as u8);
			}
		}

		out
	}
}

/// A response APDU: trailing data plus the two-byte status word.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseApdu {
	pub data: Vec<u8>,
	pub sw: u16,
}

impl ResponseApdu {
	/// # Errors
	/// Returns [`KernelError::UnexpectedSw`] if `bytes` is shorter than 2
	/// bytes (too short to contain a status word).
	pub fn parse(bytes: &[u8]) -> Result<Self, KernelError> {
		if bytes.len() < 2 {
			return Err(KernelError::UnexpectedSw { sw: 0x0000 });
		}
		let split_at = bytes.len() - 2;
		let sw = u16::from_be_bytes([bytes[split_at], bytes[split_at + 1]]);
		Ok(Self {
			data: bytes[..split_at].to_vec(),
			sw,
		})
	}

	#[must_use]
	pub fn sw1(&self) -> u8 {
		(self.sw >> 8) as u8
	}

	#[must_use]
	pub fn sw2(&self) -> u8 {
		(self.sw & 0xFF) as u8
	}

	#[must_use]
	pub fn classify(&self) -> SwClass {
		match (self.sw1(), self.sw2()) {
			(0x90, 0x00) => SwClass::Success,
			(0x61, more) => SwClass::MoreDataAvailable { le: more },
			(0x62, _) | (0x63, _) => SwClass::Warning,
			(0x69, 0x85) => SwClass::RetryableOnce,
			(0x69, 0x84 | 0x86) => SwClass::TryAnotherInterface,
			(0x6A, 0x81 | 0x82 | 0x83) => SwClass::Fatal,
			(0x67, 0x00) => SwClass::Fatal,
			(0x6D, 0x00) | (0x6E, 0x00) => SwClass::Fatal,
			_ => SwClass::Unknown,
		}
	}
}

/// The classification bucket a status word falls into, per §4.3's table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwClass {
	/// `0x9000` - deliver data.
	Success,
	/// `0x61xx` - auto-issue GET RESPONSE with `Le = xx` and concatenate.
	MoreDataAvailable { le: u8 },
	/// `0x62xx` / `0x63xx` - deliver data with a warning flag.
	Warning,
	/// `0x6985` - conditions not satisfied; retryable once.
	RetryableOnce,
	/// `0x6984` / `0x6986` - not usable; surface "try another interface".
	TryAnotherInterface,
	/// `0x6A81/82/83`, `0x6700`, `0x6D00`, `0x6E00` - fatal for the
	/// operation.
	Fatal,
	/// Anything else - fatal, with the SW surfaced in the error message.
	Unknown,
}

/// Builds a GET RESPONSE command per `0x61xx` chaining, requesting `le`
/// bytes of the remaining response data.
#[must_use]
pub fn get_response(cla: u8, le: u8) -> CommandApdu {
	CommandApdu::new(cla, 0xC0, 0x00, 0x00).with_le(u16::from(le))
}

/// Transceives `command`, transparently following `0x61xx` GET RESPONSE
/// chaining via `transceive_fn` until a terminal status word is reached,
/// concatenating response data in order.
///
/// # Errors
/// Returns whatever `transceive_fn` returns, or [`KernelError::UnexpectedSw`]
/// if the final status word doesn't classify as [`SwClass::Success`] or
/// [`SwClass::Warning`].
pub fn transceive_with_chaining<F>(
	command: &CommandApdu,
	mut transceive_fn: F,
) -> Result<ResponseApdu, KernelError>
where
	F: FnMut(&[u8]) -> Result<Vec<u8>, KernelError>,
{
	let raw = transceive_fn(&command.encode())?;
	let mut response = ResponseApdu::parse(&raw)?;

	loop {
		match response.classify() {
			SwClass::Success | SwClass::Warning => return Ok(response),
			SwClass::MoreDataAvailable { le } => {
				let raw = transceive_fn(&get_response(command.cla, le).encode())?;
				let next = ResponseApdu::parse(&raw)?;
				let mut data = response.data;
				data.extend(next.data);
				response = ResponseApdu { data, sw: next.sw };
			}
			SwClass::RetryableOnce | SwClass::TryAnotherInterface | SwClass::Fatal | SwClass::Unknown => {
				return Err(KernelError::UnexpectedSw { sw: response.sw });
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{CommandApdu, ResponseApdu, SwClass};

	#[test]
	fn encodes_case_1_with_no_data_or_le() {
		let command = CommandApdu::new(0x00, 0xA4, 0x04, 0x00);
		assert_eq!(command.encode(), vec![0x00, 0xA4, 0x04, 0x00]);
	}

	#[test]
	fn encodes_case_3_with_data_only() {
		let command = CommandApdu::new(0x00, 0xA4, 0x04, 0x00).with_data(vec![0xA0, 0x00]);
		assert_eq!(command.encode(), vec![0x00, 0xA4, 0x04, 0x00, 0x02, 0xA0, 0x00]);
	}

	#[test]
	fn encodes_case_4_with_data_and_le() {
		let command = CommandApdu::new(0x80, 0xA8, 0x00, 0x00)
			.with_data(vec![0x83, 0x00])
			.with_le(0x00);
		assert_eq!(
			command.encode(),
			vec![0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00]
		);
	}

	#[test]
	fn classifies_success() {
		let response = ResponseApdu::parse(&[0x01, 0x02, 0x90, 0x00]).unwrap();
		assert_eq!(response.classify(), SwClass::Success);
		assert_eq!(response.data, vec![0x01, 0x02]);
	}

	#[test]
	fn classifies_more_data_available() {
		let response = ResponseApdu::parse(&[0x61, 0x1A]).unwrap();
		assert_eq!(response.classify(), SwClass::MoreDataAvailable { le: 0x1A });
	}

	#[test]
	fn classifies_conditions_not_satisfied_as_retryable_once() {
		let response = ResponseApdu::parse(&[0x69, 0x85]).unwrap();
		assert_eq!(response.classify(), SwClass::RetryableOnce);
	}

	#[test]
	fn classifies_wrong_length_as_fatal() {
		let response = ResponseApdu::parse(&[0x67, 0x00]).unwrap();
		assert_eq!(response.classify(), SwClass::Fatal);
	}
}
