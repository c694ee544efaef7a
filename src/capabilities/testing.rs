//! In-memory and scripted implementations of the capability traits, for use
//! in this crate's own tests and by embedders' integration tests.
//!
//! Grounded on the approach of wrapping an in-memory duplex stream behind
//! the same trait a real transport uses, the way a terminal-vendor test
//! harness stubs its socket transport in integration tests.

#![cfg(any(test, feature = "testing-util"))]

use std::collections::HashMap;

use super::{
	CaKeyStore,
	CaPublicKey,
	Clock,
	CommsError,
	OdaResult,
	OdaVerifier,
	Persistence,
	PersistenceError,
	ReversalSender,
	Rng,
	ScriptAuthResult,
	SendResult,
};

/// A transceiver driven by a pre-programmed command/response script, for
/// end-to-end kernel scenario tests. Each call to
/// [`Transceiver::transceive`] consumes the next scripted pair and asserts
/// the command matches what was expected.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransceiver {
	script: Vec<(Vec<u8>, ScriptedResponse)>,
	cursor: usize,
}

#[derive(Clone, Debug)]
enum ScriptedResponse {
	Bytes(Vec<u8>),
	Disconnect,
}

impl ScriptedTransceiver {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an expected command and the response to return for it.
	#[must_use]
	pub fn expect(mut self, command: Vec<u8>, response: Vec<u8>) -> Self {
		self.script.push((command, ScriptedResponse::Bytes(response)));
		self
	}

	/// Appends an expected command that, when sent, simulates the
	/// transceiver losing contact with the card (used for tear-off
	/// scenarios).
	#[must_use]
	pub fn expect_disconnect(mut self, command: Vec<u8>) -> Self {
		self.script.push((command, ScriptedResponse::Disconnect));
		self
	}

	/// Whether every scripted exchange was consumed.
	#[must_use]
	pub fn is_exhausted(&self) -> bool {
		self.cursor == self.script.len()
	}
}

impl super::Transceiver for ScriptedTransceiver {
	fn transceive(&mut self, command_bytes: &[u8]) -> Result<Vec<u8>, CommsError> {
		let (expected_command, response) = self
			.script
			.get(self.cursor)
			.unwrap_or_else(|| panic!("transceive called with no more scripted exchanges left"));
		assert_eq!(
			expected_command.as_slice(),
			command_bytes,
			"command at step {} didn't match the script",
			self.cursor
		);
		self.cursor += 1;
		match response {
			ScriptedResponse::Bytes(bytes) => Ok(bytes.clone()),
			ScriptedResponse::Disconnect => Err(CommsError::CardRemoved),
		}
	}
}

/// An ODA verifier that always returns a pre-configured result, for tests
/// that don't exercise the cryptographic failure paths themselves.
#[derive(Clone, Debug)]
pub struct StubOdaVerifier {
	pub result: OdaResult,
}

impl StubOdaVerifier {
	#[must_use]
	pub fn always(result: OdaResult) -> Self {
		Self { result }
	}
}

impl OdaVerifier for StubOdaVerifier {
	fn perform_sda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		self.result.clone()
	}

	fn perform_dda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		self.result.clone()
	}

	fn perform_fdda(&mut self, _: &[u8], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> OdaResult {
		self.result.clone()
	}

	fn perform_cda(
		&mut self,
		_: &[u8],
		_: &[u8],
		_: &[u8],
		_: &[u8],
		_: &[u8],
		_: &[u8],
	) -> OdaResult {
		self.result.clone()
	}
}

/// A CA key store backed by an in-memory map, keyed by `(rid, index)`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCaKeyStore {
	keys: HashMap<(Vec<u8>, u8), CaPublicKey>,
}

impl InMemoryCaKeyStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, rid: Vec<u8>, index: u8, key: CaPublicKey) {
		self.keys.insert((rid, index), key);
	}
}

impl CaKeyStore for InMemoryCaKeyStore {
	fn lookup(&self, rid: &[u8], index: u8) -> Option<CaPublicKey> {
		self.keys.get(&(rid.to_vec(), index)).cloned()
	}
}

/// An issuer-script authenticator that always returns a pre-configured
/// result.
#[derive(Clone, Debug)]
pub struct StubScriptAuthenticator {
	pub result: ScriptAuthResult,
}

impl super::IssuerScriptAuthenticator for StubScriptAuthenticator {
	fn validate(&mut self, _: &[u8], _: &[u8], _: &[u8]) -> ScriptAuthResult {
		self.result
	}
}

/// An in-memory, non-persistent [`Persistence`] implementation.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPersistence {
	store: HashMap<(String, String), Vec<u8>>,
}

impl InMemoryPersistence {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

impl Persistence for InMemoryPersistence {
	fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
		self.store
			.insert((namespace.to_owned(), key.to_owned()), bytes.to_vec());
		Ok(())
	}

	fn read(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
		Ok(self.store.get(&(namespace.to_owned(), key.to_owned())).cloned())
	}

	fn delete(&mut self, namespace: &str, key: &str) -> Result<(), PersistenceError> {
		self.store.remove(&(namespace.to_owned(), key.to_owned()));
		Ok(())
	}

	fn list(&mut self, namespace: &str) -> Result<Vec<String>, PersistenceError> {
		Ok(self
			.store
			.keys()
			.filter(|(ns, _)| ns == namespace)
			.map(|(_, key)| key.clone())
			.collect())
	}
}

/// A reversal sender that records every call it receives, for assertions
/// in tear-off/reversal scenario tests, and returns a pre-configured
/// result.
#[derive(Clone, Debug, Default)]
pub struct RecordingReversalSender {
	pub sent: Vec<(String, Vec<u8>)>,
	pub result: Option<SendResult>,
}

impl RecordingReversalSender {
	#[must_use]
	pub fn new(result: SendResult) -> Self {
		Self {
			sent: Vec::new(),
			result: Some(result),
		}
	}

	#[must_use]
	pub fn always_succeeding() -> Self {
		Self::new(SendResult::Success)
	}

	#[must_use]
	pub fn always_failing() -> Self {
		Self::new(SendResult::Failed("simulated failure".to_owned()))
	}
}

impl ReversalSender for RecordingReversalSender {
	fn send(&mut self, reversal_id: &str, payload: &[u8]) -> SendResult {
		self.sent.push((reversal_id.to_owned(), payload.to_vec()));
		self.result.clone().unwrap_or(SendResult::Success)
	}
}

/// A clock with a manually-advanced current time, for deterministic
/// backoff/escalation tests.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
	pub now: std::cell::Cell<u64>,
}

impl ManualClock {
	#[must_use]
	pub fn at(now: u64) -> Self {
		Self {
			now: std::cell::Cell::new(now),
		}
	}

	pub fn advance(&self, millis: u64) {
		self.now.set(self.now.get() + millis);
	}
}

impl Clock for ManualClock {
	fn now_millis(&self) -> u64 {
		self.now.get()
	}
}

/// A deterministic "RNG" for tests: fills buffers with a fixed byte
/// pattern rather than real entropy.
#[derive(Clone, Debug)]
pub struct FixedRng {
	pub fill_byte: u8,
}

impl Rng for FixedRng {
	fn fill_random(&mut self, buf: &mut [u8]) {
		buf.fill(self.fill_byte);
	}
}
