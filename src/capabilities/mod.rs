//! The capability traits through which a kernel reaches every external
//! collaborator named as out-of-scope in §1: hardware transport, crypto
//! primitives, persistence, the reversal sender, the clock and the RNG.
//!
//! Every trait here is plain and synchronous, per §5's framing of the
//! kernel as a state-machine function that yields at I/O boundaries rather
//! than an `async fn` - the caller's own executor, sync or async, drives
//! these calls on its own schedule.

#[cfg(any(test, feature = "testing-util"))]
pub mod testing;

use crate::sensitive::Cryptogram;

/// Errors a [`Transceiver`] can report that the core didn't itself produce
/// (distinct from [`crate::error::KernelError::UnexpectedSw`], which is a
/// card-level response, not a transport failure).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CommsError {
	#[error("the card transceive timed out")]
	Timeout,
	#[error("the card was removed from the field")]
	CardRemoved,
	#[error("a communication error occurred: {0}")]
	Other(String),
}

/// Byte-transparent APDU exchange with the card. Encoding of cases 1-4 is
/// the core's responsibility (see [`crate::apdu`]); the transceiver either
/// implements GET RESPONSE chaining transparently, or surfaces `0x61xx` for
/// the core to chain itself.
pub trait Transceiver {
	/// Sends `command_bytes` and returns the raw response bytes (data plus
	/// trailing SW1 SW2).
	///
	/// # Errors
	/// Returns [`CommsError`] on any transport-level failure.
	fn transceive(&mut self, command_bytes: &[u8]) -> Result<Vec<u8>, CommsError>;
}

/// The outcome of one of the four ODA methods.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OdaResult {
	Success(&'static str),
	Failed(String),
}

/// A CA public key, as looked up by RID and index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaPublicKey {
	pub modulus: Vec<u8>,
	pub exponent: Vec<u8>,
}

/// Offline data authentication, delegated entirely to the embedder - this
/// crate never implements RSA/SHA itself (§1's Non-goals).
pub trait OdaVerifier {
	fn perform_sda(
		&mut self,
		aid: &[u8],
		issuer_pk_cert: &[u8],
		issuer_exponent: &[u8],
		static_data: &[u8],
	) -> OdaResult;

	fn perform_dda(
		&mut self,
		aid: &[u8],
		icc_pk_cert: &[u8],
		icc_exponent: &[u8],
		signed_data: &[u8],
		unpredictable_number: &[u8],
	) -> OdaResult;

	fn perform_fdda(
		&mut self,
		aid: &[u8],
		icc_pk_cert: &[u8],
		icc_exponent: &[u8],
		signed_data: &[u8],
		unpredictable_number: &[u8],
	) -> OdaResult;

	fn perform_cda(
		&mut self,
		aid: &[u8],
		icc_pk_cert: &[u8],
		icc_exponent: &[u8],
		signed_data: &[u8],
		unpredictable_number: &[u8],
		application_cryptogram: &[u8],
	) -> OdaResult;
}

/// The process-wide, read-only CA public key store - injected as a
/// capability rather than a global singleton, per §9's design note.
pub trait CaKeyStore {
	fn lookup(&self, rid: &[u8], index: u8) -> Option<CaPublicKey>;
}

/// The outcome of an issuer-script authentication check. Advisory only:
/// the kernel never verifies the ARPC itself, it only uses this result to
/// decide whether script execution is permitted (§4.4, §6).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptAuthResult {
	Success,
	NoAuthData,
	InvalidMac,
}

pub trait IssuerScriptAuthenticator {
	fn validate(&mut self, arpc: &[u8], arc: &[u8], session_key_inputs: &[u8]) -> ScriptAuthResult;
}

/// Errors from the [`Persistence`] capability.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("persistence operation failed: {0}")]
pub struct PersistenceError(pub String);

/// Durable key-value storage with atomic write semantics (no torn writes
/// observable). The caller is responsible for encryption at rest.
pub trait Persistence {
	/// # Errors
	/// Returns [`PersistenceError`] on any storage failure.
	fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
	/// # Errors
	/// Returns [`PersistenceError`] on any storage failure.
	fn read(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
	/// # Errors
	/// Returns [`PersistenceError`] on any storage failure.
	fn delete(&mut self, namespace: &str, key: &str) -> Result<(), PersistenceError>;
	/// # Errors
	/// Returns [`PersistenceError`] on any storage failure.
	fn list(&mut self, namespace: &str) -> Result<Vec<String>, PersistenceError>;
}

/// The outcome of handing a reversal record to the sender. The sender is
/// expected to be idempotent on `reversal_id`, per §6.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendResult {
	Success,
	Duplicate,
	Failed(String),
	PermanentFailure(String),
}

pub trait ReversalSender {
	fn send(&mut self, reversal_id: &str, payload: &[u8]) -> SendResult;
}

/// Monotonic wall-clock time, in milliseconds.
pub trait Clock {
	fn now_millis(&self) -> u64;
}

/// A cryptographically secure random number source.
pub trait Rng {
	fn fill_random(&mut self, buf: &mut [u8]);
}

/// The OS-backed [`Rng`] implementation embedders reach for outside of
/// tests: thinly wraps [`rand::rngs::OsRng`], re-seeded on every draw since
/// unpredictable numbers and random-selection draws are small and
/// infrequent.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRng;

impl Rng for OsRng {
	fn fill_random(&mut self, buf: &mut [u8]) {
		use rand::RngCore;
		rand::rngs::OsRng.fill_bytes(buf);
	}
}

/// A convenience bundle of the card-cryptogram-bearing results a kernel
/// hands to a torn-transaction or reversal record when it safe-fails, so
/// callers don't need to thread the raw bytes through separately.
#[derive(Clone, Debug)]
pub struct RecoveredCryptogram {
	pub cryptogram: Cryptogram,
	pub cryptogram_type: &'static str,
}
