//! The error taxonomy for the crate.
//!
//! Low-level codec errors ([`ParseError`]) are distinct from the
//! transaction-level errors a kernel or the durability layer can raise
//! ([`KernelError`]); the latter wraps the former where a codec failure
//! bubbles up through a higher-level operation.

use std::cmp::Ordering;

use thiserror::Error;

/// Errors produced while parsing a raw byte value into one of the crate's
/// EMV data types (TLV, DOL, bitmask values, ...).
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
	#[error("expected {r#type:?} {expected} bytes, found {found}")]
	ByteCountIncorrect {
		r#type: Ordering,
		expected: usize,
		found: usize,
	},
	#[error("value doesn't comply with the relevant specification")]
	NonCompliant,
	#[error("value doesn't comply with the Common Core Data Object requirements")]
	NonCcdCompliant,
	#[error("value isn't a valid number, or is too large")]
	InvalidNumber,
	#[error("value uses an unsupported feature of the encoding")]
	Unsupported,
	#[error("tag or value isn't recognised")]
	Unrecognised,
}

/// The error kinds produced by the kernel and durability layers, per the
/// error taxonomy the crate exposes to callers.
#[derive(Error, Debug)]
pub enum KernelError {
	#[error("malformed TLV data: {0}")]
	MalformedTlv(#[from] ParseError),

	#[error("DOL assembly produced {produced} bytes, expected {expected}")]
	DolLengthMismatch { expected: usize, produced: usize },

	#[error("unexpected status word {sw:04X}")]
	UnexpectedSw { sw: u16 },

	#[error("card omitted mandatory data object {tag:08X}")]
	MissingMandatoryData { tag: u32 },

	#[error("offline data authentication failed: {reason}")]
	OdaFailed { reason: String },

	#[error("cardholder verification failed: {detail}")]
	CvmFailed { detail: String },

	#[error("card declined the transaction (GENERATE AC returned AAC)")]
	GenerateAcRejected,

	#[error("invalid state transition from {from} on event {event}")]
	InvalidStateTransition { from: String, event: String },

	#[error("transaction safe-failed; torn record {record_id} persisted")]
	TornTransactionQueued { record_id: String },

	#[error("transaction safe-failed after cryptogram; reversal {reversal_id} persisted")]
	ReversalQueued { reversal_id: String },

	#[error("capability '{which}' failed: {detail}")]
	CapabilityError { which: &'static str, detail: String },

	#[error("a transaction is already in progress")]
	TransactionInProgress,
}

impl KernelError {
	/// Whether the caller may retry the operation that produced this error
	/// without additional recovery action, per the error taxonomy's retry
	/// guidance.
	#[must_use]
	pub fn retryable(&self) -> bool {
		match self {
			Self::UnexpectedSw { sw } => matches!(sw >> 8, 0x62 | 0x63 | 0x69),
			Self::CvmFailed { .. }
			| Self::TornTransactionQueued { .. }
			| Self::ReversalQueued { .. }
			| Self::CapabilityError { .. } => true,
			Self::MalformedTlv(_)
			| Self::DolLengthMismatch { .. }
			| Self::MissingMandatoryData { .. }
			| Self::OdaFailed { .. }
			| Self::GenerateAcRejected
			| Self::InvalidStateTransition { .. }
			| Self::TransactionInProgress => false,
		}
	}
}
