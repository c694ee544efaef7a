//! The authorization payload envelope a kernel hands back to the caller,
//! per §6, and the kernel-level outcome variants a `process_transaction`
//! call can produce, per §4.4.

use crate::{
	emv::{CardholderVerificationMethodResults, TerminalVerificationResults},
	sensitive::{Cryptogram, Pan, Track2Equivalent},
};

/// `"EMV"` for a chip-path transaction, `"MAGSTRIPE"` for the Mastercard
/// PayPass mag-stripe CVC3 path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransactionMode {
	Emv,
	Magstripe,
}

/// The scheme-tagged authorization payload described in §6: everything the
/// acquirer needs to send the transaction online, plus display/reconciliation
/// fields. PAN and Track 2 stay in their zeroizing wrapper types; masking is
/// the caller's choice for anything leaving process memory.
#[derive(Clone, Debug)]
pub struct AuthorizationData {
	pub pan: Pan,
	pub pan_sequence_number: Option<u8>,
	pub expiry_yymm: Option<(u8, u8)>,
	pub track2_equivalent: Option<Track2Equivalent>,
	pub application_cryptogram: Cryptogram,
	pub cryptogram_information_data: u8,
	pub atc: u16,
	pub issuer_application_data: Vec<u8>,
	pub tvr: TerminalVerificationResults,
	pub cvm_results: Option<CardholderVerificationMethodResults>,
	pub amount_authorized: u64,
	pub amount_other: u64,
	pub terminal_country_code: [u8; 2],
	pub currency_code: [u8; 2],
	pub transaction_date_bcd: [u8; 3],
	pub transaction_type: u8,
	pub unpredictable_number: [u8; 4],
	pub aip: [u8; 2],
	pub aid: Vec<u8>,
	pub cardholder_name: Option<String>,
	pub transaction_mode: TransactionMode,
}

impl AuthorizationData {
	/// The projection safe for display/logging: first 6 + last 4 PAN
	/// digits, everything else verbatim.
	#[must_use]
	pub fn masked_pan(&self) -> String {
		self.pan.masked()
	}
}

/// The card-declined reason, carried by [`KernelOutcome::Declined`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeclineReason {
	CardDeclinedOffline,
	ActionAnalysisDenial,
	CvmFailed,
	RestrictionsFailed,
}

/// Why a card wants the contactless interface abandoned in favour of
/// contact or magstripe, carried by [`KernelOutcome::TryAnotherInterface`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InterfaceFallbackReason {
	CardRequestedContact,
	ContactlessNotSupported,
	ReadError,
}

/// The result of a kernel's `process_transaction` call, per §4.4.
#[derive(Clone, Debug)]
pub enum KernelOutcome {
	/// Offline TC generated.
	Approved(AuthorizationData),
	/// ARQC generated; the acquirer must authorize online.
	OnlineRequest(AuthorizationData),
	/// AAC generated.
	Declined(DeclineReason, Option<AuthorizationData>),
	/// The card wants the contact or magstripe interface instead.
	TryAnotherInterface(InterfaceFallbackReason),
	/// The transaction ended on an unrecoverable error.
	EndApplication(crate::error::KernelError),
}

/// Method 1 carries `ARPC(8) ‖ ARC(2)`; Method 2 carries
/// `ARPC(4) ‖ CSU(4) ‖ proprietary`, per §4.4's ISSUER_AUTH step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IssuerAuthenticationData {
	Method1 { arpc: [u8; 8], arc: [u8; 2] },
	Method2 { arpc: [u8; 4], csu: [u8; 4], proprietary: Vec<u8> },
}

/// The online response an orchestrator hands to the Mastercard kernel's
/// `process_online_response`, per §4.4.
#[derive(Clone, Debug)]
pub struct OnlineResponse {
	pub authorisation_response_code: String,
	pub issuer_authentication_data: Option<IssuerAuthenticationData>,
	/// Tag `0x71` (pre-AC) and tag `0x72` (post-AC) issuer script templates,
	/// each a raw BER-TLV blob containing `0x86`-tagged command APDUs - see
	/// [`crate::script`].
	pub script_71: Option<Vec<u8>>,
	pub script_72: Option<Vec<u8>>,
}

/// The result of `process_online_response`: the final cryptogram outcome
/// after issuer authentication, script processing and the second
/// GENERATE AC.
#[derive(Clone, Debug)]
pub enum OnlineResponseResult {
	Approved(AuthorizationData),
	Declined(DeclineReason, AuthorizationData),
	EndApplication(crate::error::KernelError),
}
