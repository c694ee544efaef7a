//! The transaction state machine shared by every kernel: the stage
//! progression of §4.4, the single-active-transaction invariant, and
//! zeroization of sensitive buffers on every terminal state.

use crate::{data_store::DataStore, error::KernelError, sensitive::Pan};

/// The processing stage a transaction is currently in, per §4.4's sequence:
/// `GPO -> READ RECORD -> ODA -> RESTRICTIONS -> CVM -> RISK -> TAA ->
/// GENERATE_AC -> [ONLINE -> ISSUER_AUTH -> SCRIPT -> SECOND_GENERATE_AC]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
	Idle,
	AwaitingCard,
	CardDetected,
	GetProcessingOptions,
	ReadRecord,
	OfflineDataAuthentication,
	ProcessingRestrictions,
	CardholderVerification,
	TerminalRiskManagement,
	TerminalActionAnalysis,
	GenerateAc,
	AwaitingOnlineResponse,
	IssuerAuthentication,
	ScriptProcessing,
	SecondGenerateAc,
	Completion,
	Error,
	Cancelled,
}

impl Stage {
	/// Whether this stage is a terminal state: no further card-present
	/// processing can happen, and any transaction-scoped sensitive data
	/// must be zeroized.
	#[must_use]
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Completion | Self::Error | Self::Cancelled)
	}

	/// Whether a torn record evicted while sitting at this stage must be
	/// queued for reversal (i.e. GENERATE AC has already been sent to the
	/// card, so the issuer may have an outstanding cryptogram it doesn't
	/// know was never delivered online).
	#[must_use]
	pub fn is_at_or_after_generate_ac_sent(self) -> bool {
		matches!(
			self,
			Self::GenerateAc
				| Self::AwaitingOnlineResponse
				| Self::IssuerAuthentication
				| Self::ScriptProcessing
				| Self::SecondGenerateAc
		)
	}
}

/// An event driving the state machine forward. Each kernel only ever raises
/// the subset of these relevant to its own flow (e.g. the generic kernels
/// never raise `OnlineResponseReceived` a second time).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Event {
	CardDetected,
	GpoComplete,
	RecordsRead,
	OdaComplete,
	RestrictionsChecked,
	CvmComplete,
	RiskManagementComplete,
	ActionAnalysisComplete,
	AcGenerated,
	OnlineResponseReceived,
	IssuerAuthComplete,
	ScriptProcessingComplete,
	SecondAcGenerated,
	Complete,
	Fail,
	Cancel,
}

/// The static transition table: `(from, event) -> to`. A pair not listed here
/// is an invalid transition for every kernel, per §4.4's fixed stage
/// sequence.
const TRANSITIONS: &[(Stage, Event, Stage)] = &[
	(Stage::Idle, Event::CardDetected, Stage::CardDetected),
	(Stage::AwaitingCard, Event::CardDetected, Stage::CardDetected),
	(Stage::CardDetected, Event::GpoComplete, Stage::GetProcessingOptions),
	(
		Stage::GetProcessingOptions,
		Event::RecordsRead,
		Stage::ReadRecord,
	),
	(
		Stage::ReadRecord,
		Event::OdaComplete,
		Stage::OfflineDataAuthentication,
	),
	(
		Stage::OfflineDataAuthentication,
		Event::RestrictionsChecked,
		Stage::ProcessingRestrictions,
	),
	(
		Stage::ProcessingRestrictions,
		Event::CvmComplete,
		Stage::CardholderVerification,
	),
	(
		Stage::CardholderVerification,
		Event::RiskManagementComplete,
		Stage::TerminalRiskManagement,
	),
	(
		Stage::TerminalRiskManagement,
		Event::ActionAnalysisComplete,
		Stage::TerminalActionAnalysis,
	),
	(Stage::TerminalActionAnalysis, Event::AcGenerated, Stage::GenerateAc),
	(
		Stage::GenerateAc,
		Event::OnlineResponseReceived,
		Stage::AwaitingOnlineResponse,
	),
	(Stage::GenerateAc, Event::Complete, Stage::Completion),
	(Stage::GenerateAc, Event::Fail, Stage::Error),
	(
		Stage::AwaitingOnlineResponse,
		Event::IssuerAuthComplete,
		Stage::IssuerAuthentication,
	),
	(
		Stage::IssuerAuthentication,
		Event::ScriptProcessingComplete,
		Stage::ScriptProcessing,
	),
	(
		Stage::ScriptProcessing,
		Event::SecondAcGenerated,
		Stage::SecondGenerateAc,
	),
	(Stage::SecondGenerateAc, Event::Complete, Stage::Completion),
	(Stage::SecondGenerateAc, Event::Fail, Stage::Error),
	// A fatal error (transport failure, malformed response, capability
	// failure) can surface at any non-terminal stage, not only after
	// GENERATE AC; every reachable stage short of GenerateAc/SecondGenerateAc
	// (already listed above) gets its own Fail transition to Error.
	(Stage::CardDetected, Event::Fail, Stage::Error),
	(Stage::GetProcessingOptions, Event::Fail, Stage::Error),
	(Stage::ReadRecord, Event::Fail, Stage::Error),
	(Stage::OfflineDataAuthentication, Event::Fail, Stage::Error),
	(Stage::ProcessingRestrictions, Event::Fail, Stage::Error),
	(Stage::CardholderVerification, Event::Fail, Stage::Error),
	(Stage::TerminalRiskManagement, Event::Fail, Stage::Error),
	(Stage::TerminalActionAnalysis, Event::Fail, Stage::Error),
	(Stage::AwaitingOnlineResponse, Event::Fail, Stage::Error),
	(Stage::IssuerAuthentication, Event::Fail, Stage::Error),
	(Stage::ScriptProcessing, Event::Fail, Stage::Error),
];

/// A transaction-scoped sensitive buffer, registered so it can be wiped the
/// moment the transaction reaches a terminal stage rather than waiting on
/// its owning struct's own `Drop`.
#[derive(Clone, Debug, Default)]
struct RegisteredPan(Option<Pan>);

/// The shared transaction context every kernel drives: current [`Stage`],
/// terminal/card [`DataStore`]s, and the sensitive buffers registered for
/// wipe-on-terminal-state.
#[derive(Debug, Default)]
pub struct Transaction {
	stage: Stage,
	pub terminal_store: DataStore,
	pub card_store: DataStore,
	active: bool,
	registered_pan: RegisteredPan,
}

impl Default for Stage {
	fn default() -> Self {
		Self::Idle
	}
}

impl Transaction {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn stage(&self) -> Stage {
		self.stage
	}

	#[must_use]
	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Begins a new transaction. Per the single-active-transaction
	/// invariant, fails if one is already in flight.
	///
	/// # Errors
	/// Returns [`KernelError::TransactionInProgress`] if a transaction is
	/// already active.
	pub fn begin(&mut self) -> Result<(), KernelError> {
		if self.active {
			return Err(KernelError::TransactionInProgress);
		}
		self.stage = Stage::AwaitingCard;
		self.terminal_store.reset();
		self.card_store.reset();
		self.registered_pan = RegisteredPan::default();
		self.active = true;
		Ok(())
	}

	/// Registers the card's PAN for wipe-on-terminal-state. Kernels call
	/// this as soon as the PAN is read off the card, rather than relying on
	/// the caller to remember to drop it.
	pub fn register_pan(&mut self, pan: Pan) {
		self.registered_pan = RegisteredPan(Some(pan));
	}

	/// Drives the state machine forward by `event`, per the static
	/// transition table.
	///
	/// # Errors
	/// Returns [`KernelError::InvalidStateTransition`] if `event` has no
	/// transition registered from the current stage.
	pub fn advance(&mut self, event: Event) -> Result<Stage, KernelError> {
		let next = TRANSITIONS
			.iter()
			.find(|(from, e, _)| *from == self.stage && *e == event)
			.map(|(_, _, to)| *to)
			.ok_or(KernelError::InvalidStateTransition {
				from: format!("{:?}", self.stage),
				event: format!("{event:?}"),
			})?;

		log::debug!("transaction stage {:?} -> {next:?} on {event:?}", self.stage);
		self.stage = next;
		if next.is_terminal() {
			self.zeroize_sensitive();
		}
		Ok(next)
	}

	/// Force-terminates the transaction (e.g. card removed mid-flow),
	/// zeroizing sensitive state and freeing the single-active slot.
	pub fn cancel(&mut self) {
		log::warn!("transaction cancelled at stage {:?}", self.stage);
		self.stage = Stage::Cancelled;
		self.zeroize_sensitive();
	}

	fn zeroize_sensitive(&mut self) {
		// Dropping the registered PAN runs its `ZeroizeOnDrop` impl. The
		// terminal store (floor limits, country code, etc.) isn't
		// cardholder data and is retained across transactions deliberately.
		self.registered_pan = RegisteredPan::default();
		self.card_store.reset();
		self.active = false;
	}
}

#[cfg(test)]
mod tests {
	use super::{Event, Stage, Transaction};
	use crate::sensitive::Pan;

	#[test]
	fn begin_rejects_when_already_active() {
		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		assert!(matches!(
			transaction.begin(),
			Err(crate::error::KernelError::TransactionInProgress)
		));
	}

	#[test]
	fn advance_follows_happy_path_to_generate_ac() {
		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		transaction.advance(Event::CardDetected).unwrap();
		transaction.advance(Event::GpoComplete).unwrap();
		transaction.advance(Event::RecordsRead).unwrap();
		transaction.advance(Event::OdaComplete).unwrap();
		transaction.advance(Event::RestrictionsChecked).unwrap();
		transaction.advance(Event::CvmComplete).unwrap();
		transaction.advance(Event::RiskManagementComplete).unwrap();
		let stage = transaction.advance(Event::ActionAnalysisComplete).unwrap();
		assert_eq!(stage, Stage::TerminalActionAnalysis);
	}

	#[test]
	fn advance_rejects_out_of_order_event() {
		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		assert!(matches!(
			transaction.advance(Event::AcGenerated),
			Err(crate::error::KernelError::InvalidStateTransition { .. })
		));
	}

	#[test]
	fn reaching_completion_clears_active_flag_and_card_store() {
		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		transaction.register_pan(Pan::new("4111111111111111".to_owned()));
		transaction.card_store.set(&[0x5A], vec![0x41, 0x11]);
		transaction.advance(Event::CardDetected).unwrap();
		transaction.advance(Event::GpoComplete).unwrap();
		transaction.advance(Event::RecordsRead).unwrap();
		transaction.advance(Event::OdaComplete).unwrap();
		transaction.advance(Event::RestrictionsChecked).unwrap();
		transaction.advance(Event::CvmComplete).unwrap();
		transaction.advance(Event::RiskManagementComplete).unwrap();
		transaction.advance(Event::ActionAnalysisComplete).unwrap();
		transaction.advance(Event::AcGenerated).unwrap();
		transaction.advance(Event::Complete).unwrap();

		assert_eq!(transaction.stage(), Stage::Completion);
		assert!(!transaction.is_active());
		assert!(transaction.card_store.is_empty());
	}

	#[test]
	fn cancel_from_mid_flow_zeroizes_and_frees_slot() {
		let mut transaction = Transaction::new();
		transaction.begin().unwrap();
		transaction.advance(Event::CardDetected).unwrap();
		transaction.cancel();
		assert_eq!(transaction.stage(), Stage::Cancelled);
		assert!(!transaction.is_active());
	}
}
