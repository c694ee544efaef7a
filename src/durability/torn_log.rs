//! The torn-transaction log: a bounded, durable record of transactions that
//! safe-failed after GENERATE AC was sent to the card but before the kernel
//! could confirm the issuer received the resulting cryptogram.
//!
//! Per §6: at most 5 records are kept; inserting a 6th evicts the oldest,
//! and an evicted record whose stage was at or after GENERATE AC queues a
//! reversal, since the card may hold an outstanding cryptogram the issuer
//! never saw. Every mutation is persisted through the [`Persistence`]
//! capability before the caller sees the outcome, so a process restart
//! never loses a torn record the in-memory log had already acknowledged.

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::{
	apdu::CommandApdu,
	capabilities::{Persistence, PersistenceError},
	entry_point::KernelFamily,
	sensitive::{Cryptogram, Pan},
	transaction::Stage,
	util::{read_len_prefixed, write_len_prefixed},
};

/// The maximum number of torn records retained at once.
pub const MAX_RECORDS: usize = 5;

/// The maximum number of failed recovery queries tolerated before a record
/// gives up on card-side recovery and falls back to reversal.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 10;

/// The persistence namespace torn records are written under.
const NAMESPACE: &str = "torn_log";

/// SHA-256 of the cardholder's PAN: the correlation key a recovery lookup
/// indexes by, so the log never has to retain the PAN itself for longer
/// than deriving this.
#[must_use]
pub fn hash_pan(pan: &Pan) -> [u8; 32] {
	let mut hasher = Sha256::new();
	hasher.update(pan.as_str().as_bytes());
	hasher.finalize().into()
}

/// Where a torn record sits in its own recovery lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecoveryStatus {
	/// Awaiting a card-side recovery query, or a subsequent retry of one.
	PendingRecovery,
	/// The card confirmed the cryptogram's fate (either generated and
	/// resubmittable, or never generated); no reversal is needed.
	Recovered,
	/// Recovery queries were exhausted without a conclusive answer; a
	/// reversal has been queued instead.
	Failed,
}

/// A single torn-transaction entry.
#[derive(Clone, Debug)]
pub struct TornRecord {
	pub record_id: String,
	pub aid: Vec<u8>,
	pub kernel: KernelFamily,
	pub pan_hash: [u8; 32],
	pub pan_last4: String,
	pub amount_authorized: u64,
	pub atc: u16,
	pub cryptogram: Cryptogram,
	pub stage_at_tear: Stage,
	pub status: RecoveryStatus,
	pub attempts: u32,
}

impl TornRecord {
	/// Encodes the record to bytes suitable for the [`Persistence`]
	/// capability.
	#[must_use]
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::new();
		write_len_prefixed(&mut out, self.record_id.as_bytes());
		write_len_prefixed(&mut out, &self.aid);
		out.push(kernel_to_byte(self.kernel));
		write_len_prefixed(&mut out, &self.pan_hash);
		write_len_prefixed(&mut out, self.pan_last4.as_bytes());
		out.extend(self.amount_authorized.to_be_bytes());
		out.extend(self.atc.to_be_bytes());
		write_len_prefixed(&mut out, self.cryptogram.as_bytes());
		out.push(stage_to_byte(self.stage_at_tear));
		out.push(status_to_byte(self.status));
		out.extend(self.attempts.to_be_bytes());
		out
	}

	/// Decodes a record previously written by [`TornRecord::to_bytes`].
	///
	/// # Errors
	/// Returns [`PersistenceError`] if `bytes` isn't validly encoded.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
		let corrupt = || PersistenceError("corrupt torn record".to_owned());
		let mut cursor = 0;
		let record_id = String::from_utf8(read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec())
			.map_err(|_| corrupt())?;
		let aid = read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec();
		let kernel = byte_to_kernel(*bytes.get(cursor).ok_or_else(corrupt)?).ok_or_else(corrupt)?;
		cursor += 1;
		let pan_hash_slice = read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?;
		let pan_hash: [u8; 32] = pan_hash_slice.try_into().map_err(|_| corrupt())?;
		let pan_last4 = String::from_utf8(read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec())
			.map_err(|_| corrupt())?;
		let amount_bytes = bytes.get(cursor..(cursor + 8)).ok_or_else(corrupt)?;
		let amount_authorized = u64::from_be_bytes(amount_bytes.try_into().map_err(|_| corrupt())?);
		cursor += 8;
		let atc_bytes = bytes.get(cursor..(cursor + 2)).ok_or_else(corrupt)?;
		let atc = u16::from_be_bytes(atc_bytes.try_into().map_err(|_| corrupt())?);
		cursor += 2;
		let cryptogram = Cryptogram::new(read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec());
		let stage_at_tear = byte_to_stage(*bytes.get(cursor).ok_or_else(corrupt)?).ok_or_else(corrupt)?;
		cursor += 1;
		let status = byte_to_status(*bytes.get(cursor).ok_or_else(corrupt)?).ok_or_else(corrupt)?;
		cursor += 1;
		let attempts_bytes = bytes.get(cursor..(cursor + 4)).ok_or_else(corrupt)?;
		let attempts = u32::from_be_bytes(attempts_bytes.try_into().map_err(|_| corrupt())?);

		Ok(Self {
			record_id,
			aid,
			kernel,
			pan_hash,
			pan_last4,
			amount_authorized,
			atc,
			cryptogram,
			stage_at_tear,
			status,
			attempts,
		})
	}
}

fn kernel_to_byte(kernel: KernelFamily) -> u8 {
	match kernel {
		KernelFamily::Visa => 0,
		KernelFamily::Mastercard => 1,
		KernelFamily::Amex => 2,
		KernelFamily::Discover => 3,
		KernelFamily::Jcb => 4,
		KernelFamily::UnionPay => 5,
	}
}

fn byte_to_kernel(byte: u8) -> Option<KernelFamily> {
	match byte {
		0 => Some(KernelFamily::Visa),
		1 => Some(KernelFamily::Mastercard),
		2 => Some(KernelFamily::Amex),
		3 => Some(KernelFamily::Discover),
		4 => Some(KernelFamily::Jcb),
		5 => Some(KernelFamily::UnionPay),
		_ => None,
	}
}

fn stage_to_byte(stage: Stage) -> u8 {
	match stage {
		Stage::Idle => 0,
		Stage::AwaitingCard => 1,
		Stage::CardDetected => 2,
		Stage::GetProcessingOptions => 3,
		Stage::ReadRecord => 4,
		Stage::OfflineDataAuthentication => 5,
		Stage::ProcessingRestrictions => 6,
		Stage::CardholderVerification => 7,
		Stage::TerminalRiskManagement => 8,
		Stage::TerminalActionAnalysis => 9,
		Stage::GenerateAc => 10,
		Stage::AwaitingOnlineResponse => 11,
		Stage::IssuerAuthentication => 12,
		Stage::ScriptProcessing => 13,
		Stage::SecondGenerateAc => 14,
		Stage::Completion => 15,
		Stage::Error => 16,
		Stage::Cancelled => 17,
	}
}

fn byte_to_stage(byte: u8) -> Option<Stage> {
	match byte {
		0 => Some(Stage::Idle),
		1 => Some(Stage::AwaitingCard),
		2 => Some(Stage::CardDetected),
		3 => Some(Stage::GetProcessingOptions),
		4 => Some(Stage::ReadRecord),
		5 => Some(Stage::OfflineDataAuthentication),
		6 => Some(Stage::ProcessingRestrictions),
		7 => Some(Stage::CardholderVerification),
		8 => Some(Stage::TerminalRiskManagement),
		9 => Some(Stage::TerminalActionAnalysis),
		10 => Some(Stage::GenerateAc),
		11 => Some(Stage::AwaitingOnlineResponse),
		12 => Some(Stage::IssuerAuthentication),
		13 => Some(Stage::ScriptProcessing),
		14 => Some(Stage::SecondGenerateAc),
		15 => Some(Stage::Completion),
		16 => Some(Stage::Error),
		17 => Some(Stage::Cancelled),
		_ => None,
	}
}

fn status_to_byte(status: RecoveryStatus) -> u8 {
	match status {
		RecoveryStatus::PendingRecovery => 0,
		RecoveryStatus::Recovered => 1,
		RecoveryStatus::Failed => 2,
	}
}

fn byte_to_status(byte: u8) -> Option<RecoveryStatus> {
	match byte {
		0 => Some(RecoveryStatus::PendingRecovery),
		1 => Some(RecoveryStatus::Recovered),
		2 => Some(RecoveryStatus::Failed),
		_ => None,
	}
}

/// The outcome of inserting a new torn record: whether an older record was
/// evicted, and if so, whether it requires a reversal to be queued.
#[derive(Clone, Debug)]
pub struct InsertOutcome {
	pub evicted: Option<TornRecord>,
	pub needs_reversal: bool,
}

/// The outcome of recording a failed recovery query against a torn record.
#[derive(Clone, Debug)]
pub struct QueryFailedOutcome {
	pub attempts: u32,
	/// Set once `attempts` exceeds [`MAX_RECOVERY_ATTEMPTS`]; the caller
	/// must enqueue a reversal for the record's cryptogram.
	pub needs_reversal: bool,
}

/// The bounded torn-transaction ring described above.
#[derive(Clone, Debug, Default)]
pub struct TornLog {
	records: VecDeque<TornRecord>,
}

impl TornLog {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	#[must_use]
	pub fn records(&self) -> &VecDeque<TornRecord> {
		&self.records
	}

	/// Inserts a new torn record, evicting the oldest if the log is already
	/// at [`MAX_RECORDS`]. The new record (and the evicted one's removal)
	/// is persisted before this returns, so a crash right after never loses
	/// or resurrects a record the caller already saw acknowledged.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if the durable write fails; the log is
	/// left unchanged in that case.
	pub fn insert(
		&mut self,
		record: TornRecord,
		persistence: &mut dyn Persistence,
	) -> Result<InsertOutcome, PersistenceError> {
		persistence.write(NAMESPACE, &record.record_id, &record.to_bytes())?;

		let evicted = if self.records.len() >= MAX_RECORDS {
			self.records.pop_front()
		} else {
			None
		};

		let needs_reversal = evicted
			.as_ref()
			.is_some_and(|record| record.stage_at_tear.is_at_or_after_generate_ac_sent());

		log::warn!("torn record {} persisted at stage {:?}", record.record_id, record.stage_at_tear);
		if let Some(evicted) = &evicted {
			persistence.delete(NAMESPACE, &evicted.record_id)?;
			log::warn!(
				"torn record {} evicted (needs_reversal={needs_reversal})",
				evicted.record_id
			);
		}

		self.records.push_back(record);

		Ok(InsertOutcome {
			evicted,
			needs_reversal,
		})
	}

	/// Removes a record once its transaction is confirmed resolved (either
	/// recovered from the card, or its reversal was dispatched), deleting
	/// its durable copy first.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if the durable delete fails; the log is
	/// left unchanged in that case.
	pub fn remove(
		&mut self,
		record_id: &str,
		persistence: &mut dyn Persistence,
	) -> Result<Option<TornRecord>, PersistenceError> {
		let Some(index) = self.records.iter().position(|record| record.record_id == record_id) else {
			return Ok(None);
		};
		persistence.delete(NAMESPACE, record_id)?;
		Ok(self.records.remove(index))
	}

	/// Finds a torn record matching `pan_last4` and `amount_authorized`, the
	/// correlation key used by the Visa recovery probe.
	#[must_use]
	pub fn find_by_pan_and_amount(&self, pan_last4: &str, amount_authorized: u64) -> Option<&TornRecord> {
		self.records
			.iter()
			.find(|record| record.pan_last4 == pan_last4 && record.amount_authorized == amount_authorized)
	}

	/// Finds every pending record matching `pan_hash`, the correlation key
	/// computed from the presented card before any scheme-specific data is
	/// available.
	pub fn find_by_pan_hash(&self, pan_hash: &[u8; 32]) -> impl Iterator<Item = &TornRecord> {
		self.records.iter().filter(move |record| &record.pan_hash == pan_hash)
	}

	/// Marks a record `Recovered` and removes it from the log, since a
	/// recovered record is no longer pending: either the card confirms the
	/// cryptogram can be resubmitted, or confirms it never reached the
	/// issuer and no reversal is owed either way.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if the durable delete fails.
	pub fn mark_recovered(
		&mut self,
		record_id: &str,
		persistence: &mut dyn Persistence,
	) -> Result<Option<TornRecord>, PersistenceError> {
		if let Some(record) = self.records.iter_mut().find(|record| record.record_id == record_id) {
			record.status = RecoveryStatus::Recovered;
		}
		log::info!("torn record {record_id} recovered");
		self.remove(record_id, persistence)
	}

	/// Records a failed recovery query against `record_id`: increments its
	/// attempt count, persists the update, and once attempts exceed
	/// [`MAX_RECOVERY_ATTEMPTS`] marks it `Failed` and signals the caller to
	/// enqueue a reversal instead.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if the durable write fails.
	pub fn record_query_failed(
		&mut self,
		record_id: &str,
		persistence: &mut dyn Persistence,
	) -> Result<Option<QueryFailedOutcome>, PersistenceError> {
		let Some(record) = self.records.iter_mut().find(|record| record.record_id == record_id) else {
			return Ok(None);
		};

		record.attempts += 1;
		let needs_reversal = record.attempts > MAX_RECOVERY_ATTEMPTS;
		if needs_reversal {
			record.status = RecoveryStatus::Failed;
			log::error!("torn record {record_id} exhausted recovery attempts, queuing reversal");
		} else {
			log::warn!("torn record {record_id} recovery query failed, attempt {}", record.attempts);
		}

		persistence.write(NAMESPACE, record_id, &record.to_bytes())?;

		Ok(Some(QueryFailedOutcome {
			attempts: record.attempts,
			needs_reversal,
		}))
	}
}

/// The result of comparing a recovery probe's response against the torn
/// record it was issued for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecoveryOutcome {
	/// The card confirms the torn cryptogram was generated and can be
	/// resubmitted to the issuer as-is.
	Recovered,
	/// The card's state doesn't match the torn record (different ATC, or the
	/// scheme exposes no recovery data); fall back to queuing a reversal.
	NotFound,
}

/// Builds the card-side recovery probe command for a scheme, per §6's
/// recovery table.
///
/// Visa exposes `GET DATA` on proprietary tags `DF8128`/`DF8129`; Mastercard
/// exposes the current ATC via `GET DATA 9F36`. Every other scheme has no
/// recovery mechanism and the kernel must fall back to reversal directly.
#[must_use]
pub fn recovery_probe(kernel: KernelFamily) -> Option<CommandApdu> {
	match kernel {
		KernelFamily::Visa => Some(CommandApdu::new(0x80, 0xCA, 0xDF, 0x28).with_le(0)),
		KernelFamily::Mastercard => Some(CommandApdu::new(0x80, 0xCA, 0x9F, 0x36).with_le(0)),
		KernelFamily::Amex | KernelFamily::Discover | KernelFamily::Jcb | KernelFamily::UnionPay => None,
	}
}

/// Interprets a recovery probe's response against `record`.
///
/// For Mastercard, `response_data` is the raw ATC (2 bytes, big-endian);
/// recovery succeeds if it matches the torn record's ATC exactly, meaning
/// the card never advanced past the cryptogram the issuer is missing. For
/// Visa, `response_data` is the `DF8128`/`DF8129` last-transaction-result
/// blob and recovery succeeds if its trailing amount field matches.
#[must_use]
pub fn evaluate_recovery(kernel: KernelFamily, record: &TornRecord, response_data: &[u8]) -> RecoveryOutcome {
	match kernel {
		KernelFamily::Mastercard => {
			if response_data.len() == 2 {
				let atc = u16::from_be_bytes([response_data[0], response_data[1]]);
				if atc == record.atc {
					return RecoveryOutcome::Recovered;
				}
			}
			RecoveryOutcome::NotFound
		}
		KernelFamily::Visa => {
			if response_data.len() >= 4 {
				let amount = u32::from_be_bytes([
					response_data[0],
					response_data[1],
					response_data[2],
					response_data[3],
				]);
				if u64::from(amount) == record.amount_authorized {
					return RecoveryOutcome::Recovered;
				}
			}
			RecoveryOutcome::NotFound
		}
		KernelFamily::Amex | KernelFamily::Discover | KernelFamily::Jcb | KernelFamily::UnionPay => {
			RecoveryOutcome::NotFound
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{
		evaluate_recovery,
		hash_pan,
		recovery_probe,
		RecoveryOutcome,
		RecoveryStatus,
		TornLog,
		TornRecord,
		MAX_RECORDS,
		MAX_RECOVERY_ATTEMPTS,
	};
	use crate::{
		capabilities::testing::InMemoryPersistence,
		entry_point::KernelFamily,
		sensitive::{Cryptogram, Pan},
		transaction::Stage,
	};

	fn sample_record(id: &str, stage: Stage) -> TornRecord {
		TornRecord {
			record_id: id.to_owned(),
			aid: vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10],
			kernel: KernelFamily::Visa,
			pan_hash: hash_pan(&Pan::new("4000000000000002".to_owned())),
			pan_last4: "0012".to_owned(),
			amount_authorized: 2_500,
			atc: 42,
			cryptogram: Cryptogram::new(vec![0xAB; 8]),
			stage_at_tear: stage,
			status: RecoveryStatus::PendingRecovery,
			attempts: 0,
		}
	}

	#[test]
	fn insert_evicts_oldest_once_full() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		for index in 0..MAX_RECORDS {
			log.insert(sample_record(&index.to_string(), Stage::GenerateAc), &mut persistence)
				.unwrap();
		}
		assert_eq!(log.len(), MAX_RECORDS);

		let outcome = log
			.insert(sample_record("overflow", Stage::GenerateAc), &mut persistence)
			.unwrap();
		assert_eq!(outcome.evicted.unwrap().record_id, "0");
		assert_eq!(log.len(), MAX_RECORDS);
		assert!(persistence.read("torn_log", "0").unwrap().is_none());
	}

	#[test]
	fn eviction_past_generate_ac_requires_reversal() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		for index in 0..MAX_RECORDS {
			log.insert(sample_record(&index.to_string(), Stage::SecondGenerateAc), &mut persistence)
				.unwrap();
		}
		let outcome = log
			.insert(sample_record("overflow", Stage::GenerateAc), &mut persistence)
			.unwrap();
		assert!(outcome.needs_reversal);
	}

	#[test]
	fn eviction_before_generate_ac_does_not_require_reversal() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		for index in 0..MAX_RECORDS {
			log.insert(sample_record(&index.to_string(), Stage::ReadRecord), &mut persistence)
				.unwrap();
		}
		let outcome = log
			.insert(sample_record("overflow", Stage::GenerateAc), &mut persistence)
			.unwrap();
		assert!(!outcome.needs_reversal);
	}

	#[test]
	fn mastercard_recovery_matches_on_atc() {
		let record = sample_record("1", Stage::GenerateAc);
		assert_eq!(
			evaluate_recovery(KernelFamily::Mastercard, &record, &[0x00, 0x2A]),
			RecoveryOutcome::Recovered
		);
		assert_eq!(
			evaluate_recovery(KernelFamily::Mastercard, &record, &[0x00, 0x2B]),
			RecoveryOutcome::NotFound
		);
	}

	#[test]
	fn unrecoverable_schemes_have_no_probe() {
		assert!(recovery_probe(KernelFamily::Amex).is_none());
		assert!(recovery_probe(KernelFamily::Jcb).is_none());
	}

	#[test]
	fn find_by_pan_and_amount_locates_matching_record() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		log.insert(sample_record("1", Stage::GenerateAc), &mut persistence).unwrap();
		let found = log.find_by_pan_and_amount("0012", 2_500);
		assert!(found.is_some());
		assert!(log.find_by_pan_and_amount("9999", 1).is_none());
	}

	#[test]
	fn record_round_trips_through_bytes() {
		let record = sample_record("1", Stage::SecondGenerateAc);
		let decoded = TornRecord::from_bytes(&record.to_bytes()).unwrap();
		assert_eq!(decoded.record_id, record.record_id);
		assert_eq!(decoded.pan_hash, record.pan_hash);
		assert_eq!(decoded.amount_authorized, record.amount_authorized);
		assert_eq!(decoded.cryptogram.as_bytes(), record.cryptogram.as_bytes());
	}

	#[test]
	fn query_failed_increments_attempts_and_persists() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		log.insert(sample_record("1", Stage::SecondGenerateAc), &mut persistence)
			.unwrap();

		let outcome = log.record_query_failed("1", &mut persistence).unwrap().unwrap();
		assert_eq!(outcome.attempts, 1);
		assert!(!outcome.needs_reversal);

		let persisted = TornRecord::from_bytes(&persistence.read("torn_log", "1").unwrap().unwrap()).unwrap();
		assert_eq!(persisted.attempts, 1);
	}

	#[test]
	fn query_failed_past_max_attempts_requires_reversal() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		log.insert(sample_record("1", Stage::SecondGenerateAc), &mut persistence)
			.unwrap();

		let mut outcome = None;
		for _ in 0..=MAX_RECOVERY_ATTEMPTS {
			outcome = log.record_query_failed("1", &mut persistence).unwrap();
		}
		assert!(outcome.unwrap().needs_reversal);
		let persisted = TornRecord::from_bytes(&persistence.read("torn_log", "1").unwrap().unwrap()).unwrap();
		assert_eq!(persisted.status, RecoveryStatus::Failed);
	}

	#[test]
	fn mark_recovered_removes_record() {
		let mut log = TornLog::new();
		let mut persistence = InMemoryPersistence::new();
		log.insert(sample_record("1", Stage::GenerateAc), &mut persistence).unwrap();

		let recovered = log.mark_recovered("1", &mut persistence).unwrap().unwrap();
		assert_eq!(recovered.status, RecoveryStatus::Recovered);
		assert!(log.is_empty());
		assert!(persistence.read("torn_log", "1").unwrap().is_none());
	}
}
