//! The reversal queue: at-least-once, idempotent delivery of reversal
//! records to the acquirer, with exponential backoff and an escalation
//! threshold for records that have been retried for a long time, per §6.
//!
//! Every mutation is persisted through the [`Persistence`] capability
//! before the in-memory state is considered final, matching the durability
//! guarantee the torn-transaction log makes.

use serde_derive::{Deserialize, Serialize};

use crate::{
	capabilities::{Clock, Persistence, PersistenceError, ReversalSender, SendResult},
	util::{read_len_prefixed, write_len_prefixed},
};

/// The persistence namespace reversal records are written under.
const NAMESPACE: &str = "reversal_queue";

/// Tunables for the backoff/escalation schedule. Defaults match §2's
/// ambient-stack table: 5s base, 5min cap, 1h escalation, 100 attempts, 24h
/// retention for completed records.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReversalQueueConfig {
	pub base_backoff_millis: u64,
	pub max_backoff_millis: u64,
	pub escalation_threshold_millis: u64,
	pub max_attempts: u32,
	pub completed_retention_millis: u64,
}

impl Default for ReversalQueueConfig {
	fn default() -> Self {
		Self {
			base_backoff_millis: 5_000,
			max_backoff_millis: 5 * 60_000,
			escalation_threshold_millis: 60 * 60_000,
			max_attempts: 100,
			completed_retention_millis: 24 * 60 * 60_000,
		}
	}
}

/// A pending or completed reversal, keyed by `reversal_id` for idempotent
/// redelivery.
#[derive(Clone, Debug)]
pub struct ReversalRecord {
	pub reversal_id: String,
	pub payload: Vec<u8>,
	pub attempts: u32,
	pub first_attempt_millis: u64,
	pub next_attempt_millis: u64,
	pub status: ReversalStatus,
}

impl ReversalRecord {
	#[must_use]
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::new();
		write_len_prefixed(&mut out, self.reversal_id.as_bytes());
		write_len_prefixed(&mut out, &self.payload);
		out.extend(self.attempts.to_be_bytes());
		out.extend(self.first_attempt_millis.to_be_bytes());
		out.extend(self.next_attempt_millis.to_be_bytes());
		out.push(status_to_byte(self.status));
		out
	}

	/// # Errors
	/// Returns [`PersistenceError`] if `bytes` isn't validly encoded.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
		let corrupt = || PersistenceError("corrupt reversal record".to_owned());
		let mut cursor = 0;
		let reversal_id =
			String::from_utf8(read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec())
				.map_err(|_| corrupt())?;
		let payload = read_len_prefixed(bytes, &mut cursor).map_err(|_| corrupt())?.to_vec();
		let attempts_bytes = bytes.get(cursor..(cursor + 4)).ok_or_else(corrupt)?;
		let attempts = u32::from_be_bytes(attempts_bytes.try_into().map_err(|_| corrupt())?);
		cursor += 4;
		let first_bytes = bytes.get(cursor..(cursor + 8)).ok_or_else(corrupt)?;
		let first_attempt_millis = u64::from_be_bytes(first_bytes.try_into().map_err(|_| corrupt())?);
		cursor += 8;
		let next_bytes = bytes.get(cursor..(cursor + 8)).ok_or_else(corrupt)?;
		let next_attempt_millis = u64::from_be_bytes(next_bytes.try_into().map_err(|_| corrupt())?);
		cursor += 8;
		let status = byte_to_status(*bytes.get(cursor).ok_or_else(corrupt)?).ok_or_else(corrupt)?;

		Ok(Self {
			reversal_id,
			payload,
			attempts,
			first_attempt_millis,
			next_attempt_millis,
			status,
		})
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReversalStatus {
	Pending,
	Escalated,
	Completed,
	PermanentlyFailed,
}

fn status_to_byte(status: ReversalStatus) -> u8 {
	match status {
		ReversalStatus::Pending => 0,
		ReversalStatus::Escalated => 1,
		ReversalStatus::Completed => 2,
		ReversalStatus::PermanentlyFailed => 3,
	}
}

fn byte_to_status(byte: u8) -> Option<ReversalStatus> {
	match byte {
		0 => Some(ReversalStatus::Pending),
		1 => Some(ReversalStatus::Escalated),
		2 => Some(ReversalStatus::Completed),
		3 => Some(ReversalStatus::PermanentlyFailed),
		_ => None,
	}
}

/// The in-memory reversal queue. Every mutating call persists through the
/// [`Persistence`] capability it's given before returning, so a process
/// restart replays the queue exactly as it last acknowledged a caller.
#[derive(Clone, Debug, Default)]
pub struct ReversalQueue {
	config: ReversalQueueConfig,
	records: Vec<ReversalRecord>,
}

impl ReversalQueue {
	#[must_use]
	pub fn new(config: ReversalQueueConfig) -> Self {
		Self {
			config,
			records: Vec::new(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Enqueues a new reversal, idempotent by `reversal_id`: re-enqueuing an
	/// id already present is a no-op, since at-least-once delivery means the
	/// same torn record may be offered twice. The record is persisted
	/// before this returns.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if the durable write fails; the queue is
	/// left unchanged in that case.
	pub fn enqueue(
		&mut self,
		reversal_id: String,
		payload: Vec<u8>,
		now_millis: u64,
		persistence: &mut dyn Persistence,
	) -> Result<(), PersistenceError> {
		if self.records.iter().any(|record| record.reversal_id == reversal_id) {
			log::debug!("reversal {reversal_id} already queued, ignoring duplicate enqueue");
			return Ok(());
		}

		let record = ReversalRecord {
			reversal_id,
			payload,
			attempts: 0,
			first_attempt_millis: now_millis,
			next_attempt_millis: now_millis,
			status: ReversalStatus::Pending,
		};
		persistence.write(NAMESPACE, &record.reversal_id, &record.to_bytes())?;
		log::warn!("reversal {} queued", record.reversal_id);
		self.records.push(record);
		Ok(())
	}

	/// The exponential backoff delay for `attempts` already made:
	/// `min(base * 2^attempts, max)`.
	#[must_use]
	pub fn backoff_for_attempt(&self, attempts: u32) -> u64 {
		let scaled = self
			.config
			.base_backoff_millis
			.saturating_mul(1u64.checked_shl(attempts).unwrap_or(u64::MAX));
		scaled.min(self.config.max_backoff_millis)
	}

	/// Drives every due, pending/escalated record through `sender` once,
	/// persisting each record's updated state before moving to the next.
	/// Returns the ids that completed this pass (so callers can remove their
	/// corresponding torn-log entries).
	///
	/// # Errors
	/// Returns [`PersistenceError`] if a durable write fails partway; any
	/// records already dispatched this pass remain persisted and
	/// in-memory, only the remaining ones are left for the next tick.
	pub fn dispatch_due<S, C>(
		&mut self,
		sender: &mut S,
		clock: &C,
		persistence: &mut dyn Persistence,
	) -> Result<Vec<String>, PersistenceError>
	where
		S: ReversalSender,
		C: Clock,
	{
		let now = clock.now_millis();
		let mut completed = Vec::new();

		for record in &mut self.records {
			if !matches!(record.status, ReversalStatus::Pending | ReversalStatus::Escalated) {
				continue;
			}
			if record.next_attempt_millis > now {
				continue;
			}

			match sender.send(&record.reversal_id, &record.payload) {
				SendResult::Success | SendResult::Duplicate => {
					log::info!("reversal {} delivered", record.reversal_id);
					record.status = ReversalStatus::Completed;
					completed.push(record.reversal_id.clone());
				}
				SendResult::PermanentFailure(ref detail) => {
					log::error!("reversal {} permanently failed: {detail}", record.reversal_id);
					record.status = ReversalStatus::PermanentlyFailed;
				}
				SendResult::Failed(ref detail) => {
					record.attempts += 1;
					log::warn!(
						"reversal {} attempt {} failed: {detail}",
						record.reversal_id,
						record.attempts
					);
					if record.attempts >= self.config.max_attempts {
						log::error!("reversal {} exhausted its retry budget", record.reversal_id);
						record.status = ReversalStatus::PermanentlyFailed;
					} else {
						let elapsed = now.saturating_sub(record.first_attempt_millis);
						if elapsed >= self.config.escalation_threshold_millis {
							record.status = ReversalStatus::Escalated;
						}
						record.next_attempt_millis = now + self.backoff_for_attempt(record.attempts);
					}
				}
			}

			persistence.write(NAMESPACE, &record.reversal_id, &record.to_bytes())?;
		}

		Ok(completed)
	}

	/// Drops completed/permanently-failed records older than
	/// `completed_retention_millis`, deleting their durable copies too.
	///
	/// # Errors
	/// Returns [`PersistenceError`] if a durable delete fails.
	pub fn prune(&mut self, now_millis: u64, persistence: &mut dyn Persistence) -> Result<(), PersistenceError> {
		let retention = self.config.completed_retention_millis;
		let mut retained = Vec::with_capacity(self.records.len());
		for record in self.records.drain(..) {
			let is_terminal = matches!(
				record.status,
				ReversalStatus::Completed | ReversalStatus::PermanentlyFailed
			);
			let expired = is_terminal && now_millis.saturating_sub(record.first_attempt_millis) >= retention;
			if expired {
				persistence.delete(NAMESPACE, &record.reversal_id)?;
			} else {
				retained.push(record);
			}
		}
		self.records = retained;
		Ok(())
	}

	#[must_use]
	pub fn records(&self) -> &[ReversalRecord] {
		&self.records
	}
}

#[cfg(test)]
mod tests {
	use super::{ReversalQueue, ReversalQueueConfig, ReversalRecord, ReversalStatus};
	use crate::capabilities::testing::{InMemoryPersistence, ManualClock, RecordingReversalSender};

	#[test]
	fn enqueue_is_idempotent_by_reversal_id() {
		let mut queue = ReversalQueue::new(ReversalQueueConfig::default());
		let mut persistence = InMemoryPersistence::new();
		queue.enqueue("r1".to_owned(), vec![0x01], 0, &mut persistence).unwrap();
		queue.enqueue("r1".to_owned(), vec![0x02], 0, &mut persistence).unwrap();
		assert_eq!(queue.len(), 1);
	}

	#[test]
	fn enqueue_persists_before_returning() {
		let mut queue = ReversalQueue::new(ReversalQueueConfig::default());
		let mut persistence = InMemoryPersistence::new();
		queue.enqueue("r1".to_owned(), vec![0xAB], 0, &mut persistence).unwrap();
		let persisted = persistence.read("reversal_queue", "r1").unwrap().unwrap();
		assert_eq!(ReversalRecord::from_bytes(&persisted).unwrap().payload, vec![0xAB]);
	}

	#[test]
	fn backoff_doubles_until_cap() {
		let queue = ReversalQueue::new(ReversalQueueConfig {
			base_backoff_millis: 5_000,
			max_backoff_millis: 20_000,
			..ReversalQueueConfig::default()
		});
		assert_eq!(queue.backoff_for_attempt(0), 5_000);
		assert_eq!(queue.backoff_for_attempt(1), 10_000);
		assert_eq!(queue.backoff_for_attempt(2), 20_000);
		assert_eq!(queue.backoff_for_attempt(10), 20_000);
	}

	#[test]
	fn dispatch_due_completes_on_success() {
		let mut queue = ReversalQueue::new(ReversalQueueConfig::default());
		let mut persistence = InMemoryPersistence::new();
		queue.enqueue("r1".to_owned(), vec![0xAB], 0, &mut persistence).unwrap();
		let clock = ManualClock::at(0);
		let mut sender = RecordingReversalSender::always_succeeding();

		let completed = queue.dispatch_due(&mut sender, &clock, &mut persistence).unwrap();
		assert_eq!(completed, vec!["r1".to_owned()]);
		assert_eq!(queue.records()[0].status, ReversalStatus::Completed);
		let persisted = ReversalRecord::from_bytes(&persistence.read("reversal_queue", "r1").unwrap().unwrap()).unwrap();
		assert_eq!(persisted.status, ReversalStatus::Completed);
	}

	#[test]
	fn dispatch_due_reschedules_on_failure() {
		let mut queue = ReversalQueue::new(ReversalQueueConfig::default());
		let mut persistence = InMemoryPersistence::new();
		queue.enqueue("r1".to_owned(), vec![0xAB], 0, &mut persistence).unwrap();
		let clock = ManualClock::at(0);
		let mut sender = RecordingReversalSender::always_failing();

		let completed = queue.dispatch_due(&mut sender, &clock, &mut persistence).unwrap();
		assert!(completed.is_empty());
		assert_eq!(queue.records()[0].attempts, 1);
		assert_eq!(queue.records()[0].next_attempt_millis, 5_000);
	}

	#[test]
	fn prune_drops_old_completed_records() {
		let mut queue = ReversalQueue::new(ReversalQueueConfig::default());
		let mut persistence = InMemoryPersistence::new();
		queue.enqueue("r1".to_owned(), vec![0xAB], 0, &mut persistence).unwrap();
		let clock = ManualClock::at(0);
		let mut sender = RecordingReversalSender::always_succeeding();
		queue.dispatch_due(&mut sender, &clock, &mut persistence).unwrap();

		queue.prune(24 * 60 * 60_000 + 1, &mut persistence).unwrap();
		assert!(queue.is_empty());
		assert!(persistence.read("reversal_queue", "r1").unwrap().is_none());
	}
}
