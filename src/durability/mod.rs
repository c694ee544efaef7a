//! Durable safe-fail handling: the torn-transaction log and the reversal
//! queue it feeds, per §6's durability requirements.

pub mod reversal_queue;
pub mod torn_log;

pub use self::{
	reversal_queue::{ReversalQueueConfig, ReversalRecord, ReversalQueue},
	torn_log::{hash_pan, RecoveryStatus, TornLog, TornRecord},
};
