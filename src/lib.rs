//! A portable EMV Contactless payment kernel suite for Visa, Mastercard and
//! the shared AmEx/Discover/JCB/UnionPay skeleton.
//!
//! This crate owns the card-facing protocol state machine only: BER-TLV and
//! DOL codecs, APDU encoding, the per-scheme kernels, and the durable
//! safe-fail plumbing around them. Everything it needs from the outside
//! world - a transceiver, offline data authentication, CA keys, issuer
//! script authentication, persistence, a reversal sender, a clock and an
//! RNG - is injected as a [`capabilities`] trait rather than assumed.

// Linting Rules
#![warn(
	clippy::complexity,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::clone_on_ref_ptr,
	clippy::dbg_macro,
	clippy::filetype_is_file,
	clippy::if_then_some_else_none,
	clippy::self_named_module_files,
	clippy::undocumented_unsafe_blocks
)]
#![allow(
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::similar_names,
	clippy::struct_excessive_bools,
	clippy::too_many_arguments,
	clippy::too_many_lines
)]

// Modules
pub mod macros;
#[cfg(test)]
pub mod testing_macros;

pub mod apdu;
pub mod capabilities;
pub mod config;
pub mod data_store;
pub mod dol;
pub mod durability;
pub mod emv;
pub mod entry_point;
pub mod error;
pub mod kernel;
pub mod non_emv;
pub mod outcome;
pub mod output_colours;
pub mod script;
pub mod sensitive;
pub mod tac;
pub mod transaction;
pub mod util;
