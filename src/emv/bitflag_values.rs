//! The shared trait implemented by every byte-backed EMV bitmask type (TVR,
//! TSI, AIP, AUC, CTQ, TTQ, CVR, CCI, CVM Results, ...).

/// A value that is stored in a bitflag-style format according to the EMV
/// Books, parsed and serialized as a fixed-width big-endian byte sequence.
pub trait BitflagValue
where
	Self: Sized,
{
	/// The number of bytes in the raw value.
	const NUM_BYTES: usize;
	/// The bit mask for the bits that are actually used in this value.
	///
	/// Used to zero out any unused bits on parse, so that round-tripping
	/// through [`Self::to_bytes`] always reproduces the same masked value.
	const USED_BITS_MASK: &'static [u8];

	/// Serializes the value back to its raw big-endian byte representation.
	fn to_bytes(&self) -> Vec<u8>;
}
