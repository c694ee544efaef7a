//! The Data Object List (DOL) engine: parses PDOL/CDOL/DDOL/UDOL definitions
//! and assembles the value stream a terminal sends back to the card.

use crate::{data_store::DataStore, error::ParseError, util::fit_to_length};

/// A single `(tag, expected_length)` entry in a DOL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DolEntry {
	pub tag: Vec<u8>,
	pub expected_length: usize,
}

/// An ordered sequence of [`DolEntry`], as parsed from a PDOL, CDOL1, CDOL2,
/// DDOL or UDOL tag value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dol {
	pub entries: Vec<DolEntry>,
}

/// Tags whose value is an identifier rather than a number, and so are
/// padded with `0x20` (ASCII space) rather than `0x00` when short. Per
/// §4.2's note on alphanumeric identifier tags (merchant id, terminal id).
const ALPHANUMERIC_PAD_TAGS: &[&[u8]] = &[
	&[0x9F, 0x16], // Merchant Identifier
	&[0x9F, 0x1C], // Terminal Identification
	&[0x9F, 0x4E], // Merchant Name and Location
	&[0x5F, 0x20], // Cardholder Name
];

impl Dol {
	/// Parses a DOL definition: alternating `(tag, length)` pairs, where the
	/// tag follows the usual BER-TLV multi-byte tag rule and the length is
	/// always a single EMV-form byte (0-255).
	///
	/// # Errors
	/// Returns [`ParseError::NonCompliant`] if the input ends mid-tag or
	/// mid-length.
	pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
		let mut entries = Vec::new();
		let mut index = 0;
		let len = bytes.len();
		while index < len {
			let tag_start = index;
			let tag_byte_0 = bytes[index];
			let mut tag_continues = 0b0001_1111 & tag_byte_0 == 0b0001_1111;
			while tag_continues {
				index += 1;
				if index >= len {
					return Err(ParseError::NonCompliant);
				}
				tag_continues = 0b1000_0000 & bytes[index] > 0;
			}
			let tag_end = index;
			index += 1;
			if index >= len {
				return Err(ParseError::NonCompliant);
			}

			let expected_length = usize::from(bytes[index]);
			index += 1;

			entries.push(DolEntry {
				tag: bytes[tag_start..=tag_end].to_vec(),
				expected_length,
			});
		}

		Ok(Self { entries })
	}

	/// Builds the value stream for this DOL by looking each entry's tag up
	/// first in the terminal data store, then the card data store, per
	/// §4.2's lookup order.
	///
	/// Missing tags emit `expected_length` zero bytes (or `0x20` bytes for
	/// the identifier tags in [`ALPHANUMERIC_PAD_TAGS`]); present values
	/// are left-justified and zero-padded if short, or truncated from the
	/// right if long.
	#[must_use]
	pub fn build(&self, terminal_store: &DataStore, card_store: &DataStore) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.entries.iter().map(|e| e.expected_length).sum());
		for entry in &self.entries {
			let pad_byte = if ALPHANUMERIC_PAD_TAGS.contains(&entry.tag.as_slice()) {
				0x20
			} else {
				0x00
			};
			let value = terminal_store
				.get(&entry.tag)
				.or_else(|| card_store.get(&entry.tag));
			match value {
				Some(value) => out.extend(fit_to_length(value, entry.expected_length, pad_byte)),
				None => out.extend(std::iter::repeat(pad_byte).take(entry.expected_length)),
			}
		}
		out
	}

	#[must_use]
	pub fn total_length(&self) -> usize {
		self.entries.iter().map(|e| e.expected_length).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::Dol;
	use crate::data_store::DataStore;

	#[test]
	fn parses_alternating_tag_length_pairs() {
		// 9F02 (amount authorized, 6 bytes), 9A (transaction date, 3 bytes)
		let bytes = [0x9F, 0x02, 0x06, 0x9A, 0x03];
		let dol = Dol::parse(&bytes).unwrap();
		assert_eq!(dol.entries.len(), 2);
		assert_eq!(dol.entries[0].tag, vec![0x9F, 0x02]);
		assert_eq!(dol.entries[0].expected_length, 6);
		assert_eq!(dol.entries[1].tag, vec![0x9A]);
		assert_eq!(dol.entries[1].expected_length, 3);
	}

	#[test]
	fn build_emits_total_length_with_missing_tags_zeroed() {
		let dol = Dol::parse(&[0x9F, 0x02, 0x06, 0x9A, 0x03]).unwrap();
		let terminal_store = DataStore::new();
		let card_store = DataStore::new();
		let built = dol.build(&terminal_store, &card_store);
		assert_eq!(built.len(), dol.total_length());
		assert_eq!(built, vec![0x00; 9]);
	}

	#[test]
	fn build_pads_short_values_and_truncates_long_ones() {
		let dol = Dol::parse(&[0x9F, 0x02, 0x04, 0x9A, 0x01]).unwrap();
		let mut terminal_store = DataStore::new();
		terminal_store.set(&[0x9F, 0x02], vec![0x00, 0x25]); // short, pads to 4
		terminal_store.set(&[0x9A], vec![0x25, 0x11, 0x19]); // long, truncates to 1
		let card_store = DataStore::new();

		let built = dol.build(&terminal_store, &card_store);
		assert_eq!(built, vec![0x00, 0x25, 0x00, 0x00, 0x25]);
	}

	#[test]
	fn build_pads_identifier_tags_with_space() {
		let dol = Dol::parse(&[0x9F, 0x16, 0x04]).unwrap();
		let terminal_store = DataStore::new();
		let card_store = DataStore::new();
		let built = dol.build(&terminal_store, &card_store);
		assert_eq!(built, vec![0x20; 4]);
	}

	#[test]
	fn terminal_store_takes_priority_over_card_store() {
		let dol = Dol::parse(&[0x9A, 0x03]).unwrap();
		let mut terminal_store = DataStore::new();
		terminal_store.set(&[0x9A], vec![0x25, 0x11, 0x19]);
		let mut card_store = DataStore::new();
		card_store.set(&[0x9A], vec![0x00, 0x00, 0x00]);

		let built = dol.build(&terminal_store, &card_store);
		assert_eq!(built, vec![0x25, 0x11, 0x19]);
	}
}
