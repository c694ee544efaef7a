//! The terminal and card data stores: tag -> value maps consulted by the
//! DOL engine and written to by kernel initialization and APDU responses.

use std::collections::BTreeMap;

use crate::emv::{DataObjectType, RawEmvBlock};

/// A tag -> value map, cleared at the start of every transaction.
///
/// Only primitive tags are stored; a constructed template found while
/// populating from card data is recursively descended and only its leaves
/// are inserted, per the "no cross-transaction state" / "only primitive
/// tags stored" invariants.
#[derive(Clone, Debug, Default)]
pub struct DataStore {
	tags: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl DataStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Clears every tag, for transaction-start reset.
	pub fn reset(&mut self) {
		self.tags.clear();
	}

	pub fn set(&mut self, tag: &[u8], value: Vec<u8>) {
		self.tags.insert(tag.to_vec(), value);
	}

	#[must_use]
	pub fn get(&self, tag: &[u8]) -> Option<&[u8]> {
		self.tags.get(tag).map(Vec::as_slice)
	}

	/// Populates the store from a parsed TLV block (e.g. a GPO or READ
	/// RECORD response), descending into constructed templates and storing
	/// only primitive leaves.
	pub fn ingest_block(&mut self, block: &RawEmvBlock) {
		for node in &block.nodes {
			match node.tag.data_object_type {
				DataObjectType::Primitive => {
					self.set(&node.tag.tag, node.tag.data.clone());
				}
				DataObjectType::Constructed => self.ingest_block(&node.child_block),
			}
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.tags.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::DataStore;
	use crate::emv::ber_tlv;

	#[test]
	fn reset_clears_all_tags() {
		let mut store = DataStore::new();
		store.set(&[0x9F, 0x02], vec![0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
		assert_eq!(store.len(), 1);
		store.reset();
		assert!(store.is_empty());
	}

	#[test]
	fn ingest_descends_into_constructed_templates() {
		let mut bytes = vec![0x70, 0x09];
		bytes.extend_from_slice(&[0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
		let block = ber_tlv::parse(&bytes).unwrap();

		let mut store = DataStore::new();
		store.ingest_block(&block);

		// Only the primitive leaf is stored, not the 0x70 wrapper
		assert_eq!(store.len(), 1);
		assert_eq!(
			store.get(&[0x9F, 0x02]),
			Some([0x00, 0x00, 0x00, 0x00, 0x25, 0x00].as_slice())
		);
		assert!(store.get(&[0x70]).is_none());
	}
}
