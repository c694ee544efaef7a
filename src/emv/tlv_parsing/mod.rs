//! The module for all Tag-Length-Value (TLV) parsing.
//!
//! Some information for this can be found in EMV Book 3, under `Annex B`, but
//! that information is focused on BER-TLV format in particular.

// Modules
pub mod ber_tlv;

// Uses
use crate::error::ParseError;

/// A raw EMV TLV document: an ordered sequence of [`RawEmvNode`]s, in the
/// order they were encountered.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RawEmvBlock {
	pub nodes: Vec<RawEmvNode>,
}
impl From<Vec<RawEmvNode>> for RawEmvBlock {
	fn from(nodes: Vec<RawEmvNode>) -> Self {
		Self { nodes }
	}
}
impl From<RawEmvBlock> for Vec<RawEmvNode> {
	fn from(block: RawEmvBlock) -> Self {
		block.nodes
	}
}

impl RawEmvBlock {
	/// Returns the first tag matching `tag` in document order, searching
	/// recursively into constructed children.
	#[must_use]
	pub fn find(&self, tag: &[u8]) -> Option<&RawEmvTag> {
		for node in &self.nodes {
			if node.tag.tag == tag {
				return Some(&node.tag);
			}
			if let Some(found) = node.child_block.find(tag) {
				return Some(found);
			}
		}
		None
	}

	/// Returns every primitive leaf in the document, in depth-first order -
	/// the same set `parseRecursive` would have produced directly.
	#[must_use]
	pub fn primitive_leaves(&self) -> Vec<&RawEmvTag> {
		let mut leaves = Vec::new();
		self.collect_primitive_leaves(&mut leaves);
		leaves
	}

	fn collect_primitive_leaves<'a>(&'a self, out: &mut Vec<&'a RawEmvTag>) {
		for node in &self.nodes {
			match node.tag.data_object_type {
				DataObjectType::Primitive => out.push(&node.tag),
				DataObjectType::Constructed => node.child_block.collect_primitive_leaves(out),
			}
		}
	}

	/// Re-serializes the block back to BER-TLV bytes. For a document that
	/// was itself produced by [`ber_tlv::parse`], `build(parse(bytes)) ==
	/// bytes` modulo any trailing `0x00` filler that was skipped on parse.
	#[must_use]
	pub fn build(&self) -> Vec<u8> {
		let mut out = Vec::new();
		for node in &self.nodes {
			out.extend(node.tag.build());
		}
		out
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawEmvNode {
	pub tag: RawEmvTag,
	pub child_block: RawEmvBlock,
}

/// A raw EMV tag-value pair, with no meaning associated with it.
///
/// This can be further parsed based on the tag value.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawEmvTag {
	pub tag: Vec<u8>,
	pub class: TagClass,
	pub data_object_type: DataObjectType,
	pub data: Vec<u8>,
}

impl RawEmvTag {
	/// Encodes the tag back to its BER-TLV wire representation: tag bytes,
	/// BER length (short or long form as needed), then the raw value.
	#[must_use]
	pub fn build(&self) -> Vec<u8> {
		let mut out = self.tag.clone();
		out.extend(encode_ber_length(self.data.len()));
		out.extend_from_slice(&self.data);
		out
	}
}

/// Encodes a length using BER short form (`0`-`127`) or long form.
#[must_use]
pub fn encode_ber_length(length: usize) -> Vec<u8> {
	if length <= 0x7F {
		vec![length as u8]
	} else {
		let bytes = length.to_be_bytes();
		let significant: Vec<u8> = bytes
			.iter()
			.copied()
			.skip_while(|b| *b == 0)
			.collect();
		let mut out = vec![0b1000_0000 | significant.len() as u8];
		out.extend(significant);
		out
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TagClass {
	Universal,
	Application,
	ContextSpecific,
	Private,
}

impl TryFrom<u8> for TagClass {
	type Error = ParseError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0b00 => Ok(Self::Universal),
			0b01 => Ok(Self::Application),
			0b10 => Ok(Self::ContextSpecific),
			0b11 => Ok(Self::Private),
			_ => Err(ParseError::NonCompliant),
		}
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataObjectType {
	Primitive,
	Constructed,
}
