//! The module for BER-TLV parsing.
//!
//! Information for this can be found in EMV Book 3, under `Annex B`.

// Uses
use super::{DataObjectType, RawEmvBlock, RawEmvNode, RawEmvTag, TagClass};
use crate::{
	error::ParseError,
	util::{byte_slice_to_u32, BYTES_PER_32_BITS},
};

/// Parses a block of BER-TLV encoded data, descending into constructed data
/// objects recursively.
///
/// Trailing `0x00` filler bytes between or after TLVs are tolerated and
/// skipped, per EMV Book 3 Annex B.
pub fn parse(bytes: &[u8]) -> Result<RawEmvBlock, ParseError> {
	let bytes_len = bytes.len();
	let mut nodes = Vec::new();
	let mut index = 0;
	while index < bytes_len {
		// Skip 0x00 filler between TLVs
		if bytes[index] == 0x00 {
			index += 1;
			continue;
		}

		// The first byte contains some metadata about the tag
		let tag_start_index = index;
		let tag_byte_0 = bytes[index];
		let (class, data_object_type) = parse_tag_metadata(tag_byte_0)?;

		// The tag continues if the last 5 bits of the first byte are all 1
		let mut tag_continues = 0b0001_1111 & tag_byte_0 == 0b0001_1111;
		let mut continuation_bytes = 0;
		while tag_continues {
			index += 1;
			continuation_bytes += 1;
			if index >= bytes_len {
				return Err(ParseError::NonCompliant);
			}
			// At most 2 continuation bytes are accepted for a multi-byte tag
			if continuation_bytes > 2 {
				return Err(ParseError::Unsupported);
			}
			// Subsequent bytes of the tag indicate if another byte follows if the first
			// bit is 1
			tag_continues = 0b1000_0000 & bytes[index] > 0;
		}
		let tag_end_index = index;
		index += 1;
		if index >= bytes_len {
			return Err(ParseError::NonCompliant);
		}

		// The length is next
		let length_byte_0 = bytes[index];
		let length = if 0b1000_0000 & length_byte_0 > 0 {
			let subsequent_length_byte_count = (0b0111_1111 & length_byte_0) as usize;
			// Indefinite-length form (0x80) is rejected
			if subsequent_length_byte_count == 0 {
				return Err(ParseError::Unsupported);
			}
			// Tag lengths greater than the maximum unsigned 32-bit integer value are
			// unsupported
			if subsequent_length_byte_count > BYTES_PER_32_BITS {
				return Err(ParseError::Unsupported);
			}
			let start_index = index;
			index += 1 + subsequent_length_byte_count;
			if index > bytes_len {
				return Err(ParseError::NonCompliant);
			}
			byte_slice_to_u32(
				&bytes[(start_index + 1)..=(start_index + subsequent_length_byte_count)],
			) as usize
		} else {
			index += 1;
			usize::from(length_byte_0)
		};
		if index + length > bytes_len {
			return Err(ParseError::NonCompliant);
		}

		// Store a reference to the data
		let data = &bytes[index..(index + length)];

		// Push the resulting tag to the list
		nodes.push(RawEmvNode {
			tag: RawEmvTag {
				tag: bytes[tag_start_index..=tag_end_index].to_vec(),
				class,
				data_object_type,
				data: data.to_vec(),
			},
			child_block: match data_object_type {
				DataObjectType::Primitive => RawEmvBlock::default(),
				DataObjectType::Constructed => parse(data)?,
			},
		});

		// Increment the index
		index += length;
	}

	Ok(nodes.into())
}

/// Returns only the primitive leaves of [`parse`]'s result, in depth-first
/// order, without allocating the intermediate constructed nodes' own data.
pub fn parse_recursive(bytes: &[u8]) -> Result<Vec<RawEmvTag>, ParseError> {
	Ok(parse(bytes)?
		.primitive_leaves()
		.into_iter()
		.cloned()
		.collect())
}

/// Parses the class and data object type of the tag from the tag ID's first
/// byte, according to the BER-TLV specification.
pub fn parse_tag_metadata(tag_byte_0: u8) -> Result<(TagClass, DataObjectType), ParseError> {
	let class = ((0b1100_0000 & tag_byte_0) >> 6).try_into()?;
	let data_object_type = if 0b0010_0000 & tag_byte_0 > 0 {
		DataObjectType::Constructed
	} else {
		DataObjectType::Primitive
	};

	Ok((class, data_object_type))
}

// Unit Tests
#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_primitive_tag() {
		let bytes = [0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00];
		let block = parse(&bytes).unwrap();
		assert_eq!(block.nodes.len(), 1);
		assert_eq!(block.nodes[0].tag.tag, vec![0x9F, 0x02]);
		assert_eq!(block.nodes[0].tag.data, vec![0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
	}

	#[test]
	fn parses_constructed_tag_recursively() {
		// 0x70 (constructed) containing one 0x9F02 primitive leaf
		let mut bytes = vec![0x70, 0x09];
		bytes.extend_from_slice(&[0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
		let block = parse(&bytes).unwrap();
		assert_eq!(block.nodes.len(), 1);
		assert_eq!(block.nodes[0].child_block.nodes.len(), 1);
		let leaves = block.primitive_leaves();
		assert_eq!(leaves.len(), 1);
		assert_eq!(leaves[0].tag, vec![0x9F, 0x02]);
	}

	#[test]
	fn tolerates_trailing_zero_filler() {
		let bytes = [0x9F, 0x02, 0x01, 0x05, 0x00, 0x00, 0x00];
		let block = parse(&bytes).unwrap();
		assert_eq!(block.nodes.len(), 1);
	}

	#[test]
	fn truncated_length_is_malformed() {
		let bytes = [0x9F, 0x02, 0x06, 0x00];
		assert_eq!(parse(&bytes), Err(ParseError::NonCompliant));
	}

	#[test]
	fn build_round_trips_parse() {
		let bytes = [0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00];
		let block = parse(&bytes).unwrap();
		assert_eq!(block.build(), bytes);
	}

	#[test]
	fn find_searches_recursively() {
		let mut bytes = vec![0x70, 0x09];
		bytes.extend_from_slice(&[0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
		let block = parse(&bytes).unwrap();
		let found = block.find(&[0x9F, 0x02]).unwrap();
		assert_eq!(found.data, vec![0x00, 0x00, 0x00, 0x00, 0x25, 0x00]);
		assert!(block.find(&[0x9F, 0x99]).is_none());
	}

	#[test]
	fn long_form_length_is_parsed() {
		let mut bytes = vec![0x9F, 0x20, 0x81, 0x80];
		bytes.extend(vec![0xAA; 128]);
		let block = parse(&bytes).unwrap();
		assert_eq!(block.nodes[0].tag.data.len(), 128);
	}
}
