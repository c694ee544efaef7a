//! Byte-level utility functions used throughout the codec and kernel layers.

use crate::error::ParseError;

/// The number of bytes in a 32-bit integer.
pub const BYTES_PER_32_BITS: usize = 4;
/// The number of bits in a byte.
pub const BITS_PER_BYTE: u8 = 8;

/// Interprets a big-endian byte slice (up to 4 bytes) as a `u32`.
#[must_use]
pub fn byte_slice_to_u32(bytes: &[u8]) -> u32 {
	let mut result: u32 = 0;
	for byte in bytes {
		result = (result << BITS_PER_BYTE) | u32::from(*byte);
	}
	result
}

/// Interprets a big-endian byte slice (up to 8 bytes) as a `u64`.
#[must_use]
pub fn byte_slice_to_u64(bytes: &[u8]) -> u64 {
	let mut result: u64 = 0;
	for byte in bytes {
		result = (result << BITS_PER_BYTE) | u64::from(*byte);
	}
	result
}

/// Encodes a `u64` as a big-endian byte vector of exactly `num_bytes` bytes,
/// truncating the most-significant bytes if the value doesn't fit.
#[must_use]
pub fn u64_to_byte_vec(value: u64, num_bytes: usize) -> Vec<u8> {
	let full = value.to_be_bytes();
	full[(full.len() - num_bytes.min(full.len()))..].to_vec()
}

/// Decodes a packed BCD (binary-coded decimal) byte slice into its decimal
/// digit string, e.g. `[0x25, 0x12, 0x31]` -> `"251231"`.
///
/// # Errors
/// Returns [`ParseError::NonCompliant`] if any nibble isn't a valid decimal
/// digit (0-9).
pub fn bcd_bytes_to_digit_string(bytes: &[u8]) -> Result<String, ParseError> {
	let mut result = String::with_capacity(bytes.len() * 2);
	for byte in bytes {
		let high = byte >> 4;
		let low = byte & 0x0F;
		if high > 9 || low > 9 {
			return Err(ParseError::NonCompliant);
		}
		result.push((b'0' + high) as char);
		result.push((b'0' + low) as char);
	}
	Ok(result)
}

/// Decodes a 3-byte packed-BCD `YYMMDD` date using the 80-year sliding
/// window: if the encoded two-digit year is `>= 80` and the current year's
/// two-digit component is `< 80`, the date is assigned to the previous
/// century; if the encoded year is `< 20` and the current year's component
/// is `>= 80`, it's assigned to the next century; otherwise it shares the
/// current century.
///
/// # Errors
/// Returns [`ParseError::ByteCountIncorrect`] if `bytes` isn't 3 bytes long,
/// or [`ParseError::NonCompliant`] if any nibble isn't a valid decimal digit.
pub fn decode_bcd_date_sliding_window(
	bytes: &[u8],
	current_year: u16,
) -> Result<(u16, u8, u8), ParseError> {
	use std::cmp::Ordering;

	if bytes.len() != 3 {
		return Err(ParseError::ByteCountIncorrect {
			r#type: Ordering::Equal,
			expected: 3,
			found: bytes.len(),
		});
	}
	let digits = bcd_bytes_to_digit_string(bytes)?;
	let yy: u16 = digits[0..2].parse().map_err(|_| ParseError::NonCompliant)?;
	let mm: u8 = digits[2..4].parse().map_err(|_| ParseError::NonCompliant)?;
	let dd: u8 = digits[4..6].parse().map_err(|_| ParseError::NonCompliant)?;

	let current_century = (current_year / 100) * 100;
	let current_yy = current_year % 100;

	let year = if yy >= 80 && current_yy < 80 {
		current_century - 100 + yy
	} else if yy < 20 && current_yy >= 80 {
		current_century + 100 + yy
	} else {
		current_century + yy
	};

	Ok((year, mm, dd))
}

/// XORs two equal-length byte slices together.
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
#[must_use]
pub fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
	assert_eq!(a.len(), b.len(), "xor_bytes requires equal-length slices");
	a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Fits `value` into exactly `expected_length` bytes per the DOL
/// left-justify/zero-pad-if-short, right-truncate-if-long rule, using
/// `pad_byte` as the fill value (`0x00` for numeric tags, `0x20` for
/// alphanumeric identifier tags).
#[must_use]
pub fn fit_to_length(value: &[u8], expected_length: usize, pad_byte: u8) -> Vec<u8> {
	match value.len().cmp(&expected_length) {
		std::cmp::Ordering::Equal => value.to_vec(),
		std::cmp::Ordering::Less => {
			let mut out = value.to_vec();
			out.resize(expected_length, pad_byte);
			out
		}
		std::cmp::Ordering::Greater => value[..expected_length].to_vec(),
	}
}

/// Interprets a byte slice as a lossy UTF-8 string, for display of
/// ASCII-numeric EMV data objects such as service codes.
#[must_use]
pub fn bytes_to_str(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).into_owned()
}

/// Parses a decimal string into a `u16`.
///
/// # Errors
/// Returns [`ParseError::InvalidNumber`] if `value` isn't a valid `u16`.
pub fn parse_str_to_u16(value: &str) -> Result<u16, ParseError> {
	value.parse().map_err(|_| ParseError::InvalidNumber)
}

/// A masked view of a PAN, showing only the first 6 and last 4 digits, per
/// the crate's policy of never logging full PANs.
#[must_use]
pub fn mask_pan_digits(pan_digits: &str) -> String {
	let len = pan_digits.len();
	if len <= 10 {
		return "*".repeat(len);
	}
	let first_six = &pan_digits[..6];
	let last_four = &pan_digits[(len - 4)..];
	format!("{first_six}{}{last_four}", "*".repeat(len - 10))
}

/// Encodes a decimal digit string into packed BCD, left-justified and
/// `0xF`-padded in the final nibble if the digit count is odd.
///
/// # Errors
/// Returns [`ParseError::NonCompliant`] if any character isn't a decimal
/// digit.
pub fn digit_string_to_bcd_bytes(digits: &str) -> Result<Vec<u8>, ParseError> {
	let mut nibbles = Vec::with_capacity(digits.len());
	for c in digits.chars() {
		let digit = c.to_digit(10).ok_or(ParseError::NonCompliant)? as u8;
		nibbles.push(digit);
	}
	if nibbles.len() % 2 != 0 {
		nibbles.push(0xF);
	}

	Ok(nibbles
		.chunks(2)
		.map(|pair| (pair[0] << 4) | pair[1])
		.collect())
}

/// Parses a hex string (with or without a `0x` prefix, whitespace tolerated)
/// into raw bytes.
///
/// # Errors
/// Returns [`ParseError::NonCompliant`] if the string has an odd number of
/// hex digits or contains a non-hex character.
pub fn parse_hex_str(hex_str: &str) -> Result<Vec<u8>, ParseError> {
	let cleaned: String = hex_str
		.trim_start_matches("0x")
		.chars()
		.filter(|c| !c.is_whitespace())
		.collect();
	if cleaned.len() % 2 != 0 {
		return Err(ParseError::NonCompliant);
	}

	(0..cleaned.len())
		.step_by(2)
		.map(|i| u8::from_str_radix(&cleaned[i..(i + 2)], 16).map_err(|_| ParseError::NonCompliant))
		.collect()
}

/// Formats bytes as a contiguous lowercase hex string, e.g. `[0x9F, 0x02]` ->
/// `"9f02"`.
#[must_use]
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Appends `bytes` to `out` preceded by its length as a 4-byte big-endian
/// `u32`, for the durability layer's record-to-bytes encoding.
pub fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
	out.extend((bytes.len() as u32).to_be_bytes());
	out.extend(bytes);
}

/// Reads a [`write_len_prefixed`]-encoded field starting at `cursor`,
/// returning the field's bytes and advancing `cursor` past it.
///
/// # Errors
/// Returns [`ParseError::NonCompliant`] if fewer bytes remain than the
/// encoded length requires.
pub fn read_len_prefixed<'a>(bytes: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], ParseError> {
	if *cursor + BYTES_PER_32_BITS > bytes.len() {
		return Err(ParseError::NonCompliant);
	}
	let len = byte_slice_to_u32(&bytes[*cursor..(*cursor + BYTES_PER_32_BITS)]) as usize;
	*cursor += BYTES_PER_32_BITS;
	if *cursor + len > bytes.len() {
		return Err(ParseError::NonCompliant);
	}
	let field = &bytes[*cursor..(*cursor + len)];
	*cursor += len;
	Ok(field)
}
