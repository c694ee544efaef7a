//! Convenience macros used to generate the repetitive enum and bitmask types
//! that show up throughout the EMV data model.

/// A non-composite enum value that doesn't assign each `value` to the
/// `variant`'s discriminant, and as such allows for multiple `value`s per
/// `variant`.
///
/// This version supports fallible conversion, so not all patterns must be
/// present.
#[macro_export]
macro_rules! enum_no_repr_fallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty, $error_type:ty, {$error_fn:expr} {
	        $(
                $(#[doc = $doc:expr])?
	            $variant:ident = $pattern:pat => $string:literal,
	        )*
	    }
	) => {
		$(#[$outer])*
        $visibility enum $name {
            $(
                #[doc = concat!($string, " - ", stringify!($pattern))]
                $(#[doc = $doc])?
                $variant,
            )*
        }

        impl TryFrom<$typ> for $name {
            type Error = $error_type;

			fn try_from(value: $typ) -> Result<Self, $error_type> {
	            #[allow(clippy::redundant_closure_call)]
				match value {
					$($pattern => Ok(Self::$variant),)*
					_ => Err(($error_fn)(value)),
				}
			}
        }

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
    };
}

/// A non-composite enum value that doesn't assign each `value` to the
/// `variant`'s discriminant, and as such allows for multiple `value`s per
/// `variant`.
///
/// This version supports infallible conversion, so all patterns must be
/// present.
#[macro_export]
macro_rules! enum_no_repr_infallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty {
	        $(
                $(#[doc = $doc:expr])?
	            $variant:ident = $pattern:pat => $string:literal,
	        )*
	    }
	) => {
		$(#[$outer])*
        $visibility enum $name {
            $(
                #[doc = concat!($string, " - ", stringify!($pattern))]
                $(#[doc = $doc])?
                $variant,
            )*
        }

        impl From<$typ> for $name {
			fn from(value: $typ) -> Self {
				match value {
					$($pattern => Self::$variant,)*
				}
			}
        }

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
    };
}

/// A non-composite enum value that assigns each `value` to the `variant`'s
/// discriminant, and as such requires only one `value` per `variant`.
///
/// This version supports fallible conversion, so not all patterns must be
/// present.
#[macro_export]
macro_rules! enum_repr_fallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty, $error_type:ty, {$error_fn:expr} {
	        $(
                $(#[doc = $doc:expr])?
	            $variant:ident = $value:literal => $string:literal,
	        )*
	    }
	) => {
		#[repr($typ)]
		$(#[$outer])*
        $visibility enum $name {
            $(
                #[doc = concat!($string, " - ", stringify!($value))]
                $(#[doc = $doc])?
                $variant = $value,
            )*
        }

        impl TryFrom<$typ> for $name {
            type Error = $error_type;

			fn try_from(value: $typ) -> Result<Self, $error_type> {
	            #[allow(clippy::redundant_closure_call)]
				match value {
					$($value => Ok(Self::$variant),)*
					_ => Err(($error_fn)(value)),
				}
			}
        }

		impl From<$name> for $typ {
			fn from(value: $name) -> Self {
				value as $typ
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
    };
}

/// A non-composite enum value that assigns each `value` to the `variant`'s
/// discriminant, and as such requires only one `value` per `variant`.
///
/// This version supports infallible conversion, so all patterns must be
/// present.
#[macro_export]
macro_rules! enum_repr_infallible {
	(
		$(#[$outer:meta])*
		$visibility:vis enum $name:ident: $typ:ty {
	        $(
                $(#[doc = $doc:expr])?
	            $variant:ident = $value:literal => $string:literal,
	        )*
	    }
	) => {
		#[repr($typ)]
		$(#[$outer])*
        $visibility enum $name {
            $(
                #[doc = concat!($string, " - ", stringify!($value))]
                $(#[doc = $doc])?
                $variant = $value,
            )*
        }

        impl From<$typ> for $name {
			fn from(value: $typ) -> Self {
				match value {
					$($value => Self::$variant,)*
				}
			}
        }

		impl From<$name> for $typ {
			fn from(value: $name) -> Self {
				value as $typ
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $string,)*
				})
			}
		}
    };
}

/// Defines a byte-backed EMV bitmask type (TVR, TSI, AIP, CTQ, TTQ, ...).
///
/// Each byte is declared with its bit fields; a field's type is either `bool`
/// for a single bit, or a numeric/enum type paired with a mask (optionally
/// `>> shift`) for multi-bit fields. The trailing `=> "..."` annotation on
/// each field is kept only as documentation of the EMV Book 3/4 meaning of
/// the bit(s) - it isn't used to generate any runtime behaviour.
///
/// Parsing masks off unused bits per [`BitflagValue::USED_BITS_MASK`] so that
/// round-tripping through [`BitflagValue::to_bytes`] always reproduces the
/// same masked value, per the EMV requirement that unused bits stay zero.
#[macro_export]
macro_rules! bitflag_value {
	(
		$(#[$outer:meta])*
		$visibility:vis struct $name:ident: $byte_count:literal {
	        $(
	            $byte_num:literal {
		            $(
		                $(#[doc = $doc:expr])?
		                $field_visibility:vis $field:ident: $typ:tt = $field_tt:tt => $display_tt:tt,
		            )*
	            }
	        )*
	    }
	) => {
		$(#[$outer])*
        $visibility struct $name {
            $($(
                $(#[doc = $doc])?
                $field_visibility $field: $typ,
            )*)*
        }

		impl TryFrom<&[u8]> for $name {
			type Error = $crate::error::ParseError;

			fn try_from(raw_bytes: &[u8]) -> Result<Self, Self::Error> {
				use $crate::emv::bitflag_values::BitflagValue;

				if raw_bytes.len() != Self::NUM_BYTES {
					return Err($crate::error::ParseError::ByteCountIncorrect {
						r#type: std::cmp::Ordering::Equal,
						expected: Self::NUM_BYTES,
						found: raw_bytes.len(),
					});
				}
				let mut bytes = [0u8; Self::NUM_BYTES];
				for (index, byte) in raw_bytes.iter().enumerate() {
					bytes[index] = byte & Self::USED_BITS_MASK[index];
				}

				Ok(Self {
					$($(
						$field: bitflag_value!(@parse: $typ, bytes, $byte_num, $field_tt),
					)*)*
				})
			}
		}

		impl $crate::emv::bitflag_values::BitflagValue for $name {
			const NUM_BYTES: usize = $byte_count;
			const USED_BITS_MASK: &'static [u8] = &[
				$(
					$(
						bitflag_value!(@byte_bits: $field_tt) |
					)* 0b0000_0000,
				)*
			];

			fn to_bytes(&self) -> Vec<u8> {
				vec![
					$(
						$(
							bitflag_value!(@field_binary_repr: self, $field, $typ, $field_tt) |
						)* 0b0000_0000,
					)*
				]
			}
		}
    };

	// Internal Rules
	// Pulling the binary literal out of the token tree
	(@byte_bits: $byte_bits:literal) => {
		$byte_bits
	};
	(@byte_bits: ($byte_bits:literal >> $shift_bit_count:literal)) => {
		$byte_bits
	};

	// Parsing
	(@parse: bool, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		$byte_bits & $bytes[$byte_num] > 0
	};
	(@parse: u8, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		($byte_bits & $bytes[$byte_num]) as u8
	};
	(@parse: u8, $bytes:ident, $byte_num:literal, ($byte_bits:literal >> $shift_bit_count:literal)) => {
		(($byte_bits & $bytes[$byte_num]) >> $shift_bit_count) as u8
	};
	(@parse: $typ:ty, $bytes:ident, $byte_num:literal, $byte_bits:literal) => {
		<$typ>::try_from($byte_bits & $bytes[$byte_num])?
	};
	(@parse: $typ:ty, $bytes:ident, $byte_num:literal, ($byte_bits:literal >> $shift_bit_count:literal)) => {
		<$typ>::try_from(($byte_bits & $bytes[$byte_num]) >> $shift_bit_count)?
	};

	// Generating binary representations
	(@field_binary_repr: $self:ident, $field:ident, bool, $byte_bits:literal) => {
		if $self.$field {
			$byte_bits
		} else {
			0b0000_0000
		}
	};
	(@field_binary_repr: $self:ident, $field:ident, $typ:ty, $byte_bits:literal) => {
		u8::from($self.$field)
	};
	(@field_binary_repr: $self:ident, $field:ident, $typ:ty, ($byte_bits:literal >> $shift_bit_count:literal)) => {
		u8::from($self.$field) << $shift_bit_count
	};
}
