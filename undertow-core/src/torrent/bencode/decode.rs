//! Bencode decoder.
//!
//! Containers are tracked on an explicit frame stack instead of the call
//! stack, so nesting depth is limited only by the size of the input.

use bytes::Bytes;

use super::error::BencodeError;
use super::value::{Dictionary, Value};

/// Decodes exactly one bencode value spanning all of `data`.
///
/// # Errors
///
/// - `BencodeError` - If the input is truncated, violates the grammar, or
///   has bytes left over after the first value
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;
    if consumed != data.len() {
        return Err(BencodeError::TrailingData { offset: consumed });
    }
    Ok(value)
}

/// Decodes the first bencode value in `data`.
///
/// Returns the value together with the number of bytes it occupied.
///
/// # Errors
///
/// - `BencodeError` - If the leading value is truncated or malformed
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut decoder = Decoder { data, pos: 0 };
    let value = decoder.decode_value()?;
    Ok((value, decoder.pos))
}

/// Open container awaiting more items.
enum Frame {
    List(Vec<Value>),
    Dict {
        entries: Dictionary,
        pending_key: Option<(Bytes, usize)>,
    },
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn decode_value(&mut self) -> Result<Value, BencodeError> {
        let mut stack: Vec<Frame> = Vec::new();

        loop {
            let expecting_key = matches!(
                stack.last(),
                Some(Frame::Dict {
                    pending_key: None,
                    ..
                })
            );
            let context = match stack.last() {
                None => "value",
                Some(Frame::List(_)) => "list item",
                Some(Frame::Dict { .. }) if expecting_key => "dictionary key",
                Some(Frame::Dict { .. }) => "dictionary value",
            };

            let offset = self.pos;
            let byte = self.peek(context)?;

            if byte == b'e'
                && let Some(frame) = stack.pop()
            {
                self.pos += 1;
                let completed = match frame {
                    Frame::List(items) => Value::List(items),
                    Frame::Dict {
                        pending_key: Some((_, key_offset)),
                        ..
                    } => {
                        return Err(BencodeError::MissingValue { offset: key_offset });
                    }
                    Frame::Dict { entries, .. } => Value::Dict(entries),
                };
                if let Some(root) = Self::attach(&mut stack, completed, offset)? {
                    return Ok(root);
                }
                continue;
            }

            if expecting_key {
                if !byte.is_ascii_digit() {
                    return Err(BencodeError::NonStringKey { offset });
                }
                let key = self.read_bytes()?;
                if let Some(Frame::Dict { pending_key, .. }) = stack.last_mut() {
                    *pending_key = Some((key, offset));
                }
                continue;
            }

            let completed = match byte {
                b'i' => Value::Integer(self.read_integer()?),
                b'0'..=b'9' => Value::Bytes(self.read_bytes()?),
                b'l' => {
                    self.pos += 1;
                    stack.push(Frame::List(Vec::new()));
                    continue;
                }
                b'd' => {
                    self.pos += 1;
                    stack.push(Frame::Dict {
                        entries: Dictionary::new(),
                        pending_key: None,
                    });
                    continue;
                }
                other => {
                    return Err(BencodeError::UnexpectedByte {
                        offset,
                        byte: other,
                        context,
                    });
                }
            };

            if let Some(root) = Self::attach(&mut stack, completed, offset)? {
                return Ok(root);
            }
        }
    }

    /// Hands a finished value to its parent container.
    ///
    /// Returns the value back when there is no parent, meaning decoding is done.
    fn attach(
        stack: &mut [Frame],
        value: Value,
        offset: usize,
    ) -> Result<Option<Value>, BencodeError> {
        match stack.last_mut() {
            None => Ok(Some(value)),
            Some(Frame::List(items)) => {
                items.push(value);
                Ok(None)
            }
            Some(Frame::Dict {
                entries,
                pending_key,
            }) => match pending_key.take() {
                Some((key, _)) => {
                    entries.push(key, value);
                    Ok(None)
                }
                None => Err(BencodeError::NonStringKey { offset }),
            },
        }
    }

    fn peek(&self, context: &'static str) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof {
                offset: self.pos,
                context,
            })
    }

    /// Reads `i<digits>e` starting at the current position.
    fn read_integer(&mut self) -> Result<i64, BencodeError> {
        let start = self.pos;
        let digits_start = start + 1;
        let mut end = digits_start;

        while let Some(&byte) = self.data.get(end) {
            if byte.is_ascii_digit() || byte == b'-' {
                end += 1;
            } else {
                break;
            }
        }

        match self.data.get(end) {
            Some(b'e') => {}
            Some(&byte) => {
                return Err(BencodeError::UnexpectedByte {
                    offset: end,
                    byte,
                    context: "integer",
                });
            }
            None => {
                return Err(BencodeError::UnexpectedEof {
                    offset: end,
                    context: "integer",
                });
            }
        }

        let text = &self.data[digits_start..end];
        let invalid = |reason| BencodeError::InvalidInteger {
            offset: start,
            reason,
        };

        if text.is_empty() {
            return Err(invalid("empty integer"));
        }
        let magnitude = text.strip_prefix(b"-").unwrap_or(text);
        if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
            return Err(invalid("expected decimal digits"));
        }
        if magnitude[0] == b'0' && text.len() > 1 {
            return Err(invalid("leading zero or negative zero"));
        }

        let value = std::str::from_utf8(text)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| invalid("out of range for i64"))?;

        self.pos = end + 1;
        Ok(value)
    }

    /// Reads `<len>:<bytes>` starting at the current position.
    fn read_bytes(&mut self) -> Result<Bytes, BencodeError> {
        let start = self.pos;
        let mut colon = start;

        while let Some(&byte) = self.data.get(colon) {
            if byte.is_ascii_digit() {
                colon += 1;
            } else {
                break;
            }
        }

        match self.data.get(colon) {
            Some(b':') => {}
            Some(&byte) => {
                return Err(BencodeError::UnexpectedByte {
                    offset: colon,
                    byte,
                    context: "byte string length",
                });
            }
            None => {
                return Err(BencodeError::UnexpectedEof {
                    offset: colon,
                    context: "byte string length",
                });
            }
        }

        let digits = &self.data[start..colon];
        let invalid = |reason| BencodeError::InvalidLength {
            offset: start,
            reason,
        };

        if digits.is_empty() {
            return Err(invalid("missing length"));
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(invalid("leading zero"));
        }

        let length = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or_else(|| invalid("length too large"))?;

        let body_start = colon + 1;
        let body_end = body_start
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or(BencodeError::UnexpectedEof {
                offset: self.data.len(),
                context: "byte string",
            })?;

        self.pos = body_end;
        Ok(Bytes::copy_from_slice(&self.data[body_start..body_end]))
    }
}
