//! Decoded bencode value tree.

use bytes::Bytes;

/// One decoded bencode value.
///
/// Byte strings are kept as raw bytes because bencode keys and strings are
/// not required to be valid UTF-8. Dictionaries keep the order their keys
/// appeared in on the wire so re-encoding reproduces the original bytes.
///
/// Dropping a tree is iterative, so arbitrarily deep input is safe to decode
/// and discard. The derived `Clone`, `PartialEq` and `Debug` impls recurse
/// once per nesting level and are meant for trees of ordinary depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Bytes),
    List(Vec<Value>),
    Dict(Dictionary),
}

impl Value {
    /// Builds a byte-string value from UTF-8 text.
    pub fn string(text: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the byte string as text when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict().and_then(|dict| dict.get(key))
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
        }
    }

    /// Returns true when every dictionary in the tree has strictly ascending keys.
    ///
    /// Canonical input is what other clients produce; the codec accepts
    /// non-canonical dictionaries and preserves their order either way.
    pub fn is_canonical(&self) -> bool {
        let mut pending = vec![self];
        while let Some(value) = pending.pop() {
            match value {
                Value::List(items) => pending.extend(items.iter()),
                Value::Dict(dict) => {
                    if !dict.has_sorted_keys() {
                        return false;
                    }
                    pending.extend(dict.values());
                }
                Value::Integer(_) | Value::Bytes(_) => {}
            }
        }
        true
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::List(items) if !items.is_empty() => std::mem::take(items),
            Value::Dict(dict) if !dict.is_empty() => dict.drain_values().collect(),
            _ => return,
        };

        // Children are emptied before they drop, so each drop here is shallow.
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::List(items) => pending.append(items),
                Value::Dict(dict) => pending.extend(dict.drain_values()),
                Value::Integer(_) | Value::Bytes(_) => {}
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dict(dict)
    }
}

/// Insertion-ordered bencode dictionary.
///
/// Entries are stored exactly as decoded, duplicates included, so that
/// `encode(decode(bytes)) == bytes` holds for every accepted input.
/// Lookups return the first entry with a matching key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<(Bytes, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.as_ref() == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Sets `key` to `value`, replacing the first existing entry in place
    /// or appending a new entry at the end.
    pub fn insert(&mut self, key: impl Into<Bytes>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(candidate, _)| *candidate == key)
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Appends an entry without checking for an existing key.
    pub(crate) fn push(&mut self, key: Bytes, value: Value) {
        self.entries.push((key, value));
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Bytes, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    fn drain_values(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.entries.drain(..).map(|(_, value)| value)
    }

    fn has_sorted_keys(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].0 < pair[1].0)
    }
}

impl FromIterator<(Bytes, Value)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Bytes, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
