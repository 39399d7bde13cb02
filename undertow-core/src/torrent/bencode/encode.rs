//! Bencode encoder.

use bytes::Bytes;

use super::value::Value;

/// Pending output while walking the value tree.
enum Task<'a> {
    Value(&'a Value),
    Key(&'a Bytes),
    End,
}

/// Serializes `value` to bencode.
///
/// Dictionary entries are written in their stored order, never re-sorted,
/// so decoding and re-encoding an accepted input yields identical bytes.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Appends the bencode form of `value` to `out`.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) {
    let mut tasks = vec![Task::Value(value)];

    while let Some(task) = tasks.pop() {
        match task {
            Task::Value(Value::Integer(number)) => {
                out.push(b'i');
                out.extend_from_slice(number.to_string().as_bytes());
                out.push(b'e');
            }
            Task::Value(Value::Bytes(bytes)) | Task::Key(bytes) => write_bytes(bytes, out),
            Task::Value(Value::List(items)) => {
                out.push(b'l');
                tasks.push(Task::End);
                tasks.extend(items.iter().rev().map(Task::Value));
            }
            Task::Value(Value::Dict(dict)) => {
                out.push(b'd');
                tasks.push(Task::End);
                for (key, value) in dict.iter().rev() {
                    tasks.push(Task::Value(value));
                    tasks.push(Task::Key(key));
                }
            }
            Task::End => out.push(b'e'),
        }
    }
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}
