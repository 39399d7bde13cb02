//! Bencode codec.
//!
//! Order-preserving and strict: integers and lengths must use their minimal
//! decimal form, so every accepted input re-encodes to the same bytes. That
//! property is what lets the info-hash be computed from a decoded tree.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::{encode, encode_into};
pub use error::BencodeError;
pub use value::{Dictionary, Value};

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Value::Integer),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(|b| Value::Bytes(Bytes::from(b))),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(
                    (prop::collection::vec(any::<u8>(), 0..8), inner),
                    0..6
                )
                .prop_map(|entries| {
                    Value::Dict(
                        entries
                            .into_iter()
                            .map(|(key, value)| (Bytes::from(key), value))
                            .collect(),
                    )
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_decode_inverts_encode(value in arb_value()) {
            let encoded = encode(&value);
            prop_assert_eq!(decode(&encoded).unwrap(), value);
        }

        #[test]
        fn test_accepted_input_reencodes_identically(value in arb_value()) {
            let encoded = encode(&value);
            let decoded = decode(&encoded).unwrap();
            prop_assert_eq!(encode(&decoded), encoded);
        }

        #[test]
        fn test_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            if let Ok(value) = decode(&data) {
                prop_assert_eq!(encode(&value), data);
            }
        }
    }

    #[test]
    fn test_truncated_torrent_reports_offset() {
        let data = b"d8:announce20:http://tracker/ann";
        let err = decode(data).unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEof { .. }));
        assert_eq!(err.offset(), data.len());
    }

    #[test]
    fn test_duplicate_keys_survive_round_trip() {
        let data = b"d1:ai1e1:ai2ee";
        let value = decode(data).unwrap();
        assert_eq!(value.as_dict().unwrap().len(), 2);
        assert_eq!(value.get(b"a"), Some(&Value::Integer(1)));
        assert_eq!(encode(&value), data);
    }
}
