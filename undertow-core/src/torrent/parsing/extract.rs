//! Projection of a decoded bencode tree onto `Metainfo`, plus info-hashing.

use chrono::DateTime;
use sha1::{Digest, Sha1};

use super::error::MetainfoError;
use super::types::{FileEntry, Info, Metainfo, ParsedTorrent};
use crate::torrent::InfoHash;
use crate::torrent::bencode::{self, Dictionary, Value};

const PIECE_HASH_LEN: usize = 20;

type ExtractResult<T> = Result<T, MetainfoError>;

/// Validates a decoded `.torrent` tree and computes its info-hash.
///
/// # Errors
///
/// - `MetainfoError` - If a mandatory key is missing or mistyped, the file
///   mode markers are inconsistent, or the piece data is truncated
pub fn extract_metainfo(root: &Value) -> ExtractResult<ParsedTorrent> {
    let dict = root.as_dict().ok_or(MetainfoError::RootNotDictionary {
        found: root.kind(),
    })?;

    let announce = require_string(dict, "announce", "announce")?;
    let announce_tiers = extract_announce_tiers(dict)?;
    let announce_list = announce_tiers
        .iter()
        .filter_map(|tier| tier.first().cloned())
        .collect();

    let comment = optional_text(dict, "comment")?;
    let created_by = optional_text(dict, "created by")?;
    let creation_date = extract_creation_date(dict)?;

    let info_value = dict
        .get(b"info")
        .ok_or(MetainfoError::MissingKey { key: "info" })?;
    let info_dict = info_value.as_dict().ok_or(MetainfoError::WrongType {
        key: "info",
        expected: "dictionary",
        found: info_value.kind(),
    })?;

    let info = extract_info(info_dict)?;
    let info_hash = compute_info_hash(info_value);

    tracing::debug!(
        "Extracted torrent '{}' ({} pieces, {} bytes), info hash {}",
        info.name(),
        info.piece_count(),
        info.total_length(),
        info_hash
    );

    Ok(ParsedTorrent {
        metainfo: Metainfo {
            announce,
            announce_list,
            announce_tiers,
            comment,
            created_by,
            creation_date,
            info,
        },
        info_hash,
    })
}

/// SHA-1 over the bencoded form of the raw `info` value.
///
/// The decoder only accepts minimal encodings and keeps key order, so this
/// equals the hash of the `info` bytes exactly as they appeared in the file.
pub fn compute_info_hash(info: &Value) -> InfoHash {
    let digest = Sha1::digest(bencode::encode(info));
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest);
    InfoHash::new(hash)
}

fn extract_info(dict: &Dictionary) -> ExtractResult<Info> {
    let name = require_string(dict, "name", "info.name")?;

    let piece_length = require_integer(dict, "piece length", "info.piece length")?;
    if piece_length <= 0 {
        return Err(MetainfoError::NonPositivePieceLength {
            value: piece_length,
        });
    }
    let piece_length = piece_length.unsigned_abs();

    let pieces = split_pieces(require_bytes(dict, "pieces", "info.pieces")?)?;

    match (dict.contains_key(b"length"), dict.contains_key(b"files")) {
        (true, true) => Err(MetainfoError::ConflictingFileMode),
        (false, false) => Err(MetainfoError::MissingFileMode),
        (true, false) => {
            let length = require_length(dict, "length", "info.length")?;
            Ok(Info::SingleFile {
                name,
                piece_length,
                pieces,
                length,
            })
        }
        (false, true) => {
            let files = extract_files(dict)?;
            Ok(Info::MultiFile {
                name,
                piece_length,
                pieces,
                files,
            })
        }
    }
}

fn split_pieces(bytes: &[u8]) -> ExtractResult<Vec<[u8; 20]>> {
    if !bytes.len().is_multiple_of(PIECE_HASH_LEN) {
        return Err(MetainfoError::TruncatedPieces {
            length: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(PIECE_HASH_LEN)
        .map(|chunk| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            hash
        })
        .collect())
}

fn extract_files(dict: &Dictionary) -> ExtractResult<Vec<FileEntry>> {
    let list = require(dict, "files", "info.files")?;
    let entries = list.as_list().ok_or(MetainfoError::WrongType {
        key: "info.files",
        expected: "list",
        found: list.kind(),
    })?;

    let mut total: i64 = 0;
    let mut files = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let file = extract_file_entry(entry).map_err(|source| MetainfoError::InvalidFileEntry {
            index,
            source: Box::new(source),
        })?;
        total = i64::try_from(file.length)
            .ok()
            .and_then(|length| total.checked_add(length))
            .ok_or(MetainfoError::TotalLengthOverflow)?;
        files.push(file);
    }
    Ok(files)
}

fn extract_file_entry(entry: &Value) -> ExtractResult<FileEntry> {
    let dict = entry.as_dict().ok_or(MetainfoError::WrongType {
        key: "files[]",
        expected: "dictionary",
        found: entry.kind(),
    })?;

    let length = require_length(dict, "length", "length")?;

    let path_value = require(dict, "path", "path")?;
    let segments = path_value
        .as_list()
        .filter(|segments| !segments.is_empty())
        .ok_or(MetainfoError::WrongType {
            key: "path",
            expected: "non-empty list of byte strings",
            found: path_value.kind(),
        })?;

    let segments = segments
        .iter()
        .map(|segment| value_to_string(segment, "path"))
        .collect::<ExtractResult<Vec<_>>>()?;

    Ok(FileEntry {
        length,
        path: segments.join("/"),
    })
}

fn extract_announce_tiers(dict: &Dictionary) -> ExtractResult<Vec<Vec<String>>> {
    let Some(value) = dict.get(b"announce-list") else {
        return Ok(Vec::new());
    };

    let wrong_type = |found| MetainfoError::WrongType {
        key: "announce-list",
        expected: "list of lists of byte strings",
        found,
    };

    let tiers = value.as_list().ok_or(wrong_type(value.kind()))?;
    let mut result = Vec::with_capacity(tiers.len());
    for tier in tiers {
        let urls = tier.as_list().ok_or(wrong_type(tier.kind()))?;
        let urls = urls
            .iter()
            .map(|url| value_to_string(url, "announce-list"))
            .collect::<ExtractResult<Vec<_>>>()?;
        if !urls.is_empty() {
            result.push(urls);
        }
    }
    Ok(result)
}

fn extract_creation_date(
    dict: &Dictionary,
) -> ExtractResult<Option<chrono::DateTime<chrono::Utc>>> {
    let Some(value) = dict.get(b"creation date") else {
        tracing::debug!("Torrent has no creation date");
        return Ok(None);
    };

    let seconds = value.as_integer().ok_or(MetainfoError::WrongType {
        key: "creation date",
        expected: "integer",
        found: value.kind(),
    })?;

    let date = DateTime::from_timestamp(seconds, 0);
    if date.is_none() {
        tracing::debug!("Ignoring out-of-range creation date {}", seconds);
    }
    Ok(date)
}

/// Optional informational text. Invalid UTF-8 is replaced, not rejected.
fn optional_text(dict: &Dictionary, key: &'static str) -> ExtractResult<Option<String>> {
    match dict.get(key.as_bytes()) {
        None => Ok(None),
        Some(Value::Bytes(bytes)) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        Some(other) => Err(MetainfoError::WrongType {
            key,
            expected: "byte string",
            found: other.kind(),
        }),
    }
}

fn require<'a>(
    dict: &'a Dictionary,
    key: &'static str,
    label: &'static str,
) -> ExtractResult<&'a Value> {
    dict.get(key.as_bytes())
        .ok_or(MetainfoError::MissingKey { key: label })
}

fn require_bytes<'a>(
    dict: &'a Dictionary,
    key: &'static str,
    label: &'static str,
) -> ExtractResult<&'a [u8]> {
    let value = require(dict, key, label)?;
    value
        .as_bytes()
        .map(|bytes| bytes.as_ref())
        .ok_or(MetainfoError::WrongType {
            key: label,
            expected: "byte string",
            found: value.kind(),
        })
}

fn require_string(
    dict: &Dictionary,
    key: &'static str,
    label: &'static str,
) -> ExtractResult<String> {
    value_to_string(require(dict, key, label)?, label)
}

fn require_integer(
    dict: &Dictionary,
    key: &'static str,
    label: &'static str,
) -> ExtractResult<i64> {
    let value = require(dict, key, label)?;
    value.as_integer().ok_or(MetainfoError::WrongType {
        key: label,
        expected: "integer",
        found: value.kind(),
    })
}

fn require_length(
    dict: &Dictionary,
    key: &'static str,
    label: &'static str,
) -> ExtractResult<u64> {
    let value = require_integer(dict, key, label)?;
    u64::try_from(value).map_err(|_| MetainfoError::NegativeLength { key: label, value })
}

fn value_to_string(value: &Value, label: &'static str) -> ExtractResult<String> {
    let bytes = value.as_bytes().ok_or(MetainfoError::WrongType {
        key: label,
        expected: "byte string",
        found: value.kind(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| MetainfoError::InvalidUtf8 { key: label })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierPolicy;

    const PIECES: &[u8; 20] = b"abcdefghijklmnopqrst";

    fn info_dict(entries: &[(&str, Value)]) -> Dictionary {
        let mut dict = Dictionary::new();
        for (key, value) in entries {
            dict.insert(key.to_string().into_bytes(), value.clone());
        }
        dict
    }

    fn single_file_info() -> Dictionary {
        info_dict(&[
            ("length", Value::Integer(16384)),
            ("name", Value::string("x")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ])
    }

    fn torrent_with_info(info: Dictionary) -> Value {
        let mut root = Dictionary::new();
        root.insert("announce", "http://t/a");
        root.insert("info", info);
        Value::Dict(root)
    }

    #[test]
    fn test_minimal_single_file_torrent() {
        let parsed = extract_metainfo(&torrent_with_info(single_file_info())).unwrap();

        assert_eq!(parsed.metainfo.announce, "http://t/a");
        assert!(parsed.metainfo.announce_list.is_empty());
        assert_eq!(parsed.metainfo.comment, None);
        assert_eq!(parsed.metainfo.creation_date, None);
        assert_eq!(
            parsed.metainfo.info,
            Info::SingleFile {
                name: "x".to_string(),
                piece_length: 16384,
                pieces: vec![*PIECES],
                length: 16384,
            }
        );
        assert_eq!(
            parsed.info_hash.to_string(),
            "8ff92b88a54ce12f3dd133f3012ddb0501cfddc0"
        );
    }

    #[test]
    fn test_info_hash_follows_stored_key_order() {
        let info = info_dict(&[
            ("name", Value::string("x")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
            ("length", Value::Integer(16384)),
        ]);
        let parsed = extract_metainfo(&torrent_with_info(info)).unwrap();
        assert_eq!(
            parsed.info_hash.to_string(),
            "a1bb5db536a2f761b90ed3757bb57c3f0091b998"
        );
    }

    #[test]
    fn test_info_hash_ignores_top_level_keys_and_tracks_info_changes() {
        let plain = extract_metainfo(&torrent_with_info(single_file_info())).unwrap();

        let mut with_comment = torrent_with_info(single_file_info());
        if let Value::Dict(root) = &mut with_comment {
            root.insert("comment", "hello");
        }
        let commented = extract_metainfo(&with_comment).unwrap();
        assert_eq!(plain.info_hash, commented.info_hash);
        assert_eq!(commented.metainfo.comment.as_deref(), Some("hello"));

        let mut renamed = single_file_info();
        renamed.insert("name", "y");
        let renamed = extract_metainfo(&torrent_with_info(renamed)).unwrap();
        assert_eq!(
            renamed.info_hash.to_string(),
            "a35403ad574bcd986efaeb98886d23bb3571e857"
        );
    }

    #[test]
    fn test_unknown_info_keys_affect_hash_only() {
        let plain = extract_metainfo(&torrent_with_info(single_file_info())).unwrap();

        let mut extended = single_file_info();
        extended.insert("private", 1i64);
        let extended = extract_metainfo(&torrent_with_info(extended)).unwrap();

        assert_eq!(plain.metainfo, extended.metainfo);
        assert_ne!(plain.info_hash, extended.info_hash);
    }

    #[test]
    fn test_file_mode_xor() {
        let mut both = single_file_info();
        both.insert("files", Value::List(Vec::new()));
        assert_eq!(
            extract_metainfo(&torrent_with_info(both)),
            Err(MetainfoError::ConflictingFileMode)
        );

        let neither = info_dict(&[
            ("name", Value::string("x")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ]);
        assert_eq!(
            extract_metainfo(&torrent_with_info(neither)),
            Err(MetainfoError::MissingFileMode)
        );
    }

    #[test]
    fn test_piece_segmentation() {
        let mut info = single_file_info();
        info.insert("pieces", Value::Bytes(vec![7u8; 60].into()));
        let parsed = extract_metainfo(&torrent_with_info(info)).unwrap();
        assert_eq!(parsed.metainfo.info.piece_count(), 3);
        assert!(parsed.metainfo.info.pieces().iter().all(|hash| hash == &[7u8; 20]));

        let mut truncated = single_file_info();
        truncated.insert("pieces", Value::Bytes(vec![7u8; 41].into()));
        assert_eq!(
            extract_metainfo(&torrent_with_info(truncated)),
            Err(MetainfoError::TruncatedPieces { length: 41 })
        );
    }

    #[test]
    fn test_piece_length_must_be_positive() {
        let mut info = single_file_info();
        info.insert("piece length", 0i64);
        assert_eq!(
            extract_metainfo(&torrent_with_info(info)),
            Err(MetainfoError::NonPositivePieceLength { value: 0 })
        );
    }

    #[test]
    fn test_missing_mandatory_keys() {
        let mut no_announce = Dictionary::new();
        no_announce.insert("info", single_file_info());
        assert_eq!(
            extract_metainfo(&Value::Dict(no_announce)),
            Err(MetainfoError::MissingKey { key: "announce" })
        );

        let mut no_info = Dictionary::new();
        no_info.insert("announce", "http://t/a");
        assert_eq!(
            extract_metainfo(&Value::Dict(no_info)),
            Err(MetainfoError::MissingKey { key: "info" })
        );

        let nameless = info_dict(&[
            ("length", Value::Integer(1)),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ]);
        assert_eq!(
            extract_metainfo(&torrent_with_info(nameless)),
            Err(MetainfoError::MissingKey { key: "info.name" })
        );

        assert_eq!(
            extract_metainfo(&Value::List(Vec::new())),
            Err(MetainfoError::RootNotDictionary { found: "list" })
        );
    }

    #[test]
    fn test_multi_file_paths_and_total() {
        let file = |length: i64, segments: &[&str]| {
            let mut entry = Dictionary::new();
            entry.insert("length", length);
            entry.insert(
                "path",
                Value::List(segments.iter().map(|s| Value::string(s)).collect()),
            );
            Value::Dict(entry)
        };

        let info = info_dict(&[
            (
                "files",
                Value::List(vec![file(500, &["a", "b.txt"]), file(300, &["c.txt"])]),
            ),
            ("name", Value::string("dir")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ]);
        let parsed = extract_metainfo(&torrent_with_info(info)).unwrap();
        let info = &parsed.metainfo.info;

        assert!(info.is_multi_file());
        assert_eq!(info.total_length(), 800);
        let paths: Vec<String> = info.files().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["a/b.txt", "c.txt"]);
    }

    #[test]
    fn test_bad_file_entry_reports_index() {
        let mut good = Dictionary::new();
        good.insert("length", 1i64);
        good.insert("path", Value::List(vec![Value::string("ok")]));
        let mut bad = Dictionary::new();
        bad.insert("length", -5i64);
        bad.insert("path", Value::List(vec![Value::string("neg")]));

        let info = info_dict(&[
            ("files", Value::List(vec![Value::Dict(good), Value::Dict(bad)])),
            ("name", Value::string("dir")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ]);

        match extract_metainfo(&torrent_with_info(info)) {
            Err(MetainfoError::InvalidFileEntry { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(
                    *source,
                    MetainfoError::NegativeLength {
                        key: "length",
                        value: -5
                    }
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_path_rejected() {
        let mut entry = Dictionary::new();
        entry.insert("length", 1i64);
        entry.insert(
            "path",
            Value::List(vec![Value::Bytes(vec![0xffu8, 0xfe].into())]),
        );
        let info = info_dict(&[
            ("files", Value::List(vec![Value::Dict(entry)])),
            ("name", Value::string("dir")),
            ("piece length", Value::Integer(16384)),
            ("pieces", Value::Bytes(PIECES.to_vec().into())),
        ]);

        assert!(matches!(
            extract_metainfo(&torrent_with_info(info)),
            Err(MetainfoError::InvalidFileEntry { index: 0, .. })
        ));
    }

    #[test]
    fn test_announce_list_tiers_and_failover_order() {
        let tier = |urls: &[&str]| Value::List(urls.iter().map(|u| Value::string(u)).collect());

        let mut root = Dictionary::new();
        root.insert("announce", "http://a/announce");
        root.insert(
            "announce-list",
            Value::List(vec![
                tier(&["http://a/announce", "http://a2/announce"]),
                tier(&[]),
                tier(&["http://b/announce", "http://b2/announce"]),
            ]),
        );
        root.insert("creation date", 1_700_000_000i64);
        root.insert("created by", "mktorrent");
        root.insert("info", single_file_info());

        let metainfo = extract_metainfo(&Value::Dict(root)).unwrap().metainfo;

        assert_eq!(
            metainfo.announce_list,
            vec!["http://a/announce", "http://b/announce"]
        );
        assert_eq!(metainfo.announce_tiers.len(), 2);
        assert_eq!(metainfo.created_by.as_deref(), Some("mktorrent"));
        assert_eq!(
            metainfo.creation_date.map(|date| date.timestamp()),
            Some(1_700_000_000)
        );

        assert_eq!(
            metainfo.tracker_urls(TierPolicy::FirstPerTier),
            vec!["http://a/announce", "http://b/announce"]
        );
        assert_eq!(
            metainfo.tracker_urls(TierPolicy::EveryUrl),
            vec![
                "http://a/announce",
                "http://a2/announce",
                "http://b/announce",
                "http://b2/announce"
            ]
        );
    }

    #[test]
    fn test_malformed_announce_list_rejected() {
        let mut root = Dictionary::new();
        root.insert("announce", "http://t/a");
        root.insert("announce-list", Value::List(vec![Value::string("flat")]));
        root.insert("info", single_file_info());

        assert!(matches!(
            extract_metainfo(&Value::Dict(root)),
            Err(MetainfoError::WrongType {
                key: "announce-list",
                ..
            })
        ));
    }
}
