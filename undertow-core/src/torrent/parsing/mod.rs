//! Torrent metainfo extraction and validation.
//!
//! Decoding is delegated to the bencode codec; this module projects the
//! decoded tree onto typed structures and derives the info-hash from the raw
//! `info` value before any projection happens.

pub mod error;
pub mod extract;
pub mod parser;
pub mod types;

// Re-export public API
pub use error::MetainfoError;
pub use extract::{compute_info_hash, extract_metainfo};
pub use parser::MetainfoParser;
pub use types::{FileEntry, Info, Metainfo, ParsedTorrent};

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::torrent::{ErrorStage, TorrentError};

    const SINGLE_FILE: &[u8] = b"d8:announce10:http://t/a4:infod6:lengthi16384e4:name1:x12:piece lengthi16384e6:pieces20:abcdefghijklmnopqrstee";

    #[test]
    fn test_parse_end_to_end_single_file() {
        let parsed = MetainfoParser::new()
            .parse_torrent_data(SINGLE_FILE)
            .unwrap();

        assert_eq!(parsed.metainfo.name(), "x");
        assert_eq!(parsed.metainfo.info.piece_length(), 16384);
        assert_eq!(parsed.metainfo.info.total_length(), 16384);
        assert_eq!(
            parsed.info_hash.to_string(),
            "8ff92b88a54ce12f3dd133f3012ddb0501cfddc0"
        );
    }

    #[test]
    fn test_reparsing_is_deterministic() {
        let parser = MetainfoParser::new();
        let first = parser.parse_torrent_data(SINGLE_FILE).unwrap();
        let second = parser.parse_torrent_data(SINGLE_FILE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_bit_flip_in_info_changes_hash() {
        let parser = MetainfoParser::new();
        let original = parser.parse_torrent_data(SINGLE_FILE).unwrap();

        let pieces_at = SINGLE_FILE
            .windows(20)
            .position(|window| window == b"abcdefghijklmnopqrst")
            .unwrap();
        for bit in 0..8 {
            let mut flipped = SINGLE_FILE.to_vec();
            flipped[pieces_at] ^= 1 << bit;
            let changed = parser.parse_torrent_data(&flipped).unwrap();
            assert_ne!(changed.info_hash, original.info_hash);
        }
    }

    #[test]
    fn test_deeply_nested_extra_key_in_info() {
        let depth = 200_000;
        let mut data = SINGLE_FILE[..SINGLE_FILE.len() - 2].to_vec();
        data.extend_from_slice(b"1:z");
        data.extend(std::iter::repeat_n(b'l', depth));
        data.extend(std::iter::repeat_n(b'e', depth));
        data.extend_from_slice(b"ee");

        let parsed = MetainfoParser::new().parse_torrent_data(&data).unwrap();
        assert_eq!(parsed.metainfo.name(), "x");
        assert_ne!(
            parsed.info_hash.to_string(),
            "8ff92b88a54ce12f3dd133f3012ddb0501cfddc0"
        );
    }

    #[test]
    fn test_malformed_and_invalid_inputs_map_to_stages() {
        let parser = MetainfoParser::new();

        let truncated = parser
            .parse_torrent_data(&SINGLE_FILE[..SINGLE_FILE.len() - 5])
            .unwrap_err();
        assert!(matches!(truncated, TorrentError::MalformedEncoding(_)));
        assert_eq!(truncated.stage(), ErrorStage::Parse);

        let missing_info = parser
            .parse_torrent_data(b"d8:announce10:http://t/ae")
            .unwrap_err();
        assert!(matches!(
            missing_info,
            TorrentError::InvalidMetainfo(MetainfoError::MissingKey { key: "info" })
        ));
        assert_eq!(missing_info.stage(), ErrorStage::Validate);
    }

    #[tokio::test]
    async fn test_parse_from_reader() {
        // Delivered in two reads, split inside the info dictionary.
        let reader = tokio_test::io::Builder::new()
            .read(&SINGLE_FILE[..40])
            .read(&SINGLE_FILE[40..])
            .build();

        let parsed = MetainfoParser::new()
            .parse_torrent_reader(reader)
            .await
            .unwrap();
        assert_eq!(parsed.metainfo.announce, "http://t/a");
        assert_eq!(
            parsed.info_hash.to_string(),
            "8ff92b88a54ce12f3dd133f3012ddb0501cfddc0"
        );
    }

    #[tokio::test]
    async fn test_parse_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("x.torrent");
        tokio::fs::write(&file_path, SINGLE_FILE).await.unwrap();

        let parsed = MetainfoParser::new()
            .parse_torrent_file(&file_path)
            .await
            .unwrap();
        assert_eq!(parsed.metainfo.name(), "x");
    }

    #[tokio::test]
    async fn test_nonexistent_file() {
        let result = MetainfoParser::new()
            .parse_torrent_file(Path::new("/nonexistent/file.torrent"))
            .await;
        assert!(matches!(result, Err(TorrentError::Io(_))));
    }
}
