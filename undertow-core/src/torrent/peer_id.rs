//! Local peer identity sent to trackers.

use std::fmt;

use rand::Rng;

/// Length of the Azureus-style client prefix, e.g. `-UT0001-`.
pub const CLIENT_PREFIX_LEN: usize = 8;

/// 20-byte identifier for this client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// Creates peer ID from 20-byte array.
    pub fn new(id: [u8; 20]) -> Self {
        Self(id)
    }

    /// Returns peer ID as byte array reference.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Generates a fresh identity: the client prefix followed by twelve
    /// random ASCII decimal digits.
    ///
    /// A prefix longer than eight bytes is cut; a shorter one is padded with `-`.
    pub fn generate(client_id: &str) -> Self {
        let mut id = [b'-'; 20];
        let prefix = &client_id.as_bytes()[..client_id.len().min(CLIENT_PREFIX_LEN)];
        id[..prefix.len()].copy_from_slice(prefix);

        let mut rng = rand::rng();
        for byte in &mut id[CLIENT_PREFIX_LEN..] {
            *byte = b'0' + rng.random_range(0..10u8);
        }
        Self(id)
    }
}

impl fmt::Display for PeerId {
    /// Printable bytes are shown as-is, anything else as `\xNN`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_layout() {
        let id = PeerId::generate("-UT0001-");
        let bytes = id.as_bytes();

        assert_eq!(&bytes[..8], b"-UT0001-");
        assert!(bytes[8..].iter().all(u8::is_ascii_digit));
        assert_eq!(id.to_string().len(), 20);
    }

    #[test]
    fn test_generate_is_random() {
        let ids: Vec<PeerId> = (0..8).map(|_| PeerId::generate("-UT0001-")).collect();
        assert!(ids.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_prefix_normalised_to_eight_bytes() {
        assert_eq!(&PeerId::generate("-AB-").as_bytes()[..8], b"-AB-----");
        assert_eq!(&PeerId::generate("-ABCDEFGHIJ-").as_bytes()[..8], b"-ABCDEFG");
    }
}
