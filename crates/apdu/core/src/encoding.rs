//! Hexadecimal helpers used for logging, fixtures and manifests

use crate::Error;

/// Encode bytes as upper-case hexadecimal
pub fn hex_encode(data: impl AsRef<[u8]>) -> String {
    hex::encode_upper(data)
}

/// Decode hexadecimal text, ignoring ASCII whitespace anywhere in the input
///
/// Both cases are accepted. An odd number of digits or a non-hex character is
/// an [`Error::InvalidHex`].
pub fn hex_decode(text: &str) -> Result<Vec<u8>, Error> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(hex::decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_upper() {
        assert_eq!(hex_encode([0xa0, 0x00, 0x0f]), "A0000F");
        assert_eq!(hex_encode([]), "");
    }

    #[test]
    fn test_decode_ignores_whitespace() {
        assert_eq!(
            hex_decode("A0 00\n00 01\t51 0a").unwrap(),
            vec![0xA0, 0x00, 0x00, 0x01, 0x51, 0x0A]
        );
        assert!(hex_decode("   ").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(hex_decode("ABC"), Err(Error::InvalidHex(_))));
        assert!(matches!(hex_decode("ZZ"), Err(Error::InvalidHex(_))));
    }
}
