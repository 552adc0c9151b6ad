use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 digest. OTPs and reset tokens are stored in this
/// form only, never as plaintext.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_differs_per_input() {
        assert_ne!(sha256_hex("123456"), sha256_hex("123457"));
        assert_eq!(sha256_hex("123456").len(), 64);
    }
}
