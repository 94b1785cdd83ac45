//! Signature verification and certificate hashing

use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::rules::CertificateHash;

/// Cryptographic operations needed to identify an application
pub trait CryptoProvider: Send + Sync {
    /// Verify an RSASSA-PKCS1-v1_5 / SHA-1 signature of `message`
    ///
    /// `public_key` is a DER encoded SubjectPublicKeyInfo. An invalid signature
    /// is `Ok(false)`; a key that cannot be decoded is an error.
    fn verify_signature(&self, public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<bool>;

    /// SHA-1 digest of `data`, used as certificate hash
    fn sha1(&self, data: &[u8]) -> CertificateHash;
}

/// [`CryptoProvider`] backed by the `rsa` and `sha1` crates
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn verify_signature(
        &self,
        public_key: &[u8],
        signature: &[u8],
        message: &[u8],
    ) -> Result<bool> {
        let key = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|e| Error::Crypto(format!("invalid public key: {e}")))?;

        let digest = Sha1::digest(message);
        match key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature) {
            Ok(()) => Ok(true),
            Err(rsa::Error::Verification) => Ok(false),
            Err(e) => Err(Error::Crypto(e.to_string())),
        }
    }

    fn sha1(&self, data: &[u8]) -> CertificateHash {
        CertificateHash::new(Sha1::digest(data).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::EncodePublicKey;

    #[test]
    fn test_sha1_known_vector() {
        let hash = RustCryptoProvider.sha1(b"abc");
        assert_eq!(hash.as_bytes(), &hex!("A9993E364706816ABA3E25717850C26C9CD0D89D"));
    }

    #[test]
    fn test_verify_signature() {
        let mut rng = rand_v8::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let spki = private_key.to_public_key().to_public_key_der().unwrap();

        let guid = b"4fd0d5a2-3b5a-4d8e-9d3c-0a6a1f7e2b11";
        let signature = private_key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(guid))
            .unwrap();

        let provider = RustCryptoProvider;
        assert!(provider.verify_signature(spki.as_bytes(), &signature, guid).unwrap());
        assert!(!provider.verify_signature(spki.as_bytes(), &signature, b"other guid").unwrap());

        let mut tampered = signature.clone();
        tampered[0] ^= 0x01;
        assert!(!provider.verify_signature(spki.as_bytes(), &tampered, guid).unwrap());
    }

    #[test]
    fn test_invalid_key_is_error() {
        assert!(matches!(
            RustCryptoProvider.verify_signature(&hex!("3000"), &[0u8; 128], b"guid"),
            Err(Error::Crypto(_))
        ));
    }
}
