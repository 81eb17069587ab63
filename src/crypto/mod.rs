use std::path::Path;

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::DecodePrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("crypto-unavailable")]
    Unavailable,
    #[error("malformed")]
    Malformed,
    #[error("expired")]
    Expired,
    #[error("sig-invalid")]
    SignatureInvalid,
    #[error("iss-mismatch")]
    IssuerMismatch,
    #[error("aud-mismatch")]
    AudienceMismatch,
    #[error("encrypt-failed: {0}")]
    EncryptFailed(String),
    #[error("decrypt-failed: {0}")]
    DecryptFailed(String),
}

/// RSA sign/verify for JWTs, RSA-OAEP encrypt/decrypt for column-level
/// secrets, and stable SHA-512 hashing. Key material is loaded once from two
/// PEM files; if either is absent the cryptographic operations (other than
/// `hash`) stay unavailable rather than failing construction, matching the
/// lazy-availability behavior of the reference implementation.
pub struct Cryptor {
    encoding_key: Option<EncodingKey>,
    decoding_key: Option<DecodingKey>,
    rsa_private: Option<RsaPrivateKey>,
    rsa_public: Option<RsaPublicKey>,
}

const ALGORITHM: Algorithm = Algorithm::RS256;

impl Cryptor {
    pub fn from_files(private_key_path: &str, public_key_path: &str) -> Self {
        let private_pem = read_if_exists(private_key_path);
        let public_pem = read_if_exists(public_key_path);

        if private_pem.is_none() {
            tracing::debug!(path = %private_key_path, "private key file not found; cryptographic operations unavailable");
        }
        if public_pem.is_none() {
            tracing::debug!(path = %public_key_path, "public key file not found; cryptographic operations unavailable");
        }

        let encoding_key = private_pem
            .as_deref()
            .and_then(|pem| EncodingKey::from_rsa_pem(pem.as_bytes()).ok());
        let decoding_key = public_pem
            .as_deref()
            .and_then(|pem| DecodingKey::from_rsa_pem(pem.as_bytes()).ok());
        let rsa_private = private_pem
            .as_deref()
            .and_then(|pem| RsaPrivateKey::from_pkcs8_pem(pem).ok());
        let rsa_public = public_pem
            .as_deref()
            .and_then(|pem| RsaPublicKey::from_public_key_pem(pem).ok());

        Cryptor {
            encoding_key,
            decoding_key,
            rsa_private,
            rsa_public,
        }
    }

    fn assert_capable(&self) -> Result<(), CryptoError> {
        if self.encoding_key.is_some()
            && self.decoding_key.is_some()
            && self.rsa_private.is_some()
            && self.rsa_public.is_some()
        {
            Ok(())
        } else {
            Err(CryptoError::Unavailable)
        }
    }

    /// SHA-512 hex digest. Available even without key material.
    pub fn hash(&self, input: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, CryptoError> {
        self.assert_capable()?;
        let key = self.encoding_key.as_ref().unwrap();
        jsonwebtoken::encode(&Header::new(ALGORITHM), claims, key).map_err(|_| CryptoError::Malformed)
    }

    pub fn decode<T: DeserializeOwned>(
        &self,
        token: &str,
        expected_iss: Option<&str>,
        expected_aud: Option<&str>,
    ) -> Result<T, CryptoError> {
        self.assert_capable()?;
        let key = self.decoding_key.as_ref().unwrap();

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = true;
        if let Some(iss) = expected_iss {
            validation.set_issuer(&[iss]);
        } else {
            validation.validate_aud = false;
        }
        if let Some(aud) = expected_aud {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        jsonwebtoken::decode::<T>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => CryptoError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => CryptoError::SignatureInvalid,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => CryptoError::IssuerMismatch,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => CryptoError::AudienceMismatch,
                _ => CryptoError::Malformed,
            })
    }

    /// RSA-OAEP(SHA-256) encrypt, base64-wrapped.
    pub fn encrypt(&self, message: &[u8]) -> Result<String, CryptoError> {
        self.assert_capable()?;
        let public = self.rsa_public.as_ref().unwrap();
        let mut rng = rand::thread_rng();
        let padding = Oaep::new::<Sha256>();
        let ciphertext = public
            .encrypt(&mut rng, padding, message)
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        Ok(b64.encode(ciphertext))
    }

    /// Inverse of [`Cryptor::encrypt`].
    pub fn decrypt(&self, message: &str) -> Result<Vec<u8>, CryptoError> {
        self.assert_capable()?;
        let private = self.rsa_private.as_ref().unwrap();
        let raw = b64
            .decode(message)
            .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;
        let padding = Oaep::new::<Sha256>();
        private
            .decrypt(padding, &raw)
            .map_err(|e| CryptoError::DecryptFailed(e.to_string()))
    }
}

fn read_if_exists(path: &str) -> Option<String> {
    if Path::new(path).exists() {
        std::fs::read_to_string(path).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_test_cryptor(dir: &std::path::Path) -> Cryptor {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let priv_path = dir.join("private.pem");
        let pub_path = dir.join("public.pem");
        std::fs::write(
            &priv_path,
            private.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes(),
        )
        .unwrap();
        std::fs::write(&pub_path, public.to_public_key_pem(LineEnding::LF).unwrap()).unwrap();

        Cryptor::from_files(priv_path.to_str().unwrap(), pub_path.to_str().unwrap())
    }

    #[test]
    fn hash_is_available_without_keys() {
        let cryptor = Cryptor::from_files("/nonexistent/private.pem", "/nonexistent/public.pem");
        assert_eq!(cryptor.hash("abc").len(), 128);
    }

    #[test]
    fn operations_fail_without_keys() {
        let cryptor = Cryptor::from_files("/nonexistent/private.pem", "/nonexistent/public.pem");
        assert!(matches!(
            cryptor.encrypt(b"hello"),
            Err(CryptoError::Unavailable)
        ));
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let dir = tempdir();
        let cryptor = gen_test_cryptor(&dir);
        let ciphertext = cryptor.encrypt(b"top-secret").unwrap();
        let plaintext = cryptor.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, b"top-secret");
    }

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Claims {
        sub: String,
        exp: i64,
        iss: String,
        aud: String,
    }

    #[test]
    fn encode_decode_round_trips() {
        let dir = tempdir();
        let cryptor = gen_test_cryptor(&dir);
        let claims = Claims {
            sub: "user_a".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iss: "http://self/".into(),
            aud: "http://self/".into(),
        };
        let token = cryptor.encode(&claims).unwrap();
        let decoded: Claims = cryptor
            .decode(&token, Some("http://self/"), Some("http://self/"))
            .unwrap();
        assert_eq!(decoded, claims);
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("mini-idp-crypto-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
