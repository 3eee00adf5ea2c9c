//! Ed25519 signer keyring.
//!
//! Named signing identities used for non-repudiation on high-sensitivity
//! records. The keyring holds private keys for signing and exposes the
//! matching public keys for verification.

use crate::core::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry of named Ed25519 signing identities.
pub struct SignerKeyring {
    keys: RwLock<HashMap<String, SigningKey>>,
}

impl SignerKeyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Generate a fresh identity and return its verifying key bytes.
    pub async fn generate(&self, signer: &str) -> [u8; 32] {
        use rand::RngCore;
        let mut csprng = rand::rngs::OsRng;
        let mut secret_key_bytes = [0u8; 32];
        csprng.fill_bytes(&mut secret_key_bytes);
        let signing_key = SigningKey::from_bytes(&secret_key_bytes);
        let verifying = signing_key.verifying_key().to_bytes();

        let mut keys = self.keys.write().await;
        keys.insert(signer.to_string(), signing_key);
        verifying
    }

    /// Register an identity from existing signing key bytes.
    pub async fn insert(&self, signer: &str, bytes: &[u8; 32]) {
        let signing_key = SigningKey::from_bytes(bytes);
        let mut keys = self.keys.write().await;
        keys.insert(signer.to_string(), signing_key);
    }

    /// Whether the keyring knows this signer.
    pub async fn contains(&self, signer: &str) -> bool {
        self.keys.read().await.contains_key(signer)
    }

    /// Sign a message as the named identity.
    pub async fn sign(&self, signer: &str, message: &[u8]) -> Result<Vec<u8>> {
        let keys = self.keys.read().await;
        let key = keys
            .get(signer)
            .ok_or_else(|| Error::UnknownSigner(signer.to_string()))?;
        Ok(key.sign(message).to_bytes().to_vec())
    }

    /// Verify a signature made by the named identity.
    pub async fn verify(&self, signer: &str, message: &[u8], signature: &[u8]) -> Result<()> {
        let key = self.verifying_key(signer).await?;
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| Error::InvalidKeyFormat("invalid signature length".into()))?;
        let sig = Signature::from_bytes(&sig_bytes);
        key.verify(message, &sig)?;
        Ok(())
    }

    /// Get the verifying (public) key for the named identity.
    pub async fn verifying_key(&self, signer: &str) -> Result<VerifyingKey> {
        let keys = self.keys.read().await;
        keys.get(signer)
            .map(|k| k.verifying_key())
            .ok_or_else(|| Error::UnknownSigner(signer.to_string()))
    }
}

impl Default for SignerKeyring {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_and_sign() {
        let keyring = SignerKeyring::new();
        keyring.generate("compliance-officer").await;

        let message = b"record hash bytes";
        let signature = keyring.sign("compliance-officer", message).await.unwrap();
        assert_eq!(signature.len(), 64);
        assert!(keyring
            .verify("compliance-officer", message, &signature)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_verify_wrong_message_fails() {
        let keyring = SignerKeyring::new();
        keyring.generate("officer").await;

        let signature = keyring.sign("officer", b"original").await.unwrap();
        assert!(keyring
            .verify("officer", b"tampered", &signature)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unknown_signer() {
        let keyring = SignerKeyring::new();
        let err = keyring.sign("nobody", b"message").await.unwrap_err();
        assert!(matches!(err, Error::UnknownSigner(_)));
    }

    #[tokio::test]
    async fn test_insert_from_bytes_round_trip() {
        let keyring = SignerKeyring::new();
        let public = keyring.generate("a").await;

        let other = SignerKeyring::new();
        let keys = keyring.keys.read().await;
        let bytes = keys.get("a").unwrap().to_bytes();
        drop(keys);
        other.insert("a", &bytes).await;

        assert_eq!(other.verifying_key("a").await.unwrap().to_bytes(), public);
    }

    #[tokio::test]
    async fn test_rejects_truncated_signature() {
        let keyring = SignerKeyring::new();
        keyring.generate("officer").await;
        let err = keyring
            .verify("officer", b"message", &[0u8; 10])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKeyFormat(_)));
    }
}
