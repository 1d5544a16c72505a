use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};

use crate::crypto::hash;
use crate::error::{AppError, Result};

/// Signature scheme flag for Ed25519 keys and signatures.
const ED25519_FLAG: u8 = 0x00;
/// Intent prefix for transaction data: scope, version, app id.
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];
const SECRET_KEY_LENGTH: usize = 32;

/// Signs transaction bytes built by the node.
#[async_trait::async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> String;

    /// Returns the serialized signature as the node expects it (base64).
    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<String>;
}

pub struct Ed25519Signer {
    key: SigningKey,
    address: String,
}

impl Ed25519Signer {
    pub fn from_secret(secret: [u8; SECRET_KEY_LENGTH]) -> Self {
        let key = SigningKey::from_bytes(&secret);
        let address = derive_address(&key.verifying_key().to_bytes());
        Self { key, address }
    }

    /// Parses either base64 `flag || secret` or a 64-character hex secret.
    pub fn from_key_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Signer("Private key is empty".into()));
        }

        let hex_digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if hex_digits.len() == SECRET_KEY_LENGTH * 2
            && hex_digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            let bytes = hex::decode(hex_digits).map_err(|e| AppError::Signer(e.to_string()))?;
            return Self::from_slice(&bytes);
        }

        let decoded = STANDARD
            .decode(trimmed)
            .map_err(|e| AppError::Signer(format!("Private key is neither hex nor base64: {e}")))?;
        match decoded.split_first() {
            Some((&ED25519_FLAG, secret)) if secret.len() == SECRET_KEY_LENGTH => {
                Self::from_slice(secret)
            }
            Some((flag, _)) if decoded.len() == SECRET_KEY_LENGTH + 1 => Err(AppError::Signer(
                format!("Unsupported key scheme flag {flag:#04x}"),
            )),
            _ if decoded.len() == SECRET_KEY_LENGTH => Self::from_slice(&decoded),
            _ => Err(AppError::Signer(format!(
                "Unexpected private key length {}",
                decoded.len()
            ))),
        }
    }

    pub fn generate() -> Self {
        let secret: [u8; SECRET_KEY_LENGTH] = rand::random();
        Self::from_secret(secret)
    }

    /// Keystore form: base64 of `flag || secret`.
    pub fn export(&self) -> String {
        let mut raw = Vec::with_capacity(SECRET_KEY_LENGTH + 1);
        raw.push(ED25519_FLAG);
        raw.extend_from_slice(&self.key.to_bytes());
        STANDARD.encode(raw)
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    fn from_slice(secret: &[u8]) -> Result<Self> {
        let secret: [u8; SECRET_KEY_LENGTH] = secret
            .try_into()
            .map_err(|_| AppError::Signer("Secret key must be 32 bytes".into()))?;
        Ok(Self::from_secret(secret))
    }
}

#[async_trait::async_trait]
impl TransactionSigner for Ed25519Signer {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<String> {
        let digest = hash::blake2b256_concat(&[&TRANSACTION_INTENT, tx_bytes]);
        let signature = self.key.sign(&digest);

        let public_key = self.key.verifying_key().to_bytes();
        let mut serialized = Vec::with_capacity(1 + 64 + public_key.len());
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&public_key);

        tracing::debug!("Signed {} tx bytes for {}", tx_bytes.len(), self.address);
        Ok(STANDARD.encode(serialized))
    }
}

/// `0x` + hex(Blake2b-256(flag || public key)).
pub fn derive_address(public_key: &[u8]) -> String {
    let digest = hash::blake2b256_concat(&[&[ED25519_FLAG], public_key]);
    format!("0x{}", hex::encode(digest))
}
