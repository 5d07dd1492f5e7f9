//! 敏感配置加解密
//! AES-256-GCM，密文格式为 base64(nonce || ciphertext)

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid base64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("ciphertext too short")]
    TooShort,

    #[error("decryption failed")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,

    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// 加解密服务，密钥由配置注入
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// 32 字节的密钥直接使用（兼容旧数据），其余长度通过 SHA-256 派生
    pub fn from_key_material(material: &Secret<String>) -> Self {
        let raw = material.expose_secret().as_bytes();
        let key: [u8; KEY_LENGTH] = if raw.len() == KEY_LENGTH {
            let mut key = [0u8; KEY_LENGTH];
            key.copy_from_slice(raw);
            key
        } else {
            Sha256::digest(raw).into()
        };
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let data = STANDARD.decode(encoded)?;
        if data.len() < NONCE_LENGTH {
            return Err(CryptoError::TooShort);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }
}
