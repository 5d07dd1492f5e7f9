//! Settings repository
//! 加密值在读取时由注入的 SecretCipher 透明解密

use async_trait::async_trait;
use sqlx::PgPool;

use super::SettingsStore;
use crate::{
    crypto::SecretCipher,
    error::{AppError, Result},
    models::settings::Setting,
};

pub struct SettingsRepository {
    db: PgPool,
    cipher: SecretCipher,
}

impl SettingsRepository {
    pub fn new(db: PgPool, cipher: SecretCipher) -> Self {
        Self { db, cipher }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, encrypted, category FROM settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        let Some(setting) = setting else {
            return Ok(None);
        };

        match setting.value {
            Some(value) if setting.encrypted && !value.is_empty() => {
                let plain = self.cipher.decrypt(&value).map_err(|e| {
                    tracing::error!(key = %key, error = %e, "Failed to decrypt setting");
                    AppError::Internal(format!("failed to decrypt setting {}", key))
                })?;
                Ok(Some(plain))
            }
            other => Ok(other),
        }
    }

    async fn set_setting(&self, key: &str, value: &str, encrypted: bool) -> Result<()> {
        let stored = if encrypted {
            self.cipher
                .encrypt(value)
                .map_err(|e| AppError::Internal(e.to_string()))?
        } else {
            value.to_string()
        };
        let category = key.split('.').next().unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, encrypted, category, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                encrypted = EXCLUDED.encrypted,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(stored)
        .bind(encrypted)
        .bind(category)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
