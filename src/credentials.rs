//! Encrypted credential storage.
//!
//! Credentials live in `credentials.db` (SQLite) inside the credentials
//! directory, next to a `.key` file holding a random 32-byte secret. Each
//! value is sealed with AES-256-GCM under a key derived from that secret
//! via HMAC-SHA256, and stored as `base64(nonce || ciphertext)`.
//!
//! Values are never logged. A value that no longer decrypts (key file
//! replaced, row tampered with) reads as absent.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;

/// Credential holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "openai_api_key";

const DB_FILE: &str = "credentials.db";
const KEY_FILE: &str = ".key";
const SECRET_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_CONTEXT: &[u8] = b"docsearch credentials v1";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid key file {0}")]
    KeyFile(PathBuf),
    #[error("failed to encrypt credential {0:?}")]
    Encrypt(String),
}

type HmacSha256 = Hmac<Sha256>;

/// Encrypted key-value store for API keys.
pub struct CredentialStore {
    pool: SqlitePool,
    cipher: Aes256Gcm,
    dir: PathBuf,
}

impl CredentialStore {
    /// Open the store in `dir`, creating the directory, key file and
    /// database on first use.
    pub async fn open(dir: &Path) -> Result<Self, CredentialError> {
        std::fs::create_dir_all(dir).map_err(|source| CredentialError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let secret = load_or_create_secret(&dir.join(KEY_FILE))?;
        let cipher = derive_cipher(&secret)?;

        let db_path = dir.join(DB_FILE);
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            cipher,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encrypt and store `value` under `key`, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let sealed = self.seal(key, value)?;
        sqlx::query(
            r#"
            INSERT INTO credentials (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(sealed)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        tracing::info!(key, "credential saved");
        Ok(())
    }

    /// Decrypted value for `key`, or `None` if absent or undecryptable.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let row = sqlx::query("SELECT value FROM credentials WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let sealed: String = row.get("value");
        match self.open_sealed(&sealed) {
            Some(value) => Ok(Some(value)),
            None => {
                tracing::warn!(key, "stored credential could not be decrypted");
                Ok(None)
            }
        }
    }

    /// Remove `key`. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CredentialError> {
        let result = sqlx::query("DELETE FROM credentials WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every credential. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<u64, CredentialError> {
        let result = sqlx::query("DELETE FROM credentials")
            .execute(&self.pool)
            .await?;
        tracing::info!(removed = result.rows_affected(), "credentials cleared");
        Ok(result.rows_affected())
    }

    /// Stored credential names, sorted. Values are not decrypted.
    pub async fn keys(&self) -> Result<Vec<String>, CredentialError> {
        let keys = sqlx::query_scalar("SELECT key FROM credentials ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn seal(&self, key: &str, value: &str) -> Result<String, CredentialError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), value.as_bytes())
            .map_err(|_| CredentialError::Encrypt(key.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    fn open_sealed(&self, sealed: &str) -> Option<String> {
        let bytes = BASE64.decode(sealed).ok()?;
        if bytes.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        String::from_utf8(plain).ok()
    }
}

/// Mask a secret for display: keeps the first and last four characters.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

fn derive_cipher(secret: &[u8]) -> Result<Aes256Gcm, CredentialError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .map_err(|_| CredentialError::KeyFile(PathBuf::from(KEY_FILE)))?;
    mac.update(KEY_CONTEXT);
    let key = mac.finalize().into_bytes();
    Aes256Gcm::new_from_slice(&key).map_err(|_| CredentialError::KeyFile(PathBuf::from(KEY_FILE)))
}

fn load_or_create_secret(path: &Path) -> Result<Vec<u8>, CredentialError> {
    let io_err = |source: std::io::Error| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        let encoded = std::fs::read_to_string(path).map_err(io_err)?;
        let secret = BASE64
            .decode(encoded.trim())
            .map_err(|_| CredentialError::KeyFile(path.to_path_buf()))?;
        if secret.len() != SECRET_LEN {
            return Err(CredentialError::KeyFile(path.to_path_buf()));
        }
        return Ok(secret);
    }

    let mut secret = vec![0u8; SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    write_private(path, BASE64.encode(&secret).as_bytes()).map_err(io_err)?;
    tracing::debug!(path = %path.display(), "created credential key file");
    Ok(secret)
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
