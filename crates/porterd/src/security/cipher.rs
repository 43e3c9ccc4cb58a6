//! Symmetric encryption of opaque text payloads.
//!
//! ChaCha20-Poly1305 keyed from a locally persisted key file. The key
//! never leaves memory once loaded; the file carries mode 0o600.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use porter_common::RouterError;
use rand::RngCore;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const ENVELOPE_PREFIX: &str = "v1";

/// Authenticated symmetric cipher for secrets at rest.
pub struct SecretCipher {
    key: [u8; KEY_LEN],
    /// False when the key could not be written to disk; a restart in
    /// that condition cannot decrypt previously persisted secrets.
    persistent: bool,
}

impl SecretCipher {
    /// Load the key from `key_file`, or generate and persist a new one.
    ///
    /// A missing or corrupt key file never aborts startup: the cipher
    /// falls back to a process-lifetime in-memory key and logs that
    /// persistence is degraded.
    pub fn load_or_create(key_file: &Path) -> Self {
        match fs::read(key_file) {
            Ok(bytes) if bytes.len() == KEY_LEN => {
                let mut key = [0u8; KEY_LEN];
                key.copy_from_slice(&bytes);
                info!("Loaded encryption key from {}", key_file.display());
                Self {
                    key,
                    persistent: true,
                }
            }
            Ok(_) => {
                warn!(
                    "Key file {} is corrupt, using temporary in-memory key",
                    key_file.display()
                );
                Self::ephemeral()
            }
            Err(_) => {
                let key = Self::generate_key();
                let persistent = match Self::save_key(key_file, &key) {
                    Ok(()) => {
                        info!("Encryption key saved to {}", key_file.display());
                        true
                    }
                    Err(e) => {
                        warn!(
                            "Cannot save encryption key ({}), persistence degraded: \
                             secrets will not survive a restart",
                            e
                        );
                        false
                    }
                };
                Self { key, persistent }
            }
        }
    }

    /// Process-lifetime key with no backing file.
    fn ephemeral() -> Self {
        Self {
            key: Self::generate_key(),
            persistent: false,
        }
    }

    fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        key
    }

    fn save_key(path: &Path, key: &[u8; KEY_LEN]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, key)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Whether the key survived to disk.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Encrypt a plaintext into a `v1:<nonce>:<ciphertext>` envelope.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, RouterError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| RouterError::Cipher(format!("failed to initialize cipher: {e}")))?;
        let ciphertext = aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| RouterError::Cipher(format!("encryption failed: {e}")))?;

        Ok(format!(
            "{ENVELOPE_PREFIX}:{}:{}",
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    /// Decrypt an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// Ciphertext not produced by the currently loaded key fails with a
    /// cipher error; it never yields garbage.
    pub fn decrypt(&self, envelope: &str) -> Result<String, RouterError> {
        let mut parts = envelope.split(':');
        let version = parts.next().unwrap_or_default();
        let nonce_b64 = parts.next().unwrap_or_default();
        let ciphertext_b64 = parts.next().unwrap_or_default();

        if version != ENVELOPE_PREFIX || parts.next().is_some() {
            return Err(RouterError::Cipher("invalid ciphertext envelope".to_string()));
        }

        let nonce_raw = URL_SAFE_NO_PAD
            .decode(nonce_b64.as_bytes())
            .map_err(|e| RouterError::Cipher(format!("failed to decode nonce: {e}")))?;
        if nonce_raw.len() != NONCE_LEN {
            return Err(RouterError::Cipher("nonce length is invalid".to_string()));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64.as_bytes())
            .map_err(|e| RouterError::Cipher(format!("failed to decode payload: {e}")))?;

        let nonce = Nonce::from_slice(nonce_raw.as_slice());
        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| RouterError::Cipher(format!("failed to initialize cipher: {e}")))?;
        let plaintext = aead
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| RouterError::Cipher("decryption failed (wrong key or tampered data)".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| RouterError::Cipher(format!("plaintext is invalid utf8: {e}")))
    }
}
