//! Encrypted-at-rest store for long-lived API credentials.
//!
//! The whole mapping persists as one ciphertext blob; there is no
//! per-key persistence. Plaintext form is a `name=value` line list.

use crate::security::SecretCipher;
use porter_common::RouterError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Secure storage for API keys and credentials.
pub struct CredentialStore {
    path: PathBuf,
    cipher: Arc<SecretCipher>,
    entries: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    /// Open the store, decrypting the backing file if present.
    ///
    /// An unreadable blob (wrong key, tampered file, parse failure) is
    /// logged and treated as empty - the operator re-enters secrets. A
    /// partially-decrypted value is never kept.
    pub fn open(path: impl Into<PathBuf>, cipher: Arc<SecretCipher>) -> Self {
        let path = path.into();
        let entries = match Self::load(&path, &cipher) {
            Ok(entries) => {
                info!("Loaded {} credentials", entries.len());
                entries
            }
            Err(e) => {
                error!("Failed to load credentials: {}", e);
                HashMap::new()
            }
        };

        Self {
            path,
            cipher,
            entries: Mutex::new(entries),
        }
    }

    fn load(path: &Path, cipher: &SecretCipher) -> Result<HashMap<String, String>, RouterError> {
        let mut entries = HashMap::new();

        if !path.exists() {
            return Ok(entries);
        }
        let blob = fs::read_to_string(path)
            .map_err(|e| RouterError::Cipher(format!("cannot read credential store: {e}")))?;
        if blob.trim().is_empty() {
            return Ok(entries);
        }

        let plaintext = cipher.decrypt(blob.trim())?;
        for line in plaintext.lines() {
            if let Some((name, value)) = line.split_once('=') {
                entries.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(entries)
    }

    /// Retrieve a credential.
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.lock().unwrap().get(name).cloned()
    }

    /// Store a credential, rewriting the whole encrypted blob.
    pub fn set(&self, name: &str, value: &str) -> Result<(), RouterError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(name.to_string(), value.to_string());
        self.save(&entries)
    }

    /// Delete a credential if present.
    pub fn delete(&self, name: &str) -> Result<(), RouterError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(name).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    /// Names of stored credentials (never the values).
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Serialize, encrypt, and overwrite the backing file. Called with
    /// the entries lock held so read-modify-write stays coherent.
    fn save(&self, entries: &HashMap<String, String>) -> Result<(), RouterError> {
        let plaintext = entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("\n");
        let blob = self.cipher.encrypt(&plaintext)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RouterError::Cipher(format!("cannot create store directory: {e}")))?;
        }
        fs::write(&self.path, blob)
            .map_err(|e| RouterError::Cipher(format!("cannot write credential store: {e}")))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .map_err(|e| RouterError::Cipher(format!("cannot restrict store permissions: {e}")))?;
        }

        info!("Saved {} credentials", entries.len());
        Ok(())
    }
}
