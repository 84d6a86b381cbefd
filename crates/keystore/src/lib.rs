//! Balance Keystore
//!
//! Loads signing keys from Solana CLI keypair files (a JSON array of the
//! 64 `secret || public` bytes) and resolves platform-aware default paths.

use std::fs;
use std::path::{Path, PathBuf};

use balance_crypto::{KeyError, SigningKeypair};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Keypair file not found: {0}")]
    NotFound(String),
    #[error("Failed to read key file: {0}")]
    ReadError(String),
    #[error("Failed to write key file: {0}")]
    WriteError(String),
    #[error("Invalid key format: {0}")]
    InvalidFormat(String),
    #[error("Invalid keypair: {0}")]
    InvalidKeypair(#[from] KeyError),
    #[error("Failed to create directory: {0}")]
    CreateDirError(String),
}

pub type Result<T> = std::result::Result<T, KeystoreError>;

/// Load a keypair from a Solana CLI keypair file.
pub fn load_keypair(path: &Path) -> Result<SigningKeypair> {
    if !path.exists() {
        return Err(KeystoreError::NotFound(path.display().to_string()));
    }
    debug!("Loading keypair from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| KeystoreError::ReadError(e.to_string()))?;
    let bytes: Vec<u8> =
        serde_json::from_str(&content).map_err(|e| KeystoreError::InvalidFormat(e.to_string()))?;
    Ok(SigningKeypair::from_keypair_bytes(&bytes)?)
}

/// Load a keypair file, generating and saving a new keypair if it does not exist.
pub fn load_or_generate_keypair(path: &Path) -> Result<SigningKeypair> {
    if path.exists() {
        load_keypair(path)
    } else {
        let keypair = SigningKeypair::generate();
        info!(pubkey = %keypair.pubkey(), "Generating new keypair at {}", path.display());
        save_keypair(path, &keypair)?;
        Ok(keypair)
    }
}

/// Write a keypair in Solana CLI format, creating parent directories as needed.
pub fn save_keypair(path: &Path, keypair: &SigningKeypair) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| KeystoreError::CreateDirError(e.to_string()))?;
    }
    let content = serde_json::to_string(&keypair.to_keypair_bytes().to_vec())
        .map_err(|e| KeystoreError::WriteError(e.to_string()))?;
    fs::write(path, content).map_err(|e| KeystoreError::WriteError(e.to_string()))
}

/// Default signer used by the Solana CLI: `~/.config/solana/id.json`.
pub fn default_keypair_path() -> PathBuf {
    home_dir().join(".config").join("solana").join("id.json")
}

/// Get the default config directory for a given service name.
///
/// - macOS: `~/Library/Application Support/{ServiceName}`
/// - Linux: `~/.config/{service_name}`
/// - Windows: `%APPDATA%\{ServiceName}`
pub fn default_config_dir_for(service: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(capitalize(service))
    }
    #[cfg(target_os = "linux")]
    {
        let xdg = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"));
        xdg.join(service.to_lowercase())
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"));
        appdata.join(capitalize(service))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        home_dir().join(format!(".{}", service.to_lowercase()))
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        home_dir()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_generate_and_load_keypair() {
        let dir = std::env::temp_dir().join("balance-keystore-test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("id.json");

        // Generate
        let kp1 = load_or_generate_keypair(&path).unwrap();

        // Load
        let kp2 = load_keypair(&path).unwrap();
        assert_eq!(kp2.pubkey(), kp1.pubkey());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_is_solana_cli_format() {
        let dir = std::env::temp_dir().join("balance-keystore-test-format");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("id.json");

        let kp = SigningKeypair::from_secret_bytes(&[3u8; 32]);
        save_keypair(&path, &kp).unwrap();

        let raw: Vec<u8> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 64);
        assert_eq!(&raw[..32], &[3u8; 32]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("balance-keystore-test-missing/none.json");
        assert!(matches!(load_keypair(&path), Err(KeystoreError::NotFound(_))));
    }

    #[test]
    fn test_invalid_key_format() {
        let dir = std::env::temp_dir().join("balance-keystore-test-invalid");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("bad.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(load_keypair(&path), Err(KeystoreError::InvalidFormat(_))));

        fs::write(&path, b"[1, 2, 3]").unwrap();
        assert!(matches!(
            load_keypair(&path),
            Err(KeystoreError::InvalidKeypair(KeyError::InvalidLength(3)))
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_paths() {
        let key_path = default_keypair_path();
        assert!(key_path.ends_with(".config/solana/id.json"));

        let config_dir = default_config_dir_for("balance-manager");
        assert!(!config_dir.to_string_lossy().is_empty());
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path("~/test");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("test"));
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
        assert!(!expand_path("~").to_string_lossy().starts_with('~'));
    }
}
