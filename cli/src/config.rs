use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rand::Rng;

const API_KEY_BYTES: usize = 32;

/// Filesystem layout for heft's data. The platform data directory is
/// resolved once here; everything else (database, API key, TLS material)
/// hangs off it.
pub struct Config {
    pub db_path: PathBuf,
    data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "heft").context("Could not determine home directory")?;
        Self::rooted_at(proj_dirs.data_dir().to_path_buf())
    }

    /// Root the layout at an explicit directory. Tests use a tempdir.
    fn rooted_at(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        let db_path = data_dir.join("heft.db");
        Ok(Config { db_path, data_dir })
    }

    pub fn api_key_path(&self) -> PathBuf {
        self.data_dir.join("api_key")
    }

    /// Default location of the self-signed TLS certificate.
    pub fn tls_cert_path(&self) -> Result<PathBuf> {
        Ok(self.tls_dir()?.join("cert.pem"))
    }

    /// Default location of the TLS private key.
    pub fn tls_key_path(&self) -> Result<PathBuf> {
        Ok(self.tls_dir()?.join("key.pem"))
    }

    fn tls_dir(&self) -> Result<PathBuf> {
        let dir = self.data_dir.join("tls");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create TLS directory: {}", dir.display()))?;
        Ok(dir)
    }

    /// Load the API key, generating and persisting a fresh one on first use.
    pub fn load_or_create_api_key(&self) -> Result<String> {
        let path = self.api_key_path();

        if let Ok(existing) = fs::read_to_string(&path) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(existing.to_string());
            }
        }

        let key = generate_api_key();
        fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok(key)
    }
}

/// 32 random bytes, hex-encoded.
fn generate_api_key() -> String {
    let mut rng = rand::rng();
    let mut key = String::with_capacity(API_KEY_BYTES * 2);
    for _ in 0..API_KEY_BYTES {
        let _ = write!(key, "{:02x}", rng.random::<u8>());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> (tempfile::TempDir, Config) {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::rooted_at(tmp.path().join("data")).unwrap();
        (tmp, config)
    }

    #[test]
    fn test_layout_hangs_off_data_dir() {
        let (_tmp, config) = test_config();
        assert!(config.db_path.ends_with("heft.db"));
        assert!(config.api_key_path().ends_with("api_key"));
        assert!(config.tls_cert_path().unwrap().ends_with("tls/cert.pem"));
        assert!(config.tls_key_path().unwrap().ends_with("tls/key.pem"));
    }

    #[test]
    fn test_generate_api_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), API_KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_api_key_created_once_and_reused() {
        let (_tmp, config) = test_config();
        let first = config.load_or_create_api_key().unwrap();
        let second = config.load_or_create_api_key().unwrap();
        assert_eq!(first, second);
        assert!(config.api_key_path().exists());
    }

    #[test]
    fn test_hand_edited_key_is_trimmed_and_kept() {
        let (_tmp, config) = test_config();
        fs::write(config.api_key_path(), "  my-own-key \n").unwrap();
        assert_eq!(config.load_or_create_api_key().unwrap(), "my-own-key");
    }

    #[test]
    fn test_empty_key_file_is_regenerated() {
        let (_tmp, config) = test_config();
        fs::write(config.api_key_path(), "\n").unwrap();
        let key = config.load_or_create_api_key().unwrap();
        assert_eq!(key.len(), API_KEY_BYTES * 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_api_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_tmp, config) = test_config();
        config.load_or_create_api_key().unwrap();
        let mode = fs::metadata(config.api_key_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
