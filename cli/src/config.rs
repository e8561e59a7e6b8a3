use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use larder_core::models::UserContext;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("larder.db");

        Ok(Config { db_path, data_dir })
    }

    /// Load the local profile, creating one with a fresh stable user id on
    /// first run. The id never changes afterwards; it scopes every record in
    /// the store.
    pub fn load_or_create_profile(&self) -> Result<UserContext> {
        let path = self.data_dir.join("profile.json");

        if path.exists() {
            let raw = std::fs::read_to_string(&path).context("Failed to read profile file")?;
            let profile: UserContext =
                serde_json::from_str(&raw).context("Failed to parse profile file")?;
            return Ok(profile);
        }

        let profile = UserContext {
            user_id: uuid::Uuid::new_v4().to_string(),
            display_name: std::env::var("USER").unwrap_or_else(|_| "me".to_string()),
            email: None,
        };
        self.save_profile(&profile)?;
        eprintln!(
            "Created profile '{}' (set a display name and email with: larder profile set)",
            profile.display_name
        );
        Ok(profile)
    }

    pub fn save_profile(&self, profile: &UserContext) -> Result<()> {
        let path = self.data_dir.join("profile.json");
        let raw = serde_json::to_string_pretty(profile)?;
        std::fs::write(&path, raw).context("Failed to write profile file")?;
        Ok(())
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}

/// Settings for the external email-dispatch service, read from the
/// environment (the service is a hosted collaborator, not something this
/// tool manages).
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub endpoint: String,
    pub token: Option<String>,
}

impl EmailSettings {
    /// `LARDER_EMAIL_URL` names the dispatch endpoint; `LARDER_EMAIL_TOKEN`
    /// is an optional bearer token. Returns `None` when no endpoint is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("LARDER_EMAIL_URL").ok()?;
        if endpoint.trim().is_empty() {
            return None;
        }
        let token = std::env::var("LARDER_EMAIL_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Some(Self { endpoint, token })
    }
}
