//! Client configuration
//!
//! A small JSON file in the platform config directory. Every key has a
//! default, so a missing file or missing keys are not errors.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, DEFAULT_MAX_PAGES};
use crate::error::{Error, Result};
use crate::models::MAX_RENEWALS;
use crate::services::circulation::Circulation;
use crate::services::overdue::{
    BusinessDayRenewal, FinePolicy, DEFAULT_DAILY_FINE, DEFAULT_RENEWAL_DAYS, MAX_LOAN_DAYS,
};
use crate::services::updater::UpdateSettings;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "LIBRIS_CONFIG";

const CONFIG_FILE: &str = "config.json";
const DEFAULT_UPDATE_BRANCH: &str = "main";

/// Keys accepted by [`AppConfig::get`] and [`AppConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "api_url",
    "token",
    "daily_fine",
    "renewal_days",
    "max_renewals",
    "max_pages",
    "update_repo",
    "update_branch",
    "install_dir",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub daily_fine: f64,
    pub renewal_days: u32,
    pub max_renewals: u32,
    pub max_pages: u32,
    /// GitHub `owner/name` checked by `libris update`
    pub update_repo: Option<String>,
    pub update_branch: String,
    /// Source checkout rebuilt by `libris update apply`; `~` is expanded
    pub install_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            daily_fine: DEFAULT_DAILY_FINE,
            renewal_days: DEFAULT_RENEWAL_DAYS,
            max_renewals: MAX_RENEWALS,
            max_pages: DEFAULT_MAX_PAGES,
            update_repo: None,
            update_branch: DEFAULT_UPDATE_BRANCH.to_string(),
            install_dir: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "libris", "Libris")
        .ok_or_else(|| Error::config("Could not determine project directories"))
}

/// Config file path, honoring `LIBRIS_CONFIG`
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(path.trim()).as_ref()));
        }
    }
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

/// Directory for local state such as the activity log
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

impl AppConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Apply command-line or environment overrides for the connection
    pub fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|s| !s.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(token) = token.filter(|s| !s.trim().is_empty()) {
            self.token = Some(token);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.daily_fine.is_finite() || self.daily_fine < 0.0 {
            return Err(Error::config("daily_fine must be zero or more"));
        }
        if self.renewal_days == 0 || self.renewal_days > MAX_LOAN_DAYS {
            return Err(Error::config(format!(
                "renewal_days must be between 1 and {}",
                MAX_LOAN_DAYS
            )));
        }
        if self.max_renewals > MAX_RENEWALS {
            return Err(Error::config(format!(
                "max_renewals cannot exceed {}",
                MAX_RENEWALS
            )));
        }
        if self.max_pages == 0 {
            return Err(Error::config("max_pages must be at least 1"));
        }
        Ok(())
    }

    /// Display value for one key; the token is masked
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key.to_lowercase().as_str() {
            "api_url" => or_dash(&self.api_url),
            "token" => mask_token(self.token.as_deref()),
            "daily_fine" => format!("{:.2}", self.daily_fine),
            "renewal_days" => self.renewal_days.to_string(),
            "max_renewals" => self.max_renewals.to_string(),
            "max_pages" => self.max_pages.to_string(),
            "update_repo" => or_dash(&self.update_repo),
            "update_branch" => self.update_branch.clone(),
            "install_dir" => or_dash(&self.install_dir),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set one key from its string form. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let mut next = self.clone();
        let optional = |v: &str| Some(v.to_string()).filter(|s| !s.is_empty());

        match key.to_lowercase().as_str() {
            "api_url" => next.api_url = optional(value),
            "token" => next.token = optional(value),
            "daily_fine" => next.daily_fine = parse_number(key, value)?,
            "renewal_days" => next.renewal_days = parse_number(key, value)?,
            "max_renewals" => next.max_renewals = parse_number(key, value)?,
            "max_pages" => next.max_pages = parse_number(key, value)?,
            "update_repo" => next.update_repo = optional(value),
            "update_branch" => {
                next.update_branch = optional(value).unwrap_or_else(|| DEFAULT_UPDATE_BRANCH.to_string())
            }
            "install_dir" => next.install_dir = optional(value),
            _ => return Err(unknown_key(key)),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Restore one key to its default
    pub fn unset(&mut self, key: &str) -> Result<()> {
        let defaults = Self::default();
        match key.to_lowercase().as_str() {
            "api_url" => self.api_url = defaults.api_url,
            "token" => self.token = defaults.token,
            "daily_fine" => self.daily_fine = defaults.daily_fine,
            "renewal_days" => self.renewal_days = defaults.renewal_days,
            "max_renewals" => self.max_renewals = defaults.max_renewals,
            "max_pages" => self.max_pages = defaults.max_pages,
            "update_repo" => self.update_repo = defaults.update_repo,
            "update_branch" => self.update_branch = defaults.update_branch,
            "install_dir" => self.install_dir = defaults.install_dir,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Every key with its display value
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect()
    }

    pub fn fine_policy(&self) -> FinePolicy {
        FinePolicy::new(self.daily_fine)
    }

    pub fn circulation(&self) -> Circulation {
        Circulation::new(
            self.fine_policy(),
            Box::new(BusinessDayRenewal {
                days: self.renewal_days,
            }),
        )
        .with_max_renewals(self.max_renewals)
    }

    pub fn client(&self) -> Result<ApiClient> {
        let url = self.api_url.as_deref().ok_or_else(|| {
            Error::config("API URL is not configured. Run 'libris config set api_url <url>' or set LIBRIS_API_URL")
        })?;
        let token = self.token.as_deref().ok_or_else(|| {
            Error::config("API token is not configured. Run 'libris config set token <token>' or set LIBRIS_TOKEN")
        })?;
        Ok(ApiClient::new(url, token)?.with_max_pages(self.max_pages))
    }

    pub fn update_settings(&self) -> Result<UpdateSettings> {
        let repo = self
            .update_repo
            .clone()
            .ok_or_else(|| Error::config("update_repo is not configured"))?;
        let install_dir = match self.install_dir.as_deref() {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            None => std::env::current_dir()?,
        };
        Ok(UpdateSettings {
            repo,
            branch: self.update_branch.clone(),
            install_dir,
        })
    }
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn unknown_key(key: &str) -> Error {
    Error::config(format!(
        "Unknown config key: {}. Available keys: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{} must be a number, got '{}'", key, value)))
}

pub fn mask_token(token: Option<&str>) -> String {
    match token {
        Some(t) if !t.is_empty() => "****".to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests must not run in parallel
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.daily_fine, 2.0);
        assert_eq!(config.max_renewals, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.set("api_url", "https://library.example.edu/api").unwrap();
        config.set("daily_fine", "5").unwrap();
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_url.as_deref(), Some("https://library.example.edu/api"));
        assert_eq!(loaded.daily_fine, 5.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"renewal_days": 7}"#).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.renewal_days, 7);
        assert_eq!(config.update_branch, "main");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_set_validates() {
        let mut config = AppConfig::default();
        assert!(config.set("daily_fine", "two").is_err());
        assert!(config.set("max_renewals", "4").is_err());
        assert!(config.set("colour", "blue").is_err());
        config.set("max_renewals", "2").unwrap();
        assert_eq!(config.max_renewals, 2);
    }

    #[test]
    fn test_renewal_days_is_capped() {
        let mut config = AppConfig::default();
        config.set("renewal_days", "60").unwrap();
        assert_eq!(config.renewal_days, 60);
        assert!(config.set("renewal_days", "61").is_err());
        assert!(config.set("renewal_days", "100000").is_err());
        assert_eq!(config.renewal_days, 60);
    }

    #[test]
    fn test_set_empty_clears_optional() {
        let mut config = AppConfig::default();
        config.set("token", "abc").unwrap();
        config.set("token", "").unwrap();
        assert_eq!(config.token, None);
        config.set("update_branch", "").unwrap();
        assert_eq!(config.update_branch, "main");
    }

    #[test]
    fn test_unset_restores_default() {
        let mut config = AppConfig::default();
        config.set("daily_fine", "5").unwrap();
        config.set("api_url", "http://library.local/api").unwrap();
        config.unset("daily_fine").unwrap();
        config.unset("api_url").unwrap();
        assert_eq!(config.daily_fine, AppConfig::default().daily_fine);
        assert_eq!(config.api_url, None);
        assert!(config.unset("colour").is_err());
    }

    #[test]
    fn test_get_masks_token() {
        let mut config = AppConfig::default();
        assert_eq!(config.get("token").unwrap(), "-");
        config.token = Some("secret".to_string());
        assert_eq!(config.get("token").unwrap(), "****");
        assert!(config.entries().iter().all(|(_, v)| !v.contains("secret")));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig {
            api_url: Some("http://file".to_string()),
            ..Default::default()
        }
        .with_overrides(Some("http://flag".to_string()), Some(" ".to_string()));
        assert_eq!(config.api_url.as_deref(), Some("http://flag"));
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_client_requires_connection_settings() {
        let config = AppConfig::default();
        let err = config.client().err().unwrap();
        assert!(err.to_string().contains("API URL"));

        let config = config.with_overrides(Some("http://localhost:8000".to_string()), Some("t".to_string()));
        assert!(config.client().is_ok());
    }

    #[test]
    fn test_circulation_uses_settings() {
        let mut config = AppConfig::default();
        config.set("max_renewals", "1").unwrap();
        config.set("daily_fine", "3.5").unwrap();
        let circulation = config.circulation();
        assert_eq!(circulation.max_renewals(), 1);
        assert_eq!(circulation.fines().daily_rate, 3.5);
    }

    #[test]
    fn test_config_path_env_override() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var(CONFIG_PATH_ENV, "/tmp/libris-test/config.json");
        assert_eq!(config_path().unwrap(), PathBuf::from("/tmp/libris-test/config.json"));
        std::env::remove_var(CONFIG_PATH_ENV);
        assert!(config_path().unwrap().ends_with(CONFIG_FILE));
    }
}
