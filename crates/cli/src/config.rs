use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use stowage_core::Storage;
use stowage_core::storage::{self, S3Option};

const CONFIG_FILE: &str = "stowage.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
}

/// A named storage location with its connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

impl RemoteConfig {
    pub fn options(&self) -> Vec<S3Option> {
        let mut options = Vec::new();
        if self.path_style {
            options.push(S3Option::PathStyle);
        }
        if let Some(region) = &self.region {
            options.push(S3Option::Region(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            options.push(S3Option::Endpoint(endpoint.clone()));
        }
        if let Some(id) = &self.access_key_id {
            options.push(S3Option::AccessKeyId(id.clone()));
        }
        if let Some(secret) = &self.secret_access_key {
            options.push(S3Option::SecretAccessKey(secret.clone()));
        }
        options
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stowage")
            .join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        toml::from_str(&content).context("failed to parse config")
    }

    /// Like [`AppConfig::load`], but a missing file yields an empty config.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn find_remote(&self, name: &str) -> Option<&RemoteConfig> {
        self.remotes
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

/// Connection flags shared by every command that talks to a remote.
/// They are applied after a named remote's own settings, so they win.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Region (default: AWS_REGION, AWS_DEFAULT_REGION or us-east-1)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Custom S3 endpoint, e.g. http://127.0.0.1:9000 for MinIO
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, global = true)]
    pub path_style: bool,

    /// Log every S3 request and response status (needs --verbose)
    #[arg(long, global = true)]
    pub trace_requests: bool,
}

impl ConnectionArgs {
    fn options(&self) -> Vec<S3Option> {
        let mut options = Vec::new();
        if self.path_style {
            options.push(S3Option::PathStyle);
        }
        if let Some(region) = &self.region {
            options.push(S3Option::Region(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            options.push(S3Option::Endpoint(endpoint.clone()));
        }
        if self.trace_requests {
            options.push(S3Option::TraceRequests);
        }
        options
    }
}

/// Resolves `remote` (a configured remote name, or a URL containing `://`)
/// into a URL and the options to open it with.
pub fn resolve_remote(
    config_path: &Path,
    remote: &str,
    conn: &ConnectionArgs,
) -> Result<(String, Vec<S3Option>)> {
    let (url, mut options) = if remote.contains("://") {
        (remote.to_string(), Vec::new())
    } else {
        let config = AppConfig::load(config_path)?;
        let found = config
            .find_remote(remote)
            .ok_or_else(|| anyhow::anyhow!("remote '{remote}' not found"))?;
        (found.url.clone(), found.options())
    };
    options.extend(conn.options());
    Ok((url, options))
}

pub fn open_storage(
    config_path: &Path,
    remote: &str,
    conn: &ConnectionArgs,
) -> Result<Box<dyn Storage>> {
    let (url, options) = resolve_remote(config_path, remote, conn)?;
    storage::open(&url, options).with_context(|| format!("failed to open {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[remotes]]
name = "backups"
url = "s3://my-bucket/db"
region = "eu-central-1"
endpoint = "http://127.0.0.1:9000"
path_style = true
access_key_id = "minio"
secret_access_key = "minio123"

[[remotes]]
name = "local"
url = "file:///var/backups"
"#;

    #[test]
    fn parses_remotes() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.remotes.len(), 2);

        let backups = config.find_remote("BACKUPS").unwrap();
        assert_eq!(
            backups.options(),
            vec![
                S3Option::PathStyle,
                S3Option::Region("eu-central-1".into()),
                S3Option::Endpoint("http://127.0.0.1:9000".into()),
                S3Option::AccessKeyId("minio".into()),
                S3Option::SecretAccessKey("minio123".into()),
            ]
        );
        assert!(config.find_remote("local").unwrap().options().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.remotes, config.remotes);
    }

    #[test]
    fn flags_override_named_remote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, SAMPLE).unwrap();

        let conn = ConnectionArgs {
            region: Some("us-west-2".into()),
            ..Default::default()
        };
        let (url, options) = resolve_remote(&path, "backups", &conn).unwrap();
        assert_eq!(url, "s3://my-bucket/db");
        assert_eq!(options.last(), Some(&S3Option::Region("us-west-2".into())));
    }

    #[test]
    fn inline_url_needs_no_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let (url, options) =
            resolve_remote(&path, "s3://bucket/x", &ConnectionArgs::default()).unwrap();
        assert_eq!(url, "s3://bucket/x");
        assert!(options.is_empty());
    }

    #[test]
    fn unknown_remote_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, SAMPLE).unwrap();
        let err = resolve_remote(&path, "nope", &ConnectionArgs::default()).unwrap_err();
        assert!(err.to_string().contains("remote 'nope' not found"));
    }
}
