//! OCI config file profiles.
//!
//! The file is INI-like: `[PROFILE]` headers followed by `key=value` lines.
//! Keys in the `DEFAULT` section are inherited by every other profile.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("OCI config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed line {line} in OCI config: {content}")]
    Malformed { line: usize, content: String },

    #[error("Profile '{0}' not found in OCI config")]
    ProfileNotFound(String),

    #[error("Profile '{profile}' is missing required key '{key}'")]
    MissingKey { profile: String, key: &'static str },

    #[error("Profile '{0}' uses a passphrase-protected key, which is not supported")]
    EncryptedKey(String),
}

/// Connection parameters resolved from one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciProfile {
    pub name: String,
    pub user: String,
    pub fingerprint: String,
    pub key_file: PathBuf,
    pub tenancy: String,
    pub region: String,
}

impl OciProfile {
    /// Read `path` (a leading `~` is expanded) and resolve `profile`.
    pub fn load(path: &Path, profile: &str) -> Result<Self, ProfileError> {
        let path = expand_tilde(path);
        if !path.exists() {
            return Err(ProfileError::ConfigFileNotFound(path));
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        Self::parse(&contents, profile)
    }

    pub fn parse(contents: &str, profile: &str) -> Result<Self, ProfileError> {
        let sections = parse_sections(contents)?;

        let selected = sections
            .get(profile)
            .ok_or_else(|| ProfileError::ProfileNotFound(profile.to_string()))?;

        let mut values = sections.get(DEFAULT_PROFILE).cloned().unwrap_or_default();
        values.extend(selected.iter().map(|(k, v)| (k.clone(), v.clone())));

        if values.get("pass_phrase").is_some_and(|p| !p.is_empty()) {
            return Err(ProfileError::EncryptedKey(profile.to_string()));
        }

        let require = |key: &'static str| {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| ProfileError::MissingKey {
                    profile: profile.to_string(),
                    key,
                })
        };

        let user = require("user")?;
        let fingerprint = require("fingerprint")?;
        let key_file = require("key_file")?;
        let tenancy = require("tenancy")?;
        let region = require("region")?;

        Ok(Self {
            name: profile.to_string(),
            user,
            fingerprint,
            key_file: expand_tilde(Path::new(&key_file)),
            tenancy,
            region,
        })
    }

    /// `keyId` used in request signatures.
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    /// Same profile pointed at a different region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

fn parse_sections(
    contents: &str,
) -> Result<HashMap<String, HashMap<String, String>>, ProfileError> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
            return Err(ProfileError::Malformed {
                line: idx + 1,
                content: raw.to_string(),
            });
        };

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}

fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
