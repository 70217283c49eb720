//! OAuth token persistence

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Leeway before the recorded expiry at which a token counts as expired,
/// so a token is never used in the last moments of its lifetime.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// A persisted OAuth2 token.
///
/// Field names match the JSON the Go oauth2 library writes, so tokens
/// saved by earlier versions of this tool keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Whether the token is at or past its expiry (with leeway).
    ///
    /// A token without a recorded expiry is treated as valid.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) >= expiry,
            None => false,
        }
    }
}

/// Write a token to a file as JSON, creating parent directories.
pub fn save_token<P: AsRef<Path>>(path: P, token: &Token) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create token directory {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(token).context("encode token")?;
    std::fs::write(path, json).with_context(|| format!("write token file {}", path.display()))?;

    // The token grants account access; keep it private.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Read a token from a JSON file.
pub fn load_token<P: AsRef<Path>>(path: P) -> Result<Token> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("open token file {}", path.display()))?;
    let token: Token = serde_json::from_str(&content).context("decode token")?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        // Nested path exercises parent directory creation.
        let path = dir.path().join("nested/dir/token.json");

        let token = Token {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        };

        save_token(&path, &token).unwrap();
        let loaded = load_token(&path).unwrap();

        assert_eq!(loaded.access_token, "abc");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert!(!loaded.is_expired());
    }

    #[cfg(unix)]
    #[test]
    fn saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let token = Token {
            access_token: "abc".to_string(),
            token_type: String::new(),
            refresh_token: None,
            expiry: None,
        };

        save_token(&path, &token).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_token(dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("open token file"));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: String::new(),
            refresh_token: None,
            expiry: None,
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn token_within_leeway_counts_as_expired() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: String::new(),
            refresh_token: None,
            expiry: Some(Utc::now() + chrono::Duration::seconds(5)),
        };
        assert!(token.is_expired());
    }
}
