//! Access-token value and its durable cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

/// One issued access grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Token {
    pub fn new(value: impl Into<String>, issued_at: OffsetDateTime, valid_for: Duration) -> Self {
        Self {
            value: value.into(),
            issued_at,
            expires_at: issued_at + valid_for,
        }
    }

    /// Whether the token is unusable at `now` given a safety `margin`.
    pub fn is_expired_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
        now >= self.expires_at - margin
    }
}

/// On-disk record. `expires_at` is RFC3339 so the file stays readable by
/// other tooling.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    issued_at: String,
    expires_at: String,
}

/// File-backed token cache.
///
/// This is a cache, not a source of truth: any load failure (missing file,
/// parse error, stale record) reads as "absent" and simply forces a refresh.
/// Saves go through a temp file in the same directory plus a rename, so a
/// crash mid-write never leaves a torn record behind.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Token> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let record: TokenRecord = serde_json::from_str(&raw).ok()?;

        let issued_at = OffsetDateTime::parse(&record.issued_at, &Rfc3339).ok()?;
        let expires_at = OffsetDateTime::parse(&record.expires_at, &Rfc3339).ok()?;

        if expires_at <= OffsetDateTime::now_utc() {
            return None;
        }

        Some(Token {
            value: record.token,
            issued_at,
            expires_at,
        })
    }

    pub fn save(&self, token: &Token) -> io::Result<()> {
        let record = TokenRecord {
            token: token.value.clone(),
            issued_at: format_rfc3339(token.issued_at)?,
            expires_at: format_rfc3339(token.expires_at)?,
        };
        let body = serde_json::to_string(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)
    }
}

fn format_rfc3339(value: OffsetDateTime) -> io::Result<String> {
    value
        .format(&Rfc3339)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_token(valid_for: Duration) -> Token {
        Token::new("abc123", OffsetDateTime::now_utc(), valid_for)
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().join("token.json"));
        let token = sample_token(Duration::hours(24));

        store.save(&token).expect("save");
        let loaded = store.load().expect("load");
        assert_eq!(loaded.value, "abc123");
    }

    #[test]
    fn load_of_missing_file_is_absent() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn load_of_corrupt_file_is_absent() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        fs::write(&path, "{not json").expect("write");

        let store = TokenStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn load_of_stale_record_is_absent() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().join("token.json"));
        let token = Token::new(
            "old",
            OffsetDateTime::now_utc() - Duration::hours(48),
            Duration::hours(24),
        );

        store.save(&token).expect("save");
        assert!(store.load().is_none());
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&sample_token(Duration::hours(1)))
            .expect("save");

        let entries: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["token.json".to_string()]);
    }

    #[test]
    fn expiry_check_honors_margin() {
        let now = OffsetDateTime::now_utc();
        let token = Token::new("t", now, Duration::minutes(10));

        assert!(!token.is_expired_at(now, Duration::minutes(5)));
        assert!(token.is_expired_at(now + Duration::minutes(6), Duration::minutes(5)));
    }
}
