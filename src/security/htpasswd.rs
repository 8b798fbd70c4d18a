//! htpasswd credential store.
//!
//! Lines are `username:hash`. The stored value's prefix picks the check:
//! - `$apr1$` (Apache MD5), `$2a$`/`$2b$`/`$2y$` (bcrypt), `{SHA}`: `htpasswd-verify`
//! - `$1$`, `$5$`, `$6$` and 13-character DES crypt: `pwhash`
//! - anything else is a plain-text password

use htpasswd_verify::Htpasswd;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;

use crate::error::SiteError;

/// Lookup of a stored password hash by user name.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Hash stored for `username`, `Ok(None)` if the user is unknown.
    fn lookup(&self, username: &str) -> Result<Option<String>, SiteError>;
}

/// Entries of one htpasswd file, read at load time.
#[derive(Debug, Clone)]
pub struct HtpasswdFile {
    path: PathBuf,
    entries: Result<HashMap<String, String>, String>,
}

impl HtpasswdFile {
    /// Read `path`. An unreadable file is kept as a store whose every lookup fails.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => Ok(parse_entries(&content)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read htpasswd file");
                Err(e.to_string())
            }
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Build a store from file content.
    pub fn from_content(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            entries: Ok(parse_entries(content)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for HtpasswdFile {
    fn lookup(&self, username: &str) -> Result<Option<String>, SiteError> {
        match &self.entries {
            Ok(map) => Ok(map.get(username).cloned()),
            Err(reason) => Err(SiteError::CredentialLookupFailed {
                path: self.path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

fn parse_entries(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(user, hash)| (user.to_string(), hash.to_string()))
        .collect()
}

/// How a stored password is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFormat {
    Apr1,
    Bcrypt,
    Sha1,
    Crypt,
    Plain,
}

impl HashFormat {
    pub fn detect(stored: &str) -> Self {
        if stored.starts_with("$apr1$") {
            HashFormat::Apr1
        } else if ["$2a$", "$2b$", "$2y$"].iter().any(|p| stored.starts_with(p)) {
            HashFormat::Bcrypt
        } else if stored.starts_with("{SHA}") {
            HashFormat::Sha1
        } else if ["$1$", "$5$", "$6$"].iter().any(|p| stored.starts_with(p)) || is_des_crypt(stored) {
            HashFormat::Crypt
        } else {
            HashFormat::Plain
        }
    }
}

fn is_des_crypt(stored: &str) -> bool {
    stored.len() == 13
        && stored
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'/')
}

/// Check `password` against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match HashFormat::detect(stored) {
        HashFormat::Apr1 | HashFormat::Bcrypt | HashFormat::Sha1 => {
            const USER: &str = "user";
            let entry = format!("{USER}:{stored}");
            Htpasswd::from(entry.as_str()).check(USER, password)
        }
        HashFormat::Crypt => pwhash::unix::verify(password, stored),
        HashFormat::Plain => password.as_bytes().ct_eq(stored.as_bytes()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apr1_apache_documentation_vector() {
        assert!(verify_password(
            "myPassword",
            "$apr1$r31.....$HqJZimcKQFAMYayBlzkrA/"
        ));
    }

    #[test]
    fn test_apr1_entry() {
        assert!(verify_password("password", APR1));
    }

    #[test]
    fn test_apr1_wrong_password() {
        assert!(!verify_password(
            "notMyPassword",
            "$apr1$r31.....$HqJZimcKQFAMYayBlzkrA/"
        ));
    }

    #[test]
    fn test_apr1_env_credentials() {
        assert!(verify_password(
            "envpassword",
            "$apr1$vQPQyxL1$WYlXR3dAPlyaEvAcd/GII."
        ));
    }

    const BCRYPT: &str = "$2y$05$nC6nErr9XZJuMJ57WyCob.EuZEjylDt2KaHfbfOtyb.EgL1I2jCVa";
    const SHA: &str = "{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=";
    const APR1: &str = "$apr1$lZL6V/ci$eIMz/iKDkbtys/uU7LEK00";

    #[test]
    fn test_detect_format() {
        assert_eq!(HashFormat::detect(APR1), HashFormat::Apr1);
        assert_eq!(HashFormat::detect(BCRYPT), HashFormat::Bcrypt);
        assert_eq!(HashFormat::detect(SHA), HashFormat::Sha1);
        assert_eq!(HashFormat::detect("$6$salt$abc"), HashFormat::Crypt);
        assert_eq!(HashFormat::detect("bGVh02xkuGli2"), HashFormat::Crypt);
        assert_eq!(HashFormat::detect("password"), HashFormat::Plain);
    }

    #[test]
    fn test_bcrypt_entry() {
        assert!(verify_password("password", BCRYPT));
        assert!(!verify_password("wrong", BCRYPT));
    }

    #[test]
    fn test_sha_entry() {
        assert!(verify_password("password", SHA));
        assert!(!verify_password("wrong", SHA));
    }

    #[test]
    fn test_stored_hash_is_not_a_password() {
        for stored in [APR1, BCRYPT, SHA, "$apr1$vQPQyxL1$WYlXR3dAPlyaEvAcd/GII."] {
            assert!(!verify_password(stored, stored), "{stored}");
        }
    }

    #[test]
    fn test_crypt_family_entries() {
        let md5 = pwhash::md5_crypt::hash("secret").unwrap();
        assert!(verify_password("secret", &md5));
        assert!(!verify_password(&md5, &md5));

        let des = pwhash::unix_crypt::hash("secret").unwrap();
        assert_eq!(HashFormat::detect(&des), HashFormat::Crypt);
        assert!(verify_password("secret", &des));
        assert!(!verify_password(&des, &des));
    }

    #[test]
    fn test_plaintext_fallback() {
        assert!(verify_password("hunter2", "hunter2"));
        assert!(!verify_password("hunter2", "hunter3"));
        assert!(!verify_password("", "x"));
    }

    #[test]
    fn test_parse_entries_skips_comments_and_blank_lines() {
        let store = HtpasswdFile::from_content(
            ".htpasswd",
            "# users\nuser:$apr1$abc$def\n\n  admin:plain  \nbroken-line\n",
        );
        assert_eq!(
            store.lookup("user").unwrap().as_deref(),
            Some("$apr1$abc$def")
        );
        assert_eq!(store.lookup("admin").unwrap().as_deref(), Some("plain"));
        assert!(store.lookup("broken-line").unwrap().is_none());
    }

    #[test]
    fn test_unreadable_file_lookup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = HtpasswdFile::load(&dir.path().join("missing.htpasswd"));
        assert!(matches!(
            store.lookup("user"),
            Err(SiteError::CredentialLookupFailed { .. })
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".htpasswd");
        std::fs::write(&path, "user:password\n").unwrap();
        let store = HtpasswdFile::load(&path);
        assert_eq!(store.lookup("user").unwrap().as_deref(), Some("password"));
        assert_eq!(store.path(), path.as_path());
    }
}
