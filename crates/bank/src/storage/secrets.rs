//! Access tokens saved by the Link flow, one pair of files per institution
//!
//! ```text
//! secrets/
//!   ins_109511_access_token
//!   ins_109511_item_id
//! ```

use anyhow::{Context, Result, bail};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::AccessContext;

const ACCESS_TOKEN_SUFFIX: &str = "_access_token";
const ITEM_ID_SUFFIX: &str = "_item_id";

/// Environment variable overriding the secrets directory
pub const SECRETS_DIR_ENV_VAR: &str = "PLAID_SECRETS_DIR";

/// Read-only view of a secrets directory
#[derive(Debug, Clone)]
pub struct SecretsStore {
    dir: PathBuf,
}

impl SecretsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open the directory selected by the environment (see [`default_secrets_dir`])
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(default_secrets_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the credentials saved for `institution_id`
    pub fn load_credentials(&self, institution_id: &str) -> Result<AccessContext> {
        let item_id = read_secret_required(
            &self.dir.join(format!("{}{}", institution_id, ITEM_ID_SUFFIX)),
            "item_id",
        )?;
        let access_token = read_secret_required(
            &self.dir.join(format!("{}{}", institution_id, ACCESS_TOKEN_SUFFIX)),
            "access_token",
        )?;
        Ok(AccessContext::new(access_token, item_id))
    }

    /// Identifiers that have both an access token and an item id file, sorted
    pub fn institution_ids(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read secrets dir: {}", self.dir.display()))?;

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(identifier) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(ACCESS_TOKEN_SUFFIX))
            else {
                continue;
            };
            if identifier.is_empty() {
                continue;
            }
            if self
                .dir
                .join(format!("{}{}", identifier, ITEM_ID_SUFFIX))
                .is_file()
            {
                ids.insert(identifier.to_string());
            }
        }
        Ok(ids.into_iter().collect())
    }
}

/// Resolve the secrets directory.
///
/// `PLAID_SECRETS_DIR` wins; otherwise `<config>/sandbox/secrets` when
/// `PLAID_ENV=sandbox`, else `<config>/secrets`.
pub fn default_secrets_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(SECRETS_DIR_ENV_VAR)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let config_dir = config::config_dir().context("Could not determine config directory")?;
    let sandbox = std::env::var("PLAID_ENV").is_ok_and(|env| env == "sandbox");
    Ok(secrets_dir_under(&config_dir, sandbox))
}

fn secrets_dir_under(config_dir: &Path, sandbox: bool) -> PathBuf {
    if sandbox {
        config_dir.join("sandbox").join("secrets")
    } else {
        config_dir.join("secrets")
    }
}

/// Read a secret file, trimming whitespace; missing or empty files are errors
fn read_secret_required(path: &Path, label: &str) -> Result<String> {
    let value = match fs::read_to_string(path) {
        Ok(value) => value.trim().to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("Missing {} file: {}", label, path.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {} file: {}", label, path.display()));
        }
    };
    if value.is_empty() {
        bail!("Empty {} in file: {}", label, path.display());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: &str) {
        fs::write(dir.join(name), value).unwrap();
    }

    #[test]
    fn test_load_credentials_trims() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ins_1_item_id", "item-1\n");
        write(tmp.path(), "ins_1_access_token", "  access-1  \n");

        let ctx = SecretsStore::new(tmp.path()).load_credentials("ins_1").unwrap();
        assert_eq!(ctx.item_id, "item-1");
        assert_eq!(ctx.access_token, "access-1");
    }

    #[test]
    fn test_missing_and_empty_files_are_errors() {
        let tmp = TempDir::new().unwrap();
        let store = SecretsStore::new(tmp.path());

        let err = store.load_credentials("ins_1").unwrap_err();
        assert!(err.to_string().contains("Missing item_id file"));

        write(tmp.path(), "ins_1_item_id", "item-1");
        write(tmp.path(), "ins_1_access_token", "   ");
        let err = store.load_credentials("ins_1").unwrap_err();
        assert!(err.to_string().contains("Empty access_token"));
    }

    #[test]
    fn test_institution_ids_need_both_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ins_2_access_token", "a");
        write(tmp.path(), "ins_2_item_id", "i");
        write(tmp.path(), "ins_1_access_token", "a");
        write(tmp.path(), "ins_1_item_id", "i");
        write(tmp.path(), "ins_3_access_token", "a");
        write(tmp.path(), "_access_token", "a");
        write(tmp.path(), "notes.txt", "hello");

        let ids = SecretsStore::new(tmp.path()).institution_ids().unwrap();
        assert_eq!(ids, vec!["ins_1", "ins_2"]);
    }

    #[test]
    fn test_secrets_dir_layout() {
        let root = Path::new("/cfg/yapcli");
        assert_eq!(secrets_dir_under(root, false), root.join("secrets"));
        assert_eq!(secrets_dir_under(root, true), root.join("sandbox/secrets"));
    }
}
