//! Persisted bridge address and credential.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Bridge address plus the credential authorizing privileged calls.
///
/// An empty credential means "unauthenticated".
///
/// # Example
///
/// ```
/// use hue_bridge_rs::SessionRecord;
///
/// let record = SessionRecord::unauthenticated("192.168.1.2");
/// assert!(!record.is_authenticated());
/// assert!(record.with_credential("abc").is_authenticated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    address: String,
    credential: String,
}

impl SessionRecord {
    pub fn new(address: impl Into<String>, credential: impl Into<String>) -> Self {
        SessionRecord {
            address: address.into(),
            credential: credential.into(),
        }
    }

    pub fn unauthenticated(address: impl Into<String>) -> Self {
        Self::new(address, "")
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn is_authenticated(&self) -> bool {
        !self.credential.is_empty()
    }

    pub fn with_credential(&self, credential: impl Into<String>) -> Self {
        Self::new(self.address.clone(), credential)
    }

    /// Parses the two-line text form: address, then credential.
    fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim);
        let address = lines.next().unwrap_or_default();
        if address.is_empty() {
            return Err(Error::InvalidSession("missing bridge address".to_string()));
        }
        let credential = lines.next().unwrap_or_default();
        Ok(Self::new(address, credential))
    }

    fn render(&self) -> String {
        format!("{}\n{}\n", self.address, self.credential)
    }
}

/// File holding one [`SessionRecord`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record. A missing or malformed file yields `None`.
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no stored session at {:?}", self.path);
                return Ok(None);
            }
            Err(err) => return Err(Error::session(&self.path, err)),
        };

        match SessionRecord::parse(&text) {
            Ok(record) => {
                debug!("stored session for bridge {}", record.address());
                Ok(Some(record))
            }
            Err(err) => {
                warn!("ignoring stored session {:?}: {err}", self.path);
                Ok(None)
            }
        }
    }

    /// Replaces the stored record.
    ///
    /// Writes a sibling temporary file and renames it over the target so a
    /// reader never sees a half-written record.
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, record.render()).map_err(|e| Error::session(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::session(&self.path, e))?;

        info!(
            "stored session for bridge {} in {:?}",
            record.address(),
            self.path
        );
        Ok(())
    }
}
