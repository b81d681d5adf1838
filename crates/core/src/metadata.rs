//! POSIX metadata codec
//!
//! Maps local file attributes to the reserved object metadata keys used by
//! gsutil (`goog-reserved-*`) and back. Decoding is tolerant: a missing or
//! malformed key leaves that field unset, and restoring applies each field
//! on its own so that one failure never blocks the others.

use std::collections::HashMap;
use std::fs::{FileTimes, Metadata};
use std::path::Path;
use std::time::SystemTime;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Access time, whole seconds since the epoch
pub const ATIME_KEY: &str = "goog-reserved-file-atime";
/// Modification time, whole seconds since the epoch
pub const MTIME_KEY: &str = "goog-reserved-file-mtime";
/// Owner user id
pub const UID_KEY: &str = "goog-reserved-posix-uid";
/// Owner group id
pub const GID_KEY: &str = "goog-reserved-posix-gid";
/// Permission bits as three octal digits
pub const MODE_KEY: &str = "goog-reserved-posix-mode";

/// POSIX attributes carried in object metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atime: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    /// Permission bits (`0o777` mask)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

impl PosixMetadata {
    /// Capture the attributes of a local file, times truncated to seconds
    #[cfg(unix)]
    pub fn from_local(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            atime: Timestamp::from_second(meta.atime()).ok(),
            mtime: Timestamp::from_second(meta.mtime()).ok(),
            uid: Some(meta.uid()),
            gid: Some(meta.gid()),
            mode: Some(meta.mode() & 0o777),
        }
    }

    /// Capture the attributes of a local file, times truncated to seconds
    #[cfg(not(unix))]
    pub fn from_local(meta: &Metadata) -> Self {
        Self {
            atime: meta.accessed().ok().and_then(whole_seconds),
            mtime: meta.modified().ok().and_then(whole_seconds),
            ..Default::default()
        }
    }

    /// Encode into the reserved metadata keys; unset fields are omitted
    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        if let Some(atime) = self.atime {
            metadata.insert(ATIME_KEY.to_string(), atime.as_second().to_string());
        }
        if let Some(mtime) = self.mtime {
            metadata.insert(MTIME_KEY.to_string(), mtime.as_second().to_string());
        }
        if let Some(uid) = self.uid {
            metadata.insert(UID_KEY.to_string(), uid.to_string());
        }
        if let Some(gid) = self.gid {
            metadata.insert(GID_KEY.to_string(), gid.to_string());
        }
        if let Some(mode) = self.mode {
            metadata.insert(MODE_KEY.to_string(), format!("{:03o}", mode & 0o777));
        }
        metadata
    }

    /// Decode from object metadata.
    ///
    /// Returns `None` when no reserved key is present at all.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Option<Self> {
        let posix = Self {
            atime: field(metadata, ATIME_KEY, parse_seconds),
            mtime: field(metadata, MTIME_KEY, parse_seconds),
            uid: field(metadata, UID_KEY, |v| v.parse().ok()),
            gid: field(metadata, GID_KEY, |v| v.parse().ok()),
            mode: field(metadata, MODE_KEY, |v| u32::from_str_radix(v, 8).ok()),
        };
        (posix != Self::default()).then_some(posix)
    }

    /// Restore the attributes onto `path`.
    ///
    /// Each field is applied independently; failures are logged and skipped.
    pub fn apply(&self, path: &Path) {
        if self.atime.is_some() || self.mtime.is_some() {
            if let Err(e) = self.apply_times(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to restore file times");
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if self.uid.is_some() || self.gid.is_some() {
                if let Err(e) = std::os::unix::fs::chown(path, self.uid, self.gid) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to restore owner");
                }
            }
            if let Some(mode) = self.mode {
                let permissions = std::fs::Permissions::from_mode(mode & 0o777);
                if let Err(e) = std::fs::set_permissions(path, permissions) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to restore mode");
                }
            }
        }
    }

    fn apply_times(&self, path: &Path) -> std::io::Result<()> {
        let mut times = FileTimes::new();
        if let Some(atime) = self.atime {
            times = times.set_accessed(SystemTime::from(atime));
        }
        if let Some(mtime) = self.mtime {
            times = times.set_modified(SystemTime::from(mtime));
        }
        std::fs::File::options()
            .write(true)
            .open(path)?
            .set_times(times)
    }
}

/// Truncate a system time to whole seconds
pub fn whole_seconds(time: SystemTime) -> Option<Timestamp> {
    let ts = Timestamp::try_from(time).ok()?;
    Timestamp::from_second(ts.as_second()).ok()
}

fn parse_seconds(value: &str) -> Option<Timestamp> {
    let seconds = value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))?;
    Timestamp::from_second(seconds).ok()
}

fn field<T>(
    metadata: &HashMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = metadata.get(key)?;
    let value = parse(raw.trim());
    if value.is_none() {
        tracing::debug!(key, value = %raw, "ignoring malformed metadata value");
    }
    value
}
