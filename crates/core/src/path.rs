//! Path algebra
//!
//! A normalized slash-separated path that remembers whether the address it
//! came from ended with a separator. That single bit decides whether a copy
//! keeps the copied directory's own name under the destination.

/// Separator used by both cloud keys and local POSIX paths
pub const SEPARATOR: char = '/';

/// A normalized path plus the trailing-separator bit of its original form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathState {
    normalized: String,
    had_trailing_separator: bool,
    /// Listed object key, kept byte for byte
    verbatim: Option<String>,
}

impl PathState {
    /// Create a path from a raw address fragment.
    ///
    /// The trailing-separator bit is taken from `raw` before normalization
    /// and is never derived from the normalized form again.
    pub fn new(raw: &str) -> Self {
        Self {
            had_trailing_separator: raw.ends_with(SEPARATOR),
            normalized: normalize(raw),
            verbatim: None,
        }
    }

    /// Path of an object key returned by a listing.
    ///
    /// Naming uses the normalized form, but [`cloud_key`](Self::cloud_key)
    /// returns `key` unchanged so keys with `//` or `/./` segments still
    /// address the stored object.
    pub fn object_key(key: &str) -> Self {
        Self {
            verbatim: Some(key.to_string()),
            ..Self::new(key)
        }
    }

    /// Normalized form: repeated and trailing separators and `.` segments
    /// removed, `.` for an empty relative path, `/` for the root.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Whether the original address ended with a separator
    pub fn had_trailing_separator(&self) -> bool {
        self.had_trailing_separator
    }

    /// Whether the path starts at the root
    pub fn is_absolute(&self) -> bool {
        self.normalized.starts_with(SEPARATOR)
    }

    /// Whether the path denotes the current directory or the root
    pub fn is_root(&self) -> bool {
        self.normalized == "." || self.normalized == "/"
    }

    /// Render the path with the requested separators.
    ///
    /// With `cloud` set, the current directory and the root render as the
    /// empty string because a key prefix can never denote a bucket root.
    pub fn to_key(&self, add_trailing: bool, strip_leading: bool, cloud: bool) -> String {
        if cloud && self.is_root() {
            return String::new();
        }

        let mut posix = self.normalized.clone();
        if add_trailing && !posix.ends_with(SEPARATOR) {
            posix.push(SEPARATOR);
        }
        if strip_leading && self.is_absolute() {
            posix.remove(0);
        }
        posix
    }

    /// Object key form: no leading separator, empty for the bucket root
    pub fn cloud_key(&self) -> String {
        match &self.verbatim {
            Some(key) => key.clone(),
            None => self.to_key(false, true, true),
        }
    }

    /// Object key as the user wrote it, trailing separator included
    pub fn cloud_key_as_given(&self) -> String {
        let key = self.cloud_key();
        if self.had_trailing_separator && !key.ends_with(SEPARATOR) && !key.is_empty() {
            format!("{key}/")
        } else {
            key
        }
    }

    /// Local path form
    pub fn local_path(&self) -> String {
        self.to_key(false, false, false)
    }

    /// Final path segment, empty for the root or current directory
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.normalized
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or(&self.normalized)
    }

    /// Path one level up (`.` for a single relative segment, `/` at the root)
    pub fn parent(&self) -> Self {
        if self.is_root() {
            return Self::new(&self.normalized);
        }
        match self.normalized.rfind(SEPARATOR) {
            Some(0) => Self::new("/"),
            Some(pos) => Self::new(&self.normalized[..pos]),
            None => Self::new("."),
        }
    }

    /// The path's own representation relative to its parent
    pub fn parent_name(&self) -> Self {
        Self::new(self.name())
    }

    /// Append a relative segment.
    ///
    /// Empty and `.` segments leave the path unchanged; the result carries
    /// the trailing-separator bit of `segment`.
    pub fn join(&self, segment: &str) -> Self {
        let child = Self::new(segment);
        if child.is_root() && !child.is_absolute() {
            return Self {
                normalized: self.normalized.clone(),
                had_trailing_separator: false,
                verbatim: None,
            };
        }
        if child.is_absolute() || self.normalized == "." {
            return child;
        }

        let joined = if self.normalized.ends_with(SEPARATOR) {
            format!("{}{}", self.normalized, child.normalized)
        } else {
            format!("{}{SEPARATOR}{}", self.normalized, child.normalized)
        };
        Self {
            normalized: joined,
            had_trailing_separator: child.had_trailing_separator,
            verbatim: None,
        }
    }

    /// Strip `base` from the front of this path, returning the remainder
    /// without a leading separator.
    ///
    /// Returns `None` when `base` is not a segment-wise prefix.
    pub fn strip_base(&self, base: &PathState) -> Option<String> {
        if base.normalized == "." {
            return (!self.is_absolute()).then(|| self.to_key(false, false, true));
        }
        let rest = self.normalized.strip_prefix(&base.normalized)?;
        if rest.is_empty() {
            Some(String::new())
        } else if base.normalized.ends_with(SEPARATOR) {
            Some(rest.to_string())
        } else {
            rest.strip_prefix(SEPARATOR).map(str::to_string)
        }
    }
}

impl std::fmt::Display for PathState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

fn normalize(raw: &str) -> String {
    let absolute = raw.starts_with(SEPARATOR);
    let segments: Vec<&str> = raw
        .split(SEPARATOR)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    match (absolute, segments.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => ".".to_string(),
        (true, false) => format!("/{}", segments.join("/")),
        (false, false) => segments.join("/"),
    }
}
