//! Request path to remote path resolution.
//!
//! Request paths are untrusted. They are normalized first and only then
//! joined onto the configured root, so a resolved [`RemotePath`] can never
//! name anything outside it.

use std::fmt;

/// Absolute path on the remote host, always inside the configured root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath(String);

impl RemotePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Allowed(RemotePath),
    Denied(&'static str),
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: String,
}

impl PathResolver {
    /// `root` must be absolute; trailing slashes are ignored.
    pub fn new(root: &str) -> Self {
        let trimmed = root.trim_end_matches('/');
        Self {
            root: trimmed.to_string(),
        }
    }

    pub fn root(&self) -> &str {
        if self.root.is_empty() { "/" } else { &self.root }
    }

    /// Resolve an already percent-decoded request path.
    pub fn resolve(&self, request_path: &str) -> Resolution {
        if request_path.contains('\0') {
            return Resolution::Denied("path contains a NUL byte");
        }
        if request_path.contains('\\') {
            return Resolution::Denied("path contains a backslash");
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in request_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Resolution::Denied("path escapes the remote root");
                    }
                }
                name => segments.push(name),
            }
        }

        if segments.is_empty() {
            return Resolution::Allowed(RemotePath(self.root().to_string()));
        }

        let mut path = self.root.clone();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        Resolution::Allowed(RemotePath(path))
    }
}
