//! Stable identity of a scene primitive.

use std::fmt;
use std::sync::Arc;

/// Absolute, `/`-separated path identifying one primitive in the scene.
///
/// Paths are cheap to clone and are used as keys by the change tracker and
/// the render index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimPath(Arc<str>);

impl PrimPath {
    /// Create a path from its string form.
    pub fn new(path: &str) -> Self {
        Self(Arc::from(path))
    }

    /// The full path text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path element, used in diagnostics.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether this is the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PrimPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimPath({})", self.0)
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_last_element() {
        assert_eq!(PrimPath::new("/World/hair/strand_0").name(), "strand_0");
        assert_eq!(PrimPath::new("plane").name(), "plane");
    }

    #[test]
    fn paths_compare_by_content() {
        assert_eq!(PrimPath::from("/a/b"), PrimPath::new("/a/b"));
        assert_ne!(PrimPath::from("/a/b"), PrimPath::new("/a/c"));
    }
}
