//! Virtual path model
//!
//! `VirtualPath` is the only way to address the in-memory namespace. It is always
//! absolute and normalized: no `.` or `..` segments, no empty segments, and a single
//! `/` separator regardless of which separator the client sent.

use std::fmt;

const ROOT: &str = "/";

/// Canonical absolute path within the virtual namespace.
///
/// Equality and hashing are by segment sequence and are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    /// The namespace root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a raw client string. Relative input is taken relative to the root.
    pub fn parse(raw: &str) -> Self {
        Self::root().resolve(raw)
    }

    /// Resolves `raw` against this path.
    ///
    /// An absolute `raw` discards `self` entirely. Empty input or `.` yields `self`.
    /// A `..` at the root is absorbed, so the result never leaves the namespace.
    pub fn resolve(&self, raw: &str) -> Self {
        let canonical = canonicalize_separators(raw);
        let mut segments = if canonical.starts_with('/') {
            Vec::new()
        } else {
            self.segments.clone()
        };

        for segment in canonical.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name.to_string()),
            }
        }

        Self { segments }
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Last segment, or `/` for the root.
    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or(ROOT)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true when `self` is `other` or one of its ancestors.
    ///
    /// The root is an ancestor of every path except itself.
    pub fn is_ancestor_of(&self, other: &VirtualPath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        self.segment_count() <= other.segment_count()
            && other.segments[..self.segment_count()] == self.segments[..]
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(ROOT);
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Both `/` and `\` are accepted as separators on input.
fn canonicalize_separators(raw: &str) -> String {
    raw.replace(std::path::MAIN_SEPARATOR, "/")
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_input_is_rooted() {
        assert_eq!(
            VirtualPath::parse("Directory1/Directory2").to_string(),
            "/Directory1/Directory2"
        );
    }

    #[test]
    fn test_root_and_empty_input() {
        assert_eq!(VirtualPath::parse("/").to_string(), "/");
        assert_eq!(VirtualPath::parse("").to_string(), "/");
        assert!(VirtualPath::parse("").is_root());
    }

    #[test]
    fn test_mixed_separators_are_normalized() {
        let path = VirtualPath::parse("/Directory1///Directory2\\\\Directory3/Directory4/../..");
        assert_eq!(path.to_string(), "/Directory1/Directory2");
        assert_eq!(path.segment_count(), 2);
    }

    #[test]
    fn test_parent_traversal_never_escapes_root() {
        assert!(VirtualPath::parse("../../..").is_root());
        assert_eq!(VirtualPath::parse("/../a/../../b").to_string(), "/b");
        let base = VirtualPath::parse("/a");
        assert_eq!(base.resolve("../../../etc/passwd").to_string(), "/etc/passwd");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(VirtualPath::root().file_name(), "/");
        assert_eq!(
            VirtualPath::parse("/Directory1/Directory2/file.txt").file_name(),
            "file.txt"
        );
    }

    #[test]
    fn test_parent() {
        assert_eq!(VirtualPath::root().parent(), None);
        let parent = VirtualPath::parse("/Directory1/Directory2/file.txt").parent();
        assert_eq!(parent, Some(VirtualPath::parse("/Directory1/Directory2")));
        assert_eq!(VirtualPath::parse("/a").parent(), Some(VirtualPath::root()));
    }

    #[test]
    fn test_resolve_relative() {
        let base = VirtualPath::parse("/Directory1/Directory2");
        assert_eq!(
            base.resolve("Directory3/Directory4").to_string(),
            "/Directory1/Directory2/Directory3/Directory4"
        );
        assert_eq!(base.resolve("..").to_string(), "/Directory1");
    }

    #[test]
    fn test_resolve_absolute_discards_base() {
        let base = VirtualPath::parse("/Directory1/Directory2");
        assert_eq!(
            base.resolve("/Directory3/Directory4").to_string(),
            "/Directory3/Directory4"
        );
        assert_eq!(base.resolve("\\Directory3").to_string(), "/Directory3");
    }

    #[test]
    fn test_resolve_empty_and_dot_keep_base() {
        let base = VirtualPath::parse("/a/b");
        assert_eq!(base.resolve(""), base);
        assert_eq!(base.resolve("."), base);
        assert_eq!(base.resolve("./."), base);
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_eq!(
            VirtualPath::parse("/Directory1/Directory2"),
            VirtualPath::parse("Directory1\\Directory2/")
        );
        assert_ne!(
            VirtualPath::parse("/Directory1/Directory2"),
            VirtualPath::parse("/directory1/Directory2")
        );
    }

    #[test]
    fn test_ancestor_relation() {
        let root = VirtualPath::root();
        let a = VirtualPath::parse("/a");
        let ab = VirtualPath::parse("/a/b");
        let ac = VirtualPath::parse("/ac");

        assert!(root.is_ancestor_of(&a));
        assert!(!root.is_ancestor_of(&root));
        assert!(a.is_ancestor_of(&a));
        assert!(a.is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&ac));
    }
}
