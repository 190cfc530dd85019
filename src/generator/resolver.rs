use std::fmt;

use crate::utils::path::PREFIX_SEPARATOR;

/// Matches virtual paths to a generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolver {
    /// `prefix:rest`. The generator sees `rest`.
    Prefix(String),
    /// `anything.suffix`. The generator sees the whole path.
    Suffix(String),
}

impl Resolver {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self::Suffix(suffix.into())
    }

    /// The literal text a matching path starts or ends with.
    fn marker(&self) -> String {
        match self {
            Self::Prefix(p) => format!("{p}{PREFIX_SEPARATOR}"),
            Self::Suffix(s) => format!(".{s}"),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        match self {
            Self::Prefix(_) => path.starts_with(&self.marker()),
            Self::Suffix(_) => path.ends_with(&self.marker()),
        }
    }

    /// Path handed to the generator.
    pub fn resource_path<'a>(&self, path: &'a str) -> &'a str {
        let path = path.trim_start_matches('/');
        match self {
            Self::Prefix(p) => &path[p.len() + 1..],
            Self::Suffix(_) => path,
        }
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }

    /// Whether some path is matched by both resolvers.
    ///
    /// Only resolvers of the same kind are compared: a prefixed path whose
    /// remainder carries a suffix is handled by chaining, not by overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        let (a, b) = (self.marker(), other.marker());
        match (self, other) {
            (Self::Prefix(_), Self::Prefix(_)) => a.starts_with(&b) || b.starts_with(&a),
            (Self::Suffix(_), Self::Suffix(_)) => a.ends_with(&b) || b.ends_with(&a),
            _ => false,
        }
    }
}

impl fmt::Display for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(p) => write!(f, "{p}{PREFIX_SEPARATOR}*"),
            Self::Suffix(s) => write!(f, "*.{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_resolver() {
        let r = Resolver::prefix("jar");
        assert!(r.matches("jar:lib/a.js"));
        assert!(r.matches("/jar:lib/a.js"));
        assert!(!r.matches("jarx:lib/a.js"));
        assert!(!r.matches("lib/jar:a.js"));
        assert_eq!(r.resource_path("jar:lib/a.js"), "lib/a.js");
    }

    #[test]
    fn test_suffix_resolver() {
        let r = Resolver::suffix("less");
        assert!(r.matches("css/theme.less"));
        assert!(!r.matches("css/theme.xless"));
        assert_eq!(r.resource_path("css/theme.less"), "css/theme.less");
    }

    #[test]
    fn test_overlap() {
        assert!(Resolver::prefix("jar").overlaps(&Resolver::prefix("jar")));
        assert!(!Resolver::prefix("jar").overlaps(&Resolver::prefix("ja")));
        assert!(Resolver::suffix("js").overlaps(&Resolver::suffix("min.js")));
        assert!(!Resolver::suffix("less").overlaps(&Resolver::suffix("css")));
        assert!(!Resolver::prefix("less").overlaps(&Resolver::suffix("less")));
    }
}
