//! Request path grammar.
//!
//! ```text
//! {prefix}{dir/}{stem}[@{variantKey}][-{hash}][.{ext}]
//! res/js/main@fr@dark-1a2b3c4d.js
//! ```
//!
//! Bundle ids never contain `@`, so the first `@` in the file name starts
//! the variant key. A stem may contain `-`, so parsing tries the hashed and
//! the unhashed reading and keeps the one naming a known bundle. When both
//! do (`app-fe.js` with bundles `app.js` and `app-fe.js`), the reading that
//! agrees with the bundle's current hash state wins.

use std::fmt;

use crate::utils::path::extension;
use crate::variant::VARIANT_SEPARATOR;

const HASH_SEPARATOR: char = '-';

/// A parsed or to-be-emitted bundle request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePath {
    pub prefix: String,
    pub bundle_id: String,
    /// `""` for the unvaried bundle.
    pub variant_key: String,
    pub hash: Option<String>,
}

impl BundlePath {
    pub fn new(
        prefix: impl Into<String>,
        bundle_id: impl Into<String>,
        variant_key: impl Into<String>,
        hash: Option<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            bundle_id: bundle_id.into(),
            variant_key: variant_key.into(),
            hash,
        }
    }

    /// Parse `path` against the known prefixes (longest first).
    ///
    /// `check` is asked about each candidate reading: `None` when it names no
    /// bundle, otherwise whether its variant key and hash presence agree
    /// with the bundle's state. An agreeing reading is preferred over one
    /// that only names a bundle. Returns `None` when no reading names one.
    pub fn parse(
        path: &str,
        prefixes: &[String],
        check: impl Fn(&BundlePath) -> Option<bool>,
    ) -> Option<Self> {
        let path = path.trim_start_matches('/');
        let stripped = prefixes
            .iter()
            .filter_map(|p| Some((p.as_str(), path.strip_prefix(p.as_str())?)))
            .chain(std::iter::once(("", path)));

        for (prefix, rest) in stripped {
            if let Some(found) = Self::parse_unprefixed(prefix, rest, &check) {
                return Some(found);
            }
        }
        None
    }

    fn parse_unprefixed(
        prefix: &str,
        rest: &str,
        check: &impl Fn(&BundlePath) -> Option<bool>,
    ) -> Option<Self> {
        let (dir, file) = match rest.rfind('/') {
            Some(idx) => rest.split_at(idx + 1),
            None => ("", rest),
        };
        let (base, ext) = match extension(file) {
            Some(ext) => (&file[..file.len() - ext.len() - 1], Some(ext)),
            None => (file, None),
        };

        let mut readings: Vec<(&str, Option<&str>)> = Vec::with_capacity(2);
        if let Some(idx) = base.rfind(HASH_SEPARATOR) {
            let hash = &base[idx + 1..];
            if is_hash(hash) {
                readings.push((&base[..idx], Some(hash)));
            }
        }
        readings.push((base, None));

        let mut known: Vec<(Self, bool)> = readings
            .into_iter()
            .filter_map(|(name, hash)| {
                let (stem, key) = name.split_once(VARIANT_SEPARATOR).unwrap_or((name, ""));
                if stem.is_empty() {
                    return None;
                }
                let bundle_id = match ext {
                    Some(ext) => format!("{dir}{stem}.{ext}"),
                    None => format!("{dir}{stem}"),
                };
                let reading = Self::new(prefix, bundle_id, key, hash.map(str::to_string));
                check(&reading).map(|agrees| (reading, agrees))
            })
            .collect();

        let pick = known.iter().position(|(_, agrees)| *agrees).unwrap_or(0);
        (pick < known.len()).then(|| known.swap_remove(pick).0)
    }
}

/// Lowercase hex, as produced by the bundle hashers.
fn is_hash(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Display for BundlePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.bundle_id;
        let file_start = id.rfind('/').map_or(0, |i| i + 1);
        let (base, ext) = match extension(&id[file_start..]) {
            Some(ext) => (&id[..id.len() - ext.len() - 1], Some(ext)),
            None => (id.as_str(), None),
        };

        write!(f, "{}{base}", self.prefix)?;
        if !self.variant_key.is_empty() {
            write!(f, "{VARIANT_SEPARATOR}{}", self.variant_key)?;
        }
        if let Some(hash) = &self.hash {
            write!(f, "{HASH_SEPARATOR}{hash}")?;
        }
        if let Some(ext) = ext {
            write!(f, ".{ext}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: &[&str] = &["js/main.js", "jquery-ui.js", "css/all.css", "js/plain"];

    /// Every bundle hashed, every variant key accepted.
    fn known(reading: &BundlePath) -> Option<bool> {
        IDS.contains(&reading.bundle_id.as_str())
            .then_some(reading.hash.is_some())
    }

    fn prefixes() -> Vec<String> {
        vec!["res/v2/".into(), "res/".into()]
    }

    #[test]
    fn test_emit() {
        let path = BundlePath::new("res/", "js/main.js", "fr@dark", Some("1a2b".into()));
        assert_eq!(path.to_string(), "res/js/main@fr@dark-1a2b.js");
        assert_eq!(
            BundlePath::new("", "js/plain", "", None).to_string(),
            "js/plain"
        );
        assert_eq!(
            BundlePath::new("", "js/main.js", "@light", None).to_string(),
            "js/main@@light.js"
        );
    }

    #[test]
    fn test_emit_parse_is_lossless() {
        let cases = [
            BundlePath::new("res/", "js/main.js", "fr@dark", Some("1a2b3c4d".into())),
            BundlePath::new("", "js/main.js", "", Some("00ff".into())),
            BundlePath::new("res/v2/", "jquery-ui.js", "", None),
            BundlePath::new("", "jquery-ui.js", "@light", Some("beef".into())),
            BundlePath::new("", "js/plain", "en", Some("abc".into())),
        ];
        for case in cases {
            let parsed = BundlePath::parse(&case.to_string(), &prefixes(), known);
            assert_eq!(parsed.as_ref(), Some(&case), "{case}");
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!(BundlePath::parse("js/other-abc.js", &prefixes(), known).is_none());
        assert!(BundlePath::parse("", &prefixes(), known).is_none());
        assert!(BundlePath::parse("@fr.js", &prefixes(), known).is_none());
    }

    #[test]
    fn test_parse_prefers_longest_prefix() {
        let parsed = BundlePath::parse("/res/v2/css/all-12.css", &prefixes(), known).unwrap();
        assert_eq!(parsed.prefix, "res/v2/");
        assert_eq!(parsed.bundle_id, "css/all.css");
        assert_eq!(parsed.hash.as_deref(), Some("12"));
    }

    #[test]
    fn test_ambiguous_reading_follows_hash_state() {
        let ids = ["app.js", "app-fe.js"];
        let unhashed = |reading: &BundlePath| {
            ids.contains(&reading.bundle_id.as_str())
                .then_some(reading.hash.is_none())
        };
        let parsed = BundlePath::parse("app-fe.js", &[], unhashed).unwrap();
        assert_eq!(parsed.bundle_id, "app-fe.js");
        assert_eq!(parsed.hash, None);

        let hashed = |reading: &BundlePath| {
            ids.contains(&reading.bundle_id.as_str())
                .then_some(reading.hash.is_some())
        };
        let parsed = BundlePath::parse("app-fe.js", &[], hashed).unwrap();
        assert_eq!(parsed.bundle_id, "app.js");
        assert_eq!(parsed.hash.as_deref(), Some("fe"));
    }
}
