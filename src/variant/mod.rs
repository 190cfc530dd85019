//! Variant axes (locale, theme, browser class, ...) and their cross product.
//!
//! A bundle declares one [`VariantSet`] per variant type. The
//! [`VariantSpace`] of a bundle enumerates every combination of those
//! sets, plus the "no variant" entry that is always built.

mod set;
mod space;

use std::collections::BTreeMap;

pub use set::VariantSet;
pub use space::VariantSpace;

/// Separator between the values of a variant key, and between a bundle
/// name stem and its variant key.
pub const VARIANT_SEPARATOR: char = '@';

/// Well-known variant types.
pub const LOCALE: &str = "locale";
pub const BROWSER: &str = "browser";

/// One selection across variant axes: `variant type -> chosen value`.
///
/// Ordered by type so iteration matches the canonical key order.
pub type VariantMap = BTreeMap<String, String>;

/// Canonical, order-independent encoding of a variant map.
///
/// Values are joined by `@` in variant-type order. The empty map encodes
/// as `""`, the "no variant" key.
pub fn variant_key(variants: &VariantMap) -> String {
    let values: Vec<&str> = variants.values().map(String::as_str).collect();
    values.join(&VARIANT_SEPARATOR.to_string())
}

/// Name under which the content of one variant is stored.
///
/// `main.js` + `fr@dark` gives `main@fr@dark.js`. Generated resources keep
/// their full name and get the key appended.
pub fn variant_bundle_name(name: &str, key: &str, generated: bool) -> String {
    if key.is_empty() {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(idx) if !generated && idx > name.rfind('/').map_or(0, |s| s + 1) => {
            format!("{}{VARIANT_SEPARATOR}{key}{}", &name[..idx], &name[idx..])
        }
        _ => format!("{name}{VARIANT_SEPARATOR}{key}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> VariantMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_variant_key_is_order_independent() {
        let a = map(&[("theme", "dark"), ("locale", "fr")]);
        let b = map(&[("locale", "fr"), ("theme", "dark")]);
        assert_eq!(variant_key(&a), "fr@dark");
        assert_eq!(variant_key(&a), variant_key(&b));
        assert_eq!(variant_key(&VariantMap::new()), "");
    }

    #[test]
    fn test_variant_key_keeps_empty_values() {
        let m = map(&[("locale", ""), ("theme", "light")]);
        assert_eq!(variant_key(&m), "@light");
    }

    #[test]
    fn test_variant_bundle_name() {
        assert_eq!(variant_bundle_name("main.js", "fr@dark", false), "main@fr@dark.js");
        assert_eq!(variant_bundle_name("main.js", "", false), "main.js");
        assert_eq!(variant_bundle_name("lib/main", "fr", false), "lib/main@fr");
        assert_eq!(variant_bundle_name("v1.2/main", "fr", false), "v1.2/main@fr");
        assert_eq!(
            variant_bundle_name("messages:app", "fr", true),
            "messages:app@fr"
        );
    }
}
