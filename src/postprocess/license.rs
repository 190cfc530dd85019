//! Hoists `/*! ... */` license comments to the top of the content.

use std::sync::LazyLock;

use regex::Regex;

use super::PostProcessor;
use crate::bundle::BundleProcessingStatus;
use crate::core::Result;

pub const NAME: &str = "license";

static LICENSE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*!.*?\*/[ \t]*\n?").unwrap());

/// Split content into its license comments (deduplicated, in order of
/// appearance) and the remaining body.
pub fn extract_licenses(content: &str) -> (Vec<String>, String) {
    let mut licenses: Vec<String> = Vec::new();
    for m in LICENSE_COMMENT.find_iter(content) {
        let comment = m.as_str().trim_end().to_string();
        if !licenses.contains(&comment) {
            licenses.push(comment);
        }
    }
    if licenses.is_empty() {
        return (licenses, content.to_string());
    }
    let body = LICENSE_COMMENT.replace_all(content, "").into_owned();
    (licenses, body)
}

/// Prepend license comments to a body.
pub fn prepend_licenses(licenses: &[String], body: &str) -> String {
    if licenses.is_empty() {
        return body.to_string();
    }
    let mut out = licenses.join("\n");
    out.push('\n');
    out.push_str(body);
    out
}

pub struct LicensePostProcessor;

impl PostProcessor for LicensePostProcessor {
    fn name(&self) -> &str {
        NAME
    }

    fn post_process(
        &self,
        _status: &mut BundleProcessingStatus<'_>,
        content: String,
    ) -> Result<String> {
        let (licenses, body) = extract_licenses(&content);
        Ok(prepend_licenses(&licenses, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Bundle;
    use crate::core::{Mode, ResourceType};
    use crate::variant::VariantMap;

    #[test]
    fn test_licenses_hoisted_and_deduplicated() {
        let content = "var a;\n/*! lib v1 (MIT) */\nvar b;\n/* plain */\n/*! lib v1 (MIT) */\nvar c;\n";
        let bundle = Bundle::simple("a.js", ResourceType::Js, ["a.js"]);
        let mut status = BundleProcessingStatus::new(&bundle, VariantMap::new(), Mode::Bundle);
        let out = LicensePostProcessor
            .post_process(&mut status, content.into())
            .unwrap();
        assert_eq!(out, "/*! lib v1 (MIT) */\nvar a;\nvar b;\n/* plain */\nvar c;\n");
    }

    #[test]
    fn test_no_licenses_is_identity() {
        let (licenses, body) = extract_licenses("a{color:red}");
        assert!(licenses.is_empty());
        assert_eq!(body, "a{color:red}");
    }
}
