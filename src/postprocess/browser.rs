//! Browser-conditional blocks.
//!
//! Content between `/* @browser ie6 */` and `/* @end */` only belongs to the
//! `ie6` variant of the `browser` type. The processor cannot know the
//! browsers up front, so it reveals them in the searching pass and then
//! keeps the matching blocks per variant.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::PostProcessor;
use crate::bundle::BundleProcessingStatus;
use crate::core::{BundlingError, Result};
use crate::variant::BROWSER;

pub const NAME: &str = "browser-conditional";

static BROWSER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)/\*[ \t]*@browser[ \t]+([A-Za-z0-9_.-]+)[ \t]*\*/[ \t]*\n?(.*?)/\*[ \t]*@end[ \t]*\*/[ \t]*\n?",
    )
    .unwrap()
});

static BROWSER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[ \t]*@browser[ \t]+[A-Za-z0-9_.-]+[ \t]*\*/").unwrap());

/// Every `@browser` marker must be closed by an `@end`.
fn check_balanced(content: &str) -> Result<()> {
    let opened = BROWSER_OPEN.find_iter(content).count();
    let closed = BROWSER_BLOCK.find_iter(content).count();
    if opened == closed {
        return Ok(());
    }
    Err(BundlingError::PostProcess {
        processor: NAME.to_string(),
        message: format!("{} unterminated `@browser` block(s)", opened - closed),
    })
}

pub struct BrowserConditionalPostProcessor;

impl PostProcessor for BrowserConditionalPostProcessor {
    fn name(&self) -> &str {
        NAME
    }

    fn is_variant_discovering(&self) -> bool {
        true
    }

    fn post_process(
        &self,
        status: &mut BundleProcessingStatus<'_>,
        content: String,
    ) -> Result<String> {
        if content.contains("@browser") {
            check_balanced(&content)?;
        }
        if status.is_searching_variants() {
            let found: Vec<String> = BROWSER_BLOCK
                .captures_iter(&content)
                .map(|caps| caps[1].to_string())
                .collect();
            for browser in found {
                status.add_discovered_variant(BROWSER, "", &browser);
            }
            return Ok(content);
        }

        if !BROWSER_BLOCK.is_match(&content) {
            return Ok(content);
        }
        let selected = status.variant(BROWSER).unwrap_or_default();
        Ok(BROWSER_BLOCK
            .replace_all(&content, |caps: &Captures<'_>| {
                if &caps[1] == selected {
                    caps[2].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Bundle;
    use crate::core::{Mode, ResourceType};
    use crate::variant::VariantMap;

    const CSS: &str = "a{color:red}\n/* @browser ie6 */\na{zoom:1}\n/* @end */\n/* @browser ie7 */\na{zoom:2}\n/* @end */\nb{margin:0}\n";

    #[test]
    fn test_search_reveals_browsers() {
        let bundle = Bundle::simple("a.css", ResourceType::Css, ["a.css"]);
        let mut status = BundleProcessingStatus::searching(&bundle, VariantMap::new(), Mode::Bundle);
        let out = BrowserConditionalPostProcessor
            .post_process(&mut status, CSS.into())
            .unwrap();
        assert_eq!(out, CSS);

        let found = status.discovered().get(BROWSER).unwrap();
        assert_eq!(found.default, "");
        assert_eq!(found.values, ["", "ie6", "ie7"]);
    }

    #[test]
    fn test_keeps_only_selected_block() {
        let bundle = Bundle::simple("a.css", ResourceType::Css, ["a.css"]);
        let variants = VariantMap::from([(BROWSER.to_string(), "ie6".to_string())]);
        let mut status = BundleProcessingStatus::new(&bundle, variants, Mode::Bundle);
        let out = BrowserConditionalPostProcessor
            .post_process(&mut status, CSS.into())
            .unwrap();
        assert_eq!(out, "a{color:red}\na{zoom:1}\nb{margin:0}\n");

        let mut status = BundleProcessingStatus::new(&bundle, VariantMap::new(), Mode::Bundle);
        let out = BrowserConditionalPostProcessor
            .post_process(&mut status, CSS.into())
            .unwrap();
        assert_eq!(out, "a{color:red}\nb{margin:0}\n");
    }

    #[test]
    fn test_unterminated_block_fails() {
        let bundle = Bundle::simple("a.css", ResourceType::Css, ["a.css"]);
        let mut status = BundleProcessingStatus::new(&bundle, VariantMap::new(), Mode::Bundle);
        let err = BrowserConditionalPostProcessor
            .post_process(&mut status, "/* @browser ie6 */\na{zoom:1}\n".into())
            .unwrap_err();
        assert!(matches!(err, BundlingError::PostProcess { ref processor, .. } if processor == NAME));
    }
}
