//! Rewrites relative `url(...)` references in stylesheets.
//!
//! A member's relative URLs point next to the member file. Once joined, the
//! stylesheet is served from the bundle's location instead, so every
//! relative reference is rebased onto the bundle directory.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::PostProcessor;
use crate::bundle::{BundleProcessingStatus, ProcessingPhase};
use crate::core::{ResourceType, Result};
use crate::utils::path::{join, normalize, parent_dir, relative_to, strip_generator_prefix};

pub const NAME: &str = "css-url-rewriter";

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\([ \t]*(['"]?)([^'")]*)(['"]?)[ \t]*\)"#).unwrap()
});

fn is_absolute_url(url: &str) -> bool {
    url.is_empty()
        || url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with("data:")
        || url.contains("://")
}

/// Rebase every relative URL of `css` from `member_dir` onto `served_dir`.
pub fn rewrite_urls(css: &str, member_dir: &str, served_dir: &str) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures<'_>| {
            let url = caps[2].trim();
            if is_absolute_url(url) {
                return caps[0].to_string();
            }
            let target = join(member_dir, url);
            let quote = &caps[1];
            format!("url({quote}{}{quote})", relative_to(served_dir, &target))
        })
        .into_owned()
}

pub struct CssUrlRewriter;

impl PostProcessor for CssUrlRewriter {
    fn name(&self) -> &str {
        NAME
    }

    fn post_process(
        &self,
        status: &mut BundleProcessingStatus<'_>,
        content: String,
    ) -> Result<String> {
        // Only members carry a location to rebase from
        if status.bundle.resource_type != ResourceType::Css
            || status.phase != ProcessingPhase::File
        {
            return Ok(content);
        }

        let member = strip_generator_prefix(&status.last_path_added);
        let member_dir = parent_dir(&normalize(member)).to_string();
        let bundle = status.bundle;
        let served_dir = normalize(&format!("{}{}", bundle.prefix, parent_dir(&bundle.id)));
        if member_dir == served_dir {
            return Ok(content);
        }
        Ok(rewrite_urls(&content, &member_dir, &served_dir))
    }
}
