//! Minification for JS and CSS bundles.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. License comments are
//! lifted out before minifying and put back on top afterwards.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::PostProcessor;
use super::license::{extract_licenses, prepend_licenses};
use crate::bundle::BundleProcessingStatus;
use crate::core::{ResourceType, Result};
use crate::debug;

pub const NAME: &str = "minify";

/// Minify a classic (non-module) script.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    // Bundles are concatenated browser scripts, not ES modules
    let source_type = SourceType::cjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

/// Minify by resource type. `None` if the content does not parse.
pub fn minify(resource_type: ResourceType, content: &str) -> Option<String> {
    match resource_type {
        ResourceType::Js => minify_js(content),
        ResourceType::Css => minify_css(content),
        ResourceType::Binary => None,
    }
}

pub struct MinifyPostProcessor;

impl PostProcessor for MinifyPostProcessor {
    fn name(&self) -> &str {
        NAME
    }

    fn post_process(
        &self,
        status: &mut BundleProcessingStatus<'_>,
        content: String,
    ) -> Result<String> {
        // Debug output stays readable; searching output is discarded anyway
        if !status.mode.is_bundle() || status.is_searching_variants() {
            return Ok(content);
        }

        let (licenses, body) = extract_licenses(&content);
        match minify(status.bundle.resource_type, &body) {
            Some(mut minified) => {
                if !minified.ends_with('\n') {
                    minified.push('\n');
                }
                Ok(prepend_licenses(&licenses, &minified))
            }
            None => {
                debug!("minify"; "kept `{}` unminified: content did not parse",
                    status.last_path_added);
                Ok(content)
            }
        }
    }
}
