//! Configuration management for `sheaf.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build] and [hash]
//! │   ├── bundle     # [[bundle]]
//! │   ├── generator  # [generator]
//! │   ├── postprocess# [postprocess]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError, ConfigDiagnostics
//! └── mod.rs         # SheafConfig (this file)
//! ```

mod error;
pub mod section;
mod util;

use util::{find_config_file, resolve_dir};

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    BuildConfig, BundleConfig, CustomGeneratorConfig, GeneratorConfig, HashConfig,
    PostprocessConfig, VariantConfig, WatchConfig,
};

use crate::cli::Cli;
use crate::core::{Mode, ResourceType};
use crate::freshness::compute_config_hash;
use crate::log;
use crate::utils::path::normalize_fs_path;
use anyhow::{Result, bail};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing sheaf.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheafConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Hash settings
    #[serde(default)]
    pub hash: HashConfig,

    /// Watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Default post-processor chains
    #[serde(default)]
    pub postprocess: PostprocessConfig,

    /// Bundle definitions
    #[serde(default)]
    pub bundle: Vec<BundleConfig>,
}

impl SheafConfig {
    /// Load configuration, searching upward from cwd for the config file.
    ///
    /// Directories are resolved relative to the config file's parent.
    pub fn load(cli: &Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            bail!(ConfigError::Validation(format!(
                "config file `{}` not found",
                cli.config.display()
            )));
        };

        let mut config = Self::from_path(&config_path)?;
        config.config_path = normalize_fs_path(&config_path);
        config.apply_cli(cli);

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warn"; "unknown fields in {} are ignored: {}", path.display(), ignored.join(", "));
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Apply command-line overrides.
    fn apply_cli(&mut self, cli: &Cli) {
        let args = cli.command.build_args();
        crate::logger::set_verbose(args.verbose);

        if let Some(root) = &cli.root {
            self.build.root = root.clone();
        }
        if args.debug {
            self.build.debug = true;
        }
        if args.clean {
            self.build.use_bundle_mapping = false;
        }
        if args.dry_run {
            self.build.dry_run = true;
        }
        if let Some(parallel) = args.parallel {
            self.build.parallel = parallel;
        }
        if let crate::cli::Commands::Watch {
            quiet: Some(quiet), ..
        } = &cli.command
        {
            self.watch.quiet_period_ms = *quiet;
        }
    }

    /// Resolve directories against the project root.
    pub fn finalize(&mut self, root: &Path) {
        self.build.root = resolve_dir(root, &self.build.root);
        self.build.working_dir = resolve_dir(root, &self.build.working_dir);
        self.generator.classpath = self
            .generator
            .classpath
            .iter()
            .map(|p| resolve_dir(root, p))
            .collect();
    }

    pub fn mode(&self) -> Mode {
        if self.build.debug {
            Mode::Debug
        } else {
            Mode::Bundle
        }
    }

    /// Hash over everything that affects bundle content.
    ///
    /// Watcher settings and paths are excluded so moving the project or
    /// tuning the debounce does not force a full rebuild.
    pub fn config_hash(&self) -> String {
        #[derive(Serialize)]
        struct Canonical<'a> {
            debug: bool,
            hash: &'a HashConfig,
            generator: Vec<&'a CustomGeneratorConfig>,
            postprocess: &'a PostprocessConfig,
            bundle: &'a [BundleConfig],
        }

        let canonical = Canonical {
            debug: self.build.debug,
            hash: &self.hash,
            generator: self.generator.custom.iter().collect(),
            postprocess: &self.postprocess,
            bundle: &self.bundle,
        };
        let dump = serde_json::to_string(&canonical).unwrap_or_default();
        compute_config_hash(&dump)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if !(1..=64).contains(&self.hash.length) {
            diag.error("hash.length", "must be between 1 and 64");
        }

        for (field, chain) in self.postprocess.chains() {
            Self::validate_chain(field, chain, &mut diag);
        }
        if let Err(e) =
            crate::postprocess::parse_global_chain(&self.postprocess.global, &self.build.working_dir)
        {
            diag.error("postprocess.global", e.to_string());
        }

        let factories = crate::generator::builtin::factories();
        for (i, custom) in self.generator.custom.iter().enumerate() {
            let field = format!("generator.custom[{i}]");
            if !factories.contains_key(&custom.name) {
                diag.error(&field, format!("unknown generator `{}`", custom.name));
            }
            if custom.resolver().is_none() {
                diag.error(&field, "exactly one of `prefix` or `suffix` must be set");
            }
        }

        self.validate_bundles(&mut diag);

        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    fn validate_chain(field: &str, chain: &str, diag: &mut ConfigDiagnostics) {
        if let Err(e) = crate::postprocess::parse_chain(chain) {
            diag.error(field, e.to_string());
        }
    }

    fn validate_bundles(&self, diag: &mut ConfigDiagnostics) {
        let ids: FxHashSet<&str> = self.bundle.iter().map(|b| b.id.as_str()).collect();
        let mut seen = FxHashSet::default();

        for (i, bundle) in self.bundle.iter().enumerate() {
            let field = format!("bundle[{i}]");
            if bundle.id.is_empty() {
                diag.error(&field, "`id` must not be empty");
                continue;
            }
            if bundle.id.contains(crate::variant::VARIANT_SEPARATOR) {
                diag.error(&field, format!("id `{}` must not contain `@`", bundle.id));
            }
            if !seen.insert(bundle.id.as_str()) {
                diag.error(&field, format!("duplicate bundle id `{}`", bundle.id));
            }

            match bundle.resolved_type() {
                None => diag.error(&field, "cannot infer `type` from the id, set it explicitly"),
                Some(ResourceType::Binary) => {
                    diag.error(&field, "binary resources are served individually, not bundled")
                }
                Some(_) => {}
            }

            match (bundle.members.is_empty(), bundle.children.is_empty()) {
                (false, false) => diag.error(&field, "set either `members` or `children`, not both"),
                (true, true) if bundle.production_url.is_none() && bundle.debug_members.is_empty() => {
                    diag.error(&field, "bundle has no `members` or `children`")
                }
                _ => {}
            }
            for child in &bundle.children {
                if !ids.contains(child.as_str()) {
                    diag.error(&field, format!("unknown child bundle `{child}`"));
                }
            }

            for (name, variant) in &bundle.variants {
                if variant.values.is_empty() {
                    diag.error(
                        format!("{field}.variants.{name}"),
                        "variant has no `values`",
                    );
                }
            }

            if let Some(chain) = &bundle.unitary {
                Self::validate_chain(&format!("{field}.unitary"), chain, diag);
            }
            if let Some(chain) = &bundle.postprocess {
                Self::validate_chain(&format!("{field}.postprocess"), chain, diag);
            }
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SheafConfig {
    let (parsed, ignored) = SheafConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
