//! Command-line interface module.
//!
//! Every command goes through [`Runtime::new`], which wires the reader,
//! generator registries, store and bundle set from the loaded configuration.

mod args;
pub mod build;
pub mod check;
pub mod paths;
pub mod watch;

pub use args::{BuildArgs, Cli, Commands};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bundle::build_bundles;
use crate::config::SheafConfig;
use crate::core::{CancelToken, ResourceType};
use crate::debug;
use crate::engine::{BundlingEngine, DefaultProcessors};
use crate::generator::{GeneratorEnv, GeneratorRegistries};
use crate::postprocess::{parse_chain, parse_global_chain};
use crate::rebuild::RebuildCoordinator;
use crate::resource::{FsResourceReader, ResourceReader};
use crate::store::{BundleStore, FsBundleStore, MemoryBundleStore};
use crate::utils::plural_count;

/// Fully wired bundling runtime for one configuration.
pub struct Runtime<'a> {
    pub config: &'a SheafConfig,
    pub coordinator: RebuildCoordinator,
}

impl<'a> Runtime<'a> {
    pub fn new(config: &'a SheafConfig, shutdown: CancelToken) -> Result<Self> {
        let reader: Arc<dyn ResourceReader> = Arc::new(FsResourceReader::new(&config.build.root));

        let registries = GeneratorRegistries::new(GeneratorEnv {
            reader: Arc::clone(&reader),
            classpath: config.generator.classpath.clone(),
            working_dir: config.build.working_dir.clone(),
            use_cache: config.generator.cache && !config.build.dry_run,
        });
        for custom in &config.generator.custom {
            let Some(resolver) = custom.resolver() else {
                continue;
            };
            let types: Vec<ResourceType> = ResourceType::ALL
                .into_iter()
                .filter(|&rt| custom.applies_to(rt))
                .collect();
            registries
                .register_named(&types, &resolver, &custom.name)
                .with_context(|| format!("registering generator `{}`", custom.name))?;
        }

        let bundles = Arc::new(build_bundles(config, &registries)?);
        debug!("build"; "configured {}", plural_count(bundles.len(), "bundle"));

        let store: Arc<dyn BundleStore> = if config.build.dry_run {
            debug!("build"; "dry run, bundles stay in memory");
            Arc::new(MemoryBundleStore::new())
        } else {
            let store = FsBundleStore::new(&config.build.working_dir);
            if !config.build.use_bundle_mapping {
                store.clear().context("clearing the bundle store")?;
            }
            Arc::new(store)
        };

        let hasher = config
            .hash
            .enabled
            .then(|| config.hash.algorithm.hasher(config.hash.length));
        let defaults = DefaultProcessors {
            unitary: parse_chain(&config.postprocess.unitary)?,
            bundle: parse_chain(&config.postprocess.bundle)?,
            composite_unitary: parse_chain(&config.postprocess.composite_unitary)?,
            composite_bundle: parse_chain(&config.postprocess.composite_bundle)?,
        };

        let engine = BundlingEngine::new(reader, Arc::new(registries), store)
            .with_hasher(hasher)
            .with_defaults(defaults)
            .with_mode(config.mode());
        let mut global = parse_global_chain(&config.postprocess.global, &config.build.working_dir)?;
        if config.build.dry_run {
            global.clear();
        }
        let coordinator = global.into_iter().fold(
            RebuildCoordinator::new(engine, bundles, config.config_hash())
                .with_parallel(config.build.parallel)
                .with_shutdown(shutdown),
            RebuildCoordinator::with_global_processor,
        );

        Ok(Self {
            config,
            coordinator,
        })
    }

    /// Initial build, reusing the stored mapping when allowed.
    pub fn init(&self) -> Result<crate::rebuild::BuildReport> {
        Ok(self.coordinator.init(self.config.build.use_bundle_mapping)?)
    }
}
