//! Resolution of virtual paths to generators.
//!
//! Custom registrations are consulted first, then the built-in generators
//! for the resource type, which are only instantiated the first time a path
//! needs them.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::{
    Capability, Generated, Generator, GeneratorContext, GeneratorFactory, Injection, Resolver,
    builtin,
};
use crate::core::{BundlingError, Mode, ResourceType, Result};
use crate::{debug, log};
use crate::resource::ResourceReader;
use crate::variant::{VariantMap, VariantSpace};

/// Shared dependencies injected into generators.
#[derive(Clone)]
pub struct GeneratorEnv {
    pub reader: Arc<dyn ResourceReader>,
    pub classpath: Vec<PathBuf>,
    pub working_dir: PathBuf,
    pub use_cache: bool,
}

/// A generator selected for one path.
pub struct Resolution {
    pub name: String,
    pub generator: Arc<dyn Generator>,
    /// Path handed to the generator.
    pub resource_path: String,
    /// Resolution of the remainder of a prefixed path, if it is generated too.
    pub chained: Option<Box<Resolution>>,
}

impl Resolution {
    /// Run the generator against `reader`.
    pub fn generate(
        &self,
        full_path: &str,
        variants: &VariantMap,
        mode: Mode,
        reader: &dyn ResourceReader,
    ) -> Result<Generated> {
        let ctx = GeneratorContext {
            path: &self.resource_path,
            full_path,
            variants,
            mode,
            reader,
            chained: self.chained.as_deref(),
        };
        self.generator.create_resource(&ctx)
    }
}

struct Registration {
    resolver: Resolver,
    name: String,
    generator: Arc<dyn Generator>,
}

struct BuiltinSlot {
    resolver: Resolver,
    name: &'static str,
    instance: Mutex<Option<Arc<dyn Generator>>>,
}

/// Generator registry for one resource type.
pub struct GeneratorRegistry {
    resource_type: ResourceType,
    env: GeneratorEnv,
    factories: RwLock<FxHashMap<String, GeneratorFactory>>,
    custom: RwLock<Vec<Registration>>,
    builtins: Vec<BuiltinSlot>,
    listeners: RwLock<Vec<Arc<dyn Generator>>>,
}

impl GeneratorRegistry {
    pub fn new(resource_type: ResourceType, env: GeneratorEnv) -> Self {
        let builtins = builtin::defaults(resource_type)
            .into_iter()
            .map(|(resolver, name)| BuiltinSlot {
                resolver,
                name,
                instance: Mutex::new(None),
            })
            .collect();

        Self {
            resource_type,
            env,
            factories: RwLock::new(builtin::factories()),
            custom: RwLock::new(Vec::new()),
            builtins,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Make a factory available to [`register_named`](Self::register_named).
    #[cfg(test)]
    pub fn add_factory(&self, name: impl Into<String>, factory: GeneratorFactory) {
        self.factories.write().insert(name.into(), factory);
    }

    /// Register a generator from the named-factory table.
    pub fn register_named(&self, resolver: Resolver, name: &str) -> Result<()> {
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BundlingError::NoGenerator(name.to_string()))?;
        self.register(resolver, name, factory)
    }

    /// Register a generator under `resolver`.
    ///
    /// The generator identity is `name`. Registering the same identity under
    /// the same resolver again is a no-op; an overlapping resolver owned by a
    /// different identity is a [`BundlingError::ResolverCollision`].
    pub fn register(&self, resolver: Resolver, name: &str, factory: GeneratorFactory) -> Result<()> {
        let mut custom = self.custom.write();
        for existing in custom.iter().filter(|r| r.resolver.overlaps(&resolver)) {
            if existing.name != name {
                return Err(BundlingError::ResolverCollision {
                    resolver: resolver.to_string(),
                    existing: existing.name.clone(),
                    incoming: name.to_string(),
                });
            }
            if existing.resolver == resolver {
                return Ok(());
            }
        }

        for slot in self.builtins.iter().filter(|s| s.resolver.overlaps(&resolver)) {
            if slot.name != name {
                log!("warn"; "generator `{}` overrides built-in generator `{}` for `{}`",
                    name, slot.name, resolver);
            }
        }

        let generator = self.instantiate(factory)?;
        debug!("generator"; "registered `{}` for `{}` ({})", name, resolver, self.resource_type);
        custom.push(Registration {
            resolver,
            name: name.to_string(),
            generator,
        });
        Ok(())
    }

    /// Build and wire a generator according to its capabilities.
    fn instantiate(&self, factory: GeneratorFactory) -> Result<Arc<dyn Generator>> {
        let mut generator = factory();
        let capabilities = generator.capabilities();

        for capability in capabilities {
            match capability {
                Capability::TypeAware => generator.inject(Injection::Type(self.resource_type)),
                Capability::ReaderAware => {
                    generator.inject(Injection::Reader(Arc::clone(&self.env.reader)));
                }
                Capability::ClasspathAware => {
                    generator.inject(Injection::Classpath(&self.env.classpath));
                }
                Capability::WorkingDirAware => generator.inject(Injection::WorkingDir {
                    dir: &self.env.working_dir,
                    use_cache: self.env.use_cache,
                }),
                _ => {}
            }
        }
        if capabilities.contains(&Capability::PostInit) {
            generator.after_properties_set()?;
        }

        let generator: Arc<dyn Generator> = Arc::from(generator);
        if capabilities.contains(&Capability::LifeCycle) {
            self.listeners.write().push(Arc::clone(&generator));
        }
        Ok(generator)
    }

    fn find(&self, path: &str) -> Option<(Resolver, String, Arc<dyn Generator>)> {
        if let Some(r) = self.custom.read().iter().find(|r| r.resolver.matches(path)) {
            return Some((r.resolver.clone(), r.name.clone(), Arc::clone(&r.generator)));
        }

        let slot = self.builtins.iter().find(|s| s.resolver.matches(path))?;
        let mut instance = slot.instance.lock();
        if instance.is_none() {
            let factory = self.factories.read().get(slot.name).cloned()?;
            match self.instantiate(factory) {
                Ok(generator) => *instance = Some(generator),
                Err(e) => {
                    log!("error"; "failed to initialize generator `{}`: {}", slot.name, e);
                    return None;
                }
            }
        }
        let generator = instance.as_ref().map(Arc::clone)?;
        Some((slot.resolver.clone(), slot.name.to_string(), generator))
    }

    /// Find the generator for a path, following prefix chains.
    pub fn resolve(&self, path: &str) -> Option<Resolution> {
        let (resolver, name, generator) = self.find(path)?;
        let resource_path = resolver.resource_path(path).to_string();
        let chained = if resolver.is_prefix() {
            self.resolve(&resource_path).map(Box::new)
        } else {
            None
        };
        Some(Resolution {
            name,
            generator,
            resource_path,
            chained,
        })
    }

    pub fn is_generated(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    pub fn is_handling_embedded_image(&self, path: &str) -> bool {
        self.find(path)
            .is_some_and(|(_, _, g)| g.has(Capability::CssImage))
    }

    pub fn is_generated_binary(&self, path: &str) -> bool {
        self.find(path)
            .is_some_and(|(_, _, g)| g.has(Capability::Binary))
    }

    /// Variants a generator declares for a path.
    pub fn available_variants(&self, path: &str) -> VariantSpace {
        match self.find(path) {
            Some((resolver, _, g)) if g.has(Capability::VariantProvider) => {
                g.available_variants(resolver.resource_path(path))
            }
            _ => VariantSpace::new(),
        }
    }

    pub fn before_bundling(&self) {
        for listener in self.listeners.read().iter() {
            listener.before_bundling();
        }
    }

    pub fn after_bundling(&self) {
        for listener in self.listeners.read().iter() {
            listener.after_bundling();
        }
    }
}

/// The registries of every resource type, sharing one environment.
pub struct GeneratorRegistries {
    registries: Vec<GeneratorRegistry>,
}

impl GeneratorRegistries {
    pub fn new(env: GeneratorEnv) -> Self {
        let registries = ResourceType::ALL
            .into_iter()
            .map(|rt| GeneratorRegistry::new(rt, env.clone()))
            .collect();
        Self { registries }
    }

    pub fn get(&self, resource_type: ResourceType) -> &GeneratorRegistry {
        let idx = ResourceType::ALL
            .iter()
            .position(|&rt| rt == resource_type)
            .unwrap_or(0);
        &self.registries[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorRegistry> {
        self.registries.iter()
    }

    /// Register a named factory for several resource types at once.
    pub fn register_named(
        &self,
        types: &[ResourceType],
        resolver: &Resolver,
        name: &str,
    ) -> Result<()> {
        for &rt in types {
            self.get(rt).register_named(resolver.clone(), name)?;
        }
        Ok(())
    }

    pub fn before_bundling(&self) {
        self.registries.iter().for_each(GeneratorRegistry::before_bundling);
    }

    pub fn after_bundling(&self) {
        self.registries.iter().for_each(GeneratorRegistry::after_bundling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FsResourceReader;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Echo(&'static str);

    impl Generator for Echo {
        fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated> {
            Ok(Generated::new(format!("{}:{}", self.0, ctx.path)))
        }
    }

    fn echo(tag: &'static str) -> GeneratorFactory {
        Arc::new(move || Box::new(Echo(tag)) as Box<dyn Generator>)
    }

    fn registry(dir: &TempDir, resource_type: ResourceType) -> GeneratorRegistry {
        GeneratorRegistry::new(
            resource_type,
            GeneratorEnv {
                reader: Arc::new(FsResourceReader::new(dir.path())),
                classpath: Vec::new(),
                working_dir: dir.path().join(".sheaf"),
                use_cache: false,
            },
        )
    }

    #[test]
    fn test_collision_between_different_generators() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Js);
        reg.register(Resolver::prefix("tpl"), "tpl", echo("a")).unwrap();

        let err = reg
            .register(Resolver::prefix("tpl"), "other", echo("b"))
            .unwrap_err();
        assert!(matches!(err, BundlingError::ResolverCollision { .. }));

        let err = reg
            .register(Resolver::suffix("js"), "x", echo("x"))
            .and_then(|_| reg.register(Resolver::suffix("min.js"), "y", echo("y")))
            .unwrap_err();
        assert!(matches!(err, BundlingError::ResolverCollision { .. }));
    }

    #[test]
    fn test_same_generator_registration_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Js);
        reg.register(Resolver::prefix("tpl"), "tpl", echo("a")).unwrap();
        reg.register(Resolver::prefix("tpl"), "tpl", echo("a")).unwrap();
        assert_eq!(reg.custom.read().len(), 1);
    }

    #[test]
    fn test_custom_shadows_builtin() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Css);
        assert_eq!(reg.resolve("theme.less").unwrap().name, "less");

        reg.register(Resolver::suffix("less"), "my-less", echo("m")).unwrap();
        assert_eq!(reg.resolve("theme.less").unwrap().name, "my-less");
    }

    #[test]
    fn test_prefix_resolution_chains() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Css);
        let resolution = reg.resolve("jar:skin/theme.less").unwrap();
        assert_eq!(resolution.name, "jar");
        assert_eq!(resolution.resource_path, "skin/theme.less");
        let chained = resolution.chained.as_ref().unwrap();
        assert_eq!(chained.name, "less");

        assert!(reg.resolve("jar:skin/site.css").unwrap().chained.is_none());
    }

    #[test]
    fn test_classification_queries() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Js);
        assert!(reg.is_generated("messages:i18n/app"));
        assert!(!reg.is_generated("js/app.js"));
        assert!(!reg.is_generated("theme.less"));
        assert!(!reg.is_generated_binary("messages:i18n/app"));
        assert!(!reg.is_handling_embedded_image("js/app.js"));
    }

    #[test]
    fn test_builtins_instantiated_once() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        struct Counting;
        impl Generator for Counting {
            fn create_resource(&self, _ctx: &GeneratorContext<'_>) -> Result<Generated> {
                Ok(Generated::default())
            }
        }

        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Js);
        reg.add_factory(
            "messages",
            Arc::new(|| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Box::new(Counting) as Box<dyn Generator>
            }),
        );
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
        reg.resolve("messages:a");
        reg.resolve("messages:b");
        assert!(reg.is_generated("messages:c"));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_factory_name() {
        let dir = TempDir::new().unwrap();
        let reg = registry(&dir, ResourceType::Js);
        assert!(matches!(
            reg.register_named(Resolver::prefix("x"), "nope"),
            Err(BundlingError::NoGenerator(_))
        ));
    }
}
