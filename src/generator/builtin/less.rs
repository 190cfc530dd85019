use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::core::Result;
use crate::generator::{
    Capability, Generated, Generator, GeneratorCache, GeneratorContext, Injection, cache_key,
};
use crate::resource::ResourceReader;
use crate::utils::path::{join, parent_dir};

/// `@import "file";` or `@import url("file");`
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import[ \t]+(?:url\([ \t]*)?["']([^"']+)["'][ \t]*\)?[ \t]*;"#).unwrap()
});

/// Flattens `.less` stylesheets by inlining their imports.
///
/// Output is cached through [`GeneratorCache`] with every visited file as a
/// dependency, and the mapping is persisted after each bundling pass.
pub struct LessGenerator {
    working_dir: Option<PathBuf>,
    use_cache: bool,
    cache: GeneratorCache,
}

impl Default for LessGenerator {
    fn default() -> Self {
        Self {
            working_dir: None,
            use_cache: false,
            cache: GeneratorCache::disabled("less"),
        }
    }
}

impl LessGenerator {
    fn compile(&self, reader: &dyn ResourceReader, path: &str) -> Result<Generated> {
        let mut seen = FxHashSet::default();
        let mut linked = Vec::new();
        let content = inline_imports(reader, path, &mut seen, &mut linked)?;
        Ok(Generated::new(content).with_linked(linked))
    }
}

impl Generator for LessGenerator {
    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::WorkingDirAware,
            Capability::PostInit,
            Capability::LifeCycle,
        ]
    }

    fn inject(&mut self, injection: Injection<'_>) {
        if let Injection::WorkingDir { dir, use_cache } = injection {
            self.working_dir = Some(dir.to_path_buf());
            self.use_cache = use_cache;
        }
    }

    fn after_properties_set(&mut self) -> Result<()> {
        if self.use_cache
            && let Some(dir) = &self.working_dir
        {
            self.cache = GeneratorCache::open(dir, "less");
        }
        Ok(())
    }

    fn after_bundling(&self) {
        self.cache.flush();
    }

    fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated> {
        let key = cache_key(ctx.full_path, ctx.variants);
        self.cache
            .get_or_generate(&key, ctx.mode, || self.compile(ctx.reader, ctx.path))
    }
}

/// Recursively replace imports of `.less` files with their content.
///
/// Plain `.css` imports are left in place; a file already inlined once is
/// skipped.
fn inline_imports(
    reader: &dyn ResourceReader,
    path: &str,
    seen: &mut FxHashSet<String>,
    linked: &mut Vec<PathBuf>,
) -> Result<String> {
    seen.insert(path.to_string());
    let content = reader.get_resource(path)?;
    linked.extend(reader.real_path(path));

    let dir = parent_dir(path);
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in IMPORT.captures_iter(&content) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let target = target.as_str();
        if target.ends_with(".css") {
            continue;
        }
        out.push_str(&content[last..whole.start()]);
        last = whole.end();

        let file = if target.ends_with(".less") {
            join(dir, target)
        } else {
            join(dir, &format!("{target}.less"))
        };
        if seen.contains(&file) {
            continue;
        }
        let imported = inline_imports(reader, &file, seen, linked)?;
        out.push_str(imported.trim_end_matches('\n'));
    }
    out.push_str(&content[last..]);
    Ok(out)
}
