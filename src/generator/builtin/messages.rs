use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::{BundlingError, Result};
use crate::generator::{Capability, Generated, Generator, GeneratorContext, Injection};
use crate::resource::ResourceReader;
use crate::utils::path::parent_dir;
use crate::variant::{LOCALE, VariantSet, VariantSpace};

const PROPERTIES_EXT: &str = ".properties";

/// Turns `messages:i18n/app` into a JavaScript object built from
/// `i18n/app.properties`, overlaid with the files of the requested locale
/// (`app_fr.properties`, then `app_fr_CA.properties`).
#[derive(Default)]
pub struct MessagesGenerator {
    reader: Option<Arc<dyn ResourceReader>>,
}

impl MessagesGenerator {
    fn base(path: &str) -> &str {
        path.strip_suffix(PROPERTIES_EXT).unwrap_or(path)
    }
}

impl Generator for MessagesGenerator {
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ReaderAware, Capability::VariantProvider]
    }

    fn inject(&mut self, injection: Injection<'_>) {
        if let Injection::Reader(reader) = injection {
            self.reader = Some(reader);
        }
    }

    fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated> {
        let base = Self::base(ctx.path);
        let mut files = vec![format!("{base}{PROPERTIES_EXT}")];
        if let Some(locale) = ctx.locale() {
            let mut suffix = String::new();
            for part in locale.split('_') {
                suffix.push('_');
                suffix.push_str(part);
                files.push(format!("{base}{suffix}{PROPERTIES_EXT}"));
            }
        }

        let mut messages = Map::new();
        let mut linked = Vec::new();
        for (idx, file) in files.iter().enumerate() {
            let content = match ctx.reader.get_resource(file) {
                Ok(content) => content,
                // Only the base file is mandatory
                Err(BundlingError::NotFound(_)) if idx > 0 => continue,
                Err(e) => return Err(e),
            };
            for (key, value) in parse_properties(&content) {
                messages.insert(key, Value::String(value));
            }
            linked.extend(ctx.reader.real_path(file));
        }

        let json = serde_json::to_string(&Value::Object(messages))
            .map_err(|e| BundlingError::generator("messages", ctx.full_path, e))?;
        Ok(Generated::new(format!("var messages = {json};\n")).with_linked(linked))
    }

    /// Locales for which a `<base>_<locale>.properties` file exists. The
    /// default locale is the base file, encoded as `""`.
    fn available_variants(&self, path: &str) -> VariantSpace {
        let Some(reader) = &self.reader else {
            return VariantSpace::new();
        };
        let base = Self::base(path);
        let stem = base.rsplit('/').next().unwrap_or(base);
        let Ok(names) = reader.list_resource_names(parent_dir(base)) else {
            return VariantSpace::new();
        };

        let prefix = format!("{stem}_");
        let locales: Vec<String> = names
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix)?.strip_suffix(PROPERTIES_EXT))
            .map(str::to_string)
            .collect();
        if locales.is_empty() {
            return VariantSpace::new();
        }
        [VariantSet::new(LOCALE, "", locales)].into_iter().collect()
    }
}

/// Minimal `.properties` reader: `key=value` or `key: value`, `#`/`!`
/// comments.
fn parse_properties(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            Some((
                line[..idx].trim().to_string(),
                line[idx + 1..].trim().to_string(),
            ))
        })
        .collect()
}
