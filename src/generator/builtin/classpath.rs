use crate::core::{BundlingError, ResourceType, Result};
use crate::generator::{Capability, Generated, Generator, GeneratorContext, Injection};
use crate::resource::{FsResourceReader, ResourceReader};

/// Serves `jar:` paths from the configured classpath roots.
///
/// When the remainder of the path is itself generated (`jar:skin.less`),
/// the chained generator runs against the classpath root instead of the
/// main resource tree.
#[derive(Default)]
pub struct ClasspathGenerator {
    resource_type: Option<ResourceType>,
    roots: Vec<FsResourceReader>,
}

impl Generator for ClasspathGenerator {
    fn capabilities(&self) -> &'static [Capability] {
        match self.resource_type {
            Some(ResourceType::Css) => &[
                Capability::TypeAware,
                Capability::ClasspathAware,
                Capability::CssImage,
            ],
            Some(ResourceType::Binary) => &[
                Capability::TypeAware,
                Capability::ClasspathAware,
                Capability::Binary,
            ],
            _ => &[Capability::TypeAware, Capability::ClasspathAware],
        }
    }

    fn inject(&mut self, injection: Injection<'_>) {
        match injection {
            Injection::Type(t) => self.resource_type = Some(t),
            Injection::Classpath(roots) => {
                self.roots = roots.iter().map(FsResourceReader::new).collect();
            }
            _ => {}
        }
    }

    fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated> {
        for root in &self.roots {
            let result = match ctx.chained {
                Some(chained) => chained.generate(ctx.path, ctx.variants, ctx.mode, root),
                None => root.get_resource(ctx.path).map(|content| {
                    Generated::new(content).with_linked(root.real_path(ctx.path))
                }),
            };
            match result {
                Err(BundlingError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(BundlingError::NotFound(ctx.full_path.to_string()))
    }
}
