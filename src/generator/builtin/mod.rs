//! Generators available without registration.
//!
//! Their content algorithms are intentionally small: the interesting part
//! is how they plug into resolution, variants and caching.

mod classpath;
mod less;
mod messages;

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use classpath::ClasspathGenerator;
pub use less::LessGenerator;
pub use messages::MessagesGenerator;

use super::{Generator, GeneratorFactory, Resolver};
use crate::core::ResourceType;

pub const CLASSPATH_PREFIX: &str = "jar";
pub const MESSAGES_PREFIX: &str = "messages";
pub const LESS_SUFFIX: &str = "less";

/// Named-factory table, seeded with the built-in generators.
pub fn factories() -> FxHashMap<String, GeneratorFactory> {
    let mut table: FxHashMap<String, GeneratorFactory> = FxHashMap::default();
    table.insert(
        CLASSPATH_PREFIX.into(),
        Arc::new(|| Box::new(ClasspathGenerator::default()) as Box<dyn Generator>),
    );
    table.insert(
        MESSAGES_PREFIX.into(),
        Arc::new(|| Box::new(MessagesGenerator::default()) as Box<dyn Generator>),
    );
    table.insert(
        LESS_SUFFIX.into(),
        Arc::new(|| Box::new(LessGenerator::default()) as Box<dyn Generator>),
    );
    table
}

/// Built-in resolvers of a resource type, with the factory behind each.
pub fn defaults(resource_type: ResourceType) -> Vec<(Resolver, &'static str)> {
    let mut resolvers = vec![(Resolver::prefix(CLASSPATH_PREFIX), CLASSPATH_PREFIX)];
    match resource_type {
        ResourceType::Js => resolvers.push((Resolver::prefix(MESSAGES_PREFIX), MESSAGES_PREFIX)),
        ResourceType::Css => resolvers.push((Resolver::suffix(LESS_SUFFIX), LESS_SUFFIX)),
        ResourceType::Binary => {}
    }
    resolvers
}
