//! Configuration section definitions.
//!
//! Each module corresponds to a section in `sheaf.toml`:
//!
//! | Module        | TOML Section     | Purpose                               |
//! |---------------|------------------|---------------------------------------|
//! | `build`       | `[build]`        | Resource root, working dir, modes     |
//! | `build`       | `[hash]`         | Cache-busting hash algorithm          |
//! | `watch`       | `[watch]`        | Filesystem watcher and debounce       |
//! | `generator`   | `[generator]`    | Generator cache and registrations     |
//! | `postprocess` | `[postprocess]`  | Default post-processor chains         |
//! | `bundle`      | `[[bundle]]`     | Bundle definitions                    |

mod build;
mod bundle;
mod generator;
mod postprocess;
mod watch;

// Re-export section configs
pub use build::{BuildConfig, HashConfig};
pub use bundle::{BundleConfig, VariantConfig};
pub use generator::{CustomGeneratorConfig, GeneratorConfig};
pub use postprocess::PostprocessConfig;
pub use watch::WatchConfig;
