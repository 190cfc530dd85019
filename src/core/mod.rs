//! Core types - pure abstractions shared across the codebase.

mod cancel;
mod driver;
mod error;
mod kind;
mod state;

pub use cancel::{BuildContext, CancelToken};
pub use driver::Mode;
pub use error::{BundlingError, Result};
pub use kind::ResourceType;
pub use state::setup_shutdown_handler;
