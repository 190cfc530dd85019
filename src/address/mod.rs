//! Bundle request addresses.
//!
//! A served bundle is addressed by a request path that carries its prefix,
//! id, variant key and content hash. This module parses and emits that path
//! and classifies a request against the currently published hashes.
//!
//! # Architecture
//!
//! ```text
//! request path                    bundle set
//! ============                    ==========
//! res/js/main@fr-1a2b.js   ->     js/main.js  hashes["fr"] == "1a2b" ?
//!                                   yes -> Valid
//!                                   no  -> Invalid
//!                          ->     (no such bundle/variant) -> Unknown
//! ```

mod path;
mod validator;

pub use path::BundlePath;
pub use validator::{Validity, classify, parse_request, request_path};
