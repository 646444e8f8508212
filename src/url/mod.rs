//! URL handling module
//!
//! This module provides URL normalization, origin helpers and the
//! include/exclude glob filter applied to discovered URLs.

mod matcher;
mod normalize;
mod origin;

pub use matcher::PatternFilter;
pub use normalize::{dedup_key, normalize_parsed, normalize_url};
pub use origin::{host_of, origin_join, origin_of, same_origin};
