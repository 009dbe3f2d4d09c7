//! Cache implementations for selectors.

mod selector_cache;

pub use selector_cache::{SelectorCache, SelectorKey};
