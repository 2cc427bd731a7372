#![allow(dead_code)]

use std::sync::Arc;

use drill_core::{Catalog, Opening, Square};

/// Parse a square name, panicking on typos in test data.
pub fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

/// A line from the built-in catalog.
pub fn builtin(id: &str) -> Arc<Opening> {
    Catalog::builtin().get(id).unwrap()
}

/// Ids of every built-in line.
pub fn builtin_ids() -> Vec<String> {
    Catalog::builtin().iter().map(|o| o.id.clone()).collect()
}
