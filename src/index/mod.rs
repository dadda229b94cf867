//! Lookup structure over the addresses already mapped in a region.

mod alias;
mod reference;

pub use alias::AliasMap;
pub use reference::{expand_range, housenumber_key, ReferenceAddress, ReferenceIndex};
