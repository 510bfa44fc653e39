//! Transformation module.
//!
//! - Normalize: typed casting, renames, list wrapping and defaults
//! - Partition: group records by shop
//! - Pipeline: parse through aggregate for one upload

pub mod normalize;
pub mod partition;
pub mod pipeline;

pub use normalize::normalize;
pub use partition::partition_by_shop;
pub use pipeline::*;
