//! Test support for the arbor workspace.
//!
//! Seedable relation generators and the brute-force search oracle that
//! exactness tests compare against. Dev-dependency only; nothing here is
//! part of the public substrate.

mod generators;
mod reference;

pub use generators::{clustered_relation, random_relation};
pub use reference::{linear_knn, linear_range};
