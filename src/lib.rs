//! chm_hash — CHM (Czech–Havas–Majewski) minimal perfect hashing.
//!
//! - Build once on an ordered set of **unique** keys (bytes/str).
//! - O(key length) lookups: key -> unique index in `[0..n)`, verified against
//!   the stored key table so non-members miss instead of aliasing.
//! - Robust: if a candidate salt pair induces a cyclic graph, we retry with
//!   fresh salts and grow the vertex table once the per-size budget is spent.

mod chm;
pub use chm::{BuildConfig, Builder, MphError, Mphf};

pub mod codegen;

mod graph;
mod hash;
mod util;
