//! Small standalone utilities that ship alongside the cache.

pub mod lines;
pub mod password;
pub mod random;
pub mod slices;
