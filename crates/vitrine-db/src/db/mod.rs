//! Document store backends and shared types.

pub mod document;
pub mod memory;
pub mod merge;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod transaction;
