//! Vitrine document store
//!
//! Schemaless JSON documents grouped into named collections, with server-assigned ids
//! and timestamps. The upload, post, and profile services persist their records
//! through the [`DocumentStore`] trait; Postgres (JSONB) and in-memory backends are
//! provided.

pub mod db;
pub mod factory;

pub use db::document::{DbError, DbResult, Document, DocumentStore, StoreOperation};
pub use db::memory::MemoryDocumentStore;
pub use db::merge::deep_merge;
#[cfg(feature = "postgres")]
pub use db::postgres::PgDocumentStore;
pub use factory::create_document_store;
