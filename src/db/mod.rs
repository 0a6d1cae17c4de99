//! Database module: models, schema, and the actor owning the SQLite pool.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL plus incremental migrations (SQLite-first)
//! - `actor.rs`: the ractor actor and its RPC handle

pub mod actor;
pub mod models;
pub mod schema;

pub use actor::{AcronymCreate, AcronymUpdate, CategoryLink, DbActorHandle, UserCreate, spawn};
pub use models::{DbAcronym, DbCategory, DbUser};
pub use schema::SQLITE_INIT;
