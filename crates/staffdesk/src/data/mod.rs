//! Tenant-scoped table access: the store contract, the query cache and the
//! client that ties reads, writes and invalidation together.

pub mod cache;
pub mod client;
pub mod entity;
pub mod memory;
pub mod store;

pub use cache::{CacheStatus, Generation, QueryCache, QueryKey};
pub use client::{DataClient, FetchOutcome};
pub use entity::{CompanyId, Draft, Entity, RecordId, Scope};
pub use memory::MemoryStore;
pub use store::{Direction, Filter, Row, SessionUser, StoreError, TableQuery, TableStore};
