//! Persistence layer for userhub.
//!
//! The [`Driver`] trait is the pluggable CRUD interface; [`Store`] wraps a
//! driver with a short-TTL read-through cache for user lookups. Single-row
//! lookups signal "not found" with `Ok(None)`, never with an error.

pub mod cache;
pub mod driver;
pub mod memory;
pub mod model;
pub mod store;

pub use cache::{CacheConfig, TtlCache};
pub use driver::{Driver, StoreError, StoreResult};
pub use memory::MemoryDriver;
pub use model::{
    DeleteRefreshToken, DeleteUser, FindRefreshToken, FindUser, NewRefreshToken, NewUser,
    RefreshToken, Role, UpdateRefreshToken, UpdateUser, User,
};
pub use store::Store;
