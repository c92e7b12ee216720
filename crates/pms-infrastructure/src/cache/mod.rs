//! Cache adapters

pub mod memory_cache;
pub mod redis_cache;

pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
