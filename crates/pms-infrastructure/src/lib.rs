//! # PMS Infrastructure
//! 
//! Adapters for the core ports: document stores, caches, mailers and
//! attachment storage.

pub mod cache;
pub mod database;
pub mod mail;
pub mod storage;

pub use cache::{MemoryCache, RedisCache};
pub use database::{create_pool, run_migrations, MemoryDocumentStore, PgDocumentStore};
pub use mail::{LogMailer, MailRenderer, SmtpMailer};
pub use storage::LocalAttachmentStorage;
