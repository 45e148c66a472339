//! Relational persistence adapters backed by PostgreSQL.

mod diesel_attachment_repository;
mod diesel_chat_repository;
mod diesel_user_repository;
mod error_mapping;
mod models;
mod pool;
pub(crate) mod schema;

pub use diesel_attachment_repository::DieselAttachmentRepository;
pub use diesel_chat_repository::DieselChatRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
