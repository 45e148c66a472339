//! Driven adapters implementing the domain's outbound ports.

pub mod inference;
pub mod persistence;
pub mod storage;
