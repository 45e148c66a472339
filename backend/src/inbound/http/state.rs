//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::InferenceOps;
use crate::domain::ports::{ChatOps, TitleOps, UploadOps, UserOps};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Guest identity provisioning.
    pub users: Arc<dyn UserOps>,
    /// Chat reads and deletion.
    pub chats: Arc<dyn ChatOps>,
    /// Background title generation.
    pub titles: Arc<dyn TitleOps>,
    /// Upload gateway operations.
    pub uploads: Arc<dyn UploadOps>,
    /// Streaming inference.
    pub inference: Arc<dyn InferenceOps>,
}
