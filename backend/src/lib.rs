//! Backend library: chat persistence, streaming inference proxy, and the
//! direct-to-bucket upload gateway, arranged hexagonally.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware.
pub use middleware::Trace;
