//! HTTP inbound adapter exposing REST endpoints.

pub mod chat_stream;
pub mod chats;
pub mod error;
pub mod health;
pub mod models;
pub mod session;
pub mod state;
pub mod uploads;
pub mod users;

pub use error::ApiResult;

use actix_web::web;

/// Register every `/api/v1` endpoint on a service scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(users::create_session)
            .service(users::delete_session)
            .service(models::list_models)
            .service(chats::list_recent)
            .service(chats::get_chat)
            .service(chats::delete_chat)
            .service(chats::generate_title)
            .service(chat_stream::stream_chat)
            .service(uploads::request_upload)
            .service(uploads::confirm_upload)
            .service(uploads::resolve_upload)
            .service(uploads::list_uploads)
            .service(uploads::delete_upload),
    );
}
