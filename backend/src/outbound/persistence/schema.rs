//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations exactly; regenerate with
//! `diesel print-schema` after a migration changes the schema.

diesel::table! {
    /// Registered users.
    users (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Human-readable display name.
        display_name -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Chats, keyed by the client-minted identifier.
    chats (id) {
        /// Primary key: opaque client-minted string.
        id -> Text,
        /// Owning user.
        user_id -> Uuid,
        /// Display title, empty until title generation runs.
        title -> Text,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable chat messages.
    messages (id) {
        /// Primary key: UUID v4.
        id -> Uuid,
        /// Parent chat.
        chat_id -> Text,
        /// Authoring user; null for assistant turns.
        user_id -> Nullable<Uuid>,
        /// `user` or `assistant`.
        role -> Text,
        /// Plain string or typed part list, as JSON.
        content -> Jsonb,
        /// Record creation timestamp; transcript order follows it.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Confirmed file uploads.
    files (key) {
        /// Primary key: opaque bucket key of the form `f/<uuid>`.
        key -> Text,
        /// Uploading user.
        user_id -> Uuid,
        /// Original filename, metadata only.
        name -> Text,
        /// Declared MIME type.
        content_type -> Text,
        /// Size observed in the bucket at confirm time.
        size -> Int8,
        /// User-assigned tags.
        tags -> Array<Text>,
        /// Confirmation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(messages -> chats (chat_id));

diesel::allow_tables_to_appear_in_same_query!(users, chats, messages, files);
