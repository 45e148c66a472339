//! Shared in-memory adapters and app harness for endpoint tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test, web};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use pagination::PageRequest;
use uuid::Uuid;

use backend::domain::ports::{
    AttachmentRepository, ChatRepository, CompletionBackend, CompletionError, CompletionRequest,
    CompletionStream, DocumentFetchError, DocumentFetcher, ObjectStore, ObjectStoreError,
    PresignedUrl, RepositoryError, StreamEvent, UserRepository,
};
use backend::domain::{
    AttachmentRecord, Chat, ChatId, ChatService, ChatSummary, FileFilter, FileSort,
    GuestUserService, InferenceService, Message, PRESIGN_EXPIRY, StorageKey, TitleService,
    UploadService, User, UserId,
};
use backend::inbound::http::configure_api;
use backend::inbound::http::error::json_error_handler;
use backend::inbound::http::state::HttpState;

fn page_slice<T: Clone>(items: &[T], page: &PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .cloned()
        .collect()
}

/// In-memory [`UserRepository`].
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.users
            .lock()
            .expect("lock")
            .insert(*user.id.as_uuid(), user.clone());
        Ok(())
    }

    async fn find(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().expect("lock").get(id.as_uuid()).cloned())
    }
}

/// In-memory [`ChatRepository`].
#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn find_chat(&self, id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
        Ok(self
            .chats
            .lock()
            .expect("lock")
            .iter()
            .find(|chat| &chat.id == id)
            .cloned())
    }

    async fn create_chat(&self, chat: &Chat) -> Result<(), RepositoryError> {
        self.chats.lock().expect("lock").push(chat.clone());
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError> {
        self.messages.lock().expect("lock").push(message.clone());
        Ok(())
    }

    async fn messages_for_chat(&self, id: &ChatId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .expect("lock")
            .iter()
            .filter(|message| &message.chat_id == id)
            .cloned()
            .collect())
    }

    async fn list_recent(
        &self,
        owner: &UserId,
        page: &PageRequest,
    ) -> Result<(Vec<ChatSummary>, u64), RepositoryError> {
        let mut owned: Vec<Chat> = self
            .chats
            .lock()
            .expect("lock")
            .iter()
            .filter(|chat| &chat.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = owned.len() as u64;
        let summaries = page_slice(&owned, page)
            .into_iter()
            .map(|chat| ChatSummary {
                id: chat.id,
                title: chat.title,
                created_at: chat.created_at,
            })
            .collect();
        Ok((summaries, total))
    }

    async fn set_title(&self, id: &ChatId, title: &str) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().expect("lock");
        if let Some(chat) = chats.iter_mut().find(|chat| &chat.id == id) {
            chat.title = title.to_owned();
        }
        Ok(())
    }

    async fn delete_messages(&self, id: &ChatId) -> Result<(), RepositoryError> {
        self.messages
            .lock()
            .expect("lock")
            .retain(|message| &message.chat_id != id);
        Ok(())
    }

    async fn delete_chat(&self, id: &ChatId) -> Result<(), RepositoryError> {
        self.chats.lock().expect("lock").retain(|chat| &chat.id != id);
        Ok(())
    }
}

/// In-memory [`AttachmentRepository`].
#[derive(Default)]
pub struct InMemoryAttachmentRepository {
    records: Mutex<Vec<AttachmentRecord>>,
}

#[async_trait]
impl AttachmentRepository for InMemoryAttachmentRepository {
    async fn insert(&self, record: &AttachmentRecord) -> Result<(), RepositoryError> {
        self.records.lock().expect("lock").push(record.clone());
        Ok(())
    }

    async fn find(&self, key: &StorageKey) -> Result<Option<AttachmentRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .find(|record| &record.key == key)
            .cloned())
    }

    async fn list(
        &self,
        owner: &UserId,
        filter: &FileFilter,
        page: &PageRequest,
    ) -> Result<(Vec<AttachmentRecord>, u64), RepositoryError> {
        let mut matched: Vec<AttachmentRecord> = self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| &record.owner == owner)
            .filter(|record| {
                filter
                    .kind
                    .is_none_or(|kind| kind.matches(&record.content_type))
            })
            .filter(|record| {
                filter.search.as_deref().is_none_or(|needle| {
                    record
                        .filename
                        .to_lowercase()
                        .contains(&needle.to_lowercase())
                })
            })
            .cloned()
            .collect();
        match filter.sort {
            FileSort::Recency => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            FileSort::Size => matched.sort_by(|a, b| b.size.cmp(&a.size)),
        }
        let total = matched.len() as u64;
        Ok((page_slice(&matched, page), total))
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("lock")
            .retain(|record| &record.key != key);
        Ok(())
    }
}

/// Object store fake tracking objects and deletions, never touching the
/// network.
#[derive(Default)]
pub struct RecordingObjectStore {
    objects: Mutex<HashMap<String, u64>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingObjectStore {
    /// Simulate the client's direct PUT landing in the bucket.
    pub fn put_object(&self, key: &str, size: u64) {
        self.objects
            .lock()
            .expect("lock")
            .insert(key.to_owned(), size);
    }

    /// Keys deleted so far.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn presign_put(
        &self,
        key: &StorageKey,
        _content_type: &str,
    ) -> Result<PresignedUrl, ObjectStoreError> {
        Ok(PresignedUrl {
            url: format!("https://bucket.test/put/{key}"),
            expires_at: Utc::now() + chrono::Duration::from_std(PRESIGN_EXPIRY).expect("expiry"),
        })
    }

    async fn head_size(&self, key: &StorageKey) -> Result<u64, ObjectStoreError> {
        self.objects
            .lock()
            .expect("lock")
            .get(key.as_str())
            .copied()
            .ok_or_else(|| ObjectStoreError::missing(key.as_str()))
    }

    async fn presign_get(&self, key: &StorageKey) -> Result<PresignedUrl, ObjectStoreError> {
        Ok(PresignedUrl {
            url: format!("https://bucket.test/get/{key}"),
            expires_at: Utc::now() + chrono::Duration::from_std(PRESIGN_EXPIRY).expect("expiry"),
        })
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError> {
        self.objects.lock().expect("lock").remove(key.as_str());
        self.deleted.lock().expect("lock").push(key.as_str().to_owned());
        Ok(())
    }
}

/// One scripted response for [`ScriptedBackend::stream`].
pub enum StreamScript {
    /// The stream call itself fails.
    Fail(CompletionError),
    /// The stream yields these items in order.
    Events(Vec<Result<StreamEvent, CompletionError>>),
}

/// Completion backend replaying scripted responses.
#[derive(Default)]
pub struct ScriptedBackend {
    streams: Mutex<VecDeque<StreamScript>>,
    completions: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    /// Queue a response for the next `stream` call.
    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().expect("lock").push_back(script);
    }

    /// Queue a response for the next `complete` call.
    pub fn push_completion(&self, result: Result<String, CompletionError>) {
        self.completions.lock().expect("lock").push_back(result);
    }

    /// Requests observed so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, CompletionError> {
        self.requests.lock().expect("lock").push(request);
        match self.streams.lock().expect("lock").pop_front() {
            Some(StreamScript::Fail(error)) => Err(error),
            Some(StreamScript::Events(events)) => {
                Ok(futures_util::stream::iter(events).boxed())
            }
            None => Err(CompletionError::transport("unscripted stream call")),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().expect("lock").push(request);
        self.completions
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transport("unscripted complete call")))
    }
}

/// Fetcher returning a fixed document body.
pub struct StaticFetcher {
    body: Bytes,
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self {
            body: Bytes::from_static(b"%PDF-1.4 test"),
        }
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, DocumentFetchError> {
        Ok(self.body.clone())
    }
}

/// Fully wired [`HttpState`] over in-memory adapters, with handles to the
/// fakes for scripting and inspection.
pub struct Harness {
    pub chat_repo: Arc<InMemoryChatRepository>,
    pub attachment_repo: Arc<InMemoryAttachmentRepository>,
    pub store: Arc<RecordingObjectStore>,
    pub backend: Arc<ScriptedBackend>,
    pub state: HttpState,
}

/// Build a harness mirroring the production wiring.
pub fn harness() -> Harness {
    let chat_repo = Arc::new(InMemoryChatRepository::default());
    let attachment_repo = Arc::new(InMemoryAttachmentRepository::default());
    let user_repo = Arc::new(InMemoryUserRepository::default());
    let store = Arc::new(RecordingObjectStore::default());
    let backend = Arc::new(ScriptedBackend::default());
    let fetcher = Arc::new(StaticFetcher::default());

    let state = HttpState {
        users: Arc::new(GuestUserService::new(user_repo)),
        chats: Arc::new(ChatService::new(Arc::clone(&chat_repo))),
        titles: Arc::new(TitleService::new(
            Arc::clone(&chat_repo),
            Arc::clone(&backend),
        )),
        uploads: Arc::new(UploadService::new(
            Arc::clone(&attachment_repo),
            Arc::clone(&store),
            None,
        )),
        inference: Arc::new(InferenceService::new(
            Arc::clone(&chat_repo),
            Arc::clone(&backend),
            fetcher,
        )),
    };

    Harness {
        chat_repo,
        attachment_repo,
        store,
        backend,
        state,
    }
}

/// Spin up the API app over the harness state.
pub async fn init_app(
    state: HttpState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(session)
            .configure(configure_api),
    )
    .await
}

/// Register a guest session and return its cookie.
pub async fn login<S, B>(app: &S) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/session")
            .set_json(serde_json::json!({}))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success(), "guest registration failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie issued")
}
