use super::application::Application;
use super::chat::ChatRoom;
use super::ids::{ApplicationId, RequestId, UserId};
use super::payment::{CheckoutRequest, GatewayError, VerifiedPayment};
use super::request::ServiceRequest;
use super::user::{User, Visibility};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: UserId, visibility: Visibility) -> Result<Option<User>>;
    async fn users(&self, visibility: Visibility) -> Result<Vec<User>>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn request(&self, id: RequestId) -> Result<Option<ServiceRequest>>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn application(&self, id: ApplicationId) -> Result<Option<Application>>;
    async fn application_for(
        &self,
        request_id: RequestId,
        officer_id: UserId,
    ) -> Result<Option<Application>>;
    async fn applications_for_request(&self, request_id: RequestId) -> Result<Vec<Application>>;
    async fn applications_by_officer(&self, officer_id: UserId) -> Result<Vec<Application>>;
}

#[async_trait]
pub trait ChatRoomStore: Send + Sync {
    async fn chat_rooms_for(&self, user: UserId) -> Result<Vec<ChatRoom>>;
    async fn chat_room_for_application(&self, id: ApplicationId) -> Result<Option<ChatRoom>>;
}

/// Atomic write side of the store.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Applies every staged write or none of them.
    ///
    /// Fails with [`PaymentError::Conflict`] when a staged user or application
    /// carries a stale version, when a new application collides with an
    /// existing (request, officer) pair, when a transaction reference is
    /// already attached to another application, or when a claimed reference
    /// was claimed before.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;

    async fn reference_claimed(&self, reference: &str) -> Result<bool>;
}

pub trait Store: UserStore + RequestStore + ApplicationStore + ChatRoomStore + UnitOfWork {}

impl<T> Store for T where
    T: UserStore + RequestStore + ApplicationStore + ChatRoomStore + UnitOfWork
{
}

pub type StoreHandle = Arc<dyn Store>;

/// Writes that must land together.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub users: Vec<User>,
    pub requests: Vec<ServiceRequest>,
    pub applications: Vec<Application>,
    pub chat_rooms: Vec<ChatRoom>,
    /// One-shot references (connect purchases) consumed by this commit.
    pub claimed_references: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn request(mut self, request: ServiceRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    pub fn chat_room(mut self, room: ChatRoom) -> Self {
        self.chat_rooms.push(room);
        self
    }

    pub fn claim(mut self, reference: impl Into<String>) -> Self {
        self.claimed_references.push(reference.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.requests.is_empty()
            && self.applications.is_empty()
            && self.chat_rooms.is_empty()
            && self.claimed_references.is_empty()
    }
}

/// Checks a staged record's version against what is stored. New records are
/// staged with version 0 and must not exist yet.
pub fn expect_version(entity: &str, id: &str, stored: Option<u64>, staged: u64) -> Result<()> {
    match stored {
        None if staged == 0 => Ok(()),
        Some(current) if current == staged => Ok(()),
        None => Err(PaymentError::Conflict(format!(
            "{entity} {id} does not exist (staged version {staged})"
        ))),
        Some(current) => Err(PaymentError::Conflict(format!(
            "{entity} {id} changed concurrently (stored {current}, staged {staged})"
        ))),
    }
}

/// The external payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Registers a checkout and returns the URL the payer should visit.
    async fn initialize(
        &self,
        checkout: &CheckoutRequest,
    ) -> std::result::Result<String, GatewayError>;

    /// Asks the provider what actually happened to a reference.
    async fn verify(&self, reference: &str) -> std::result::Result<VerifiedPayment, GatewayError>;
}
