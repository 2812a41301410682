use crate::domain::application::Application;
use crate::domain::chat::ChatRoom;
use crate::domain::ids::{ApplicationId, ChatRoomId, RequestId, UserId};
use crate::domain::ports::{
    ApplicationStore, ChangeSet, ChatRoomStore, RequestStore, UnitOfWork, UserStore,
    expect_version,
};
use crate::domain::request::ServiceRequest;
use crate::domain::user::{User, Visibility};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    requests: HashMap<RequestId, ServiceRequest>,
    applications: HashMap<ApplicationId, Application>,
    chat_rooms: HashMap<ChatRoomId, ChatRoom>,
    /// (request, officer) -> application.
    slots: HashMap<(RequestId, UserId), ApplicationId>,
    /// Settling transaction reference -> application.
    settled_refs: HashMap<String, ApplicationId>,
    claimed_refs: HashSet<String>,
}

impl Tables {
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        for user in &changes.users {
            let stored = self.users.get(&user.id).map(|u| u.version);
            expect_version("user", &user.id.to_string(), stored, user.version)?;
        }
        for app in &changes.applications {
            let stored = self.applications.get(&app.id).map(|a| a.version);
            expect_version("application", &app.id.to_string(), stored, app.version)?;
            if stored.is_none()
                && self
                    .slots
                    .get(&(app.request_id, app.officer_id))
                    .is_some_and(|existing| *existing != app.id)
            {
                return Err(PaymentError::DuplicateApplication);
            }
            if let Some(tx) = &app.transaction
                && self
                    .settled_refs
                    .get(&tx.tx_ref)
                    .is_some_and(|owner| *owner != app.id)
            {
                return Err(PaymentError::Conflict(format!(
                    "transaction reference {} is already assigned",
                    tx.tx_ref
                )));
            }
        }
        let mut claiming = HashSet::new();
        for reference in &changes.claimed_references {
            if self.claimed_refs.contains(reference) || !claiming.insert(reference) {
                return Err(PaymentError::Conflict(format!(
                    "reference {reference} was already reconciled"
                )));
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) {
        for mut user in changes.users {
            user.version += 1;
            self.users.insert(user.id, user);
        }
        for request in changes.requests {
            self.requests.insert(request.id, request);
        }
        for mut app in changes.applications {
            app.version += 1;
            self.slots.insert((app.request_id, app.officer_id), app.id);
            if let Some(tx) = &app.transaction {
                self.settled_refs.insert(tx.tx_ref.clone(), app.id);
            }
            self.applications.insert(app.id, app);
        }
        for room in changes.chat_rooms {
            self.chat_rooms.insert(room.id, room);
        }
        self.claimed_refs.extend(changes.claimed_references);
    }
}

/// A thread-safe in-memory store.
///
/// All tables sit behind a single `RwLock`, so a commit validates and applies
/// its whole change set under one write guard. Cloning shares the tables.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn user(&self, id: UserId, visibility: Visibility) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(&id)
            .filter(|u| u.is_visible(visibility))
            .cloned())
    }

    async fn users(&self, visibility: Visibility) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.is_visible(visibility))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn request(&self, id: RequestId) -> Result<Option<ServiceRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.get(&id).cloned())
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn application(&self, id: ApplicationId) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables.applications.get(&id).cloned())
    }

    async fn application_for(
        &self,
        request_id: RequestId,
        officer_id: UserId,
    ) -> Result<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables
            .slots
            .get(&(request_id, officer_id))
            .and_then(|id| tables.applications.get(id))
            .cloned())
    }

    async fn applications_for_request(&self, request_id: RequestId) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.request_id == request_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apps)
    }

    async fn applications_by_officer(&self, officer_id: UserId) -> Result<Vec<Application>> {
        let tables = self.tables.read().await;
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.officer_id == officer_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apps)
    }
}

#[async_trait]
impl ChatRoomStore for InMemoryStore {
    async fn chat_rooms_for(&self, user: UserId) -> Result<Vec<ChatRoom>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_rooms
            .values()
            .filter(|room| room.includes(user))
            .cloned()
            .collect())
    }

    async fn chat_room_for_application(&self, id: ApplicationId) -> Result<Option<ChatRoom>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_rooms
            .values()
            .find(|room| room.application_id == id)
            .cloned())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.validate(&changes)?;
        tables.apply(changes);
        Ok(())
    }

    async fn reference_claimed(&self, reference: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.claimed_refs.contains(reference))
    }
}
