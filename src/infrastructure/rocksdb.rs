use crate::domain::application::Application;
use crate::domain::chat::ChatRoom;
use crate::domain::ids::{ApplicationId, RequestId, UserId};
use crate::domain::ports::{
    ApplicationStore, ChangeSet, ChatRoomStore, RequestStore, UnitOfWork, UserStore,
    expect_version,
};
use crate::domain::request::ServiceRequest;
use crate::domain::user::{User, Visibility};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for user records.
pub const CF_USERS: &str = "users";
/// Column Family for service requests.
pub const CF_REQUESTS: &str = "requests";
/// Column Family for applications.
pub const CF_APPLICATIONS: &str = "applications";
/// Column Family for chat rooms.
pub const CF_CHAT_ROOMS: &str = "chat_rooms";
/// Index: request id ++ officer id -> application id.
pub const CF_SLOTS: &str = "slots";
/// Index: settling transaction reference -> application id.
pub const CF_SETTLED_REFS: &str = "settled_refs";
/// Connect-purchase references already credited.
pub const CF_CLAIMED_REFS: &str = "claimed_refs";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_USERS,
    CF_REQUESTS,
    CF_APPLICATIONS,
    CF_CHAT_ROOMS,
    CF_SLOTS,
    CF_SETTLED_REFS,
    CF_CLAIMED_REFS,
];

/// A persistent store implementation using RocksDB.
///
/// Each entity type lives in its own Column Family, with secondary indexes for
/// the uniqueness rules. A commit is validated under `commit_lock` and then
/// written as a single `WriteBatch`, so it lands entirely or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(decode(&value)?);
        }
        Ok(items)
    }

    fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        for user in &changes.users {
            let stored: Option<User> = self.get_json(CF_USERS, user.id.as_bytes())?;
            expect_version(
                "user",
                &user.id.to_string(),
                stored.map(|u| u.version),
                user.version,
            )?;
        }
        for app in &changes.applications {
            let stored: Option<Application> = self.get_json(CF_APPLICATIONS, app.id.as_bytes())?;
            let is_new = stored.is_none();
            expect_version(
                "application",
                &app.id.to_string(),
                stored.map(|a| a.version),
                app.version,
            )?;
            if is_new {
                let slots = self.cf(CF_SLOTS)?;
                let key = slot_key(app.request_id, app.officer_id);
                if let Some(existing) = self.db.get_pinned_cf(slots, key)?
                    && existing.as_ref() != app.id.as_bytes()
                {
                    return Err(PaymentError::DuplicateApplication);
                }
            }
            if let Some(tx) = &app.transaction {
                let settled = self.cf(CF_SETTLED_REFS)?;
                if let Some(owner) = self.db.get_pinned_cf(settled, tx.tx_ref.as_bytes())?
                    && owner.as_ref() != app.id.as_bytes()
                {
                    return Err(PaymentError::Conflict(format!(
                        "transaction reference {} is already assigned",
                        tx.tx_ref
                    )));
                }
            }
        }
        let mut claiming = HashSet::new();
        for reference in &changes.claimed_references {
            if self.contains(CF_CLAIMED_REFS, reference.as_bytes())?
                || !claiming.insert(reference)
            {
                return Err(PaymentError::Conflict(format!(
                    "reference {reference} was already reconciled"
                )));
            }
        }
        Ok(())
    }

    fn write(&self, changes: ChangeSet) -> Result<()> {
        let mut batch = WriteBatch::default();

        let users = self.cf(CF_USERS)?;
        for mut user in changes.users {
            user.version += 1;
            batch.put_cf(users, user.id.as_bytes(), encode(&user)?);
        }

        let requests = self.cf(CF_REQUESTS)?;
        for request in changes.requests {
            batch.put_cf(requests, request.id.as_bytes(), encode(&request)?);
        }

        let applications = self.cf(CF_APPLICATIONS)?;
        let slots = self.cf(CF_SLOTS)?;
        let settled = self.cf(CF_SETTLED_REFS)?;
        for mut app in changes.applications {
            app.version += 1;
            batch.put_cf(slots, slot_key(app.request_id, app.officer_id), app.id.as_bytes());
            if let Some(tx) = &app.transaction {
                batch.put_cf(settled, tx.tx_ref.as_bytes(), app.id.as_bytes());
            }
            batch.put_cf(applications, app.id.as_bytes(), encode(&app)?);
        }

        let rooms = self.cf(CF_CHAT_ROOMS)?;
        for room in changes.chat_rooms {
            batch.put_cf(rooms, room.id.as_bytes(), encode(&room)?);
        }

        let claimed = self.cf(CF_CLAIMED_REFS)?;
        for reference in changes.claimed_references {
            batch.put_cf(claimed, reference.as_bytes(), b"");
        }

        self.db.write(batch)?;
        Ok(())
    }
}

fn slot_key(request_id: RequestId, officer_id: UserId) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(request_id.as_bytes());
    key[16..].copy_from_slice(officer_id.as_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        PaymentError::Internal(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::Internal(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn user(&self, id: UserId, visibility: Visibility) -> Result<Option<User>> {
        let user: Option<User> = self.get_json(CF_USERS, id.as_bytes())?;
        Ok(user.filter(|u| u.is_visible(visibility)))
    }

    async fn users(&self, visibility: Visibility) -> Result<Vec<User>> {
        let users: Vec<User> = self.scan(CF_USERS)?;
        Ok(users.into_iter().filter(|u| u.is_visible(visibility)).collect())
    }
}

#[async_trait]
impl RequestStore for RocksDBStore {
    async fn request(&self, id: RequestId) -> Result<Option<ServiceRequest>> {
        self.get_json(CF_REQUESTS, id.as_bytes())
    }
}

#[async_trait]
impl ApplicationStore for RocksDBStore {
    async fn application(&self, id: ApplicationId) -> Result<Option<Application>> {
        self.get_json(CF_APPLICATIONS, id.as_bytes())
    }

    async fn application_for(
        &self,
        request_id: RequestId,
        officer_id: UserId,
    ) -> Result<Option<Application>> {
        let slots = self.cf(CF_SLOTS)?;
        match self.db.get_pinned_cf(slots, slot_key(request_id, officer_id))? {
            Some(app_id) => self.get_json(CF_APPLICATIONS, app_id.as_ref()),
            None => Ok(None),
        }
    }

    async fn applications_for_request(&self, request_id: RequestId) -> Result<Vec<Application>> {
        let mut apps: Vec<Application> = self.scan(CF_APPLICATIONS)?;
        apps.retain(|a| a.request_id == request_id);
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apps)
    }

    async fn applications_by_officer(&self, officer_id: UserId) -> Result<Vec<Application>> {
        let mut apps: Vec<Application> = self.scan(CF_APPLICATIONS)?;
        apps.retain(|a| a.officer_id == officer_id);
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apps)
    }
}

#[async_trait]
impl ChatRoomStore for RocksDBStore {
    async fn chat_rooms_for(&self, user: UserId) -> Result<Vec<ChatRoom>> {
        let rooms: Vec<ChatRoom> = self.scan(CF_CHAT_ROOMS)?;
        Ok(rooms.into_iter().filter(|room| room.includes(user)).collect())
    }

    async fn chat_room_for_application(&self, id: ApplicationId) -> Result<Option<ChatRoom>> {
        let rooms: Vec<ChatRoom> = self.scan(CF_CHAT_ROOMS)?;
        Ok(rooms.into_iter().find(|room| room.application_id == id))
    }
}

#[async_trait]
impl UnitOfWork for RocksDBStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        self.validate(&changes)?;
        self.write(changes)
    }

    async fn reference_claimed(&self, reference: &str) -> Result<bool> {
        self.contains(CF_CLAIMED_REFS, reference.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::StepRequirement;
    use crate::domain::request::NewRequest;
    use crate::domain::user::Role;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some(), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_rocksdb_user_roundtrip_and_versioning() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let user = User::new("Tigist", Role::Officer).with_connects(7);
        store.commit(ChangeSet::new().user(user.clone())).await.unwrap();

        let stored = store.user(user.id, Visibility::ActiveOnly).await.unwrap().unwrap();
        assert_eq!(stored.connects, 7);
        assert_eq!(stored.version, 1);

        let result = store.commit(ChangeSet::new().user(user)).await;
        assert!(matches!(result, Err(PaymentError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_rocksdb_application_slot_index() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let owner = UserId::new();
        let officer = UserId::new();
        let request = ServiceRequest::create(
            owner,
            NewRequest {
                title: "Tax clearance".to_string(),
                description: String::new(),
                category: "revenue".to_string(),
                price: dec!(120),
                required_connect: None,
            },
            &StepRequirement::default(),
        )
        .unwrap();
        let app = Application::submit(&request, officer, dec!(110), "on it").unwrap();
        store
            .commit(ChangeSet::new().request(request.clone()).application(app.clone()))
            .await
            .unwrap();

        let found = store.application_for(request.id, officer).await.unwrap().unwrap();
        assert_eq!(found.id, app.id);

        let duplicate = Application::submit(&request, officer, dec!(100), "again").unwrap();
        let result = store.commit(ChangeSet::new().application(duplicate)).await;
        assert!(matches!(result, Err(PaymentError::DuplicateApplication)));
    }

    #[tokio::test]
    async fn test_rocksdb_claimed_reference_persists() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.commit(ChangeSet::new().claim("conn-a-2-3")).await.unwrap();
        }
        let reopened = RocksDBStore::open(dir.path()).unwrap();
        assert!(reopened.reference_claimed("conn-a-2-3").await.unwrap());
    }
}
