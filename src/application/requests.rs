use super::locks::{EntityKey, EntityLocks};
use crate::domain::ids::{RequestId, UserId};
use crate::domain::ports::{ChangeSet, RequestStore, StoreHandle, UnitOfWork, UserStore};
use crate::domain::pricing::ConnectRequirement;
use crate::domain::request::{NewRequest, RequestUpdate, ServiceRequest};
use crate::domain::user::Visibility;
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Requests {
    store: StoreHandle,
    locks: EntityLocks,
    requirement: Arc<dyn ConnectRequirement>,
}

impl Requests {
    pub fn new(
        store: StoreHandle,
        locks: EntityLocks,
        requirement: Arc<dyn ConnectRequirement>,
    ) -> Self {
        Self {
            store,
            locks,
            requirement,
        }
    }

    pub async fn create(&self, owner: UserId, new: NewRequest) -> Result<ServiceRequest> {
        self.store
            .user(owner, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", owner))?;

        let request = ServiceRequest::create(owner, new, self.requirement.as_ref())?;
        self.store
            .commit(ChangeSet::new().request(request.clone()))
            .await?;
        info!(
            request_id = %request.id,
            owner = %owner,
            price = %request.price,
            required_connect = request.required_connect,
            "request created"
        );
        Ok(request)
    }

    /// Only the owner may edit. Applications already submitted keep the
    /// connects they escrowed, whatever the new requirement is.
    pub async fn update(
        &self,
        caller: UserId,
        id: RequestId,
        update: RequestUpdate,
    ) -> Result<ServiceRequest> {
        let _guard = self.locks.acquire([EntityKey::Request(id)]).await;
        let mut request = self.get(id).await?;
        if request.owner != caller {
            return Err(PaymentError::Unauthorized(
                "only the request owner can edit it".to_string(),
            ));
        }
        request.apply_update(update, self.requirement.as_ref())?;
        self.store
            .commit(ChangeSet::new().request(request.clone()))
            .await?;
        info!(
            request_id = %id,
            status = %request.status,
            required_connect = request.required_connect,
            "request updated"
        );
        Ok(request)
    }

    pub async fn get(&self, id: RequestId) -> Result<ServiceRequest> {
        self.store
            .request(id)
            .await?
            .ok_or_else(|| PaymentError::not_found("request", id))
    }
}
