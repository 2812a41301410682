use super::gateway::{CheckoutSession, GatewayClient};
use super::ledger::Ledger;
use super::locks::{EntityKey, EntityLocks};
use crate::domain::application::{Application, ApplicationStatus};
use crate::domain::chat::ChatRoom;
use crate::domain::ids::{ApplicationId, RequestId, UserId};
use crate::domain::payment::{Payer, VerifiedPayment};
use crate::domain::ports::{
    ApplicationStore, ChangeSet, RequestStore, StoreHandle, UnitOfWork, UserStore,
};
use crate::domain::reference::PaymentPurpose;
use crate::domain::request::{RequestStatus, ServiceRequest};
use crate::domain::transaction::Transaction;
use crate::domain::user::{Role, User, Visibility};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub request_id: RequestId,
    pub price: Decimal,
    #[serde(default)]
    pub proposal: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationRevision {
    pub price: Option<Decimal>,
    pub proposal: Option<String>,
}

/// Result of accepting an application: nothing has changed yet, the officer
/// still has to pay.
#[derive(Debug, Clone, Serialize)]
pub struct Acceptance {
    pub application: Application,
    #[serde(flatten)]
    pub checkout: CheckoutSession,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Finalization {
    Approved {
        application: Application,
        chat_room: Option<ChatRoom>,
    },
    /// A previous delivery already approved the application.
    AlreadyApproved(Application),
}

/// The application state machine.
///
/// `pending -> approved` happens only through [`Applications::finalize`],
/// after the reconciler has confirmed payment. `pending -> rejected` refunds
/// the escrow in the same commit as the status change.
#[derive(Clone)]
pub struct Applications {
    store: StoreHandle,
    locks: EntityLocks,
    ledger: Ledger,
    gateway: GatewayClient,
    currency: String,
}

impl Applications {
    pub fn new(
        store: StoreHandle,
        locks: EntityLocks,
        ledger: Ledger,
        gateway: GatewayClient,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            locks,
            ledger,
            gateway,
            currency: currency.into(),
        }
    }

    /// Submits an application and escrows the request's required connects
    /// from the officer, atomically.
    pub async fn apply(&self, officer_id: UserId, new: NewApplication) -> Result<Application> {
        let _guard = self
            .locks
            .acquire([EntityKey::User(officer_id), EntityKey::Request(new.request_id)])
            .await;

        let request = self.request(new.request_id).await?;
        if request.status.is_closed() {
            return Err(PaymentError::RequestClosed(request.status));
        }
        let mut officer = self
            .store
            .user(officer_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", officer_id))?;
        if officer.role != Role::Officer {
            return Err(PaymentError::Unauthorized(
                "only officers can apply to requests".to_string(),
            ));
        }
        if self
            .store
            .application_for(request.id, officer_id)
            .await?
            .is_some()
        {
            return Err(PaymentError::DuplicateApplication);
        }

        let application = Application::submit(&request, officer_id, new.price, &new.proposal)?;
        self.ledger
            .stage_debit(&mut officer, application.escrowed_connects)?;
        let balance = officer.connects;

        self.store
            .commit(
                ChangeSet::new()
                    .user(officer)
                    .application(application.clone()),
            )
            .await?;
        info!(
            application_id = %application.id,
            request_id = %request.id,
            officer_id = %officer_id,
            escrowed = application.escrowed_connects,
            balance,
            "application submitted"
        );
        self.application(application.id).await
    }

    /// Rejects a pending application and refunds the officer's escrow.
    pub async fn reject(&self, caller: UserId, id: ApplicationId) -> Result<Application> {
        let officer_id = self.application(id).await?.officer_id;
        let _guard = self
            .locks
            .acquire([EntityKey::User(officer_id), EntityKey::Application(id)])
            .await;

        let mut application = self.application(id).await?;
        let request = self.request(application.request_id).await?;
        ensure_owner(&request, caller)?;

        let refund = application.reject()?;
        let mut officer = self
            .store
            .user(officer_id, Visibility::IncludeInactive)
            .await?
            .ok_or_else(|| {
                PaymentError::internal(format!(
                    "officer {officer_id} of application {id} is missing"
                ))
            })?;
        self.ledger.stage_credit(&mut officer, refund)?;
        let balance = officer.connects;

        self.store
            .commit(
                ChangeSet::new()
                    .user(officer)
                    .application(application),
            )
            .await?;
        info!(
            application_id = %id,
            officer_id = %officer_id,
            refund,
            balance,
            "application rejected"
        );
        self.application(id).await
    }

    /// Starts payment for a pending application. Approval waits for the
    /// provider's confirmation.
    pub async fn accept(&self, caller: UserId, id: ApplicationId) -> Result<Acceptance> {
        let application = self.application(id).await?;
        let request = self.request(application.request_id).await?;
        ensure_owner(&request, caller)?;
        application.ensure_pending()?;
        if request.status != RequestStatus::Pending {
            return Err(PaymentError::RequestInactive);
        }

        let officer = self
            .store
            .user(application.officer_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", application.officer_id))?;
        let checkout = self
            .gateway
            .initialize(
                PaymentPurpose::Application(application.id),
                application.price,
                &self.currency,
                payer(&officer),
            )
            .await
            .map_err(PaymentError::PaymentInit)?;
        info!(
            application_id = %id,
            reference = %checkout.tx_ref,
            price = %application.price,
            "application accepted, awaiting payment"
        );
        Ok(Acceptance {
            application,
            checkout,
        })
    }

    pub async fn revise(
        &self,
        caller: UserId,
        id: ApplicationId,
        revision: ApplicationRevision,
    ) -> Result<Application> {
        let _guard = self.locks.acquire([EntityKey::Application(id)]).await;
        let mut application = self.application(id).await?;
        if application.officer_id != caller {
            return Err(PaymentError::Unauthorized(
                "only the applying officer can revise an application".to_string(),
            ));
        }
        application.revise(revision.price, revision.proposal.as_deref())?;
        self.store
            .commit(ChangeSet::new().application(application))
            .await?;
        self.application(id).await
    }

    /// Applies a confirmed payment. Replays are no-ops.
    pub(crate) async fn finalize(
        &self,
        id: ApplicationId,
        reference: &str,
        payment: &VerifiedPayment,
    ) -> Result<Finalization> {
        let _guard = self.locks.acquire([EntityKey::Application(id)]).await;
        let mut application = self.application(id).await?;

        match application.status {
            ApplicationStatus::Approved => {
                let settled_by = application.transaction.as_ref().map(|tx| tx.tx_ref.as_str());
                if settled_by != Some(reference) {
                    warn!(
                        application_id = %id,
                        reference,
                        settled_by = settled_by.unwrap_or_default(),
                        "payment for an application approved under another reference"
                    );
                }
                return Ok(Finalization::AlreadyApproved(application));
            }
            ApplicationStatus::Rejected => {
                return Err(PaymentError::AlreadyDecided(ApplicationStatus::Rejected));
            }
            ApplicationStatus::Pending => {}
        }

        let request = self.request(application.request_id).await?;
        let paid_at = payment.paid_at.unwrap_or_else(Utc::now);
        let transaction = Transaction::settled(reference, payment.amount, Some(paid_at))?;
        application.approve(transaction)?;

        let chat_room = if application.officer_id != request.owner {
            Some(ChatRoom::for_application(&application, &request)?)
        } else {
            None
        };

        let mut changes = ChangeSet::new().application(application);
        if let Some(room) = &chat_room {
            changes = changes.chat_room(room.clone());
        }
        self.store.commit(changes).await?;
        let application = self.application(id).await?;

        info!(
            application_id = %id,
            reference,
            amount = %payment.amount,
            chat_room = chat_room.is_some(),
            "application approved"
        );
        Ok(Finalization::Approved {
            application,
            chat_room,
        })
    }

    pub async fn get(&self, id: ApplicationId) -> Result<Application> {
        self.application(id).await
    }

    /// Applications to a request, newest first. Owner only.
    pub async fn list_for_request(
        &self,
        caller: UserId,
        request_id: RequestId,
    ) -> Result<Vec<Application>> {
        let request = self.request(request_id).await?;
        ensure_owner(&request, caller)?;
        self.store.applications_for_request(request_id).await
    }

    pub async fn list_by_officer(&self, officer_id: UserId) -> Result<Vec<Application>> {
        self.store.applications_by_officer(officer_id).await
    }

    async fn application(&self, id: ApplicationId) -> Result<Application> {
        self.store
            .application(id)
            .await?
            .ok_or_else(|| PaymentError::not_found("application", id))
    }

    async fn request(&self, id: RequestId) -> Result<ServiceRequest> {
        self.store
            .request(id)
            .await?
            .ok_or_else(|| PaymentError::not_found("request", id))
    }
}

fn ensure_owner(request: &ServiceRequest, caller: UserId) -> Result<()> {
    if request.owner != caller {
        return Err(PaymentError::Unauthorized(
            "only the request owner can decide on its applications".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn payer(user: &User) -> Payer {
    Payer {
        name: user.name.clone(),
        phone_number: user.phone_number.clone(),
    }
}
