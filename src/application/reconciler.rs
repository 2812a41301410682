use super::applications::{Applications, Finalization};
use super::connects::{ConnectPurchases, Credit};
use super::gateway::GatewayClient;
use crate::domain::application::Application;
use crate::domain::chat::ChatRoom;
use crate::domain::ids::UserId;
use crate::domain::payment::{GatewayError, PaymentStatus};
use crate::domain::reference::{PaymentPurpose, ReferenceError, TxRef};
use crate::error::{PaymentError, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// What a webhook delivery changed, if anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
    ApplicationApproved {
        application: Application,
        chat_room: Option<ChatRoom>,
    },
    ApplicationAlreadyApproved {
        application: Application,
    },
    ConnectsCredited {
        user: UserId,
        quantity: u32,
        balance: u32,
    },
    ConnectsAlreadyCredited {
        user: UserId,
        balance: u32,
    },
}

impl Reconciliation {
    /// True when this delivery was a replay and nothing changed.
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            Reconciliation::ApplicationAlreadyApproved { .. }
                | Reconciliation::ConnectsAlreadyCredited { .. }
        )
    }
}

/// Turns provider callbacks into exactly-once state changes.
///
/// The callback body is never trusted: every delivery is re-verified with the
/// provider before the reference is decoded and routed.
#[derive(Clone)]
pub struct WebhookReconciler {
    gateway: GatewayClient,
    applications: Applications,
    purchases: ConnectPurchases,
}

impl WebhookReconciler {
    pub fn new(
        gateway: GatewayClient,
        applications: Applications,
        purchases: ConnectPurchases,
    ) -> Self {
        Self {
            gateway,
            applications,
            purchases,
        }
    }

    #[instrument(skip_all, fields(reference = %raw_reference.trim()))]
    pub async fn reconcile(&self, raw_reference: &str) -> Result<Reconciliation> {
        let reference = raw_reference.trim();
        if reference.is_empty() {
            return Err(PaymentError::Validation(
                "missing transaction reference".to_string(),
            ));
        }

        let payment = self
            .gateway
            .verify(reference)
            .await
            .map_err(|e| match e {
                GatewayError::Rejected(reason) | GatewayError::InvalidResponse(reason) => {
                    PaymentError::VerificationFailed {
                        reference: reference.to_string(),
                        reason,
                    }
                }
                other => PaymentError::Gateway(other),
            })
            .inspect_err(|e| warn!(error = %e, "payment verification failed"))?;

        if payment.status != PaymentStatus::Success {
            warn!(status = ?payment.status, "payment not successful");
            return Err(PaymentError::VerificationFailed {
                reference: reference.to_string(),
                reason: format!("payment status is {:?}", payment.status).to_lowercase(),
            });
        }
        if let Some(echoed) = payment.reference.as_deref()
            && echoed != reference
        {
            warn!(echoed, "provider verified a different reference");
            return Err(PaymentError::VerificationFailed {
                reference: reference.to_string(),
                reason: format!("provider verified reference {echoed}"),
            });
        }

        let tx_ref: TxRef = reference.parse().map_err(|e| match e {
            ReferenceError::UnknownTag(_) => {
                PaymentError::UnrecognizedReference(reference.to_string())
            }
            ReferenceError::Malformed(_) => PaymentError::Validation(e.to_string()),
        })?;

        let outcome = match tx_ref.purpose {
            PaymentPurpose::Application(id) => {
                match self.applications.finalize(id, reference, &payment).await? {
                    Finalization::Approved {
                        application,
                        chat_room,
                    } => Reconciliation::ApplicationApproved {
                        application,
                        chat_room,
                    },
                    Finalization::AlreadyApproved(application) => {
                        Reconciliation::ApplicationAlreadyApproved { application }
                    }
                }
            }
            PaymentPurpose::ConnectPurchase { user, quantity } => {
                match self
                    .purchases
                    .finalize(user, quantity, reference, &payment)
                    .await?
                {
                    Credit::Credited { quantity, balance } => Reconciliation::ConnectsCredited {
                        user,
                        quantity,
                        balance,
                    },
                    Credit::AlreadyCredited { balance } => {
                        Reconciliation::ConnectsAlreadyCredited { user, balance }
                    }
                }
            }
        };
        info!(replay = outcome.is_replay(), "webhook reconciled");
        Ok(outcome)
    }
}
