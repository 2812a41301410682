use super::applications::payer;
use super::gateway::{CheckoutSession, GatewayClient};
use super::ledger::Ledger;
use super::locks::{EntityKey, EntityLocks};
use crate::domain::ids::UserId;
use crate::domain::payment::VerifiedPayment;
use crate::domain::ports::{ChangeSet, StoreHandle, UnitOfWork, UserStore};
use crate::domain::pricing::ConnectPricing;
use crate::domain::reference::PaymentPurpose;
use crate::domain::user::Visibility;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCheckout {
    pub quantity: u32,
    pub amount: Decimal,
    pub currency: String,
    #[serde(flatten)]
    pub checkout: CheckoutSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Credited { quantity: u32, balance: u32 },
    /// This reference was credited before.
    AlreadyCredited { balance: u32 },
}

/// Buying connects for money: initiation and the reconciliation path that
/// credits the ledger once the provider confirms payment.
#[derive(Clone)]
pub struct ConnectPurchases {
    store: StoreHandle,
    locks: EntityLocks,
    ledger: Ledger,
    gateway: GatewayClient,
    pricing: ConnectPricing,
    currency: String,
}

impl ConnectPurchases {
    pub fn new(
        store: StoreHandle,
        locks: EntityLocks,
        ledger: Ledger,
        gateway: GatewayClient,
        pricing: ConnectPricing,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            locks,
            ledger,
            gateway,
            pricing,
            currency: currency.into(),
        }
    }

    /// Opens a checkout for `quantity` connects at the configured unit price.
    pub async fn purchase(&self, user_id: UserId, quantity: u32) -> Result<PurchaseCheckout> {
        if quantity == 0 {
            return Err(PaymentError::Validation(
                "quantity must be greater than zero".to_string(),
            ));
        }
        let user = self
            .store
            .user(user_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;

        let amount = self.pricing.charge_for(quantity)?;
        let checkout = self
            .gateway
            .initialize(
                PaymentPurpose::ConnectPurchase {
                    user: user_id,
                    quantity,
                },
                amount,
                &self.currency,
                payer(&user),
            )
            .await
            .map_err(PaymentError::PaymentInit)?;
        info!(
            user_id = %user_id,
            quantity,
            %amount,
            reference = %checkout.tx_ref,
            "connect purchase initialized"
        );
        Ok(PurchaseCheckout {
            quantity,
            amount,
            currency: self.currency.clone(),
            checkout,
        })
    }

    /// Credits a confirmed purchase exactly once per reference.
    ///
    /// The marker, the credit and the claim on the reference commit together.
    /// The claim also covers replays of an older reference after a newer one
    /// moved the marker on.
    pub(crate) async fn finalize(
        &self,
        user_id: UserId,
        quantity: u32,
        reference: &str,
        payment: &VerifiedPayment,
    ) -> Result<Credit> {
        let _guard = self.locks.acquire([EntityKey::User(user_id)]).await;
        let mut user = self
            .store
            .user(user_id, Visibility::IncludeInactive)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;

        if user.last_reconciled_tx_ref.as_deref() == Some(reference)
            || self.store.reference_claimed(reference).await?
        {
            info!(user_id = %user_id, reference, "connect purchase already credited");
            return Ok(Credit::AlreadyCredited {
                balance: user.connects,
            });
        }

        let expected = self.pricing.charge_for(quantity)?;
        if payment.amount < expected {
            warn!(
                user_id = %user_id,
                reference,
                %expected,
                paid = %payment.amount,
                "paid amount below expected charge"
            );
            return Err(PaymentError::AmountMismatch {
                expected,
                paid: payment.amount,
            });
        }

        self.ledger.stage_credit(&mut user, quantity)?;
        user.last_reconciled_tx_ref = Some(reference.to_string());
        let balance = user.connects;
        self.store
            .commit(ChangeSet::new().user(user).claim(reference))
            .await?;
        info!(user_id = %user_id, reference, quantity, balance, "connects purchased");
        Ok(Credit::Credited { quantity, balance })
    }
}
