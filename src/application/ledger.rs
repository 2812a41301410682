use super::locks::{EntityKey, EntityLocks};
use crate::domain::ids::UserId;
use crate::domain::ports::{ChangeSet, StoreHandle, UnitOfWork, UserStore};
use crate::domain::user::{User, Visibility};
use crate::error::{PaymentError, Result};
use tracing::{debug, info};

/// Owns every change to a user's `connects` balance.
///
/// The standalone `debit`/`credit` calls serialize on the user's lock and
/// commit on their own. Compound workflows (apply, reject, connect purchase)
/// hold the lock themselves and stage the balance change into their own
/// [`ChangeSet`] through `stage_debit`/`stage_credit`, so the balance and the
/// status or marker write land together.
#[derive(Clone)]
pub struct Ledger {
    store: StoreHandle,
    locks: EntityLocks,
}

impl Ledger {
    pub fn new(store: StoreHandle, locks: EntityLocks) -> Self {
        Self { store, locks }
    }

    pub async fn balance(&self, user_id: UserId) -> Result<u32> {
        let user = self
            .store
            .user(user_id, Visibility::IncludeInactive)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;
        Ok(user.connects)
    }

    /// Removes `amount` connects. Fails without side effects when the balance
    /// does not cover it.
    pub async fn debit(&self, user_id: UserId, amount: u32) -> Result<u32> {
        ensure_positive(amount)?;
        let _guard = self.locks.acquire([EntityKey::User(user_id)]).await;
        let mut user = self
            .store
            .user(user_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;
        self.stage_debit(&mut user, amount)?;
        let balance = user.connects;
        self.store.commit(ChangeSet::new().user(user)).await?;
        info!(user_id = %user_id, amount, balance, "connects debited");
        Ok(balance)
    }

    pub async fn credit(&self, user_id: UserId, amount: u32) -> Result<u32> {
        ensure_positive(amount)?;
        let _guard = self.locks.acquire([EntityKey::User(user_id)]).await;
        let mut user = self
            .store
            .user(user_id, Visibility::IncludeInactive)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;
        self.stage_credit(&mut user, amount)?;
        let balance = user.connects;
        self.store.commit(ChangeSet::new().user(user)).await?;
        info!(user_id = %user_id, amount, balance, "connects credited");
        Ok(balance)
    }

    /// Caller must hold the user's lock and commit `user` afterwards.
    pub(crate) fn stage_debit(&self, user: &mut User, amount: u32) -> Result<()> {
        user.debit(amount)?;
        debug!(user_id = %user.id, amount, balance = user.connects, "debit staged");
        Ok(())
    }

    /// Caller must hold the user's lock and commit `user` afterwards.
    pub(crate) fn stage_credit(&self, user: &mut User, amount: u32) -> Result<()> {
        user.credit(amount)?;
        debug!(user_id = %user.id, amount, balance = user.connects, "credit staged");
        Ok(())
    }
}

fn ensure_positive(amount: u32) -> Result<()> {
    if amount == 0 {
        return Err(PaymentError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
