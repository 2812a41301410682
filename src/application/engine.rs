use super::applications::Applications;
use super::connects::ConnectPurchases;
use super::gateway::GatewayClient;
use super::ledger::Ledger;
use super::locks::EntityLocks;
use super::reconciler::WebhookReconciler;
use super::requests::Requests;
use super::users::Users;
use crate::domain::chat::ChatRoom;
use crate::domain::ids::UserId;
use crate::domain::ports::{ChatRoomStore, PaymentProvider, StoreHandle};
use crate::domain::pricing::{ConnectPricing, ConnectRequirement, StepRequirement};
use crate::error::Result;
use std::sync::Arc;

pub const DEFAULT_CURRENCY: &str = "ETB";

#[derive(Clone)]
pub struct EngineConfig {
    pub currency: String,
    pub connect_pricing: ConnectPricing,
    /// Maps request prices to the connects an officer must escrow.
    pub requirement: Arc<dyn ConnectRequirement>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            connect_pricing: ConnectPricing::default(),
            requirement: Arc::new(StepRequirement::default()),
        }
    }
}

/// The main entry point for the escrow and reconciliation workflows.
///
/// `EscrowEngine` wires one store, one payment provider and one set of
/// entity locks into the services. Every service shares the same locks, so
/// a refund and a concurrent debit of the same user serialize no matter
/// which service issues them. Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct EscrowEngine {
    pub ledger: Ledger,
    pub users: Users,
    pub requests: Requests,
    pub applications: Applications,
    pub purchases: ConnectPurchases,
    pub reconciler: WebhookReconciler,
    store: StoreHandle,
}

impl EscrowEngine {
    /// Creates a new `EscrowEngine`.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence for users, requests, applications and chat rooms.
    /// * `provider` - The external payment provider.
    /// * `config` - Currency and pricing policy.
    pub fn new(
        store: StoreHandle,
        provider: Arc<dyn PaymentProvider>,
        config: EngineConfig,
    ) -> Self {
        let locks = EntityLocks::new();
        let gateway = GatewayClient::new(provider);
        let ledger = Ledger::new(store.clone(), locks.clone());
        let users = Users::new(store.clone(), locks.clone());
        let requests = Requests::new(store.clone(), locks.clone(), config.requirement);
        let applications = Applications::new(
            store.clone(),
            locks.clone(),
            ledger.clone(),
            gateway.clone(),
            config.currency.clone(),
        );
        let purchases = ConnectPurchases::new(
            store.clone(),
            locks,
            ledger.clone(),
            gateway.clone(),
            config.connect_pricing,
            config.currency,
        );
        let reconciler = WebhookReconciler::new(gateway, applications.clone(), purchases.clone());

        Self {
            ledger,
            users,
            requests,
            applications,
            purchases,
            reconciler,
            store,
        }
    }

    /// Chat rooms the user takes part in.
    pub async fn chat_rooms(&self, user: UserId) -> Result<Vec<ChatRoom>> {
        self.store.chat_rooms_for(user).await
    }
}
