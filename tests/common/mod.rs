#![allow(dead_code)]

use async_trait::async_trait;
use connectpay::application::engine::{EngineConfig, EscrowEngine};
use connectpay::domain::ids::UserId;
use connectpay::domain::payment::{CheckoutRequest, GatewayError, PaymentStatus, VerifiedPayment};
use connectpay::domain::ports::PaymentProvider;
use connectpay::domain::request::{NewRequest, ServiceRequest};
use connectpay::domain::user::{Role, User};
use connectpay::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Payment provider double. Verification answers come from whatever the
/// test recorded with `settle`/`record`; unknown references are rejected.
#[derive(Default)]
pub struct StubProvider {
    payments: Mutex<HashMap<String, VerifiedPayment>>,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    unavailable: AtomicBool,
    fail_initialize: AtomicBool,
    verify_calls: AtomicUsize,
}

impl StubProvider {
    /// Records a successful payment of `amount` for `reference`.
    pub fn settle(&self, reference: &str, amount: Decimal) {
        self.record(reference, PaymentStatus::Success, amount);
    }

    pub fn record(&self, reference: &str, status: PaymentStatus, amount: Decimal) {
        self.record_payment(
            reference,
            VerifiedPayment {
                reference: Some(reference.to_string()),
                status,
                amount,
                currency: Some("ETB".to_string()),
                paid_at: None,
            },
        );
    }

    pub fn record_payment(&self, reference: &str, payment: VerifiedPayment) {
        self.payments
            .lock()
            .unwrap()
            .insert(reference.to_string(), payment);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn initialize(&self, checkout: &CheckoutRequest) -> Result<String, GatewayError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("provider is down".to_string()));
        }
        self.checkouts.lock().unwrap().push(checkout.clone());
        Ok(format!("https://checkout.test/pay/{}", checkout.tx_ref))
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("verification timed out".to_string()));
        }
        self.payments
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| {
                GatewayError::Rejected("Invalid transaction or Transaction not found".to_string())
            })
    }
}

pub struct Harness {
    pub engine: EscrowEngine,
    pub provider: Arc<StubProvider>,
    pub store: Arc<InMemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(StubProvider::default());
        let engine = EscrowEngine::new(store.clone(), provider.clone(), config);
        Self {
            engine,
            provider,
            store,
        }
    }

    /// Seeds a user with an opening balance through the trusted import path.
    pub async fn user(&self, name: &str, role: Role, connects: u32) -> User {
        let user = User::new(name, role)
            .with_phone("0911000000")
            .with_connects(connects);
        let id = user.id;
        self.engine.users.import(vec![user]).await.unwrap();
        self.engine.users.get(id).await.unwrap()
    }

    pub async fn citizen(&self) -> User {
        self.user("Citizen", Role::Citizen, 0).await
    }

    pub async fn officer(&self, connects: u32) -> User {
        self.user("Officer", Role::Officer, connects).await
    }

    pub async fn request(&self, owner: UserId, price: Decimal) -> ServiceRequest {
        self.engine
            .requests
            .create(
                owner,
                NewRequest {
                    title: "Trade licence renewal".to_string(),
                    description: "Renew before the end of the month".to_string(),
                    category: "trade".to_string(),
                    price,
                    required_connect: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn balance(&self, user: UserId) -> u32 {
        self.engine.ledger.balance(user).await.unwrap()
    }
}
