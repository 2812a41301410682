//! Property tests for connect conservation.
//!
//! Whatever sequence of applications, rejections, payments and purchases
//! runs, every connect an officer ever held is either on the ledger, held in
//! escrow by a pending application, or consumed by an approved one.

mod common;

use common::Harness;
use connectpay::application::applications::NewApplication;
use connectpay::domain::application::ApplicationStatus;
use connectpay::domain::ids::{ApplicationId, RequestId};
use connectpay::domain::pricing::{ConnectRequirement, StepRequirement};
use connectpay::error::PaymentError;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Apply(usize),
    Reject(usize),
    Pay(usize),
    Buy(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..6).prop_map(Op::Apply),
        2 => (0usize..6).prop_map(Op::Reject),
        2 => (0usize..6).prop_map(Op::Pay),
        1 => (1u32..5).prop_map(Op::Buy),
    ]
}

async fn run(initial: u32, prices: Vec<u32>, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let h = Harness::new();
    let owner = h.citizen().await;
    let officer = h.officer(initial).await;

    let mut requests: Vec<RequestId> = Vec::new();
    for price in &prices {
        requests.push(h.request(owner.id, Decimal::from(*price)).await.id);
    }
    let mut applications: HashMap<usize, ApplicationId> = HashMap::new();
    let mut purchased = 0u32;

    for op in ops {
        match op {
            Op::Apply(i) => {
                let i = i % requests.len();
                let result = h
                    .engine
                    .applications
                    .apply(
                        officer.id,
                        NewApplication {
                            request_id: requests[i],
                            price: Decimal::from(prices[i]),
                            proposal: String::new(),
                        },
                    )
                    .await;
                match result {
                    Ok(app) => {
                        prop_assert!(!applications.contains_key(&i));
                        applications.insert(i, app.id);
                    }
                    Err(PaymentError::InsufficientBalance { .. })
                    | Err(PaymentError::DuplicateApplication) => {}
                    Err(e) => return Err(TestCaseError::fail(e.to_string())),
                }
            }
            Op::Reject(i) => {
                if let Some(id) = applications.get(&(i % requests.len())) {
                    let result = h.engine.applications.reject(owner.id, *id).await;
                    prop_assert!(matches!(
                        result,
                        Ok(_) | Err(PaymentError::AlreadyDecided(_))
                    ));
                }
            }
            Op::Pay(i) => {
                if let Some(id) = applications.get(&(i % requests.len())) {
                    let Ok(acceptance) = h.engine.applications.accept(owner.id, *id).await else {
                        continue;
                    };
                    let reference = acceptance.checkout.tx_ref;
                    h.provider.settle(&reference, acceptance.application.price);
                    h.engine
                        .reconciler
                        .reconcile(&reference)
                        .await
                        .map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
            }
            Op::Buy(quantity) => {
                let checkout = h
                    .engine
                    .purchases
                    .purchase(officer.id, quantity)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                h.provider
                    .settle(&checkout.checkout.tx_ref, checkout.amount);
                h.engine
                    .reconciler
                    .reconcile(&checkout.checkout.tx_ref)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                purchased += quantity;
            }
        }

        let balance = h.balance(officer.id).await;
        let mut held = 0u32;
        for id in applications.values() {
            let app = h
                .engine
                .applications
                .get(*id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            if app.status != ApplicationStatus::Rejected {
                held += app.escrowed_connects;
            }
        }
        prop_assert_eq!(balance + held, initial + purchased);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Connects are neither minted nor lost by any workflow.
    #[test]
    fn connects_are_conserved(
        initial in 0u32..12,
        prices in prop::collection::vec(1u32..1500, 1..6),
        ops in prop::collection::vec(op(), 1..30),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run(initial, prices, ops))?;
    }

    /// The requirement always lands inside the policy bounds.
    #[test]
    fn requirement_within_bounds(price in 0u64..1_000_000, cents in 0u32..100) {
        let policy = StepRequirement::default();
        let price = Decimal::from(price) + Decimal::new(i64::from(cents), 2);
        let required = policy.required_for(price);
        prop_assert!(policy.bounds().contains(&required));
    }

    /// A higher price never needs fewer connects.
    #[test]
    fn requirement_is_monotonic(a in 0u32..5000, b in 0u32..5000) {
        let policy = StepRequirement::default();
        let (low, high) = (a.min(b), a.max(b));
        prop_assert!(
            policy.required_for(Decimal::from(low)) <= policy.required_for(Decimal::from(high))
        );
    }
}
