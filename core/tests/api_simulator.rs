//! API simulator tests. Time is paused, so the artificial latency costs
//! nothing and `executionTime` equals the slept delay exactly.

use cipherluma_core::{
    api_simulator::{ApiRequest, SimulatedFailure},
    config::{AppConfig, SimulatorConfig, SimulatorMode},
    kv::MemoryKv,
    services::{test_clock, LumaServices},
    transaction_store::DEMO_USER_ID,
    types::HttpMethod,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(simulator: SimulatorConfig) -> LumaServices {
    init_logging();
    let config = AppConfig {
        simulator,
        ..AppConfig::default_test()
    };
    LumaServices::build(config, Arc::new(MemoryKv::new()), test_clock())
}

fn reliable() -> LumaServices {
    build(SimulatorConfig {
        success_rate: 1.0,
        ..SimulatorConfig::default()
    })
}

fn request(endpoint: &str, method: HttpMethod, payload: Value) -> ApiRequest {
    ApiRequest {
        endpoint: endpoint.into(),
        method,
        payload,
        api_key: "cl_test_4f9a2c".into(),
        user_id: DEMO_USER_ID.into(),
    }
}

#[test]
fn success_ratio_tracks_configured_rate() {
    let mut services = LumaServices::build_test(42);
    let mut failures: HashMap<u16, usize> = HashMap::new();
    let samples = 10_000;
    for _ in 0..samples {
        if let Err(f) = services.simulator.roll_outcome() {
            *failures.entry(f.status()).or_default() += 1;
        }
    }

    let failed: usize = failures.values().sum();
    // 0.15 * 10_000 = 1500, sigma ~ 36.
    assert!(
        (1340..=1660).contains(&failed),
        "expected ~1500 failures, got {failed}"
    );
    for f in SimulatedFailure::ALL {
        let n = failures.get(&f.status()).copied().unwrap_or(0);
        assert!(n > 200, "{} drawn only {n} times", f.status());
    }
}

#[tokio::test(start_paused = true)]
async fn invalid_key_is_rejected_without_delay_and_logged() {
    init_logging();
    let mut services = LumaServices::build_test(42);
    let before = services.transactions().unwrap().get_api_usage(None).len();

    for _ in 0..20 {
        let response = services
            .simulator
            .call(ApiRequest {
                api_key: "sk_live_wrong".into(),
                ..request("/balance", HttpMethod::Get, json!({}))
            })
            .await;
        assert_eq!(response.status, 401);
        assert_eq!(response.error_message(), Some("Invalid API key"));
    }

    let usage = services.transactions().unwrap().get_api_usage(None);
    assert_eq!(usage.len(), before + 20);
    assert_eq!(usage[0].response_status, 401);
    assert_eq!(usage[0].execution_time, 0);
    assert_eq!(usage[0].error_message.as_deref(), Some("Invalid API key"));
}

#[tokio::test(start_paused = true)]
async fn every_call_is_logged_with_latency_in_window() {
    let mut services = LumaServices::build_test(7);
    let before = services.transactions().unwrap().get_api_usage(None).len();

    for _ in 0..200 {
        let response = services
            .simulator
            .call(request("/balance", HttpMethod::Get, json!({})))
            .await;
        assert!(
            [200, 400, 401, 429, 500, 503].contains(&response.status),
            "unexpected status {}",
            response.status
        );
    }

    let store = services.transactions().unwrap();
    let usage = store.get_api_usage(None);
    assert_eq!(usage.len(), before + 200);
    for entry in usage.iter().take(200) {
        assert!(
            (200..=1200).contains(&entry.execution_time),
            "execution time {} outside window",
            entry.execution_time
        );
    }
    let failed = usage.iter().take(200).filter(|u| !u.is_success()).count();
    assert!(failed > 0 && failed < 80, "implausible failure count {failed}");
}

#[tokio::test(start_paused = true)]
async fn unknown_endpoint_is_not_found() {
    let mut services = reliable();
    let response = services
        .simulator
        .call(request("/does-not-exist", HttpMethod::Get, json!({})))
        .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.error_message(), Some("Endpoint not found"));
}

#[tokio::test(start_paused = true)]
async fn transfer_quotes_one_percent_fee() {
    let mut services = reliable();
    let response = services
        .simulator
        .call(request(
            "/transfer",
            HttpMethod::Post,
            json!({ "to": "sarah.chen@example.com", "amount": 250.0, "currency": "EUR" }),
        ))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["fee"], json!(2.5));
    assert_eq!(response.body["status"], "pending");
    assert_eq!(response.body["currency"], "EUR");
    assert!(response.body["transactionId"]
        .as_str()
        .is_some_and(|id| id.starts_with("txn_") && id.len() == 16));
}

#[tokio::test(start_paused = true)]
async fn transactions_endpoint_paginates_the_store() {
    let mut services = reliable();

    let first = services
        .simulator
        .call(request("/transactions", HttpMethod::Get, json!({ "limit": 4 })))
        .await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body["transactions"].as_array().map(Vec::len), Some(4));
    assert_eq!(first.body["pagination"]["total"], 6);
    assert_eq!(first.body["pagination"]["hasMore"], true);

    let second = services
        .simulator
        .call(request(
            "/transactions",
            HttpMethod::Get,
            json!({ "limit": 4, "offset": 4 }),
        ))
        .await;
    assert_eq!(second.body["transactions"].as_array().map(Vec::len), Some(2));
    assert_eq!(second.body["pagination"]["hasMore"], false);

    let pending = services
        .simulator
        .call(request(
            "/transactions",
            HttpMethod::Get,
            json!({ "status": "pending" }),
        ))
        .await;
    assert_eq!(pending.body["pagination"]["total"], 1);
    assert_eq!(pending.body["pagination"]["limit"], 10);
}

#[tokio::test(start_paused = true)]
async fn transactions_endpoint_tolerates_huge_page_size() {
    let mut services = reliable();
    let before = services.transactions().unwrap().get_api_usage(None).len();

    let response = services
        .simulator
        .call(request(
            "/transactions",
            HttpMethod::Get,
            json!({ "limit": u64::MAX, "offset": 1 }),
        ))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["transactions"].as_array().map(Vec::len), Some(5));
    assert_eq!(response.body["pagination"]["hasMore"], false);

    let usage = services.transactions().unwrap().get_api_usage(None);
    assert_eq!(usage.len(), before + 1);
    assert_eq!(usage[0].response_status, 200);
}

#[tokio::test(start_paused = true)]
async fn webhooks_create_on_post_and_list_otherwise() {
    let mut services = reliable();

    let created = services
        .simulator
        .call(request(
            "/webhooks",
            HttpMethod::Post,
            json!({ "url": "https://example.com/h", "events": ["transfer.completed"] }),
        ))
        .await;
    assert!(created.body["webhookId"]
        .as_str()
        .is_some_and(|id| id.starts_with("wh_")));

    let listed = services
        .simulator
        .call(request("/webhooks", HttpMethod::Get, json!({})))
        .await;
    assert!(listed.body["webhooks"].is_array());

    let methods = services
        .simulator
        .call(request("/payment-methods", HttpMethod::Get, json!({})))
        .await;
    assert_eq!(methods.body.as_array().map(Vec::len), Some(4));
}

#[tokio::test(start_paused = true)]
async fn validating_mode_rejects_bad_payloads() {
    let mut services = build(SimulatorConfig {
        mode: SimulatorMode::Validating,
        ..SimulatorConfig::default()
    });

    let missing_amount = services
        .simulator
        .call(request(
            "/transfer",
            HttpMethod::Post,
            json!({ "to": "x@example.com", "currency": "USD" }),
        ))
        .await;
    assert_eq!(missing_amount.status, 400);

    let bad_currency = services
        .simulator
        .call(request(
            "/transfer",
            HttpMethod::Post,
            json!({ "to": "x@example.com", "amount": 10.0, "currency": "usd" }),
        ))
        .await;
    assert_eq!(bad_currency.status, 400);

    let good = services
        .simulator
        .call(request(
            "/transfer",
            HttpMethod::Post,
            json!({ "to": "x@example.com", "amount": 10.0, "currency": "USD" }),
        ))
        .await;
    assert_eq!(good.status, 200);

    let big_page = services
        .simulator
        .call(request("/transactions", HttpMethod::Get, json!({ "limit": 500 })))
        .await;
    assert_eq!(big_page.status, 400);
}

#[tokio::test(start_paused = true)]
async fn same_seed_same_outcomes() {
    let mut a = LumaServices::build_test(99);
    let mut b = LumaServices::build_test(99);

    for _ in 0..30 {
        let ra = a
            .simulator
            .call(request("/balance", HttpMethod::Get, json!({})))
            .await;
        let rb = b
            .simulator
            .call(request("/balance", HttpMethod::Get, json!({})))
            .await;
        assert_eq!(ra, rb);
    }
    let latencies = |s: &LumaServices| -> Vec<u64> {
        s.transactions()
            .unwrap()
            .get_api_usage(None)
            .iter()
            .map(|u| u.execution_time)
            .collect()
    };
    assert_eq!(latencies(&a), latencies(&b));
}
