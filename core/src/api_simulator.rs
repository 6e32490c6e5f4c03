//! API simulator: a stand-in for the CipherLuma REST API.
//!
//! ORDER OF A CALL (fixed):
//!   1. Key prefix check. A bad key answers 401 immediately, no delay.
//!   2. Artificial latency, uniform in [min_latency_ms, max_latency_ms].
//!   3. Randomized mode: success coin, rolled before the endpoint is read.
//!      Validating mode: per-endpoint payload checks instead of the coin.
//!   4. Endpoint dispatch; unknown endpoints answer 404.
//!   5. The call is appended to the API usage log, success or not.
//!
//! Simulated failures are response values, never `Err`.

use crate::{
    clock::SharedClock,
    config::{SimulatorConfig, SimulatorMode},
    rng::StoreRng,
    transaction_store::{NewApiUsage, SharedTransactionStore, TransactionFilter},
    types::{round2, EntityId, HttpMethod},
};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub payload: Value,
    pub api_key: String,
    pub user_id: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Error shape shared by every failure: `{status, error}`.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "status": status, "error": message }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.body.get("error").and_then(Value::as_str)
    }
}

/// The canned failures the randomized coin draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFailure {
    BadRequest,
    Unauthorized,
    RateLimited,
    ServerError,
    Unavailable,
}

impl SimulatedFailure {
    pub const ALL: [SimulatedFailure; 5] = [
        Self::BadRequest,
        Self::Unauthorized,
        Self::RateLimited,
        Self::ServerError,
        Self::Unavailable,
    ];

    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::RateLimited => 429,
            Self::ServerError => 500,
            Self::Unavailable => 503,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request: invalid parameters",
            Self::Unauthorized => "Unauthorized: API key rejected",
            Self::RateLimited => "Rate limit exceeded",
            Self::ServerError => "Internal server error",
            Self::Unavailable => "Service temporarily unavailable",
        }
    }

    pub fn response(&self) -> ApiResponse {
        ApiResponse::error(self.status(), self.message())
    }
}

pub struct ApiSimulator {
    config: SimulatorConfig,
    transactions: SharedTransactionStore,
    clock: SharedClock,
    rng: StoreRng,
}

impl ApiSimulator {
    pub fn new(
        config: SimulatorConfig,
        transactions: SharedTransactionStore,
        clock: SharedClock,
        rng: StoreRng,
    ) -> Self {
        Self {
            config,
            transactions,
            clock,
            rng,
        }
    }

    /// Prefix check only. No signature, no lookup.
    pub fn is_valid_key(&self, api_key: &str) -> bool {
        api_key.starts_with(&self.config.live_key_prefix)
            || api_key.starts_with(&self.config.test_key_prefix)
    }

    /// Roll the randomized success coin; on failure pick a canned error
    /// uniformly. Independent of the request.
    pub fn roll_outcome(&mut self) -> Result<(), SimulatedFailure> {
        if self.rng.chance(self.config.success_rate) {
            return Ok(());
        }
        Err(*self
            .rng
            .pick(&SimulatedFailure::ALL)
            .unwrap_or(&SimulatedFailure::ServerError))
    }

    /// Simulate one request. Cannot be cancelled once started.
    pub async fn call(&mut self, request: ApiRequest) -> ApiResponse {
        let started = Instant::now();

        if !self.is_valid_key(&request.api_key) {
            log::warn!("Rejected call to {} with invalid API key", request.endpoint);
            let response = ApiResponse::error(401, "Invalid API key");
            self.record(&request, &response, started);
            return response;
        }

        let delay_ms = self
            .rng
            .range_inclusive(self.config.min_latency_ms, self.config.max_latency_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let response = match self.config.mode {
            SimulatorMode::Randomized => match self.roll_outcome() {
                Ok(()) => self.dispatch(&request),
                Err(failure) => failure.response(),
            },
            SimulatorMode::Validating => match validate(&request) {
                Ok(()) => self.dispatch(&request),
                Err(message) => ApiResponse::error(400, &message),
            },
        };

        self.record(&request, &response, started);
        response
    }

    fn record(&self, request: &ApiRequest, response: &ApiResponse, started: Instant) {
        let execution_time = started.elapsed().as_millis() as u64;
        let usage = NewApiUsage {
            api_key: request.api_key.clone(),
            endpoint: request.endpoint.clone(),
            method: request.method,
            request_data: request.payload.clone(),
            response_data: response.body.clone(),
            response_status: response.status,
            user_id: request.user_id.clone(),
            execution_time,
            error_message: response.error_message().map(String::from),
        };
        match self.transactions.lock() {
            Ok(mut store) => {
                store.add_api_usage(usage);
            }
            Err(_) => log::error!("Transaction store lock poisoned; API call not logged"),
        }
    }

    fn dispatch(&mut self, request: &ApiRequest) -> ApiResponse {
        match request.endpoint.as_str() {
            "/transfer" => self.transfer(&request.payload),
            "/balance" => ApiResponse::ok(balance_body()),
            "/transactions" => self.list_transactions(request),
            "/exchange-rates" => ApiResponse::ok(json!({
                "base": "USD",
                "rates": exchange_rates(),
                "timestamp": self.clock.now().to_rfc3339(),
            })),
            "/webhooks" => match request.method {
                HttpMethod::Post => self.create_webhook(&request.payload),
                _ => ApiResponse::ok(json!({ "webhooks": registered_webhooks() })),
            },
            "/payment-methods" => ApiResponse::ok(payment_methods()),
            other => {
                log::debug!("Unknown endpoint {other}");
                ApiResponse::error(404, "Endpoint not found")
            }
        }
    }

    fn transfer(&mut self, payload: &Value) -> ApiResponse {
        let amount = payload.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
        let currency = payload
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("USD");
        let to = payload.get("to").and_then(Value::as_str).unwrap_or_default();
        let eta = self.clock.now() + ChronoDuration::days(1);
        ApiResponse::ok(json!({
            "transactionId": format!("txn_{}", self.rng.base36(12)),
            "status": "pending",
            "amount": amount,
            "currency": currency,
            "recipient": to,
            "estimatedDelivery": eta.to_rfc3339(),
            "fee": round2(amount * 0.01),
        }))
    }

    fn list_transactions(&self, request: &ApiRequest) -> ApiResponse {
        let payload = &request.payload;
        let user_id = payload
            .get("userId")
            .and_then(Value::as_str)
            .unwrap_or(request.user_id.as_str());
        let limit = payload
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = payload
            .get("offset")
            .and_then(Value::as_u64)
            .map(|o| o as usize)
            .unwrap_or(0);
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let filter = TransactionFilter::from_pairs([("status", status)]);

        let rows = match self.transactions.lock() {
            Ok(store) => store.filter_transactions(Some(user_id), &filter),
            Err(_) => {
                log::error!("Transaction store lock poisoned during /transactions");
                return SimulatedFailure::ServerError.response();
            }
        };
        let total = rows.len();
        let page: Vec<_> = rows.into_iter().skip(offset).take(limit).collect();
        ApiResponse::ok(json!({
            "transactions": page,
            "pagination": {
                "total": total,
                "limit": limit,
                "offset": offset,
                "hasMore": offset.saturating_add(limit) < total,
            },
        }))
    }

    fn create_webhook(&mut self, payload: &Value) -> ApiResponse {
        let url = payload.get("url").and_then(Value::as_str).unwrap_or_default();
        let events = payload.get("events").cloned().unwrap_or_else(|| json!([]));
        ApiResponse::ok(json!({
            "webhookId": format!("wh_{}", self.rng.base36(10)),
            "url": url,
            "events": events,
            "status": "active",
        }))
    }
}

/// Per-endpoint input checks used by `SimulatorMode::Validating`.
fn validate(request: &ApiRequest) -> Result<(), String> {
    let payload = &request.payload;
    match request.endpoint.as_str() {
        "/transfer" => {
            if request.method != HttpMethod::Post {
                return Err(format!("/transfer does not accept {}", request.method));
            }
            let to = payload.get("to").and_then(Value::as_str).unwrap_or_default();
            if to.trim().is_empty() {
                return Err("'to' is required".into());
            }
            match payload.get("amount").and_then(Value::as_f64) {
                Some(amount) if amount > 0.0 => {}
                _ => return Err("'amount' must be a positive number".into()),
            }
            let currency = payload
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
                return Err("'currency' must be a 3-letter ISO code".into());
            }
            Ok(())
        }
        "/webhooks" if request.method == HttpMethod::Post => {
            let url = payload.get("url").and_then(Value::as_str).unwrap_or_default();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err("'url' must be an http(s) URL".into());
            }
            let has_events = payload
                .get("events")
                .and_then(Value::as_array)
                .is_some_and(|events| !events.is_empty() && events.iter().all(Value::is_string));
            if !has_events {
                return Err("'events' must be a non-empty list of event names".into());
            }
            Ok(())
        }
        "/transactions" => match payload.get("limit") {
            None => Ok(()),
            Some(limit) => match limit.as_u64() {
                Some(l) if (1..=100).contains(&l) => Ok(()),
                _ => Err("'limit' must be between 1 and 100".into()),
            },
        },
        _ => Ok(()),
    }
}

fn balance_body() -> Value {
    json!({
        "balances": [
            { "currency": "USD", "available": 24_580.42, "pending": 1_250.00 },
            { "currency": "EUR", "available": 8_940.15, "pending": 0.00 },
            { "currency": "GBP", "available": 3_120.88, "pending": 89.99 },
            { "currency": "NGN", "available": 1_450_000.00, "pending": 0.00 },
        ]
    })
}

fn exchange_rates() -> Value {
    json!({
        "EUR": 0.92,
        "GBP": 0.79,
        "JPY": 149.50,
        "CAD": 1.36,
        "NGN": 1_550.00,
        "KES": 129.20,
    })
}

fn registered_webhooks() -> Value {
    json!([
        {
            "webhookId": "wh_demo_payments",
            "url": "https://example.com/hooks/payments",
            "events": ["transfer.completed", "transfer.failed"],
            "status": "active",
        },
        {
            "webhookId": "wh_demo_kyc",
            "url": "https://example.com/hooks/kyc",
            "events": ["kyc.approved"],
            "status": "disabled",
        },
    ])
}

fn payment_methods() -> Value {
    json!([
        {
            "type": "bank_transfer",
            "supportedCurrencies": ["USD", "EUR", "GBP"],
            "fees": { "fixed": 2.50, "percentage": 0.0 },
            "processingTime": "1-3 business days",
        },
        {
            "type": "card",
            "supportedCurrencies": ["USD", "EUR", "GBP", "CAD"],
            "fees": { "fixed": 0.30, "percentage": 2.9 },
            "processingTime": "instant",
        },
        {
            "type": "crypto",
            "supportedCurrencies": ["BTC", "ETH", "USDC"],
            "fees": { "fixed": 0.0, "percentage": 1.0 },
            "processingTime": "10-60 minutes",
        },
        {
            "type": "mobile_money",
            "supportedCurrencies": ["NGN", "KES"],
            "fees": { "fixed": 0.0, "percentage": 0.5 },
            "processingTime": "instant",
        },
    ])
}
