//! Transaction store: the payment log and the API usage log.
//!
//! Two independent collections under two keys. Transactions are immutable
//! except for `status`; API usage entries are append-only.

use crate::{
    clock::SharedClock,
    collection::Collection,
    config::StorageKeys,
    error::{LumaError, LumaResult},
    export::{self, CsvRecord, ExportFormat},
    kv::SharedKv,
    rng::{record_id, StoreRng},
    types::{contains_ci, date_string, round2, time_string, EntityId, HttpMethod, Timestamp},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// The user id every seeded demo record belongs to.
pub const DEMO_USER_ID: &str = "user_demo";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sent,
    Received,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
        }
    }
}

impl FromStr for TransactionType {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "received" => Ok(Self::Received),
            other => Err(LumaError::Config(format!("Unknown transaction type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            other => Err(LumaError::Config(format!("Unknown transaction status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    pub currency: String,
    /// Set only on `sent` transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Set only on `received` transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub status: TransactionStatus,
    pub date: String,
    pub time: String,
    pub timestamp: Timestamp,
    pub method: String,
    pub fee: f64,
    pub reference: String,
    #[serde(default)]
    pub description: String,
    pub user_id: EntityId,
}

impl Transaction {
    pub fn counterparty(&self) -> &str {
        self.recipient
            .as_deref()
            .or(self.sender.as_deref())
            .unwrap_or_default()
    }
}

/// Caller-supplied fields for a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    pub currency: String,
    /// Recipient for `sent`, sender for `received`.
    pub counterparty: String,
    pub status: TransactionStatus,
    pub method: String,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub description: String,
    pub user_id: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsage {
    pub id: EntityId,
    pub api_key: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub request_data: Value,
    pub response_data: Value,
    pub response_status: u16,
    pub timestamp: Timestamp,
    pub date: String,
    pub time: String,
    pub user_id: EntityId,
    /// Milliseconds.
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ApiUsage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.response_status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApiUsage {
    pub api_key: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub request_data: Value,
    pub response_data: Value,
    pub response_status: u16,
    pub user_id: EntityId,
    pub execution_time: u64,
    pub error_message: Option<String>,
}

/// Whitelisted transaction filters. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub kind: Option<TransactionType>,
    pub currency: Option<String>,
    pub method: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub search: Option<String>,
}

impl TransactionFilter {
    /// Build from loose key/value pairs (query-string style).
    /// Unknown keys, empty values and unparseable values are skipped.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() || value == "all" {
                continue;
            }
            match key {
                "status" => filter.status = value.parse().ok(),
                "type" => filter.kind = value.parse().ok(),
                "currency" => filter.currency = Some(value.to_string()),
                "method" => filter.method = Some(value.to_string()),
                "dateFrom" => filter.date_from = parse_date(value),
                "dateTo" => filter.date_to = parse_date(value),
                "minAmount" => filter.min_amount = value.parse().ok(),
                "maxAmount" => filter.max_amount = value.parse().ok(),
                "search" => filter.search = Some(value.to_string()),
                other => log::debug!("Ignoring unknown transaction filter key '{other}'"),
            }
        }
        filter
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        if self.status.is_some_and(|s| s != t.status) {
            return false;
        }
        if self.kind.is_some_and(|k| k != t.kind) {
            return false;
        }
        if let Some(ref c) = self.currency {
            if !c.eq_ignore_ascii_case(&t.currency) {
                return false;
            }
        }
        if let Some(ref m) = self.method {
            if !m.eq_ignore_ascii_case(&t.method) {
                return false;
            }
        }
        let day = t.timestamp.date_naive();
        if self.date_from.is_some_and(|from| day < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| day > to) {
            return false;
        }
        if self.min_amount.is_some_and(|min| t.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| t.amount > max) {
            return false;
        }
        if let Some(ref q) = self.search {
            if !transaction_matches_query(t, &q.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn transaction_matches_query(t: &Transaction, needle: &str) -> bool {
    contains_ci(&t.description, needle)
        || t.recipient.as_deref().is_some_and(|r| contains_ci(r, needle))
        || t.sender.as_deref().is_some_and(|s| contains_ci(s, needle))
        || contains_ci(&t.reference, needle)
        || contains_ci(&t.method, needle)
}

/// Recency window for usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsWindow {
    Day,
    Week,
    Month,
}

impl StatsWindow {
    pub fn span(&self) -> Duration {
        match self {
            Self::Day => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }
}

impl FromStr for StatsWindow {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(LumaError::Config(format!("Unknown stats window: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsageStats {
    pub total_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
    /// Mean milliseconds; 0 when there are no calls.
    pub average_execution_time: f64,
    /// Percent; 0 when there are no calls.
    pub success_rate: f64,
    pub top_endpoints: Vec<EndpointCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub transaction_count: usize,
    /// Completed `sent` amounts.
    pub total_sent: f64,
    /// Completed `received` amounts.
    pub total_received: f64,
    pub total_fees: f64,
    pub completed_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
}

pub struct TransactionStore {
    transactions: Collection<Transaction>,
    api_usage: Collection<ApiUsage>,
    clock: SharedClock,
    rng: StoreRng,
}

/// The simulator logs into the same store the dashboard reads.
pub type SharedTransactionStore = Arc<Mutex<TransactionStore>>;

impl TransactionStore {
    /// Load both logs, seeding each with demo records if empty.
    pub fn open(kv: SharedKv, keys: &StorageKeys, clock: SharedClock, rng: StoreRng) -> Self {
        let mut transactions = Collection::load(kv.clone(), &keys.transactions);
        let mut api_usage = Collection::load(kv, &keys.api_usage);
        let now = clock.now();
        transactions.seed_if_empty(|| seed_transactions(now));
        api_usage.seed_if_empty(|| seed_api_usage(now));
        Self {
            transactions,
            api_usage,
            clock,
            rng,
        }
    }

    pub fn into_shared(self) -> SharedTransactionStore {
        Arc::new(Mutex::new(self))
    }

    // ── Transactions ───────────────────────────────────────────

    pub fn add_transaction(&mut self, new: NewTransaction) -> Transaction {
        let now = self.clock.now();
        let millis = now.timestamp_millis();
        let (recipient, sender) = match new.kind {
            TransactionType::Sent => (Some(new.counterparty), None),
            TransactionType::Received => (None, Some(new.counterparty)),
        };
        let txn = Transaction {
            id: record_id("txn", millis, &mut self.rng),
            kind: new.kind,
            amount: new.amount,
            currency: new.currency,
            recipient,
            sender,
            status: new.status,
            date: date_string(&now),
            time: time_string(&now),
            timestamp: now,
            method: new.method,
            fee: new.fee,
            reference: format!(
                "TXN-{:06}-{}",
                millis.rem_euclid(1_000_000),
                self.rng.base36_upper(6)
            ),
            description: new.description,
            user_id: new.user_id,
        };
        log::debug!(
            "Transaction {} added: {} {} {} for {}",
            txn.reference,
            txn.kind.as_str(),
            txn.amount,
            txn.currency,
            txn.user_id
        );
        self.transactions.prepend(txn.clone());
        txn
    }

    /// All transactions (optionally for one user), newest first.
    pub fn get_transactions(&self, user_id: Option<&str>) -> Vec<Transaction> {
        newest_first(
            self.transactions
                .items()
                .iter()
                .filter(|t| user_id.is_none_or(|u| t.user_id == u))
                .cloned()
                .collect(),
        )
    }

    pub fn get_transaction(&self, id: &str) -> LumaResult<Transaction> {
        self.transactions
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("Transaction", id))
    }

    pub fn update_transaction_status(
        &mut self,
        id: &str,
        status: TransactionStatus,
    ) -> LumaResult<Transaction> {
        self.transactions
            .update_where(
                |t| t.id == id,
                |t| {
                    t.status = status;
                    t.clone()
                },
            )
            .ok_or_else(|| {
                log::warn!("Status update for unknown transaction {id}");
                LumaError::not_found("Transaction", id)
            })
    }

    pub fn filter_transactions(
        &self,
        user_id: Option<&str>,
        filter: &TransactionFilter,
    ) -> Vec<Transaction> {
        newest_first(
            self.transactions
                .items()
                .iter()
                .filter(|t| user_id.is_none_or(|u| t.user_id == u))
                .filter(|t| filter.matches(t))
                .cloned()
                .collect(),
        )
    }

    pub fn search_transactions(&self, user_id: Option<&str>, query: &str) -> Vec<Transaction> {
        let filter = TransactionFilter {
            search: Some(query.to_string()),
            ..TransactionFilter::default()
        };
        self.filter_transactions(user_id, &filter)
    }

    pub fn get_transaction_summary(&self, user_id: Option<&str>) -> TransactionSummary {
        let mut summary = TransactionSummary {
            transaction_count: 0,
            total_sent: 0.0,
            total_received: 0.0,
            total_fees: 0.0,
            completed_count: 0,
            pending_count: 0,
            failed_count: 0,
        };
        for t in self
            .transactions
            .items()
            .iter()
            .filter(|t| user_id.is_none_or(|u| t.user_id == u))
        {
            summary.transaction_count += 1;
            match t.status {
                TransactionStatus::Completed => {
                    summary.completed_count += 1;
                    summary.total_fees += t.fee;
                    match t.kind {
                        TransactionType::Sent => summary.total_sent += t.amount,
                        TransactionType::Received => summary.total_received += t.amount,
                    }
                }
                TransactionStatus::Pending => summary.pending_count += 1,
                TransactionStatus::Failed => summary.failed_count += 1,
            }
        }
        summary.total_sent = round2(summary.total_sent);
        summary.total_received = round2(summary.total_received);
        summary.total_fees = round2(summary.total_fees);
        summary
    }

    pub fn export_transactions(
        &self,
        user_id: Option<&str>,
        filter: Option<&TransactionFilter>,
        format: ExportFormat,
    ) -> LumaResult<String> {
        let rows = match filter {
            Some(f) => self.filter_transactions(user_id, f),
            None => self.get_transactions(user_id),
        };
        export::export(&rows, format)
    }

    // ── API usage ──────────────────────────────────────────────

    pub fn add_api_usage(&mut self, new: NewApiUsage) -> ApiUsage {
        let now = self.clock.now();
        let entry = ApiUsage {
            id: record_id("api", now.timestamp_millis(), &mut self.rng),
            api_key: new.api_key,
            endpoint: new.endpoint,
            method: new.method,
            request_data: new.request_data,
            response_data: new.response_data,
            response_status: new.response_status,
            timestamp: now,
            date: date_string(&now),
            time: time_string(&now),
            user_id: new.user_id,
            execution_time: new.execution_time,
            error_message: new.error_message,
        };
        log::debug!(
            "API usage logged: {} {} -> {} ({} ms)",
            entry.method,
            entry.endpoint,
            entry.response_status,
            entry.execution_time
        );
        self.api_usage.prepend(entry.clone());
        entry
    }

    pub fn get_api_usage(&self, user_id: Option<&str>) -> Vec<ApiUsage> {
        let mut rows: Vec<ApiUsage> = self
            .api_usage
            .items()
            .iter()
            .filter(|u| user_id.is_none_or(|id| u.user_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }

    pub fn get_api_usage_stats(
        &self,
        user_id: Option<&str>,
        window: Option<StatsWindow>,
    ) -> ApiUsageStats {
        let cutoff = window.map(|w| self.clock.now() - w.span());
        let rows: Vec<&ApiUsage> = self
            .api_usage
            .items()
            .iter()
            .filter(|u| user_id.is_none_or(|id| u.user_id == id))
            .filter(|u| cutoff.is_none_or(|c| u.timestamp >= c))
            .collect();

        let total_calls = rows.len();
        let successful_calls = rows.iter().filter(|u| u.is_success()).count();
        let (average_execution_time, success_rate) = if total_calls == 0 {
            (0.0, 0.0)
        } else {
            let total_ms: u64 = rows.iter().map(|u| u.execution_time).sum();
            (
                total_ms as f64 / total_calls as f64,
                successful_calls as f64 / total_calls as f64 * 100.0,
            )
        };

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for u in &rows {
            *counts.entry(u.endpoint.as_str()).or_default() += 1;
        }
        let mut top_endpoints: Vec<EndpointCount> = counts
            .into_iter()
            .map(|(endpoint, count)| EndpointCount {
                endpoint: endpoint.to_string(),
                count,
            })
            .collect();
        top_endpoints.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        top_endpoints.truncate(5);

        ApiUsageStats {
            total_calls,
            successful_calls,
            failed_calls: total_calls - successful_calls,
            average_execution_time,
            success_rate,
            top_endpoints,
        }
    }

    pub fn export_api_usage(
        &self,
        user_id: Option<&str>,
        format: ExportFormat,
    ) -> LumaResult<String> {
        export::export(&self.get_api_usage(user_id), format)
    }
}

fn newest_first(mut rows: Vec<Transaction>) -> Vec<Transaction> {
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    rows
}

impl CsvRecord for Transaction {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Type",
        "Amount",
        "Currency",
        "Counterparty",
        "Status",
        "Date",
        "Time",
        "Method",
        "Fee",
        "Reference",
        "Description",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.kind.as_str().to_string(),
            format!("{:.2}", self.amount),
            self.currency.clone(),
            self.counterparty().to_string(),
            self.status.as_str().to_string(),
            self.date.clone(),
            self.time.clone(),
            self.method.clone(),
            format!("{:.2}", self.fee),
            self.reference.clone(),
            self.description.clone(),
        ]
    }
}

impl CsvRecord for ApiUsage {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Endpoint",
        "Method",
        "Status",
        "Execution Time (ms)",
        "Date",
        "Time",
        "API Key",
        "Error",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.endpoint.clone(),
            self.method.to_string(),
            self.response_status.to_string(),
            self.execution_time.to_string(),
            self.date.clone(),
            self.time.clone(),
            self.api_key.clone(),
            self.error_message.clone().unwrap_or_default(),
        ]
    }
}

// ── Demo data ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn demo_transaction(
    id: &str,
    kind: TransactionType,
    amount: f64,
    currency: &str,
    counterparty: &str,
    status: TransactionStatus,
    at: Timestamp,
    method: &str,
    fee: f64,
    reference: &str,
    description: &str,
) -> Transaction {
    let (recipient, sender) = match kind {
        TransactionType::Sent => (Some(counterparty.to_string()), None),
        TransactionType::Received => (None, Some(counterparty.to_string())),
    };
    Transaction {
        id: id.to_string(),
        kind,
        amount,
        currency: currency.to_string(),
        recipient,
        sender,
        status,
        date: date_string(&at),
        time: time_string(&at),
        timestamp: at,
        method: method.to_string(),
        fee,
        reference: reference.to_string(),
        description: description.to_string(),
        user_id: DEMO_USER_ID.to_string(),
    }
}

fn seed_transactions(now: Timestamp) -> Vec<Transaction> {
    use TransactionStatus::*;
    use TransactionType::*;
    vec![
        demo_transaction(
            "txn_seed_001",
            Sent,
            1250.00,
            "USD",
            "sarah.chen@example.com",
            Completed,
            now - Duration::hours(2),
            "Bank Transfer",
            2.50,
            "TXN-104233-K8J2PQ",
            "Office rent share",
        ),
        demo_transaction(
            "txn_seed_002",
            Received,
            3400.00,
            "EUR",
            "Nordwind GmbH",
            Completed,
            now - Duration::hours(20),
            "SEPA",
            0.00,
            "TXN-388107-ZX41MA",
            "Invoice #2041",
        ),
        demo_transaction(
            "txn_seed_003",
            Sent,
            89.99,
            "GBP",
            "payments@streamly.co.uk",
            Pending,
            now - Duration::days(2),
            "Card",
            0.90,
            "TXN-501822-Q0LR7C",
            "Annual subscription",
        ),
        demo_transaction(
            "txn_seed_004",
            Sent,
            15000.00,
            "USD",
            "acme-supplies@example.com",
            Failed,
            now - Duration::days(4),
            "Wire Transfer",
            25.00,
            "TXN-662910-B3VN8D",
            "Bulk equipment order",
        ),
        demo_transaction(
            "txn_seed_005",
            Received,
            720.50,
            "USD",
            "marcus.bell@example.com",
            Completed,
            now - Duration::days(9),
            "Crypto",
            1.44,
            "TXN-730045-HH5T2E",
            "Freelance design work",
        ),
        demo_transaction(
            "txn_seed_006",
            Sent,
            260.00,
            "NGN",
            "adaeze.okafor@example.com",
            Completed,
            now - Duration::days(21),
            "Mobile Money",
            0.52,
            "TXN-891376-P9W3YS",
            "Family support",
        ),
    ]
}

fn demo_usage(
    id: &str,
    endpoint: &str,
    method: HttpMethod,
    status: u16,
    execution_time: u64,
    at: Timestamp,
) -> ApiUsage {
    let (response_data, error_message) = if (200..300).contains(&status) {
        (json!({ "ok": true }), None)
    } else {
        (
            json!({ "status": status, "error": "Rate limit exceeded" }),
            Some("Rate limit exceeded".to_string()),
        )
    };
    ApiUsage {
        id: id.to_string(),
        api_key: "cl_test_demo4f9a2c".to_string(),
        endpoint: endpoint.to_string(),
        method,
        request_data: json!({}),
        response_data,
        response_status: status,
        timestamp: at,
        date: date_string(&at),
        time: time_string(&at),
        user_id: DEMO_USER_ID.to_string(),
        execution_time,
        error_message,
    }
}

fn seed_api_usage(now: Timestamp) -> Vec<ApiUsage> {
    vec![
        demo_usage(
            "api_seed_001",
            "/balance",
            HttpMethod::Get,
            200,
            312,
            now - Duration::hours(1),
        ),
        demo_usage(
            "api_seed_002",
            "/transfer",
            HttpMethod::Post,
            200,
            845,
            now - Duration::hours(5),
        ),
        demo_usage(
            "api_seed_003",
            "/exchange-rates",
            HttpMethod::Get,
            200,
            410,
            now - Duration::days(3),
        ),
        demo_usage(
            "api_seed_004",
            "/transfer",
            HttpMethod::Post,
            429,
            1020,
            now - Duration::days(6),
        ),
        demo_usage(
            "api_seed_005",
            "/transactions",
            HttpMethod::Get,
            200,
            655,
            now - Duration::days(18),
        ),
    ]
}
