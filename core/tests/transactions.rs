//! Transaction store tests: the payment log, filtering, summaries and
//! API usage statistics.

use cipherluma_core::{
    export::ExportFormat,
    services::LumaServices,
    transaction_store::{
        NewApiUsage, NewTransaction, StatsWindow, TransactionFilter, TransactionStatus,
        TransactionType, DEMO_USER_ID,
    },
    types::HttpMethod,
};
use serde_json::json;

fn sent(user: &str, amount: f64, currency: &str, to: &str) -> NewTransaction {
    NewTransaction {
        kind: TransactionType::Sent,
        amount,
        currency: currency.into(),
        counterparty: to.into(),
        status: TransactionStatus::Completed,
        method: "Bank Transfer".into(),
        fee: 2.5,
        description: "Rent".into(),
        user_id: user.into(),
    }
}

fn is_reference(r: &str) -> bool {
    let parts: Vec<&str> = r.split('-').collect();
    parts.len() == 3
        && parts[0] == "TXN"
        && parts[1].len() == 6
        && parts[1].chars().all(|c| c.is_ascii_digit())
        && parts[2].len() == 6
        && parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

#[test]
fn added_transaction_is_stamped_and_listed_first() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    let txn = store.add_transaction(sent("u1", 100.0, "USD", "a@b.c"));

    assert!(txn.id.starts_with("txn_"), "id was {}", txn.id);
    assert!(is_reference(&txn.reference), "bad reference {}", txn.reference);
    assert_eq!(txn.date, "2024-06-01");
    assert_eq!(txn.time, "12:00:00");
    assert_eq!(txn.recipient.as_deref(), Some("a@b.c"));
    assert_eq!(txn.sender, None);

    let listed = store.get_transactions(Some("u1"));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, txn.id);
}

#[test]
fn new_transaction_precedes_seeded_history() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    let txn = store.add_transaction(sent(DEMO_USER_ID, 40.0, "EUR", "x@y.z"));
    let all = store.get_transactions(Some(DEMO_USER_ID));

    assert_eq!(all.len(), 7);
    assert_eq!(all[0].id, txn.id);
    for pair in all.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp, "not newest first");
    }
}

#[test]
fn received_transaction_records_sender() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    let txn = store.add_transaction(NewTransaction {
        kind: TransactionType::Received,
        ..sent("u2", 10.0, "USD", "payer@example.com")
    });

    assert_eq!(txn.sender.as_deref(), Some("payer@example.com"));
    assert_eq!(txn.recipient, None);
    assert_eq!(txn.counterparty(), "payer@example.com");
}

#[test]
fn status_update_changes_only_status() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    let before = store.get_transaction("txn_seed_003").unwrap();
    let after = store
        .update_transaction_status("txn_seed_003", TransactionStatus::Completed)
        .unwrap();

    assert_eq!(after.status, TransactionStatus::Completed);
    assert_eq!(after.reference, before.reference);
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.timestamp, before.timestamp);
}

#[test]
fn status_update_on_unknown_id_is_not_found() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();
    assert!(store
        .update_transaction_status("txn_missing", TransactionStatus::Failed)
        .is_err());
    assert!(store.get_transaction("txn_missing").is_err());
}

#[test]
fn filter_by_status_and_type() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let filter = TransactionFilter {
        status: Some(TransactionStatus::Completed),
        kind: Some(TransactionType::Sent),
        ..TransactionFilter::default()
    };
    let rows = store.filter_transactions(Some(DEMO_USER_ID), &filter);

    let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["txn_seed_001", "txn_seed_006"]);
}

#[test]
fn filter_by_amount_range_and_date() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let filter = TransactionFilter::from_pairs([
        ("minAmount", "100"),
        ("maxAmount", "5000"),
        ("dateFrom", "2024-05-25"),
    ]);
    let rows = store.filter_transactions(None, &filter);

    // 1250 (2h ago) and 3400 (20h ago); 720.50 is nine days old.
    let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["txn_seed_001", "txn_seed_002"]);
}

#[test]
fn from_pairs_ignores_unknown_keys_and_all() {
    let filter = TransactionFilter::from_pairs([
        ("status", "all"),
        ("type", ""),
        ("colour", "blue"),
        ("minAmount", "not-a-number"),
        ("currency", "GBP"),
    ]);
    assert_eq!(
        filter,
        TransactionFilter {
            currency: Some("GBP".into()),
            ..TransactionFilter::default()
        }
    );
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let by_counterparty = store.search_transactions(None, "NORDWIND");
    assert_eq!(by_counterparty.len(), 1);
    assert_eq!(by_counterparty[0].id, "txn_seed_002");

    let by_reference = store.search_transactions(None, "txn-501822");
    assert_eq!(by_reference.len(), 1);
    assert_eq!(by_reference[0].id, "txn_seed_003");

    assert!(store.search_transactions(None, "zzz-nothing").is_empty());
}

#[test]
fn summary_counts_only_completed_amounts() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let s = store.get_transaction_summary(Some(DEMO_USER_ID));
    assert_eq!(s.transaction_count, 6);
    assert_eq!(s.completed_count, 4);
    assert_eq!(s.pending_count, 1);
    assert_eq!(s.failed_count, 1);
    assert_eq!(s.total_sent, 1510.0);
    assert_eq!(s.total_received, 4120.5);
    assert_eq!(s.total_fees, 4.46);
}

#[test]
fn summary_for_unknown_user_is_zero() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();
    let s = store.get_transaction_summary(Some("nobody"));
    assert_eq!(s.transaction_count, 0);
    assert_eq!(s.total_sent, 0.0);
}

#[test]
fn usage_stats_respect_window() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let day = store.get_api_usage_stats(None, Some(StatsWindow::Day));
    assert_eq!(day.total_calls, 2);
    assert_eq!(day.successful_calls, 2);

    let week = store.get_api_usage_stats(None, Some(StatsWindow::Week));
    assert_eq!(week.total_calls, 4);
    assert_eq!(week.failed_calls, 1);
    assert_eq!(week.success_rate, 75.0);
    assert_eq!(week.top_endpoints[0].endpoint, "/transfer");
    assert_eq!(week.top_endpoints[0].count, 2);

    let month = store.get_api_usage_stats(None, Some(StatsWindow::Month));
    assert_eq!(month.total_calls, 5);
    let all = store.get_api_usage_stats(None, None);
    assert_eq!(all.total_calls, 5);
}

#[test]
fn usage_stats_for_user_without_calls_are_zero() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let stats = store.get_api_usage_stats(Some("ghost"), None);
    assert_eq!(stats.total_calls, 0);
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.average_execution_time, 0.0);
    assert!(stats.top_endpoints.is_empty());
}

#[test]
fn logged_usage_is_listed_newest_first() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    let entry = store.add_api_usage(NewApiUsage {
        api_key: "cl_test_abc".into(),
        endpoint: "/balance".into(),
        method: HttpMethod::Get,
        request_data: json!({}),
        response_data: json!({ "ok": true }),
        response_status: 200,
        user_id: DEMO_USER_ID.into(),
        execution_time: 321,
        error_message: None,
    });

    let usage = store.get_api_usage(Some(DEMO_USER_ID));
    assert_eq!(usage.len(), 6);
    assert_eq!(usage[0].id, entry.id);
    assert_eq!(entry.date, "2024-06-01");
}

#[test]
fn csv_export_quotes_embedded_quotes() {
    let services = LumaServices::build_test(42);
    let mut store = services.transactions().unwrap();

    store.add_transaction(NewTransaction {
        description: "The \"big\" one, finally".into(),
        ..sent("csv_user", 9.99, "USD", "q@example.com")
    });
    let csv = store
        .export_transactions(Some("csv_user"), None, ExportFormat::Csv)
        .unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("\"ID\",\"Type\""));
    assert!(lines[1].contains("\"The \"\"big\"\" one, finally\""), "row: {}", lines[1]);
}

#[test]
fn json_export_is_an_array_of_records() {
    let services = LumaServices::build_test(42);
    let store = services.transactions().unwrap();

    let raw = store
        .export_transactions(Some(DEMO_USER_ID), None, ExportFormat::Json)
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["type"], "sent");
}
