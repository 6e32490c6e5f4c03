//! luma-console: headless driver for the CipherLuma mock backend.
//!
//! Usage:
//!   luma-console --seed 12345 --calls 50 --db luma.db
//!   luma-console --config luma.json --ipc-mode

use anyhow::Result;
use cipherluma_core::{
    admin_store::{AdminStats, CompanyFilter, UserFilter},
    api_simulator::ApiRequest,
    clock::SystemClock,
    config::AppConfig,
    export::ExportFormat,
    kv::SqliteKv,
    services::LumaServices,
    support_store::SupportStats,
    transaction_store::{ApiUsageStats, TransactionFilter, TransactionSummary, DEMO_USER_ID},
    types::HttpMethod,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetStats,
    Call {
        endpoint: String,
        method: String,
        #[serde(default)]
        payload: Value,
        api_key: String,
        user_id: String,
    },
    Transactions {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        filters: HashMap<String, String>,
    },
    Export {
        collection: String,
        format: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct StatsReport {
    api_usage: ApiUsageStats,
    transactions: TransactionSummary,
    admin: AdminStats,
    support: SupportStats,
    unread_notifications: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let calls = parse_arg(&args, "--calls", 25u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(seed) = flag_value(&args, "--seed").and_then(|s| s.parse().ok()) {
        config.seed = Some(seed);
    }

    if !ipc_mode {
        println!("CipherLuma luma-console");
        println!("  seed:      {}", config.seed.map_or("entropy".to_string(), |s| s.to_string()));
        println!("  calls:     {calls}");
        println!("  db:        {db}");
        println!();
    }

    let kv = SqliteKv::open(db)?;
    kv.migrate()?;
    let mut services = LumaServices::build(config, Arc::new(kv), Arc::new(SystemClock));

    if ipc_mode {
        run_ipc_loop(&mut services).await?;
    } else {
        run_batch(&mut services, calls).await;
        print_summary(&services)?;
    }

    Ok(())
}

/// Fire `calls` requests, cycling through every endpoint.
async fn run_batch(services: &mut LumaServices, calls: u64) {
    let script: [(&str, HttpMethod, Value); 6] = [
        ("/balance", HttpMethod::Get, json!({})),
        (
            "/transfer",
            HttpMethod::Post,
            json!({
                "to": "sarah.chen@example.com",
                "amount": 250.0,
                "currency": "USD",
                "type": "instant",
            }),
        ),
        ("/transactions", HttpMethod::Get, json!({ "limit": 5 })),
        ("/exchange-rates", HttpMethod::Get, json!({})),
        (
            "/webhooks",
            HttpMethod::Post,
            json!({ "url": "https://example.com/hooks", "events": ["transfer.completed"] }),
        ),
        ("/payment-methods", HttpMethod::Get, json!({})),
    ];

    for i in 0..calls {
        let (endpoint, method, payload) = &script[(i as usize) % script.len()];
        let request = ApiRequest {
            endpoint: endpoint.to_string(),
            method: *method,
            payload: payload.clone(),
            api_key: "cl_test_console".to_string(),
            user_id: DEMO_USER_ID.to_string(),
        };
        let response = services.simulator.call(request).await;
        log::info!("{method} {endpoint} -> {}", response.status);
    }
}

async fn run_ipc_loop(services: &mut LumaServices) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetStats => serde_json::to_value(build_report(services)?)?,
            IpcCommand::Call {
                endpoint,
                method,
                payload,
                api_key,
                user_id,
            } => match HttpMethod::parse(&method) {
                Some(method) => {
                    let request = ApiRequest {
                        endpoint,
                        method,
                        payload,
                        api_key,
                        user_id,
                    };
                    serde_json::to_value(services.simulator.call(request).await)?
                }
                None => json!({ "error": format!("Unknown method: {method}") }),
            },
            IpcCommand::Transactions { user_id, filters } => {
                let filter = TransactionFilter::from_pairs(
                    filters.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                );
                let rows = services
                    .transactions()?
                    .filter_transactions(user_id.as_deref(), &filter);
                json!({ "transactions": rows })
            }
            IpcCommand::Export { collection, format } => match format.parse::<ExportFormat>() {
                Ok(fmt) => match export_collection(services, &collection, fmt) {
                    Ok(content) => json!({ "collection": collection, "content": content }),
                    Err(e) => json!({ "error": e.to_string() }),
                },
                Err(e) => json!({ "error": e.to_string() }),
            },
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn export_collection(
    services: &LumaServices,
    collection: &str,
    format: ExportFormat,
) -> Result<String> {
    let content = match collection {
        "transactions" => services.transactions()?.export_transactions(None, None, format)?,
        "api_usage" => services.transactions()?.export_api_usage(None, format)?,
        "users" => services.admin.export_users(&UserFilter::default(), format)?,
        "companies" => services
            .admin
            .export_companies(&CompanyFilter::default(), format)?,
        other => anyhow::bail!("Unknown collection: {other}"),
    };
    Ok(content)
}

fn build_report(services: &LumaServices) -> Result<StatsReport> {
    let store = services.transactions()?;
    Ok(StatsReport {
        api_usage: store.get_api_usage_stats(None, None),
        transactions: store.get_transaction_summary(None),
        admin: services.admin.get_admin_stats(),
        support: services.support.get_support_stats(),
        unread_notifications: services.notifications.unread_count(),
    })
}

fn print_summary(services: &LumaServices) -> Result<()> {
    let report = build_report(services)?;
    let api = &report.api_usage;

    println!("=== API USAGE ===");
    println!("  total calls:    {}", api.total_calls);
    println!("  successful:     {}", api.successful_calls);
    println!("  failed:         {}", api.failed_calls);
    println!("  success rate:   {:.1}%", api.success_rate);
    println!("  avg latency:    {:.0} ms", api.average_execution_time);
    for e in &api.top_endpoints {
        println!("    {:<18} {}", e.endpoint, e.count);
    }

    println!();
    println!("=== PLATFORM ===");
    println!(
        "  users:          {} ({} active)",
        report.admin.total_users, report.admin.active_users
    );
    println!("  companies:      {}", report.admin.total_companies);
    println!("  volume:         ${:.2}", report.admin.total_volume);
    println!("  open tickets:   {}", report.support.open);
    println!("  unread notices: {}", report.unread_notifications);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
