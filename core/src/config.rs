use serde::{Deserialize, Serialize};

/// One KV key per collection, plus the two session marker keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageKeys {
    pub transactions: String,
    pub api_usage: String,
    pub admin_users: String,
    pub admin_companies: String,
    pub support_tickets: String,
    pub faqs: String,
    pub news_articles: String,
    pub session_token: String,
    pub session_user: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            transactions: "cipherluma_transactions".into(),
            api_usage: "cipherluma_api_usage".into(),
            admin_users: "cipherluma_admin_users".into(),
            admin_companies: "cipherluma_admin_companies".into(),
            support_tickets: "cipherluma_support_tickets".into(),
            faqs: "cipherluma_faqs".into(),
            news_articles: "cipherluma_news".into(),
            session_token: "cipherluma_auth_token".into(),
            session_user: "cipherluma_session".into(),
        }
    }
}

/// How the simulator decides between success and failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorMode {
    /// Coin flip before looking at the request; canned random errors.
    #[default]
    Randomized,
    /// No coin. Requests are validated per endpoint; bad input gets a 400.
    Validating,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub success_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub live_key_prefix: String,
    pub test_key_prefix: String,
    pub mode: SimulatorMode,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.85,
            min_latency_ms: 200,
            max_latency_ms: 1200,
            live_key_prefix: "cl_live_".into(),
            test_key_prefix: "cl_test_".into(),
            mode: SimulatorMode::Randomized,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageKeys,
    pub simulator: SimulatorConfig,
    /// Master RNG seed. None draws one from OS entropy.
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    /// In tests, use AppConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Fixed seed so ids and simulated outcomes are reproducible.
    pub fn default_test() -> Self {
        Self {
            seed: Some(42),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulator;
        if !(0.0..=1.0).contains(&sim.success_rate) {
            anyhow::bail!("simulator.success_rate must be within [0, 1], got {}", sim.success_rate);
        }
        if sim.min_latency_ms > sim.max_latency_ms {
            anyhow::bail!(
                "simulator.min_latency_ms ({}) exceeds max_latency_ms ({})",
                sim.min_latency_ms,
                sim.max_latency_ms
            );
        }
        if sim.live_key_prefix.is_empty() || sim.test_key_prefix.is_empty() {
            anyhow::bail!("simulator key prefixes must not be empty");
        }
        Ok(())
    }
}
