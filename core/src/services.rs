//! Service container: every store built exactly once and handed out.
//!
//! CONSTRUCTION ORDER (fixed):
//!   1. Transaction store (shared: the simulator logs into it)
//!   2. Admin store
//!   3. Support store
//!   4. News store
//!   5. API simulator
//!   6. Notification center (ephemeral), session manager
//!
//! RULES:
//!   - No module-level singletons. Callers own a LumaServices and pass
//!     references down; tests build a fresh one per test.
//!   - All randomness flows through the RngBank, all time through the Clock.

use crate::{
    admin_store::AdminStore,
    api_simulator::ApiSimulator,
    clock::{ManualClock, SharedClock},
    config::AppConfig,
    error::{LumaError, LumaResult},
    kv::{MemoryKv, SharedKv},
    news_store::NewsStore,
    notifications::NotificationCenter,
    rng::{RngBank, StoreSlot},
    session::SessionManager,
    support_store::SupportStore,
    transaction_store::{SharedTransactionStore, TransactionStore},
};
use chrono::{TimeZone, Utc};
use std::sync::{Arc, MutexGuard};

pub struct LumaServices {
    pub config: AppConfig,
    pub kv: SharedKv,
    pub clock: SharedClock,
    pub transactions: SharedTransactionStore,
    pub admin: AdminStore,
    pub support: SupportStore,
    pub news: NewsStore,
    pub simulator: ApiSimulator,
    pub notifications: NotificationCenter,
    pub session: SessionManager,
    seed: u64,
}

impl LumaServices {
    pub fn build(config: AppConfig, kv: SharedKv, clock: SharedClock) -> Self {
        let rng_bank = match config.seed {
            Some(seed) => RngBank::new(seed),
            None => RngBank::from_entropy(),
        };
        let keys = &config.storage;

        let transactions = TransactionStore::open(
            kv.clone(),
            keys,
            clock.clone(),
            rng_bank.for_store(StoreSlot::Transaction),
        )
        .into_shared();
        let admin = AdminStore::open(kv.clone(), keys, clock.clone());
        let support = SupportStore::open(
            kv.clone(),
            keys,
            clock.clone(),
            rng_bank.for_store(StoreSlot::Support),
        );
        let news = NewsStore::open(
            kv.clone(),
            keys,
            clock.clone(),
            rng_bank.for_store(StoreSlot::News),
        );
        let simulator = ApiSimulator::new(
            config.simulator.clone(),
            transactions.clone(),
            clock.clone(),
            rng_bank.for_store(StoreSlot::ApiSimulator),
        );
        let notifications =
            NotificationCenter::new(clock.clone(), rng_bank.for_store(StoreSlot::Notifications));
        let session = SessionManager::new(kv.clone(), keys, clock.clone());

        log::info!("Services built (seed {})", rng_bank.master_seed());
        Self {
            seed: rng_bank.master_seed(),
            config,
            kv,
            clock,
            transactions,
            admin,
            support,
            news,
            simulator,
            notifications,
            session,
        }
    }

    /// Fresh in-memory services pinned to `test_clock()`'s start instant.
    pub fn build_test(seed: u64) -> Self {
        let config = AppConfig {
            seed: Some(seed),
            ..AppConfig::default_test()
        };
        Self::build(config, Arc::new(MemoryKv::new()), test_clock())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Lock the shared transaction store for synchronous use.
    pub fn transactions(&self) -> LumaResult<MutexGuard<'_, TransactionStore>> {
        self.transactions
            .lock()
            .map_err(|_| LumaError::Storage("transaction store lock poisoned".into()))
    }
}

/// A manual clock starting at 2024-06-01T12:00:00Z.
pub fn test_clock() -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_default();
    Arc::new(ManualClock::new(start))
}
