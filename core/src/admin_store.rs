//! Admin store: platform users and business customers.
//!
//! Two collections under two keys. Records change only through status
//! writes (user status, KYC status, document review, company status).

use crate::{
    clock::SharedClock,
    collection::Collection,
    config::StorageKeys,
    error::{LumaError, LumaResult},
    export::{self, CsvRecord, ExportFormat},
    kv::SharedKv,
    types::{contains_ci, round2, EntityId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Month-over-month growth shown on the admin dashboard.
/// Placeholder: not derived from any stored data.
pub const MONTHLY_GROWTH_PLACEHOLDER: f64 = 12.5;

/// Platform-wide transaction success rate shown on the admin dashboard.
/// Placeholder: not derived from any stored data.
pub const SUCCESS_RATE_PLACEHOLDER: f64 = 98.7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Disabled,
    Flagged,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Flagged => "flagged",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
    NotSubmitted,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NotSubmitted => "not_submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub id: EntityId,
    /// e.g. "passport", "utility_bill".
    #[serde(rename = "type")]
    pub kind: String,
    pub status: DocumentStatus,
    pub uploaded_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub kyc_status: KycStatus,
    pub country: String,
    pub registration_date: Timestamp,
    #[serde(default)]
    pub last_login: Option<Timestamp>,
    pub total_transactions: u32,
    pub total_volume: f64,
    /// 0–10. Fixed on the seed record; nothing recomputes it.
    pub risk_score: f64,
    #[serde(default)]
    pub documents: Vec<UserDocument>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Suspended,
    Pending,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompanyPlan {
    Starter,
    Business,
    Enterprise,
}

impl CompanyPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Business => "business",
            Self::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyType {
    Live,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyApiKey {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ApiKeyType,
    /// Masked display form, never the full secret.
    pub key: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub last_used: Option<Timestamp>,
    pub requests_this_month: u64,
    pub total_requests: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub industry: String,
    pub country: String,
    #[serde(default)]
    pub website: Option<String>,
    pub status: CompanyStatus,
    #[serde(default)]
    pub api_keys: Vec<CompanyApiKey>,
    pub monthly_volume: f64,
    pub monthly_transactions: u32,
    pub plan: CompanyPlan,
    pub contact_person: String,
    pub registration_date: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub status: Option<UserStatus>,
    pub kyc_status: Option<KycStatus>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, u: &User) -> bool {
        if self.status.is_some_and(|s| s != u.status) {
            return false;
        }
        if self.kyc_status.is_some_and(|k| k != u.kyc_status) {
            return false;
        }
        match self.search {
            Some(ref q) => {
                let q = q.to_lowercase();
                contains_ci(&u.name, &q)
                    || contains_ci(&u.email, &q)
                    || contains_ci(&u.country, &q)
                    || contains_ci(&u.id, &q)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyFilter {
    pub status: Option<CompanyStatus>,
    pub plan: Option<CompanyPlan>,
    pub search: Option<String>,
}

impl CompanyFilter {
    pub fn matches(&self, c: &Company) -> bool {
        if self.status.is_some_and(|s| s != c.status) {
            return false;
        }
        if self.plan.is_some_and(|p| p != c.plan) {
            return false;
        }
        match self.search {
            Some(ref q) => {
                let q = q.to_lowercase();
                contains_ci(&c.name, &q)
                    || contains_ci(&c.email, &q)
                    || contains_ci(&c.industry, &q)
                    || contains_ci(&c.contact_person, &q)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub active_users: usize,
    pub pending_kyc: usize,
    pub flagged_users: usize,
    pub total_companies: usize,
    pub active_companies: usize,
    pub total_volume: f64,
    pub total_transactions: u64,
    /// Always MONTHLY_GROWTH_PLACEHOLDER.
    pub monthly_growth: f64,
    /// Always SUCCESS_RATE_PLACEHOLDER.
    pub success_rate: f64,
}

pub struct AdminStore {
    users: Collection<User>,
    companies: Collection<Company>,
    clock: SharedClock,
}

impl AdminStore {
    pub fn open(kv: SharedKv, keys: &StorageKeys, clock: SharedClock) -> Self {
        let mut users = Collection::load(kv.clone(), &keys.admin_users);
        let mut companies = Collection::load(kv, &keys.admin_companies);
        let now = clock.now();
        users.seed_if_empty(|| seed_users(now));
        companies.seed_if_empty(|| seed_companies(now));
        Self {
            users,
            companies,
            clock,
        }
    }

    // ── Users ──────────────────────────────────────────────────

    /// Matching users, most recently registered first.
    pub fn get_users(&self, filter: &UserFilter) -> Vec<User> {
        let mut rows: Vec<User> = self
            .users
            .items()
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        rows
    }

    pub fn get_user(&self, id: &str) -> LumaResult<User> {
        self.users
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("User", id))
    }

    pub fn update_user_status(&mut self, id: &str, status: UserStatus) -> LumaResult<User> {
        let now = self.clock.now();
        let user = self
            .users
            .update_where(
                |u| u.id == id,
                |u| {
                    u.status = status;
                    u.updated_at = Some(now);
                    u.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("User", id))?;
        log::info!("User {id} status -> {}", status.as_str());
        Ok(user)
    }

    pub fn update_user_kyc_status(&mut self, id: &str, kyc: KycStatus) -> LumaResult<User> {
        let now = self.clock.now();
        let user = self
            .users
            .update_where(
                |u| u.id == id,
                |u| {
                    u.kyc_status = kyc;
                    u.updated_at = Some(now);
                    u.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("User", id))?;
        log::info!("User {id} KYC -> {}", kyc.as_str());
        Ok(user)
    }

    /// Review one KYC document. Once every document is decided the
    /// user's KYC status follows: any rejection rejects, all approved
    /// approves.
    pub fn update_document_status(
        &mut self,
        user_id: &str,
        document_id: &str,
        status: DocumentStatus,
    ) -> LumaResult<User> {
        let now = self.clock.now();
        let outcome = self
            .users
            .update_where(
                |u| u.id == user_id,
                |u| {
                    let doc = u.documents.iter_mut().find(|d| d.id == document_id)?;
                    doc.status = status;
                    if u.documents.iter().any(|d| d.status == DocumentStatus::Rejected) {
                        u.kyc_status = KycStatus::Rejected;
                    } else if u.documents.iter().all(|d| d.status == DocumentStatus::Approved) {
                        u.kyc_status = KycStatus::Approved;
                    }
                    u.updated_at = Some(now);
                    Some(u.clone())
                },
            )
            .ok_or_else(|| LumaError::not_found("User", user_id))?;
        outcome.ok_or_else(|| LumaError::not_found("Document", document_id))
    }

    pub fn export_users(&self, filter: &UserFilter, format: ExportFormat) -> LumaResult<String> {
        export::export(&self.get_users(filter), format)
    }

    // ── Companies ──────────────────────────────────────────────

    pub fn get_companies(&self, filter: &CompanyFilter) -> Vec<Company> {
        let mut rows: Vec<Company> = self
            .companies
            .items()
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        rows
    }

    pub fn get_company(&self, id: &str) -> LumaResult<Company> {
        self.companies
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("Company", id))
    }

    pub fn update_company_status(
        &mut self,
        id: &str,
        status: CompanyStatus,
    ) -> LumaResult<Company> {
        let now = self.clock.now();
        let company = self
            .companies
            .update_where(
                |c| c.id == id,
                |c| {
                    c.status = status;
                    c.updated_at = Some(now);
                    c.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Company", id))?;
        log::info!("Company {id} status -> {}", status.as_str());
        Ok(company)
    }

    pub fn export_companies(
        &self,
        filter: &CompanyFilter,
        format: ExportFormat,
    ) -> LumaResult<String> {
        export::export(&self.get_companies(filter), format)
    }

    // ── Dashboard ──────────────────────────────────────────────

    /// Recomputed from scratch on every call.
    pub fn get_admin_stats(&self) -> AdminStats {
        let users = self.users.items();
        let companies = self.companies.items();
        AdminStats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.status == UserStatus::Active).count(),
            pending_kyc: users.iter().filter(|u| u.kyc_status == KycStatus::Pending).count(),
            flagged_users: users.iter().filter(|u| u.status == UserStatus::Flagged).count(),
            total_companies: companies.len(),
            active_companies: companies
                .iter()
                .filter(|c| c.status == CompanyStatus::Active)
                .count(),
            total_volume: round2(
                users.iter().map(|u| u.total_volume).sum::<f64>()
                    + companies.iter().map(|c| c.monthly_volume).sum::<f64>(),
            ),
            total_transactions: users.iter().map(|u| u.total_transactions as u64).sum::<u64>()
                + companies
                    .iter()
                    .map(|c| c.monthly_transactions as u64)
                    .sum::<u64>(),
            monthly_growth: MONTHLY_GROWTH_PLACEHOLDER,
            success_rate: SUCCESS_RATE_PLACEHOLDER,
        }
    }
}

impl CsvRecord for User {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Email",
        "Status",
        "KYC Status",
        "Country",
        "Registration Date",
        "Last Login",
        "Total Transactions",
        "Total Volume",
        "Risk Score",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.status.as_str().to_string(),
            self.kyc_status.as_str().to_string(),
            self.country.clone(),
            self.registration_date.format("%Y-%m-%d").to_string(),
            self.last_login
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            self.total_transactions.to_string(),
            format!("{:.2}", self.total_volume),
            format!("{:.1}", self.risk_score),
        ]
    }
}

impl CsvRecord for Company {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Email",
        "Industry",
        "Country",
        "Status",
        "Plan",
        "Monthly Volume",
        "Monthly Transactions",
        "Contact Person",
        "API Keys",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.industry.clone(),
            self.country.clone(),
            self.status.as_str().to_string(),
            self.plan.as_str().to_string(),
            format!("{:.2}", self.monthly_volume),
            self.monthly_transactions.to_string(),
            self.contact_person.clone(),
            self.api_keys.len().to_string(),
        ]
    }
}

// ── Demo data ──────────────────────────────────────────────────

fn doc(id: &str, kind: &str, status: DocumentStatus, at: Timestamp) -> UserDocument {
    UserDocument {
        id: id.to_string(),
        kind: kind.to_string(),
        status,
        uploaded_at: at,
    }
}

#[allow(clippy::too_many_arguments)]
fn demo_user(
    id: &str,
    name: &str,
    email: &str,
    status: UserStatus,
    kyc_status: KycStatus,
    country: &str,
    registered: Timestamp,
    last_login: Option<Timestamp>,
    total_transactions: u32,
    total_volume: f64,
    risk_score: f64,
    documents: Vec<UserDocument>,
) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        status,
        kyc_status,
        country: country.to_string(),
        registration_date: registered,
        last_login,
        total_transactions,
        total_volume,
        risk_score,
        documents,
        updated_at: None,
    }
}

fn seed_users(now: Timestamp) -> Vec<User> {
    use DocumentStatus as D;
    vec![
        demo_user(
            "user_001",
            "Sarah Chen",
            "sarah.chen@example.com",
            UserStatus::Active,
            KycStatus::Approved,
            "United States",
            now - Duration::days(210),
            Some(now - Duration::hours(3)),
            142,
            48_250.75,
            1.8,
            vec![
                doc("doc_001a", "passport", D::Approved, now - Duration::days(209)),
                doc("doc_001b", "utility_bill", D::Approved, now - Duration::days(209)),
            ],
        ),
        demo_user(
            "user_002",
            "Adaeze Okafor",
            "adaeze.okafor@example.com",
            UserStatus::Active,
            KycStatus::Pending,
            "Nigeria",
            now - Duration::days(45),
            Some(now - Duration::days(1)),
            37,
            6_420.00,
            3.2,
            vec![doc("doc_002a", "national_id", D::Pending, now - Duration::days(2))],
        ),
        demo_user(
            "user_003",
            "Marcus Bell",
            "marcus.bell@example.com",
            UserStatus::Flagged,
            KycStatus::Approved,
            "United Kingdom",
            now - Duration::days(400),
            Some(now - Duration::days(6)),
            611,
            302_118.40,
            7.9,
            vec![doc("doc_003a", "passport", D::Approved, now - Duration::days(398))],
        ),
        demo_user(
            "user_004",
            "Lena Fischer",
            "lena.fischer@example.com",
            UserStatus::Pending,
            KycStatus::NotSubmitted,
            "Germany",
            now - Duration::days(2),
            None,
            0,
            0.0,
            0.5,
            vec![],
        ),
        demo_user(
            "user_005",
            "Diego Ramirez",
            "diego.ramirez@example.com",
            UserStatus::Disabled,
            KycStatus::Rejected,
            "Mexico",
            now - Duration::days(95),
            Some(now - Duration::days(60)),
            12,
            940.10,
            9.1,
            vec![doc("doc_005a", "drivers_license", D::Rejected, now - Duration::days(90))],
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn api_key(
    id: &str,
    name: &str,
    kind: ApiKeyType,
    masked: &str,
    created: Timestamp,
    last_used: Option<Timestamp>,
    month: u64,
    total: u64,
) -> CompanyApiKey {
    CompanyApiKey {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        key: masked.to_string(),
        created_at: created,
        last_used,
        requests_this_month: month,
        total_requests: total,
    }
}

fn seed_companies(now: Timestamp) -> Vec<Company> {
    vec![
        Company {
            id: "comp_001".into(),
            name: "Nordwind GmbH".into(),
            email: "finance@nordwind.example".into(),
            industry: "Logistics".into(),
            country: "Germany".into(),
            website: Some("https://nordwind.example".into()),
            status: CompanyStatus::Active,
            api_keys: vec![
                api_key(
                    "key_001a",
                    "Production",
                    ApiKeyType::Live,
                    "cl_live_****8f2a",
                    now - Duration::days(300),
                    Some(now - Duration::minutes(12)),
                    18_420,
                    211_904,
                ),
                api_key(
                    "key_001b",
                    "Staging",
                    ApiKeyType::Test,
                    "cl_test_****c471",
                    now - Duration::days(300),
                    Some(now - Duration::days(2)),
                    2_310,
                    40_118,
                ),
            ],
            monthly_volume: 1_284_500.00,
            monthly_transactions: 9_812,
            plan: CompanyPlan::Enterprise,
            contact_person: "Jonas Weber".into(),
            registration_date: now - Duration::days(300),
            updated_at: None,
        },
        Company {
            id: "comp_002".into(),
            name: "Streamly Media Ltd".into(),
            email: "billing@streamly.example".into(),
            industry: "Media".into(),
            country: "United Kingdom".into(),
            website: Some("https://streamly.example".into()),
            status: CompanyStatus::Active,
            api_keys: vec![api_key(
                "key_002a",
                "Checkout",
                ApiKeyType::Live,
                "cl_live_****19bd",
                now - Duration::days(120),
                Some(now - Duration::hours(1)),
                6_004,
                31_777,
            )],
            monthly_volume: 214_900.50,
            monthly_transactions: 3_120,
            plan: CompanyPlan::Business,
            contact_person: "Priya Natarajan".into(),
            registration_date: now - Duration::days(120),
            updated_at: None,
        },
        Company {
            id: "comp_003".into(),
            name: "Kora Microfinance".into(),
            email: "ops@kora.example".into(),
            industry: "Financial Services".into(),
            country: "Kenya".into(),
            website: None,
            status: CompanyStatus::Pending,
            api_keys: vec![api_key(
                "key_003a",
                "Sandbox",
                ApiKeyType::Test,
                "cl_test_****6e0c",
                now - Duration::days(5),
                None,
                0,
                0,
            )],
            monthly_volume: 0.0,
            monthly_transactions: 0,
            plan: CompanyPlan::Starter,
            contact_person: "Wanjiru Mwangi".into(),
            registration_date: now - Duration::days(5),
            updated_at: None,
        },
        Company {
            id: "comp_004".into(),
            name: "Acme Supplies Inc".into(),
            email: "ap@acme-supplies.example".into(),
            industry: "Wholesale".into(),
            country: "United States".into(),
            website: Some("https://acme-supplies.example".into()),
            status: CompanyStatus::Suspended,
            api_keys: vec![api_key(
                "key_004a",
                "ERP Integration",
                ApiKeyType::Live,
                "cl_live_****a09e",
                now - Duration::days(540),
                Some(now - Duration::days(40)),
                0,
                88_450,
            )],
            monthly_volume: 12_300.00,
            monthly_transactions: 84,
            plan: CompanyPlan::Business,
            contact_person: "Dana Whitfield".into(),
            registration_date: now - Duration::days(540),
            updated_at: None,
        },
    ]
}
