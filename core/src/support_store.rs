//! Support store: tickets with conversation threads, and the FAQ.
//!
//! Ticket lifecycle:
//!   open ──(first admin reply)──▶ in_progress
//!   any  ──(explicit admin write)──▶ any other status
//!
//! Only the admin-reply transition is automatic. Explicit writes are never
//! checked for legality. `resolvedAt` is stamped on every move to
//! resolved/closed and is never cleared, even if the ticket is reopened.

use crate::{
    clock::SharedClock,
    collection::Collection,
    config::StorageKeys,
    error::{LumaError, LumaResult},
    kv::SharedKv,
    rng::{record_id, StoreRng},
    transaction_store::DEMO_USER_ID,
    types::{contains_ci, EntityId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingCustomer,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::WaitingCustomer => "waiting_customer",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    General,
    Technical,
    Billing,
    Account,
    Api,
    Compliance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: EntityId,
    pub sender: MessageSender,
    pub sender_name: String,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: EntityId,
    /// Human-facing code, e.g. `TKT-4Q7Z1B`.
    pub ticket_id: String,
    pub user_id: EntityId,
    pub user_email: String,
    pub user_name: String,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    /// Ordered, append-only.
    pub messages: Vec<TicketMessage>,
    #[serde(default)]
    pub assigned_to: Option<EntityId>,
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
    /// 1–5, set by the customer after resolution.
    #[serde(default)]
    pub satisfaction: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub user_id: EntityId,
    pub user_email: String,
    pub user_name: String,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    /// Becomes the first customer message.
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub user_id: Option<EntityId>,
    pub assigned_to: Option<EntityId>,
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, t: &SupportTicket) -> bool {
        if self.status.is_some_and(|s| s != t.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != t.priority) {
            return false;
        }
        if self.category.is_some_and(|c| c != t.category) {
            return false;
        }
        if let Some(ref u) = self.user_id {
            if &t.user_id != u {
                return false;
            }
        }
        if let Some(ref a) = self.assigned_to {
            if t.assigned_to.as_ref() != Some(a) {
                return false;
            }
        }
        match self.search {
            Some(ref q) => {
                let q = q.to_lowercase();
                contains_ci(&t.ticket_id, &q)
                    || contains_ci(&t.subject, &q)
                    || contains_ci(&t.user_name, &q)
                    || contains_ci(&t.user_email, &q)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub waiting_customer: usize,
    pub resolved: usize,
    pub closed: usize,
    /// Urgent tickets not yet resolved or closed.
    pub urgent_open: usize,
    /// Mean over rated tickets; None when nothing is rated.
    pub average_satisfaction: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: EntityId,
    pub category: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_published: bool,
    pub created_by: EntityId,
    pub created_by_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub view_count: u64,
    pub helpful_count: u64,
    pub not_helpful_count: u64,
    /// Manual rank within the category, starting at 1. Gaps are allowed.
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewFaq {
    pub category: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_published: bool,
}

/// Partial FAQ edit. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaqUpdate {
    pub category: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaqFilter {
    pub category: Option<String>,
    pub published_only: bool,
    pub search: Option<String>,
}

impl FaqFilter {
    pub fn matches(&self, f: &Faq) -> bool {
        if self.published_only && !f.is_published {
            return false;
        }
        if let Some(ref c) = self.category {
            if &f.category != c {
                return false;
            }
        }
        match self.search {
            Some(ref q) => {
                let q = q.to_lowercase();
                contains_ci(&f.question, &q)
                    || contains_ci(&f.answer, &q)
                    || f.tags.iter().any(|t| contains_ci(t, &q))
            }
            None => true,
        }
    }
}

pub struct SupportStore {
    tickets: Collection<SupportTicket>,
    faqs: Collection<Faq>,
    clock: SharedClock,
    rng: StoreRng,
}

impl SupportStore {
    pub fn open(kv: SharedKv, keys: &StorageKeys, clock: SharedClock, rng: StoreRng) -> Self {
        let mut tickets = Collection::load(kv.clone(), &keys.support_tickets);
        let mut faqs = Collection::load(kv, &keys.faqs);
        let now = clock.now();
        tickets.seed_if_empty(|| seed_tickets(now));
        faqs.seed_if_empty(|| seed_faqs(now));
        Self {
            tickets,
            faqs,
            clock,
            rng,
        }
    }

    // ── Tickets ────────────────────────────────────────────────

    pub fn create_ticket(&mut self, new: NewTicket) -> SupportTicket {
        let now = self.clock.now();
        let millis = now.timestamp_millis();
        let first_message = TicketMessage {
            id: record_id("msg", millis, &mut self.rng),
            sender: MessageSender::Customer,
            sender_name: new.user_name.clone(),
            content: new.description,
            timestamp: now,
        };
        let ticket = SupportTicket {
            id: record_id("ticket", millis, &mut self.rng),
            ticket_id: format!("TKT-{}", self.rng.base36_upper(6)),
            user_id: new.user_id,
            user_email: new.user_email,
            user_name: new.user_name,
            subject: new.subject,
            category: new.category,
            priority: new.priority,
            status: TicketStatus::Open,
            messages: vec![first_message],
            assigned_to: None,
            assigned_to_name: None,
            tags: new.tags,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            satisfaction: None,
        };
        log::info!("Ticket {} opened by {}", ticket.ticket_id, ticket.user_id);
        self.tickets.prepend(ticket.clone());
        ticket
    }

    /// Matching tickets, most recently active first.
    pub fn get_tickets(&self, filter: &TicketFilter) -> Vec<SupportTicket> {
        let mut rows: Vec<SupportTicket> = self
            .tickets
            .items()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows
    }

    pub fn get_ticket(&self, id: &str) -> LumaResult<SupportTicket> {
        self.tickets
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("Ticket", id))
    }

    /// Append to the thread. An admin reply to an `open` ticket moves it
    /// to `in_progress`; customer messages never change status.
    pub fn add_message(
        &mut self,
        ticket_id: &str,
        sender: MessageSender,
        sender_name: &str,
        content: &str,
    ) -> LumaResult<SupportTicket> {
        let now = self.clock.now();
        let message = TicketMessage {
            id: record_id("msg", now.timestamp_millis(), &mut self.rng),
            sender,
            sender_name: sender_name.to_string(),
            content: content.to_string(),
            timestamp: now,
        };
        self.tickets
            .update_where(
                |t| t.id == ticket_id,
                |t| {
                    t.messages.push(message);
                    if sender == MessageSender::Admin && t.status == TicketStatus::Open {
                        t.status = TicketStatus::InProgress;
                        log::debug!("Ticket {} auto-advanced to in_progress", t.ticket_id);
                    }
                    t.updated_at = now;
                    t.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Ticket", ticket_id))
    }

    /// Explicit admin status write. Any transition is accepted.
    pub fn update_ticket_status(
        &mut self,
        ticket_id: &str,
        status: TicketStatus,
    ) -> LumaResult<SupportTicket> {
        let now = self.clock.now();
        self.tickets
            .update_where(
                |t| t.id == ticket_id,
                |t| {
                    t.status = status;
                    if status.is_terminal() {
                        t.resolved_at = Some(now);
                    }
                    t.updated_at = now;
                    t.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Ticket", ticket_id))
    }

    pub fn assign_ticket(
        &mut self,
        ticket_id: &str,
        admin_id: &str,
        admin_name: &str,
    ) -> LumaResult<SupportTicket> {
        let now = self.clock.now();
        self.tickets
            .update_where(
                |t| t.id == ticket_id,
                |t| {
                    t.assigned_to = Some(admin_id.to_string());
                    t.assigned_to_name = Some(admin_name.to_string());
                    t.updated_at = now;
                    t.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Ticket", ticket_id))
    }

    pub fn add_tag(&mut self, ticket_id: &str, tag: &str) -> LumaResult<SupportTicket> {
        let now = self.clock.now();
        self.tickets
            .update_where(
                |t| t.id == ticket_id,
                |t| {
                    if !t.tags.iter().any(|existing| existing == tag) {
                        t.tags.push(tag.to_string());
                        t.updated_at = now;
                    }
                    t.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Ticket", ticket_id))
    }

    /// Record customer satisfaction, clamped to 1..=5.
    pub fn rate_ticket(&mut self, ticket_id: &str, score: u8) -> LumaResult<SupportTicket> {
        let now = self.clock.now();
        let score = score.clamp(1, 5);
        self.tickets
            .update_where(
                |t| t.id == ticket_id,
                |t| {
                    t.satisfaction = Some(score);
                    t.updated_at = now;
                    t.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Ticket", ticket_id))
    }

    pub fn get_support_stats(&self) -> SupportStats {
        let tickets = self.tickets.items();
        let count = |s: TicketStatus| tickets.iter().filter(|t| t.status == s).count();
        let ratings: Vec<f64> = tickets
            .iter()
            .filter_map(|t| t.satisfaction.map(f64::from))
            .collect();
        SupportStats {
            total: tickets.len(),
            open: count(TicketStatus::Open),
            in_progress: count(TicketStatus::InProgress),
            waiting_customer: count(TicketStatus::WaitingCustomer),
            resolved: count(TicketStatus::Resolved),
            closed: count(TicketStatus::Closed),
            urgent_open: tickets
                .iter()
                .filter(|t| t.priority == TicketPriority::Urgent && !t.status.is_terminal())
                .count(),
            average_satisfaction: if ratings.is_empty() {
                None
            } else {
                Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
            },
        }
    }

    // ── FAQ ────────────────────────────────────────────────────

    /// Appends with `order` = current count in the category + 1.
    pub fn create_faq(&mut self, new: NewFaq, author_id: &str, author_name: &str) -> Faq {
        let now = self.clock.now();
        let in_category = self
            .faqs
            .items()
            .iter()
            .filter(|f| f.category == new.category)
            .count();
        let faq = Faq {
            id: record_id("faq", now.timestamp_millis(), &mut self.rng),
            category: new.category,
            question: new.question,
            answer: new.answer,
            tags: new.tags,
            is_published: new.is_published,
            created_by: author_id.to_string(),
            created_by_name: author_name.to_string(),
            created_at: now,
            updated_at: now,
            view_count: 0,
            helpful_count: 0,
            not_helpful_count: 0,
            order: in_category as u32 + 1,
        };
        self.faqs.append(faq.clone());
        faq
    }

    pub fn update_faq(&mut self, id: &str, update: FaqUpdate) -> LumaResult<Faq> {
        let now = self.clock.now();
        self.faqs
            .update_where(
                |f| f.id == id,
                |f| {
                    if let Some(category) = update.category {
                        f.category = category;
                    }
                    if let Some(question) = update.question {
                        f.question = question;
                    }
                    if let Some(answer) = update.answer {
                        f.answer = answer;
                    }
                    if let Some(tags) = update.tags {
                        f.tags = tags;
                    }
                    if let Some(published) = update.is_published {
                        f.is_published = published;
                    }
                    if let Some(order) = update.order {
                        f.order = order;
                    }
                    f.updated_at = now;
                    f.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("FAQ", id))
    }

    /// Remaining FAQs keep their order values.
    pub fn delete_faq(&mut self, id: &str) -> LumaResult<Faq> {
        self.faqs
            .remove_where(|f| f.id == id)
            .ok_or_else(|| LumaError::not_found("FAQ", id))
    }

    pub fn get_faq(&self, id: &str) -> LumaResult<Faq> {
        self.faqs
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("FAQ", id))
    }

    /// Matching FAQs sorted by category, then manual order.
    pub fn get_faqs(&self, filter: &FaqFilter) -> Vec<Faq> {
        let mut rows: Vec<Faq> = self
            .faqs
            .items()
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.category.cmp(&b.category).then(a.order.cmp(&b.order)));
        rows
    }

    pub fn record_faq_view(&mut self, id: &str) -> LumaResult<Faq> {
        self.faqs
            .update_where(
                |f| f.id == id,
                |f| {
                    f.view_count += 1;
                    f.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("FAQ", id))
    }

    pub fn record_faq_feedback(&mut self, id: &str, helpful: bool) -> LumaResult<Faq> {
        self.faqs
            .update_where(
                |f| f.id == id,
                |f| {
                    if helpful {
                        f.helpful_count += 1;
                    } else {
                        f.not_helpful_count += 1;
                    }
                    f.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("FAQ", id))
    }

    /// Distinct categories, sorted.
    pub fn faq_categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self.faqs.items().iter().map(|f| f.category.clone()).collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

// ── Demo data ──────────────────────────────────────────────────

fn message(
    id: &str,
    sender: MessageSender,
    name: &str,
    content: &str,
    at: Timestamp,
) -> TicketMessage {
    TicketMessage {
        id: id.to_string(),
        sender,
        sender_name: name.to_string(),
        content: content.to_string(),
        timestamp: at,
    }
}

fn seed_tickets(now: Timestamp) -> Vec<SupportTicket> {
    let t1 = now - Duration::hours(6);
    let t2 = now - Duration::days(2);
    let t3 = now - Duration::days(9);
    vec![
        SupportTicket {
            id: "ticket_seed_001".into(),
            ticket_id: "TKT-8K2M4P".into(),
            user_id: DEMO_USER_ID.into(),
            user_email: "demo@cipherluma.example".into(),
            user_name: "Demo User".into(),
            subject: "Transfer stuck in pending".into(),
            category: TicketCategory::Technical,
            priority: TicketPriority::High,
            status: TicketStatus::Open,
            messages: vec![message(
                "msg_seed_001",
                MessageSender::Customer,
                "Demo User",
                "My GBP transfer has shown pending for two days. Reference TXN-501822-Q0LR7C.",
                t1,
            )],
            assigned_to: None,
            assigned_to_name: None,
            tags: vec!["transfer".into()],
            created_at: t1,
            updated_at: t1,
            resolved_at: None,
            satisfaction: None,
        },
        SupportTicket {
            id: "ticket_seed_002".into(),
            ticket_id: "TKT-3ZQ9WX".into(),
            user_id: "user_002".into(),
            user_email: "adaeze.okafor@example.com".into(),
            user_name: "Adaeze Okafor".into(),
            subject: "How long does KYC review take?".into(),
            category: TicketCategory::Account,
            priority: TicketPriority::Medium,
            status: TicketStatus::InProgress,
            messages: vec![
                message(
                    "msg_seed_002",
                    MessageSender::Customer,
                    "Adaeze Okafor",
                    "I uploaded my national ID two days ago. When will it be reviewed?",
                    t2,
                ),
                message(
                    "msg_seed_003",
                    MessageSender::Admin,
                    "Support Team",
                    "Reviews usually take 1-3 business days. We'll update you shortly.",
                    t2 + Duration::hours(2),
                ),
            ],
            assigned_to: Some("admin_001".into()),
            assigned_to_name: Some("Support Team".into()),
            tags: vec!["kyc".into()],
            created_at: t2,
            updated_at: t2 + Duration::hours(2),
            resolved_at: None,
            satisfaction: None,
        },
        SupportTicket {
            id: "ticket_seed_003".into(),
            ticket_id: "TKT-7HV1RC".into(),
            user_id: "comp_002".into(),
            user_email: "billing@streamly.example".into(),
            user_name: "Priya Natarajan".into(),
            subject: "Webhook signature mismatch".into(),
            category: TicketCategory::Api,
            priority: TicketPriority::Urgent,
            status: TicketStatus::Resolved,
            messages: vec![
                message(
                    "msg_seed_004",
                    MessageSender::Customer,
                    "Priya Natarajan",
                    "Our webhook endpoint rejects every event with a signature error.",
                    t3,
                ),
                message(
                    "msg_seed_005",
                    MessageSender::Admin,
                    "API Support",
                    "The signing secret was rotated. Fetch the new one from the dashboard.",
                    t3 + Duration::hours(1),
                ),
            ],
            assigned_to: Some("admin_002".into()),
            assigned_to_name: Some("API Support".into()),
            tags: vec!["webhooks".into(), "api".into()],
            created_at: t3,
            updated_at: t3 + Duration::hours(4),
            resolved_at: Some(t3 + Duration::hours(4)),
            satisfaction: Some(5),
        },
    ]
}

fn demo_faq(
    id: &str,
    category: &str,
    question: &str,
    answer: &str,
    tags: &[&str],
    order: u32,
    at: Timestamp,
) -> Faq {
    Faq {
        id: id.to_string(),
        category: category.to_string(),
        question: question.to_string(),
        answer: answer.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_published: true,
        created_by: "admin_001".to_string(),
        created_by_name: "Support Team".to_string(),
        created_at: at,
        updated_at: at,
        view_count: 0,
        helpful_count: 0,
        not_helpful_count: 0,
        order,
    }
}

fn seed_faqs(now: Timestamp) -> Vec<Faq> {
    let at = now - Duration::days(30);
    vec![
        demo_faq(
            "faq_seed_001",
            "account",
            "How do I verify my identity?",
            "Upload a government-issued ID and a proof of address from the Verification tab.",
            &["kyc", "verification"],
            1,
            at,
        ),
        demo_faq(
            "faq_seed_002",
            "account",
            "Can I change my registered email?",
            "Yes. Open Settings, choose Profile and confirm the new address via the link we send.",
            &["email", "profile"],
            2,
            at,
        ),
        demo_faq(
            "faq_seed_003",
            "payments",
            "How long do international transfers take?",
            "Most transfers arrive within 1-3 business days depending on the destination rail.",
            &["transfer", "international"],
            1,
            at,
        ),
        demo_faq(
            "faq_seed_004",
            "payments",
            "What fees apply to a transfer?",
            "Fees depend on the payment method; the exact fee is shown before you confirm.",
            &["fees"],
            2,
            at,
        ),
        demo_faq(
            "faq_seed_005",
            "api",
            "Where do I find my API keys?",
            "Business accounts can create live and test keys under Developers > API Keys.",
            &["api", "keys"],
            1,
            at,
        ),
    ]
}
