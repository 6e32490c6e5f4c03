//! Support store tests: ticket lifecycle, conversation threads and the FAQ.

use chrono::Duration;
use cipherluma_core::{
    clock::ManualClock,
    config::AppConfig,
    kv::MemoryKv,
    services::{test_clock, LumaServices},
    support_store::{
        FaqFilter, FaqUpdate, MessageSender, NewFaq, NewTicket, TicketCategory, TicketFilter,
        TicketPriority, TicketStatus,
    },
};
use std::sync::Arc;

fn build_with_clock() -> (LumaServices, Arc<ManualClock>) {
    let clock = test_clock();
    let services = LumaServices::build(
        AppConfig::default_test(),
        Arc::new(MemoryKv::new()),
        clock.clone(),
    );
    (services, clock)
}

fn ticket(user: &str, priority: TicketPriority) -> NewTicket {
    NewTicket {
        user_id: user.into(),
        user_email: format!("{user}@example.com"),
        user_name: "Test Customer".into(),
        subject: "Cannot add a payout account".into(),
        category: TicketCategory::Account,
        priority,
        description: "The form rejects my IBAN.".into(),
        tags: vec!["payouts".into()],
    }
}

fn faq(category: &str, question: &str) -> NewFaq {
    NewFaq {
        category: category.into(),
        question: question.into(),
        answer: "See the help centre.".into(),
        tags: vec![],
        is_published: true,
    }
}

#[test]
fn new_ticket_opens_with_description_as_first_message() {
    let mut services = LumaServices::build_test(42);
    let t = services.support.create_ticket(ticket("u_t1", TicketPriority::Medium));

    assert_eq!(t.status, TicketStatus::Open);
    assert!(t.ticket_id.starts_with("TKT-"));
    assert_eq!(t.ticket_id.len(), 10);
    assert_eq!(t.messages.len(), 1);
    assert_eq!(t.messages[0].sender, MessageSender::Customer);
    assert_eq!(t.messages[0].content, "The form rejects my IBAN.");
    assert_eq!(t.resolved_at, None);
}

#[test]
fn admin_reply_advances_open_ticket() {
    let mut services = LumaServices::build_test(42);
    let t = services.support.create_ticket(ticket("u_t2", TicketPriority::High));

    let after_customer = services
        .support
        .add_message(&t.id, MessageSender::Customer, "Test Customer", "Any update?")
        .unwrap();
    assert_eq!(after_customer.status, TicketStatus::Open);

    let after_admin = services
        .support
        .add_message(&t.id, MessageSender::Admin, "Support Team", "Looking into it.")
        .unwrap();
    assert_eq!(after_admin.status, TicketStatus::InProgress);
    assert_eq!(after_admin.messages.len(), 3);
}

#[test]
fn admin_reply_does_not_reopen_resolved_ticket() {
    let mut services = LumaServices::build_test(42);
    let t = services
        .support
        .add_message("ticket_seed_003", MessageSender::Admin, "API Support", "Follow-up.")
        .unwrap();
    assert_eq!(t.status, TicketStatus::Resolved);
}

#[test]
fn resolved_at_is_kept_after_reopening() {
    let (mut services, clock) = build_with_clock();
    let t = services.support.create_ticket(ticket("u_t3", TicketPriority::Low));

    clock.advance(Duration::hours(3));
    let resolved = services
        .support
        .update_ticket_status(&t.id, TicketStatus::Resolved)
        .unwrap();
    let stamp = resolved.resolved_at.expect("resolved_at set");

    clock.advance(Duration::hours(1));
    let reopened = services
        .support
        .update_ticket_status(&t.id, TicketStatus::Open)
        .unwrap();
    assert_eq!(reopened.status, TicketStatus::Open);
    assert_eq!(reopened.resolved_at, Some(stamp));

    clock.advance(Duration::hours(1));
    let closed = services
        .support
        .update_ticket_status(&t.id, TicketStatus::Closed)
        .unwrap();
    assert!(closed.resolved_at.unwrap() > stamp);
}

#[test]
fn tickets_sort_by_latest_activity() {
    let (mut services, clock) = build_with_clock();
    let older = services.support.create_ticket(ticket("u_a", TicketPriority::Low));
    clock.advance(Duration::minutes(5));
    services.support.create_ticket(ticket("u_b", TicketPriority::Low));

    clock.advance(Duration::minutes(5));
    services
        .support
        .add_message(&older.id, MessageSender::Customer, "Test Customer", "bump")
        .unwrap();

    let all = services.support.get_tickets(&TicketFilter::default());
    assert_eq!(all[0].id, older.id);
}

#[test]
fn assign_tag_and_rate() {
    let mut services = LumaServices::build_test(42);
    let t = services.support.create_ticket(ticket("u_t4", TicketPriority::Urgent));

    let assigned = services
        .support
        .assign_ticket(&t.id, "admin_007", "Night Shift")
        .unwrap();
    assert_eq!(assigned.assigned_to.as_deref(), Some("admin_007"));

    services.support.add_tag(&t.id, "iban").unwrap();
    let tagged = services.support.add_tag(&t.id, "iban").unwrap();
    assert_eq!(tagged.tags, vec!["payouts".to_string(), "iban".to_string()]);

    let rated = services.support.rate_ticket(&t.id, 9).unwrap();
    assert_eq!(rated.satisfaction, Some(5));
}

#[test]
fn unknown_ticket_operations_fail() {
    let mut services = LumaServices::build_test(42);
    assert!(services.support.get_ticket("nope").is_err());
    assert!(services
        .support
        .add_message("nope", MessageSender::Admin, "x", "y")
        .is_err());
    assert!(services
        .support
        .update_ticket_status("nope", TicketStatus::Closed)
        .is_err());
}

#[test]
fn support_stats_count_statuses_and_urgent_backlog() {
    let mut services = LumaServices::build_test(42);
    services.support.create_ticket(ticket("u_t5", TicketPriority::Urgent));

    let stats = services.support.get_support_stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.open, 2);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.resolved, 1);
    // The seeded urgent ticket is resolved and does not count.
    assert_eq!(stats.urgent_open, 1);
    assert_eq!(stats.average_satisfaction, Some(5.0));
}

#[test]
fn ticket_filter_by_user_and_search() {
    let services = LumaServices::build_test(42);
    let mine = services.support.get_tickets(&TicketFilter {
        user_id: Some("user_002".into()),
        ..TicketFilter::default()
    });
    assert_eq!(mine.len(), 1);

    let webhook = services.support.get_tickets(&TicketFilter {
        search: Some("WEBHOOK".into()),
        ..TicketFilter::default()
    });
    assert_eq!(webhook.len(), 1);
    assert_eq!(webhook[0].ticket_id, "TKT-7HV1RC");
}

#[test]
fn faq_order_counts_category_and_keeps_gaps_after_delete() {
    let mut services = LumaServices::build_test(42);

    let third = services
        .support
        .create_faq(faq("account", "How do I close my account?"), "admin_001", "Support");
    assert_eq!(third.order, 3);

    services.support.delete_faq("faq_seed_001").unwrap();
    let next = services
        .support
        .create_faq(faq("account", "How do I enable 2FA?"), "admin_001", "Support");
    // Two remain in the category, so the new one collides with `third`.
    assert_eq!(next.order, 3);

    let account = services.support.get_faqs(&FaqFilter {
        category: Some("account".into()),
        ..FaqFilter::default()
    });
    let orders: Vec<u32> = account.iter().map(|f| f.order).collect();
    assert_eq!(orders, vec![2, 3, 3]);
}

#[test]
fn faqs_sort_by_category_then_order() {
    let mut services = LumaServices::build_test(42);
    services
        .support
        .update_faq("faq_seed_003", FaqUpdate {
            order: Some(9),
            ..FaqUpdate::default()
        })
        .unwrap();

    let all = services.support.get_faqs(&FaqFilter::default());
    let keys: Vec<(String, u32)> = all.iter().map(|f| (f.category.clone(), f.order)).collect();
    assert_eq!(
        keys,
        vec![
            ("account".to_string(), 1),
            ("account".to_string(), 2),
            ("api".to_string(), 1),
            ("payments".to_string(), 2),
            ("payments".to_string(), 9),
        ]
    );
    assert_eq!(services.support.faq_categories(), vec!["account", "api", "payments"]);
}

#[test]
fn faq_views_and_feedback_accumulate() {
    let mut services = LumaServices::build_test(42);
    services.support.record_faq_view("faq_seed_005").unwrap();
    services.support.record_faq_view("faq_seed_005").unwrap();
    services.support.record_faq_feedback("faq_seed_005", true).unwrap();
    let f = services.support.record_faq_feedback("faq_seed_005", false).unwrap();

    assert_eq!(f.view_count, 2);
    assert_eq!(f.helpful_count, 1);
    assert_eq!(f.not_helpful_count, 1);
}

#[test]
fn unpublished_faq_hidden_from_public_listing() {
    let mut services = LumaServices::build_test(42);
    let draft = services.support.create_faq(
        NewFaq {
            is_published: false,
            ..faq("api", "Do you support GraphQL?")
        },
        "admin_001",
        "Support",
    );

    let public = services.support.get_faqs(&FaqFilter {
        published_only: true,
        ..FaqFilter::default()
    });
    assert!(public.iter().all(|f| f.id != draft.id));
    assert!(services.support.get_faq(&draft.id).is_ok());
}
