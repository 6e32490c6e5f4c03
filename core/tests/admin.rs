//! Admin store tests: user and company moderation, KYC documents,
//! dashboard stats and exports.

use cipherluma_core::{
    admin_store::{
        CompanyFilter, CompanyPlan, CompanyStatus, DocumentStatus, KycStatus, UserFilter,
        UserStatus, MONTHLY_GROWTH_PLACEHOLDER, SUCCESS_RATE_PLACEHOLDER,
    },
    error::LumaError,
    export::ExportFormat,
    services::LumaServices,
};

#[test]
fn users_list_newest_registration_first() {
    let services = LumaServices::build_test(42);
    let users = services.admin.get_users(&UserFilter::default());

    assert_eq!(users.len(), 5);
    assert_eq!(users[0].id, "user_004");
    for pair in users.windows(2) {
        assert!(pair[0].registration_date >= pair[1].registration_date);
    }
}

#[test]
fn user_filter_combines_status_and_search() {
    let services = LumaServices::build_test(42);

    let active = services.admin.get_users(&UserFilter {
        status: Some(UserStatus::Active),
        ..UserFilter::default()
    });
    assert_eq!(active.len(), 2);

    let nigeria = services.admin.get_users(&UserFilter {
        status: Some(UserStatus::Active),
        search: Some("NIGERIA".into()),
        ..UserFilter::default()
    });
    assert_eq!(nigeria.len(), 1);
    assert_eq!(nigeria[0].id, "user_002");
}

#[test]
fn status_update_stamps_updated_at() {
    let mut services = LumaServices::build_test(42);
    let user = services
        .admin
        .update_user_status("user_003", UserStatus::Suspended)
        .unwrap();

    assert_eq!(user.status, UserStatus::Suspended);
    assert!(user.updated_at.is_some());
    assert_eq!(
        services.admin.get_user("user_003").unwrap().status,
        UserStatus::Suspended
    );
}

#[test]
fn unknown_user_is_not_found() {
    let mut services = LumaServices::build_test(42);
    let err = services
        .admin
        .update_user_kyc_status("user_999", KycStatus::Approved)
        .unwrap_err();
    assert!(matches!(err, LumaError::NotFound { kind: "User", .. }));
}

#[test]
fn approving_the_last_document_approves_kyc() {
    let mut services = LumaServices::build_test(42);
    let user = services
        .admin
        .update_document_status("user_002", "doc_002a", DocumentStatus::Approved)
        .unwrap();
    assert_eq!(user.kyc_status, KycStatus::Approved);
}

#[test]
fn rejecting_any_document_rejects_kyc() {
    let mut services = LumaServices::build_test(42);
    let user = services
        .admin
        .update_document_status("user_001", "doc_001b", DocumentStatus::Rejected)
        .unwrap();
    assert_eq!(user.kyc_status, KycStatus::Rejected);
}

#[test]
fn unknown_document_is_not_found() {
    let mut services = LumaServices::build_test(42);
    let err = services
        .admin
        .update_document_status("user_001", "doc_nope", DocumentStatus::Approved)
        .unwrap_err();
    assert!(matches!(err, LumaError::NotFound { kind: "Document", .. }));
}

#[test]
fn company_status_and_plan_filters() {
    let mut services = LumaServices::build_test(42);

    services
        .admin
        .update_company_status("comp_003", CompanyStatus::Active)
        .unwrap();
    let active = services.admin.get_companies(&CompanyFilter {
        status: Some(CompanyStatus::Active),
        ..CompanyFilter::default()
    });
    assert_eq!(active.len(), 3);

    let business = services.admin.get_companies(&CompanyFilter {
        plan: Some(CompanyPlan::Business),
        ..CompanyFilter::default()
    });
    assert_eq!(business.len(), 2);
}

#[test]
fn admin_stats_track_mutations_and_keep_placeholders() {
    let mut services = LumaServices::build_test(42);

    let before = services.admin.get_admin_stats();
    assert_eq!(before.total_users, 5);
    assert_eq!(before.active_users, 2);
    assert_eq!(before.flagged_users, 1);
    assert_eq!(before.pending_kyc, 1);
    assert_eq!(before.total_companies, 4);
    assert_eq!(before.monthly_growth, MONTHLY_GROWTH_PLACEHOLDER);
    assert_eq!(before.success_rate, SUCCESS_RATE_PLACEHOLDER);

    services
        .admin
        .update_user_status("user_004", UserStatus::Active)
        .unwrap();
    let after = services.admin.get_admin_stats();
    assert_eq!(after.active_users, 3);
    assert_eq!(after.total_volume, before.total_volume);
}

#[test]
fn user_csv_has_header_and_one_row_per_user() {
    let services = LumaServices::build_test(42);
    let csv = services
        .admin
        .export_users(&UserFilter::default(), ExportFormat::Csv)
        .unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].contains("\"KYC Status\""));
    assert!(lines.iter().any(|l| l.contains("\"not_submitted\"")));
}

#[test]
fn company_json_export_round_trips() {
    let services = LumaServices::build_test(42);
    let raw = services
        .admin
        .export_companies(&CompanyFilter::default(), ExportFormat::Json)
        .unwrap();
    let parsed: Vec<cipherluma_core::admin_store::Company> = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, services.admin.get_companies(&CompanyFilter::default()));
}
