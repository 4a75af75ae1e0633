//! Cache reconciliation after confirmed mutations, end to end over the mock store

use examvault_common::cache::{keys, ClientCache, ScopeKey};
use examvault_common::config::ValidationConfig;
use examvault_common::identity::{AdminAllowlist, SessionIdentity};
use examvault_common::models::{Branch, PaperType, Record, RecordDraft, Status};
use examvault_common::mutation::{BulkAction, FormState, MutationCoordinator, SubmissionForm};
use examvault_common::remote::{ListScope, MockGateway};
use examvault_common::views::{leaderboard, LeaderboardPolicy};
use examvault_common::{AppError, Catalog};
use std::sync::Arc;

fn record(id: &str, status: Status, email: &str) -> Record {
    Record {
        id: id.into(),
        timestamp: "2025-02-01T08:00:00Z".into(),
        year: "1".into(),
        semester: "2".into(),
        paper_code: "BMA-1001".into(),
        subject_name: "Mathematics".into(),
        paper_type: "Regular".into(),
        status,
        branch: "CSE".into(),
        email: email.into(),
        pdf_url: None,
    }
}

struct Harness {
    gateway: Arc<MockGateway>,
    cache: Arc<ClientCache>,
    coordinator: MutationCoordinator,
}

async fn harness(records: Vec<Record>) -> Harness {
    let gateway = Arc::new(MockGateway::with_records(records.clone()));
    let cache = Arc::new(ClientCache::new());
    cache.put(keys::public(), records).await;
    let coordinator = MutationCoordinator::new(gateway.clone(), cache.clone(), ValidationConfig::default());
    Harness {
        gateway,
        cache,
        coordinator,
    }
}

#[tokio::test]
async fn set_status_reflects_only_on_success() {
    let h = harness(vec![record("P1", Status::Disabled, "a@x.com")]).await;

    h.coordinator.set_status("P1", Status::Enabled).await.unwrap();
    let public = h.cache.get(&keys::public()).await.unwrap();
    let expected = Record {
        status: Status::Enabled,
        ..record("P1", Status::Disabled, "a@x.com")
    };
    assert_eq!(public.to_vec(), vec![expected]);

    h.gateway.fail_on("P1");
    let before = serde_json::to_string(&h.cache.snapshot().await).unwrap();
    assert!(h.coordinator.set_status("P1", Status::Disabled).await.is_err());
    let after = serde_json::to_string(&h.cache.snapshot().await).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn bulk_toggle_reports_failure_and_keeps_going() {
    let h = harness(vec![
        record("P1", Status::Disabled, "a@x.com"),
        record("P2", Status::Disabled, "a@x.com"),
        record("P3", Status::Disabled, "a@x.com"),
    ])
    .await;
    h.gateway.fail_on("P2");

    let ids = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
    let outcomes = h.coordinator.bulk(&ids, BulkAction::Toggle).await;
    let ok: Vec<bool> = outcomes.iter().map(|o| o.is_ok()).collect();
    assert_eq!(ok, vec![true, false, true]);
    assert!(matches!(outcomes[1].result, Err(AppError::Application { .. })));

    let statuses: Vec<Status> = h
        .cache
        .get(&keys::public())
        .await
        .unwrap()
        .iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(statuses, vec![Status::Enabled, Status::Disabled, Status::Enabled]);
    assert!(h.coordinator.pending_ids().is_empty());
}

#[tokio::test]
async fn bulk_delete_removes_from_cache_and_store() {
    let h = harness(vec![
        record("P1", Status::Enabled, "a@x.com"),
        record("P2", Status::Enabled, "a@x.com"),
    ])
    .await;
    let outcomes = h
        .coordinator
        .bulk(&["P2".to_string(), "P9".to_string()], BulkAction::Delete)
        .await;
    assert!(outcomes[0].is_ok());
    assert!(!outcomes[1].is_ok());
    assert_eq!(h.gateway.records().len(), 1);
    assert_eq!(h.cache.get(&keys::public()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_delete_continues_past_a_failure_in_the_middle() {
    let h = harness(vec![
        record("P1", Status::Enabled, "a@x.com"),
        record("P2", Status::Enabled, "a@x.com"),
        record("P3", Status::Enabled, "a@x.com"),
    ])
    .await;
    h.gateway.fail_on("P2");

    let ids = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
    let outcomes = h.coordinator.bulk(&ids, BulkAction::Delete).await;
    let reported: Vec<(&str, bool)> = outcomes.iter().map(|o| (o.id.as_str(), o.is_ok())).collect();
    assert_eq!(reported, vec![("P1", true), ("P2", false), ("P3", true)]);

    let cached: Vec<String> = h
        .cache
        .get(&keys::public())
        .await
        .unwrap()
        .iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(cached, vec!["P2".to_string()]);
    let stored: Vec<String> = h.gateway.records().iter().map(|r| r.id.clone()).collect();
    assert_eq!(stored, vec!["P2".to_string()]);
    assert!(h.coordinator.pending_ids().is_empty());
}

#[tokio::test]
async fn patching_one_scope_leaves_another() {
    let shared = record("P1", Status::Disabled, "a@x.com");
    let cache = ClientCache::new();
    cache.put(ScopeKey::from("admin_all_all_all_all"), vec![shared.clone()]).await;
    cache.put(keys::leaderboard(), vec![shared.clone()]).await;

    cache
        .patch(&ScopeKey::from("admin_all_all_all_all"), "P1", |r| r.status = Status::Enabled)
        .await;
    assert_eq!(cache.get(&keys::leaderboard()).await.unwrap()[0], shared);
}

#[test]
fn leaderboard_merges_emails_case_insensitively() {
    let records = vec![
        record("P1", Status::Enabled, "a@x.com"),
        record("P2", Status::Enabled, "A@X.com"),
        record("P3", Status::Disabled, "b@x.com"),
    ];
    let board = leaderboard(&records, &LeaderboardPolicy::default());
    assert_eq!(board.len(), 1);
    assert_eq!((board[0].email.as_str(), board[0].submissions), ("a@x.com", 2));
}

#[tokio::test]
async fn submission_round_trip_through_catalog() {
    let gateway = Arc::new(MockGateway::new());
    let identity = Arc::new(SessionIdentity::new(AdminAllowlist::new(["admin@x.com"])));
    identity.sign_in("s@x.com", "Student", None).unwrap();
    let cache = Arc::new(ClientCache::new());
    let catalog = Catalog::new(gateway.clone(), cache.clone(), identity.clone());
    let coordinator = MutationCoordinator::new(gateway.clone(), cache.clone(), ValidationConfig::default());

    assert!(catalog.my_submissions(false).await.unwrap().is_empty());

    let draft = RecordDraft {
        year: "2".into(),
        semester: "3".into(),
        paper_code: "BEC-3001".into(),
        subject_name: "Signals".into(),
        paper_type: Some(PaperType::Regular),
        email: "s@x.com".into(),
        pdf_url: None,
    };
    let mut form = SubmissionForm::with_draft(draft, vec![Branch::Ece, Branch::Eee]);
    coordinator.verify(&mut form).await.unwrap();
    coordinator.submit(&mut form).await.unwrap();
    assert!(matches!(form.state(), FormState::Submitted { .. }));

    // Stale until the caller invalidates
    assert!(catalog.my_submissions(false).await.unwrap().is_empty());
    catalog.invalidate_after_submit("s@x.com").await;
    let mine = catalog.my_submissions(false).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| r.status == Status::Disabled));
    assert!(catalog.public(false).await.unwrap().is_empty());

    // A second submission of the same paper is caught by the check
    let mut again = SubmissionForm::with_draft(form.draft().clone(), vec![Branch::Eee, Branch::Me]);
    let check = coordinator.verify(&mut again).await.unwrap();
    assert_eq!(check.conflicting_branches, vec![Branch::Eee]);
    assert!(matches!(coordinator.submit(&mut again).await, Err(AppError::Conflict { .. })));

    again.deselect_branch(Branch::Eee).unwrap();
    coordinator.verify(&mut again).await.unwrap();
    let outcome = coordinator.submit(&mut again).await.unwrap();
    assert_eq!(outcome.saved_branches(), vec![Branch::Me]);

    let admin_scope = ListScope::admin().with_status(Status::Disabled);
    identity.sign_in("admin@x.com", "Admin", None).unwrap();
    assert_eq!(catalog.admin(admin_scope, true).await.unwrap().len(), 3);
}
