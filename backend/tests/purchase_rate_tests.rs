//! Purchase rate approval tests

mod common;

use common::*;
use mill_workflow::AppError;
use rust_decimal_macros::dec;
use shared::{ApprovalStatus, PurchaseRateInputs, ReviewDecision, UserRole};
use uuid::Uuid;

fn inputs(base_rate: rust_decimal::Decimal) -> PurchaseRateInputs {
    let mut terms = rate_terms();
    terms.base_rate = base_rate;
    PurchaseRateInputs {
        bags: 10,
        actual_net_weight: dec!(750),
        terms,
    }
}

// ============================================================================
// Submission and review
// ============================================================================

#[tokio::test]
async fn test_submit_then_approve() {
    let (state, _store) = state();
    let staff = actor(UserRole::Staff);
    let owner = actor(UserRole::Owner);
    let arrival = Uuid::new_v4();

    let rate = state
        .purchase_rates
        .submit_purchase_rate(staff, arrival, inputs(dec!(2000)))
        .await
        .unwrap();
    assert_eq!(rate.status, ApprovalStatus::Pending);
    // 750 kg at 2000 per quintal
    assert_eq!(rate.total_amount(), dec!(15000));

    let approved = state
        .purchase_rates
        .review_purchase_rate(owner, rate.id, ReviewDecision::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.reviewed.unwrap().by, owner.user_id);

    // Approved rates are frozen
    let err = state
        .purchase_rates
        .submit_purchase_rate(staff, arrival, inputs(dec!(2100)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyFinalized(_)));

    let err = state
        .purchase_rates
        .review_purchase_rate(owner, rate.id, ReviewDecision::Reject, Some("late".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_rejected_rate_is_resubmitted_on_same_record() {
    let (state, _store) = state();
    let staff = actor(UserRole::Staff);
    let owner = actor(UserRole::Owner);
    let arrival = Uuid::new_v4();

    let rate = state
        .purchase_rates
        .submit_purchase_rate(staff, arrival, inputs(dec!(2000)))
        .await
        .unwrap();

    let err = state
        .purchase_rates
        .review_purchase_rate(owner, rate.id, ReviewDecision::Reject, Some("  ".to_string()))
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, "remarks"),
        other => panic!("unexpected error {:?}", other),
    }

    let rejected = state
        .purchase_rates
        .review_purchase_rate(
            owner,
            rate.id,
            ReviewDecision::Reject,
            Some("Base rate above market".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);

    let resubmitted = state
        .purchase_rates
        .submit_purchase_rate(staff, arrival, inputs(dec!(1900)))
        .await
        .unwrap();
    assert_eq!(resubmitted.id, rate.id);
    assert_eq!(resubmitted.status, ApprovalStatus::Pending);
    assert_eq!(resubmitted.submission_count, 2);
    assert!(resubmitted.review_remarks.is_none());
    assert_eq!(resubmitted.total_amount(), dec!(14250));

    let stored = state
        .purchase_rates
        .get_purchase_rate(owner, rate.id)
        .await
        .unwrap();
    assert_eq!(stored, resubmitted);
}

#[tokio::test]
async fn test_concurrent_first_submissions_share_one_rate() {
    let (state, _store) = state();
    let staff = actor(UserRole::Staff);
    let arrival = Uuid::new_v4();

    let (first, second) = tokio::join!(
        state.purchase_rates.submit_purchase_rate(staff, arrival, inputs(dec!(2000))),
        state.purchase_rates.submit_purchase_rate(staff, arrival, inputs(dec!(2100))),
    );
    let saved: Vec<_> = [first, second]
        .into_iter()
        .filter_map(|result| match result {
            Ok(rate) => Some(rate),
            Err(AppError::Conflict(_)) => None,
            Err(other) => panic!("unexpected error {:?}", other),
        })
        .collect();
    assert!(!saved.is_empty());
    assert!(saved.iter().all(|rate| rate.id == saved[0].id));

    let stored = state
        .purchase_rates
        .get_purchase_rate(actor(UserRole::Owner), saved[0].id)
        .await
        .unwrap();
    assert_eq!(stored.arrival_id, arrival);
    assert_eq!(stored.submission_count as usize, saved.len());
}

// ============================================================================
// Permissions
// ============================================================================

#[tokio::test]
async fn test_only_approvers_review() {
    let (state, _store) = state();
    let staff = actor(UserRole::Staff);
    let rate = state
        .purchase_rates
        .submit_purchase_rate(staff, Uuid::new_v4(), inputs(dec!(2000)))
        .await
        .unwrap();

    for role in [UserRole::Staff, UserRole::Manager, UserRole::QualitySupervisor] {
        let err = state
            .purchase_rates
            .review_purchase_rate(actor(role), rate.id, ReviewDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied { .. }), "{}", role);
    }

    let err = state
        .purchase_rates
        .submit_purchase_rate(actor(UserRole::InventoryStaff), Uuid::new_v4(), inputs(dec!(2000)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied { .. }));
}

#[tokio::test]
async fn test_unknown_rate_is_not_found() {
    let (state, _store) = state();
    let err = state
        .purchase_rates
        .review_purchase_rate(actor(UserRole::Owner), Uuid::new_v4(), ReviewDecision::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
