// Payment status and review rules, exercised through the public types.

use komplekin_backend::models::invoice::{
    InvoiceStatus, ReviewDecision, TransitionError, VerificationStatus,
};

#[test]
fn cumulative_payments_cross_the_paid_threshold() {
    let bill = 150_000;

    // Two partial payments, then one that completes the bill
    let mut paid = 0;
    for (payment, expected) in [
        (50_000, InvoiceStatus::PartiallyPaid),
        (50_000, InvoiceStatus::PartiallyPaid),
        (50_000, InvoiceStatus::Paid),
    ] {
        paid += payment;
        assert_eq!(InvoiceStatus::for_amounts(paid, bill), expected);
    }
}

#[test]
fn overpayment_still_counts_as_paid() {
    assert_eq!(InvoiceStatus::for_amounts(200_000, 150_000), InvoiceStatus::Paid);
}

#[test]
fn review_decisions_are_single_shot() {
    let approved = VerificationStatus::NotChecked
        .review(ReviewDecision::Approve)
        .unwrap();
    assert_eq!(approved, VerificationStatus::Verified);

    // Re-reviewing in either direction is rejected
    assert!(matches!(
        approved.review(ReviewDecision::Reject),
        Err(TransitionError::AlreadyReviewed("verified"))
    ));

    let rejected = VerificationStatus::NotChecked
        .review(ReviewDecision::Reject)
        .unwrap();
    assert!(matches!(
        rejected.review(ReviewDecision::Approve),
        Err(TransitionError::AlreadyReviewed("rejected"))
    ));
}

#[test]
fn fresh_submission_resets_review_state() {
    // After a payment the invoice returns to not_checked, from which a new
    // review is legal again
    let state = VerificationStatus::NotChecked;
    assert!(state.review(ReviewDecision::Approve).is_ok());
}
