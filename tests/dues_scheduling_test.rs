// Dues scheduling behavior across module boundaries.
// These tests exercise the pure scheduling engine together with invoice
// construction, without a live database.

use chrono::NaiveDate;
use uuid::Uuid;

use komplekin_backend::models::invoice::{InvoiceStatus, NewInvoice, VerificationStatus};
use komplekin_backend::services::dues::{
    billing_due_dates, diff_participants, due_date_in_month, first_due_date, needs_reminder,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn new_definition_created_past_due_day_flags_one_reminder_per_participant() {
    // Definition with due day 5, created on the 10th of the same month:
    // the single first-month invoice per participant is already overdue.
    let start = d(2025, 6, 1);
    let today = d(2025, 6, 10);
    let due_day = 5;
    let grace_day = 2;

    let due_date = first_due_date(start, due_day);
    assert_eq!(due_date, d(2025, 6, 5));
    assert!(needs_reminder(due_date, today, grace_day));

    let participants: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let reminders: Vec<_> = participants
        .iter()
        .filter(|_| needs_reminder(due_date, today, grace_day))
        .collect();
    assert_eq!(reminders.len(), participants.len());
}

#[test]
fn backfilled_invoices_cover_every_elapsed_month_once() {
    // Participant added mid-October to a definition that started in July
    let start = d(2025, 7, 1);
    let end = d(2026, 6, 30);
    let today = d(2025, 10, 15);

    let due_dates = billing_due_dates(start, end, today, 23);
    assert_eq!(
        due_dates,
        vec![d(2025, 7, 23), d(2025, 8, 23), d(2025, 9, 23), d(2025, 10, 23)]
    );

    // One invoice per month, each starting unpaid and unreviewed
    let user_id = Uuid::new_v4();
    let cluster_id = Uuid::new_v4();
    let definition_id = Uuid::new_v4();
    for due_date in &due_dates {
        let invoice = NewInvoice::for_period(user_id, cluster_id, definition_id, 120_000, *due_date);
        assert_eq!(invoice.invoice_status, InvoiceStatus::Unpaid.as_str());
        assert_eq!(
            invoice.verification_status,
            VerificationStatus::NotChecked.as_str()
        );
        assert_eq!(invoice.amount_paid, 0);
    }
}

#[test]
fn backfill_reminders_skip_the_current_month_within_grace() {
    // Added on the 1st: prior months remind, the current month does not yet
    let due_dates = billing_due_dates(d(2025, 7, 1), d(2026, 6, 30), d(2025, 10, 1), 23);
    let today = d(2025, 10, 1);

    let overdue: Vec<_> = due_dates
        .iter()
        .filter(|due| needs_reminder(**due, today, 2))
        .collect();
    assert_eq!(overdue.len(), 3); // July, August, September
}

#[test]
fn due_day_clamping_handles_short_months() {
    assert_eq!(due_date_in_month(2025, 2, 31), d(2025, 2, 28));
    assert_eq!(due_date_in_month(2024, 2, 31), d(2024, 2, 29));
    assert_eq!(due_date_in_month(2025, 4, 31), d(2025, 4, 30));
    assert_eq!(due_date_in_month(2025, 12, 31), d(2025, 12, 31));
}

#[test]
fn participant_diff_drives_adds_and_removals() {
    let keep = Uuid::new_v4();
    let leave = Uuid::new_v4();
    let join = Uuid::new_v4();

    let (added, removed) = diff_participants(&[keep, leave], &[keep, join]);
    assert_eq!(added, vec![join]);
    assert_eq!(removed, vec![leave]);
}
