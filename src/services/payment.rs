// Payment service
// Applies a resident payment to an invoice and records the admin review
// decision. Every multi-row write happens in one transaction; the ledger
// row and the invoice mutation commit or roll back together.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::invoice::{Invoice, InvoiceStatus, ReviewDecision, VerificationStatus};
use crate::models::ledger::NewLedgerEntry;
use crate::schema::{invoices, ledger_entries};
use crate::utils::ApiError;

/// New paid total and invoice status after a payment. A total that no
/// longer fits the amount column is rejected instead of wrapping.
fn apply_payment(amount_paid: i64, bill_amount: i64, amount: i64) -> Option<(i64, InvoiceStatus)> {
    let new_amount_paid = amount_paid.checked_add(amount)?;
    let status = InvoiceStatus::for_amounts(new_amount_paid, bill_amount);
    Some((new_amount_paid, status))
}

/// Resolve a locked row against the caller's claim on it. Absent and
/// foreign invoices are indistinguishable.
fn claim_invoice<F>(invoice: Option<Invoice>, is_mine: F) -> Result<Invoice, PaymentTxError>
where
    F: FnOnce(&Invoice) -> bool,
{
    match invoice {
        Some(inv) if is_mine(&inv) => Ok(inv),
        _ => Err(PaymentTxError::NotFound),
    }
}

pub struct PaymentService {
    pool: DieselPool,
}

impl PaymentService {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    /// Apply a payment submitted by a resident to their own invoice.
    /// A foreign invoice id answers 404, same as a nonexistent one, and
    /// leaves the row untouched.
    #[tracing::instrument(skip(self, receipt_url), fields(invoice_id = %invoice_id))]
    pub async fn submit_payment(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
        payment_method: String,
        amount: i64,
        receipt_url: Option<String>,
    ) -> Result<Invoice, ApiError> {
        if amount <= 0 {
            return Err(ApiError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let updated: Invoice = conn
            .build_transaction()
            .run::<_, PaymentTxError, _>(|conn| {
                Box::pin(async move {
                    let invoice: Option<Invoice> = invoices::table
                        .find(invoice_id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;

                    let invoice = claim_invoice(invoice, |inv| inv.user_id == user_id)?;

                    let (new_amount_paid, new_status) =
                        apply_payment(invoice.amount_paid, invoice.bill_amount, amount)
                            .ok_or(PaymentTxError::Overflow)?;
                    let now = Utc::now();

                    let updated: Invoice = diesel::update(invoices::table.find(invoice.id))
                        .set((
                            invoices::amount_paid.eq(new_amount_paid),
                            invoices::invoice_status.eq(new_status.as_str()),
                            invoices::verification_status
                                .eq(VerificationStatus::NotChecked.as_str()),
                            invoices::payment_method.eq(Some(payment_method)),
                            invoices::payment_date.eq(Some(now)),
                            invoices::receipt_url.eq(receipt_url.clone()),
                            invoices::updated_at.eq(now),
                        ))
                        .get_result(conn)
                        .await?;

                    let entry = NewLedgerEntry::payment_credit(
                        invoice.id,
                        invoice.cluster_id,
                        amount,
                        format!("Dues payment for invoice {}", invoice.id),
                        receipt_url,
                    );
                    diesel::insert_into(ledger_entries::table)
                        .values(&entry)
                        .execute(conn)
                        .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(ApiError::from)?;

        tracing::info!(
            invoice_id = %updated.id,
            amount,
            status = %updated.invoice_status,
            "Payment recorded"
        );

        Ok(updated)
    }

    /// Apply an admin review decision to a submitted payment.
    /// Only legal while the invoice is `not_checked`.
    #[tracing::instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn review(
        &self,
        cluster_id: Uuid,
        invoice_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Invoice, ApiError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let updated: Invoice = conn
            .build_transaction()
            .run::<_, PaymentTxError, _>(|conn| {
                Box::pin(async move {
                    let invoice: Option<Invoice> = invoices::table
                        .find(invoice_id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;

                    let invoice = claim_invoice(invoice, |inv| inv.cluster_id == cluster_id)?;

                    let current = invoice
                        .verification_status()
                        .map_err(PaymentTxError::Corrupt)?;
                    let next = current
                        .review(decision)
                        .map_err(PaymentTxError::Transition)?;

                    let updated: Invoice = diesel::update(invoices::table.find(invoice.id))
                        .set((
                            invoices::verification_status.eq(next.as_str()),
                            invoices::updated_at.eq(Utc::now()),
                        ))
                        .get_result(conn)
                        .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(ApiError::from)?;

        tracing::info!(
            invoice_id = %updated.id,
            verification = %updated.verification_status,
            "Payment reviewed"
        );

        Ok(updated)
    }
}

/// Error type threaded through the payment transactions. Diesel requires
/// `From<diesel::result::Error>` on the transaction error type.
#[derive(Debug)]
enum PaymentTxError {
    NotFound,
    Overflow,
    Transition(crate::models::invoice::TransitionError),
    Corrupt(String),
    Database(diesel::result::Error),
}

impl From<diesel::result::Error> for PaymentTxError {
    fn from(err: diesel::result::Error) -> Self {
        PaymentTxError::Database(err)
    }
}

impl From<PaymentTxError> for ApiError {
    fn from(err: PaymentTxError) -> Self {
        match err {
            PaymentTxError::NotFound => ApiError::NotFound,
            PaymentTxError::Overflow => {
                ApiError::Validation("Payment amount is too large".to_string())
            }
            PaymentTxError::Transition(e) => e.into(),
            PaymentTxError::Corrupt(msg) => ApiError::Database(msg),
            PaymentTxError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn invoice_owned_by(user_id: Uuid, amount_paid: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            user_id,
            cluster_id: Uuid::new_v4(),
            dues_definition_id: Uuid::new_v4(),
            bill_amount: 150_000,
            amount_paid,
            due_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            invoice_status: InvoiceStatus::Unpaid.as_str().to_string(),
            verification_status: VerificationStatus::NotChecked.as_str().to_string(),
            payment_method: None,
            payment_date: None,
            receipt_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_payment_accumulates_and_recomputes_status() {
        assert_eq!(
            apply_payment(50_000, 150_000, 50_000),
            Some((100_000, InvoiceStatus::PartiallyPaid))
        );
        assert_eq!(
            apply_payment(100_000, 150_000, 50_000),
            Some((150_000, InvoiceStatus::Paid))
        );
    }

    #[test]
    fn test_oversized_payment_is_rejected_not_wrapped() {
        // i64::MAX against any prior payment must fail cleanly
        assert_eq!(apply_payment(1, 150_000, i64::MAX), None);
        assert_eq!(apply_payment(i64::MAX, 150_000, i64::MAX), None);
    }

    #[test]
    fn test_oversized_payment_maps_to_validation_error() {
        let err: ApiError = PaymentTxError::Overflow.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_foreign_invoice_claim_answers_not_found() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let invoice = invoice_owned_by(owner, 50_000);
        let before = invoice.clone();

        let result = claim_invoice(Some(invoice), |inv| inv.user_id == stranger);
        assert!(matches!(result, Err(PaymentTxError::NotFound)));

        // The claim itself never touches the row
        assert_eq!(before.amount_paid, 50_000);
        assert_eq!(before.invoice_status, InvoiceStatus::Unpaid.as_str());
    }

    #[test]
    fn test_absent_invoice_claim_answers_not_found() {
        let result = claim_invoice(None, |_| true);
        assert!(matches!(result, Err(PaymentTxError::NotFound)));
    }

    #[test]
    fn test_owner_claim_succeeds() {
        let owner = Uuid::new_v4();
        let invoice = invoice_owned_by(owner, 0);

        let claimed = claim_invoice(Some(invoice), |inv| inv.user_id == owner).unwrap();
        assert_eq!(claimed.user_id, owner);
    }
}
