// Invoice database model
// One row per participant per billing period, derived from a dues definition.
// Status columns are closed sets; transitions go through the functions below
// instead of free-form string writes.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::schema::invoices;

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Invoice has already been {0}")]
    AlreadyReviewed(&'static str),
}

/// Payment progress of an invoice, derived from the amount columns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, diesel::expression::AsExpression)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// Threshold rule: paid once the cumulative amount covers the bill,
    /// partially paid while any payment exists, unpaid otherwise.
    pub fn for_amounts(amount_paid: i64, bill_amount: i64) -> Self {
        if amount_paid >= bill_amount {
            InvoiceStatus::Paid
        } else if amount_paid > 0 {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Unpaid
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "paid" => Ok(InvoiceStatus::Paid),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for InvoiceStatus
where
    DB: diesel::backend::Backend,
    String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Self::from_str(&value).map_err(|e| e.into())
    }
}

impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for InvoiceStatus
where
    DB: diesel::backend::Backend,
    str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        self.as_str().to_sql(out)
    }
}

/// Admin review state of a submitted payment.
/// `verified` and `rejected` are terminal; there is no path back to
/// `not_checked` except a fresh payment submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, diesel::expression::AsExpression)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotChecked,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::NotChecked => "not_checked",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Apply an admin review decision. Only legal from `not_checked`.
    pub fn review(self, decision: ReviewDecision) -> Result<Self, TransitionError> {
        match self {
            VerificationStatus::NotChecked => Ok(match decision {
                ReviewDecision::Approve => VerificationStatus::Verified,
                ReviewDecision::Reject => VerificationStatus::Rejected,
            }),
            VerificationStatus::Verified => Err(TransitionError::AlreadyReviewed("verified")),
            VerificationStatus::Rejected => Err(TransitionError::AlreadyReviewed("rejected")),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_checked" => Ok(VerificationStatus::NotChecked),
            "verified" => Ok(VerificationStatus::Verified),
            "rejected" => Ok(VerificationStatus::Rejected),
            _ => Err(format!("Invalid verification status: {}", s)),
        }
    }
}

impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for VerificationStatus
where
    DB: diesel::backend::Backend,
    String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Self::from_str(&value).map_err(|e| e.into())
    }
}

impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for VerificationStatus
where
    DB: diesel::backend::Backend,
    str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        self.as_str().to_sql(out)
    }
}

/// Admin decision on a pending payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, AsChangeset,
)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cluster_id: Uuid,
    pub dues_definition_id: Uuid,
    pub bill_amount: i64, // Rupiah, no fractional unit
    pub amount_paid: i64,
    pub due_date: NaiveDate,
    pub invoice_status: String,
    pub verification_status: String,
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub struct NewInvoice {
    pub user_id: Uuid,
    pub cluster_id: Uuid,
    pub dues_definition_id: Uuid,
    pub bill_amount: i64,
    pub amount_paid: i64,
    pub due_date: NaiveDate,
    pub invoice_status: String,
    pub verification_status: String,
}

impl NewInvoice {
    /// Fresh invoice for one participant and one billing period
    pub fn for_period(
        user_id: Uuid,
        cluster_id: Uuid,
        dues_definition_id: Uuid,
        bill_amount: i64,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            cluster_id,
            dues_definition_id,
            bill_amount,
            amount_paid: 0,
            due_date,
            invoice_status: InvoiceStatus::Unpaid.as_str().to_string(),
            verification_status: VerificationStatus::NotChecked.as_str().to_string(),
        }
    }
}

impl Invoice {
    pub fn invoice_status(&self) -> Result<InvoiceStatus, String> {
        InvoiceStatus::from_str(&self.invoice_status)
    }

    pub fn verification_status(&self) -> Result<VerificationStatus, String> {
        VerificationStatus::from_str(&self.verification_status)
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        invoice_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        invoices::table
            .find(invoice_id)
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::invoices::dsl;

        dsl::invoices
            .filter(dsl::user_id.eq(user_id))
            .order(dsl::due_date.desc())
            .load(conn)
            .await
    }

    pub async fn list_for_cluster(
        conn: &mut AsyncPgConnection,
        cluster_id: Uuid,
        verification: Option<VerificationStatus>,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::invoices::dsl;

        let mut query = dsl::invoices
            .filter(dsl::cluster_id.eq(cluster_id))
            .into_boxed();

        if let Some(status) = verification {
            query = query.filter(dsl::verification_status.eq(status.as_str()));
        }

        query.order(dsl::due_date.desc()).load(conn).await
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewInvoiceRequest {
    pub decision: ReviewDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_threshold_paid() {
        assert_eq!(InvoiceStatus::for_amounts(120_000, 120_000), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::for_amounts(150_000, 120_000), InvoiceStatus::Paid);
    }

    #[test]
    fn test_status_threshold_partial() {
        assert_eq!(
            InvoiceStatus::for_amounts(1, 120_000),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            InvoiceStatus::for_amounts(119_999, 120_000),
            InvoiceStatus::PartiallyPaid
        );
    }

    #[test]
    fn test_status_threshold_unpaid() {
        assert_eq!(InvoiceStatus::for_amounts(0, 120_000), InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_review_from_not_checked() {
        assert_eq!(
            VerificationStatus::NotChecked
                .review(ReviewDecision::Approve)
                .unwrap(),
            VerificationStatus::Verified
        );
        assert_eq!(
            VerificationStatus::NotChecked
                .review(ReviewDecision::Reject)
                .unwrap(),
            VerificationStatus::Rejected
        );
    }

    #[test]
    fn test_review_is_terminal() {
        assert!(VerificationStatus::Verified
            .review(ReviewDecision::Reject)
            .is_err());
        assert!(VerificationStatus::Rejected
            .review(ReviewDecision::Approve)
            .is_err());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            InvoiceStatus::Unpaid,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid,
        ] {
            assert_eq!(InvoiceStatus::from_str(status.as_str()).unwrap(), status);
        }
        for status in [
            VerificationStatus::NotChecked,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(
                VerificationStatus::from_str(status.as_str()).unwrap(),
                status
            );
        }
    }
}
