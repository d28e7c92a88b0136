// Ledger entry database model
// Append-only audit trail; the application never updates or deletes rows here.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::ledger_entries;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "debit",
            EntryType::Credit => "credit",
        }
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryType::Debit),
            "credit" => Ok(EntryType::Credit),
            _ => Err(format!("Invalid ledger entry type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LedgerEntry {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub cluster_id: Uuid,
    pub amount: i64,
    pub entry_type: String,
    pub account_type: String,
    pub description: String,
    pub entry_date: DateTime<Utc>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ledger_entries)]
pub struct NewLedgerEntry {
    pub invoice_id: Uuid,
    pub cluster_id: Uuid,
    pub amount: i64,
    pub entry_type: String,
    pub account_type: String,
    pub description: String,
    pub entry_date: DateTime<Utc>,
    pub receipt_url: Option<String>,
}

impl NewLedgerEntry {
    /// Credit entry recording a resident payment against an invoice
    pub fn payment_credit(
        invoice_id: Uuid,
        cluster_id: Uuid,
        amount: i64,
        description: String,
        receipt_url: Option<String>,
    ) -> Self {
        Self {
            invoice_id,
            cluster_id,
            amount,
            entry_type: EntryType::Credit.as_str().to_string(),
            account_type: "dues".to_string(),
            description,
            entry_date: Utc::now(),
            receipt_url,
        }
    }
}

impl LedgerEntry {
    pub async fn list_for_invoice(
        conn: &mut AsyncPgConnection,
        invoice: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::ledger_entries::dsl;

        dsl::ledger_entries
            .filter(dsl::invoice_id.eq(invoice))
            .order(dsl::entry_date.asc())
            .load(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trip() {
        assert_eq!(EntryType::from_str("credit").unwrap(), EntryType::Credit);
        assert_eq!(EntryType::from_str("debit").unwrap(), EntryType::Debit);
        assert!(EntryType::from_str("transfer").is_err());
    }

    #[test]
    fn test_payment_credit_shape() {
        let invoice_id = Uuid::new_v4();
        let cluster_id = Uuid::new_v4();
        let entry = NewLedgerEntry::payment_credit(
            invoice_id,
            cluster_id,
            50_000,
            "Dues payment".to_string(),
            None,
        );

        assert_eq!(entry.entry_type, "credit");
        assert_eq!(entry.account_type, "dues");
        assert_eq!(entry.amount, 50_000);
        assert_eq!(entry.invoice_id, invoice_id);
    }
}
