// Dues definition (iuran) database models
// A definition is the recurring billing rule; participants are the residents
// it bills. Concrete invoices are materialized by the dues service.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{dues_definitions, dues_participants};

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, AsChangeset,
)]
#[diesel(table_name = dues_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DuesDefinition {
    pub id: Uuid,
    pub cluster_id: Uuid,
    pub name: String,
    pub amount: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub due_day_of_month: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dues_definitions)]
pub struct NewDuesDefinition {
    pub cluster_id: Uuid,
    pub name: String,
    pub amount: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub due_day_of_month: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = dues_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DuesParticipant {
    pub id: Uuid,
    pub dues_definition_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dues_participants)]
pub struct NewDuesParticipant {
    pub dues_definition_id: Uuid,
    pub user_id: Uuid,
}

impl DuesDefinition {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        definition_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        dues_definitions::table
            .find(definition_id)
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_for_cluster(
        conn: &mut AsyncPgConnection,
        cluster: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::dues_definitions::dsl;

        dsl::dues_definitions
            .filter(dsl::cluster_id.eq(cluster))
            .order(dsl::start_date.desc())
            .load(conn)
            .await
    }

    pub async fn participant_ids(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Uuid>, diesel::result::Error> {
        use crate::schema::dues_participants::dsl;

        dsl::dues_participants
            .filter(dsl::dues_definition_id.eq(self.id))
            .select(dsl::user_id)
            .load(conn)
            .await
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateDuesRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(range(min = 1, max = 31, message = "Due day must be between 1 and 31"))]
    pub due_day_of_month: i32,

    #[validate(length(min = 1, message = "At least one participant is required"))]
    pub participants: Vec<Uuid>,
}

impl CreateDuesRequest {
    /// Date-range check that the validator derive cannot express
    pub fn validate_date_range(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err("End date must not precede start date".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateParticipantsRequest {
    #[validate(length(min = 1, message = "At least one participant is required"))]
    pub participants: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DuesDefinitionResponse {
    pub definition: DuesDefinition,
    pub participants: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantUpdateResponse {
    pub added: usize,
    pub removed: usize,
    pub invoices_created: usize,
    pub invoices_deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_validation() {
        let mut req = CreateDuesRequest {
            name: "Iuran Keamanan".to_string(),
            amount: 120_000,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            due_day_of_month: 23,
            participants: vec![Uuid::new_v4()],
        };
        assert!(req.validate().is_ok());
        assert!(req.validate_date_range().is_ok());

        req.end_date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert!(req.validate_date_range().is_err());
    }

    #[test]
    fn test_due_day_bounds() {
        let req = CreateDuesRequest {
            name: "Iuran Kebersihan".to_string(),
            amount: 50_000,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            due_day_of_month: 32,
            participants: vec![Uuid::new_v4()],
        };
        assert!(req.validate().is_err());
    }
}
