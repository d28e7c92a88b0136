// User database model
// Residents and admins share one table; the role column drives route gating.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::schema::users;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<diesel::result::Error> for UserError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => UserError::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => UserError::EmailTaken,
            other => UserError::DatabaseError(other.to_string()),
        }
    }
}

/// Account role enumeration driving the /api/admin vs /api/user route gate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, diesel::expression::AsExpression)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Resident,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Resident => "resident",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "resident" => Ok(UserRole::Resident),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for UserRole
where
    DB: diesel::backend::Backend,
    String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Self::from_str(&value).map_err(|e| e.into())
    }
}

impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for UserRole
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

/// User database model - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub cluster_id: Uuid,
    pub phone: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub cluster_id: Uuid,
    pub phone: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
}

impl User {
    pub fn role(&self) -> UserRole {
        // Rows only ever hold values written through UserRole::as_str
        UserRole::from_str(&self.role).unwrap_or(UserRole::Resident)
    }

    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        user_email: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::{email, users as users_table};

        users_table
            .filter(email.eq(user_email))
            .first(conn)
            .await
            .map_err(UserError::from)
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, user_id: Uuid) -> Result<Self, UserError> {
        users::table
            .find(user_id)
            .first(conn)
            .await
            .map_err(UserError::from)
    }

    pub async fn list_residents(
        conn: &mut AsyncPgConnection,
        cluster: Uuid,
    ) -> Result<Vec<Self>, UserError> {
        use crate::schema::users::dsl;

        dsl::users
            .filter(dsl::cluster_id.eq(cluster))
            .filter(dsl::role.eq(UserRole::Resident.as_str()))
            .order(dsl::full_name.asc())
            .load(conn)
            .await
            .map_err(UserError::from)
    }

    pub async fn mark_email_verified(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<(), UserError> {
        use crate::schema::users::dsl;

        diesel::update(dsl::users.find(user_id))
            .set((
                dsl::email_verified.eq(true),
                dsl::email_verified_at.eq(Utc::now()),
                dsl::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn set_password_hash(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        new_hash: &str,
    ) -> Result<(), UserError> {
        use crate::schema::users::dsl;

        diesel::update(dsl::users.find(user_id))
            .set((
                dsl::password_hash.eq(new_hash),
                dsl::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub cluster_id: String,
    pub email_verified: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            cluster_id: user.cluster_id.to_string(),
            email_verified: user.email_verified,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateResidentRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,

    #[validate(length(max = 30, message = "Phone number must be less than 30 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateResidentResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub invitation_sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("resident").unwrap(), UserRole::Resident);
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert!(UserRole::from_str("superuser").is_err());
    }

    #[test]
    fn test_create_resident_request_rejects_bad_email() {
        let req = CreateResidentRequest {
            email: "not-an-email".to_string(),
            full_name: "Budi Santoso".to_string(),
            phone: None,
        };
        assert!(req.validate().is_err());

        let ok = CreateResidentRequest {
            email: "budi@example.com".to_string(),
            full_name: "Budi Santoso".to_string(),
            phone: Some("+62812345678".to_string()),
        };
        assert!(ok.validate().is_ok());
    }
}
