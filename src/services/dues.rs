// Dues engine
// Turns a recurring dues definition into concrete per-resident invoices.
// Scheduling math is kept in pure functions; the service wraps them with
// the transactional writes.

use chrono::{Datelike, NaiveDate};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::dues::{
    CreateDuesRequest, DuesDefinition, NewDuesDefinition, NewDuesParticipant,
};
use crate::models::invoice::NewInvoice;
use crate::schema::{dues_definitions, dues_participants, invoices};
use crate::utils::ApiError;

// =============================================================================
// PURE SCHEDULING HELPERS
// =============================================================================

/// Clamp a configured due day into a concrete month.
/// Day 31 in April becomes April 30, day 30 in February becomes the 28th
/// or 29th.
pub fn due_date_in_month(year: i32, month: u32, due_day: u32) -> NaiveDate {
    let last_day = days_in_month(year, month);
    // due_day is validated to 1..=31 upstream
    NaiveDate::from_ymd_opt(year, month, due_day.min(last_day))
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, last_day).unwrap())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
        .day()
}

/// Due date of the first billing month of a definition
pub fn first_due_date(start_date: NaiveDate, due_day: u32) -> NaiveDate {
    due_date_in_month(start_date.year(), start_date.month(), due_day)
}

/// Due dates for every calendar month from `start` through
/// `min(end, today)`, inclusive by month. Used to back-fill invoices for
/// participants added after the definition began.
pub fn billing_due_dates(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    due_day: u32,
) -> Vec<NaiveDate> {
    let horizon = end.min(today);
    let mut dates = Vec::new();

    let mut year = start.year();
    let mut month = start.month();

    while (year, month) <= (horizon.year(), horizon.month()) {
        dates.push(due_date_in_month(year, month, due_day));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    dates
}

/// Whether a freshly generated invoice should trigger an immediate
/// overdue reminder. Past due months always do; the current due month
/// only once today is past the grace cutoff day.
pub fn needs_reminder(due_date: NaiveDate, today: NaiveDate, grace_day: u32) -> bool {
    let due_month = (due_date.year(), due_date.month());
    let today_month = (today.year(), today.month());

    if today_month > due_month {
        true
    } else if today_month == due_month {
        today.day() > grace_day
    } else {
        false
    }
}

/// Split a participant update into the ids to add and the ids to remove
pub fn diff_participants(current: &[Uuid], desired: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let desired_set: HashSet<Uuid> = desired.iter().copied().collect();

    let added = desired
        .iter()
        .filter(|id| !current_set.contains(id))
        .copied()
        .collect();
    let removed = current
        .iter()
        .filter(|id| !desired_set.contains(id))
        .copied()
        .collect();

    (added, removed)
}

// =============================================================================
// SERVICE
// =============================================================================

/// Outcome of creating a dues definition
#[derive(Debug)]
pub struct DuesCreation {
    pub definition: DuesDefinition,
    pub invoices_created: usize,
    /// Participants whose first invoice is already overdue, with its due date
    pub reminder_targets: Vec<(Uuid, NaiveDate)>,
}

/// Outcome of syncing the participant set of a definition
#[derive(Debug)]
pub struct ParticipantSync {
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
    pub invoices_created: usize,
    pub invoices_deleted: usize,
    pub reminder_targets: Vec<(Uuid, NaiveDate)>,
}

pub struct DuesService {
    pool: DieselPool,
    reminder_grace_day: u32,
}

impl DuesService {
    pub fn new(pool: DieselPool) -> Self {
        Self {
            pool,
            reminder_grace_day: crate::app_config::config().dues.reminder_grace_day,
        }
    }

    #[cfg(test)]
    pub fn with_grace_day(pool: DieselPool, reminder_grace_day: u32) -> Self {
        Self {
            pool,
            reminder_grace_day,
        }
    }

    /// Create a definition, its participant rows, and the first billing
    /// month's invoices in one transaction.
    #[tracing::instrument(skip(self, request), fields(cluster_id = %cluster_id))]
    pub async fn create_definition(
        &self,
        cluster_id: Uuid,
        request: &CreateDuesRequest,
    ) -> Result<DuesCreation, ApiError> {
        let due_day = request.due_day_of_month as u32;
        let due_date = first_due_date(request.start_date, due_day);
        let today = chrono::Utc::now().date_naive();

        let new_definition = NewDuesDefinition {
            cluster_id,
            name: request.name.clone(),
            amount: request.amount,
            start_date: request.start_date,
            end_date: request.end_date,
            due_day_of_month: request.due_day_of_month,
        };
        let participants = request.participants.clone();
        let amount = request.amount;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let definition: DuesDefinition = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    let definition: DuesDefinition = diesel::insert_into(dues_definitions::table)
                        .values(&new_definition)
                        .get_result(conn)
                        .await?;

                    let participant_rows: Vec<NewDuesParticipant> = participants
                        .iter()
                        .map(|user_id| NewDuesParticipant {
                            dues_definition_id: definition.id,
                            user_id: *user_id,
                        })
                        .collect();
                    diesel::insert_into(dues_participants::table)
                        .values(&participant_rows)
                        .execute(conn)
                        .await?;

                    let invoice_rows: Vec<NewInvoice> = participants
                        .iter()
                        .map(|user_id| {
                            NewInvoice::for_period(
                                *user_id,
                                definition.cluster_id,
                                definition.id,
                                amount,
                                due_date,
                            )
                        })
                        .collect();
                    diesel::insert_into(invoices::table)
                        .values(&invoice_rows)
                        .execute(conn)
                        .await?;

                    Ok(definition)
                })
            })
            .await?;

        let reminder_targets = if needs_reminder(due_date, today, self.reminder_grace_day) {
            request
                .participants
                .iter()
                .map(|user_id| (*user_id, due_date))
                .collect()
        } else {
            Vec::new()
        };

        tracing::info!(
            definition_id = %definition.id,
            invoices = request.participants.len(),
            reminders = reminder_targets.len(),
            "Dues definition created"
        );

        Ok(DuesCreation {
            invoices_created: request.participants.len(),
            definition,
            reminder_targets,
        })
    }

    /// Replace the participant set of a definition. Removed participants
    /// lose their invoices under this definition; added participants get
    /// back-dated invoices for every billing month already reached.
    #[tracing::instrument(skip(self, definition, desired), fields(definition_id = %definition.id))]
    pub async fn sync_participants(
        &self,
        definition: &DuesDefinition,
        desired: &[Uuid],
    ) -> Result<ParticipantSync, ApiError> {
        let today = chrono::Utc::now().date_naive();
        let due_day = definition.due_day_of_month as u32;
        let due_dates = billing_due_dates(
            definition.start_date,
            definition.end_date,
            today,
            due_day,
        );

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let current = definition.participant_ids(&mut conn).await?;
        let (added, removed) = diff_participants(&current, desired);

        let definition_id = definition.id;
        let cluster_id = definition.cluster_id;
        let amount = definition.amount;
        let added_tx = added.clone();
        let removed_tx = removed.clone();
        let due_dates_tx = due_dates.clone();

        let (invoices_created, invoices_deleted) = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    // Removed participants: drop only their invoices under
                    // this definition
                    let invoices_deleted = if removed_tx.is_empty() {
                        0
                    } else {
                        diesel::delete(
                            invoices::table
                                .filter(invoices::dues_definition_id.eq(definition_id))
                                .filter(invoices::user_id.eq_any(&removed_tx)),
                        )
                        .execute(conn)
                        .await?
                    };

                    if !removed_tx.is_empty() {
                        diesel::delete(
                            dues_participants::table
                                .filter(dues_participants::dues_definition_id.eq(definition_id))
                                .filter(dues_participants::user_id.eq_any(&removed_tx)),
                        )
                        .execute(conn)
                        .await?;
                    }

                    let mut invoices_created = 0;
                    if !added_tx.is_empty() {
                        let participant_rows: Vec<NewDuesParticipant> = added_tx
                            .iter()
                            .map(|user_id| NewDuesParticipant {
                                dues_definition_id: definition_id,
                                user_id: *user_id,
                            })
                            .collect();
                        diesel::insert_into(dues_participants::table)
                            .values(&participant_rows)
                            .execute(conn)
                            .await?;

                        // Re-adding a former participant must not duplicate
                        // invoices that survived a previous membership
                        let existing: Vec<(Uuid, NaiveDate)> = invoices::table
                            .filter(invoices::dues_definition_id.eq(definition_id))
                            .filter(invoices::user_id.eq_any(&added_tx))
                            .select((invoices::user_id, invoices::due_date))
                            .load(conn)
                            .await?;
                        let existing: HashSet<(Uuid, NaiveDate)> =
                            existing.into_iter().collect();

                        let invoice_rows: Vec<NewInvoice> = added_tx
                            .iter()
                            .flat_map(|user_id| {
                                due_dates_tx.iter().filter_map(|due_date| {
                                    if existing.contains(&(*user_id, *due_date)) {
                                        None
                                    } else {
                                        Some(NewInvoice::for_period(
                                            *user_id,
                                            cluster_id,
                                            definition_id,
                                            amount,
                                            *due_date,
                                        ))
                                    }
                                })
                            })
                            .collect();

                        invoices_created = invoice_rows.len();
                        if !invoice_rows.is_empty() {
                            diesel::insert_into(invoices::table)
                                .values(&invoice_rows)
                                .execute(conn)
                                .await?;
                        }
                    }

                    Ok((invoices_created, invoices_deleted))
                })
            })
            .await?;

        let mut reminder_targets = Vec::new();
        for user_id in &added {
            for due_date in &due_dates {
                if needs_reminder(*due_date, today, self.reminder_grace_day) {
                    reminder_targets.push((*user_id, *due_date));
                }
            }
        }

        tracing::info!(
            added = added.len(),
            removed = removed.len(),
            invoices_created,
            invoices_deleted,
            "Dues participants synced"
        );

        Ok(ParticipantSync {
            added,
            removed,
            invoices_created,
            invoices_deleted,
            reminder_targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_due_date_clamped_to_month_length() {
        assert_eq!(due_date_in_month(2025, 4, 31), d(2025, 4, 30));
        assert_eq!(due_date_in_month(2025, 2, 30), d(2025, 2, 28));
        assert_eq!(due_date_in_month(2024, 2, 30), d(2024, 2, 29));
        assert_eq!(due_date_in_month(2025, 1, 15), d(2025, 1, 15));
    }

    #[test]
    fn test_first_due_date_uses_start_month() {
        assert_eq!(first_due_date(d(2025, 6, 10), 5), d(2025, 6, 5));
        assert_eq!(first_due_date(d(2025, 2, 1), 31), d(2025, 2, 28));
    }

    #[test]
    fn test_billing_walk_caps_at_today() {
        let dates = billing_due_dates(d(2025, 1, 1), d(2025, 12, 31), d(2025, 3, 20), 10);
        assert_eq!(dates, vec![d(2025, 1, 10), d(2025, 2, 10), d(2025, 3, 10)]);
    }

    #[test]
    fn test_billing_walk_caps_at_end_date() {
        let dates = billing_due_dates(d(2025, 1, 1), d(2025, 2, 28), d(2025, 6, 1), 5);
        assert_eq!(dates, vec![d(2025, 1, 5), d(2025, 2, 5)]);
    }

    #[test]
    fn test_billing_walk_crosses_year_boundary() {
        let dates = billing_due_dates(d(2024, 11, 1), d(2025, 2, 28), d(2025, 1, 15), 20);
        assert_eq!(dates, vec![d(2024, 11, 20), d(2024, 12, 20), d(2025, 1, 20)]);
    }

    #[test]
    fn test_billing_walk_empty_for_future_start() {
        let dates = billing_due_dates(d(2025, 8, 1), d(2025, 12, 31), d(2025, 5, 1), 10);
        assert!(dates.is_empty());
    }

    #[test]
    fn test_reminder_fires_after_grace_cutoff() {
        // Definition created on the 10th with due day 5: past the cutoff,
        // one reminder is due
        let due = d(2025, 6, 5);
        assert!(needs_reminder(due, d(2025, 6, 10), 2));
    }

    #[test]
    fn test_reminder_quiet_within_grace() {
        let due = d(2025, 6, 5);
        assert!(!needs_reminder(due, d(2025, 6, 1), 2));
        assert!(!needs_reminder(due, d(2025, 6, 2), 2));
        assert!(needs_reminder(due, d(2025, 6, 3), 2));
    }

    #[test]
    fn test_reminder_for_past_months() {
        assert!(needs_reminder(d(2025, 3, 25), d(2025, 6, 1), 2));
    }

    #[test]
    fn test_no_reminder_for_future_months() {
        assert!(!needs_reminder(d(2025, 9, 5), d(2025, 6, 30), 2));
    }

    #[test]
    fn test_diff_participants() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let (added, removed) = diff_participants(&[a, b], &[b, c]);
        assert_eq!(added, vec![c]);
        assert_eq!(removed, vec![a]);
    }

    #[test]
    fn test_diff_participants_no_change() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let (added, removed) = diff_participants(&[a, b], &[b, a]);
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }
}
