//! Trip CRUD and the aggregation triggers that hang off it. Every mutating
//! operation runs inside one transaction together with its map updates, so
//! a trip can never be observed without its ledger entry.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use tracing::debug;

use super::visits::VisitRecorder;
use super::{country, ServiceError};
use crate::models::trip::{NewTrip, Trip, TripChangeset};
use crate::schema::trips;

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub country_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTripRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub country_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TripFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TripFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

fn not_empty(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(
            format!("{}_EMPTY", field.to_uppercase()),
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

fn check_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if start > end {
        return Err(ServiceError::validation(
            "START_DATE_INVALID",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_create(req: &CreateTripRequest) -> Result<(), ServiceError> {
    not_empty(&req.name, "name")?;
    not_empty(&req.description, "description")?;
    check_date_order(req.start_date, req.end_date)
}

pub async fn list_trips(
    conn: &mut AsyncPgConnection,
    filter: &TripFilter,
) -> Result<Vec<Trip>, ServiceError> {
    let mut query = trips::table.into_boxed();
    if let Some(start) = filter.start_date {
        query = query.filter(trips::start_date.ge(start));
    }
    if let Some(end) = filter.end_date {
        query = query.filter(trips::end_date.le(end));
    }

    let all = query
        .order(trips::start_date.desc())
        .limit(filter.limit())
        .offset(filter.offset())
        .load::<Trip>(conn)
        .await?;
    Ok(all)
}

pub async fn list_trips_by_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<Vec<Trip>, ServiceError> {
    let all = trips::table
        .filter(trips::user_id.eq(user_id))
        .order(trips::start_date.desc())
        .load::<Trip>(conn)
        .await?;
    Ok(all)
}

pub async fn get_trip_by_id(
    conn: &mut AsyncPgConnection,
    trip_id: i32,
) -> Result<Trip, ServiceError> {
    trips::table
        .find(trip_id)
        .first::<Trip>(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::trip_not_found(trip_id))
}

/// Create a trip and record the visit on the user's map. Trip insert,
/// ledger upsert, and counter refresh commit together or not at all.
pub async fn create_trip(
    conn: &mut AsyncPgConnection,
    recorder: &dyn VisitRecorder,
    user_id: i32,
    req: CreateTripRequest,
) -> Result<Trip, ServiceError> {
    validate_create(&req)?;

    conn.build_transaction()
        .run(|conn| {
            async move {
                if !country::country_exists(conn, req.country_id).await? {
                    return Err(ServiceError::country_not_found(req.country_id));
                }

                let now = Utc::now().naive_utc();
                let trip = diesel::insert_into(trips::table)
                    .values(NewTrip {
                        user_id,
                        country_id: req.country_id,
                        name: req.name,
                        description: req.description,
                        start_date: req.start_date,
                        end_date: req.end_date,
                        created_at: now,
                        updated_at: now,
                    })
                    .get_result::<Trip>(conn)
                    .await?;

                recorder.record_visit(conn, user_id, trip.country_id).await?;
                recorder.refresh_metrics(conn, user_id).await?;

                debug!(user_id, trip_id = trip.id, country_id = trip.country_id, "Created trip");
                Ok(trip)
            }
            .scope_boxed()
        })
        .await
}

/// Update a trip. A country change records a visit to the new country; the
/// old country's ledger row stays, a visited country remains visited.
pub async fn update_trip(
    conn: &mut AsyncPgConnection,
    recorder: &dyn VisitRecorder,
    user_id: i32,
    trip_id: i32,
    req: UpdateTripRequest,
) -> Result<Trip, ServiceError> {
    if let Some(name) = &req.name {
        not_empty(name, "name")?;
    }
    if let Some(description) = &req.description {
        not_empty(description, "description")?;
    }

    conn.build_transaction()
        .run(|conn| {
            async move {
                let trip = get_trip_by_id(conn, trip_id).await?;
                if trip.user_id != user_id {
                    return Err(ServiceError::forbidden(
                        "You do not have permission to update this trip",
                    ));
                }

                // The effective range after the update must still be ordered
                let start = req.start_date.unwrap_or(trip.start_date);
                let end = req.end_date.unwrap_or(trip.end_date);
                check_date_order(start, end)?;

                let country_changed = req
                    .country_id
                    .map_or(false, |country_id| country_id != trip.country_id);
                if let Some(country_id) = req.country_id {
                    if !country::country_exists(conn, country_id).await? {
                        return Err(ServiceError::country_not_found(country_id));
                    }
                }

                let updated = diesel::update(trips::table.find(trip_id))
                    .set(TripChangeset {
                        country_id: req.country_id,
                        name: req.name,
                        description: req.description,
                        start_date: req.start_date,
                        end_date: req.end_date,
                        updated_at: Some(Utc::now().naive_utc()),
                    })
                    .get_result::<Trip>(conn)
                    .await?;

                if country_changed {
                    recorder
                        .record_visit(conn, user_id, updated.country_id)
                        .await?;
                    recorder.refresh_metrics(conn, user_id).await?;
                }

                debug!(user_id, trip_id, country_changed, "Updated trip");
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
}

/// Delete a trip and refresh the map counters. The ledger row for the
/// trip's country is not pruned.
pub async fn delete_trip(
    conn: &mut AsyncPgConnection,
    recorder: &dyn VisitRecorder,
    user_id: i32,
    trip_id: i32,
) -> Result<(), ServiceError> {
    conn.build_transaction()
        .run(|conn| {
            async move {
                let trip = get_trip_by_id(conn, trip_id).await?;
                if trip.user_id != user_id {
                    return Err(ServiceError::forbidden(
                        "You do not have permission to delete this trip",
                    ));
                }

                diesel::delete(trips::table.find(trip_id)).execute(conn).await?;
                recorder.refresh_metrics(conn, user_id).await?;

                debug!(user_id, trip_id, "Deleted trip");
                Ok(())
            }
            .scope_boxed()
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn valid_request() -> CreateTripRequest {
        CreateTripRequest {
            name: "Summer in Spain".to_string(),
            description: "Two weeks around Andalusia".to_string(),
            start_date: date("2025-07-01"),
            end_date: date("2025-07-14"),
            country_id: 1,
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_create(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_empty_name_and_description() {
        let mut req = valid_request();
        req.name = "  ".to_string();
        match validate_create(&req) {
            Err(ServiceError::Validation { code, .. }) => assert_eq!(code, "NAME_EMPTY"),
            other => panic!("expected validation error, got {:?}", other),
        }

        let mut req = valid_request();
        req.description = String::new();
        match validate_create(&req) {
            Err(ServiceError::Validation { code, .. }) => assert_eq!(code, "DESCRIPTION_EMPTY"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut req = valid_request();
        req.start_date = date("2025-07-20");
        match validate_create(&req) {
            Err(ServiceError::Validation { code, .. }) => assert_eq!(code, "START_DATE_INVALID"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn single_day_trip_is_valid() {
        let mut req = valid_request();
        req.end_date = req.start_date;
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn filter_clamps_limit_and_offset() {
        let filter = TripFilter {
            start_date: None,
            end_date: None,
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(filter.limit(), 100);
        assert_eq!(filter.offset(), 0);

        let filter = TripFilter {
            start_date: None,
            end_date: None,
            limit: None,
            offset: None,
        };
        assert_eq!(filter.limit(), 50);
        assert_eq!(filter.offset(), 0);
    }
}
