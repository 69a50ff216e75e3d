// libs/appointment-cell/tests/booking_test.rs
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::{extract::{Query, State}, http::StatusCode, Json};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::Authorization;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::handlers::{book_appointment, lookup_client};
use appointment_cell::models::*;
use appointment_cell::services::conflict::occupies;
use appointment_cell::services::{AppointmentBookingService, AppointmentStore};
use schedule_cell::models::{BookedRange, DayInterval, MinuteRange};
use schedule_cell::services::calculate_slots;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TEST_TOKEN};
use shared_utils::time::parse_clock_time;

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Serializes check-and-insert behind one lock, as the database function does
/// with its advisory lock.
#[derive(Default)]
struct InMemoryStore {
    rows: Mutex<Vec<Appointment>>,
}

impl InMemoryStore {
    async fn seed(&self, professional_id: Uuid, date: NaiveDate, start: &str, end: &str) {
        let mut rows = self.rows.lock().await;
        rows.push(row(professional_id, date, start, end, AppointmentStatus::Confirmed));
    }

    async fn confirmed_for(&self, professional_id: Uuid, date: NaiveDate) -> Vec<Appointment> {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|a| a.professional_id == professional_id && a.date == date && a.status.occupies_time())
            .cloned()
            .collect()
    }
}

fn row(professional_id: Uuid, date: NaiveDate, start: &str, end: &str, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        client_id: None,
        service_id: None,
        date,
        start_time: start.to_string(),
        end_time: end.to_string(),
        duration_minutes: (parse_clock_time(end).unwrap() - parse_clock_time(start).unwrap()) as i32,
        status,
        notes: None,
        external_calendar_event_id: None,
        synced_with_google: false,
        last_synced_at: None,
        is_group_activity: false,
        group_activity_id: None,
        created_at: None,
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert_if_free(&self, candidate: &NewAppointment, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().await;
        let buffer = candidate.buffer_minutes as u32;
        let start = parse_clock_time(&candidate.start_time)?.saturating_sub(buffer);
        let end = parse_clock_time(&candidate.end_time)? + buffer;

        // Give the other task a chance to run while the lock is held.
        tokio::task::yield_now().await;

        if rows.iter().any(|a| {
            a.professional_id == candidate.professional_id && a.date == candidate.date && occupies(a, start, end)
        }) {
            return Err(AppointmentError::SlotConflict);
        }

        let mut created = row(
            candidate.professional_id,
            candidate.date,
            &candidate.start_time,
            &candidate.end_time,
            AppointmentStatus::Confirmed,
        );
        created.client_id = candidate.client_id;
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_id: Option<Uuid>,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let start = parse_clock_time(start_time)?;
        let end = parse_clock_time(end_time)?;
        Ok(self.rows
            .lock()
            .await
            .iter()
            .filter(|a| a.professional_id == professional_id && a.date == date)
            .filter(|a| Some(a.id) != exclude_id && occupies(a, start, end))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid, _auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.rows.lock().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list_for_day(&self, professional_id: Uuid, date: NaiveDate, _auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.rows
            .lock()
            .await
            .iter()
            .filter(|a| a.professional_id == professional_id && a.date == date)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus, _auth_token: &str) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.lock().await;
        let appointment = rows.iter_mut().find(|a| a.id == id).ok_or(AppointmentError::NotFound(id))?;
        appointment.status = status;
        Ok(appointment.clone())
    }
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

/// Config pointed at the mock server with calendar sync switched off.
fn offline_config(uri: &str) -> Arc<AppConfig> {
    let mut config = TestConfig::with_mock_server(uri).to_app_config();
    config.google_client_id.clear();
    Arc::new(config)
}

/// Monday 2024-01-08: 09:00-17:00 with a 13:00-14:00 lunch break and no
/// exception for the date.
async fn mount_working_day(server: &MockServer, buffer_minutes: i32) {
    let interval_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/work_intervals"))
        .and(query_param("specific_date", "eq.2024-01-08"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/work_intervals"))
        .and(query_param("day_of_week", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_interval(interval_id, Uuid::new_v4(), 1, "09:00:00", "17:00:00", buffer_minutes)
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/interval_breaks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::break_interval(interval_id, "Lunch", "13:00:00", "14:00:00")
        ])))
        .mount(server)
        .await;
}

async fn mount_no_bookings(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn mount_existing_client(server: &MockServer, client_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::client(client_id, "Ana Ruiz", "+34612345678", None)
        ])))
        .mount(server)
        .await;
}

fn request(professional_id: Uuid, start: &str, end: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        professional_id,
        client_name: "Ana Ruiz".to_string(),
        client_phone: "612 345 678".to_string(),
        client_email: None,
        date: monday(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        service_id: None,
        notes: None,
    }
}

// ==============================================================================
// CONCURRENCY
// ==============================================================================

#[tokio::test]
async fn simultaneous_requests_for_one_slot_admit_exactly_one() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone());
    let professional_id = Uuid::new_v4();

    let (first, second) = tokio::join!(
        service.book_appointment(request(professional_id, "10:00", "10:30"), TEST_TOKEN),
        service.book_appointment(request(professional_id, "10:00", "10:30"), TEST_TOKEN),
    );

    let outcomes = [first, second];
    let admitted: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let rejected: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(admitted.len(), 1);
    assert_eq!(admitted[0].status, AppointmentStatus::Confirmed);
    assert_eq!(rejected.len(), 1);
    assert_matches!(rejected[0], AppointmentError::SlotConflict);
    assert_eq!(store.confirmed_for(professional_id, monday()).await.len(), 1);
}

#[tokio::test]
async fn concurrent_overlapping_bookings_never_overlap() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let service = Arc::new(AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone()));
    let professional_id = Uuid::new_v4();

    let ranges = [
        ("09:00", "10:00"), ("09:30", "10:30"), ("10:00", "11:00"), ("09:45", "10:15"),
        ("10:30", "11:30"), ("11:00", "11:45"), ("11:15", "12:00"), ("09:00", "12:00"),
        ("11:45", "12:30"), ("12:00", "12:30"),
    ];

    let attempts = ranges.iter().map(|(start, end)| {
        let service = Arc::clone(&service);
        let request = request(professional_id, start, end);
        async move { service.book_appointment(request, TEST_TOKEN).await }
    });
    let results = futures::future::join_all(attempts).await;

    for result in &results {
        if let Err(e) = result {
            assert_matches!(e, AppointmentError::SlotConflict);
        }
    }

    let confirmed = store.confirmed_for(professional_id, monday()).await;
    assert!(!confirmed.is_empty());
    for (i, a) in confirmed.iter().enumerate() {
        let (a_start, a_end) = a.minutes().unwrap();
        for b in confirmed.iter().skip(i + 1) {
            let (b_start, b_end) = b.minutes().unwrap();
            assert!(a_end <= b_start || b_end <= a_start,
                    "{}-{} overlaps {}-{}", a.start_time, a.end_time, b.start_time, b.end_time);
        }
    }
}

#[tokio::test]
async fn every_computed_slot_can_be_booked() {
    let server = MockServer::start().await;
    mount_working_day(&server, 10).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let professional_id = Uuid::new_v4();
    let existing = [("10:00", "10:30"), ("15:15", "16:00")];
    let booked: Vec<BookedRange> = existing
        .iter()
        .map(|(start, end)| BookedRange {
            start: parse_clock_time(start).unwrap(),
            end: parse_clock_time(end).unwrap(),
        })
        .collect();
    let day = vec![DayInterval {
        interval_id: Uuid::new_v4(),
        range: MinuteRange::new(540, 1020),
        buffer_minutes: 10,
        breaks: vec![MinuteRange::new(780, 840)],
    }];
    let slots = calculate_slots(&day, &booked, 30).unwrap();
    assert!(!slots.is_empty());

    // Each slot is offered against the same day, so each is booked on its own copy of it.
    for slot in &slots {
        let store = Arc::new(InMemoryStore::default());
        for (start, end) in existing {
            store.seed(professional_id, monday(), start, end).await;
        }
        let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store);
        let result = service
            .book_appointment(request(professional_id, &slot.start_time, &slot.end_time), TEST_TOKEN)
            .await;
        assert!(result.is_ok(), "slot {} was rejected: {:?}", slot.start_time, result.err());
    }
}

// ==============================================================================
// SCHEDULE FIT
// ==============================================================================

#[tokio::test]
async fn booking_outside_working_hours_is_rejected() {
    let server = MockServer::start().await;
    mount_working_day(&server, 10).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone());
    let professional_id = Uuid::new_v4();

    for (start, end) in [("03:00", "03:30"), ("08:45", "09:15"), ("16:45", "17:15"), ("17:00", "17:30")] {
        assert_matches!(
            service.book_appointment(request(professional_id, start, end), TEST_TOKEN).await,
            Err(AppointmentError::OutsideSchedule(_)),
            "{}-{} was admitted", start, end
        );
    }
    assert!(store.confirmed_for(professional_id, monday()).await.is_empty());

    assert!(service.book_appointment(request(professional_id, "16:30", "17:00"), TEST_TOKEN).await.is_ok());
}

#[tokio::test]
async fn booking_inside_a_break_is_rejected() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone());
    let professional_id = Uuid::new_v4();

    for (start, end) in [("13:15", "13:45"), ("12:45", "13:15"), ("13:45", "14:15"), ("12:00", "15:00")] {
        assert_matches!(
            service.book_appointment(request(professional_id, start, end), TEST_TOKEN).await,
            Err(AppointmentError::OutsideSchedule(_)),
            "{}-{} was admitted", start, end
        );
    }

    assert!(service.book_appointment(request(professional_id, "12:30", "13:00"), TEST_TOKEN).await.is_ok());
    assert!(service.book_appointment(request(professional_id, "14:00", "14:30"), TEST_TOKEN).await.is_ok());
}

#[tokio::test]
async fn booking_inside_the_buffer_of_another_is_a_conflict() {
    let server = MockServer::start().await;
    mount_working_day(&server, 10).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let professional_id = Uuid::new_v4();
    store.seed(professional_id, monday(), "10:00", "10:30").await;
    let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone());

    for (start, end) in [("10:30", "11:00"), ("09:30", "10:00"), ("10:35", "11:05")] {
        assert_matches!(
            service.book_appointment(request(professional_id, start, end), TEST_TOKEN).await,
            Err(AppointmentError::SlotConflict),
            "{}-{} was admitted", start, end
        );
    }

    let clear = service.book_appointment(request(professional_id, "10:40", "11:10"), TEST_TOKEN).await;
    assert!(clear.is_ok());
    assert_eq!(store.confirmed_for(professional_id, monday()).await.len(), 2);
}

#[tokio::test]
async fn day_without_working_intervals_accepts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/work_intervals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_existing_client(&server, Uuid::new_v4()).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_if_free"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_no_bookings(&server).await;

    let service = AppointmentBookingService::new(offline_config(&server.uri()));
    let result = service.book_appointment(request(Uuid::new_v4(), "10:00", "10:30"), TEST_TOKEN).await;

    assert_matches!(result, Err(AppointmentError::OutsideSchedule(_)));
}

// ==============================================================================
// BOOKING FLOW AGAINST THE STORE
// ==============================================================================

#[tokio::test]
async fn new_client_is_created_then_appointment_admitted() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    mount_working_day(&server, 10).await;
    mount_no_bookings(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("phone", "in.(+34612345678,34612345678,612345678,0034612345678)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/clients"))
        .and(body_partial_json(json!({ "name": "Ana Ruiz", "phone": "+34612345678" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::client(client_id, "Ana Ruiz", "+34612345678", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_if_free"))
        .and(body_partial_json(json!({
            "p_professional_id": professional_id,
            "p_client_id": client_id,
            "p_date": "2024-01-08",
            "p_start_time": "10:00",
            "p_end_time": "10:30",
            "p_duration_minutes": 30,
            "p_buffer_minutes": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::appointment(
            appointment_id, professional_id, client_id, "2024-01-08", "10:00:00", "10:30:00", "confirmed", None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(offline_config(&server.uri()));
    let appointment = service
        .book_appointment(request(professional_id, "10:00:00", "10:30"), TEST_TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.id, appointment_id);
    assert_eq!(appointment.client_id, Some(client_id));
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn exclusion_violation_is_reported_as_slot_conflict() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_no_bookings(&server).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_if_free"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint \"appointments_no_overlap\"",
            "23P01",
        )))
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(offline_config(&server.uri()));
    let result = service.book_appointment(request(Uuid::new_v4(), "10:00", "10:30"), TEST_TOKEN).await;

    assert_matches!(result, Err(AppointmentError::SlotConflict));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let service = AppointmentBookingService::new(offline_config(&server.uri()));
    let professional_id = Uuid::new_v4();

    let inverted = service.book_appointment(request(professional_id, "11:00", "10:30"), TEST_TOKEN).await;
    assert_matches!(inverted, Err(AppointmentError::Validation(_)));

    let mut bad_phone = request(professional_id, "10:00", "10:30");
    bad_phone.client_phone = "123".to_string();
    assert_matches!(
        service.book_appointment(bad_phone, TEST_TOKEN).await,
        Err(AppointmentError::Validation(_))
    );

    let mut no_name = request(professional_id, "10:00", "10:30");
    no_name.client_name = "  ".to_string();
    assert_matches!(
        service.book_appointment(no_name, TEST_TOKEN).await,
        Err(AppointmentError::Validation(_))
    );
}

#[tokio::test]
async fn cancelling_frees_the_slot() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let store = Arc::new(InMemoryStore::default());
    let service = AppointmentBookingService::with_store(offline_config(&server.uri()), store.clone());
    let professional_id = Uuid::new_v4();

    let first = service
        .book_appointment(request(professional_id, "10:00", "10:30"), TEST_TOKEN)
        .await
        .unwrap();
    assert_matches!(
        service.book_appointment(request(professional_id, "10:15", "10:45"), TEST_TOKEN).await,
        Err(AppointmentError::SlotConflict)
    );

    let cancelled = service
        .update_status(first.id, AppointmentStatus::Cancelled, TEST_TOKEN)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let rebooked = service
        .book_appointment(request(professional_id, "10:15", "10:45"), TEST_TOKEN)
        .await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn booking_succeeds_while_calendar_is_unreachable() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    // Calendar sync enabled, but every store read behind it is slow.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryStore::default());
    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let service = AppointmentBookingService::with_store(config, store);

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        service.book_appointment(request(Uuid::new_v4(), "10:00", "10:30"), TEST_TOKEN),
    )
    .await
    .expect("booking must not wait for calendar sync");

    assert!(result.is_ok());
}

#[tokio::test]
async fn advisory_check_lists_overlapping_appointments() {
    let store = Arc::new(InMemoryStore::default());
    let professional_id = Uuid::new_v4();
    store.seed(professional_id, monday(), "10:00", "10:30").await;
    store.seed(professional_id, monday(), "11:00", "11:30").await;

    let service = AppointmentBookingService::with_store(offline_config("http://127.0.0.1:9"), store);
    let conflicts = service
        .guard()
        .check(professional_id, monday(), "10:15", "11:15", None, TEST_TOKEN)
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 2);

    let free = service
        .guard()
        .check(professional_id, monday(), "10:30", "11:00", None, TEST_TOKEN)
        .await
        .unwrap();
    assert!(free.is_empty());
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[tokio::test]
async fn booking_handler_maps_conflict_to_409() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_no_bookings(&server).await;
    mount_existing_client(&server, Uuid::new_v4()).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_if_free"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "Slot already booked", "23P01",
        )))
        .mount(&server)
        .await;

    let auth = TypedHeader(Authorization::bearer(TEST_TOKEN).unwrap());
    let result = book_appointment(
        State(offline_config(&server.uri())),
        auth,
        Json(request(Uuid::new_v4(), "10:00", "10:30")),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn booking_handler_maps_off_hours_to_400() {
    let server = MockServer::start().await;
    mount_working_day(&server, 0).await;
    mount_no_bookings(&server).await;
    mount_existing_client(&server, Uuid::new_v4()).await;

    let auth = TypedHeader(Authorization::bearer(TEST_TOKEN).unwrap());
    let result = book_appointment(
        State(offline_config(&server.uri())),
        auth,
        Json(request(Uuid::new_v4(), "03:00", "03:30")),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn booking_handler_returns_created_appointment() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    mount_working_day(&server, 0).await;
    mount_no_bookings(&server).await;
    mount_existing_client(&server, client_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_if_free"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::appointment(
            Uuid::new_v4(), professional_id, client_id, "2024-01-08", "10:00:00", "10:30:00", "confirmed", None,
        )))
        .mount(&server)
        .await;

    let auth = TypedHeader(Authorization::bearer(TEST_TOKEN).unwrap());
    let (status, Json(body)) = book_appointment(
        State(offline_config(&server.uri())),
        auth,
        Json(request(professional_id, "10:00", "10:30")),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["client_id"], json!(client_id));
}

#[tokio::test]
async fn client_lookup_accepts_any_spelling_of_the_number() {
    let server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    mount_existing_client(&server, client_id).await;

    let auth = TypedHeader(Authorization::bearer(TEST_TOKEN).unwrap());
    let query = ClientLookupQuery { phone: "0034 612-345-678".to_string() };
    let Json(body) = lookup_client(State(offline_config(&server.uri())), auth, Query(query))
        .await
        .unwrap();

    assert_eq!(body["phone"], "+34612345678");
    assert_eq!(body["client"]["id"], json!(client_id));
}
