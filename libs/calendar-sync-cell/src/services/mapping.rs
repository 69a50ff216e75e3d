// libs/calendar-sync-cell/src/services/mapping.rs
use chrono::{Duration, NaiveDate};

use shared_utils::time::parse_clock_time;

use crate::models::{
    ActivitySyncRecord, AppointmentSyncRecord, CalendarEvent, CalendarSyncError, EventAttendee,
    EventDateTime,
};

/// Local wall-clock time on `date`, tagged with the configured timezone.
/// An end of `24:00` rolls over to midnight of the next day.
pub fn event_date_time(date: NaiveDate, time: &str, timezone: &str) -> Result<EventDateTime, CalendarSyncError> {
    let minutes = parse_clock_time(time)
        .map_err(|e| CalendarSyncError::InvalidRecord(format!("{} ({})", e, time)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CalendarSyncError::InvalidRecord(format!("invalid date {}", date)))?;
    let local = midnight + Duration::minutes(minutes as i64);

    Ok(EventDateTime {
        date_time: local.format("%Y-%m-%dT%H:%M:%S").to_string(),
        time_zone: timezone.to_string(),
    })
}

fn join_lines(lines: Vec<String>) -> Option<String> {
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn labelled(label: &str, value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => format!("{}: {}", label, v),
        _ => String::new(),
    }
}

pub fn appointment_event(record: &AppointmentSyncRecord, timezone: &str) -> Result<CalendarEvent, CalendarSyncError> {
    let client = record.client.clone().unwrap_or_default();
    let service_name = record.service.as_ref().map(|s| s.name.as_str());

    let summary = match (service_name, client.name.trim()) {
        (Some(service), "") => service.to_string(),
        (Some(service), name) => format!("{} - {}", service, name),
        (None, "") => "Appointment".to_string(),
        (None, name) => format!("Appointment - {}", name),
    };

    let description = join_lines(vec![
        labelled("Client", Some(client.name.as_str())),
        labelled("Phone", client.phone.as_deref()),
        labelled("Email", client.email.as_deref()),
        labelled("Service", service_name),
        labelled("Notes", record.notes.as_deref()),
    ]);

    let attendees = client
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(|email| EventAttendee {
            email: email.to_string(),
            display_name: Some(client.name.clone()).filter(|n| !n.trim().is_empty()),
        })
        .into_iter()
        .collect();

    Ok(CalendarEvent {
        summary,
        description,
        start: event_date_time(record.date, &record.start_time, timezone)?,
        end: event_date_time(record.date, &record.end_time, timezone)?,
        attendees,
    })
}

pub fn activity_event(record: &ActivitySyncRecord, timezone: &str) -> Result<CalendarEvent, CalendarSyncError> {
    let confirmed: Vec<_> = record
        .participants
        .iter()
        .filter(|p| p.enrollment_status == "confirmed")
        .filter_map(|p| p.client.as_ref())
        .collect();

    let names: Vec<&str> = confirmed
        .iter()
        .map(|c| c.name.trim())
        .filter(|n| !n.is_empty())
        .collect();
    let participants_line = if names.is_empty() {
        String::new()
    } else {
        format!("Participants: {}", names.join(", "))
    };

    let description = join_lines(vec![
        record.description.clone().unwrap_or_default(),
        participants_line,
        format!("Capacity: {}/{}", confirmed.len(), record.max_participants),
    ]);

    let attendees = confirmed
        .iter()
        .filter_map(|c| {
            let email = c.email.as_deref()?.trim();
            if email.is_empty() {
                return None;
            }
            Some(EventAttendee {
                email: email.to_string(),
                display_name: Some(c.name.clone()).filter(|n| !n.trim().is_empty()),
            })
        })
        .collect();

    Ok(CalendarEvent {
        summary: record.title.clone(),
        description,
        start: event_date_time(record.date, &record.start_time, timezone)?,
        end: event_date_time(record.date, &record.end_time, timezone)?,
        attendees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactInfo, ParticipantContact, ServiceInfo};
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn appointment(client: ContactInfo, notes: Option<&str>) -> AppointmentSyncRecord {
        AppointmentSyncRecord {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            date: date(),
            start_time: "10:00:00".to_string(),
            end_time: "10:30:00".to_string(),
            status: "confirmed".to_string(),
            notes: notes.map(str::to_string),
            external_calendar_event_id: None,
            client: Some(client),
            service: Some(ServiceInfo { name: "Physiotherapy".to_string() }),
        }
    }

    #[test]
    fn times_are_local_with_fixed_zone() {
        let dt = event_date_time(date(), "09:05", "Europe/Madrid").unwrap();
        assert_eq!(dt.date_time, "2024-03-04T09:05:00");
        assert_eq!(dt.time_zone, "Europe/Madrid");

        let midnight = event_date_time(date(), "24:00", "Europe/Madrid").unwrap();
        assert_eq!(midnight.date_time, "2024-03-05T00:00:00");
    }

    #[test]
    fn appointment_without_email_has_no_attendees() {
        let client = ContactInfo {
            name: "Ana Ruiz".to_string(),
            phone: Some("+34 612345678".to_string()),
            email: None,
        };
        let event = appointment_event(&appointment(client, None), "Europe/Madrid").unwrap();

        assert_eq!(event.summary, "Physiotherapy - Ana Ruiz");
        assert!(event.attendees.is_empty());
        assert_eq!(
            event.description.as_deref(),
            Some("Client: Ana Ruiz\nPhone: +34 612345678\nService: Physiotherapy")
        );
    }

    #[test]
    fn appointment_with_email_invites_client() {
        let client = ContactInfo {
            name: "Ana Ruiz".to_string(),
            phone: None,
            email: Some("ana@example.com".to_string()),
        };
        let event = appointment_event(&appointment(client, Some("  First visit ")), "UTC").unwrap();

        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.attendees[0].email, "ana@example.com");
        assert!(event.description.unwrap().ends_with("Notes: First visit"));
        assert_eq!(event.end.date_time, "2024-03-04T10:30:00");
    }

    #[test]
    fn activity_lists_confirmed_participants_only() {
        let participant = |name: &str, email: Option<&str>, status: &str| ParticipantContact {
            enrollment_status: status.to_string(),
            client: Some(ContactInfo {
                name: name.to_string(),
                phone: None,
                email: email.map(str::to_string),
            }),
        };
        let record = ActivitySyncRecord {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            title: "Pilates".to_string(),
            description: None,
            date: date(),
            start_time: "18:00".to_string(),
            end_time: "19:00".to_string(),
            max_participants: 8,
            external_calendar_event_id: None,
            participants: vec![
                participant("Eva", Some("eva@example.com"), "confirmed"),
                participant("Luis", None, "confirmed"),
                participant("Marta", Some("marta@example.com"), "waiting_list"),
            ],
        };

        let event = activity_event(&record, "Europe/Madrid").unwrap();
        assert_eq!(event.summary, "Pilates");
        assert_eq!(event.description.as_deref(), Some("Participants: Eva, Luis\nCapacity: 2/8"));
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.attendees[0].email, "eva@example.com");
    }
}
