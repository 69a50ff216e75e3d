// libs/group-activity-cell/src/services/capacity.rs
use crate::models::{EnrollmentStatus, Participant, ParticipantStats};

impl ParticipantStats {
    pub fn from_participants(participants: &[Participant], max_participants: i32) -> Self {
        let max_participants = max_participants.max(0) as u32;
        let mut stats = ParticipantStats { max_participants, ..Default::default() };

        for participant in participants {
            match participant.enrollment_status {
                EnrollmentStatus::Confirmed => stats.confirmed += 1,
                EnrollmentStatus::Pending => stats.pending += 1,
                EnrollmentStatus::WaitingList => stats.waiting_list += 1,
                EnrollmentStatus::Cancelled => continue,
            }
            stats.total_active += 1;
        }

        stats.available_spots = max_participants.saturating_sub(stats.confirmed);
        stats
    }

    pub fn is_full(&self) -> bool {
        self.confirmed >= self.max_participants
    }
}

/// Status for the next participant. The cap is soft: once confirmed seats run
/// out, newcomers go to the waiting list instead of being turned away.
pub fn decide_enrollment_status(stats: &ParticipantStats) -> EnrollmentStatus {
    if stats.is_full() {
        EnrollmentStatus::WaitingList
    } else {
        EnrollmentStatus::Confirmed
    }
}
