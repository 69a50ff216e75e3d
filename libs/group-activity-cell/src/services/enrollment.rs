// libs/group-activity-cell/src/services/enrollment.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{GroupActivityError, Participant};

/// Database function that locks the activity row, counts confirmed seats and
/// writes the enrollment in one transaction.
pub const ENROLL_IF_ROOM_FUNCTION: &str = "enroll_participant_if_room";

/// Persistence seam for enrollments. `enroll_if_room` must count the confirmed
/// seats and write the new enrollment as one atomic step: concurrent calls for
/// the same activity must never confirm more participants than it has seats.
/// A cancelled enrollment of the same client is reactivated rather than
/// duplicated.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn enroll_if_room(&self, activity_id: Uuid, client_id: Uuid, auth_token: &str) -> Result<Participant, GroupActivityError>;
}

pub struct SupabaseEnrollmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseEnrollmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl EnrollmentStore for SupabaseEnrollmentStore {
    async fn enroll_if_room(&self, activity_id: Uuid, client_id: Uuid, auth_token: &str) -> Result<Participant, GroupActivityError> {
        debug!("Enrolling client {} in activity {}", client_id, activity_id);

        let args = json!({
            "p_activity_id": activity_id,
            "p_client_id": client_id
        });

        match self.supabase.rpc::<Participant>(ENROLL_IF_ROOM_FUNCTION, Some(auth_token), args).await {
            Ok(participant) => Ok(participant),
            Err(e) if e.is_conflict() => {
                warn!("Client {} already holds an active enrollment in {}", client_id, activity_id);
                Err(GroupActivityError::AlreadyEnrolled(client_id))
            }
            Err(SupabaseError::NotFound(_)) => {
                Err(GroupActivityError::NotFound(format!("group activity {}", activity_id)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
