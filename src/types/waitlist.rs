use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::{CourseId, StudentId};

/// Waitlist entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitlistStatus {
    Active,
    Enrolled,
    Bypassed,
}

/// One queued student for a course whose sections are full.
/// Within a course's ACTIVE entries, positions are dense and strictly
/// increasing from 1; promotion picks the highest priority weight with
/// FIFO tie-break on `added_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub position: u32,
    #[serde(default = "default_priority")]
    pub priority_weight: u32,
    pub status: WaitlistStatus,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_priority() -> u32 {
    1
}

impl WaitlistEntry {
    pub fn is_active(&self) -> bool {
        self.status == WaitlistStatus::Active
    }
}
