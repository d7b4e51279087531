//! Capability records consumed by the engine. Hosts hand these to the
//! constructors instead of wiring up any ambient container.

use chrono::{DateTime, Utc};

use crate::types::{
    CompletedCourse, Course, CourseId, CourseSection, PrerequisiteGroup, Room, Student, StudentId,
    Teacher,
};

/// Read-only source of truth for SIS records. Implementations may do
/// I/O; the engine reads everything up front into a `Snapshot`.
pub trait DataSource {
    fn students(&self) -> Vec<Student>;
    fn teachers(&self) -> Vec<Teacher>;
    fn courses(&self) -> Vec<Course>;
    fn rooms(&self) -> Vec<Room>;
    fn history(&self, student: &StudentId) -> Vec<CompletedCourse>;
    fn prerequisites(&self, course: &CourseId) -> Vec<PrerequisiteGroup>;
    fn sections(&self, course: &CourseId) -> Vec<CourseSection>;
}

/// Wall-clock capability
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned time for tests and reproducible runs
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
