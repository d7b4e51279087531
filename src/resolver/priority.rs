//! Priority scoring for conflict resolution order: a 0-100 composite of
//! severity, blast radius, cascade estimate, historical difficulty, and
//! age.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PriorityBands;
use crate::types::{Conflict, ConflictType, Severity};

/// Banded priority derived from the numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

/// Band a score against configured cut-offs
pub fn level_for(score: u8, bands: &PriorityBands) -> PriorityLevel {
    if score >= bands.critical {
        PriorityLevel::Critical
    } else if score >= bands.high {
        PriorityLevel::High
    } else if score >= bands.medium {
        PriorityLevel::Medium
    } else if score >= bands.low {
        PriorityLevel::Low
    } else {
        PriorityLevel::Minimal
    }
}

/// Band a score against the default cut-offs (90/70/40/20)
pub fn level_of(score: u8) -> PriorityLevel {
    level_for(score, &PriorityBands::default())
}

fn severity_component(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 50,
        Severity::High => 40,
        Severity::Medium => 25,
        Severity::Low => 10,
        Severity::Info => 0,
    }
}

fn affected_component(affected: usize) -> u32 {
    match affected {
        n if n >= 10 => 25,
        n if n >= 5 => 20,
        n if n >= 3 => 15,
        n if n >= 1 => 10,
        _ => 0,
    }
}

/// Conflicts sharing an affected entity are likely to shift when this
/// one is edited.
fn cascade_component(conflict: &Conflict, all: &[Conflict]) -> u32 {
    let downstream = all
        .iter()
        .filter(|other| other.id != conflict.id && shares_entity(conflict, other))
        .count() as u32;
    (5 * downstream).min(25)
}

fn shares_entity(a: &Conflict, b: &Conflict) -> bool {
    a.teachers.iter().any(|t| b.teachers.contains(t))
        || a.rooms.iter().any(|r| b.rooms.contains(r))
        || a.students.iter().any(|s| b.students.contains(s))
        || a.sections.iter().any(|s| b.sections.contains(s))
        || a.slots.iter().any(|s| b.slots.contains(s))
}

/// How stubborn this conflict type has proven historically
fn difficulty_component(kind: ConflictType) -> u32 {
    match kind {
        ConflictType::StudentOverlap => 15,
        ConflictType::TeacherOverlap => 12,
        ConflictType::RoomOverlap => 10,
        ConflictType::ExcessiveTeachingHours => 10,
        ConflictType::NoPrepPeriod => 8,
        ConflictType::SubjectMismatch => 8,
        ConflictType::RoomCapacity => 8,
        ConflictType::NoLunchBreak => 6,
        ConflictType::SectionOverEnrolled => 6,
        ConflictType::TeacherTravel => 3,
        ConflictType::RoomTypeMismatch => 3,
        ConflictType::EquipmentUnavailable => 3,
        ConflictType::SectionUnderEnrolled => 2,
    }
}

fn age_component(conflict: &Conflict, now: DateTime<Utc>) -> u32 {
    let age_days = (now - conflict.detected_at).num_days();
    match age_days {
        d if d <= 0 => 10,
        1 => 8,
        2..=3 => 6,
        4..=7 => 4,
        8..=14 => 2,
        _ => 0,
    }
}

/// Composite priority, clamped to 0..=100
pub fn priority_score(conflict: &Conflict, all: &[Conflict], now: DateTime<Utc>) -> u8 {
    let total = severity_component(conflict.severity)
        + affected_component(conflict.affected_count())
        + cascade_component(conflict, all)
        + difficulty_component(conflict.kind)
        + age_component(conflict, now);
    total.min(100) as u8
}
