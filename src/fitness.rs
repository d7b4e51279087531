//! Fitness scoring: weighted conflict penalties against a 10000-point
//! base, plus utilisation/balance bonuses. A pure function of the state
//! snapshot and configured weights.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::state::ScheduleState;
use crate::types::{Conflict, ConflictStatus, ConflictType, RoomId, Severity, TeacherId};

pub const BASE_SCORE: f64 = 10000.0;
const MAX_BONUS: f64 = 50.0;

/// Aggregate penalty and count for one conflict type
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TypeBreakdown {
    pub penalty: f64,
    pub count: usize,
}

/// Full scoring breakdown so callers can target hot spots
#[derive(Debug, Clone, Serialize)]
pub struct FitnessReport {
    pub total: f64,
    pub hard_penalty: f64,
    pub soft_penalty: f64,
    pub room_balance_bonus: f64,
    pub teacher_balance_bonus: f64,
    pub by_type: BTreeMap<ConflictType, TypeBreakdown>,
}

impl FitnessReport {
    pub fn bonuses(&self) -> f64 {
        self.room_balance_bonus + self.teacher_balance_bonus
    }
}

fn base_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 1000.0,
        Severity::High => 100.0,
        Severity::Medium => 10.0,
        Severity::Low => 1.0,
        Severity::Info => 0.0,
    }
}

fn penalty_of(conflict: &Conflict, config: &Config) -> f64 {
    let weight = config.weight_of(conflict.kind) as f64 / 100.0;
    let affected = conflict.affected_count();
    let spread = if affected <= 1 {
        1.0
    } else {
        ((affected + 1) as f64).ln()
    };
    base_penalty(conflict.severity) * weight * spread
}

/// Population standard deviation of usage counts
fn std_dev(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    let variance = counts
        .iter()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt()
}

fn room_balance_bonus(state: &ScheduleState) -> f64 {
    let mut usage: BTreeMap<&RoomId, usize> = BTreeMap::new();
    for slot in state.slots() {
        if let Some(room) = &slot.room_id {
            *usage.entry(room).or_insert(0) += 1;
        }
    }
    if usage.is_empty() {
        return 0.0;
    }
    let counts: Vec<usize> = usage.into_values().collect();
    MAX_BONUS / (1.0 + std_dev(&counts))
}

fn teacher_balance_bonus(state: &ScheduleState) -> f64 {
    let mut load: BTreeMap<&TeacherId, usize> = BTreeMap::new();
    for slot in state.slots() {
        for teacher in slot.teachers() {
            *load.entry(teacher).or_insert(0) += 1;
        }
    }
    if load.is_empty() {
        return 0.0;
    }
    let counts: Vec<usize> = load.into_values().collect();
    MAX_BONUS / (1.0 + std_dev(&counts))
}

/// Score a state against its active conflicts.
/// `score = max(0, 10000 - Σ penalty + Σ bonus)`
pub fn evaluate(conflicts: &[Conflict], state: &ScheduleState, config: &Config) -> FitnessReport {
    let mut hard_penalty = 0.0;
    let mut soft_penalty = 0.0;
    let mut by_type: BTreeMap<ConflictType, TypeBreakdown> = BTreeMap::new();

    for conflict in conflicts {
        if conflict.status != ConflictStatus::Active {
            continue;
        }
        let penalty = penalty_of(conflict, config);
        if conflict.severity.is_hard() {
            hard_penalty += penalty;
        } else {
            soft_penalty += penalty;
        }
        let entry = by_type.entry(conflict.kind).or_default();
        entry.penalty += penalty;
        entry.count += 1;
    }

    let room_bonus = room_balance_bonus(state);
    let teacher_bonus = teacher_balance_bonus(state);

    let total =
        (BASE_SCORE - hard_penalty - soft_penalty + room_bonus + teacher_bonus).max(0.0);

    FitnessReport {
        total,
        hard_penalty,
        soft_penalty,
        room_balance_bonus: room_bonus,
        teacher_balance_bonus: teacher_bonus,
        by_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{DayOfWeek, TimeOfDay, TimeRange};
    use crate::types::{CourseId, SlotSpec, StudentId};
    use chrono::{TimeZone, Utc};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 7, 0, 0).unwrap()
    }

    fn conflict(kind: ConflictType) -> Conflict {
        Conflict::new(kind, "test", now())
    }

    #[test]
    fn test_empty_schedule_scores_base() {
        let report = evaluate(&[], &ScheduleState::new(), &Config::default());
        assert_eq!(report.total, BASE_SCORE);
        assert_eq!(report.hard_penalty, 0.0);
        assert_eq!(report.bonuses(), 0.0);
    }

    #[test]
    fn test_critical_conflict_penalty() {
        let c = conflict(ConflictType::TeacherOverlap);
        let report = evaluate(&[c], &ScheduleState::new(), &Config::default());

        assert_eq!(report.hard_penalty, 1000.0);
        assert_eq!(report.total, BASE_SCORE - 1000.0);
        assert_eq!(report.by_type[&ConflictType::TeacherOverlap].count, 1);
    }

    #[test]
    fn test_spread_factor_scales_with_affected() {
        let mut c = conflict(ConflictType::TeacherOverlap);
        c.students = (0..3)
            .map(|i| StudentId(format!("s{i}")))
            .collect();

        let report = evaluate(&[c], &ScheduleState::new(), &Config::default());
        let expected = 1000.0 * (4.0f64).ln();
        assert!((report.hard_penalty - expected).abs() < 1e-9);
    }

    #[test]
    fn test_weight_scales_penalty() {
        let mut config = Config::default();
        config
            .constraint_weights
            .insert(ConflictType::TeacherOverlap, 50);

        let c = conflict(ConflictType::TeacherOverlap);
        let report = evaluate(&[c], &ScheduleState::new(), &config);
        assert_eq!(report.hard_penalty, 500.0);
    }

    #[test]
    fn test_resolved_conflicts_do_not_count() {
        let mut c = conflict(ConflictType::TeacherOverlap);
        c.status = ConflictStatus::Resolved;
        let report = evaluate(&[c], &ScheduleState::new(), &Config::default());
        assert_eq!(report.total, BASE_SCORE);
    }

    #[test]
    fn test_uniform_usage_earns_maximum_bonus() {
        let mut state = ScheduleState::new();
        let time = TimeRange::new(
            TimeOfDay::new(9, 0).unwrap(),
            TimeOfDay::new(9, 50).unwrap(),
        )
        .unwrap();
        for (i, room) in ["101", "102"].iter().enumerate() {
            let mut spec = SlotSpec::new(
                CourseId(format!("c{i}")),
                DayOfWeek::Monday,
                2,
                time,
            );
            spec.room_id = Some(crate::types::RoomId(room.to_string()));
            state.add_slot(spec);
        }

        let report = evaluate(&[], &state, &Config::default());
        // Both rooms used once: sigma = 0, so the bonus is the defined max
        assert_eq!(report.room_balance_bonus, 50.0);
        assert_eq!(report.total, BASE_SCORE + 50.0);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let conflicts: Vec<Conflict> = (0..20)
            .map(|_| conflict(ConflictType::TeacherOverlap))
            .collect();
        let report = evaluate(&conflicts, &ScheduleState::new(), &Config::default());
        assert_eq!(report.total, 0.0);
    }
}
