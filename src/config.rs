//! Engine configuration: one value passed alongside the read model.
//! Every tunable the detector, resolver, selector, and placer consult
//! lives here; defaults are overridable from `config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::calendar::{PeriodGrid, TimeOfDay};
use crate::resolver::SuggestionKind;
use crate::types::{ConflictType, Subject};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Size of the daily period grid
    #[serde(default = "default_periods_per_day")]
    pub periods_per_day: u8,
    /// Teacher daily teaching ceiling
    #[serde(default = "default_max_periods_per_day")]
    pub max_periods_per_day: u8,
    /// Minimum free gap that counts as a prep period
    #[serde(default = "default_min_prep_minutes")]
    pub min_prep_minutes: u16,
    #[serde(default = "default_room_capacity")]
    pub room_default_capacity: u32,
    /// Window within which every student needs a lunch slot
    #[serde(default = "default_lunch_window")]
    pub lunch_window: (TimeOfDay, TimeOfDay),
    /// Back-to-back room-distance score at or above which travel is flagged
    #[serde(default = "default_travel_threshold")]
    pub teacher_travel_threshold: u8,
    /// Sections below this fill percentage are reported under-enrolled
    #[serde(default = "default_min_fill_percent")]
    pub section_min_fill_percent: u8,
    /// Grade ("8".."12") -> (core count, elective count)
    #[serde(default = "default_core_elective_counts")]
    pub core_elective_counts_by_grade: BTreeMap<String, (u8, u8)>,
    /// Grade -> subject -> preferred course names in order
    #[serde(default = "default_grade_course_patterns")]
    pub grade_course_patterns: BTreeMap<String, BTreeMap<Subject, Vec<String>>>,
    /// Completed course name -> follow-on course names in order
    #[serde(default = "default_course_sequences")]
    pub course_sequences: BTreeMap<String, Vec<String>>,
    /// Grade -> recommended elective category keywords
    #[serde(default = "default_elective_categories")]
    pub elective_categories_by_grade: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_pe_keywords")]
    pub pe_keywords: Vec<String>,
    #[serde(default = "default_medical_keywords")]
    pub medical_pe_restriction_keywords: Vec<String>,
    /// Per-type penalty weight in percent (absent = 100)
    #[serde(default)]
    pub constraint_weights: BTreeMap<ConflictType, u32>,
    /// Per-kind starting success rate in percent (absent = kind default)
    #[serde(default)]
    pub default_success_rates: BTreeMap<SuggestionKind, u32>,
    /// Minimum confidence (percent) for auto-applied suggestions
    #[serde(default = "default_confidence_threshold")]
    pub auto_apply_confidence_threshold: u32,
    /// Score cut-offs for the priority bands
    #[serde(default)]
    pub priority_bands: PriorityBands,
    /// Period order tried when placing singletons
    #[serde(default = "default_singleton_preference")]
    pub singleton_period_preference: Vec<u8>,
    #[serde(default = "default_balance_iterations")]
    pub balance_max_iterations: u32,
    #[serde(default = "default_graduation_credits")]
    pub required_graduation_credits: f64,
    /// Grade -> credits a student is expected to have earned plus enrolled
    #[serde(default = "default_expected_credits")]
    pub expected_credits_by_grade: BTreeMap<String, f64>,
}

fn default_periods_per_day() -> u8 {
    8
}

fn default_max_periods_per_day() -> u8 {
    6
}

fn default_min_prep_minutes() -> u16 {
    50
}

fn default_room_capacity() -> u32 {
    30
}

fn default_lunch_window() -> (TimeOfDay, TimeOfDay) {
    (
        TimeOfDay::new(11, 0).expect("valid lunch start"),
        TimeOfDay::new(13, 0).expect("valid lunch end"),
    )
}

fn default_travel_threshold() -> u8 {
    5
}

fn default_min_fill_percent() -> u8 {
    25
}

fn default_confidence_threshold() -> u32 {
    70
}

/// Minimum priority score for each band; anything below `low` is
/// minimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBands {
    pub critical: u8,
    pub high: u8,
    pub medium: u8,
    pub low: u8,
}

impl Default for PriorityBands {
    fn default() -> Self {
        Self {
            critical: 90,
            high: 70,
            medium: 40,
            low: 20,
        }
    }
}

fn default_singleton_preference() -> Vec<u8> {
    vec![3, 4, 5, 2, 6, 1, 7, 8]
}

fn default_balance_iterations() -> u32 {
    100
}

fn default_graduation_credits() -> f64 {
    24.0
}

fn default_core_elective_counts() -> BTreeMap<String, (u8, u8)> {
    [
        ("8", (4, 2)),
        ("9", (4, 3)),
        ("10", (4, 3)),
        ("11", (4, 3)),
        ("12", (3, 3)),
    ]
    .into_iter()
    .map(|(g, counts)| (g.to_string(), counts))
    .collect()
}

fn default_expected_credits() -> BTreeMap<String, f64> {
    [("9", 6.0), ("10", 12.0), ("11", 18.0), ("12", 24.0)]
        .into_iter()
        .map(|(g, c)| (g.to_string(), c))
        .collect()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_grade_course_patterns() -> BTreeMap<String, BTreeMap<Subject, Vec<String>>> {
    let mut table = BTreeMap::new();

    let grade = |entries: &[(Subject, &[&str])]| -> BTreeMap<Subject, Vec<String>> {
        entries
            .iter()
            .map(|(subject, list)| (*subject, names(list)))
            .collect()
    };

    table.insert(
        "8".to_string(),
        grade(&[
            (Subject::English, &["English 8"]),
            (Subject::Mathematics, &["Pre-Algebra", "Algebra I"]),
            (Subject::Science, &["Earth Science", "Science 8"]),
            (Subject::SocialStudies, &["Social Studies 8"]),
            (Subject::History, &["American History 8"]),
        ]),
    );
    table.insert(
        "9".to_string(),
        grade(&[
            (Subject::English, &["English 1", "English I"]),
            (Subject::Mathematics, &["Algebra I", "Algebra 1", "Geometry"]),
            (Subject::Science, &["Biology", "Physical Science"]),
            (Subject::SocialStudies, &["World Geography"]),
            (Subject::History, &["American History", "World History"]),
        ]),
    );
    table.insert(
        "10".to_string(),
        grade(&[
            (Subject::English, &["English 2", "English II"]),
            (Subject::Mathematics, &["Geometry", "Algebra 2"]),
            (Subject::Science, &["Chemistry", "Biology"]),
            (Subject::SocialStudies, &["World History"]),
            (Subject::History, &["World History"]),
        ]),
    );
    table.insert(
        "11".to_string(),
        grade(&[
            (Subject::English, &["English 3", "English III"]),
            (
                Subject::Mathematics,
                &["Algebra 2", "Algebra II", "Pre-Calculus"],
            ),
            (Subject::Science, &["Physics", "Chemistry"]),
            (Subject::SocialStudies, &["US Government"]),
            (Subject::History, &["US History"]),
        ]),
    );
    table.insert(
        "12".to_string(),
        grade(&[
            (Subject::English, &["English 4", "English IV"]),
            (
                Subject::Mathematics,
                &["Pre-Calculus", "Calculus", "Statistics"],
            ),
            (Subject::Science, &["Physics", "Anatomy"]),
            (Subject::SocialStudies, &["Government", "Economics"]),
            (Subject::History, &["Government", "Economics"]),
        ]),
    );

    table
}

fn default_course_sequences() -> BTreeMap<String, Vec<String>> {
    [
        ("Algebra 1", &["Geometry", "Algebra 2"][..]),
        ("Algebra I", &["Geometry", "Algebra 2"][..]),
        ("Geometry", &["Algebra 2", "Algebra II"][..]),
        ("Algebra 2", &["Pre-Calculus", "Statistics"][..]),
        ("Pre-Calculus", &["Calculus"][..]),
        ("English 1", &["English 2"][..]),
        ("English 2", &["English 3"][..]),
        ("English 3", &["English 4"][..]),
        ("Biology", &["Chemistry", "Anatomy"][..]),
        ("Chemistry", &["Physics"][..]),
        ("Spanish 1", &["Spanish 2"][..]),
        ("Spanish 2", &["Spanish 3"][..]),
        ("French 1", &["French 2"][..]),
        ("World Geography", &["World History"][..]),
        ("World History", &["US History"][..]),
        ("US History", &["Government", "Economics"][..]),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), names(to)))
    .collect()
}

fn default_elective_categories() -> BTreeMap<String, Vec<String>> {
    [
        ("8", &["art", "music", "technology"][..]),
        ("9", &["language", "art", "music", "physical education"][..]),
        ("10", &["language", "computer", "art", "music"][..]),
        ("11", &["computer", "language", "art"][..]),
        ("12", &["computer", "art", "music", "language"][..]),
    ]
    .into_iter()
    .map(|(g, list)| (g.to_string(), names(list)))
    .collect()
}

fn default_pe_keywords() -> Vec<String> {
    names(&["pe", "physical education", "gym", "fitness", "athletics", "weight training"])
}

fn default_medical_keywords() -> Vec<String> {
    names(&[
        "pe restriction",
        "no physical education",
        "physical activity restriction",
        "asthma",
        "heart condition",
        "injury",
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            periods_per_day: default_periods_per_day(),
            max_periods_per_day: default_max_periods_per_day(),
            min_prep_minutes: default_min_prep_minutes(),
            room_default_capacity: default_room_capacity(),
            lunch_window: default_lunch_window(),
            teacher_travel_threshold: default_travel_threshold(),
            section_min_fill_percent: default_min_fill_percent(),
            core_elective_counts_by_grade: default_core_elective_counts(),
            grade_course_patterns: default_grade_course_patterns(),
            course_sequences: default_course_sequences(),
            elective_categories_by_grade: default_elective_categories(),
            pe_keywords: default_pe_keywords(),
            medical_pe_restriction_keywords: default_medical_keywords(),
            constraint_weights: BTreeMap::new(),
            default_success_rates: BTreeMap::new(),
            auto_apply_confidence_threshold: default_confidence_threshold(),
            priority_bands: PriorityBands::default(),
            singleton_period_preference: default_singleton_preference(),
            balance_max_iterations: default_balance_iterations(),
            required_graduation_credits: default_graduation_credits(),
            expected_credits_by_grade: default_expected_credits(),
        }
    }
}

impl Config {
    /// The daily period grid implied by `periods_per_day`
    pub fn grid(&self) -> PeriodGrid {
        PeriodGrid::standard(self.periods_per_day)
    }

    /// Penalty weight in percent for a conflict type (100 when unset)
    pub fn weight_of(&self, kind: ConflictType) -> u32 {
        self.constraint_weights.get(&kind).copied().unwrap_or(100)
    }

    /// Starting success rate in percent for a suggestion kind
    pub fn success_rate_of(&self, kind: SuggestionKind) -> u32 {
        self.default_success_rates
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_confidence_percent())
    }

    /// (core, electives) targets for a grade; conservative fallback for
    /// grades missing from the table
    pub fn core_elective_counts(&self, grade: u8) -> (u8, u8) {
        self.core_elective_counts_by_grade
            .get(&grade.to_string())
            .copied()
            .unwrap_or((4, 2))
    }

    pub fn patterns_for(&self, grade: u8, subject: Subject) -> &[String] {
        self.grade_course_patterns
            .get(&grade.to_string())
            .and_then(|subjects| subjects.get(&subject))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn sequence_after(&self, completed_name: &str) -> &[String] {
        self.course_sequences
            .get(completed_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn elective_categories(&self, grade: u8) -> &[String] {
        self.elective_categories_by_grade
            .get(&grade.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn expected_credits(&self, grade: u8) -> Option<f64> {
        self.expected_credits_by_grade
            .get(&grade.to_string())
            .copied()
    }

    /// Load from TOML, or defaults when the file is absent/unreadable
    pub fn load_or_default(path: &Path) -> Config {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => toml::from_str(&content).unwrap_or_default(),
                Err(_) => Config::default(),
            }
        } else {
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = Config::default();
        assert_eq!(config.max_periods_per_day, 6);
        assert_eq!(config.min_prep_minutes, 50);
        assert_eq!(config.auto_apply_confidence_threshold, 70);
        assert_eq!(config.singleton_period_preference, vec![3, 4, 5, 2, 6, 1, 7, 8]);
        assert_eq!(config.core_elective_counts(9), (4, 3));
        assert_eq!(config.core_elective_counts(12), (3, 3));
    }

    #[test]
    fn test_weight_defaults_to_100() {
        let mut config = Config::default();
        assert_eq!(config.weight_of(ConflictType::TeacherOverlap), 100);

        config
            .constraint_weights
            .insert(ConflictType::TeacherTravel, 50);
        assert_eq!(config.weight_of(ConflictType::TeacherTravel), 50);
    }

    #[test]
    fn test_grade_pattern_lookup() {
        let config = Config::default();
        let math9 = config.patterns_for(9, Subject::Mathematics);
        assert_eq!(math9[0], "Algebra I");
        assert!(config.patterns_for(7, Subject::Mathematics).is_empty());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let text = r#"
            max_periods_per_day = 5
            auto_apply_confidence_threshold = 80
            lunch_window = ["11:30", "12:30"]

            [constraint_weights]
            TeacherTravel = 40
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.max_periods_per_day, 5);
        assert_eq!(config.auto_apply_confidence_threshold, 80);
        assert_eq!(config.lunch_window.0, TimeOfDay::new(11, 30).unwrap());
        assert_eq!(config.weight_of(ConflictType::TeacherTravel), 40);
        // Untouched fields keep their defaults
        assert_eq!(config.periods_per_day, 8);
        assert_eq!(config.core_elective_counts(9), (4, 3));
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(back.periods_per_day, config.periods_per_day);
        assert_eq!(back.lunch_window, config.lunch_window);
        assert_eq!(
            back.core_elective_counts_by_grade,
            config.core_elective_counts_by_grade
        );
        assert_eq!(back.grade_course_patterns, config.grade_course_patterns);
    }
}
