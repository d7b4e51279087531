//! JSON-per-entity directory loading. A data directory holds
//! `students.json`, `teachers.json`, `courses.json`, `rooms.json`, and
//! optionally `sections.json`, `history.json`, `prereqs.json`, and
//! `config.toml`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, SchedulerError};
use crate::snapshot::Snapshot;
use crate::sources::DataSource;
use crate::types::{
    CompletedCourse, Course, CourseId, CourseSection, PrerequisiteGroup, Room, Student, StudentId,
    Teacher,
};

/// A fully-loaded data directory acting as the engine's `DataSource`
#[derive(Debug, Default)]
pub struct DirectorySource {
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    courses: Vec<Course>,
    rooms: Vec<Room>,
    history: HashMap<StudentId, Vec<CompletedCourse>>,
    prereqs: HashMap<CourseId, Vec<PrerequisiteGroup>>,
    sections: HashMap<CourseId, Vec<CourseSection>>,
}

impl DataSource for DirectorySource {
    fn students(&self) -> Vec<Student> {
        self.students.clone()
    }

    fn teachers(&self) -> Vec<Teacher> {
        self.teachers.clone()
    }

    fn courses(&self) -> Vec<Course> {
        self.courses.clone()
    }

    fn rooms(&self) -> Vec<Room> {
        self.rooms.clone()
    }

    fn history(&self, student: &StudentId) -> Vec<CompletedCourse> {
        self.history.get(student).cloned().unwrap_or_default()
    }

    fn prerequisites(&self, course: &CourseId) -> Vec<PrerequisiteGroup> {
        self.prereqs.get(course).cloned().unwrap_or_default()
    }

    fn sections(&self, course: &CourseId) -> Vec<CourseSection> {
        self.sections.get(course).cloned().unwrap_or_default()
    }
}

/// Load a data directory into a `DirectorySource`
pub fn load_source_from_dir(dir: &Path) -> Result<DirectorySource> {
    let students: Vec<Student> = load_json_file(&dir.join("students.json"))?;
    let teachers: Vec<Teacher> = load_json_file(&dir.join("teachers.json"))?;
    let courses: Vec<Course> = load_json_file(&dir.join("courses.json"))?;
    let rooms: Vec<Room> = load_json_file(&dir.join("rooms.json"))?;

    let history: HashMap<String, Vec<CompletedCourse>> =
        load_json_file_or_default(&dir.join("history.json"))?;
    let prereqs: HashMap<String, Vec<PrerequisiteGroup>> =
        load_json_file_or_default(&dir.join("prereqs.json"))?;
    let flat_sections: Vec<CourseSection> =
        load_json_file_or_default(&dir.join("sections.json"))?;

    let mut sections: HashMap<CourseId, Vec<CourseSection>> = HashMap::new();
    for section in flat_sections {
        sections
            .entry(section.course_id.clone())
            .or_default()
            .push(section);
    }

    Ok(DirectorySource {
        students,
        teachers,
        courses,
        rooms,
        history: history
            .into_iter()
            .map(|(id, entries)| (StudentId(id), entries))
            .collect(),
        prereqs: prereqs
            .into_iter()
            .map(|(id, groups)| (CourseId(id), groups))
            .collect(),
        sections,
    })
}

/// Load a snapshot and its config from a data directory. Rooms loaded
/// without a capacity fall back to the configured default.
pub fn load_snapshot_from_dir(dir: &Path) -> Result<(Snapshot, Config)> {
    let mut source = load_source_from_dir(dir)?;
    let config = Config::load_or_default(&dir.join("config.toml"));
    for room in &mut source.rooms {
        if room.capacity == 0 {
            room.capacity = config.room_default_capacity;
        }
    }
    let snapshot = Snapshot::from_source(&source)?;
    Ok((snapshot, config))
}

/// Generic JSON file loader
fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let path_str = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| SchedulerError::FileRead {
        path: path_str.clone(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| {
        SchedulerError::JsonParse {
            file: path_str,
            message: e.to_string(),
        }
        .into()
    })
}

/// Optional-file variant: a missing file yields the default, a present
/// but malformed file is still an error
fn load_json_file_or_default<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    load_json_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn test_load_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "students.json",
            json!([{
                "id": "s001", "name": "Alice", "grade": 9,
                "medical_notes": "asthma", "has_iep": false
            }]),
        );
        write(
            dir.path(),
            "teachers.json",
            json!([{
                "id": "t001", "name": "Ms. Adams", "department": "Science",
                "certifications": [{
                    "name": "Secondary Science",
                    "subjects": ["Science"],
                    "grade_range": [9, 12]
                }]
            }]),
        );
        write(
            dir.path(),
            "courses.json",
            json!([{
                "id": "bio", "name": "Biology", "subject": "Science",
                "level": "HighSchool", "max_students": 24,
                "required_certifications": ["Secondary Science"],
                "num_sections_needed": 2, "requires_lab": true
            }]),
        );
        write(
            dir.path(),
            "rooms.json",
            json!([{
                "id": "201", "number": "201", "building": "Main", "floor": 2,
                "capacity": 24, "room_type": "ScienceLab",
                "equipment": ["fume hood"]
            }]),
        );
        write(
            dir.path(),
            "history.json",
            json!({
                "s001": [{"course_id": "sci8", "final_grade": 88, "term": "2024-25"}]
            }),
        );
        write(
            dir.path(),
            "prereqs.json",
            json!({
                "bio": [[{"course": "sci8", "min_grade": 60}]]
            }),
        );

        let (snapshot, config) = load_snapshot_from_dir(dir.path()).unwrap();

        let student = snapshot.student(&StudentId("s001".to_string())).unwrap();
        assert!(student.active, "active defaults to true");
        assert_eq!(student.medical_notes, "asthma");

        let course = snapshot.course(&CourseId("bio".to_string())).unwrap();
        assert!(course.requires_lab);
        assert_eq!(course.num_sections_needed, 2);

        assert_eq!(snapshot.history_of(&StudentId("s001".to_string())).len(), 1);
        assert_eq!(
            snapshot.prerequisites_of(&CourseId("bio".to_string())).len(),
            1
        );

        // No config.toml: defaults apply
        assert_eq!(config.periods_per_day, 8);
    }

    #[test]
    fn test_missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "students.json", json!([]));
        // teachers.json absent
        assert!(load_source_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_malformed_optional_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "students.json", json!([]));
        write(dir.path(), "teachers.json", json!([]));
        write(dir.path(), "courses.json", json!([]));
        write(dir.path(), "rooms.json", json!([]));
        fs::write(dir.path().join("history.json"), "not json").unwrap();

        assert!(load_source_from_dir(dir.path()).is_err());
    }
}
