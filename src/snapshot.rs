//! Immutable entity read-model: one snapshot per optimisation session,
//! loaded up front with denormalised indices for O(1)/O(log n) lookups.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SchedulerError};
use crate::sources::DataSource;
use crate::types::{
    CompletedCourse, Course, CourseId, CourseLevel, CourseSection, PrerequisiteGroup, Room, RoomId,
    RoomType, Student, StudentId, Subject, Teacher, TeacherId,
};

/// Immutable snapshot of the SIS read model plus lookup indices.
/// Never mutated by the engine.
#[derive(Debug)]
pub struct Snapshot {
    students: BTreeMap<StudentId, Student>,
    teachers: BTreeMap<TeacherId, Teacher>,
    courses: BTreeMap<CourseId, Course>,
    rooms: BTreeMap<RoomId, Room>,

    teachers_by_department: HashMap<String, Vec<TeacherId>>,
    teachers_by_certification_subject: HashMap<Subject, Vec<TeacherId>>,
    courses_by_subject: HashMap<Subject, Vec<CourseId>>,
    courses_by_level: HashMap<CourseLevel, Vec<CourseId>>,
    rooms_by_type: HashMap<RoomType, Vec<RoomId>>,
    rooms_by_zone: HashMap<String, Vec<RoomId>>,

    history_by_student: HashMap<StudentId, Vec<CompletedCourse>>,
    prereqs_by_course: HashMap<CourseId, Vec<PrerequisiteGroup>>,
    sections_by_course: HashMap<CourseId, Vec<CourseSection>>,
}

impl Snapshot {
    /// Load everything from a data source. Fails on duplicate ids; the
    /// richer cross-reference checks live in `parser::validation`.
    pub fn from_source(source: &dyn DataSource) -> Result<Snapshot> {
        let mut students = BTreeMap::new();
        for student in source.students() {
            if students.insert(student.id.clone(), student.clone()).is_some() {
                return Err(SchedulerError::DuplicateId {
                    id_type: "student".to_string(),
                    id: student.id.to_string(),
                }
                .into());
            }
        }

        let mut teachers = BTreeMap::new();
        for teacher in source.teachers() {
            if teachers.insert(teacher.id.clone(), teacher.clone()).is_some() {
                return Err(SchedulerError::DuplicateId {
                    id_type: "teacher".to_string(),
                    id: teacher.id.to_string(),
                }
                .into());
            }
        }

        let mut courses = BTreeMap::new();
        for course in source.courses() {
            if courses.insert(course.id.clone(), course.clone()).is_some() {
                return Err(SchedulerError::DuplicateId {
                    id_type: "course".to_string(),
                    id: course.id.to_string(),
                }
                .into());
            }
        }

        let mut rooms = BTreeMap::new();
        for room in source.rooms() {
            if rooms.insert(room.id.clone(), room.clone()).is_some() {
                return Err(SchedulerError::DuplicateId {
                    id_type: "room".to_string(),
                    id: room.id.to_string(),
                }
                .into());
            }
        }

        let mut history_by_student: HashMap<StudentId, Vec<CompletedCourse>> = HashMap::new();
        for id in students.keys() {
            let history = source.history(id);
            if !history.is_empty() {
                history_by_student.insert(id.clone(), history);
            }
        }

        let mut prereqs_by_course: HashMap<CourseId, Vec<PrerequisiteGroup>> = HashMap::new();
        let mut sections_by_course: HashMap<CourseId, Vec<CourseSection>> = HashMap::new();
        for id in courses.keys() {
            let groups = source.prerequisites(id);
            if !groups.is_empty() {
                prereqs_by_course.insert(id.clone(), groups);
            }
            let sections = source.sections(id);
            if !sections.is_empty() {
                sections_by_course.insert(id.clone(), sections);
            }
        }

        // Denormalised indices
        let mut teachers_by_department: HashMap<String, Vec<TeacherId>> = HashMap::new();
        let mut teachers_by_certification_subject: HashMap<Subject, Vec<TeacherId>> =
            HashMap::new();
        for teacher in teachers.values() {
            if !teacher.department.is_empty() {
                teachers_by_department
                    .entry(teacher.department.clone())
                    .or_default()
                    .push(teacher.id.clone());
            }
            let mut seen: Vec<Subject> = Vec::new();
            for cert in &teacher.certifications {
                for subject in &cert.subjects {
                    if !seen.contains(subject) {
                        seen.push(*subject);
                        teachers_by_certification_subject
                            .entry(*subject)
                            .or_default()
                            .push(teacher.id.clone());
                    }
                }
            }
        }

        let mut courses_by_subject: HashMap<Subject, Vec<CourseId>> = HashMap::new();
        let mut courses_by_level: HashMap<CourseLevel, Vec<CourseId>> = HashMap::new();
        for course in courses.values() {
            courses_by_subject
                .entry(course.subject)
                .or_default()
                .push(course.id.clone());
            if let Some(level) = course.level {
                courses_by_level
                    .entry(level)
                    .or_default()
                    .push(course.id.clone());
            }
        }

        let mut rooms_by_type: HashMap<RoomType, Vec<RoomId>> = HashMap::new();
        let mut rooms_by_zone: HashMap<String, Vec<RoomId>> = HashMap::new();
        for room in rooms.values() {
            rooms_by_type
                .entry(room.room_type)
                .or_default()
                .push(room.id.clone());
            rooms_by_zone
                .entry(room.zone_key())
                .or_default()
                .push(room.id.clone());
        }

        Ok(Snapshot {
            students,
            teachers,
            courses,
            rooms,
            teachers_by_department,
            teachers_by_certification_subject,
            courses_by_subject,
            courses_by_level,
            rooms_by_type,
            rooms_by_zone,
            history_by_student,
            prereqs_by_course,
            sections_by_course,
        })
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn teacher(&self, id: &TeacherId) -> Option<&Teacher> {
        self.teachers.get(id)
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.values()
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn teachers_in_department(&self, department: &str) -> &[TeacherId] {
        self.teachers_by_department
            .get(department)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn teachers_certified_for(&self, subject: Subject) -> &[TeacherId] {
        self.teachers_by_certification_subject
            .get(&subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn courses_in_subject(&self, subject: Subject) -> &[CourseId] {
        self.courses_by_subject
            .get(&subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn courses_at_level(&self, level: CourseLevel) -> &[CourseId] {
        self.courses_by_level
            .get(&level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rooms_of_type(&self, room_type: RoomType) -> &[RoomId] {
        self.rooms_by_type
            .get(&room_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rooms_in_zone(&self, zone: &str) -> &[RoomId] {
        self.rooms_by_zone
            .get(zone)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn history_of(&self, student: &StudentId) -> &[CompletedCourse] {
        self.history_by_student
            .get(student)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn prerequisites_of(&self, course: &CourseId) -> &[PrerequisiteGroup] {
        self.prereqs_by_course
            .get(course)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sections the SIS already knows about (prior-year carryover)
    pub fn seeded_sections(&self, course: &CourseId) -> &[CourseSection] {
        self.sections_by_course
            .get(course)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up a course by tolerant name match, preferring exact
    /// normalised equality over substring containment.
    pub fn course_by_name(&self, name: &str) -> Option<&Course> {
        use crate::selector::names::{names_match, normalize_course_name};
        let wanted = normalize_course_name(name);
        self.courses
            .values()
            .find(|c| normalize_course_name(&c.name) == wanted)
            .or_else(|| self.courses.values().find(|c| names_match(&c.name, name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Certification;

    struct TinySource;

    impl DataSource for TinySource {
        fn students(&self) -> Vec<Student> {
            vec![Student {
                id: StudentId("s1".to_string()),
                name: "Student One".to_string(),
                active: true,
                grade: 9,
                medical_notes: String::new(),
                has_iep: false,
                iep_review_date: None,
            }]
        }

        fn teachers(&self) -> Vec<Teacher> {
            vec![Teacher {
                id: TeacherId("t1".to_string()),
                name: "Teacher One".to_string(),
                department: "Science".to_string(),
                active: true,
                certifications: vec![Certification {
                    name: "Secondary Science".to_string(),
                    subjects: vec![Subject::Science],
                    grade_range: Some((9, 12)),
                    expires: None,
                }],
            }]
        }

        fn courses(&self) -> Vec<Course> {
            vec![Course {
                id: CourseId("bio".to_string()),
                name: "Biology".to_string(),
                subject: Subject::Science,
                level: Some(CourseLevel::HighSchool),
                max_students: 24,
                required_certifications: vec!["Secondary Science".to_string()],
                is_singleton: false,
                num_sections_needed: 2,
                requires_lab: true,
                required_equipment: vec![],
                credits: 1.0,
                active: true,
            }]
        }

        fn rooms(&self) -> Vec<Room> {
            vec![Room {
                id: RoomId("201".to_string()),
                number: "201".to_string(),
                building: "Main".to_string(),
                floor: 2,
                zone: None,
                capacity: 24,
                room_type: RoomType::ScienceLab,
                equipment: vec![],
            }]
        }

        fn history(&self, _student: &StudentId) -> Vec<CompletedCourse> {
            vec![]
        }

        fn prerequisites(&self, _course: &CourseId) -> Vec<PrerequisiteGroup> {
            vec![]
        }

        fn sections(&self, _course: &CourseId) -> Vec<CourseSection> {
            vec![]
        }
    }

    #[test]
    fn test_indices_built() {
        let snapshot = Snapshot::from_source(&TinySource).unwrap();

        assert_eq!(snapshot.teachers_in_department("Science").len(), 1);
        assert_eq!(snapshot.teachers_certified_for(Subject::Science).len(), 1);
        assert_eq!(snapshot.courses_in_subject(Subject::Science).len(), 1);
        assert_eq!(snapshot.rooms_of_type(RoomType::ScienceLab).len(), 1);
        assert_eq!(snapshot.rooms_in_zone("Main-2").len(), 1);
        assert!(snapshot.course(&CourseId("bio".to_string())).is_some());
    }

    #[test]
    fn test_course_by_name_tolerant() {
        let snapshot = Snapshot::from_source(&TinySource).unwrap();
        assert!(snapshot.course_by_name("biology").is_some());
        assert!(snapshot.course_by_name("Chemistry").is_none());
    }
}
