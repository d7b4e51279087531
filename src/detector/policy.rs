//! Room-type compatibility policy shared by the detector and resolver.

use crate::types::{Course, RoomType};

const SCIENCE_KEYWORDS: &[&str] = &["science", "chemistry", "physics", "biology"];
const COMPUTER_KEYWORDS: &[&str] = &["computer", "technology", "programming"];
const ART_KEYWORDS: &[&str] = &["art", "drawing", "painting"];
const MUSIC_KEYWORDS: &[&str] = &["music", "band", "choir", "chorus", "orchestra"];
const PE_KEYWORDS: &[&str] = &["physical education", "pe", "gym"];

/// Case-insensitive keyword hit. Keywords of three characters or fewer
/// match on token prefixes only, so "pe" cannot hit "Spelling".
pub fn keyword_matches(text: &str, keyword: &str) -> bool {
    let text = text.to_lowercase();
    let keyword = keyword.to_lowercase();
    if keyword.len() <= 3 {
        text.split([' ', '-', '/'])
            .any(|token| token.starts_with(&keyword))
    } else {
        text.contains(&keyword)
    }
}

fn course_matches_any(course: &Course, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        keyword_matches(course.subject.name(), kw) || keyword_matches(&course.name, kw)
    })
}

/// The §-table policy rows, first hit wins. Returns None when any room
/// type is acceptable (default row).
pub fn acceptable_room_types(course: &Course) -> Option<Vec<RoomType>> {
    if course_matches_any(course, SCIENCE_KEYWORDS) {
        return Some(vec![RoomType::ScienceLab, RoomType::ComputerLab, RoomType::StandardClassroom]);
    }
    if course_matches_any(course, COMPUTER_KEYWORDS) {
        return Some(vec![RoomType::ComputerLab, RoomType::ScienceLab]);
    }
    if course_matches_any(course, ART_KEYWORDS) {
        return Some(vec![RoomType::ArtStudio, RoomType::StandardClassroom]);
    }
    if course_matches_any(course, MUSIC_KEYWORDS) {
        return Some(vec![
            RoomType::MusicRoom,
            RoomType::BandRoom,
            RoomType::ChorusRoom,
            RoomType::Auditorium,
        ]);
    }
    if course_matches_any(course, PE_KEYWORDS) {
        return Some(vec![RoomType::Gymnasium]);
    }
    None
}

/// Can the course meet in a room of this type?
pub fn room_type_ok(course: &Course, room_type: RoomType) -> bool {
    if course.requires_lab && !room_type.is_lab() {
        return false;
    }
    match acceptable_room_types(course) {
        Some(types) => types.contains(&room_type),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Course, CourseId, Subject};

    fn course(name: &str, subject: Subject, requires_lab: bool) -> Course {
        Course {
            id: CourseId(name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            subject,
            level: None,
            max_students: 25,
            required_certifications: vec![],
            is_singleton: false,
            num_sections_needed: 1,
            requires_lab,
            required_equipment: vec![],
            credits: 1.0,
            active: true,
        }
    }

    #[test]
    fn test_science_accepts_lab_and_classroom() {
        let chem = course("Chemistry", Subject::Science, false);
        assert!(room_type_ok(&chem, RoomType::ScienceLab));
        assert!(room_type_ok(&chem, RoomType::StandardClassroom));
        assert!(!room_type_ok(&chem, RoomType::Gymnasium));
    }

    #[test]
    fn test_lab_requirement_overrides_classroom_fallback() {
        let chem = course("Chemistry", Subject::Science, true);
        assert!(room_type_ok(&chem, RoomType::ScienceLab));
        assert!(!room_type_ok(&chem, RoomType::StandardClassroom));
    }

    #[test]
    fn test_pe_requires_gymnasium() {
        let pe = course("PE-Fitness", Subject::PhysicalEducation, false);
        assert!(room_type_ok(&pe, RoomType::Gymnasium));
        assert!(!room_type_ok(&pe, RoomType::StandardClassroom));
    }

    #[test]
    fn test_music_rooms() {
        let band = course("Concert Band", Subject::Music, false);
        assert!(room_type_ok(&band, RoomType::BandRoom));
        assert!(room_type_ok(&band, RoomType::Auditorium));
        assert!(!room_type_ok(&band, RoomType::ScienceLab));
    }

    #[test]
    fn test_default_row_accepts_anything() {
        let english = course("English 2", Subject::English, false);
        assert!(room_type_ok(&english, RoomType::StandardClassroom));
        assert!(room_type_ok(&english, RoomType::Library));
    }

    #[test]
    fn test_short_keywords_match_token_prefixes_only() {
        assert!(keyword_matches("PE Fitness", "pe"));
        assert!(keyword_matches("Gym Games", "gym"));
        assert!(!keyword_matches("Spelling Workshop", "pe"));
        // "Earth Science" is caught by the science row before "art"
        let earth = course("Earth Science", Subject::Science, false);
        assert!(room_type_ok(&earth, RoomType::StandardClassroom));
        assert!(room_type_ok(&earth, RoomType::ScienceLab));
    }
}
