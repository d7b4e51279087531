use serde::{Deserialize, Serialize};
use std::fmt;
use super::RoomId;

/// Closed set of room types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RoomType {
    StandardClassroom,
    ScienceLab,
    ComputerLab,
    Gymnasium,
    ArtStudio,
    MusicRoom,
    BandRoom,
    ChorusRoom,
    Auditorium,
    Library,
}

impl RoomType {
    pub fn name(&self) -> &'static str {
        match self {
            RoomType::StandardClassroom => "Standard Classroom",
            RoomType::ScienceLab => "Science Lab",
            RoomType::ComputerLab => "Computer Lab",
            RoomType::Gymnasium => "Gymnasium",
            RoomType::ArtStudio => "Art Studio",
            RoomType::MusicRoom => "Music Room",
            RoomType::BandRoom => "Band Room",
            RoomType::ChorusRoom => "Chorus Room",
            RoomType::Auditorium => "Auditorium",
            RoomType::Library => "Library",
        }
    }

    /// Lab-class rooms in the room-type policy sense
    pub fn is_lab(&self) -> bool {
        matches!(self, RoomType::ScienceLab | RoomType::ComputerLab)
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A physical room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub floor: i16,
    /// Named wing/floor grouping; derived from building+floor when absent
    #[serde(default)]
    pub zone: Option<String>,
    pub capacity: u32,
    pub room_type: RoomType,
    /// Equipment this room provides (e.g. "kiln", "fume hood")
    #[serde(default)]
    pub equipment: Vec<String>,
}

impl Room {
    /// Effective zone key used for travel-cost grouping
    pub fn zone_key(&self) -> String {
        self.zone
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.building, self.floor))
    }

    /// Check the room provides all required equipment (case-insensitive)
    pub fn has_equipment(&self, required: &[String]) -> bool {
        required.iter().all(|need| {
            self.equipment
                .iter()
                .any(|have| have.eq_ignore_ascii_case(need))
        })
    }

    /// Step-scored travel cost between two rooms:
    /// same room 0, same zone 1, same building 3, different building 5.
    pub fn travel_cost(&self, other: &Room) -> u8 {
        if self.id == other.id {
            0
        } else if self.zone_key() == other.zone_key() {
            1
        } else if self.building == other.building {
            3
        } else {
            5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, building: &str, floor: i16, zone: Option<&str>) -> Room {
        Room {
            id: RoomId(id.to_string()),
            number: id.to_string(),
            building: building.to_string(),
            floor,
            zone: zone.map(str::to_string),
            capacity: 30,
            room_type: RoomType::StandardClassroom,
            equipment: vec![],
        }
    }

    #[test]
    fn test_travel_cost_steps() {
        let a = room("101", "Main", 1, Some("A-wing"));
        let same = room("101", "Main", 1, Some("A-wing"));
        let same_zone = room("102", "Main", 1, Some("A-wing"));
        let same_building = room("201", "Main", 2, Some("B-wing"));
        let other_building = room("annex-1", "Annex", 1, None);

        assert_eq!(a.travel_cost(&same), 0);
        assert_eq!(a.travel_cost(&same_zone), 1);
        assert_eq!(a.travel_cost(&same_building), 3);
        assert_eq!(a.travel_cost(&other_building), 5);
    }

    #[test]
    fn test_zone_derived_from_building_and_floor() {
        let r = room("105", "Main", 2, None);
        assert_eq!(r.zone_key(), "Main-2");
    }

    #[test]
    fn test_has_equipment_case_insensitive() {
        let mut r = room("art-1", "Main", 1, None);
        r.equipment = vec!["Kiln".to_string(), "sink".to_string()];

        assert!(r.has_equipment(&["kiln".to_string()]));
        assert!(!r.has_equipment(&["kiln".to_string(), "loom".to_string()]));
    }
}
