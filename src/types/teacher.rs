use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use super::{Subject, TeacherId};

/// A qualification held by a teacher, tagged with subject areas and an
/// optional grade-level range and expiration date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Inclusive (low, high) grade range the certification covers
    #[serde(default)]
    pub grade_range: Option<(u8, u8)>,
    #[serde(default)]
    pub expires: Option<NaiveDate>,
}

impl Certification {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires.map(|date| date < today).unwrap_or(false)
    }

    /// True when the certification's grade range (if any) intersects
    /// the given inclusive band.
    pub fn covers_grades(&self, band: (u8, u8)) -> bool {
        match self.grade_range {
            Some((low, high)) => low <= band.1 && band.0 <= high,
            None => true,
        }
    }
}

/// A teacher as provided by the SIS read model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

fn default_active() -> bool {
    true
}

impl Teacher {
    /// Certifications still valid on `today`
    pub fn valid_certifications(&self, today: NaiveDate) -> impl Iterator<Item = &Certification> {
        self.certifications
            .iter()
            .filter(move |c| !c.is_expired(today))
    }
}
