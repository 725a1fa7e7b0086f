use std::fmt;

use scuole_data_processing::{LocationRecord, RawRecord};

/// Administrative parent of a school, usually the head institute of a group.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentSchool {
    pub id: String,
    pub name: String,
}

/// Inputs kept alongside an entity when normalizing in debug mode.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo {
    /// The record the entity was built from
    pub raw_record: RawRecord,
    /// The municipality the cadastral code resolved to, if any
    pub location: Option<LocationRecord>,
}

/// A school in canonical form.
///
/// Built once per registry record by [`RecordNormalizer`](crate::RecordNormalizer)
/// and never modified afterwards. Free-text fields that the registry marks as
/// unavailable are empty strings.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolEntity {
    /// Government school code, unique
    pub id: String,
    /// Linked-data identifier of the source record
    pub reference_id: String,
    /// Four digit school year, e.g. `2018`
    pub school_year: String,
    /// Grade level description, e.g. `SCUOLA PRIMARIA`
    pub school_type: String,
    /// Display name without the grade level prefix
    pub name: String,
    /// Never empty, falls back to the institutional mailbox
    pub email: String,
    pub certified_email: String,
    pub website: String,
    pub address: String,
    pub postcode: String,
    /// Cadastral code of the municipality
    pub cad_code: String,
    /// Municipality name, from reference data when the cadastral code resolved
    pub city_name: String,
    pub city_id: Option<String>,
    pub nuts3_code: Option<String>,
    pub province_abbr: Option<String>,
    pub region_name: Option<String>,
    pub parent_school: Option<ParentSchool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub debug: Option<DebugInfo>,
}

impl SchoolEntity {
    /// Overwrite all geographic fields from a resolved municipality.
    pub(crate) fn apply_location(&mut self, location: &LocationRecord) {
        self.city_name.clone_from(&location.name);
        self.city_id = Some(location.id.clone());
        self.nuts3_code = Some(location.nuts3_2010_code.clone());
        self.province_abbr = Some(location.license_plate_code.clone());
        self.region_name = Some(location.region.name.clone());
    }

    /// Whether geographic enrichment succeeded for this school.
    #[must_use]
    pub fn is_geolocated(&self) -> bool {
        self.city_id.is_some()
    }

    /// Name and city joined by a space, the text fuzzy matching runs against.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {}", self.name, self.city_name)
    }
}

impl fmt::Display for SchoolEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" ({}", self.id, self.name, self.city_name)?;
        if let Some(province) = &self.province_abbr {
            write!(f, ", {province}")?;
        }
        write!(f, ")")
    }
}
