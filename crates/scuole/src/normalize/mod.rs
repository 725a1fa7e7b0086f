//! Turning raw registry records into [`SchoolEntity`] values.
//!
//! Normalization never fails on dirty data: unavailable markers become empty
//! strings, a missing e-mail is derived from the school code and a cadastral code
//! that cannot be resolved simply leaves the raw city name in place. The only
//! error is a record without a school code, which is a caller bug.

mod entity;
mod geo;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use scuole_data_processing::RawRecord;
use tracing::{debug, info, instrument, trace};

pub use entity::{DebugInfo, ParentSchool, SchoolEntity};
pub use error::NormalizeError;
pub use geo::{ComuniIndex, GeoLookup, GeoMiss, NoGeoLookup, resolve_location};

/// Source field names, without the `miur:` namespace.
pub mod fields {
    pub const ID: &str = "CODICESCUOLA";
    pub const REFERENCE_ID: &str = "@id";
    pub const SCHOOL_YEAR: &str = "ANNOSCOLASTICO";
    pub const SCHOOL_TYPE: &str = "DESCRIZIONETIPOLOGIAGRADOISTRUZIONESCUOLA";
    pub const NAME: &str = "DENOMINAZIONESCUOLA";
    pub const EMAIL: &str = "INDIRIZZOEMAILSCUOLA";
    pub const CERTIFIED_EMAIL: &str = "INDIRIZZOPECSCUOLA";
    pub const WEBSITE: &str = "SITOWEBSCUOLA";
    pub const ADDRESS: &str = "INDIRIZZOSCUOLA";
    pub const POSTCODE: &str = "CAPSCUOLA";
    pub const CAD_CODE: &str = "CODICECOMUNESCUOLA";
    pub const CITY_NAME: &str = "DESCRIZIONECOMUNE";
    pub const PARENT_ID: &str = "CODICEISTITUTORIFERIMENTO";
    pub const PARENT_NAME: &str = "DENOMINAZIONEISTITUTORIFERIMENTO";
}

pub const DEFAULT_INSTITUTIONAL_DOMAIN: &str = "istruzione.it";

/// Stands in for the grade level when a school named after its town has none.
pub const FALLBACK_SCHOOL_TYPE: &str = "Scuola";

static NOT_AVAILABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)non disponibile").unwrap());

/// Options for [`RecordNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Domain of the derived mailbox used when a record has no e-mail
    pub institutional_domain: String,
    /// Keep the raw record and resolved location on every entity
    pub debug: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            institutional_domain: DEFAULT_INSTITUTIONAL_DOMAIN.to_string(),
            debug: false,
        }
    }
}

impl NormalizeConfig {
    #[must_use]
    pub fn institutional_domain(mut self, domain: impl Into<String>) -> Self {
        self.institutional_domain = domain.into();
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}

/// Trim a raw value and drop "Non Disponibile" markers.
#[must_use]
pub fn clean_field(value: &str) -> String {
    NOT_AVAILABLE.replace_all(value.trim(), "").trim().to_string()
}

/// Remove the grade level description from a school name.
///
/// `"SCUOLA PRIMARIA CARDUCCI"` with type `"SCUOLA PRIMARIA"` becomes `"CARDUCCI"`.
#[must_use]
pub fn strip_school_type(name: &str, school_type: &str) -> String {
    if school_type.is_empty() {
        return name.trim().to_string();
    }
    name.replace(school_type, "").trim().to_string()
}

/// Converts raw registry records into [`SchoolEntity`] values, resolving their
/// municipality through a [`GeoLookup`].
#[derive(Debug, Clone)]
pub struct RecordNormalizer<G> {
    geo: G,
    config: NormalizeConfig,
}

impl<G: GeoLookup> RecordNormalizer<G> {
    pub fn new(geo: G) -> Self {
        Self::with_config(geo, NormalizeConfig::default())
    }

    pub fn with_config(geo: G, config: NormalizeConfig) -> Self {
        Self { geo, config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn geo(&self) -> &G {
        &self.geo
    }

    /// Normalize a single record.
    pub fn normalize(&self, raw: &RawRecord) -> Result<SchoolEntity, NormalizeError> {
        let id = raw
            .scalar(fields::ID)
            .map(|v| clean_field(&v))
            .ok_or(NormalizeError::MissingField { field: fields::ID })?;
        let field = |key: &str| raw.scalar(key).map(|v| clean_field(&v)).unwrap_or_default();

        let school_type = field(fields::SCHOOL_TYPE);
        let city_name = field(fields::CITY_NAME);

        let mut name = strip_school_type(&field(fields::NAME), &school_type);
        if name == city_name {
            // the only school in town is often just called after the town
            let prefix = if school_type.is_empty() {
                FALLBACK_SCHOOL_TYPE
            } else {
                school_type.as_str()
            };
            name = format!("{prefix} {name}").trim_end().to_string();
        }

        let mut email = field(fields::EMAIL);
        if email.is_empty() {
            email = format!("{}@{}", id.to_lowercase(), self.config.institutional_domain);
        }

        let parent_id = field(fields::PARENT_ID);
        let parent_school = (!parent_id.is_empty() && parent_id != id).then(|| ParentSchool {
            name: field(fields::PARENT_NAME),
            id: parent_id,
        });

        let mut entity = SchoolEntity {
            reference_id: field(fields::REFERENCE_ID),
            school_year: field(fields::SCHOOL_YEAR).chars().take(4).collect(),
            school_type,
            name,
            email,
            certified_email: field(fields::CERTIFIED_EMAIL),
            website: field(fields::WEBSITE),
            address: field(fields::ADDRESS),
            postcode: field(fields::POSTCODE),
            cad_code: field(fields::CAD_CODE),
            city_name,
            parent_school,
            id,
            ..Default::default()
        };

        let location = match resolve_location(&self.geo, &entity.id, &entity.cad_code) {
            Ok(location) => {
                entity.apply_location(&location);
                Some(location)
            }
            Err(miss) => {
                debug!(%miss, "Keeping raw city name");
                None
            }
        };

        if self.config.debug {
            entity.debug = Some(DebugInfo {
                raw_record: raw.clone(),
                location,
            });
        }

        trace!(school = %entity, "Normalized record");
        Ok(entity)
    }

    /// Normalize many records in parallel, keeping their order.
    #[instrument(
        name = "Normalize records",
        skip_all,
        fields(records = records.len()),
        level = "info"
    )]
    pub fn normalize_all(
        &self,
        records: &[RawRecord],
    ) -> Vec<Result<SchoolEntity, NormalizeError>> {
        let t_norm = std::time::Instant::now();
        let results: Vec<_> = records.par_iter().map(|raw| self.normalize(raw)).collect();
        info!(
            elapsed = ?t_norm.elapsed(),
            geolocated = results
                .iter()
                .filter(|r| r.as_ref().is_ok_and(SchoolEntity::is_geolocated))
                .count(),
            "Normalization complete"
        );
        results
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum NormalizeError {
        #[error("raw record is missing required field '{field}'")]
        MissingField { field: &'static str },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scuole_data_processing::{LocationRecord, Region};
    use serde_json::json;

    fn comuni() -> ComuniIndex {
        ComuniIndex::new([LocationRecord {
            id: "048017".to_string(),
            name: "Firenze".to_string(),
            cadastral_code: "D612".to_string(),
            nuts3_2010_code: "ITI14".to_string(),
            license_plate_code: "FI".to_string(),
            region: Region {
                name: "Toscana".to_string(),
            },
        }])
    }

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (format!("miur:{k}"), json!(v)))
            .collect()
    }

    fn ponte_a_sieve() -> RawRecord {
        record(&[
            ("CODICESCUOLA", "FIEE123"),
            ("DENOMINAZIONESCUOLA", "Scuola Primaria Ponte a Sieve"),
            ("DESCRIZIONETIPOLOGIAGRADOISTRUZIONESCUOLA", "Scuola Primaria"),
            ("DESCRIZIONECOMUNE", "Ponte a Sieve"),
            ("ANNOSCOLASTICO", "201819"),
        ])
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  VIA ROMA 1 "), "VIA ROMA 1");
        assert_eq!(clean_field("Non Disponibile"), "");
        assert_eq!(clean_field(" Non disponibile "), "");
        assert_eq!(clean_field("NON DISPONIBILE"), "");
        assert_eq!(clean_field(""), "");
    }

    #[test]
    fn test_strip_school_type() {
        assert_eq!(
            strip_school_type("SCUOLA PRIMARIA CARDUCCI", "SCUOLA PRIMARIA"),
            "CARDUCCI"
        );
        assert_eq!(strip_school_type("COMPAGNI - CARDUCCI", ""), "COMPAGNI - CARDUCCI");
        // case sensitive
        assert_eq!(
            strip_school_type("Scuola Primaria Carducci", "SCUOLA PRIMARIA"),
            "Scuola Primaria Carducci"
        );
    }

    #[test]
    fn test_sole_school_named_after_town() {
        let normalizer = RecordNormalizer::new(comuni());
        let entity = normalizer.normalize(&ponte_a_sieve()).unwrap();

        assert_eq!(entity.name, "Scuola Primaria Ponte a Sieve");
        assert_eq!(entity.email, "fiee123@istruzione.it");
        assert_eq!(entity.school_year, "2018");
        assert_eq!(entity.city_name, "Ponte a Sieve");
        assert!(!entity.is_geolocated());
        assert!(entity.parent_school.is_none());
        assert!(entity.debug.is_none());
    }

    #[test]
    fn test_town_named_school_without_type() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let raw = record(&[
            ("CODICESCUOLA", "ARAA00300R"),
            ("DENOMINAZIONESCUOLA", "BUCINE"),
            ("DESCRIZIONECOMUNE", "BUCINE"),
        ]);
        let entity = normalizer.normalize(&raw).unwrap();

        assert_eq!(entity.name, "Scuola BUCINE");
        assert_eq!(entity.city_name, "BUCINE");
        assert_ne!(entity.name, entity.city_name);
        assert!(entity.school_type.is_empty());

        let blank = normalizer
            .normalize(&record(&[("CODICESCUOLA", "ARAA00400T")]))
            .unwrap();
        assert_eq!(blank.name, "Scuola");
        assert_ne!(blank.name, blank.city_name);
    }

    #[test]
    fn test_custom_institutional_domain() {
        let config = NormalizeConfig::default().institutional_domain("scuole.example");
        let normalizer = RecordNormalizer::with_config(NoGeoLookup, config);
        let entity = normalizer.normalize(&ponte_a_sieve()).unwrap();
        assert_eq!(entity.email, "fiee123@scuole.example");
    }

    #[test]
    fn test_geo_enrichment_overwrites_city() {
        let normalizer = RecordNormalizer::new(comuni());
        let raw = record(&[
            ("CODICESCUOLA", "FIEE853021"),
            ("DENOMINAZIONESCUOLA", "SCUOLA PRIMARIA CARDUCCI"),
            ("DESCRIZIONETIPOLOGIAGRADOISTRUZIONESCUOLA", "SCUOLA PRIMARIA"),
            ("DESCRIZIONECOMUNE", "FIRENZE"),
            ("CODICECOMUNESCUOLA", "D612"),
            ("INDIRIZZOEMAILSCUOLA", "fiee853021@istruzione.it"),
        ]);
        let entity = normalizer.normalize(&raw).unwrap();

        assert_eq!(entity.name, "CARDUCCI");
        assert_eq!(entity.city_name, "Firenze");
        assert_eq!(entity.city_id.as_deref(), Some("048017"));
        assert_eq!(entity.nuts3_code.as_deref(), Some("ITI14"));
        assert_eq!(entity.province_abbr.as_deref(), Some("FI"));
        assert_eq!(entity.region_name.as_deref(), Some("Toscana"));
    }

    #[test]
    fn test_unknown_or_missing_cadastral_code_keeps_raw_city() {
        let normalizer = RecordNormalizer::new(comuni());
        for code in ["Z999", "", "Non Disponibile"] {
            let raw = record(&[
                ("CODICESCUOLA", "ARAA00200Q"),
                ("DENOMINAZIONESCUOLA", "SAN LEOLINO"),
                ("DESCRIZIONECOMUNE", "BUCINE"),
                ("CODICECOMUNESCUOLA", code),
            ]);
            let entity = normalizer.normalize(&raw).unwrap();
            assert_eq!(entity.city_name, "BUCINE");
            assert!(entity.city_id.is_none());
            assert!(entity.nuts3_code.is_none());
            assert!(entity.province_abbr.is_none());
            assert!(entity.region_name.is_none());
        }
    }

    #[test]
    fn test_parent_school() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let with_parent = record(&[
            ("CODICESCUOLA", "FIEE853021"),
            ("CODICEISTITUTORIFERIMENTO", "FIIC853009"),
            ("DENOMINAZIONEISTITUTORIFERIMENTO", "COMPAGNI - CARDUCCI"),
        ]);
        assert_eq!(
            normalizer.normalize(&with_parent).unwrap().parent_school,
            Some(ParentSchool {
                id: "FIIC853009".to_string(),
                name: "COMPAGNI - CARDUCCI".to_string(),
            })
        );

        let self_parent = record(&[
            ("CODICESCUOLA", "FIIC853009"),
            ("CODICEISTITUTORIFERIMENTO", "FIIC853009"),
            ("DENOMINAZIONEISTITUTORIFERIMENTO", "COMPAGNI - CARDUCCI"),
        ]);
        assert!(normalizer.normalize(&self_parent).unwrap().parent_school.is_none());

        let unavailable_parent = record(&[
            ("CODICESCUOLA", "FIEE853021"),
            ("CODICEISTITUTORIFERIMENTO", "Non Disponibile"),
        ]);
        assert!(
            normalizer
                .normalize(&unavailable_parent)
                .unwrap()
                .parent_school
                .is_none()
        );
    }

    #[test]
    fn test_unavailable_markers_become_empty() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let raw = record(&[
            ("CODICESCUOLA", "FIEE853021"),
            ("INDIRIZZOPECSCUOLA", "Non Disponibile"),
            ("SITOWEBSCUOLA", "Non disponibile"),
            ("INDIRIZZOEMAILSCUOLA", "Non Disponibile"),
        ]);
        let entity = normalizer.normalize(&raw).unwrap();
        assert!(entity.certified_email.is_empty());
        assert!(entity.website.is_empty());
        assert_eq!(entity.email, "fiee853021@istruzione.it");
    }

    #[test]
    fn test_missing_id_is_a_caller_error() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let err = normalizer
            .normalize(&record(&[("DENOMINAZIONESCUOLA", "CARDUCCI")]))
            .unwrap_err();
        assert_eq!(err, NormalizeError::MissingField { field: fields::ID });
        assert!(err.to_string().contains("CODICESCUOLA"));
    }

    #[test]
    fn test_debug_mode_keeps_inputs() {
        let normalizer =
            RecordNormalizer::with_config(comuni(), NormalizeConfig::default().debug(true));
        let raw = record(&[("CODICESCUOLA", "FIIC853009"), ("CODICECOMUNESCUOLA", "D612")]);
        let entity = normalizer.normalize(&raw).unwrap();

        let debug = entity.debug.expect("debug info requested");
        assert_eq!(debug.raw_record, raw);
        assert_eq!(debug.location.map(|l| l.name).as_deref(), Some("Firenze"));
    }

    #[test]
    fn test_bare_field_names_are_accepted() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let raw: RawRecord = [
            ("CODICESCUOLA", json!("FIEE123")),
            ("DENOMINAZIONESCUOLA", json!("Scuola Primaria Ponte a Sieve")),
            (
                "DESCRIZIONETIPOLOGIAGRADOISTRUZIONESCUOLA",
                json!("Scuola Primaria"),
            ),
            ("DESCRIZIONECOMUNE", json!("Ponte a Sieve")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            normalizer.normalize(&raw).unwrap().name,
            "Scuola Primaria Ponte a Sieve"
        );
    }

    #[test]
    fn test_email_is_never_empty() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let records = [
            record(&[("CODICESCUOLA", "A")]),
            record(&[("CODICESCUOLA", "")]),
            record(&[("CODICESCUOLA", "B"), ("INDIRIZZOEMAILSCUOLA", "  ")]),
            record(&[("CODICESCUOLA", "C"), ("INDIRIZZOEMAILSCUOLA", "c@example.org")]),
        ];
        for entity in normalizer.normalize_all(&records) {
            assert!(!entity.unwrap().email.is_empty());
        }
    }

    #[test]
    fn test_normalize_all_keeps_order() {
        let normalizer = RecordNormalizer::new(NoGeoLookup);
        let records: Vec<_> = (0..50)
            .map(|i| record(&[("CODICESCUOLA", format!("ID{i:03}").as_str())]))
            .collect();
        let ids: Vec<_> = normalizer
            .normalize_all(&records)
            .into_iter()
            .map(|r| r.unwrap().id)
            .collect();
        let expected: Vec<_> = (0..50).map(|i| format!("ID{i:03}")).collect();
        assert_eq!(ids, expected);
    }
}
