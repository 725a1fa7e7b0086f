use std::path::Path;

use polars::prelude::*;
use scuole_data_processing::{
    SchoolData, TableMetadata,
    processed::{load_metadata, save_frame},
};
use tracing::{debug, instrument};

use super::{CandidateError, CandidateSource};
use crate::{ParentSchool, SchoolEntity};

/// Column names of the persisted school table.
pub mod columns {
    pub const ID: &str = "id";
    pub const REFERENCE_ID: &str = "reference_id";
    pub const SCHOOL_YEAR: &str = "school_year";
    pub const SCHOOL_TYPE: &str = "school_type";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const CERTIFIED_EMAIL: &str = "certified_email";
    pub const WEBSITE: &str = "website";
    pub const ADDRESS: &str = "address";
    pub const POSTCODE: &str = "postcode";
    pub const CAD_CODE: &str = "cad_code";
    pub const CITY_NAME: &str = "city_name";
    pub const CITY_ID: &str = "city_id";
    pub const NUTS3_CODE: &str = "nuts3_code";
    pub const PROVINCE_ABBR: &str = "province_abbr";
    pub const REGION_NAME: &str = "region_name";
    pub const PARENT_ID: &str = "parent_id";
    pub const PARENT_NAME: &str = "parent_name";

    /// Every column, in table order.
    pub const ALL: [&str; 18] = [
        ID,
        REFERENCE_ID,
        SCHOOL_YEAR,
        SCHOOL_TYPE,
        NAME,
        EMAIL,
        CERTIFIED_EMAIL,
        WEBSITE,
        ADDRESS,
        POSTCODE,
        CAD_CODE,
        CITY_NAME,
        CITY_ID,
        NUTS3_CODE,
        PROVINCE_ABBR,
        REGION_NAME,
        PARENT_ID,
        PARENT_NAME,
    ];
}

/// The school catalog as a columnar table.
///
/// One row per [`SchoolEntity`]. Optional fields are nullable columns, the
/// parent school is flattened into `parent_id`/`parent_name` and debug
/// information is never stored.
#[derive(Debug, Clone)]
pub struct SchoolTable {
    data: SchoolData,
}

impl SchoolTable {
    /// Build a table from normalized entities, keeping their order.
    pub fn from_entities(entities: &[SchoolEntity]) -> PolarsResult<Self> {
        let df = DataFrame::new(vec![
            Column::new(columns::ID.into(), text_values(entities, |e| &e.id)),
            Column::new(columns::REFERENCE_ID.into(), text_values(entities, |e| &e.reference_id)),
            Column::new(columns::SCHOOL_YEAR.into(), text_values(entities, |e| &e.school_year)),
            Column::new(columns::SCHOOL_TYPE.into(), text_values(entities, |e| &e.school_type)),
            Column::new(columns::NAME.into(), text_values(entities, |e| &e.name)),
            Column::new(columns::EMAIL.into(), text_values(entities, |e| &e.email)),
            Column::new(
                columns::CERTIFIED_EMAIL.into(),
                text_values(entities, |e| &e.certified_email),
            ),
            Column::new(columns::WEBSITE.into(), text_values(entities, |e| &e.website)),
            Column::new(columns::ADDRESS.into(), text_values(entities, |e| &e.address)),
            Column::new(columns::POSTCODE.into(), text_values(entities, |e| &e.postcode)),
            Column::new(columns::CAD_CODE.into(), text_values(entities, |e| &e.cad_code)),
            Column::new(columns::CITY_NAME.into(), text_values(entities, |e| &e.city_name)),
            Column::new(
                columns::CITY_ID.into(),
                optional_values(entities, |e| e.city_id.as_deref()),
            ),
            Column::new(
                columns::NUTS3_CODE.into(),
                optional_values(entities, |e| e.nuts3_code.as_deref()),
            ),
            Column::new(
                columns::PROVINCE_ABBR.into(),
                optional_values(entities, |e| e.province_abbr.as_deref()),
            ),
            Column::new(
                columns::REGION_NAME.into(),
                optional_values(entities, |e| e.region_name.as_deref()),
            ),
            Column::new(
                columns::PARENT_ID.into(),
                optional_values(entities, |e| e.parent_school.as_ref().map(|p| p.id.as_str())),
            ),
            Column::new(
                columns::PARENT_NAME.into(),
                optional_values(entities, |e| e.parent_school.as_ref().map(|p| p.name.as_str())),
            ),
        ])?;
        Ok(Self {
            data: SchoolData::from_frame(df),
        })
    }

    /// Open a table persisted with [`SchoolTable::save`].
    ///
    /// Fails right away when the file is missing or unreadable. The rows are
    /// read on first use.
    pub fn open(path: &Path) -> scuole_data_processing::Result<Self> {
        Ok(Self {
            data: SchoolData::open(path)?,
        })
    }

    /// Write the table as Parquet together with its metadata sidecar.
    pub fn save(&self, path: &Path) -> scuole_data_processing::Result<TableMetadata> {
        let mut df = self.data.frame()?.clone();
        save_frame(&mut df, path, "scuole catalog")
    }

    /// Metadata of the file backing this table, if it has one.
    pub fn metadata(&self) -> scuole_data_processing::Result<Option<TableMetadata>> {
        self.data.path().map(load_metadata).transpose()
    }

    pub fn frame(&self) -> scuole_data_processing::Result<&DataFrame> {
        self.data.frame()
    }

    pub fn len(&self) -> scuole_data_processing::Result<usize> {
        Ok(self.frame()?.height())
    }

    pub fn is_empty(&self) -> scuole_data_processing::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every school in the table, in storage order.
    #[instrument(name = "All schools", level = "debug", skip_all)]
    pub fn all_schools(&self) -> Result<Vec<SchoolEntity>, CandidateError> {
        Ok(entities_from_df(self.frame()?)?)
    }
}

fn text_values<'a>(entities: &'a [SchoolEntity], f: fn(&SchoolEntity) -> &str) -> Vec<&'a str> {
    entities.iter().map(f).collect()
}

fn optional_values<'a>(
    entities: &'a [SchoolEntity],
    f: fn(&SchoolEntity) -> Option<&str>,
) -> Vec<Option<&'a str>> {
    entities.iter().map(f).collect()
}

/// Case-insensitive literal containment of any token in the name or city.
fn token_filter(tokens: &[String]) -> Option<Expr> {
    tokens
        .iter()
        .flat_map(|token| {
            let token = token.to_lowercase();
            [columns::NAME, columns::CITY_NAME].map(|column| {
                col(column)
                    .str()
                    .to_lowercase()
                    .str()
                    .contains_literal(lit(token.clone()))
            })
        })
        .reduce(|acc, expr| acc.or(expr))
}

impl CandidateSource for SchoolTable {
    #[instrument(
        name = "Table candidates",
        level = "debug",
        skip_all,
        fields(tokens = tokens.len())
    )]
    fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<SchoolEntity>, CandidateError> {
        let Some(filter) = token_filter(tokens) else {
            return Ok(Vec::new());
        };
        let t_query = std::time::Instant::now();
        let df = self.data.lazy()?.filter(filter).collect()?;
        debug!(
            candidates = df.height(),
            elapsed = ?t_query.elapsed(),
            "Retrieved candidates"
        );
        Ok(entities_from_df(&df)?)
    }
}

fn text_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| value.map(ToString::to_string))
        .collect())
}

/// Rebuild entities from a frame laid out like [`columns::ALL`].
fn entities_from_df(df: &DataFrame) -> PolarsResult<Vec<SchoolEntity>> {
    let mut cols = columns::ALL
        .iter()
        .map(|name| text_column(df, name))
        .collect::<PolarsResult<Vec<_>>>()?
        .into_iter()
        .map(Vec::into_iter)
        .collect::<Vec<_>>();

    let entities = (0..df.height())
        .map(|_| {
            let mut next = cols.iter_mut().map(|c| c.next().flatten());
            let mut text = || next.next().flatten().unwrap_or_default();
            let id = text();
            let reference_id = text();
            let school_year = text();
            let school_type = text();
            let name = text();
            let email = text();
            let certified_email = text();
            let website = text();
            let address = text();
            let postcode = text();
            let cad_code = text();
            let city_name = text();
            let mut optional = || next.next().flatten();
            let city_id = optional();
            let nuts3_code = optional();
            let province_abbr = optional();
            let region_name = optional();
            let parent_id = optional();
            let parent_name = optional();
            SchoolEntity {
                id,
                reference_id,
                school_year,
                school_type,
                name,
                email,
                certified_email,
                website,
                address,
                postcode,
                cad_code,
                city_name,
                city_id,
                nuts3_code,
                province_abbr,
                region_name,
                parent_school: parent_id.map(|id| ParentSchool {
                    id,
                    name: parent_name.unwrap_or_default(),
                }),
                debug: None,
            }
        })
        .collect();
    debug!(rows = df.height(), "Converted table rows to schools");
    Ok(entities)
}
