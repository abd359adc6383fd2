// 🗂️ Registry Loader - GWR extract → cleaned RegistryRecord set
//
// The extract is tab separated with a fixed column layout. Header names in the
// file are never trusted: columns are addressed by position.

use crate::error::{MapperError, MapperResult};
use crate::stats::truncated_median;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Positional column names of the federal building registry extract.
pub const GWR_HEADERS: [&str; 49] = [
    "federal_id",
    "official_building_number",
    "building_designation",
    "e_coordinate",
    "n_coordinate",
    "coordinate_origin",
    "local_code_1",
    "local_code_2",
    "local_code_3",
    "local_code_4",
    "quarter",
    "building_status",
    "building_category",
    "building_class",
    "construction_year",
    "construction_month",
    "construction_year_month",
    "construction_period",
    "renovation_year",
    "demolition_year",
    "building_area",
    "building_volume",
    "building_volume_source",
    "building_volume_norm",
    "number_floors",
    "number_living_rooms",
    "civil_defence_room",
    "energy_reference_area",
    "heating_tech_1",
    "heating_source_1",
    "heating_info_source_1",
    "heating_update_date_1",
    "heating_tech_2",
    "heating_source_2",
    "heating_info_source_2",
    "heating_update_date_2",
    "hot_water_tech_1",
    "hot_water_source_1",
    "hot_water_info_source_1",
    "hot_water_update_date_1",
    "hot_water_tech_2",
    "hot_water_source_2",
    "hot_water_info_source_2",
    "hot_water_update_date_2",
    "create_date",
    "update_date",
    "district_number",
    "district_name",
    "canton",
];

/// Indices of the projected columns in `GWR_HEADERS`.
pub mod col {
    pub const FEDERAL_ID: usize = 0;
    pub const E_COORDINATE: usize = 3;
    pub const N_COORDINATE: usize = 4;
    pub const BUILDING_STATUS: usize = 11;
    pub const BUILDING_CATEGORY: usize = 12;
    pub const BUILDING_CLASS: usize = 13;
    pub const CONSTRUCTION_YEAR: usize = 14;
    pub const BUILDING_AREA: usize = 20;
    pub const NUMBER_FLOORS: usize = 24;
    pub const HEATING_TECH_1: usize = 28;
    pub const HEATING_SOURCE_1: usize = 29;
    pub const HEATING_TECH_2: usize = 32;
    pub const HEATING_SOURCE_2: usize = 33;
    pub const HOT_WATER_TECH_1: usize = 36;
    pub const HOT_WATER_SOURCE_1: usize = 37;
    pub const HOT_WATER_TECH_2: usize = 40;
    pub const HOT_WATER_SOURCE_2: usize = 41;
    pub const DISTRICT_NUMBER: usize = 46;
    pub const DISTRICT_NAME: usize = 47;
    pub const CANTON: usize = 48;
}

// ============================================================================
// RECORD
// ============================================================================

/// A raw (heat generator, energy source) code pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePair {
    pub tech: Option<u32>,
    pub source: Option<u32>,
}

/// One existing building point from the registry, after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Federal building identifier (EGID)
    pub federal_id: String,

    /// LV95 easting
    pub e: f64,

    /// LV95 northing
    pub n: f64,

    pub status: u32,
    pub category: Option<u32>,
    pub class: Option<u32>,

    /// Imputed with the dataset median when missing
    pub construction_year: i32,

    /// Imputed with the dataset median when missing
    pub number_floors: u32,

    /// Footprint area in m², absent for many records
    pub building_area: Option<f64>,

    pub heating_1: CodePair,
    pub heating_2: CodePair,
    pub hot_water_1: CodePair,
    pub hot_water_2: CodePair,

    pub district_number: Option<u32>,
    pub district_name: Option<String>,
    pub canton: Option<String>,
}

/// Row as read, before imputation.
#[derive(Debug, Clone)]
struct RawRow {
    federal_id: String,
    e: f64,
    n: f64,
    status: u32,
    category: Option<u32>,
    class: Option<u32>,
    construction_year: Option<f64>,
    number_floors: Option<f64>,
    building_area: Option<f64>,
    heating_1: CodePair,
    heating_2: CodePair,
    hot_water_1: CodePair,
    hot_water_2: CodePair,
    district_number: Option<u32>,
    district_name: Option<String>,
    canton: Option<String>,
}

// ============================================================================
// LOAD STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub dropped_missing_id: usize,
    pub dropped_missing_coordinates: usize,
    pub dropped_not_existing: usize,
    pub dropped_duplicate_id: usize,
    pub imputed_years: usize,
    pub imputed_floors: usize,
    pub kept: usize,
}

impl LoadStats {
    pub fn summary(&self) -> String {
        format!(
            "Registry: {} rows read, {} kept (dropped: {} no id, {} no coordinates, {} not existing, {} duplicate id; imputed: {} years, {} floors)",
            self.rows_read,
            self.kept,
            self.dropped_missing_id,
            self.dropped_missing_coordinates,
            self.dropped_not_existing,
            self.dropped_duplicate_id,
            self.imputed_years,
            self.imputed_floors
        )
    }
}

// ============================================================================
// LOADER
// ============================================================================

pub struct RegistryLoader {
    /// Status value that marks an existing building
    pub existing_status_code: u32,

    /// Skip the first line (its names are replaced by `GWR_HEADERS`)
    pub has_header: bool,
}

impl RegistryLoader {
    pub fn new(existing_status_code: u32) -> Self {
        RegistryLoader {
            existing_status_code,
            has_header: true,
        }
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> MapperResult<(Vec<RegistryRecord>, LoadStats)> {
        let file = File::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "reading registry extract");
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> MapperResult<(Vec<RegistryRecord>, LoadStats)> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(self.has_header)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut stats = LoadStats::default();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result?;
            stats.rows_read += 1;

            let field = |idx: usize| record.get(idx).map(str::trim).filter(|v| !v.is_empty());

            let federal_id = match field(col::FEDERAL_ID) {
                Some(id) => id.to_string(),
                None => {
                    stats.dropped_missing_id += 1;
                    continue;
                }
            };

            let (e, n) = match (
                field(col::E_COORDINATE).and_then(parse_number),
                field(col::N_COORDINATE).and_then(parse_number),
            ) {
                (Some(e), Some(n)) => (e, n),
                _ => {
                    stats.dropped_missing_coordinates += 1;
                    continue;
                }
            };

            let status = field(col::BUILDING_STATUS).and_then(parse_code);
            let status = match status {
                Some(code) if code == self.existing_status_code => code,
                _ => {
                    stats.dropped_not_existing += 1;
                    continue;
                }
            };

            if !seen_ids.insert(federal_id.clone()) {
                debug!(federal_id = %federal_id, "duplicate federal id, keeping first");
                stats.dropped_duplicate_id += 1;
                continue;
            }

            let pair = |tech: usize, source: usize| CodePair {
                tech: field(tech).and_then(parse_code),
                source: field(source).and_then(parse_code),
            };

            rows.push(RawRow {
                federal_id,
                e,
                n,
                status,
                category: field(col::BUILDING_CATEGORY).and_then(parse_code),
                class: field(col::BUILDING_CLASS).and_then(parse_code),
                construction_year: field(col::CONSTRUCTION_YEAR).and_then(parse_number),
                number_floors: field(col::NUMBER_FLOORS).and_then(parse_number),
                building_area: field(col::BUILDING_AREA).and_then(parse_number),
                heating_1: pair(col::HEATING_TECH_1, col::HEATING_SOURCE_1),
                heating_2: pair(col::HEATING_TECH_2, col::HEATING_SOURCE_2),
                hot_water_1: pair(col::HOT_WATER_TECH_1, col::HOT_WATER_SOURCE_1),
                hot_water_2: pair(col::HOT_WATER_TECH_2, col::HOT_WATER_SOURCE_2),
                district_number: field(col::DISTRICT_NUMBER).and_then(parse_code),
                district_name: field(col::DISTRICT_NAME).map(str::to_string),
                canton: field(col::CANTON).map(str::to_string),
            });
        }

        let records = impute(rows, &mut stats)?;
        stats.kept = records.len();

        if records.is_empty() {
            warn!("registry extract has no usable rows");
        }
        info!("{}", stats.summary());

        Ok((records, stats))
    }
}

/// Fill missing construction year and floor count with the dataset median.
fn impute(rows: Vec<RawRow>, stats: &mut LoadStats) -> MapperResult<Vec<RegistryRecord>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let years: Vec<f64> = rows.iter().filter_map(|r| r.construction_year).collect();
    let floors: Vec<f64> = rows.iter().filter_map(|r| r.number_floors).collect();

    let median_year = truncated_median(&years);
    let median_floors = truncated_median(&floors);

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let construction_year = match row.construction_year {
            Some(year) => year.trunc() as i32,
            None => {
                stats.imputed_years += 1;
                median_year.ok_or_else(|| {
                    MapperError::NoPopulationReference(
                        "no registry record has a construction year".to_string(),
                    )
                })? as i32
            }
        };

        let number_floors = match row.number_floors {
            Some(floors) => floors.trunc().max(0.0) as u32,
            None => {
                stats.imputed_floors += 1;
                median_floors.ok_or_else(|| {
                    MapperError::NoPopulationReference(
                        "no registry record has a floor count".to_string(),
                    )
                })?
                .max(0) as u32
            }
        };

        records.push(RegistryRecord {
            federal_id: row.federal_id,
            e: row.e,
            n: row.n,
            status: row.status,
            category: row.category,
            class: row.class,
            construction_year,
            number_floors,
            building_area: row.building_area,
            heating_1: row.heating_1,
            heating_2: row.heating_2,
            hot_water_1: row.hot_water_1,
            hot_water_2: row.hot_water_2,
            district_number: row.district_number,
            district_name: row.district_name,
            canton: row.canton,
        });
    }

    Ok(records)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Codes are integers but some exports write them as `1004.0`.
fn parse_code(raw: &str) -> Option<u32> {
    let value = parse_number(raw)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
