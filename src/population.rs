// 🧩 Population Gap-Filler - resolve footprints nothing matched
//
// The reference values come from the footprints of the most frequent building
// type only: median year and floors, most frequent heating and hot water codes.

use crate::codes::{BuildingType, SupplyCode};
use crate::error::{MapperError, MapperResult};
use crate::reducer::{BuildingRecord, OccupancyMix};
use crate::stats::{mode, truncated_median};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationReference {
    pub dominant_type: BuildingType,
    pub construction_year: i32,
    pub number_floors: u32,
    pub heating_code: SupplyCode,
    pub hot_water_code: SupplyCode,

    /// Footprints of the dominant type the values were computed from
    pub sample_size: usize,
}

impl PopulationReference {
    pub fn from_records(records: &[BuildingRecord]) -> MapperResult<Self> {
        let dominant_type = mode(records.iter().filter_map(|r| r.building_type)).ok_or_else(|| {
            MapperError::NoPopulationReference(
                "no footprint has a building type to take statistics from".to_string(),
            )
        })?;

        let subset: Vec<&BuildingRecord> = records
            .iter()
            .filter(|r| r.building_type == Some(dominant_type))
            .collect();

        let missing = |field: &str| {
            MapperError::NoPopulationReference(format!(
                "no {} footprint has a {}",
                dominant_type, field
            ))
        };

        let years: Vec<f64> = subset
            .iter()
            .filter_map(|r| r.construction_year)
            .map(f64::from)
            .collect();
        let floors: Vec<f64> = subset
            .iter()
            .filter_map(|r| r.number_floors)
            .map(f64::from)
            .collect();

        let construction_year =
            truncated_median(&years).ok_or_else(|| missing("construction year"))? as i32;
        let number_floors =
            truncated_median(&floors).ok_or_else(|| missing("floor count"))?.max(0) as u32;
        let heating_code = mode(subset.iter().filter_map(|r| r.heating_code))
            .ok_or_else(|| missing("heating code"))?;
        let hot_water_code = mode(subset.iter().filter_map(|r| r.hot_water_code))
            .ok_or_else(|| missing("hot water code"))?;

        let reference = PopulationReference {
            dominant_type,
            construction_year,
            number_floors,
            heating_code,
            hot_water_code,
            sample_size: subset.len(),
        };
        info!(
            dominant_type = %reference.dominant_type,
            construction_year = reference.construction_year,
            number_floors = reference.number_floors,
            heating = %reference.heating_code,
            hot_water = %reference.hot_water_code,
            sample_size = reference.sample_size,
            "population reference"
        );

        Ok(reference)
    }
}

// ============================================================================
// RESOLVED BUILDING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Values come from this many registry points
    Matched { records: usize },

    /// No registry point matched; values are the population reference
    PopulationFilled,
}

/// Fully resolved per-footprint record. No field can be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBuilding {
    pub name: String,
    pub construction_year: i32,
    pub number_floors: u32,
    pub building_type: BuildingType,
    pub occupancy: OccupancyMix,
    pub heating_code: SupplyCode,
    pub hot_water_code: SupplyCode,
    pub resolution: Resolution,
    pub matched_ids: Vec<String>,
}

impl ResolvedBuilding {
    fn resolve(record: BuildingRecord, reference: &PopulationReference) -> Self {
        let resolution = if record.is_matched() {
            Resolution::Matched {
                records: record.matched_ids.len(),
            }
        } else {
            Resolution::PopulationFilled
        };

        ResolvedBuilding {
            name: record.name,
            construction_year: record
                .construction_year
                .unwrap_or(reference.construction_year),
            number_floors: record.number_floors.unwrap_or(reference.number_floors),
            building_type: record.building_type.unwrap_or(reference.dominant_type),
            occupancy: record
                .occupancy
                .unwrap_or_else(|| OccupancyMix::single(reference.dominant_type)),
            heating_code: record.heating_code.unwrap_or(reference.heating_code),
            hot_water_code: record.hot_water_code.unwrap_or(reference.hot_water_code),
            resolution,
            matched_ids: record.matched_ids,
        }
    }
}

/// Apply the population reference to every unset field.
pub fn fill_gaps(records: Vec<BuildingRecord>) -> MapperResult<(Vec<ResolvedBuilding>, PopulationReference)> {
    let reference = PopulationReference::from_records(&records)?;

    let resolved: Vec<ResolvedBuilding> = records
        .into_iter()
        .map(|r| ResolvedBuilding::resolve(r, &reference))
        .collect();

    let filled = resolved
        .iter()
        .filter(|r| r.resolution == Resolution::PopulationFilled)
        .count();
    info!(filled, total = resolved.len(), "filled unmatched footprints");

    Ok((resolved, reference))
}
