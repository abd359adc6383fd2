// 🧮 Record Reducer - N matched registry points → one record per footprint
//
// Newest year and tallest floor count win. Type, heating and hot water are
// decided by gross floor area (area × floors) summed per group.

use crate::codes::{BuildingType, SupplyCode};
use crate::stats::{group_sums, round5, weighted_argmax};
use crate::translate::TranslatedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// At most this many occupancy types are kept per building.
pub const MAX_OCCUPANCY_ENTRIES: usize = 3;

// ============================================================================
// OCCUPANCY MIX
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancyEntry {
    pub building_type: BuildingType,
    pub ratio: f64,
}

/// Up to three occupancy entries, descending by ratio, summing to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyMix {
    entries: Vec<OccupancyEntry>,
}

impl OccupancyMix {
    pub fn single(building_type: BuildingType) -> Self {
        OccupancyMix {
            entries: vec![OccupancyEntry {
                building_type,
                ratio: 1.0,
            }],
        }
    }

    /// Area share per type. Shares are rounded to 5 decimals, the top three
    /// kept, and the last kept share absorbs the remainder so the sum is
    /// exactly 1.0.
    pub fn from_areas<I>(areas: I) -> Option<Self>
    where
        I: IntoIterator<Item = (BuildingType, f64)>,
    {
        let sums = group_sums(areas);
        let total: f64 = sums.values().sum();
        if sums.is_empty() || !(total > 0.0) {
            return None;
        }

        if sums.len() == 1 {
            let (building_type, _) = sums.into_iter().next()?;
            return Some(OccupancyMix::single(building_type));
        }

        let mut ranked: Vec<(OccupancyEntry, f64)> = sums
            .into_iter()
            .map(|(building_type, area)| {
                let entry = OccupancyEntry {
                    building_type,
                    ratio: round5(area / total),
                };
                (entry, area)
            })
            .collect();

        // Descending share; equal rounded shares fall back to raw area, then label
        ranked.sort_by(|(a, a_area), (b, b_area)| {
            b.ratio
                .total_cmp(&a.ratio)
                .then(b_area.total_cmp(a_area))
                .then(a.building_type.cmp(&b.building_type))
        });
        ranked.truncate(MAX_OCCUPANCY_ENTRIES);
        let mut entries: Vec<OccupancyEntry> = ranked.into_iter().map(|(entry, _)| entry).collect();

        let head: f64 = entries[..entries.len() - 1].iter().map(|e| e.ratio).sum();
        if let Some(last) = entries.last_mut() {
            last.ratio = round5(1.0 - head);
        }

        Some(OccupancyMix { entries })
    }

    pub fn entries(&self) -> &[OccupancyEntry] {
        &self.entries
    }

    pub fn dominant(&self) -> BuildingType {
        self.entries[0].building_type
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.ratio).sum()
    }
}

impl fmt::Display for OccupancyMix {
    /// `MULTI_RES:0.75;RETAIL:0.25`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}:{}", e.building_type, e.ratio))
            .collect();
        f.write_str(&parts.join(";"))
    }
}

// ============================================================================
// BUILDING RECORD
// ============================================================================

/// Reduction output for one footprint. Fields are `None` only when nothing
/// matched; the gap filler resolves those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub name: String,
    pub construction_year: Option<i32>,
    pub number_floors: Option<u32>,
    pub building_type: Option<BuildingType>,
    pub occupancy: Option<OccupancyMix>,
    pub heating_code: Option<SupplyCode>,
    pub hot_water_code: Option<SupplyCode>,

    /// Federal ids of the matched registry points
    pub matched_ids: Vec<String>,
}

impl BuildingRecord {
    pub fn unmatched(name: impl Into<String>) -> Self {
        BuildingRecord {
            name: name.into(),
            construction_year: None,
            number_floors: None,
            building_type: None,
            occupancy: None,
            heating_code: None,
            hot_water_code: None,
            matched_ids: Vec::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        !self.matched_ids.is_empty()
    }
}

/// Collapse the matched records of one footprint into one record.
pub fn reduce(name: &str, matches: &[&TranslatedRecord]) -> BuildingRecord {
    match matches {
        [] => BuildingRecord::unmatched(name),
        [only] => BuildingRecord {
            name: name.to_string(),
            construction_year: Some(only.record.construction_year),
            number_floors: Some(only.record.number_floors),
            building_type: Some(only.building_type),
            occupancy: Some(OccupancyMix::single(only.building_type)),
            heating_code: Some(only.heating.code),
            hot_water_code: Some(only.hot_water.code),
            matched_ids: vec![only.record.federal_id.clone()],
        },
        many => reduce_many(name, many),
    }
}

fn reduce_many(name: &str, matches: &[&TranslatedRecord]) -> BuildingRecord {
    let construction_year = matches.iter().map(|r| r.record.construction_year).max();
    let number_floors = matches.iter().map(|r| r.record.number_floors).max();

    let mut areas: Vec<f64> = matches.iter().map(|r| r.gross_floor_area()).collect();
    // All-zero floor area (zero floors everywhere): weigh each record equally
    if !(areas.iter().sum::<f64>() > 0.0) {
        areas = vec![1.0; matches.len()];
    }

    let type_areas: Vec<(BuildingType, f64)> = matches
        .iter()
        .zip(&areas)
        .map(|(r, area)| (r.building_type, *area))
        .collect();

    // First occupancy slot and building type always agree
    let occupancy = OccupancyMix::from_areas(type_areas);
    let building_type = occupancy.as_ref().map(OccupancyMix::dominant);
    let heating_code = weighted_argmax(
        matches.iter().zip(&areas).map(|(r, area)| (r.heating.code, *area)),
    );
    let hot_water_code = weighted_argmax(
        matches.iter().zip(&areas).map(|(r, area)| (r.hot_water.code, *area)),
    );

    BuildingRecord {
        name: name.to_string(),
        construction_year,
        number_floors,
        building_type,
        occupancy,
        heating_code,
        hot_water_code,
        matched_ids: matches.iter().map(|r| r.record.federal_id.clone()).collect(),
    }
}
