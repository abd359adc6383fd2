// 🏛️ Typology Generator - era label + three ranked occupancy slots

use crate::config::{EraTable, OverlapPolicy};
use crate::error::MapperResult;
use crate::population::ResolvedBuilding;
use crate::reducer::{OccupancyMix, MAX_OCCUPANCY_ENTRIES};
use serde::{Deserialize, Serialize};

/// Label of an empty occupancy slot.
pub const NO_USE: &str = "NONE";

/// One (use label, ratio) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySlot {
    pub label: String,
    pub ratio: f64,
}

impl OccupancySlot {
    fn empty() -> Self {
        OccupancySlot {
            label: NO_USE.to_string(),
            ratio: 0.0,
        }
    }
}

/// Expand a mix into exactly three slots, padding with `NONE:0.0`.
pub fn occupancy_slots(mix: &OccupancyMix) -> [OccupancySlot; MAX_OCCUPANCY_ENTRIES] {
    let mut slots = [
        OccupancySlot::empty(),
        OccupancySlot::empty(),
        OccupancySlot::empty(),
    ];
    for (slot, entry) in slots.iter_mut().zip(mix.entries()) {
        slot.label = entry.building_type.as_str().to_string();
        slot.ratio = entry.ratio;
    }
    slots
}

/// Row of the building typology table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypologyRow {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "STANDARD")]
    pub standard: String,

    #[serde(rename = "YEAR")]
    pub year: i32,

    #[serde(rename = "1ST_USE")]
    pub use_1: String,

    #[serde(rename = "1ST_USE_R")]
    pub ratio_1: f64,

    #[serde(rename = "2ND_USE")]
    pub use_2: String,

    #[serde(rename = "2ND_USE_R")]
    pub ratio_2: f64,

    #[serde(rename = "3RD_USE")]
    pub use_3: String,

    #[serde(rename = "3RD_USE_R")]
    pub ratio_3: f64,

    #[serde(rename = "REFERENCE")]
    pub reference: String,
}

impl TypologyRow {
    /// Sum of the non-sentinel ratios.
    pub fn ratio_total(&self) -> f64 {
        [
            (&self.use_1, self.ratio_1),
            (&self.use_2, self.ratio_2),
            (&self.use_3, self.ratio_3),
        ]
        .iter()
        .filter(|(label, _)| label.as_str() != NO_USE)
        .map(|(_, ratio)| ratio)
        .sum()
    }
}

pub fn typology_row(
    building: &ResolvedBuilding,
    eras: &EraTable,
    policy: OverlapPolicy,
    reference: &str,
) -> MapperResult<TypologyRow> {
    let standard = eras.classify(building.construction_year, policy)?;
    let [first, second, third] = occupancy_slots(&building.occupancy);

    Ok(TypologyRow {
        name: building.name.clone(),
        standard: standard.to_string(),
        year: building.construction_year,
        use_1: first.label,
        ratio_1: first.ratio,
        use_2: second.label,
        ratio_2: second.ratio,
        use_3: third.label,
        ratio_3: third.ratio,
        reference: reference.to_string(),
    })
}

/// Typology rows in building order. The era table is validated first; a
/// year outside every range aborts the whole table.
pub fn generate_typology(
    buildings: &[ResolvedBuilding],
    eras: &EraTable,
    policy: OverlapPolicy,
    reference: &str,
) -> MapperResult<Vec<TypologyRow>> {
    eras.validate_with(policy)?;
    buildings
        .iter()
        .map(|b| typology_row(b, eras, policy, reference))
        .collect()
}
