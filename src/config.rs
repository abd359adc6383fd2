// ⚙️ Configuration - code tables, era ranges and run settings
//
// All five lookup tables live in one object that is built once and handed to
// the translator and the typology stage explicitly.

use crate::codes::{BuildingType, EnergySource, Technology};
use crate::error::{MapperError, MapperResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// CODE TABLES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeTables {
    /// GWR heat generator code (GWAERZH) → technology
    pub heating_tech: BTreeMap<u32, Technology>,

    /// GWR hot water generator code (GWAERZW) → technology
    pub hot_water_tech: BTreeMap<u32, Technology>,

    /// GWR energy/heat source code (GENH / GENW) → source
    pub energy_source: BTreeMap<u32, EnergySource>,

    /// GWR building class code (GKLAS) → occupancy type
    pub building_type: BTreeMap<u32, BuildingType>,

    /// Construction year → era label
    #[serde(default)]
    pub eras: EraTable,
}

impl CodeTables {
    /// Built-in tables for the Swiss federal building registry.
    pub fn swiss_gwr() -> Self {
        use Technology as T;

        let heating_tech = [
            (7400, T::None),
            (7410, T::HeatPump),
            (7411, T::HeatPump),
            (7420, T::SolarThermal),
            (7421, T::SolarThermal),
            (7430, T::Boiler),
            (7431, T::Boiler),
            (7432, T::Boiler),
            (7433, T::Boiler),
            (7434, T::Boiler),
            (7435, T::Boiler),
            (7436, T::Boiler),
            (7440, T::Cogeneration),
            (7441, T::Cogeneration),
            (7450, T::Resistance),
            (7451, T::Resistance),
            (7452, T::Resistance),
            (7460, T::HeatExchanger),
            (7461, T::HeatExchanger),
            (7499, T::Unknown),
        ];

        let hot_water_tech = [
            (7600, T::None),
            (7610, T::HeatPump),
            (7620, T::SolarThermal),
            (7630, T::Boiler),
            (7632, T::Boiler),
            (7634, T::Boiler),
            (7640, T::Cogeneration),
            (7650, T::Resistance),
            (7651, T::Resistance),
            (7660, T::HeatExchanger),
            (7699, T::Unknown),
        ];

        use EnergySource as S;
        let energy_source = [
            (7500, S::None),
            (7501, S::Air),
            (7510, S::Ground),
            (7511, S::Ground),
            (7512, S::Ground),
            (7513, S::Water),
            (7520, S::Gas),
            (7530, S::Oil),
            (7540, S::Wood),
            (7541, S::Wood),
            (7542, S::Wood),
            (7543, S::Wood),
            (7550, S::ExhaustHeat),
            (7560, S::Electricity),
            (7570, S::Sun),
            (7580, S::DistrictHeating),
            (7581, S::DistrictHeating),
            (7582, S::DistrictHeating),
            (7598, S::Unknown),
            (7599, S::Unknown),
        ];

        use BuildingType as B;
        let building_type = [
            (1110, B::SingleRes),
            (1121, B::MultiRes),
            (1122, B::MultiRes),
            (1130, B::MultiRes),
            (1211, B::Hotel),
            (1212, B::Hotel),
            (1220, B::Office),
            (1230, B::Retail),
            (1231, B::Restaurant),
            (1241, B::Parking),
            (1242, B::Parking),
            (1251, B::Industrial),
            (1252, B::Industrial),
            (1261, B::Library),
            (1262, B::Library),
            (1263, B::School),
            (1264, B::Hospital),
            (1265, B::Gym),
            (1271, B::Industrial),
            (1272, B::Library),
            (1273, B::Library),
            (1274, B::Parking),
            (1275, B::Hospital),
            (1276, B::Industrial),
            (1277, B::Industrial),
            (1278, B::Industrial),
        ];

        CodeTables {
            heating_tech: heating_tech.into_iter().collect(),
            hot_water_tech: hot_water_tech.into_iter().collect(),
            energy_source: energy_source.into_iter().collect(),
            building_type: building_type.into_iter().collect(),
            eras: EraTable::default(),
        }
    }

    /// Load tables from a JSON file. Code keys are written as strings.
    /// The era table is checked later, against the run's overlap policy.
    pub fn from_file<P: AsRef<Path>>(path: P) -> MapperResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let tables: CodeTables = serde_json::from_str(&content)?;
        Ok(tables)
    }
}

impl Default for CodeTables {
    fn default() -> Self {
        Self::swiss_gwr()
    }
}

// ============================================================================
// ERA TABLE
// ============================================================================

/// What to do when a year falls into more than one era range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Overlapping ranges are a configuration error
    #[default]
    Reject,

    /// Earliest range in table order wins
    FirstWins,
}

/// Inclusive `[start, end]` year range with its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraRange {
    #[serde(rename = "STANDARD")]
    pub label: String,

    #[serde(rename = "YEAR_START")]
    pub start: i32,

    #[serde(rename = "YEAR_END")]
    pub end: i32,
}

impl EraRange {
    pub fn new(label: impl Into<String>, start: i32, end: i32) -> Self {
        EraRange {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    fn overlaps(&self, other: &EraRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EraTable {
    ranges: Vec<EraRange>,
}

impl EraTable {
    pub fn new(ranges: Vec<EraRange>) -> Self {
        EraTable { ranges }
    }

    /// Read `STANDARD,YEAR_START,YEAR_END` rows, the standard definition
    /// sheet exported as CSV.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> MapperResult<Self> {
        let mut rdr = csv::Reader::from_path(path.as_ref())?;
        let mut ranges = Vec::new();
        for result in rdr.deserialize() {
            let range: EraRange = result?;
            ranges.push(range);
        }
        Ok(EraTable { ranges })
    }

    pub fn ranges(&self) -> &[EraRange] {
        &self.ranges
    }

    /// Check ranges are well formed and partition the year axis without gaps.
    /// Overlaps are always detected here; whether they are fatal depends on
    /// the policy used when classifying.
    pub fn validate(&self) -> MapperResult<()> {
        self.validate_with(OverlapPolicy::Reject)
    }

    pub fn validate_with(&self, policy: OverlapPolicy) -> MapperResult<()> {
        if self.ranges.is_empty() {
            return Err(MapperError::EmptyEraTable);
        }

        for range in &self.ranges {
            if range.start > range.end {
                return Err(MapperError::Config(format!(
                    "era '{}' starts after it ends ({} > {})",
                    range.label, range.start, range.end
                )));
            }
        }

        if policy == OverlapPolicy::Reject {
            for (i, first) in self.ranges.iter().enumerate() {
                for second in &self.ranges[i + 1..] {
                    if first.overlaps(second) {
                        return Err(MapperError::EraTableOverlap {
                            first: first.label.clone(),
                            second: second.label.clone(),
                        });
                    }
                }
            }
        }

        let mut sorted: Vec<&EraRange> = self.ranges.iter().collect();
        sorted.sort_by_key(|r| (r.start, r.end));
        for pair in sorted.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            // Overlapping neighbours leave no gap
            if next.start > prev.end.saturating_add(1) {
                return Err(MapperError::EraTableGap {
                    after: prev.label.clone(),
                    before: next.label.clone(),
                });
            }
        }

        Ok(())
    }

    /// Era label for a construction year.
    pub fn classify(&self, year: i32, policy: OverlapPolicy) -> MapperResult<&str> {
        let mut matches = self.ranges.iter().filter(|r| r.contains(year));

        let first = matches
            .next()
            .ok_or(MapperError::EraRangeUncovered { year })?;

        if policy == OverlapPolicy::Reject {
            let rest: Vec<&EraRange> = matches.collect();
            if !rest.is_empty() {
                let mut labels = vec![first.label.clone()];
                labels.extend(rest.iter().map(|r| r.label.clone()));
                return Err(MapperError::EraRangeAmbiguous { year, labels });
            }
        }

        Ok(&first.label)
    }
}

impl Default for EraTable {
    /// Swiss construction standards, covering years 0 to 2100.
    fn default() -> Self {
        EraTable::new(vec![
            EraRange::new("STANDARD1", 0, 1920),
            EraRange::new("STANDARD2", 1921, 1970),
            EraRange::new("STANDARD3", 1971, 1980),
            EraRange::new("STANDARD4", 1981, 2000),
            EraRange::new("STANDARD5", 2001, 2005),
            EraRange::new("STANDARD6", 2006, 2010),
            EraRange::new("STANDARD7", 2011, 2015),
            EraRange::new("STANDARD8", 2016, 2100),
        ])
    }
}

// ============================================================================
// RUN SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Registry status value for buildings that currently exist
    pub existing_status_code: u32,

    /// Planar reference system of registry coordinates (LV95)
    pub crs_epsg: u32,

    /// Storey height used to derive building height from floor count
    pub floor_height_m: f64,

    /// Provenance written into every typology row
    pub reference: String,

    pub era_overlap_policy: OverlapPolicy,

    /// Fan footprint matching out over the rayon pool
    pub parallel: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            existing_status_code: 1004,
            crs_epsg: 2056,
            floor_height_m: 3.0,
            reference: "GWR Mapper".to_string(),
            era_overlap_policy: OverlapPolicy::Reject,
            parallel: false,
        }
    }
}

impl MapperConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> MapperResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: MapperConfig = serde_json::from_str(&content)?;
        if !(config.floor_height_m > 0.0) {
            return Err(MapperError::Config(format!(
                "floor_height_m must be positive, got {}",
                config.floor_height_m
            )));
        }
        Ok(config)
    }
}
