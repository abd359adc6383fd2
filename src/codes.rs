// 🏷️ Semantic code enumerations
// Raw registry integers are mapped onto these by the tables in `config`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TECHNOLOGY
// ============================================================================

/// Heat generator technology, shared by heating and hot water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technology {
    None,
    HeatPump,
    SolarThermal,
    Boiler,
    Cogeneration,
    Resistance,
    HeatExchanger,
    Unknown,
}

impl Technology {
    /// Unknown technology carries no information and is treated as no system.
    pub fn normalized(self) -> Self {
        match self {
            Technology::Unknown => Technology::None,
            other => other,
        }
    }
}

// ============================================================================
// ENERGY SOURCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergySource {
    None,
    Air,
    Ground,
    Water,
    Gas,
    Oil,
    Coal,
    Wood,
    ExhaustHeat,
    Electricity,
    Sun,
    DistrictHeating,
    Unknown,
}

impl EnergySource {
    pub fn normalized(self) -> Self {
        match self {
            EnergySource::Unknown => EnergySource::None,
            other => other,
        }
    }
}

// ============================================================================
// BUILDING TYPE
// ============================================================================

/// Occupancy category of a building.
///
/// Variants are declared in label order, so the derived `Ord` sorts them the
/// same way their labels sort. Tie-breaks throughout the crate rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingType {
    Gym,
    Hospital,
    Hotel,
    Industrial,
    Library,
    MultiRes,
    Office,
    Parking,
    Restaurant,
    Retail,
    School,
    SingleRes,
}

impl BuildingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingType::Gym => "GYM",
            BuildingType::Hospital => "HOSPITAL",
            BuildingType::Hotel => "HOTEL",
            BuildingType::Industrial => "INDUSTRIAL",
            BuildingType::Library => "LIBRARY",
            BuildingType::MultiRes => "MULTI_RES",
            BuildingType::Office => "OFFICE",
            BuildingType::Parking => "PARKING",
            BuildingType::Restaurant => "RESTAURANT",
            BuildingType::Retail => "RETAIL",
            BuildingType::School => "SCHOOL",
            BuildingType::SingleRes => "SINGLE_RES",
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SUPPLY CODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Service {
    Heating,
    HotWater,
}

impl Service {
    fn prefix(&self) -> &'static str {
        match self {
            Service::Heating => "SUPPLY_HEATING_AS",
            Service::HotWater => "SUPPLY_HOTWATER_AS",
        }
    }
}

/// Supply system assembly, e.g. `SUPPLY_HEATING_AS6`.
///
/// Ten assemblies (0-9) exist per service; 0 means no system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SupplyCode {
    pub service: Service,
    pub assembly: u8,
}

impl SupplyCode {
    pub const MAX_ASSEMBLY: u8 = 9;

    pub fn new(service: Service, assembly: u8) -> Option<Self> {
        (assembly <= Self::MAX_ASSEMBLY).then_some(SupplyCode { service, assembly })
    }

    pub fn none(service: Service) -> Self {
        SupplyCode { service, assembly: 0 }
    }
}

impl fmt::Display for SupplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.service.prefix(), self.assembly)
    }
}

impl FromStr for SupplyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for service in [Service::Heating, Service::HotWater] {
            if let Some(rest) = s.strip_prefix(service.prefix()) {
                let assembly: u8 = rest
                    .parse()
                    .map_err(|_| format!("invalid supply assembly in '{}'", s))?;
                return SupplyCode::new(service, assembly)
                    .ok_or_else(|| format!("supply assembly out of range in '{}'", s));
            }
        }
        Err(format!("unknown supply code '{}'", s))
    }
}

impl From<SupplyCode> for String {
    fn from(code: SupplyCode) -> Self {
        code.to_string()
    }
}

impl TryFrom<String> for SupplyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
