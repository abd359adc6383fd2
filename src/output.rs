// 📤 Output tables - typology, supply systems and zone floor updates as CSV

use crate::codes::SupplyCode;
use crate::error::MapperResult;
use crate::population::ResolvedBuilding;
use crate::typology::TypologyRow;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TYPOLOGY_FILE: &str = "typology.csv";
pub const SUPPLY_FILE: &str = "supply_systems.csv";
pub const ZONE_FILE: &str = "zone_floors.csv";

/// Heating and hot water assemblies for the supply systems table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyUpdate {
    #[serde(rename = "Name")]
    pub name: String,

    pub type_hs: SupplyCode,
    pub type_dhw: SupplyCode,
}

impl From<&ResolvedBuilding> for SupplyUpdate {
    fn from(b: &ResolvedBuilding) -> Self {
        SupplyUpdate {
            name: b.name.clone(),
            type_hs: b.heating_code,
            type_dhw: b.hot_water_code,
        }
    }
}

/// Floors above ground and the height derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    #[serde(rename = "Name")]
    pub name: String,

    pub floors_ag: u32,
    pub height_ag: f64,
}

impl ZoneUpdate {
    pub fn new(b: &ResolvedBuilding, floor_height_m: f64) -> Self {
        ZoneUpdate {
            name: b.name.clone(),
            floors_ag: b.number_floors,
            height_ag: b.number_floors as f64 * floor_height_m,
        }
    }
}

/// Serialise rows as CSV with a header line.
pub fn to_csv_bytes<T: Serialize>(rows: &[T]) -> MapperResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
}

/// SHA-256 over the CSV form of all three tables.
pub fn digest_tables(
    typology: &[TypologyRow],
    supply: &[SupplyUpdate],
    zone: &[ZoneUpdate],
) -> MapperResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(to_csv_bytes(typology)?);
    hasher.update(to_csv_bytes(supply)?);
    hasher.update(to_csv_bytes(zone)?);
    Ok(format!("{:x}", hasher.finalize()))
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> MapperResult<()> {
    let bytes = to_csv_bytes(rows)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    info!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Write the three tables into `dir`, creating it if needed.
pub fn write_tables(
    dir: &Path,
    typology: &[TypologyRow],
    supply: &[SupplyUpdate],
    zone: &[ZoneUpdate],
) -> MapperResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let paths = vec![dir.join(TYPOLOGY_FILE), dir.join(SUPPLY_FILE), dir.join(ZONE_FILE)];
    write_table(&paths[0], typology)?;
    write_table(&paths[1], supply)?;
    write_table(&paths[2], zone)?;

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{BuildingType, Service};
    use crate::population::Resolution;
    use crate::reducer::OccupancyMix;

    fn building(name: &str, floors: u32) -> ResolvedBuilding {
        ResolvedBuilding {
            name: name.to_string(),
            construction_year: 1990,
            number_floors: floors,
            building_type: BuildingType::Office,
            occupancy: OccupancyMix::single(BuildingType::Office),
            heating_code: SupplyCode::new(Service::Heating, 6).unwrap(),
            hot_water_code: SupplyCode::new(Service::HotWater, 4).unwrap(),
            resolution: Resolution::Matched { records: 1 },
            matched_ids: vec!["1".to_string()],
        }
    }

    #[test]
    fn test_zone_height() {
        let zone = ZoneUpdate::new(&building("B1", 4), 3.0);
        assert_eq!(zone.floors_ag, 4);
        assert_eq!(zone.height_ag, 12.0);
    }

    #[test]
    fn test_supply_csv() {
        let supply = vec![SupplyUpdate::from(&building("B1", 2))];
        let out = String::from_utf8(to_csv_bytes(&supply).unwrap()).unwrap();

        assert_eq!(
            out,
            "Name,type_hs,type_dhw\nB1,SUPPLY_HEATING_AS6,SUPPLY_HOTWATER_AS4\n"
        );
    }

    #[test]
    fn test_digest_is_stable() {
        let supply = vec![SupplyUpdate::from(&building("B1", 2))];
        let zone = vec![ZoneUpdate::new(&building("B1", 2), 3.0)];

        let first = digest_tables(&[], &supply, &zone).unwrap();
        let second = digest_tables(&[], &supply, &zone).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let other_zone = vec![ZoneUpdate::new(&building("B1", 3), 3.0)];
        assert_ne!(first, digest_tables(&[], &supply, &other_zone).unwrap());
    }

    #[test]
    fn test_write_tables() {
        let dir = tempfile::tempdir().unwrap();
        let supply = vec![SupplyUpdate::from(&building("B1", 2))];
        let zone = vec![ZoneUpdate::new(&building("B1", 2), 3.0)];

        let paths = write_tables(&dir.path().join("out"), &[], &supply, &zone).unwrap();
        assert_eq!(paths.len(), 3);
        let zone_csv = fs::read_to_string(&paths[2]).unwrap();
        assert_eq!(zone_csv, "Name,floors_ag,height_ag\nB1,2,6.0\n");
    }
}
