// End-to-end: registry TSV + footprint JSON on disk → CSV tables + SQLite

use gwr_mapper::registry::col;
use gwr_mapper::store::{count_rows, get_events_for_entity};
use gwr_mapper::{
    load_footprints, save_output, setup_database, write_tables, BuildingType, CodeTables,
    MapperConfig, MapperError, Pipeline, RegistryLoader, Resolution, GWR_HEADERS,
};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

const E0: f64 = 2_600_000.0;
const N0: f64 = 1_200_000.0;

struct Row {
    cells: Vec<String>,
}

impl Row {
    fn new(id: &str, e: f64, n: f64) -> Self {
        let mut cells = vec![String::new(); GWR_HEADERS.len()];
        cells[col::FEDERAL_ID] = id.to_string();
        cells[col::E_COORDINATE] = format!("{}", E0 + e);
        cells[col::N_COORDINATE] = format!("{}", N0 + n);
        cells[col::BUILDING_STATUS] = "1004".to_string();
        Row { cells }
    }

    fn set(mut self, idx: usize, value: &str) -> Self {
        self.cells[idx] = value.to_string();
        self
    }

    fn building(self, class: &str, year: &str, floors: &str, area: &str) -> Self {
        self.set(col::BUILDING_CLASS, class)
            .set(col::CONSTRUCTION_YEAR, year)
            .set(col::NUMBER_FLOORS, floors)
            .set(col::BUILDING_AREA, area)
    }

    fn heating(self, tech: &str, source: &str) -> Self {
        self.set(col::HEATING_TECH_1, tech)
            .set(col::HEATING_SOURCE_1, source)
    }

    fn hot_water(self, tech: &str, source: &str) -> Self {
        self.set(col::HOT_WATER_TECH_1, tech)
            .set(col::HOT_WATER_SOURCE_1, source)
    }
}

fn write_registry(path: &Path) {
    let rows = vec![
        Row::new("100", 5.0, 5.0)
            .building("1110", "1950", "2", "150")
            .heating("7410", "7501")
            .hot_water("7610", "7501"),
        Row::new("200", 25.0, 5.0)
            .building("1220", "1999", "4", "600")
            .heating("7430", "7520")
            .hot_water("7650", "7560"),
        Row::new("201", 26.0, 6.0)
            .building("1230", "2010", "4", "200")
            .heating("7460", "7580")
            .hot_water("7630", "7580"),
        // Demolished: dropped by the loader
        Row::new("300", 6.0, 6.0)
            .building("1264", "2020", "9", "900")
            .set(col::BUILDING_STATUS, "1007"),
        // Outside the study area
        Row::new("400", 5000.0, 5000.0).building("1264", "2020", "9", "900"),
    ];

    let mut out = GWR_HEADERS.join("\t");
    for row in &rows {
        out.push('\n');
        out.push_str(&row.cells.join("\t"));
    }
    out.push('\n');
    fs::write(path, out).unwrap();
}

fn square(name: &str, x0: f64) -> serde_json::Value {
    let (x, y) = (E0 + x0, N0);
    serde_json::json!({
        "name": name,
        "exterior": [[x, y], [x + 10.0, y], [x + 10.0, y + 10.0], [x, y + 10.0], [x, y]],
    })
}

fn write_footprints(path: &Path, crs: u32) {
    let file = serde_json::json!({
        "crs": crs,
        "buildings": [
            square("house", 0.0),
            square("block", 20.0),
            square("shed", 40.0),
        ],
    });
    fs::write(path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
}

#[test]
fn test_registry_to_tables() {
    let dir = tempfile::tempdir().unwrap();
    let registry_path = dir.path().join("gwr.tsv");
    let footprint_path = dir.path().join("footprints.json");
    write_registry(&registry_path);
    write_footprints(&footprint_path, 2056);

    let config = MapperConfig::default();
    let tables = CodeTables::swiss_gwr();

    let (registry, load_stats) = RegistryLoader::new(config.existing_status_code)
        .load_path(&registry_path)
        .unwrap();
    assert_eq!(load_stats.rows_read, 5);
    assert_eq!(load_stats.dropped_not_existing, 1);
    assert_eq!(registry.len(), 4);

    let footprints = load_footprints(&footprint_path, config.crs_epsg).unwrap();
    let output = Pipeline::new(&config, &tables).run(registry, &footprints).unwrap();

    assert_eq!(output.stats.in_study_area, 3);
    assert_eq!(output.stats.matched_single, 1);
    assert_eq!(output.stats.matched_multiple, 1);
    assert_eq!(output.stats.unmatched, 1);

    // One output row per footprint, in footprint order
    let names: Vec<&str> = output.typology.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["house", "block", "shed"]);

    let house = &output.buildings[0];
    assert_eq!(house.building_type, BuildingType::SingleRes);
    assert_eq!(house.heating_code.to_string(), "SUPPLY_HEATING_AS7");
    assert_eq!(house.hot_water_code.to_string(), "SUPPLY_HOTWATER_AS7");
    assert_eq!(output.typology[0].standard, "STANDARD2");

    let block = &output.buildings[1];
    assert_eq!(block.resolution, Resolution::Matched { records: 2 });
    assert_eq!(block.construction_year, 2010);
    assert_eq!(block.building_type, BuildingType::Office);
    assert_eq!(block.occupancy.to_string(), "OFFICE:0.75;RETAIL:0.25");
    assert_eq!(block.heating_code.to_string(), "SUPPLY_HEATING_AS3");
    assert_eq!(block.hot_water_code.to_string(), "SUPPLY_HOTWATER_AS4");

    // SINGLE_RES and OFFICE tie on footprint count; OFFICE sorts first
    let shed = &output.buildings[2];
    assert_eq!(shed.resolution, Resolution::PopulationFilled);
    assert_eq!(shed.building_type, BuildingType::Office);
    assert_eq!(shed.construction_year, 2010);
    assert_eq!(shed.number_floors, 4);
    assert_eq!(shed.heating_code.to_string(), "SUPPLY_HEATING_AS3");
    assert_eq!(output.typology[2].standard, "STANDARD6");

    for row in &output.typology {
        assert!((row.ratio_total() - 1.0).abs() < 1e-5, "{:?}", row);
    }
    assert_eq!(output.zone[0].height_ag, 6.0);
    assert_eq!(output.zone[2].height_ag, 12.0);

    let out_dir = dir.path().join("out");
    let paths = write_tables(&out_dir, &output.typology, &output.supply, &output.zone).unwrap();
    let supply_csv = fs::read_to_string(&paths[1]).unwrap();
    assert_eq!(
        supply_csv,
        "Name,type_hs,type_dhw\n\
         house,SUPPLY_HEATING_AS7,SUPPLY_HOTWATER_AS7\n\
         block,SUPPLY_HEATING_AS3,SUPPLY_HOTWATER_AS4\n\
         shed,SUPPLY_HEATING_AS3,SUPPLY_HOTWATER_AS4\n"
    );
    let typology_csv = fs::read_to_string(&paths[0]).unwrap();
    assert!(typology_csv.starts_with("Name,STANDARD,YEAR,1ST_USE,1ST_USE_R"));
    assert_eq!(typology_csv.lines().count(), 4);
}

#[test]
fn test_rerun_gives_identical_tables_and_db_rows() {
    let dir = tempfile::tempdir().unwrap();
    let registry_path = dir.path().join("gwr.tsv");
    let footprint_path = dir.path().join("footprints.json");
    write_registry(&registry_path);
    write_footprints(&footprint_path, 2056);

    let config = MapperConfig {
        parallel: true,
        ..MapperConfig::default()
    };
    let tables = CodeTables::swiss_gwr();
    let loader = RegistryLoader::new(config.existing_status_code);
    let footprints = load_footprints(&footprint_path, config.crs_epsg).unwrap();
    let pipeline = Pipeline::new(&config, &tables);

    let mut conn = Connection::open(dir.path().join("mapping.db")).unwrap();
    setup_database(&conn).unwrap();

    let mut digests = Vec::new();
    for _ in 0..2 {
        let (registry, _) = loader.load_path(&registry_path).unwrap();
        let output = pipeline.run(registry, &footprints).unwrap();
        digests.push(output.digest().unwrap());
        save_output(&mut conn, &output, "test-area").unwrap();
    }
    assert_eq!(digests[0], digests[1]);

    assert_eq!(count_rows(&conn, "building_typology").unwrap(), 3);
    let runs = get_events_for_entity(&conn, "scenario", "test-area").unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].data["digest"], runs[1].data["digest"]);
}

#[test]
fn test_footprints_in_other_crs_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let footprint_path = dir.path().join("footprints.json");
    write_footprints(&footprint_path, 4326);

    assert!(matches!(
        load_footprints(&footprint_path, 2056),
        Err(MapperError::CrsMismatch {
            expected: 2056,
            found: 4326
        })
    ));
}
