// 🔁 Pipeline - loader output → one resolved record per footprint
//
//   registry ─▶ study-area cut ─▶ translate ─▶ match ─▶ reduce ─▶ fill ─▶ typology
//
// Every stage is a pure transformation over the batch. Footprint matching
// is the only step that may run on the rayon pool.

use crate::config::{CodeTables, MapperConfig};
use crate::error::{MapperError, MapperResult};
use crate::footprint::Footprint;
use crate::matcher::Matcher;
use crate::output::{digest_tables, SupplyUpdate, ZoneUpdate};
use crate::population::{fill_gaps, PopulationReference, ResolvedBuilding};
use crate::reducer::{reduce, BuildingRecord};
use crate::registry::RegistryRecord;
use crate::spatial::{filter_by_bounds, total_bounds};
use crate::translate::{TranslatedRecord, TranslationStats, Translator};
use crate::typology::{generate_typology, TypologyRow};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

// ============================================================================
// RUN STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub registry_records: usize,
    pub in_study_area: usize,
    pub footprints: usize,
    pub matched_single: usize,
    pub matched_multiple: usize,
    pub unmatched: usize,
    pub unmapped_building_class: usize,
}

impl RunStats {
    pub fn summary(&self) -> String {
        format!(
            "{} footprints: {} single match, {} multiple, {} filled from population ({} of {} registry records in study area)",
            self.footprints,
            self.matched_single,
            self.matched_multiple,
            self.unmatched,
            self.in_study_area,
            self.registry_records
        )
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub buildings: Vec<ResolvedBuilding>,
    pub typology: Vec<TypologyRow>,
    pub supply: Vec<SupplyUpdate>,
    pub zone: Vec<ZoneUpdate>,
    pub reference: Option<PopulationReference>,
    pub stats: RunStats,
}

impl PipelineOutput {
    /// Fingerprint of the three output tables. Identical inputs give an
    /// identical digest.
    pub fn digest(&self) -> MapperResult<String> {
        digest_tables(&self.typology, &self.supply, &self.zone)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<'a> {
    config: &'a MapperConfig,
    tables: &'a CodeTables,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a MapperConfig, tables: &'a CodeTables) -> Self {
        Pipeline { config, tables }
    }

    pub fn run(
        &self,
        registry: Vec<RegistryRecord>,
        footprints: &[Footprint],
    ) -> MapperResult<PipelineOutput> {
        let mut stats = RunStats {
            registry_records: registry.len(),
            footprints: footprints.len(),
            ..RunStats::default()
        };

        let study_area = match total_bounds(footprints.iter().map(|f| &f.bbox)) {
            Some(area) => area,
            None => {
                warn!("no footprints to map");
                return Ok(PipelineOutput {
                    buildings: Vec::new(),
                    typology: Vec::new(),
                    supply: Vec::new(),
                    zone: Vec::new(),
                    reference: None,
                    stats,
                });
            }
        };

        let scoped = {
            let _span = info_span!("study_area").entered();
            let scoped = filter_by_bounds(registry, &study_area);
            info!(kept = scoped.len(), ?study_area, "scoped registry to study area");
            scoped
        };
        stats.in_study_area = scoped.len();
        if scoped.is_empty() {
            return Err(MapperError::EmptyStudyArea);
        }

        let (translated, translation) = {
            let _span = info_span!("translate").entered();
            Translator::new(self.tables).translate_all(scoped)?
        };
        stats.unmapped_building_class = translation.unmapped_building_class;

        let records = {
            let _span = info_span!("match_reduce", parallel = self.config.parallel).entered();
            self.match_and_reduce(&translated, footprints)
        };
        for record in &records {
            match record.matched_ids.len() {
                0 => stats.unmatched += 1,
                1 => stats.matched_single += 1,
                _ => stats.matched_multiple += 1,
            }
        }

        let (buildings, reference) = {
            let _span = info_span!("fill_gaps").entered();
            fill_gaps(records)?
        };

        let typology = {
            let _span = info_span!("typology").entered();
            generate_typology(
                &buildings,
                &self.tables.eras,
                self.config.era_overlap_policy,
                &self.config.reference,
            )?
        };

        let supply = buildings.iter().map(SupplyUpdate::from).collect();
        let zone = buildings
            .iter()
            .map(|b| ZoneUpdate::new(b, self.config.floor_height_m))
            .collect();

        info!("{}", stats.summary());
        log_translation(&translation);

        Ok(PipelineOutput {
            buildings,
            typology,
            supply,
            zone,
            reference: Some(reference),
            stats,
        })
    }

    /// One reduced record per footprint, in footprint order.
    fn match_and_reduce(
        &self,
        translated: &[TranslatedRecord],
        footprints: &[Footprint],
    ) -> Vec<BuildingRecord> {
        let matcher = Matcher::new(translated);

        matcher
            .match_all(footprints, self.config.parallel)
            .iter()
            .map(|m| reduce(&m.footprint.name, &m.records))
            .collect()
    }
}

fn log_translation(stats: &TranslationStats) {
    for (code, count) in &stats.heating_codes {
        info!(code = %code, count, "heating assembly");
    }
    for (code, count) in &stats.hot_water_codes {
        info!(code = %code, count, "hot water assembly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::BuildingType;
    use crate::population::Resolution;
    use crate::registry::CodePair;
    use crate::translate::tests::registry_record;
    use geo::polygon;

    fn square(name: &str, x0: f64, y0: f64) -> Footprint {
        Footprint::new(
            name,
            polygon![
                (x: x0, y: y0),
                (x: x0 + 10.0, y: y0),
                (x: x0 + 10.0, y: y0 + 10.0),
                (x: x0, y: y0 + 10.0),
            ],
        )
        .unwrap()
    }

    fn point(id: &str, e: f64, n: f64, class: u32, year: i32, floors: u32, area: f64) -> RegistryRecord {
        let mut r = registry_record(id, e, n);
        r.class = Some(class);
        r.construction_year = year;
        r.number_floors = floors;
        r.building_area = Some(area);
        r.heating_1 = CodePair {
            tech: Some(7411),
            source: Some(7510),
        };
        r.hot_water_1 = CodePair {
            tech: Some(7630),
            source: Some(7520),
        };
        r
    }

    fn fixture() -> (Vec<RegistryRecord>, Vec<Footprint>) {
        let registry = vec![
            point("1", 5.0, 5.0, 1110, 1965, 2, 120.0),
            point("2", 25.0, 5.0, 1230, 1990, 2, 100.0),
            point("3", 26.0, 6.0, 1220, 2005, 2, 300.0),
            point("4", 45.0, 5.0, 1110, 1985, 3, 90.0),
            // Far outside the study area
            point("5", 5000.0, 5000.0, 1264, 2020, 9, 900.0),
        ];
        let footprints = vec![
            square("single", 0.0, 0.0),
            square("multi", 20.0, 0.0),
            square("another", 40.0, 0.0),
            square("empty", 60.0, 0.0),
        ];
        (registry, footprints)
    }

    #[test]
    fn test_full_run() {
        let (registry, footprints) = fixture();
        let config = MapperConfig::default();
        let tables = CodeTables::swiss_gwr();

        let output = Pipeline::new(&config, &tables).run(registry, &footprints).unwrap();

        assert_eq!(output.stats.in_study_area, 4);
        assert_eq!(output.stats.matched_single, 2);
        assert_eq!(output.stats.matched_multiple, 1);
        assert_eq!(output.stats.unmatched, 1);

        let names: Vec<&str> = output.buildings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["single", "multi", "another", "empty"]);

        let multi = &output.buildings[1];
        assert_eq!(multi.construction_year, 2005);
        assert_eq!(multi.building_type, BuildingType::Office);
        assert_eq!(multi.occupancy.to_string(), "OFFICE:0.75;RETAIL:0.25");

        let single = &output.buildings[0];
        assert_eq!(single.construction_year, 1965);
        assert_eq!(single.heating_code.to_string(), "SUPPLY_HEATING_AS6");
        assert_eq!(single.hot_water_code.to_string(), "SUPPLY_HOTWATER_AS3");

        // SINGLE_RES dominates (two footprints); medians of 1965/1985 and 2/3 floors
        let empty = &output.buildings[3];
        assert_eq!(empty.resolution, Resolution::PopulationFilled);
        assert_eq!(empty.building_type, BuildingType::SingleRes);
        assert_eq!(empty.construction_year, 1975);
        assert_eq!(empty.number_floors, 2);

        for row in &output.typology {
            assert!((row.ratio_total() - 1.0).abs() < 1e-5);
        }
        assert_eq!(output.typology[3].standard, "STANDARD3");
        assert_eq!(output.zone[2].height_ag, 9.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (registry, footprints) = fixture();
        let tables = CodeTables::swiss_gwr();

        let sequential = MapperConfig::default();
        let parallel = MapperConfig {
            parallel: true,
            ..MapperConfig::default()
        };

        let a = Pipeline::new(&sequential, &tables)
            .run(registry.clone(), &footprints)
            .unwrap();
        let b = Pipeline::new(&parallel, &tables).run(registry, &footprints).unwrap();

        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_eq!(a.buildings, b.buildings);
    }

    #[test]
    fn test_rerun_is_identical() {
        let (registry, footprints) = fixture();
        let config = MapperConfig::default();
        let tables = CodeTables::swiss_gwr();
        let pipeline = Pipeline::new(&config, &tables);

        let first = pipeline.run(registry.clone(), &footprints).unwrap();
        let second = pipeline.run(registry, &footprints).unwrap();
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }

    #[test]
    fn test_empty_study_area_is_fatal() {
        let (_, footprints) = fixture();
        let registry = vec![point("far", 9999.0, 9999.0, 1110, 1990, 2, 50.0)];
        let config = MapperConfig::default();
        let tables = CodeTables::swiss_gwr();

        assert!(matches!(
            Pipeline::new(&config, &tables).run(registry, &footprints),
            Err(MapperError::EmptyStudyArea)
        ));
    }

    #[test]
    fn test_no_footprints() {
        let (registry, _) = fixture();
        let config = MapperConfig::default();
        let tables = CodeTables::swiss_gwr();

        let output = Pipeline::new(&config, &tables).run(registry, &[]).unwrap();
        assert!(output.buildings.is_empty());
        assert!(output.reference.is_none());
    }

    #[test]
    fn test_points_in_area_but_no_match_is_fatal() {
        // Inside the union bbox, but between the two footprints
        let footprints = vec![square("a", 0.0, 0.0), square("b", 100.0, 0.0)];
        let registry = vec![point("gap", 50.0, 5.0, 1110, 1990, 2, 50.0)];
        let config = MapperConfig::default();
        let tables = CodeTables::swiss_gwr();

        assert!(matches!(
            Pipeline::new(&config, &tables).run(registry, &footprints),
            Err(MapperError::NoPopulationReference(_))
        ));
    }
}
