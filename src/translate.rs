// 🔤 Code Translator - raw registry codes → semantic categories
//
// Supply system selection is a priority-ordered rule table. Adding a supply
// type (solar thermal, cogeneration, heat exchanger) is a table edit.

use crate::codes::{BuildingType, EnergySource, Service, SupplyCode, Technology};
use crate::config::CodeTables;
use crate::error::{MapperError, MapperResult};
use crate::registry::{CodePair, RegistryRecord};
use crate::stats::mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// SUPPLY RULES
// ============================================================================

/// One row of the supply selection table. `None` matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRule {
    pub tech: Option<Technology>,
    pub source: Option<EnergySource>,
    pub assembly: u8,
}

impl SupplyRule {
    pub const fn new(tech: Option<Technology>, source: Option<EnergySource>, assembly: u8) -> Self {
        SupplyRule {
            tech,
            source,
            assembly,
        }
    }

    pub fn matches(&self, tech: Technology, source: EnergySource) -> bool {
        self.tech.map_or(true, |t| t == tech) && self.source.map_or(true, |s| s == source)
    }
}

/// Supply assemblies shared by heating and hot water, highest priority first.
/// District heating is decided by the source alone and resistance heating by
/// the technology alone. Anything unmatched is assembly 0 (no system).
pub const SUPPLY_RULES: &[SupplyRule] = &[
    SupplyRule::new(None, Some(EnergySource::DistrictHeating), 9),
    SupplyRule::new(Some(Technology::None), None, 0),
    SupplyRule::new(Some(Technology::Boiler), Some(EnergySource::Oil), 1),
    SupplyRule::new(Some(Technology::Boiler), Some(EnergySource::Coal), 2),
    SupplyRule::new(Some(Technology::Boiler), Some(EnergySource::Gas), 3),
    SupplyRule::new(Some(Technology::Resistance), None, 4),
    SupplyRule::new(Some(Technology::Boiler), Some(EnergySource::Wood), 5),
    SupplyRule::new(Some(Technology::HeatPump), Some(EnergySource::Ground), 6),
    SupplyRule::new(Some(Technology::HeatPump), Some(EnergySource::Air), 7),
    SupplyRule::new(Some(Technology::HeatPump), Some(EnergySource::Water), 8),
];

/// First matching rule wins.
pub fn select_supply(
    rules: &[SupplyRule],
    service: Service,
    tech: Technology,
    source: EnergySource,
) -> SupplyCode {
    rules
        .iter()
        .find(|rule| rule.matches(tech, source))
        .and_then(|rule| SupplyCode::new(service, rule.assembly))
        .unwrap_or_else(|| SupplyCode::none(service))
}

// ============================================================================
// TRANSLATED RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyTranslation {
    pub tech: Technology,
    pub source: EnergySource,
    pub code: SupplyCode,
}

/// Registry record plus its derived semantic fields. Built fresh from the
/// raw record; the input set is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedRecord {
    pub record: RegistryRecord,
    pub heating: SupplyTranslation,
    pub hot_water: SupplyTranslation,
    pub building_type: BuildingType,

    /// Class code was unmapped and the dataset's most frequent type was used
    pub type_from_fallback: bool,
}

impl TranslatedRecord {
    pub fn e(&self) -> f64 {
        self.record.e
    }

    pub fn n(&self) -> f64 {
        self.record.n
    }

    /// `building_area` (1.0 when unknown) × floor count
    pub fn gross_floor_area(&self) -> f64 {
        self.record.building_area.unwrap_or(1.0) * self.record.number_floors as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub translated: usize,
    pub unmapped_building_class: usize,
    pub fallback_type: Option<BuildingType>,
    pub heating_codes: BTreeMap<SupplyCode, usize>,
    pub hot_water_codes: BTreeMap<SupplyCode, usize>,
}

// ============================================================================
// TRANSLATOR
// ============================================================================

pub struct Translator<'a> {
    tables: &'a CodeTables,
    rules: &'a [SupplyRule],
}

impl<'a> Translator<'a> {
    pub fn new(tables: &'a CodeTables) -> Self {
        Translator {
            tables,
            rules: SUPPLY_RULES,
        }
    }

    pub fn with_rules(tables: &'a CodeTables, rules: &'a [SupplyRule]) -> Self {
        Translator { tables, rules }
    }

    pub fn heating(&self, pair: CodePair) -> SupplyTranslation {
        self.supply(pair, &self.tables.heating_tech, Service::Heating)
    }

    pub fn hot_water(&self, pair: CodePair) -> SupplyTranslation {
        self.supply(pair, &self.tables.hot_water_tech, Service::HotWater)
    }

    fn supply(
        &self,
        pair: CodePair,
        tech_table: &BTreeMap<u32, Technology>,
        service: Service,
    ) -> SupplyTranslation {
        let tech = pair
            .tech
            .and_then(|code| tech_table.get(&code).copied())
            .unwrap_or(Technology::None)
            .normalized();
        let source = pair
            .source
            .and_then(|code| self.tables.energy_source.get(&code).copied())
            .unwrap_or(EnergySource::None)
            .normalized();

        SupplyTranslation {
            tech,
            source,
            code: select_supply(self.rules, service, tech, source),
        }
    }

    pub fn building_type(&self, class: Option<u32>) -> Option<BuildingType> {
        class.and_then(|code| self.tables.building_type.get(&code).copied())
    }

    /// Translate the whole set. Unmapped building classes take the most
    /// frequent mapped type over the full input, so results do not depend on
    /// row order.
    pub fn translate_all(
        &self,
        records: Vec<RegistryRecord>,
    ) -> MapperResult<(Vec<TranslatedRecord>, TranslationStats)> {
        let mut stats = TranslationStats::default();

        let mapped: Vec<Option<BuildingType>> =
            records.iter().map(|r| self.building_type(r.class)).collect();
        let fallback = mode(mapped.iter().flatten().copied());

        let mut translated = Vec::with_capacity(records.len());
        for (record, building_type) in records.into_iter().zip(mapped) {
            let (building_type, type_from_fallback) = match building_type {
                Some(t) => (t, false),
                None => {
                    let t = fallback.ok_or(MapperError::NoDominantBuildingType)?;
                    debug!(federal_id = %record.federal_id, class = ?record.class, fallback = %t, "unmapped building class");
                    stats.unmapped_building_class += 1;
                    (t, true)
                }
            };

            let heating = self.heating(record.heating_1);
            let hot_water = self.hot_water(record.hot_water_1);

            *stats.heating_codes.entry(heating.code).or_insert(0) += 1;
            *stats.hot_water_codes.entry(hot_water.code).or_insert(0) += 1;

            translated.push(TranslatedRecord {
                record,
                heating,
                hot_water,
                building_type,
                type_from_fallback,
            });
        }

        stats.translated = translated.len();
        stats.fallback_type = fallback;
        info!(
            translated = stats.translated,
            unmapped_building_class = stats.unmapped_building_class,
            "translated registry codes"
        );

        Ok((translated, stats))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::RegistryRecord;

    pub(crate) fn registry_record(id: &str, e: f64, n: f64) -> RegistryRecord {
        RegistryRecord {
            federal_id: id.to_string(),
            e,
            n,
            status: 1004,
            category: Some(1020),
            class: Some(1110),
            construction_year: 1990,
            number_floors: 2,
            building_area: Some(100.0),
            heating_1: CodePair::default(),
            heating_2: CodePair::default(),
            hot_water_1: CodePair::default(),
            hot_water_2: CodePair::default(),
            district_number: None,
            district_name: None,
            canton: None,
        }
    }

    fn pair(tech: u32, source: u32) -> CodePair {
        CodePair {
            tech: Some(tech),
            source: Some(source),
        }
    }

    #[test]
    fn test_ground_heat_pump() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);

        let result = translator.heating(pair(7411, 7510));
        assert_eq!(result.tech, Technology::HeatPump);
        assert_eq!(result.source, EnergySource::Ground);
        assert_eq!(result.code.to_string(), "SUPPLY_HEATING_AS6");
    }

    #[test]
    fn test_heating_assemblies() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);
        let code = |tech, source| translator.heating(pair(tech, source)).code.assembly;

        assert_eq!(code(7430, 7530), 1); // oil boiler
        assert_eq!(code(7431, 7520), 3); // gas boiler
        assert_eq!(code(7450, 7530), 4); // resistance, any source
        assert_eq!(code(7432, 7541), 5); // wood boiler
        assert_eq!(code(7410, 7501), 7); // air heat pump
        assert_eq!(code(7410, 7513), 8); // water heat pump
        assert_eq!(code(7400, 7580), 9); // district heating, any tech
        assert_eq!(code(7430, 7560), 0); // uncovered combination
        assert_eq!(code(7420, 7570), 0); // solar thermal not assigned yet
    }

    #[test]
    fn test_unknown_and_missing_codes_mean_none() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);

        let unknown = translator.heating(pair(7499, 7599));
        assert_eq!(unknown.tech, Technology::None);
        assert_eq!(unknown.source, EnergySource::None);
        assert_eq!(unknown.code.assembly, 0);

        let unmapped = translator.heating(pair(1234, 5678));
        assert_eq!(unmapped.tech, Technology::None);

        let missing = translator.hot_water(CodePair::default());
        assert_eq!(missing.code.to_string(), "SUPPLY_HOTWATER_AS0");
    }

    #[test]
    fn test_hot_water_uses_own_table() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);

        let result = translator.hot_water(pair(7610, 7501));
        assert_eq!(result.code.to_string(), "SUPPLY_HOTWATER_AS7");

        // 7411 is a heating code, not a hot water code
        let wrong_table = translator.hot_water(pair(7411, 7510));
        assert_eq!(wrong_table.tech, Technology::None);
    }

    #[test]
    fn test_custom_rule_table() {
        let tables = CodeTables::swiss_gwr();
        let rules = [SupplyRule::new(Some(Technology::SolarThermal), None, 2)];
        let translator = Translator::with_rules(&tables, &rules);

        assert_eq!(translator.heating(pair(7420, 7570)).code.assembly, 2);
        assert_eq!(translator.heating(pair(7430, 7530)).code.assembly, 0);
    }

    #[test]
    fn test_building_type_and_fallback() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);

        let mut retail = registry_record("1", 0.0, 0.0);
        retail.class = Some(1230);
        let mut office_a = registry_record("2", 0.0, 0.0);
        office_a.class = Some(1220);
        let mut office_b = registry_record("3", 0.0, 0.0);
        office_b.class = Some(1220);
        let mut unmapped = registry_record("4", 0.0, 0.0);
        unmapped.class = Some(9999);

        let (records, stats) = translator
            .translate_all(vec![unmapped, retail, office_a, office_b])
            .unwrap();

        assert_eq!(records[1].building_type, BuildingType::Retail);
        assert_eq!(records[0].building_type, BuildingType::Office);
        assert!(records[0].type_from_fallback);
        assert_eq!(stats.unmapped_building_class, 1);
        assert_eq!(stats.fallback_type, Some(BuildingType::Office));
    }

    #[test]
    fn test_fallback_is_order_independent() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);

        let build = |classes: &[u32]| {
            let records = classes
                .iter()
                .enumerate()
                .map(|(i, class)| {
                    let mut r = registry_record(&i.to_string(), 0.0, 0.0);
                    r.class = Some(*class);
                    r
                })
                .collect();
            translator.translate_all(records).unwrap().1.fallback_type
        };

        assert_eq!(
            build(&[1230, 1220, 9999]),
            build(&[9999, 1220, 1230])
        );
    }

    #[test]
    fn test_all_unmapped_is_fatal() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);
        let mut record = registry_record("1", 0.0, 0.0);
        record.class = None;

        assert!(matches!(
            translator.translate_all(vec![record]),
            Err(MapperError::NoDominantBuildingType)
        ));
        assert!(translator.translate_all(Vec::new()).unwrap().0.is_empty());
    }

    #[test]
    fn test_gross_floor_area_defaults_area() {
        let tables = CodeTables::swiss_gwr();
        let translator = Translator::new(&tables);
        let mut record = registry_record("1", 0.0, 0.0);
        record.building_area = None;
        record.number_floors = 4;

        let (records, _) = translator.translate_all(vec![record]).unwrap();
        assert_eq!(records[0].gross_floor_area(), 4.0);
    }
}
