// GWR Mapper - Core Library
// Maps federal building registry points onto building footprints

pub mod error;
pub mod stats;
pub mod codes;
pub mod config;
pub mod registry;       // Loader: TSV extract → RegistryRecord
pub mod translate;      // Code tables + supply rules
pub mod spatial;        // Bounding-box culling
pub mod footprint;
pub mod matcher;        // Point-in-polygon per footprint
pub mod reducer;        // N matches → one BuildingRecord
pub mod population;     // Gap filling from the dominant type
pub mod typology;       // Era label + occupancy slots
pub mod pipeline;
pub mod output;
pub mod store;          // SQLite sink
pub mod logging;

// Re-export commonly used types
pub use error::{MapperError, MapperResult};
pub use codes::{BuildingType, EnergySource, Service, SupplyCode, Technology};
pub use config::{CodeTables, EraRange, EraTable, MapperConfig, OverlapPolicy};
pub use registry::{CodePair, LoadStats, RegistryLoader, RegistryRecord, GWR_HEADERS};
pub use translate::{SupplyRule, SupplyTranslation, TranslatedRecord, TranslationStats, Translator, SUPPLY_RULES};
pub use spatial::{BoundingBox, CoordinateIndex, Located};
pub use footprint::{load_footprints, parse_footprints, Footprint, FootprintFile};
pub use matcher::{contains_point, FootprintMatch, Matcher};
pub use reducer::{reduce, BuildingRecord, OccupancyEntry, OccupancyMix};
pub use population::{fill_gaps, PopulationReference, Resolution, ResolvedBuilding};
pub use typology::{generate_typology, occupancy_slots, TypologyRow, NO_USE};
pub use pipeline::{Pipeline, PipelineOutput, RunStats};
pub use output::{write_tables, SupplyUpdate, ZoneUpdate};
pub use store::{save_output, setup_database, Event};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
