use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::path::PathBuf;

use gwr_mapper::logging::init_logging;
use gwr_mapper::store::{count_rows, get_events_for_entity};
use gwr_mapper::{
    load_footprints, save_output, setup_database, write_tables, CodeTables, EraTable, MapperConfig,
    Pipeline, RegistryLoader,
};

/// Map federal building registry points onto building footprints
#[derive(Parser, Debug)]
#[command(name = "gwr-mapper", version, about)]
struct Cli {
    /// Registry extract (tab separated)
    #[arg(long)]
    registry: PathBuf,

    /// Footprint polygons (JSON)
    #[arg(long)]
    footprints: PathBuf,

    /// Directory for typology.csv, supply_systems.csv and zone_floors.csv
    #[arg(long)]
    out_dir: PathBuf,

    /// Run settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Code tables replacing the built-in ones (JSON)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Construction era table: STANDARD,YEAR_START,YEAR_END
    #[arg(long)]
    eras: Option<PathBuf>,

    /// Also upsert the tables into this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Scenario name recorded in the database event log
    #[arg(long, default_value = "default")]
    scenario: String,

    /// Match footprints in parallel
    #[arg(long)]
    parallel: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    println!("🏗️  GWR Mapper v{}", gwr_mapper::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Settings and code tables
    let mut config = match &cli.config {
        Some(path) => MapperConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MapperConfig::default(),
    };
    if cli.parallel {
        config.parallel = true;
    }

    let mut tables = match &cli.tables {
        Some(path) => CodeTables::from_file(path)
            .with_context(|| format!("loading code tables {}", path.display()))?,
        None => CodeTables::swiss_gwr(),
    };
    if let Some(path) = &cli.eras {
        tables.eras = EraTable::from_csv(path)
            .with_context(|| format!("loading era table {}", path.display()))?;
    }
    tables
        .eras
        .validate_with(config.era_overlap_policy)
        .context("era table")?;

    // 2. Inputs
    println!("\n📂 Loading registry...");
    let loader = RegistryLoader::new(config.existing_status_code);
    let (registry, load_stats) = loader
        .load_path(&cli.registry)
        .with_context(|| format!("reading registry {}", cli.registry.display()))?;
    println!("✓ {}", load_stats.summary());

    println!("\n📐 Loading footprints...");
    let footprints = load_footprints(&cli.footprints, config.crs_epsg)
        .with_context(|| format!("reading footprints {}", cli.footprints.display()))?;
    println!("✓ Loaded {} footprints", footprints.len());

    // 3. Map
    println!("\n🔁 Mapping...");
    let output = Pipeline::new(&config, &tables).run(registry, &footprints)?;
    println!("✓ {}", output.stats.summary());
    if let Some(reference) = &output.reference {
        println!(
            "✓ Population reference: {} ({} footprints), year {}, {} floors, {} / {}",
            reference.dominant_type,
            reference.sample_size,
            reference.construction_year,
            reference.number_floors,
            reference.heating_code,
            reference.hot_water_code
        );
    }

    // 4. Write
    println!("\n💾 Writing tables...");
    let paths = write_tables(&cli.out_dir, &output.typology, &output.supply, &output.zone)
        .with_context(|| format!("writing to {}", cli.out_dir.display()))?;
    for path in &paths {
        println!("✓ {}", path.display());
    }

    if let Some(db_path) = &cli.db {
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        setup_database(&conn)?;
        let run_id = save_output(&mut conn, &output, &cli.scenario)?;
        let runs = get_events_for_entity(&conn, "scenario", &cli.scenario)?;
        let stored = count_rows(&conn, "building_typology")?;
        println!("✓ Saved to {} (run {})", db_path.display(), run_id);
        println!(
            "✓ Scenario '{}': {} runs recorded, {} buildings stored",
            cli.scenario,
            runs.len(),
            stored
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Mapped {} buildings", output.buildings.len());
    println!("   digest {}", output.digest()?);

    Ok(())
}
