//! Building and reusing a persisted catalog
//!
//! Reads the registry files under `$SCUOLE_DATA_DIR/raw` (default `./scuole_data/raw`),
//! resolves municipalities from `$SCUOLE_DATA_DIR/comuni.json`, stores the result as
//! Parquet and answers the queries given on the command line from the stored table.
//!
//! ```text
//! cargo run --example build_catalog -- "Carducci Firenze" "Mazzei Prato"
//! ```

use std::time::Instant;

use scuole::{
    SchoolSearcher, SearchConfig, build_catalog_from_files,
    data_processing::{comuni_path, raw_data_dir, school_table_path},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scuole::init_logging(tracing::Level::INFO)?;

    let table_path = school_table_path();
    if table_path.exists() {
        println!("Reusing catalog at {}", table_path.display());
    } else {
        let start = Instant::now();
        let catalog = build_catalog_from_files(&raw_data_dir(), &comuni_path())?;
        let metadata = catalog.save(&table_path)?;
        println!(
            "Built catalog of {} schools in {:.2}s",
            metadata.rows,
            start.elapsed().as_secs_f32()
        );
    }

    let searcher = SchoolSearcher::open(&table_path, SearchConfig::builder().limit(5).build())?;
    let queries: Vec<String> = std::env::args().skip(1).collect();
    for (query, results) in queries.iter().zip(searcher.search_bulk(&queries)?) {
        println!("\n{query}:");
        for hit in results {
            println!("  {hit}");
        }
    }

    Ok(())
}
