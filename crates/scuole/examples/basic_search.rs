//! Basic school search functionality
//!
//! This example demonstrates the fundamental search operations:
//! - Building a catalog from generated registry files
//! - Hybrid (fuzzy) and simple searches
//! - Working with scored matches

use scuole::{
    ScoredMatch, SchoolSearcher, SearchConfig, SearchConfigBuilder, build_catalog_from_files,
    data_processing::{TestDataConfig, create_test_data},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scuole::init_logging(tracing::Level::INFO)?;

    // Generated registry files, deleted when `data` goes out of scope
    let data = create_test_data(&TestDataConfig::sample())?;
    let catalog = build_catalog_from_files(&data.raw_dir(), &data.comuni_file())?;
    let searcher = SchoolSearcher::new(catalog, SearchConfig::default());

    println!("Searching for 'Carducci Firenze':");
    print_search_results(&searcher.search("Carducci Firenze")?, 3);

    // Misspelled town, found through fuzzy similarity
    println!("\nSearching for 'scuola primaria pnote sieve':");
    print_search_results(&searcher.search("scuola primaria pnote sieve")?, 3);

    // Literal matches only
    println!("\nSimple search for 'Galilei Prato' (limited results):");
    let config = SearchConfigBuilder::simple().limit(5).build();
    let simple = SchoolSearcher::new(searcher.source().clone(), config);
    print_search_results(&simple.search("Galilei Prato")?, 5);

    Ok(())
}

fn print_search_results(results: &[ScoredMatch], limit: usize) {
    for (i, result) in results.iter().take(limit).enumerate() {
        let fuzzy = result
            .breakdown
            .fuzzy_score
            .map_or_else(|| "-".to_string(), |score| format!("{score:.0}"));
        println!(
            "  {}. {} - Score: {:.1} (name {:.0}, city {:.0}, fuzzy {fuzzy})",
            i + 1,
            result.entity,
            result.score,
            result.breakdown.school_name_score,
            result.breakdown.city_name_score,
        );
    }

    if results.len() > limit {
        println!("  ... and {} more results", results.len() - limit);
    }
}
