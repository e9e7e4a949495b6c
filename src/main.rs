mod crawl;
mod enrich;
mod fetch;
mod merge;
mod parse;
mod store;

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::enrich::EnrichFields;
use crate::fetch::Fetcher;
use crate::store::CharacterRecord;

#[derive(Parser)]
#[command(name = "hanzi_scraper", about = "Hanzi attribute scraper for zidian.txcx.com")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: crawl all three taxonomies, merge, then enrich
    Run,
    /// Crawl wuxing/structure/radical listings and write the merged dataset
    Crawl,
    /// Visit detail pages to fill in the common and lucky flags
    Enrich,
    /// Fill in only the common flag
    EnrichCommon,
    /// Fill in only the lucky flag
    EnrichLucky,
    /// Dataset statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => {
            run_crawl().await?;
            run_enrich(EnrichFields::Both).await
        }
        Commands::Crawl => run_crawl().await,
        Commands::Enrich => run_enrich(EnrichFields::Both).await,
        Commands::EnrichCommon => run_enrich(EnrichFields::CommonOnly).await,
        Commands::EnrichLucky => run_enrich(EnrichFields::LuckyOnly).await,
        Commands::Stats => {
            let records = store::load()?;
            print_summary(&records);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Phases 1-3 plus the merge: each crawl returns its own map, then one pure
/// join produces the dataset.
async fn run_crawl() -> Result<()> {
    let fetcher = Fetcher::new()?;

    println!("Phase 1: wuxing listings");
    let wuxing = crawl::wuxing::crawl(&fetcher).await;
    println!("Phase 1 done: {} characters", wuxing.len());

    println!("Phase 2: structure listings");
    let structures = crawl::jiegou::crawl(&fetcher).await;
    println!("Phase 2 done: {} structure mappings", structures.len());

    println!("Phase 3: radical listings");
    let radicals = crawl::bushou::crawl(&fetcher).await;
    println!("Phase 3 done: {} radical mappings", radicals.len());

    let records = merge::merge(&wuxing, &structures, &radicals);
    store::save(&records)?;
    println!("Merged {} records -> {}", records.len(), store::DATA_PATH);
    print_summary(&records);
    Ok(())
}

/// Phase 4 against the existing dataset file.
async fn run_enrich(fields: EnrichFields) -> Result<()> {
    let mut records = store::load()?;
    println!("Loaded {} records from {}", records.len(), store::DATA_PATH);
    let stats = enrich::enrich(&mut records, fields).await?;
    stats.print();
    Ok(())
}

fn print_summary(records: &[CharacterRecord]) {
    if records.is_empty() {
        println!("Dataset is empty.");
        return;
    }
    let total = records.len();
    let with_radical = records.iter().filter(|r| !r.radical.is_empty()).count();
    let with_structure = records.iter().filter(|r| !r.structure.is_empty()).count();
    let common = records.iter().filter(|r| r.common.is_yes()).count();
    let lucky = records.iter().filter(|r| r.lucky.is_yes()).count();
    let pending = enrich::pending_indices(records, EnrichFields::Both).len();

    let mut wuxing_dist: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *wuxing_dist.entry(r.wuxing.as_str()).or_default() += 1;
    }
    let dist = wuxing_dist
        .iter()
        .map(|(w, n)| format!("{}: {}", w, n))
        .collect::<Vec<_>>()
        .join(", ");

    println!("Total:      {}", total);
    println!(
        "Radical:    {}/{} ({:.1}%)",
        with_radical,
        total,
        with_radical as f64 / total as f64 * 100.0
    );
    println!(
        "Structure:  {}/{} ({:.1}%)",
        with_structure,
        total,
        with_structure as f64 / total as f64 * 100.0
    );
    println!("Wuxing:     {}", dist);
    println!("Common:     {}", common);
    println!("Lucky:      {}", lucky);
    println!("Unenriched: {}", pending);
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
