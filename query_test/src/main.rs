use store_index::config::ServiceConfig;
use store_index::facade::QueryFacade;
use store_index::{io, EntityId, Measure, Period};

use log::info;
use std::time::Instant;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Input csv file or glob pattern
    #[arg(short, long)]
    input_filename: String,

    //Yaml config; defaults are used when missing
    #[arg(short, long)]
    config_filename: Option<String>,

    //Store number to look up
    #[arg(short, long)]
    store: String,

    //Compare with this many closest stores (the store itself included)
    #[arg(short, long)]
    neighbors: Option<i64>,

    //Quarter for the neighbor comparison
    #[arg(short, long, default_value = "2021Q1")]
    quarter: String,

    //Measure to print series for
    #[arg(short, long, default_value = "sale_dollars")]
    measure: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {

    env_logger::init();

    let args = Args::parse();

    let config = match &args.config_filename {
        Some(filename) => ServiceConfig::from_file(filename)?,
        None => ServiceConfig::default(),
    };

    if let Some(n) = args.neighbors {
        if n > config.max_neighbors as i64 {
            return Err(format!("at most {} neighbors can be compared", config.max_neighbors).into());
        }
    }

    let period: Period = args.quarter.parse()?;
    let measure: Measure = args.measure.parse()?;
    let store = EntityId::new(&args.store);

    let report = io::read_records_from_pattern(&args.input_filename, &config.columns)?;
    let (facade, _) = QueryFacade::build(&report.records, config);

    let start = Instant::now();

    let stats = facade.stats_for(&store)?;
    let neighbors = facade.neighbors_with_records(&store, args.neighbors, &period)?;

    info!("queries took {}s", start.elapsed().as_secs_f64());

    let neighbor_series: Vec<_> = neighbors
        .iter()
        .map(|n| serde_json::json!({
            "id": n.entity_id,
            "distance": n.distance,
            "total": n.partition.total(measure),
            "series": n.partition.series(measure),
        }))
        .collect();

    let output = serde_json::json!({
        "store": store,
        "measure": measure,
        "series": stats.series(measure),
        "periods": stats.periods(),
        "quarter": period,
        "neighbors": neighbor_series,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
