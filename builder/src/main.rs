use store_index::config::ServiceConfig;
use store_index::facade::QueryFacade;
use store_index::io;
use store_index::RawRecord;

use kdam::tqdm;
use log::info;
use std::fs::File;
use std::io::Write;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    //Input csv file or glob pattern, e.g. "data/liquor_*.csv"
    #[arg(short, long)]
    input_filename: String,

    //Yaml config; defaults are used when missing
    #[arg(short, long)]
    config_filename: Option<String>,

    //Where to write the store markers as geojson
    #[arg(short, long)]
    geojson_filename: Option<String>,

    //Write the effective config to this file
    #[arg(short, long)]
    write_config: Option<String>,

    //Print the kd tree layout
    #[arg(short, long, default_value_t = false)]
    print_tree: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {

    env_logger::init();

    let args = Args::parse();
    info!("{:?}", &args);

    let config = match &args.config_filename {
        Some(filename) => ServiceConfig::from_file(filename)?,
        None => ServiceConfig::default(),
    };

    if let Some(filename) = &args.write_config {
        config.to_file(filename)?;
        info!("wrote config to {}", filename);
    }

    let filenames = io::expand_pattern(&args.input_filename)?;
    if filenames.is_empty() {
        return Err(format!("no input files match {}", args.input_filename).into());
    }

    let mut records: Vec<RawRecord> = Vec::new();
    let mut skipped: usize = 0;

    for filename in tqdm!(filenames.iter()) {
        let report = io::read_records_from_file(filename, &config.columns)?;
        records.extend(report.records);
        skipped += report.skipped;
    }

    let (facade, report) = QueryFacade::build(&records, config);

    println!("records read:      {}", records.len());
    println!("rows skipped:      {}", skipped);
    println!("stores:            {}", report.stores);
    println!("stores excluded:   {}", report.excluded_stores);
    println!("records dropped:   {}", report.dropped_records);
    println!("tree depth:        {}", report.tree_depth);
    println!("tree leaves:       {}", report.tree_leaves);

    if let Some(center) = facade.map_center() {
        println!("map center:        {:.6}, {:.6}", center.lat, center.lon);
    }

    if let Some(filename) = &args.geojson_filename {
        let geojson = facade.catalog().to_geojson();
        let mut file = File::create(filename)?;
        file.write_all(geojson.to_string().as_bytes())?;
        info!("wrote {} markers to {}", facade.catalog().len(), filename);
    }

    if args.print_tree {
        for line in facade.tree().describe() {
            println!("{}", line);
        }
    }

    Ok(())
}
