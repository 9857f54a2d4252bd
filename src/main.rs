//! Entry point for the datadict tool.
//! Handles CLI parsing, data loading, and dispatches listings or processing pipelines.

use clap::Parser;
mod cli;

use cli::Args;
use datadict::config::PipelineConfig;
use datadict::inspect::{describe_field, field_summary, print_structure};
use datadict::{
    datadict_from_netcdf_group, datadict_to_netcdf_group, get_parallel_info, group_names, meshgrid_to_datadict,
    LoadOptions, NodeData, ParallelConfig,
};

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> datadict::Result<()> {
    println!(
        r#"
------------------------------------------------------------------
                 _       _               _ _      _
              __| | __ _| |_ __ _     __| (_) ___| |_
             / _` |/ _` | __/ _` |   / _` | |/ __| __|
            | (_| | (_| | || (_| |  | (_| | | (__| |_
             \__,_|\__,_|\__\__,_|   \__,_|_|\___|\__|
                 measurement data on and off the grid
------------------------------------------------------------------
"#
    );

    let parallel = match args.threads {
        Some(n) => ParallelConfig::with_threads(n),
        None => ParallelConfig::all_cores(),
    };
    parallel.setup_global_pool()?;
    get_parallel_info().log();

    if args.list_groups {
        println!("Groups in {}:", args.file.display());
        for name in group_names(&args.file)? {
            println!("    {name}");
        }
    }

    let data = datadict_from_netcdf_group(&args.file, &args.group, &LoadOptions::default())?;
    log::info!(
        "Loaded {} fields with {} records from {}:{}",
        data.len(),
        data.nrecords(),
        args.file.display(),
        args.group
    );

    if args.list {
        print_structure(&data);
    }
    if let Some(name) = &args.describe {
        describe_field(&data, name)?;
    }
    if let Some(name) = &args.summary {
        field_summary(&data, name)?.print();
    }

    if !args.has_processing() {
        if !args.list && !args.list_groups && args.describe.is_none() && args.summary.is_none() {
            print_structure(&data);
        }
        return Ok(());
    }

    let pipeline = match &args.pipeline {
        Some(path) => PipelineConfig::from_file(path)?,
        None => args.flag_pipeline(),
    };
    let flowchart = pipeline.to_flowchart()?;
    log::info!("Running pipeline: {}", flowchart.node_names().join(" -> "));

    let Some(result) = flowchart.run(NodeData::Tabular(data))? else {
        log::warn!("Pipeline produced no output");
        return Ok(());
    };

    println!("\n Result ({})", result.kind());
    print_structure(result.base());

    if let Some(output) = &args.output {
        let tabular = match result {
            NodeData::Tabular(d) => d,
            NodeData::Meshgrid(d) => meshgrid_to_datadict(&d)?,
        };
        let group = args.output_group.as_deref().unwrap_or(&args.group);
        datadict_to_netcdf_group(&tabular, output, group, args.append)?;
        println!("✅ Saved result to {}:{group}", output.display());
    }

    Ok(())
}
