use clap::{Arg, Command as ClapCommand, ArgAction};
use std::path::Path;
use std::process;
use log::{error, LevelFilter};

use georeproject::utils::logger::Logger;
use georeproject::commands::{CommandFactory, GeoreprojectCommandFactory};

fn main() {
    let matches = ClapCommand::new("georeproject")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reproject GeoTIFF rasters to an EPSG coordinate reference system")
        .arg(
            Arg::new("input")
                .help("Input GeoTIFF file")
                .required_unless_present("fetch")
                .index(1),
        )
        .arg(
            Arg::new("epsg")
                .long("epsg")
                .help("Target EPSG code (e.g., 4326 for WGS84, 3857 for Web Mercator)")
                .value_name("CODE")
                .required_unless_present("fetch"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Output format (tif, tiff, jpg, jpeg, png)")
                .value_name("FMT")
                .default_value("tif"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for produced rasters, world files and archives")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("upload-dir")
                .long("upload-dir")
                .help("Directory uploads are staged in when bundling")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("max-input-bytes")
                .long("max-input-bytes")
                .help("Reject inputs larger than this many bytes")
                .value_name("BYTES"),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("GeoTIFF output compression (none, deflate, zstd)")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("bundle")
                .short('b')
                .long("bundle")
                .help("Package the outputs into a ZIP archive")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("fetch")
                .long("fetch")
                .help("Look up a previously produced archive by name")
                .value_name("ARCHIVE")
                .conflicts_with_all(["input", "bundle"]),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Copy the fetched archive to this file")
                .value_name("FILE")
                .requires("fetch"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append log records to this file as well as stderr")
                .value_name("FILE"),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { LevelFilter::Debug } else { LevelFilter::Info };
    match matches.get_one::<String>("log-file") {
        Some(log_file) => {
            if let Err(e) = Logger::init_global_logger(Path::new(log_file), level) {
                eprintln!("Error setting up global logger: {}", e);
                process::exit(1);
            }
        },
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
                .init();
        },
    }

    let factory = GeoreprojectCommandFactory::new();

    let result = factory.create_command(&matches).and_then(|command| command.execute());
    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(if e.is_client_error() { 2 } else { 1 });
    }
}
