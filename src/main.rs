//! Generates the data tables for a compile-time timezone lookup library.
//!
//! Three boundary layers go in (timezone polygons, countries, country
//! subdivisions, all GeoJSON), five C++ source files come out: a packed
//! blob of every zone identifier, its offset enumeration, and three maps
//! relating ISO 3166 regions and zones to each other. The run is a
//! one-shot batch: load the layers, execute the three passes in order,
//! cross-check the results, exit.

use crate::layer::Layer;
use crate::tasks::{CountryMapTask, NameTableTask, RegionMapTask};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

mod config;
mod emit;
mod layer;
mod names;
mod tasks;

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] <timezones.geojson> <countries.geojson> <subdivisions.geojson>\n");
    println!("or, use environment variables:");
    println!("    TZDATAGEN_ZONE_LAYER");
    println!("    TZDATAGEN_COUNTRY_LAYER");
    println!("    TZDATAGEN_SUBDIVISION_LAYER\n");
    println!("Options:");
    println!("    --out-dir: Directory for the generated files (default: data)\n");
    Err(anyhow::Error::msg(err))
}

fn free_arg(
    args: &mut pico_args::Arguments,
    key: &str,
    err: &'static str,
) -> anyhow::Result<String> {
    if let Some(arg) = args.opt_free_from_str::<String>()? {
        Ok(arg)
    } else if let Ok(arg) = std::env::var(key) {
        Ok(arg)
    } else {
        usage(err)
    }
}

fn load_layer(name: &'static str, path: &str) -> anyhow::Result<Layer> {
    let layer = Layer::from_file(name, Path::new(path))?;
    log::info!("Loaded {} {name} features from {path}", layer.features().len());
    Ok(layer)
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = pico_args::Arguments::from_env();
    let out_dir: PathBuf = args
        .opt_value_from_str("--out-dir")?
        .unwrap_or_else(|| "data".into());
    let _ = args.contains("--");
    let zones_path = free_arg(
        &mut args,
        "TZDATAGEN_ZONE_LAYER",
        "Missing timezone layer argument",
    )?;
    let countries_path = free_arg(
        &mut args,
        "TZDATAGEN_COUNTRY_LAYER",
        "Missing country layer argument",
    )?;
    let subdivisions_path = free_arg(
        &mut args,
        "TZDATAGEN_SUBDIVISION_LAYER",
        "Missing subdivision layer argument",
    )?;

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let zones = load_layer("timezone", &zones_path)?;
    let countries = load_layer("country", &countries_path)?;
    let subdivisions = load_layer("subdivision", &subdivisions_path)?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let names = tasks::run(NameTableTask::new(&zones, &out_dir))?;
    let (country_zones, subdivision_zones) = tasks::run(RegionMapTask::new(
        &countries,
        &subdivisions,
        &zones,
        &out_dir,
    ))?;
    let zone_countries = tasks::run(CountryMapTask::new(&countries, &zones, &out_dir))?;

    tasks::verify_references(&names, &country_zones, &subdivision_zones, &zone_countries)?;
    log::info!("Generated all tables into {}", out_dir.display());
    Ok(())
}
