//! The generation passes.
//!
//! Each pass is a [`Task`]: named for progress reporting, advisory about
//! cancellation, and executed exactly once by [`run`]. Passes receive their
//! input layers by reference and hand their artifacts back to the caller,
//! which chains them forward; nothing is shared through ambient state.

mod country_map;
mod name_table;
mod region_map;

pub use country_map::CountryMapTask;
pub use name_table::NameTableTask;
pub use region_map::RegionMapTask;

use crate::config;
use crate::layer::{Feature, Layer};
use crate::names::NameTable;
use std::collections::{BTreeMap, BTreeSet};
use std::num::TryFromIntError;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An output file could not be written.
    #[error("{1}: I/O error: {0}")]
    Io(std::io::Error, PathBuf),

    /// A feature is missing the attribute that names it.
    #[error("{layer} layer, feature {index}: missing attribute {field:?}")]
    MissingAttribute {
        layer: String,
        index: usize,
        field: &'static str,
    },

    /// The timezone layer produced no identifiers at all.
    #[error("the timezone layer contains no zone identifiers")]
    EmptyZoneLayer,

    /// The packed name table outgrew the enumeration's 16-bit value type.
    #[error("timezone name offsets exceed the 16-bit enumeration range: {0}")]
    OffsetRange(#[from] TryFromIntError),

    /// A subdivision code too short to carry its country prefix.
    #[error("{layer} layer, feature {index}: subdivision code {code:?} has no country prefix")]
    ShortSubdivisionCode {
        layer: String,
        index: usize,
        code: String,
    },

    /// A subdivision whose country the country layer does not contain.
    #[error("subdivision {code} belongs to {country}, which the country layer does not contain")]
    ForeignSubdivision { code: String, country: String },

    /// A generated table references a zone missing from the name table.
    #[error("{table} references {zone}, which is not in the timezone name table")]
    DanglingZone { table: &'static str, zone: String },
}

/// Zones admitted per country code, keyed as the layer spells the code.
pub type CountryZones = BTreeMap<String, BTreeSet<String>>;

/// Accumulated overlap area per admitted zone, per subdivision code.
pub type SubdivisionZones = BTreeMap<String, BTreeMap<String, f64>>;

/// Countries admitted per raw zone identifier.
pub type ZoneCountries = BTreeMap<String, BTreeSet<String>>;

/// A single generation pass over the loaded layers.
pub trait Task {
    /// What the pass produces for downstream passes and checks.
    type Output;

    /// The display name used for progress reporting.
    fn name(&self) -> &str;

    /// Whether a hosting scheduler could interrupt this pass. Advisory;
    /// the one-shot runner never does.
    fn can_cancel(&self) -> bool {
        true
    }

    /// Executes the pass and reports success.
    fn run(self) -> Result<Self::Output>;
}

/// Drives one task to completion, with progress reporting.
pub fn run<T: Task>(task: T) -> Result<T::Output> {
    log::debug!(
        "Scheduling {:?} (cancellable: {})",
        task.name(),
        task.can_cancel()
    );
    log::info!("{}", task.name());
    let start = Instant::now();
    let output = task.run()?;
    log::debug!("Task finished in {:.2?}", start.elapsed());
    Ok(output)
}

/// Cross-checks that every zone the emitted map rows reference exists in the
/// name table, so the generated files always agree with each other. A
/// normalized zone can only go missing when the normalization map points at
/// an identifier the boundary data does not contain.
pub fn verify_references(
    names: &NameTable,
    countries: &CountryZones,
    subdivisions: &SubdivisionZones,
    zones: &ZoneCountries,
) -> Result<()> {
    let country_refs = countries
        .values()
        .filter(|zones| zones.len() == 1)
        .flatten()
        .map(|zone| ("the country timezone map", zone));
    let subdivision_refs = subdivisions
        .values()
        .flatten()
        .map(|(zone, _)| ("the subdivision timezone map", zone));
    let zone_refs = zones
        .iter()
        .filter(|(_, countries)| countries.len() == 1)
        .map(|(zone, _)| ("the timezone country map", zone));

    for (table, zone) in country_refs.chain(subdivision_refs).chain(zone_refs) {
        if !names.contains(zone) {
            return Err(Error::DanglingZone {
                table,
                zone: zone.clone(),
            });
        }
    }
    Ok(())
}

/// Dual-bound admission: a zone counts as present in a region when the
/// overlap exceeds either share from the static configuration. Both bounds
/// are strict.
fn admits(overlap: f64, zone_area: f64, region_area: f64) -> bool {
    overlap / zone_area > config::ZONE_AREA_RATIO
        || overlap / region_area > config::REGION_AREA_RATIO
}

fn required_attribute<'a>(
    layer: &Layer,
    index: usize,
    feature: &'a Feature,
    field: &'static str,
) -> Result<&'a str> {
    feature
        .attribute(field)
        .ok_or_else(|| Error::MissingAttribute {
            layer: layer.name().into(),
            index,
            field,
        })
}

fn write_output(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|err| Error::Io(err, path.clone()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
