//! The timezone to country mapping pass.

use super::{Result, Task, ZoneCountries, admits, required_attribute, write_output};
use crate::config;
use crate::emit;
use crate::layer::Layer;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Maps each timezone back to the single country it belongs to, where such
/// a country exists.
pub struct CountryMapTask<'a> {
    countries: &'a Layer,
    zones: &'a Layer,
    out_dir: PathBuf,
}

impl<'a> CountryMapTask<'a> {
    pub fn new(countries: &'a Layer, zones: &'a Layer, out_dir: &Path) -> Self {
        Self {
            countries,
            zones,
            out_dir: out_dir.into(),
        }
    }

    /// Admits countries per zone. The keys are raw zone identifiers so they
    /// always match the name table; country codes are normalized, and codes
    /// that normalize to nothing are skipped. Countries accumulate across
    /// features sharing one identifier, and exactly-two-way ties are
    /// settled by the preference list.
    pub(super) fn collect(&self) -> Result<ZoneCountries> {
        let mut map = ZoneCountries::new();
        for (index, zone) in self.zones.features().iter().enumerate() {
            let id = required_attribute(self.zones, index, zone, config::ZONE_ID_FIELD)?;
            let admitted = map.entry(id.to_owned()).or_default();
            for (country_index, country) in self.countries.features().iter().enumerate() {
                let code = required_attribute(
                    self.countries,
                    country_index,
                    country,
                    config::COUNTRY_CODE_FIELD,
                )?;
                let code = config::normalized_country(code);
                if code.is_empty() || !country.shape().intersects(zone.shape()) {
                    continue;
                }
                let overlap = country.shape().intersection_area(zone.shape());
                if admits(overlap, zone.shape().area(), country.shape().area()) {
                    admitted.insert(code.to_owned());
                }
            }
            log::trace!("{id}: {} countries", admitted.len());
        }

        for admitted in map.values_mut() {
            disambiguate(admitted);
        }
        Ok(map)
    }

    /// One row per zone with exactly one admitted country; the rest leave a
    /// placeholder comment.
    pub(super) fn rows(map: &ZoneCountries) -> Vec<String> {
        let mut rows = Vec::new();
        for (zone, codes) in map {
            let mut codes = codes.iter();
            match (codes.next(), codes.next()) {
                (Some(code), None) => rows.push(emit::zone_country_row(zone, code)),
                _ => rows.push(emit::unresolved_zone_row(zone)),
            }
        }
        rows
    }

    pub(super) fn render(zones: &ZoneCountries) -> (&'static str, String) {
        (
            "timezone_country_map.cpp",
            emit::map_array("uint16_t", "timezone_country_map", &Self::rows(zones)),
        )
    }
}

/// Resolves an exactly-two-way tie using the ordered preference list: the
/// first pair with both members present drops the secondary. Sets of any
/// other size pass through untouched.
fn disambiguate(codes: &mut BTreeSet<String>) {
    if codes.len() != 2 {
        return;
    }
    for (preferred, secondary) in config::ISO3166_1_DISAMBIGUATION_MAP {
        if codes.contains(*preferred) && codes.contains(*secondary) {
            codes.remove(*secondary);
            return;
        }
    }
}

impl Task for CountryMapTask<'_> {
    type Output = ZoneCountries;

    fn name(&self) -> &str {
        "Computing the timezone to country map"
    }

    fn run(self) -> Result<Self::Output> {
        let zones = self.collect()?;
        let resolved = zones.values().filter(|codes| codes.len() == 1).count();
        log::info!(
            "{resolved} of {} timezones resolve to a single country",
            zones.len()
        );
        let (name, contents) = Self::render(&zones);
        write_output(&self.out_dir, name, &contents)?;
        Ok(zones)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{country, world_layer, zone};
    use super::*;

    fn codes(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn two_way_ties_follow_the_preference_list() {
        let mut tie = codes(&["CH", "DE"]);
        disambiguate(&mut tie);
        assert_eq!(tie, codes(&["DE"]), "the secondary country must drop");
    }

    #[test]
    fn unlisted_ties_stay_ambiguous() {
        let mut tie = codes(&["BE", "FR"]);
        disambiguate(&mut tie);
        assert_eq!(tie, codes(&["BE", "FR"]));
    }

    #[test]
    fn larger_ties_are_never_disambiguated() {
        let mut tie = codes(&["CH", "DE", "IT"]);
        disambiguate(&mut tie);
        assert_eq!(
            tie,
            codes(&["CH", "DE", "IT"]),
            "the preference list only applies to exactly two countries"
        );
    }

    #[test]
    fn countries_accumulate_across_zone_features() {
        let countries = world_layer(
            "country",
            &[
                country("AA", 0.0, 0.0, 2.0, 2.0),
                country("BB", 10.0, 0.0, 12.0, 2.0),
            ],
        );
        let zones = world_layer(
            "timezone",
            &[
                zone("Test/Split", 0.0, 0.0, 2.0, 2.0),
                zone("Test/Split", 10.0, 0.0, 12.0, 2.0),
            ],
        );
        let task = CountryMapTask::new(&countries, &zones, Path::new("."));

        let map = task.collect().unwrap();
        assert_eq!(
            map["Test/Split"],
            codes(&["AA", "BB"]),
            "every feature of a split zone must contribute its countries"
        );
    }

    #[test]
    fn codes_are_normalized_and_empty_codes_skipped() {
        let countries = world_layer(
            "country",
            &[
                country("UK", 0.0, 0.0, 2.0, 2.0),
                country("", 0.0, 0.0, 1.0, 1.0),
            ],
        );
        let zones = world_layer("timezone", &[zone("Europe/London", 0.0, 0.0, 2.0, 2.0)]);
        let task = CountryMapTask::new(&countries, &zones, Path::new("."));

        let map = task.collect().unwrap();
        assert_eq!(map["Europe/London"], codes(&["GB"]));
    }

    #[test]
    fn unresolved_zones_emit_placeholders() {
        let countries = world_layer("country", &[country("AA", 5.0, 0.0, 7.0, 2.0)]);
        let zones = world_layer("timezone", &[zone("Test/Nowhere", 0.0, 0.0, 2.0, 2.0)]);
        let task = CountryMapTask::new(&countries, &zones, Path::new("."));

        let map = task.collect().unwrap();
        assert_eq!(
            CountryMapTask::rows(&map),
            ["    // Tz::Test_Nowhere".to_owned()]
        );
    }
}
