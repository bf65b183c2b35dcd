//! The region to timezone mapping pass.

use super::{
    CountryZones, Error, Result, SubdivisionZones, Task, admits, required_attribute, write_output,
};
use crate::config;
use crate::emit;
use crate::layer::Layer;
use std::path::{Path, PathBuf};

/// Maps countries and subdivisions to the timezones that cover them.
///
/// Countries that resolve to one zone fill the country table directly; the
/// rest are broken down by their subdivisions, each listing its candidate
/// zones by descending overlap.
pub struct RegionMapTask<'a> {
    countries: &'a Layer,
    subdivisions: &'a Layer,
    zones: &'a Layer,
    out_dir: PathBuf,
}

impl<'a> RegionMapTask<'a> {
    pub fn new(
        countries: &'a Layer,
        subdivisions: &'a Layer,
        zones: &'a Layer,
        out_dir: &Path,
    ) -> Self {
        Self {
            countries,
            subdivisions,
            zones,
            out_dir: out_dir.into(),
        }
    }

    /// Admits zones per country. Codes stay exactly as the layer spells
    /// them; zone identifiers are normalized. A country split over several
    /// features unions the zones of all of them.
    pub(super) fn collect_countries(&self) -> Result<CountryZones> {
        let mut map = CountryZones::new();
        for (index, country) in self.countries.features().iter().enumerate() {
            let code =
                required_attribute(self.countries, index, country, config::COUNTRY_CODE_FIELD)?;
            let admitted = map.entry(code.to_owned()).or_default();
            for (zone_index, zone) in self.zones.features().iter().enumerate() {
                if !zone.shape().intersects(country.shape()) {
                    continue;
                }
                let overlap = zone.shape().intersection_area(country.shape());
                if !admits(overlap, zone.shape().area(), country.shape().area()) {
                    continue;
                }
                let id = required_attribute(self.zones, zone_index, zone, config::ZONE_ID_FIELD)?;
                admitted.insert(config::normalized_zone(id).to_owned());
            }
            log::trace!("{code}: {} zones", admitted.len());
        }
        Ok(map)
    }

    /// Admits zones per subdivision of every multi-zone country, summing the
    /// overlap when a zone matches across several features. Subdivisions of
    /// countries the country table already answers are skipped.
    pub(super) fn collect_subdivisions(
        &self,
        countries: &CountryZones,
    ) -> Result<SubdivisionZones> {
        let mut map = SubdivisionZones::new();
        for (index, subdivision) in self.subdivisions.features().iter().enumerate() {
            let code = required_attribute(
                self.subdivisions,
                index,
                subdivision,
                config::SUBDIVISION_CODE_FIELD,
            )?;
            let country = code.get(..2).ok_or_else(|| Error::ShortSubdivisionCode {
                layer: self.subdivisions.name().into(),
                index,
                code: code.into(),
            })?;
            let country_zones =
                countries
                    .get(country)
                    .ok_or_else(|| Error::ForeignSubdivision {
                        code: code.into(),
                        country: country.into(),
                    })?;
            if country_zones.len() <= 1 {
                continue;
            }

            let overlaps = map.entry(code.to_owned()).or_default();
            for (zone_index, zone) in self.zones.features().iter().enumerate() {
                if !zone.shape().intersects(subdivision.shape()) {
                    continue;
                }
                let overlap = zone.shape().intersection_area(subdivision.shape());
                if !admits(overlap, zone.shape().area(), subdivision.shape().area()) {
                    continue;
                }
                let id = required_attribute(self.zones, zone_index, zone, config::ZONE_ID_FIELD)?;
                *overlaps
                    .entry(config::normalized_zone(id).to_owned())
                    .or_default() += overlap;
            }
            log::trace!("{code}: {} zones", overlaps.len());
        }
        Ok(map)
    }

    /// One row per country with exactly one admitted zone. Countries with
    /// none or several produce nothing here.
    pub(super) fn country_rows(countries: &CountryZones) -> Vec<String> {
        let mut rows = Vec::new();
        for (code, zones) in countries {
            let mut zones = zones.iter();
            if let (Some(zone), None) = (zones.next(), zones.next()) {
                rows.push(emit::country_row(code, zone));
            }
        }
        rows
    }

    /// Rows per subdivision, zones ordered by descending accumulated
    /// overlap. Area ties keep identifier order; the stable sort over the
    /// ordered accumulator makes reruns identical. A subdivision that
    /// admitted nothing leaves a placeholder comment.
    pub(super) fn subdivision_rows(subdivisions: &SubdivisionZones) -> Vec<String> {
        let mut rows = Vec::new();
        for (code, overlaps) in subdivisions {
            if overlaps.is_empty() {
                rows.push(emit::unmatched_region_row(code));
                continue;
            }
            let mut zones = Vec::from_iter(overlaps);
            zones.sort_by(|a, b| b.1.total_cmp(a.1));
            for (zone, _) in zones {
                rows.push(emit::subdivision_row(code, zone));
            }
        }
        rows
    }

    pub(super) fn render(
        countries: &CountryZones,
        subdivisions: &SubdivisionZones,
    ) -> [(&'static str, String); 2] {
        [
            (
                "country_timezone_map.cpp",
                emit::map_array(
                    "uint16_t",
                    "country_timezone_map",
                    &Self::country_rows(countries),
                ),
            ),
            (
                "subdivision_timezone_map.cpp",
                emit::map_array(
                    "uint32_t",
                    "subdivision_timezone_map",
                    &Self::subdivision_rows(subdivisions),
                ),
            ),
        ]
    }
}

impl Task for RegionMapTask<'_> {
    type Output = (CountryZones, SubdivisionZones);

    fn name(&self) -> &str {
        "Computing the region to timezone maps"
    }

    fn run(self) -> Result<Self::Output> {
        let countries = self.collect_countries()?;
        log::info!(
            "{} of {} countries resolve to a single timezone",
            countries.values().filter(|zones| zones.len() == 1).count(),
            countries.len()
        );
        let subdivisions = self.collect_subdivisions(&countries)?;
        log::info!(
            "Mapped {} subdivisions of multi-zone countries",
            subdivisions.len()
        );
        for (name, contents) in Self::render(&countries, &subdivisions) {
            write_output(&self.out_dir, name, &contents)?;
        }
        Ok((countries, subdivisions))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{country, subdivision, world_layer, zone};
    use super::*;

    #[test]
    fn a_country_unions_zones_across_its_features() {
        // Mainland and an overseas part, tagged with the same code.
        let countries = world_layer(
            "country",
            &[
                country("FR", 0.0, 0.0, 4.0, 4.0),
                country("FR", 10.0, 0.0, 12.0, 2.0),
            ],
        );
        let subdivisions = world_layer("subdivision", &[]);
        let zones = world_layer(
            "timezone",
            &[
                zone("Europe/Paris", 0.0, 0.0, 4.0, 4.0),
                zone("Indian/Reunion", 10.0, 0.0, 12.0, 2.0),
            ],
        );
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        let admitted = Vec::from_iter(map["FR"].iter().map(String::as_str));
        assert_eq!(admitted, ["Europe/Paris", "Indian/Reunion"]);
        assert!(
            RegionMapTask::country_rows(&map).is_empty(),
            "a multi-zone country must not produce a country row"
        );
    }

    #[test]
    fn admission_bounds_are_strict() {
        // The overlap is exactly 1% of the zone and exactly 10% of the
        // country, so neither bound is exceeded.
        let countries = world_layer("country", &[country("AA", 0.0, 0.0, 10.0, 1.0)]);
        let subdivisions = world_layer("subdivision", &[]);
        let zones = world_layer("timezone", &[zone("Test/Zone", 9.0, 0.0, 109.0, 1.0)]);
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        assert!(map["AA"].is_empty());
    }

    #[test]
    fn zone_normalization_applies_to_admitted_zones() {
        let countries = world_layer("country", &[country("UA", 0.0, 0.0, 2.0, 2.0)]);
        let subdivisions = world_layer("subdivision", &[]);
        let zones = world_layer("timezone", &[zone("Europe/Uzhgorod", 0.0, 0.0, 2.0, 2.0)]);
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        assert!(map["UA"].contains("Europe/Kiev"));
    }

    #[test]
    fn subdivision_overlaps_sum_across_zone_features() {
        let countries = world_layer("country", &[country("US", 0.0, 0.0, 8.0, 8.0)]);
        let subdivisions = world_layer("subdivision", &[subdivision("US-CO", 0.0, 0.0, 6.0, 8.0)]);
        // One zone split into two features, plus a second zone so the
        // country counts as multi-zone.
        let zones = world_layer(
            "timezone",
            &[
                zone("America/Denver", 0.0, 0.0, 4.0, 4.0),
                zone("America/Denver", 0.0, 4.0, 4.0, 8.0),
                zone("America/Phoenix", 4.0, 0.0, 8.0, 8.0),
            ],
        );
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        let overlaps = task.collect_subdivisions(&map).unwrap();
        assert_eq!(
            overlaps["US-CO"]["America/Denver"], 32.0,
            "both feature overlaps must accumulate"
        );
        assert_eq!(overlaps["US-CO"]["America/Phoenix"], 16.0);
    }

    #[test]
    fn equal_overlaps_keep_identifier_order() {
        // Two zones covering one half of the subdivision each, listed in
        // reverse identifier order in the layer.
        let countries = world_layer("country", &[country("AA", 0.0, 0.0, 8.0, 4.0)]);
        let subdivisions = world_layer("subdivision", &[subdivision("AA-ZZ", 0.0, 0.0, 8.0, 4.0)]);
        let zones = world_layer(
            "timezone",
            &[
                zone("Test/Beta", 4.0, 0.0, 8.0, 4.0),
                zone("Test/Alpha", 0.0, 0.0, 4.0, 4.0),
            ],
        );
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        let overlaps = task.collect_subdivisions(&map).unwrap();
        assert_eq!(
            overlaps["AA-ZZ"]["Test/Alpha"], overlaps["AA-ZZ"]["Test/Beta"],
            "the two overlaps must tie exactly"
        );
        assert_eq!(
            RegionMapTask::subdivision_rows(&overlaps),
            [
                emit::subdivision_row("AA-ZZ", "Test/Alpha"),
                emit::subdivision_row("AA-ZZ", "Test/Beta"),
            ],
            "tied areas must keep the identifier order"
        );
    }

    #[test]
    fn subdivisions_of_single_zone_countries_are_skipped() {
        let countries = world_layer("country", &[country("DE", 0.0, 0.0, 4.0, 4.0)]);
        let subdivisions = world_layer("subdivision", &[subdivision("DE-BW", 0.0, 0.0, 2.0, 2.0)]);
        let zones = world_layer("timezone", &[zone("Europe/Berlin", 0.0, 0.0, 4.0, 4.0)]);
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        let overlaps = task.collect_subdivisions(&map).unwrap();
        assert!(overlaps.is_empty());
    }

    #[test]
    fn a_subdivision_of_an_unknown_country_is_an_error() {
        let countries = world_layer("country", &[country("DE", 0.0, 0.0, 4.0, 4.0)]);
        let subdivisions = world_layer("subdivision", &[subdivision("XX-YY", 0.0, 0.0, 2.0, 2.0)]);
        let zones = world_layer("timezone", &[zone("Europe/Berlin", 0.0, 0.0, 4.0, 4.0)]);
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        assert!(matches!(
            task.collect_subdivisions(&map),
            Err(Error::ForeignSubdivision { .. })
        ));
    }

    #[test]
    fn a_one_character_subdivision_code_is_an_error() {
        let countries = world_layer("country", &[country("DE", 0.0, 0.0, 4.0, 4.0)]);
        let subdivisions = world_layer("subdivision", &[subdivision("X", 0.0, 0.0, 2.0, 2.0)]);
        let zones = world_layer("timezone", &[zone("Europe/Berlin", 0.0, 0.0, 4.0, 4.0)]);
        let task = RegionMapTask::new(&countries, &subdivisions, &zones, Path::new("."));

        let map = task.collect_countries().unwrap();
        assert!(matches!(
            task.collect_subdivisions(&map),
            Err(Error::ShortSubdivisionCode { .. })
        ));
    }
}
