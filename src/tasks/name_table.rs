//! The timezone name table pass.

use super::{Error, Result, Task, required_attribute, write_output};
use crate::config;
use crate::emit;
use crate::layer::Layer;
use crate::names::NameTable;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Packs every zone identifier in the timezone layer into the name blob and
/// its offset enumeration.
pub struct NameTableTask<'a> {
    zones: &'a Layer,
    out_dir: PathBuf,
}

impl<'a> NameTableTask<'a> {
    pub fn new(zones: &'a Layer, out_dir: &Path) -> Self {
        Self {
            zones,
            out_dir: out_dir.into(),
        }
    }

    /// Collects the raw identifiers. Normalization does not apply here: the
    /// table must carry every spelling the data uses, because the timezone
    /// to country table is keyed by the raw spelling.
    pub(super) fn collect(&self) -> Result<NameTable> {
        let mut ids = BTreeSet::new();
        for (index, feature) in self.zones.features().iter().enumerate() {
            let id = required_attribute(self.zones, index, feature, config::ZONE_ID_FIELD)?;
            ids.insert(id.to_owned());
        }
        NameTable::new(ids).ok_or(Error::EmptyZoneLayer)
    }

    pub(super) fn render(names: &NameTable) -> Result<[(&'static str, String); 2]> {
        Ok([
            ("timezone_name_table.cpp", emit::name_blob(names)),
            ("timezone_names_p.h", emit::name_enum(names)?),
        ])
    }
}

impl Task for NameTableTask<'_> {
    type Output = NameTable;

    fn name(&self) -> &str {
        "Generating the timezone name table"
    }

    fn run(self) -> Result<Self::Output> {
        let names = self.collect()?;
        log::info!("Collected {} timezone names", names.len());
        for (name, contents) in Self::render(&names)? {
            write_output(&self.out_dir, name, &contents)?;
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;

    fn zones(features: &str) -> Layer {
        let json = format!(r#"{{"type":"FeatureCollection","features":[{features}]}}"#);
        Layer::from_json("timezone", json.as_bytes()).unwrap()
    }

    fn zone(tzid: &str) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"tzid":{tzid}}},"geometry":{{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}}}"#
        )
    }

    #[test]
    fn identifiers_are_deduplicated_and_sorted() {
        let layer = zones(&[zone("\"B/X\""), zone("\"A/Y\""), zone("\"B/X\"")].join(","));
        let task = NameTableTask::new(&layer, Path::new("."));
        let names = task.collect().unwrap();

        let ids = Vec::from_iter(names.iter().map(|(id, _)| id));
        assert_eq!(ids, ["A/Y", "B/X"]);
    }

    #[test]
    fn an_empty_layer_is_an_error() {
        let layer = zones("");
        let task = NameTableTask::new(&layer, Path::new("."));
        assert!(matches!(task.collect(), Err(Error::EmptyZoneLayer)));
    }

    #[test]
    fn a_feature_without_an_identifier_is_an_error() {
        let layer = zones(&zone("null"));
        let task = NameTableTask::new(&layer, Path::new("."));
        assert!(matches!(
            task.collect(),
            Err(Error::MissingAttribute {
                field: "tzid",
                index: 0,
                ..
            })
        ));
    }
}
