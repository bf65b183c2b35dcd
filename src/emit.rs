//! Rendering of the generated C++ sources.
//!
//! The output format is a hard contract: the consuming library compiles
//! these files verbatim, and its build diffs regenerated output against the
//! checked-in copy. Everything here is a pure function from table data to
//! bytes, so a rerun over unchanged layers reproduces files exactly.

use crate::names::{self, NameTable};
use std::fmt::Write;
use std::num::TryFromIntError;

/// Attribution header opening every generated file. The data the tables are
/// derived from is OpenStreetMap's, so the files carry its license, not the
/// generator's.
pub const FILE_HEADER: &str = "\
/*
 * SPDX-License-Identifier: ODbL-1.0
 * SPDX-FileCopyrightText: OpenStreetMap contributors
 *
 * Autogenerated by tzdatagen - do not edit!
 */

";

const MAP_INCLUDES: &str = "\
#include \"isocodes_p.h\"
#include \"mapentry_p.h\"
#include \"timezone_names_p.h\"

";

/// Renders the packed identifier blob. Each identifier becomes one C string
/// literal with an embedded terminator; adjacent literals concatenate into a
/// single array. The closing `;` joins the final literal directly so the
/// file survives clang-format untouched.
pub fn name_blob(table: &NameTable) -> String {
    let mut out = String::from(FILE_HEADER);
    out.push_str("static constexpr const char timezone_name_table[] =\n");
    let last = table.len() - 1;
    for (index, (id, _)) in table.iter().enumerate() {
        let _ = write!(out, "    \"{id}\\0\"");
        out.push_str(if index == last { ";\n" } else { "\n" });
    }
    out
}

/// Renders the offset enumeration. Fails when an offset no longer fits the
/// table's 16-bit value type.
pub fn name_enum(table: &NameTable) -> Result<String, TryFromIntError> {
    let mut out = String::from(FILE_HEADER);
    out.push_str(
        "#ifndef TIMEZONE_NAMES_P_H\n\
         #define TIMEZONE_NAMES_P_H\n\
         \n\
         #include <cstdint>\n\
         \n\
         enum Tz : uint16_t {\n",
    );
    for (id, offset) in table.iter() {
        let offset = u16::try_from(offset)?;
        let _ = writeln!(out, "    {} = {offset},", names::enum_name(id));
    }
    let _ = writeln!(out, "    Undefined = {},", u16::try_from(table.sentinel_offset())?);
    out.push_str("};\n\n#endif\n");
    Ok(out)
}

/// Renders one of the three `MapEntry` array files around pre-rendered rows.
pub fn map_array(entry_type: &str, array_name: &str, rows: &[String]) -> String {
    let mut out = String::from(FILE_HEADER);
    out.push_str(MAP_INCLUDES);
    let _ = writeln!(
        out,
        "static constexpr const MapEntry<{entry_type}> {array_name}[] = {{"
    );
    for row in rows {
        let _ = writeln!(out, "{row}");
    }
    out.push_str("};\n");
    out
}

/// A country to timezone row.
pub fn country_row(code: &str, zone_id: &str) -> String {
    format!(
        "    {{IsoCodes::alpha2CodeToKey(\"{code}\"), Tz::{}}},",
        names::enum_name(zone_id)
    )
}

/// A subdivision to timezone row.
pub fn subdivision_row(code: &str, zone_id: &str) -> String {
    format!(
        "    {{IsoCodes::subdivisionCodeToKey(\"{code}\"), Tz::{}}},",
        names::enum_name(zone_id)
    )
}

/// A timezone to country row.
pub fn zone_country_row(zone_id: &str, code: &str) -> String {
    format!(
        "    {{Tz::{}, IsoCodes::alpha2CodeToKey(\"{code}\")}},",
        names::enum_name(zone_id)
    )
}

/// Placeholder for a region that matched nothing. Kept in the output as a
/// comment so coverage holes stay reviewable next to the data.
pub fn unmatched_region_row(code: &str) -> String {
    format!("    // {code}")
}

/// Placeholder for a timezone that did not resolve to a single country.
pub fn unresolved_zone_row(zone_id: &str) -> String {
    format!("    // Tz::{}", names::enum_name(zone_id))
}
