//! Static generator configuration.
//!
//! The boundary layers are not self-describing: which attribute carries the
//! zone or region code, how much overlap counts as "covers", and which
//! alternate identifiers fold into which preferred ones are all out-of-band
//! knowledge about the data sources. It lives here, compiled in, so a given
//! build of the generator always produces the same tables from the same
//! inputs.

/// Attribute carrying the IANA zone identifier on the timezone layer.
pub const ZONE_ID_FIELD: &str = "tzid";

/// Attribute carrying the ISO 3166-1 alpha-2 code on the country layer.
pub const COUNTRY_CODE_FIELD: &str = "ISO3166-1";

/// Attribute carrying the ISO 3166-2 code on the subdivision layer.
pub const SUBDIVISION_CODE_FIELD: &str = "ISO3166-2";

/// Minimum share of a zone's own area that must fall inside a region for the
/// zone to count as present there.
pub const ZONE_AREA_RATIO: f64 = 0.01;

/// Minimum share of a region's area that must be covered by a zone for the
/// zone to count as present there. Either this or [`ZONE_AREA_RATIO`]
/// clearing its bound admits the pair: a small region swallowed by a huge
/// zone passes here, a zone sliver crossing a huge region passes above.
pub const REGION_AREA_RATIO: f64 = 0.1;

/// Zone identifiers folded into a preferred identifier that is also present
/// in the boundary data. Keys that survived tzdb merges as separate polygons
/// map to the zone the library should answer with.
static TZID_MAP: phf::Map<&str, &str> = phf::phf_map! {
    "Asia/Urumqi" => "Asia/Shanghai",
    "Europe/Uzhgorod" => "Europe/Kiev",
    "Europe/Zaporozhye" => "Europe/Kiev",
};

/// Exceptionally reserved or legacy alpha-2 codes folded into their ISO
/// 3166-1 parent. An empty value drops the code entirely.
static ISO3166_1_MAP: phf::Map<&str, &str> = phf::phf_map! {
    // Ascension and Tristan da Cunha are tagged separately in OSM but are
    // parts of SH.
    "AC" => "SH",
    "TA" => "SH",
    "CP" => "FR",
    "DG" => "IO",
    "EA" => "ES",
    "IC" => "ES",
    "FX" => "FR",
    "UK" => "GB",
};

/// Ordered `(preferred, secondary)` pairs breaking exactly-two-country ties
/// in the timezone to country table. Each pair names the country a zone
/// belongs to first and the neighbor that only overlaps it through an
/// enclave or boundary quirk second.
pub static ISO3166_1_DISAMBIGUATION_MAP: &[(&str, &str)] = &[
    // Büsingen am Hochrhein, a German enclave in Schaffhausen.
    ("DE", "CH"),
    // Campione d'Italia, an Italian enclave in Ticino.
    ("IT", "CH"),
    // Ceuta and Melilla on the Moroccan coast.
    ("ES", "MA"),
    // The Akrotiri and Dhekelia sovereign base areas on Cyprus.
    ("CY", "GB"),
];

/// Canonicalizes a zone identifier, returning the input unchanged when no
/// mapping exists.
pub fn normalized_zone(id: &str) -> &str {
    TZID_MAP.get(id).copied().unwrap_or(id)
}

/// Canonicalizes a country code, returning the input unchanged when no
/// mapping exists. The result may be empty, which means the code does not
/// denote a country at all.
pub fn normalized_country(code: &str) -> &str {
    ISO3166_1_MAP.get(code).copied().unwrap_or(code)
}
