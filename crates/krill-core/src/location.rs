//! Free-text location canonicalization.
//!
//! Career sites render locations every way imaginable: "New York, NY 10019",
//! "Americas-United States-New York", "London | Paris | Frankfurt",
//! "3 locations", "Remote". This module maps all of them onto a canonical
//! "Country - City" form (or the "Global" sentinel) so the deduplication
//! hash is stable across scrapes.
//!
//! `normalize` is pure, total, and idempotent: it has no hidden state and
//! canonicalizes identical input identically across calls and restarts.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Sentinel for unknown, remote, or multi-region locations.
pub const GLOBAL: &str = "Global";

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static MORE_LOCATIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\+?\s*\d+\s*(?:more\s+)?locations?\s*$").unwrap());
static ONLY_LOCATIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s*\+?\s*(?:more\s+)?locations?\s*$").unwrap());
static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{5}(?:-\d{4})?\s*$").unwrap());

/// Placeholder strings that carry no resolvable location.
const VAGUE_TOKENS: &[&str] = &[
    "unknown",
    "n/a",
    "global",
    "multiple locations",
    "various",
    "multiple",
    "worldwide",
    "anywhere",
    "tbd",
    "remote",
    "virtual",
    "hybrid",
    "flexible",
    "work from home",
    "americas",
    "emea",
    "apac",
    "asia pacific",
];

/// Exact-match table from lowercase free-text strings to canonical form.
static CITY_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let entries: &[(&str, &str)] = &[
        // United States — New York variants
        ("new york", "US - New York"),
        ("new york, ny", "US - New York"),
        ("new york, new york", "US - New York"),
        ("new york city", "US - New York"),
        ("new york city, ny", "US - New York"),
        ("nyc", "US - New York"),
        ("ny", "US - New York"),
        ("manhattan", "US - New York"),
        ("manhattan, ny", "US - New York"),
        ("brooklyn", "US - New York"),
        ("brooklyn, ny", "US - New York"),
        ("new york, united states", "US - New York"),
        ("new york, us", "US - New York"),
        ("new york, usa", "US - New York"),
        ("jersey city", "US - Jersey City"),
        ("jersey city, nj", "US - Jersey City"),
        ("jersey city, new jersey", "US - Jersey City"),
        // Other US cities
        ("albany", "US - Albany"),
        ("albany, ny", "US - Albany"),
        ("atlanta", "US - Atlanta"),
        ("atlanta, ga", "US - Atlanta"),
        ("atlanta, georgia", "US - Atlanta"),
        ("boston", "US - Boston"),
        ("boston, ma", "US - Boston"),
        ("boston, massachusetts", "US - Boston"),
        ("charlotte", "US - Charlotte"),
        ("charlotte, nc", "US - Charlotte"),
        ("charlotte, north carolina", "US - Charlotte"),
        ("chicago", "US - Chicago"),
        ("chicago, il", "US - Chicago"),
        ("chicago, illinois", "US - Chicago"),
        ("dallas", "US - Dallas"),
        ("dallas, tx", "US - Dallas"),
        ("dallas, texas", "US - Dallas"),
        ("denver", "US - Denver"),
        ("denver, co", "US - Denver"),
        ("denver, colorado", "US - Denver"),
        ("detroit", "US - Detroit"),
        ("detroit, mi", "US - Detroit"),
        ("detroit, michigan", "US - Detroit"),
        ("houston", "US - Houston"),
        ("houston, tx", "US - Houston"),
        ("houston, texas", "US - Houston"),
        ("los angeles", "US - Los Angeles"),
        ("los angeles, ca", "US - Los Angeles"),
        ("los angeles, california", "US - Los Angeles"),
        ("la", "US - Los Angeles"),
        ("menlo park", "US - Menlo Park"),
        ("menlo park, ca", "US - Menlo Park"),
        ("miami", "US - Miami"),
        ("miami, fl", "US - Miami"),
        ("miami, florida", "US - Miami"),
        ("minneapolis", "US - Minneapolis"),
        ("minneapolis, mn", "US - Minneapolis"),
        ("minneapolis, minnesota", "US - Minneapolis"),
        ("newport beach", "US - Newport Beach"),
        ("newport beach, ca", "US - Newport Beach"),
        ("philadelphia", "US - Philadelphia"),
        ("philadelphia, pa", "US - Philadelphia"),
        ("philadelphia, pennsylvania", "US - Philadelphia"),
        ("pittsburgh", "US - Pittsburgh"),
        ("pittsburgh, pa", "US - Pittsburgh"),
        ("pittsburgh, pennsylvania", "US - Pittsburgh"),
        ("richardson", "US - Richardson"),
        ("richardson, tx", "US - Richardson"),
        ("salt lake city", "US - Salt Lake City"),
        ("salt lake city, ut", "US - Salt Lake City"),
        ("salt lake city, utah", "US - Salt Lake City"),
        ("san francisco", "US - San Francisco"),
        ("san francisco, ca", "US - San Francisco"),
        ("san francisco, california", "US - San Francisco"),
        ("sf", "US - San Francisco"),
        ("seattle", "US - Seattle"),
        ("seattle, wa", "US - Seattle"),
        ("seattle, washington", "US - Seattle"),
        ("stamford", "US - Stamford"),
        ("stamford, ct", "US - Stamford"),
        ("stamford, connecticut", "US - Stamford"),
        ("washington", "US - Washington DC"),
        ("washington, dc", "US - Washington DC"),
        ("washington, d.c", "US - Washington DC"),
        ("washington, d.c.", "US - Washington DC"),
        ("washington d.c.", "US - Washington DC"),
        ("washington d.c", "US - Washington DC"),
        ("washington dc", "US - Washington DC"),
        ("dc", "US - Washington DC"),
        ("d.c.", "US - Washington DC"),
        ("west palm beach", "US - West Palm Beach"),
        ("west palm beach, fl", "US - West Palm Beach"),
        ("wilmington", "US - Wilmington"),
        ("wilmington, de", "US - Wilmington"),
        ("wilmington, delaware", "US - Wilmington"),
        // Country-level US
        ("united states", "US"),
        ("united states of america", "US"),
        ("usa", "US"),
        ("us", "US"),
        // Hong Kong
        ("hong kong", "China - Hong Kong"),
        ("hong kong sar", "China - Hong Kong"),
        ("hong kong, china", "China - Hong Kong"),
        ("hong kong sar, china", "China - Hong Kong"),
        ("hk", "China - Hong Kong"),
        ("hkg", "China - Hong Kong"),
        ("central", "China - Hong Kong"),
        ("central, hong kong", "China - Hong Kong"),
        ("wan chai", "China - Hong Kong"),
        ("kowloon", "China - Hong Kong"),
        ("admiralty", "China - Hong Kong"),
        ("quarry bay", "China - Hong Kong"),
        // China
        ("beijing", "China - Beijing"),
        ("beijing, china", "China - Beijing"),
        ("shanghai", "China - Shanghai"),
        ("shanghai, china", "China - Shanghai"),
        ("shenzhen", "China - Shenzhen"),
        ("shenzhen, china", "China - Shenzhen"),
        ("mainland china", "China"),
        ("china", "China"),
        // Singapore
        ("singapore", "Singapore"),
        ("sg", "Singapore"),
        // Japan
        ("tokyo", "Japan - Tokyo"),
        ("tokyo, japan", "Japan - Tokyo"),
        ("minato", "Japan - Tokyo"),
        ("minato, ku", "Japan - Tokyo"),
        ("japan", "Japan"),
        // South Korea
        ("seoul", "South Korea - Seoul"),
        ("seoul, south korea", "South Korea - Seoul"),
        ("south korea", "South Korea"),
        ("korea", "South Korea"),
        // Australia
        ("sydney", "Australia - Sydney"),
        ("sydney, nsw", "Australia - Sydney"),
        ("sydney, nsw, australia", "Australia - Sydney"),
        ("sydney, australia", "Australia - Sydney"),
        ("melbourne", "Australia - Melbourne"),
        ("melbourne, vic", "Australia - Melbourne"),
        ("melbourne, australia", "Australia - Melbourne"),
        ("perth", "Australia - Perth"),
        ("brisbane", "Australia - Brisbane"),
        ("australia", "Australia"),
        // New Zealand
        ("auckland", "New Zealand - Auckland"),
        ("new zealand", "New Zealand"),
        // India
        ("mumbai", "India - Mumbai"),
        ("mumbai, india", "India - Mumbai"),
        ("bangalore", "India - Bangalore"),
        ("bengaluru", "India - Bangalore"),
        ("pune", "India - Pune"),
        ("india", "India"),
        // United Kingdom
        ("london", "UK - London"),
        ("london, uk", "UK - London"),
        ("london, united kingdom", "UK - London"),
        ("london, england", "UK - London"),
        ("birmingham", "UK - Birmingham"),
        ("birmingham, uk", "UK - Birmingham"),
        ("edinburgh", "UK - Edinburgh"),
        ("edinburgh, uk", "UK - Edinburgh"),
        ("glasgow", "UK - Glasgow"),
        ("manchester", "UK - Manchester"),
        ("united kingdom", "UK"),
        ("uk", "UK"),
        ("england", "UK"),
        // Europe
        ("paris", "France - Paris"),
        ("paris, france", "France - Paris"),
        ("france", "France"),
        ("frankfurt", "Germany - Frankfurt"),
        ("frankfurt, germany", "Germany - Frankfurt"),
        ("frankfurt am main", "Germany - Frankfurt"),
        ("munich", "Germany - Munich"),
        ("berlin", "Germany - Berlin"),
        ("germany", "Germany"),
        ("zurich", "Switzerland - Zurich"),
        ("zürich", "Switzerland - Zurich"),
        ("zurich, switzerland", "Switzerland - Zurich"),
        ("geneva", "Switzerland - Geneva"),
        ("switzerland", "Switzerland"),
        ("amsterdam", "Netherlands - Amsterdam"),
        ("amsterdam, netherlands", "Netherlands - Amsterdam"),
        ("netherlands", "Netherlands"),
        ("dublin", "Ireland - Dublin"),
        ("dublin, ireland", "Ireland - Dublin"),
        ("ireland", "Ireland"),
        ("madrid", "Spain - Madrid"),
        ("spain", "Spain"),
        ("milan", "Italy - Milan"),
        ("milano", "Italy - Milan"),
        ("rome", "Italy - Rome"),
        ("italy", "Italy"),
        ("luxembourg", "Luxembourg"),
        ("brussels", "Belgium - Brussels"),
        ("belgium", "Belgium"),
        ("lisbon", "Portugal - Lisbon"),
        ("stockholm", "Sweden - Stockholm"),
        ("oslo", "Norway - Oslo"),
        ("copenhagen", "Denmark - Copenhagen"),
        ("warsaw", "Poland - Warsaw"),
        ("prague", "Czech Republic - Prague"),
        ("vienna", "Austria - Vienna"),
        // Middle East
        ("dubai", "UAE - Dubai"),
        ("dubai, uae", "UAE - Dubai"),
        ("abu dhabi", "UAE - Abu Dhabi"),
        ("uae", "UAE"),
        ("united arab emirates", "UAE"),
        ("riyadh", "Saudi Arabia - Riyadh"),
        ("doha", "Qatar - Doha"),
        ("bahrain", "Bahrain"),
        // Canada
        ("toronto", "Canada - Toronto"),
        ("toronto, on", "Canada - Toronto"),
        ("toronto, ontario", "Canada - Toronto"),
        ("toronto, canada", "Canada - Toronto"),
        ("calgary", "Canada - Calgary"),
        ("calgary, ab", "Canada - Calgary"),
        ("calgary, alberta", "Canada - Calgary"),
        ("montreal", "Canada - Montreal"),
        ("montreal, qc", "Canada - Montreal"),
        ("vancouver", "Canada - Vancouver"),
        ("canada", "Canada"),
        // Latin America
        ("sao paulo", "Brazil - Sao Paulo"),
        ("são paulo", "Brazil - Sao Paulo"),
        ("mexico city", "Mexico - Mexico City"),
        ("buenos aires", "Argentina - Buenos Aires"),
    ];
    entries.iter().copied().collect()
});

static US_STATE_ABBREVS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "al", "ak", "az", "ar", "ca", "co", "ct", "de", "fl", "ga", "hi", "id", "il", "in", "ia",
        "ks", "ky", "la", "me", "md", "ma", "mi", "mn", "ms", "mo", "mt", "ne", "nv", "nh", "nj",
        "nm", "ny", "nc", "nd", "oh", "ok", "or", "pa", "ri", "sc", "sd", "tn", "tx", "ut", "vt",
        "va", "wa", "wv", "wi", "wy", "dc",
    ]
    .into_iter()
    .collect()
});

static US_STATE_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "alabama",
        "alaska",
        "arizona",
        "arkansas",
        "california",
        "colorado",
        "connecticut",
        "delaware",
        "florida",
        "georgia",
        "hawaii",
        "idaho",
        "illinois",
        "indiana",
        "iowa",
        "kansas",
        "kentucky",
        "louisiana",
        "maine",
        "maryland",
        "massachusetts",
        "michigan",
        "minnesota",
        "mississippi",
        "missouri",
        "montana",
        "nebraska",
        "nevada",
        "new hampshire",
        "new jersey",
        "new mexico",
        "new york",
        "north carolina",
        "north dakota",
        "ohio",
        "oklahoma",
        "oregon",
        "pennsylvania",
        "rhode island",
        "south carolina",
        "south dakota",
        "tennessee",
        "texas",
        "utah",
        "vermont",
        "virginia",
        "washington",
        "west virginia",
        "wisconsin",
        "wyoming",
        "district of columbia",
    ]
    .into_iter()
    .collect()
});

/// Country name → display form for reconstructed locations.
static COUNTRY_DISPLAY: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("united states", "US"),
        ("united states of america", "US"),
        ("usa", "US"),
        ("us", "US"),
        ("australia", "Australia"),
        ("canada", "Canada"),
        ("united kingdom", "UK"),
        ("uk", "UK"),
        ("england", "UK"),
        ("france", "France"),
        ("germany", "Germany"),
        ("switzerland", "Switzerland"),
        ("netherlands", "Netherlands"),
        ("ireland", "Ireland"),
        ("spain", "Spain"),
        ("italy", "Italy"),
        ("japan", "Japan"),
        ("china", "China"),
        ("india", "India"),
        ("singapore", "Singapore"),
        ("south korea", "South Korea"),
        ("hong kong", "China"),
        ("new zealand", "New Zealand"),
        ("brazil", "Brazil"),
        ("mexico", "Mexico"),
        ("uae", "UAE"),
        ("united arab emirates", "UAE"),
        ("qatar", "Qatar"),
        ("bahrain", "Bahrain"),
        ("saudi arabia", "Saudi Arabia"),
        ("luxembourg", "Luxembourg"),
        ("belgium", "Belgium"),
        ("portugal", "Portugal"),
        ("sweden", "Sweden"),
        ("norway", "Norway"),
        ("denmark", "Denmark"),
        ("poland", "Poland"),
        ("czech republic", "Czech Republic"),
        ("austria", "Austria"),
        ("argentina", "Argentina"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a raw location string to canonical "Country - City" form.
///
/// Unresolvable-but-cleaned strings pass through unchanged; placeholder
/// and multi-region strings collapse to [`GLOBAL`].
pub fn normalize(raw: &str) -> String {
    // 1. Collapse whitespace, strip embedded markup.
    let mut location = MARKUP_RE.replace_all(raw, "").to_string();
    location = WHITESPACE_RE.replace_all(location.trim(), " ").to_string();

    if location.is_empty() {
        return GLOBAL.to_string();
    }

    // 2. Breadcrumb style: "Americas-United States-New York" → commas.
    // The spaced " - " form is the separator this function itself emits;
    // only that exact form is split in the comma-bearing case, so
    // hyphenated city names ("Winston-Salem") survive re-normalization.
    if location.contains(" - ") {
        location = location.replace(" - ", ", ");
    } else if location.contains('-') && !location.contains(',') {
        location = location.replace('-', ", ");
    }
    location = WHITESPACE_RE.replace_all(location.trim(), " ").to_string();

    // 3. Strip trailing "+N locations" / "N more locations" phrases; a
    // string that is nothing but such a phrase carries no location at all.
    location = MORE_LOCATIONS_RE.replace(&location, "").trim().to_string();
    if ONLY_LOCATIONS_RE.is_match(&location) {
        return GLOBAL.to_string();
    }

    // 4. Multi-location lists: first-listed is primary.
    for sep in ["|", ";", " and ", " or ", " & "] {
        if let Some(first) = location.split(sep).next() {
            location = first.trim().to_string();
        }
    }

    // 5. Trailing postal code.
    location = POSTAL_CODE_RE.replace(&location, "").trim().to_string();
    location = location.trim_matches([' ', ',', '.']).to_string();

    // 6. Placeholder tokens.
    let loc_lower = location.to_lowercase();
    if location.is_empty() || VAGUE_TOKENS.contains(&loc_lower.as_str()) {
        return GLOBAL.to_string();
    }

    // 7. Exact-match alias lookup.
    if let Some(canonical) = CITY_ALIASES.get(loc_lower.as_str()) {
        return (*canonical).to_string();
    }

    // 8. Structural fallback on comma-separated parts.
    let mut parts: Vec<String> = location.split(',').map(|p| p.trim().to_string()).collect();
    if let Some(last) = parts.last_mut() {
        *last = POSTAL_CODE_RE.replace(last, "").trim().to_string();
    }

    // "City, State/Region, Country"
    if parts.len() >= 3 {
        let country_key = parts[parts.len() - 1].to_lowercase();
        if let Some(display) = COUNTRY_DISPLAY.get(country_key.as_str()) {
            let city = &parts[0];
            if let Some(canonical) = CITY_ALIASES.get(city.to_lowercase().as_str()) {
                return (*canonical).to_string();
            }
            return format!("{display} - {city}");
        }
    }

    if parts.len() == 2 {
        let first = &parts[0];
        let second = &parts[1];
        let first_lower = first.to_lowercase();
        let second_lower = second.to_lowercase();

        // "Country, City" — already our shape, just canonicalize both
        // halves. Checked first: "US, New York" must not fall into the
        // state-name branch below.
        if let Some(display) = COUNTRY_DISPLAY.get(first_lower.as_str()) {
            if let Some(canonical) = CITY_ALIASES.get(second_lower.as_str()) {
                return (*canonical).to_string();
            }
            return format!("{display} - {second}");
        }

        // "City, NY" / "City, New York"
        if US_STATE_ABBREVS.contains(second_lower.as_str())
            || US_STATE_NAMES.contains(second_lower.as_str())
        {
            if let Some(canonical) = CITY_ALIASES.get(first_lower.as_str()) {
                return (*canonical).to_string();
            }
            return format!("US - {first}");
        }

        // "City, Country"
        if let Some(display) = COUNTRY_DISPLAY.get(second_lower.as_str()) {
            if let Some(canonical) = CITY_ALIASES.get(first_lower.as_str()) {
                return (*canonical).to_string();
            }
            return format!("{display} - {first}");
        }
    }

    // Bare state name ("Texas") with no city resolves to country level.
    if parts.len() == 1 && US_STATE_NAMES.contains(loc_lower.as_str()) {
        return "US".to_string();
    }

    // 9. Graceful degradation: cleaned but unmapped.
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_stripped() {
        assert_eq!(normalize("New York, NY 10019"), "US - New York");
    }

    #[test]
    fn test_count_only_string_is_global() {
        assert_eq!(normalize("3 locations"), "Global");
        assert_eq!(normalize("2+ locations"), "Global");
    }

    #[test]
    fn test_trailing_location_count_stripped() {
        assert_eq!(normalize("New York +2 locations"), "US - New York");
        assert_eq!(normalize("London 3 more locations"), "UK - London");
    }

    #[test]
    fn test_alias_exact_match() {
        assert_eq!(normalize("Hong Kong SAR, China"), "China - Hong Kong");
        assert_eq!(normalize("NYC"), "US - New York");
        assert_eq!(normalize("zürich"), "Switzerland - Zurich");
    }

    #[test]
    fn test_placeholder_tokens() {
        for raw in ["Remote", "hybrid", "EMEA", "Worldwide", "N/A", "", "   "] {
            assert_eq!(normalize(raw), "Global", "raw: {raw:?}");
        }
    }

    #[test]
    fn test_breadcrumb_dashes() {
        assert_eq!(normalize("Sydney-Australia"), "Australia - Sydney");
        assert_eq!(normalize("London - UK"), "UK - London");
    }

    #[test]
    fn test_hyphenated_city_survives_renormalization() {
        // The hyphen inside the city name must not be mistaken for a
        // breadcrumb separator when the result passes through again.
        let once = normalize("Winston-Salem, NC");
        assert_eq!(once, "US - Winston-Salem");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_multi_location_keeps_first() {
        assert_eq!(normalize("London | Paris | Frankfurt"), "UK - London");
        assert_eq!(normalize("Chicago and Dallas"), "US - Chicago");
        assert_eq!(normalize("Tokyo; Singapore"), "Japan - Tokyo");
    }

    #[test]
    fn test_markup_stripped() {
        assert_eq!(normalize("<span>Boston, MA</span>"), "US - Boston");
    }

    #[test]
    fn test_three_part_fallback() {
        assert_eq!(normalize("Hoboken, NJ, United States"), "US - Hoboken");
    }

    #[test]
    fn test_two_part_state_abbrev_fallback() {
        // Not in the alias table; reconstructed from the state abbreviation.
        assert_eq!(normalize("Columbus, OH"), "US - Columbus");
    }

    #[test]
    fn test_two_part_country_fallback() {
        assert_eq!(normalize("Lyon, France"), "France - Lyon");
    }

    #[test]
    fn test_country_first_form() {
        assert_eq!(normalize("UK, Cambridge"), "UK - Cambridge");
    }

    #[test]
    fn test_bare_state_resolves_to_country() {
        assert_eq!(normalize("Texas"), "US");
        // "New York" the city wins over the state of the same name.
        assert_eq!(normalize("New York"), "US - New York");
    }

    #[test]
    fn test_unmapped_passthrough() {
        assert_eq!(normalize("Gibraltar"), "Gibraltar");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "New York, NY 10019",
            "Hong Kong SAR, China",
            "3 locations",
            "Sydney-Australia",
            "London | Paris",
            "Columbus, OH",
            "Washington, D.C.",
            "Remote",
            "Gibraltar",
            "Hoboken, NJ, United States",
            "UAE - Dubai",
            "Czech Republic - Prague",
            "US - New York",
            "New Zealand - Auckland",
            "US - Washington DC",
            "Winston-Salem, NC",
            "US - Winston-Salem",
        ];
        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }
}
