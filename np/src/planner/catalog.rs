//! Static country tables: planning priority, locale metadata and backup towns

use placestore::{Coordinates, Locale, NewLocation, same_name};

/// Countries the persona prefers
pub const PRIORITY_COUNTRIES: [&str; 10] = [
    "Serbia",
    "Croatia",
    "Slovenia",
    "Italy",
    "France",
    "Spain",
    "Portugal",
    "Austria",
    "Czech Republic",
    "Hungary",
];

/// Countries visited occasionally
pub const SECONDARY_COUNTRIES: [&str; 11] = [
    "Bosnia and Herzegovina",
    "Montenegro",
    "Greece",
    "Slovakia",
    "Poland",
    "Romania",
    "Bulgaria",
    "Germany",
    "Switzerland",
    "Albania",
    "North Macedonia",
];

struct LocaleRow {
    country: &'static str,
    timezone: &'static str,
    currency: &'static str,
    language: &'static str,
}

const LOCALES: &[LocaleRow] = &[
    LocaleRow { country: "Serbia", timezone: "Europe/Belgrade", currency: "RSD", language: "Serbian" },
    LocaleRow { country: "Croatia", timezone: "Europe/Zagreb", currency: "EUR", language: "Croatian" },
    LocaleRow { country: "Slovenia", timezone: "Europe/Ljubljana", currency: "EUR", language: "Slovenian" },
    LocaleRow { country: "Italy", timezone: "Europe/Rome", currency: "EUR", language: "Italian" },
    LocaleRow { country: "France", timezone: "Europe/Paris", currency: "EUR", language: "French" },
    LocaleRow { country: "Spain", timezone: "Europe/Madrid", currency: "EUR", language: "Spanish" },
    LocaleRow { country: "Portugal", timezone: "Europe/Lisbon", currency: "EUR", language: "Portuguese" },
    LocaleRow { country: "Austria", timezone: "Europe/Vienna", currency: "EUR", language: "German" },
    LocaleRow { country: "Czech Republic", timezone: "Europe/Prague", currency: "CZK", language: "Czech" },
    LocaleRow { country: "Hungary", timezone: "Europe/Budapest", currency: "HUF", language: "Hungarian" },
    LocaleRow { country: "Bosnia and Herzegovina", timezone: "Europe/Sarajevo", currency: "BAM", language: "Bosnian" },
    LocaleRow { country: "Montenegro", timezone: "Europe/Podgorica", currency: "EUR", language: "Montenegrin" },
    LocaleRow { country: "Greece", timezone: "Europe/Athens", currency: "EUR", language: "Greek" },
    LocaleRow { country: "Slovakia", timezone: "Europe/Bratislava", currency: "EUR", language: "Slovak" },
    LocaleRow { country: "Poland", timezone: "Europe/Warsaw", currency: "PLN", language: "Polish" },
    LocaleRow { country: "Romania", timezone: "Europe/Bucharest", currency: "RON", language: "Romanian" },
    LocaleRow { country: "Bulgaria", timezone: "Europe/Sofia", currency: "BGN", language: "Bulgarian" },
    LocaleRow { country: "Germany", timezone: "Europe/Berlin", currency: "EUR", language: "German" },
    LocaleRow { country: "Switzerland", timezone: "Europe/Zurich", currency: "CHF", language: "German" },
    LocaleRow { country: "Albania", timezone: "Europe/Tirane", currency: "ALL", language: "Albanian" },
    LocaleRow { country: "North Macedonia", timezone: "Europe/Skopje", currency: "MKD", language: "Macedonian" },
];

/// Alternative spellings a generator may answer with
const ALIASES: &[(&str, &str)] = &[
    ("czechia", "Czech Republic"),
    ("bosnia", "Bosnia and Herzegovina"),
    ("macedonia", "North Macedonia"),
    ("hellas", "Greece"),
];

/// Locale for countries missing from the table
pub fn default_locale() -> Locale {
    Locale {
        timezone: "Europe/Berlin".to_string(),
        currency: "EUR".to_string(),
        language: "English".to_string(),
    }
}

/// Locale metadata for a country, falling back to `default_locale`
pub fn locale_for(country: &str) -> Locale {
    LOCALES
        .iter()
        .find(|row| same_name(row.country, country))
        .map(|row| Locale {
            timezone: row.timezone.to_string(),
            currency: row.currency.to_string(),
            language: row.language.to_string(),
        })
        .unwrap_or_else(default_locale)
}

/// Every country the planner knows, priority first
pub fn known_countries() -> impl Iterator<Item = &'static str> {
    PRIORITY_COUNTRIES.iter().chain(SECONDARY_COUNTRIES.iter()).copied()
}

/// Map a free-text answer to a known country name
///
/// Exact (case-insensitive) names and aliases win; otherwise the known country
/// mentioned earliest in the text, skipping `current` when another country is
/// also named. None when nothing matches.
pub fn resolve_country(answer: &str, current: Option<&str>) -> Option<&'static str> {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(country) = known_countries().find(|c| c.to_lowercase() == cleaned) {
        return Some(country);
    }
    if let Some((_, country)) = ALIASES.iter().find(|(alias, _)| *alias == cleaned) {
        return Some(*country);
    }

    let lower = answer.to_lowercase();
    let names = known_countries().map(|c| (c.to_lowercase(), c));
    let aliases = ALIASES.iter().map(|(alias, c)| (alias.to_string(), *c));
    let mut mentions: Vec<(usize, std::cmp::Reverse<usize>, &'static str)> = names
        .chain(aliases)
        .filter_map(|(needle, country)| lower.find(&needle).map(|pos| (pos, std::cmp::Reverse(needle.len()), country)))
        .collect();
    mentions.sort_unstable();

    let is_current = |country: &str| current.is_some_and(|c| same_name(c, country));
    mentions
        .iter()
        .find(|(_, _, country)| !is_current(country))
        .or_else(|| mentions.first())
        .map(|(_, _, country)| *country)
}

/// A town with known coordinates used when generation fails
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackupTown {
    pub name: &'static str,
    pub country: &'static str,
    pub region: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl BackupTown {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    pub fn to_new_location(&self) -> NewLocation {
        NewLocation {
            name: self.name.to_string(),
            country: self.country.to_string(),
            region: self.region.to_string(),
            coordinates: self.coordinates(),
            locale: locale_for(self.country),
        }
    }
}

const fn town(name: &'static str, country: &'static str, region: &'static str, lat: f64, lng: f64) -> BackupTown {
    BackupTown {
        name,
        country,
        region,
        lat,
        lng,
    }
}

/// Four towns per priority country
pub const BACKUP_TOWNS: &[BackupTown] = &[
    town("Sremski Karlovci", "Serbia", "Vojvodina", 45.2025, 19.9347),
    town("Golubac", "Serbia", "Braničevo", 44.6531, 21.6319),
    town("Bač", "Serbia", "Vojvodina", 45.3917, 19.2361),
    town("Sokobanja", "Serbia", "Zaječar", 43.6436, 21.8694),
    town("Motovun", "Croatia", "Istria", 45.3366, 13.8283),
    town("Ston", "Croatia", "Dubrovnik-Neretva", 42.8386, 17.6975),
    town("Samobor", "Croatia", "Zagreb County", 45.8011, 15.7108),
    town("Trogir", "Croatia", "Split-Dalmatia", 43.5169, 16.2514),
    town("Piran", "Slovenia", "Coastal-Karst", 45.5283, 13.5683),
    town("Škofja Loka", "Slovenia", "Upper Carniola", 46.1655, 14.3064),
    town("Ptuj", "Slovenia", "Drava", 46.4200, 15.8700),
    town("Kobarid", "Slovenia", "Gorizia", 46.2470, 13.5790),
    town("Bagnoregio", "Italy", "Lazio", 42.6270, 12.0930),
    town("Orvieto", "Italy", "Umbria", 42.7185, 12.1107),
    town("Alberobello", "Italy", "Apulia", 40.7846, 17.2370),
    town("Montepulciano", "Italy", "Tuscany", 43.0925, 11.7808),
    town("Eguisheim", "France", "Grand Est", 48.0428, 7.3064),
    town("Rocamadour", "France", "Occitanie", 44.7992, 1.6178),
    town("Dinan", "France", "Brittany", 48.4556, -2.0503),
    town("Sarlat-la-Canéda", "France", "Nouvelle-Aquitaine", 44.8890, 1.2167),
    town("Ronda", "Spain", "Andalusia", 36.7423, -5.1671),
    town("Cuenca", "Spain", "Castilla-La Mancha", 40.0704, -2.1374),
    town("Besalú", "Spain", "Catalonia", 42.1989, 2.6986),
    town("Albarracín", "Spain", "Aragon", 40.4079, -1.4440),
    town("Óbidos", "Portugal", "Centro", 39.3606, -9.1571),
    town("Sintra", "Portugal", "Lisbon", 38.8029, -9.3817),
    town("Tomar", "Portugal", "Centro", 39.6017, -8.4105),
    town("Évora", "Portugal", "Alentejo", 38.5714, -7.9135),
    town("Hallstatt", "Austria", "Upper Austria", 47.5622, 13.6493),
    town("Dürnstein", "Austria", "Lower Austria", 48.3953, 15.5197),
    town("Melk", "Austria", "Lower Austria", 48.2270, 15.3316),
    town("Zell am See", "Austria", "Salzburg", 47.3237, 12.7944),
    town("Český Krumlov", "Czech Republic", "South Bohemia", 48.8127, 14.3175),
    town("Kutná Hora", "Czech Republic", "Central Bohemia", 49.9484, 15.2682),
    town("Telč", "Czech Republic", "Vysočina", 49.1842, 15.4528),
    town("Mikulov", "Czech Republic", "South Moravia", 48.8056, 16.6378),
    town("Eger", "Hungary", "Heves", 47.9025, 20.3772),
    town("Szentendre", "Hungary", "Pest", 47.6694, 19.0756),
    town("Tokaj", "Hungary", "Borsod-Abaúj-Zemplén", 48.1177, 21.4093),
    town("Hollókő", "Hungary", "Nógrád", 47.9967, 19.5928),
];

/// Backup towns of one country
pub fn backups_for(country: &str) -> Vec<&'static BackupTown> {
    BACKUP_TOWNS
        .iter()
        .filter(|t| same_name(t.country, country))
        .collect()
}
