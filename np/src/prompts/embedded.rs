//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Next-country choice
pub const COUNTRY: &str = include_str!("../../prompts/country.pmt");

/// Candidate towns in a country
pub const CITIES: &str = include_str!("../../prompts/cities.pmt");

/// Attractions or restaurants in a town
pub const POIS: &str = include_str!("../../prompts/pois.pmt");

/// Daily post
pub const DAILY: &str = include_str!("../../prompts/daily.pmt");

/// Travel post
pub const TRAVEL: &str = include_str!("../../prompts/travel.pmt");

/// Names of all embedded templates
pub const NAMES: [&str; 5] = ["country", "cities", "pois", "daily", "travel"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "country" => Some(COUNTRY),
        "cities" => Some(CITIES),
        "pois" => Some(POIS),
        "daily" => Some(DAILY),
        "travel" => Some(TRAVEL),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        for name in NAMES {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_structured_prompts_ask_for_json() {
        assert!(get_embedded("cities").unwrap().contains("JSON array"));
        assert!(get_embedded("pois").unwrap().contains("openingHours"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
