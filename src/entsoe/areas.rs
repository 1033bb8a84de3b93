use once_cell::sync::Lazy;
use std::collections::HashMap;

/// An ENTSO-E bidding zone reachable from an ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiddingZone {
    /// EIC area code used in API requests
    pub code: &'static str,
    pub country: &'static str,
    pub name: &'static str,
}

// National bidding zones only; TSO control areas are not needed for
// country-level generation queries.
static ZONES: &[BiddingZone] = &[
    BiddingZone { code: "10YAT-APG------L", country: "AT", name: "Austria" },
    BiddingZone { code: "10YBE----------2", country: "BE", name: "Belgium" },
    BiddingZone { code: "10YCA-BULGARIA-R", country: "BG", name: "Bulgaria" },
    BiddingZone { code: "10YCH-SWISSGRIDZ", country: "CH", name: "Switzerland" },
    BiddingZone { code: "10YCZ-CEPS-----N", country: "CZ", name: "Czech Republic" },
    BiddingZone { code: "10Y1001A1001A83F", country: "DE", name: "Germany" },
    BiddingZone { code: "10Y1001A1001A796", country: "DK", name: "Denmark" },
    BiddingZone { code: "10Y1001A1001A39I", country: "EE", name: "Estonia" },
    BiddingZone { code: "10YES-REE------0", country: "ES", name: "Spain" },
    BiddingZone { code: "10YFI-1--------U", country: "FI", name: "Finland" },
    BiddingZone { code: "10YFR-RTE------C", country: "FR", name: "France" },
    BiddingZone { code: "10YGR-HTSO-----Y", country: "GR", name: "Greece" },
    BiddingZone { code: "10YHR-HEP------M", country: "HR", name: "Croatia" },
    BiddingZone { code: "10YHU-MAVIR----U", country: "HU", name: "Hungary" },
    BiddingZone { code: "10YIE-1001A00010", country: "IE", name: "Ireland" },
    BiddingZone { code: "10YIT-GRTN-----B", country: "IT", name: "Italy" },
    BiddingZone { code: "10YLT-1001A0008Q", country: "LT", name: "Lithuania" },
    BiddingZone { code: "10YLU-CEGEDEL-NQ", country: "LU", name: "Luxembourg" },
    BiddingZone { code: "10YLV-1001A00074", country: "LV", name: "Latvia" },
    BiddingZone { code: "10YNL----------L", country: "NL", name: "Netherlands" },
    BiddingZone { code: "10YNO-0--------C", country: "NO", name: "Norway" },
    BiddingZone { code: "10YPL-AREA-----S", country: "PL", name: "Poland" },
    BiddingZone { code: "10YPT-REN------W", country: "PT", name: "Portugal" },
    BiddingZone { code: "10YRO-TEL------P", country: "RO", name: "Romania" },
    BiddingZone { code: "10YCS-SERBIATSOV", country: "RS", name: "Serbia" },
    BiddingZone { code: "10YSE-1--------K", country: "SE", name: "Sweden" },
    BiddingZone { code: "10YSI-ELES-----O", country: "SI", name: "Slovenia" },
    BiddingZone { code: "10YSK-SEPS-----K", country: "SK", name: "Slovakia" },
    BiddingZone { code: "10Y1001C--00003F", country: "UA", name: "Ukraine" },
];

static BY_COUNTRY: Lazy<HashMap<&'static str, &'static BiddingZone>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for zone in ZONES {
        map.entry(zone.country).or_insert(zone);
    }
    map
});

/// Bidding zone to query for a country code, if the country is supported.
pub fn primary_zone(country_code: &str) -> Option<&'static BiddingZone> {
    BY_COUNTRY.get(country_code).copied()
}

/// All supported country codes, sorted.
pub fn supported_countries() -> Vec<&'static str> {
    let mut countries: Vec<_> = BY_COUNTRY.keys().copied().collect();
    countries.sort();
    countries
}
