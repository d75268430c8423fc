/// Station registry for the Mount St. Helens seismic network.
///
/// Defines the short-period and broadband stations whose RSAM, DSAR, RMS
/// and PGA exports feed the stacking pipeline, with approximate WGS84
/// coordinates. Column names in the input tables are station codes, so
/// this is where the pipeline looks up where a column was recorded.

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate summit crater position, used as the reference point for
/// station distances.
pub const CRATER_LATITUDE: f64 = 46.1912;
pub const CRATER_LONGITUDE: f64 = -122.1944;

/// Great-circle distance in kilometres between two points given in
/// degrees, by the haversine formula.
pub fn calculate_distance(lat1: f64, lat2: f64, lon1: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2.to_radians() - lon1.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    2.0 * a.sqrt().min(1.0).asin() * EARTH_RADIUS_KM
}

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single seismic station.
#[derive(Debug)]
pub struct Station {
    /// Network station code, as used for column names.
    pub code: &'static str,
    pub name: &'static str,
    /// Where the station sits relative to the dome.
    pub description: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl Station {
    /// Distance from the summit crater in kilometres.
    pub fn distance_to_crater(&self) -> f64 {
        calculate_distance(self.latitude, CRATER_LATITUDE, self.longitude, CRATER_LONGITUDE)
    }

    pub fn distance_to(&self, other: &Station) -> f64 {
        calculate_distance(self.latitude, other.latitude, self.longitude, other.longitude)
    }
}

/// Stations of the Mount St. Helens network, ordered roughly from the
/// crater outward.
pub static STATION_REGISTRY: &[Station] = &[
    Station {
        code: "SEP",
        name: "September Lobe",
        description: "On the 1980s lava dome inside the crater. Closest \
                      station to the 2004-2008 extrusion vent.",
        latitude: 46.2000,
        longitude: -122.1910,
    },
    Station {
        code: "YEL",
        name: "Yellow Rock",
        description: "Crater floor, north of the dome.",
        latitude: 46.2096,
        longitude: -122.1889,
    },
    Station {
        code: "HSR",
        name: "South Ridge",
        description: "Upper south flank above the treeline.",
        latitude: 46.1745,
        longitude: -122.1801,
    },
    Station {
        code: "SHW",
        name: "Mount St. Helens West",
        description: "West flank. Long-running short-period station.",
        latitude: 46.1931,
        longitude: -122.2361,
    },
    Station {
        code: "EDM",
        name: "Edwards Mountain",
        description: "East of the crater rim across the Loowit drainage.",
        latitude: 46.1972,
        longitude: -122.1506,
    },
    Station {
        code: "STD",
        name: "Studebaker Ridge",
        description: "North-northwest, overlooking the pumice plain.",
        latitude: 46.2377,
        longitude: -122.2237,
    },
    Station {
        code: "JUN",
        name: "June Lake",
        description: "Lower southeast flank.",
        latitude: 46.1471,
        longitude: -122.1524,
    },
    Station {
        code: "ELK",
        name: "Elk Rock",
        description: "Distal station northwest of the volcano; reference \
                      for regional noise.",
        latitude: 46.3034,
        longitude: -122.3410,
    },
];

/// Returns every station code in the registry.
pub fn all_station_codes() -> Vec<&'static str> {
    STATION_REGISTRY.iter().map(|s| s.code).collect()
}

/// Look up a station by code. Matching ignores ASCII case.
pub fn find_station(code: &str) -> Option<&'static Station> {
    STATION_REGISTRY.iter().find(|s| s.code.eq_ignore_ascii_case(code))
}

/// Stations within `radius_km` of the crater, nearest first.
pub fn stations_within(radius_km: f64) -> Vec<&'static Station> {
    let mut near: Vec<&Station> = STATION_REGISTRY
        .iter()
        .filter(|s| s.distance_to_crater() <= radius_km)
        .collect();
    near.sort_by(|a, b| a.distance_to_crater().total_cmp(&b.distance_to_crater()));
    near
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
