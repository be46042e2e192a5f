use std::io::{BufRead, BufReader, Read};

use chrono::NaiveDate;
use geocity::{Database, PlaceRecord};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://download.geonames.org/export/dump/";

const FEATURE_CODES: &[&str] = &[
    "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLG", "PPLS",
];

/// Downloads a GeoNames cities dump and writes it as a binary snapshot.
pub struct Builder {
    dataset: String,
    countries: FxHashMap<String, String>,
}

impl Builder {
    /// `dataset` is one of the GeoNames dumps: `cities500`, `cities1000`,
    /// `cities5000` or `cities15000`.
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            countries: FxHashMap::default(),
        }
    }

    pub fn build(&mut self, output_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        info!("downloading country names");
        self.countries = download_country_names()?;

        info!(dataset = %self.dataset, "downloading places");
        let records = self.download_places()?;

        info!(places = records.len(), "encoding snapshot");
        let encoded = Database::from_records(&records).encode()?;
        std::fs::write(output_path, &encoded)?;
        info!(
            path = output_path,
            megabytes = encoded.len() / 1_000_000,
            "snapshot written"
        );
        Ok(())
    }

    fn download_places(&self) -> Result<Vec<PlaceRecord>, Box<dyn std::error::Error>> {
        let url = format!("{}{}.zip", BASE_URL, self.dataset);
        let bytes = reqwest::blocking::get(&url)?.error_for_status()?.bytes()?;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
        let mut content = String::new();
        archive
            .by_name(&format!("{}.txt", self.dataset))?
            .read_to_string(&mut content)?;

        let mut filtered = 0usize;
        let mut malformed = 0usize;
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            match self.parse_place(line) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => filtered += 1,
                Err(reason) => {
                    malformed += 1;
                    debug!(line = idx + 1, reason = %reason, "malformed line");
                }
            }
        }

        if filtered > 0 {
            info!(filtered, "lines skipped for feature code");
        }
        if malformed > 0 {
            warn!(malformed, "malformed lines skipped");
        }
        Ok(records)
    }

    /// `Ok(None)` for places outside [`FEATURE_CODES`], `Err` for lines that
    /// do not parse.
    fn parse_place(&self, line: &str) -> Result<Option<PlaceRecord>, String> {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 19 {
            return Err(format!("expected 19 columns, found {}", parts.len()));
        }
        if !FEATURE_CODES.contains(&parts[7]) {
            return Ok(None);
        }

        let field = |idx: usize, name: &str| -> Result<f64, String> {
            parts[idx]
                .parse::<f64>()
                .map_err(|e| format!("invalid {} '{}': {}", name, parts[idx], e))
        };
        let latitude = field(4, "latitude")?;
        let longitude = field(5, "longitude")?;
        let id = parts[0]
            .parse::<u64>()
            .map_err(|e| format!("invalid id '{}': {}", parts[0], e))?;
        let population = match parts[14] {
            "" => 0,
            raw => raw
                .parse::<u64>()
                .map_err(|e| format!("invalid population '{}': {}", raw, e))?,
        };
        let modification_date = NaiveDate::parse_from_str(parts[18], "%Y-%m-%d")
            .map_err(|e| format!("invalid modification date '{}': {}", parts[18], e))?;

        let country_code = parts[8];
        let country_name = self
            .countries
            .get(country_code)
            .map(|s| s.as_str())
            .unwrap_or("");

        let mut seen = FxHashSet::default();
        let alternate_names = parts[3]
            .split(',')
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(str::to_string)
            .collect();

        Ok(Some(PlaceRecord {
            id,
            name: parts[1].to_string(),
            ascii_name: parts[2].to_string(),
            alternate_names,
            country_code: country_code.to_string(),
            country_name: country_name.to_string(),
            population,
            timezone: parts[17].to_string(),
            modification_date,
            label: country_name.to_string(),
            latitude,
            longitude,
        }))
    }
}

/// ISO code to English country name, from `countryInfo.txt`.
fn download_country_names() -> Result<FxHashMap<String, String>, Box<dyn std::error::Error>> {
    let url = format!("{}countryInfo.txt", BASE_URL);
    let response = reqwest::blocking::get(&url)?.error_for_status()?;
    let reader = BufReader::new(response);
    let mut map = FxHashMap::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() >= 5 {
            map.insert(parts[0].to_string(), parts[4].to_string());
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(feature_code: &str, population: &str) -> String {
        [
            "3620170", "Diriamba", "Diriamba", "Diriamba,Diriambo,Diriamba", "11.85812",
            "-86.23922", "P", feature_code, "NI", "", "04", "", "", "", population, "", "581",
            "America/Managua", "2018-08-08",
        ]
        .join("\t")
    }

    fn builder() -> Builder {
        let mut builder = Builder::new("cities1000");
        builder
            .countries
            .insert("NI".to_string(), "Nicaragua".to_string());
        builder
    }

    #[test]
    fn parses_populated_place() {
        let place = builder().parse_place(&line("PPL", "35008")).unwrap().unwrap();
        assert_eq!(place.id, 3620170);
        assert_eq!(place.population, 35008);
        assert_eq!(place.alternate_names, vec!["Diriamba", "Diriambo"]);
        assert_eq!(place.label, "Nicaragua");
    }

    #[test]
    fn other_feature_codes_are_filtered_not_malformed() {
        assert_eq!(builder().parse_place(&line("ADM1", "35008")), Ok(None));
        assert_eq!(builder().parse_place(&line("PPL", "")).unwrap().unwrap().population, 0);
    }

    #[test]
    fn bad_fields_are_malformed() {
        let err = builder().parse_place(&line("PPL", "lots")).unwrap_err();
        assert!(err.contains("population"));
        assert!(builder().parse_place("3620170\tDiriamba").is_err());
    }
}
