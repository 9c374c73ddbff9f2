use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{Category, EmissionRates, MissingCoefficient};

/// Canonical lookup key for fuel, species and waste tables: lower-cased with
/// underscores, hyphens and whitespace removed, so "Natural_Gas", "natural gas"
/// and "naturalgas" all resolve to the same factor.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Factor table keyed by [`normalize_key`]. Negative factors are stored as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, f64>", into = "HashMap<String, f64>")]
pub struct RateMap {
    factors: HashMap<String, f64>,
}

impl RateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, factor: f64) {
        let key = normalize_key(key);
        let factor = sanitize_factor(&format!("factor '{key}'"), factor);
        self.factors.insert(key, factor);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.factors.get(&normalize_key(key)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl From<HashMap<String, f64>> for RateMap {
    fn from(raw: HashMap<String, f64>) -> Self {
        let mut map = RateMap::new();
        for (key, factor) in raw {
            map.insert(&key, factor);
        }
        map
    }
}

impl From<RateMap> for HashMap<String, f64> {
    fn from(map: RateMap) -> Self {
        map.factors
    }
}

impl<'a> FromIterator<(&'a str, f64)> for RateMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut map = RateMap::new();
        for (key, factor) in iter {
            map.insert(key, factor);
        }
        map
    }
}

/// Clamps a negative or non-finite factor to zero, logging the correction.
pub fn sanitize_factor(label: &str, factor: f64) -> f64 {
    if factor.is_finite() && factor >= 0.0 {
        factor
    } else {
        warn!("emission {label} is {factor}; using 0");
        0.0
    }
}

impl EmissionRates {
    /// Forces every scalar factor to be non-negative. Map entries are already
    /// sanitised on insert.
    pub fn sanitized(mut self) -> Self {
        self.electricity_emission_factor =
            sanitize_factor("electricity factor", self.electricity_emission_factor);
        self.nitrogen_fertilizer_factor =
            sanitize_factor("nitrogen fertilizer factor", self.nitrogen_fertilizer_factor);
        self.soil_emission_factor = sanitize_factor("soil factor", self.soil_emission_factor);
        self.absorption_rate_per_hectare_month = sanitize_factor(
            "monthly absorption rate",
            self.absorption_rate_per_hectare_month,
        );
        self.absorption_rate_per_hectare_year = sanitize_factor(
            "yearly absorption rate",
            self.absorption_rate_per_hectare_year,
        );
        self
    }

    pub fn fuel_factor(&self, fuel_type: &str, missing: &mut Vec<MissingCoefficient>) -> f64 {
        lookup(&self.fuel_emission_factors, Category::Equipment, fuel_type, missing)
    }

    pub fn animal_factor(&self, species: &str, missing: &mut Vec<MissingCoefficient>) -> f64 {
        lookup(&self.animal_emission_factors, Category::Livestock, species, missing)
    }

    pub fn waste_factor(&self, waste_type: &str, missing: &mut Vec<MissingCoefficient>) -> f64 {
        lookup(&self.waste_emission_factors, Category::Waste, waste_type, missing)
    }
}

fn lookup(
    table: &RateMap,
    category: Category,
    raw_key: &str,
    missing: &mut Vec<MissingCoefficient>,
) -> f64 {
    match table.get(raw_key) {
        Some(factor) => factor,
        None => {
            let key = normalize_key(raw_key);
            warn!("no {category} emission factor for '{raw_key}' (key '{key}'); counting 0");
            let miss = MissingCoefficient { category, key };
            if !missing.contains(&miss) {
                missing.push(miss);
            }
            0.0
        }
    }
}
