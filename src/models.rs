use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rates::RateMap;

pub const MONTHS_PER_YEAR: usize = 12;

/// One value per calendar month, 0 = January .. 11 = December.
pub type MonthlyValues = [f64; MONTHS_PER_YEAR];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Equipment,
    Livestock,
    Crops,
    Waste,
    Forest,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Equipment,
        Category::Livestock,
        Category::Crops,
        Category::Waste,
        Category::Forest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Equipment => "equipment",
            Category::Livestock => "livestock",
            Category::Crops => "crops",
            Category::Waste => "waste",
            Category::Forest => "forest",
        }
    }

    pub fn parse(value: &str) -> Option<Category> {
        let wanted = value.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionRates {
    pub electricity_emission_factor: f64,
    pub fuel_emission_factors: RateMap,
    pub animal_emission_factors: RateMap,
    pub nitrogen_fertilizer_factor: f64,
    pub soil_emission_factor: f64,
    pub waste_emission_factors: RateMap,
    pub absorption_rate_per_hectare_month: f64,
    pub absorption_rate_per_hectare_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Activity {
    Equipment {
        fuel_type: String,
        fuel_consumed_liters: f64,
        electricity_used_kwh: f64,
    },
    Livestock {
        species: String,
        head_count: f64,
    },
    Crops {
        fertilizer_used_kg: f64,
        area_planted_hectares: f64,
    },
    Waste {
        waste_type: String,
        waste_quantity_kg: f64,
    },
    Forest {
        area_hectares: f64,
    },
}

impl Activity {
    pub fn category(&self) -> Category {
        match self {
            Activity::Equipment { .. } => Category::Equipment,
            Activity::Livestock { .. } => Category::Livestock,
            Activity::Crops { .. } => Category::Crops,
            Activity::Waste { .. } => Category::Waste,
            Activity::Forest { .. } => Category::Forest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub company_id: Uuid,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub activity: Activity,
}

/// Emission value(s) derived from a single activity record.
///
/// Equipment keeps fuel and electricity apart because they land in different scopes.
/// Forest records produce an absorption, never an emission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EmissionResult {
    Equipment {
        fuel_emission: f64,
        electricity_emission: f64,
        electricity_used_kwh: f64,
    },
    Livestock {
        emission: f64,
    },
    Crops {
        emission: f64,
    },
    Waste {
        emission: f64,
    },
    Forest {
        absorption: f64,
    },
}

impl EmissionResult {
    pub fn emission(&self) -> f64 {
        match *self {
            EmissionResult::Equipment {
                fuel_emission,
                electricity_emission,
                ..
            } => fuel_emission + electricity_emission,
            EmissionResult::Livestock { emission }
            | EmissionResult::Crops { emission }
            | EmissionResult::Waste { emission } => emission,
            EmissionResult::Forest { .. } => 0.0,
        }
    }

    pub fn absorption(&self) -> f64 {
        match *self {
            EmissionResult::Forest { absorption } => absorption,
            _ => 0.0,
        }
    }
}

/// A rate lookup that missed; the affected value was taken as zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCoefficient {
    pub category: Category,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AbsorptionBasis {
    /// areaHectares * absorptionRatePerHectareMonth
    #[default]
    Monthly,
    /// areaHectares * absorptionRatePerHectareYear / 12
    Annual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub company_id: Uuid,
    pub year: i32,
    /// Set when the bucket was narrowed to a single month (1-based).
    pub month: Option<u32>,
    pub equipment: MonthlyValues,
    pub equipment_fuel: MonthlyValues,
    pub equipment_electricity: MonthlyValues,
    pub electricity_used_kwh: MonthlyValues,
    pub livestock: MonthlyValues,
    pub crops: MonthlyValues,
    pub waste: MonthlyValues,
    pub total_emissions: MonthlyValues,
    pub total_absorption: MonthlyValues,
    pub net_emissions: MonthlyValues,
    pub missing_coefficients: Vec<MissingCoefficient>,
}

impl MonthlyBucket {
    pub fn empty(company_id: Uuid, year: i32, month: Option<u32>) -> Self {
        Self {
            company_id,
            year,
            month,
            equipment: [0.0; MONTHS_PER_YEAR],
            equipment_fuel: [0.0; MONTHS_PER_YEAR],
            equipment_electricity: [0.0; MONTHS_PER_YEAR],
            electricity_used_kwh: [0.0; MONTHS_PER_YEAR],
            livestock: [0.0; MONTHS_PER_YEAR],
            crops: [0.0; MONTHS_PER_YEAR],
            waste: [0.0; MONTHS_PER_YEAR],
            total_emissions: [0.0; MONTHS_PER_YEAR],
            total_absorption: [0.0; MONTHS_PER_YEAR],
            net_emissions: [0.0; MONTHS_PER_YEAR],
            missing_coefficients: Vec::new(),
        }
    }

    pub fn yearly_emissions(&self) -> f64 {
        self.total_emissions.iter().sum()
    }

    pub fn yearly_absorption(&self) -> f64 {
        self.total_absorption.iter().sum()
    }

    pub fn yearly_net(&self) -> f64 {
        self.net_emissions.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeTotals {
    pub scope1: f64,
    pub scope2: f64,
    pub scope3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyDataPoint {
    pub year: i32,
    pub total_emissions: f64,
    pub absorption: f64,
    pub net_emissions: f64,
    #[serde(rename = "cumulativeYTDNetEmissions")]
    pub cumulative_ytd_net_emissions: f64,
    pub target_emissions: f64,
    pub months_present: usize,
    pub is_projected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetZeroAnalysis {
    pub cumulative_net_zero_year: Option<i32>,
    /// 0-based month index; 11 (December) at yearly granularity.
    pub cumulative_net_zero_month: Option<u32>,
    pub ytd_net_emissions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRollup {
    pub company_id: Uuid,
    pub points: Vec<YearlyDataPoint>,
    pub net_zero: NetZeroAnalysis,
}

/// Sparse per-year reduction targets as fractions (0.25 = cut 25% against the prior year).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionTargets(pub BTreeMap<i32, f64>);

#[derive(Debug, Clone)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
}

/// Inclusive calendar range used when querying the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// January 1st of `from_year` through December 31st of `to_year`.
    pub fn years(from_year: i32, to_year: i32) -> Option<DateRange> {
        Some(DateRange {
            start: NaiveDate::from_ymd_opt(from_year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(to_year, 12, 31)?,
        })
    }
}
