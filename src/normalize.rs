use crate::models::{
    AbsorptionBasis, Activity, ActivityRecord, EmissionRates, EmissionResult, MissingCoefficient,
    MONTHS_PER_YEAR,
};

/// Converts one activity record into its emission (or absorption) value(s).
///
/// Rate misses are appended to `missing` and count as zero. Quantities are used
/// as recorded, including negative values.
pub fn normalize_record(
    record: &ActivityRecord,
    rates: &EmissionRates,
    basis: AbsorptionBasis,
    missing: &mut Vec<MissingCoefficient>,
) -> EmissionResult {
    match &record.activity {
        Activity::Equipment {
            fuel_type,
            fuel_consumed_liters,
            electricity_used_kwh,
        } => {
            let fuel_emission = if *fuel_consumed_liters == 0.0 {
                0.0
            } else {
                fuel_consumed_liters * rates.fuel_factor(fuel_type, missing)
            };
            EmissionResult::Equipment {
                fuel_emission,
                electricity_emission: electricity_used_kwh * rates.electricity_emission_factor,
                electricity_used_kwh: *electricity_used_kwh,
            }
        }
        Activity::Livestock {
            species,
            head_count,
        } => EmissionResult::Livestock {
            emission: head_count * rates.animal_factor(species, missing),
        },
        Activity::Crops {
            fertilizer_used_kg,
            area_planted_hectares,
        } => EmissionResult::Crops {
            emission: fertilizer_used_kg * rates.nitrogen_fertilizer_factor
                + area_planted_hectares * rates.soil_emission_factor,
        },
        Activity::Waste {
            waste_type,
            waste_quantity_kg,
        } => EmissionResult::Waste {
            emission: waste_quantity_kg * rates.waste_factor(waste_type, missing),
        },
        Activity::Forest { area_hectares } => EmissionResult::Forest {
            absorption: monthly_absorption(*area_hectares, rates, basis),
        },
    }
}

/// Absorption credited to one month for a forested area.
pub fn monthly_absorption(area_hectares: f64, rates: &EmissionRates, basis: AbsorptionBasis) -> f64 {
    match basis {
        AbsorptionBasis::Monthly => area_hectares * rates.absorption_rate_per_hectare_month,
        AbsorptionBasis::Annual => {
            area_hectares * rates.absorption_rate_per_hectare_year / MONTHS_PER_YEAR as f64
        }
    }
}
