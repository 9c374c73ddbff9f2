use serde::{Deserialize, Serialize};

use crate::models::{MonthlyBucket, ScopeTotals};

/// Which quantity stands in for scope 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Scope2Basis {
    /// Emissions from purchased electricity (kWh * electricity factor).
    #[default]
    #[value(name = "electricity")]
    ElectricityEmissionOnly,
    /// Raw electricity consumption in kWh, used where no factor breakdown exists.
    #[value(name = "energy")]
    TotalEnergyConsumption,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeInputs {
    pub total_emissions: f64,
    pub livestock_emission: f64,
    pub equipment_fuel_emission: f64,
    pub equipment_electricity_emission: f64,
    pub total_energy_consumption_kwh: f64,
}

impl ScopeInputs {
    /// Totals over every month of the bucket.
    pub fn from_bucket(bucket: &MonthlyBucket) -> Self {
        Self {
            total_emissions: bucket.total_emissions.iter().sum(),
            livestock_emission: bucket.livestock.iter().sum(),
            equipment_fuel_emission: bucket.equipment_fuel.iter().sum(),
            equipment_electricity_emission: bucket.equipment_electricity.iter().sum(),
            total_energy_consumption_kwh: bucket.electricity_used_kwh.iter().sum(),
        }
    }

    /// Totals for one 0-based month of the bucket.
    pub fn for_month(bucket: &MonthlyBucket, month_index: usize) -> Self {
        Self {
            total_emissions: bucket.total_emissions[month_index],
            livestock_emission: bucket.livestock[month_index],
            equipment_fuel_emission: bucket.equipment_fuel[month_index],
            equipment_electricity_emission: bucket.equipment_electricity[month_index],
            total_energy_consumption_kwh: bucket.electricity_used_kwh[month_index],
        }
    }
}

/// Splits a period's emissions into GHG-Protocol scopes.
///
/// Scope 3 is the remainder after scopes 1 and 2, clamped at zero. When the
/// clamp applies the three scopes sum to more than `total_emissions`; that
/// mismatch is left visible rather than redistributed.
pub fn classify_scopes(inputs: ScopeInputs, basis: Scope2Basis) -> ScopeTotals {
    let scope1 = inputs.livestock_emission + inputs.equipment_fuel_emission;
    let scope2 = match basis {
        Scope2Basis::ElectricityEmissionOnly => inputs.equipment_electricity_emission,
        Scope2Basis::TotalEnergyConsumption => inputs.total_energy_consumption_kwh,
    };
    let scope3 = (inputs.total_emissions - scope1 - scope2).max(0.0);

    ScopeTotals {
        scope1,
        scope2,
        scope3,
    }
}

pub fn classify_bucket(bucket: &MonthlyBucket, basis: Scope2Basis) -> ScopeTotals {
    classify_scopes(ScopeInputs::from_bucket(bucket), basis)
}

/// Per-month scope split, index 0 = January.
pub fn classify_bucket_by_month(bucket: &MonthlyBucket, basis: Scope2Basis) -> Vec<ScopeTotals> {
    (0..bucket.total_emissions.len())
        .map(|month_index| classify_scopes(ScopeInputs::for_month(bucket, month_index), basis))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn inputs(total: f64, livestock: f64, fuel: f64, electricity: f64, kwh: f64) -> ScopeInputs {
        ScopeInputs {
            total_emissions: total,
            livestock_emission: livestock,
            equipment_fuel_emission: fuel,
            equipment_electricity_emission: electricity,
            total_energy_consumption_kwh: kwh,
        }
    }

    #[test]
    fn scopes_sum_to_total_when_remainder_is_positive() {
        let scopes = classify_scopes(
            inputs(1000.0, 300.0, 200.0, 100.0, 250.0),
            Scope2Basis::ElectricityEmissionOnly,
        );
        assert_eq!(scopes.scope1, 500.0);
        assert_eq!(scopes.scope2, 100.0);
        assert_eq!(scopes.scope3, 400.0);
        assert!((scopes.scope1 + scopes.scope2 + scopes.scope3 - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn scope3_clamps_at_zero() {
        let scopes = classify_scopes(
            inputs(500.0, 300.0, 200.0, 0.0, 400.0),
            Scope2Basis::TotalEnergyConsumption,
        );
        assert_eq!(scopes.scope2, 400.0);
        assert_eq!(scopes.scope3, 0.0);
    }

    #[test]
    fn energy_basis_uses_kwh() {
        let electricity = classify_scopes(
            inputs(900.0, 0.0, 0.0, 50.0, 125.0),
            Scope2Basis::ElectricityEmissionOnly,
        );
        let energy = classify_scopes(
            inputs(900.0, 0.0, 0.0, 50.0, 125.0),
            Scope2Basis::TotalEnergyConsumption,
        );
        assert_eq!(electricity.scope2, 50.0);
        assert_eq!(energy.scope2, 125.0);
        assert_eq!(energy.scope3, 775.0);
    }

    #[test]
    fn bucket_scopes_cover_every_month() {
        let mut bucket = MonthlyBucket::empty(Uuid::new_v4(), 2025, None);
        bucket.livestock[0] = 100.0;
        bucket.equipment_fuel[0] = 20.0;
        bucket.equipment_electricity[0] = 5.0;
        bucket.equipment[0] = 25.0;
        bucket.waste[0] = 10.0;
        bucket.total_emissions[0] = 135.0;
        bucket.crops[6] = 40.0;
        bucket.total_emissions[6] = 40.0;

        let totals = classify_bucket(&bucket, Scope2Basis::ElectricityEmissionOnly);
        assert_eq!(totals.scope1, 120.0);
        assert_eq!(totals.scope2, 5.0);
        assert_eq!(totals.scope3, 50.0);

        let by_month = classify_bucket_by_month(&bucket, Scope2Basis::ElectricityEmissionOnly);
        assert_eq!(by_month.len(), 12);
        assert_eq!(by_month[6].scope3, 40.0);
        assert_eq!(by_month[3], ScopeTotals::default());
    }
}
