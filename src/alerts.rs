use log::warn;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{MonthlyBucket, ScopeTotals};
use crate::scopes::{classify_bucket, Scope2Basis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Scope1,
    Scope2,
    Scope3,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Scope1 => "Scope 1",
            Scope::Scope2 => "Scope 2",
            Scope::Scope3 => "Scope 3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub scope1: Option<f64>,
    pub scope2: Option<f64>,
    pub scope3: Option<f64>,
    /// Alerting compares raw kWh for scope 2 unless told otherwise.
    pub basis: Scope2Basis,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            scope1: None,
            scope2: None,
            scope3: None,
            basis: Scope2Basis::TotalEnergyConsumption,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAlert {
    pub company_id: Uuid,
    pub year: i32,
    pub scope: Scope,
    pub value: f64,
    pub limit: f64,
    pub exceeded_by: f64,
}

pub fn evaluate_thresholds(
    company_id: Uuid,
    year: i32,
    scopes: &ScopeTotals,
    thresholds: &Thresholds,
) -> Vec<ThresholdAlert> {
    let checks = [
        (Scope::Scope1, scopes.scope1, thresholds.scope1),
        (Scope::Scope2, scopes.scope2, thresholds.scope2),
        (Scope::Scope3, scopes.scope3, thresholds.scope3),
    ];

    checks
        .into_iter()
        .filter_map(|(scope, value, limit)| {
            let limit = limit?;
            if value <= limit {
                return None;
            }
            warn!(
                "{} for company {company_id} in {year} is {value:.2}, above limit {limit:.2}",
                scope.label()
            );
            Some(ThresholdAlert {
                company_id,
                year,
                scope,
                value,
                limit,
                exceeded_by: value - limit,
            })
        })
        .collect()
}

pub fn evaluate_bucket(bucket: &MonthlyBucket, thresholds: &Thresholds) -> Vec<ThresholdAlert> {
    let scopes = classify_bucket(bucket, thresholds.basis);
    evaluate_thresholds(bucket.company_id, bucket.year, &scopes, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exceeded_limits_raise_alerts() {
        let scopes = ScopeTotals {
            scope1: 1200.0,
            scope2: 300.0,
            scope3: 50.0,
        };
        let thresholds = Thresholds {
            scope1: Some(1000.0),
            scope2: Some(300.0),
            scope3: None,
            ..Default::default()
        };
        let alerts = evaluate_thresholds(Uuid::new_v4(), 2025, &scopes, &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].scope, Scope::Scope1);
        assert_eq!(alerts[0].exceeded_by, 200.0);
    }

    #[test]
    fn bucket_alerts_use_energy_basis_by_default() {
        let mut bucket = MonthlyBucket::empty(Uuid::new_v4(), 2025, None);
        bucket.equipment_electricity[0] = 40.0;
        bucket.equipment[0] = 40.0;
        bucket.electricity_used_kwh[0] = 100.0;
        bucket.total_emissions[0] = 40.0;

        let thresholds = Thresholds {
            scope2: Some(80.0),
            ..Default::default()
        };
        let alerts = evaluate_bucket(&bucket, &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].value, 100.0);

        let by_emission = Thresholds {
            basis: Scope2Basis::ElectricityEmissionOnly,
            ..thresholds
        };
        assert!(evaluate_bucket(&bucket, &by_emission).is_empty());
    }
}
