use chrono::Datelike;
use log::debug;
use uuid::Uuid;

use crate::models::{
    AbsorptionBasis, ActivityRecord, EmissionRates, EmissionResult, MonthlyBucket,
    MONTHS_PER_YEAR,
};
use crate::normalize::normalize_record;

/// Buckets a company's activity records into per-month emission series for `year`.
///
/// `month` (1-12) narrows the bucket to one slot; every other slot stays zero.
/// Forest absorption is computed once for the year and spread evenly over the
/// populated slots. Records for other companies or years are ignored.
pub fn compute_monthly_bucket(
    company_id: Uuid,
    year: i32,
    month: Option<u32>,
    rates: &EmissionRates,
    records: &[ActivityRecord],
    basis: AbsorptionBasis,
) -> MonthlyBucket {
    let mut bucket = MonthlyBucket::empty(company_id, year, month);
    let mut monthly_absorption = 0.0;
    let mut counted = 0usize;

    for record in records {
        if record.company_id != company_id || record.date.year() != year {
            continue;
        }

        let result = normalize_record(record, rates, basis, &mut bucket.missing_coefficients);

        // Absorption is a yearly property of the land, so the forest records are
        // not held to the month filter.
        if matches!(result, EmissionResult::Forest { .. }) {
            monthly_absorption += result.absorption();
            continue;
        }

        let slot = record.date.month0() as usize;
        if month.is_some_and(|wanted| wanted != record.date.month()) {
            continue;
        }
        counted += 1;

        match result {
            EmissionResult::Equipment {
                fuel_emission,
                electricity_emission,
                electricity_used_kwh,
            } => {
                bucket.equipment_fuel[slot] += fuel_emission;
                bucket.equipment_electricity[slot] += electricity_emission;
                bucket.equipment[slot] += result.emission();
                bucket.electricity_used_kwh[slot] += electricity_used_kwh;
            }
            EmissionResult::Livestock { emission } => bucket.livestock[slot] += emission,
            EmissionResult::Crops { emission } => bucket.crops[slot] += emission,
            EmissionResult::Waste { emission } => bucket.waste[slot] += emission,
            EmissionResult::Forest { .. } => {}
        }
    }

    for slot in 0..MONTHS_PER_YEAR {
        if month.is_some_and(|wanted| wanted as usize != slot + 1) {
            continue;
        }
        bucket.total_absorption[slot] = monthly_absorption;
    }

    for slot in 0..MONTHS_PER_YEAR {
        bucket.total_emissions[slot] =
            bucket.equipment[slot] + bucket.livestock[slot] + bucket.crops[slot] + bucket.waste[slot];
        bucket.net_emissions[slot] = bucket.total_emissions[slot] - bucket.total_absorption[slot];
    }

    debug!(
        "bucketed {counted} records for company {company_id} in {year}{}: {:.2} kg CO2e emitted, {:.2} kg CO2e/month absorbed",
        month.map(|m| format!("-{m:02}")).unwrap_or_default(),
        bucket.yearly_emissions(),
        monthly_absorption
    );

    bucket
}

/// Buckets every year in `from_year..=to_year`, oldest first.
pub fn compute_year_range(
    company_id: Uuid,
    from_year: i32,
    to_year: i32,
    rates: &EmissionRates,
    records: &[ActivityRecord],
    basis: AbsorptionBasis,
) -> Vec<MonthlyBucket> {
    (from_year..=to_year)
        .map(|year| compute_monthly_bucket(company_id, year, None, rates, records, basis))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{Activity, Category};

    fn rates() -> EmissionRates {
        EmissionRates {
            electricity_emission_factor: 0.4,
            fuel_emission_factors: [("diesel", 2.5)].into_iter().collect(),
            animal_emission_factors: [("cattle", 60.0)].into_iter().collect(),
            nitrogen_fertilizer_factor: 4.0,
            soil_emission_factor: 10.0,
            waste_emission_factors: [("manure", 0.2)].into_iter().collect(),
            absorption_rate_per_hectare_month: 25.0,
            absorption_rate_per_hectare_year: 360.0,
        }
    }

    fn on(company_id: Uuid, y: i32, m: u32, activity: Activity) -> ActivityRecord {
        ActivityRecord {
            company_id,
            date: NaiveDate::from_ymd_opt(y, m, 10).unwrap(),
            activity,
        }
    }

    fn sample_records(company_id: Uuid) -> Vec<ActivityRecord> {
        vec![
            on(
                company_id,
                2025,
                1,
                Activity::Equipment {
                    fuel_type: "diesel".to_string(),
                    fuel_consumed_liters: 100.0,
                    electricity_used_kwh: 50.0,
                },
            ),
            on(
                company_id,
                2025,
                1,
                Activity::Livestock {
                    species: "Cattle".to_string(),
                    head_count: 2.0,
                },
            ),
            on(
                company_id,
                2025,
                4,
                Activity::Crops {
                    fertilizer_used_kg: 10.0,
                    area_planted_hectares: 3.0,
                },
            ),
            on(
                company_id,
                2025,
                12,
                Activity::Waste {
                    waste_type: "manure".to_string(),
                    waste_quantity_kg: 500.0,
                },
            ),
            on(company_id, 2025, 6, Activity::Forest { area_hectares: 4.0 }),
            on(
                company_id,
                2024,
                1,
                Activity::Livestock {
                    species: "cattle".to_string(),
                    head_count: 100.0,
                },
            ),
            on(
                Uuid::new_v4(),
                2025,
                1,
                Activity::Livestock {
                    species: "cattle".to_string(),
                    head_count: 100.0,
                },
            ),
        ]
    }

    #[test]
    fn records_land_in_their_month() {
        let company_id = Uuid::new_v4();
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );

        assert!((bucket.equipment[0] - 270.0).abs() < 1e-9);
        assert!((bucket.equipment_fuel[0] - 250.0).abs() < 1e-9);
        assert!((bucket.equipment_electricity[0] - 20.0).abs() < 1e-9);
        assert!((bucket.livestock[0] - 120.0).abs() < 1e-9);
        assert!((bucket.crops[3] - 70.0).abs() < 1e-9);
        assert!((bucket.waste[11] - 100.0).abs() < 1e-9);
        assert!((bucket.total_emissions[0] - 390.0).abs() < 1e-9);
        assert_eq!(bucket.total_emissions[5], 0.0);
        assert!(bucket.missing_coefficients.is_empty());
    }

    #[test]
    fn totals_match_category_sums() {
        let company_id = Uuid::new_v4();
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );

        let categories: f64 = bucket.equipment.iter().sum::<f64>()
            + bucket.livestock.iter().sum::<f64>()
            + bucket.crops.iter().sum::<f64>()
            + bucket.waste.iter().sum::<f64>();
        assert!((bucket.yearly_emissions() - categories).abs() < 1e-9);
        for m in 0..MONTHS_PER_YEAR {
            let net = bucket.total_emissions[m] - bucket.total_absorption[m];
            assert!((bucket.net_emissions[m] - net).abs() < 1e-9);
        }
    }

    #[test]
    fn absorption_is_broadcast_to_every_month() {
        let company_id = Uuid::new_v4();
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );
        assert!(bucket.total_absorption.iter().all(|a| (a - 100.0).abs() < 1e-9));
        assert!((bucket.net_emissions[5] + 100.0).abs() < 1e-9);

        let annual = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Annual,
        );
        assert!(annual.total_absorption.iter().all(|a| (a - 120.0).abs() < 1e-9));
    }

    #[test]
    fn month_filter_populates_a_single_slot() {
        let company_id = Uuid::new_v4();
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            Some(4),
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );
        assert_eq!(bucket.month, Some(4));
        assert!((bucket.total_emissions[3] - 70.0).abs() < 1e-9);
        assert!((bucket.total_absorption[3] - 100.0).abs() < 1e-9);
        assert_eq!(bucket.total_emissions[0], 0.0);
        assert_eq!(bucket.total_absorption[0], 0.0);
        assert!((bucket.yearly_emissions() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn empty_rate_table_gives_zero_bucket() {
        let company_id = Uuid::new_v4();
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &EmissionRates::default(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );
        assert!(bucket.total_emissions.iter().all(|v| *v == 0.0));
        assert!(bucket.total_absorption.iter().all(|v| *v == 0.0));
        assert!(bucket.net_emissions.iter().all(|v| *v == 0.0));
        assert!(bucket
            .missing_coefficients
            .iter()
            .any(|miss| miss.category == Category::Livestock && miss.key == "cattle"));
    }

    #[test]
    fn no_records_means_no_emissions_or_absorption() {
        let bucket = compute_monthly_bucket(
            Uuid::new_v4(),
            2025,
            None,
            &rates(),
            &[],
            AbsorptionBasis::Monthly,
        );
        assert_eq!(bucket.yearly_emissions(), 0.0);
        assert_eq!(bucket.yearly_absorption(), 0.0);
    }

    #[test]
    fn unknown_fuel_is_recorded_and_skipped() {
        let company_id = Uuid::new_v4();
        let records = vec![on(
            company_id,
            2025,
            2,
            Activity::Equipment {
                fuel_type: "Hydrogen".to_string(),
                fuel_consumed_liters: 40.0,
                electricity_used_kwh: 10.0,
            },
        )];
        let bucket = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &records,
            AbsorptionBasis::Monthly,
        );
        assert_eq!(bucket.equipment_fuel[1], 0.0);
        assert!((bucket.equipment_electricity[1] - 4.0).abs() < 1e-9);
        assert_eq!(bucket.missing_coefficients.len(), 1);
        assert_eq!(bucket.missing_coefficients[0].key, "hydrogen");
    }

    #[test]
    fn recomputation_is_identical() {
        let company_id = Uuid::new_v4();
        let records = sample_records(company_id);
        let first = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &records,
            AbsorptionBasis::Monthly,
        );
        let second = compute_monthly_bucket(
            company_id,
            2025,
            None,
            &rates(),
            &records,
            AbsorptionBasis::Monthly,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn year_range_is_chronological() {
        let company_id = Uuid::new_v4();
        let buckets = compute_year_range(
            company_id,
            2024,
            2026,
            &rates(),
            &sample_records(company_id),
            AbsorptionBasis::Monthly,
        );
        let years: Vec<i32> = buckets.iter().map(|b| b.year).collect();
        assert_eq!(years, vec![2024, 2025, 2026]);
        assert!((buckets[0].livestock[0] - 6000.0).abs() < 1e-9);
        assert_eq!(buckets[2].yearly_emissions(), 0.0);
    }
}
