use log::debug;
use uuid::Uuid;

use crate::models::{
    EmissionTargets, MonthlyBucket, NetZeroAnalysis, YearlyDataPoint, YearlyRollup,
    MONTHS_PER_YEAR,
};

/// Reduction applied when no target has been set at all (keep 90% of last year).
pub const DEFAULT_REDUCTION_TARGET: f64 = 0.1;

const DECEMBER: u32 = 11;

impl EmissionTargets {
    /// Target for `year`, else the latest year's target, else the default.
    pub fn reduction_target(&self, year: i32) -> f64 {
        self.0
            .get(&year)
            .or_else(|| self.0.values().next_back())
            .copied()
            .unwrap_or(DEFAULT_REDUCTION_TARGET)
    }
}

/// Rolls consecutive yearly buckets (oldest first) into yearly points and the
/// net-zero analysis. The last bucket is treated as `current_year`.
pub fn compute_yearly_rollup(
    company_id: Uuid,
    buckets: &[MonthlyBucket],
    targets: &EmissionTargets,
    current_year: i32,
) -> YearlyRollup {
    let emissions: Vec<f64> = buckets
        .iter()
        .flat_map(|bucket| bucket.total_emissions)
        .collect();
    let absorption: Vec<f64> = buckets
        .iter()
        .flat_map(|bucket| bucket.total_absorption)
        .collect();
    rollup_series(company_id, &emissions, &absorption, targets, current_year)
}

/// Same as [`compute_yearly_rollup`] over flat monthly series. Every 12 values
/// form one year; the series are assumed contiguous with no gaps.
pub fn rollup_series(
    company_id: Uuid,
    monthly_emissions: &[f64],
    monthly_absorption: &[f64],
    targets: &EmissionTargets,
    current_year: i32,
) -> YearlyRollup {
    let total_years = monthly_emissions.len().div_ceil(MONTHS_PER_YEAR);
    let mut points = Vec::with_capacity(total_years);
    let mut cumulative = 0.0;
    let mut average_absorption = 0.0;
    let mut previous_emissions: Option<f64> = None;

    for (index, chunk) in monthly_emissions.chunks(MONTHS_PER_YEAR).enumerate() {
        let year = current_year - (total_years - index - 1) as i32;
        let offset = index * MONTHS_PER_YEAR;
        let absorption_at = |m: usize| monthly_absorption.get(offset + m).copied().unwrap_or(0.0);

        let valid_months: Vec<usize> = (0..chunk.len()).filter(|&m| chunk[m] > 0.0).collect();
        let months_present = chunk.iter().filter(|value| **value != 0.0).count();

        let (total_emissions, absorption) = if valid_months.is_empty() {
            (0.0, average_absorption * MONTHS_PER_YEAR as f64)
        } else {
            let emitted: f64 = valid_months.iter().map(|&m| chunk[m]).sum();
            let absorbed: f64 = valid_months.iter().map(|&m| absorption_at(m)).sum();
            average_absorption = absorbed / valid_months.len() as f64;
            (emitted, absorbed)
        };

        let net_emissions = total_emissions - absorption;
        cumulative += net_emissions;

        let baseline = previous_emissions.unwrap_or(total_emissions);
        let target_emissions = baseline * (1.0 - targets.reduction_target(year));
        previous_emissions = Some(total_emissions);

        points.push(YearlyDataPoint {
            year,
            total_emissions,
            absorption,
            net_emissions,
            cumulative_ytd_net_emissions: cumulative,
            target_emissions,
            months_present,
            is_projected: false,
        });
    }

    let net_zero = detect_net_zero(&points);
    debug!(
        "rolled up {} years for company {company_id}; cumulative net {:.2}, net zero {:?}",
        points.len(),
        net_zero.ytd_net_emissions,
        net_zero.cumulative_net_zero_year
    );

    YearlyRollup {
        company_id,
        points,
        net_zero,
    }
}

/// First year whose cumulative net emissions reach zero or below. Years with
/// neither emissions nor absorption carry no evidence and are skipped.
pub fn detect_net_zero(points: &[YearlyDataPoint]) -> NetZeroAnalysis {
    let crossing = points.iter().find(|point| {
        (point.total_emissions != 0.0 || point.absorption != 0.0)
            && point.cumulative_ytd_net_emissions <= 0.0
    });

    NetZeroAnalysis {
        cumulative_net_zero_year: crossing.map(|point| point.year),
        cumulative_net_zero_month: crossing.map(|_| DECEMBER),
        ytd_net_emissions: points
            .last()
            .map(|point| point.cumulative_ytd_net_emissions)
            .unwrap_or(0.0),
    }
}

/// Extends a rollup `horizon` years past its last known year.
///
/// The last known year is annualised over its present months; each projected
/// year cuts the previous year's emissions by that year's reduction target while
/// absorption holds steady.
pub fn project_trajectory(
    rollup: &YearlyRollup,
    targets: &EmissionTargets,
    horizon: u32,
) -> Vec<YearlyDataPoint> {
    let Some(last) = rollup.points.last() else {
        return Vec::new();
    };

    let scale = if last.months_present > 0 {
        MONTHS_PER_YEAR as f64 / last.months_present as f64
    } else {
        1.0
    };
    let absorption = last.absorption * scale;
    let mut emissions = last.total_emissions * scale;
    let mut cumulative = last.cumulative_ytd_net_emissions;

    (1..=horizon as i32)
        .map(|step| {
            let year = last.year + step;
            emissions *= 1.0 - targets.reduction_target(year);
            let net_emissions = emissions - absorption;
            cumulative += net_emissions;
            YearlyDataPoint {
                year,
                total_emissions: emissions,
                absorption,
                net_emissions,
                cumulative_ytd_net_emissions: cumulative,
                target_emissions: emissions,
                months_present: MONTHS_PER_YEAR,
                is_projected: true,
            }
        })
        .collect()
}

/// Net-zero analysis over known years followed by projected ones.
pub fn projected_net_zero(rollup: &YearlyRollup, projected: &[YearlyDataPoint]) -> NetZeroAnalysis {
    let combined: Vec<YearlyDataPoint> = rollup
        .points
        .iter()
        .chain(projected.iter())
        .cloned()
        .collect();
    detect_net_zero(&combined)
}
