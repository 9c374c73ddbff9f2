use std::fmt::Write;

use crate::models::{MonthlyBucket, NetZeroAnalysis, ScopeTotals, YearlyDataPoint, YearlyRollup};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn describe_net_zero(analysis: &NetZeroAnalysis) -> String {
    match (
        analysis.cumulative_net_zero_year,
        analysis.cumulative_net_zero_month,
    ) {
        (Some(year), Some(month)) => format!(
            "Cumulative net zero reached in {} {year}",
            MONTH_NAMES.get(month as usize).copied().unwrap_or("Dec")
        ),
        (Some(year), None) => format!("Cumulative net zero reached in {year}"),
        _ => "Cumulative net zero not yet determined".to_string(),
    }
}

pub fn build_report(
    company: &str,
    rollup: &YearlyRollup,
    projected: &[YearlyDataPoint],
    projected_net_zero: Option<&NetZeroAnalysis>,
    latest: Option<(&MonthlyBucket, ScopeTotals)>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Emissions Footprint Report");
    match (rollup.points.first(), rollup.points.last()) {
        (Some(first), Some(last)) => {
            let _ = writeln!(
                output,
                "Generated for {} ({} to {})",
                company, first.year, last.year
            );
        }
        _ => {
            let _ = writeln!(output, "Generated for {}", company);
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "All figures in kg CO2e.");
    let _ = writeln!(output);

    let _ = writeln!(output, "## Yearly Trajectory");
    if rollup.points.is_empty() {
        let _ = writeln!(output, "No emission data recorded for this range.");
    } else {
        let _ = writeln!(
            output,
            "| Year | Emissions | Absorption | Net | Cumulative net | Target | Months |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for point in rollup.points.iter().chain(projected.iter()) {
            let _ = writeln!(
                output,
                "| {}{} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} | {} |",
                point.year,
                if point.is_projected { " (projected)" } else { "" },
                point.total_emissions,
                point.absorption,
                point.net_emissions,
                point.cumulative_ytd_net_emissions,
                point.target_emissions,
                point.months_present
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Net Zero");
    let _ = writeln!(
        output,
        "- {} (cumulative net {:.1})",
        describe_net_zero(&rollup.net_zero),
        rollup.net_zero.ytd_net_emissions
    );
    if let Some(analysis) = projected_net_zero {
        let _ = writeln!(output, "- Projected: {}", describe_net_zero(analysis));
    }

    let Some((bucket, scopes)) = latest else {
        return output;
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Scopes ({})", bucket.year);
    let _ = writeln!(output, "- Scope 1 (livestock, fuel): {:.1}", scopes.scope1);
    let _ = writeln!(output, "- Scope 2 (purchased electricity): {:.1}", scopes.scope2);
    let _ = writeln!(output, "- Scope 3 (crops, waste, other): {:.1}", scopes.scope3);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Breakdown ({})", bucket.year);
    let _ = writeln!(
        output,
        "| Month | Equipment | Livestock | Crops | Waste | Total | Absorption | Net |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for (m, name) in MONTH_NAMES.iter().enumerate() {
        let _ = writeln!(
            output,
            "| {} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} |",
            name,
            bucket.equipment[m],
            bucket.livestock[m],
            bucket.crops[m],
            bucket.waste[m],
            bucket.total_emissions[m],
            bucket.total_absorption[m],
            bucket.net_emissions[m]
        );
    }

    if !bucket.missing_coefficients.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Missing Emission Factors");
        for miss in bucket.missing_coefficients.iter() {
            let _ = writeln!(
                output,
                "- {} '{}' has no factor and was counted as 0",
                miss.category, miss.key
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::models::{Category, MissingCoefficient};

    fn point(year: i32, cumulative: f64, is_projected: bool) -> YearlyDataPoint {
        YearlyDataPoint {
            year,
            total_emissions: 1000.0,
            absorption: 400.0,
            net_emissions: 600.0,
            cumulative_ytd_net_emissions: cumulative,
            target_emissions: 900.0,
            months_present: 12,
            is_projected,
        }
    }

    #[test]
    fn net_zero_description_names_month() {
        let reached = NetZeroAnalysis {
            cumulative_net_zero_year: Some(2031),
            cumulative_net_zero_month: Some(11),
            ytd_net_emissions: -5.0,
        };
        assert_eq!(describe_net_zero(&reached), "Cumulative net zero reached in Dec 2031");
        assert_eq!(
            describe_net_zero(&NetZeroAnalysis::default()),
            "Cumulative net zero not yet determined"
        );
    }

    #[test]
    fn report_lists_years_scopes_and_missing_factors() {
        let company_id = Uuid::new_v4();
        let rollup = YearlyRollup {
            company_id,
            points: vec![point(2024, 600.0, false), point(2025, 1200.0, false)],
            net_zero: NetZeroAnalysis {
                ytd_net_emissions: 1200.0,
                ..Default::default()
            },
        };
        let mut bucket = MonthlyBucket::empty(company_id, 2025, None);
        bucket.missing_coefficients.push(MissingCoefficient {
            category: Category::Equipment,
            key: "hydrogen".to_string(),
        });
        let scopes = ScopeTotals {
            scope1: 1.0,
            scope2: 2.0,
            scope3: 3.0,
        };

        let report = build_report(
            "Willow Creek Dairy",
            &rollup,
            &[point(2026, 1500.0, true)],
            None,
            Some((&bucket, scopes)),
        );
        assert!(report.contains("Generated for Willow Creek Dairy (2024 to 2025)"));
        assert!(report.contains("| 2026 (projected) |"));
        assert!(report.contains("Cumulative net zero not yet determined (cumulative net 1200.0)"));
        assert!(report.contains("- Scope 2 (purchased electricity): 2.0"));
        assert!(report.contains("| Dec |"));
        assert!(report.contains("equipment 'hydrogen' has no factor"));
    }

    #[test]
    fn empty_rollup_reports_zero_state() {
        let rollup = YearlyRollup {
            company_id: Uuid::new_v4(),
            points: Vec::new(),
            net_zero: NetZeroAnalysis::default(),
        };
        let report = build_report("Cedar Ridge Orchard", &rollup, &[], None, None);
        assert!(report.contains("No emission data recorded for this range."));
        assert!(!report.contains("## Scopes"));
    }
}
