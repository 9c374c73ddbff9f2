use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod alerts;
mod db;
mod leaderboard;
mod models;
mod monthly;
mod normalize;
mod rates;
mod report;
mod rollup;
mod scopes;

use models::{AbsorptionBasis, Company, DateRange, EmissionRates, MonthlyBucket};
use scopes::Scope2Basis;

#[derive(Parser)]
#[command(name = "farm-emissions")]
#[command(about = "Greenhouse-gas footprint tracker for farm operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a rate table and sample farms
    Seed,
    /// Import activity records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Monthly emissions and absorption for one year
    Monthly {
        #[arg(long)]
        company: String,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long, value_enum, default_value_t = AbsorptionBasis::Monthly)]
        absorption: AbsorptionBasis,
        #[arg(long)]
        json: bool,
    },
    /// Scope 1/2/3 split for one year or month
    Scopes {
        #[arg(long)]
        company: String,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long, value_enum, default_value_t = Scope2Basis::ElectricityEmissionOnly)]
        scope2: Scope2Basis,
        /// Also print the split for each month
        #[arg(long)]
        by_month: bool,
        #[arg(long)]
        json: bool,
    },
    /// Yearly net emissions, targets and net-zero year
    Rollup {
        #[arg(long)]
        company: String,
        #[arg(long)]
        from_year: i32,
        /// Defaults to the current year
        #[arg(long)]
        to_year: Option<i32>,
        /// Extend the trajectory this many years past the last known year
        #[arg(long, default_value_t = 0)]
        project_years: u32,
        #[arg(long, value_enum, default_value_t = AbsorptionBasis::Monthly)]
        absorption: AbsorptionBasis,
        #[arg(long)]
        json: bool,
    },
    /// Flag companies whose scope totals exceed limits
    Alerts {
        /// Check a single company instead of all of them
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        scope1_limit: Option<f64>,
        #[arg(long)]
        scope2_limit: Option<f64>,
        #[arg(long)]
        scope3_limit: Option<f64>,
        #[arg(long, value_enum, default_value_t = Scope2Basis::TotalEnergyConsumption)]
        scope2: Scope2Basis,
    },
    /// Rank companies by net emissions for a year
    Leaderboard {
        #[arg(long)]
        year: i32,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = AbsorptionBasis::Monthly)]
        absorption: AbsorptionBasis,
    },
    /// Generate a markdown footprint report
    Report {
        #[arg(long)]
        company: String,
        #[arg(long)]
        from_year: i32,
        #[arg(long)]
        to_year: Option<i32>,
        #[arg(long, default_value_t = 0)]
        project_years: u32,
        #[arg(long, value_enum, default_value_t = AbsorptionBasis::Monthly)]
        absorption: AbsorptionBasis,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activity records from {}.", csv.display());
        }
        Commands::Monthly {
            company,
            year,
            month,
            absorption,
            json,
        } => {
            let company = resolve_company(&pool, &company).await?;
            let rates = load_rates(&pool).await?;
            let bucket = load_bucket(&pool, &company, year, month, &rates, absorption).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&bucket)?);
                return Ok(());
            }

            println!("Monthly emissions for {} in {year} (kg CO2e):", company.name);
            for m in 0..models::MONTHS_PER_YEAR {
                if month.is_some_and(|wanted| wanted as usize != m + 1) {
                    continue;
                }
                println!(
                    "- {:02}: equipment {:.1}, livestock {:.1}, crops {:.1}, waste {:.1} | total {:.1}, absorbed {:.1}, net {:.1}",
                    m + 1,
                    bucket.equipment[m],
                    bucket.livestock[m],
                    bucket.crops[m],
                    bucket.waste[m],
                    bucket.total_emissions[m],
                    bucket.total_absorption[m],
                    bucket.net_emissions[m]
                );
            }
            print_missing(&bucket);
        }
        Commands::Scopes {
            company,
            year,
            month,
            scope2,
            by_month,
            json,
        } => {
            let company = resolve_company(&pool, &company).await?;
            let rates = load_rates(&pool).await?;
            let bucket =
                load_bucket(&pool, &company, year, month, &rates, AbsorptionBasis::Monthly).await?;
            let totals = scopes::classify_bucket(&bucket, scope2);

            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
                return Ok(());
            }

            println!("Scope split for {} ({year}):", company.name);
            println!("- Scope 1: {:.2}", totals.scope1);
            println!("- Scope 2: {:.2}", totals.scope2);
            println!("- Scope 3: {:.2}", totals.scope3);
            if by_month {
                for (m, split) in scopes::classify_bucket_by_month(&bucket, scope2)
                    .iter()
                    .enumerate()
                {
                    if month.is_some_and(|wanted| wanted as usize != m + 1) {
                        continue;
                    }
                    println!(
                        "  {:02}: scope 1 {:.2}, scope 2 {:.2}, scope 3 {:.2}",
                        m + 1,
                        split.scope1,
                        split.scope2,
                        split.scope3
                    );
                }
            }
            print_missing(&bucket);
        }
        Commands::Rollup {
            company,
            from_year,
            to_year,
            project_years,
            absorption,
            json,
        } => {
            let company = resolve_company(&pool, &company).await?;
            let to_year = to_year.unwrap_or_else(|| Utc::now().year());
            let rates = load_rates(&pool).await?;
            let buckets =
                load_year_range(&pool, &company, from_year, to_year, &rates, absorption).await?;
            let targets = db::fetch_emission_targets(&pool, company.id).await?;
            let rollup = rollup::compute_yearly_rollup(company.id, &buckets, &targets, to_year);
            let projected = rollup::project_trajectory(&rollup, &targets, project_years);

            if json {
                let payload = serde_json::json!({
                    "rollup": rollup,
                    "projected": projected,
                    "projectedNetZero": rollup::projected_net_zero(&rollup, &projected),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            println!("Yearly trajectory for {} (kg CO2e):", company.name);
            for point in rollup.points.iter().chain(projected.iter()) {
                println!(
                    "- {}{}: emitted {:.1}, absorbed {:.1}, net {:.1}, cumulative {:.1}, target {:.1} ({} months)",
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
            println!("{}.", report::describe_net_zero(&rollup.net_zero));
            if !projected.is_empty() {
                let analysis = rollup::projected_net_zero(&rollup, &projected);
                println!("Projected: {}.", report::describe_net_zero(&analysis));
            }
        }
        Commands::Alerts {
            company,
            year,
            scope1_limit,
            scope2_limit,
            scope3_limit,
            scope2,
        } => {
            let companies = match company {
                Some(name) => vec![resolve_company(&pool, &name).await?],
                None => db::fetch_companies(&pool).await?,
            };
            let thresholds = alerts::Thresholds {
                scope1: scope1_limit,
                scope2: scope2_limit,
                scope3: scope3_limit,
                basis: scope2,
            };
            let rates = load_rates(&pool).await?;

            let mut raised = 0usize;
            for company in companies.iter() {
                let bucket =
                    load_bucket(&pool, company, year, None, &rates, AbsorptionBasis::Monthly)
                        .await?;
                for alert in alerts::evaluate_bucket(&bucket, &thresholds) {
                    raised += 1;
                    println!(
                        "- {} {}: {:.2} exceeds limit {:.2} by {:.2}",
                        company.name,
                        alert.scope.label(),
                        alert.value,
                        alert.limit,
                        alert.exceeded_by
                    );
                }
            }

            if raised == 0 {
                println!("No thresholds exceeded in {year}.");
            }
        }
        Commands::Leaderboard {
            year,
            limit,
            absorption,
        } => {
            let rates = load_rates(&pool).await?;
            let mut entries = Vec::new();
            for company in db::fetch_companies(&pool).await? {
                let bucket = load_bucket(&pool, &company, year, None, &rates, absorption).await?;
                entries.push((company.name, bucket));
            }
            let ranked = leaderboard::rank_companies(entries);

            if ranked.is_empty() {
                println!("No companies found.");
                return Ok(());
            }

            println!("Net emissions leaderboard for {year}:");
            for entry in ranked.iter().take(limit) {
                println!(
                    "{}. {} net {:.1} (emitted {:.1}, absorbed {:.1})",
                    entry.rank,
                    entry.company_name,
                    entry.net_emissions,
                    entry.total_emissions,
                    entry.absorption
                );
            }
        }
        Commands::Report {
            company,
            from_year,
            to_year,
            project_years,
            absorption,
            out,
        } => {
            let company = resolve_company(&pool, &company).await?;
            let to_year = to_year.unwrap_or_else(|| Utc::now().year());
            let rates = load_rates(&pool).await?;
            let buckets =
                load_year_range(&pool, &company, from_year, to_year, &rates, absorption).await?;
            let targets = db::fetch_emission_targets(&pool, company.id).await?;
            let rollup = rollup::compute_yearly_rollup(company.id, &buckets, &targets, to_year);
            let projected = rollup::project_trajectory(&rollup, &targets, project_years);
            let projected_net_zero = (!projected.is_empty())
                .then(|| rollup::projected_net_zero(&rollup, &projected));
            let latest = buckets.last().map(|bucket| {
                (
                    bucket,
                    scopes::classify_bucket(bucket, Scope2Basis::ElectricityEmissionOnly),
                )
            });

            let report = report::build_report(
                &company.name,
                &rollup,
                &projected,
                projected_net_zero.as_ref(),
                latest,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn resolve_company(pool: &PgPool, name: &str) -> anyhow::Result<Company> {
    db::find_company(pool, name)
        .await?
        .with_context(|| format!("no company named '{name}'"))
}

/// The current rate table, or an empty one (every emission counts 0) when none is stored.
async fn load_rates(pool: &PgPool) -> anyhow::Result<EmissionRates> {
    match db::fetch_emission_rates(pool).await? {
        Some(rates) => {
            if rates.fuel_emission_factors.is_empty()
                || rates.animal_emission_factors.is_empty()
                || rates.waste_emission_factors.is_empty()
            {
                warn!("emission rate table is incomplete; missing factors count as 0");
            }
            Ok(rates)
        }
        None => {
            warn!("no emission rates found; reporting zero emissions");
            Ok(EmissionRates::default())
        }
    }
}

async fn load_bucket(
    pool: &PgPool,
    company: &Company,
    year: i32,
    month: Option<u32>,
    rates: &EmissionRates,
    absorption: AbsorptionBasis,
) -> anyhow::Result<MonthlyBucket> {
    let range = DateRange::years(year, year).context("year out of range")?;
    let records = db::fetch_all_activity(pool, company.id, range).await?;
    info!("loaded {} activity records for {}", records.len(), company.name);
    Ok(monthly::compute_monthly_bucket(
        company.id, year, month, rates, &records, absorption,
    ))
}

async fn load_year_range(
    pool: &PgPool,
    company: &Company,
    from_year: i32,
    to_year: i32,
    rates: &EmissionRates,
    absorption: AbsorptionBasis,
) -> anyhow::Result<Vec<MonthlyBucket>> {
    anyhow::ensure!(
        from_year <= to_year,
        "--from-year {from_year} is after --to-year {to_year}"
    );
    let range = DateRange::years(from_year, to_year).context("year out of range")?;
    let records = db::fetch_all_activity(pool, company.id, range).await?;
    info!(
        "loaded {} activity records for {} ({from_year}-{to_year})",
        records.len(),
        company.name
    );
    Ok(monthly::compute_year_range(
        company.id, from_year, to_year, rates, &records, absorption,
    ))
}

fn print_missing(bucket: &MonthlyBucket) {
    for miss in bucket.missing_coefficients.iter() {
        println!(
            "Warning: no {} emission factor for '{}'; counted as 0.",
            miss.category, miss.key
        );
    }
}
