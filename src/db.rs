use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Activity, ActivityRecord, Category, Company, DateRange, EmissionRates, EmissionTargets,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_company(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO farm_emissions.companies (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn find_company(pool: &PgPool, name: &str) -> anyhow::Result<Option<Company>> {
    let row = sqlx::query("SELECT id, name FROM farm_emissions.companies WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Company {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

pub async fn fetch_companies(pool: &PgPool) -> anyhow::Result<Vec<Company>> {
    let rows = sqlx::query("SELECT id, name FROM farm_emissions.companies ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Company {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

/// Current rate set (latest `effective_from`), or `None` when none has been loaded.
pub async fn fetch_emission_rates(pool: &PgPool) -> anyhow::Result<Option<EmissionRates>> {
    let Some(row) = sqlx::query(
        r#"
        SELECT id, electricity_emission_factor, nitrogen_fertilizer_factor,
               soil_emission_factor, absorption_rate_per_hectare_month,
               absorption_rate_per_hectare_year
        FROM farm_emissions.emission_rate_sets
        ORDER BY effective_from DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let rate_set_id: Uuid = row.get("id");
    let mut rates = EmissionRates {
        electricity_emission_factor: row.get("electricity_emission_factor"),
        nitrogen_fertilizer_factor: row.get("nitrogen_fertilizer_factor"),
        soil_emission_factor: row.get("soil_emission_factor"),
        absorption_rate_per_hectare_month: row.get("absorption_rate_per_hectare_month"),
        absorption_rate_per_hectare_year: row.get("absorption_rate_per_hectare_year"),
        ..Default::default()
    };

    let factors = sqlx::query(
        "SELECT kind, factor_key, factor FROM farm_emissions.emission_rate_factors WHERE rate_set_id = $1",
    )
    .bind(rate_set_id)
    .fetch_all(pool)
    .await?;

    for factor in factors {
        let kind: String = factor.get("kind");
        let key: String = factor.get("factor_key");
        let value: f64 = factor.get("factor");
        match kind.as_str() {
            "fuel" => rates.fuel_emission_factors.insert(&key, value),
            "animal" => rates.animal_emission_factors.insert(&key, value),
            "waste" => rates.waste_emission_factors.insert(&key, value),
            other => warn!("ignoring emission factor '{key}' of unknown kind '{other}'"),
        }
    }

    Ok(Some(rates.sanitized()))
}

pub async fn fetch_activity_records(
    pool: &PgPool,
    company_id: Uuid,
    category: Category,
    range: DateRange,
) -> anyhow::Result<Vec<ActivityRecord>> {
    let query = match category {
        Category::Equipment => {
            "SELECT company_id, recorded_on, fuel_type, fuel_consumed_liters, electricity_used_kwh \
             FROM farm_emissions.equipment_records"
        }
        Category::Livestock => {
            "SELECT company_id, recorded_on, species, head_count \
             FROM farm_emissions.livestock_records"
        }
        Category::Crops => {
            "SELECT company_id, recorded_on, fertilizer_used_kg, area_planted_hectares \
             FROM farm_emissions.crop_records"
        }
        Category::Waste => {
            "SELECT company_id, recorded_on, waste_type, waste_quantity_kg \
             FROM farm_emissions.waste_records"
        }
        Category::Forest => {
            "SELECT company_id, recorded_on, area_hectares FROM farm_emissions.forest_records"
        }
    };
    let query = format!(
        "{query} WHERE company_id = $1 AND recorded_on BETWEEN $2 AND $3 ORDER BY recorded_on"
    );

    let rows = sqlx::query(&query)
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to fetch {category} records"))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let activity = match category {
            Category::Equipment => Activity::Equipment {
                fuel_type: row.get("fuel_type"),
                fuel_consumed_liters: row.get("fuel_consumed_liters"),
                electricity_used_kwh: row.get("electricity_used_kwh"),
            },
            Category::Livestock => Activity::Livestock {
                species: row.get("species"),
                head_count: row.get("head_count"),
            },
            Category::Crops => Activity::Crops {
                fertilizer_used_kg: row.get("fertilizer_used_kg"),
                area_planted_hectares: row.get("area_planted_hectares"),
            },
            Category::Waste => Activity::Waste {
                waste_type: row.get("waste_type"),
                waste_quantity_kg: row.get("waste_quantity_kg"),
            },
            Category::Forest => Activity::Forest {
                area_hectares: row.get("area_hectares"),
            },
        };
        records.push(ActivityRecord {
            company_id: row.get("company_id"),
            date: row.get("recorded_on"),
            activity,
        });
    }

    Ok(records)
}

/// Every category's records for a company in the range.
pub async fn fetch_all_activity(
    pool: &PgPool,
    company_id: Uuid,
    range: DateRange,
) -> anyhow::Result<Vec<ActivityRecord>> {
    let mut records = Vec::new();
    for category in Category::ALL {
        records.extend(fetch_activity_records(pool, company_id, category, range).await?);
    }
    Ok(records)
}

pub async fn fetch_emission_targets(
    pool: &PgPool,
    company_id: Uuid,
) -> anyhow::Result<EmissionTargets> {
    let rows = sqlx::query(
        "SELECT year, reduction_target FROM farm_emissions.emission_targets WHERE company_id = $1",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let targets: BTreeMap<i32, f64> = rows
        .into_iter()
        .map(|row| (row.get("year"), row.get("reduction_target")))
        .collect();
    Ok(EmissionTargets(targets))
}

/// Inserts one activity record; returns false when `source_key` was already loaded.
pub async fn insert_activity(
    pool: &PgPool,
    company_id: Uuid,
    date: NaiveDate,
    activity: &Activity,
    source_key: &str,
) -> anyhow::Result<bool> {
    let query = match activity {
        Activity::Equipment {
            fuel_type,
            fuel_consumed_liters,
            electricity_used_kwh,
        } => sqlx::query(
            r#"
            INSERT INTO farm_emissions.equipment_records
            (id, company_id, recorded_on, source_key, fuel_type, fuel_consumed_liters, electricity_used_kwh)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(date)
        .bind(source_key)
        .bind(fuel_type)
        .bind(fuel_consumed_liters)
        .bind(electricity_used_kwh),
        Activity::Livestock {
            species,
            head_count,
        } => sqlx::query(
            r#"
            INSERT INTO farm_emissions.livestock_records
            (id, company_id, recorded_on, source_key, species, head_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(date)
        .bind(source_key)
        .bind(species)
        .bind(head_count),
        Activity::Crops {
            fertilizer_used_kg,
            area_planted_hectares,
        } => sqlx::query(
            r#"
            INSERT INTO farm_emissions.crop_records
            (id, company_id, recorded_on, source_key, fertilizer_used_kg, area_planted_hectares)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(date)
        .bind(source_key)
        .bind(fertilizer_used_kg)
        .bind(area_planted_hectares),
        Activity::Waste {
            waste_type,
            waste_quantity_kg,
        } => sqlx::query(
            r#"
            INSERT INTO farm_emissions.waste_records
            (id, company_id, recorded_on, source_key, waste_type, waste_quantity_kg)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(date)
        .bind(source_key)
        .bind(waste_type)
        .bind(waste_quantity_kg),
        Activity::Forest { area_hectares } => sqlx::query(
            r#"
            INSERT INTO farm_emissions.forest_records
            (id, company_id, recorded_on, source_key, area_hectares)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(date)
        .bind(source_key)
        .bind(area_hectares),
    };

    let result = query.execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let rate_set_id = Uuid::parse_str("6a1f0c4e-3b7d-4c59-9e2a-1d8f5b7c3e10")?;
    sqlx::query(
        r#"
        INSERT INTO farm_emissions.emission_rate_sets
        (id, effective_from, electricity_emission_factor, nitrogen_fertilizer_factor,
         soil_emission_factor, absorption_rate_per_hectare_month, absorption_rate_per_hectare_year)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(rate_set_id)
    .bind(NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid date")?)
    .bind(0.233_f64)
    .bind(5.6_f64)
    .bind(110.0_f64)
    .bind(83.0_f64)
    .bind(1000.0_f64)
    .execute(pool)
    .await?;

    let factors = [
        ("fuel", "diesel", 2.68),
        ("fuel", "gasoline", 2.31),
        ("fuel", "propane", 1.51),
        ("fuel", "natural_gas", 2.02),
        ("fuel", "biodiesel", 0.17),
        ("animal", "cattle", 2300.0 / 12.0),
        ("animal", "sheep", 180.0 / 12.0),
        ("animal", "pig", 300.0 / 12.0),
        ("animal", "chicken", 1.2 / 12.0),
        ("waste", "manure", 0.05),
        ("waste", "food_waste", 0.58),
        ("waste", "plastic", 2.1),
        ("waste", "green_waste", 0.1),
    ];
    for (kind, key, factor) in factors {
        sqlx::query(
            r#"
            INSERT INTO farm_emissions.emission_rate_factors (rate_set_id, kind, factor_key, factor)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (rate_set_id, kind, factor_key) DO UPDATE SET factor = EXCLUDED.factor
            "#,
        )
        .bind(rate_set_id)
        .bind(kind)
        .bind(key)
        .bind(factor)
        .execute(pool)
        .await?;
    }

    let farms = [
        ("Willow Creek Dairy", 120.0, 40.0, 1.0),
        ("Cedar Ridge Orchard", 0.0, 150.0, 0.6),
    ];

    for (name, herd, forest_hectares, scale) in farms {
        let company_id = upsert_company(pool, name).await?;
        let slug = name.to_lowercase().replace(' ', "-");

        for year in 2024..=2026 {
            // Each farm trims fuel use year over year.
            let trim = 1.0 - 0.08 * f64::from(year - 2024);
            for month in 1..=12u32 {
                let date = NaiveDate::from_ymd_opt(year, month, 15).context("invalid date")?;
                let mut activities = vec![Activity::Equipment {
                    fuel_type: if month % 3 == 0 { "Natural_Gas" } else { "Diesel" }.to_string(),
                    fuel_consumed_liters: 420.0 * scale * trim,
                    electricity_used_kwh: 1800.0 * scale,
                }];
                if herd > 0.0 {
                    activities.push(Activity::Livestock {
                        species: "Cattle".to_string(),
                        head_count: herd,
                    });
                }
                if matches!(month, 4 | 5) {
                    activities.push(Activity::Crops {
                        fertilizer_used_kg: 900.0 * scale,
                        area_planted_hectares: 35.0 * scale,
                    });
                }
                if month % 3 == 0 {
                    activities.push(Activity::Waste {
                        waste_type: if herd > 0.0 { "manure" } else { "green waste" }.to_string(),
                        waste_quantity_kg: 6000.0 * scale,
                    });
                }

                for activity in activities {
                    let source_key = format!(
                        "seed-{slug}-{}-{}-{:02}",
                        activity.category(),
                        date.year(),
                        month
                    );
                    insert_activity(pool, company_id, date, &activity, &source_key).await?;
                }
            }

            let stand = Activity::Forest {
                area_hectares: forest_hectares,
            };
            let planted = NaiveDate::from_ymd_opt(year, 1, 1).context("invalid date")?;
            insert_activity(
                pool,
                company_id,
                planted,
                &stand,
                &format!("seed-{slug}-forest-{year}"),
            )
            .await?;
        }

        for (year, target) in [(2025, 0.1), (2026, 0.15), (2030, 0.25)] {
            sqlx::query(
                r#"
                INSERT INTO farm_emissions.emission_targets (company_id, year, reduction_target)
                VALUES ($1, $2, $3)
                ON CONFLICT (company_id, year) DO UPDATE SET reduction_target = EXCLUDED.reduction_target
                "#,
            )
            .bind(company_id)
            .bind(year)
            .bind(target)
            .execute(pool)
            .await?;
        }
        info!("seeded {name}");
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct CsvRow {
    pub company: String,
    pub category: String,
    pub date: NaiveDate,
    pub fuel_type: Option<String>,
    pub fuel_consumed_liters: Option<f64>,
    pub electricity_used_kwh: Option<f64>,
    pub species: Option<String>,
    pub head_count: Option<f64>,
    pub fertilizer_used_kg: Option<f64>,
    pub area_planted_hectares: Option<f64>,
    pub waste_type: Option<String>,
    pub waste_quantity_kg: Option<f64>,
    pub area_hectares: Option<f64>,
    pub source_key: Option<String>,
}

impl CsvRow {
    /// Builds the activity for this row's category. Blank quantities count as
    /// zero; negative ones are kept and logged.
    pub fn to_activity(&self) -> anyhow::Result<Activity> {
        let category = Category::parse(&self.category)
            .with_context(|| format!("unknown category '{}'", self.category))?;
        let quantity = |field: &str, value: Option<f64>| {
            let value = value.unwrap_or(0.0);
            if value < 0.0 {
                warn!(
                    "{} {} record for {} has negative {field} ({value}); keeping it",
                    self.date, category, self.company
                );
            }
            value
        };
        let label = |value: &Option<String>| value.clone().unwrap_or_default();

        Ok(match category {
            Category::Equipment => Activity::Equipment {
                fuel_type: label(&self.fuel_type),
                fuel_consumed_liters: quantity("fuel_consumed_liters", self.fuel_consumed_liters),
                electricity_used_kwh: quantity("electricity_used_kwh", self.electricity_used_kwh),
            },
            Category::Livestock => Activity::Livestock {
                species: label(&self.species),
                head_count: quantity("head_count", self.head_count),
            },
            Category::Crops => Activity::Crops {
                fertilizer_used_kg: quantity("fertilizer_used_kg", self.fertilizer_used_kg),
                area_planted_hectares: quantity(
                    "area_planted_hectares",
                    self.area_planted_hectares,
                ),
            },
            Category::Waste => Activity::Waste {
                waste_type: label(&self.waste_type),
                waste_quantity_kg: quantity("waste_quantity_kg", self.waste_quantity_kg),
            },
            Category::Forest => Activity::Forest {
                area_hectares: quantity("area_hectares", self.area_hectares),
            },
        })
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row at line {line}"))?;
        let activity = row
            .to_activity()
            .with_context(|| format!("invalid row at line {line}"))?;
        let company_id = upsert_company(pool, &row.company).await?;

        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_activity(pool, company_id, row.date, &activity, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str) -> CsvRow {
        CsvRow {
            company: "Willow Creek Dairy".to_string(),
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            fuel_type: None,
            fuel_consumed_liters: None,
            electricity_used_kwh: None,
            species: None,
            head_count: None,
            fertilizer_used_kg: None,
            area_planted_hectares: None,
            waste_type: None,
            waste_quantity_kg: None,
            area_hectares: None,
            source_key: None,
        }
    }

    #[test]
    fn csv_row_maps_category_fields() {
        let mut equipment = row("Equipment");
        equipment.fuel_type = Some("diesel".to_string());
        equipment.fuel_consumed_liters = Some(25.0);

        assert_eq!(
            equipment.to_activity().unwrap(),
            Activity::Equipment {
                fuel_type: "diesel".to_string(),
                fuel_consumed_liters: 25.0,
                electricity_used_kwh: 0.0,
            }
        );
    }

    #[test]
    fn csv_row_keeps_negative_quantities() {
        let mut forest = row("forest");
        forest.area_hectares = Some(-3.0);
        assert_eq!(
            forest.to_activity().unwrap(),
            Activity::Forest {
                area_hectares: -3.0
            }
        );
    }

    #[test]
    fn csv_row_rejects_unknown_category() {
        let err = row("solar").to_activity().unwrap_err();
        assert!(err.to_string().contains("unknown category 'solar'"));
    }
}
