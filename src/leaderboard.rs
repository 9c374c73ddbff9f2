use serde::Serialize;
use uuid::Uuid;

use crate::models::{MonthlyBucket, ScopeTotals};
use crate::scopes::{classify_bucket, Scope2Basis};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub company_id: Uuid,
    pub company_name: String,
    pub total_emissions: f64,
    pub absorption: f64,
    pub net_emissions: f64,
    pub scopes: ScopeTotals,
}

/// Ranks companies by yearly net emissions, lowest first. Ties keep input order.
pub fn rank_companies(companies: Vec<(String, MonthlyBucket)>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = companies
        .into_iter()
        .map(|(company_name, bucket)| LeaderboardEntry {
            rank: 0,
            company_id: bucket.company_id,
            company_name,
            total_emissions: bucket.yearly_emissions(),
            absorption: bucket.yearly_absorption(),
            net_emissions: bucket.yearly_net(),
            scopes: classify_bucket(&bucket, Scope2Basis::ElectricityEmissionOnly),
        })
        .collect();

    entries.sort_by(|a, b| {
        a.net_emissions
            .partial_cmp(&b.net_emissions)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }
    entries
}
