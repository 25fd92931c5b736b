//! CLI command implementations

pub mod estimate;
pub mod history;
pub mod model;
pub mod predict;

use anyhow::Result;
use clap::Args;
use predictor_lib::{validation, PredictionRequest};
use serde_json::{json, Map, Value};

/// Inputs describing one company
#[derive(Debug, Clone, Args)]
pub struct CompanyArgs {
    /// Marketing spend in dollars
    #[arg(long)]
    pub marketing_spend: f64,

    /// Research and development spend in dollars
    #[arg(long)]
    pub rd_spend: f64,

    /// Administration costs in dollars
    #[arg(long)]
    pub admin_costs: f64,

    /// Number of employees
    #[arg(long)]
    pub employees: u64,

    /// Region (North America, Europe, Asia)
    #[arg(long)]
    pub region: String,
}

impl CompanyArgs {
    /// Validate the arguments with the same rules the service applies
    pub fn to_request(&self) -> Result<PredictionRequest> {
        let mut payload = Map::new();
        payload.insert(validation::MARKETING_SPEND.into(), json!(self.marketing_spend));
        payload.insert(validation::RD_SPEND.into(), json!(self.rd_spend));
        payload.insert(validation::ADMIN_COSTS.into(), json!(self.admin_costs));
        payload.insert(validation::NUM_EMPLOYEES.into(), json!(self.employees));
        payload.insert(validation::REGION.into(), json!(self.region));

        Ok(validation::validate(&Value::Object(payload))?)
    }
}
