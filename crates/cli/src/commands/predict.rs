//! Prediction commands against the running service

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{BatchEntryOutcome, PredictionResult};
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

use super::CompanyArgs;
use crate::client::ApiClient;
use crate::output::{
    format_currency, format_metric, print_error, print_json, print_success, print_warning,
    OutputFormat,
};

/// Row for batch prediction tables
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Employees")]
    employees: String,
    #[tabled(rename = "Predicted Revenue")]
    revenue: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl PredictionRow {
    fn success(index: usize, result: &PredictionResult) -> Self {
        Self {
            index: (index + 1).to_string(),
            region: result.input_data.region.to_string(),
            employees: result.input_data.num_employees.to_string(),
            revenue: format_currency(result.predicted_revenue),
            status: "success".green().to_string(),
        }
    }
}

/// Predict revenue for a single company
pub async fn predict(
    client: &ApiClient,
    company: &CompanyArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = company.to_request()?;
    let result = client.predict(&request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Revenue Prediction".bold());
            println!("{}", "=".repeat(50));
            println!("Region:             {}", result.input_data.region.to_string().cyan());
            println!("Employees:          {}", result.input_data.num_employees);
            println!("Marketing spend:    {}", format_currency(result.input_data.marketing_spend));
            println!("R&D spend:          {}", format_currency(result.input_data.rd_spend));
            println!("Admin costs:        {}", format_currency(result.input_data.admin_costs));
            println!();
            println!(
                "Predicted revenue:  {}",
                format_currency(result.predicted_revenue).green().bold()
            );
            println!(
                "Model R² / MAE:     {} / {}",
                format_metric(result.model_performance.r2_score),
                format_metric(result.model_performance.mae)
            );
        }
    }

    Ok(())
}

/// Predict revenue for every company listed in `file`
pub async fn batch(
    client: &ApiClient,
    file: &Path,
    partial: bool,
    format: OutputFormat,
) -> Result<()> {
    let companies = read_companies(file)?;

    if partial {
        let response = client.batch_predict_partial(&companies).await?;

        match format {
            OutputFormat::Json => print_json(&response)?,
            OutputFormat::Table => {
                let rows: Vec<PredictionRow> = response
                    .results
                    .iter()
                    .map(|outcome| match outcome {
                        BatchEntryOutcome::Success(result) => {
                            PredictionRow::success(result.company_index.unwrap_or_default(), result)
                        }
                        BatchEntryOutcome::Failure(failure) => PredictionRow {
                            index: (failure.company_index + 1).to_string(),
                            region: "-".to_string(),
                            employees: "-".to_string(),
                            revenue: failure.error.clone(),
                            status: "error".red().to_string(),
                        },
                    })
                    .collect();

                print_rows(rows);
                if response.failed == 0 {
                    print_success(&format!("{} companies predicted", response.succeeded));
                } else {
                    print_warning(&format!(
                        "{} of {} companies failed",
                        response.failed, response.total_companies
                    ));
                }
            }
        }
    } else {
        let response = match client.batch_predict(&companies).await {
            Ok(response) => response,
            Err(e) => {
                print_error("Batch aborted, no predictions were returned");
                print_warning("Re-run with --partial to get results for the valid companies");
                return Err(e);
            }
        };

        match format {
            OutputFormat::Json => print_json(&response)?,
            OutputFormat::Table => {
                let rows: Vec<PredictionRow> = response
                    .predictions
                    .iter()
                    .enumerate()
                    .map(|(i, result)| {
                        PredictionRow::success(result.company_index.unwrap_or(i), result)
                    })
                    .collect();

                print_rows(rows);
                let total: f64 = response
                    .predictions
                    .iter()
                    .map(|p| p.predicted_revenue)
                    .sum();
                println!(
                    "\nTotal: {} companies, {}",
                    response.total_companies,
                    format_currency(total)
                );
            }
        }
    }

    Ok(())
}

fn print_rows(rows: Vec<PredictionRow>) {
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
}

/// Read companies from a JSON file holding `{"companies": [...]}` or a bare array
pub fn read_companies(file: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {:?}", file))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse batch file {:?}", file))?;

    match document {
        Value::Array(companies) => Ok(companies),
        Value::Object(mut object) => match object.remove("companies") {
            Some(Value::Array(companies)) => Ok(companies),
            _ => anyhow::bail!("Batch file must contain a \"companies\" array"),
        },
        _ => anyhow::bail!("Batch file must contain a JSON array or object"),
    }
}
