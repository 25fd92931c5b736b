//! Saved prediction history commands

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use predictor_lib::{NewSavedPrediction, PredictionResult, SavedPrediction};
use tabled::Tabled;

use super::CompanyArgs;
use crate::client::ApiClient;
use crate::output::{format_currency, print_info, print_json, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved predictions, newest first
    List,

    /// Predict revenue for a company and save the result
    Save {
        /// Name to file the prediction under
        #[arg(long)]
        company_name: String,

        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,

        #[command(flatten)]
        company: CompanyArgs,
    },

    /// Delete a saved prediction
    Delete {
        /// Identifier shown by `history list`
        id: String,
    },
}

#[derive(Tabled)]
struct SavedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Predicted Revenue")]
    revenue: String,
    #[tabled(rename = "Saved")]
    saved_at: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl From<&SavedPrediction> for SavedRow {
    fn from(p: &SavedPrediction) -> Self {
        Self {
            id: p.id.clone(),
            company: p.company_name.clone(),
            region: p.input_data.region.to_string(),
            revenue: format_currency(p.predicted_revenue),
            saved_at: p.created_at.format("%Y-%m-%d %H:%M").to_string(),
            notes: p.notes.clone(),
        }
    }
}

/// Save request for a prediction the service just returned
pub fn to_saved(result: PredictionResult, company_name: &str, notes: &str) -> NewSavedPrediction {
    NewSavedPrediction {
        company_name: company_name.to_string(),
        input_data: result.input_data,
        predicted_revenue: result.predicted_revenue,
        model_performance: result.model_performance,
        notes: notes.to_string(),
    }
}

pub async fn run(client: &ApiClient, command: HistoryCommands, format: OutputFormat) -> Result<()> {
    match command {
        HistoryCommands::List => list(client, format).await,
        HistoryCommands::Save {
            company_name,
            notes,
            company,
        } => save(client, &company_name, &notes, &company, format).await,
        HistoryCommands::Delete { id } => {
            let response = client.delete_saved_prediction(&id).await?;
            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Table => print_success(&response.message),
            }
            Ok(())
        }
    }
}

async fn list(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response = client.saved_predictions().await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            if response.predictions.is_empty() {
                print_info("No saved predictions");
                return Ok(());
            }

            let rows: Vec<SavedRow> = response.predictions.iter().map(SavedRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\n{} saved predictions", response.total);
        }
    }

    Ok(())
}

async fn save(
    client: &ApiClient,
    company_name: &str,
    notes: &str,
    company: &CompanyArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = company.to_request()?;
    let result = client.predict(&request).await?;
    let response = client
        .save_prediction(&to_saved(result, company_name, notes))
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let saved = &response.prediction;
            print_success(&format!(
                "Saved prediction {} for {}: {}",
                saved.id,
                saved.company_name.bold(),
                format_currency(saved.predicted_revenue).green()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predictor_lib::{ModelPerformance, PredictionRequest, Region, ResponseStatus};

    #[test]
    fn test_to_saved_carries_the_prediction() {
        let result = PredictionResult {
            company_index: None,
            predicted_revenue: 292_750.0,
            input_data: PredictionRequest {
                marketing_spend: 150_000.0,
                rd_spend: 120_000.0,
                admin_costs: 50_000.0,
                num_employees: 300,
                region: Region::NorthAmerica,
            },
            model_performance: ModelPerformance {
                r2_score: Some(0.9234),
                mae: Some(8542.33),
            },
            timestamp: "2024-05-01T12:00:00.000000".to_string(),
            status: ResponseStatus::Success,
        };

        let saved = to_saved(result, "Tech Startup", "Q1 forecast");
        assert_eq!(saved.company_name, "Tech Startup");
        assert_eq!(saved.notes, "Q1 forecast");
        assert_eq!(saved.predicted_revenue, 292_750.0);
        assert_eq!(saved.input_data.num_employees, 300);

        let body = serde_json::to_value(&saved).unwrap();
        assert_eq!(body["companyName"], "Tech Startup");
        assert_eq!(body["model_performance"]["r2_score"], 0.9234);
    }
}
