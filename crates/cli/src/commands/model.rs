//! Service health and model metadata commands

use anyhow::Result;
use colored::Colorize;
use predictor_lib::ComponentStatus;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_warning, OutputFormat};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show service health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Status:        {}",
                color_status(&status_name(health.status))
            );
            println!(
                "Model loaded:  {}",
                if health.model_loaded {
                    "yes".green()
                } else {
                    "no".red()
                }
            );
            println!("Checked at:    {}", health.timestamp);
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&status_name(component.status)),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if !health.model_loaded {
                print_warning("Predictions will fail until the model is loaded");
            }
        }
    }

    Ok(())
}

/// Wire name of a component status (`healthy`, `degraded`, `unhealthy`)
fn status_name(status: ComponentStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Show metadata of the active model
pub async fn show_model_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let metadata = client.model_info().await?;

    match format {
        OutputFormat::Json => print_json(&metadata)?,
        OutputFormat::Table => {
            println!("{}", "Model Information".bold());
            println!("{}", "=".repeat(50));
            println!("Model type:     {}", metadata.model_type.cyan());
            println!("Trained:        {}", metadata.training_date);
            println!("Dataset size:   {}", metadata.dataset_size);
            println!();

            println!("{}", "Performance".bold());
            println!("{}", "-".repeat(50));
            println!("R²:             {:.4}", metadata.performance.r2_score);
            println!("MAE:            {:.2}", metadata.performance.mae);
            println!("RMSE:           {:.2}", metadata.performance.rmse);
            println!();

            println!("{}", "Features".bold());
            println!("{}", "-".repeat(50));
            for feature in &metadata.features {
                println!("  {}", feature);
            }
        }
    }

    Ok(())
}
