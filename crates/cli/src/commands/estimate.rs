//! Offline closed-form estimate, no server required

use anyhow::Result;
use colored::Colorize;
use predictor_lib::estimator::{
    Coefficients, Contribution, Estimator, FeatureFrame, GaussianNoise, LinearEstimator,
};
use predictor_lib::PredictionRequest;
use serde::Serialize;
use tabled::Tabled;

use super::CompanyArgs;
use crate::output::{format_currency, print_info, print_json, OutputFormat};

/// Noise settings for an offline estimate
#[derive(Debug, Clone, Copy)]
pub struct NoiseOptions {
    pub std_dev: f64,
    pub seed: Option<u64>,
    pub disabled: bool,
}

/// Full result of an offline estimate
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    pub input_data: PredictionRequest,
    pub breakdown: Vec<Contribution>,
    pub expected_revenue: f64,
    /// Difference between the reported and expected revenue
    pub noise: f64,
    pub predicted_revenue: f64,
}

/// Row for the contribution table
#[derive(Tabled)]
struct ContributionRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Contribution")]
    value: String,
}

/// Compute the closed-form estimate and its breakdown
pub fn compute(company: &CompanyArgs, noise: NoiseOptions) -> Result<EstimateReport> {
    let request = company.to_request()?;
    let frame = FeatureFrame::from(&request);

    let noise_source = if noise.disabled {
        None
    } else {
        Some(GaussianNoise::new(noise.std_dev, noise.seed)?)
    };
    let estimator = LinearEstimator::new(Coefficients::default(), noise_source);

    let breakdown = estimator.breakdown(&frame);
    let expected_revenue = estimator.expected(&frame);
    let predicted_revenue = estimator.estimate(&frame)?;

    Ok(EstimateReport {
        input_data: request,
        breakdown,
        expected_revenue,
        noise: predicted_revenue - expected_revenue,
        predicted_revenue,
    })
}

/// Print a closed-form estimate with its contribution breakdown
pub fn estimate(company: &CompanyArgs, noise: NoiseOptions, format: OutputFormat) -> Result<()> {
    let report = compute(company, noise)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            let mut rows: Vec<ContributionRow> = report
                .breakdown
                .iter()
                .map(|c| ContributionRow {
                    component: c.component.clone(),
                    value: format_currency(c.value),
                })
                .collect();
            rows.push(ContributionRow {
                component: "Noise".to_string(),
                value: format_currency(report.noise),
            });

            println!("{}", "Closed-form Revenue Estimate".bold());
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!(
                "\nEstimated revenue: {}",
                format_currency(report.predicted_revenue).green().bold()
            );

            if noise.disabled {
                print_info("Noise disabled, result is the expected value");
            } else if noise.seed.is_none() {
                print_info("Use --seed to make the noise reproducible");
            }
        }
    }

    Ok(())
}
