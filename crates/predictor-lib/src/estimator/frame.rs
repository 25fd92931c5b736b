//! Single-row feature frame passed to estimators

use crate::models::{PredictionRequest, Region};

/// Canonical column names of the feature frame
pub const COLUMNS: [&str; 5] = [
    "Marketing_Spend",
    "R&D_Spend",
    "Administration_Costs",
    "Number_of_Employees",
    "Region",
];

/// Number of model inputs once the region is one-hot encoded
pub const NUM_ENCODED_FEATURES: usize = 6;

/// Names of the encoded model inputs; Asia is the reference category
pub const ENCODED_FEATURES: [&str; NUM_ENCODED_FEATURES] = [
    "Marketing_Spend",
    "R&D_Spend",
    "Administration_Costs",
    "Number_of_Employees",
    "Region_Europe",
    "Region_North America",
];

/// One company's inputs under the canonical column names
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub marketing_spend: f64,
    pub rd_spend: f64,
    pub administration_costs: f64,
    pub number_of_employees: u64,
    pub region: Region,
}

impl FeatureFrame {
    /// Column-name/value pairs in canonical order
    pub fn columns(&self) -> [(&'static str, String); 5] {
        [
            (COLUMNS[0], self.marketing_spend.to_string()),
            (COLUMNS[1], self.rd_spend.to_string()),
            (COLUMNS[2], self.administration_costs.to_string()),
            (COLUMNS[3], self.number_of_employees.to_string()),
            (COLUMNS[4], self.region.to_string()),
        ]
    }

    /// Numeric row with the region one-hot encoded
    pub fn encoded(&self) -> [f32; NUM_ENCODED_FEATURES] {
        let (europe, north_america) = match self.region {
            Region::Europe => (1.0, 0.0),
            Region::NorthAmerica => (0.0, 1.0),
            Region::Asia => (0.0, 0.0),
        };
        [
            self.marketing_spend as f32,
            self.rd_spend as f32,
            self.administration_costs as f32,
            self.number_of_employees as f32,
            europe,
            north_america,
        ]
    }
}

impl From<&PredictionRequest> for FeatureFrame {
    fn from(request: &PredictionRequest) -> Self {
        Self {
            marketing_spend: request.marketing_spend,
            rd_spend: request.rd_spend,
            administration_costs: request.admin_costs,
            number_of_employees: request.num_employees,
            region: request.region,
        }
    }
}
