//! Request validation
//!
//! Turns a raw JSON payload into a [`PredictionRequest`], reporting the first
//! problem found. Checks run in a fixed order: presence of every field,
//! region, then each numeric field in canonical order.

use crate::error::ValidationError;
use crate::models::{PredictionRequest, Region};
use serde_json::{Map, Value};

pub const MARKETING_SPEND: &str = "marketing_spend";
pub const RD_SPEND: &str = "rd_spend";
pub const ADMIN_COSTS: &str = "admin_costs";
pub const NUM_EMPLOYEES: &str = "num_employees";
pub const REGION: &str = "region";

/// Required fields in canonical order
pub const REQUIRED_FIELDS: [&str; 5] =
    [MARKETING_SPEND, RD_SPEND, ADMIN_COSTS, NUM_EMPLOYEES, REGION];

/// Employee counts at or above this value do not fit a `u64`
const EMPLOYEE_LIMIT: f64 = u64::MAX as f64;

/// Validate a single company payload
pub fn validate(payload: &Value) -> Result<PredictionRequest, ValidationError> {
    let fields = payload.as_object().ok_or(ValidationError::NotAnObject)?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
        return Err(ValidationError::MissingField(*missing));
    }

    let region = fields[REGION]
        .as_str()
        .and_then(|s| s.parse::<Region>().ok())
        .ok_or(ValidationError::InvalidRegion)?;

    let marketing_spend = non_negative(fields, MARKETING_SPEND)?;
    let rd_spend = non_negative(fields, RD_SPEND)?;
    let admin_costs = non_negative(fields, ADMIN_COSTS)?;
    let employees = non_negative(fields, NUM_EMPLOYEES)?;
    if employees >= EMPLOYEE_LIMIT {
        return Err(ValidationError::InvalidNumber(NUM_EMPLOYEES));
    }

    Ok(PredictionRequest {
        marketing_spend,
        rd_spend,
        admin_costs,
        // Finite, non-negative and below the limit, so the cast truncates exactly
        num_employees: employees.trunc() as u64,
        region,
    })
}

/// Extract the `companies` list of a batch body
pub fn companies(body: &Value) -> Result<&[Value], ValidationError> {
    match body.get("companies").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => Ok(list.as_slice()),
        _ => Err(ValidationError::NoCompanies),
    }
}

fn non_negative(fields: &Map<String, Value>, name: &'static str) -> Result<f64, ValidationError> {
    let value = coerce_number(&fields[name]).ok_or(ValidationError::InvalidNumber(name))?;
    if value < 0.0 {
        return Err(ValidationError::Negative(name));
    }
    Ok(value)
}

/// Coerce a JSON number or numeric string into a finite `f64`
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "marketing_spend": 150000,
            "rd_spend": 120000,
            "admin_costs": 50000,
            "num_employees": 300,
            "region": "North America"
        })
    }

    #[test]
    fn test_valid_payload() {
        let request = validate(&valid_payload()).unwrap();
        assert_eq!(request.marketing_spend, 150000.0);
        assert_eq!(request.num_employees, 300);
        assert_eq!(request.region, Region::NorthAmerica);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for field in REQUIRED_FIELDS {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);
            assert_eq!(validate(&payload), Err(ValidationError::MissingField(field)));
        }
    }

    #[test]
    fn test_first_missing_field_in_canonical_order_wins() {
        let payload = json!({ "marketing_spend": 1, "region": "Asia" });
        assert_eq!(
            validate(&payload),
            Err(ValidationError::MissingField(RD_SPEND))
        );

        let payload = json!({});
        assert_eq!(
            validate(&payload),
            Err(ValidationError::MissingField(MARKETING_SPEND))
        );
    }

    #[test]
    fn test_invalid_region_lists_valid_values() {
        for region in [json!("Africa"), json!("europe"), json!(3), Value::Null] {
            let mut payload = valid_payload();
            payload[REGION] = region;
            let err = validate(&payload).unwrap_err();
            assert_eq!(err, ValidationError::InvalidRegion);
            let message = err.to_string();
            assert!(message.contains("North America"));
            assert!(message.contains("Europe"));
            assert!(message.contains("Asia"));
        }
    }

    #[test]
    fn test_region_checked_before_numbers() {
        let mut payload = valid_payload();
        payload[REGION] = json!("Mars");
        payload[MARKETING_SPEND] = json!(-5);
        assert_eq!(validate(&payload), Err(ValidationError::InvalidRegion));
    }

    #[test]
    fn test_negative_values_are_rejected_per_field() {
        for field in [MARKETING_SPEND, RD_SPEND, ADMIN_COSTS, NUM_EMPLOYEES] {
            let mut payload = valid_payload();
            payload[field] = json!(-1);
            assert_eq!(validate(&payload), Err(ValidationError::Negative(field)));
        }
    }

    #[test]
    fn test_non_numeric_values_are_rejected_per_field() {
        for field in [MARKETING_SPEND, RD_SPEND, ADMIN_COSTS, NUM_EMPLOYEES] {
            for bad in [json!("lots"), Value::Null, json!(true), json!([1]), json!("NaN")] {
                let mut payload = valid_payload();
                payload[field] = bad;
                assert_eq!(
                    validate(&payload),
                    Err(ValidationError::InvalidNumber(field))
                );
            }
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut payload = valid_payload();
        payload[MARKETING_SPEND] = json!(" 2500.5 ");
        payload[NUM_EMPLOYEES] = json!("42");
        let request = validate(&payload).unwrap();
        assert_eq!(request.marketing_spend, 2500.5);
        assert_eq!(request.num_employees, 42);
    }

    #[test]
    fn test_employee_count_truncates() {
        let mut payload = valid_payload();
        payload[NUM_EMPLOYEES] = json!(12.9);
        assert_eq!(validate(&payload).unwrap().num_employees, 12);

        payload[NUM_EMPLOYEES] = json!(0.4);
        assert_eq!(validate(&payload).unwrap().num_employees, 0);
    }

    #[test]
    fn test_employee_count_beyond_u64_is_rejected() {
        let mut payload = valid_payload();
        payload[NUM_EMPLOYEES] = json!(1e30);
        assert_eq!(
            validate(&payload),
            Err(ValidationError::InvalidNumber(NUM_EMPLOYEES))
        );

        payload[NUM_EMPLOYEES] = json!(18446744073709551616.0);
        assert_eq!(
            validate(&payload),
            Err(ValidationError::InvalidNumber(NUM_EMPLOYEES))
        );

        // Largest f64 below 2^64
        payload[NUM_EMPLOYEES] = json!(18446744073709549568.0);
        assert_eq!(
            validate(&payload).unwrap().num_employees,
            18_446_744_073_709_549_568
        );
    }

    #[test]
    fn test_non_object_payload() {
        assert_eq!(validate(&json!([1, 2])), Err(ValidationError::NotAnObject));
        assert_eq!(validate(&json!("x")), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn test_companies_extraction() {
        assert_eq!(
            companies(&json!({})).unwrap_err(),
            ValidationError::NoCompanies
        );
        assert_eq!(
            companies(&json!({ "companies": [] })).unwrap_err(),
            ValidationError::NoCompanies
        );
        assert_eq!(
            companies(&json!({ "companies": "nope" })).unwrap_err(),
            ValidationError::NoCompanies
        );
        assert_eq!(
            companies(&json!({ "companies": [{}, {}] })).unwrap().len(),
            2
        );
    }
}
