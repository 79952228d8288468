//! Inbound prediction requests and the outbound inference payload.
//!
//! The inbound contract is the flat `{"fields": [...], "values": [...]}`
//! shape. The inference endpoint expects one level more nesting:
//! `{"input_data": [{"fields": [...], "values": [[...]]}]}`.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{BrokerError, Result};

/// A validated single-row prediction request.
///
/// Invariants: at least one field, as many values as fields, every value a
/// finite JSON number.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    fields: Vec<String>,
    values: Vec<Number>,
}

impl PredictionRequest {
    pub fn new(fields: Vec<String>, values: Vec<Number>) -> Result<Self> {
        if fields.is_empty() {
            return Err(BrokerError::Validation("at least one field is required".to_string()));
        }
        if fields.len() != values.len() {
            return Err(BrokerError::Validation(format!(
                "expected {} values for {} fields, got {}",
                fields.len(),
                fields.len(),
                values.len()
            )));
        }
        if let Some(idx) = values
            .iter()
            .position(|v| !v.as_f64().is_some_and(f64::is_finite))
        {
            return Err(BrokerError::Validation(format!(
                "values[{idx}] is not a finite number"
            )));
        }
        Ok(Self { fields, values })
    }

    /// Decode and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BrokerError::Validation(format!("body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(BrokerError::Validation("body must be a JSON object".to_string()));
        };

        let fields = match object.remove("fields") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(s) if !s.is_empty() => Ok(s),
                    _ => Err(BrokerError::Validation(format!(
                        "fields[{idx}] must be a non-empty string"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(BrokerError::Validation("fields must be an array".to_string())),
            None => return Err(BrokerError::Validation("fields is required".to_string())),
        };

        // Empty strings, nulls and anything else non-numeric are rejected here.
        let values = match object.remove("values") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Number(n) => Ok(n),
                    _ => Err(BrokerError::Validation(format!(
                        "values[{idx}] is not a number"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(BrokerError::Validation("values must be an array".to_string())),
            None => return Err(BrokerError::Validation("values is required".to_string())),
        };

        Self::new(fields, values)
    }

    /// Build a request of all-zero values for the given schema.
    pub fn zeroed<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        Self::new(
            fields.iter().map(|f| f.as_ref().to_string()).collect(),
            vec![Number::from(0); fields.len()],
        )
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Number] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_payload(&self) -> InferencePayload<'_> {
        InferencePayload {
            input_data: [InputData {
                fields: &self.fields,
                values: [&self.values],
            }],
        }
    }
}

/// Body sent to the inference endpoint.
#[derive(Debug, Serialize)]
pub struct InferencePayload<'a> {
    input_data: [InputData<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InputData<'a> {
    fields: &'a [String],
    values: [&'a [Number]; 1],
}
