//! Parameter validation against per-command JSON schemas.
//!
//! Each command descriptor pairs its adapter with a schema; the bridge checks
//! inbound parameters before anything is queued on the host executor, so
//! malformed calls fail fast without consuming host time.

use serde_json::Value;

use crate::error::DispatchError;

/// Compiled parameter validator for one command.
pub struct ParameterSchema {
    validator: jsonschema::Validator,
}

impl ParameterSchema {
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|err| SchemaError(err.to_string()))?;
        Ok(Self { validator })
    }

    /// Check `parameters`, collecting every violation into one message.
    pub fn check(&self, parameters: &Value) -> Result<(), DispatchError> {
        if self.validator.validate(parameters).is_ok() {
            return Ok(());
        }

        let detail: Vec<String> = self
            .validator
            .iter_errors(parameters)
            .map(|err| {
                let path = err.instance_path().to_string();
                if path.is_empty() {
                    err.to_string()
                } else {
                    format!("{path}: {err}")
                }
            })
            .collect();
        Err(DispatchError::InvalidParameters(detail.join("; ")))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid parameter schema: {0}")]
pub struct SchemaError(String);
