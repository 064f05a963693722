//! JSON Schema validation for rule set configs.
//!
//! Configs are validated against `schemas/ruleset.schema.json` before they
//! enter the registry.

use serde_json::Value;
use std::sync::OnceLock;

/// Embedded rule set schema (loaded at compile time).
const RULE_SET_SCHEMA_JSON: &str = include_str!("../../schemas/ruleset.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: Value = serde_json::from_str(RULE_SET_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a serialized rule set config against the schema.
///
/// Returns every violation, each rendered with its instance path.
pub fn validate_rule_set_schema(config: &Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(config)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
