//! Tool domain traits
//!
//! Contains pure domain logic for validating tool input against a
//! [`ToolDescriptor`]. The async `Tool` port lives in the application layer.

use super::entities::{ToolDescriptor, ToolInput, ToolParameters};

/// Validator for tool input
///
/// This is a pure domain trait that checks an operation and its
/// parameters against the tool's catalog entry without any I/O.
pub trait InputValidator {
    /// Validate input against its descriptor
    fn validate(&self, input: &ToolInput, descriptor: &ToolDescriptor) -> Result<(), String>;
}

/// Default implementation of InputValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultInputValidator;

impl InputValidator for DefaultInputValidator {
    fn validate(&self, input: &ToolInput, descriptor: &ToolDescriptor) -> Result<(), String> {
        let Some(operation) = descriptor.operation(&input.operation) else {
            return Err(format!(
                "Unknown operation '{}' for tool '{}'",
                input.operation, descriptor.name
            ));
        };

        // Check that all required parameters are present
        for param in &operation.parameters {
            if param.required && !input.parameters.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for '{}.{}'",
                    param.name, descriptor.name, operation.name
                ));
            }
        }

        // Check that all provided arguments are valid parameters
        for arg_name in input.parameters.keys() {
            if operation.parameter(arg_name).is_none() {
                return Err(format!(
                    "Unknown parameter '{}' for '{}.{}'",
                    arg_name, descriptor.name, operation.name
                ));
            }
        }

        Ok(())
    }
}

/// Build a [`ToolInput`] and validate it in one go.
///
/// This is the usual body of `Tool::build_input` for tools whose
/// descriptor fully describes their parameters.
pub fn build_validated_input(
    descriptor: &ToolDescriptor,
    operation: &str,
    parameters: &ToolParameters,
) -> Result<ToolInput, String> {
    let input = ToolInput::new(operation, parameters.clone());
    DefaultInputValidator.validate(&input, descriptor)?;
    Ok(input)
}
