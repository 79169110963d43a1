use crate::env::SourceEnv;
use crate::error::Error;

use super::diagnostics::FunctionError;
use super::schema::{DescriptionKind, FunctionDefinition, Parameter, ValueType};
use super::value::Value;

/// A provider-defined function callable as `provider::<name>::<function>`.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> FunctionDefinition;

    fn call(&self, arguments: &[Value]) -> Result<Value, FunctionError>;
}

/// `getenv(name, required)`: value of an environment variable.
#[derive(Debug, Clone, Default)]
pub struct GetenvFunction {
    env: SourceEnv,
}

impl GetenvFunction {
    pub fn new(env: SourceEnv) -> Self {
        Self { env }
    }
}

impl Function for GetenvFunction {
    fn name(&self) -> &'static str {
        "getenv"
    }

    fn definition(&self) -> FunctionDefinition {
        FunctionDefinition {
            summary: "Retrieves the value of an environment variable.".to_owned(),
            description: "This function reads the value of the specified environment variable. \
                          If the environment variable is not set - or has an empty value - and \
                          marked as required, an error will be returned. Otherwise, it returns \
                          an empty string when the variable is unset."
                .to_owned(),
            description_kind: DescriptionKind::Markdown,
            parameters: vec![
                Parameter::new(
                    "name",
                    ValueType::String,
                    "The name of the environment variable to read",
                ),
                Parameter::new(
                    "required",
                    ValueType::Bool,
                    "Whether the environment variable is required",
                ),
            ],
            return_type: ValueType::String,
        }
    }

    fn call(&self, arguments: &[Value]) -> Result<Value, FunctionError> {
        let [name, required] = arguments else {
            return Err(FunctionError::new(format!(
                "Expected 2 arguments, got {}",
                arguments.len()
            )));
        };
        let name = name
            .as_str()
            .ok_or_else(|| FunctionError::argument(0, "Expected a known string"))?;
        let required = required
            .as_bool()
            .ok_or_else(|| FunctionError::argument(1, "Expected a known bool"))?;

        match self.env.lookup(name, required) {
            Ok(lookup) => Ok(Value::String(lookup.value)),
            Err(Error::RequiredValueMissing { .. }) => {
                tracing::debug!(name, "required environment variable not found");
                Err(FunctionError::argument(1, "Environment variable not found"))
            }
            Err(err) => Err(FunctionError::new(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn getenv(env: &[(&str, &str)], name: &str, required: bool) -> Result<Value, FunctionError> {
        let function = GetenvFunction::new(SourceEnv::from_pairs(env.iter().copied()));
        function.call(&[Value::from(name), Value::from(required)])
    }

    #[test]
    fn returns_value_when_set() {
        let env = [("TEST_GETENV_VALUE", "testvalue")];

        assert_eq!(getenv(&env, "TEST_GETENV_VALUE", false), Ok(Value::from("testvalue")));
        assert_eq!(getenv(&env, "TEST_GETENV_VALUE", true), Ok(Value::from("testvalue")));
    }

    #[test]
    fn unset_optional_variable_is_empty_string() {
        assert_eq!(getenv(&[], "TEST_GETENV_NOT_EXISTING_VALUE", false), Ok(Value::from("")));
    }

    #[test]
    fn unset_or_empty_required_variable_fails_on_second_argument() {
        let env = [("EMPTY", "")];
        for name in ["TEST_GETENV_NOT_EXISTING_VALUE", "EMPTY"] {
            let err = getenv(&env, name, true).expect_err("expected function error");
            assert_eq!(err.text, "Environment variable not found");
            assert_eq!(err.argument, Some(1));
        }
    }

    #[test]
    fn rejects_wrong_argument_shapes() {
        let function = GetenvFunction::default();

        let err = function.call(&[Value::from("X")]).expect_err("arity");
        assert_eq!(err.argument, None);

        let err = function
            .call(&[Value::Null, Value::from(false)])
            .expect_err("null name");
        assert_eq!(err.argument, Some(0));

        let err = function
            .call(&[Value::from("X"), Value::Unknown])
            .expect_err("unknown required");
        assert_eq!(err.argument, Some(1));
    }

    #[test]
    fn definition_lists_name_then_required() {
        let definition = GetenvFunction::default().definition();
        let names: Vec<_> = definition.parameters.iter().map(|p| p.name.as_str()).collect();

        assert_eq!(names, vec!["name", "required"]);
        assert_eq!(definition.return_type, ValueType::String);
    }
}
