//! Mapping between the provider model and the generated protocol types.

use crate::provider::diagnostics::{Diagnostic, Diagnostics, FunctionError, Severity};
use crate::provider::schema::{Attribute, DescriptionKind, FunctionDefinition, Parameter, Schema};
use crate::provider::value::{Value, ValueError};

use super::proto::tfplugin6 as pb;

/// Decode a request value. An absent or empty envelope is null.
pub(crate) fn decode_value(value: Option<&pb::DynamicValue>) -> Result<Value, ValueError> {
    match value {
        Some(value) if !value.msgpack.is_empty() => Value::from_msgpack(&value.msgpack),
        Some(value) if !value.json.is_empty() => Value::from_json(&value.json),
        _ => Ok(Value::Null),
    }
}

pub(crate) fn encode_value(value: &Value) -> Result<pb::DynamicValue, ValueError> {
    Ok(pb::DynamicValue {
        msgpack: value.to_msgpack()?,
        json: Vec::new(),
    })
}

pub(crate) fn diagnostics(diagnostics: Diagnostics) -> Vec<pb::Diagnostic> {
    diagnostics.into_iter().map(diagnostic).collect()
}

pub(crate) fn diagnostic(diagnostic: Diagnostic) -> pb::Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => pb::diagnostic::Severity::Error,
        Severity::Warning => pb::diagnostic::Severity::Warning,
    };
    pb::Diagnostic {
        severity: severity as i32,
        summary: diagnostic.summary,
        detail: diagnostic.detail,
        attribute: diagnostic.attribute.map(attribute_path),
    }
}

/// Error diagnostic for a request value that could not be decoded.
pub(crate) fn invalid_value(what: &str, err: &ValueError) -> pb::Diagnostic {
    diagnostic(Diagnostic {
        severity: Severity::Error,
        summary: "Invalid Request Value".to_owned(),
        detail: format!("Failed to decode {what}: {err}"),
        attribute: None,
    })
}

fn attribute_path(name: String) -> pb::AttributePath {
    pb::AttributePath {
        steps: vec![pb::attribute_path::Step {
            selector: Some(pb::attribute_path::step::Selector::AttributeName(name)),
        }],
    }
}

pub(crate) fn function_error(err: FunctionError) -> pb::FunctionError {
    pb::FunctionError {
        text: err.text,
        function_argument: err.argument.map(|index| index as i64),
    }
}

fn string_kind(kind: DescriptionKind) -> i32 {
    match kind {
        DescriptionKind::Plain => pb::StringKind::Plain as i32,
        DescriptionKind::Markdown => pb::StringKind::Markdown as i32,
    }
}

pub(crate) fn schema(schema: &Schema) -> pb::Schema {
    pb::Schema {
        version: schema.version,
        block: Some(pb::schema::Block {
            version: schema.version,
            attributes: schema.attributes.iter().map(attribute).collect(),
            description: schema.description.clone(),
            description_kind: string_kind(schema.description_kind),
            deprecated: false,
        }),
    }
}

fn attribute(attribute: &Attribute) -> pb::schema::Attribute {
    pb::schema::Attribute {
        name: attribute.name.clone(),
        r#type: attribute.ty.to_json_bytes(),
        description: attribute.description.clone(),
        required: attribute.required,
        optional: attribute.optional,
        computed: attribute.computed,
        sensitive: attribute.sensitive,
        description_kind: string_kind(attribute.description_kind),
        deprecated: false,
    }
}

pub(crate) fn function(definition: &FunctionDefinition) -> pb::Function {
    pb::Function {
        parameters: definition.parameters.iter().map(parameter).collect(),
        variadic_parameter: None,
        r#return: Some(pb::function::Return {
            r#type: definition.return_type.to_json_bytes(),
        }),
        summary: definition.summary.clone(),
        description: definition.description.clone(),
        description_kind: string_kind(definition.description_kind),
        deprecation_message: String::new(),
    }
}

fn parameter(parameter: &Parameter) -> pb::function::Parameter {
    pb::function::Parameter {
        name: parameter.name.clone(),
        r#type: parameter.ty.to_json_bytes(),
        allow_null_value: false,
        allow_unknown_values: false,
        description: parameter.description.clone(),
        description_kind: string_kind(parameter.description_kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_diagnostics_carry_a_root_path() {
        let mut diags = Diagnostics::default();
        diags.attribute_error("path", "File Not Found", "File \".env\" not found");

        let converted = diagnostics(diags);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].severity, pb::diagnostic::Severity::Error as i32);
        let steps = &converted[0].attribute.as_ref().expect("attribute path").steps;
        assert_eq!(
            steps[0].selector,
            Some(pb::attribute_path::step::Selector::AttributeName("path".to_owned()))
        );
    }

    #[test]
    fn empty_envelope_decodes_to_null() {
        let empty = pb::DynamicValue::default();
        assert_eq!(decode_value(Some(&empty)).expect("decode"), Value::Null);
        assert_eq!(decode_value(None).expect("decode"), Value::Null);
    }

    #[test]
    fn function_errors_keep_argument_index() {
        let converted = function_error(FunctionError::argument(1, "Environment variable not found"));
        assert_eq!(converted.function_argument, Some(1));
        assert_eq!(converted.text, "Environment variable not found");
    }
}
