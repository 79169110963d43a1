/// Terraform type of an attribute, parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    Bool,
    Map(Box<ValueType>),
}

impl ValueType {
    pub fn map_of(element: ValueType) -> Self {
        Self::Map(Box::new(element))
    }

    /// The JSON type constraint the protocol expects, e.g. `["map","string"]`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String => serde_json::Value::from("string"),
            Self::Bool => serde_json::Value::from("bool"),
            Self::Map(element) => serde_json::json!(["map", element.to_json()]),
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptionKind {
    #[default]
    Plain,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ty: ValueType,
    pub description: String,
    pub description_kind: DescriptionKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
}

impl Attribute {
    fn new(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            description: String::new(),
            description_kind: DescriptionKind::Plain,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
        }
    }

    /// Set by the user, filled in by the provider otherwise.
    pub fn optional_computed(name: &str, ty: ValueType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(name, ty)
        }
    }

    pub fn computed(name: &str, ty: ValueType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, ty)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn markdown(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self.description_kind = DescriptionKind::Markdown;
        self
    }
}

/// Schema of the provider block or of a data source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub description_kind: DescriptionKind,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: &str, kind: DescriptionKind) -> Self {
        self.description = description.to_owned();
        self.description_kind = kind;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: ValueType,
    pub description: String,
    pub description_kind: DescriptionKind,
}

impl Parameter {
    pub fn new(name: &str, ty: ValueType, markdown: &str) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            description: markdown.to_owned(),
            description_kind: DescriptionKind::Markdown,
        }
    }
}

/// Signature and documentation of a provider function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub summary: String,
    pub description: String,
    pub description_kind: DescriptionKind,
    pub parameters: Vec<Parameter>,
    pub return_type: ValueType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_type_constraints() {
        assert_eq!(ValueType::String.to_json_bytes(), br#""string""#);
        assert_eq!(ValueType::Bool.to_json_bytes(), br#""bool""#);
        assert_eq!(
            ValueType::map_of(ValueType::String).to_json_bytes(),
            br#"["map","string"]"#
        );
    }
}
