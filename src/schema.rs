//! Schema intermediate representation and the named-schema registry.
//!
//! Raw [`SchemaObject`]s from the document are lowered into a closed [`SchemaKind`] variant
//! set once, so that every later stage can match exhaustively. References stay references:
//! a [`SchemaKind::Ref`] only carries the target name and is resolved through the
//! [`SchemaRegistry`].

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::document::{AdditionalProperties, OpenApiDocument, SchemaObject, SchemaType};
use crate::error::{Error, Result};

const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// One schema description node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    /// Trailing `null` allowance, orthogonal to the kind
    pub nullable: bool,
}

/// The closed set of schema shapes
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Reference to a named schema in the registry
    Ref(String),
    Object {
        properties: IndexMap<String, SchemaNode>,
        required: IndexSet<String>,
        additional: Additional,
    },
    Array(Box<SchemaNode>),
    Enum(Vec<EnumLiteral>),
    AllOf(Vec<SchemaNode>),
    OneOf(Vec<SchemaNode>),
    AnyOf(Vec<SchemaNode>),
    Primitive {
        kind: PrimitiveKind,
        format: Option<String>,
    },
    /// No recognized shape; rendered as an untyped placeholder
    Any,
}

/// Residual-properties rule of an object schema
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    /// No extra properties allowed
    Closed,
    /// Extra properties of any type
    Open,
    /// Extra properties matching a schema
    Typed(Box<SchemaNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
}

/// One literal value of an `enum`
#[derive(Debug, Clone, PartialEq)]
pub enum EnumLiteral {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref(name.into()))
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(SchemaKind::Primitive { kind, format: None })
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    /// Lower a raw schema object.
    ///
    /// `location` names where the schema appears and is only used in error messages.
    pub fn lower(raw: &SchemaObject, location: &str) -> Result<Self> {
        let (type_names, null_in_type) = type_names(raw);
        let nullable = raw.nullable || null_in_type;

        let kind = if let Some(reference) = &raw.reference {
            SchemaKind::Ref(parse_reference(reference, location)?)
        } else if let Some(members) = &raw.all_of {
            SchemaKind::AllOf(lower_members(members, location, "allOf")?)
        } else if let Some(members) = &raw.one_of {
            SchemaKind::OneOf(lower_members(members, location, "oneOf")?)
        } else if let Some(members) = &raw.any_of {
            SchemaKind::AnyOf(lower_members(members, location, "anyOf")?)
        } else if let Some(values) = &raw.enum_values {
            SchemaKind::Enum(values.iter().map(EnumLiteral::from_value).collect())
        } else if type_names.len() > 1 {
            // `type: [string, integer]` is a union of the listed primitives
            let members = type_names
                .iter()
                .map(|name| {
                    let single = SchemaObject {
                        schema_type: Some(SchemaType::Single(name.clone())),
                        nullable: false,
                        ..raw.clone()
                    };
                    SchemaNode::lower(&single, location)
                })
                .collect::<Result<Vec<_>>>()?;
            SchemaKind::OneOf(members)
        } else {
            match type_names.first().map(String::as_str) {
                Some("object") => lower_object(raw, location)?,
                None if raw.properties.is_some() || raw.additional_properties.is_some() => {
                    lower_object(raw, location)?
                }
                Some("array") => {
                    let item = match &raw.items {
                        Some(items) => SchemaNode::lower(items, &format!("{}/items", location))?,
                        None => SchemaNode::any(),
                    };
                    SchemaKind::Array(Box::new(item))
                }
                Some("string") => primitive(PrimitiveKind::String, raw),
                Some("number") => primitive(PrimitiveKind::Number, raw),
                Some("integer") => primitive(PrimitiveKind::Integer, raw),
                Some("boolean") => primitive(PrimitiveKind::Boolean, raw),
                other => {
                    debug!(
                        "Schema at {} has no recognized shape ({:?}), using untyped placeholder",
                        location, other
                    );
                    SchemaKind::Any
                }
            }
        };

        Ok(SchemaNode { kind, nullable })
    }

    /// Every registry name referenced anywhere in this node, in first-seen order
    pub fn referenced_names(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut IndexSet<String>) {
        match &self.kind {
            SchemaKind::Ref(name) => {
                names.insert(name.clone());
            }
            SchemaKind::Object {
                properties,
                additional,
                ..
            } => {
                for property in properties.values() {
                    property.collect_references(names);
                }
                if let Additional::Typed(schema) = additional {
                    schema.collect_references(names);
                }
            }
            SchemaKind::Array(item) => item.collect_references(names),
            SchemaKind::AllOf(members) | SchemaKind::OneOf(members) | SchemaKind::AnyOf(members) => {
                for member in members {
                    member.collect_references(names);
                }
            }
            SchemaKind::Enum(_) | SchemaKind::Primitive { .. } | SchemaKind::Any => {}
        }
    }
}

impl EnumLiteral {
    fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => EnumLiteral::String(s.clone()),
            serde_json::Value::Number(n) => EnumLiteral::Number(n.clone()),
            serde_json::Value::Bool(b) => EnumLiteral::Bool(*b),
            serde_json::Value::Null => EnumLiteral::Null,
            // Structured enum members have no literal form
            other => EnumLiteral::String(other.to_string()),
        }
    }
}

/// Returns the non-null type names and whether `null` was listed
fn type_names(raw: &SchemaObject) -> (Vec<String>, bool) {
    match &raw.schema_type {
        None => (Vec::new(), false),
        Some(SchemaType::Single(name)) if name == "null" => (Vec::new(), true),
        Some(SchemaType::Single(name)) => (vec![name.clone()], false),
        Some(SchemaType::Multiple(names)) => {
            let has_null = names.iter().any(|n| n == "null");
            let rest = names.iter().filter(|n| *n != "null").cloned().collect();
            (rest, has_null)
        }
    }
}

fn primitive(kind: PrimitiveKind, raw: &SchemaObject) -> SchemaKind {
    SchemaKind::Primitive {
        kind,
        format: raw.format.clone(),
    }
}

fn lower_members(members: &[SchemaObject], location: &str, keyword: &str) -> Result<Vec<SchemaNode>> {
    members
        .iter()
        .enumerate()
        .map(|(i, member)| SchemaNode::lower(member, &format!("{}/{}/{}", location, keyword, i)))
        .collect()
}

fn lower_object(raw: &SchemaObject, location: &str) -> Result<SchemaKind> {
    let mut properties = IndexMap::new();
    if let Some(raw_properties) = &raw.properties {
        for (name, property) in raw_properties {
            let property_location = format!("{}/properties/{}", location, name);
            properties.insert(name.clone(), SchemaNode::lower(property, &property_location)?);
        }
    }

    let additional = match &raw.additional_properties {
        None | Some(AdditionalProperties::Allowed(false)) => Additional::Closed,
        Some(AdditionalProperties::Allowed(true)) => Additional::Open,
        Some(AdditionalProperties::Schema(schema)) => {
            let additional_location = format!("{}/additionalProperties", location);
            Additional::Typed(Box::new(SchemaNode::lower(schema, &additional_location)?))
        }
    };

    Ok(SchemaKind::Object {
        properties,
        required: raw.required.iter().cloned().collect(),
        additional,
    })
}

/// Extract the schema name from a `#/components/schemas/<name>` reference
pub fn parse_reference(reference: &str, location: &str) -> Result<String> {
    match reference.strip_prefix(COMPONENT_SCHEMA_PREFIX) {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(name.to_string()),
        _ => Err(Error::UnsupportedReference {
            reference: reference.to_string(),
            location: location.to_string(),
        }),
    }
}

/// Named schemas of a document, indexed by name in declaration order.
///
/// The registry owns every named schema; everything else refers to them by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, SchemaNode>,
}

impl SchemaRegistry {
    /// Lower every `components.schemas` entry of a document
    pub fn from_document(document: &OpenApiDocument) -> Result<Self> {
        let mut schemas = IndexMap::new();
        for (name, raw) in &document.components.schemas {
            let location = format!("{}{}", COMPONENT_SCHEMA_PREFIX, name);
            schemas.insert(name.clone(), SchemaNode::lower(raw, &location)?);
        }
        debug!("Loaded {} named schemas", schemas.len());
        Ok(Self { schemas })
    }

    pub fn from_schemas(schemas: IndexMap<String, SchemaNode>) -> Self {
        Self { schemas }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaNode)> {
        self.schemas.iter()
    }

    /// Fail on the first reference, in any named schema, that names no registry entry
    pub fn validate(&self) -> Result<()> {
        for (name, schema) in &self.schemas {
            self.check_references(schema, &format!("{}{}", COMPONENT_SCHEMA_PREFIX, name))?;
        }
        Ok(())
    }

    /// Fail if `schema` references a name missing from the registry
    pub fn check_references(&self, schema: &SchemaNode, location: &str) -> Result<()> {
        match schema
            .referenced_names()
            .into_iter()
            .find(|name| !self.contains(name))
        {
            Some(name) => Err(Error::UnresolvedReference {
                name,
                location: location.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Whether following references from `from` can lead back to `to`.
    ///
    /// Used to decide which references of a named schema take part in a cycle.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut visited = IndexSet::new();
        let mut stack = vec![from.to_string()];

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(schema) = self.schemas.get(&name) else {
                continue;
            };
            for next in schema.referenced_names() {
                if next == to {
                    return true;
                }
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> SchemaObject {
        serde_json::from_str(json).unwrap()
    }

    fn lower(json: &str) -> SchemaNode {
        SchemaNode::lower(&raw(json), "#/test").unwrap()
    }

    #[test]
    fn test_lower_reference() {
        let node = lower(r##"{"$ref": "#/components/schemas/Pet"}"##);
        assert_eq!(node.kind, SchemaKind::Ref("Pet".to_string()));
    }

    #[test]
    fn test_lower_external_reference_is_rejected() {
        let result = SchemaNode::lower(&raw(r##"{"$ref": "other.yaml#/Pet"}"##), "#/test");
        assert!(matches!(result, Err(Error::UnsupportedReference { .. })));
    }

    #[test]
    fn test_lower_object_keeps_property_order() {
        let node = lower(
            r#"{"type": "object", "required": ["name"],
                "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}}"#,
        );
        match node.kind {
            SchemaKind::Object {
                properties,
                required,
                additional,
            } => {
                let names: Vec<_> = properties.keys().cloned().collect();
                assert_eq!(names, vec!["id", "name"]);
                assert!(required.contains("name"));
                assert!(!required.contains("id"));
                assert_eq!(additional, Additional::Closed);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_properties_without_type_is_object() {
        let node = lower(r#"{"properties": {"id": {"type": "integer"}}}"#);
        assert!(matches!(node.kind, SchemaKind::Object { .. }));
    }

    #[test]
    fn test_lower_open_and_typed_additional_properties() {
        let open = lower(r#"{"type": "object", "additionalProperties": true}"#);
        assert!(matches!(
            open.kind,
            SchemaKind::Object {
                additional: Additional::Open,
                ..
            }
        ));

        let typed = lower(r#"{"type": "object", "additionalProperties": {"type": "string"}}"#);
        assert!(matches!(
            typed.kind,
            SchemaKind::Object {
                additional: Additional::Typed(_),
                ..
            }
        ));
    }

    #[test]
    fn test_lower_nullable_and_type_list() {
        let node = lower(r#"{"type": "string", "nullable": true}"#);
        assert!(node.nullable);

        let node = lower(r#"{"type": ["integer", "null"]}"#);
        assert!(node.nullable);
        assert!(matches!(
            node.kind,
            SchemaKind::Primitive {
                kind: PrimitiveKind::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_lower_enum_with_mixed_literals() {
        let node = lower(r#"{"type": "string", "enum": ["a", 1, true, null]}"#);
        match node.kind {
            SchemaKind::Enum(values) => {
                assert_eq!(values.len(), 4);
                assert_eq!(values[0], EnumLiteral::String("a".to_string()));
                assert_eq!(values[2], EnumLiteral::Bool(true));
                assert_eq!(values[3], EnumLiteral::Null);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_unknown_shape_degrades_to_any() {
        assert_eq!(lower(r#"{"description": "whatever"}"#).kind, SchemaKind::Any);
        assert_eq!(lower(r#"{"type": "file"}"#).kind, SchemaKind::Any);
    }

    #[test]
    fn test_referenced_names_walks_every_branch() {
        let node = lower(
            r##"{"type": "object",
                "properties": {
                    "tags": {"type": "array", "items": {"$ref": "#/components/schemas/Tag"}},
                    "owner": {"oneOf": [{"$ref": "#/components/schemas/User"}, {"type": "string"}]}
                },
                "additionalProperties": {"$ref": "#/components/schemas/Extra"}}"##,
        );
        let names: Vec<_> = node.referenced_names().into_iter().collect();
        assert_eq!(names, vec!["Tag", "User", "Extra"]);
    }

    #[test]
    fn test_validate_rejects_unresolved_reference() {
        let mut schemas = IndexMap::new();
        schemas.insert("Pet".to_string(), SchemaNode::reference("Missing"));
        let registry = SchemaRegistry::from_schemas(schemas);

        match registry.validate() {
            Err(Error::UnresolvedReference { name, location }) => {
                assert_eq!(name, "Missing");
                assert_eq!(location, "#/components/schemas/Pet");
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_reaches_follows_reference_chains() {
        let mut schemas = IndexMap::new();
        schemas.insert(
            "Node".to_string(),
            SchemaNode::new(SchemaKind::Array(Box::new(SchemaNode::reference("Node")))),
        );
        schemas.insert("A".to_string(), SchemaNode::reference("B"));
        schemas.insert("B".to_string(), SchemaNode::reference("A"));
        schemas.insert("Leaf".to_string(), SchemaNode::primitive(PrimitiveKind::String));
        schemas.insert("UsesLeaf".to_string(), SchemaNode::reference("Leaf"));
        let registry = SchemaRegistry::from_schemas(schemas);

        assert!(registry.reaches("A", "A"));
        assert!(registry.reaches("B", "A"));
        assert!(!registry.reaches("UsesLeaf", "UsesLeaf"));
        assert!(registry.reaches("Node", "Node"));
        assert!(!registry.reaches("Leaf", "Node"));
    }
}
