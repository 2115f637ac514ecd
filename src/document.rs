//! Serde model of the input OpenAPI document.
//!
//! Only the parts the generator consumes are modeled. Every map is an [`IndexMap`] so that
//! declaration order survives deserialization and the generated output is reproducible.

use indexmap::IndexMap;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::operation::HttpMethod;

/// Complete OpenAPI document
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    /// OpenAPI version marker
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Servers, the first one provides the default base URL
    pub servers: Vec<Server>,
    /// API paths in declaration order
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas)
    pub components: Components,
}

/// Document shape before the required top-level fields are checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub openapi: Option<String>,
    pub info: Option<Info>,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub paths: Option<IndexMap<String, PathItem>>,
    #[serde(default)]
    pub components: Components,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version; unquoted YAML numbers (`version: 1.0`) are accepted
    #[serde(deserialize_with = "scalar")]
    pub version: String,
    /// API description
    #[serde(default)]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A scalar written as text, number or boolean
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
            Scalar::Bool(value) => value.to_string(),
        }
    }
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

/// Components section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    /// Named schema definitions
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaObject>,
}

/// All operations declared for a single path, in declaration order.
///
/// Keys that are not HTTP methods (`summary`, `servers`, extensions, ...) are ignored,
/// except `parameters` which applies to every operation of the path.
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters shared by every operation of this path
    pub parameters: Vec<Parameter>,
    /// Operations keyed by method
    pub operations: Vec<(HttpMethod, Operation)>,
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PathItemVisitor;

        impl<'de> Visitor<'de> for PathItemVisitor {
            type Value = PathItem;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an OpenAPI path item object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<PathItem, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut item = PathItem::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "parameters" {
                        item.parameters = map.next_value()?;
                    } else if let Some(method) = HttpMethod::from_key(&key) {
                        if item.operations.iter().any(|(m, _)| *m == method) {
                            return Err(de::Error::custom(format!("duplicate method {}", key)));
                        }
                        item.operations.push((method, map.next_value()?));
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(item)
            }
        }

        deserializer.deserialize_map(PathItemVisitor)
    }
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", default)]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code (`200`, `2XX`, `default`, ...)
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<SchemaObject>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
    #[serde(default)]
    pub required: bool,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<SchemaObject>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Picks the JSON media type out of a content map.
///
/// `application/json` wins, otherwise the first `*/*+json` or `*json*` entry is used.
pub fn json_media_type(content: &IndexMap<String, MediaType>) -> Option<&MediaType> {
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(media_type, _)| media_type.contains("json"))
                .map(|(_, media)| media)
        })
}

/// Raw schema description as written in the document.
///
/// This is lowered into [`crate::schema::SchemaNode`] before any code is generated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaObject {
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
    #[serde(rename = "type", default)]
    pub schema_type: Option<SchemaType>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Option<IndexMap<String, SchemaObject>>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default)]
    pub items: Option<Box<SchemaObject>>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(rename = "allOf", default)]
    pub all_of: Option<Vec<SchemaObject>>,
    #[serde(rename = "oneOf", default)]
    pub one_of: Option<Vec<SchemaObject>>,
    #[serde(rename = "anyOf", default)]
    pub any_of: Option<Vec<SchemaObject>>,
}

/// The `type` keyword: a single name, or a list of names in OpenAPI 3.1
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// The `additionalProperties` keyword
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaObject>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_item_keeps_method_order_and_skips_other_keys() {
        let yaml = r#"
summary: pets
put:
  operationId: updatePet
parameters:
  - name: trace
    in: header
post:
  operationId: addPet
x-internal: true
"#;
        let item: PathItem = serde_yaml::from_str(yaml).unwrap();

        let methods: Vec<_> = item.operations.iter().map(|(m, _)| *m).collect();
        assert_eq!(methods, vec![HttpMethod::Put, HttpMethod::Post]);
        assert_eq!(item.parameters.len(), 1);
        assert_eq!(item.parameters[0].name, "trace");
        assert_eq!(
            item.operations[0].1.operation_id.as_deref(),
            Some("updatePet")
        );
    }

    #[test]
    fn test_numeric_version_is_read_as_text() {
        let info: Info = serde_yaml::from_str("title: Petstore\nversion: 2\n").unwrap();
        assert_eq!(info.version, "2");

        let raw: RawDocument = serde_json::from_str(r#"{"openapi": "3.0.3"}"#).unwrap();
        assert_eq!(raw.openapi.as_deref(), Some("3.0.3"));
        assert!(raw.info.is_none());
    }

    #[test]
    fn test_unquoted_status_codes_are_read_as_strings() {
        let yaml = r#"
responses:
  200:
    description: ok
  default:
    description: error
"#;
        let operation: Operation = serde_yaml::from_str(yaml).unwrap();
        let codes: Vec<_> = operation.responses.keys().cloned().collect();
        assert_eq!(codes, vec!["200".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_additional_properties_forms() {
        let open: SchemaObject =
            serde_json::from_str(r#"{"type": "object", "additionalProperties": true}"#).unwrap();
        assert!(matches!(
            open.additional_properties,
            Some(AdditionalProperties::Allowed(true))
        ));

        let typed: SchemaObject = serde_json::from_str(
            r#"{"type": "object", "additionalProperties": {"type": "integer"}}"#,
        )
        .unwrap();
        assert!(matches!(
            typed.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
    }

    #[test]
    fn test_type_list() {
        let schema: SchemaObject =
            serde_json::from_str(r#"{"type": ["string", "null"]}"#).unwrap();
        match schema.schema_type {
            Some(SchemaType::Multiple(types)) => assert_eq!(types, vec!["string", "null"]),
            other => panic!("unexpected type keyword: {:?}", other),
        }
    }

    #[test]
    fn test_json_media_type_prefers_application_json() {
        let mut content = IndexMap::new();
        content.insert("application/xml".to_string(), MediaType::default());
        content.insert(
            "application/problem+json".to_string(),
            MediaType {
                schema: Some(SchemaObject::default()),
            },
        );
        assert!(json_media_type(&content).unwrap().schema.is_some());

        content.insert("application/json".to_string(), MediaType::default());
        assert!(json_media_type(&content).unwrap().schema.is_none());
    }
}
