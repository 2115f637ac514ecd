//! Flat operation list extracted from the document's `paths` section.
//!
//! Each [`OperationSpec`] is one HTTP method on one URL path with its schemas already lowered
//! to [`SchemaNode`]s. The route tree and the alias table are both built from this list.

use log::debug;

use crate::document::{self, OpenApiDocument};
use crate::error::Result;
use crate::schema::SchemaNode;

/// HTTP methods an OpenAPI path item can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Parse a path item key; anything that is not a method yields `None`
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(HttpMethod::Get),
            "put" => Some(HttpMethod::Put),
            "post" => Some(HttpMethod::Post),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            "patch" => Some(HttpMethod::Patch),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Exported function name; `delete` is a reserved word in the target language
    pub fn symbol(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "del",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

/// The location where a parameter value is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

/// One operation parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<SchemaNode>,
}

/// Request body of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    /// JSON schema of the body, `None` for non-JSON payloads
    pub schema: Option<SchemaNode>,
}

/// One declared response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    /// Status code key as written (`200`, `2XX`, `default`, ...)
    pub status: String,
    /// JSON schema of the response, `None` when it has no JSON content
    pub schema: Option<SchemaNode>,
}

impl ResponseSpec {
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

/// One HTTP method on one URL path.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    /// The URL path pattern as written (e.g. `/pet/{petId}`)
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Path-level parameters first, then operation-level ones
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Responses in declaration order
    pub responses: Vec<ResponseSpec>,
}

impl OperationSpec {
    /// Create an operation with no parameters, body or responses
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: None,
            summary: None,
            description: None,
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// `METHOD /path`, used in logs and error messages
    pub fn label(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }

    /// Schema of the first 2xx response with JSON content
    pub fn success_schema(&self) -> Option<&SchemaNode> {
        self.responses
            .iter()
            .filter(|response| response.is_success())
            .find_map(|response| response.schema.as_ref())
    }
}

/// Flatten every path item of the document into an operation list, in declaration order.
pub fn extract_operations(document: &OpenApiDocument) -> Result<Vec<OperationSpec>> {
    let mut operations = Vec::new();

    for (path, item) in &document.paths {
        for (method, operation) in &item.operations {
            let location = format!("{} {}", method.as_str(), path);
            debug!("Extracting operation: {}", location);

            let mut parameters: Vec<Parameter> = Vec::new();
            for raw in item.parameters.iter().chain(&operation.parameters) {
                let parameter = lower_parameter(raw, &location)?;
                // Operation-level parameters override path-level ones
                match parameters
                    .iter_mut()
                    .find(|p| p.name == parameter.name && p.location == parameter.location)
                {
                    Some(existing) => *existing = parameter,
                    None => parameters.push(parameter),
                }
            }

            let request_body = match &operation.request_body {
                Some(body) => Some(RequestBody {
                    required: body.required,
                    schema: lower_json_schema(&body.content, &format!("{} requestBody", location))?,
                }),
                None => None,
            };

            let mut responses = Vec::new();
            for (status, response) in &operation.responses {
                let response_location = format!("{} response {}", location, status);
                responses.push(ResponseSpec {
                    status: status.clone(),
                    schema: lower_json_schema(&response.content, &response_location)?,
                });
            }

            operations.push(OperationSpec {
                path: path.clone(),
                method: *method,
                operation_id: operation.operation_id.clone(),
                summary: operation.summary.clone(),
                description: operation.description.clone(),
                parameters,
                request_body,
                responses,
            });
        }
    }

    debug!("Extracted {} operations", operations.len());
    Ok(operations)
}

fn lower_parameter(raw: &document::Parameter, location: &str) -> Result<Parameter> {
    let parameter_location = ParameterLocation::from_key(&raw.location).unwrap_or_else(|| {
        log::warn!(
            "Parameter {} of {} has unknown location {:?}, treating it as a query parameter",
            raw.name,
            location,
            raw.location
        );
        ParameterLocation::Query
    });

    let schema = match &raw.schema {
        Some(schema) => Some(SchemaNode::lower(
            schema,
            &format!("{} parameter {}", location, raw.name),
        )?),
        None => None,
    };

    Ok(Parameter {
        name: raw.name.clone(),
        // Path parameters are always required
        required: raw.required || parameter_location == ParameterLocation::Path,
        location: parameter_location,
        description: raw.description.clone(),
        schema,
    })
}

fn lower_json_schema(
    content: &indexmap::IndexMap<String, document::MediaType>,
    location: &str,
) -> Result<Option<SchemaNode>> {
    match document::json_media_type(content).and_then(|media| media.schema.as_ref()) {
        Some(schema) => Ok(Some(SchemaNode::lower(schema, location)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_document, DocumentFormat};
    use crate::schema::SchemaKind;

    fn operations_from(yaml: &str) -> Vec<OperationSpec> {
        let document = parse_document(yaml, DocumentFormat::Yaml).unwrap();
        extract_operations(&document).unwrap()
    }

    #[test]
    fn test_method_symbols() {
        assert_eq!(HttpMethod::Delete.symbol(), "del");
        assert_eq!(HttpMethod::Get.symbol(), "get");
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::from_key("parameters"), None);
    }

    #[test]
    fn test_extract_in_declaration_order() {
        let operations = operations_from(
            r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pet:
    put: {operationId: updatePet}
    post: {operationId: addPet}
  /store/inventory:
    get: {operationId: getInventory}
"#,
        );

        let labels: Vec<_> = operations.iter().map(|o| o.label()).collect();
        assert_eq!(
            labels,
            vec!["PUT /pet", "POST /pet", "GET /store/inventory"]
        );
        assert_eq!(operations[1].operation_id.as_deref(), Some("addPet"));
    }

    #[test]
    fn test_path_level_parameters_are_merged() {
        let operations = operations_from(
            r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pet/{petId}:
    parameters:
      - {name: petId, in: path, schema: {type: string}}
      - {name: verbose, in: query, schema: {type: boolean}}
    get:
      parameters:
        - {name: petId, in: path, required: true, schema: {type: integer}}
        - {name: X-Trace, in: header, schema: {type: string}}
"#,
        );

        let parameters = &operations[0].parameters;
        assert_eq!(parameters.len(), 3);
        assert_eq!(parameters[0].name, "petId");
        assert!(parameters[0].required);
        assert!(matches!(
            parameters[0].schema.as_ref().unwrap().kind,
            SchemaKind::Primitive {
                kind: crate::schema::PrimitiveKind::Integer,
                ..
            }
        ));
        assert_eq!(parameters[2].location, ParameterLocation::Header);
    }

    #[test]
    fn test_success_schema_skips_non_success_and_non_json() {
        let operations = operations_from(
            r##"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pet:
    get:
      responses:
        "400":
          content:
            application/json:
              schema: {$ref: "#/components/schemas/Error"}
        "200":
          content:
            application/xml:
              schema: {type: string}
        "201":
          content:
            application/json:
              schema: {$ref: "#/components/schemas/Pet"}
"##,
        );

        let schema = operations[0].success_schema().unwrap();
        assert_eq!(schema.kind, SchemaKind::Ref("Pet".to_string()));
    }

    #[test]
    fn test_operation_carries_parameters_body_and_response() {
        let operations = operations_from(
            r##"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pet:
    post:
      parameters:
        - name: owner
          in: query
          description: |
            Owner to file
            the pet under
          schema: {$ref: "#/components/schemas/Owner"}
      requestBody:
        required: true
        content:
          application/json:
            schema: {$ref: "#/components/schemas/NewPet"}
      responses:
        "200":
          content:
            application/json:
              schema: {$ref: "#/components/schemas/Pet"}
"##,
        );

        let operation = &operations[0];
        let owner = &operation.parameters[0];
        assert_eq!(owner.location, ParameterLocation::Query);
        assert_eq!(
            owner.description.as_deref(),
            Some("Owner to file\nthe pet under\n")
        );
        assert_eq!(
            owner.schema.as_ref().unwrap().kind,
            SchemaKind::Ref("Owner".to_string())
        );

        let body = operation.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(
            body.schema.as_ref().unwrap().kind,
            SchemaKind::Ref("NewPet".to_string())
        );
        assert_eq!(
            operation.success_schema().unwrap().kind,
            SchemaKind::Ref("Pet".to_string())
        );
    }
}
