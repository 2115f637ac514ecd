//! Schema compiler - lowers schema nodes into validator expressions.
//!
//! [`SchemaCompiler::compile`] turns a [`SchemaNode`] into a [`Validator`] expression plus the
//! ordered set of registry names it depends on. Expressions are structured values; turning
//! them into text is the job of [`crate::printer`].

use indexmap::IndexSet;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::{Additional, EnumLiteral, PrimitiveKind, SchemaKind, SchemaNode, SchemaRegistry};

/// A validator expression in the generated code
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// The exported validator of a named schema (`PetSchema`)
    Reference(String),
    /// A deferred reference to a named schema that takes part in a cycle
    Lazy(String),
    Object {
        properties: Vec<PropertyValidator>,
        catchall: Option<Box<Validator>>,
    },
    Array(Box<Validator>),
    /// Closed set of string values
    StringEnum(Vec<String>),
    /// Closed set of mixed literal values
    Literals(Vec<EnumLiteral>),
    Intersection(Vec<Validator>),
    Union(Vec<Validator>),
    String(StringFormat),
    Number,
    Boolean,
    Any,
    Nullable(Box<Validator>),
}

/// One property of an object validator
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValidator {
    pub name: String,
    pub validator: Validator,
    pub optional: bool,
}

/// String formats that select a stricter validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Plain,
    DateTime,
    Email,
    Url,
}

impl StringFormat {
    fn from_hint(format: Option<&str>) -> Self {
        match format {
            Some("date-time") => StringFormat::DateTime,
            Some("email") => StringFormat::Email,
            Some("uri") | Some("url") => StringFormat::Url,
            _ => StringFormat::Plain,
        }
    }
}

impl Validator {
    /// Whether this expression is nothing but a reference to `name`, possibly nullable
    pub fn is_reference_to(&self, name: &str) -> bool {
        match self {
            Validator::Reference(n) | Validator::Lazy(n) => n == name,
            Validator::Nullable(inner) => inner.is_reference_to(name),
            _ => false,
        }
    }

    /// Whether a deferred reference appears anywhere in the expression
    pub fn contains_lazy(&self) -> bool {
        match self {
            Validator::Lazy(_) => true,
            Validator::Object {
                properties,
                catchall,
            } => {
                properties.iter().any(|p| p.validator.contains_lazy())
                    || catchall.as_ref().is_some_and(|c| c.contains_lazy())
            }
            Validator::Array(item) | Validator::Nullable(item) => item.contains_lazy(),
            Validator::Intersection(members) | Validator::Union(members) => {
                members.iter().any(Validator::contains_lazy)
            }
            Validator::Reference(_)
            | Validator::StringEnum(_)
            | Validator::Literals(_)
            | Validator::String(_)
            | Validator::Number
            | Validator::Boolean
            | Validator::Any => false,
        }
    }
}

/// Result of compiling one schema node
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub validator: Validator,
    /// Registry names referenced by the node, in first-seen order
    pub refs: IndexSet<String>,
}

impl Compiled {
    fn leaf(validator: Validator) -> Self {
        Self {
            validator,
            refs: IndexSet::new(),
        }
    }
}

/// A static type expression in the generated code
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// Type alias of a named schema
    Named(String),
    String,
    Number,
    Boolean,
    Null,
    Any,
    Array(Box<TsType>),
    Object(Vec<PropertyType>),
    Record(Box<TsType>),
    Literals(Vec<EnumLiteral>),
    Intersection(Vec<TsType>),
    Union(Vec<TsType>),
}

/// One property of an inline object type
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyType {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
}

/// Schema compiler
///
/// A compiler bound to a named schema (see [`SchemaCompiler::for_schema`]) renders references
/// that lead back to that schema as deferred references, so recursive schema graphs can be
/// evaluated.
pub struct SchemaCompiler<'a> {
    registry: &'a SchemaRegistry,
    /// Name of the schema whose binding is being generated
    current: Option<&'a str>,
    /// Names whose references must be deferred inside `current`
    deferred: IndexSet<String>,
}

impl<'a> SchemaCompiler<'a> {
    /// Create a compiler for anonymous schemas (parameters, bodies, responses)
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            current: None,
            deferred: IndexSet::new(),
        }
    }

    /// Create a compiler for the binding of the named schema `name`
    pub fn for_schema(registry: &'a SchemaRegistry, name: &'a str) -> Self {
        let deferred: IndexSet<String> = registry
            .get(name)
            .map(|schema| schema.referenced_names())
            .unwrap_or_default()
            .into_iter()
            .filter(|referenced| referenced == name || registry.reaches(referenced, name))
            .collect();

        if !deferred.is_empty() {
            debug!("Schema {} has recursive references: {:?}", name, deferred);
        }

        Self {
            registry,
            current: Some(name),
            deferred,
        }
    }

    /// Compile a schema node.
    ///
    /// `location` names where the node appears and is only used in error messages.
    pub fn compile(&self, node: &SchemaNode, location: &str) -> Result<Compiled> {
        let compiled = self.compile_kind(&node.kind, location)?;
        if node.nullable {
            Ok(Compiled {
                validator: Validator::Nullable(Box::new(compiled.validator)),
                refs: compiled.refs,
            })
        } else {
            Ok(compiled)
        }
    }

    /// Compile the binding of the named schema this compiler is bound to.
    ///
    /// A schema that is nothing but a reference to itself would produce a binding that
    /// initializes from itself; that binding is replaced by an untyped placeholder, kept
    /// nullable when the reference was.
    pub fn compile_named(&self) -> Result<Compiled> {
        let Some(name) = self.current else {
            return Ok(Compiled::leaf(Validator::Any));
        };
        let location = format!("#/components/schemas/{}", name);
        let node = self.registry.get(name).ok_or_else(|| Error::UnresolvedReference {
            name: name.to_string(),
            location: location.clone(),
        })?;

        let mut compiled = self.compile(node, &location)?;
        if compiled.validator.is_reference_to(name) {
            warn!(
                "Schema {} is defined as a reference to itself, using an untyped placeholder",
                name
            );
            compiled.validator = match compiled.validator {
                Validator::Nullable(_) => Validator::Nullable(Box::new(Validator::Any)),
                _ => Validator::Any,
            };
        }
        Ok(compiled)
    }

    fn compile_kind(&self, kind: &SchemaKind, location: &str) -> Result<Compiled> {
        match kind {
            SchemaKind::Ref(name) => {
                if !self.registry.contains(name) {
                    return Err(Error::UnresolvedReference {
                        name: name.clone(),
                        location: location.to_string(),
                    });
                }
                let validator = if self.deferred.contains(name) {
                    Validator::Lazy(name.clone())
                } else {
                    Validator::Reference(name.clone())
                };
                let mut refs = IndexSet::new();
                refs.insert(name.clone());
                Ok(Compiled { validator, refs })
            }
            SchemaKind::Object {
                properties,
                required,
                additional,
            } => {
                let mut refs = IndexSet::new();
                let mut compiled_properties = Vec::with_capacity(properties.len());

                for (name, property) in properties {
                    let compiled =
                        self.compile(property, &format!("{}/properties/{}", location, name))?;
                    refs.extend(compiled.refs);
                    compiled_properties.push(PropertyValidator {
                        name: name.clone(),
                        validator: compiled.validator,
                        optional: !required.contains(name),
                    });
                }

                let catchall = match additional {
                    Additional::Closed => None,
                    Additional::Open => Some(Box::new(Validator::Any)),
                    Additional::Typed(schema) => {
                        let compiled = self
                            .compile(schema, &format!("{}/additionalProperties", location))?;
                        refs.extend(compiled.refs);
                        Some(Box::new(compiled.validator))
                    }
                };

                Ok(Compiled {
                    validator: Validator::Object {
                        properties: compiled_properties,
                        catchall,
                    },
                    refs,
                })
            }
            SchemaKind::Array(item) => {
                let compiled = self.compile(item, &format!("{}/items", location))?;
                Ok(Compiled {
                    validator: Validator::Array(Box::new(compiled.validator)),
                    refs: compiled.refs,
                })
            }
            SchemaKind::Enum(values) => {
                let strings: Option<Vec<String>> = values
                    .iter()
                    .map(|value| match value {
                        EnumLiteral::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect();
                let validator = match strings {
                    Some(strings) if !strings.is_empty() => Validator::StringEnum(strings),
                    _ => Validator::Literals(values.clone()),
                };
                Ok(Compiled::leaf(validator))
            }
            SchemaKind::AllOf(members) => {
                self.compile_members(members, location, "allOf", Validator::Intersection)
            }
            SchemaKind::OneOf(members) => {
                self.compile_members(members, location, "oneOf", Validator::Union)
            }
            SchemaKind::AnyOf(members) => {
                self.compile_members(members, location, "anyOf", Validator::Union)
            }
            SchemaKind::Primitive { kind, format } => {
                let validator = match kind {
                    PrimitiveKind::String => {
                        Validator::String(StringFormat::from_hint(format.as_deref()))
                    }
                    // Integer-only bounds are not enforced here
                    PrimitiveKind::Number | PrimitiveKind::Integer => Validator::Number,
                    PrimitiveKind::Boolean => Validator::Boolean,
                };
                Ok(Compiled::leaf(validator))
            }
            SchemaKind::Any => Ok(Compiled::leaf(Validator::Any)),
        }
    }

    fn compile_members(
        &self,
        members: &[SchemaNode],
        location: &str,
        keyword: &str,
        combine: fn(Vec<Validator>) -> Validator,
    ) -> Result<Compiled> {
        let mut refs = IndexSet::new();
        let mut validators = Vec::with_capacity(members.len());

        for (i, member) in members.iter().enumerate() {
            let compiled = self.compile(member, &format!("{}/{}/{}", location, keyword, i))?;
            refs.extend(compiled.refs);
            validators.push(compiled.validator);
        }

        let validator = match validators.len() {
            0 => Validator::Any,
            1 => validators.remove(0),
            _ => combine(validators),
        };
        Ok(Compiled { validator, refs })
    }
}

/// Static type of a schema node, used for function parameters and request bodies.
pub fn type_of(node: &SchemaNode) -> TsType {
    let ty = match &node.kind {
        SchemaKind::Ref(name) => TsType::Named(name.clone()),
        SchemaKind::Object {
            properties,
            required,
            additional,
        } => {
            if properties.is_empty() {
                match additional {
                    Additional::Typed(schema) => TsType::Record(Box::new(type_of(schema))),
                    Additional::Open | Additional::Closed => TsType::Record(Box::new(TsType::Any)),
                }
            } else {
                TsType::Object(
                    properties
                        .iter()
                        .map(|(name, property)| PropertyType {
                            name: name.clone(),
                            ty: type_of(property),
                            optional: !required.contains(name),
                        })
                        .collect(),
                )
            }
        }
        SchemaKind::Array(item) => TsType::Array(Box::new(type_of(item))),
        SchemaKind::Enum(values) if values.is_empty() => TsType::Any,
        SchemaKind::Enum(values) => TsType::Literals(values.clone()),
        SchemaKind::AllOf(members) => combine_types(members, TsType::Intersection),
        SchemaKind::OneOf(members) | SchemaKind::AnyOf(members) => {
            combine_types(members, TsType::Union)
        }
        SchemaKind::Primitive { kind, .. } => match kind {
            PrimitiveKind::String => TsType::String,
            PrimitiveKind::Number | PrimitiveKind::Integer => TsType::Number,
            PrimitiveKind::Boolean => TsType::Boolean,
        },
        SchemaKind::Any => TsType::Any,
    };

    if node.nullable && ty != TsType::Any {
        TsType::Union(vec![ty, TsType::Null])
    } else {
        ty
    }
}

fn combine_types(members: &[SchemaNode], combine: fn(Vec<TsType>) -> TsType) -> TsType {
    let mut types: Vec<TsType> = members.iter().map(type_of).collect();
    match types.len() {
        0 => TsType::Any,
        1 => types.remove(0),
        _ => combine(types),
    }
}
