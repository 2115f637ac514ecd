//! Artifact emitter - plans every generated module and prints it.
//!
//! Artifacts come out in a fixed order: one module per named schema and the schema barrel,
//! one module per route node (children before parents, the routes root last), the alias
//! module, the request configuration, and the package index.

use indexmap::IndexSet;
use log::{debug, info, warn};

use crate::alias::AliasTable;
use crate::artifact::{
    GeneratedArtifact, Import, ImportName, Item, Module, ObjectEntry, RequestBodyParam,
    RequestFunction, ResponseShape, TypedParam,
};
use crate::compiler::{type_of, SchemaCompiler, TsType, Validator};
use crate::document::OpenApiDocument;
use crate::error::{Error, Result};
use crate::operation::{extract_operations, OperationSpec, ParameterLocation};
use crate::printer::{print_module, ImportSuffix};
use crate::route_tree::{split_path, to_identifier, RouteNode, RouteTreeBuilder, Segment};
use crate::schema::SchemaRegistry;

const DEFAULT_BASE_URL: &str = "http://localhost";

/// Options that shape the generated code without changing which artifacts are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    pub import_suffix: ImportSuffix,
}

/// Generate the SDK for a loaded document.
///
/// # Errors
///
/// Fails on the first unresolved or unsupported reference, duplicate operation identifier,
/// symbol collision, or artifact path collision. No partial output is returned.
pub fn generate_sdk(
    document: &OpenApiDocument,
    options: &GeneratorOptions,
) -> Result<Vec<GeneratedArtifact>> {
    let modules = plan_modules(document)?;

    let mut paths = IndexSet::new();
    let mut artifacts = Vec::with_capacity(modules.len());
    for module in &modules {
        if !paths.insert(module.path.as_str()) {
            return Err(Error::ArtifactPathCollision(module.path.clone()));
        }
        artifacts.push(GeneratedArtifact {
            path: module.path.clone(),
            content: print_module(module, options.import_suffix),
            references: module.references(),
        });
    }

    info!("Generated {} artifacts", artifacts.len());
    Ok(artifacts)
}

/// Plan every module of the SDK without printing it
pub fn plan_modules(document: &OpenApiDocument) -> Result<Vec<Module>> {
    let registry = SchemaRegistry::from_document(document)?;
    registry.validate()?;

    let operations = extract_operations(document)?;
    let tree = RouteTreeBuilder::build(&operations)?;
    let aliases = AliasTable::build(&operations)?;
    info!(
        "Planning {} schemas, {} operations and {} aliases",
        document.components.schemas.len(),
        operations.len(),
        aliases.entries().len()
    );

    let mut modules = Vec::new();
    for (name, _) in registry.iter() {
        modules.push(schema_module(&registry, name)?);
    }
    modules.push(schema_index_module(&registry));

    let mut nodes = Vec::new();
    tree.walk_post_order(&mut |node| nodes.push(node));
    for node in nodes {
        modules.push(route_module(node, &registry)?);
    }

    modules.push(alias_module(&aliases));
    modules.push(config_module(document));
    modules.push(index_module(document));
    Ok(modules)
}

/// Module path of a schema, without extension
fn schema_source(name: &str) -> String {
    format!("schemas/{}", to_identifier(name).to_lowercase())
}

/// Module path of the route module in `dir`, without extension
fn route_source(dir: &str) -> String {
    if dir.is_empty() {
        "routes/index".to_string()
    } else {
        format!("routes/{}/index", dir)
    }
}

fn schema_module(registry: &SchemaRegistry, name: &str) -> Result<Module> {
    let compiled = SchemaCompiler::for_schema(registry, name).compile_named()?;
    let mut module = Module::new(format!("{}.ts", schema_source(name)));

    module.imports.push(Import::Zod);
    for referenced in compiled.refs.iter().filter(|referenced| *referenced != name) {
        module.imports.push(Import::named(
            vec![ImportName::value(format!("{}Schema", to_identifier(referenced)))],
            schema_source(referenced),
        ));
    }

    let recursive = compiled.validator.contains_lazy();
    module.items.push(Item::Schema {
        name: to_identifier(name),
        validator: compiled.validator,
        recursive,
    });

    check_bindings(&module, &format!("schema {}", name))?;
    Ok(module)
}

fn schema_index_module(registry: &SchemaRegistry) -> Module {
    let mut module = Module::new("schemas/index.ts");
    module.imports = registry
        .iter()
        .map(|(name, _)| Import::ReExportAll {
            from: schema_source(name),
        })
        .collect();
    module
}

/// One request function and what it needs from the module around it
struct PlannedFunction {
    function: RequestFunction,
    /// Response validator declared next to the function
    inline: Option<Validator>,
    refs: IndexSet<String>,
}

fn route_module(node: &RouteNode, registry: &SchemaRegistry) -> Result<Module> {
    let compiler = SchemaCompiler::new(registry);
    let mut module = Module::new(format!("{}.ts", route_source(&node.module_dir())));
    debug!("Planning {} ({} operations)", module.path, node.operations.len());

    let planned = node
        .operations
        .iter()
        .map(|operation| plan_function(operation, &compiler))
        .collect::<Result<Vec<_>>>()?;
    let schema_refs: IndexSet<String> = planned
        .iter()
        .flat_map(|function| function.refs.iter().cloned())
        .collect();
    let has_local_validator = planned.iter().any(|function| function.inline.is_some());

    if node.is_root() {
        module.imports.push(Import::named(
            vec![ImportName::value("aliases")],
            "routes/alias",
        ));
    }
    if has_local_validator {
        module.imports.push(Import::Zod);
    }
    if !schema_refs.is_empty() {
        let names = schema_refs
            .iter()
            .flat_map(|name| {
                let ident = to_identifier(name);
                [
                    ImportName::type_only(ident.clone()),
                    ImportName::value(format!("{}Schema", ident)),
                ]
            })
            .collect();
        module.imports.push(Import::named(names, "schemas/index"));
    }
    if !node.is_passthrough() {
        module
            .imports
            .push(Import::named(vec![ImportName::value("sdkConfig")], "config"));
    }
    for child in &node.children {
        module.imports.push(Import::named(
            vec![ImportName::aliased("routes", child_binding(child))],
            route_source(&child.module_dir()),
        ));
    }

    // Local response validators take the first binding nothing else in the module uses
    let mut taken: IndexSet<String> = imported_bindings(&module).into_iter().collect();
    taken.insert("routes".to_string());
    taken.extend(planned.iter().map(|p| p.function.symbol.to_string()));
    if node.is_root() {
        taken.extend(node.children.iter().map(|child| child.segment.symbol()));
    }
    for PlannedFunction {
        mut function,
        inline,
        ..
    } in planned
    {
        if let Some(validator) = inline {
            let binding = unique_binding(&format!("{}ResponseSchema", function.symbol), &taken);
            taken.insert(binding.clone());
            function.response = ResponseShape::Inline(binding.clone());
            module.items.push(Item::LocalValidator { binding, validator });
        }
        module.items.push(Item::RequestFunction(function));
    }

    if node.is_root() {
        for child in &node.children {
            module.items.push(Item::ConstAlias {
                name: child.segment.symbol(),
                value: child_binding(child),
            });
        }
    }

    let mut entries: Vec<ObjectEntry> = node
        .children
        .iter()
        .map(|child| ObjectEntry::Field {
            key: child.segment.symbol(),
            value: child_binding(child),
        })
        .chain(
            node.operations
                .iter()
                .map(|operation| ObjectEntry::Shorthand(operation.method.symbol().to_string())),
        )
        .collect();
    let comment = if node.is_root() {
        entries.push(ObjectEntry::Spread("aliases".to_string()));
        Some("Consolidated routes object used as the SDK client".to_string())
    } else {
        None
    };
    module.items.push(Item::ExportObject {
        name: "routes".to_string(),
        comment,
        entries,
    });

    check_bindings(&module, &node.path)?;
    Ok(module)
}

fn child_binding(child: &RouteNode) -> String {
    format!("{}Routes", child.segment.symbol())
}

/// `preferred`, or `preferred` with the first numeric suffix not in `taken`
fn unique_binding(preferred: &str, taken: &IndexSet<String>) -> String {
    let mut binding = preferred.to_string();
    let mut n = 2;
    while taken.contains(&binding) {
        binding = format!("{}{}", preferred, n);
        n += 1;
    }
    binding
}

fn plan_function(operation: &OperationSpec, compiler: &SchemaCompiler) -> Result<PlannedFunction> {
    let label = operation.label();
    let symbol = operation.method.symbol();
    let mut refs = IndexSet::new();

    let mut path_params = Vec::new();
    let mut query_params = Vec::new();
    for parameter in &operation.parameters {
        let ty = match &parameter.schema {
            Some(schema) => {
                let compiled =
                    compiler.compile(schema, &format!("{} parameter {}", label, parameter.name))?;
                if matches!(
                    parameter.location,
                    ParameterLocation::Path | ParameterLocation::Query
                ) {
                    refs.extend(compiled.refs);
                }
                type_of(schema)
            }
            None => TsType::Any,
        };

        let param = TypedParam {
            name: parameter.name.clone(),
            ty,
            required: parameter.required,
            description: parameter.description.clone(),
        };
        match parameter.location {
            ParameterLocation::Path => path_params.push(param),
            ParameterLocation::Query => query_params.push(param),
            ParameterLocation::Header | ParameterLocation::Cookie => {
                debug!(
                    "{}: {:?} parameter {} is passed through headers",
                    label, parameter.location, parameter.name
                );
            }
        }
    }

    // Placeholders in the path that no parameter declares
    for segment in split_path(&operation.path)? {
        if let Segment::Param(name) = segment {
            if !path_params.iter().any(|p| p.name == name) {
                warn!("{}: path parameter {} is not declared, typing it as string", label, name);
                path_params.push(TypedParam {
                    name,
                    ty: TsType::String,
                    required: true,
                    description: None,
                });
            }
        }
    }

    let body = match &operation.request_body {
        Some(body) => {
            let ty = match &body.schema {
                Some(schema) => {
                    let compiled = compiler.compile(schema, &format!("{} requestBody", label))?;
                    refs.extend(compiled.refs);
                    type_of(schema)
                }
                None => TsType::Any,
            };
            Some(RequestBodyParam {
                ty,
                required: body.required,
            })
        }
        None => None,
    };

    let (response, inline) = match operation.success_schema() {
        Some(schema) => {
            let compiled = compiler.compile(schema, &format!("{} response", label))?;
            refs.extend(compiled.refs);
            response_shape(compiled.validator)
        }
        None => (ResponseShape::Void, None),
    };

    Ok(PlannedFunction {
        function: RequestFunction {
            symbol,
            method: operation.method,
            path: operation.path.clone(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            operation_id: operation.operation_id.clone(),
            path_params,
            query_params,
            body,
            response,
        },
        inline,
        refs,
    })
}

/// Pick the response render path from the compiled success validator.
///
/// Inline shapes come back with an empty binding; the route module names them.
fn response_shape(validator: Validator) -> (ResponseShape, Option<Validator>) {
    let inline = |validator: Validator| (ResponseShape::Inline(String::new()), Some(validator));

    match validator {
        Validator::Reference(name) => (ResponseShape::Named(name), None),
        Validator::Array(item) => match *item {
            Validator::Reference(name) => (ResponseShape::ArrayOfNamed(name), None),
            item => inline(Validator::Array(Box::new(item))),
        },
        validator => inline(validator),
    }
}

fn alias_module(aliases: &AliasTable) -> Module {
    let mut module = Module::new("routes/alias.ts");
    module.header = vec![
        "Alias definitions for operationIds".to_string(),
        "Maps each operationId to its route function".to_string(),
    ];
    module.imports = aliases
        .imports()
        .map(|(dir, binding)| Import::Namespace {
            binding: binding.to_string(),
            from: route_source(dir),
        })
        .collect();
    module.items.push(Item::ExportObject {
        name: "aliases".to_string(),
        comment: None,
        entries: aliases
            .entries()
            .iter()
            .map(|entry| ObjectEntry::Field {
                key: entry.operation_id.clone(),
                value: entry.target(),
            })
            .collect(),
    });
    module
}

fn config_module(document: &OpenApiDocument) -> Module {
    let base_url = document
        .servers
        .first()
        .map(|server| server.url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let mut module = Module::new("config.ts");
    module.items.push(Item::Config {
        title: document.info.title.clone(),
        version: document.info.version.clone(),
        base_url,
    });
    module
}

fn index_module(document: &OpenApiDocument) -> Module {
    let mut module = Module::new("index.ts");
    module.header = vec![
        format!("{} SDK", document.info.title),
        format!("Generated by {}", env!("CARGO_PKG_NAME")),
    ];
    module.imports = vec![
        Import::ReExportAll {
            from: "config".to_string(),
        },
        Import::ReExportAll {
            from: "schemas/index".to_string(),
        },
        Import::ReExportNamed {
            name: "routes".to_string(),
            alias: "client".to_string(),
            from: "routes/index".to_string(),
        },
    ];
    module
}

/// Local bindings introduced by the imports of a module
fn imported_bindings(module: &Module) -> Vec<String> {
    module
        .imports
        .iter()
        .flat_map(|import| match import {
            Import::Zod => vec!["z".to_string()],
            Import::Named { names, .. } => {
                names.iter().map(|n| n.binding().to_string()).collect()
            }
            Import::Namespace { binding, .. } => vec![binding.clone()],
            Import::ReExportAll { .. } | Import::ReExportNamed { .. } => vec![],
        })
        .collect()
}

/// Fail if two imports or declarations of a module introduce the same binding
fn check_bindings(module: &Module, scope: &str) -> Result<()> {
    let mut seen = IndexSet::new();
    for binding in imported_bindings(module).into_iter().chain(module.declared_names()) {
        if !seen.insert(binding.clone()) {
            return Err(Error::SymbolCollision {
                path: scope.to_string(),
                symbol: binding,
            });
        }
    }
    Ok(())
}
