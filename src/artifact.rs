//! Structured model of the generated modules.
//!
//! The emitter decides *what* every module imports and declares; the printer decides how it
//! is spelled. Module and import paths are relative to the output root and never carry a
//! file extension on imports (`schemas/index`), so the import style is applied in one place.

use indexmap::IndexSet;

use crate::compiler::{TsType, Validator};
use crate::operation::HttpMethod;

/// One generated file, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Path relative to the output directory (`routes/pet/index.ts`)
    pub path: String,
    pub content: String,
    /// Paths of the artifacts this one imports
    pub references: IndexSet<String>,
}

/// One generated module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Path relative to the output directory, with extension
    pub path: String,
    /// Banner comment lines printed above the imports
    pub header: Vec<String>,
    pub imports: Vec<Import>,
    pub items: Vec<Item>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            header: Vec::new(),
            imports: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Artifact paths of every local module this module imports from
    pub fn references(&self) -> IndexSet<String> {
        self.imports
            .iter()
            .filter_map(Import::source)
            .map(|source| format!("{}.ts", source))
            .collect()
    }

    /// Names declared at the top level of the module
    pub fn declared_names(&self) -> Vec<String> {
        self.items.iter().flat_map(Item::declared_names).collect()
    }
}

/// An import or re-export statement
#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    /// The validation library
    Zod,
    /// `import { a, type B, c as d } from "..."`
    Named { names: Vec<ImportName>, from: String },
    /// `import * as binding from "..."`
    Namespace { binding: String, from: String },
    /// `export * from "..."`
    ReExportAll { from: String },
    /// `export { name as alias } from "..."`
    ReExportNamed {
        name: String,
        alias: String,
        from: String,
    },
}

impl Import {
    pub fn named(names: Vec<ImportName>, from: impl Into<String>) -> Self {
        Import::Named {
            names,
            from: from.into(),
        }
    }

    /// Local module path the statement reads from, `None` for packages
    pub fn source(&self) -> Option<&str> {
        match self {
            Import::Zod => None,
            Import::Named { from, .. }
            | Import::Namespace { from, .. }
            | Import::ReExportAll { from }
            | Import::ReExportNamed { from, .. } => Some(from),
        }
    }
}

/// One name of a named import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
    pub type_only: bool,
}

impl ImportName {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            type_only: false,
        }
    }

    pub fn type_only(name: impl Into<String>) -> Self {
        Self {
            type_only: true,
            ..Self::value(name)
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::value(name)
        }
    }

    /// Local binding the import introduces
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Exported validator and inferred type of a named schema
    Schema {
        /// Type name; the validator is bound as `<name>Schema`
        name: String,
        validator: Validator,
        /// The validator refers to itself through a deferred reference and needs an
        /// explicit type annotation
        recursive: bool,
    },
    /// Module-private validator (inline response schemas)
    LocalValidator { binding: String, validator: Validator },
    RequestFunction(RequestFunction),
    /// `export const name = value;`
    ConstAlias { name: String, value: String },
    /// `export const name = { ... };`
    ExportObject {
        name: String,
        comment: Option<String>,
        entries: Vec<ObjectEntry>,
    },
    /// Request configuration
    Config {
        title: String,
        version: String,
        base_url: String,
    },
}

impl Item {
    fn declared_names(&self) -> Vec<String> {
        match self {
            Item::Schema { name, .. } => vec![format!("{}Schema", name), name.clone()],
            Item::LocalValidator { binding, .. } => vec![binding.clone()],
            Item::RequestFunction(function) => vec![function.symbol.to_string()],
            Item::ConstAlias { name, .. } | Item::ExportObject { name, .. } => vec![name.clone()],
            Item::Config { .. } => vec!["SDKConfig".to_string(), "sdkConfig".to_string()],
        }
    }
}

/// One entry of an exported object literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEntry {
    /// `key: value`
    Field { key: String, value: String },
    /// `name`
    Shorthand(String),
    /// `...name`
    Spread(String),
}

/// A request function for one operation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFunction {
    pub symbol: &'static str,
    pub method: HttpMethod,
    /// URL path pattern (`/pet/{petId}`)
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub path_params: Vec<TypedParam>,
    pub query_params: Vec<TypedParam>,
    pub body: Option<RequestBodyParam>,
    pub response: ResponseShape,
}

/// A typed function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct TypedParam {
    pub name: String,
    pub ty: TsType,
    pub required: bool,
    /// Documented as an `@param` line of the function
    pub description: Option<String>,
}

/// The request body argument
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodyParam {
    pub ty: TsType,
    pub required: bool,
}

/// How a request function turns the response into its return value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// Validated with a named schema's validator
    Named(String),
    /// Validated with a module-private validator bound under the given name
    Inline(String),
    /// Every element validated with a named schema's validator, then collected
    ArrayOfNamed(String),
    /// No JSON success response; nothing is returned
    Void,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_skip_package_imports() {
        let mut module = Module::new("routes/pet/index.ts");
        module.imports = vec![
            Import::Zod,
            Import::named(vec![ImportName::value("sdkConfig")], "config"),
            Import::named(
                vec![ImportName::aliased("routes", "$petIdRoutes")],
                "routes/pet/$petId/index",
            ),
        ];

        let references: Vec<_> = module.references().into_iter().collect();
        assert_eq!(references, vec!["config.ts", "routes/pet/$petId/index.ts"]);
    }

    #[test]
    fn test_import_name_binding() {
        assert_eq!(ImportName::aliased("routes", "petRoutes").binding(), "petRoutes");
        assert_eq!(ImportName::type_only("Pet").binding(), "Pet");
        assert!(ImportName::type_only("Pet").type_only);
    }

    #[test]
    fn test_declared_names() {
        let mut module = Module::new("schemas/pet.ts");
        module.items.push(Item::Schema {
            name: "Pet".to_string(),
            validator: Validator::Any,
            recursive: false,
        });
        assert_eq!(module.declared_names(), vec!["PetSchema", "Pet"]);
    }
}
