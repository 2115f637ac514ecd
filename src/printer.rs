//! Printer - renders [`Module`]s into TypeScript source text.
//!
//! This is the only place that knows the syntax of the generated code. Output is formatted
//! the way prettier would format it (two-space indent, double quotes, trailing commas), so a
//! generated SDK does not churn when the consumer runs a formatter over it.

use std::fmt;
use std::str::FromStr;

use crate::artifact::{
    Import, ImportName, Item, Module, ObjectEntry, RequestFunction, ResponseShape, TypedParam,
};
use crate::compiler::{StringFormat, TsType, Validator};
use crate::error::Error;
use crate::route_tree::to_identifier;
use crate::schema::EnumLiteral;

const INDENT: &str = "  ";

/// Suffix appended to relative import specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportSuffix {
    /// `./pet/index.js`, for ESM output compiled by `tsc`
    #[default]
    Js,
    /// `./pet/index.ts`, for runtimes that execute TypeScript directly
    Ts,
    /// `./pet/index`, for bundlers that resolve extensions themselves
    None,
}

impl ImportSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSuffix::Js => ".js",
            ImportSuffix::Ts => ".ts",
            ImportSuffix::None => "",
        }
    }
}

impl FromStr for ImportSuffix {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            ".js" => Ok(ImportSuffix::Js),
            ".ts" => Ok(ImportSuffix::Ts),
            "false" => Ok(ImportSuffix::None),
            other => Err(Error::InvalidImportPrefix(other.to_string())),
        }
    }
}

impl fmt::Display for ImportSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportSuffix::None => write!(f, "false"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Render a module to source text
pub fn print_module(module: &Module, suffix: ImportSuffix) -> String {
    let mut sections = Vec::new();
    if !module.header.is_empty() {
        sections.push(format!("{}\n", doc_comment(&module.header, "")));
    }
    if !module.imports.is_empty() {
        sections.push(
            module
                .imports
                .iter()
                .map(|import| format!("{}\n", print_import(import, &module.path, suffix)))
                .collect::<String>(),
        );
    }
    sections.extend(module.items.iter().map(print_item));

    if module.imports.is_empty() && module.items.is_empty() {
        sections.push("export {};\n".to_string());
    }
    sections.join("\n")
}

/// Relative import specifier (without suffix) from the file `from` to the module `target`.
///
/// Both paths are relative to the output root: `relative_specifier("routes/pet/index.ts",
/// "schemas/index")` is `../../schemas/index`.
pub fn relative_specifier(from: &str, target: &str) -> String {
    let mut from_dir: Vec<&str> = from.split('/').collect();
    from_dir.pop();
    let target_parts: Vec<&str> = target.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&target_parts[..target_parts.len().saturating_sub(1)])
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = match from_dir.len() - common {
        0 => vec!["."],
        ups => vec![".."; ups],
    };
    parts.extend(&target_parts[common..]);
    parts.join("/")
}

fn print_import(import: &Import, importer: &str, suffix: ImportSuffix) -> String {
    let specifier = |from: &str| {
        quote(&format!(
            "{}{}",
            relative_specifier(importer, from),
            suffix.as_str()
        ))
    };

    match import {
        Import::Zod => "import { z } from \"zod\";".to_string(),
        Import::Named { names, from } => format!(
            "import {{ {} }} from {};",
            names.iter().map(print_import_name).collect::<Vec<_>>().join(", "),
            specifier(from)
        ),
        Import::Namespace { binding, from } => {
            format!("import * as {} from {};", binding, specifier(from))
        }
        Import::ReExportAll { from } => format!("export * from {};", specifier(from)),
        Import::ReExportNamed { name, alias, from } => {
            format!("export {{ {} as {} }} from {};", name, alias, specifier(from))
        }
    }
}

fn print_import_name(name: &ImportName) -> String {
    let mut out = String::new();
    if name.type_only {
        out.push_str("type ");
    }
    out.push_str(&name.name);
    if let Some(alias) = &name.alias {
        out.push_str(" as ");
        out.push_str(alias);
    }
    out
}

fn print_item(item: &Item) -> String {
    match item {
        Item::Schema {
            name,
            validator,
            recursive,
        } => {
            let annotation = if *recursive { ": z.ZodTypeAny" } else { "" };
            format!(
                "export const {name}Schema{annotation} = {};\n\nexport type {name} = z.infer<typeof {name}Schema>;\n",
                print_validator(validator, 0),
            )
        }
        Item::LocalValidator { binding, validator } => {
            format!("const {} = {};\n", binding, print_validator(validator, 0))
        }
        Item::RequestFunction(function) => print_function(function),
        Item::ConstAlias { name, value } => format!("export const {} = {};\n", name, value),
        Item::ExportObject {
            name,
            comment,
            entries,
        } => {
            let mut out = String::new();
            if let Some(comment) = comment {
                out.push_str(&format!("// {}\n", comment));
            }
            if entries.is_empty() {
                out.push_str(&format!("export const {} = {{}};\n", name));
                return out;
            }
            out.push_str(&format!("export const {} = {{\n", name));
            for entry in entries {
                let line = match entry {
                    ObjectEntry::Field { key, value } => format!("{}: {}", property_key(key), value),
                    ObjectEntry::Shorthand(name) => name.clone(),
                    ObjectEntry::Spread(name) => format!("...{}", name),
                };
                out.push_str(&format!("{INDENT}{},\n", line));
            }
            out.push_str("};\n");
            out
        }
        Item::Config {
            title,
            version,
            base_url,
        } => print_config(title, version, base_url),
    }
}

/// Render a validator expression. `depth` is the indentation level of the line the
/// expression starts on.
pub fn print_validator(validator: &Validator, depth: usize) -> String {
    match validator {
        Validator::Reference(name) => format!("{}Schema", to_identifier(name)),
        Validator::Lazy(name) => format!("z.lazy(() => {}Schema)", to_identifier(name)),
        Validator::Object {
            properties,
            catchall,
        } => {
            let mut out = if properties.is_empty() {
                "z.object({})".to_string()
            } else {
                let pad = INDENT.repeat(depth + 1);
                let mut out = "z.object({\n".to_string();
                for property in properties {
                    out.push_str(&format!(
                        "{}{}: {}{},\n",
                        pad,
                        property_key(&property.name),
                        print_validator(&property.validator, depth + 1),
                        if property.optional { ".optional()" } else { "" }
                    ));
                }
                out.push_str(&format!("{}}})", INDENT.repeat(depth)));
                out
            };
            if let Some(catchall) = catchall {
                out.push_str(&format!(".catchall({})", print_validator(catchall, depth)));
            }
            out
        }
        Validator::Array(item) => format!("z.array({})", print_validator(item, depth)),
        Validator::StringEnum(values) => format!(
            "z.enum([{}])",
            values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(", ")
        ),
        Validator::Literals(values) => match values.as_slice() {
            [] => "z.never()".to_string(),
            [single] => zod_literal(single),
            _ => format!(
                "z.union([{}])",
                values.iter().map(zod_literal).collect::<Vec<_>>().join(", ")
            ),
        },
        Validator::Intersection(members) => members
            .iter()
            .map(|member| print_validator(member, depth))
            .reduce(|acc, member| format!("{}.and({})", acc, member))
            .unwrap_or_else(|| "z.any()".to_string()),
        Validator::Union(members) => format!(
            "z.union([{}])",
            members
                .iter()
                .map(|member| print_validator(member, depth))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Validator::String(format) => {
            let validator = match format {
                StringFormat::Plain => "z.string()",
                StringFormat::DateTime => "z.string().datetime()",
                StringFormat::Email => "z.string().email()",
                StringFormat::Url => "z.string().url()",
            };
            validator.to_string()
        }
        Validator::Number => "z.number()".to_string(),
        Validator::Boolean => "z.boolean()".to_string(),
        Validator::Any => "z.any()".to_string(),
        Validator::Nullable(inner) => format!("{}.nullable()", print_validator(inner, depth)),
    }
}

fn zod_literal(value: &EnumLiteral) -> String {
    match value {
        EnumLiteral::Null => "z.null()".to_string(),
        other => format!("z.literal({})", ts_literal(other)),
    }
}

fn ts_literal(value: &EnumLiteral) -> String {
    match value {
        EnumLiteral::String(s) => quote(s),
        EnumLiteral::Number(n) => n.to_string(),
        EnumLiteral::Bool(b) => b.to_string(),
        EnumLiteral::Null => "null".to_string(),
    }
}

/// Render a static type
pub fn print_type(ty: &TsType) -> String {
    match ty {
        TsType::Named(name) => to_identifier(name),
        TsType::String => "string".to_string(),
        TsType::Number => "number".to_string(),
        TsType::Boolean => "boolean".to_string(),
        TsType::Null => "null".to_string(),
        TsType::Any => "any".to_string(),
        TsType::Array(item) => match item.as_ref() {
            TsType::Named(_)
            | TsType::String
            | TsType::Number
            | TsType::Boolean
            | TsType::Null
            | TsType::Any => format!("{}[]", print_type(item)),
            _ => format!("Array<{}>", print_type(item)),
        },
        TsType::Object(properties) if properties.is_empty() => "{}".to_string(),
        TsType::Object(properties) => format!(
            "{{ {} }}",
            properties
                .iter()
                .map(|p| format!(
                    "{}{}: {}",
                    property_key(&p.name),
                    if p.optional { "?" } else { "" },
                    print_type(&p.ty)
                ))
                .collect::<Vec<_>>()
                .join("; ")
        ),
        TsType::Record(value) => format!("Record<string, {}>", print_type(value)),
        TsType::Literals(values) if values.is_empty() => "never".to_string(),
        TsType::Literals(values) => values.iter().map(ts_literal).collect::<Vec<_>>().join(" | "),
        TsType::Intersection(members) => members
            .iter()
            .map(|member| match member {
                TsType::Union(_) | TsType::Literals(_) => format!("({})", print_type(member)),
                _ => print_type(member),
            })
            .collect::<Vec<_>>()
            .join(" & "),
        TsType::Union(members) => members.iter().map(print_type).collect::<Vec<_>>().join(" | "),
    }
}

fn print_function(function: &RequestFunction) -> String {
    let mut out = String::new();

    // Doc comment
    let mut doc = vec![function
        .summary
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("{} {}", function.method.as_str(), function.path))];
    if let Some(description) = function.description.as_ref().filter(|d| !d.trim().is_empty()) {
        doc.extend(description.trim_end().lines().map(str::to_string));
    }
    if let Some(operation_id) = &function.operation_id {
        doc.push(format!("OperationId: {}", operation_id));
    }
    for (object, params) in [
        ("pathParams", &function.path_params),
        ("queryParams", &function.query_params),
    ] {
        for param in params {
            if let Some(description) = param.description.as_deref() {
                let description = description.split_whitespace().collect::<Vec<_>>().join(" ");
                if !description.is_empty() {
                    doc.push(format!(
                        "@param {} {}",
                        member_access(object, &param.name),
                        description
                    ));
                }
            }
        }
    }
    out.push_str(&doc_comment(&doc, ""));
    out.push('\n');

    // Signature
    let mut params = Vec::new();
    if !function.path_params.is_empty() {
        params.push(format!("pathParams: {}", param_object(&function.path_params)));
    }
    if !function.query_params.is_empty() {
        let optional = function.query_params.iter().all(|p| !p.required);
        params.push(format!(
            "queryParams{}: {}",
            if optional { "?" } else { "" },
            param_object(&function.query_params)
        ));
    }
    if let Some(body) = &function.body {
        params.push(format!(
            "body{}: {}",
            if body.required { "" } else { "?" },
            print_type(&body.ty)
        ));
    }
    params.push("headers?: Record<string, string>".to_string());

    let return_type = match &function.response {
        ResponseShape::Named(name) => to_identifier(name),
        ResponseShape::Inline(binding) => format!("z.infer<typeof {}>", binding),
        ResponseShape::ArrayOfNamed(name) => format!("{}[]", to_identifier(name)),
        ResponseShape::Void => "void".to_string(),
    };

    if params.len() == 1 {
        out.push_str(&format!(
            "export async function {}({}): Promise<{}> {{\n",
            function.symbol, params[0], return_type
        ));
    } else {
        out.push_str(&format!("export async function {}(\n", function.symbol));
        for param in &params {
            out.push_str(&format!("{INDENT}{},\n", param));
        }
        out.push_str(&format!("): Promise<{}> {{\n", return_type));
    }

    // URL
    out.push_str("  // Construct the URL with path parameters\n");
    out.push_str(&format!(
        "  let url = `${{sdkConfig.baseUrl}}{}`;\n",
        url_template(&function.path)
    ));

    if !function.query_params.is_empty() {
        out.push_str("\n  // Add query parameters\n");
        out.push_str("  if (queryParams) {\n");
        out.push_str("    const searchParams = new URLSearchParams();\n");
        for param in &function.query_params {
            let access = member_access("queryParams", &param.name);
            out.push_str(&format!("    if ({} !== undefined)\n", access));
            out.push_str(&format!(
                "      searchParams.append({}, String({}));\n",
                quote(&param.name),
                access
            ));
        }
        out.push_str("    const queryString = searchParams.toString();\n");
        out.push_str("    if (queryString) {\n");
        out.push_str("      url += `?${queryString}`;\n");
        out.push_str("    }\n");
        out.push_str("  }\n");
    }

    // Fetch options
    out.push_str("\n  // Prepare fetch options\n");
    out.push_str("  const options: RequestInit = {\n");
    out.push_str(&format!("    method: {},\n", quote(function.method.as_str())));
    out.push_str("    headers: {\n");
    out.push_str("      \"Content-Type\": \"application/json\",\n");
    out.push_str("      ...sdkConfig.headers,\n");
    out.push_str("      ...headers,\n");
    out.push_str("    },\n");
    if function.body.is_some() {
        out.push_str("    ...(body !== undefined && { body: JSON.stringify(body) }),\n");
    }
    out.push_str("  };\n");

    out.push_str("\n  // Make the request\n");
    out.push_str("  const response = await fetch(url, options);\n");
    out.push_str("\n  // Handle the response\n");
    out.push_str("  if (!response.ok) {\n");
    out.push_str("    throw new Error(`HTTP error ${response.status}: ${response.statusText}`);\n");
    out.push_str("  }\n");

    out.push_str("\n  // Parse the response\n");
    match &function.response {
        ResponseShape::Named(name) => {
            out.push_str("  const data = await response.json();\n");
            out.push_str(&format!("  return {}Schema.parse(data);\n", to_identifier(name)));
        }
        ResponseShape::Inline(binding) => {
            out.push_str("  const data = await response.json();\n");
            out.push_str(&format!("  return {}.parse(data);\n", binding));
        }
        ResponseShape::ArrayOfNamed(name) => {
            let name = to_identifier(name);
            out.push_str("  const data = await response.json();\n");
            out.push_str(&format!("  const list: {}[] = [];\n", name));
            out.push_str("  for (const item of data) {\n");
            out.push_str(&format!("    list.push({}Schema.parse(item));\n", name));
            out.push_str("  }\n");
            out.push_str("  return list;\n");
        }
        ResponseShape::Void => out.push_str("  return;\n"),
    }

    out.push_str("}\n");
    out
}

fn param_object(params: &[TypedParam]) -> String {
    let mut out = "{\n".to_string();
    for param in params {
        out.push_str(&format!(
            "{INDENT}{INDENT}{}{}: {};\n",
            property_key(&param.name),
            if param.required { "" } else { "?" },
            print_type(&param.ty)
        ));
    }
    out.push_str(&format!("{INDENT}}}"));
    out
}

/// Body of the URL template literal, with `{name}` placeholders bound to `pathParams`
fn url_template(path: &str) -> String {
    let mut out = String::new();
    let mut rest = path;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&escape_template(&rest[..start]));
        let name = &rest[start + 1..start + len];
        out.push_str(&format!(
            "${{encodeURIComponent(String({}))}}",
            member_access("pathParams", name)
        ));
        rest = &rest[start + len + 1..];
    }
    out.push_str(&escape_template(rest));
    out
}

fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn print_config(title: &str, version: &str, base_url: &str) -> String {
    let mut out = doc_comment(
        &[
            "SDK Configuration".to_string(),
            format!("Generated from {} v{}", title, version),
        ],
        "",
    );
    out.push_str("\n\n");
    out.push_str("export interface SDKConfig {\n");
    out.push_str(&doc_comment(&["Base URL for API requests".to_string()], INDENT));
    out.push_str("\n  baseUrl: string;\n\n");
    out.push_str(&doc_comment(
        &["Default headers sent with each request".to_string()],
        INDENT,
    ));
    out.push_str("\n  headers: Record<string, string>;\n");
    out.push_str("}\n\n");
    out.push_str(&doc_comment(
        &[
            "Default SDK configuration".to_string(),
            "This can be modified by the user after importing the SDK".to_string(),
        ],
        "",
    ));
    out.push('\n');
    out.push_str("export const sdkConfig: SDKConfig = {\n");
    out.push_str(&format!("  baseUrl: {},\n", quote(base_url)));
    out.push_str("  headers: {\n");
    out.push_str("    Accept: \"application/json\",\n");
    out.push_str("  },\n");
    out.push_str("};\n");
    out
}

/// `/** ... */` block without a trailing newline
fn doc_comment(lines: &[String], indent: &str) -> String {
    let mut out = format!("{}/**\n", indent);
    for line in lines {
        let line = line.replace("*/", "*\\/");
        if line.trim().is_empty() {
            out.push_str(&format!("{} *\n", indent));
        } else {
            out.push_str(&format!("{} * {}\n", indent, line.trim_end()));
        }
    }
    out.push_str(&format!("{} */", indent));
    out
}

/// Double-quoted string literal
pub fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

/// Object key, quoted when it is not a plain identifier
fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn member_access(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, quote(name))
    }
}
