//! Route tree builder - turns the flat operation list into a hierarchy of route modules.
//!
//! Every URL path becomes a node keyed by its segments. Ancestors that declare no operation
//! of their own are synthesized as passthrough nodes, so that every node can be reached from
//! the root by following exported children.

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::error::{Error, Result};
use crate::operation::{HttpMethod, OperationSpec};

/// One segment of a URL path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// The root of the tree (`/`)
    Root,
    /// A literal segment (`pet`)
    Literal(String),
    /// A path parameter placeholder (`{petId}`), holding the parameter name
    Param(String),
}

impl Segment {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }

    /// Name under which the parent exports this segment's module.
    ///
    /// Parameter segments carry a `$` marker so they never clash with literal segments.
    pub fn symbol(&self) -> String {
        match self {
            Segment::Root => "routes".to_string(),
            Segment::Literal(name) => to_identifier(name),
            Segment::Param(name) => format!("${}", to_identifier(name)),
        }
    }

    /// Directory name of this segment's module
    pub fn dir_name(&self) -> String {
        match self {
            Segment::Root => String::new(),
            Segment::Literal(name) => name.clone(),
            Segment::Param(name) => format!("${}", name),
        }
    }
}

/// Split a URL path into segments, ignoring empty ones (`/pet/` == `/pet`).
///
/// Segments become directory names of the generated tree, so `.`, `..` and segments
/// containing a backslash are rejected.
pub fn split_path(path: &str) -> Result<Vec<Segment>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| {
            if raw == "." || raw == ".." || raw.contains('\\') {
                return Err(Error::InvalidPathSegment {
                    segment: raw.to_string(),
                    path: path.to_string(),
                });
            }
            Ok(Segment::parse(raw))
        })
        .collect()
}

/// Module directory of a path relative to the routes root (`pet/$petId`), empty for `/`
pub fn module_dir(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(Segment::dir_name)
        .collect::<Vec<_>>()
        .join("/")
}

/// Flat binding name for a module (`pet_$petId`), `root` for `/`
pub fn module_binding(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "root".to_string();
    }
    let joined: String = segments
        .iter()
        .map(Segment::dir_name)
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    escape_identifier(joined)
}

/// Normalize a segment into a camelCase identifier.
///
/// Separators (`-`, `.`, spaces, ...) are dropped and the following letter is upper-cased.
/// Applying the function to its own output returns it unchanged.
pub fn to_identifier(raw: &str) -> String {
    let mut ident = String::with_capacity(raw.len());
    let mut upper_next = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            if upper_next && !ident.is_empty() {
                ident.push(c.to_ascii_uppercase());
            } else {
                ident.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    escape_identifier(ident)
}

/// Make an `[A-Za-z0-9_$]*` string usable as a binding name
fn escape_identifier(mut ident: String) -> String {
    if ident.is_empty() {
        return "_".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED_WORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Words that cannot be used as a binding name in the generated modules
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// One symbol exported by a route module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// A direct child module, exported under the child's segment symbol
    Child { symbol: String },
    /// A request function for one operation at this node
    Method { symbol: &'static str, method: HttpMethod },
}

impl Export {
    pub fn symbol(&self) -> &str {
        match self {
            Export::Child { symbol } => symbol,
            Export::Method { symbol, .. } => symbol,
        }
    }
}

/// One node of the route tree
#[derive(Debug, Clone, PartialEq)]
pub struct RouteNode {
    pub segment: Segment,
    /// Normalized full path (`/pet/{petId}`, `/` for the root)
    pub path: String,
    /// Segments from the root down to this node
    pub segments: Vec<Segment>,
    /// Operations declared at exactly this path
    pub operations: Vec<OperationSpec>,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// A synthesized ancestor with no operation of its own
    pub fn is_passthrough(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn module_dir(&self) -> String {
        module_dir(&self.segments)
    }

    /// Export surface: one symbol per direct child, then one per operation
    pub fn exports(&self) -> Vec<Export> {
        self.children
            .iter()
            .map(|child| Export::Child {
                symbol: child.segment.symbol(),
            })
            .chain(self.operations.iter().map(|operation| Export::Method {
                symbol: operation.method.symbol(),
                method: operation.method,
            }))
            .collect()
    }

    /// Visit every node, children before their parent
    pub fn walk_post_order<'a>(&'a self, visit: &mut impl FnMut(&'a RouteNode)) {
        for child in &self.children {
            child.walk_post_order(visit);
        }
        visit(self);
    }

    /// Number of nodes in the subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(RouteNode::node_count)
            .sum::<usize>()
    }
}

/// Route tree builder
pub struct RouteTreeBuilder;

impl RouteTreeBuilder {
    /// Build the route tree for a flat operation list.
    ///
    /// Returns the root node; operations declared on `/` itself live on the root.
    pub fn build(operations: &[OperationSpec]) -> Result<RouteNode> {
        // Group operations by exact path, in insertion order
        let mut groups: IndexMap<Vec<Segment>, Vec<OperationSpec>> = IndexMap::new();
        for operation in operations {
            groups
                .entry(split_path(&operation.path)?)
                .or_default()
                .push(operation.clone());
        }

        // Every path is preceded by its strict prefixes, synthesized when not concrete
        let mut nodes: IndexSet<Vec<Segment>> = IndexSet::new();
        for segments in groups.keys() {
            for depth in 1..segments.len() {
                let prefix = segments[..depth].to_vec();
                if !groups.contains_key(&prefix) && !nodes.contains(&prefix) {
                    debug!("Synthesizing passthrough route {}", display_path(&prefix));
                }
                nodes.insert(prefix);
            }
            if !segments.is_empty() {
                nodes.insert(segments.clone());
            }
        }

        let root = Self::assemble(Vec::new(), Segment::Root, &groups, &nodes);
        Self::check_exports(&root)?;

        debug!("Built route tree with {} nodes", root.node_count());
        Ok(root)
    }

    fn assemble(
        segments: Vec<Segment>,
        segment: Segment,
        groups: &IndexMap<Vec<Segment>, Vec<OperationSpec>>,
        nodes: &IndexSet<Vec<Segment>>,
    ) -> RouteNode {
        let depth = segments.len();
        let children = nodes
            .iter()
            .filter(|candidate| candidate.len() == depth + 1 && candidate[..depth] == segments[..])
            .map(|candidate| {
                Self::assemble(candidate.clone(), candidate[depth].clone(), groups, nodes)
            })
            .collect();

        RouteNode {
            segment,
            path: display_path(&segments),
            operations: groups.get(&segments).cloned().unwrap_or_default(),
            segments,
            children,
        }
    }

    fn check_exports(node: &RouteNode) -> Result<()> {
        let mut seen = IndexSet::new();
        for export in node.exports() {
            if !seen.insert(export.symbol().to_string()) {
                return Err(Error::SymbolCollision {
                    path: node.path.clone(),
                    symbol: export.symbol().to_string(),
                });
            }
        }
        node.children.iter().try_for_each(Self::check_exports)
    }
}

fn display_path(segments: &[Segment]) -> String {
    let parts: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            Segment::Root => String::new(),
            Segment::Literal(name) => name.clone(),
            Segment::Param(name) => format!("{{{}}}", name),
        })
        .collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(path: &str, method: HttpMethod) -> OperationSpec {
        OperationSpec::new(path, method)
    }

    fn symbols(node: &RouteNode) -> Vec<String> {
        node.exports().iter().map(|e| e.symbol().to_string()).collect()
    }

    fn child_paths(node: &RouteNode) -> Vec<String> {
        node.children.iter().map(|c| c.path.clone()).collect()
    }

    /// Helper function to look a node up by path
    fn find<'a>(root: &'a RouteNode, path: &str) -> &'a RouteNode {
        let target = split_path(path).unwrap();
        let mut node = root;
        for (depth, segment) in target.iter().enumerate() {
            node = node
                .children
                .iter()
                .find(|child| &child.segments[depth] == segment)
                .unwrap_or_else(|| panic!("missing node {}", path));
        }
        node
    }

    #[test]
    fn test_segment_parsing() {
        assert_eq!(Segment::parse("pet"), Segment::Literal("pet".to_string()));
        assert_eq!(Segment::parse("{petId}"), Segment::Param("petId".to_string()));
        assert_eq!(Segment::parse("{petId}").symbol(), "$petId");
        assert_eq!(Segment::parse("{petId}").dir_name(), "$petId");
        assert_eq!(
            split_path("/pet//{petId}/").unwrap(),
            split_path("/pet/{petId}").unwrap()
        );
    }

    #[test]
    fn test_identifier_normalization_is_idempotent() {
        for raw in [
            "createWithList",
            "create-with-list",
            "v1.2",
            "2fa",
            "a b-c",
            "---",
            "$petId",
            "default",
        ] {
            let once = to_identifier(raw);
            assert_eq!(to_identifier(&once), once, "not idempotent for {:?}", raw);
        }
        assert_eq!(to_identifier("create-with-list"), "createWithList");
        assert_eq!(to_identifier("findByStatus"), "findByStatus");
        assert_eq!(to_identifier("2fa"), "_2fa");
        assert_eq!(to_identifier("---"), "_");
        assert_eq!(to_identifier("delete"), "delete_");
        assert_eq!(to_identifier(&to_identifier("delete")), "delete_");
    }

    #[test]
    fn test_module_naming() {
        let segments = split_path("/pet/{petId}/upload-image").unwrap();
        assert_eq!(module_dir(&segments), "pet/$petId/upload-image");
        assert_eq!(module_binding(&segments), "pet_$petId_upload_image");
        assert_eq!(module_binding(&[]), "root");
        assert_eq!(module_binding(&split_path("/2fa").unwrap()), "_2fa");
        assert_eq!(module_binding(&split_path("/import").unwrap()), "import_");
        assert_eq!(module_binding(&split_path("/v1/import").unwrap()), "v1_import");
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for path in ["/../escape", "/pet/./x", "/a\\b"] {
            match split_path(path) {
                Err(Error::InvalidPathSegment { path: p, .. }) => assert_eq!(p, path),
                other => panic!("expected invalid segment for {}, got {:?}", path, other),
            }
        }
        assert!(split_path("/pet/.well-known/..x").is_ok());

        let operations = vec![op("/files/..", HttpMethod::Get)];
        assert!(matches!(
            RouteTreeBuilder::build(&operations),
            Err(Error::InvalidPathSegment { .. })
        ));
    }

    #[test]
    fn test_concrete_parent_with_param_child() {
        let operations = vec![
            op("/pet", HttpMethod::Get),
            op("/pet", HttpMethod::Post),
            op("/pet/{petId}", HttpMethod::Get),
        ];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        assert_eq!(child_paths(&root), vec!["/pet"]);
        let pet = find(&root, "/pet");
        assert!(!pet.is_passthrough());
        assert_eq!(symbols(pet), vec!["$petId", "get", "post"]);

        let pet_id = find(&root, "/pet/{petId}");
        assert_eq!(symbols(pet_id), vec!["get"]);
        assert!(pet_id.children.is_empty());
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_missing_ancestors_are_synthesized() {
        let operations = vec![op("/store/order/{orderId}", HttpMethod::Get)];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        let store = find(&root, "/store");
        assert!(store.is_passthrough());
        assert_eq!(symbols(store), vec!["order"]);

        let order = find(&root, "/store/order");
        assert!(order.is_passthrough());
        assert_eq!(symbols(order), vec!["$orderId"]);

        let leaf = find(&root, "/store/order/{orderId}");
        assert_eq!(symbols(leaf), vec!["get"]);
    }

    #[test]
    fn test_every_prefix_has_a_node_and_children_are_exact() {
        let operations = vec![
            op("/a/b/c", HttpMethod::Get),
            op("/a/b/d", HttpMethod::Get),
            op("/a/{x}/c", HttpMethod::Get),
            op("/e", HttpMethod::Get),
        ];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        for path in ["/a", "/a/b", "/a/b/c", "/a/b/d", "/a/{x}", "/a/{x}/c", "/e"] {
            assert_eq!(find(&root, path).path, path);
        }
        assert_eq!(child_paths(&root), vec!["/a", "/e"]);
        assert_eq!(child_paths(find(&root, "/a")), vec!["/a/b", "/a/{x}"]);
        assert_eq!(
            child_paths(find(&root, "/a/b")),
            vec!["/a/b/c", "/a/b/d"]
        );
        assert_eq!(child_paths(find(&root, "/a/{x}")), vec!["/a/{x}/c"]);
    }

    #[test]
    fn test_literal_and_param_siblings_stay_distinct() {
        let operations = vec![
            op("/pet/findByTags", HttpMethod::Get),
            op("/pet/{petId}", HttpMethod::Get),
            op("/pet/{petId}", HttpMethod::Delete),
        ];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        let pet = find(&root, "/pet");
        assert_eq!(symbols(pet), vec!["findByTags", "$petId"]);
        assert_eq!(symbols(find(&root, "/pet/{petId}")), vec!["get", "del"]);
    }

    #[test]
    fn test_distinct_param_names_are_distinct_children() {
        let operations = vec![
            op("/user/{id}", HttpMethod::Get),
            op("/user/{name}/posts", HttpMethod::Get),
        ];
        let root = RouteTreeBuilder::build(&operations).unwrap();
        assert_eq!(symbols(find(&root, "/user")), vec!["$id", "$name"]);
    }

    #[test]
    fn test_root_operations_live_on_the_root() {
        let operations = vec![op("/", HttpMethod::Get), op("/health", HttpMethod::Get)];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        assert!(root.is_root());
        assert_eq!(root.path, "/");
        assert_eq!(symbols(&root), vec!["health", "get"]);
    }

    #[test]
    fn test_symbol_collision_is_reported() {
        let operations = vec![
            op("/a/foo-bar", HttpMethod::Get),
            op("/a/fooBar", HttpMethod::Get),
        ];
        match RouteTreeBuilder::build(&operations) {
            Err(Error::SymbolCollision { path, symbol }) => {
                assert_eq!(path, "/a");
                assert_eq!(symbol, "fooBar");
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_post_order_walk() {
        let operations = vec![
            op("/pet/{petId}", HttpMethod::Get),
            op("/store", HttpMethod::Get),
        ];
        let root = RouteTreeBuilder::build(&operations).unwrap();

        let mut visited = Vec::new();
        root.walk_post_order(&mut |node| visited.push(node.path.clone()));
        assert_eq!(visited, vec!["/pet/{petId}", "/pet", "/store", "/"]);
    }
}
