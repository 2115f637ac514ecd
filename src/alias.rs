//! Alias table builder - maps each operation identifier to its generated request function.

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};
use crate::operation::{HttpMethod, OperationSpec};
use crate::route_tree::{module_binding, module_dir, split_path};

/// One operation identifier and the function it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub operation_id: String,
    /// Module directory relative to the routes root, empty for `/`
    pub module_dir: String,
    /// Namespace binding under which the alias module imports the target module
    pub module_binding: String,
    pub method: HttpMethod,
}

impl AliasEntry {
    /// `binding.symbol`, the expression the alias resolves to
    pub fn target(&self) -> String {
        format!("{}.{}", self.module_binding, self.method.symbol())
    }
}

/// Alias table
///
/// Entries keep the declaration order of the operations. Each target module is imported
/// once, however many aliases resolve into it.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    /// module dir -> namespace binding, in first-use order
    imports: IndexMap<String, String>,
}

impl AliasTable {
    /// Build the alias table.
    ///
    /// Operations without an identifier get no alias. An identifier used by two
    /// operations is reported as [`Error::DuplicateOperationId`].
    pub fn build(operations: &[OperationSpec]) -> Result<Self> {
        let mut table = AliasTable::default();
        let mut owners: IndexMap<&str, String> = IndexMap::new();

        for operation in operations {
            let Some(operation_id) = operation.operation_id.as_deref() else {
                debug!("{} has no operationId, skipping alias", operation.label());
                continue;
            };

            if let Some(first) = owners.get(operation_id) {
                return Err(Error::DuplicateOperationId {
                    operation_id: operation_id.to_string(),
                    first: first.clone(),
                    second: operation.label(),
                });
            }
            owners.insert(operation_id, operation.label());

            let segments = split_path(&operation.path)?;
            let dir = module_dir(&segments);
            let binding = table.import_binding(&dir, module_binding(&segments));

            table.entries.push(AliasEntry {
                operation_id: operation_id.to_string(),
                module_dir: dir,
                module_binding: binding,
                method: operation.method,
            });
        }

        debug!(
            "Built {} aliases over {} modules",
            table.entries.len(),
            table.imports.len()
        );
        Ok(table)
    }

    /// Binding for a module dir, allocated on first use.
    ///
    /// Distinct dirs can flatten to the same binding (`a-b` and `a_b`); later ones get a
    /// numeric suffix.
    fn import_binding(&mut self, dir: &str, preferred: String) -> String {
        if let Some(binding) = self.imports.get(dir) {
            return binding.clone();
        }

        let mut binding = preferred.clone();
        let mut n = 2;
        while self.imports.values().any(|taken| *taken == binding) {
            binding = format!("{}{}", preferred, n);
            n += 1;
        }

        self.imports.insert(dir.to_string(), binding.clone());
        binding
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    /// Imported modules as `(module dir, binding)` pairs
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports
            .iter()
            .map(|(dir, binding)| (dir.as_str(), binding.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(path: &str, method: HttpMethod, operation_id: &str) -> OperationSpec {
        OperationSpec::new(path, method).with_operation_id(operation_id)
    }

    fn entry<'a>(table: &'a AliasTable, operation_id: &str) -> &'a AliasEntry {
        table
            .entries()
            .iter()
            .find(|entry| entry.operation_id == operation_id)
            .unwrap_or_else(|| panic!("no alias {}", operation_id))
    }

    #[test]
    fn test_aliases_resolve_to_module_and_method() {
        let operations = vec![
            op("/pet", HttpMethod::Put, "updatePet"),
            op("/pet/{petId}", HttpMethod::Delete, "deletePet"),
            op("/store/order/{orderId}", HttpMethod::Get, "getOrderById"),
        ];
        let table = AliasTable::build(&operations).unwrap();

        assert_eq!(table.entries().len(), 3);
        assert_eq!(entry(&table, "updatePet").target(), "pet.put");
        assert_eq!(entry(&table, "deletePet").target(), "pet_$petId.del");
        let order = entry(&table, "getOrderById");
        assert_eq!(order.module_dir, "store/order/$orderId");
        assert_eq!(order.target(), "store_order_$orderId.get");
    }

    #[test]
    fn test_module_imports_are_deduplicated() {
        let operations = vec![
            op("/pet/{petId}", HttpMethod::Get, "getPetById"),
            op("/pet/{petId}", HttpMethod::Post, "updatePetWithForm"),
            op("/pet/{petId}", HttpMethod::Delete, "deletePet"),
            op("/pet", HttpMethod::Post, "addPet"),
        ];
        let table = AliasTable::build(&operations).unwrap();

        assert_eq!(table.entries().len(), 4);
        let imports: Vec<_> = table.imports().collect();
        assert_eq!(imports, vec![("pet/$petId", "pet_$petId"), ("pet", "pet")]);
    }

    #[test]
    fn test_duplicate_operation_id_is_a_conflict() {
        let operations = vec![
            op("/things/{id}", HttpMethod::Get, "getThing"),
            op("/other/thing", HttpMethod::Get, "getThing"),
        ];

        match AliasTable::build(&operations) {
            Err(Error::DuplicateOperationId {
                operation_id,
                first,
                second,
            }) => {
                assert_eq!(operation_id, "getThing");
                assert_eq!(first, "GET /things/{id}");
                assert_eq!(second, "GET /other/thing");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_operations_without_id_are_skipped() {
        let operations = vec![
            OperationSpec::new("/health", HttpMethod::Get),
            op("/", HttpMethod::Get, "getRoot"),
        ];
        let table = AliasTable::build(&operations).unwrap();

        assert_eq!(table.entries().len(), 1);
        let root = entry(&table, "getRoot");
        assert_eq!(root.module_dir, "");
        assert_eq!(root.target(), "root.get");
    }

    #[test]
    fn test_clashing_bindings_get_suffixed() {
        let operations = vec![
            op("/a-b", HttpMethod::Get, "first"),
            op("/a_b", HttpMethod::Get, "second"),
        ];
        let table = AliasTable::build(&operations).unwrap();

        assert_eq!(entry(&table, "first").module_binding, "a_b");
        assert_eq!(entry(&table, "second").module_binding, "a_b2");
    }

    #[test]
    fn test_bindings_are_valid_identifiers() {
        let operations = vec![
            op("/2fa", HttpMethod::Post, "enableTwoFactor"),
            op("/import", HttpMethod::Post, "importData"),
            op("/export/{format}", HttpMethod::Get, "exportData"),
        ];
        let table = AliasTable::build(&operations).unwrap();

        let two_factor = entry(&table, "enableTwoFactor");
        assert_eq!(two_factor.module_dir, "2fa");
        assert_eq!(two_factor.target(), "_2fa.post");
        assert_eq!(entry(&table, "importData").target(), "import_.post");
        assert_eq!(entry(&table, "exportData").target(), "export_$format.get");

        let imports: Vec<_> = table.imports().collect();
        assert_eq!(
            imports,
            vec![
                ("2fa", "_2fa"),
                ("import", "import_"),
                ("export/$format", "export_$format")
            ]
        );
    }

    #[test]
    fn test_dot_segment_path_is_rejected() {
        let operations = vec![op("/../escape", HttpMethod::Get, "escape")];

        assert!(matches!(
            AliasTable::build(&operations),
            Err(Error::InvalidPathSegment { segment, .. }) if segment == ".."
        ));
    }
}
