/*!
# Import Management

Imports are kept in three layout groups: third-party, then java/javax, then
static imports. Within a group new entries go in alphabetical order.
*/

use tracing::{debug, warn};

use crate::ast::{CompilationUnit, Import};

/// Layout group of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportGroup {
    ThirdParty,
    Jdk,
    Static,
}

impl ImportGroup {
    pub fn of(import: &Import) -> Self {
        if import.is_static {
            ImportGroup::Static
        } else if import.name.starts_with("java.") || import.name.starts_with("javax.") {
            ImportGroup::Jdk
        } else {
            ImportGroup::ThirdParty
        }
    }
}

fn package_of(fqn: &str) -> &str {
    fqn.rfind('.').map(|pos| &fqn[..pos]).unwrap_or("")
}

fn simple_name_of(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

/// Whether `fqn` can be referred to by simple name without a new import
pub fn is_in_scope(unit: &CompilationUnit, fqn: &str) -> bool {
    let package = package_of(fqn);
    package == "java.lang"
        || unit.package.as_ref().is_some_and(|p| p.name == package)
        || unit.imports.iter().any(|import| import.covers(fqn))
}

/// Add a single-type import for `fqn` unless it is already in scope
///
/// Idempotent: calling it twice yields the same unit as calling it once.
pub fn ensure_import(unit: CompilationUnit, fqn: &str) -> CompilationUnit {
    if is_in_scope(&unit, fqn) {
        return unit;
    }

    let simple_name = simple_name_of(fqn);
    if let Some(clash) = unit
        .imports
        .iter()
        .find(|import| !import.is_static && import.simple_name() == Some(simple_name))
    {
        warn!(import = %fqn, existing = %clash.name, "Import would clash with an existing import");
        return unit;
    }

    let new_import = Import::new(fqn);
    let key = (ImportGroup::of(&new_import), new_import.name.clone());
    let CompilationUnit {
        package,
        mut imports,
        types,
    } = unit;

    let index = imports
        .iter()
        .position(|import| (ImportGroup::of(import), import.name.clone()) > key)
        .unwrap_or(imports.len());
    imports.insert(index, new_import);
    relayout(&mut imports, index);
    if index + 1 < imports.len() {
        relayout(&mut imports, index + 1);
    }

    debug!(import = %fqn, position = index, "Added import");
    CompilationUnit {
        package,
        imports,
        types,
    }
}

/// Blank line when the group changes from the previous import
fn relayout(imports: &mut [Import], index: usize) {
    let blank_lines = match index.checked_sub(1).map(|prev| ImportGroup::of(&imports[prev])) {
        Some(prev_group) if prev_group == ImportGroup::of(&imports[index]) => 0,
        Some(_) => 1,
        None => 0,
    };
    imports[index].layout.blank_lines = blank_lines;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Layout, PackageDecl, ToSource};
    use pretty_assertions::assert_eq;

    fn unit(imports: &[&str]) -> CompilationUnit {
        CompilationUnit {
            package: Some(PackageDecl::new("io.moderne.service.util")),
            imports: imports.iter().map(|name| Import::new(*name)).collect(),
            types: Vec::new(),
        }
    }

    fn names(unit: &CompilationUnit) -> Vec<&str> {
        unit.imports.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_jdk_import_goes_after_third_party() {
        let result = ensure_import(
            unit(&["org.apache.commons.lang.RandomStringUtils"]),
            "java.security.SecureRandom",
        );
        assert_eq!(
            result.to_source(),
            "package io.moderne.service.util;\n\nimport org.apache.commons.lang.RandomStringUtils;\n\nimport java.security.SecureRandom;\n"
        );
    }

    #[test]
    fn test_ensure_import_is_idempotent() {
        let once = ensure_import(unit(&["java.util.List"]), "java.security.SecureRandom");
        let twice = ensure_import(once.clone(), "java.security.SecureRandom");
        assert_eq!(once, twice);
        assert_eq!(names(&once), vec!["java.security.SecureRandom", "java.util.List"]);
        assert_eq!(once.imports[1].layout, Layout::tight());
    }

    #[test]
    fn test_wildcard_and_implicit_scope() {
        let wildcard = unit(&["java.security.*"]);
        assert_eq!(ensure_import(wildcard.clone(), "java.security.SecureRandom"), wildcard);

        let empty = unit(&[]);
        assert_eq!(ensure_import(empty.clone(), "java.lang.String"), empty);
        assert_eq!(
            ensure_import(empty.clone(), "io.moderne.service.util.Helper"),
            empty
        );
    }

    #[test]
    fn test_third_party_inserted_before_jdk_group() {
        let result = ensure_import(
            unit(&["java.util.List"]),
            "org.apache.commons.lang3.RandomStringUtils",
        );
        assert_eq!(
            names(&result),
            vec!["org.apache.commons.lang3.RandomStringUtils", "java.util.List"]
        );
        assert_eq!(result.imports[0].layout, Layout::tight());
        assert_eq!(result.imports[1].layout, Layout::separated());
    }

    #[test]
    fn test_clashing_simple_name_is_left_alone() {
        let clash = unit(&["com.example.SecureRandom"]);
        assert_eq!(ensure_import(clash.clone(), "java.security.SecureRandom"), clash);
    }

    #[test]
    fn test_inserted_import_keeps_neighbour_comments() {
        let mut commented = unit(&["java.util.List"]);
        commented.imports[0].layout.comments = vec!["// collections".to_string()];

        let result = ensure_import(commented, "org.apache.commons.lang3.RandomStringUtils");
        assert_eq!(
            result.to_source(),
            "package io.moderne.service.util;\n\nimport org.apache.commons.lang3.RandomStringUtils;\n\n// collections\nimport java.util.List;\n"
        );
    }
}
