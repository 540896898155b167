/*!
# Legacy Call Matching

Shape matching for the legacy random-string calls. A call matches when it
resolves to a known `RandomStringUtils` type and its name and arguments fit
one of the signatures below. Arguments that are not literals are accepted;
literals must fit the parameter type.

A call resolves either through its target (`RandomStringUtils.random(..)`,
simple or fully qualified) or, without a target, through a static import of
the method or of `RandomStringUtils.*`. A method the unit declares itself
shadows a static import of the same name.
*/

use std::collections::HashSet;

use self::ParamShape::{Bool, CharArray, Int, Random, Str};
use crate::ast::{
    ClassDecl, CompilationUnit, Expr, LiteralKind, Member, MethodCall, NodeRef, UnaryOp,
};
use crate::tracer::patterns::AstPattern;

pub const LEGACY_NAMESPACE: &str = "org.apache.commons.lang";
pub const MODERN_NAMESPACE: &str = "org.apache.commons.lang3";
pub const RANDOM_STRING_UTILS: &str = "RandomStringUtils";

/// Parameter type of a legacy signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Int,
    Bool,
    CharArray,
    Str,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub params: &'static [ParamShape],
}

const fn sig(name: &'static str, params: &'static [ParamShape]) -> Signature {
    Signature { name, params }
}

/// Every overload that draws from the shared weak generator
pub const LEGACY_SIGNATURES: &[Signature] = &[
    sig("random", &[Int]),
    sig("random", &[Int, Bool, Bool]),
    sig("random", &[Int, CharArray]),
    sig("random", &[Int, Str]),
    sig("random", &[Int, Int, Int, Bool, Bool]),
    sig("random", &[Int, Int, Int, Bool, Bool, CharArray]),
    sig("random", &[Int, Int, Int, Bool, Bool, CharArray, Random]),
    sig("randomAlphanumeric", &[Int]),
    sig("randomAlphanumeric", &[Int, Int]),
    sig("randomAlphabetic", &[Int]),
    sig("randomAlphabetic", &[Int, Int]),
    sig("randomNumeric", &[Int]),
    sig("randomNumeric", &[Int, Int]),
    sig("randomAscii", &[Int]),
    sig("randomAscii", &[Int, Int]),
    sig("randomGraph", &[Int]),
    sig("randomGraph", &[Int, Int]),
    sig("randomPrint", &[Int]),
    sig("randomPrint", &[Int, Int]),
];

/// What can be told about an argument without type information
enum ArgKind {
    Literal(LiteralKind),
    CharArray,
    Unknown,
}

fn classify(arg: &Expr) -> ArgKind {
    match arg {
        Expr::Literal(literal) => ArgKind::Literal(literal.kind),
        Expr::Paren(inner) => classify(inner),
        Expr::Unary {
            op: UnaryOp::Negate | UnaryOp::Plus,
            operand,
        } => match classify(operand) {
            numeric @ ArgKind::Literal(LiteralKind::Int | LiteralKind::Float) => numeric,
            _ => ArgKind::Unknown,
        },
        Expr::NewArray { element, .. } if element.name == "char" => ArgKind::CharArray,
        Expr::ArrayInit(_) => ArgKind::CharArray,
        _ => ArgKind::Unknown,
    }
}

impl ParamShape {
    pub fn accepts(&self, arg: &Expr) -> bool {
        match classify(arg) {
            ArgKind::Unknown => true,
            ArgKind::CharArray => *self == CharArray,
            ArgKind::Literal(kind) => matches!(
                (self, kind),
                (Int, LiteralKind::Int | LiteralKind::Char)
                    | (Bool, LiteralKind::Boolean)
                    | (CharArray | Str | Random, LiteralKind::Null)
                    | (Str, LiteralKind::String)
            ),
        }
    }
}

impl Signature {
    pub fn accepts(&self, call: &MethodCall) -> bool {
        call.name == self.name
            && call.args.len() == self.params.len()
            && self
                .params
                .iter()
                .zip(&call.args)
                .all(|(shape, arg)| shape.accepts(arg))
    }
}

fn utils_types() -> [String; 2] {
    [LEGACY_NAMESPACE, MODERN_NAMESPACE].map(|ns| format!("{ns}.{RANDOM_STRING_UTILS}"))
}

fn collect_method_names(classes: &[ClassDecl], names: &mut HashSet<String>) {
    for class in classes {
        for member in &class.body {
            match member {
                Member::Method(method) => {
                    names.insert(method.name.clone());
                }
                Member::Class(inner) => collect_method_names(std::slice::from_ref(inner), names),
                Member::Field(_) | Member::Initializer(_) => {}
            }
        }
    }
}

/// Matches legacy calls in one compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCallMatcher {
    /// Whether the simple name `RandomStringUtils` refers to a Commons Lang type
    simple_name_resolves: bool,
    /// Legacy methods callable without a target through static imports
    static_names: HashSet<String>,
}

impl LegacyCallMatcher {
    pub fn for_unit(unit: &CompilationUnit) -> Self {
        let known_packages = [LEGACY_NAMESPACE, MODERN_NAMESPACE];
        let imported = unit.imports.iter().any(|import| {
            !import.is_static
                && known_packages.contains(&import.package_name())
                && (import.is_wildcard() || import.simple_name() == Some(RANDOM_STRING_UTILS))
        });
        let same_package = unit
            .package
            .as_ref()
            .is_some_and(|p| known_packages.contains(&p.name.as_str()));

        let mut declared = HashSet::new();
        collect_method_names(&unit.types, &mut declared);

        let types = utils_types();
        let mut static_names = HashSet::new();
        for import in unit.imports.iter().filter(|import| import.is_static) {
            if !types.iter().any(|ty| ty == import.package_name()) {
                continue;
            }
            let names: Vec<&str> = match import.simple_name() {
                Some(name) => vec![name],
                None => LEGACY_SIGNATURES.iter().map(|sig| sig.name).collect(),
            };
            static_names.extend(
                names
                    .into_iter()
                    .filter(|name| !declared.contains(*name))
                    .map(str::to_string),
            );
        }

        Self {
            simple_name_resolves: imported || same_package,
            static_names,
        }
    }

    fn target_resolves(&self, target: &Expr) -> bool {
        match target.qualified_name() {
            Some(name) if name == RANDOM_STRING_UTILS => self.simple_name_resolves,
            Some(name) => utils_types().contains(&name),
            None => false,
        }
    }

    pub fn matches_call(&self, call: &MethodCall) -> bool {
        let resolves = match call.target.as_deref() {
            Some(target) => self.target_resolves(target),
            None => self.static_names.contains(&call.name),
        };
        resolves && LEGACY_SIGNATURES.iter().any(|sig| sig.accepts(call))
    }

    /// Whether unparsed source text may hold a legacy call
    ///
    /// Text-level check for statements kept verbatim; errs on the side of
    /// reporting a mention.
    pub fn mentioned_in(&self, text: &str) -> bool {
        let qualified = utils_types()
            .iter()
            .any(|ty| text.contains(&format!("{ty}.")));
        let simple =
            self.simple_name_resolves && text.contains(&format!("{RANDOM_STRING_UTILS}."));
        let imported = self
            .static_names
            .iter()
            .any(|name| text.contains(&format!("{name}(")));
        qualified || simple || imported
    }
}

impl AstPattern for LegacyCallMatcher {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        matches!(node, NodeRef::Expression(Expr::MethodCall(call)) if self.matches_call(call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaParser, Parser};

    fn matcher(imports: &str) -> LegacyCallMatcher {
        let source = format!("package a;\n{imports}\nclass A {{\n}}\n");
        LegacyCallMatcher::for_unit(&JavaParser::new().parse(&source).expect("parse"))
    }

    fn call(text: &str) -> MethodCall {
        match JavaParser::new().parse_expression(text).expect("expression") {
            Expr::MethodCall(call) => call,
            other => panic!("not a call: {other:?}"),
        }
    }

    #[test]
    fn test_imported_simple_name() {
        let legacy = matcher("import org.apache.commons.lang.RandomStringUtils;");
        assert!(legacy.matches_call(&call("RandomStringUtils.randomAlphanumeric(count)")));
        assert!(legacy.matches_call(&call("RandomStringUtils.randomNumeric(DEF_COUNT)")));
        assert!(legacy.matches_call(&call("RandomStringUtils.random(5, 'a', 'z', true, false)")));

        let modern = matcher("import org.apache.commons.lang3.*;");
        assert!(modern.matches_call(&call("RandomStringUtils.randomAlphabetic(1, 10)")));
    }

    #[test]
    fn test_unresolved_simple_name() {
        let none = matcher("import com.example.RandomStringUtils;");
        assert!(!none.matches_call(&call("RandomStringUtils.randomAlphanumeric(count)")));
        assert!(none.matches_call(&call(
            "org.apache.commons.lang3.RandomStringUtils.randomAlphanumeric(count)"
        )));
    }

    #[test]
    fn test_shape_mismatch() {
        let legacy = matcher("import org.apache.commons.lang.RandomStringUtils;");
        assert!(!legacy.matches_call(&call("RandomStringUtils.randomAlphanumeric(\"x\")")));
        assert!(!legacy.matches_call(&call("RandomStringUtils.randomAlphanumeric(1, 2, 3)")));
        assert!(!legacy.matches_call(&call("RandomStringUtils.shuffle(count)")));
        assert!(!legacy.matches_call(&call("randomAlphanumeric(count)")));
        assert!(legacy.matches_call(&call("RandomStringUtils.random(8, new char[]{'a', 'b'})")));
        assert!(legacy.matches_call(&call("RandomStringUtils.random(8, \"abc\")")));
        assert!(!legacy.matches_call(&call("RandomStringUtils.random(8, true)")));
    }

    #[test]
    fn test_pattern_over_node_ref() {
        let legacy = matcher("import org.apache.commons.lang.RandomStringUtils;");
        let expr = Expr::MethodCall(call("RandomStringUtils.randomAscii(4)"));
        assert!(legacy.matches(NodeRef::Expression(&expr)));
        assert!(!legacy.matches(NodeRef::Expression(&Expr::ident("RandomStringUtils"))));
    }

    #[test]
    fn test_static_imports() {
        let single =
            matcher("import static org.apache.commons.lang3.RandomStringUtils.randomAlphanumeric;");
        assert!(single.matches_call(&call("randomAlphanumeric(8)")));
        assert!(!single.matches_call(&call("randomNumeric(8)")));
        assert!(!single.matches_call(&call("randomAlphanumeric(\"x\")")));

        let wildcard = matcher("import static org.apache.commons.lang.RandomStringUtils.*;");
        assert!(wildcard.matches_call(&call("randomNumeric(4)")));
        assert!(wildcard.matches_call(&call("random(6, true, false)")));
        assert!(!wildcard.matches_call(&call("shuffle(4)")));

        let other = matcher("import static com.example.RandomStringUtils.randomAlphanumeric;");
        assert!(!other.matches_call(&call("randomAlphanumeric(8)")));
    }

    #[test]
    fn test_local_method_shadows_static_import() {
        let source = "package a;\nimport static org.apache.commons.lang3.RandomStringUtils.*;\nclass A {\n    static String randomNumeric(int n) {\n        return null;\n    }\n}\n";
        let unit = JavaParser::new().parse(source).expect("parse");
        let matcher = LegacyCallMatcher::for_unit(&unit);
        assert!(!matcher.matches_call(&call("randomNumeric(4)")));
        assert!(matcher.matches_call(&call("randomAlphabetic(4)")));
    }

    #[test]
    fn test_mentioned_in_text() {
        let legacy = matcher("import org.apache.commons.lang.RandomStringUtils;");
        assert!(legacy.mentioned_in("run(() -> RandomStringUtils.randomNumeric(4));"));
        assert!(!legacy.mentioned_in("run(() -> compute(4));"));

        let imported =
            matcher("import static org.apache.commons.lang3.RandomStringUtils.randomAscii;");
        assert!(imported.mentioned_in("run(() -> randomAscii(4));"));
        assert!(!imported.mentioned_in("run(() -> RandomStringUtils.shuffle(s));"));
        assert!(imported.mentioned_in(
            "run(() -> org.apache.commons.lang3.RandomStringUtils.randomAscii(4));"
        ));
    }
}
