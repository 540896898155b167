/*!
# Tree Pattern Matching Utilities

Read-only predicates over `NodeRef`, with combinators and a walker that
searches a subtree. Recipes use these for their applicability tests and
guards; rewriting itself goes through `TreeVisitor`.
*/

use crate::ast::*;

/// Pattern matcher for tree nodes
pub trait AstPattern {
    /// Check if this pattern matches the given node
    fn matches(&self, node: NodeRef<'_>) -> bool;
}

/// Pattern matcher utility
pub struct PatternMatcher;

impl PatternMatcher {
    /// Match any node satisfying a predicate
    pub fn node_type<F>(predicate: F) -> impl AstPattern
    where
        F: Fn(NodeRef<'_>) -> bool,
    {
        NodeTypeMatcher { predicate }
    }

    /// Match nodes of one kind
    pub fn kind(kind: NodeKind) -> impl AstPattern {
        Self::node_type(move |node| node.kind() == kind)
    }

    /// Match class declarations by simple name
    pub fn class_named(name: &str) -> ClassNameMatcher {
        ClassNameMatcher {
            name: name.to_string(),
        }
    }

    /// Match field declarations with exactly one declarator of this name
    pub fn field_named(name: &str) -> FieldNameMatcher {
        FieldNameMatcher {
            name: name.to_string(),
        }
    }

    /// Match method calls by method name
    pub fn method_call_named(name: &str) -> CallNameMatcher {
        CallNameMatcher {
            name: name.to_string(),
        }
    }

    /// Match non-static imports from a package
    pub fn import_from(package: &str) -> ImportPackageMatcher {
        ImportPackageMatcher {
            package: package.to_string(),
        }
    }

    /// Combine patterns with AND logic
    pub fn all<P1: AstPattern, P2: AstPattern>(p1: P1, p2: P2) -> AndPattern<P1, P2> {
        AndPattern { p1, p2 }
    }

    /// Combine patterns with OR logic
    pub fn any<P1: AstPattern, P2: AstPattern>(p1: P1, p2: P2) -> OrPattern<P1, P2> {
        OrPattern { p1, p2 }
    }

    /// Negate a pattern
    pub fn not<P: AstPattern>(pattern: P) -> NotPattern<P> {
        NotPattern { pattern }
    }
}

/// Generic node type matcher
struct NodeTypeMatcher<F>
where
    F: Fn(NodeRef<'_>) -> bool,
{
    predicate: F,
}

impl<F> AstPattern for NodeTypeMatcher<F>
where
    F: Fn(NodeRef<'_>) -> bool,
{
    fn matches(&self, node: NodeRef<'_>) -> bool {
        (self.predicate)(node)
    }
}

/// Class name matcher
pub struct ClassNameMatcher {
    name: String,
}

impl AstPattern for ClassNameMatcher {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        matches!(node, NodeRef::Class(class) if class.name == self.name)
    }
}

/// Single-declarator field matcher
pub struct FieldNameMatcher {
    name: String,
}

impl AstPattern for FieldNameMatcher {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        matches!(node, NodeRef::Field(field) if field.single_name() == Some(self.name.as_str()))
    }
}

/// Method call name matcher
pub struct CallNameMatcher {
    name: String,
}

impl AstPattern for CallNameMatcher {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        matches!(node, NodeRef::Expression(Expr::MethodCall(call)) if call.name == self.name)
    }
}

/// Import package matcher
pub struct ImportPackageMatcher {
    package: String,
}

impl AstPattern for ImportPackageMatcher {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        matches!(node, NodeRef::Import(import) if !import.is_static && import.package_name() == self.package)
    }
}

/// AND pattern combinator
pub struct AndPattern<P1: AstPattern, P2: AstPattern> {
    p1: P1,
    p2: P2,
}

impl<P1: AstPattern, P2: AstPattern> AstPattern for AndPattern<P1, P2> {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        self.p1.matches(node) && self.p2.matches(node)
    }
}

/// OR pattern combinator
pub struct OrPattern<P1: AstPattern, P2: AstPattern> {
    p1: P1,
    p2: P2,
}

impl<P1: AstPattern, P2: AstPattern> AstPattern for OrPattern<P1, P2> {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        self.p1.matches(node) || self.p2.matches(node)
    }
}

/// NOT pattern combinator
pub struct NotPattern<P: AstPattern> {
    pattern: P,
}

impl<P: AstPattern> AstPattern for NotPattern<P> {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        !self.pattern.matches(node)
    }
}

/// Utility for deep tree traversal and pattern matching
pub struct TreeWalker;

impl TreeWalker {
    /// Find all nodes matching a pattern, in pre-order
    pub fn find_all<'a, P: AstPattern>(node: NodeRef<'a>, pattern: &P) -> Vec<NodeRef<'a>> {
        let mut matches = Vec::new();
        Self::find_all_recursive(node, pattern, &mut matches);
        matches
    }

    /// Find the first node matching a pattern, in pre-order
    pub fn find_first<'a, P: AstPattern>(node: NodeRef<'a>, pattern: &P) -> Option<NodeRef<'a>> {
        if pattern.matches(node) {
            return Some(node);
        }
        Self::children(node)
            .into_iter()
            .find_map(|child| Self::find_first(child, pattern))
    }

    fn find_all_recursive<'a, P: AstPattern>(
        node: NodeRef<'a>,
        pattern: &P,
        matches: &mut Vec<NodeRef<'a>>,
    ) {
        if pattern.matches(node) {
            matches.push(node);
        }
        for child in Self::children(node) {
            Self::find_all_recursive(child, pattern, matches);
        }
    }

    /// Direct children in declaration order
    pub fn children(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
        match node {
            NodeRef::CompilationUnit(unit) => unit
                .imports
                .iter()
                .map(NodeRef::Import)
                .chain(unit.types.iter().map(NodeRef::Class))
                .collect(),
            NodeRef::Import(_) => Vec::new(),
            NodeRef::Class(class) => class.body.iter().map(NodeRef::from_member).collect(),
            NodeRef::Field(field) => declarator_children(&field.vars),
            NodeRef::Method(method) => method
                .body
                .iter()
                .flat_map(|block| block.statements.iter().map(NodeRef::Statement))
                .collect(),
            NodeRef::Initializer(init) => init.body.statements.iter().map(NodeRef::Statement).collect(),
            NodeRef::Statement(statement) => statement_children(statement),
            NodeRef::Expression(expr) => expression_children(expr)
                .into_iter()
                .map(NodeRef::Expression)
                .collect(),
        }
    }
}

fn declarator_children(vars: &[VarDeclarator]) -> Vec<NodeRef<'_>> {
    vars.iter()
        .filter_map(|var| var.init.as_ref().map(NodeRef::Expression))
        .collect()
}

fn statement_children(statement: &Statement) -> Vec<NodeRef<'_>> {
    match statement {
        Statement::LocalVar { vars, .. } => declarator_children(vars),
        Statement::Expression(expr) | Statement::Throw(expr) => vec![NodeRef::Expression(expr)],
        Statement::Return(value) => value.iter().map(NodeRef::Expression).collect(),
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut children = vec![
                NodeRef::Expression(condition),
                NodeRef::Statement(then_branch.as_ref()),
            ];
            if let Some(branch) = else_branch {
                children.push(NodeRef::Statement(branch.as_ref()));
            }
            children
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => init
            .iter()
            .map(NodeRef::Statement)
            .chain(condition.iter().map(NodeRef::Expression))
            .chain(update.iter().map(NodeRef::Expression))
            .chain(std::iter::once(NodeRef::Statement(body.as_ref())))
            .collect(),
        Statement::ForEach { iterable, body, .. } => vec![
            NodeRef::Expression(iterable),
            NodeRef::Statement(body.as_ref()),
        ],
        Statement::While { condition, body } | Statement::DoWhile { body, condition } => vec![
            NodeRef::Expression(condition),
            NodeRef::Statement(body.as_ref()),
        ],
        Statement::Try {
            resources,
            body,
            catches,
            finally,
        } => resources
            .iter()
            .chain(&body.statements)
            .chain(catches.iter().flat_map(|catch| &catch.body.statements))
            .chain(finally.iter().flat_map(|block| &block.statements))
            .map(NodeRef::Statement)
            .collect(),
        Statement::Switch { selector, cases } => std::iter::once(NodeRef::Expression(selector))
            .chain(cases.iter().flat_map(|case| {
                case.labels
                    .iter()
                    .map(NodeRef::Expression)
                    .chain(case.body.iter().map(NodeRef::Statement))
            }))
            .collect(),
        Statement::Synchronized { lock, body } => std::iter::once(NodeRef::Expression(lock))
            .chain(body.statements.iter().map(NodeRef::Statement))
            .collect(),
        Statement::Labeled { body, .. } => vec![NodeRef::Statement(body.as_ref())],
        Statement::Assert { condition, message } => std::iter::once(condition)
            .chain(message.iter())
            .map(NodeRef::Expression)
            .collect(),
        Statement::Block(block) => block.statements.iter().map(NodeRef::Statement).collect(),
        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Comment(_)
        | Statement::Raw(_) => Vec::new(),
    }
}

fn expression_children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Literal(_) | Expr::Ident(_) => Vec::new(),
        Expr::FieldAccess { target, .. } => vec![target.as_ref()],
        Expr::ArrayAccess { array, index } => vec![array.as_ref(), index.as_ref()],
        Expr::MethodCall(call) => call
            .target
            .iter()
            .map(|target| target.as_ref())
            .chain(call.args.iter())
            .collect(),
        Expr::New { args, .. } => args.iter().collect(),
        Expr::NewArray { dims, init, .. } => dims
            .iter()
            .chain(init.iter().flat_map(|values| values.iter()))
            .collect(),
        Expr::ArrayInit(values) => values.iter().collect(),
        Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } => vec![operand.as_ref()],
        Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        Expr::Assign { target, value, .. } => vec![target.as_ref(), value.as_ref()],
        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => vec![condition.as_ref(), then_expr.as_ref(), else_expr.as_ref()],
        Expr::Cast { expr, .. } => vec![expr.as_ref()],
        Expr::Paren(inner) => vec![inner.as_ref()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaParser, Parser};

    fn unit() -> CompilationUnit {
        JavaParser::new()
            .parse(
                r#"package a;
import org.apache.commons.lang.RandomStringUtils;
public class RandomUtil {
    private static final SecureRandom SECURE_RANDOM = new SecureRandom();
    private static final int A = 1, B = 2;
    static String key() {
        return RandomStringUtils.randomNumeric(size(20));
    }
}
"#,
            )
            .expect("parse")
    }

    #[test]
    fn test_find_all_calls() {
        let unit = unit();
        let calls = TreeWalker::find_all(
            NodeRef::CompilationUnit(&unit),
            &PatternMatcher::kind(NodeKind::MethodCall),
        );
        let names: Vec<_> = calls
            .iter()
            .filter_map(|node| match node {
                NodeRef::Expression(Expr::MethodCall(call)) => Some(call.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["randomNumeric", "size"]);
    }

    #[test]
    fn test_field_named_requires_single_declarator() {
        let unit = unit();
        let root = NodeRef::CompilationUnit(&unit);
        assert!(TreeWalker::find_first(root, &PatternMatcher::field_named("SECURE_RANDOM")).is_some());
        assert!(TreeWalker::find_first(root, &PatternMatcher::field_named("A")).is_none());
    }

    #[test]
    fn test_combinators() {
        let unit = unit();
        let class = NodeRef::Class(&unit.types[0]);

        let target = PatternMatcher::all(
            PatternMatcher::class_named("RandomUtil"),
            PatternMatcher::not(PatternMatcher::class_named("Other")),
        );
        assert!(target.matches(class));

        let either = PatternMatcher::any(
            PatternMatcher::class_named("Other"),
            PatternMatcher::method_call_named("size"),
        );
        assert!(!either.matches(class));
        assert!(TreeWalker::find_first(class, &either).is_some());

        let legacy = PatternMatcher::import_from("org.apache.commons.lang");
        assert!(legacy.matches(NodeRef::Import(&unit.imports[0])));
        assert!(!legacy.matches(NodeRef::Import(&Import::new(
            "org.apache.commons.lang3.RandomStringUtils"
        ))));
    }

    #[test]
    fn test_find_calls_under_control_flow() {
        let unit = JavaParser::new()
            .parse(
                r#"class Keys {
    String key(int n) {
        try {
            for (int i = 0; i < n; i++) {
                warm(i);
            }
        } finally {
            switch (n) {
                case 0:
                    reset();
            }
        }
        while (busy()) {
            synchronized (lock()) {
                return build();
            }
        }
        return null;
    }
}
"#,
            )
            .expect("parse");
        let calls = TreeWalker::find_all(
            NodeRef::CompilationUnit(&unit),
            &PatternMatcher::kind(NodeKind::MethodCall),
        );
        let mut names: Vec<_> = calls
            .iter()
            .filter_map(|node| match node {
                NodeRef::Expression(Expr::MethodCall(call)) => Some(call.name.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["build", "busy", "lock", "reset", "warm"]);
    }
}
