// Source code generation from the tree
// Layout comes from the `Layout` carried by members and imports; everything
// else (indentation, spacing around operators) is fixed. Comments are
// re-indented to their node: continuation lines of a block comment are
// aligned on their leading `*`.

use super::*;

const INDENT: &str = "    ";

/// Trait for types that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

fn join<T: ToSource>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_source())
        .collect::<Vec<_>>()
        .join(separator)
}

fn modifiers_prefix(modifiers: &[Modifier]) -> String {
    modifiers
        .iter()
        .map(|m| format!("{} ", m.as_str()))
        .collect()
}

fn push_blank_lines(out: &mut String, layout: &Layout) {
    for _ in 0..layout.blank_lines {
        out.push('\n');
    }
}

fn push_comments(out: &mut String, comments: &[String], level: usize) {
    for comment in comments {
        for (i, line) in comment.lines().enumerate() {
            let line = if i == 0 { line.trim_end() } else { line.trim() };
            if !line.is_empty() {
                out.push_str(&indent(level));
                if i > 0 && line.starts_with('*') {
                    out.push(' ');
                }
                out.push_str(line);
            }
            out.push('\n');
        }
    }
}

fn push_annotations(out: &mut String, annotations: &[Annotation], level: usize) {
    for annotation in annotations {
        out.push_str(&indent(level));
        out.push_str(&annotation.0);
        out.push('\n');
    }
}

impl ToSource for CompilationUnit {
    fn to_source(&self) -> String {
        let mut out = String::new();

        if let Some(package) = &self.package {
            push_comments(&mut out, &package.comments, 0);
            out.push_str(&format!("package {};\n", package.name));
        }

        for (i, import) in self.imports.iter().enumerate() {
            if i == 0 {
                if !out.is_empty() {
                    out.push('\n');
                }
            } else {
                push_blank_lines(&mut out, &import.layout);
            }
            push_comments(&mut out, &import.layout.comments, 0);
            out.push_str(&import.to_source());
            out.push('\n');
        }

        for class in &self.types {
            if !out.is_empty() {
                out.push('\n');
            }
            write_class(&mut out, class, 0);
        }

        out
    }
}

impl ToSource for Import {
    fn to_source(&self) -> String {
        if self.is_static {
            format!("import static {};", self.name)
        } else {
            format!("import {};", self.name)
        }
    }
}

impl ToSource for TypeRef {
    fn to_source(&self) -> String {
        let mut out = self.name.clone();
        if self.diamond {
            out.push_str("<>");
        } else if !self.args.is_empty() {
            out.push('<');
            out.push_str(&join(&self.args, ", "));
            out.push('>');
        }
        for _ in 0..self.dims {
            out.push_str("[]");
        }
        out
    }
}

impl ToSource for ClassDecl {
    fn to_source(&self) -> String {
        let mut out = String::new();
        write_class(&mut out, self, 0);
        out
    }
}

impl ToSource for Member {
    fn to_source(&self) -> String {
        let mut out = String::new();
        write_member(&mut out, self, 0);
        out
    }
}

fn write_class(out: &mut String, class: &ClassDecl, level: usize) {
    push_comments(out, &class.layout.comments, level);
    push_annotations(out, &class.annotations, level);
    out.push_str(&indent(level));
    out.push_str(&modifiers_prefix(&class.modifiers));
    out.push_str(match class.kind {
        ClassKind::Class => "class ",
        ClassKind::Interface => "interface ",
    });
    out.push_str(&class.name);
    if let Some(params) = &class.type_params {
        out.push_str(params);
    }
    if !class.extends.is_empty() {
        out.push_str(" extends ");
        out.push_str(&join(&class.extends, ", "));
    }
    if !class.implements.is_empty() {
        out.push_str(" implements ");
        out.push_str(&join(&class.implements, ", "));
    }
    out.push_str(" {\n");

    for member in &class.body {
        push_blank_lines(out, member.layout());
        write_member(out, member, level + 1);
    }
    push_comments(out, &class.trailing_comments, level + 1);

    out.push_str(&indent(level));
    out.push_str("}\n");
}

fn write_member(out: &mut String, member: &Member, level: usize) {
    match member {
        Member::Field(field) => {
            push_comments(out, &field.layout.comments, level);
            push_annotations(out, &field.annotations, level);
            out.push_str(&indent(level));
            out.push_str(&modifiers_prefix(&field.modifiers));
            out.push_str(&field.ty.to_source());
            out.push(' ');
            out.push_str(&join(&field.vars, ", "));
            out.push_str(";\n");
        }
        Member::Method(method) => write_method(out, method, level),
        Member::Initializer(init) => {
            push_comments(out, &init.layout.comments, level);
            out.push_str(&indent(level));
            if init.is_static {
                out.push_str("static ");
            }
            write_block(out, &init.body, level);
            out.push('\n');
        }
        Member::Class(class) => write_class(out, class, level),
    }
}

fn write_method(out: &mut String, method: &MethodDecl, level: usize) {
    push_comments(out, &method.layout.comments, level);
    push_annotations(out, &method.annotations, level);
    out.push_str(&indent(level));
    out.push_str(&modifiers_prefix(&method.modifiers));
    if let Some(params) = &method.type_params {
        out.push_str(params);
        out.push(' ');
    }
    if let Some(ret) = &method.return_type {
        out.push_str(&ret.to_source());
        out.push(' ');
    }
    out.push_str(&method.name);
    out.push('(');
    out.push_str(&join(&method.params, ", "));
    out.push(')');
    if !method.throws.is_empty() {
        out.push_str(" throws ");
        out.push_str(&join(&method.throws, ", "));
    }
    match &method.body {
        Some(body) => {
            out.push(' ');
            write_block(out, body, level);
            out.push('\n');
        }
        None => out.push_str(";\n"),
    }
}

/// Writes `{ ... }` without a trailing newline; the opening brace goes on
/// the current line and the closing brace at `level`
fn write_block(out: &mut String, block: &Block, level: usize) {
    out.push_str("{\n");
    write_statements(out, &block.statements, level + 1);
    out.push_str(&indent(level));
    out.push('}');
}

fn write_statements(out: &mut String, statements: &[Statement], level: usize) {
    for statement in statements {
        match statement {
            Statement::Comment(text) => push_comments(out, std::slice::from_ref(text), level),
            other => write_statement(out, other, level),
        }
    }
}

fn write_statement(out: &mut String, statement: &Statement, level: usize) {
    out.push_str(&indent(level));
    write_statement_inline(out, statement, level);
    out.push('\n');
}

/// Declaration head shared by locals, `for` initializers and resources
fn write_local_var(
    out: &mut String,
    modifiers: &[Modifier],
    ty: &TypeRef,
    vars: &[VarDeclarator],
) {
    out.push_str(&modifiers_prefix(modifiers));
    out.push_str(&ty.to_source());
    out.push(' ');
    out.push_str(&join(vars, ", "));
}

/// `for` initializers and try resources, which print without their `;`
fn write_clause(out: &mut String, statement: &Statement) {
    match statement {
        Statement::LocalVar { modifiers, ty, vars } => write_local_var(out, modifiers, ty, vars),
        Statement::Expression(expr) => out.push_str(&expr.to_source()),
        other => write_statement_inline(out, other, 0),
    }
}

fn write_clauses(out: &mut String, statements: &[Statement], separator: &str) {
    for (i, statement) in statements.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        write_clause(out, statement);
    }
}

/// Statement body without leading indentation or trailing newline
fn write_statement_inline(out: &mut String, statement: &Statement, level: usize) {
    match statement {
        Statement::LocalVar { modifiers, ty, vars } => {
            write_local_var(out, modifiers, ty, vars);
            out.push(';');
        }
        Statement::Expression(expr) => {
            out.push_str(&expr.to_source());
            out.push(';');
        }
        Statement::Return(None) => out.push_str("return;"),
        Statement::Return(Some(expr)) => {
            out.push_str("return ");
            out.push_str(&expr.to_source());
            out.push(';');
        }
        Statement::Throw(expr) => {
            out.push_str("throw ");
            out.push_str(&expr.to_source());
            out.push(';');
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str("if (");
            out.push_str(&condition.to_source());
            out.push(')');
            write_branch(out, then_branch, level);
            if let Some(else_branch) = else_branch {
                if matches!(then_branch.as_ref(), Statement::Block(_)) {
                    out.push(' ');
                } else {
                    out.push('\n');
                    out.push_str(&indent(level));
                }
                out.push_str("else");
                match else_branch.as_ref() {
                    Statement::If { .. } => {
                        out.push(' ');
                        write_statement_inline(out, else_branch, level);
                    }
                    other => write_branch(out, other, level),
                }
            }
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => {
            out.push_str("for (");
            write_clauses(out, init, ", ");
            out.push(';');
            if let Some(condition) = condition {
                out.push(' ');
                out.push_str(&condition.to_source());
            }
            out.push(';');
            if !update.is_empty() {
                out.push(' ');
                out.push_str(&join(update, ", "));
            }
            out.push(')');
            write_branch(out, body, level);
        }
        Statement::ForEach {
            modifiers,
            ty,
            name,
            iterable,
            body,
        } => {
            out.push_str("for (");
            out.push_str(&modifiers_prefix(modifiers));
            out.push_str(&format!("{} {name} : {})", ty.to_source(), iterable.to_source()));
            write_branch(out, body, level);
        }
        Statement::While { condition, body } => {
            out.push_str(&format!("while ({})", condition.to_source()));
            write_branch(out, body, level);
        }
        Statement::DoWhile { body, condition } => {
            out.push_str("do");
            write_branch(out, body, level);
            if matches!(body.as_ref(), Statement::Block(_)) {
                out.push(' ');
            } else {
                out.push('\n');
                out.push_str(&indent(level));
            }
            out.push_str(&format!("while ({});", condition.to_source()));
        }
        Statement::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            out.push_str("try ");
            if !resources.is_empty() {
                out.push('(');
                write_clauses(out, resources, "; ");
                out.push_str(") ");
            }
            write_block(out, body, level);
            for catch in catches {
                out.push_str(" catch (");
                out.push_str(&modifiers_prefix(&catch.modifiers));
                out.push_str(&join(&catch.types, " | "));
                out.push(' ');
                out.push_str(&catch.name);
                out.push_str(") ");
                write_block(out, &catch.body, level);
            }
            if let Some(finally) = finally {
                out.push_str(" finally ");
                write_block(out, finally, level);
            }
        }
        Statement::Switch { selector, cases } => {
            out.push_str(&format!("switch ({}) {{\n", selector.to_source()));
            for case in cases {
                out.push_str(&indent(level + 1));
                if case.is_default() {
                    out.push_str("default:\n");
                } else {
                    out.push_str(&format!("case {}:\n", join(&case.labels, ", ")));
                }
                write_statements(out, &case.body, level + 2);
            }
            out.push_str(&indent(level));
            out.push('}');
        }
        Statement::Synchronized { lock, body } => {
            out.push_str(&format!("synchronized ({}) ", lock.to_source()));
            write_block(out, body, level);
        }
        Statement::Labeled { label, body } => {
            out.push_str(label);
            out.push_str(": ");
            write_statement_inline(out, body, level);
        }
        Statement::Break(label) => match label {
            Some(label) => out.push_str(&format!("break {label};")),
            None => out.push_str("break;"),
        },
        Statement::Continue(label) => match label {
            Some(label) => out.push_str(&format!("continue {label};")),
            None => out.push_str("continue;"),
        },
        Statement::Assert { condition, message } => {
            out.push_str("assert ");
            out.push_str(&condition.to_source());
            if let Some(message) = message {
                out.push_str(" : ");
                out.push_str(&message.to_source());
            }
            out.push(';');
        }
        Statement::Block(block) => write_block(out, block, level),
        Statement::Empty => out.push(';'),
        Statement::Comment(text) | Statement::Raw(text) => out.push_str(text),
    }
}

fn write_branch(out: &mut String, branch: &Statement, level: usize) {
    match branch {
        Statement::Block(block) => {
            out.push(' ');
            write_block(out, block, level);
        }
        other => {
            out.push('\n');
            out.push_str(&indent(level + 1));
            write_statement_inline(out, other, level + 1);
        }
    }
}

impl ToSource for Statement {
    fn to_source(&self) -> String {
        let mut out = String::new();
        write_statement_inline(&mut out, self, 0);
        out
    }
}

impl ToSource for Param {
    fn to_source(&self) -> String {
        let mut out = String::new();
        for annotation in &self.annotations {
            out.push_str(&annotation.0);
            out.push(' ');
        }
        out.push_str(&modifiers_prefix(&self.modifiers));
        out.push_str(&self.ty.to_source());
        if self.varargs {
            out.push_str("...");
        }
        out.push(' ');
        out.push_str(&self.name);
        out
    }
}

impl ToSource for VarDeclarator {
    fn to_source(&self) -> String {
        let mut out = self.name.clone();
        for _ in 0..self.dims {
            out.push_str("[]");
        }
        if let Some(init) = &self.init {
            out.push_str(" = ");
            out.push_str(&init.to_source());
        }
        out
    }
}

impl ToSource for MethodCall {
    fn to_source(&self) -> String {
        let args = join(&self.args, ", ");
        match &self.target {
            Some(target) => format!("{}.{}({})", target.to_source(), self.name, args),
            None => format!("{}({})", self.name, args),
        }
    }
}

impl ToSource for Expr {
    fn to_source(&self) -> String {
        match self {
            Expr::Literal(literal) => literal.text.clone(),
            Expr::Ident(name) => name.clone(),
            Expr::FieldAccess { target, name } => format!("{}.{}", target.to_source(), name),
            Expr::ArrayAccess { array, index } => {
                format!("{}[{}]", array.to_source(), index.to_source())
            }
            Expr::MethodCall(call) => call.to_source(),
            Expr::New { ty, args } => format!("new {}({})", ty.to_source(), join(args, ", ")),
            Expr::NewArray {
                element,
                dims,
                extra_dims,
                init,
            } => {
                let mut out = format!("new {}", element.to_source());
                for dim in dims {
                    out.push_str(&format!("[{}]", dim.to_source()));
                }
                for _ in 0..*extra_dims {
                    out.push_str("[]");
                }
                if let Some(values) = init {
                    out.push_str(&format!("{{{}}}", join(values, ", ")));
                }
                out
            }
            Expr::ArrayInit(values) => format!("{{{}}}", join(values, ", ")),
            Expr::Unary { op, operand } => format!("{}{}", op.as_str(), operand.to_source()),
            Expr::Postfix { op, operand } => format!("{}{}", operand.to_source(), op.as_str()),
            Expr::Binary { op, left, right } => {
                format!("{} {} {}", left.to_source(), op.as_str(), right.to_source())
            }
            Expr::Assign { op, target, value } => {
                format!("{} {} {}", target.to_source(), op.as_str(), value.to_source())
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                condition.to_source(),
                then_expr.to_source(),
                else_expr.to_source()
            ),
            Expr::Cast { ty, expr } => format!("({}) {}", ty.to_source(), expr.to_source()),
            Expr::Paren(inner) => format!("({})", inner.to_source()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(target: &str, name: &str, args: Vec<Expr>) -> Expr {
        Expr::MethodCall(MethodCall {
            target: Some(Box::new(Expr::ident(target))),
            name: name.to_string(),
            args,
        })
    }

    #[test]
    fn test_expression_to_source() {
        let expr = call(
            "RandomStringUtils",
            "random",
            vec![
                Expr::ident("DEF_COUNT"),
                Expr::Literal(Literal::int(0)),
                Expr::Literal(Literal::boolean(true)),
                Expr::Literal(Literal::null()),
            ],
        );
        assert_eq!(
            expr.to_source(),
            "RandomStringUtils.random(DEF_COUNT, 0, true, null)"
        );

        let array = Expr::NewArray {
            element: TypeRef::simple("byte"),
            dims: vec![Expr::Literal(Literal::int(64))],
            extra_dims: 0,
            init: None,
        };
        assert_eq!(array.to_source(), "new byte[64]");
    }

    #[test]
    fn test_empty_constructor_layout() {
        let method = MethodDecl {
            layout: Layout::tight(),
            annotations: Vec::new(),
            modifiers: vec![Modifier::Private],
            type_params: None,
            return_type: None,
            name: "RandomUtil".to_string(),
            params: Vec::new(),
            throws: Vec::new(),
            body: Some(Block::default()),
        };
        let class = ClassDecl::new("RandomUtil")
            .with_modifiers(vec![Modifier::Public])
            .with_body(vec![Member::Method(method)]);

        assert_eq!(
            class.to_source(),
            "public class RandomUtil {\n    private RandomUtil() {\n    }\n}\n"
        );
    }

    #[test]
    fn test_if_else_chain() {
        let statement = Statement::If {
            condition: Expr::ident("a"),
            then_branch: Box::new(Statement::Block(Block::new(vec![Statement::Return(None)]))),
            else_branch: Some(Box::new(Statement::If {
                condition: Expr::ident("b"),
                then_branch: Box::new(Statement::Block(Block::default())),
                else_branch: None,
            })),
        };

        assert_eq!(
            statement.to_source(),
            "if (a) {\n    return;\n} else if (b) {\n}"
        );
    }

    #[test]
    fn test_comments_are_reindented() {
        let method = MethodDecl {
            layout: Layout::tight().with_comments(vec![
                "/**\n         * Key for a reset link.\n         *\n         */".to_string(),
                "// keep short".to_string(),
            ]),
            annotations: Vec::new(),
            modifiers: Vec::new(),
            type_params: None,
            return_type: Some(TypeRef::simple("String")),
            name: "key".to_string(),
            params: Vec::new(),
            throws: Vec::new(),
            body: Some(Block::new(vec![
                Statement::Comment("/* inline */".to_string()),
                Statement::Return(Some(Expr::ident("k"))),
            ])),
        };
        let class = ClassDecl::new("A").with_body(vec![Member::Method(method)]);

        assert_eq!(
            class.to_source(),
            "class A {\n    /**\n     * Key for a reset link.\n     *\n     */\n    // keep short\n    String key() {\n        /* inline */\n        return k;\n    }\n}\n"
        );
    }

    #[test]
    fn test_switch_layout() {
        let statement = Statement::Switch {
            selector: Expr::ident("n"),
            cases: vec![
                SwitchCase {
                    labels: vec![Expr::Literal(Literal::int(1)), Expr::Literal(Literal::int(2))],
                    body: vec![Statement::Break(None)],
                },
                SwitchCase {
                    labels: Vec::new(),
                    body: vec![Statement::Return(None)],
                },
            ],
        };
        assert_eq!(
            statement.to_source(),
            "switch (n) {\n    case 1, 2:\n        break;\n    default:\n        return;\n}"
        );
    }

    #[test]
    fn test_import_groups_are_separated_by_layout() {
        let unit = CompilationUnit {
            package: Some(PackageDecl::new("a.b")),
            imports: vec![
                Import::new("org.example.Util"),
                Import::new("java.util.List").with_layout(Layout::separated()),
            ],
            types: Vec::new(),
        };

        assert_eq!(
            unit.to_source(),
            "package a.b;\n\nimport org.example.Util;\n\nimport java.util.List;\n"
        );
    }
}
