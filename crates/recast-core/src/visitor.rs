/*!
# Tree Visitor

Owned-in, owned-out traversal over the tree model. Every `visit_*` method
receives a node by value and returns its replacement; the default
implementations delegate to the `walk_*` functions, which rebuild the node
from its visited children.

Traversal is pre-order and follows declaration order: a unit's imports are
visited before its type declarations, class members in body order, call
targets and arguments before the call itself. Code that posts cursor
messages early in a unit relies on this order.

The cursor passed to a `visit_*` method already points at that node.
*/

use crate::ast::*;
use crate::cursor::{Cursor, Frame, TraversalPass};
use crate::Result;

pub trait TreeVisitor {
    fn visit_compilation_unit(
        &mut self,
        unit: CompilationUnit,
        cursor: &Cursor,
    ) -> Result<CompilationUnit> {
        walk_compilation_unit(self, unit, cursor)
    }

    fn visit_import(&mut self, import: Import, _cursor: &Cursor) -> Result<Import> {
        Ok(import)
    }

    fn visit_class(&mut self, class: ClassDecl, cursor: &Cursor) -> Result<ClassDecl> {
        walk_class(self, class, cursor)
    }

    fn visit_field(&mut self, field: FieldDecl, cursor: &Cursor) -> Result<FieldDecl> {
        walk_field(self, field, cursor)
    }

    fn visit_method(&mut self, method: MethodDecl, cursor: &Cursor) -> Result<MethodDecl> {
        walk_method(self, method, cursor)
    }

    fn visit_initializer(&mut self, init: Initializer, cursor: &Cursor) -> Result<Initializer> {
        walk_initializer(self, init, cursor)
    }

    fn visit_statement(&mut self, statement: Statement, cursor: &Cursor) -> Result<Statement> {
        walk_statement(self, statement, cursor)
    }

    fn visit_expression(&mut self, expr: Expr, cursor: &Cursor) -> Result<Expr> {
        walk_expression(self, expr, cursor)
    }

    /// Called once a call's target and arguments have been visited
    fn visit_method_call(&mut self, call: MethodCall, _cursor: &Cursor) -> Result<Expr> {
        Ok(Expr::MethodCall(call))
    }
}

/// Run a visitor over a whole unit inside `pass`
pub fn visit_unit<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    unit: CompilationUnit,
    pass: &TraversalPass,
) -> Result<CompilationUnit> {
    let cursor = pass
        .cursor()
        .descend(Frame::new(NodeKind::CompilationUnit));
    visitor.visit_compilation_unit(unit, &cursor)
}

fn expression_frame(expr: &Expr) -> Frame {
    match expr {
        Expr::MethodCall(call) => Frame::new(NodeKind::MethodCall).named(call.name.clone()),
        _ => Frame::new(NodeKind::Expression),
    }
}

fn visit_child_expression<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    expr: Expr,
    cursor: &Cursor,
) -> Result<Expr> {
    let child = cursor.descend(expression_frame(&expr));
    visitor.visit_expression(expr, &child)
}

fn visit_boxed<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    expr: Box<Expr>,
    cursor: &Cursor,
) -> Result<Box<Expr>> {
    visit_child_expression(visitor, *expr, cursor).map(Box::new)
}

fn visit_all<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    exprs: Vec<Expr>,
    cursor: &Cursor,
) -> Result<Vec<Expr>> {
    exprs
        .into_iter()
        .map(|expr| visit_child_expression(visitor, expr, cursor))
        .collect()
}

fn visit_child_statement<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    statement: Statement,
    cursor: &Cursor,
) -> Result<Statement> {
    let child = cursor.descend(Frame::new(NodeKind::Statement));
    visitor.visit_statement(statement, &child)
}

fn visit_branch<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    statement: Box<Statement>,
    cursor: &Cursor,
) -> Result<Box<Statement>> {
    visit_child_statement(visitor, *statement, cursor).map(Box::new)
}

fn visit_statements<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    statements: Vec<Statement>,
    cursor: &Cursor,
) -> Result<Vec<Statement>> {
    statements
        .into_iter()
        .map(|statement| visit_child_statement(visitor, statement, cursor))
        .collect()
}

fn walk_declarators<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    vars: Vec<VarDeclarator>,
    cursor: &Cursor,
) -> Result<Vec<VarDeclarator>> {
    vars.into_iter()
        .map(|var| {
            let init = var
                .init
                .map(|init| visit_child_expression(visitor, init, cursor))
                .transpose()?;
            Ok(VarDeclarator { init, ..var })
        })
        .collect()
}

pub fn walk_compilation_unit<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    unit: CompilationUnit,
    cursor: &Cursor,
) -> Result<CompilationUnit> {
    let CompilationUnit {
        package,
        imports,
        types,
    } = unit;

    let imports = imports
        .into_iter()
        .map(|import| {
            let child = cursor.descend(Frame::new(NodeKind::Import).named(import.name.clone()));
            visitor.visit_import(import, &child)
        })
        .collect::<Result<Vec<_>>>()?;

    let types = types
        .into_iter()
        .map(|class| {
            let child = cursor.descend(Frame::class(&class));
            visitor.visit_class(class, &child)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompilationUnit {
        package,
        imports,
        types,
    })
}

pub fn walk_class<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    class: ClassDecl,
    cursor: &Cursor,
) -> Result<ClassDecl> {
    let ClassDecl { body, .. } = class;
    let body = body
        .into_iter()
        .map(|member| walk_member(visitor, member, cursor))
        .collect::<Result<Vec<_>>>()?;
    Ok(ClassDecl { body, ..class })
}

/// Dispatch one class member; `cursor` points at the enclosing class
pub fn walk_member<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    member: Member,
    cursor: &Cursor,
) -> Result<Member> {
    match member {
        Member::Field(field) => {
            let mut frame = Frame::new(NodeKind::Field);
            if let Some(name) = field.single_name() {
                frame = frame.named(name);
            }
            let child = cursor.descend(frame);
            Ok(Member::Field(visitor.visit_field(field, &child)?))
        }
        Member::Method(method) => {
            let child = cursor.descend(Frame::new(NodeKind::Method).named(method.name.clone()));
            Ok(Member::Method(visitor.visit_method(method, &child)?))
        }
        Member::Initializer(init) => {
            let child = cursor.descend(Frame::new(NodeKind::Initializer));
            Ok(Member::Initializer(visitor.visit_initializer(init, &child)?))
        }
        Member::Class(class) => {
            let child = cursor.descend(Frame::class(&class));
            Ok(Member::Class(visitor.visit_class(class, &child)?))
        }
    }
}

pub fn walk_field<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    field: FieldDecl,
    cursor: &Cursor,
) -> Result<FieldDecl> {
    let FieldDecl { vars, .. } = field;
    let vars = walk_declarators(visitor, vars, cursor)?;
    Ok(FieldDecl { vars, ..field })
}

pub fn walk_method<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    method: MethodDecl,
    cursor: &Cursor,
) -> Result<MethodDecl> {
    let MethodDecl { body, .. } = method;
    let body = body
        .map(|block| walk_block(visitor, block, cursor))
        .transpose()?;
    Ok(MethodDecl { body, ..method })
}

pub fn walk_initializer<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    init: Initializer,
    cursor: &Cursor,
) -> Result<Initializer> {
    let Initializer { body, .. } = init;
    let body = walk_block(visitor, body, cursor)?;
    Ok(Initializer { body, ..init })
}

pub fn walk_block<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    block: Block,
    cursor: &Cursor,
) -> Result<Block> {
    Ok(Block::new(visit_statements(visitor, block.statements, cursor)?))
}

pub fn walk_statement<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    statement: Statement,
    cursor: &Cursor,
) -> Result<Statement> {
    let statement = match statement {
        Statement::LocalVar {
            modifiers,
            ty,
            vars,
        } => Statement::LocalVar {
            modifiers,
            ty,
            vars: walk_declarators(visitor, vars, cursor)?,
        },
        Statement::Expression(expr) => {
            Statement::Expression(visit_child_expression(visitor, expr, cursor)?)
        }
        Statement::Return(value) => Statement::Return(
            value
                .map(|expr| visit_child_expression(visitor, expr, cursor))
                .transpose()?,
        ),
        Statement::Throw(expr) => Statement::Throw(visit_child_expression(visitor, expr, cursor)?),
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = visit_child_expression(visitor, condition, cursor)?;
            let then_branch = visit_branch(visitor, then_branch, cursor)?;
            let else_branch = else_branch
                .map(|branch| visit_branch(visitor, branch, cursor))
                .transpose()?;
            Statement::If {
                condition,
                then_branch,
                else_branch,
            }
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => Statement::For {
            init: visit_statements(visitor, init, cursor)?,
            condition: condition
                .map(|expr| visit_child_expression(visitor, expr, cursor))
                .transpose()?,
            update: visit_all(visitor, update, cursor)?,
            body: visit_branch(visitor, body, cursor)?,
        },
        Statement::ForEach {
            modifiers,
            ty,
            name,
            iterable,
            body,
        } => Statement::ForEach {
            modifiers,
            ty,
            name,
            iterable: visit_child_expression(visitor, iterable, cursor)?,
            body: visit_branch(visitor, body, cursor)?,
        },
        Statement::While { condition, body } => Statement::While {
            condition: visit_child_expression(visitor, condition, cursor)?,
            body: visit_branch(visitor, body, cursor)?,
        },
        Statement::DoWhile { body, condition } => {
            let body = visit_branch(visitor, body, cursor)?;
            let condition = visit_child_expression(visitor, condition, cursor)?;
            Statement::DoWhile { body, condition }
        }
        Statement::Try {
            resources,
            body,
            catches,
            finally,
        } => Statement::Try {
            resources: visit_statements(visitor, resources, cursor)?,
            body: walk_block(visitor, body, cursor)?,
            catches: catches
                .into_iter()
                .map(|catch| {
                    let body = walk_block(visitor, catch.body, cursor)?;
                    Ok(CatchClause { body, ..catch })
                })
                .collect::<Result<Vec<_>>>()?,
            finally: finally
                .map(|block| walk_block(visitor, block, cursor))
                .transpose()?,
        },
        Statement::Switch { selector, cases } => Statement::Switch {
            selector: visit_child_expression(visitor, selector, cursor)?,
            cases: cases
                .into_iter()
                .map(|case| {
                    Ok(SwitchCase {
                        labels: visit_all(visitor, case.labels, cursor)?,
                        body: visit_statements(visitor, case.body, cursor)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        },
        Statement::Synchronized { lock, body } => Statement::Synchronized {
            lock: visit_child_expression(visitor, lock, cursor)?,
            body: walk_block(visitor, body, cursor)?,
        },
        Statement::Labeled { label, body } => Statement::Labeled {
            label,
            body: visit_branch(visitor, body, cursor)?,
        },
        Statement::Assert { condition, message } => Statement::Assert {
            condition: visit_child_expression(visitor, condition, cursor)?,
            message: message
                .map(|expr| visit_child_expression(visitor, expr, cursor))
                .transpose()?,
        },
        Statement::Block(block) => Statement::Block(walk_block(visitor, block, cursor)?),
        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Comment(_)
        | Statement::Raw(_) => statement,
    };
    Ok(statement)
}

pub fn walk_expression<V: TreeVisitor + ?Sized>(
    visitor: &mut V,
    expr: Expr,
    cursor: &Cursor,
) -> Result<Expr> {
    let expr = match expr {
        Expr::Literal(_) | Expr::Ident(_) => expr,
        Expr::FieldAccess { target, name } => Expr::FieldAccess {
            target: visit_boxed(visitor, target, cursor)?,
            name,
        },
        Expr::ArrayAccess { array, index } => Expr::ArrayAccess {
            array: visit_boxed(visitor, array, cursor)?,
            index: visit_boxed(visitor, index, cursor)?,
        },
        Expr::MethodCall(MethodCall { target, name, args }) => {
            let target = target
                .map(|target| visit_boxed(visitor, target, cursor))
                .transpose()?;
            let args = visit_all(visitor, args, cursor)?;
            return visitor.visit_method_call(MethodCall { target, name, args }, cursor);
        }
        Expr::New { ty, args } => Expr::New {
            ty,
            args: visit_all(visitor, args, cursor)?,
        },
        Expr::NewArray {
            element,
            dims,
            extra_dims,
            init,
        } => Expr::NewArray {
            element,
            dims: visit_all(visitor, dims, cursor)?,
            extra_dims,
            init: init
                .map(|values| visit_all(visitor, values, cursor))
                .transpose()?,
        },
        Expr::ArrayInit(values) => Expr::ArrayInit(visit_all(visitor, values, cursor)?),
        Expr::Unary { op, operand } => Expr::Unary {
            op,
            operand: visit_boxed(visitor, operand, cursor)?,
        },
        Expr::Postfix { op, operand } => Expr::Postfix {
            op,
            operand: visit_boxed(visitor, operand, cursor)?,
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: visit_boxed(visitor, left, cursor)?,
            right: visit_boxed(visitor, right, cursor)?,
        },
        Expr::Assign { op, target, value } => Expr::Assign {
            op,
            target: visit_boxed(visitor, target, cursor)?,
            value: visit_boxed(visitor, value, cursor)?,
        },
        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => Expr::Conditional {
            condition: visit_boxed(visitor, condition, cursor)?,
            then_expr: visit_boxed(visitor, then_expr, cursor)?,
            else_expr: visit_boxed(visitor, else_expr, cursor)?,
        },
        Expr::Cast { ty, expr } => Expr::Cast {
            ty,
            expr: visit_boxed(visitor, expr, cursor)?,
        },
        Expr::Paren(inner) => Expr::Paren(visit_boxed(visitor, inner, cursor)?),
    };
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MessageBoard;
    use crate::parser::{JavaParser, Parser};

    const SOURCE: &str = r#"package a;
import org.apache.commons.lang.RandomStringUtils;
import java.util.List;
class Util {
    private String seed = pick(1);
    String token() {
        if (ready) {
            return RandomStringUtils.randomAlphanumeric(count(2));
        }
        return null;
    }
}
"#;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TreeVisitor for Recorder {
        fn visit_import(&mut self, import: Import, _cursor: &Cursor) -> Result<Import> {
            self.events.push(format!("import {}", import.name));
            Ok(import)
        }

        fn visit_class(&mut self, class: ClassDecl, cursor: &Cursor) -> Result<ClassDecl> {
            self.events.push(format!("class {}", class.name));
            walk_class(self, class, cursor)
        }

        fn visit_method_call(&mut self, call: MethodCall, cursor: &Cursor) -> Result<Expr> {
            let path: Vec<_> = cursor
                .ancestors()
                .filter_map(|frame| frame.name.clone())
                .collect();
            self.events.push(format!("call {} in {}", call.name, path.join("<")));
            Ok(Expr::MethodCall(call))
        }
    }

    struct Renamer;

    impl TreeVisitor for Renamer {
        fn visit_method_call(&mut self, call: MethodCall, _cursor: &Cursor) -> Result<Expr> {
            Ok(Expr::MethodCall(MethodCall {
                name: call.name.to_uppercase(),
                ..call
            }))
        }
    }

    #[test]
    fn test_preorder_declaration_order() {
        let unit = JavaParser::new().parse(SOURCE).expect("parse");
        let board = MessageBoard::new();
        let pass = board.begin_pass();

        let mut recorder = Recorder::default();
        let result = visit_unit(&mut recorder, unit.clone(), &pass).expect("visit");

        assert_eq!(result, unit);
        assert_eq!(
            recorder.events,
            vec![
                "import org.apache.commons.lang.RandomStringUtils",
                "import java.util.List",
                "class Util",
                "call pick in pick<seed<Util",
                "call count in count<randomAlphanumeric<token<Util",
                "call randomAlphanumeric in randomAlphanumeric<token<Util",
            ]
        );
    }

    #[test]
    fn test_calls_inside_loops_and_try_are_visited() {
        let unit = JavaParser::new()
            .parse(
                r#"class Util {
    void run(List<String> items) {
        for (String item : items) {
            send(item);
        }
        try {
            open();
        } catch (Exception e) {
            log(e);
        } finally {
            close();
        }
        switch (mode()) {
            case 1:
                reset();
        }
        do {
            poll();
        } while (busy());
    }
}
"#,
            )
            .expect("parse");
        let board = MessageBoard::new();
        let pass = board.begin_pass();

        let printed = visit_unit(&mut Renamer, unit, &pass).expect("visit").to_source();
        for call in ["SEND(item)", "OPEN()", "LOG(e)", "CLOSE()", "MODE()", "RESET()", "POLL()", "BUSY()"] {
            assert!(printed.contains(call), "{call} not rewritten in:\n{printed}");
        }
    }

    #[test]
    fn test_rewrite_rebuilds_nested_calls() {
        let unit = JavaParser::new().parse(SOURCE).expect("parse");
        let board = MessageBoard::new();
        let pass = board.begin_pass();

        let result = visit_unit(&mut Renamer, unit, &pass).expect("visit");
        let printed = result.to_source();

        assert!(printed.contains("RandomStringUtils.RANDOMALPHANUMERIC(COUNT(2))"));
        assert!(printed.contains("private String seed = PICK(1);"));
    }
}
