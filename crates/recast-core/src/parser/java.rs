// Recursive-descent parser for the Java subset the recipes rewrite
// Statements the tree does not model (lambda bodies, local classes, switch
// rules, `yield`) are kept verbatim as `Statement::Raw` so a parse never loses
// code it cannot rewrite. Comments in front of declarations and statements
// are attached to the tree; comments inside expressions are dropped.

use super::lexer::{tokenize, Token, TokenKind};
use super::{ParseError, Parser};
use crate::ast::*;

type PResult<T> = Result<T, ParseError>;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

const RESERVED: &[&str] = &[
    "abstract", "assert", "break", "case", "catch", "class", "continue", "default", "do",
    "else", "enum", "extends", "final", "finally", "for", "if", "implements", "import",
    "instanceof", "interface", "native", "new", "package", "private", "protected", "public",
    "return", "static", "strictfp", "switch", "synchronized", "throw", "throws", "transient",
    "try", "volatile", "while",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn is_float(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") {
        return lower.contains('p');
    }
    lower.contains('.') || lower.contains('e') || lower.ends_with('f') || lower.ends_with('d')
}

fn comments_of(token: Token<'_>) -> Vec<String> {
    token.comments().into_iter().map(str::to_string).collect()
}

fn layout_of(token: Token<'_>) -> Layout {
    Layout {
        blank_lines: u8::try_from(token.blank_lines_before()).unwrap_or(u8::MAX),
        comments: comments_of(token),
    }
}

/// Java parser producing the tree model
#[derive(Debug, Default, Clone)]
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for JavaParser {
    fn parse(&mut self, source: &str) -> Result<CompilationUnit, ParseError> {
        TokenStream::new(source)?.compilation_unit()
    }

    fn parse_members(&mut self, source: &str) -> Result<Vec<Member>, ParseError> {
        let mut stream = TokenStream::new(source)?;
        let members = stream.members(None)?;
        stream.expect_eof()?;
        Ok(members)
    }

    fn parse_expression(&mut self, source: &str) -> Result<Expr, ParseError> {
        let mut stream = TokenStream::new(source)?;
        let expr = stream.expression()?;
        stream.expect_eof()?;
        Ok(expr)
    }

    fn name(&self) -> &'static str {
        "java"
    }
}

struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> TokenStream<'a> {
    fn new(source: &'a str) -> PResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    // Token access

    fn peek(&self) -> Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Token<'a> {
        // tokenize always ends with Eof, so the list is never empty
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    fn previous(&self) -> Token<'a> {
        self.tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn is(&self, text: &str) -> bool {
        self.is_at(0, text)
    }

    fn is_at(&self, n: usize, text: &str) -> bool {
        let token = self.peek_at(n);
        matches!(token.kind, TokenKind::Ident | TokenKind::Punct) && token.text == text
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.is(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> PResult<Token<'a>> {
        if self.is(text) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("'{text}'")))
        }
    }

    fn expect_eof(&self) -> PResult<()> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.text)
        };
        ParseError::syntax(self.source, token.offset, expected, found)
    }

    fn unsupported(&self, construct: impl Into<String>) -> ParseError {
        ParseError::unsupported(self.source, self.peek().offset, construct)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.source[start..end].to_string()
    }

    fn identifier(&mut self) -> PResult<String> {
        let token = self.peek();
        if token.kind == TokenKind::Ident && !is_reserved(token.text) {
            self.advance();
            Ok(token.text.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn qualified_name(&mut self, allow_wildcard: bool) -> PResult<String> {
        let mut name = self.identifier()?;
        while self.eat(".") {
            if allow_wildcard && self.eat("*") {
                name.push_str(".*");
                break;
            }
            name.push('.');
            name.push_str(&self.identifier()?);
        }
        Ok(name)
    }

    fn skip_balanced(&mut self, open: &str, close: &str) -> PResult<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => return Err(self.error(format!("'{close}'"))),
                TokenKind::Punct if token.text == open => depth += 1,
                TokenKind::Punct if token.text == close => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Raw `<...>` text, kept as written
    fn type_parameters(&mut self) -> PResult<String> {
        let start = self.peek().offset;
        self.skip_balanced("<", ">")?;
        Ok(self.slice(start, self.previous().end()))
    }

    // Declarations

    fn compilation_unit(&mut self) -> PResult<CompilationUnit> {
        let mut unit = CompilationUnit::default();

        if self.is("package") {
            let comments = comments_of(self.advance());
            let name = self.qualified_name(false)?;
            self.expect(";")?;
            unit.package = Some(PackageDecl { comments, name });
        }

        while self.is("import") {
            let layout = layout_of(self.advance());
            let is_static = self.eat("static");
            let name = self.qualified_name(true)?;
            self.expect(";")?;
            unit.imports.push(Import {
                layout,
                is_static,
                name,
            });
        }

        while !self.at_eof() {
            if self.eat(";") {
                continue;
            }
            let layout = layout_of(self.peek());
            let (annotations, modifiers) = self.modifiers()?;
            let class = self.class_declaration(layout, annotations, modifiers)?;
            unit.types.push(class);
        }

        Ok(unit)
    }

    fn annotation(&mut self) -> PResult<Annotation> {
        let start = self.expect("@")?.offset;
        self.qualified_name(false)?;
        if self.is("(") {
            self.skip_balanced("(", ")")?;
        }
        Ok(Annotation(self.slice(start, self.previous().end())))
    }

    fn modifiers(&mut self) -> PResult<(Vec<Annotation>, Vec<Modifier>)> {
        let mut annotations = Vec::new();
        let mut modifiers = Vec::new();

        loop {
            if self.is("@") && !self.is_at(1, "interface") {
                annotations.push(self.annotation()?);
                continue;
            }
            let token = self.peek();
            if token.kind != TokenKind::Ident {
                break;
            }
            match Modifier::from_keyword(token.text) {
                // `static {` opens an initializer
                Some(Modifier::Static) if self.is_at(1, "{") => break,
                Some(modifier) => {
                    self.advance();
                    modifiers.push(modifier);
                }
                None => break,
            }
        }

        Ok((annotations, modifiers))
    }

    fn class_declaration(
        &mut self,
        layout: Layout,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
    ) -> PResult<ClassDecl> {
        let kind = if self.eat("class") {
            ClassKind::Class
        } else if self.eat("interface") {
            ClassKind::Interface
        } else if self.is("enum") || self.is("@") {
            return Err(self.unsupported("enum or annotation type declaration"));
        } else {
            return Err(self.error("class or interface declaration"));
        };

        let name = self.identifier()?;
        let type_params = if self.is("<") {
            Some(self.type_parameters()?)
        } else {
            None
        };
        let extends = if self.eat("extends") {
            self.type_list()?
        } else {
            Vec::new()
        };
        let implements = if self.eat("implements") {
            self.type_list()?
        } else {
            Vec::new()
        };

        self.expect("{")?;
        let body = self.members(Some("}"))?;
        let trailing_comments = comments_of(self.expect("}")?);

        Ok(ClassDecl {
            layout,
            annotations,
            modifiers,
            kind,
            name,
            type_params,
            extends,
            implements,
            body,
            trailing_comments,
            markers: Markers::default(),
        })
    }

    fn members(&mut self, close: Option<&str>) -> PResult<Vec<Member>> {
        let mut members = Vec::new();
        loop {
            if let Some(close) = close {
                if self.is(close) {
                    break;
                }
            }
            if self.at_eof() {
                if let Some(close) = close {
                    return Err(self.error(format!("'{close}'")));
                }
                break;
            }
            if self.eat(";") {
                continue;
            }
            members.push(self.member()?);
        }
        Ok(members)
    }

    fn member(&mut self) -> PResult<Member> {
        let layout = layout_of(self.peek());

        if self.is("static") && self.is_at(1, "{") {
            self.advance();
            let body = self.block()?;
            return Ok(Member::Initializer(Initializer {
                layout,
                is_static: true,
                body,
            }));
        }
        if self.is("{") {
            let body = self.block()?;
            return Ok(Member::Initializer(Initializer {
                layout,
                is_static: false,
                body,
            }));
        }

        let (annotations, modifiers) = self.modifiers()?;

        if self.is("class") || self.is("interface") || self.is("enum") {
            return self
                .class_declaration(layout, annotations, modifiers)
                .map(Member::Class);
        }

        let type_params = if self.is("<") {
            Some(self.type_parameters()?)
        } else {
            None
        };

        // Constructor: a name directly followed by its parameter list
        if self.peek().kind == TokenKind::Ident && self.is_at(1, "(") {
            let name = self.identifier()?;
            let method = self.method_rest(layout, annotations, modifiers, type_params, None, name)?;
            return Ok(Member::Method(method));
        }

        let ty = self.parse_type()?;
        let name = self.identifier()?;

        if self.is("(") {
            let method =
                self.method_rest(layout, annotations, modifiers, type_params, Some(ty), name)?;
            return Ok(Member::Method(method));
        }
        if type_params.is_some() {
            return Err(self.error("'('"));
        }

        let vars = self.declarators(name)?;
        self.expect(";")?;

        Ok(Member::Field(FieldDecl {
            layout,
            annotations,
            modifiers,
            ty,
            vars,
        }))
    }

    fn method_rest(
        &mut self,
        layout: Layout,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
        type_params: Option<String>,
        return_type: Option<TypeRef>,
        name: String,
    ) -> PResult<MethodDecl> {
        let params = self.parameters()?;
        let throws = if self.eat("throws") {
            self.type_list()?
        } else {
            Vec::new()
        };
        let body = if self.eat(";") {
            None
        } else {
            Some(self.block()?)
        };

        Ok(MethodDecl {
            layout,
            annotations,
            modifiers,
            type_params,
            return_type,
            name,
            params,
            throws,
            body,
        })
    }

    fn parameters(&mut self) -> PResult<Vec<Param>> {
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.is(")") {
            loop {
                let (annotations, modifiers) = self.modifiers()?;
                let ty = self.parse_type()?;
                let varargs = self.eat("...");
                let name = self.identifier()?;
                params.push(Param {
                    annotations,
                    modifiers,
                    ty,
                    varargs,
                    name,
                });
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    fn type_list(&mut self) -> PResult<Vec<TypeRef>> {
        let mut types = vec![self.parse_type()?];
        while self.eat(",") {
            types.push(self.parse_type()?);
        }
        Ok(types)
    }

    fn parse_type(&mut self) -> PResult<TypeRef> {
        let mut name = self.identifier()?;
        while self.is(".") {
            let next = self.peek_at(1);
            if next.kind != TokenKind::Ident || is_reserved(next.text) {
                break;
            }
            self.advance();
            name.push('.');
            name.push_str(&self.identifier()?);
        }

        let mut ty = TypeRef::simple(name);
        if self.is("<") {
            if self.is_at(1, ">") {
                self.advance();
                self.advance();
                ty.diamond = true;
            } else {
                ty.args = self.type_arguments()?;
            }
        }
        while self.is("[") && self.is_at(1, "]") {
            self.advance();
            self.advance();
            ty.dims += 1;
        }
        Ok(ty)
    }

    fn type_arguments(&mut self) -> PResult<Vec<TypeRef>> {
        self.expect("<")?;
        let mut args = Vec::new();
        loop {
            if self.eat("?") {
                let mut name = "?".to_string();
                if self.is("extends") || self.is("super") {
                    let bound_kind = self.advance().text;
                    let bound = self.parse_type()?;
                    name = format!("? {bound_kind} {}", bound.to_source());
                }
                args.push(TypeRef::simple(name));
            } else {
                args.push(self.parse_type()?);
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(args)
    }

    fn declarators(&mut self, first: String) -> PResult<Vec<VarDeclarator>> {
        let mut vars = Vec::new();
        let mut name = first;
        loop {
            let mut dims = 0;
            while self.is("[") && self.is_at(1, "]") {
                self.advance();
                self.advance();
                dims += 1;
            }
            let init = if self.eat("=") {
                Some(self.variable_initializer()?)
            } else {
                None
            };
            vars.push(VarDeclarator { name, dims, init });
            if !self.eat(",") {
                break;
            }
            name = self.identifier()?;
        }
        Ok(vars)
    }

    fn variable_initializer(&mut self) -> PResult<Expr> {
        if self.is("{") {
            Ok(Expr::ArrayInit(self.array_values()?))
        } else {
            self.expression()
        }
    }

    fn array_values(&mut self) -> PResult<Vec<Expr>> {
        self.expect("{")?;
        let mut values = Vec::new();
        while !self.is("}") {
            values.push(self.variable_initializer()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(values)
    }

    // Statements

    fn block(&mut self) -> PResult<Block> {
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.is("}") {
            if self.at_eof() {
                return Err(self.error("'}'"));
            }
            self.block_statement(&mut statements)?;
        }
        self.push_comments(&mut statements);
        self.expect("}")?;
        Ok(Block::new(statements))
    }

    /// Next statement of a block or switch group, after its own comments
    fn block_statement(&mut self, statements: &mut Vec<Statement>) -> PResult<()> {
        self.push_comments(statements);
        statements.push(self.statement()?);
        Ok(())
    }

    fn push_comments(&self, statements: &mut Vec<Statement>) {
        statements.extend(comments_of(self.peek()).into_iter().map(Statement::Comment));
    }

    fn parenthesized(&mut self) -> PResult<Expr> {
        self.expect("(")?;
        let expr = self.expression()?;
        self.expect(")")?;
        Ok(expr)
    }

    fn expression_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expression()?];
        while self.eat(",") {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    /// `final int i = 0, j = 1` without the terminating `;`
    fn local_variable(&mut self) -> PResult<Statement> {
        let (_, modifiers) = self.modifiers()?;
        let ty = self.parse_type()?;
        let name = self.identifier()?;
        let vars = self.declarators(name)?;
        Ok(Statement::LocalVar { modifiers, ty, vars })
    }

    fn optional_label(&mut self) -> PResult<Option<String>> {
        let label = if self.is(";") {
            None
        } else {
            Some(self.identifier()?)
        };
        self.expect(";")?;
        Ok(label)
    }

    fn for_statement(&mut self) -> PResult<Statement> {
        self.expect("for")?;
        self.expect("(")?;

        if self.looks_like_for_each() {
            let (_, modifiers) = self.modifiers()?;
            let ty = self.parse_type()?;
            let name = self.identifier()?;
            self.expect(":")?;
            let iterable = self.expression()?;
            self.expect(")")?;
            let body = Box::new(self.statement()?);
            return Ok(Statement::ForEach {
                modifiers,
                ty,
                name,
                iterable,
                body,
            });
        }

        let init = if self.is(";") {
            Vec::new()
        } else if self.looks_like_local_variable() {
            vec![self.local_variable()?]
        } else {
            self.expression_list()?
                .into_iter()
                .map(Statement::Expression)
                .collect()
        };
        self.expect(";")?;
        let condition = if self.is(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let update = if self.is(")") {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.expect(")")?;
        let body = Box::new(self.statement()?);

        Ok(Statement::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn looks_like_for_each(&mut self) -> bool {
        let start = self.pos;
        let found = self.probe_for_each().unwrap_or(false);
        self.pos = start;
        found
    }

    fn probe_for_each(&mut self) -> PResult<bool> {
        self.modifiers()?;
        self.parse_type()?;
        self.identifier()?;
        Ok(self.is(":"))
    }

    fn try_statement(&mut self) -> PResult<Statement> {
        self.expect("try")?;

        let mut resources = Vec::new();
        if self.eat("(") {
            while !self.is(")") {
                let resource = if self.looks_like_local_variable() {
                    self.local_variable()?
                } else {
                    Statement::Expression(self.expression()?)
                };
                resources.push(resource);
                if !self.eat(";") {
                    break;
                }
            }
            self.expect(")")?;
        }

        let body = self.block()?;
        let mut catches = Vec::new();
        while self.eat("catch") {
            self.expect("(")?;
            let (_, modifiers) = self.modifiers()?;
            let mut types = vec![self.parse_type()?];
            while self.eat("|") {
                types.push(self.parse_type()?);
            }
            let name = self.identifier()?;
            self.expect(")")?;
            let body = self.block()?;
            catches.push(CatchClause {
                modifiers,
                types,
                name,
                body,
            });
        }
        let finally = if self.eat("finally") {
            Some(self.block()?)
        } else {
            None
        };

        if resources.is_empty() && catches.is_empty() && finally.is_none() {
            return Err(self.error("'catch' or 'finally'"));
        }
        Ok(Statement::Try {
            resources,
            body,
            catches,
            finally,
        })
    }

    fn switch_statement(&mut self) -> PResult<Statement> {
        self.expect("switch")?;
        let selector = self.parenthesized()?;
        self.expect("{")?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        loop {
            // Comments above a label or the closing brace end the previous group
            if let Some(previous) = cases.last_mut() {
                self.push_comments(&mut previous.body);
            }
            if self.eat("}") {
                break;
            }

            let labels = if self.eat("case") {
                self.expression_list()?
            } else if self.eat("default") {
                Vec::new()
            } else {
                return Err(self.error("'case' or 'default'"));
            };
            if self.is("->") {
                return Err(self.unsupported("switch rule"));
            }
            self.expect(":")?;

            let mut body = Vec::new();
            while !(self.is("case") || self.is("default") || self.is("}")) {
                if self.at_eof() {
                    return Err(self.error("'}'"));
                }
                self.block_statement(&mut body)?;
            }
            cases.push(SwitchCase { labels, body });
        }

        Ok(Statement::Switch { selector, cases })
    }

    fn statement(&mut self) -> PResult<Statement> {
        let start = self.pos;
        match self.structured_statement() {
            Ok(statement) => Ok(statement),
            Err(err) => {
                self.pos = start;
                self.raw_statement().map_err(|_| err)
            }
        }
    }

    fn structured_statement(&mut self) -> PResult<Statement> {
        let token = self.peek();
        if token.kind == TokenKind::Punct {
            match token.text {
                "{" => return Ok(Statement::Block(self.block()?)),
                ";" => {
                    self.advance();
                    return Ok(Statement::Empty);
                }
                "@" => return Err(self.unsupported("annotated local declaration")),
                _ => {}
            }
        }

        match token.text {
            "return" => {
                self.advance();
                if self.eat(";") {
                    return Ok(Statement::Return(None));
                }
                let value = self.expression()?;
                self.expect(";")?;
                Ok(Statement::Return(Some(value)))
            }
            "throw" => {
                self.advance();
                let value = self.expression()?;
                self.expect(";")?;
                Ok(Statement::Throw(value))
            }
            "if" => {
                self.advance();
                self.expect("(")?;
                let condition = self.expression()?;
                self.expect(")")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            "for" => self.for_statement(),
            "while" => {
                self.advance();
                let condition = self.parenthesized()?;
                let body = Box::new(self.statement()?);
                Ok(Statement::While { condition, body })
            }
            "do" => {
                self.advance();
                let body = Box::new(self.statement()?);
                self.expect("while")?;
                let condition = self.parenthesized()?;
                self.expect(";")?;
                Ok(Statement::DoWhile { body, condition })
            }
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "synchronized" => {
                self.advance();
                let lock = self.parenthesized()?;
                let body = self.block()?;
                Ok(Statement::Synchronized { lock, body })
            }
            "break" => {
                self.advance();
                Ok(Statement::Break(self.optional_label()?))
            }
            "continue" => {
                self.advance();
                Ok(Statement::Continue(self.optional_label()?))
            }
            "assert" => {
                self.advance();
                let condition = self.expression()?;
                let message = if self.eat(":") {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.expect(";")?;
                Ok(Statement::Assert { condition, message })
            }
            "yield" | "case" | "default" | "class" | "interface" | "enum" => {
                Err(self.unsupported(format!("'{}' statement", token.text)))
            }
            _ if token.kind == TokenKind::Ident
                && !is_reserved(token.text)
                && self.is_at(1, ":") =>
            {
                let label = self.identifier()?;
                self.expect(":")?;
                let body = Box::new(self.statement()?);
                Ok(Statement::Labeled { label, body })
            }
            _ if self.looks_like_local_variable() => {
                let statement = self.local_variable()?;
                self.expect(";")?;
                Ok(statement)
            }
            _ => {
                let expr = self.expression()?;
                self.expect(";")?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn looks_like_local_variable(&mut self) -> bool {
        let start = self.pos;
        let found = self.probe_local_variable().unwrap_or(false);
        self.pos = start;
        found
    }

    fn probe_local_variable(&mut self) -> PResult<bool> {
        while self.eat("final") {}
        if self.peek().kind != TokenKind::Ident {
            return Ok(false);
        }
        self.parse_type()?;
        let name = self.peek();
        if name.kind != TokenKind::Ident || is_reserved(name.text) {
            return Ok(false);
        }
        self.advance();
        Ok(matches!(self.peek().text, "=" | ";" | "," | "["))
    }

    /// Source slice of one statement, balanced over brackets
    fn raw_statement(&mut self) -> PResult<Statement> {
        let first = self.peek();
        let start = first.offset;
        let mut depth = 0usize;

        loop {
            let token = self.advance();
            match (token.kind, token.text) {
                (TokenKind::Eof, _) => return Err(self.error("';' or '}'")),
                (TokenKind::Punct, "(" | "[" | "{") => depth += 1,
                (TokenKind::Punct, ")" | "]") => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("balanced brackets"))?;
                }
                (TokenKind::Punct, "}") => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("balanced brackets"))?;
                    if depth == 0 {
                        let continues = match self.peek().text {
                            "else" | "catch" | "finally" => true,
                            "while" => first.text == "do",
                            _ => false,
                        };
                        if !continues {
                            break;
                        }
                    }
                }
                (TokenKind::Punct, ";") if depth == 0 => break,
                _ => {}
            }
        }

        Ok(Statement::Raw(self.slice(start, self.previous().end())))
    }

    // Expressions

    fn expression(&mut self) -> PResult<Expr> {
        let target = self.conditional()?;
        let token = self.peek();
        if token.kind == TokenKind::Punct {
            if let Some(op) = AssignOp::from_token(token.text) {
                self.advance();
                let value = self.expression()?;
                return Ok(Expr::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                });
            }
            if token.text == "->" {
                return Err(self.unsupported("lambda expression"));
            }
        }
        Ok(target)
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let condition = self.binary(1)?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then_expr = self.expression()?;
        self.expect(":")?;
        let else_expr = self.conditional()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn binary(&mut self, min_precedence: u8) -> PResult<Expr> {
        let mut left = self.unary()?;
        while let Some((op, precedence, width)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = if op == BinaryOp::InstanceOf {
                Expr::Ident(self.parse_type()?.to_source())
            } else {
                self.binary(precedence + 1)?
            };
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Operator at the cursor with its precedence and token width
    fn binary_operator(&self) -> Option<(BinaryOp, u8, usize)> {
        let token = self.peek();
        if token.kind == TokenKind::Ident {
            return (token.text == "instanceof").then_some((BinaryOp::InstanceOf, 7, 1));
        }
        if token.kind != TokenKind::Punct {
            return None;
        }

        let (op, precedence) = match token.text {
            "||" => (BinaryOp::Or, 1),
            "&&" => (BinaryOp::And, 2),
            "|" => (BinaryOp::BitOr, 3),
            "^" => (BinaryOp::BitXor, 4),
            "&" => (BinaryOp::BitAnd, 5),
            "==" => (BinaryOp::Equal, 6),
            "!=" => (BinaryOp::NotEqual, 6),
            "<" => (BinaryOp::Less, 7),
            "<=" => (BinaryOp::LessEqual, 7),
            ">=" => (BinaryOp::GreaterEqual, 7),
            ">" => {
                // Shifts arrive as adjacent `>` tokens
                let second = self.peek_at(1);
                if second.text == ">" && second.offset == token.end() {
                    let third = self.peek_at(2);
                    if third.text == ">" && third.offset == second.end() {
                        return Some((BinaryOp::UnsignedShiftRight, 8, 3));
                    }
                    return Some((BinaryOp::ShiftRight, 8, 2));
                }
                (BinaryOp::Greater, 7)
            }
            "<<" => (BinaryOp::ShiftLeft, 8),
            "+" => (BinaryOp::Add, 9),
            "-" => (BinaryOp::Subtract, 9),
            "*" => (BinaryOp::Multiply, 10),
            "/" => (BinaryOp::Divide, 10),
            "%" => (BinaryOp::Modulo, 10),
            _ => return None,
        };
        Some((op, precedence, 1))
    }

    fn unary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        if token.kind == TokenKind::Punct {
            let op = match token.text {
                "!" => Some(UnaryOp::Not),
                "-" => Some(UnaryOp::Negate),
                "+" => Some(UnaryOp::Plus),
                "~" => Some(UnaryOp::BitNot),
                "++" => Some(UnaryOp::PreIncrement),
                "--" => Some(UnaryOp::PreDecrement),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                let operand = self.unary()?;
                return Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
            if token.text == "(" && self.looks_like_cast() {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(")")?;
                let expr = self.unary()?;
                return Ok(Expr::Cast {
                    ty,
                    expr: Box::new(expr),
                });
            }
        }

        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn looks_like_cast(&mut self) -> bool {
        let start = self.pos;
        let found = self.probe_cast().unwrap_or(false);
        self.pos = start;
        found
    }

    fn probe_cast(&mut self) -> PResult<bool> {
        self.expect("(")?;
        let ty = self.parse_type()?;
        self.expect(")")?;
        let primitive = ty.args.is_empty() && PRIMITIVES.contains(&ty.name.as_str());
        let next = self.peek();
        Ok(match next.kind {
            TokenKind::Ident => next.text != "instanceof",
            TokenKind::Number | TokenKind::Str | TokenKind::Char => true,
            TokenKind::Punct => {
                matches!(next.text, "(" | "!" | "~")
                    || (primitive && matches!(next.text, "-" | "+" | "++" | "--"))
            }
            TokenKind::Eof => false,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let kind = if is_float(token.text) {
                    LiteralKind::Float
                } else {
                    LiteralKind::Int
                };
                Ok(Expr::Literal(Literal {
                    kind,
                    text: token.text.to_string(),
                }))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::Literal(Literal {
                    kind: LiteralKind::String,
                    text: token.text.to_string(),
                }))
            }
            TokenKind::Char => {
                self.advance();
                Ok(Expr::Literal(Literal {
                    kind: LiteralKind::Char,
                    text: token.text.to_string(),
                }))
            }
            TokenKind::Ident => match token.text {
                "true" | "false" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::boolean(token.text == "true")))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::null()))
                }
                "new" => {
                    self.advance();
                    self.creator()
                }
                "switch" => Err(self.unsupported("switch expression")),
                text if is_reserved(text) => Err(self.error("expression")),
                text => {
                    self.advance();
                    let name = text.to_string();
                    if self.is("(") {
                        let args = self.arguments()?;
                        Ok(Expr::MethodCall(MethodCall {
                            target: None,
                            name,
                            args,
                        }))
                    } else {
                        Ok(Expr::Ident(name))
                    }
                }
            },
            TokenKind::Punct if token.text == "(" => {
                self.advance();
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(self.error("expression")),
        }
    }

    fn postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            let token = self.peek();
            if token.kind != TokenKind::Punct {
                break;
            }
            match token.text {
                "." => {
                    self.advance();
                    if self.is("<") {
                        return Err(self.unsupported("explicit type arguments"));
                    }
                    let name = self.member_name()?;
                    expr = if self.is("(") {
                        let args = self.arguments()?;
                        Expr::MethodCall(MethodCall {
                            target: Some(Box::new(expr)),
                            name,
                            args,
                        })
                    } else {
                        Expr::FieldAccess {
                            target: Box::new(expr),
                            name,
                        }
                    };
                }
                "[" => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect("]")?;
                    expr = Expr::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                "++" | "--" => {
                    self.advance();
                    let op = if token.text == "++" {
                        PostfixOp::Increment
                    } else {
                        PostfixOp::Decrement
                    };
                    expr = Expr::Postfix {
                        op,
                        operand: Box::new(expr),
                    };
                }
                "::" => return Err(self.unsupported("method reference")),
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Name after a dot; keywords such as `class` and `this` are allowed here
    fn member_name(&mut self) -> PResult<String> {
        let token = self.peek();
        if token.kind == TokenKind::Ident {
            self.advance();
            Ok(token.text.to_string())
        } else {
            Err(self.error("member name"))
        }
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect("(")?;
        let mut args = Vec::new();
        if !self.is(")") {
            loop {
                args.push(self.expression()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    /// Everything after `new`
    fn creator(&mut self) -> PResult<Expr> {
        let name = self.qualified_name(false)?;
        let mut ty = TypeRef::simple(name);
        if self.is("<") {
            if self.is_at(1, ">") {
                self.advance();
                self.advance();
                ty.diamond = true;
            } else {
                ty.args = self.type_arguments()?;
            }
        }

        if self.is("[") {
            let mut dims = Vec::new();
            let mut extra_dims = 0;
            while self.eat("[") {
                if self.eat("]") {
                    extra_dims += 1;
                    continue;
                }
                if extra_dims > 0 {
                    return Err(self.error("']'"));
                }
                dims.push(self.expression()?);
                self.expect("]")?;
            }
            let init = if self.is("{") {
                Some(self.array_values()?)
            } else {
                None
            };
            return Ok(Expr::NewArray {
                element: ty,
                dims,
                extra_dims,
                init,
            });
        }

        let args = self.arguments()?;
        if self.is("{") {
            return Err(self.unsupported("anonymous class body"));
        }
        Ok(Expr::New { ty, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> CompilationUnit {
        JavaParser::new().parse(source).expect("parse")
    }

    #[test]
    fn test_parse_random_util() {
        let unit = parse(
            r#"package au.com.example.util;
import org.apache.commons.lang.RandomStringUtils;
public final class RandomUtil {
    private RandomUtil() {
    }
    public static String generateString(int count) {
        return RandomStringUtils.randomAlphanumeric(count);
    }
}
"#,
        );

        assert_eq!(unit.package.as_ref().map(|p| p.name.as_str()), Some("au.com.example.util"));
        assert!(unit.has_import("org.apache.commons.lang.RandomStringUtils"));

        let class = unit.class("RandomUtil").expect("class");
        assert_eq!(class.modifiers, vec![Modifier::Public, Modifier::Final]);
        assert_eq!(class.body.len(), 2);

        let methods: Vec<_> = class.methods().collect();
        assert!(methods[0].return_type.is_none());
        assert_eq!(methods[1].name, "generateString");
        assert_eq!(methods[1].params[0].ty, TypeRef::simple("int"));

        let body = methods[1].body.as_ref().expect("body");
        match &body.statements[0] {
            Statement::Return(Some(Expr::MethodCall(call))) => {
                assert_eq!(call.name, "randomAlphanumeric");
                assert_eq!(
                    call.target.as_ref().and_then(|t| t.qualified_name()).as_deref(),
                    Some("RandomStringUtils")
                );
                assert_eq!(call.args, vec![Expr::ident("count")]);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_preserves_layout() {
        let source = r#"package a.b;

import java.util.List;

public class Sample<T extends Comparable<T>> extends Base implements Runnable {
    private static final int COUNT = 20;
    private int[] values = {1, 2};

    static {
        init();
    }

    public Sample() {
        super();
    }

    @Override
    public void run() {
        for (int i = 0; i < COUNT; i++) {
            total += values[i];
        }
        if (total > 10) {
            return;
        } else {
            total = -1;
        }
        Map<String, List<String>> m = new HashMap<>();
        String s = (String) m.get("k");
    }
}
"#;
        assert_eq!(parse(source).to_source(), source);
    }

    #[test]
    fn test_unmodelled_statements_are_raw() {
        let unit = parse(
            "class A {\n    void f() {\n        try {\n            g();\n        } finally {\n            h();\n        }\n        list.forEach(x -> { use(x); });\n    }\n}\n",
        );
        let method = unit.types[0].methods().next().expect("method");
        let statements = &method.body.as_ref().expect("body").statements;
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            &statements[0],
            Statement::Try { catches, finally: Some(_), .. } if catches.is_empty()
        ));
        assert!(
            matches!(&statements[1], Statement::Raw(text) if text == "list.forEach(x -> { use(x); });")
        );
    }

    #[test]
    fn test_control_flow_round_trip() {
        let source = r#"class Loops {
    int f(List<String> items, Object lock) throws IOException {
        int total = 0;
        // count the items
        for (String item : items) {
            total += item.length();
        }
        for (int i = 0, j = 10; i < j; i++, j--) {
            continue;
        }
        for (;;) {
            break;
        }
        while (total > 100) {
            total /= 2;
        }
        do {
            total++;
        } while (total < 10);
        try (InputStream in = open(); Reader r = reader(in)) {
            read(r);
        } catch (IllegalStateException | IllegalArgumentException e) {
            throw e;
        } finally {
            close();
        }
        switch (total) {
            case 1:
            case 2:
                total = 0;
                break;
            default:
                // nothing to do
                total = -1;
        }
        synchronized (lock) {
            total = 1;
        }
        outer: while (true) {
            break outer;
        }
        assert total > 0 : "positive";
        return total;
    }
}
"#;
        let unit = parse(source);
        let method = unit.types[0].methods().next().expect("method");
        let statements = &method.body.as_ref().expect("body").statements;
        assert!(!statements.iter().any(|s| matches!(s, Statement::Raw(_))));
        assert!(matches!(&statements[1], Statement::Comment(text) if text == "// count the items"));
        assert_eq!(unit.to_source(), source);
    }

    #[test]
    fn test_loop_bodies_are_parsed() {
        let unit = parse(
            "class A {\n    String f() {\n        for (int i = 0; i < 3; i++) {\n            return RandomStringUtils.randomNumeric(4);\n        }\n        return null;\n    }\n}\n",
        );
        let method = unit.types[0].methods().next().expect("method");
        match &method.body.as_ref().expect("body").statements[0] {
            Statement::For { init, body, .. } => {
                assert!(matches!(&init[..], [Statement::LocalVar { .. }]));
                assert!(matches!(
                    body.as_ref(),
                    Statement::Block(block)
                        if matches!(&block.statements[..], [Statement::Return(Some(Expr::MethodCall(_)))])
                ));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_comments_attach_to_declarations() {
        let source = r#"/*
 * Copyright 2020 Example Pty Ltd.
 */
package a.b;

// collections
import java.util.List;

/** Utility class for generating random Strings. */
public final class RandomUtil {

    /** Number of characters. */
    private static final int COUNT = 20;

    /**
     * Generates a key.
     *
     * @return the key
     */
    public static String key() {
        return null;
    }
    // end of class
}
"#;
        let unit = parse(source);
        assert_eq!(
            unit.package.as_ref().map(|p| p.comments.clone()),
            Some(vec!["/*\n * Copyright 2020 Example Pty Ltd.\n */".to_string()])
        );
        assert_eq!(unit.imports[0].layout.comments, vec!["// collections"]);

        let class = &unit.types[0];
        assert_eq!(
            class.layout.comments,
            vec!["/** Utility class for generating random Strings. */"]
        );
        assert_eq!(class.body[0].layout().comments, vec!["/** Number of characters. */"]);
        assert_eq!(class.body[0].layout().blank_lines, 1);
        assert_eq!(class.body[1].layout().comments.len(), 1);
        assert_eq!(class.trailing_comments, vec!["// end of class"]);

        assert_eq!(unit.to_source(), source);
    }

    #[test]
    fn test_parse_expression_shapes() {
        let mut parser = JavaParser::new();

        let call = parser
            .parse_expression("RandomStringUtils.random(DEF_COUNT, 0, 0, true, true, null, SECURE_RANDOM)")
            .expect("call");
        match call {
            Expr::MethodCall(call) => assert_eq!(call.args.len(), 7),
            other => panic!("unexpected {other:?}"),
        }

        let shift = parser.parse_expression("a >> 2 >>> b").expect("shift");
        assert_eq!(shift.to_source(), "a >> 2 >>> b");

        let array = parser.parse_expression("new byte[64]").expect("array");
        assert_eq!(array.to_source(), "new byte[64]");

        assert!(parser.parse_expression("a +").is_err());
    }

    #[test]
    fn test_parse_members_snippet() {
        let members = JavaParser::new()
            .parse_members(
                "private static final SecureRandom SECURE_RANDOM = new SecureRandom();\nstatic {\n    SECURE_RANDOM.nextBytes(new byte[64]);\n}\n",
            )
            .expect("members");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name(), Some("SECURE_RANDOM"));
        assert!(matches!(&members[1], Member::Initializer(init) if init.is_static));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = JavaParser::new().parse("package a;\nclass {\n}").unwrap_err();
        match err {
            ParseError::Syntax { line, expected, .. } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "identifier");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_enum_is_unsupported() {
        let err = JavaParser::new().parse("enum Color { RED }").unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { .. }));
    }
}
