// Tree model for Java compilation units
// Every kind the recipe engine cares about is a closed enum or struct here;
// rewriting consumes a node and rebuilds it through the `with_*` builders.

pub mod markers;
pub mod source_gen;

pub use markers::{Marker, Markers};
pub use source_gen::ToSource;

use serde::{Deserialize, Serialize};

/// Blank lines and comments that precede a member or import when printed
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    pub blank_lines: u8,
    /// Leading comments as written, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl Layout {
    pub fn tight() -> Self {
        Self::default()
    }

    pub fn separated() -> Self {
        Self {
            blank_lines: 1,
            ..Self::default()
        }
    }

    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    /// Same comments, different spacing
    pub fn with_blank_lines(mut self, blank_lines: u8) -> Self {
        self.blank_lines = blank_lines;
        self
    }
}

/// Discriminant of every node kind, used for cursor frames and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    CompilationUnit,
    Package,
    Import,
    Class,
    Field,
    Method,
    Initializer,
    Statement,
    Expression,
    MethodCall,
}

/// One source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub package: Option<PackageDecl>,
    pub imports: Vec<Import>,
    pub types: Vec<ClassDecl>,
}

impl CompilationUnit {
    pub fn with_imports(mut self, imports: Vec<Import>) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_types(mut self, types: Vec<ClassDecl>) -> Self {
        self.types = types;
        self
    }

    /// Top-level class with the given simple name
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.types.iter().find(|class| class.name == name)
    }

    pub fn has_import(&self, name: &str) -> bool {
        self.imports.iter().any(|import| !import.is_static && import.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecl {
    /// Comments above the package line, usually a license header
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    pub name: String,
}

impl PackageDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            comments: Vec::new(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub layout: Layout,
    pub is_static: bool,
    /// Qualified name as written, including a trailing `.*` for wildcards
    pub name: String,
}

impl Import {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            layout: Layout::tight(),
            is_static: false,
            name: name.into(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_blank_lines(mut self, blank_lines: u8) -> Self {
        self.layout.blank_lines = blank_lines;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.name.ends_with(".*")
    }

    /// Package portion of the import: every segment but the last
    pub fn package_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[..pos],
            None => "",
        }
    }

    /// Simple type name imported, `None` for wildcards
    pub fn simple_name(&self) -> Option<&str> {
        if self.is_wildcard() {
            return None;
        }
        Some(self.name.rsplit('.').next().unwrap_or(&self.name))
    }

    /// Whether this import already brings `fqn` into scope
    pub fn covers(&self, fqn: &str) -> bool {
        if self.is_static {
            return false;
        }
        if self.name == fqn {
            return true;
        }
        match fqn.rfind('.') {
            Some(pos) => self.is_wildcard() && self.package_name() == &fqn[..pos],
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Synchronized,
    Native,
    Transient,
    Volatile,
    Strictfp,
    Default,
}

impl Modifier {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let modifier = match word {
            "public" => Modifier::Public,
            "protected" => Modifier::Protected,
            "private" => Modifier::Private,
            "static" => Modifier::Static,
            "final" => Modifier::Final,
            "abstract" => Modifier::Abstract,
            "synchronized" => Modifier::Synchronized,
            "native" => Modifier::Native,
            "transient" => Modifier::Transient,
            "volatile" => Modifier::Volatile,
            "strictfp" => Modifier::Strictfp,
            "default" => Modifier::Default,
            _ => return None,
        };
        Some(modifier)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Abstract => "abstract",
            Modifier::Synchronized => "synchronized",
            Modifier::Native => "native",
            Modifier::Transient => "transient",
            Modifier::Volatile => "volatile",
            Modifier::Strictfp => "strictfp",
            Modifier::Default => "default",
        }
    }
}

/// Annotation kept as written, e.g. `@SuppressWarnings("unused")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation(pub String);

/// Type reference: `Map<String, List<Integer>>[]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    /// `new ArrayList<>()`
    pub diamond: bool,
    pub dims: usize,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            diamond: false,
            dims: 0,
        }
    }

    pub fn array_of(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            diamond: false,
            dims,
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub layout: Layout,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub kind: ClassKind,
    pub name: String,
    pub type_params: Option<String>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub body: Vec<Member>,
    /// Comments between the last member and the closing brace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trailing_comments: Vec<String>,
    pub markers: Markers,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            layout: Layout::tight(),
            annotations: Vec::new(),
            modifiers: Vec::new(),
            kind: ClassKind::Class,
            name: name.into(),
            type_params: None,
            extends: Vec::new(),
            implements: Vec::new(),
            body: Vec::new(),
            trailing_comments: Vec::new(),
            markers: Markers::default(),
        }
    }

    pub fn with_body(mut self, body: Vec<Member>) -> Self {
        self.body = body;
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.body.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.body.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }
}

/// Class body entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(Initializer),
    Class(ClassDecl),
}

impl Member {
    pub fn kind(&self) -> NodeKind {
        match self {
            Member::Field(_) => NodeKind::Field,
            Member::Method(_) => NodeKind::Method,
            Member::Initializer(_) => NodeKind::Initializer,
            Member::Class(_) => NodeKind::Class,
        }
    }

    pub fn layout(&self) -> &Layout {
        match self {
            Member::Field(field) => &field.layout,
            Member::Method(method) => &method.layout,
            Member::Initializer(init) => &init.layout,
            Member::Class(class) => &class.layout,
        }
    }

    fn layout_mut(&mut self) -> &mut Layout {
        match self {
            Member::Field(field) => &mut field.layout,
            Member::Method(method) => &mut method.layout,
            Member::Initializer(init) => &mut init.layout,
            Member::Class(class) => &mut class.layout,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        *self.layout_mut() = layout;
        self
    }

    /// Change the spacing above the member, keeping its comments
    pub fn with_blank_lines(mut self, blank_lines: u8) -> Self {
        self.layout_mut().blank_lines = blank_lines;
        self
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Member::Field(_))
    }

    /// Declared name, if the member has exactly one
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Field(field) => field.single_name(),
            Member::Method(method) => Some(&method.name),
            Member::Initializer(_) => None,
            Member::Class(class) => Some(&class.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub layout: Layout,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub vars: Vec<VarDeclarator>,
}

impl FieldDecl {
    /// Name of the only declarator, `None` for `int a, b;`
    pub fn single_name(&self) -> Option<&str> {
        match self.vars.as_slice() {
            [var] => Some(&var.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclarator {
    pub name: String,
    pub dims: usize,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub layout: Layout,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub type_params: Option<String>,
    /// `None` for constructors
    pub return_type: Option<TypeRef>,
    pub name: String,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    /// `None` for abstract and interface methods
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub varargs: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub layout: Layout,
    pub is_static: bool,
    pub body: Block,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    LocalVar {
        modifiers: Vec<Modifier>,
        ty: TypeRef,
        vars: Vec<VarDeclarator>,
    },
    Expression(Expr),
    Return(Option<Expr>),
    Throw(Expr),
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    For {
        /// Local declaration or expression statements before the first `;`
        init: Vec<Statement>,
        condition: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Statement>,
    },
    ForEach {
        modifiers: Vec<Modifier>,
        ty: TypeRef,
        name: String,
        iterable: Expr,
        body: Box<Statement>,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expr,
    },
    Try {
        /// Resource declarations or expressions, without separators
        resources: Vec<Statement>,
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: Expr,
        body: Block,
    },
    Labeled {
        label: String,
        body: Box<Statement>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Assert {
        condition: Expr,
        message: Option<Expr>,
    },
    Block(Block),
    Empty,
    /// Comment on its own line inside a block
    Comment(String),
    /// Statement kept verbatim because the parser does not model it
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub modifiers: Vec<Modifier>,
    /// Alternatives of a multi-catch, `IOException | RuntimeException`
    pub types: Vec<TypeRef>,
    pub name: String,
    pub body: Block,
}

/// One `case`/`default` group of a switch statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Empty for `default`
    pub labels: Vec<Expr>,
    pub body: Vec<Statement>,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Int,
    Float,
    String,
    Char,
    Boolean,
    Null,
}

/// Literal kept with its source text so printing is lossless
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Self {
            kind: LiteralKind::Int,
            text: value.to_string(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            kind: LiteralKind::Boolean,
            text: value.to_string(),
        }
    }

    pub fn null() -> Self {
        Self {
            kind: LiteralKind::Null,
            text: "null".to_string(),
        }
    }

    pub fn string(content: &str) -> Self {
        Self {
            kind: LiteralKind::String,
            text: format!("\"{content}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
    PreIncrement,
    PreDecrement,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::PreIncrement => "++",
            UnaryOp::PreDecrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl PostfixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostfixOp::Increment => "++",
            PostfixOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    InstanceOf,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::UnsignedShiftRight => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    UnsignedShiftRightAssign,
}

impl AssignOp {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::AddAssign,
            "-=" => AssignOp::SubtractAssign,
            "*=" => AssignOp::MultiplyAssign,
            "/=" => AssignOp::DivideAssign,
            "%=" => AssignOp::ModuloAssign,
            "&=" => AssignOp::AndAssign,
            "|=" => AssignOp::OrAssign,
            "^=" => AssignOp::XorAssign,
            "<<=" => AssignOp::ShiftLeftAssign,
            ">>=" => AssignOp::ShiftRightAssign,
            ">>>=" => AssignOp::UnsignedShiftRightAssign,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubtractAssign => "-=",
            AssignOp::MultiplyAssign => "*=",
            AssignOp::DivideAssign => "/=",
            AssignOp::ModuloAssign => "%=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShiftLeftAssign => "<<=",
            AssignOp::ShiftRightAssign => ">>=",
            AssignOp::UnsignedShiftRightAssign => ">>>=",
        }
    }
}

/// Call expression: `target.name(args)` or `name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub target: Option<Box<Expr>>,
    pub name: String,
    pub args: Vec<Expr>,
}

impl MethodCall {
    /// Unqualified call with no arguments, e.g. `helper()`
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            target: None,
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    FieldAccess {
        target: Box<Expr>,
        name: String,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    MethodCall(MethodCall),
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    NewArray {
        element: TypeRef,
        dims: Vec<Expr>,
        extra_dims: usize,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    /// Dotted name of a pure `a.b.c` chain
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::FieldAccess { target, name } => {
                target.qualified_name().map(|prefix| format!("{prefix}.{name}"))
            }
            _ => None,
        }
    }
}

/// Borrowed view over any node, for read-only walks
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    CompilationUnit(&'a CompilationUnit),
    Import(&'a Import),
    Class(&'a ClassDecl),
    Field(&'a FieldDecl),
    Method(&'a MethodDecl),
    Initializer(&'a Initializer),
    Statement(&'a Statement),
    Expression(&'a Expr),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::CompilationUnit(_) => NodeKind::CompilationUnit,
            NodeRef::Import(_) => NodeKind::Import,
            NodeRef::Class(_) => NodeKind::Class,
            NodeRef::Field(_) => NodeKind::Field,
            NodeRef::Method(_) => NodeKind::Method,
            NodeRef::Initializer(_) => NodeKind::Initializer,
            NodeRef::Statement(_) => NodeKind::Statement,
            NodeRef::Expression(Expr::MethodCall(_)) => NodeKind::MethodCall,
            NodeRef::Expression(_) => NodeKind::Expression,
        }
    }

    pub fn from_member(member: &'a Member) -> Self {
        match member {
            Member::Field(field) => NodeRef::Field(field),
            Member::Method(method) => NodeRef::Method(method),
            Member::Initializer(init) => NodeRef::Initializer(init),
            Member::Class(class) => NodeRef::Class(class),
        }
    }
}
