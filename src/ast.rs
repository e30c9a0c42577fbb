// src/ast.rs
//
// Generated program trees. Declarations own their bodies behind `Rc` so the
// context can hold cheap copies for lookups while the tree is emitted from
// the same values.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::builtins::Language;
use crate::context::Context;
use crate::types::{Type, TypeConstructor, TypeParameter};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A local or top-level variable (`val`/`var` in Kotlin, a local or static
/// field in Java).
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    pub expr: Rc<Expr>,
    pub is_final: bool,
    /// Emit without a declared type and let the target compiler infer it.
    pub inferred: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: Type,
    pub default: Option<Rc<Expr>>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub is_final: bool,
    pub can_override: bool,
    pub is_override: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncKind {
    TopLevel,
    ClassMethod,
    /// Declared inside another function's body.
    Nested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret_type: Type,
    /// `None` for abstract and interface methods.
    pub body: Option<Rc<Expr>>,
    pub kind: FuncKind,
    pub type_params: Vec<TypeParameter>,
    pub is_final: bool,
    pub is_override: bool,
}

impl FuncDecl {
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_parameterized(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Regular,
    Abstract,
    Interface,
}

/// A supertype in a class header. Interfaces carry no constructor arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperClassInst {
    pub class_type: Type,
    pub args: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeParameter>,
    pub superclasses: Vec<SuperClassInst>,
    pub fields: Vec<FieldDecl>,
    pub functions: Vec<FuncDecl>,
    pub is_final: bool,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_params: Vec::new(),
            superclasses: Vec::new(),
            fields: Vec::new(),
            functions: Vec::new(),
            is_final: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, ClassKind::Abstract | ClassKind::Interface)
    }

    pub fn is_regular(&self) -> bool {
        self.kind == ClassKind::Regular
    }

    pub fn is_parameterized(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn supertypes(&self) -> Vec<Type> {
        self.superclasses
            .iter()
            .map(|s| s.class_type.clone())
            .collect()
    }

    /// The class as a type: a simple classifier, or a type constructor
    /// when the class is generic.
    pub fn get_type(&self) -> Type {
        if self.type_params.is_empty() {
            Type::Simple(crate::types::SimpleClassifier {
                name: self.name.clone(),
                supertypes: self.supertypes(),
            })
        } else {
            Type::Constructor(TypeConstructor {
                name: self.name.clone(),
                type_parameters: self.type_params.clone(),
                supertypes: self.supertypes(),
                builtin: false,
            })
        }
    }

    pub fn field_types(&self) -> Vec<Type> {
        self.fields.iter().map(|f| f.ty.clone()).collect()
    }

    pub fn abstract_functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.functions.iter().filter(|f| f.is_abstract())
    }

    pub fn overridable_functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.functions.iter().filter(|f| !f.is_final)
    }

    pub fn overridable_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| f.can_override)
    }
}

/// A closure. The name is the synthetic namespace segment its parameters
/// live under.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret_type: Type,
    pub body: Box<Expr>,
    /// The `FunctionN` type of the closure.
    pub signature: Type,
    /// Interface the closure is SAM-converted to, if any.
    pub sam_target: Option<Type>,
}

/// Every kind of declaration the context can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Param(ParamDecl),
    Field(FieldDecl),
    Func(FuncDecl),
    Class(ClassDecl),
    Lambda(LambdaDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Var(v) => &v.name,
            Decl::Param(p) => &p.name,
            Decl::Field(f) => &f.name,
            Decl::Func(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::Lambda(l) => &l.name,
        }
    }

    /// The value type of a variable-like declaration.
    pub fn var_type(&self) -> Option<&Type> {
        match self {
            Decl::Var(v) => Some(&v.ty),
            Decl::Param(p) => Some(&p.ty),
            Decl::Field(f) => Some(&f.ty),
            Decl::Func(_) | Decl::Class(_) | Decl::Lambda(_) => None,
        }
    }

    /// Parameters are final in both target languages as far as the
    /// generator is concerned.
    pub fn is_final(&self) -> bool {
        match self {
            Decl::Var(v) => v.is_final,
            Decl::Param(_) => true,
            Decl::Field(f) => f.is_final,
            Decl::Func(f) => f.is_final,
            Decl::Class(c) => c.is_final,
            Decl::Lambda(_) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOp {
    Inc,
    Dec,
}

impl ArithOp {
    pub const ALL: [ArithOp; 4] = [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div];

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl CmpOp {
    pub const ALL: [CmpOp; 4] = [CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge];

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

impl EqOp {
    pub fn symbol(self) -> &'static str {
        match self {
            EqOp::Eq => "==",
            EqOp::Ne => "!=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

impl IncDecOp {
    pub fn symbol(self) -> &'static str {
        match self {
            IncDecOp::Inc => "++",
            IncDecOp::Dec => "--",
        }
    }
}

/// A sequence of declarations and expressions. The last expression is the
/// block's value when the block is a function body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub is_func_block: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Decl(Decl),
    Expr(Expr),
}

impl Block {
    /// Statement expressions and local variable initializers, in order.
    pub fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.stmts.iter().filter_map(|s| match s {
            Stmt::Expr(e) => Some(e),
            Stmt::Decl(Decl::Var(v)) => Some(v.expr.as_ref()),
            Stmt::Decl(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loop {
    /// `for (x in iterable)`.
    ForEach {
        var: String,
        iterable: Expr,
        body: Block,
    },
    /// `for (x in from until to)`.
    ForRange {
        var: String,
        from: Expr,
        to: Expr,
        body: Block,
    },
    /// `while (cond)` or, with `do_while`, `do { } while (cond)`.
    While {
        cond: Expr,
        body: Block,
        do_while: bool,
    },
}

impl Loop {
    /// The iterable, bounds or condition evaluated outside the body.
    pub fn head(&self) -> SmallVec<[&Expr; 2]> {
        match self {
            Loop::ForEach { iterable, .. } => SmallVec::from_iter([iterable]),
            Loop::ForRange { from, to, .. } => SmallVec::from_iter([from, to]),
            Loop::While { cond, .. } => SmallVec::from_iter([cond]),
        }
    }

    pub fn body(&self) -> &Block {
        match self {
            Loop::ForEach { body, .. } | Loop::ForRange { body, .. } | Loop::While { body, .. } => {
                body
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A value that could not be built without unbounded recursion. Typed
    /// as a subtype of everything; emitters render a throwing default.
    Unresolved(Type),
    Constant {
        literal: String,
        ty: Type,
    },
    Variable {
        name: String,
        ty: Type,
    },
    Block(Block),
    Conditional {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        ty: Type,
    },
    /// `var is T`, narrowing `var` inside the true branch of an enclosing
    /// conditional.
    Is {
        var: String,
        target: Type,
        ty: Type,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
    },
    Equality {
        op: EqOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
    },
    Comparison {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
    },
    /// `cast` narrows the promoted result back to `ty`.
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
        cast: bool,
    },
    New {
        class_type: Type,
        args: Vec<Expr>,
    },
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
        ty: Type,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        receiver: Option<Box<Expr>>,
        type_args: Vec<Type>,
        ret_type: Type,
        /// Invocation of a function-typed value rather than a declared function.
        is_ref_call: bool,
    },
    FunctionRef {
        receiver: Option<Box<Expr>>,
        name: String,
        signature: Type,
    },
    Lambda(Box<LambdaDecl>),
    Array {
        ty: Type,
        elems: Vec<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        ty: Type,
    },
    Assignment {
        receiver: Option<Box<Expr>>,
        name: String,
        value: Box<Expr>,
    },
    IncDec {
        name: String,
        op: IncDecOp,
    },
    Loop(Box<Loop>),
    /// Length of a string-typed expression.
    StringLength {
        expr: Box<Expr>,
        ty: Type,
    },
    Print(Box<Expr>),
}

impl Expr {
    pub fn variable(name: impl Into<String>, ty: Type) -> Self {
        Expr::Variable {
            name: name.into(),
            ty,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Expr::Unresolved(_))
    }

    /// The static type of the expression, or `None` for statement-like
    /// nodes that produce no value.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Expr::Unresolved(ty)
            | Expr::Constant { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Conditional { ty, .. }
            | Expr::Is { ty, .. }
            | Expr::Logical { ty, .. }
            | Expr::Equality { ty, .. }
            | Expr::Comparison { ty, .. }
            | Expr::Arith { ty, .. }
            | Expr::FieldAccess { ty, .. }
            | Expr::Array { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::StringLength { ty, .. } => Some(ty.clone()),
            Expr::New { class_type, .. } => Some(class_type.clone()),
            Expr::FunctionCall { ret_type, .. } => Some(ret_type.clone()),
            Expr::FunctionRef { signature, .. } => Some(signature.clone()),
            Expr::Lambda(l) => Some(l.sam_target.clone().unwrap_or_else(|| l.signature.clone())),
            Expr::Block(block) => block.stmts.last().and_then(|stmt| match stmt {
                Stmt::Expr(e) => e.ty(),
                Stmt::Decl(_) => None,
            }),
            Expr::Assignment { .. } | Expr::IncDec { .. } | Expr::Loop(_) | Expr::Print(_) => {
                None
            }
        }
    }

    /// Nesting depth of the expression tree, counting this node.
    pub fn depth(&self) -> usize {
        1 + self.children().map(Expr::depth).max().unwrap_or(0)
    }

    /// Direct sub-expressions, excluding nested declaration bodies.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Expr> + '_> {
        match self {
            Expr::Unresolved(_)
            | Expr::Constant { .. }
            | Expr::Variable { .. }
            | Expr::Is { .. }
            | Expr::IncDec { .. } => Box::new(std::iter::empty()),
            Expr::Block(block) => Box::new(block.exprs()),
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
                ..
            } => Box::new(
                [cond.as_ref(), then_branch.as_ref(), else_branch.as_ref()].into_iter(),
            ),
            Expr::Logical { lhs, rhs, .. }
            | Expr::Equality { lhs, rhs, .. }
            | Expr::Comparison { lhs, rhs, .. }
            | Expr::Arith { lhs, rhs, .. } => Box::new([lhs.as_ref(), rhs.as_ref()].into_iter()),
            Expr::New { args, .. } => Box::new(args.iter()),
            Expr::FieldAccess { receiver, .. } => Box::new(std::iter::once(receiver.as_ref())),
            Expr::FunctionCall { args, receiver, .. } => {
                Box::new(receiver.iter().map(|r| &**r).chain(args.iter()))
            }
            Expr::FunctionRef { receiver, .. } => Box::new(receiver.iter().map(|r| &**r)),
            Expr::Lambda(l) => Box::new(std::iter::once(l.body.as_ref())),
            Expr::Array { elems, .. } => Box::new(elems.iter()),
            Expr::Cast { expr, .. } | Expr::StringLength { expr, .. } => {
                Box::new(std::iter::once(expr.as_ref()))
            }
            Expr::Print(expr) => Box::new(std::iter::once(expr.as_ref())),
            Expr::Assignment {
                receiver, value, ..
            } => Box::new(
                receiver
                    .iter()
                    .map(|r| &**r)
                    .chain(std::iter::once(value.as_ref())),
            ),
            Expr::Loop(l) => Box::new(l.head().into_iter().chain(l.body().exprs())),
        }
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

/// A generated program: every declaration lives in the context, top-level
/// ones in the global namespace in generation order.
#[derive(Debug, Clone)]
pub struct Program {
    pub language: Language,
    pub context: Context,
}

impl Program {
    pub fn new(language: Language, context: Context) -> Self {
        Self { language, context }
    }

    /// Top-level declarations in generation order.
    pub fn top_level(&self) -> Vec<&Decl> {
        self.context.top_level()
    }
}

impl fmt::Display for FuncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FuncKind::TopLevel => "top-level",
            FuncKind::ClassMethod => "method",
            FuncKind::Nested => "nested",
        };
        write!(f, "{label}")
    }
}
