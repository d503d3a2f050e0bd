// ir.rs — IR node types consumed from the front-end compiler
//
// A lowered imaging pipeline arrives as a tree of statements and expressions.
// The node set is closed: every traversal in this crate matches exhaustively,
// so adding a node kind forces every pass to decide how to handle it.
//
// Preconditions: produced by the front end (or `parser::parse`), already
//                scheduled and bounds-inferred.
// Postconditions: immutable during code generation.
// Failure modes: none (data-only module).
// Side effects: none.

use std::fmt;

// ── Types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    Handle,
}

/// Scalar element type with an explicit bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u8,
}

impl Type {
    pub const fn int(bits: u8) -> Self {
        Type {
            code: TypeCode::Int,
            bits,
        }
    }

    pub const fn uint(bits: u8) -> Self {
        Type {
            code: TypeCode::UInt,
            bits,
        }
    }

    pub const fn float(bits: u8) -> Self {
        Type {
            code: TypeCode::Float,
            bits,
        }
    }

    pub const fn bool() -> Self {
        Type::uint(1)
    }

    pub const fn handle() -> Self {
        Type {
            code: TypeCode::Handle,
            bits: 64,
        }
    }

    pub fn is_float(&self) -> bool {
        self.code == TypeCode::Float
    }

    pub fn is_handle(&self) -> bool {
        self.code == TypeCode::Handle
    }

    /// Parse a type keyword as written in textual IR (`uint8`, `float32`, ...).
    pub fn from_keyword(word: &str) -> Option<Type> {
        let ty = match word {
            "bool" | "uint1" => Type::bool(),
            "int8" => Type::int(8),
            "int16" => Type::int(16),
            "int32" => Type::int(32),
            "int64" => Type::int(64),
            "uint8" => Type::uint(8),
            "uint16" => Type::uint(16),
            "uint32" => Type::uint(32),
            "uint64" => Type::uint(64),
            "float16" => Type::float(16),
            "float32" | "float" => Type::float(32),
            "float64" | "double" => Type::float(64),
            "handle" => Type::handle(),
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            TypeCode::UInt if self.bits == 1 => write!(f, "bool"),
            TypeCode::Int => write!(f, "int{}", self.bits),
            TypeCode::UInt => write!(f, "uint{}", self.bits),
            TypeCode::Float => write!(f, "float{}", self.bits),
            TypeCode::Handle => write!(f, "handle"),
        }
    }
}

// ── Expressions ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Infix spelling, shared by IR display and C printing. `Min`/`Max` have none.
    pub fn symbol(&self) -> Option<&'static str> {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Min | BinOp::Max => return None,
        };
        Some(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntImm {
        value: i64,
        ty: Type,
    },
    FloatImm {
        value: f64,
        ty: Type,
    },
    StringImm(String),
    Variable {
        name: String,
        ty: Type,
    },
    Cast {
        ty: Type,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },
    Not(Box<Expr>),
    Select {
        condition: Box<Expr>,
        true_value: Box<Expr>,
        false_value: Box<Expr>,
    },
    Load {
        name: String,
        ty: Type,
        index: Box<Expr>,
    },
    Call {
        name: String,
        ty: Type,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Expr {
        Expr::IntImm {
            value,
            ty: Type::int(32),
        }
    }

    pub fn string(value: impl Into<String>) -> Expr {
        Expr::StringImm(value.into())
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Expr {
        Expr::Variable {
            name: name.into(),
            ty,
        }
    }

    pub fn load(name: impl Into<String>, ty: Type, index: Expr) -> Expr {
        Expr::Load {
            name: name.into(),
            ty,
            index: Box::new(index),
        }
    }

    pub fn call(name: impl Into<String>, ty: Type, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.into(),
            ty,
            args,
        }
    }

    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Expr {
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOp::Mul, a, b)
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        Expr::binary(BinOp::Add, a, b)
    }

    pub fn ty(&self) -> Type {
        match self {
            Expr::IntImm { ty, .. }
            | Expr::FloatImm { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Load { ty, .. }
            | Expr::Call { ty, .. } => *ty,
            Expr::StringImm(_) => Type::handle(),
            Expr::Binary { op, a, .. } => {
                if op.is_comparison() || matches!(op, BinOp::And | BinOp::Or) {
                    Type::bool()
                } else {
                    a.ty()
                }
            }
            Expr::Not(_) => Type::bool(),
            Expr::Select { true_value, .. } => true_value.ty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::IntImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Expr::StringImm(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<(&str, &[Expr])> {
        match self {
            Expr::Call { name, args, .. } => Some((name, args)),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntImm { value, .. } => write!(f, "{value}"),
            Expr::FloatImm { value, .. } => write!(f, "{value:?}"),
            Expr::StringImm(s) => write!(f, "{s:?}"),
            Expr::Variable { name, .. } => write!(f, "{name}"),
            Expr::Cast { ty, value } => write!(f, "cast<{ty}>({value})"),
            Expr::Binary { op, a, b } => match op.symbol() {
                Some(sym) => write!(f, "({a} {sym} {b})"),
                None if *op == BinOp::Min => write!(f, "min({a}, {b})"),
                None => write!(f, "max({a}, {b})"),
            },
            Expr::Not(e) => write!(f, "!{e}"),
            Expr::Select {
                condition,
                true_value,
                false_value,
            } => write!(f, "select({condition}, {true_value}, {false_value})"),
            Expr::Load { name, ty, index } => write!(f, "load<{ty}>({name}, {index})"),
            Expr::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ── Statements ──

/// Half-open bound of one realized dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: Expr,
    pub extent: Expr,
}

impl Range {
    pub fn new(min: Expr, extent: Expr) -> Self {
        Range { min, extent }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },
    AssertStmt {
        condition: Expr,
        message: String,
    },
    ProducerConsumer {
        name: String,
        is_producer: bool,
        body: Box<Stmt>,
    },
    For {
        name: String,
        min: Expr,
        extent: Expr,
        body: Box<Stmt>,
    },
    Store {
        name: String,
        value: Expr,
        index: Expr,
    },
    Provide {
        name: String,
        value: Expr,
        args: Vec<Expr>,
    },
    Allocate {
        name: String,
        ty: Type,
        extents: Vec<Expr>,
        body: Box<Stmt>,
    },
    Free {
        name: String,
    },
    Realize {
        name: String,
        ty: Type,
        bounds: Vec<Range>,
        body: Box<Stmt>,
    },
    /// Binary sequence; longer sequences nest to the right.
    Block {
        first: Box<Stmt>,
        rest: Box<Stmt>,
    },
    IfThenElse {
        condition: Expr,
        then_case: Box<Stmt>,
        else_case: Option<Box<Stmt>>,
    },
    Evaluate(Expr),
}

impl Stmt {
    /// The statement that does nothing (`Evaluate(0)`).
    pub fn no_op() -> Stmt {
        Stmt::Evaluate(Expr::int(0))
    }

    pub fn evaluate(e: Expr) -> Stmt {
        Stmt::Evaluate(e)
    }

    /// Fold a statement list into right-nested `Block`s.
    pub fn block(stmts: Vec<Stmt>) -> Stmt {
        let mut iter = stmts.into_iter().rev();
        let Some(mut acc) = iter.next() else {
            return Stmt::no_op();
        };
        for s in iter {
            acc = Stmt::Block {
                first: Box::new(s),
                rest: Box::new(acc),
            };
        }
        acc
    }

    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Stmt {
        Stmt::LetStmt {
            name: name.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn producer(name: impl Into<String>, body: Stmt) -> Stmt {
        Stmt::ProducerConsumer {
            name: name.into(),
            is_producer: true,
            body: Box::new(body),
        }
    }

    pub fn for_loop(name: impl Into<String>, min: Expr, extent: Expr, body: Stmt) -> Stmt {
        Stmt::For {
            name: name.into(),
            min,
            extent,
            body: Box::new(body),
        }
    }

    pub fn store(name: impl Into<String>, value: Expr, index: Expr) -> Stmt {
        Stmt::Store {
            name: name.into(),
            value,
            index,
        }
    }

    pub fn allocate(name: impl Into<String>, ty: Type, extents: Vec<Expr>, body: Stmt) -> Stmt {
        Stmt::Allocate {
            name: name.into(),
            ty,
            extents,
            body: Box::new(body),
        }
    }

    pub fn realize(name: impl Into<String>, ty: Type, bounds: Vec<Range>, body: Stmt) -> Stmt {
        Stmt::Realize {
            name: name.into(),
            ty,
            bounds,
            body: Box::new(body),
        }
    }

    /// Left-most leaf of a (possibly nested) block.
    pub fn leading(&self) -> &Stmt {
        match self {
            Stmt::Block { first, .. } => first.leading(),
            other => other,
        }
    }
}

// ── Pipeline ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Buffer,
    Scalar,
}

/// One parameter of the lowered host function.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub ty: Type,
}

/// A lowered function: the unit handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Stmt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_nests_to_the_right() {
        let s = Stmt::block(vec![
            Stmt::evaluate(Expr::int(1)),
            Stmt::evaluate(Expr::int(2)),
            Stmt::evaluate(Expr::int(3)),
        ]);
        match &s {
            Stmt::Block { first, rest } => {
                assert_eq!(**first, Stmt::evaluate(Expr::int(1)));
                assert!(matches!(**rest, Stmt::Block { .. }));
            }
            other => panic!("expected block, got {other:?}"),
        }
        assert_eq!(*s.leading(), Stmt::evaluate(Expr::int(1)));
    }

    #[test]
    fn empty_block_is_no_op() {
        assert_eq!(Stmt::block(vec![]), Stmt::no_op());
    }

    #[test]
    fn comparison_has_bool_type() {
        let e = Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2));
        assert_eq!(e.ty(), Type::bool());
        let e = Expr::add(Expr::var("x", Type::uint(16)), Expr::int(2));
        assert_eq!(e.ty(), Type::uint(16));
    }

    #[test]
    fn type_keywords() {
        assert_eq!(Type::from_keyword("uint8"), Some(Type::uint(8)));
        assert_eq!(Type::from_keyword("float"), Some(Type::float(32)));
        assert_eq!(Type::from_keyword("cfloat"), None);
        assert_eq!(format!("{}", Type::float(64)), "float64");
    }

    #[test]
    fn expr_display() {
        let e = Expr::mul(Expr::var("a.extent.0", Type::int(32)), Expr::int(4));
        assert_eq!(format!("{e}"), "(a.extent.0 * 4)");
    }
}
