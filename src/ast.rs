//! The typed syntax tree produced by the parser. Every node carries the
//! line/column of its first token so the evaluator can attribute runtime
//! errors precisely.

#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<FunctionDef>,
    pub top_level: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub error_type: Option<String>,
    pub var: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    Define {
        name: String,
        line: usize,
        column: usize,
    },
    Return(Option<Expr>, usize, usize),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    ForC {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    ForIn {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },
    Break(usize, usize),
    Continue(usize, usize),
    Import {
        path: Vec<String>,
        alias: Option<String>,
        line: usize,
        column: usize,
    },
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Throw(Option<Expr>, usize, usize),
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLiteral(i64, usize, usize),
    FloatLiteral(f64, usize, usize),
    StringLiteral(String, usize, usize),
    FString(String, usize, usize),
    BoolLiteral(bool, usize, usize),
    Identifier(String, usize, usize),
    Assign {
        name: String,
        is_constant: bool,
        value: Box<Expr>,
        line: usize,
        column: usize,
    },
    MultiAssign {
        targets: Vec<String>,
        value: Box<Expr>,
        line: usize,
        column: usize,
    },
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
        line: usize,
        column: usize,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        line: usize,
        column: usize,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
        named_args: Vec<(String, Expr)>,
        line: usize,
        column: usize,
    },
    CallExpr {
        callee: Box<Expr>,
        args: Vec<Expr>,
        named_args: Vec<(String, Expr)>,
        line: usize,
        column: usize,
    },
    Member {
        object: Box<Expr>,
        property: String,
        line: usize,
        column: usize,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        line: usize,
        column: usize,
    },
    Array(Vec<Expr>, usize, usize),
    Dict(Vec<(Expr, Expr)>, usize, usize),
    Tuple(Vec<Expr>, usize, usize),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
        line: usize,
        column: usize,
    },
}

impl Expr {
    pub fn position(&self) -> (usize, usize) {
        match self {
            Expr::IntLiteral(_, l, c)
            | Expr::FloatLiteral(_, l, c)
            | Expr::StringLiteral(_, l, c)
            | Expr::FString(_, l, c)
            | Expr::BoolLiteral(_, l, c)
            | Expr::Identifier(_, l, c)
            | Expr::Array(_, l, c)
            | Expr::Dict(_, l, c)
            | Expr::Tuple(_, l, c) => (*l, *c),
            Expr::Assign { line, column, .. }
            | Expr::MultiAssign { line, column, .. }
            | Expr::Binary { line, column, .. }
            | Expr::Unary { line, column, .. }
            | Expr::Call { line, column, .. }
            | Expr::CallExpr { line, column, .. }
            | Expr::Member { line, column, .. }
            | Expr::Index { line, column, .. }
            | Expr::Lambda { line, column, .. } => (*line, *column),
        }
    }
}
