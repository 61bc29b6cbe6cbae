use crate::core::Value;
use std::fmt;

/// Root statement type
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(QueryStmt),
    Explain(Box<QueryStmt>),
}

impl Statement {
    /// Tables named in FROM, in order of appearance
    pub fn referenced_tables(&self) -> Vec<&str> {
        match self {
            Statement::Query(query) => vec![query.from.name.as_str()],
            Statement::Explain(query) => vec![query.from.name.as_str()],
        }
    }
}

/// SELECT over a single table
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStmt {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: TableRef,
    pub selection: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    /// `label` is the expression's SQL text, used as the column name without an alias
    Expr {
        expr: Expr,
        alias: Option<String>,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub descending: bool,
    /// Explicit NULLS FIRST / NULLS LAST; `None` keeps the direction's default
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    CompoundIdentifier(Vec<String>),
    Literal(Value),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Not {
        expr: Box<Expr>,
    },
    Negate {
        expr: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{}", symbol)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Expr]) -> fmt::Result {
    for (i, item) in list.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::CompoundIdentifier(parts) => write!(f, "{}", parts.join(".")),
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Not { expr } => write!(f, "NOT {}", expr),
            Expr::Negate { expr } => write!(f, "-{}", expr),
            Expr::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(negated)),
            Expr::In { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, not(negated))?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Expr::Between { expr, low, high, negated } => {
                write!(f, "{} {}BETWEEN {} AND {}", expr, not(negated), low, high)
            }
            Expr::Like { expr, pattern, negated, case_insensitive } => {
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {}{} {}", expr, not(negated), keyword, pattern)
            }
        }
    }
}
