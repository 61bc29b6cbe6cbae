use crate::core::{Column, Schema};
use crate::parser::ast::{Expr, OrderByExpr};
use std::fmt;

/// Logical plan nodes - high-level operations
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Scan a table
    TableScan(TableScanNode),

    /// Filter rows
    Filter(FilterNode),

    /// Sort rows
    Sort(SortNode),

    /// Skip and cap rows
    Limit(LimitNode),

    /// Compute output columns
    Projection(ProjectionNode),

    /// Drop duplicate output rows
    Distinct(DistinctNode),
}

#[derive(Debug, Clone)]
pub struct TableScanNode {
    pub table_name: String,
    pub alias: Option<String>,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct FilterNode {
    pub input: Box<LogicalPlan>,
    pub predicate: Expr,
}

#[derive(Debug, Clone)]
pub struct SortNode {
    pub input: Box<LogicalPlan>,
    /// Projection aliases are already replaced by the expressions they name
    pub order_by: Vec<OrderByExpr>,
}

#[derive(Debug, Clone)]
pub struct LimitNode {
    pub input: Box<LogicalPlan>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct ProjectionNode {
    pub input: Box<LogicalPlan>,
    pub expressions: Vec<Expr>,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct DistinctNode {
    pub input: Box<LogicalPlan>,
}

impl LogicalPlan {
    /// Get the output schema of this plan
    pub fn schema(&self) -> &Schema {
        match self {
            LogicalPlan::TableScan(node) => &node.schema,
            LogicalPlan::Projection(node) => &node.schema,
            LogicalPlan::Filter(FilterNode { input, .. })
            | LogicalPlan::Sort(SortNode { input, .. })
            | LogicalPlan::Limit(LimitNode { input, .. })
            | LogicalPlan::Distinct(DistinctNode { input }) => input.schema(),
        }
    }

    /// Get child plans
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::TableScan(_) => vec![],
            LogicalPlan::Filter(node) => vec![&*node.input],
            LogicalPlan::Sort(node) => vec![&*node.input],
            LogicalPlan::Limit(node) => vec![&*node.input],
            LogicalPlan::Projection(node) => vec![&*node.input],
            LogicalPlan::Distinct(node) => vec![&*node.input],
        }
    }

    /// The scan at the leaf of the plan
    pub fn table_scan(&self) -> &TableScanNode {
        match self {
            LogicalPlan::TableScan(node) => node,
            LogicalPlan::Filter(FilterNode { input, .. })
            | LogicalPlan::Sort(SortNode { input, .. })
            | LogicalPlan::Limit(LimitNode { input, .. })
            | LogicalPlan::Projection(ProjectionNode { input, .. })
            | LogicalPlan::Distinct(DistinctNode { input }) => input.table_scan(),
        }
    }

    /// One line per node, children indented below their parent
    pub fn explain_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.collect_lines(0, &mut lines);
        lines
    }

    fn collect_lines(&self, depth: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}{}", "  ".repeat(depth), self.describe()));
        for child in self.children() {
            child.collect_lines(depth + 1, lines);
        }
    }

    fn describe(&self) -> String {
        match self {
            LogicalPlan::TableScan(node) => {
                let columns = node.schema.column_names().join(", ");
                match &node.alias {
                    Some(alias) => format!("TableScan: {} AS {} [{}]", node.table_name, alias, columns),
                    None => format!("TableScan: {} [{}]", node.table_name, columns),
                }
            }
            LogicalPlan::Filter(node) => format!("Filter: {}", node.predicate),
            LogicalPlan::Sort(node) => {
                let keys: Vec<String> = node
                    .order_by
                    .iter()
                    .map(|o| {
                        let direction = if o.descending { "DESC" } else { "ASC" };
                        match o.nulls_first {
                            Some(true) => format!("{} {} NULLS FIRST", o.expr, direction),
                            Some(false) => format!("{} {} NULLS LAST", o.expr, direction),
                            None => format!("{} {}", o.expr, direction),
                        }
                    })
                    .collect();
                format!("Sort: {}", keys.join(", "))
            }
            LogicalPlan::Limit(node) => match node.limit {
                Some(limit) => format!("Limit: limit={} offset={}", limit, node.offset),
                None => format!("Limit: offset={}", node.offset),
            },
            LogicalPlan::Projection(node) => {
                let items: Vec<String> = node
                    .expressions
                    .iter()
                    .zip(node.schema.columns())
                    .map(|(expr, column)| describe_projection(expr, column))
                    .collect();
                format!("Projection: {}", items.join(", "))
            }
            LogicalPlan::Distinct(_) => "Distinct".to_string(),
        }
    }
}

fn describe_projection(expr: &Expr, column: &Column) -> String {
    let rendered = expr.to_string();
    if rendered == column.name {
        rendered
    } else {
        format!("{} AS {}", rendered, column.name)
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain_lines().join("\n"))
    }
}
