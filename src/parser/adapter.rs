use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use crate::core::{Result, SqlError};
use crate::parser::ast::*;
use crate::plugins::ExpressionConverter;

/// Translates SQL text into the internal AST.
///
/// Only read-only queries are accepted: tables enter the registry through the
/// context API, never through DDL text.
pub struct SqlParserAdapter {
    dialect: PostgreSqlDialect,
    expr_converter: ExpressionConverter,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
            expr_converter: ExpressionConverter::new(),
        }
    }

    pub fn with_expression_converter(expr_converter: ExpressionConverter) -> Self {
        Self {
            dialect: PostgreSqlDialect {},
            expr_converter,
        }
    }

    /// Parse exactly one statement
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let mut statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| SqlError::ParseError(e.to_string()))?;

        match statements.len() {
            0 => Err(SqlError::ParseError("No statement found".into())),
            1 => self.convert_statement(statements.remove(0)),
            n => Err(SqlError::UnsupportedOperation(format!(
                "Expected a single statement, found {}",
                n
            ))),
        }
    }

    fn convert_statement(&self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::Query(query) => Ok(Statement::Query(self.convert_query(*query)?)),
            sql_ast::Statement::Explain { statement, .. } => match *statement {
                sql_ast::Statement::Query(query) => {
                    Ok(Statement::Explain(Box::new(self.convert_query(*query)?)))
                }
                other => Err(SqlError::UnsupportedOperation(format!(
                    "EXPLAIN only supports SELECT, got: {}",
                    other
                ))),
            },
            other => Err(SqlError::UnsupportedOperation(format!(
                "Only SELECT and EXPLAIN are supported, got: {}",
                other
            ))),
        }
    }

    fn convert_query(&self, query: sql_ast::Query) -> Result<QueryStmt> {
        if query.with.is_some() {
            return Err(SqlError::UnsupportedOperation("WITH clauses are not supported".into()));
        }

        let query_clauses = [
            ("FETCH", query.fetch.is_some()),
            ("FOR UPDATE / FOR SHARE", !query.locks.is_empty()),
            ("FOR XML / FOR JSON", query.for_clause.is_some()),
            ("SETTINGS", query.settings.is_some()),
            ("FORMAT", query.format_clause.is_some()),
            ("pipe operators", !query.pipe_operators.is_empty()),
        ];
        reject_clauses(&query_clauses)?;

        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(SqlError::UnsupportedOperation(
                "Only plain SELECT queries are supported".into(),
            ));
        };
        let select = *select;

        let select_clauses = [
            ("TOP", select.top.is_some()),
            ("SELECT INTO", select.into.is_some()),
            ("EXCLUDE", select.exclude.is_some()),
            ("LATERAL VIEW", !select.lateral_views.is_empty()),
            ("PREWHERE", select.prewhere.is_some()),
            ("CLUSTER BY", !select.cluster_by.is_empty()),
            ("DISTRIBUTE BY", !select.distribute_by.is_empty()),
            ("SORT BY", !select.sort_by.is_empty()),
            ("WINDOW", !select.named_window.is_empty()),
            ("QUALIFY", select.qualify.is_some()),
            ("SELECT AS STRUCT / VALUE", select.value_table_mode.is_some()),
            ("CONNECT BY", select.connect_by.is_some()),
            ("FROM-first SELECT", select.flavor != sql_ast::SelectFlavor::Standard),
        ];
        reject_clauses(&select_clauses)?;

        let distinct = match &select.distinct {
            Some(sql_ast::Distinct::Distinct) => true,
            Some(sql_ast::Distinct::On(_)) => {
                return Err(SqlError::UnsupportedOperation("DISTINCT ON is not supported".into()));
            }
            _ => false,
        };

        match &select.group_by {
            sql_ast::GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
            _ => {
                return Err(SqlError::UnsupportedOperation("GROUP BY is not supported".into()));
            }
        }

        if select.having.is_some() {
            return Err(SqlError::UnsupportedOperation("HAVING is not supported".into()));
        }

        let from = self.convert_from(select.from)?;

        let projection = select
            .projection
            .into_iter()
            .map(|item| self.convert_select_item(item))
            .collect::<Result<Vec<_>>>()?;

        let selection = select
            .selection
            .map(|expr| self.expr_converter.convert(expr))
            .transpose()?;

        let order_by = self.convert_order_by(query.order_by)?;
        let (limit, offset) = self.convert_limit_clause(query.limit_clause)?;

        Ok(QueryStmt {
            distinct,
            projection,
            from,
            selection,
            order_by,
            limit,
            offset,
        })
    }

    fn convert_from(&self, from: Vec<sql_ast::TableWithJoins>) -> Result<TableRef> {
        let mut tables = from.into_iter();
        let (Some(table), None) = (tables.next(), tables.next()) else {
            return Err(SqlError::UnsupportedOperation(
                "Queries must read from exactly one table".into(),
            ));
        };

        if !table.joins.is_empty() {
            return Err(SqlError::UnsupportedOperation("JOIN is not supported".into()));
        }

        match table.relation {
            sql_ast::TableFactor::Table {
                name,
                alias,
                args,
                with_hints,
                version,
                partitions,
                sample,
                ..
            } => {
                let table_clauses = [
                    ("table function arguments", args.is_some()),
                    ("table hints", !with_hints.is_empty()),
                    ("time travel", version.is_some()),
                    ("PARTITION", !partitions.is_empty()),
                    ("TABLESAMPLE", sample.is_some()),
                    (
                        "column aliases on a table",
                        alias.as_ref().is_some_and(|a| !a.columns.is_empty()),
                    ),
                ];
                reject_clauses(&table_clauses)?;

                Ok(TableRef {
                    name: extract_table_name(&name)?,
                    alias: alias.map(|a| a.name.value),
                })
            }
            _ => Err(SqlError::UnsupportedOperation(
                "Only named tables are supported in FROM".into(),
            )),
        }
    }

    fn convert_select_item(&self, item: sql_ast::SelectItem) -> Result<SelectItem> {
        match item {
            sql_ast::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
            sql_ast::SelectItem::UnnamedExpr(expr) => {
                let label = match &expr {
                    sql_ast::Expr::Identifier(ident) => ident.value.clone(),
                    sql_ast::Expr::CompoundIdentifier(idents) => idents
                        .last()
                        .map(|i| i.value.clone())
                        .unwrap_or_default(),
                    other => other.to_string(),
                };
                Ok(SelectItem::Expr {
                    expr: self.expr_converter.convert(expr)?,
                    alias: None,
                    label,
                })
            }
            sql_ast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
                label: alias.value.clone(),
                expr: self.expr_converter.convert(expr)?,
                alias: Some(alias.value),
            }),
            other => Err(SqlError::UnsupportedOperation(format!(
                "Unsupported select item: {}",
                other
            ))),
        }
    }

    fn convert_order_by(&self, order_by: Option<sql_ast::OrderBy>) -> Result<Vec<OrderByExpr>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };

        match order_by.kind {
            sql_ast::OrderByKind::Expressions(exprs) => exprs
                .into_iter()
                .map(|order| {
                    Ok(OrderByExpr {
                        descending: order.options.asc.map(|asc| !asc).unwrap_or(false),
                        nulls_first: order.options.nulls_first,
                        expr: self.expr_converter.convert(order.expr)?,
                    })
                })
                .collect(),
            sql_ast::OrderByKind::All(_) => Err(SqlError::UnsupportedOperation(
                "ORDER BY ALL is not supported".into(),
            )),
        }
    }

    fn convert_limit_clause(
        &self,
        limit_clause: Option<sql_ast::LimitClause>,
    ) -> Result<(Option<usize>, Option<usize>)> {
        let Some(clause) = limit_clause else {
            return Ok((None, None));
        };

        match clause {
            sql_ast::LimitClause::LimitOffset { limit, offset, .. } => {
                let limit = limit.map(|expr| self.extract_count(&expr, "LIMIT")).transpose()?;
                let offset = offset
                    .map(|offset| self.extract_count(&offset.value, "OFFSET"))
                    .transpose()?;
                Ok((limit, offset))
            }
            sql_ast::LimitClause::OffsetCommaLimit { offset, limit } => Ok((
                Some(self.extract_count(&limit, "LIMIT")?),
                Some(self.extract_count(&offset, "OFFSET")?),
            )),
        }
    }

    fn extract_count(&self, expr: &sql_ast::Expr, clause: &str) -> Result<usize> {
        match expr {
            sql_ast::Expr::Value(value_with_span) => match &value_with_span.value {
                sql_ast::Value::Number(n, _) => n.parse::<usize>().map_err(|_| {
                    SqlError::ParseError(format!("Invalid {} value: {}", clause, n))
                }),
                other => Err(SqlError::ParseError(format!(
                    "Invalid {} value: {}",
                    clause, other
                ))),
            },
            other => Err(SqlError::UnsupportedOperation(format!(
                "Only numeric {} is supported, got: {}",
                clause, other
            ))),
        }
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// The first clause in `clauses` that is present, as an error
fn reject_clauses(clauses: &[(&str, bool)]) -> Result<()> {
    match clauses.iter().find(|(_, present)| *present) {
        Some((clause, _)) => Err(SqlError::UnsupportedOperation(format!(
            "{} is not supported",
            clause
        ))),
        None => Ok(()),
    }
}

/// Tables resolve in the current database only, so names must be unqualified
fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    match name.0.as_slice() {
        [sql_ast::ObjectNamePart::Identifier(ident)] => Ok(ident.value.clone()),
        [_, _, ..] => Err(SqlError::UnsupportedOperation(format!(
            "Qualified table names are not supported: {}",
            name
        ))),
        _ => Err(SqlError::ParseError(format!("Invalid table name: {}", name))),
    }
}
