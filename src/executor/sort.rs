//! ORDER BY over source rows.
//!
//! NULL handling follows PostgreSQL: NULLS LAST for ASC, NULLS FIRST for DESC,
//! unless the ORDER BY item names its own placement.
//! The sort is stable, so rows with equal keys keep their scan order.

use crate::core::{Result, Row, Value};
use crate::evaluator::Evaluator;
use crate::parser::ast::OrderByExpr;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    pub fn default_for_direction(descending: bool) -> Self {
        if descending {
            Self::NullsFirst
        } else {
            Self::NullsLast
        }
    }

    pub fn for_order(order: &OrderByExpr) -> Self {
        match order.nulls_first {
            Some(true) => Self::NullsFirst,
            Some(false) => Self::NullsLast,
            None => Self::default_for_direction(order.descending),
        }
    }
}

/// Compare two evaluated keys under one ORDER BY item
fn compare_key(a: &Value, b: &Value, order: &OrderByExpr) -> Result<Ordering> {
    let descending = order.descending;
    let nulls = NullOrdering::for_order(order);
    let ordering = match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match nulls {
            NullOrdering::NullsFirst => Ordering::Less,
            NullOrdering::NullsLast => Ordering::Greater,
        },
        (false, true) => match nulls {
            NullOrdering::NullsFirst => Ordering::Greater,
            NullOrdering::NullsLast => Ordering::Less,
        },
        (false, false) => {
            let ordering = a.compare(b)?;
            if descending { ordering.reverse() } else { ordering }
        }
    };
    Ok(ordering)
}

pub fn sort_rows(rows: Vec<Row>, order_by: &[OrderByExpr], evaluator: &Evaluator<'_>) -> Result<Vec<Row>> {
    // Keys are evaluated once per row, the comparator only looks them up
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let keys = order_by
                .iter()
                .map(|order| evaluator.evaluate(&order.expr, &row))
                .collect::<Result<Vec<_>>>()?;
            Ok((keys, row))
        })
        .collect::<Result<Vec<(Vec<Value>, Row)>>>()?;

    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| {
        for ((x, y), order) in a.iter().zip(b.iter()).zip(order_by) {
            match compare_key(x, y, order) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => return ordering,
                Err(e) => {
                    failure.get_or_insert(e);
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(keyed.into_iter().map(|(_, row)| row).collect()),
    }
}
