//! Output columns from a parsed query
//!
//! Walks to the outer SELECT of a query (past CTEs, into the first branch of a
//! set operation) and names each select-list entry.

use sqlparser::ast::{Expr, Query, Select, SelectItem, SetExpr};
use semview_core::ModelColumn;
use crate::extractor::ExtractError;
use crate::template::MaskedSql;

/// Read the output columns of a query, in select-list order
pub fn columns_from_query(query: &Query, masked: &MaskedSql) -> Result<Vec<ModelColumn>, ExtractError> {
    let select = final_select(query).ok_or(ExtractError::NoProjection)?;

    if select.projection.is_empty() {
        return Err(ExtractError::EmptyProjection);
    }

    select
        .projection
        .iter()
        .enumerate()
        .map(|(i, item)| column_from_item(i + 1, item, masked))
        .collect()
}

/// The SELECT that defines the query's output schema
fn final_select(query: &Query) -> Option<&Select> {
    select_of(&query.body)
}

fn select_of(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select.as_ref()),
        SetExpr::Query(query) => final_select(query),
        // Output names of UNION/INTERSECT/EXCEPT come from the first branch
        SetExpr::SetOperation { left, .. } => select_of(left),
        _ => None,
    }
}

fn column_from_item(position: usize, item: &SelectItem, masked: &MaskedSql) -> Result<ModelColumn, ExtractError> {
    match item {
        SelectItem::ExprWithAlias { expr, alias } => {
            Ok(ModelColumn::new(alias.value.clone()).with_expression(masked.restore(&expr.to_string())))
        }
        SelectItem::UnnamedExpr(expr) => {
            let expression = masked.restore(&expr.to_string());
            match bare_column_name(expr) {
                Some(name) if !MaskedSql::is_placeholder(&name) => {
                    Ok(ModelColumn::new(name).with_expression(expression))
                }
                _ => Err(ExtractError::UnnamedColumn { position, expression }),
            }
        }
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
            Err(ExtractError::Wildcard { position })
        }
    }
}

/// Name of a column reference, seen through casts and parentheses
fn bare_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|ident| ident.value.clone()),
        Expr::Cast { expr, .. } => bare_column_name(expr),
        Expr::Nested(inner) => bare_column_name(inner),
        _ => None,
    }
}
