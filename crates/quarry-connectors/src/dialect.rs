//! Adapts warehouse-style SQL to DataFusion.
//!
//! Two rewrites are applied before planning:
//! - bare table names are qualified with the target database, which maps to a
//!   DataFusion schema;
//! - plain columns listed next to a bare `*` are dropped. Warehouses return
//!   those as mangled duplicates (`dt.1`, `symbol.1`), DataFusion rejects
//!   duplicate projection names outright.

use datafusion::sql::sqlparser::ast::{
    Expr, Ident, ObjectName, Query, SelectItem, SetExpr, Statement, TableFactor,
};
use datafusion::sql::sqlparser::dialect::GenericDialect;
use datafusion::sql::sqlparser::parser::Parser;

use crate::error::ConnectorError;

pub fn rewrite_for_database(sql: &str, database: &str) -> Result<String, ConnectorError> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| ConnectorError::QueryFailed(format!("failed to parse SQL: {}", e)))?;

    for statement in statements.iter_mut() {
        if let Statement::Query(query) = statement {
            rewrite_query(query, database);
        }
    }

    Ok(statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; "))
}

fn rewrite_query(query: &mut Query, database: &str) {
    if let SetExpr::Select(select) = query.body.as_mut() {
        collapse_wildcard_projection(&mut select.projection);
        for table in select.from.iter_mut() {
            qualify_table(&mut table.relation, database);
            for join in table.joins.iter_mut() {
                qualify_table(&mut join.relation, database);
            }
        }
    }
}

fn qualify_table(relation: &mut TableFactor, database: &str) {
    if let TableFactor::Table { name, .. } = relation {
        if name.0.len() == 1 {
            let table = name.0[0].value.clone();
            *name = ObjectName(vec![
                Ident::with_quote('"', database),
                Ident::with_quote('"', table),
            ]);
        }
    }
}

fn collapse_wildcard_projection(projection: &mut Vec<SelectItem>) {
    let has_wildcard = projection
        .iter()
        .any(|item| matches!(item, SelectItem::Wildcard(_)));
    if has_wildcard {
        projection.retain(|item| !matches!(item, SelectItem::UnnamedExpr(Expr::Identifier(_))));
    }
}
