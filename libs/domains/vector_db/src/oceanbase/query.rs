use sea_orm::{ConnectionTrait, DatabaseBackend, FromQueryResult, Statement};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::config::StoreOptions;
use super::sql::{quote_ident, vector_literal};
use crate::error::VectorDbResult;
use crate::models::{Metadata, NeighborRow};

#[derive(Debug, FromQueryResult)]
struct NeighborQueryRow {
    id: String,
    metadata: Option<String>,
    distance: Option<f64>,
}

/// Top-N query ordered by ascending distance to `query`
pub fn nearest_sql(
    table: &str,
    query: &[f32],
    top_n: usize,
    options: &StoreOptions,
) -> VectorDbResult<String> {
    let distance = format!(
        "{}(embedding, {})",
        options.distance.sql_function(),
        vector_literal(query)?
    );
    let approximate = if options.vector_index { " APPROXIMATE" } else { "" };

    Ok(format!(
        "SELECT id, CAST(metadata AS CHAR) AS metadata, {distance} AS distance \
         FROM {table} ORDER BY {distance}{approximate} LIMIT {top_n}",
        distance = distance,
        table = quote_ident(table),
        approximate = approximate,
        top_n = top_n
    ))
}

/// Stored metadata as a map; NULL or non-object JSON yields an empty map
fn parse_metadata(id: &str, raw: Option<String>) -> Metadata {
    let Some(raw) = raw else {
        return Metadata::new();
    };

    match serde_json::from_str::<JsonValue>(&raw) {
        Ok(JsonValue::Object(map)) => map,
        Ok(_) => Metadata::new(),
        Err(e) => {
            warn!(id, error = %e, "Unreadable metadata on stored vector");
            Metadata::new()
        }
    }
}

pub async fn nearest<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    query: &[f32],
    top_n: usize,
    options: &StoreOptions,
) -> VectorDbResult<Vec<NeighborRow>> {
    if top_n == 0 {
        return Ok(Vec::new());
    }

    let stmt = Statement::from_string(DatabaseBackend::MySql, nearest_sql(table, query, top_n, options)?);
    let rows = NeighborQueryRow::find_by_statement(stmt).all(conn).await?;
    debug!(table, rows = rows.len(), top_n, "Nearest-neighbour query");

    Ok(rows
        .into_iter()
        .map(|row| NeighborRow {
            metadata: parse_metadata(&row.id, row.metadata),
            id: row.id,
            distance: row.distance,
        })
        .collect())
}
