use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, TransactionTrait};
use tracing::{debug, info, warn};

use super::config::StoreOptions;
use super::registry::NamespaceRegistry;
use super::sql::{quote_ident, vector_literal};
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::VectorRecord;

/// Longest vector id the `id` column accepts
pub const MAX_ID_LEN: usize = 40;

/// `CREATE TABLE IF NOT EXISTS` for a namespace table of `dimension`
pub fn create_table_sql(table: &str, dimension: usize, options: &StoreOptions) -> String {
    let index = if options.vector_index {
        format!(
            ", VECTOR INDEX idx_embedding(embedding) WITH (distance={}, type=hnsw)",
            options.distance.index_distance()
        )
    } else {
        String::new()
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id VARCHAR({}) NOT NULL, \
         embedding VECTOR({}) NOT NULL, \
         metadata JSON NULL, \
         PRIMARY KEY (id){})",
        quote_ident(table),
        MAX_ID_LEN,
        dimension,
        index
    )
}

/// Make sure `namespace` has a table of `dimension`.
///
/// Runs under the namespace's schema lock; the database-level `IF NOT EXISTS`
/// covers writers in other processes. The statement is issued on every call
/// so a table dropped behind this process's back is recreated.
pub async fn ensure_schema<C: ConnectionTrait>(
    conn: &C,
    registry: &NamespaceRegistry,
    options: &StoreOptions,
    namespace: &str,
    dimension: usize,
) -> VectorDbResult<()> {
    let lock = registry.schema_lock(namespace).await;
    let _guard = lock.lock().await;

    // A cached dimension that disagrees may predate an outside drop; ask the catalog again.
    if registry
        .cached_dimension(namespace)
        .await
        .is_some_and(|cached| cached != dimension)
    {
        registry.forget(namespace).await;
    }

    let existing = registry.dimension(conn, namespace).await?;
    if let Some(existing) = existing {
        if existing != dimension {
            return Err(VectorDbError::DimensionMismatch {
                index: 0,
                expected: existing,
                actual: dimension,
            });
        }
    }

    let table = registry.table_for(namespace)?;
    let stmt = Statement::from_string(
        DatabaseBackend::MySql,
        create_table_sql(&table, dimension, options),
    );
    conn.execute_raw(stmt).await?;
    registry.remember_dimension(namespace, dimension).await;

    if existing.is_none() {
        info!(namespace, table = %table, dimension, "Created namespace table");
    }
    Ok(())
}

fn upsert_statement(table: &str, record: &VectorRecord) -> VectorDbResult<Statement> {
    if record.id.is_empty() || record.id.chars().count() > MAX_ID_LEN {
        return Err(VectorDbError::InvalidArgument(format!(
            "vector id {:?} must be 1..={} characters",
            record.id, MAX_ID_LEN
        )));
    }

    let sql = format!(
        "INSERT INTO {} (id, embedding, metadata) VALUES (?, {}, ?) \
         ON DUPLICATE KEY UPDATE embedding = VALUES(embedding), metadata = VALUES(metadata)",
        quote_ident(table),
        vector_literal(&record.values)?
    );
    let metadata = serde_json::to_string(&record.metadata)?;

    Ok(Statement::from_sql_and_values(
        DatabaseBackend::MySql,
        sql,
        [record.id.clone().into(), metadata.into()],
    ))
}

/// Write `records` in one transaction.
///
/// The first failing record rolls the whole batch back and is reported by index.
/// Connection loss and a table that vanished mid-batch are returned as they are.
pub async fn write_records(
    conn: &DatabaseConnection,
    table: &str,
    records: &[VectorRecord],
) -> VectorDbResult<usize> {
    let txn = conn.begin().await?;

    for (index, record) in records.iter().enumerate() {
        let result = match upsert_statement(table, record) {
            Ok(stmt) => txn.execute_raw(stmt).await.map_err(VectorDbError::from),
            Err(e) => Err(e),
        };

        if let Err(err) = result {
            if let Err(e) = txn.rollback().await {
                warn!(table, error = %e, "Rollback failed");
            }
            if matches!(err, VectorDbError::Connection(_) | VectorDbError::Transient(_)) {
                return Err(err);
            }
            return Err(VectorDbError::UpsertFailed {
                index,
                reason: err.to_string(),
            });
        }
    }

    txn.commit().await?;
    debug!(table, records = records.len(), "Upserted vectors");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceMetric, Metadata};
    use sea_orm::{DbErr, MockDatabase, MockExecResult, Value};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn record(id: &str, values: Vec<f32>) -> VectorRecord {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!(format!("chunk {}", id)));
        VectorRecord::new(id, values, metadata)
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn column_type(ty: &str) -> Vec<BTreeMap<&'static str, Value>> {
        vec![BTreeMap::from([("column_type", Value::from(ty.to_string()))])]
    }

    #[test]
    fn test_create_table_sql_with_index() {
        let sql = create_table_sql("VTB_ws1", 3, &StoreOptions::default());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `VTB_ws1`"));
        assert!(sql.contains("id VARCHAR(40) NOT NULL"));
        assert!(sql.contains("embedding VECTOR(3) NOT NULL"));
        assert!(sql.contains("metadata JSON NULL"));
        assert!(sql.contains("WITH (distance=L2, type=hnsw)"));
    }

    #[test]
    fn test_create_table_sql_without_index() {
        let options = StoreOptions::default()
            .with_vector_index(false)
            .with_distance(DistanceMetric::Cosine);
        let sql = create_table_sql("VTB_ws1", 1536, &options);
        assert!(sql.contains("VECTOR(1536)"));
        assert!(!sql.contains("VECTOR INDEX"));
    }

    #[test]
    fn test_upsert_statement_rejects_long_id() {
        let long = "x".repeat(41);
        assert!(matches!(
            upsert_statement("VTB_ws1", &record(&long, vec![0.1])),
            Err(VectorDbError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_schema_creates_missing_table() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_exec_results([exec_ok()])
            .into_connection();
        let registry = NamespaceRegistry::new("VTB_");

        ensure_schema(&db, &registry, &StoreOptions::default(), "ws1", 3)
            .await
            .unwrap();
        assert_eq!(registry.cached_dimension("ws1").await, Some(3));
    }

    #[tokio::test]
    async fn test_ensure_schema_rejects_other_dimension() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([column_type("vector(3)")])
            .into_connection();
        let registry = NamespaceRegistry::new("VTB_");

        match ensure_schema(&db, &registry, &StoreOptions::default(), "ws1", 4).await {
            Err(VectorDbError::DimensionMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 4);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_recreates_table_on_every_call() {
        // The catalog is read once; the CREATE runs on both calls.
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();
        let registry = NamespaceRegistry::new("VTB_");
        let options = StoreOptions::default();

        ensure_schema(&db, &registry, &options, "ws1", 3).await.unwrap();
        ensure_schema(&db, &registry, &options, "ws1", 3).await.unwrap();

        let log = db.into_transaction_log();
        let creates = log
            .iter()
            .filter(|txn| format!("{:?}", txn).contains("CREATE TABLE IF NOT EXISTS"))
            .count();
        assert_eq!(creates, 2);
    }

    #[tokio::test]
    async fn test_ensure_schema_rechecks_stale_cached_dimension() {
        // Cached as 3 but the table was dropped and the catalog is empty now.
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_exec_results([exec_ok()])
            .into_connection();
        let registry = NamespaceRegistry::new("VTB_");
        registry.remember_dimension("ws1", 3).await;

        ensure_schema(&db, &registry, &StoreOptions::default(), "ws1", 5)
            .await
            .unwrap();
        assert_eq!(registry.cached_dimension("ws1").await, Some(5));
    }

    #[tokio::test]
    async fn test_write_records_commits_batch() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();

        let written = write_records(
            &db,
            "VTB_ws1",
            &[record("a", vec![0.1, 0.2]), record("b", vec![0.3, 0.4])],
        )
        .await
        .unwrap();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn test_write_records_reports_failing_index() {
        // One exec result for two records: the second insert fails.
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([exec_ok()])
            .into_connection();

        match write_records(
            &db,
            "VTB_ws1",
            &[record("a", vec![0.1, 0.2]), record("b", vec![0.3, 0.4])],
        )
        .await
        {
            Err(VectorDbError::UpsertFailed { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected upsert failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_records_surfaces_missing_table() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_errors([DbErr::Custom(
                "Error 1146 (42S02): Table 'test.VTB_ws1' doesn't exist".to_string(),
            )])
            .into_connection();

        assert!(matches!(
            write_records(&db, "VTB_ws1", &[record("a", vec![0.1, 0.2])]).await,
            Err(VectorDbError::Transient(_))
        ));
    }
}
