use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Schema,
};
use tracing::{debug, info};

use crate::entity;
use crate::error::VectorDbResult;
use crate::models::DocumentVector;
use crate::repository::DocumentVectorRepository;

/// `document_vectors` table accessed through sea-orm
pub struct SqlDocumentVectorRepository {
    db: DatabaseConnection,
}

impl SqlDocumentVectorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the mapping table if it does not exist yet
    pub async fn ensure_table(&self) -> VectorDbResult<()> {
        let backend = self.db.get_database_backend();
        let mut create = Schema::new(backend).create_table_from_entity(entity::Entity);
        create.if_not_exists();

        self.db.execute_raw(backend.build(&create)).await?;
        debug!("document_vectors table ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentVectorRepository for SqlDocumentVectorRepository {
    async fn bulk_insert(&self, mappings: Vec<DocumentVector>) -> VectorDbResult<()> {
        if mappings.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let count = mappings.len();
        let models = mappings.into_iter().map(|m| entity::ActiveModel {
            doc_id: Set(m.doc_id),
            vector_id: Set(m.vector_id),
            created_at: Set(now),
            last_updated_at: Set(now),
            ..Default::default()
        });

        entity::Entity::insert_many(models)
            .exec_without_returning(&self.db)
            .await?;

        info!(mappings = count, "Recorded document vectors");
        Ok(())
    }

    async fn vector_ids(&self, doc_id: &str) -> VectorDbResult<Vec<String>> {
        let rows = entity::Entity::find()
            .filter(entity::Column::DocId.eq(doc_id))
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|m| m.vector_id).collect())
    }

    async fn delete_for_document(&self, doc_id: &str) -> VectorDbResult<u64> {
        let result = entity::Entity::delete_many()
            .filter(entity::Column::DocId.eq(doc_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
