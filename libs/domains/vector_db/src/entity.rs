use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the document to vector mapping table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_vectors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub doc_id: String,
    pub vector_id: String,
    pub created_at: DateTimeUtc,
    pub last_updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::DocumentVector {
    fn from(model: Model) -> Self {
        Self {
            doc_id: model.doc_id,
            vector_id: model.vector_id,
        }
    }
}
