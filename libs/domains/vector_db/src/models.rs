use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{VectorDbError, VectorDbResult};

/// Metadata key holding the chunk text. Retrieval rebuilds passages from it.
pub const TEXT_KEY: &str = "text";

pub type Metadata = Map<String, Value>;

/// A namespace as seen in the store catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDescriptor {
    pub name: String,
    pub table_name: String,
}

/// Catalog details for one namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    pub name: String,
    pub table_name: String,
    pub dimension: Option<usize>,
    pub row_count: u64,
    pub created_at: Option<String>,
}

/// The atomic unit of storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }
}

/// Validate a write batch and return its dimension.
///
/// The first record fixes the dimension; any other length is a caller bug.
pub fn batch_dimension(records: &[VectorRecord]) -> VectorDbResult<usize> {
    let first = records
        .first()
        .ok_or_else(|| VectorDbError::InvalidArgument("no records to write".to_string()))?;

    let dimension = first.values.len();
    if dimension == 0 {
        return Err(VectorDbError::InvalidArgument(
            "vectors must have at least one dimension".to_string(),
        ));
    }

    for (index, record) in records.iter().enumerate() {
        if record.values.len() != dimension {
            return Err(VectorDbError::DimensionMismatch {
                index,
                expected: dimension,
                actual: record.values.len(),
            });
        }
        if record.values.iter().any(|v| !v.is_finite()) {
            return Err(VectorDbError::InvalidArgument(format!(
                "record {} ({}) contains a non-finite component",
                index, record.id
            )));
        }
    }

    Ok(dimension)
}

/// A row returned by a nearest-neighbour query, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborRow {
    pub id: String,
    /// Raw distance; `None` when the store returned NULL
    pub distance: Option<f64>,
    pub metadata: Metadata,
}

/// Document handed to ingestion: `{pageContent, docId, ...metadata}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    #[serde(default)]
    pub page_content: String,
    #[serde(default)]
    pub doc_id: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl DocumentData {
    pub fn new(doc_id: impl Into<String>, page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            doc_id: doc_id.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Result of ingesting one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDocumentOutcome {
    pub vectorized: bool,
    pub error: Option<String>,
}

impl AddDocumentOutcome {
    pub fn vectorized() -> Self {
        Self {
            vectorized: true,
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            vectorized: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            vectorized: false,
            error: Some(error.into()),
        }
    }
}

/// Link between a logical document and one of its vectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVector {
    pub doc_id: String,
    pub vector_id: String,
}

/// A cached chunk: the embedding plus the metadata it was written with.
///
/// `id` is the vector id of the write that produced the entry; re-ingestion
/// assigns fresh ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedChunk {
    #[serde(default)]
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&VectorRecord> for CachedChunk {
    fn from(record: &VectorRecord) -> Self {
        Self {
            id: record.id.clone(),
            values: record.values.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// Previously computed chunks for a source file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CachedVectors {
    pub exists: bool,
    pub chunks: Vec<Vec<CachedChunk>>,
}

impl CachedVectors {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(chunks: Vec<Vec<CachedChunk>>) -> Self {
        Self {
            exists: true,
            chunks,
        }
    }
}

/// How rows below the similarity threshold are handled.
///
/// Rows arrive closest first, so for a well-behaved store both policies return
/// the same rows; they differ when a NULL or out-of-order distance appears mid-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Keep every row at or above the threshold, in query order
    #[default]
    FilterAll,
    /// Keep rows until the first one below the threshold, then stop
    StopAtFirstBelow,
}

/// Distance function used for nearest-neighbour ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Cosine,
}

impl DistanceMetric {
    pub fn sql_function(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "l2_distance",
            DistanceMetric::Cosine => "cosine_distance",
        }
    }

    /// `distance` option of an OceanBase vector index
    pub fn index_distance(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "L2",
            DistanceMetric::Cosine => "COSINE",
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(format!("unknown distance metric '{}'", other)),
        }
    }
}

/// Outcome of dropping a namespace's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason")]
pub enum DropOutcome {
    Deleted,
    AlreadyAbsent,
    Failed(String),
}

impl DropOutcome {
    /// Absence counts as success: the namespace is gone either way.
    pub fn is_success(&self) -> bool {
        !matches!(self, DropOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteNamespaceResponse {
    pub outcome: DropOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Milliseconds since the Unix epoch
    pub heartbeat: i64,
}

/// Caller-facing search result
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub context_texts: Vec<String>,
    pub sources: Vec<Metadata>,
    /// Serialized as `false` when absent
    #[serde(serialize_with = "message_or_false")]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            context_texts: Vec::new(),
            sources: Vec::new(),
            message: Some(message.into()),
        }
    }
}

fn message_or_false<S: Serializer>(message: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match message {
        Some(text) => serializer.serialize_str(text),
        None => serializer.serialize_bool(false),
    }
}
