use anyhow::Result;
use qdrant_client::qdrant::{
    value::Kind, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CollectionStatus, DocumentChunk, ScoredChunk};

use super::embeddings::{EmbeddingClient, EMBEDDING_DIM};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector database unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: QdrantError,
    },
}

/// Gateway to the Qdrant collection. Wraps the database client together with
/// the embedding client, so callers hand over plain text and queries.
pub struct VectorStore {
    client: Qdrant,
    collection: String,
    embeddings: EmbeddingClient,
}

impl VectorStore {
    /// Connects to Qdrant and probes the server. Fails with
    /// `StoreError::Unreachable` when the database cannot be reached.
    pub async fn connect(
        url: &str,
        collection: &str,
        embeddings: EmbeddingClient,
    ) -> Result<Self> {
        tracing::info!("Connecting to Qdrant at {}", url);
        let client = Qdrant::from_url(url).build().map_err(|e| StoreError::Unreachable {
            url: url.to_string(),
            source: e,
        })?;

        client.health_check().await.map_err(|e| StoreError::Unreachable {
            url: url.to_string(),
            source: e,
        })?;
        tracing::info!("Qdrant connection established");

        Ok(Self {
            client,
            collection: collection.to_string(),
            embeddings,
        })
    }

    /// Creates the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<()> {
        if !self.client.collection_exists(&self.collection).await? {
            tracing::info!("Creating collection '{}'", self.collection);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(EMBEDDING_DIM, Distance::Cosine)),
                )
                .await?;
        }
        Ok(())
    }

    /// Checks collection metadata. Transport failures are returned as errors
    /// rather than silently treated as an empty collection.
    pub async fn collection_status(&self) -> Result<CollectionStatus> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(CollectionStatus::Absent);
        }
        let info = self.client.collection_info(&self.collection).await?;
        let points = info.result.and_then(|r| r.points_count).unwrap_or(0);
        Ok(match points {
            0 => CollectionStatus::Empty,
            n => CollectionStatus::Populated(n),
        })
    }

    /// Embeds the chunk texts and upserts one point per chunk. The caller is
    /// responsible for keeping batches small enough for the embedding API.
    pub async fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut payload_map = JsonMap::new();
                payload_map.insert("text".to_string(), JsonValue::String(chunk.text.clone()));
                payload_map.insert("metadata".to_string(), chunk.metadata.clone());
                PointStruct::new(Uuid::new_v4().to_string(), vector, payload_map)
            })
            .collect();

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await?;

        Ok(count)
    }

    /// Embeds the query and returns up to `limit` chunks scoring above the
    /// threshold, ordered by descending similarity.
    pub async fn search(
        &self,
        query: &str,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vector = self.embeddings.embed_query(query).await?;

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector, limit)
                    .score_threshold(score_threshold)
                    .with_payload(true),
            )
            .await?;

        let mut results = Vec::new();
        for point in search_result.result {
            let text = match point.payload.get("text").and_then(|v| v.as_str()) {
                Some(text) => text.to_string(),
                None => continue,
            };
            let metadata = point
                .payload
                .get("metadata")
                .map(|v| qdrant_value_to_json(v.clone()))
                .unwrap_or(JsonValue::Null);
            results.push(ScoredChunk {
                chunk: DocumentChunk { text, metadata },
                score: point.score,
            });
        }

        Ok(results)
    }

    /// Removes the collection and all stored points. Irreversible.
    pub async fn delete_collection(&self) -> Result<()> {
        self.client.delete_collection(&self.collection).await?;
        tracing::info!("Collection '{}' deleted", self.collection);
        Ok(())
    }
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> JsonValue {
    match value.kind {
        Some(Kind::StringValue(s)) => JsonValue::String(s),
        Some(Kind::IntegerValue(i)) => JsonValue::from(i),
        Some(Kind::DoubleValue(d)) => {
            serde_json::Number::from_f64(d).map(JsonValue::Number).unwrap_or(JsonValue::Null)
        }
        Some(Kind::BoolValue(b)) => JsonValue::Bool(b),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => JsonValue::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{ListValue, Struct, Value};

    fn string_value(s: &str) -> Value {
        Value {
            kind: Some(Kind::StringValue(s.to_string())),
        }
    }

    #[test]
    fn test_qdrant_value_to_json_scalars() {
        assert_eq!(qdrant_value_to_json(string_value("hi")), JsonValue::String("hi".into()));
        assert_eq!(
            qdrant_value_to_json(Value {
                kind: Some(Kind::IntegerValue(7))
            }),
            JsonValue::from(7)
        );
        assert_eq!(qdrant_value_to_json(Value { kind: None }), JsonValue::Null);
    }

    #[test]
    fn test_qdrant_value_to_json_nested() {
        let value = Value {
            kind: Some(Kind::StructValue(Struct {
                fields: [(
                    "tags".to_string(),
                    Value {
                        kind: Some(Kind::ListValue(ListValue {
                            values: vec![string_value("faq")],
                        })),
                    },
                )]
                .into_iter()
                .collect(),
            })),
        };
        assert_eq!(
            qdrant_value_to_json(value),
            serde_json::json!({"tags": ["faq"]})
        );
    }
}
