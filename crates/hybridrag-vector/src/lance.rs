//! LanceDB-backed [`VectorStore`].
//!
//! One table with the schema from [`build_arrow_schema`]. Metadata is stored as
//! JSON text. Upsert deletes existing ids before appending, so it stays idempotent.

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::{Embedder, VectorStore};
use hybridrag_core::types::{Document, Metadata, SearchHit, SourceKind};

use crate::schema::build_arrow_schema;

pub struct LanceVectorStore {
    db: Connection,
    table_name: String,
    embedder: Arc<dyn Embedder>,
}

impl LanceVectorStore {
    pub async fn open(db_path: &Path, table_name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let db = connect(db_path.to_string_lossy().as_ref()).execute().await.map_err(Error::store)?;
        info!(path = %db_path.display(), table = table_name, "opened LanceDB");
        Ok(Self { db, table_name: table_name.to_string(), embedder })
    }

    async fn table(&self) -> Result<Option<Table>> {
        let names = self.db.table_names().execute().await.map_err(Error::store)?;
        if !names.contains(&self.table_name) { return Ok(None); }
        Ok(Some(self.db.open_table(&self.table_name).execute().await.map_err(Error::store)?))
    }

    fn to_record_batch(&self, docs: &[Document], vectors: Vec<Vec<f32>>) -> Result<RecordBatch> {
        let dim = self.embedder.dim();
        let schema = build_arrow_schema(dim);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        let metas = docs.iter().map(|d| serde_json::to_string(&d.metadata)).collect::<std::result::Result<Vec<_>, _>>().map_err(Error::store)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::EmbeddingFailure(format!("expected {} dims, got {}", dim, bad.len())));
        }
        let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));
        RecordBatch::try_new(schema, vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metas)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
        ])
        .map_err(Error::store)
    }
}

fn quote(id: &str) -> String { format!("'{}'", id.replace('\'', "''")) }

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch.column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::StoreUnavailable(format!("missing '{name}' column")))
}

fn batch_documents(batch: &RecordBatch) -> Result<Vec<Document>> {
    let (ids, contents, metas) = (string_col(batch, "id")?, string_col(batch, "content")?, string_col(batch, "metadata")?);
    (0..batch.num_rows())
        .map(|i| {
            let metadata: Metadata = serde_json::from_str(metas.value(i)).map_err(Error::store)?;
            Ok(Document { id: ids.value(i).to_string(), content: contents.value(i).to_string(), metadata })
        })
        .collect()
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() { return Ok(()); }
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let batch = self.to_record_batch(documents, vectors)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        match self.table().await? {
            Some(table) => {
                let predicate = format!("id IN ({})", documents.iter().map(|d| quote(&d.id)).collect::<Vec<_>>().join(", "));
                table.delete(&predicate).await.map_err(Error::store)?;
                table.add(reader).execute().await.map_err(Error::store)?;
            }
            None => { self.db.create_table(&self.table_name, reader).execute().await.map_err(Error::store)?; }
        }
        debug!(count = documents.len(), table = %self.table_name, "lance upsert");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if let Some(table) = self.table().await? {
            table.delete(&format!("id = {}", quote(id))).await.map_err(Error::store)?;
        }
        Ok(())
    }

    async fn query(&self, query_text: &str, n_results: usize) -> Result<Vec<SearchHit>> {
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };
        if n_results == 0 { return Ok(Vec::new()); }
        let q = self.embedder.embed(query_text).await?;
        let mut stream = table.vector_search(q).map_err(Error::store)?.limit(n_results).execute().await.map_err(Error::store)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
            let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for (i, doc) in batch_documents(&batch)?.into_iter().enumerate() {
                let distance = distances.filter(|d| !d.is_null(i)).map(|d| d.value(i)).unwrap_or(f32::MAX);
                hits.push(SearchHit::from_document(doc, distance, SourceKind::Vector));
            }
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let Some(table) = self.table().await? else { return Ok(Vec::new()) };
        let mut stream = table.query().execute().await.map_err(Error::store)?;
        let mut docs = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
            docs.extend(batch_documents(&batch)?);
        }
        Ok(docs)
    }
}
