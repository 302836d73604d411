//! Build a retrieval collection from curated items

use deal_core::Item;
use tracing::{info, instrument};

use crate::{
    client::TextEncoder,
    error::{EmbeddingError, Result},
    store::VectorStore,
    types::EmbeddingRecord,
};

/// Recreate `collection` from `items`
///
/// Every item's description is encoded in batches of `batch_size` and stored
/// under the id `doc_{offset}`. Returns the number of records written.
#[instrument(skip(encoder, store, items), fields(items = items.len()))]
pub async fn build_index(
    encoder: &dyn TextEncoder,
    store: &VectorStore,
    collection: &str,
    items: &[Item],
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(EmbeddingError::Config("batch_size must be positive".to_string()));
    }

    store.delete_collection(collection)?;

    let mut written = 0;
    for (batch_number, batch) in items.chunks(batch_size).enumerate() {
        let offset = batch_number * batch_size;
        let documents: Vec<String> = batch.iter().map(Item::description).collect();
        let vectors = encoder.encode_batch(&documents).await?;

        if vectors.len() != batch.len() {
            return Err(EmbeddingError::Config(format!(
                "Encoder returned {} vectors for {} documents",
                vectors.len(),
                batch.len()
            )));
        }

        let records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(documents)
            .zip(vectors)
            .enumerate()
            .map(|(i, ((item, document), vector))| {
                EmbeddingRecord::new(format!("doc_{}", offset + i), vector, document, item.metadata())
            })
            .collect();

        written += store.upsert(collection, &records)?;
        info!("Indexed {}/{} items", written, items.len());
    }

    Ok(written)
}
