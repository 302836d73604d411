//! SQLite-backed vector store using rusqlite
//!
//! Records live in named collections. Queries run against an in-memory
//! matrix of the collection that is rebuilt lazily after every write.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use deal_core::ItemMetadata;
use ndarray::{Array1, Array2};
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    similarity::{nearest_rows, row_norms},
    types::{EmbeddingRecord, EmbeddingVector, QueryMatch},
};

/// Dense snapshot of one collection, in insertion order
struct CollectionMatrix {
    ids: Vec<String>,
    documents: Vec<String>,
    metadata: Vec<ItemMetadata>,
    vectors: Array2<f32>,
    norms: Array1<f32>,
}

/// SQLite vector store
pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    cache: RwLock<HashMap<String, Arc<CollectionMatrix>>>,
}

impl VectorStore {
    /// Open (or create) a store at `database_path`
    #[instrument(skip(database_path))]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(database_path: P) -> Result<Self> {
        info!("Opening vector store: {:?}", database_path.as_ref());
        if let Some(parent) = database_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EmbeddingError::Database(format!("Failed to create store directory: {}", e)))?;
            }
        }
        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: RwLock::new(HashMap::new()),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL,
                category TEXT NOT NULL,
                price REAL NOT NULL,
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )?;

        debug!("Vector store tables initialized");
        Ok(())
    }

    /// Dimension of a collection, if it exists
    pub fn dimension(&self, collection: &str) -> Result<Option<usize>> {
        collection_dimension(&self.conn.lock(), collection)
    }

    /// Insert or replace records in a collection
    ///
    /// The first write fixes the collection's dimension. The whole batch is
    /// written in one transaction and rejected if any vector disagrees.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub fn upsert(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };

        let now = Utc::now().timestamp();
        let mut conn = self.conn.lock();

        let expected = collection_dimension(&conn, collection)?.unwrap_or(first.dimension());
        if let Some(bad) = records.iter().find(|r| r.dimension() != expected) {
            return Err(EmbeddingError::InvalidDimension {
                expected,
                actual: bad.dimension(),
            });
        }

        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO collections (name, dimension, created_at) VALUES (?, ?, ?)",
            params![collection, expected as i64, now],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO embeddings
                 (collection, id, document, category, price, embedding, dimension, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    category = excluded.category,
                    price = excluded.price,
                    embedding = excluded.embedding,
                    dimension = excluded.dimension",
            )?;

            for record in records {
                let bytes = encode_vector(&record.embedding)?;
                stmt.execute(params![
                    collection,
                    &record.id,
                    &record.document,
                    &record.metadata.category,
                    record.metadata.price,
                    &bytes,
                    expected as i64,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        // Invalidate while the connection is still held
        self.cache.write().remove(collection);
        drop(conn);

        debug!("Upserted {} records into {}", records.len(), collection);
        Ok(records.len())
    }

    /// Number of records in a collection
    pub fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE collection = ?",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Fetch a single record
    pub fn get(&self, collection: &str, id: &str) -> Result<EmbeddingRecord> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, document, category, price, embedding
                 FROM embeddings WHERE collection = ? AND id = ?",
                params![collection, id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| EmbeddingError::NotFound(format!("{}/{}", collection, id)))?;

        let (id, document, category, price, bytes) = row;
        Ok(EmbeddingRecord::new(
            id,
            decode_vector(&bytes)?,
            document,
            ItemMetadata { category, price },
        ))
    }

    /// Drop a collection and all its records
    #[instrument(skip(self))]
    pub fn delete_collection(&self, collection: &str) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM embeddings WHERE collection = ?", params![collection])?;
        tx.execute("DELETE FROM collections WHERE name = ?", params![collection])?;
        tx.commit()?;
        self.cache.write().remove(collection);
        drop(conn);

        info!("Deleted collection {} ({} records)", collection, deleted);
        Ok(deleted)
    }

    /// The `top_k` records nearest to `vector` by cosine distance
    ///
    /// Ties are broken by insertion order. A missing collection yields no
    /// matches; a vector of the wrong dimension is an error.
    #[instrument(skip(self, vector))]
    pub fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let Some(matrix) = self.matrix(collection)? else {
            return Ok(Vec::new());
        };

        if matrix.vectors.ncols() != vector.len() {
            return Err(EmbeddingError::InvalidDimension {
                expected: matrix.vectors.ncols(),
                actual: vector.len(),
            });
        }

        let matches = nearest_rows(matrix.vectors.view(), matrix.norms.view(), vector, top_k)
            .into_iter()
            .map(|(row, distance)| QueryMatch {
                id: matrix.ids[row].clone(),
                document: matrix.documents[row].clone(),
                metadata: matrix.metadata[row].clone(),
                distance,
            })
            .collect();

        Ok(matches)
    }

    /// Every vector in a collection with its price, in insertion order
    ///
    /// Used to train models directly on the stored embeddings.
    pub fn all_vectors(&self, collection: &str) -> Result<(Array2<f32>, Vec<f64>)> {
        match self.matrix(collection)? {
            Some(matrix) => {
                let prices = matrix.metadata.iter().map(|m| m.price).collect();
                Ok((matrix.vectors.clone(), prices))
            }
            None => Ok((Array2::zeros((0, 0)), Vec::new())),
        }
    }

    /// Per-collection record counts
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.name, c.dimension, COUNT(e.id)
             FROM collections c LEFT JOIN embeddings e ON e.collection = c.name
             GROUP BY c.name, c.dimension
             ORDER BY c.name",
        )?;

        let collections = stmt
            .query_map([], |row| {
                Ok(CollectionStats {
                    name: row.get(0)?,
                    dimension: row.get::<_, i64>(1)? as usize,
                    records: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(StoreStats { collections })
    }

    fn matrix(&self, collection: &str) -> Result<Option<Arc<CollectionMatrix>>> {
        if let Some(cached) = self.cache.read().get(collection) {
            return Ok(Some(Arc::clone(cached)));
        }

        // Held until the matrix is cached
        let conn = self.conn.lock();
        if let Some(cached) = self.cache.read().get(collection) {
            return Ok(Some(Arc::clone(cached)));
        }

        let Some(dimension) = collection_dimension(&conn, collection)? else {
            return Ok(None);
        };

        let rows = {
            let mut stmt = conn.prepare(
                "SELECT id, document, category, price, embedding
                 FROM embeddings WHERE collection = ?
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut ids = Vec::with_capacity(rows.len());
        let mut documents = Vec::with_capacity(rows.len());
        let mut metadata = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * dimension);

        for (id, document, category, price, bytes) in rows {
            let vector = decode_vector(&bytes)?;
            if vector.len() != dimension {
                return Err(EmbeddingError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend_from_slice(&vector);
            ids.push(id);
            documents.push(document);
            metadata.push(ItemMetadata { category, price });
        }

        let vectors = Array2::from_shape_vec((ids.len(), dimension), flat)
            .map_err(|e| EmbeddingError::Database(format!("Corrupt collection {}: {}", collection, e)))?;
        let norms = row_norms(vectors.view());

        let matrix = Arc::new(CollectionMatrix {
            ids,
            documents,
            metadata,
            vectors,
            norms,
        });

        info!("Loaded {} vectors from {}", matrix.ids.len(), collection);
        self.cache
            .write()
            .insert(collection.to_string(), Arc::clone(&matrix));
        drop(conn);
        Ok(Some(matrix))
    }
}

fn collection_dimension(conn: &Connection, collection: &str) -> Result<Option<usize>> {
    let dimension: Option<i64> = conn
        .query_row(
            "SELECT dimension FROM collections WHERE name = ?",
            params![collection],
            |row| row.get(0),
        )
        .optional()?;
    Ok(dimension.map(|d| d as usize))
}

fn encode_vector(vector: &EmbeddingVector) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(vector, bincode::config::standard())?)
}

fn decode_vector(bytes: &[u8]) -> Result<EmbeddingVector> {
    let (vector, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(vector)
}

/// Record counts per collection
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub collections: Vec<CollectionStats>,
}

#[derive(Debug, Clone)]
pub struct CollectionStats {
    pub name: String,
    pub dimension: usize,
    pub records: usize,
}
