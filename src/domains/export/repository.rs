use crate::domains::export::types::{
    FieldSelection, QueryDescriptor, RawRow, SchemaEntry, WhereClause,
};
use crate::errors::{ExportError, ExportResult};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// The generic data store the export core reads from.
///
/// Implementations must preserve row order across `find_many` calls with an
/// identical `order_by`; pagination stability depends on it. Errors map to
/// [`ExportError::StoreUnavailable`] and are not retried here.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn find_many(
        &self,
        collection: &str,
        query: &QueryDescriptor,
    ) -> ExportResult<Vec<RawRow>>;

    /// Total matching rows under the given filter, ignoring pagination.
    async fn count(&self, collection: &str, filter: &WhereClause) -> ExportResult<u64>;
}

/// The external schema catalog: every entity type the backend knows about,
/// with its display name and whether it is a collection or a singleton.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn entries(&self) -> ExportResult<Vec<SchemaEntry>>;
}

/// Catalog backed by a fixed entry list, wired up at startup from the host's
/// model registry.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaCatalog {
    entries: Vec<SchemaEntry>,
}

impl StaticSchemaCatalog {
    pub fn new(entries: Vec<SchemaEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl SchemaCatalog for StaticSchemaCatalog {
    async fn entries(&self) -> ExportResult<Vec<SchemaEntry>> {
        Ok(self.entries.clone())
    }
}

/// Reference [`DataStore`] over SQLite.
///
/// Each entity lives in the `documents` table as one JSON document with its
/// relations embedded; locale filtering, ordering and pagination run in SQL,
/// while select/populate projection prunes the parsed document in memory.
#[derive(Debug, Clone)]
pub struct SqliteDataStore {
    pool: SqlitePool,
}

impl SqliteDataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn initialize(&self) -> ExportResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                locale TEXT,
                document TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    /// Inserts one entity document. The locale column is denormalized out of
    /// the document so the locale filter can run in SQL.
    pub async fn insert_document(
        &self,
        collection: &str,
        id: i64,
        document: &Value,
    ) -> ExportResult<()> {
        let locale = document.get("locale").and_then(Value::as_str);
        let raw = serde_json::to_string(document)
            .map_err(|e| ExportError::StoreUnavailable(e.to_string()))?;
        sqlx::query(
            "INSERT INTO documents (collection, id, locale, document) VALUES (?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(id)
        .bind(locale)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn find_many(
        &self,
        collection: &str,
        query: &QueryDescriptor,
    ) -> ExportResult<Vec<RawRow>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT document FROM documents WHERE collection = ");
        builder.push_bind(collection);
        if let Some(locale) = &query.where_clause.locale {
            builder.push(" AND locale = ");
            builder.push_bind(locale.as_str());
        }
        // The query builder pins the sort key to the primary id; this store
        // only honors that key.
        builder.push(" ORDER BY id ");
        builder.push(if query.order_by.ascending { "ASC" } else { "DESC" });
        match (query.limit, query.offset) {
            (Some(limit), Some(offset)) => {
                builder.push(" LIMIT ");
                builder.push_bind(limit as i64);
                builder.push(" OFFSET ");
                builder.push_bind(offset as i64);
            }
            (Some(limit), None) => {
                builder.push(" LIMIT ");
                builder.push_bind(limit as i64);
            }
            (None, Some(offset)) => {
                // SQLite requires a LIMIT clause before OFFSET; -1 is its
                // "no limit" sentinel.
                builder.push(" LIMIT -1 OFFSET ");
                builder.push_bind(offset as i64);
            }
            (None, None) => {}
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get(0).map_err(store_error)?;
            let document: Value = serde_json::from_str(&raw)
                .map_err(|e| ExportError::StoreUnavailable(e.to_string()))?;
            let object = match document {
                Value::Object(object) => object,
                other => {
                    return Err(ExportError::StoreUnavailable(format!(
                        "stored document is not an object: {}",
                        other
                    )))
                }
            };
            documents.push(project_document(object, query));
        }
        Ok(documents)
    }

    async fn count(&self, collection: &str, filter: &WhereClause) -> ExportResult<u64> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM documents WHERE collection = ");
        builder.push_bind(collection);
        if let Some(locale) = &filter.locale {
            builder.push(" AND locale = ");
            builder.push_bind(locale.as_str());
        }
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(count as u64)
    }
}

fn store_error(error: sqlx::Error) -> ExportError {
    ExportError::StoreUnavailable(error.to_string())
}

/// Applies the descriptor's select/populate projection to a stored document.
fn project_document(document: RawRow, query: &QueryDescriptor) -> RawRow {
    let mut projected = match &query.select {
        FieldSelection::All => document.clone(),
        FieldSelection::Fields(fields) => {
            let mut out = RawRow::new();
            for field in fields {
                if let Some(value) = document.get(field) {
                    out.insert(field.clone(), value.clone());
                }
            }
            out
        }
    };

    for (relation, spec) in &query.populate {
        if let Some(value) = document.get(relation) {
            projected.insert(relation.clone(), prune_related(value, &spec.select));
        }
    }

    projected
}

/// Restricts an embedded related entity (or list of them) to the populated
/// sub-fields. Non-object shapes pass through untouched; the flattener is
/// responsible for diagnosing them.
fn prune_related(value: &Value, select: &[String]) -> Value {
    match value {
        Value::Object(nested) => {
            let mut out = serde_json::Map::new();
            for field in select {
                if let Some(sub) = nested.get(field) {
                    out.insert(field.clone(), sub.clone());
                }
            }
            Value::Object(out)
        }
        Value::Array(entries) => Value::Array(
            entries
                .iter()
                .map(|entry| prune_related(entry, select))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::{OrderBy, PopulateSpec};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store_with_articles(total: i64) -> SqliteDataStore {
        // A single connection keeps every query on the same in-memory DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteDataStore::new(pool);
        store.initialize().await.unwrap();
        for id in 1..=total {
            store
                .insert_document(
                    "article",
                    id,
                    &json!({
                        "id": id,
                        "title": format!("Article {}", id),
                        "locale": if id % 5 == 0 { "de" } else { "en" },
                        "author": { "name": format!("Author {}", id), "secret": "x" }
                    }),
                )
                .await
                .unwrap();
        }
        store
    }

    fn base_query() -> QueryDescriptor {
        QueryDescriptor {
            select: FieldSelection::All,
            populate: vec![],
            where_clause: WhereClause::default(),
            order_by: OrderBy::default(),
            limit: None,
            offset: None,
        }
    }

    #[tokio::test]
    async fn test_find_many_orders_by_id_ascending() {
        let store = store_with_articles(5).await;
        let rows = store.find_many("article", &base_query()).await.unwrap();
        let titles: Vec<&str> = rows
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect();
        assert_eq!(
            titles,
            vec!["Article 1", "Article 2", "Article 3", "Article 4", "Article 5"]
        );
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let store = store_with_articles(25).await;
        let mut query = base_query();
        query.limit = Some(10);
        query.offset = Some(20);

        let rows = store.find_many("article", &query).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["title"], json!("Article 21"));
    }

    #[tokio::test]
    async fn test_offset_without_limit() {
        let store = store_with_articles(25).await;
        let mut query = base_query();
        query.offset = Some(23);

        let rows = store.find_many("article", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_locale_filter_applies_to_rows_and_count() {
        let store = store_with_articles(25).await;
        let mut query = base_query();
        query.where_clause.locale = Some("en".to_string());

        let rows = store.find_many("article", &query).await.unwrap();
        assert_eq!(rows.len(), 20);
        let count = store.count("article", &query.where_clause).await.unwrap();
        assert_eq!(count, 20);

        let all = store.count("article", &WhereClause::default()).await.unwrap();
        assert_eq!(all, 25);
    }

    #[tokio::test]
    async fn test_select_projection() {
        let store = store_with_articles(1).await;
        let mut query = base_query();
        query.select = FieldSelection::Fields(vec!["title".to_string()]);

        let rows = store.find_many("article", &query).await.unwrap();
        assert_eq!(rows[0].len(), 1);
        assert!(rows[0].contains_key("title"));
    }

    #[tokio::test]
    async fn test_populate_prunes_related_fields() {
        let store = store_with_articles(1).await;
        let mut query = base_query();
        query.select = FieldSelection::Fields(vec!["title".to_string()]);
        query.populate = vec![(
            "author".to_string(),
            PopulateSpec {
                select: vec!["name".to_string()],
            },
        )];

        let rows = store.find_many("article", &query).await.unwrap();
        let author = rows[0]["author"].as_object().unwrap();
        assert_eq!(author.len(), 1);
        assert_eq!(author["name"], json!("Author 1"));
    }

    #[tokio::test]
    async fn test_unknown_collection_returns_no_rows() {
        let store = store_with_articles(3).await;
        let rows = store.find_many("missing", &base_query()).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(store.count("missing", &WhereClause::default()).await.unwrap(), 0);
    }

    #[test]
    fn test_prune_related_list() {
        let pruned = prune_related(
            &json!([{ "name": "Ann", "secret": 1 }, null, { "name": "Bob" }]),
            &["name".to_string()],
        );
        assert_eq!(pruned, json!([{ "name": "Ann" }, null, { "name": "Bob" }]));
    }
}
