//! SQLite executor backed by tokio-rusqlite.
//!
//! [`SqliteExecutor`] implements both [`Executor`](crate::Executor) and
//! [`PrepareExecutor`](crate::PrepareExecutor), so it can be used directly or
//! wrapped in a [`StmtCacheExecutor`](crate::StmtCacheExecutor). Uncached calls
//! compile a throwaway statement; prepared statements live in the
//! connection's own statement cache until closed or evicted.

pub mod connection;
pub mod statement;

pub use connection::SqliteExecutor;
pub use statement::SqliteStatement;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Executor, QueryContext, Value, wrap_with_stmt_cache};

    #[tokio::test]
    async fn test_cached_executor_round_trip() {
        let store = wrap_with_stmt_cache(SqliteExecutor::open_in_memory().await.unwrap());
        let ctx = QueryContext::background();

        store
            .exec(&ctx, "CREATE TABLE kv (k TEXT PRIMARY KEY, v INTEGER NOT NULL)", &[])
            .await
            .unwrap();
        for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
            store
                .exec(&ctx, "INSERT INTO kv (k, v) VALUES (?1, ?2)", &[Value::Text(k.into()), Value::Integer(v)])
                .await
                .unwrap();
        }

        let v: i64 = store
            .query_row(&ctx, "SELECT v FROM kv WHERE k = ?1", &[Value::Text("b".into())])
            .await
            .get(0)
            .unwrap();
        assert_eq!(v, 2);

        let missing = store
            .query_row(&ctx, "SELECT v FROM kv WHERE k = ?1", &[Value::Text("z".into())])
            .await;
        assert!(missing.into_row().unwrap_err().is_no_rows());

        let total: i64 = store
            .query(&ctx, "SELECT v FROM kv", &[])
            .await
            .unwrap()
            .map(|row| row.get::<i64>(0).unwrap())
            .sum();
        assert_eq!(total, 6);

        // CREATE, INSERT, point SELECT, full SELECT
        assert_eq!(store.len().await, 4);
        let stats = store.stats();
        assert_eq!(stats.prepares, 4);
        assert_eq!(stats.hits, 3);
    }

    #[tokio::test]
    async fn test_dynamic_query_bypasses_cache() {
        let store = wrap_with_stmt_cache(SqliteExecutor::open_in_memory().await.unwrap());
        let ctx = QueryContext::background();

        store
            .exec(&ctx, "CREATE TABLE ids (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        store
            .exec(&ctx, "INSERT INTO ids (id) VALUES (1), (2), (3), (4)", &[])
            .await
            .unwrap();

        let dynamic = ctx.with_stmt_cache_disabled();
        for ids in [vec![1], vec![1, 2], vec![1, 2, 3]] {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let query = format!("SELECT COUNT(*) FROM ids WHERE id IN ({placeholders})");
            let args: Vec<Value> = ids.iter().map(|&id| Value::Integer(id)).collect();

            let count: i64 = store.query_row(&dynamic, &query, &args).await.get(0).unwrap();
            assert_eq!(count, ids.len() as i64);
        }

        assert_eq!(store.len().await, 2);
        assert_eq!(store.stats().bypassed, 3);
    }

    #[tokio::test]
    async fn test_invalid_sql_surfaces_execution_error() {
        let store = wrap_with_stmt_cache(SqliteExecutor::open_in_memory().await.unwrap());
        let ctx = QueryContext::background();

        let err = store.exec(&ctx, "INSERT INTO missing VALUES (1)", &[]).await.unwrap_err();
        assert!(matches!(err, crate::Error::Database(_)));
        assert_eq!(store.stats().prepare_failures, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_releases_sqlite_statements() {
        let store = wrap_with_stmt_cache(SqliteExecutor::open_in_memory().await.unwrap());
        let ctx = QueryContext::background();

        store.query_row(&ctx, "SELECT 1", &[]).await.get::<i64>(0).unwrap();
        store.query_row(&ctx, "SELECT 2", &[]).await.get::<i64>(0).unwrap();
        assert_eq!(store.purge().await, 2);

        let db = store.close().await;
        let three: i64 = db.query_row(&ctx, "SELECT 3", &[]).await.get(0).unwrap();
        assert_eq!(three, 3);
    }
}
