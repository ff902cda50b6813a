//! Transaction helper shared by every service that must write several rows
//! atomically.

use crate::errors::ServiceError;
pub use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};

/// Runs `f` inside a database transaction.
///
/// Commits when `f` returns `Ok`, rolls back otherwise. A `ServiceError`
/// raised inside the closure comes back unchanged so callers can still
/// match on `InsufficientStock` and friends.
///
/// ```rust,ignore
/// let line = in_transaction(&db, move |txn| {
///     Box::pin(async move {
///         stock_ledger::take(txn, ItemKind::Part, part_id, 3).await?;
///         sale_item::Entity::insert(active).exec(txn).await?;
///         Ok(())
///     })
/// })
/// .await?;
/// ```
pub async fn in_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    db.transaction::<_, T, ServiceError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, Statement};

    async fn scratch_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt).await.unwrap();
        db.execute_unprepared("CREATE TABLE counters (id INTEGER PRIMARY KEY, value INTEGER NOT NULL)")
            .await
            .unwrap();
        db.execute_unprepared("INSERT INTO counters (id, value) VALUES (1, 0)")
            .await
            .unwrap();
        db
    }

    async fn counter_value(db: &DatabaseConnection) -> i64 {
        let row = db
            .query_one(Statement::from_string(
                db.get_database_backend(),
                "SELECT value FROM counters WHERE id = 1",
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get::<i64>("", "value").unwrap()
    }

    #[tokio::test]
    async fn commits_on_success() {
        let db = scratch_db().await;
        in_transaction(&db, |txn| {
            Box::pin(async move {
                txn.execute_unprepared("UPDATE counters SET value = value + 5 WHERE id = 1")
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap();
        assert_eq!(counter_value(&db).await, 5);
    }

    #[tokio::test]
    async fn rolls_back_and_preserves_service_error() {
        let db = scratch_db().await;
        let err = in_transaction::<_, ()>(&db, |txn| {
            Box::pin(async move {
                txn.execute_unprepared("UPDATE counters SET value = value + 5 WHERE id = 1")
                    .await?;
                Err(ServiceError::InsufficientStock(
                    "Insufficient stock. Only 0 units available.".into(),
                ))
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::InsufficientStock(_)));
        assert_eq!(counter_value(&db).await, 0);
    }
}
