use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use domain::{
    DomainError, DomainErrorKind, DomainResult, domain_error,
    models::primitives::{Id, Version},
    repositories::{Aggregate, Storage},
};

use crate::{decode, encode};

/// PostgreSQLトランザクション
pub type PgTransaction = Transaction<'static, Postgres>;

/// PostgreSQLストレージ
///
/// 集約は`aggregates`テーブルに、種類とIDを主キーとするJSONBとして保存する。
#[derive(Debug, Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行する。
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError {
                kind: DomainErrorKind::Repository,
                messages: vec![format!("Failed to migrate the database: {}", e).into()],
                source: e.into(),
            })
    }

    async fn exists(&self, tx: &mut PgTransaction, kind: &str, id: Uuid) -> DomainResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM aggregates WHERE kind = $1 AND id = $2
            )
            "#,
        )
        .bind(kind)
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(repository_error)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AggregateRow {
    version: Option<i64>,
    data: serde_json::Value,
}

#[async_trait::async_trait]
impl Storage for PgStorage {
    type Transaction = PgTransaction;

    async fn begin(&self) -> DomainResult<PgTransaction> {
        self.pool.begin().await.map_err(repository_error)
    }

    async fn commit(&self, tx: PgTransaction) -> DomainResult<()> {
        tx.commit().await.map_err(repository_error)
    }

    async fn rollback(&self, tx: PgTransaction) -> DomainResult<()> {
        tx.rollback().await.map_err(repository_error)
    }

    async fn persist<T: Aggregate>(&self, tx: &mut PgTransaction, mut aggregate: T) -> DomainResult<T> {
        if aggregate.version().is_some() {
            aggregate.set_version(Version::FIRST);
        }
        let data = encode(&aggregate)?;
        sqlx::query(
            r#"
            INSERT INTO aggregates (kind, id, version, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(T::KIND)
        .bind(aggregate.id().value())
        .bind(aggregate.version().map(|v| v.0))
        .bind(data)
        .execute(&mut **tx)
        .await
        .map_err(repository_error)?;
        Ok(aggregate)
    }

    async fn find<T: Aggregate>(
        &self,
        tx: &mut PgTransaction,
        id: Id<T>,
    ) -> DomainResult<Option<T>> {
        sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT version, data
            FROM aggregates
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(T::KIND)
        .bind(id.value())
        .fetch_optional(&mut **tx)
        .await
        .map_err(repository_error)?
        .map(|row| decode(row.data, row.version.map(Version)))
        .transpose()
    }

    async fn merge<T: Aggregate>(&self, tx: &mut PgTransaction, mut aggregate: T) -> DomainResult<T> {
        let expected = aggregate.version();
        if let Some(version) = expected {
            aggregate.set_version(version.next());
        }
        let data = encode(&aggregate)?;
        let id = aggregate.id().value();
        let affected_rows = sqlx::query(
            r#"
            UPDATE aggregates
            SET
                version = $3,
                data = $4,
                updated_at = CURRENT_TIMESTAMP
            WHERE kind = $1 AND id = $2 AND version IS NOT DISTINCT FROM $5
            "#,
        )
        .bind(T::KIND)
        .bind(id)
        .bind(aggregate.version().map(|v| v.0))
        .bind(data)
        .bind(expected.map(|v| v.0))
        .execute(&mut **tx)
        .await
        .map_err(repository_error)?;
        if affected_rows.rows_affected() > 0 {
            return Ok(aggregate);
        }
        if self.exists(tx, T::KIND, id).await? {
            return Err(domain_error(
                DomainErrorKind::Conflict,
                format!("{} with id {} was modified by another transaction", T::KIND, id),
            ));
        }
        aggregate_not_found(T::KIND, id)
    }

    async fn remove<T: Aggregate>(&self, tx: &mut PgTransaction, id: Id<T>) -> DomainResult<()> {
        let affected_rows = sqlx::query(
            r#"
            DELETE FROM aggregates
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(T::KIND)
        .bind(id.value())
        .execute(&mut **tx)
        .await
        .map_err(repository_error)?;
        match affected_rows.rows_affected() {
            0 => aggregate_not_found(T::KIND, id.value()),
            _ => Ok(()),
        }
    }
}

/// sqlxのエラーをドメインエラーに変換する。
///
/// 制約違反は`Constraint`、それ以外は`Repository`に分類する。
pub fn repository_error(e: sqlx::Error) -> DomainError {
    let kind = match e.as_database_error() {
        Some(db)
            if db.is_unique_violation()
                || db.is_check_violation()
                || db.is_foreign_key_violation() =>
        {
            DomainErrorKind::Constraint
        }
        _ => DomainErrorKind::Repository,
    };
    DomainError {
        kind,
        messages: vec![e.to_string().into()],
        source: e.into(),
    }
}

fn aggregate_not_found<T>(kind: &str, id: Uuid) -> DomainResult<T> {
    Err(domain_error(
        DomainErrorKind::NotFound,
        format!("{} with id {} is not found", kind, id),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_error_classifies_non_database_errors_as_repository() {
        let error = repository_error(sqlx::Error::PoolTimedOut);
        assert!(error.is(DomainErrorKind::Repository));
        assert!(!error.messages.is_empty());
    }

    #[test]
    fn row_not_found_is_a_repository_error() {
        let error = repository_error(sqlx::Error::RowNotFound);
        assert!(error.is(DomainErrorKind::Repository));
    }
}
