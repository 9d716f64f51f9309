use std::marker::PhantomData;

use crate::DomainResult;
use crate::models::primitives::Id;
use crate::repositories::{Aggregate, Storage};

/// 永続化リポジトリ
///
/// 型パラメーター`T`で管理する集約を束縛し、保存先は注入された`Storage`に委譲する。
/// リポジトリ自身は可変な状態を持たず、キャッシュも行わない。
/// ストレージが返したエラーは変換せずにそのまま返す。
#[derive(Debug, Clone)]
pub struct PersistenceRepository<T, S> {
    storage: S,
    _marker: PhantomData<T>,
}

impl<T, S> PersistenceRepository<T, S>
where
    T: Aggregate,
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            _marker: PhantomData,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 集約の種類を返す。
    pub fn kind(&self) -> &'static str {
        T::KIND
    }

    /// トランザクションを開始する。
    pub async fn begin(&self) -> DomainResult<S::Transaction> {
        self.storage.begin().await
    }

    /// 集約を保存する。
    #[tracing::instrument(skip(self, tx, aggregate), fields(kind = T::KIND, id = %aggregate.id()))]
    pub async fn store(&self, tx: &mut S::Transaction, aggregate: T) -> DomainResult<T> {
        self.storage.persist(tx, aggregate).await
    }

    /// 集約をIDで取得する。
    #[tracing::instrument(skip(self, tx), fields(kind = T::KIND, id = %id))]
    pub async fn by_id(&self, tx: &mut S::Transaction, id: Id<T>) -> DomainResult<Option<T>> {
        self.storage.find(tx, id).await
    }

    /// 集約を更新する。
    #[tracing::instrument(skip(self, tx, aggregate), fields(kind = T::KIND, id = %aggregate.id()))]
    pub async fn update(&self, tx: &mut S::Transaction, aggregate: T) -> DomainResult<T> {
        self.storage.merge(tx, aggregate).await
    }

    /// 集約をIDで削除する。
    #[tracing::instrument(skip(self, tx), fields(kind = T::KIND, id = %id))]
    pub async fn delete(&self, tx: &mut S::Transaction, id: Id<T>) -> DomainResult<()> {
        self.storage.remove(tx, id).await
    }
}

/// トランザクションをコミットする。
///
/// # 引数
///
/// * `storage`: ストレージ
/// * `tx`: トランザクション
pub async fn commit<S: Storage>(storage: &S, tx: S::Transaction) -> DomainResult<()> {
    storage.commit(tx).await
}

/// トランザクションをロールバックする。
///
/// # 引数
///
/// * `storage`: ストレージ
/// * `tx`: トランザクション
pub async fn rollback<S: Storage>(storage: &S, tx: S::Transaction) -> DomainResult<()> {
    storage.rollback(tx).await
}
