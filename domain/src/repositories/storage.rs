use serde::{Serialize, de::DeserializeOwned};

use crate::DomainResult;
use crate::models::primitives::{Id, Version};

/// 集約
///
/// ストレージは`KIND`とIDの組で集約を識別する。
pub trait Aggregate: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// ストレージのキーに含める集約の種類
    const KIND: &'static str;

    /// 集約のIDを返す。
    fn id(&self) -> Id<Self>;

    /// 楽観的排他制御のバージョンを返す。
    ///
    /// バージョンを持たない集約は`None`を返し、最後の書き込みが優先される。
    fn version(&self) -> Option<Version> {
        None
    }

    /// ストレージが採番したバージョンを設定する。
    fn set_version(&mut self, _version: Version) {}
}

/// ストレージ
///
/// 集約を永続化する協調者で、すべての操作は`begin`で開始したトランザクション内で実行する。
/// コミットせずにトランザクションを破棄した場合、その操作はなかったものとして扱われる。
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// トランザクション
    type Transaction: Send;

    /// トランザクションを開始する。
    async fn begin(&self) -> DomainResult<Self::Transaction>;

    /// トランザクションをコミットする。
    async fn commit(&self, tx: Self::Transaction) -> DomainResult<()>;

    /// トランザクションをロールバックする。
    async fn rollback(&self, tx: Self::Transaction) -> DomainResult<()>;

    /// 集約を新規に永続化する。
    ///
    /// 同じ種類とIDの集約が既に存在する場合は制約違反エラーを返す。
    async fn persist<T: Aggregate>(
        &self,
        tx: &mut Self::Transaction,
        aggregate: T,
    ) -> DomainResult<T>;

    /// 種類とIDで集約を取得する。
    async fn find<T: Aggregate>(
        &self,
        tx: &mut Self::Transaction,
        id: Id<T>,
    ) -> DomainResult<Option<T>>;

    /// 既存の集約を更新する。
    ///
    /// 集約が存在しない場合は未検出エラー、バージョンが一致しない場合は競合エラーを返す。
    async fn merge<T: Aggregate>(
        &self,
        tx: &mut Self::Transaction,
        aggregate: T,
    ) -> DomainResult<T>;

    /// 種類とIDで集約を削除する。
    async fn remove<T: Aggregate>(
        &self,
        tx: &mut Self::Transaction,
        id: Id<T>,
    ) -> DomainResult<()>;
}
