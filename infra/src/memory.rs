use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use domain::{
    DomainErrorKind, DomainResult, domain_error,
    models::primitives::{Id, Version},
    repositories::{Aggregate, Storage},
};

use crate::{decode, encode};

/// ストレージ内のレコードを識別するキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct RecordKey {
    kind: &'static str,
    id: Uuid,
}

impl RecordKey {
    fn of<T: Aggregate>(id: Id<T>) -> Self {
        Self {
            kind: T::KIND,
            id: id.value(),
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    version: Option<Version>,
    data: serde_json::Value,
}

impl Record {
    fn encode<T: Aggregate>(aggregate: &T) -> DomainResult<Self> {
        Ok(Self {
            version: aggregate.version(),
            data: encode(aggregate)?,
        })
    }

    fn decode<T: Aggregate>(&self) -> DomainResult<T> {
        decode(self.data.clone(), self.version)
    }
}

/// トランザクションが最初に参照したときのコミット済みレコードの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    Absent,
    Present(Option<Version>),
}

impl Snapshot {
    fn of(record: Option<&Record>) -> Self {
        match record {
            Some(record) => Snapshot::Present(record.version),
            None => Snapshot::Absent,
        }
    }
}

#[derive(Debug, Clone)]
enum Write {
    Put(Record),
    Delete,
}

/// インメモリトランザクション
///
/// 書き込みはコミットされるまでトランザクション内に保持され、コミットせずに破棄すると失われる。
#[derive(Debug, Default)]
pub struct MemoryTransaction {
    writes: BTreeMap<RecordKey, Write>,
    observed: BTreeMap<RecordKey, Snapshot>,
}

impl MemoryTransaction {
    /// トランザクション内の書き込みを優先して、レコードを返す。
    fn current(
        &mut self,
        committed: &BTreeMap<RecordKey, Record>,
        key: RecordKey,
    ) -> Option<Record> {
        let record = committed.get(&key);
        self.observed
            .entry(key)
            .or_insert_with(|| Snapshot::of(record));
        match self.writes.get(&key) {
            Some(Write::Put(record)) => Some(record.clone()),
            Some(Write::Delete) => None,
            None => record.cloned(),
        }
    }

    /// トランザクション内に書き込みがあるか確認する。
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// インメモリストレージ
///
/// クローンしたストレージは、同じコミット済みデータを共有する。
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    committed: Arc<Mutex<BTreeMap<RecordKey, Record>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// コミット済みのレコード数を返す。
    pub async fn len(&self) -> usize {
        self.committed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.committed.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> DomainResult<MemoryTransaction> {
        Ok(MemoryTransaction::default())
    }

    /// トランザクションが書き込んだレコードが、最初に参照したときから変更されていないことを確認して、
    /// すべての書き込みを反映する。
    async fn commit(&self, tx: MemoryTransaction) -> DomainResult<()> {
        let mut committed = self.committed.lock().await;
        for key in tx.writes.keys() {
            let observed = tx.observed.get(key).copied().ok_or_else(|| {
                domain_error(
                    DomainErrorKind::Unexpected,
                    format!("{} with id {} was written without being read", key.kind, key.id),
                )
            })?;
            let now = Snapshot::of(committed.get(key));
            if now != observed {
                let kind = match observed {
                    Snapshot::Absent => DomainErrorKind::Constraint,
                    Snapshot::Present(_) => DomainErrorKind::Conflict,
                };
                tracing::warn!(kind = key.kind, id = %key.id, "concurrent modification detected");
                return Err(domain_error(
                    kind,
                    format!("{} with id {} was modified concurrently", key.kind, key.id),
                ));
            }
        }
        for (key, write) in tx.writes {
            match write {
                Write::Put(record) => {
                    committed.insert(key, record);
                }
                Write::Delete => {
                    committed.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTransaction) -> DomainResult<()> {
        tracing::debug!(writes = tx.writes.len(), "transaction rolled back");
        Ok(())
    }

    async fn persist<T: Aggregate>(
        &self,
        tx: &mut MemoryTransaction,
        mut aggregate: T,
    ) -> DomainResult<T> {
        let key = RecordKey::of(aggregate.id());
        let committed = self.committed.lock().await;
        if tx.current(&committed, key).is_some() {
            return Err(already_exists(key));
        }
        if aggregate.version().is_some() {
            aggregate.set_version(Version::FIRST);
        }
        tx.writes.insert(key, Write::Put(Record::encode(&aggregate)?));
        Ok(aggregate)
    }

    async fn find<T: Aggregate>(
        &self,
        tx: &mut MemoryTransaction,
        id: Id<T>,
    ) -> DomainResult<Option<T>> {
        let key = RecordKey::of(id);
        let committed = self.committed.lock().await;
        tx.current(&committed, key)
            .map(|record| record.decode())
            .transpose()
    }

    async fn merge<T: Aggregate>(
        &self,
        tx: &mut MemoryTransaction,
        mut aggregate: T,
    ) -> DomainResult<T> {
        let key = RecordKey::of(aggregate.id());
        let committed = self.committed.lock().await;
        let record = tx.current(&committed, key).ok_or_else(|| not_found(key))?;
        if record.version != aggregate.version() {
            return Err(version_conflict(key, record.version, aggregate.version()));
        }
        if let Some(version) = aggregate.version() {
            aggregate.set_version(version.next());
        }
        tx.writes.insert(key, Write::Put(Record::encode(&aggregate)?));
        Ok(aggregate)
    }

    async fn remove<T: Aggregate>(&self, tx: &mut MemoryTransaction, id: Id<T>) -> DomainResult<()> {
        let key = RecordKey::of(id);
        let committed = self.committed.lock().await;
        if tx.current(&committed, key).is_none() {
            return Err(not_found(key));
        }
        tx.writes.insert(key, Write::Delete);
        Ok(())
    }
}

fn already_exists(key: RecordKey) -> domain::DomainError {
    domain_error(
        DomainErrorKind::Constraint,
        format!("{} with id {} already exists", key.kind, key.id),
    )
}

fn not_found(key: RecordKey) -> domain::DomainError {
    domain_error(
        DomainErrorKind::NotFound,
        format!("{} with id {} is not found", key.kind, key.id),
    )
}

fn version_conflict(
    key: RecordKey,
    stored: Option<Version>,
    given: Option<Version>,
) -> domain::DomainError {
    domain_error(
        DomainErrorKind::Conflict,
        format!(
            "{} with id {} has version {:?}, but version {:?} was given",
            key.kind, key.id, stored, given
        ),
    )
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use domain::models::{Attachment, Conference, ConferenceId, ConferenceName};

    use super::*;

    fn conference(id: ConferenceId) -> Conference {
        Conference::with_id(
            id,
            ConferenceName::new(String::from("RustConf")).unwrap(),
            None,
            datetime!(2026-09-08 09:00:00 UTC),
            datetime!(2026-09-11 18:00:00 UTC),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn persist_assigns_first_version() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();

        let stored = storage
            .persist(&mut tx, conference(ConferenceId::new()))
            .await
            .unwrap();

        assert_eq!(stored.version(), Version::FIRST);
        storage.commit(tx).await.unwrap();
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn writes_are_visible_inside_the_transaction_only() {
        let storage = MemoryStorage::new();
        let attachment = Attachment::new();
        let mut tx = storage.begin().await.unwrap();
        storage.persist(&mut tx, attachment.clone()).await.unwrap();

        let mut other = storage.begin().await.unwrap();
        let seen_by_other = storage.find(&mut other, attachment.id()).await.unwrap();
        let seen_by_self = storage.find(&mut tx, attachment.id()).await.unwrap();

        assert_eq!(seen_by_other, None);
        assert_eq!(seen_by_self, Some(attachment));
        assert!(!tx.is_empty());
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_storage_unchanged() {
        let storage = MemoryStorage::new();
        {
            let mut tx = storage.begin().await.unwrap();
            storage.persist(&mut tx, Attachment::new()).await.unwrap();
        }
        let mut tx = storage.begin().await.unwrap();
        storage.persist(&mut tx, Attachment::new()).await.unwrap();
        storage.rollback(tx).await.unwrap();

        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn merge_checks_and_increments_version() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();
        let stored = storage
            .persist(&mut tx, conference(ConferenceId::new()))
            .await
            .unwrap();

        let updated = storage.merge(&mut tx, stored.clone()).await.unwrap();
        let stale = storage.merge(&mut tx, stored).await.unwrap_err();

        assert_eq!(updated.version(), Version(2));
        assert!(stale.is(DomainErrorKind::Conflict));
    }

    #[tokio::test]
    async fn merge_and_remove_of_unknown_id_are_not_found() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();

        let merged = storage.merge(&mut tx, Attachment::new()).await.unwrap_err();
        let removed = storage
            .remove(&mut tx, Id::<Attachment>::new())
            .await
            .unwrap_err();

        assert!(merged.is(DomainErrorKind::NotFound));
        assert!(removed.is(DomainErrorKind::NotFound));
    }

    #[tokio::test]
    async fn concurrent_commits_on_the_same_aggregate_conflict() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();
        let stored = storage
            .persist(&mut tx, conference(ConferenceId::new()))
            .await
            .unwrap();
        storage.commit(tx).await.unwrap();

        let mut first = storage.begin().await.unwrap();
        let mut second = storage.begin().await.unwrap();
        storage.merge(&mut first, stored.clone()).await.unwrap();
        storage.merge(&mut second, stored).await.unwrap();

        storage.commit(first).await.unwrap();
        let err = storage.commit(second).await.unwrap_err();
        assert!(err.is(DomainErrorKind::Conflict));
    }

    #[tokio::test]
    async fn concurrent_inserts_of_the_same_id_violate_constraint() {
        let storage = MemoryStorage::new();
        let id = ConferenceId::new();
        let mut first = storage.begin().await.unwrap();
        let mut second = storage.begin().await.unwrap();
        storage.persist(&mut first, conference(id)).await.unwrap();
        storage.persist(&mut second, conference(id)).await.unwrap();

        storage.commit(first).await.unwrap();
        let err = storage.commit(second).await.unwrap_err();
        assert!(err.is(DomainErrorKind::Constraint));
        assert_eq!(storage.len().await, 1);
    }
}
