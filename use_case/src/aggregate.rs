use domain::{
    DomainResult,
    models::{Attachment, Conference, primitives::Id},
    repositories::{Aggregate, PersistenceRepository, Storage, commit, rollback},
};

/// 集約ユースケース
///
/// 操作ごとにトランザクションを開始し、成功した場合はコミット、失敗した場合はロールバックする。
/// リポジトリが返したエラーは変換せずにそのまま返す。
pub struct AggregateUseCase<T, S> {
    pub repository: PersistenceRepository<T, S>,
}

/// カンファレンスユースケース
pub type ConferenceUseCase<S> = AggregateUseCase<Conference, S>;

/// 添付ファイルユースケース
pub type AttachmentUseCase<S> = AggregateUseCase<Attachment, S>;

impl<T, S> AggregateUseCase<T, S>
where
    T: Aggregate,
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self {
            repository: PersistenceRepository::new(storage),
        }
    }

    /// 集約を新規作成する。
    pub async fn create(&self, aggregate: T) -> DomainResult<T> {
        let mut tx = self.repository.begin().await?;
        let result = self.repository.store(&mut tx, aggregate).await;
        self.finish(tx, result).await
    }

    /// 集約を取得する。
    pub async fn by_id(&self, id: Id<T>) -> DomainResult<Option<T>> {
        let mut tx = self.repository.begin().await?;
        let result = self.repository.by_id(&mut tx, id).await;
        self.finish(tx, result).await
    }

    /// 集約を更新する。
    pub async fn update(&self, aggregate: T) -> DomainResult<T> {
        let mut tx = self.repository.begin().await?;
        let result = self.repository.update(&mut tx, aggregate).await;
        self.finish(tx, result).await
    }

    /// 集約を削除する。
    pub async fn delete(&self, id: Id<T>) -> DomainResult<()> {
        let mut tx = self.repository.begin().await?;
        let result = self.repository.delete(&mut tx, id).await;
        self.finish(tx, result).await
    }

    async fn finish<R>(&self, tx: S::Transaction, result: DomainResult<R>) -> DomainResult<R> {
        let storage = self.repository.storage();
        match result {
            Ok(value) => {
                commit(storage, tx).await?;
                Ok(value)
            }
            Err(e) => {
                // ロールバックの失敗よりも、操作のエラーを優先して返す
                if let Err(rollback_error) = rollback(storage, tx).await {
                    tracing::warn!(
                        kind = T::KIND,
                        error = %rollback_error,
                        "Failed to roll back the transaction"
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use domain::{
        DomainErrorKind,
        models::{ConferenceId, ConferenceName, primitives::Version},
    };
    use infra::memory::MemoryStorage;

    use super::*;

    fn conference() -> Conference {
        Conference::new(
            ConferenceName::new(String::from("JavaOne")).unwrap(),
            None,
            datetime!(2026-10-01 09:00:00 UTC),
            datetime!(2026-10-04 17:00:00 UTC),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_commits_the_aggregate() {
        let storage = MemoryStorage::new();
        let use_case = ConferenceUseCase::new(storage.clone());

        let created = use_case.create(conference()).await.unwrap();
        let fetched = use_case.by_id(created.id()).await.unwrap();

        assert_eq!(fetched, Some(created));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn failed_operation_leaves_storage_unchanged() {
        let storage = MemoryStorage::new();
        let use_case = ConferenceUseCase::new(storage.clone());
        let created = use_case.create(conference()).await.unwrap();

        let err = use_case.create(created.clone()).await.unwrap_err();

        assert!(err.is(DomainErrorKind::Constraint));
        assert_eq!(storage.len().await, 1);
        assert_eq!(
            use_case.by_id(created.id()).await.unwrap().unwrap().version(),
            Version::FIRST
        );
    }

    #[rstest::rstest]
    #[case::update(true)]
    #[case::delete(false)]
    #[tokio::test]
    async fn unknown_ids_are_not_found(#[case] update: bool) {
        let use_case = ConferenceUseCase::new(MemoryStorage::new());
        let unknown = conference();

        let err = if update {
            use_case.update(unknown).await.unwrap_err()
        } else {
            use_case.delete(ConferenceId::new()).await.unwrap_err()
        };

        assert!(err.is(DomainErrorKind::NotFound));
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let use_case = ConferenceUseCase::new(MemoryStorage::new());
        let created = use_case.create(conference()).await.unwrap();
        let mut renamed = created.clone();
        renamed.rename(ConferenceName::new(String::from("JavaOne 2026")).unwrap());

        let updated = use_case.update(renamed).await.unwrap();
        let err = use_case.update(created).await.unwrap_err();

        assert_eq!(updated.version(), Version(2));
        assert!(err.is(DomainErrorKind::Conflict));
    }

    #[tokio::test]
    async fn stored_conference_keeps_a_valid_duration() {
        let use_case = ConferenceUseCase::new(MemoryStorage::new());
        let created = use_case.create(conference()).await.unwrap();
        let mut changed = created.clone();

        let err = changed
            .reschedule(datetime!(2030-01-01 09:00:00 UTC), created.end())
            .unwrap_err();
        let updated = use_case.update(changed).await.unwrap();

        assert!(err.is(DomainErrorKind::Validation));
        assert_eq!(updated.start(), created.start());
        assert!(updated.start() <= updated.end());
    }

    #[tokio::test]
    async fn attachments_are_removed() {
        let use_case = AttachmentUseCase::new(MemoryStorage::new());
        let attachment = use_case.create(Attachment::new()).await.unwrap();

        use_case.delete(attachment.id()).await.unwrap();

        assert_eq!(use_case.by_id(attachment.id()).await.unwrap(), None);
    }
}
