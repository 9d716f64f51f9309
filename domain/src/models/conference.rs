use garde::Validate as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::primitives::{Id, Version};
use crate::repositories::Aggregate;
use crate::{DomainError, DomainErrorKind, DomainResult, domain_error, impl_string_primitive};

/// カンファレンスID
pub type ConferenceId = Id<Conference>;

/// カンファレンス名
#[derive(Debug, Clone, PartialEq, Eq, garde::Validate)]
pub struct ConferenceName(#[garde(length(chars, min = 1, max = 100))] pub String);
impl_string_primitive!(ConferenceName);

/// カンファレンスのタグライン
#[derive(Debug, Clone, PartialEq, Eq, garde::Validate)]
pub struct ConferenceTagline(#[garde(length(chars, min = 1, max = 255))] pub String);
impl_string_primitive!(ConferenceTagline);

/// カンファレンス
///
/// 開始日時は常に終了日時と同じか、終了日時よりも前である。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConferenceRecord")]
pub struct Conference {
    /// ID
    id: ConferenceId,
    /// 名前
    name: ConferenceName,
    /// タグライン
    tagline: Option<ConferenceTagline>,
    /// 開始日時
    #[serde(serialize_with = "time::serde::rfc3339::serialize")]
    start: OffsetDateTime,
    /// 終了日時
    #[serde(serialize_with = "time::serde::rfc3339::serialize")]
    end: OffsetDateTime,
    /// バージョン
    version: Version,
}

/// 永続化されたカンファレンスの表現
///
/// デシリアライズした値は`Conference::with_id`で検証してから集約に変換する。
#[derive(Deserialize)]
struct ConferenceRecord {
    id: ConferenceId,
    name: ConferenceName,
    tagline: Option<ConferenceTagline>,
    #[serde(with = "time::serde::rfc3339")]
    start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end: OffsetDateTime,
    version: Version,
}

impl TryFrom<ConferenceRecord> for Conference {
    type Error = DomainError;

    fn try_from(record: ConferenceRecord) -> Result<Self, Self::Error> {
        let mut conference = Self::with_id(
            record.id,
            record.name,
            record.tagline,
            record.start,
            record.end,
        )?;
        conference.version = record.version;
        Ok(conference)
    }
}

impl Conference {
    /// 新しいIDを持つカンファレンスを作成する。
    pub fn new(
        name: ConferenceName,
        tagline: Option<ConferenceTagline>,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> DomainResult<Self> {
        Self::with_id(ConferenceId::new(), name, tagline, start, end)
    }

    /// IDを指定してカンファレンスを作成する。
    ///
    /// 既知のIDでカンファレンスを再構築する場合に使用する。
    pub fn with_id(
        id: ConferenceId,
        name: ConferenceName,
        tagline: Option<ConferenceTagline>,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> DomainResult<Self> {
        let conference = Self {
            id,
            name,
            tagline,
            start,
            end,
            version: Version::INITIAL,
        };
        conference.validate()?;
        Ok(conference)
    }

    pub fn id(&self) -> ConferenceId {
        self.id
    }

    pub fn name(&self) -> &ConferenceName {
        &self.name
    }

    pub fn tagline(&self) -> Option<&ConferenceTagline> {
        self.tagline.as_ref()
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn rename(&mut self, name: ConferenceName) {
        self.name = name;
    }

    pub fn change_tagline(&mut self, tagline: Option<ConferenceTagline>) {
        self.tagline = tagline;
    }

    /// 開催期間を変更する。
    pub fn reschedule(&mut self, start: OffsetDateTime, end: OffsetDateTime) -> DomainResult<()> {
        validate_duration(start, end)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// # ドメインルール
    ///
    /// - 開始日時は終了日時と同じか、終了日時よりも前でなくてはならない。
    fn validate(&self) -> DomainResult<()> {
        validate_duration(self.start, self.end)
    }
}

fn validate_duration(start: OffsetDateTime, end: OffsetDateTime) -> DomainResult<()> {
    if start > end {
        return Err(domain_error(
            DomainErrorKind::Validation,
            "start must be less than or equal to end",
        ));
    }
    Ok(())
}

impl Aggregate for Conference {
    const KIND: &'static str = "conference";

    fn id(&self) -> Id<Self> {
        self.id
    }

    fn version(&self) -> Option<Version> {
        Some(self.version)
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}
