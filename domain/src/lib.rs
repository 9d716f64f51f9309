use std::borrow::Cow;

use enum_display::EnumDisplay;

pub mod models;
pub mod repositories;

/// ドメインエラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
#[enum_display(case = "Kebab")]
pub enum DomainErrorKind {
    /// 検証エラー
    Validation,
    /// エンティティが存在しない
    NotFound,
    /// 楽観的排他制御による競合
    Conflict,
    /// 一意制約やスキーマ制約の違反
    Constraint,
    /// ストレージに到達できない、またはトランザクションが中断された
    Repository,
    /// 予期しないエラー
    Unexpected,
}

/// ドメインエラー
#[derive(Debug, thiserror::Error)]
#[error("{}", .messages.join(", "))]
pub struct DomainError {
    /// エラーの種類
    pub kind: DomainErrorKind,
    /// エラーメッセージ
    pub messages: Vec<Cow<'static, str>>,
    /// エラーの原因
    #[source]
    pub source: anyhow::Error,
}

impl DomainError {
    pub fn is(&self, kind: DomainErrorKind) -> bool {
        self.kind == kind
    }
}

/// ドメイン結果
pub type DomainResult<T> = Result<T, DomainError>;

/// メッセージからドメインエラーを作成する。
pub fn domain_error(kind: DomainErrorKind, message: impl Into<Cow<'static, str>>) -> DomainError {
    let message = message.into();
    DomainError {
        kind,
        messages: vec![message.clone()],
        source: anyhow::anyhow!(message),
    }
}

fn starts_or_ends_with_whitespace(s: &str) -> bool {
    s.chars().next().is_some_and(|ch| ch.is_whitespace())
        || s.chars().last().is_some_and(|ch| ch.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_keeps_kind_and_message() {
        let error = domain_error(DomainErrorKind::NotFound, "conference is not found");
        assert!(error.is(DomainErrorKind::NotFound));
        assert_eq!(error.to_string(), "conference is not found");
        assert_eq!(error.kind.to_string(), "not-found");
    }

    #[rstest::rstest]
    #[case(" a", true)]
    #[case("a ", true)]
    #[case("a b", false)]
    #[case("", false)]
    fn whitespace_around(#[case] s: &str, #[case] expected: bool) {
        assert_eq!(starts_or_ends_with_whitespace(s), expected);
    }
}
