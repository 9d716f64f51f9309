use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{DomainError, DomainErrorKind};

/// ID
///
/// 型パラメーター`T`は、IDが識別するエンティティの型を表す。
/// IDはエンティティの構築時に生成され、以後変更されない。
pub struct Id<T>(Uuid, PhantomData<T>);

impl<T> Id<T> {
    /// 新しいIDを生成する。
    ///
    /// 乱数源が利用できない場合は、回復不能なエラーとしてパニックする。
    pub fn new() -> Self {
        Id(Uuid::new_v4(), PhantomData)
    }

    /// IDの値を返す。
    pub fn value(&self) -> Uuid {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.0).finish()
    }
}

/// 小文字16進数とハイフンで構成される36文字の正規形式で出力する。
impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Id(uuid, PhantomData)
    }
}

/// 正規形式のみを受け付ける。
///
/// 波括弧、ハイフンなし、`urn:uuid:`接頭辞、大文字の形式はエラーとする。
impl<T> FromStr for Id<T> {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::try_parse(s).map_err(|e| invalid_id(s, e.into()))?;
        let canonical = uuid.hyphenated().to_string();
        if canonical != s {
            return Err(invalid_id(
                s,
                anyhow::anyhow!("{} is not in the canonical form {}", s, canonical),
            ));
        }
        Ok(Id::from(uuid))
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// バージョン
///
/// 楽観的排他制御に使用するトークンで、ストレージが永続化時に採番し、更新のたびに増加させる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub i64);

impl Version {
    /// 永続化される前のバージョン
    pub const INITIAL: Version = Version(0);
    /// 最初に永続化されたときのバージョン
    pub const FIRST: Version = Version(1);

    /// 次のバージョンを返す。
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

#[macro_export]
macro_rules! impl_string_primitive {
    ($name:ident) => {
        impl $name {
            pub fn new(value: std::string::String) -> $crate::DomainResult<Self> {
                let value = if $crate::starts_or_ends_with_whitespace(&value) {
                    value.trim().to_string()
                } else {
                    value
                };
                let value = Self(value);
                match value.validate() {
                    Ok(_) => Ok(value),
                    Err(e) => Err($crate::DomainError {
                        kind: $crate::DomainErrorKind::Validation,
                        messages: vec![format!("{}: {}", stringify!($name), e).into()],
                        source: e.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::convert::TryFrom<String> for $name {
            type Error = $crate::DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <std::string::String as serde::Deserialize>::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn invalid_id(value: &str, source: anyhow::Error) -> DomainError {
    DomainError {
        kind: DomainErrorKind::Validation,
        messages: vec![format!("{} is not a valid id", value).into()],
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use garde::Validate as _;

    use super::*;

    struct Marker;

    #[test]
    fn id_default() {
        let id = Id::<Marker>::default();
        assert!(!id.is_nil());
    }

    #[test]
    fn id_from_uuid() {
        let value = Uuid::new_v4();
        let id = Id::<Marker>::from(value);
        assert_eq!(id.0, value);
    }

    #[test]
    fn ids_are_unique_and_canonical() {
        let ids: HashSet<Id<Marker>> = (0..1_000).map(|_| Id::new()).collect();
        assert_eq!(ids.len(), 1_000);
        for id in ids {
            let text = id.to_string();
            assert_eq!(text.len(), 36);
            assert_eq!(text.parse::<Id<Marker>>().unwrap(), id);
        }
    }

    #[test]
    fn id_round_trips_through_text() {
        let id = Id::<Marker>::new();
        let text = id.to_string();
        let parsed: Id<Marker> = text.parse().unwrap();
        assert_eq!(parsed, id);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", text));
        let decoded: Id<Marker> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, id);
    }

    #[rstest::rstest]
    #[case("")]
    #[case("not-a-uuid")]
    #[case("11111111-1111-1111-1111-11111111111")]
    #[case("{11111111-1111-1111-1111-111111111111}")]
    #[case("11111111111111111111111111111111")]
    #[case("urn:uuid:11111111-1111-1111-1111-111111111111")]
    #[case("AAAAAAAA-1111-1111-1111-111111111111")]
    fn id_parse_rejects_invalid_text(#[case] s: &str) {
        let err = s.parse::<Id<Marker>>().unwrap_err();
        assert!(err.is(DomainErrorKind::Validation));
        assert_eq!(err.to_string(), format!("{} is not a valid id", s));
    }

    #[test]
    fn version_next() {
        assert_eq!(Version::INITIAL.next(), Version::FIRST);
        assert_eq!(Version(41).next(), Version(42));
    }

    #[derive(Debug, Clone, garde::Validate)]
    pub struct StringPrimitive(#[garde(length(chars, min = 1, max = 100))] pub String);
    impl_string_primitive!(StringPrimitive);

    #[rstest::rstest]
    #[case(String::from("title"), true)]
    #[case(String::new(), false)]
    #[case(String::from("  a  "), true)]
    #[case("a".repeat(100), true)]
    #[case("a".repeat(101), false)]
    #[case("🙂".repeat(100), true)]
    #[case("🙂".repeat(100) + &String::from("a"), false)]
    fn impl_string_primitive(#[case] s: String, #[case] expected: bool) {
        let primitive = StringPrimitive::new(s);
        assert_eq!(primitive.is_ok(), expected);
    }
}
