pub mod memory;
pub mod postgres;

use domain::{
    DomainError, DomainErrorKind, DomainResult,
    models::primitives::Version,
    repositories::Aggregate,
};

/// 集約をJSONに変換する。
fn encode<T: Aggregate>(aggregate: &T) -> DomainResult<serde_json::Value> {
    serde_json::to_value(aggregate).map_err(|e| DomainError {
        kind: DomainErrorKind::Unexpected,
        messages: vec![format!("Failed to serialize {}: {}", T::KIND, e).into()],
        source: e.into(),
    })
}

/// JSONから集約を復元して、ストレージが保持するバージョンを設定する。
fn decode<T: Aggregate>(data: serde_json::Value, version: Option<Version>) -> DomainResult<T> {
    let mut aggregate: T = serde_json::from_value(data).map_err(|e| DomainError {
        kind: DomainErrorKind::Unexpected,
        messages: vec![format!("Failed to deserialize {}: {}", T::KIND, e).into()],
        source: e.into(),
    })?;
    if let Some(version) = version {
        aggregate.set_version(version);
    }
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use domain::models::Conference;

    use super::*;

    #[test]
    fn decode_rejects_conference_starting_after_end() {
        let data = serde_json::json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "GeekSeek Conf",
            "tagline": null,
            "start": "2030-01-01T09:00:00Z",
            "end": "2026-10-04T18:00:00Z",
            "version": 1,
        });

        let err = decode::<Conference>(data, Some(Version::FIRST)).unwrap_err();

        assert!(err.is(DomainErrorKind::Unexpected));
        assert!(
            err.to_string()
                .contains("start must be less than or equal to end"),
            "{}",
            err
        );
    }
}
