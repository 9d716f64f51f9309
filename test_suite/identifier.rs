use fancy_regex::Regex;

use domain::models::{Attachment, AttachmentId, ConferenceId};

use crate::helpers::CANONICAL_ID_PATTERN;

/// Check that two attachments constructed in sequence have distinct canonical identifiers.
#[test]
fn attachments_get_distinct_canonical_identifiers() {
    let pattern = Regex::new(CANONICAL_ID_PATTERN).unwrap();

    let first = Attachment::new();
    let second = Attachment::new();

    assert_ne!(first.id(), second.id());
    for id in [first.id(), second.id()] {
        let text = id.to_string();
        assert!(pattern.is_match(&text).unwrap(), "{}", text);
    }
}

/// Check that an identifier survives a textual channel.
#[test]
fn identifier_survives_a_textual_channel() {
    let attachment = Attachment::new();

    let text = attachment.id().to_string();
    let parsed: AttachmentId = text.parse().unwrap();
    let json = serde_json::to_string(&attachment).unwrap();
    let decoded: Attachment = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, attachment.id());
    assert_eq!(decoded.id(), attachment.id());
}

/// Check that identifiers produced in one process never collide.
#[test]
fn identifiers_do_not_collide() {
    let mut ids: Vec<ConferenceId> = (0..10_000).map(|_| ConferenceId::new()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10_000);
}
