use serde::{Deserialize, Serialize};

use crate::models::primitives::Id;
use crate::repositories::Aggregate;

/// 添付ファイルID
pub type AttachmentId = Id<Attachment>;

/// 添付ファイル
///
/// IDは構築時に自身で採番するため、永続化される前から他の集約から参照できる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// ID
    id: AttachmentId,
}

impl Attachment {
    /// 新しいIDを持つ添付ファイルを作成する。
    pub fn new() -> Self {
        Self {
            id: AttachmentId::new(),
        }
    }

    /// IDを返す。
    pub fn id(&self) -> AttachmentId {
        self.id
    }
}

impl Default for Attachment {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregate for Attachment {
    const KIND: &'static str = "attachment";

    fn id(&self) -> Id<Self> {
        self.id
    }
}
