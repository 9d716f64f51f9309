mod persistence;
mod storage;

pub use persistence::*;
pub use storage::*;

use crate::models::{Attachment, Conference};

/// カンファレンスリポジトリ
pub type ConferenceRepository<S> = PersistenceRepository<Conference, S>;

/// 添付ファイルリポジトリ
pub type AttachmentRepository<S> = PersistenceRepository<Attachment, S>;
