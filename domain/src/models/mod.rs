pub mod primitives;
mod attachment;
mod conference;

pub use attachment::*;
pub use conference::*;
