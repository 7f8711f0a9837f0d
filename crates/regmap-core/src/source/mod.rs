//! Source text access: the per-file line cache and the `@regmap` comment
//! decoder built on it.

pub mod cache;
pub mod comments;

pub use cache::{SourceCache, SourceLines};
pub use comments::CommentDecoder;
