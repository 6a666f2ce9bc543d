pub mod feed;
pub mod item;

pub use feed::{FeedMeta, FeedUpdate};
pub use item::{ItemId, ItemRecord};
