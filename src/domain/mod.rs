pub mod entry;
pub mod feed;
pub mod item;

pub use entry::RawEntry;
pub use feed::{Feed, DEFAULT_FEED_INTERVAL};
pub use item::{CandidateItem, Item};
