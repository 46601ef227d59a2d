pub mod entry;
pub mod feed;
pub mod format;
pub mod rating;

pub use entry::{ListLog, LogEntry, MovieLog, Supplemental};
pub use feed::UserFeed;
pub use rating::{Rating, RatingEmoji, Sentiment};
