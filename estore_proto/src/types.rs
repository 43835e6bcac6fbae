//! Types representing streams, feeds and events as the event store serves them
mod direction;
mod embed_mode;
mod event;
mod feed;
mod link_relation;
mod projection;
mod stream_id;
mod write;
pub use direction::*;
pub use embed_mode::*;
pub use event::*;
pub use feed::*;
pub use link_relation::*;
pub use projection::*;
pub use stream_id::*;
pub use write::*;

/// Stream-relative sequence number of an event
pub type EventVersion = u64;
