//! Pass-through video filters that run a side effect every N frames:
//! `slackmsg` posts a webhook message, `storage` logs free disk space.

pub mod chain;
pub mod filter;
pub mod notify;
pub mod probe;

pub use chain::{FilterChain, TimelineWindow};
pub use filter::{FilterError, NegotiationError, VideoFilter};
