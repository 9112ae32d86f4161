pub mod counter;
pub mod formats;
pub mod slackmsg;
pub mod storage;
pub mod traits;

pub use counter::FrameCounter;
pub use formats::{FormatList, NegotiationError};
pub use slackmsg::SlackMsgFilter;
pub use storage::{SpaceLevel, StorageFilter};
pub use traits::{FilterDescriptor, FilterError, FilterFlags, MediaType, Pad, VideoFilter};
