pub mod allocator;
pub mod directory;
pub mod fanout;
pub mod registry;
pub mod router;

pub use directory::RoomDirectory;
pub use fanout::{Broadcaster, ConnectionSender};
pub use registry::ConnectionRegistry;
pub use router::EventRouter;
