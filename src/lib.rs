// Export modules for use in tests
pub mod error;
pub mod session;
pub mod settings;
pub mod stamp;
pub mod viewport;

pub use error::{Result, StampError};
pub use session::{Command, DocumentSession, Effect, RenderedStamp};
pub use settings::Settings;
