pub mod console;
pub mod traits;

pub use console::ConsoleTransport;
pub use traits::{ChannelMessage, Notifier};
