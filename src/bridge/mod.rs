pub mod content;
pub mod host;
pub mod loader;
pub mod message;
pub mod state;
pub mod transport;
