//! Daemon lifecycle: shutdown on signals or on request

mod shutdown;

pub use shutdown::ShutdownSignal;
