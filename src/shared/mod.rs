pub mod shutdown;

pub use shutdown::ShutdownSignal;
