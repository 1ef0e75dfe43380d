// communication/mod.rs
pub mod channel;

pub use channel::Channel;
