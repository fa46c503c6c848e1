/// Provider wire format
pub mod wire;

pub use wire::{WireMessage, WirePersonalization};
