//! ML inference engine using Candle.
//!
//! Provides device selection, safetensors loading and the fatigue CNN.

mod device;
mod loader;
mod network;

pub use device::get_device;
pub use loader::{load_fatigue_cnn, load_safetensors};
pub use network::{FatigueCnn, MIN_INPUT_SIZE, PARAMETER_GROUPS};
