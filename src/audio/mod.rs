//! Audio subsystem module

pub mod callback;
pub mod device;
pub mod handoff;
pub mod stream;

pub use callback::{CallbackStats, PeriodCallback};
pub use device::{list_devices, select_device, DeviceInfo};
pub use handoff::{create_shared_handoff, Handoff, HandoffClosed, SharedHandoff};
pub use stream::open_stream;
