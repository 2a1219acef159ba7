//! Scene synchronization
//!
//! The controller mirrors host entities into a peer-visible node graph,
//! routes inbound value writes and function calls, and paces host frames
//! against peer execution.

pub mod controller;
pub mod functions;
pub mod messages;
pub mod pacing;

pub use controller::{BridgeHandle, SyncController};
pub use functions::{CustomFunction, CustomHandler, FunctionBinding, SpawnCatalog, TemplateCatalog};
pub use messages::{
    ClearFlags, FunctionSnapshot, ImportedNode, ImportedPin, InboundMessage, NodeSnapshot,
    NodeUpdate, OutboundMessage, PinSnapshot, StringListUpdate, Transport, ValueChanged,
    Visualizer,
};
pub use pacing::{FramePacer, PaceEvent};
