//! Dataflow patching core: objects with message and signal ports, wired
//! into a patch, ticked block by block.

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod dsl;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod message;
pub mod object;
pub mod patch;
pub mod plan;
pub mod portlet;
pub mod rt;

pub use config::{BlockConfig, ConfigError, Sample};
pub use diagnostics::{CollectedDiagnostics, Diagnostics, LogDiagnostics};
pub use dsl::{DslError, ObjectHandle, PatchBuilder};
pub use message::{Atom, Message};
pub use object::{
    MessageContext, Object, ObjectDef, ObjectId, ObjectKind, SignalInputs, SignalOutputs,
};
pub use patch::{Patch, PatchError, PatchId};
pub use plan::{Plan, PlanError};
pub use portlet::{Inlet, InletRef, Outlet, OutletRef, PortError, PortMode, SignalSource};
pub use rt::{process_block_safe, Runtime};
