//! Objects: computational units owning a fixed set of ports.
//!
//! The behaviour of an object lives in an [`ObjectDef`]; the [`Object`]
//! wrapper owns the ports declared by the def and the bookkeeping the patch
//! needs (identity, tick counter, endpoint flag, registry kind).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::config::{BlockConfig, Sample};
use crate::invariant_ppt::{assert_invariant, PORT_LAYOUT_FIXED};
use crate::message::{Atom, Message};
use crate::patch::{Patch, PatchError, PatchId};
use crate::portlet::{Inlet, Outlet, PortError, PortMode, SignalSource};
use std::collections::VecDeque;
use std::fmt;

/// Identity assigned by the owning patch at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Which registry of the patch an object joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Ordinary object.
    Generic,
    /// Table-like object, also listed in the patch's table registry.
    Table,
}

/// Behaviour of an object.
///
/// Port layouts are static declarations: the same def always yields the same
/// number and modes of inlets and outlets.
pub trait ObjectDef: 'static {
    /// Name used in logs and debug output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Modes of the inlets, in order.
    fn inlet_modes(&self) -> &'static [PortMode];

    /// Modes of the outlets, in order.
    fn outlet_modes(&self) -> &'static [PortMode];

    /// Registry this object joins.
    fn kind(&self) -> ObjectKind {
        ObjectKind::Generic
    }

    /// Terminal signal sink (output, recorder, ...).
    fn is_endpoint(&self) -> bool {
        false
    }

    /// Consume creation arguments before any connection exists.
    fn preinit(&mut self, _args: &[Atom], _config: &BlockConfig) -> Result<(), String> {
        Ok(())
    }

    /// Produce one block: read signal inlets, write signal outlets.
    fn tick(
        &mut self,
        _inputs: &mut SignalInputs<'_, '_>,
        _outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        Ok(())
    }

    /// Handle a message arriving at `inlet`.
    fn message(
        &mut self,
        _ctx: &mut MessageContext<'_>,
        _inlet: usize,
        _msg: Message,
    ) -> Result<(), PatchError> {
        Ok(())
    }
}

/// An instantiated object.
pub struct Object {
    pub(crate) id: Option<ObjectId>,
    pub(crate) patch: Option<PatchId>,
    kind: ObjectKind,
    endpoint: bool,
    frame: u64,
    block_size: usize,
    pub(crate) inlets: Vec<Inlet>,
    pub(crate) outlets: Vec<Outlet>,
    /// Taken out while the def handles a message.
    pub(crate) def: Option<Box<dyn ObjectDef>>,
    /// Messages that arrived while the def was busy, in arrival order.
    pub(crate) pending: VecDeque<(usize, Message)>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.def.as_ref().map(|d| d.name().to_string()))
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("frame", &self.frame)
            .field("inlets", &self.inlets.len())
            .field("outlets", &self.outlets.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Object {
    /// Build a detached object: allocate the declared ports, then run
    /// `preinit` with the creation arguments.
    pub fn new<D: ObjectDef>(def: D, args: &[Atom], config: &BlockConfig) -> Result<Self, PatchError> {
        Self::from_boxed(Box::new(def), args, config)
    }

    /// Same as [`Object::new`] for an already boxed def.
    pub fn from_boxed(
        mut def: Box<dyn ObjectDef>,
        args: &[Atom],
        config: &BlockConfig,
    ) -> Result<Self, PatchError> {
        let inlet_modes = def.inlet_modes();
        let outlet_modes = def.outlet_modes();
        let outlets: Vec<Outlet> = outlet_modes
            .iter()
            .enumerate()
            .map(|(i, mode)| Outlet::new(*mode, i, config))
            .collect();
        let inlets: Vec<Inlet> = inlet_modes
            .iter()
            .enumerate()
            .map(|(i, mode)| Inlet::new(*mode, i, config))
            .collect();
        assert_invariant(
            PORT_LAYOUT_FIXED,
            inlets.len() == inlet_modes.len() && outlets.len() == outlet_modes.len(),
            "Ports allocated exactly as declared",
            Some("Object::new"),
        );

        def.preinit(args, config)
            .map_err(|reason| PatchError::Creation(format!("{}: {}", def.name(), reason)))?;

        Ok(Self {
            id: None,
            patch: None,
            kind: def.kind(),
            endpoint: def.is_endpoint(),
            frame: 0,
            block_size: config.block_size(),
            inlets,
            outlets,
            def: Some(def),
            pending: VecDeque::new(),
        })
    }

    /// Identity in the owning patch; `None` until registered.
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    /// Owning patch; `None` until registered.
    pub fn patch(&self) -> Option<PatchId> {
        self.patch
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Whether this object is a terminal signal sink.
    pub fn is_endpoint(&self) -> bool {
        self.endpoint
    }

    /// Number of completed ticks.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Samples per block of every buffer this object owns.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn inlets(&self) -> &[Inlet] {
        &self.inlets
    }

    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    pub fn inlet(&self, index: usize) -> Option<&Inlet> {
        self.inlets.get(index)
    }

    pub fn outlet(&self, index: usize) -> Option<&Outlet> {
        self.outlets.get(index)
    }

    /// Whether any port carries signal; only such objects need ticking.
    pub fn is_signal_capable(&self) -> bool {
        self.inlets.iter().any(|i| i.mode() == PortMode::Signal)
            || self.outlets.iter().any(|o| o.mode() == PortMode::Signal)
    }

    /// Whether the def is handling a message right now.
    pub fn is_busy(&self) -> bool {
        self.def.is_none()
    }

    /// Name of the def, for diagnostics.
    pub fn name(&self) -> &str {
        self.def.as_ref().map(|d| d.name()).unwrap_or("<busy>")
    }

    /// Run one block of the def against `source` for upstream buffers.
    ///
    /// The scheduler calls this at most once per block, after every producer
    /// feeding this object has ticked.
    pub fn tick(&mut self, source: &dyn SignalSource<'_>) -> Result<(), PatchError> {
        let id = self.id;
        let def = self.def.as_mut().ok_or(PatchError::Reentrant(id))?;
        let mut inputs = SignalInputs {
            inlets: &mut self.inlets,
            source,
        };
        let mut outputs = SignalOutputs {
            outlets: &mut self.outlets,
        };
        def.tick(&mut inputs, &mut outputs)?;
        self.frame += 1;
        Ok(())
    }

    /// Zero every signal outlet.
    pub(crate) fn silence(&mut self) {
        for outlet in &mut self.outlets {
            if let Ok(buffer) = outlet.buffer_mut() {
                buffer.fill(0.0);
            }
        }
    }
}

/// Signal inlets of the object being ticked.
pub struct SignalInputs<'i, 'a> {
    inlets: &'i mut [Inlet],
    source: &'i dyn SignalSource<'a>,
}

impl<'i, 'a> SignalInputs<'i, 'a> {
    /// Number of inlets, message inlets included.
    pub fn len(&self) -> usize {
        self.inlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inlets.is_empty()
    }

    /// Whether `inlet` has a connected signal producer.
    pub fn has_signal(&self, inlet: usize) -> Result<bool, PortError> {
        self.inlets
            .get(inlet)
            .ok_or(PortError::NoSuchPort(inlet))?
            .has_signal_sources()
    }

    /// Current block at `inlet`.
    pub fn read(&mut self, inlet: usize) -> Result<&[Sample], PortError> {
        let source = self.source;
        self.inlets
            .get_mut(inlet)
            .ok_or(PortError::NoSuchPort(inlet))?
            .read_buffer(source)
    }

    /// Current blocks at two inlets at once.
    pub fn read_pair(&mut self, a: usize, b: usize) -> Result<(&[Sample], &[Sample]), PortError> {
        let source = self.source;
        if a == b {
            let block = self.read(a)?;
            Ok((block, block))
        } else {
            let (low, high) = (a.min(b), a.max(b));
            if high >= self.inlets.len() {
                return Err(PortError::NoSuchPort(high));
            }
            let (left, right) = self.inlets.split_at_mut(high);
            let low_block = left[low].read_buffer(source)?;
            let high_block = right[0].read_buffer(source)?;
            if a < b {
                Ok((low_block, high_block))
            } else {
                Ok((high_block, low_block))
            }
        }
    }
}

/// Signal outlets of the object being ticked.
pub struct SignalOutputs<'o> {
    outlets: &'o mut [Outlet],
}

impl<'o> SignalOutputs<'o> {
    /// Number of outlets, message outlets included.
    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    /// Block to fill for `outlet`.
    pub fn write(&mut self, outlet: usize) -> Result<&mut [Sample], PortError> {
        self.outlets
            .get_mut(outlet)
            .ok_or(PortError::NoSuchPort(outlet))?
            .buffer_mut()
    }
}

/// Handle given to [`ObjectDef::message`] for emitting messages.
pub struct MessageContext<'p> {
    pub(crate) patch: &'p mut Patch,
    pub(crate) object: ObjectId,
}

impl<'p> MessageContext<'p> {
    /// Identity of the receiving object.
    pub fn id(&self) -> ObjectId {
        self.object
    }

    pub fn config(&self) -> &BlockConfig {
        self.patch.config()
    }

    /// Emit `msg` through one of the receiving object's outlets.
    ///
    /// Delivery is synchronous: every downstream handler, and anything they
    /// emit in turn, runs before this returns.
    pub fn send_message(&mut self, outlet: usize, msg: Message) -> Result<(), PatchError> {
        self.patch.send_message(self.object, outlet, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sampler;

    impl ObjectDef for Sampler {
        fn name(&self) -> &str {
            "sampler"
        }
        fn inlet_modes(&self) -> &'static [PortMode] {
            &[PortMode::Signal, PortMode::Message]
        }
        fn outlet_modes(&self) -> &'static [PortMode] {
            &[PortMode::Signal]
        }
        fn is_endpoint(&self) -> bool {
            true
        }
        fn preinit(&mut self, args: &[Atom], _config: &BlockConfig) -> Result<(), String> {
            match args.first() {
                Some(Atom::Symbol(s)) if s == "fail" => Err("bad argument".to_string()),
                _ => Ok(()),
            }
        }
        fn tick(
            &mut self,
            inputs: &mut SignalInputs<'_, '_>,
            outputs: &mut SignalOutputs<'_>,
        ) -> Result<(), PortError> {
            let doubled: Vec<Sample> = inputs.read(0)?.iter().map(|s| s * 2.0 + 1.0).collect();
            outputs.write(0)?.copy_from_slice(&doubled);
            Ok(())
        }
    }

    struct NoSignals;

    impl<'a> SignalSource<'a> for NoSignals {
        fn signal_buffer(
            &self,
            outlet: crate::portlet::OutletRef,
        ) -> Result<&'a [Sample], PortError> {
            Err(PortError::ProducerUnavailable(outlet))
        }
    }

    #[test]
    fn construction_allocates_declared_ports() {
        let config = BlockConfig::new(8, 48000.0).unwrap();
        let object = Object::new(Sampler, &[], &config).unwrap();
        assert_eq!(object.id(), None);
        assert_eq!(object.patch(), None);
        assert_eq!(object.inlets().len(), 2);
        assert_eq!(object.outlets().len(), 1);
        assert_eq!(object.inlet(1).map(Inlet::mode), Some(PortMode::Message));
        assert_eq!(object.outlet(0).unwrap().buffer().unwrap().len(), 8);
        assert!(object.is_endpoint());
        assert!(object.is_signal_capable());
        assert_eq!(object.kind(), ObjectKind::Generic);
    }

    #[test]
    fn preinit_failure_aborts_construction() {
        let err = Object::new(Sampler, &[Atom::Symbol("fail".into())], &BlockConfig::default()).unwrap_err();
        assert_eq!(err, PatchError::Creation("sampler: bad argument".to_string()));
    }

    #[test]
    fn detached_tick_reads_silence() {
        let config = BlockConfig::new(4, 48000.0).unwrap();
        let mut object = Object::new(Sampler, &[], &config).unwrap();
        object.tick(&NoSignals).unwrap();
        assert_eq!(object.frame(), 1);
        assert_eq!(object.outlet(0).unwrap().buffer().unwrap(), &[1.0; 4]);
        object.silence();
        assert_eq!(object.outlet(0).unwrap().buffer().unwrap(), &[0.0; 4]);
    }
}
