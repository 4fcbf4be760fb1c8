//! Patch: the arena owning objects and the connections between their ports.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::config::{BlockConfig, Sample};
use crate::invariant_ppt::{
    assert_invariant, BLOCK_SIZE_UNIFORM, REGISTRY_BY_KIND, SIGNAL_PARTITION, WIRING_SYMMETRIC,
};
use crate::message::{Atom, Message};
use crate::object::{MessageContext, Object, ObjectDef, ObjectId, ObjectKind};
use crate::portlet::{InletRef, OutletRef, PortError, PortMode, SignalSource};
use log::{debug, trace};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PATCH_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a patch, held by its objects as a back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(pub u64);

/// Errors raised while building or driving a patch.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchError {
    /// No object with this id.
    NoSuchObject(ObjectId),
    /// Outlet index not declared by the object.
    NoSuchOutlet {
        /// Object addressed.
        object: ObjectId,
        /// Requested outlet.
        outlet: usize,
    },
    /// Inlet index not declared by the object.
    NoSuchInlet {
        /// Object addressed.
        object: ObjectId,
        /// Requested inlet.
        inlet: usize,
    },
    /// The exact same edge already exists.
    AlreadyConnected {
        /// Producer side.
        from: OutletRef,
        /// Consumer side.
        to: InletRef,
    },
    /// Object's def is unavailable because its message handler is running.
    Reentrant(Option<ObjectId>),
    /// Object was built for another block size.
    BlockSizeMismatch {
        /// Block size of the patch.
        expected: usize,
        /// Block size of the object.
        found: usize,
    },
    /// Object already belongs to a patch.
    AlreadyRegistered(ObjectId),
    /// `add_object`/`add_table` called with the wrong kind.
    WrongKind(ObjectKind),
    /// Object construction failed.
    Creation(String),
    /// Port misuse.
    Port(PortError),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::NoSuchObject(id) => write!(f, "no object {:?}", id),
            PatchError::NoSuchOutlet { object, outlet } => {
                write!(f, "object {:?} has no outlet #{}", object, outlet)
            }
            PatchError::NoSuchInlet { object, inlet } => {
                write!(f, "object {:?} has no inlet #{}", object, inlet)
            }
            PatchError::AlreadyConnected { from, to } => write!(
                f,
                "{:?} outlet #{} already connected to {:?} inlet #{}",
                from.object, from.index, to.object, to.index
            ),
            PatchError::Reentrant(Some(id)) => write!(f, "object {:?} is already running", id),
            PatchError::Reentrant(None) => write!(f, "object is already running"),
            PatchError::BlockSizeMismatch { expected, found } => write!(
                f,
                "block size mismatch: patch uses {}, object uses {}",
                expected, found
            ),
            PatchError::AlreadyRegistered(id) => write!(f, "object already registered as {:?}", id),
            PatchError::WrongKind(kind) => write!(f, "wrong registry for {:?} object", kind),
            PatchError::Creation(reason) => write!(f, "cannot create object: {}", reason),
            PatchError::Port(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Port(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PortError> for PatchError {
    fn from(err: PortError) -> Self {
        PatchError::Port(err)
    }
}

/// The containing graph of connected objects.
#[derive(Debug)]
pub struct Patch {
    id: PatchId,
    config: BlockConfig,
    /// Indexed by object id.
    objects: Vec<Object>,
    tables: Vec<ObjectId>,
}

impl Patch {
    /// Create an empty patch; every object it accepts uses `config`.
    pub fn new(config: BlockConfig) -> Self {
        Self {
            id: PatchId(NEXT_PATCH_ID.fetch_add(1, Ordering::Relaxed)),
            config,
            objects: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn id(&self) -> PatchId {
        self.id
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Construct an object with the patch's configuration and register it
    /// in the registry its def declares.
    pub fn create<D: ObjectDef>(&mut self, def: D, args: &[Atom]) -> Result<ObjectId, PatchError> {
        let object = Object::new(def, args, &self.config)?;
        self.register(object)
    }

    /// Register a detached object according to its kind.
    pub fn register(&mut self, object: Object) -> Result<ObjectId, PatchError> {
        match object.kind() {
            ObjectKind::Generic => self.add_object(object),
            ObjectKind::Table => self.add_table(object),
        }
    }

    /// Object-registry callback: assigns identity.
    pub fn add_object(&mut self, object: Object) -> Result<ObjectId, PatchError> {
        if object.kind() != ObjectKind::Generic {
            return Err(PatchError::WrongKind(object.kind()));
        }
        self.insert(object)
    }

    /// Table-registry callback: assigns identity and lists the table.
    pub fn add_table(&mut self, object: Object) -> Result<ObjectId, PatchError> {
        if object.kind() != ObjectKind::Table {
            return Err(PatchError::WrongKind(object.kind()));
        }
        let id = self.insert(object)?;
        self.tables.push(id);
        assert_invariant(
            REGISTRY_BY_KIND,
            self.tables.contains(&id),
            "Table listed in the table registry",
            Some("add_table"),
        );
        Ok(id)
    }

    fn insert(&mut self, mut object: Object) -> Result<ObjectId, PatchError> {
        if let Some(id) = object.id() {
            return Err(PatchError::AlreadyRegistered(id));
        }
        if object.block_size() != self.config.block_size() {
            return Err(PatchError::BlockSizeMismatch {
                expected: self.config.block_size(),
                found: object.block_size(),
            });
        }
        assert_invariant(
            BLOCK_SIZE_UNIFORM,
            object.block_size() == self.config.block_size(),
            "Registered object matches patch block size",
            Some("register"),
        );
        let id = ObjectId(self.objects.len());
        object.id = Some(id);
        object.patch = Some(self.id);
        debug!("registered {} as {:?} ({:?})", object.name(), id, object.kind());
        self.objects.push(object);
        Ok(id)
    }

    /// Look up an object.
    pub fn object(&self, id: ObjectId) -> Result<&Object, PatchError> {
        self.objects.get(id.0).ok_or(PatchError::NoSuchObject(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object, PatchError> {
        self.objects
            .get_mut(id.0)
            .ok_or(PatchError::NoSuchObject(id))
    }

    /// Registered objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    /// Ids of the table-like objects, in registration order.
    pub fn tables(&self) -> &[ObjectId] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Wire `from`'s outlet to `to`'s inlet.
    ///
    /// Both endpoints are validated before either side changes, then the sink
    /// is appended to the outlet and the producer to the inlet, so the two
    /// views of an edge always agree.
    pub fn connect(
        &mut self,
        from: ObjectId,
        outlet: usize,
        to: ObjectId,
        inlet: usize,
    ) -> Result<(), PatchError> {
        let out_port = self
            .object(from)?
            .outlet(outlet)
            .ok_or(PatchError::NoSuchOutlet {
                object: from,
                outlet,
            })?;
        let source = OutletRef {
            object: from,
            index: outlet,
            mode: out_port.mode(),
        };
        let in_mode = self
            .object(to)?
            .inlet(inlet)
            .ok_or(PatchError::NoSuchInlet { object: to, inlet })?
            .mode();
        let sink = InletRef {
            object: to,
            index: inlet,
            mode: in_mode,
        };
        if out_port.sinks().contains(&sink) {
            return Err(PatchError::AlreadyConnected {
                from: source,
                to: sink,
            });
        }

        self.object_mut(from)?.outlets[outlet].connect(sink);
        self.object_mut(to)?.inlets[inlet].connect(source);

        let outlet_side = self.object(from)?.outlets[outlet].sinks().contains(&sink);
        let consumer = &self.object(to)?.inlets[inlet];
        assert_invariant(
            WIRING_SYMMETRIC,
            outlet_side && consumer.sources().contains(&source),
            "Edge recorded on both endpoints",
            Some("connect"),
        );
        if let Ok(count) = consumer.signal_source_count() {
            let expected = consumer
                .sources()
                .iter()
                .filter(|s| s.mode == PortMode::Signal)
                .count();
            assert_invariant(
                SIGNAL_PARTITION,
                count == expected,
                "Signal producers are exactly the connected signal outlets",
                Some("connect"),
            );
        }
        debug!(
            "connected {:?}:{} ({:?}) -> {:?}:{} ({:?})",
            from, outlet, source.mode, to, inlet, sink.mode
        );
        Ok(())
    }

    /// Push `msg` out of `from`'s outlet to every connected inlet, in
    /// connection order.
    pub fn send_message(
        &mut self,
        from: ObjectId,
        outlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        let sinks = self
            .object(from)?
            .outlet(outlet)
            .ok_or(PatchError::NoSuchOutlet {
                object: from,
                outlet,
            })?
            .fan_out()?;
        for sink in sinks {
            self.deliver(sink.object, sink.index, msg.clone())?;
        }
        Ok(())
    }

    /// Hand `msg` to the object owning `to`'s inlet.
    ///
    /// Signal inlets accept messages as well. A message reaching an object
    /// whose handler is already on the stack is queued on that object and
    /// handled, in arrival order, as soon as the running handler returns.
    /// A message cycle that never settles keeps cascading.
    pub fn deliver(&mut self, to: ObjectId, inlet: usize, msg: Message) -> Result<(), PatchError> {
        let object = self.object_mut(to)?;
        if object.inlet(inlet).is_none() {
            return Err(PatchError::NoSuchInlet { object: to, inlet });
        }
        let mut def = match object.def.take() {
            Some(def) => def,
            None => {
                trace!("{:?}:{} <- {} (queued)", to, inlet, msg);
                object.pending.push_back((inlet, msg));
                return Ok(());
            }
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_handler(to, &mut *def, inlet, msg)
        }));
        // The def goes back even when the handler failed or panicked.
        if let Ok(object) = self.object_mut(to) {
            object.def = Some(def);
            if !matches!(outcome, Ok(Ok(()))) {
                object.pending.clear();
            }
        }
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Run `def` for `msg`, then for every message queued on `to` meanwhile.
    fn run_handler(
        &mut self,
        to: ObjectId,
        def: &mut dyn ObjectDef,
        inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        let mut next = Some((inlet, msg));
        while let Some((inlet, msg)) = next {
            trace!("{:?}:{} <- {}", to, inlet, msg);
            let mut ctx = MessageContext {
                patch: &mut *self,
                object: to,
            };
            def.message(&mut ctx, inlet, msg)?;
            next = self.object_mut(to)?.pending.pop_front();
        }
        Ok(())
    }

    /// Run one block of `id`.
    pub fn tick(&mut self, id: ObjectId) -> Result<(), PatchError> {
        let (object, peers) = self.split(id)?;
        object.tick(&peers)
    }

    /// Current block at one of `id`'s signal inlets.
    pub fn read_inlet(&mut self, id: ObjectId, inlet: usize) -> Result<&[Sample], PatchError> {
        let (object, peers) = self.split(id)?;
        let port = object
            .inlets
            .get_mut(inlet)
            .ok_or(PatchError::NoSuchInlet { object: id, inlet })?;
        Ok(port.read_buffer(&peers)?)
    }

    /// Block most recently written to one of `id`'s signal outlets.
    pub fn outlet_buffer(&self, id: ObjectId, outlet: usize) -> Result<&[Sample], PatchError> {
        let port = self
            .object(id)?
            .outlet(outlet)
            .ok_or(PatchError::NoSuchOutlet { object: id, outlet })?;
        Ok(port.buffer()?)
    }

    /// Zero the signal outlets of `id`.
    pub(crate) fn silence(&mut self, id: ObjectId) -> Result<(), PatchError> {
        self.object_mut(id)?.silence();
        Ok(())
    }

    /// Borrow one object mutably and every other object immutably.
    fn split(&mut self, id: ObjectId) -> Result<(&mut Object, Peers<'_>), PatchError> {
        if id.0 >= self.objects.len() {
            return Err(PatchError::NoSuchObject(id));
        }
        let (before, rest) = self.objects.split_at_mut(id.0);
        let (object, after) = rest
            .split_first_mut()
            .ok_or(PatchError::NoSuchObject(id))?;
        Ok((
            object,
            Peers {
                before,
                after,
                split: id.0,
            },
        ))
    }
}

/// Every object but the one being ticked or read.
struct Peers<'p> {
    before: &'p [Object],
    after: &'p [Object],
    split: usize,
}

impl<'a, 'p: 'a> SignalSource<'a> for Peers<'p> {
    fn signal_buffer(&self, outlet: OutletRef) -> Result<&'a [Sample], PortError> {
        let index = outlet.object.0;
        let (before, after): (&'p [Object], &'p [Object]) = (self.before, self.after);
        let slot = if index < self.split {
            before.get(index)
        } else if index > self.split {
            after.get(index - self.split - 1)
        } else {
            // An object cannot feed its own signal inlet within one block.
            None
        };
        slot.and_then(|object| object.outlet(outlet.index))
            .ok_or(PortError::ProducerUnavailable(outlet))?
            .buffer()
    }
}
