//! Inlets and outlets: the four endpoint variants of an object.
//!
//! Every port has a [`PortMode`] fixed at construction. Message ports carry
//! discrete [`Message`](crate::message::Message)s pushed by the producer;
//! signal ports carry one block of samples pulled by the consumer. Calling a
//! signal operation on a message port (or the reverse) is a contract
//! violation and always yields a [`PortError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::config::{BlockConfig, Sample};
use crate::object::ObjectId;
use std::fmt;

/// What a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortMode {
    /// Discrete control messages.
    Message,
    /// Per-block sample buffers.
    Signal,
}

/// Producer end of a connection, as seen from an inlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutletRef {
    /// Object owning the outlet.
    pub object: ObjectId,
    /// Outlet index on that object.
    pub index: usize,
    /// Mode of the outlet.
    pub mode: PortMode,
}

/// Consumer end of a connection, as seen from an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InletRef {
    /// Object owning the inlet.
    pub object: ObjectId,
    /// Inlet index on that object.
    pub index: usize,
    /// Mode of the inlet.
    pub mode: PortMode,
}

/// Misuse of a port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortError {
    /// Buffer read on a message inlet.
    NoBufferOnMessageInlet,
    /// Signal-source query on a message inlet.
    NoSignalSourcesOnMessageInlet,
    /// Buffer access on a message outlet.
    NoBufferOnMessageOutlet,
    /// Message sent through a signal outlet.
    MessageOnSignalOutlet,
    /// Port index not declared by the object.
    NoSuchPort(usize),
    /// A connected producer's buffer cannot be reached.
    ProducerUnavailable(OutletRef),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortError::NoBufferOnMessageInlet => write!(f, "no signal buffer on a message inlet"),
            PortError::NoSignalSourcesOnMessageInlet => {
                write!(f, "a message inlet cannot have signal sources")
            }
            PortError::NoBufferOnMessageOutlet => write!(f, "no signal buffer on a message outlet"),
            PortError::MessageOnSignalOutlet => write!(f, "message sent through a signal outlet"),
            PortError::NoSuchPort(index) => write!(f, "no port #{}", index),
            PortError::ProducerUnavailable(outlet) => write!(
                f,
                "signal producer {:?} outlet #{} is unavailable",
                outlet.object, outlet.index
            ),
        }
    }
}

impl std::error::Error for PortError {}

/// Resolves a signal outlet to its current block.
///
/// The lifetime is that of the buffers handed out, so a signal inlet can
/// return a producer's buffer without copying it.
pub trait SignalSource<'a> {
    /// Current contents of `outlet`.
    fn signal_buffer(&self, outlet: OutletRef) -> Result<&'a [Sample], PortError>;
}

/// Message-only inlet.
#[derive(Debug, Clone)]
pub struct MessageInlet {
    index: usize,
    sources: Vec<OutletRef>,
}

/// Signal inlet; also accepts messages.
#[derive(Debug, Clone)]
pub struct SignalInlet {
    index: usize,
    sources: Vec<OutletRef>,
    signal_sources: Vec<OutletRef>,
    zeros: Box<[Sample]>,
    mix: Box<[Sample]>,
}

impl SignalInlet {
    /// Current input block.
    ///
    /// With no signal producer this is silence, with exactly one it is that
    /// producer's buffer itself, and with several it is their elementwise sum
    /// written into the inlet's mix buffer. The policy is re-evaluated on
    /// every call.
    pub fn read_buffer<'s, 'a: 's>(
        &'s mut self,
        source: &dyn SignalSource<'a>,
    ) -> Result<&'s [Sample], PortError> {
        match self.signal_sources.as_slice() {
            [] => Ok(&self.zeros[..]),
            [only] => source.signal_buffer(*only),
            producers => {
                self.mix.fill(0.0);
                for producer in producers {
                    let block = source.signal_buffer(*producer)?;
                    for (acc, sample) in self.mix.iter_mut().zip(block.iter()) {
                        *acc += *sample;
                    }
                }
                Ok(&self.mix[..])
            }
        }
    }

    /// Number of connected signal outlets.
    pub fn signal_source_count(&self) -> usize {
        self.signal_sources.len()
    }
}

/// An object's input port.
#[derive(Debug, Clone)]
pub enum Inlet {
    /// Message-only inlet.
    Message(MessageInlet),
    /// Signal inlet.
    Signal(SignalInlet),
}

impl Inlet {
    pub(crate) fn new(mode: PortMode, index: usize, config: &BlockConfig) -> Self {
        match mode {
            PortMode::Message => Inlet::Message(MessageInlet {
                index,
                sources: Vec::new(),
            }),
            PortMode::Signal => Inlet::Signal(SignalInlet {
                index,
                sources: Vec::new(),
                signal_sources: Vec::new(),
                zeros: config.alloc_buffer(),
                mix: config.alloc_buffer(),
            }),
        }
    }

    /// Position among the owning object's inlets.
    pub fn index(&self) -> usize {
        match self {
            Inlet::Message(inlet) => inlet.index,
            Inlet::Signal(inlet) => inlet.index,
        }
    }

    /// Mode fixed at construction.
    pub fn mode(&self) -> PortMode {
        match self {
            Inlet::Message(_) => PortMode::Message,
            Inlet::Signal(_) => PortMode::Signal,
        }
    }

    /// Every connected producer, in connection order.
    pub fn sources(&self) -> &[OutletRef] {
        match self {
            Inlet::Message(inlet) => &inlet.sources,
            Inlet::Signal(inlet) => &inlet.sources,
        }
    }

    /// Append a producer. Only signal outlets join the summed set.
    pub(crate) fn connect(&mut self, source: OutletRef) {
        match self {
            Inlet::Message(inlet) => inlet.sources.push(source),
            Inlet::Signal(inlet) => {
                inlet.sources.push(source);
                if source.mode == PortMode::Signal {
                    inlet.signal_sources.push(source);
                }
            }
        }
    }

    /// Whether at least one signal outlet feeds this inlet.
    pub fn has_signal_sources(&self) -> Result<bool, PortError> {
        Ok(self.signal_source_count()? > 0)
    }

    /// Number of connected signal outlets.
    pub fn signal_source_count(&self) -> Result<usize, PortError> {
        match self {
            Inlet::Message(_) => Err(PortError::NoSignalSourcesOnMessageInlet),
            Inlet::Signal(inlet) => Ok(inlet.signal_source_count()),
        }
    }

    /// Current input block; see [`SignalInlet::read_buffer`].
    pub fn read_buffer<'s, 'a: 's>(
        &'s mut self,
        source: &dyn SignalSource<'a>,
    ) -> Result<&'s [Sample], PortError> {
        match self {
            Inlet::Message(_) => Err(PortError::NoBufferOnMessageInlet),
            Inlet::Signal(inlet) => inlet.read_buffer(source),
        }
    }
}

/// Message outlet: fans messages out to its sinks.
#[derive(Debug, Clone)]
pub struct MessageOutlet {
    index: usize,
    sinks: Vec<InletRef>,
}

/// Signal outlet: owns one block written by its object's tick.
#[derive(Debug, Clone)]
pub struct SignalOutlet {
    index: usize,
    sinks: Vec<InletRef>,
    buffer: Box<[Sample]>,
}

/// An object's output port.
#[derive(Debug, Clone)]
pub enum Outlet {
    /// Message outlet.
    Message(MessageOutlet),
    /// Signal outlet.
    Signal(SignalOutlet),
}

impl Outlet {
    pub(crate) fn new(mode: PortMode, index: usize, config: &BlockConfig) -> Self {
        match mode {
            PortMode::Message => Outlet::Message(MessageOutlet {
                index,
                sinks: Vec::new(),
            }),
            PortMode::Signal => Outlet::Signal(SignalOutlet {
                index,
                sinks: Vec::new(),
                buffer: config.alloc_buffer(),
            }),
        }
    }

    /// Position among the owning object's outlets.
    pub fn index(&self) -> usize {
        match self {
            Outlet::Message(outlet) => outlet.index,
            Outlet::Signal(outlet) => outlet.index,
        }
    }

    /// Mode fixed at construction.
    pub fn mode(&self) -> PortMode {
        match self {
            Outlet::Message(_) => PortMode::Message,
            Outlet::Signal(_) => PortMode::Signal,
        }
    }

    /// Connected inlets, in connection order.
    pub fn sinks(&self) -> &[InletRef] {
        match self {
            Outlet::Message(outlet) => &outlet.sinks,
            Outlet::Signal(outlet) => &outlet.sinks,
        }
    }

    pub(crate) fn connect(&mut self, sink: InletRef) {
        match self {
            Outlet::Message(outlet) => outlet.sinks.push(sink),
            Outlet::Signal(outlet) => outlet.sinks.push(sink),
        }
    }

    /// Snapshot of the sinks a message must reach, in connection order.
    ///
    /// Delivery iterates the snapshot, so handlers that wire new connections
    /// while a message is in flight do not disturb the current fan-out.
    pub fn fan_out(&self) -> Result<Vec<InletRef>, PortError> {
        match self {
            Outlet::Message(outlet) => Ok(outlet.sinks.clone()),
            Outlet::Signal(_) => Err(PortError::MessageOnSignalOutlet),
        }
    }

    /// Block most recently written by the owning object.
    pub fn buffer(&self) -> Result<&[Sample], PortError> {
        match self {
            Outlet::Message(_) => Err(PortError::NoBufferOnMessageOutlet),
            Outlet::Signal(outlet) => Ok(&outlet.buffer[..]),
        }
    }

    pub(crate) fn buffer_mut(&mut self) -> Result<&mut [Sample], PortError> {
        match self {
            Outlet::Message(_) => Err(PortError::NoBufferOnMessageOutlet),
            Outlet::Signal(outlet) => Ok(&mut outlet.buffer[..]),
        }
    }
}
