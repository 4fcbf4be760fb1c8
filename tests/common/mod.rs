//! Small object defs shared by the integration tests.

#![allow(dead_code)]

use pdgraph::convert::to_float;
use pdgraph::{
    Atom, BlockConfig, CollectedDiagnostics, Message, MessageContext, ObjectDef, PatchError,
    PortError, PortMode, Sample, SignalInputs, SignalOutputs,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Constant signal; a float on its inlet changes the level.
pub struct Const(pub Sample);

impl ObjectDef for Const {
    fn name(&self) -> &str {
        "const~"
    }
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn preinit(&mut self, args: &[Atom], _config: &BlockConfig) -> Result<(), String> {
        match args.first() {
            None => Ok(()),
            Some(atom) => {
                self.0 = atom
                    .as_float()
                    .ok_or_else(|| format!("expected a level, got `{}`", atom))?;
                Ok(())
            }
        }
    }
    fn tick(
        &mut self,
        _inputs: &mut SignalInputs<'_, '_>,
        outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        outputs.write(0)?.fill(self.0);
        Ok(())
    }
    fn message(
        &mut self,
        _ctx: &mut MessageContext<'_>,
        _inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        if let Some(level) = to_float(&msg, &CollectedDiagnostics::new()) {
            self.0 = level;
        }
        Ok(())
    }
}

/// Ramp rising by one per sample, continuing across blocks.
pub struct Phasor(pub Sample);

impl ObjectDef for Phasor {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn tick(
        &mut self,
        _inputs: &mut SignalInputs<'_, '_>,
        outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        for sample in outputs.write(0)?.iter_mut() {
            *sample = self.0;
            self.0 += 1.0;
        }
        Ok(())
    }
}

/// Signal times a factor set through its right (message) inlet.
pub struct Gain(pub Sample);

impl ObjectDef for Gain {
    fn name(&self) -> &str {
        "*~"
    }
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal, PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn tick(
        &mut self,
        inputs: &mut SignalInputs<'_, '_>,
        outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        let input = inputs.read(0)?;
        for (out, x) in outputs.write(0)?.iter_mut().zip(input) {
            *out = x * self.0;
        }
        Ok(())
    }
    fn message(
        &mut self,
        _ctx: &mut MessageContext<'_>,
        inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        if inlet == 1 {
            if let Some(gain) = to_float(&msg, &CollectedDiagnostics::new()) {
                self.0 = gain;
            }
        }
        Ok(())
    }
}

/// Sum of two signal inlets.
pub struct Add;

impl ObjectDef for Add {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal, PortMode::Signal]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn tick(
        &mut self,
        inputs: &mut SignalInputs<'_, '_>,
        outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        let (left, right) = inputs.read_pair(0, 1)?;
        for ((out, l), r) in outputs.write(0)?.iter_mut().zip(left).zip(right) {
            *out = l + r;
        }
        Ok(())
    }
}

/// Output endpoint: its outlet holds the last block it received.
pub struct Dac;

impl ObjectDef for Dac {
    fn name(&self) -> &str {
        "dac~"
    }
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Signal]
    }
    fn is_endpoint(&self) -> bool {
        true
    }
    fn tick(
        &mut self,
        inputs: &mut SignalInputs<'_, '_>,
        outputs: &mut SignalOutputs<'_>,
    ) -> Result<(), PortError> {
        let input = inputs.read(0)?;
        outputs.write(0)?.copy_from_slice(input);
        Ok(())
    }
}

/// Shared record of deliveries: (tag, inlet, message).
pub type Log = Rc<RefCell<Vec<(usize, usize, Message)>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Records every message it receives on either inlet.
pub struct Recorder {
    pub tag: usize,
    pub log: Log,
}

impl ObjectDef for Recorder {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message, PortMode::Signal]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[]
    }
    fn message(
        &mut self,
        _ctx: &mut MessageContext<'_>,
        inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        self.log.borrow_mut().push((self.tag, inlet, msg));
        Ok(())
    }
}

/// Passes messages through unchanged.
pub struct Relay;

impl ObjectDef for Relay {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn message(
        &mut self,
        ctx: &mut MessageContext<'_>,
        _inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        ctx.send_message(0, msg)
    }
}

/// Counts bangs and emits the count, right outlet first, then a bang left.
pub struct Counter(pub f32);

impl ObjectDef for Counter {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message, PortMode::Message]
    }
    fn message(
        &mut self,
        ctx: &mut MessageContext<'_>,
        _inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        if msg == Message::Bang {
            self.0 += 1.0;
            ctx.send_message(1, Message::Float(self.0))?;
            ctx.send_message(0, Message::Bang)?;
        }
        Ok(())
    }
}

/// Table-like object holding the last list it was sent.
#[derive(Default)]
pub struct Table {
    pub size: usize,
}

impl ObjectDef for Table {
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[]
    }
    fn kind(&self) -> pdgraph::ObjectKind {
        pdgraph::ObjectKind::Table
    }
    fn preinit(&mut self, args: &[Atom], _config: &BlockConfig) -> Result<(), String> {
        self.size = args.first().and_then(Atom::as_float).unwrap_or(0.0) as usize;
        Ok(())
    }
}

/// `[f]`: a bang or float on the left outputs the stored value (a float
/// stores it first), a float on the right only stores.
pub struct FloatStore(pub f32);

impl ObjectDef for FloatStore {
    fn name(&self) -> &str {
        "f"
    }
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message, PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn message(
        &mut self,
        ctx: &mut MessageContext<'_>,
        inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        if let Message::Float(v) = msg {
            self.0 = v;
        }
        if inlet == 0 {
            ctx.send_message(0, Message::Float(self.0))?;
        }
        Ok(())
    }
}

/// `[+ n]`: adds its argument to every float.
pub struct Plus(pub f32);

impl ObjectDef for Plus {
    fn name(&self) -> &str {
        "+"
    }
    fn inlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn outlet_modes(&self) -> &'static [PortMode] {
        &[PortMode::Message]
    }
    fn preinit(&mut self, args: &[Atom], _config: &BlockConfig) -> Result<(), String> {
        if let Some(n) = args.first().and_then(Atom::as_float) {
            self.0 = n;
        }
        Ok(())
    }
    fn message(
        &mut self,
        ctx: &mut MessageContext<'_>,
        _inlet: usize,
        msg: Message,
    ) -> Result<(), PatchError> {
        match to_float(&msg, &CollectedDiagnostics::new()) {
            Some(v) => ctx.send_message(0, Message::Float(v + self.0)),
            None => Ok(()),
        }
    }
}
