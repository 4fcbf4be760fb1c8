//! DSL module: builder API for patches.

use crate::config::BlockConfig;
use crate::message::Atom;
use crate::object::{ObjectDef, ObjectId};
use crate::patch::{Patch, PatchError};
use std::collections::HashMap;
use std::fmt;

/// Handle to an object in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(pub ObjectId);

/// The patch builder.
#[derive(Debug)]
pub struct PatchBuilder {
    patch: Patch,
    names: HashMap<String, ObjectId>,
}

impl PatchBuilder {
    /// Create a new builder.
    pub fn new(config: BlockConfig) -> Self {
        Self {
            patch: Patch::new(config),
            names: HashMap::new(),
        }
    }

    /// Create and register an object.
    pub fn object<D: ObjectDef>(&mut self, def: D, args: &[Atom]) -> Result<ObjectHandle, DslError> {
        let id = self.patch.create(def, args)?;
        Ok(ObjectHandle(id))
    }

    /// Add a named object; a later object with the same name shadows it.
    pub fn object_named<D: ObjectDef>(
        &mut self,
        name: &str,
        def: D,
        args: &[Atom],
    ) -> Result<ObjectHandle, DslError> {
        let handle = self.object(def, args)?;
        self.names.insert(name.to_string(), handle.0);
        Ok(handle)
    }

    /// Look up a named object.
    pub fn get(&self, name: &str) -> Result<ObjectHandle, DslError> {
        self.names
            .get(name)
            .map(|id| ObjectHandle(*id))
            .ok_or_else(|| DslError::MissingNode(name.to_string()))
    }

    /// Connect two ports.
    pub fn connect(
        &mut self,
        from: ObjectHandle,
        outlet: usize,
        to: ObjectHandle,
        inlet: usize,
    ) -> Result<(), DslError> {
        self.patch.connect(from.0, outlet, to.0, inlet)?;
        Ok(())
    }

    /// Connect two named objects.
    pub fn connect_named(
        &mut self,
        from: &str,
        outlet: usize,
        to: &str,
        inlet: usize,
    ) -> Result<(), DslError> {
        let (from, to) = (self.get(from)?, self.get(to)?);
        self.connect(from, outlet, to, inlet)
    }

    /// Build the patch.
    pub fn build(self) -> Patch {
        self.patch
    }
}

impl Default for PatchBuilder {
    fn default() -> Self {
        Self::new(BlockConfig::default())
    }
}

/// DSL-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DslError {
    Patch(PatchError),
    MissingNode(String),
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DslError::Patch(err) => write!(f, "{}", err),
            DslError::MissingNode(name) => write!(f, "no object named `{}`", name),
        }
    }
}

impl std::error::Error for DslError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DslError::Patch(err) => Some(err),
            DslError::MissingNode(_) => None,
        }
    }
}

impl From<PatchError> for DslError {
    fn from(err: PatchError) -> Self {
        DslError::Patch(err)
    }
}
