//! RT module: block driver ticking a planned patch.

// IMPORTANT: Do not call assert_invariant or any PPT logging in RT paths to avoid locks/allocs.

use crate::patch::{Patch, PatchError};
use crate::plan::{Plan, PlanError};

/// The runtime engine.
#[derive(Debug)]
pub struct Runtime {
    patch: Patch,
    plan: Plan,
    blocks: u64,
}

impl Runtime {
    /// Create a new runtime from a patch and a plan compiled from it.
    pub fn new(patch: Patch, plan: Plan) -> Self {
        Self {
            patch,
            plan,
            blocks: 0,
        }
    }

    /// Compile a plan for `patch` and wrap both.
    pub fn compile(patch: Patch) -> Result<Self, PlanError> {
        let plan = Plan::compile(&patch)?;
        Ok(Self::new(patch, plan))
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Mutable access for message injection or rewiring between blocks.
    /// Call [`Runtime::replan`] after adding connections.
    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Recompile the plan after the patch changed.
    pub fn replan(&mut self) -> Result<(), PlanError> {
        self.plan = Plan::compile(&self.patch)?;
        Ok(())
    }

    /// Number of blocks completed.
    pub fn blocks_processed(&self) -> u64 {
        self.blocks
    }

    /// Tick every planned object once, producers first.
    pub fn process_block(&mut self) -> Result<(), PatchError> {
        for &id in &self.plan.order {
            self.patch.tick(id)?;
        }
        self.blocks += 1;
        Ok(())
    }

    /// Run `blocks` consecutive blocks, stopping at the first failure.
    pub fn run_blocks(&mut self, blocks: usize) -> Result<(), PatchError> {
        for _ in 0..blocks {
            self.process_block()?;
        }
        Ok(())
    }

    fn silence_all(&mut self) {
        for &id in &self.plan.order {
            if let Err(err) = self.patch.silence(id) {
                log::debug!("cannot silence {:?}: {}", id, err);
            }
        }
    }
}

/// Run process_block with panic containment.
///
/// On a failed or panicking block every planned signal outlet is zeroed, so
/// downstream consumers read silence instead of a half-written block.
/// Returns whether the block completed.
pub fn process_block_safe(runtime: &mut Runtime) -> bool {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runtime.process_block()));
    match result {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!("block {} failed: {}", runtime.blocks_processed(), err);
            runtime.silence_all();
            false
        }
        Err(_) => {
            log::error!("block {} panicked", runtime.blocks_processed());
            runtime.silence_all();
            false
        }
    }
}
