//! Plan module: producer-before-consumer tick order for a patch.
//!
//! Only objects whose signal eventually reaches an endpoint are planned;
//! anything else would compute blocks nobody listens to.

use crate::invariant_ppt::{assert_invariant, PLAN_PRODUCER_FIRST, PLAN_ROOTED_AT_ENDPOINTS};
use crate::object::ObjectId;
use crate::patch::Patch;
use crate::portlet::{Inlet, PortMode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The compiled plan: tick order and the endpoints it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub order: Vec<ObjectId>,
    pub endpoints: Vec<ObjectId>,
    pub block_size: usize,
}

/// Errors during plan compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Signal connections form a loop among these objects.
    CycleDetected(Vec<ObjectId>),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::CycleDetected(ids) => write!(f, "signal cycle through {:?}", ids),
        }
    }
}

impl std::error::Error for PlanError {}

impl Plan {
    /// Create a plan from a patch.
    pub fn compile(patch: &Patch) -> Result<Self, PlanError> {
        let endpoints: Vec<ObjectId> = patch
            .objects()
            .filter(|o| o.is_endpoint())
            .filter_map(|o| o.id())
            .collect();

        // Producers feeding each object through signal inlets.
        let producers_of = |id: ObjectId| -> BTreeSet<ObjectId> {
            patch
                .object(id)
                .map(|object| {
                    object
                        .inlets()
                        .iter()
                        .filter_map(|inlet| match inlet {
                            Inlet::Signal(_) => Some(inlet.sources()),
                            Inlet::Message(_) => None,
                        })
                        .flatten()
                        .filter(|s| s.mode == PortMode::Signal)
                        .map(|s| s.object)
                        .collect()
                })
                .unwrap_or_default()
        };

        // Walk upstream from the endpoints.
        let mut deps: BTreeMap<ObjectId, BTreeSet<ObjectId>> = BTreeMap::new();
        let mut stack = endpoints.clone();
        while let Some(id) = stack.pop() {
            if deps.contains_key(&id) {
                continue;
            }
            let producers = producers_of(id);
            stack.extend(producers.iter().copied());
            deps.insert(id, producers);
        }

        let order = topo_sort(&deps)?;

        let position: BTreeMap<ObjectId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        assert_invariant(
            PLAN_PRODUCER_FIRST,
            deps.iter().all(|(consumer, producers)| {
                producers
                    .iter()
                    .all(|p| position.get(p) < position.get(consumer))
            }),
            "Every producer ticks before its consumers",
            Some("Plan::compile"),
        );
        assert_invariant(
            PLAN_ROOTED_AT_ENDPOINTS,
            endpoints.iter().all(|e| position.contains_key(e)),
            "Every endpoint is planned",
            Some("Plan::compile"),
        );

        Ok(Self {
            order,
            endpoints,
            block_size: patch.config().block_size(),
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Kahn's algorithm; the lowest ready id goes first so plans are stable.
fn topo_sort(deps: &BTreeMap<ObjectId, BTreeSet<ObjectId>>) -> Result<Vec<ObjectId>, PlanError> {
    let mut in_degree: BTreeMap<ObjectId, usize> =
        deps.iter().map(|(id, producers)| (*id, producers.len())).collect();
    let mut consumers: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();
    for (consumer, producers) in deps {
        for producer in producers {
            consumers.entry(*producer).or_default().push(*consumer);
        }
    }

    let mut ready: BTreeSet<ObjectId> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(deps.len());
    while let Some(id) = ready.pop_first() {
        order.push(id);
        for consumer in consumers.get(&id).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(consumer) {
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(*consumer);
                }
            }
        }
    }

    if order.len() == deps.len() {
        Ok(order)
    } else {
        let stuck = in_degree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(id, _)| id)
            .collect();
        Err(PlanError::CycleDetected(stuck))
    }
}
