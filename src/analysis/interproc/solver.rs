//! Worklist fixpoint solver over the ICFG.
//!
//! # Algorithm
//!
//! 1. The entry node's in/out facts start at the boundary fact, every other node's at the
//!    initial fact
//! 2. Every node is queued once; a queued node is never queued twice
//! 3. While the worklist is non-empty:
//!    a. Remove a node `n`
//!    b. `in(n)` = meet over every incoming edge `p -> n` of `transfer_edge(out(p))`
//!    c. Recompute `out(n)` from `in(n)` in place
//!    d. If `out(n)` changed, queue every successor of `n`, across any edge kind
//!
//! With monotone transfer functions over a finite-height lattice the loop terminates at
//! the same fixpoint whatever the worklist order; [`WorklistOrder`] only changes how many
//! visits that takes.

use std::collections::VecDeque;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use strum::{Display, EnumIter, EnumString};

use crate::{
    analysis::{
        dataflow::Direction,
        icfg::{Icfg, IcfgNode},
        interproc::{framework::InterproceduralAnalysis, result::DataflowResult},
    },
    utils::graph::{algorithms::reverse_postorder, NodeId},
    Error, Result,
};

/// Order in which the worklist is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum WorklistOrder {
    /// Queue, seeded in node order
    #[default]
    Fifo,
    /// Stack, seeded in node order
    Lifo,
    /// Queue, seeded in reverse postorder from the entry node
    ReversePostorder,
}

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverConfig {
    /// Worklist discipline
    pub order: WorklistOrder,
    /// Maximum number of node visits; `None` runs to the fixpoint
    pub max_iterations: Option<usize>,
    /// Shuffles the initial worklist with this seed instead of using the order's seeding.
    /// The drain discipline of `order` still applies.
    pub shuffle_seed: Option<u64>,
}

impl SolverConfig {
    /// Configuration with the given order and no iteration bound.
    #[must_use]
    pub fn with_order(order: WorklistOrder) -> Self {
        SolverConfig {
            order,
            max_iterations: None,
            shuffle_seed: None,
        }
    }

    /// Configuration with the given order, its initial worklist permuted by `seed`.
    #[must_use]
    pub fn shuffled(order: WorklistOrder, seed: u64) -> Self {
        SolverConfig {
            shuffle_seed: Some(seed),
            ..SolverConfig::with_order(order)
        }
    }
}

struct Worklist {
    lifo: bool,
    items: VecDeque<NodeId>,
    queued: Vec<bool>,
}

impl Worklist {
    fn new(node_count: usize, lifo: bool) -> Self {
        Worklist {
            lifo,
            items: VecDeque::with_capacity(node_count),
            queued: vec![false; node_count],
        }
    }

    fn push(&mut self, node: NodeId) {
        if !self.queued[node.index()] {
            self.queued[node.index()] = true;
            self.items.push_back(node);
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        let node = if self.lifo {
            self.items.pop_back()
        } else {
            self.items.pop_front()
        }?;
        self.queued[node.index()] = false;
        Some(node)
    }
}

/// Sequential worklist solver for [`InterproceduralAnalysis`] implementations.
///
/// The solver owns a single fact table for the whole ICFG and must not run concurrently
/// with anything that mutates the ICFG.
///
/// # Example
///
/// ```rust,ignore
/// let analysis = InterConstantPropagation::new(&program);
/// let result = InterproceduralSolver::default().solve(&analysis, &icfg)?;
/// let fact = result.fact_before(IcfgNode::stmt(main, ret)).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct InterproceduralSolver {
    config: SolverConfig,
}

impl InterproceduralSolver {
    /// Creates a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        InterproceduralSolver { config }
    }

    /// The solver's configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Initial worklist contents; may repeat nodes, the worklist drops duplicates.
    fn seeding(&self, icfg: &Icfg) -> Vec<NodeId> {
        let mut seeds = Vec::with_capacity(icfg.node_count());
        if let (WorklistOrder::ReversePostorder, Some(entry)) = (self.config.order, icfg.entry()) {
            seeds.extend(reverse_postorder(icfg, entry));
        }
        seeds.extend(icfg.nodes().map(|(node, _)| node));

        if let Some(seed) = self.config.shuffle_seed {
            seeds.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        seeds
    }

    /// Runs `analysis` over `icfg` to its fixpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedDirection`] if the analysis is backward
    /// - [`Error::IterationLimit`] if the configured bound is exceeded; no result is
    ///   returned since the facts are not sound before the fixpoint
    ///
    /// # Panics
    ///
    /// Panics if an ICFG edge refers to a node outside the graph.
    pub fn solve<A: InterproceduralAnalysis>(
        &self,
        analysis: &A,
        icfg: &Icfg,
    ) -> Result<DataflowResult<A::Fact>> {
        if A::DIRECTION != Direction::Forward {
            return Err(Error::UnsupportedDirection(A::DIRECTION));
        }

        let node_count = icfg.node_count();
        let initial = analysis.new_initial_fact();
        let mut in_facts = vec![initial.clone(); node_count];
        let mut out_facts = vec![initial.clone(); node_count];

        let boundary = icfg.entry().map(|entry| {
            let fact = analysis.new_boundary_fact(node_at(icfg, entry));
            in_facts[entry.index()] = fact.clone();
            out_facts[entry.index()] = fact.clone();
            (entry, fact)
        });

        let mut worklist = Worklist::new(node_count, self.config.order == WorklistOrder::Lifo);
        for node in self.seeding(icfg) {
            worklist.push(node);
        }

        let mut iterations = 0usize;
        while let Some(node) = worklist.pop() {
            iterations += 1;
            if let Some(limit) = self.config.max_iterations {
                if iterations > limit {
                    tracing::warn!(limit, "interprocedural solver hit its iteration limit");
                    return Err(Error::IterationLimit(limit));
                }
            }

            let target = node_at(icfg, node);
            let mut input = match &boundary {
                Some((entry, fact)) if *entry == node => fact.clone(),
                _ => initial.clone(),
            };
            for (pred, edge) in icfg.incoming_edges(node) {
                let fact =
                    analysis.transfer_edge(node_at(icfg, pred), target, edge, &out_facts[pred.index()]);
                analysis.meet_into(&fact, &mut input);
            }
            in_facts[node.index()] = input;

            if analysis.transfer_node(
                icfg,
                node,
                &in_facts[node.index()],
                &mut out_facts[node.index()],
            ) {
                for succ in icfg.successors(node) {
                    worklist.push(succ);
                }
            }
        }

        tracing::debug!(
            nodes = node_count,
            iterations,
            order = %self.config.order,
            "interprocedural fixpoint reached"
        );
        Ok(DataflowResult::new(icfg, in_facts, out_facts, iterations))
    }
}

fn node_at(icfg: &Icfg, node: NodeId) -> IcfgNode {
    match icfg.node(node) {
        Some(&n) => n,
        None => panic!("{node} is not an ICFG node"),
    }
}
