//! Human-readable summary of how the graph executes.

use core::fmt;

/// Snapshot of the execution layout returned by
/// [`Graph::diagnostics`](crate::Graph::diagnostics).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Live nodes.
    pub node_count: usize,
    /// Live connections.
    pub connection_count: usize,
    /// Node count of each dependency level, level 0 first.
    pub level_sizes: Vec<usize>,
    /// Whether parallel dispatch is enabled.
    pub parallel: bool,
    /// Worker threads currently running (0 when the pool is stopped).
    pub worker_threads: usize,
    /// Set when the topology could not be ordered.
    pub topology_error: Option<String>,
}

impl ExecutionSummary {
    /// Number of dependency levels.
    pub fn level_count(&self) -> usize {
        self.level_sizes.len()
    }

    /// Largest number of nodes in one level.
    pub fn max_level_width(&self) -> usize {
        self.level_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Levels that would be dispatched to the pool (two or more nodes).
    pub fn parallel_levels(&self) -> usize {
        if !self.parallel || self.worker_threads == 0 {
            return 0;
        }
        self.level_sizes.iter().filter(|&&n| n >= 2).count()
    }
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "nodes: {}  connections: {}",
            self.node_count, self.connection_count
        )?;
        if let Some(err) = &self.topology_error {
            return writeln!(f, "topology: {err}");
        }
        writeln!(
            f,
            "levels: {}  widest: {}",
            self.level_count(),
            self.max_level_width()
        )?;
        for (i, n) in self.level_sizes.iter().enumerate() {
            writeln!(f, "  L{i}: {n} node(s)")?;
        }
        let mode = if self.parallel { "parallel" } else { "sequential" };
        write!(
            f,
            "execution: {mode}  workers: {}  parallel levels: {}",
            self.worker_threads,
            self.parallel_levels()
        )
    }
}
