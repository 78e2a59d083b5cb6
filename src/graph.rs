use crate::util::BitSet;

/// Construction graph over the `[0, ng)` vertex space.
///
/// One undirected edge per key connects the key's two fingerprint vertices
/// and carries the key's target index. [`assign_vertex_values`] walks each
/// component once with an explicit stack, pins the root to zero and solves
/// `g[child] = (edge - g[parent]) mod ng` along every discovered edge; any
/// revisited vertex proves a cycle and aborts the attempt.
///
/// [`assign_vertex_values`]: Graph::assign_vertex_values
pub(crate) struct Graph {
    ng: u32,
    /// Per-vertex adjacency: (neighbor, edge value).
    adj: Vec<Vec<(u32, u32)>>,
}

impl Graph {
    pub fn new(ng: u32) -> Self {
        Self {
            ng,
            adj: vec![Vec::new(); ng as usize],
        }
    }

    /// Undirected edge between `u` and `v` carrying `value`.
    pub fn connect(&mut self, u: u32, v: u32, value: u32) {
        self.adj[u as usize].push((v, value));
        self.adj[v as usize].push((u, value));
    }

    /// Combined acyclicity check and vertex-value assignment.
    ///
    /// Returns the resolution array on success. Returns `None` as soon as a
    /// cycle is found — including self-loops and doubled edges, which show up
    /// as an immediately revisited vertex. Vertices touched by no edge become
    /// roots of empty trees and keep the value zero.
    pub fn assign_vertex_values(&self) -> Option<Vec<u32>> {
        let m = u64::from(self.ng);
        let mut values = vec![0u32; self.ng as usize];
        let mut visited = BitSet::new(self.ng as usize);

        let mut stack: Vec<(Option<u32>, u32)> = Vec::new();
        for root in 0..self.ng {
            if visited.test(root as usize) {
                continue;
            }
            // Root value is pinned to zero; the rest of the tree follows.
            stack.push((None, root));
            while let Some((parent, vertex)) = stack.pop() {
                visited.set(vertex as usize);

                // The edge we arrived through leads back to `parent`; skip it
                // exactly once so a doubled edge still reads as a cycle.
                let mut arrival = parent;
                for &(neighbor, value) in &self.adj[vertex as usize] {
                    if arrival == Some(neighbor) {
                        arrival = None;
                        continue;
                    }
                    if visited.test(neighbor as usize) {
                        return None;
                    }
                    values[neighbor as usize] = ((u64::from(value) + m
                        - u64::from(values[vertex as usize]))
                        % m) as u32;
                    stack.push((Some(vertex), neighbor));
                }
            }
        }
        Some(values)
    }
}
