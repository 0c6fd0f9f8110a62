use crate::model::SimilarityEdge;
use ahash::AHashMap;

/// Parent-pointer disjoint-set over a dense per-scan index space.
/// Union by size; merge direction affects only efficiency.
#[derive(Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Find with path halving.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.size[root_a] < self.size[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        self.size[root_a] += self.size[root_b];
    }
}

/// A connected component of above-threshold edges: member indices (in
/// ascending document order) and the mean score of the edges that lie
/// inside the final component.
#[derive(Debug)]
pub struct Cluster {
    pub members: Vec<usize>,
    pub mean_score: f64,
}

/// Group documents transitively connected by the given edges. Components
/// with fewer than two members are dropped. The mean is taken over edges
/// whose endpoints both land in the final component — an audit of why the
/// members were grouped, since transitive membership does not imply every
/// pair was compared.
pub fn build_clusters(
    doc_count: usize,
    edges: &[SimilarityEdge],
    path_index: &AHashMap<String, usize>,
) -> Vec<Cluster> {
    let mut sets = DisjointSet::new(doc_count);
    for edge in edges {
        let (Some(&a), Some(&b)) = (path_index.get(&edge.path_a), path_index.get(&edge.path_b))
        else {
            continue;
        };
        sets.union(a, b);
    }

    // root → member indices, components kept in first-seen order
    let mut component_order: Vec<usize> = Vec::new();
    let mut components: AHashMap<usize, Vec<usize>> = AHashMap::new();
    for idx in 0..doc_count {
        let root = sets.find(idx);
        let members = components.entry(root).or_insert_with(|| {
            component_order.push(root);
            Vec::new()
        });
        members.push(idx);
    }

    // score sums per root, from edges inside the final components
    let mut score_sums: AHashMap<usize, (f64, usize)> = AHashMap::new();
    for edge in edges {
        let (Some(&a), Some(&b)) = (path_index.get(&edge.path_a), path_index.get(&edge.path_b))
        else {
            continue;
        };
        let root_a = sets.find(a);
        if root_a == sets.find(b) {
            let entry = score_sums.entry(root_a).or_insert((0.0, 0));
            entry.0 += edge.score;
            entry.1 += 1;
        }
    }

    component_order
        .into_iter()
        .filter_map(|root| {
            let members = components.remove(&root)?;
            if members.len() < 2 {
                return None;
            }
            let mean_score = score_sums
                .get(&root)
                .map(|(sum, count)| sum / *count as f64)
                .unwrap_or(0.0);
            Some(Cluster {
                members,
                mean_score,
            })
        })
        .collect()
}
