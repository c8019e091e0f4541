//! Planar polygonization of seam linework.
//!
//! Steps:
//! 1. Node all segments: split every segment at its intersections with the
//!    others (an R-tree limits the candidate pairs), snapping coincident
//!    points to one vertex.
//! 2. Drop duplicate edges, dangles and bridges; what remains borders two
//!    distinct faces on each side.
//! 3. Walk faces by always taking the next outgoing edge clockwise from the
//!    arriving one. Counter-clockwise rings are bounded faces; the clockwise
//!    ones are outer boundaries and are discarded.
//!
//! Faces are returned without holes. A disconnected piece of linework inside
//! a face yields its own faces but is not cut out of the enclosing one.

use std::collections::BTreeSet;

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Coord, Line, LineString, Polygon};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

#[derive(Debug, Clone, Copy)]
struct IndexedSegment {
    line: Line<f64>,
    index: usize,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (a, b) = (self.line.start, self.line.end);
        AABB::from_corners([a.x.min(b.x), a.y.min(b.y)], [a.x.max(b.x), a.y.max(b.y)])
    }
}

/// Coordinates merged within a snapping radius.
struct VertexIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
    coords: Vec<Coord<f64>>,
    tol2: f64,
}

impl VertexIndex {
    fn new(tolerance: f64) -> Self {
        Self {
            tree: RTree::new(),
            coords: Vec::new(),
            tol2: tolerance * tolerance,
        }
    }

    fn id(&mut self, c: Coord<f64>) -> usize {
        if let Some(hit) = self.tree.locate_within_distance([c.x, c.y], self.tol2).next() {
            return hit.data;
        }
        let id = self.coords.len();
        self.coords.push(c);
        self.tree.insert(GeomWithData::new([c.x, c.y], id));
        id
    }
}

/// Bounded faces of the arrangement formed by `lines`.
pub fn polygonize(lines: &[LineString<f64>]) -> Vec<Polygon<f64>> {
    let segments: Vec<Line<f64>> = lines
        .iter()
        .flat_map(|ls| ls.lines())
        .filter(|l| l.start != l.end)
        .collect();
    if segments.is_empty() {
        return Vec::new();
    }

    let extent = segments.iter().fold(0.0f64, |m, l| {
        m.max(l.start.x.abs())
            .max(l.start.y.abs())
            .max(l.end.x.abs())
            .max(l.end.y.abs())
    });
    let tolerance = 1e-9 * extent.max(1.0);

    let (coords, edges) = node_segments(&segments, tolerance);
    let mut active = vec![true; edges.len()];
    prune_dangles(coords.len(), &edges, &mut active);
    for (e, bridge) in find_bridges(coords.len(), &edges, &active)
        .into_iter()
        .enumerate()
    {
        if bridge {
            active[e] = false;
        }
    }
    prune_dangles(coords.len(), &edges, &mut active);

    let faces = walk_faces(&coords, &edges, &active, tolerance * tolerance);
    log::debug!(
        "polygonized {} segments into {} vertices, {} edges, {} faces",
        segments.len(),
        coords.len(),
        active.iter().filter(|&&a| a).count(),
        faces.len()
    );
    faces
}

/// Splits segments at mutual intersections. Returns vertex coordinates and
/// unique undirected edges `(a, b)` with `a < b`.
fn node_segments(
    segments: &[Line<f64>],
    tolerance: f64,
) -> (Vec<Coord<f64>>, Vec<(usize, usize)>) {
    let tree = RTree::bulk_load(
        segments
            .iter()
            .enumerate()
            .map(|(index, &line)| IndexedSegment { line, index })
            .collect(),
    );

    let mut splits: Vec<Vec<Coord<f64>>> = vec![Vec::new(); segments.len()];
    for (i, &seg) in segments.iter().enumerate() {
        let query = IndexedSegment {
            line: seg,
            index: i,
        }
        .envelope();
        for other in tree.locate_in_envelope_intersecting(&query) {
            let j = other.index;
            if j <= i {
                continue;
            }
            match line_intersection(seg, other.line) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    splits[i].push(intersection);
                    splits[j].push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    for p in [intersection.start, intersection.end] {
                        splits[i].push(p);
                        splits[j].push(p);
                    }
                }
                None => {}
            }
        }
    }

    let mut vertices = VertexIndex::new(tolerance);
    let mut edges = BTreeSet::new();
    for (seg, mut points) in segments.iter().zip(splits) {
        let d = seg.delta();
        let len2 = d.x * d.x + d.y * d.y;
        let t = |p: &Coord<f64>| ((p.x - seg.start.x) * d.x + (p.y - seg.start.y) * d.y) / len2;
        points.push(seg.start);
        points.push(seg.end);
        points.sort_by(|a, b| t(a).total_cmp(&t(b)));

        let ids: Vec<usize> = points.into_iter().map(|p| vertices.id(p)).collect();
        for w in ids.windows(2) {
            let (a, b) = (w[0].min(w[1]), w[0].max(w[1]));
            if a != b {
                edges.insert((a, b));
            }
        }
    }

    (vertices.coords, edges.into_iter().collect())
}

fn incidence(n: usize, edges: &[(usize, usize)], active: &[bool]) -> Vec<Vec<(usize, usize)>> {
    let mut adj = vec![Vec::new(); n];
    for (e, &(a, b)) in edges.iter().enumerate() {
        if active[e] {
            adj[a].push((b, e));
            adj[b].push((a, e));
        }
    }
    adj
}

/// Repeatedly removes edges ending in a degree-1 vertex.
fn prune_dangles(n: usize, edges: &[(usize, usize)], active: &mut [bool]) {
    let adj = incidence(n, edges, active);
    let mut degree: Vec<usize> = adj.iter().map(Vec::len).collect();
    let mut stack: Vec<usize> = (0..n).filter(|&v| degree[v] == 1).collect();

    while let Some(v) = stack.pop() {
        if degree[v] != 1 {
            continue;
        }
        let Some(&(w, e)) = adj[v].iter().find(|&&(_, e)| active[e]) else {
            continue;
        };
        active[e] = false;
        degree[v] -= 1;
        degree[w] -= 1;
        if degree[w] == 1 {
            stack.push(w);
        }
    }
}

/// Marks edges whose removal disconnects the graph (iterative Tarjan).
fn find_bridges(n: usize, edges: &[(usize, usize)], active: &[bool]) -> Vec<bool> {
    let adj = incidence(n, edges, active);
    let mut bridge = vec![false; edges.len()];
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut timer = 0usize;

    for root in 0..n {
        if disc[root] != usize::MAX || adj[root].is_empty() {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        // (vertex, edge used to enter it, next adjacency slot)
        let mut stack = vec![(root, usize::MAX, 0usize)];

        while let Some(top) = stack.last_mut() {
            let (v, parent_edge, slot) = *top;
            if slot < adj[v].len() {
                top.2 += 1;
                let (w, e) = adj[v][slot];
                if e == parent_edge {
                    continue;
                }
                if disc[w] == usize::MAX {
                    disc[w] = timer;
                    low[w] = timer;
                    timer += 1;
                    stack.push((w, e, 0));
                } else {
                    low[v] = low[v].min(disc[w]);
                }
            } else {
                stack.pop();
                if let Some(&(p, _, _)) = stack.last() {
                    low[p] = low[p].min(low[v]);
                    if low[v] > disc[p] {
                        bridge[parent_edge] = true;
                    }
                }
            }
        }
    }
    bridge
}

fn walk_faces(
    coords: &[Coord<f64>],
    edges: &[(usize, usize)],
    active: &[bool],
    min_area: f64,
) -> Vec<Polygon<f64>> {
    // Half-edge 2e runs a -> b, 2e + 1 runs b -> a.
    let origin = |h: usize| {
        let (a, b) = edges[h / 2];
        if h % 2 == 0 { a } else { b }
    };
    let dest = |h: usize| origin(h ^ 1);

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); coords.len()];
    for (e, _) in edges.iter().enumerate().filter(|&(e, _)| active[e]) {
        outgoing[origin(2 * e)].push(2 * e);
        outgoing[origin(2 * e + 1)].push(2 * e + 1);
    }

    let mut slot = vec![usize::MAX; edges.len() * 2];
    for out in &mut outgoing {
        out.sort_by(|&h1, &h2| {
            let angle = |h: usize| {
                let (o, d) = (coords[origin(h)], coords[dest(h)]);
                (d.y - o.y).atan2(d.x - o.x)
            };
            angle(h1).total_cmp(&angle(h2))
        });
        for (i, &h) in out.iter().enumerate() {
            slot[h] = i;
        }
    }

    let next = |h: usize| {
        let twin = h ^ 1;
        let out = &outgoing[origin(twin)];
        out[(slot[twin] + out.len() - 1) % out.len()]
    };

    let mut visited = vec![false; edges.len() * 2];
    let mut faces = Vec::new();
    for start in 0..edges.len() * 2 {
        if visited[start] || !active[start / 2] {
            continue;
        }
        let mut ring = Vec::new();
        let mut h = start;
        loop {
            visited[h] = true;
            ring.push(coords[origin(h)]);
            h = next(h);
            if h == start || visited[h] {
                break;
            }
        }
        if ring.len() < 3 {
            continue;
        }

        let polygon = Polygon::new(LineString::from(ring), Vec::new());
        if polygon.signed_area() > min_area {
            faces.push(polygon);
        }
    }
    faces
}

#[cfg(test)]
mod tests {
    use geo::{Area, LineString, line_string};

    use super::polygonize;

    fn total_area(lines: &[LineString<f64>]) -> (usize, f64) {
        let faces = polygonize(lines);
        (faces.len(), faces.iter().map(|p| p.unsigned_area()).sum())
    }

    #[test]
    fn crossing_grid_yields_enclosed_cells_only() {
        let lines = vec![
            line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 3.0)],
            line_string![(x: 2.0, y: 0.0), (x: 2.0, y: 3.0)],
            line_string![(x: 0.0, y: 1.0), (x: 3.0, y: 1.0)],
            line_string![(x: 0.0, y: 2.0), (x: 3.0, y: 2.0)],
        ];
        let (count, area) = total_area(&lines);
        assert_eq!(count, 1);
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn dangles_and_bridges_do_not_form_faces() {
        let lines = vec![
            line_string![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)
            ],
            line_string![
                (x: 3.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 2.0),
                (x: 3.0, y: 2.0), (x: 3.0, y: 0.0)
            ],
            // Bridge between the squares, and a dangling tail.
            line_string![(x: 1.0, y: 0.5), (x: 3.0, y: 0.5)],
            line_string![(x: 5.0, y: 1.0), (x: 7.0, y: 1.0), (x: 8.0, y: 3.0)],
        ];
        let faces = polygonize(&lines);
        assert_eq!(faces.len(), 2);
        let mut areas: Vec<f64> = faces.iter().map(|p| p.unsigned_area()).collect();
        areas.sort_by(f64::total_cmp);
        assert!((areas[0] - 1.0).abs() < 1e-12);
        assert!((areas[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn overlapping_collinear_linework_is_merged() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0)],
            line_string![(x: 2.0, y: 0.0), (x: 6.0, y: 0.0)],
            line_string![(x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)],
        ];
        let (count, area) = total_area(&lines);
        assert_eq!(count, 1);
        assert!((area - 16.0).abs() < 1e-12);
    }

    #[test]
    fn adjacent_cells_are_separate_faces() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)],
            line_string![(x: 0.0, y: 1.0), (x: 2.0, y: 1.0)],
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0)],
            line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
            line_string![(x: 2.0, y: 0.0), (x: 2.0, y: 1.0)],
        ];
        let (count, area) = total_area(&lines);
        assert_eq!(count, 2);
        assert!((area - 2.0).abs() < 1e-12);
    }

    #[test]
    fn open_linework_has_no_faces() {
        let lines = vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)]];
        assert!(polygonize(&lines).is_empty());
        assert!(polygonize(&[]).is_empty());
    }
}
