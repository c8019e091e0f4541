//! Least-cost 8-connected routing over a [`CostGrid`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::cost::{CostGrid, step_cost};
use crate::layout::{Orientation, SeamLayout};

const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// Pixel path from start to goal (both included) and its traversal cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamPath {
    pub pixels: Vec<(usize, usize)>,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    cost: f64,
    idx: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    // Reversed so `BinaryHeap` pops the cheapest node; ties pop the lower index.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Dijkstra search from `start` to `goal`. Step cost is the mean of the two
/// cell costs times the step length (1 or sqrt 2).
pub fn route(
    grid: &CostGrid,
    start: (usize, usize),
    goal: (usize, usize),
) -> Result<SeamPath, om_core::Error> {
    let (w, h) = (grid.width(), grid.height());
    if start.0 >= w || start.1 >= h || goal.0 >= w || goal.1 >= h {
        return Err(om_core::Error::OutOfBounds);
    }

    let cells = grid.data();
    let n = w * h;
    let start_idx = start.1 * w + start.0;
    let goal_idx = goal.1 * w + goal.0;

    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![usize::MAX; n];
    let mut heap = BinaryHeap::new();
    dist[start_idx] = 0.0;
    heap.push(Node {
        cost: 0.0,
        idx: start_idx,
    });

    while let Some(Node { cost, idx }) = heap.pop() {
        if idx == goal_idx {
            break;
        }
        if cost > dist[idx] {
            continue;
        }

        let x = (idx % w) as isize;
        let y = (idx / w) as isize;
        for dir in 0..8 {
            let nx = x + DX[dir];
            let ny = y + DY[dir];
            if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            let next = cost + step_cost(cells[idx], cells[nidx], dir % 2 == 1);
            if next < dist[nidx] {
                dist[nidx] = next;
                prev[nidx] = idx;
                heap.push(Node {
                    cost: next,
                    idx: nidx,
                });
            }
        }
    }

    let mut pixels = vec![goal];
    let mut cur = goal_idx;
    while cur != start_idx {
        cur = prev[cur];
        if cur == usize::MAX {
            return Err(om_core::Error::OutOfBounds);
        }
        pixels.push((cur % w, cur / w));
    }
    pixels.reverse();

    Ok(SeamPath {
        pixels,
        cost: dist[goal_idx],
    })
}

/// Routing phase for one orientation: writes its candidate lines as barriers,
/// then routes every padded seam on the updated grid.
///
/// Phases must run in [`Orientation::ALL`] order on one grid, so horizontal
/// seams see the vertical barriers.
pub fn route_phase(
    grid: &mut CostGrid,
    layout: &SeamLayout,
    orientation: Orientation,
) -> Result<Vec<SeamPath>, om_core::Error> {
    let (w, h) = (layout.width(), layout.height());
    for line in layout.lines(orientation) {
        let [a, b] = line.endpoints(w, h);
        grid.write_barrier(a, b);
    }

    let pairs = layout.route_endpoints(orientation);
    log::debug!("routing {} {orientation} seams on {w}x{h} grid", pairs.len());
    pairs.iter().map(|&[a, b]| route(grid, a, b)).collect()
}
