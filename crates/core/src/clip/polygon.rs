//! Fixed-point polygon intersection.
//!
//! Both operands are sets of closed integer rings. The plane is cut into
//! horizontal slabs at every vertex and edge-crossing y; inside a slab no
//! two edges cross, so ordering the spanning edges by x and accumulating
//! winding numbers classifies every gap. Gaps inside both operands become
//! trapezoids, and the trapezoids are stitched back into contours by
//! cancelling shared horizontal boundaries and linking the remaining edges
//! into loops.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::model::path::FillingRule;

/// A point on the fixed-point grid.
pub type IPoint = (i64, i64);

/// A closed ring; the last point connects back to the first.
pub type Ring = Vec<IPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Subject,
    Clip,
}

/// A non-horizontal edge, stored bottom to top.
#[derive(Debug, Clone, Copy)]
struct Edge {
    lo: IPoint,
    hi: IPoint,
    /// +1 if the ring runs upward along this edge
    dir: i32,
    operand: Operand,
}

impl Edge {
    fn x_at(&self, y: f64) -> f64 {
        if y <= self.lo.1 as f64 {
            return self.lo.0 as f64;
        }
        if y >= self.hi.1 as f64 {
            return self.hi.0 as f64;
        }
        let (x0, y0) = (self.lo.0 as f64, self.lo.1 as f64);
        let (x1, y1) = (self.hi.0 as f64, self.hi.1 as f64);
        x0 + (y - y0) * (x1 - x0) / (y1 - y0)
    }

    fn x_at_level(&self, y: i64) -> i64 {
        if y == self.lo.1 {
            self.lo.0
        } else if y == self.hi.1 {
            self.hi.0
        } else {
            self.x_at(y as f64).round() as i64
        }
    }
}

fn collect_edges(rings: &[Ring], operand: Operand, edges: &mut Vec<Edge>) {
    for ring in rings {
        let n = ring.len();
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            if a.1 == b.1 {
                continue;
            }
            let (lo, hi, dir) = if a.1 < b.1 { (a, b, 1) } else { (b, a, -1) };
            edges.push(Edge {
                lo,
                hi,
                dir,
                operand,
            });
        }
    }
}

/// y of the proper crossing of two edges, if they cross strictly inside
/// both y ranges.
fn crossing_y(e: &Edge, f: &Edge) -> Option<i64> {
    let ylo = e.lo.1.max(f.lo.1);
    let yhi = e.hi.1.min(f.hi.1);
    if ylo >= yhi {
        return None;
    }
    let d1 = ((e.hi.0 - e.lo.0) as i128, (e.hi.1 - e.lo.1) as i128);
    let d2 = ((f.hi.0 - f.lo.0) as i128, (f.hi.1 - f.lo.1) as i128);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom == 0 {
        return None;
    }
    let q = ((f.lo.0 - e.lo.0) as i128, (f.lo.1 - e.lo.1) as i128);
    let num = q.0 * d2.1 - q.1 * d2.0;
    // y = e.lo.y + (num / denom) * d1.y
    let y = e.lo.1 as f64 + (num as f64 / denom as f64) * d1.1 as f64;
    let y = y.round() as i64;
    (y > ylo && y < yhi).then_some(y)
}

/// A trapezoid between two levels, x given at bottom and top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Trapezoid {
    y0: i64,
    y1: i64,
    left: (i64, i64),
    right: (i64, i64),
}

/// Decompose the intersection into slab trapezoids.
fn trapezoids(subject: &[Ring], subject_rule: FillingRule, clip: &[Ring], clip_rule: FillingRule) -> Vec<Trapezoid> {
    let mut edges = Vec::new();
    collect_edges(subject, Operand::Subject, &mut edges);
    collect_edges(clip, Operand::Clip, &mut edges);
    if edges.is_empty() {
        return Vec::new();
    }

    let mut levels: Vec<i64> = edges.iter().flat_map(|e| [e.lo.1, e.hi.1]).collect();
    for (i, e) in edges.iter().enumerate() {
        for f in &edges[i + 1..] {
            if let Some(y) = crossing_y(e, f) {
                levels.push(y);
            }
        }
    }
    levels.sort_unstable();
    levels.dedup();

    edges.sort_by_key(|e| e.lo.1);
    let mut next = 0;
    let mut active: Vec<Edge> = Vec::new();
    let mut out = Vec::new();

    for w in levels.windows(2) {
        let (y0, y1) = (w[0], w[1]);
        active.retain(|e| e.hi.1 > y0);
        while next < edges.len() && edges[next].lo.1 <= y0 {
            if edges[next].hi.1 > y0 {
                active.push(edges[next]);
            }
            next += 1;
        }
        if active.is_empty() {
            continue;
        }

        let ym = (y0 as f64 + y1 as f64) / 2.0;
        let mut order: SmallVec<[(f64, usize); 16]> =
            active.iter().enumerate().map(|(i, e)| (e.x_at(ym), i)).collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mut ws, mut wc) = (0i32, 0i32);
        let mut run_start: Option<usize> = None;
        let mut runs: SmallVec<[(usize, usize); 4]> = SmallVec::new();
        for (k, &(_, idx)) in order.iter().enumerate() {
            let e = &active[idx];
            match e.operand {
                Operand::Subject => ws += e.dir,
                Operand::Clip => wc += e.dir,
            }
            let inside = subject_rule.contains(ws) && clip_rule.contains(wc);
            match (inside, run_start) {
                (true, None) => run_start = Some(k),
                (false, Some(s)) => {
                    runs.push((order[s].1, idx));
                    run_start = None;
                }
                _ => {}
            }
        }

        let mut prev: Option<Trapezoid> = None;
        for (l, r) in runs {
            let (le, re) = (&active[l], &active[r]);
            let t = Trapezoid {
                y0,
                y1,
                left: (le.x_at_level(y0), le.x_at_level(y1)),
                right: (re.x_at_level(y0), re.x_at_level(y1)),
            };
            if t.left == t.right {
                continue;
            }
            match &mut prev {
                // Runs separated by a zero-width gap form one region.
                Some(p) if p.right == t.left => p.right = t.right,
                Some(p) => {
                    out.push(*p);
                    prev = Some(t);
                }
                None => prev = Some(t),
            }
        }
        out.extend(prev);
    }
    out
}

/// Parts of sorted disjoint intervals `a` not covered by sorted disjoint
/// intervals `b`.
fn interval_difference(a: &[(i64, i64)], b: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    let mut j = 0;
    for &(mut lo, hi) in a {
        while j < b.len() && b[j].1 <= lo {
            j += 1;
        }
        let mut k = j;
        while k < b.len() && b[k].0 < hi {
            if b[k].0 > lo {
                out.push((lo, b[k].0));
            }
            lo = lo.max(b[k].1);
            k += 1;
        }
        if lo < hi {
            out.push((lo, hi));
        }
    }
    out
}

/// Directed boundary edges of the trapezoid union.
fn boundary_edges(traps: &[Trapezoid]) -> Vec<(IPoint, IPoint)> {
    let mut edges = Vec::new();
    // (bottoms of slabs starting here, tops of slabs ending here)
    let mut levels: FxHashMap<i64, (Vec<(i64, i64)>, Vec<(i64, i64)>)> = FxHashMap::default();

    for t in traps {
        // Sides: right side up, left side down.
        edges.push(((t.right.0, t.y0), (t.right.1, t.y1)));
        edges.push(((t.left.1, t.y1), (t.left.0, t.y0)));
        levels.entry(t.y0).or_default().0.push((t.left.0, t.right.0));
        levels.entry(t.y1).or_default().1.push((t.left.1, t.right.1));
    }

    let mut ys: Vec<i64> = levels.keys().copied().collect();
    ys.sort_unstable();
    for y in ys {
        let Some((mut above, mut below)) = levels.remove(&y) else {
            continue;
        };
        above.retain(|i| i.0 < i.1);
        below.retain(|i| i.0 < i.1);
        above.sort_unstable();
        below.sort_unstable();
        for (a, b) in interval_difference(&above, &below) {
            edges.push(((a, y), (b, y)));
        }
        for (a, b) in interval_difference(&below, &above) {
            edges.push(((b, y), (a, y)));
        }
    }
    edges.retain(|(a, b)| a != b);
    edges
}

fn cross(o: IPoint, a: IPoint, b: IPoint) -> i128 {
    (a.0 - o.0) as i128 * (b.1 - o.1) as i128 - (a.1 - o.1) as i128 * (b.0 - o.0) as i128
}

/// Drop repeated and collinear points from a closed ring.
pub fn simplify_ring(ring: &mut Ring) {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    let mut changed = true;
    while changed && ring.len() >= 3 {
        changed = false;
        let n = ring.len();
        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            if cross(prev, ring[i], next) == 0 {
                ring.remove(i);
                changed = true;
                break;
            }
        }
    }
}

/// Link directed edges into closed loops.
fn link_loops(edges: Vec<(IPoint, IPoint)>) -> Vec<Ring> {
    let mut outgoing: FxHashMap<IPoint, SmallVec<[usize; 2]>> = FxHashMap::default();
    for (i, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(i);
    }
    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let start = edges[first].0;
        let mut ring = vec![start];
        let mut at = edges[first].1;
        while at != start {
            ring.push(at);
            let next = outgoing
                .get_mut(&at)
                .and_then(|cands| {
                    let pos = cands.iter().position(|&c| !used[c])?;
                    Some(cands.swap_remove(pos))
                });
            match next {
                Some(e) => {
                    used[e] = true;
                    at = edges[e].1;
                }
                None => {
                    tracing::debug!(?at, "open boundary chain while linking clip contours");
                    break;
                }
            }
        }
        simplify_ring(&mut ring);
        if ring.len() >= 3 {
            loops.push(ring);
        }
    }
    loops
}

/// Intersect two ring sets under their filling rules.
///
/// The result contours are counter-clockwise for outer boundaries and
/// clockwise for holes, so they fill correctly under either rule.
pub fn intersect(subject: &[Ring], subject_rule: FillingRule, clip: &[Ring], clip_rule: FillingRule) -> Vec<Ring> {
    let traps = trapezoids(subject, subject_rule, clip, clip_rule);
    if traps.is_empty() {
        return Vec::new();
    }
    link_loops(boundary_edges(&traps))
}

/// Winding number of `rings` around `p`.
pub fn winding_number(rings: &[Ring], p: (f64, f64)) -> i32 {
    let mut w = 0;
    for ring in rings {
        let n = ring.len();
        for i in 0..n {
            let a = (ring[i].0 as f64, ring[i].1 as f64);
            let b = (ring[(i + 1) % n].0 as f64, ring[(i + 1) % n].1 as f64);
            let side = (b.0 - a.0) * (p.1 - a.1) - (p.0 - a.0) * (b.1 - a.1);
            if a.1 <= p.1 {
                if b.1 > p.1 && side > 0.0 {
                    w += 1;
                }
            } else if b.1 <= p.1 && side < 0.0 {
                w -= 1;
            }
        }
    }
    w
}

/// Clip an open polyline to the region of `clip` under `rule`.
///
/// Returns the visible runs, each at least two points long.
pub fn clip_polyline(line: &[IPoint], clip: &[Ring], rule: FillingRule) -> Vec<Vec<(f64, f64)>> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for seg in line.windows(2) {
        let (p, q) = (seg[0], seg[1]);
        if p == q {
            continue;
        }
        let d = ((q.0 - p.0) as f64, (q.1 - p.1) as f64);
        let mut ts: SmallVec<[f64; 8]> = SmallVec::new();
        ts.push(0.0);
        for ring in clip {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                let e = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
                let denom = d.0 * e.1 - d.1 * e.0;
                if denom == 0.0 {
                    continue;
                }
                let w = ((a.0 - p.0) as f64, (a.1 - p.1) as f64);
                let t = (w.0 * e.1 - w.1 * e.0) / denom;
                let u = (w.0 * d.1 - w.1 * d.0) / denom;
                if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
                    ts.push(t);
                }
            }
        }
        ts.push(1.0);
        ts.sort_by(f64::total_cmp);
        ts.dedup();

        let at = |t: f64| (p.0 as f64 + t * d.0, p.1 as f64 + t * d.1);
        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            let mid = at((t0 + t1) / 2.0);
            if rule.contains(winding_number(clip, mid)) {
                let (a, b) = (at(t0), at(t1));
                if current.last() != Some(&a) {
                    if current.len() >= 2 {
                        runs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
            } else if !current.is_empty() {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}
