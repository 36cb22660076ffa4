//! Force-directed edge bundling (Holten & van Wijk, 2009).
//!
//! Each edge is subdivided into a polyline whose interior vertices are pulled
//! by springs toward their neighbours on the same edge and by electrostatic
//! attraction toward the matching vertex of every compatible edge. Each
//! cycle doubles the subdivision count and halves the step size.

use std::collections::BTreeMap;

use streaming::{EdgeRef, NodePosition};

use crate::bundling::{BundleLayout, resolve_edges};

const EPS: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FdebParams {
    /// Global spring constant; higher keeps edges stiffer.
    pub stiffness: f64,
    /// Initial distance a vertex may move per iteration.
    pub step_size: f64,
    pub initial_subdivisions: usize,
    pub subdivision_rate: usize,
    pub cycles: usize,
    pub initial_iterations: f64,
    pub iteration_rate: f64,
    /// Minimum compatibility score for two edges to attract each other.
    pub compatibility_threshold: f64,
}

impl Default for FdebParams {
    fn default() -> Self {
        Self {
            stiffness: 0.1,
            step_size: 0.1,
            initial_subdivisions: 1,
            subdivision_rate: 2,
            cycles: 6,
            initial_iterations: 90.0,
            iteration_rate: 2.0 / 3.0,
            compatibility_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForceEdgeBundling {
    params: FdebParams,
}

impl ForceEdgeBundling {
    pub fn new(params: FdebParams) -> Self {
        Self { params }
    }

    pub fn with_step_size(step_size: f64) -> Self {
        Self::new(FdebParams {
            step_size,
            ..FdebParams::default()
        })
    }

    pub fn params(&self) -> &FdebParams {
        &self.params
    }

    /// Runs the layout on already resolved endpoint pairs. Zero-length
    /// edges are dropped.
    pub fn bundle_segments(
        &self,
        edges: &[(NodePosition, NodePosition)],
    ) -> Vec<Vec<NodePosition>> {
        let edges: Vec<Segment> = edges
            .iter()
            .map(|(s, t)| Segment {
                source: Vec2::from(*s),
                target: Vec2::from(*t),
            })
            .filter(|e| e.length() > EPS)
            .collect();
        if edges.is_empty() {
            return Vec::new();
        }

        let p = &self.params;
        let compatible = compatibility_lists(&edges, p.compatibility_threshold);

        let mut divisions = p.initial_subdivisions.max(1);
        let mut step = p.step_size;
        let mut iterations = p.initial_iterations;
        let mut polylines: Vec<Vec<Vec2>> =
            edges.iter().map(|e| vec![e.source, e.target]).collect();
        subdivide_all(&mut polylines, divisions);

        for _cycle in 0..p.cycles {
            for _ in 0..iterations.round() as usize {
                let forces: Vec<Vec<Vec2>> = (0..edges.len())
                    .map(|e| {
                        resulting_forces(e, &edges, &polylines, &compatible, p.stiffness, step)
                    })
                    .collect();
                for (line, force) in polylines.iter_mut().zip(forces) {
                    for (vertex, f) in line.iter_mut().zip(force) {
                        *vertex = vertex.add(f);
                    }
                }
            }
            step /= 2.0;
            divisions *= p.subdivision_rate.max(1);
            iterations *= p.iteration_rate;
            subdivide_all(&mut polylines, divisions);
        }

        polylines
            .into_iter()
            .map(|line| line.into_iter().map(NodePosition::from).collect())
            .collect()
    }
}

impl BundleLayout for ForceEdgeBundling {
    fn layout(
        &self,
        nodes: &BTreeMap<String, NodePosition>,
        edges: &[EdgeRef],
    ) -> Vec<Vec<NodePosition>> {
        self.bundle_segments(&resolve_edges(nodes, edges))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }

    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }

    fn scale(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }

    fn dot(self, o: Vec2) -> f64 {
        self.x * o.x + self.y * o.y
    }

    fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    fn distance(self, o: Vec2) -> f64 {
        self.sub(o).length()
    }

    fn lerp(self, o: Vec2, t: f64) -> Vec2 {
        self.add(o.sub(self).scale(t))
    }
}

impl From<NodePosition> for Vec2 {
    fn from(p: NodePosition) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for NodePosition {
    fn from(v: Vec2) -> Self {
        NodePosition { x: v.x, y: v.y }
    }
}

#[derive(Debug, Copy, Clone)]
struct Segment {
    source: Vec2,
    target: Vec2,
}

impl Segment {
    fn vector(&self) -> Vec2 {
        self.target.sub(self.source)
    }

    fn length(&self) -> f64 {
        self.vector().length()
    }

    fn midpoint(&self) -> Vec2 {
        self.source.lerp(self.target, 0.5)
    }

    fn project(&self, p: Vec2) -> Vec2 {
        let v = self.vector();
        let t = p.sub(self.source).dot(v) / v.dot(v);
        self.source.add(v.scale(t))
    }
}

fn angle_compatibility(p: &Segment, q: &Segment) -> f64 {
    (p.vector().dot(q.vector()) / (p.length() * q.length())).abs()
}

fn scale_compatibility(p: &Segment, q: &Segment) -> f64 {
    let (lp, lq) = (p.length(), q.length());
    let avg = (lp + lq) / 2.0;
    2.0 / (avg / lp.min(lq) + lp.max(lq) / avg)
}

fn position_compatibility(p: &Segment, q: &Segment) -> f64 {
    let avg = (p.length() + q.length()) / 2.0;
    avg / (avg + p.midpoint().distance(q.midpoint()))
}

fn edge_visibility(p: &Segment, q: &Segment) -> f64 {
    let i0 = p.project(q.source);
    let i1 = p.project(q.target);
    let span = i0.distance(i1);
    if span < EPS {
        return 0.0;
    }
    let mid = i0.lerp(i1, 0.5);
    (1.0 - 2.0 * p.midpoint().distance(mid) / span).max(0.0)
}

fn visibility_compatibility(p: &Segment, q: &Segment) -> f64 {
    edge_visibility(p, q).min(edge_visibility(q, p))
}

fn compatibility_score(p: &Segment, q: &Segment) -> f64 {
    angle_compatibility(p, q)
        * scale_compatibility(p, q)
        * position_compatibility(p, q)
        * visibility_compatibility(p, q)
}

fn compatibility_lists(edges: &[Segment], threshold: f64) -> Vec<Vec<usize>> {
    let mut lists = vec![Vec::new(); edges.len()];
    for e in 0..edges.len() {
        for o in (e + 1)..edges.len() {
            if compatibility_score(&edges[e], &edges[o]) >= threshold {
                lists[e].push(o);
                lists[o].push(e);
            }
        }
    }
    lists
}

/// Re-samples every polyline to `divisions` evenly spaced interior vertices
/// along its current arc length.
fn subdivide_all(polylines: &mut [Vec<Vec2>], divisions: usize) {
    for line in polylines.iter_mut() {
        *line = resample(line, divisions);
    }
}

fn resample(line: &[Vec2], divisions: usize) -> Vec<Vec2> {
    let (Some(&first), Some(&last)) = (line.first(), line.last()) else {
        return Vec::new();
    };
    let total: f64 = line.windows(2).map(|w| w[0].distance(w[1])).sum();
    let spacing = total / (divisions + 1) as f64;

    let mut out = Vec::with_capacity(divisions + 2);
    out.push(first);
    let mut walked = 0.0;
    let mut k = 1;
    for w in line.windows(2) {
        let len = w[0].distance(w[1]);
        while k <= divisions && walked + len >= k as f64 * spacing {
            let t = if len > 0.0 {
                (k as f64 * spacing - walked) / len
            } else {
                0.0
            };
            out.push(w[0].lerp(w[1], t));
            k += 1;
        }
        walked += len;
    }
    // Rounding can leave the last sample short of the end.
    while k <= divisions {
        out.push(last);
        k += 1;
    }
    out.push(last);
    out
}

fn resulting_forces(
    e: usize,
    edges: &[Segment],
    polylines: &[Vec<Vec2>],
    compatible: &[Vec<usize>],
    stiffness: f64,
    step: f64,
) -> Vec<Vec2> {
    let line = &polylines[e];
    let interior = line.len().saturating_sub(2);
    let kp = stiffness / (edges[e].length() * (interior + 1) as f64);

    let mut forces = vec![Vec2::ZERO; line.len()];
    for i in 1..=interior {
        let spring = line[i - 1].sub(line[i]).add(line[i + 1].sub(line[i])).scale(kp);

        let mut electrostatic = Vec2::ZERO;
        for &o in &compatible[e] {
            let Some(&other) = polylines[o].get(i) else {
                continue;
            };
            let pull = other.sub(line[i]);
            if pull.x.abs() > EPS || pull.y.abs() > EPS {
                electrostatic = electrostatic.add(pull.scale(1.0 / pull.length()));
            }
        }

        forces[i] = spring.add(electrostatic).scale(step);
    }
    forces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64, y: f64) -> NodePosition {
        NodePosition { x, y }
    }

    fn quick() -> ForceEdgeBundling {
        ForceEdgeBundling::new(FdebParams {
            step_size: 0.02,
            cycles: 3,
            initial_iterations: 20.0,
            ..FdebParams::default()
        })
    }

    #[test]
    fn resample_spaces_points_evenly() {
        let line = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0)];
        let out = resample(&line, 3);
        assert_eq!(out.len(), 5);
        for (i, v) in out.iter().enumerate() {
            assert!((v.x - i as f64).abs() < 1e-9, "vertex {i} at {}", v.x);
        }
    }

    #[test]
    fn resample_follows_bends() {
        let line = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
        let out = resample(&line, 1);
        assert_eq!(out.len(), 3);
        assert!(out[1].distance(Vec2::new(1.0, 0.0)) < 1e-9);
    }

    #[test]
    fn lone_edge_stays_straight() {
        let out = quick().bundle_segments(&[(n(0.0, 0.0), n(10.0, 0.0))]);
        assert_eq!(out.len(), 1);
        let line = &out[0];
        // 1 subdivision doubled each of 3 cycles, plus both endpoints.
        assert_eq!(line.len(), 10);
        assert_eq!(line[0], n(0.0, 0.0));
        assert_eq!(line[line.len() - 1], n(10.0, 0.0));
        assert!(line.iter().all(|v| v.y.abs() < 1e-9));
    }

    #[test]
    fn parallel_edges_attract() {
        let a = (n(0.0, 0.0), n(10.0, 0.0));
        let b = (n(0.0, 1.0), n(10.0, 1.0));
        let out = quick().bundle_segments(&[a, b]);
        let mid = out[0].len() / 2;
        let gap = (out[1][mid].y - out[0][mid].y).abs();
        assert!(gap < 1.0, "midpoints should move closer, gap {gap}");
        assert_eq!(out[0][0], a.0);
        assert_eq!(out[1][out[1].len() - 1], b.1);
    }

    #[test]
    fn perpendicular_edges_are_incompatible() {
        let a = Segment {
            source: Vec2::new(0.0, 0.0),
            target: Vec2::new(10.0, 0.0),
        };
        let b = Segment {
            source: Vec2::new(5.0, -5.0),
            target: Vec2::new(5.0, 5.0),
        };
        assert!(compatibility_score(&a, &b) < 0.6);
        assert!(compatibility_lists(&[a, b], 0.6).iter().all(Vec::is_empty));
    }

    #[test]
    fn zero_length_edges_are_dropped() {
        let out = quick().bundle_segments(&[(n(1.0, 1.0), n(1.0, 1.0))]);
        assert!(out.is_empty());
    }
}
