//! Flatten and rebuild machinery for the range trees.
//!
//! A subtree that loses its weight balance is drained in one pass
//! (`teleport`) into a buffer of weighted points sorted on the subtree's
//! top dimension, then rebuilt around weighted medians. On the sorted top
//! dimension the median comes from a binary search over prefix sums; the
//! lower dimension builds work on scrambled segments and select the median
//! with a randomized median-of-three three way partition.

use log::trace;

use super::{Node, OrTree, Params, TreeNode};
use crate::ora::OrArray;
use crate::point::{Point, WeightedPoint};

/// Per dimension leaf thresholds derived from the base cutoff: flat for one
/// and two dimensions, binomially scaled above that so the leaves keep a
/// comparable scan cost as the cascade deepens.
pub(super) fn cut_table(cutoff: usize, dim: usize) -> Vec<usize> {
    let mut t = vec![0; dim + 1];
    for k in 1..=dim {
        t[k] = if k <= 2 {
            cutoff
        } else {
            (binomial(cutoff + k - 1, k - 1) / k as u128) as usize
        };
    }
    t
}

fn binomial(n: usize, k: usize) -> u128 {
    let k = k.min(n - k);
    let mut r: u128 = 1;
    for i in 0..k {
        r = r * (n - i) as u128 / (i + 1) as u128;
    }
    r
}

impl OrTree {
    /// Drain `node` into `out`, in key order on the subtree's top dimension
    /// `dim`. `path` carries the coordinates fixed by the tree path; its
    /// length is the record width of the emitted points.
    pub(super) fn teleport_node(
        node: Box<Node>,
        dim: usize,
        path: &mut [i32],
        out: &mut Vec<WeightedPoint>,
    ) {
        match *node {
            Node::Leaf(a) => a.teleport(path, out),
            Node::Tree(t) => {
                let pw = t.proper_weight();
                let TreeNode {
                    v,
                    left,
                    right,
                    equal,
                    lower,
                    ..
                } = t;
                if let Some(l) = left {
                    Self::teleport_node(l, dim, path, out);
                }
                path[dim] = v;
                if dim > 0 {
                    if let Some(e) = equal {
                        Self::teleport_node(e, dim - 1, path, out);
                    }
                    // The lower cascade only mirrors what the subtree
                    // already emitted; dropping it is enough.
                    drop(lower);
                } else if pw > 0 {
                    out.push(WeightedPoint {
                        w: pw,
                        p: Point::from(&path[..]),
                    });
                }
                if let Some(r) = right {
                    Self::teleport_node(r, dim, path, out);
                }
            }
        }
    }

    fn drain(slot: &mut Option<Box<Node>>, dim: usize) -> Vec<WeightedPoint> {
        let node = slot.take().expect("Calling teleport on empty tree.");
        trace!(
            "teleporting a subtree of weight {} on dimension {}",
            node.weight(),
            dim
        );
        let mut buf = Vec::new();
        let mut path = vec![0i32; dim + 1];
        Self::teleport_node(node, dim, &mut path, &mut buf);
        debug_assert!(
            buf.windows(2).all(|w| w[0].p.get(dim) <= w[1].p.get(dim)),
            "Messed up teleport order."
        );
        buf
    }

    fn prefix_weights(buf: &[WeightedPoint]) -> Vec<i32> {
        let mut acc = Vec::with_capacity(buf.len() + 1);
        let mut sum = 0;
        acc.push(sum);
        for r in buf {
            sum += r.w;
            acc.push(sum);
        }
        acc
    }

    /// Rebuild the subtree as is; the leaf upgrade path.
    pub(super) fn rebuild_plain(slot: &mut Option<Box<Node>>, dim: usize, params: &mut Params) {
        let mut buf = Self::drain(slot, dim);
        let acc = Self::prefix_weights(&buf);
        *slot = Self::build_balanced(&mut buf, dim, Some((&acc, 0)), params);
    }

    /// Rebuild the subtree with `p` merged in; the insert rebalance path.
    pub(super) fn rebuild_merge(
        slot: &mut Option<Box<Node>>,
        p: &[i32],
        dim: usize,
        params: &mut Params,
    ) {
        let mut buf = Self::drain(slot, dim);
        let p = &p[..=dim];
        match buf.iter_mut().find(|r| r.p.coords() == p) {
            Some(rec) => rec.w += 1,
            None => {
                let q = Point::from(p);
                // First slot whose record is not lexicographically below the
                // new point; keeps the top dimension order intact.
                let at = buf
                    .iter()
                    .position(|r| r.p >= q)
                    .unwrap_or(buf.len());
                buf.insert(at, WeightedPoint { w: 1, p: q });
            }
        }
        let acc = Self::prefix_weights(&buf);
        *slot = Self::build_balanced(&mut buf, dim, Some((&acc, 0)), params);
    }

    /// Rebuild the subtree with one unit of `p` removed; the delete
    /// rebalance and leaf collapse path.
    pub(super) fn rebuild_remove(
        slot: &mut Option<Box<Node>>,
        p: &[i32],
        dim: usize,
        params: &mut Params,
    ) {
        let mut buf = Self::drain(slot, dim);
        let p = &p[..=dim];
        let i = buf
            .iter()
            .position(|r| r.p.coords() == p)
            .expect("Deleting non-existing point.");
        buf[i].w -= 1;
        if buf[i].w == 0 {
            buf.remove(i);
        }
        if !buf.is_empty() {
            let acc = Self::prefix_weights(&buf);
            *slot = Self::build_balanced(&mut buf, dim, Some((&acc, 0)), params);
        }
    }

    /// Recursively build a balanced subtree over `buf` on `dim`. `acc` is
    /// present when `buf` is still sorted on `dim`: the prefix table of the
    /// root buffer plus the offset of `buf` inside it. The lower dimension
    /// recursions pass `None` and fall back to partitioning.
    pub(super) fn build_balanced(
        buf: &mut [WeightedPoint],
        dim: usize,
        acc: Option<(&[i32], usize)>,
        params: &mut Params,
    ) -> Option<Box<Node>> {
        if buf.is_empty() {
            return None;
        }
        if buf.len() <= params.cut(dim + 1) {
            return Some(Box::new(Node::Leaf(OrArray::build(buf, dim + 1))));
        }

        let (ml, mr) = match acc {
            Some((table, off)) => Self::median_sorted(buf, dim, table, off),
            None => Self::median_partition(buf, dim, &mut params.rng),
        };

        let v = buf[ml].p.get(dim);
        let w = buf.iter().map(|r| r.w).sum();
        let mut t = TreeNode {
            v,
            w,
            left: None,
            right: None,
            equal: None,
            lower: None,
        };

        // Left and right before the secondaries: the lower dimension builds
        // scramble the segment order the median search relies on.
        if ml > 0 {
            t.left = Self::build_balanced(&mut buf[..ml], dim, acc, params);
        }
        if mr + 1 < buf.len() {
            t.right = Self::build_balanced(
                &mut buf[mr + 1..],
                dim,
                acc.map(|(table, off)| (table, off + mr + 1)),
                params,
            );
        }
        if dim > 0 {
            t.equal = Self::build_balanced(&mut buf[ml..=mr], dim - 1, None, params);
            t.lower = Self::build_balanced(buf, dim - 1, None, params);
        }

        Some(Box::new(Node::Tree(t)))
    }

    /// Weighted median of a segment sorted on `dim`, located by binary
    /// search over the prefix sums, then widened to the whole run of equal
    /// keys. Returns inclusive bounds relative to `buf`.
    fn median_sorted(buf: &[WeightedPoint], dim: usize, table: &[i32], off: usize) -> (usize, usize) {
        let b = off;
        let e = off + buf.len();
        let mid = (table[b] + table[e]) / 2;
        let (mut lo, mut hi) = (b, e);
        while lo + 1 < hi {
            let m = (lo + hi) / 2;
            if table[m + 1] <= mid {
                lo = m;
            } else {
                hi = m;
            }
        }
        let mut ml = lo - off;
        let mut mr = ml;
        let key = buf[ml].p.get(dim);
        while ml > 0 && buf[ml - 1].p.get(dim) == key {
            ml -= 1;
        }
        while mr + 1 < buf.len() && buf[mr + 1].p.get(dim) == key {
            mr += 1;
        }
        (ml, mr)
    }

    /// Weighted median of an unsorted segment: randomized median-of-three
    /// pivoting with three way partitioning, narrowing until the weight
    /// midpoint falls inside the pivot run. Leaves `buf` partitioned around
    /// the returned inclusive interval.
    fn median_partition(
        buf: &mut [WeightedPoint],
        dim: usize,
        rng: &mut fastrand::Rng,
    ) -> (usize, usize) {
        let mut l = 0usize;
        let mut r = buf.len() - 1;
        let mut lsum: i32 = 0;
        let mut rsum: i32 = buf.iter().map(|x| x.w).sum();
        debug_assert!(rsum > 0, "Failed median call.");
        let mid = rsum / 2;

        while r - l + 1 > 2 {
            buf.swap(r, l + rng.usize(..r - l + 1));
            buf.swap(r - 1, l + rng.usize(..r - l));
            buf.swap(r - 2, l + rng.usize(..r - l - 1));
            if buf[r - 2].p.get(dim) > buf[r - 1].p.get(dim) {
                buf.swap(r - 2, r - 1);
            }
            if buf[r - 1].p.get(dim) > buf[r].p.get(dim) {
                buf.swap(r - 1, r);
            }
            if buf[r - 2].p.get(dim) > buf[r - 1].p.get(dim) {
                buf.swap(r - 2, r - 1);
            }
            let pivot = buf[r - 1].p.get(dim);

            let (pl, pr) = Self::partition3(buf, l, r, pivot, dim);
            let addl: i32 = buf[l..pl].iter().map(|x| x.w).sum();
            let subr: i32 = buf[pr + 1..=r].iter().map(|x| x.w).sum();

            if lsum + addl <= mid && mid <= rsum - subr {
                l = pl;
                r = pr;
                break;
            } else if rsum - subr < mid {
                l = pr + 1;
                lsum = rsum - subr;
            } else {
                r = pl - 1;
                rsum = lsum + addl;
            }
        }

        // Intervals of one or two elements.
        if buf[l].p.get(dim) > buf[r].p.get(dim) {
            buf.swap(l, r);
        }
        if buf[l].p.get(dim) != buf[r].p.get(dim) {
            if lsum + buf[l].w < mid {
                l = r;
            } else {
                r = l;
            }
        }
        debug_assert!(
            buf[l].p.get(dim) == buf[r].p.get(dim),
            "Failed median value."
        );
        (l, r)
    }

    /// Three way partition of `buf[l..=r]` around `pivot` on `dim`. Returns
    /// the inclusive interval now holding the pivot keys.
    fn partition3(
        buf: &mut [WeightedPoint],
        l: usize,
        r: usize,
        pivot: i32,
        dim: usize,
    ) -> (usize, usize) {
        let (mut pl, mut pr) = (l, r);
        let mut i = l;
        while i <= pr {
            let c = buf[i].p.get(dim);
            if c > pivot {
                buf.swap(i, pr);
                if pr == 0 {
                    break;
                }
                pr -= 1;
            } else {
                if c < pivot {
                    buf.swap(i, pl);
                    pl += 1;
                }
                i += 1;
            }
        }
        debug_assert!(
            buf[pl..=pr].iter().all(|x| x.p.get(dim) == pivot),
            "Failed pivot interval in partition."
        );
        (pl, pr)
    }
}
