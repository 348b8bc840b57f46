//! Flat bag of weighted points, the leaf representation of the range trees.
//!
//! Subtrees whose record count sits below the configured cutoff are stored
//! as one of these instead of as nodes; every query is a linear scan over
//! the occupied records. Records cover only the first `dim` coordinates of
//! their points; in cascade position the missing upper coordinates are fixed
//! by the tree path and supplied by the caller when points are emitted.

use crate::point::{Point, WeightedPoint};

pub struct OrArray {
    dim: usize,
    weight: i32,
    recs: Vec<WeightedPoint>,
}

impl OrArray {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "Zero width array leaf!");
        OrArray {
            dim,
            weight: 0,
            recs: Vec::with_capacity(2),
        }
    }

    /// Build from a segment of a rebuild buffer. Points are truncated to
    /// `dim` coordinates; multiplicities are carried through uncoalesced.
    pub fn build(buf: &[WeightedPoint], dim: usize) -> Self {
        assert!(dim > 0, "Zero width array leaf!");
        let mut weight = 0;
        let recs = buf
            .iter()
            .map(|r| {
                weight += r.w;
                WeightedPoint {
                    w: r.w,
                    p: Point::from(&r.p.coords()[..dim]),
                }
            })
            .collect();
        OrArray { dim, weight, recs }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn occupancy(&self) -> usize {
        self.recs.len()
    }

    pub fn records(&self) -> &[WeightedPoint] {
        &self.recs
    }

    fn find(&self, coords: &[i32]) -> Option<usize> {
        self.recs
            .iter()
            .position(|r| r.p.coords() == &coords[..self.dim])
    }

    /// Add `w` to the multiplicity of `p`, creating the record if new.
    pub fn insert(&mut self, coords: &[i32], w: i32) {
        match self.find(coords) {
            Some(i) => self.recs[i].w += w,
            None => self.recs.push(WeightedPoint {
                w,
                p: Point::from(&coords[..self.dim]),
            }),
        }
        self.weight += w;
    }

    /// Remove one unit of `p`. Returns true when the whole bag emptied, in
    /// which case the owner must drop the slot.
    pub fn delete(&mut self, coords: &[i32]) -> bool {
        let i = self.find(coords).expect("Deleting non-existing point.");
        self.weight -= 1;
        self.recs[i].w -= 1;
        if self.recs[i].w == 0 {
            self.recs.swap_remove(i);
        }
        self.weight == 0
    }

    /// Total multiplicity of records with every coordinate strictly below
    /// the query's.
    pub fn count_dominating(&self, c: &[i32]) -> i32 {
        self.recs
            .iter()
            .filter(|r| (0..self.dim).all(|k| r.p.get(k) < c[k]))
            .map(|r| r.w)
            .sum()
    }

    pub fn contains(&self, c: &[i32]) -> bool {
        self.find(c).is_some()
    }

    fn emit(rec: &WeightedPoint, upper: &[i32], out: &mut Vec<Point>) {
        for _ in 0..rec.w {
            debug_assert!(rec.w == 1, "Missed point rep.");
            let mut coords = rec.p.coords().to_vec();
            coords.extend_from_slice(&upper[rec.p.dim()..]);
            out.push(Point::from(coords));
        }
    }

    /// Emit every point with all covered coordinates strictly above `c`,
    /// completed with `upper` to full width.
    pub fn collect_above(&self, c: &[i32], upper: &[i32], out: &mut Vec<Point>) {
        for rec in &self.recs {
            if (0..self.dim).all(|k| rec.p.get(k) > c[k]) {
                Self::emit(rec, upper, out);
            }
        }
    }

    /// Emit every point with all covered coordinates strictly below `c`.
    pub fn collect_below(&self, c: &[i32], upper: &[i32], out: &mut Vec<Point>) {
        for rec in &self.recs {
            if (0..self.dim).all(|k| rec.p.get(k) < c[k]) {
                Self::emit(rec, upper, out);
            }
        }
    }

    /// Emit every point with `min[k] <= coord < max[k]` on all covered
    /// coordinates.
    pub fn collect_range(&self, min: &[i32], max: &[i32], upper: &[i32], out: &mut Vec<Point>) {
        for rec in &self.recs {
            if (0..self.dim).all(|k| min[k] <= rec.p.get(k) && rec.p.get(k) < max[k]) {
                Self::emit(rec, upper, out);
            }
        }
    }

    /// Drain into a rebuild buffer. At the top of the flattened subtree the
    /// records are sorted on the last covered dimension to seed the
    /// prefix-sum median search; deeper down the caller's path coordinates
    /// complete the records and the order is irrelevant.
    pub fn teleport(mut self, upper: &[i32], out: &mut Vec<WeightedPoint>) {
        if self.dim == upper.len() {
            let top = self.dim - 1;
            self.recs.sort_unstable_by_key(|r| r.p.get(top));
            out.append(&mut self.recs);
        } else {
            for rec in self.recs {
                let mut coords = rec.p.coords().to_vec();
                coords.extend_from_slice(&upper[self.dim..]);
                out.push(WeightedPoint {
                    w: rec.w,
                    p: Point::from(coords),
                });
            }
        }
    }

    pub fn check(&self) {
        assert!(self.dim > 0, "Dimension fail on array leaf");
        assert!(!self.recs.is_empty(), "Use fail on array leaf");
        let total: i32 = self.recs.iter().map(|r| r.w).sum();
        assert!(total == self.weight, "Weight fail on array leaf");
        assert!(self.recs.iter().all(|r| r.w > 0), "Record fail on array leaf");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bag(points: &[&[i32]]) -> OrArray {
        let mut a = OrArray::new(points[0].len());
        for p in points {
            a.insert(p, 1);
        }
        a
    }

    #[test]
    fn insert_coalesces_duplicates() {
        let mut a = OrArray::new(2);
        a.insert(&[3, 4], 1);
        a.insert(&[3, 4], 2);
        a.insert(&[1, 2], 1);
        assert_eq!(a.weight(), 4);
        assert_eq!(a.occupancy(), 2);
        assert_eq!(a.count_dominating(&[4, 5]), 4);
        assert_eq!(a.count_dominating(&[4, 4]), 1);
    }

    #[test]
    fn delete_pops_and_reports_empty() {
        let mut a = bag(&[&[0, 0], &[5, 5]]);
        assert!(!a.delete(&[0, 0]));
        assert!(!a.contains(&[0, 0]));
        assert!(a.contains(&[5, 5]));
        assert!(a.delete(&[5, 5]));
        assert_eq!(a.weight(), 0);
    }

    #[test]
    fn collects_complete_upper_coordinates() {
        // Two-coordinate records inside a three dimensional tree, path
        // coordinate fixed at 9.
        let a = bag(&[&[1, 1], &[2, 3], &[5, 0]]);
        let mut out = Vec::new();
        a.collect_above(&[0, 0], &[0, 0, 9], &mut out);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.get(2) == 9));

        out.clear();
        a.collect_range(&[1, 0], &[3, 4], &[0, 0, 9], &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        a.collect_below(&[5, 4], &[0, 0, 9], &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn teleport_sorts_on_the_top_dimension() {
        let a = bag(&[&[9, 2], &[0, 7], &[4, 4]]);
        let mut buf = Vec::new();
        a.teleport(&[0, 0], &mut buf);
        let tops: Vec<i32> = buf.iter().map(|r| r.p.get(1)).collect();
        assert_eq!(tops, vec![2, 4, 7]);
    }
}
