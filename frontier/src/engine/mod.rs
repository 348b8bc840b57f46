//! The incremental MLCS engine.
//!
//! `PF[r]` holds the minimal match points of rank `r`: the `d`-tuples of
//! positions where one common letter matches across all strings in exactly
//! `r` steps, kept minimal under coordinatewise dominance. `PF[0]` holds
//! the all `-1` origin, and the reported length is the highest rank whose
//! front still carries weight.
//!
//! `append` only ever grows fronts outward, rank by rank. `pop` is the
//! delicate direction: deleting the front letter kills match points at
//! every rank, and each kill can uncover points that were only kept out of
//! a front by the vanishing minimum. The walk is breadth first over ranks
//! with a watermarked queue, with speculative uncovered inserts verified at
//! every rank transition.

use std::fmt;

use itertools::Itertools;
use log::debug;

use crate::dynstr::{DynStr, ABSENT};
use crate::ort::OrTree;
use crate::point::Point;
use crate::queue::MarkedQueue;
use crate::AHashSet;

#[cfg(test)]
mod test;

pub struct Mlcs {
    dim: usize,
    /// How many strings are currently empty. While any is, every front
    /// above the origin stays empty.
    zeros: usize,
    strings: Vec<DynStr>,
    /// Pareto fronts by rank. Index 0 always holds exactly the origin.
    fronts: Vec<OrTree>,
    lambda: usize,
}

impl Mlcs {
    pub fn new(dim: usize, sigma: usize) -> Self {
        assert!(dim >= 2, "An MLCS needs at least two strings.");
        let mut origin_front = OrTree::new(dim);
        origin_front.insert(&vec![-1; dim]);
        Mlcs {
            dim,
            zeros: dim,
            strings: (0..dim).map(|_| DynStr::new(sigma)).collect(),
            fronts: vec![origin_front],
            lambda: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn sigma(&self) -> usize {
        self.strings[0].sigma()
    }

    /// Current length of the longest common subsequence.
    pub fn len(&self) -> usize {
        self.lambda
    }

    pub fn is_empty(&self) -> bool {
        self.lambda == 0
    }

    pub fn string(&self, j: usize) -> &DynStr {
        &self.strings[j]
    }

    fn grow_fronts(&mut self) {
        while self.fronts.len() < self.lambda + 2 {
            self.fronts.push(OrTree::new(self.dim));
        }
    }

    /// Append letter `c` to the right end of string `j`.
    pub fn append(&mut self, j: usize, c: u8) {
        assert!(j < self.dim, "String index out of range.");
        if self.strings[j].is_empty() {
            self.zeros -= 1;
        }

        if self.zeros == 0 {
            self.grow_fronts();
            let dim = self.dim;

            // The window of fronts the new letter can extend: strictly
            // after the previous occurrence of c in string j, and no later
            // than the last occurrence of c anywhere else.
            let mut z = vec![-1i32; dim];
            let mut f = vec![0i32; dim];
            for i in 0..dim {
                f[i] = self.strings[i].last(c);
            }
            z[j] = self.strings[j].last(c);
            f[j] = self.strings[j].end();

            for r in 0..=self.lambda {
                let hits = self.fronts[r].collect_range(&z, &f);
                if hits.is_empty() {
                    continue;
                }
                let mut fresh = OrTree::new(dim);
                let mut cand = vec![0i32; dim];
                for t in &hits {
                    let mut exclude = false;
                    for i in 0..dim {
                        if i == j {
                            cand[i] = self.strings[i].end();
                            if t.get(i) == cand[i] {
                                exclude = true;
                                break;
                            }
                        } else {
                            cand[i] = self.strings[i].ceil(c, t.get(i) + 1);
                            if cand[i] == ABSENT {
                                exclude = true;
                                break;
                            }
                        }
                    }
                    if exclude {
                        continue;
                    }
                    let bumped: Vec<i32> = cand.iter().map(|x| x + 1).collect();
                    if self.fronts[r + 1].count_dominating(&bumped) > 0 {
                        continue; // already covered one rank up
                    }
                    if fresh.count_dominating(&bumped) > 0 {
                        continue; // duplicate or covered among the new ones
                    }
                    fresh.insert(&cand);
                }

                // Keep only the minima of the candidate batch.
                for p in fresh.collect_above(&z) {
                    let bumped = p.bumped_by(1);
                    if fresh.count_dominating(bumped.coords()) <= 1 {
                        self.fronts[r + 1].insert(p.coords());
                    }
                }
            }

            if self.fronts[self.lambda + 1].weight() > 0 {
                self.lambda += 1;
                debug!("mlcs length grew to {}", self.lambda);
            }
        }

        self.strings[j].append(c);
    }

    /// Remove the front letter of string `j`.
    pub fn pop(&mut self, j: usize) {
        assert!(j < self.dim, "String index out of range.");
        assert!(!self.strings[j].is_empty(), "Popping an empty string.");
        if self.strings[j].len() == 1 {
            self.zeros += 1;
        }

        if self.lambda > 0 {
            let dim = self.dim;
            let mut queue = MarkedQueue::new();
            let mut pending = MarkedQueue::new();

            // Seed: the leftmost match of the letter being removed. Invalid
            // when the letter is missing from some string, in which case no
            // front holds any trace of it.
            let c = self.strings[j].first_letter();
            let mut seed = vec![0i32; dim];
            let mut valid = true;
            for i in 0..dim {
                seed[i] = self.strings[i].ceil(c, 0);
                if seed[i] < 0 {
                    valid = false;
                    break;
                }
            }
            if valid {
                queue.push(Point::from(seed));
                queue.mark();
            }
            let mut r = 1usize;

            while !queue.is_empty() {
                if queue.at_mark() {
                    // Rank transition: settle the speculative inserts.
                    Self::clean_covered(&mut pending, &mut self.fronts[r]);
                    r += 1;
                    queue.mark();
                }

                let head = queue.front().unwrap().clone();
                let c2 = self.strings[j].letter(head.get(j));
                let mut prev = vec![0i32; dim];
                let mut far = vec![0i32; dim];
                for i in 0..dim {
                    far[i] = self.strings[i].last(c2);
                    prev[i] = self.strings[i].floor(c2, head.get(i) - 1);
                }
                self.uncover(&mut pending, c2, r, j, &prev, &head, &mut far);

                let above = if r + 1 < self.fronts.len() {
                    self.fronts[r + 1].collect_above(head.coords())
                } else {
                    Vec::new()
                };

                self.fronts[r].delete(head.coords());

                // Points one rank up that just lost their last dominator
                // drop into this front and propagate.
                for t in above {
                    if self.fronts[r].count_dominating(t.coords()) == 0 {
                        self.fronts[r].insert(t.coords());
                        queue.push(t.clone());
                        pending.push(t);
                    }
                }

                queue.pop();
            }
            Self::clean_covered(&mut pending, &mut self.fronts[r]);

            if self.fronts[self.lambda].weight() == 0 {
                self.lambda -= 1;
                debug!("mlcs length shrank to {}", self.lambda);
            }
        }

        self.strings[j].pop_front();
    }

    /// Surface candidates that may become minimal at rank `r` once `head`
    /// leaves its front. Speculative: every insert lands on `pending` and
    /// is re-verified by `clean_covered` at the end of the rank.
    fn uncover(
        &mut self,
        pending: &mut MarkedQueue,
        c: u8,
        r: usize,
        j: usize,
        prev: &[i32],
        head: &Point,
        far: &mut [i32],
    ) {
        let dim = self.dim;
        if r == 1 {
            // At the bottom rank the only hidden candidate advances the
            // popped string to its next occurrence of the letter.
            if far[j] > head.get(j) {
                let mut cand = head.coords().to_vec();
                cand[j] = self.strings[j].ceil(c, cand[j] + 1);
                let bumped: Vec<i32> = cand.iter().map(|x| x + 1).collect();
                if self.fronts[1].count_dominating(&bumped) == 1 {
                    self.fronts[1].insert(&cand);
                    pending.push(Point::from(cand));
                }
            }
        } else {
            let mut seen: AHashSet<Point> = AHashSet::default();
            for i in 0..dim {
                let hold = far[i];
                far[i] = head.get(i);
                let slice = self.fronts[r - 1].collect_range(prev, far);
                for s in slice {
                    if !seen.insert(s.clone()) {
                        continue;
                    }
                    let mut cand = vec![0i32; dim];
                    for l in 0..dim {
                        cand[l] = self.strings[l].ceil(c, s.get(l) + 1);
                    }
                    if cand.as_slice() == head.coords() {
                        continue;
                    }
                    let bumped: Vec<i32> = cand.iter().map(|x| x + 1).collect();
                    if self.fronts[r].count_dominating(&bumped) == 1 {
                        self.fronts[r].insert(&cand);
                        pending.push(Point::from(cand));
                    }
                }
                far[i] = hold;
            }
        }
    }

    /// Settle the speculative inserts of one rank: anything now covered by
    /// another member of the front goes out again.
    fn clean_covered(pending: &mut MarkedQueue, front: &mut OrTree) {
        while let Some(p) = pending.pop() {
            let bumped = p.bumped_by(1);
            if front.count_dominating(bumped.coords()) > 1 {
                front.delete(p.coords());
            }
        }
    }

    /// Assert the front invariants: every point of a layer is justified by
    /// a strict dominator one rank down and is the unique minimum at its
    /// own spot.
    pub fn check_fronts(&self) {
        assert!(self.fronts[0].weight() == 1, "Origin front corrupted.");
        let origin = vec![-1i32; self.dim];
        for r in 1..=self.lambda {
            let layer = self.fronts[r].collect_above(&origin);
            assert!(!layer.is_empty(), "Empty layer");
            for p in &layer {
                assert!(
                    self.fronts[r - 1].count_dominating(p.coords()) > 0,
                    "Unjustified point in layer"
                );
                let bumped = p.bumped_by(1);
                assert!(
                    self.fronts[r].count_dominating(bumped.coords()) == 1,
                    "Non minimal point in layer"
                );
            }
        }
        if self.lambda + 1 < self.fronts.len() {
            assert!(
                self.fronts[self.lambda + 1].weight() == 0,
                "Weight beyond the last rank."
            );
        }
        if self.zeros == 0 && self.lambda > 0 {
            assert!(self.fronts[self.lambda].weight() > 0, "Hollow last rank.");
        }
    }
}

impl fmt::Debug for Mlcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = vec![-1i32; self.dim];
        for r in 0..=self.lambda {
            let layer = self.fronts[r]
                .collect_above(&origin)
                .iter()
                .map(|p| format!("{:?}", p))
                .join(" ");
            writeln!(f, "@ {} : {}", r, layer)?;
        }
        Ok(())
    }
}
