//! Weight balanced orthogonal range trees over match points.
//!
//! One tree indexes one Pareto front. The root is a binary search tree on
//! the highest coordinate; every node carries two owned lower dimension
//! secondaries: `equal` indexes exactly the points whose coordinate matches
//! the node key, `lower` indexes every point of the node's subtree. The
//! cascade bottoms out at dimension zero, where node weights alone carry
//! the counts. Subtrees below the per dimension cutoff are stored as flat
//! [`OrArray`] leaves instead of nodes.
//!
//! Rebalancing is wholesale: when an edit leaves a child too heavy for its
//! parent, the whole offending subtree is flattened (`teleport`) and
//! rebuilt around weighted medians. The rebuild machinery lives in
//! `rebuild.rs`.

// ************************************* Contents **************************************************
// enum Node, struct TreeNode
// struct TreeConfig
// struct OrTree
// - impl OrTree: queries (count_dominating, contains, collect_*)
// - impl OrTree: mutation (insert, delete, leaf delegation)
// - impl OrTree: diagnostics (check, dot)
// *********************************** Contents End ************************************************

use std::fmt::Write as _;

use crate::ora::OrArray;
use crate::point::Point;

mod rebuild;
#[cfg(test)]
mod test;

/// Weight balance bound: a child stays legal while
/// `1 + w(child) < BALANCE_FACTOR * (1 + w(parent))`.
pub const BALANCE_FACTOR: f64 = 4.0 / 5.0;

/// Base cutoff; the per dimension thresholds are derived from it.
pub const DEFAULT_CUTOFF: usize = 4;

/// Construction knobs. The engine always runs on the defaults; the struct
/// exists so the structural tests can pin the pivot seed and stress
/// unusual shapes.
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub balance: f64,
    pub cutoff: usize,
    pub seed: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            balance: BALANCE_FACTOR,
            cutoff: DEFAULT_CUTOFF,
            seed: None,
        }
    }
}

pub(crate) enum Node {
    Tree(TreeNode),
    Leaf(OrArray),
}

pub(crate) struct TreeNode {
    /// Dividing key on this node's dimension.
    v: i32,
    /// Subtree weight, multiplicities included.
    w: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
    /// Points whose coordinate equals `v`, one dimension down. None on
    /// dimension zero.
    equal: Option<Box<Node>>,
    /// Every point of the subtree, one dimension down. None on dimension
    /// zero.
    lower: Option<Box<Node>>,
}

impl Node {
    fn weight(&self) -> i32 {
        match self {
            Node::Tree(t) => t.w,
            Node::Leaf(a) => a.weight(),
        }
    }
}

impl TreeNode {
    /// Weight owned by this node itself: the equal part on cascading
    /// dimensions, the key multiplicity on dimension zero.
    fn proper_weight(&self) -> i32 {
        self.w
            - self.left.as_deref().map_or(0, Node::weight)
            - self.right.as_deref().map_or(0, Node::weight)
    }
}

struct Params {
    balance: f64,
    cuts: Vec<usize>,
    rng: fastrand::Rng,
}

impl Params {
    fn cut(&self, k: usize) -> usize {
        self.cuts[k]
    }
}

pub struct OrTree {
    dim: usize,
    root: Option<Box<Node>>,
    params: Params,
}

impl OrTree {
    pub fn new(dim: usize) -> Self {
        Self::with_config(dim, TreeConfig::default())
    }

    pub fn with_config(dim: usize, cfg: TreeConfig) -> Self {
        assert!(dim > 0, "Dimension fail on range tree");
        assert!(
            0.5 <= cfg.balance && cfg.balance < 1.0,
            "Invalid balance value"
        );
        assert!(cfg.cutoff > 0, "Invalid cutoff value");
        OrTree {
            dim,
            root: None,
            params: Params {
                balance: cfg.balance,
                cuts: rebuild::cut_table(cfg.cutoff, dim),
                rng: match cfg.seed {
                    Some(s) => fastrand::Rng::with_seed(s),
                    None => fastrand::Rng::new(),
                },
            },
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total stored weight; zero for an empty tree.
    pub fn weight(&self) -> i32 {
        self.root.as_deref().map_or(0, Node::weight)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    // ----- queries ------------------------------------------------------

    /// Weight of the stored points that strictly dominate `c`, i.e. sit
    /// strictly below it on every coordinate.
    pub fn count_dominating(&self, c: &[i32]) -> i32 {
        debug_assert_eq!(c.len(), self.dim);
        Self::count_rec(self.root.as_deref(), c, self.dim - 1)
    }

    fn count_rec(mut node: Option<&Node>, c: &[i32], dim: usize) -> i32 {
        let mut r = 0;
        while let Some(Node::Tree(t)) = node {
            if t.v < c[dim] {
                if dim == 0 {
                    // Left part plus this key's multiplicity.
                    r += t.w - t.right.as_deref().map_or(0, Node::weight);
                } else {
                    match t.left.as_deref() {
                        Some(Node::Tree(lt)) => {
                            r += Self::count_rec(lt.lower.as_deref(), c, dim - 1)
                        }
                        Some(leaf) => r += Self::count_rec(Some(leaf), c, dim - 1),
                        None => {}
                    }
                    r += Self::count_rec(t.equal.as_deref(), c, dim - 1);
                }
                node = t.right.as_deref();
            } else {
                node = t.left.as_deref();
            }
        }
        if let Some(Node::Leaf(a)) = node {
            r += a.count_dominating(c);
        }
        r
    }

    pub fn contains(&self, c: &[i32]) -> bool {
        debug_assert_eq!(c.len(), self.dim);
        Self::contains_rec(self.root.as_deref(), c, self.dim - 1)
    }

    fn contains_rec(mut node: Option<&Node>, c: &[i32], dim: usize) -> bool {
        loop {
            match node {
                None => return false,
                Some(Node::Leaf(a)) => return a.contains(c),
                Some(Node::Tree(t)) => {
                    if c[dim] < t.v {
                        node = t.left.as_deref();
                    } else if c[dim] > t.v {
                        node = t.right.as_deref();
                    } else {
                        if t.proper_weight() == 0 {
                            return false;
                        }
                        if dim == 0 {
                            return true;
                        }
                        return Self::contains_rec(t.equal.as_deref(), c, dim - 1);
                    }
                }
            }
        }
    }

    /// Every stored point strictly above `c` on all coordinates. Fresh
    /// copies, arbitrary order.
    pub fn collect_above(&self, c: &[i32]) -> Vec<Point> {
        let mut out = Vec::new();
        let mut path = vec![0i32; self.dim];
        Self::collect_above_rec(self.root.as_deref(), c, self.dim - 1, &mut path, &mut out);
        out
    }

    fn collect_above_rec(
        node: Option<&Node>,
        c: &[i32],
        dim: usize,
        path: &mut [i32],
        out: &mut Vec<Point>,
    ) {
        match node {
            None => {}
            Some(Node::Leaf(a)) => a.collect_above(c, path, out),
            Some(Node::Tree(t)) => {
                if t.v > c[dim] {
                    Self::collect_above_rec(t.left.as_deref(), c, dim, path, out);
                    path[dim] = t.v;
                    if dim > 0 {
                        Self::collect_above_rec(t.equal.as_deref(), c, dim - 1, path, out);
                    } else if t.proper_weight() > 0 {
                        debug_assert!(t.proper_weight() == 1, "Missed point rep.");
                        out.push(Point::from(&path[..]));
                    }
                }
                Self::collect_above_rec(t.right.as_deref(), c, dim, path, out);
            }
        }
    }

    /// Every stored point strictly below `c` on all coordinates.
    pub fn collect_below(&self, c: &[i32]) -> Vec<Point> {
        let mut out = Vec::new();
        let mut path = vec![0i32; self.dim];
        Self::collect_below_rec(self.root.as_deref(), c, self.dim - 1, &mut path, &mut out);
        out
    }

    fn collect_below_rec(
        node: Option<&Node>,
        c: &[i32],
        dim: usize,
        path: &mut [i32],
        out: &mut Vec<Point>,
    ) {
        match node {
            None => {}
            Some(Node::Leaf(a)) => a.collect_below(c, path, out),
            Some(Node::Tree(t)) => {
                if t.v < c[dim] {
                    Self::collect_below_rec(t.right.as_deref(), c, dim, path, out);
                    path[dim] = t.v;
                    if dim > 0 {
                        Self::collect_below_rec(t.equal.as_deref(), c, dim - 1, path, out);
                    } else if t.proper_weight() > 0 {
                        debug_assert!(t.proper_weight() == 1, "Missed point rep.");
                        out.push(Point::from(&path[..]));
                    }
                }
                Self::collect_below_rec(t.left.as_deref(), c, dim, path, out);
            }
        }
    }

    /// Every stored point with `min[k] <= coord < max[k]` on all
    /// coordinates; half open on the high side.
    pub fn collect_range(&self, min: &[i32], max: &[i32]) -> Vec<Point> {
        let mut out = Vec::new();
        let mut path = vec![0i32; self.dim];
        Self::collect_range_rec(
            self.root.as_deref(),
            min,
            max,
            self.dim - 1,
            &mut path,
            &mut out,
        );
        out
    }

    fn collect_range_rec(
        node: Option<&Node>,
        min: &[i32],
        max: &[i32],
        dim: usize,
        path: &mut [i32],
        out: &mut Vec<Point>,
    ) {
        match node {
            None => {}
            Some(Node::Leaf(a)) => a.collect_range(min, max, path, out),
            Some(Node::Tree(t)) => {
                if t.v < max[dim] {
                    Self::collect_range_rec(t.right.as_deref(), min, max, dim, path, out);
                    if min[dim] <= t.v {
                        path[dim] = t.v;
                        if dim > 0 {
                            Self::collect_range_rec(t.equal.as_deref(), min, max, dim - 1, path, out);
                        } else if t.proper_weight() > 0 {
                            debug_assert!(t.proper_weight() == 1, "Missed point rep.");
                            out.push(Point::from(&path[..]));
                        }
                    }
                }
                if min[dim] <= t.v {
                    Self::collect_range_rec(t.left.as_deref(), min, max, dim, path, out);
                }
            }
        }
    }

    // ----- mutation -----------------------------------------------------

    /// Insert `p`, which must not be present.
    pub fn insert(&mut self, p: &[i32]) {
        debug_assert_eq!(p.len(), self.dim);
        debug_assert!(!self.contains(p), "Inserting point that is in the tree");
        let OrTree { dim, root, params } = self;
        Self::insert_rec(root, p, *dim - 1, params);
        debug_assert!(self.contains(p), "Insert failed");
    }

    fn insert_rec(slot: &mut Option<Box<Node>>, p: &[i32], dim: usize, params: &mut Params) {
        let is_tree = matches!(slot.as_deref(), Some(Node::Tree(_)));
        if !is_tree {
            Self::leaf_insert(slot, p, dim, params);
            return;
        }

        let (go_equal, unbalanced) = match slot.as_deref().unwrap() {
            Node::Tree(t) => {
                let sel = if p[dim] == t.v {
                    t.equal.as_deref()
                } else if p[dim] < t.v {
                    t.left.as_deref()
                } else {
                    t.right.as_deref()
                };
                let unbalanced = sel.map_or(false, |c| {
                    (1 + c.weight()) as f64 >= params.balance * (1 + t.w) as f64
                });
                (p[dim] == t.v, unbalanced)
            }
            Node::Leaf(_) => unreachable!(),
        };

        if unbalanced {
            Self::rebuild_merge(slot, p, dim, params);
            return;
        }

        let t = match slot.as_deref_mut().unwrap() {
            Node::Tree(t) => t,
            Node::Leaf(_) => unreachable!(),
        };
        t.w += 1;
        if go_equal {
            if dim > 0 {
                Self::insert_rec(&mut t.equal, p, dim - 1, params);
                Self::insert_rec(&mut t.lower, p, dim - 1, params);
            }
            return;
        }
        if dim > 0 {
            Self::insert_rec(&mut t.lower, p, dim - 1, params);
        }
        let child = if p[dim] < t.v { &mut t.left } else { &mut t.right };
        match child.as_deref() {
            Some(Node::Tree(_)) => Self::insert_rec(child, p, dim, params),
            _ => Self::leaf_insert(child, p, dim, params),
        }
    }

    /// Insert into an array leaf, creating it on demand and upgrading it to
    /// a built subtree once it carries twice the cutoff weight.
    fn leaf_insert(slot: &mut Option<Box<Node>>, p: &[i32], dim: usize, params: &mut Params) {
        if slot.is_none() {
            *slot = Some(Box::new(Node::Leaf(OrArray::new(dim + 1))));
        }
        let full = match slot.as_deref_mut().unwrap() {
            Node::Leaf(a) => {
                a.insert(p, 1);
                a.weight() as usize >= 2 * params.cut(dim + 1)
            }
            Node::Tree(_) => unreachable!(),
        };
        if full {
            Self::rebuild_plain(slot, dim, params);
        }
    }

    /// Delete `p`, which must be present.
    pub fn delete(&mut self, p: &[i32]) {
        debug_assert_eq!(p.len(), self.dim);
        debug_assert!(self.contains(p), "Deleting point that is not in the tree");
        let OrTree { dim, root, params } = self;
        Self::delete_rec(root, p, *dim - 1, params);
        debug_assert!(!self.contains(p), "Delete failed");
    }

    fn delete_rec(slot: &mut Option<Box<Node>>, p: &[i32], dim: usize, params: &mut Params) {
        debug_assert!(slot.is_some(), "Deleting on empty tree");
        if matches!(slot.as_deref(), Some(Node::Leaf(_))) {
            if Self::leaf_delete(slot, p) {
                *slot = None;
            }
            return;
        }

        let (go_equal, unbalanced) = match slot.as_deref().unwrap() {
            Node::Tree(t) => {
                let sel = if p[dim] == t.v {
                    t.equal.as_deref()
                } else if p[dim] < t.v {
                    t.left.as_deref()
                } else {
                    t.right.as_deref()
                };
                let mut unbalanced = sel.map_or(false, |c| {
                    (c.weight() - 1) as f64 >= params.balance * (t.w - 1) as f64
                });
                // Shrunk to cutoff size: collapse back into a leaf.
                if t.w as usize == params.cut(dim + 1) + 1 {
                    unbalanced = true;
                }
                (p[dim] == t.v, unbalanced)
            }
            Node::Leaf(_) => unreachable!(),
        };

        if unbalanced {
            Self::rebuild_remove(slot, p, dim, params);
            return;
        }

        let t = match slot.as_deref_mut().unwrap() {
            Node::Tree(t) => t,
            Node::Leaf(_) => unreachable!(),
        };
        t.w -= 1;
        debug_assert!(t.w > 0, "Deleting weight to 0");
        if go_equal {
            if dim > 0 {
                Self::delete_rec(&mut t.equal, p, dim - 1, params);
                Self::delete_rec(&mut t.lower, p, dim - 1, params);
            }
            return;
        }
        if dim > 0 {
            Self::delete_rec(&mut t.lower, p, dim - 1, params);
        }
        let child = if p[dim] < t.v { &mut t.left } else { &mut t.right };
        match child.as_deref() {
            Some(Node::Tree(_)) => Self::delete_rec(child, p, dim, params),
            Some(Node::Leaf(_)) => {
                if Self::leaf_delete(child, p) {
                    *child = None;
                }
            }
            None => debug_assert!(false, "Error p not in the tree."),
        }
    }

    fn leaf_delete(slot: &mut Option<Box<Node>>, p: &[i32]) -> bool {
        match slot.as_deref_mut() {
            Some(Node::Leaf(a)) => a.delete(p),
            _ => unreachable!(),
        }
    }

    // ----- diagnostics --------------------------------------------------

    /// Deep structural verification: weights, key order and cascade
    /// weights. Panics on the first violation.
    pub fn check(&self) {
        if let Some(root) = self.root.as_deref() {
            Self::check_node(root, self.dim - 1);
        }
    }

    fn check_node(node: &Node, dim: usize) {
        match node {
            Node::Leaf(a) => {
                a.check();
                assert!(a.dim() == dim + 1, "Width fail on array leaf");
            }
            Node::Tree(t) => {
                assert!(t.proper_weight() >= 0, "Negative proper weight.");
                if dim > 0 {
                    if t.proper_weight() > 0 {
                        let e = t.equal.as_deref().expect("Check lower dim.");
                        assert!(e.weight() == t.proper_weight(), "Equal weight check.");
                        Self::check_node(e, dim - 1);
                    }
                    let lo = t.lower.as_deref().expect("Check lower dim.");
                    assert!(lo.weight() == t.w, "Lower weight check.");
                    Self::check_node(lo, dim - 1);
                } else {
                    assert!(t.equal.is_none(), "Check lower dim.");
                    assert!(t.lower.is_none(), "Check lower dim.");
                }
                if let Some(l) = t.left.as_deref() {
                    if let Node::Tree(lt) = l {
                        assert!(lt.v < t.v, "Order verification");
                    }
                    Self::check_node(l, dim);
                }
                if let Some(r) = t.right.as_deref() {
                    if let Node::Tree(rt) = r {
                        assert!(rt.v > t.v, "Order verification");
                    }
                    Self::check_node(r, dim);
                }
            }
        }
    }

    /// Render the node graph as a Graphviz digraph, for eyeballing shapes
    /// in a debugger session.
    pub fn dot(&self) -> String {
        let mut out = String::from("digraph g {\nrankdir=LR;\nnode[shape=record];\n");
        let mut next = 0usize;
        if let Some(root) = self.root.as_deref() {
            Self::dot_rec(root, &mut next, &mut out);
        }
        out.push_str("}\n");
        out
    }

    fn dot_rec(node: &Node, next: &mut usize, out: &mut String) -> usize {
        let id = *next;
        *next += 1;
        match node {
            Node::Leaf(a) => {
                let recs: Vec<String> = a
                    .records()
                    .iter()
                    .map(|r| format!("{}x{:?}", r.w, r.p))
                    .collect();
                let _ = writeln!(
                    out,
                    "m{} [label=\"leaf | w: {} | {}\"];",
                    id,
                    a.weight(),
                    recs.join(" ")
                );
            }
            Node::Tree(t) => {
                let _ = writeln!(out, "m{} [label=\"w: {} | v: {}\"];", id, t.w, t.v);
                let children = [
                    ("l", t.left.as_deref()),
                    ("r", t.right.as_deref()),
                    ("e", t.equal.as_deref()),
                    ("o", t.lower.as_deref()),
                ];
                for (tag, child) in children.iter() {
                    if let Some(c) = child {
                        let cid = Self::dot_rec(c, next, out);
                        let _ = writeln!(out, "m{} -> m{} [label=\"{}\"];", id, cid, tag);
                    }
                }
            }
        }
        id
    }
}
