//! Incremental multiple longest common subsequence engine.
//!
//! The crate maintains the length of the MLCS of `d >= 2` strings while
//! letters are appended to their right ends and removed from their left
//! ends. The work horse is a layered family of Pareto fronts over
//! `d`-dimensional match points, each front indexed by a weight balanced
//! orthogonal range tree ([`ort::OrTree`]) with flat array leaves
//! ([`ora::OrArray`]).
//!
//! [`engine::Mlcs`] is the public entry point. [`naive`] holds the
//! quadratic reference used by the tests and the shell's check mode.

use ahash::AHasher;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

pub mod dynstr;
pub mod engine;
pub mod naive;
pub mod ora;
pub mod ort;
pub mod point;
pub mod queue;

pub type AHashMap<K, V> = HashMap<K, V, BuildHasherDefault<AHasher>>;
pub type AHashSet<T> = HashSet<T, BuildHasherDefault<AHasher>>;
