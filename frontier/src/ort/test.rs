use super::*;

fn unique_points(rng: &mut fastrand::Rng, n: usize, dim: usize, span: i32) -> Vec<Vec<i32>> {
    let mut pts: Vec<Vec<i32>> = (0..4 * n)
        .map(|_| (0..dim).map(|_| rng.i32(0..span)).collect())
        .collect();
    pts.sort();
    pts.dedup();
    // Shuffle so insertion order carries no structure.
    for i in (1..pts.len()).rev() {
        pts.swap(i, rng.usize(..=i));
    }
    pts.truncate(n);
    pts
}

fn brute_count(points: &[Vec<i32>], c: &[i32]) -> i32 {
    points
        .iter()
        .filter(|p| p.iter().zip(c).all(|(a, b)| a < b))
        .count() as i32
}

fn brute_above(points: &[Vec<i32>], c: &[i32]) -> usize {
    points
        .iter()
        .filter(|p| p.iter().zip(c).all(|(a, b)| a > b))
        .count()
}

fn brute_range(points: &[Vec<i32>], min: &[i32], max: &[i32]) -> usize {
    points
        .iter()
        .filter(|p| {
            p.iter()
                .zip(min.iter().zip(max))
                .all(|(x, (lo, hi))| lo <= x && x < hi)
        })
        .count()
}

#[test]
fn round_trip_is_order_insensitive() {
    let mut rng = fastrand::Rng::with_seed(7);
    let pts = unique_points(&mut rng, 120, 3, 12);

    let mut t = OrTree::with_config(
        3,
        TreeConfig {
            seed: Some(11),
            ..TreeConfig::default()
        },
    );
    for p in &pts {
        t.insert(p);
        assert!(t.contains(p));
    }
    t.check();
    assert_eq!(t.weight() as usize, pts.len());

    // Delete in a different order than inserted.
    let mut order: Vec<usize> = (0..pts.len()).collect();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.usize(..=i));
    }
    for (k, &i) in order.iter().enumerate() {
        t.delete(&pts[i]);
        assert!(!t.contains(&pts[i]));
        if k % 16 == 0 {
            t.check();
        }
    }
    assert_eq!(t.weight(), 0);
    assert!(t.is_empty());
}

#[test]
fn count_agrees_with_collect_below() {
    let mut rng = fastrand::Rng::with_seed(23);
    let pts = unique_points(&mut rng, 90, 3, 9);
    let mut t = OrTree::new(3);
    for p in &pts {
        t.insert(p);
    }

    for _ in 0..200 {
        let c: Vec<i32> = (0..3).map(|_| rng.i32(-1..11)).collect();
        let count = t.count_dominating(&c);
        let below = t.collect_below(&c);
        assert_eq!(count, below.len() as i32);
        assert_eq!(count, brute_count(&pts, &c));
        assert!(below.iter().all(|p| (0..3).all(|k| p.get(k) < c[k])));
    }
}

#[test]
fn collects_cover_their_regions() {
    let mut rng = fastrand::Rng::with_seed(41);
    let pts = unique_points(&mut rng, 80, 4, 7);
    let mut t = OrTree::new(4);
    for p in &pts {
        t.insert(p);
    }

    for _ in 0..120 {
        let c: Vec<i32> = (0..4).map(|_| rng.i32(-1..9)).collect();
        assert_eq!(t.collect_above(&c).len(), brute_above(&pts, &c));

        let mut min: Vec<i32> = (0..4).map(|_| rng.i32(-1..9)).collect();
        let mut max: Vec<i32> = (0..4).map(|_| rng.i32(-1..9)).collect();
        for k in 0..4 {
            if min[k] > max[k] {
                std::mem::swap(&mut min[k], &mut max[k]);
            }
        }
        let hits = t.collect_range(&min, &max);
        assert_eq!(hits.len(), brute_range(&pts, &min, &max));
        // Half open on the high side.
        assert!(hits
            .iter()
            .all(|p| (0..4).all(|k| min[k] <= p.get(k) && p.get(k) < max[k])));
    }
}

#[test]
fn range_high_side_is_exclusive() {
    let mut t = OrTree::new(2);
    t.insert(&[2, 2]);
    t.insert(&[3, 3]);
    assert_eq!(t.collect_range(&[2, 2], &[3, 3]).len(), 1);
    assert_eq!(t.collect_range(&[2, 2], &[4, 4]).len(), 2);
    assert_eq!(t.collect_range(&[3, 3], &[3, 3]).len(), 0);
}

#[test]
fn interleaved_edits_keep_the_structure_sound() {
    let mut rng = fastrand::Rng::with_seed(3);
    let pts = unique_points(&mut rng, 150, 3, 10);
    let mut t = OrTree::new(3);
    let mut live: Vec<usize> = Vec::new();

    for (i, p) in pts.iter().enumerate() {
        t.insert(p);
        live.push(i);
        if rng.u8(..) % 3 == 0 && live.len() > 1 {
            let k = rng.usize(..live.len());
            let gone = live.swap_remove(k);
            t.delete(&pts[gone]);
        }
    }
    t.check();
    assert_eq!(t.weight() as usize, live.len());
    for &i in &live {
        assert!(t.contains(&pts[i]));
    }

    // Shrink until everything lives in a single leaf again.
    while live.len() > 2 {
        let gone = live.swap_remove(rng.usize(..live.len()));
        t.delete(&pts[gone]);
    }
    t.check();
    for &i in &live {
        assert!(t.contains(&pts[i]));
    }
}

#[test]
fn pivot_seed_pins_the_shape() {
    let mut rng = fastrand::Rng::with_seed(99);
    let pts = unique_points(&mut rng, 60, 3, 8);
    let cfg = TreeConfig {
        seed: Some(5),
        ..TreeConfig::default()
    };
    let mut a = OrTree::with_config(3, cfg.clone());
    let mut b = OrTree::with_config(3, cfg);
    for p in &pts {
        a.insert(p);
        b.insert(p);
    }
    assert_eq!(a.dot(), b.dot());
    assert!(a.dot().contains("digraph"));
}

#[test]
fn duplicate_projections_cascade_as_multiplicities() {
    // Points identical on the lower coordinates stress the multiplicity
    // handling of the lower cascades.
    let mut t = OrTree::new(3);
    let mut pts = Vec::new();
    for top in 0..12 {
        pts.push(vec![1, 2, top]);
        pts.push(vec![2, 1, top]);
    }
    for p in &pts {
        t.insert(p);
    }
    t.check();
    assert_eq!(t.count_dominating(&[3, 3, 12]), 24);
    assert_eq!(t.count_dominating(&[2, 3, 12]), 12);
    assert_eq!(t.count_dominating(&[3, 3, 6]), 12);
    for p in &pts {
        t.delete(p);
    }
    assert!(t.is_empty());
}

#[test]
fn sentinel_coordinates_query_cleanly() {
    let mut t = OrTree::new(2);
    t.insert(&[-1, -1]); // the origin point of a zeroth front
    t.insert(&[0, 3]);
    t.insert(&[3, 0]);
    assert_eq!(t.count_dominating(&[1, 4]), 2);
    assert!(t.contains(&[-1, -1]));
    assert_eq!(t.collect_above(&[-1, -1]).len(), 2);
    assert_eq!(t.collect_below(&[0, 0]).len(), 1);
}
