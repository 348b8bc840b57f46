use super::*;
use crate::naive::naive_mlcs;

fn strings_of(m: &Mlcs) -> Vec<Vec<u8>> {
    (0..m.dim()).map(|j| m.string(j).bytes()).collect()
}

fn assert_oracle(m: &Mlcs) {
    let strings = strings_of(m);
    assert_eq!(
        m.len(),
        naive_mlcs(&strings),
        "engine disagrees with the reference on {:?}",
        strings
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect::<Vec<_>>()
    );
    m.check_fronts();
}

fn feed(m: &mut Mlcs, j: usize, s: &[u8]) {
    for &c in s {
        m.append(j, c);
        assert_oracle(m);
    }
}

#[test]
fn single_common_letter() {
    let mut m = Mlcs::new(2, 2);
    m.append(0, b'A');
    assert_eq!(m.len(), 0); // the other string is still empty
    assert_oracle(&m);
    m.append(1, b'A');
    assert_eq!(m.len(), 1);
    assert_oracle(&m);
    m.append(0, b'B');
    assert_eq!(m.len(), 1);
    assert_oracle(&m);
    m.append(1, b'A');
    assert_eq!(m.len(), 1);
    assert_oracle(&m);
}

#[test]
fn crossing_letters_then_pops() {
    let mut m = Mlcs::new(2, 2);
    m.append(0, b'A');
    assert_eq!(m.len(), 0);
    m.append(0, b'B');
    assert_eq!(m.len(), 0);
    m.append(1, b'B');
    assert_eq!(m.len(), 1);
    m.append(1, b'A');
    assert_eq!(m.len(), 1);
    assert_oracle(&m);

    m.pop(0); // "B" vs "BA"
    assert_eq!(m.len(), 1);
    assert_oracle(&m);
    m.pop(0); // "" vs "BA"
    assert_eq!(m.len(), 0);
    assert_oracle(&m);
}

#[test]
fn three_strings_grow_in_lockstep() {
    let mut m = Mlcs::new(3, 2);
    for step in 0..4 {
        let c = if step % 2 == 0 { b'A' } else { b'B' };
        for j in 0..3 {
            m.append(j, c);
            assert_oracle(&m);
        }
    }
    assert_eq!(m.len(), 4);
}

#[test]
fn four_strings_with_pop_and_regrow() {
    let corpus: [&[u8]; 4] = [
        b"BBBABAAAAABBBACAABCBB",
        b"CAACACACBABBACBCAC",
        b"ACCBACABBACCCBABACCA",
        b"ACAAAACBBACAABCCCCCB",
    ];
    let mut m = Mlcs::new(4, 3);
    for (j, s) in corpus.iter().enumerate() {
        feed(&mut m, j, s);
    }
    m.pop(3);
    assert_oracle(&m);
    m.append(2, b'C');
    assert_oracle(&m);
}

#[test]
fn popping_a_string_to_nothing() {
    let mut m = Mlcs::new(2, 2);
    let mut rng = fastrand::Rng::with_seed(17);
    for _ in 0..24 {
        m.append(0, b'A' + rng.u8(..2));
        m.append(1, b'A' + rng.u8(..2));
    }
    assert_oracle(&m);

    while !m.string(0).is_empty() {
        m.pop(0);
        assert_oracle(&m);
    }
    assert_eq!(m.len(), 0);

    // The engine keeps working after a string has been emptied.
    m.append(0, b'B');
    assert_oracle(&m);
}

#[test]
fn fronts_stay_collapsed_while_any_string_is_empty() {
    let mut m = Mlcs::new(3, 2);
    m.append(0, b'A');
    m.append(0, b'B');
    m.append(1, b'A');
    assert_eq!(m.len(), 0);
    assert_oracle(&m);

    m.append(2, b'A'); // the last empty string fills in
    assert_eq!(m.len(), 1);
    assert_oracle(&m);

    m.pop(2); // and empties again
    assert_eq!(m.len(), 0);
    assert_oracle(&m);
}

#[test]
fn popping_a_letter_absent_elsewhere_leaves_fronts_alone() {
    let mut m = Mlcs::new(2, 3);
    feed(&mut m, 0, b"CA");
    feed(&mut m, 1, b"AB");
    assert_eq!(m.len(), 1);
    m.pop(0); // 'C' never matched anything
    assert_eq!(m.len(), 1);
    assert_oracle(&m);
}

#[test]
fn layer_dump_lists_every_rank() {
    let mut m = Mlcs::new(2, 2);
    feed(&mut m, 0, b"AB");
    feed(&mut m, 1, b"AB");
    let dump = format!("{:?}", m);
    assert!(dump.contains("@ 0 :"));
    assert!(dump.contains("@ 2 :"));
}

fn stress(sigma: u8, n: usize, dim: usize, ops: usize, seed: u64) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut m = Mlcs::new(dim, sigma as usize);
    for _ in 0..ops {
        let t = rng.usize(..dim);
        let mut grow = rng.bool();
        if m.string(t).len() < n {
            grow = true;
        }
        if m.string(t).len() > 2 * n {
            grow = false;
        }
        if grow {
            m.append(t, b'A' + rng.u8(..sigma));
        } else {
            m.pop(t);
        }
        assert_oracle(&m);
    }
}

#[test]
fn stress_binary_alphabet() {
    stress(2, 20, 4, 400, 1);
}

#[test]
fn stress_ternary_alphabet() {
    stress(3, 10, 4, 100, 2);
}

#[test]
fn stress_wide_alphabet() {
    stress(10, 40, 4, 5, 3);
}
