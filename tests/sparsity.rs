//! Tests for Jacobian and Hessian sparsity: both set encodings, both
//! directions, and the ops that need special handling (plug-ins,
//! conditionals, arrays).

mod common;

use adtape::{
    identity, BinaryOp, CompareOp, HessianPattern, JacobianPattern, ListSet, OpCode, PackSet, Recorder, SetVector,
    SparsityEncoding, Tape,
};
use common::*;

fn cross_products() -> Tape<f64> {
    // y = (x0 x2, x1 x3)
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(4);
    let a = rec.binary(BinaryOp::Mul, x[0].into(), x[2].into());
    let b = rec.binary(BinaryOp::Mul, x[1].into(), x[3].into());
    rec.finalize(&[a, b])
}

fn mixed() -> Tape<f64> {
    // y = x0 x1 + sin(x2) + 3 x3
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(4);
    let three = rec.append_constant(3.0);
    let p = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
    let s = rec.unary(OpCode::Sin, x[2]);
    let l = rec.binary(BinaryOp::Mul, three.into(), x[3].into());
    let y = rec.binary(BinaryOp::Add, p.into(), s.into());
    let y = rec.binary(BinaryOp::Add, y.into(), l.into());
    rec.finalize(&[y])
}

fn sets<S: SetVector>(s: &S) -> Vec<Vec<usize>> {
    (0..s.n_set()).map(|i| s.elements(i)).collect()
}

// ── Jacobian ──

#[test]
fn forward_jacobian_of_cross_products() {
    let tape = cross_products();
    let pack: PackSet = tape.for_jac_sparsity(&identity::<PackSet>(4)).unwrap();
    assert_eq!(sets(&pack), vec![vec![0, 2], vec![1, 3]]);
    let list: ListSet = tape.for_jac_sparsity(&identity::<ListSet>(4)).unwrap();
    assert_eq!(sets(&list), sets(&pack));
}

#[test]
fn reverse_jacobian_is_the_transpose() {
    let tape = cross_products();
    let rev: ListSet = tape.rev_jac_sparsity(&identity::<ListSet>(2)).unwrap();
    assert_eq!(sets(&rev), vec![vec![0], vec![1], vec![0], vec![1]]);
    assert_eq!(
        tape.jacobian_pattern(SparsityEncoding::Pack).unwrap(),
        JacobianPattern::new(2, 4, [(0, 0), (0, 2), (1, 1), (1, 3)])
    );
    assert_eq!(
        tape.jacobian_pattern(SparsityEncoding::List).unwrap(),
        tape.jacobian_pattern(SparsityEncoding::Auto).unwrap()
    );
}

#[test]
fn seed_columns_compress_independents() {
    // one seed column standing for x0 and x1 together
    let tape = cross_products();
    let mut seed = PackSet::new(4, 2);
    seed.add_element(0, 0);
    seed.add_element(1, 0);
    seed.add_element(3, 1);
    let s: PackSet = tape.for_jac_sparsity(&seed).unwrap();
    assert_eq!(sets(&s), vec![vec![0], vec![0, 1]]);
}

#[test]
fn seed_with_the_wrong_number_of_sets_is_rejected() {
    let tape = cross_products();
    let seed = identity::<PackSet>(3);
    assert!(tape.for_jac_sparsity(&seed).is_err());
    assert!(tape.rev_jac_sparsity(&seed).is_err());
}

#[test]
fn conditional_expression_depends_on_branches_only() {
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(4);
    let y = rec.cond_exp(CompareOp::Le, x[0].into(), x[1].into(), x[2].into(), x[3].into());
    let tape = rec.finalize(&[y]);
    let s: PackSet = tape.for_jac_sparsity(&identity::<PackSet>(4)).unwrap();
    assert_eq!(sets(&s), vec![vec![2, 3]]);
    let r: PackSet = tape.rev_jac_sparsity(&identity::<PackSet>(1)).unwrap();
    assert_eq!(sets(&r), vec![vec![], vec![], vec![0], vec![0]]);
}

#[test]
fn plug_in_reports_its_own_pattern() {
    let tape = add_mul_tape();
    let s: ListSet = tape.for_jac_sparsity(&identity::<ListSet>(4)).unwrap();
    assert_eq!(sets(&s), vec![vec![0, 1], vec![2, 3]]);
    let r: ListSet = tape.rev_jac_sparsity(&identity::<ListSet>(2)).unwrap();
    assert_eq!(sets(&r), vec![vec![0], vec![0], vec![1], vec![1]]);
}

#[test]
fn variable_index_store_reaches_every_load() {
    // a = [0, 0]; a[x0] = x1; y = (a[0], a[1] * x2)
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(3);
    let zero = rec.append_constant(0.0);
    let one = rec.append_constant(1.0);
    let a = rec.new_vec_ad(&[zero, zero]);
    rec.store(a, x[0].into(), x[1].into());
    let y0 = rec.load(a, zero.into());
    let l1 = rec.load(a, one.into());
    let y1 = rec.binary(BinaryOp::Mul, l1.into(), x[2].into());
    let tape = rec.finalize(&[y0, y1]);

    let s: PackSet = tape.for_jac_sparsity(&identity::<PackSet>(3)).unwrap();
    assert!(s.is_element(0, 1));
    assert!(s.is_element(1, 1));
    assert!(s.is_element(1, 2));
    // the index has a zero derivative
    assert!(!s.is_element(0, 0));
    let r: PackSet = tape.rev_jac_sparsity(&identity::<PackSet>(2)).unwrap();
    assert_eq!(JacobianPattern::from_col_sets(&r), JacobianPattern::from_row_sets(&s));
}

#[test]
fn constant_index_store_stays_in_its_element() {
    // a = [0, 0]; a[1] = x0; y = (a[0], a[1])
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(1);
    let zero = rec.append_constant(0.0);
    let one = rec.append_constant(1.0);
    let a = rec.new_vec_ad(&[zero, zero]);
    rec.store(a, one.into(), x[0].into());
    let y0 = rec.load(a, zero.into());
    let y1 = rec.load(a, one.into());
    let tape = rec.finalize(&[y0, y1]);
    let s: ListSet = tape.for_jac_sparsity(&identity::<ListSet>(1)).unwrap();
    assert_eq!(sets(&s), vec![vec![], vec![0]]);
}

// ── Hessian ──

#[test]
fn forward_and_reverse_hessian_agree() {
    let tape = mixed();
    let expected = HessianPattern::new(4, [(1, 0), (2, 2)]);
    let all = [true; 4];
    assert_eq!(tape.for_hes_sparsity::<PackSet>(&all, &[true]).unwrap(), expected);
    assert_eq!(tape.for_hes_sparsity::<ListSet>(&all, &[true]).unwrap(), expected);

    let h: ListSet = tape.rev_hes_sparsity(&identity::<ListSet>(4), &[true]).unwrap();
    assert_eq!(HessianPattern::from_sets(&h), expected);
    assert_eq!(tape.hessian_pattern(&[true], SparsityEncoding::Auto).unwrap(), expected);
}

#[test]
fn domain_selection_restricts_the_forward_hessian() {
    let tape = mixed();
    let h = tape
        .for_hes_sparsity::<PackSet>(&[true, true, false, false], &[true])
        .unwrap();
    assert_eq!(h, HessianPattern::new(4, [(1, 0)]));
}

#[test]
fn range_selection_drops_unselected_outputs() {
    // y0 = x0², y1 = x1 x2
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(3);
    let a = rec.binary(BinaryOp::Mul, x[0].into(), x[0].into());
    let b = rec.binary(BinaryOp::Mul, x[1].into(), x[2].into());
    let tape = rec.finalize(&[a, b]);
    assert_eq!(
        tape.hessian_pattern(&[true, false], SparsityEncoding::Pack).unwrap(),
        HessianPattern::new(3, [(0, 0)])
    );
    assert_eq!(
        tape.hessian_pattern(&[false, true], SparsityEncoding::List).unwrap(),
        HessianPattern::new(3, [(2, 1)])
    );
    assert_eq!(tape.hessian_pattern(&[false, false], SparsityEncoding::Pack).unwrap().nnz(), 0);
}

#[test]
fn division_couples_numerator_and_denominator() {
    // y = x0 / x1: d²/dx0² = 0, the other two entries nonzero
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(2);
    let y = rec.binary(BinaryOp::Div, x[0].into(), x[1].into());
    let tape = rec.finalize(&[y]);
    let expected = HessianPattern::new(2, [(1, 0), (1, 1)]);
    assert_eq!(tape.hessian_pattern(&[true], SparsityEncoding::Pack).unwrap(), expected);
    assert_eq!(tape.for_hes_sparsity::<PackSet>(&[true, true], &[true]).unwrap(), expected);
}

#[test]
fn plug_in_hessian_uses_its_callback() {
    let tape = add_mul_tape();
    let expected = HessianPattern::new(4, [(3, 2)]);
    assert_eq!(tape.hessian_pattern(&[false, true], SparsityEncoding::List).unwrap(), expected);
    assert_eq!(tape.for_hes_sparsity::<ListSet>(&[true; 4], &[false, true]).unwrap(), expected);
    assert_eq!(tape.hessian_pattern(&[true, false], SparsityEncoding::Pack).unwrap().nnz(), 0);
}

#[test]
fn rosenbrock_hessian_is_tridiagonal() {
    let n = 6;
    let tape = rosenbrock_tape(n);
    let h = tape.hessian_pattern(&[true], SparsityEncoding::Auto).unwrap();
    for i in 0..n {
        for j in 0..=i {
            assert_eq!(h.contains(i, j), i - j <= 1, "({i}, {j})");
        }
    }
}
