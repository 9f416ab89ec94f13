#![cfg(feature = "parallel")]

mod common;

use adtape::{BinaryOp, Evaluator, OpCode, Recorder, Tape};
use common::*;

fn points(n: usize, count: usize) -> Vec<Vec<f64>> {
    (0..count)
        .map(|k| (0..n).map(|j| 0.1 * (k + j) as f64 - 1.0).collect())
        .collect()
}

fn multi_output() -> Tape<f64> {
    // (x0 x1, x1 x2, sin x0)
    let mut rec = Recorder::<f64>::new();
    let x = rec.independent(3);
    let a = rec.binary(BinaryOp::Mul, x[0].into(), x[1].into());
    let b = rec.binary(BinaryOp::Mul, x[1].into(), x[2].into());
    let s = rec.unary(OpCode::Sin, x[0]);
    rec.finalize(&[a, b, s])
}

#[test]
fn gradient_batch_matches_serial() {
    let tape = rosenbrock_tape(4).into_shared();
    let xs = points(4, 100);
    let parallel = tape.gradient_batch_par(&xs).unwrap();

    let mut ev = Evaluator::new(tape.clone());
    for (x, p) in xs.iter().zip(&parallel) {
        let serial = ev.gradient(x).unwrap();
        assert_eq!(&serial, p, "at {x:?}");
    }
}

#[test]
fn jacobian_batch_matches_serial() {
    let tape = multi_output().into_shared();
    let xs = points(3, 50);
    let parallel = tape.jacobian_batch_par(&xs).unwrap();

    let mut ev = Evaluator::new(tape.clone());
    for (x, p) in xs.iter().zip(&parallel) {
        assert_eq!(&ev.jacobian(x).unwrap(), p, "at {x:?}");
    }
}

#[test]
fn plug_in_calls_run_on_every_worker() {
    let tape = add_mul_tape().into_shared();
    let xs = points(4, 64);
    let jacs = tape.jacobian_batch_par(&xs).unwrap();
    for (x, j) in xs.iter().zip(&jacs) {
        assert_eq!(j, &vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, x[3], x[2]]);
    }
}

#[test]
fn evaluators_on_plain_threads_share_one_tape() {
    let tape = rosenbrock_tape(3).into_shared();
    let handles: Vec<_> = (0..4)
        .map(|k| {
            let tape = tape.clone();
            std::thread::spawn(move || {
                let mut ev = Evaluator::new(tape);
                ev.gradient(&[k as f64, 1.0, 2.0]).unwrap()
            })
        })
        .collect();
    let mut ev = Evaluator::new(tape);
    for (k, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), ev.gradient(&[k as f64, 1.0, 2.0]).unwrap());
    }
}

#[test]
fn first_bad_point_fails_the_batch() {
    let tape = rosenbrock_tape(2).into_shared();
    let mut xs = points(2, 8);
    xs[5].push(0.0);
    assert!(tape.gradient_batch_par(&xs).is_err());
}
