//! # Fixture Replay
//!
//! Operator records of the form `{operator, fst?, snd?, src?, expected}` are
//! replayed twice: directly against buffer kernels, and staged through a
//! runtime. Both paths must reproduce `expected` within `EPSILON`.

use monoidal_circuit::{MatrixHandle, Runtime};
use monoidal_core::Buffer;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "operator", rename_all = "camelCase")]
enum Example {
    Add { fst: Buffer, snd: Buffer, expected: Buffer },
    Mul { fst: Buffer, snd: Buffer, expected: Buffer },
    Point { fst: Buffer, snd: Buffer, expected: Buffer },
    Dual { src: Buffer, expected: Buffer },
    Relu { src: Buffer, expected: Buffer },
    Cos { src: Buffer, expected: Buffer },
    Sin { src: Buffer, expected: Buffer },
}

const EXAMPLES: &str = r#"[
    {"operator": "add",
     "fst": {"shape": [2, 2], "buffer": [1, 2, 3, 4]},
     "snd": {"shape": [2, 2], "buffer": [5, 6, 7, 8]},
     "expected": {"shape": [2, 2], "buffer": [6, 8, 10, 12]}},
    {"operator": "mul",
     "fst": {"shape": [2, 2], "buffer": [1, 2, 3, 4]},
     "snd": {"shape": [2, 2], "buffer": [5, 6, 7, 8]},
     "expected": {"shape": [2, 2], "buffer": [19, 22, 43, 50]}},
    {"operator": "mul",
     "fst": {"shape": [2, 3], "buffer": [1, 0, 2, -1, 3, 1]},
     "snd": {"shape": [3, 1], "buffer": [3, 2, 1]},
     "expected": {"shape": [2, 1], "buffer": [5, 4]}},
    {"operator": "point",
     "fst": {"shape": [2, 2], "buffer": [1, 2, 3, 4]},
     "snd": {"shape": [2, 2], "buffer": [5, 6, 7, 8]},
     "expected": {"shape": [2, 2], "buffer": [5, 12, 21, 32]}},
    {"operator": "dual",
     "src": {"shape": [2, 3], "buffer": [1, 2, 3, 4, 5, 6]},
     "expected": {"shape": [3, 2], "buffer": [1, 4, 2, 5, 3, 6]}},
    {"operator": "relu",
     "src": {"shape": [1, 4], "buffer": [-2, -0.5, 0, 3]},
     "expected": {"shape": [1, 4], "buffer": [0, 0, 0, 3]}},
    {"operator": "cos",
     "src": {"shape": [1, 3], "buffer": [0, 3.14159265, 1.5707963]},
     "expected": {"shape": [1, 3], "buffer": [1, -1, 0]}},
    {"operator": "sin",
     "src": {"shape": [1, 3], "buffer": [0, 3.14159265, 1.5707963]},
     "expected": {"shape": [1, 3], "buffer": [0, 0, 1]}}
]"#;

fn examples() -> Vec<Example> {
    serde_json::from_str(EXAMPLES).unwrap()
}

fn replay_buffer(example: &Example) -> (Buffer, &Buffer) {
    match example {
        Example::Add { fst, snd, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.add(fst, snd).unwrap();
            (actual, expected)
        }
        Example::Mul { fst, snd, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.mul(fst, snd).unwrap();
            (actual, expected)
        }
        Example::Point { fst, snd, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.point(fst, snd).unwrap();
            (actual, expected)
        }
        Example::Dual { src, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.dual(src).unwrap();
            (actual, expected)
        }
        Example::Relu { src, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.relu(src).unwrap();
            (actual, expected)
        }
        Example::Cos { src, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.cos(src).unwrap();
            (actual, expected)
        }
        Example::Sin { src, expected } => {
            let mut actual = Buffer::new(expected.shape());
            actual.sin(src).unwrap();
            (actual, expected)
        }
    }
}

fn constant(rt: &mut Runtime, buffer: &Buffer) -> MatrixHandle {
    rt.constant(buffer.shape(), buffer.as_slice().to_vec()).unwrap()
}

fn replay_runtime<'a>(rt: &mut Runtime, example: &'a Example) -> (MatrixHandle, &'a Buffer) {
    match example {
        Example::Add { fst, snd, expected } => {
            let (a, b) = (constant(rt, fst), constant(rt, snd));
            (rt.add(&a, &b).unwrap(), expected)
        }
        Example::Mul { fst, snd, expected } => {
            let (a, b) = (constant(rt, fst), constant(rt, snd));
            (rt.mul(&a, &b).unwrap(), expected)
        }
        Example::Point { fst, snd, expected } => {
            let (a, b) = (constant(rt, fst), constant(rt, snd));
            (rt.point(&a, &b).unwrap(), expected)
        }
        Example::Dual { src, expected } => {
            let a = constant(rt, src);
            (rt.dual(&a).unwrap(), expected)
        }
        Example::Relu { src, expected } => {
            let a = constant(rt, src);
            (rt.relu(&a).unwrap(), expected)
        }
        Example::Cos { src, expected } => {
            let a = constant(rt, src);
            (rt.cos(&a).unwrap(), expected)
        }
        Example::Sin { src, expected } => {
            let a = constant(rt, src);
            (rt.sin(&a).unwrap(), expected)
        }
    }
}

#[test]
fn test_buffer_replay() {
    for example in examples() {
        let (actual, expected) = replay_buffer(&example);
        assert!(
            actual.equals(expected),
            "example: {:?}\nactual: {:?}",
            example,
            actual
        );
    }
}

#[test]
fn test_runtime_replay() {
    let mut rt = Runtime::new();
    for example in examples() {
        rt.clear();
        let (out, expected) = replay_runtime(&mut rt, &example);
        rt.execute().unwrap();

        let actual = rt.load(&out).unwrap();
        assert!(
            actual.equals(expected),
            "example: {:?}\nactual: {:?}",
            example,
            actual
        );
    }
}

#[test]
fn test_all_operators_covered() {
    let examples = examples();
    assert_eq!(examples.len(), 8);
    assert!(examples.iter().any(|e| matches!(e, Example::Dual { .. })));
    assert!(examples.iter().any(|e| matches!(e, Example::Sin { .. })));
}
