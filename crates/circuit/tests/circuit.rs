//! # Circuit Tests
//!
//! End-to-end tests: build a circuit, trace it into a runtime, execute the
//! tape and read the results back through handles.

use monoidal_circuit::{
    Circuit, CircuitError, Instruction, MatrixHandle, Ob, Opcode, Parameter, Runtime,
    RuntimeConfig,
};
use monoidal_core::{CoreError, Shape};
use proptest::prelude::*;

fn run(circuit: &Circuit, rt: &mut Runtime) -> MatrixHandle {
    let out = circuit.apply(Ob::Unit, rt).unwrap();
    rt.execute().unwrap();
    out.as_matrix().unwrap()
}

fn pair(shape: Shape, fst: Vec<f64>, snd: Vec<f64>) -> Circuit {
    Circuit::ui()
        .seq(Circuit::constant(shape, fst).par(Circuit::constant(shape, snd)))
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_copy_then_add_doubles() {
    let mut rt = Runtime::new();
    let c = Circuit::constant(Shape::new(1, 2), vec![3.0, 4.0])
        .seq(Circuit::copy())
        .seq(Circuit::add());
    let out = run(&c, &mut rt);

    assert_eq!(rt.read(&out).unwrap(), &[6.0, 8.0]);
    // constant + add; copy records nothing
    assert_eq!(rt.tape().len(), 2);
    assert_eq!(rt.arena_len(), 2);
}

#[test]
fn test_copy_aliases_one_slot() {
    let mut rt = Runtime::new();
    let c = Circuit::one(Shape::new(2, 2)).seq(Circuit::copy());
    let out = c.apply(Ob::Unit, &mut rt).unwrap();
    let (fst, snd) = out.as_matrix_pair().unwrap();
    assert_eq!(fst.uid(), snd.uid());
}

#[test]
fn test_parallel_binary_ops() {
    let shape = Shape::square(2);
    let a = vec![1.0, 2.0, 3.0, 4.0];
    let b = vec![5.0, 6.0, 7.0, 8.0];

    let cases = [
        (Circuit::add(), [6.0, 8.0, 10.0, 12.0]),
        (Circuit::mul(), [19.0, 22.0, 43.0, 50.0]),
        (Circuit::point(), [5.0, 12.0, 21.0, 32.0]),
    ];
    for (op, expected) in cases {
        let mut rt = Runtime::new();
        let c = pair(shape, a.clone(), b.clone()).seq(op);
        let out = run(&c, &mut rt);
        assert_eq!(rt.read(&out).unwrap(), &expected);
    }
}

#[test]
fn test_braid_reorders_operands() {
    let shape = Shape::new(1, 2);
    let mut rt = Runtime::new();
    let c = pair(shape, vec![1.0, 2.0], vec![3.0, 4.0])
        .seq(Circuit::braid())
        .seq(Circuit::dual().par(Circuit::id()))
        .seq(Circuit::mul());
    let out = run(&c, &mut rt);

    // [3 4]ᵀ · [1 2]
    assert_eq!(out.shape(), Shape::square(2));
    assert_eq!(rt.read(&out).unwrap(), &[3.0, 6.0, 4.0, 8.0]);
}

#[test]
fn test_transpose_scenario() {
    let mut rt = Runtime::new();
    let c = Circuit::constant(Shape::square(2), vec![1.0, 2.0, 3.0, 4.0]).seq(Circuit::dual());
    let out = run(&c, &mut rt);
    assert_eq!(rt.read(&out).unwrap(), &[1.0, 3.0, 2.0, 4.0]);
}

#[test]
fn test_unit_wires_round_trip() {
    let mut rt = Runtime::new();
    let c = Circuit::one(Shape::new(1, 3))
        .seq(Circuit::ui())
        .seq(Circuit::relu().par(Circuit::id()))
        .seq(Circuit::ue())
        .seq(Circuit::sumk(0));
    let out = run(&c, &mut rt);
    assert_eq!(rt.read(&out).unwrap(), &[3.0, 0.0, 0.0]);
}

#[test]
fn test_drop_discards_branch() {
    let mut rt = Runtime::new();
    let c = pair(Shape::new(1, 1), vec![2.0], vec![9.0])
        .seq(Circuit::id().par(Circuit::drop()))
        .seq(Circuit::ue())
        .seq(Circuit::cos());
    let out = run(&c, &mut rt);
    assert!((rt.read(&out).unwrap()[0] - 2.0f64.cos()).abs() < 1e-12);
}

#[test]
fn test_circuit_is_reusable_across_runtimes() {
    let c = Circuit::constant(Shape::new(1, 2), vec![-1.0, 1.0]).seq(Circuit::relu());
    let mut first = Runtime::new();
    let mut second = Runtime::new();
    let a = run(&c, &mut first);
    let b = run(&c, &mut second);
    assert_eq!(first.read(&a).unwrap(), second.read(&b).unwrap());
    assert!(second.read(&a).is_err());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_mismatched_shapes_fail_at_trace() {
    let mut rt = Runtime::new();
    let c = Circuit::ui()
        .seq(Circuit::one(Shape::new(2, 2)).par(Circuit::one(Shape::new(1, 2))))
        .seq(Circuit::add());
    let err = c.apply(Ob::Unit, &mut rt).unwrap_err();
    assert!(matches!(
        err,
        CircuitError::Shape(CoreError::ShapeMismatch { operator: "add", .. })
    ));
}

#[test]
fn test_failed_trace_keeps_earlier_operands() {
    let mut rt = Runtime::new();
    let c = Circuit::ui()
        .seq(Circuit::one(Shape::new(2, 3)).par(Circuit::one(Shape::new(2, 3))))
        .seq(Circuit::mul());
    assert!(c.apply(Ob::Unit, &mut rt).is_err());
    assert_eq!(rt.arena_len(), 2);
    assert_eq!(rt.tape().len(), 2);

    rt.clear();
    assert_eq!(rt.arena_len(), 0);
    assert!(rt.tape().is_empty());
}

#[test]
fn test_random_uniform_circuit_stays_in_range() {
    let mut rt = Runtime::with_config(RuntimeConfig::default().with_seed(11));
    let c = Circuit::random_uniform(Shape::new(4, 4), -3.0, 3.0);
    let out = run(&c, &mut rt);
    assert!(rt.read(&out).unwrap().iter().all(|x| (-3.0..3.0).contains(x)));

    let wide = Circuit::random_uniform(Shape::new(1, 4), -f64::MAX, f64::MAX);
    assert!(matches!(
        wide.apply(Ob::Unit, &mut rt),
        Err(CircuitError::Parameter { .. })
    ));
}

#[test]
fn test_mismatched_shapes_fail_at_execute_without_validation() {
    let mut rt = Runtime::with_config(RuntimeConfig::default().with_validate_on_trace(false));
    let c = Circuit::ui()
        .seq(Circuit::one(Shape::new(2, 3)).par(Circuit::one(Shape::new(2, 3))))
        .seq(Circuit::mul());
    let out = c.apply(Ob::Unit, &mut rt).unwrap().as_matrix().unwrap();

    let err = rt.execute().unwrap_err();
    assert!(matches!(
        err,
        CircuitError::Shape(CoreError::ShapeMismatch { operator: "mul", .. })
    ));
    assert_eq!(out.shape(), Shape::new(2, 3));
    assert_eq!(rt.read(&out).unwrap(), &[0.0; 6]);
}

#[test]
fn test_wrong_parameter_types() {
    let mut rt = Runtime::new();
    let c = Circuit::operator(
        Opcode::Constant,
        vec![Parameter::Values(vec![1.0]), Parameter::Shape(Shape::new(1, 1))],
    );
    let err = c.apply(Ob::Unit, &mut rt).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid parameters for circuit constant([1.0], 1x1)"
    );
}

#[test]
fn test_wire_errors() {
    let mut rt = Runtime::new();
    let err = Circuit::relu().apply(Ob::Unit, &mut rt).unwrap_err();
    assert_eq!(err.to_string(), "Expected a matrix, but got unit");

    let err = Circuit::ue().apply(Ob::Unit, &mut rt).unwrap_err();
    assert_eq!(err.to_string(), "Expected a pair, but got unit");
}

#[test]
fn test_cleared_runtime_rejects_old_wires() {
    let mut rt = Runtime::new();
    let wire = Circuit::one(Shape::new(1, 1)).apply(Ob::Unit, &mut rt).unwrap();
    rt.clear();
    assert!(matches!(
        Circuit::relu().apply(wire, &mut rt),
        Err(CircuitError::UnboundRuntime { .. })
    ));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_reexecute_accumulates_mul() {
    let mut rt = Runtime::new();
    let c = pair(
        Shape::square(2),
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
    )
    .seq(Circuit::mul());
    let out = run(&c, &mut rt);
    assert_eq!(rt.read(&out).unwrap(), &[19.0, 22.0, 43.0, 50.0]);

    rt.execute().unwrap();
    assert_eq!(rt.read(&out).unwrap(), &[38.0, 44.0, 86.0, 100.0]);
}

#[test]
fn test_reexecute_is_idempotent_without_mul() {
    let mut rt = Runtime::new();
    let c = pair(Shape::new(1, 2), vec![1.0, 2.0], vec![3.0, 4.0]).seq(Circuit::add());
    let out = run(&c, &mut rt);
    rt.execute().unwrap();
    assert_eq!(rt.read(&out).unwrap(), &[4.0, 6.0]);
}

#[test]
fn test_tape_is_inspectable() {
    let mut rt = Runtime::new();
    let c = pair(Shape::new(1, 1), vec![1.0], vec![2.0]).seq(Circuit::point());
    c.apply(Ob::Unit, &mut rt).unwrap();

    assert_eq!(
        rt.tape(),
        &[
            Instruction::Constant { dst: 0, values: vec![1.0] },
            Instruction::Constant { dst: 1, values: vec![2.0] },
            Instruction::Point { dst: 2, fst: 0, snd: 1 },
        ]
    );
}

#[test]
fn test_seeded_circuits_replay_identically() {
    let c = Circuit::random_uniform(Shape::new(2, 4), 0.0, 10.0);
    let config = RuntimeConfig::default().with_seed(7);

    let mut first = Runtime::with_config(config.clone());
    let mut second = Runtime::with_config(config);
    let a = run(&c, &mut first);
    let b = run(&c, &mut second);
    assert_eq!(first.read(&a).unwrap(), second.read(&b).unwrap());
}

proptest! {
    #[test]
    fn seq_with_id_adds_no_node(k in 0usize..4, width in 1usize..5) {
        let c = Circuit::one(Shape::new(1, width)).seq(Circuit::sumk(k));
        prop_assert_eq!(c.clone().seq(Circuit::id()), c.clone());
        prop_assert_eq!(Circuit::id().seq(c.clone()), c);
    }
}
