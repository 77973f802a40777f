//! Staged Matrix Products
//!
//! Run with: RUST_LOG=trace cargo run --example staged_matmul
//!
//! This example demonstrates:
//! - Building circuits from generators with `seq` and `par`
//! - Tracing a circuit into a runtime without doing numeric work
//! - Executing and re-executing the recorded tape

use monoidal_circuit::{Circuit, CircuitError, Ob, Runtime, RuntimeConfig};
use monoidal_core::Shape;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), CircuitError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Staged Matrix Products ===\n");

    // -------------------------------------------------------------------------
    // Building a Circuit
    // -------------------------------------------------------------------------
    println!("1. Building a Circuit");
    println!("---------------------");

    let shape = Shape::square(2);
    let operands = Circuit::ui().seq(
        Circuit::constant(shape, vec![1.0, 2.0, 3.0, 4.0])
            .par(Circuit::constant(shape, vec![5.0, 6.0, 7.0, 8.0])),
    );
    let product = operands.clone().seq(Circuit::mul());
    let gram = operands
        .seq(Circuit::id().par(Circuit::dual()))
        .seq(Circuit::mul());

    println!("product: {}", product);
    println!("gram:    {}", gram);
    println!("leaves:  {}", product.size());
    println!();

    // -------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------
    println!("2. Tracing");
    println!("----------");

    let mut rt = Runtime::with_config(RuntimeConfig::default().with_seed(0));
    let out = product.apply(Ob::Unit, &mut rt)?.as_matrix()?;
    println!("output wire: {}", out);
    println!("tape ({} instructions):", rt.tape().len());
    for (pc, instruction) in rt.tape().iter().enumerate() {
        println!("  {:>2}: {:?}", pc, instruction);
    }
    println!("before execute: {:?}", rt.read(&out)?);
    println!();

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------
    println!("3. Execution");
    println!("------------");

    rt.execute()?;
    println!("after execute:  {:?}", rt.read(&out)?);

    // mul accumulates into its destination.
    rt.execute()?;
    println!("after re-run:   {:?}", rt.read(&out)?);
    println!();

    // -------------------------------------------------------------------------
    // Shape Errors
    // -------------------------------------------------------------------------
    println!("4. Shape Errors");
    println!("---------------");

    rt.clear();
    let bad = Circuit::ui()
        .seq(Circuit::one(Shape::new(2, 3)).par(Circuit::one(Shape::new(2, 3))))
        .seq(Circuit::mul());
    match bad.apply(Ob::Unit, &mut rt) {
        Ok(wire) => println!("unexpected success: {}", wire),
        Err(err) => println!("rejected: {}", err),
    }
    // The operands traced before the failing mul are still there.
    println!(
        "left behind: {} buffers, {} instructions",
        rt.arena_len(),
        rt.tape().len()
    );

    rt.clear();
    println!(
        "after clear: {} buffers, {} instructions",
        rt.arena_len(),
        rt.tape().len()
    );
    let out = gram.apply(Ob::Unit, &mut rt)?.as_matrix()?;
    rt.execute()?;
    println!("A · Bᵀ = {:?}", rt.read(&out)?);

    Ok(())
}
