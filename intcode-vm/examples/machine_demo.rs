//! # Machine Demo
//!
//! Runs a few programs through the intcode machine, showing the three ways
//! to drive it.

use intcode_vm::{listing, Machine, Program, Result};
use std::sync::mpsc;

const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

fn main() -> Result<()> {
    println!("=== Intcode Machine Demo ===\n");

    demo_run_to_halt()?;
    demo_pause_on_input()?;
    demo_output_callback()?;

    Ok(())
}

fn demo_run_to_halt() -> Result<()> {
    println!("--- Demo 1: Run to halt ---");

    let program: Program = QUINE.parse()?;
    println!("{}\n", listing(program.as_slice()));

    let mut machine = Machine::new(program.clone());
    machine.run_to_halt([])?;
    let outputs = machine.drain_output();
    println!("outputs: {:?}", outputs);
    println!("reproduces itself: {}\n", outputs == program.as_slice());
    Ok(())
}

fn demo_pause_on_input() -> Result<()> {
    println!("--- Demo 2: Pause on input ---");

    // Doubles every value it reads, forever
    let mut machine = Machine::parse("3,11,1002,11,2,11,4,11,1105,1,0")?;
    for value in [1, 20, 300] {
        let doubled = machine.run_until_input([value])?;
        println!("{} -> {:?} ({})", value, doubled, machine.state());
    }
    println!();
    Ok(())
}

fn demo_output_callback() -> Result<()> {
    println!("--- Demo 3: Output callback ---");

    let (tx, rx) = mpsc::channel();
    let mut machine = Machine::parse("104,1125899906842624,99")?.with_output(move |value| {
        let _ = tx.send(value);
    });
    machine.run_to_halt([])?;

    for value in rx.try_iter() {
        println!("received {}", value);
    }
    Ok(())
}
