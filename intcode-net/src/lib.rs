//! # Intcode Net
//!
//! Orchestrates several machines over the public run API:
//! 1. A chain of amplifiers passes one signal through every machine
//! 2. A feedback chain loops the last output back into the first machine
//!    until the last machine halts
//! 3. The threaded chain does the same with one blocking task per machine
//! 4. A packet network boots one machine per address and routes
//!    `(dest, x, y)` triples between them, with a NAT watching for idleness
//!
//! Machines never share memory. Values only cross between them through each
//! machine's own input queue or output callback.

mod chain;
mod network;

pub use chain::{best_phases, run_feedback_threaded, Chain};
pub use network::{Nat, Network, NetworkConfig, NetworkEvent, Packet, Round, StopCondition, NAT_ADDRESS};
