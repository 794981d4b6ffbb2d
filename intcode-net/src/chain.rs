//! Amplifier chains
//!
//! Every machine runs the same program and is seeded with its own phase
//! setting before the first signal arrives.

use intcode_vm::{Error, ErrorKind, Machine, MachineConfig, Program, Result, Word};
use log::{debug, info};
use tokio::sync::mpsc;

/// A row of machines over one program, one per phase setting
#[derive(Debug)]
pub struct Chain {
    machines: Vec<Machine>,
}

impl Chain {
    /// Build a chain with strict underrun handling.
    ///
    /// An amplifier reading past its queue means the composition is wrong,
    /// so the zero fallback is turned off.
    pub fn new(program: &Program, phases: &[Word]) -> Result<Self> {
        Self::with_config(program, phases, MachineConfig::strict())
    }

    pub fn with_config(program: &Program, phases: &[Word], config: MachineConfig) -> Result<Self> {
        if phases.is_empty() {
            return Err(Error::invalid_argument("a chain needs at least one phase setting")
                .with_operation("chain::new"));
        }

        let machines = phases
            .iter()
            .map(|&phase| {
                let mut machine = Machine::with_config(program.clone(), config);
                machine.feed(phase);
                machine
            })
            .collect();

        Ok(Self { machines })
    }

    /// Number of amplifiers
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Pass `input` once through every machine, each running to halt.
    pub fn run_serial(&mut self, input: Word) -> Result<Word> {
        let mut signal = input;
        for (i, machine) in self.machines.iter_mut().enumerate() {
            signal = machine
                .run_to_halt([signal])
                .map_err(|e| e.with_context("amplifier", i.to_string()))?
                .ok_or_else(|| silent_amplifier(i).with_operation("chain::run_serial"))?;
            machine.drain_output();
            debug!("amplifier {} -> {}", i, signal);
        }
        Ok(signal)
    }

    /// Loop the last machine's output back into the first until the last
    /// machine halts, then return its final output.
    ///
    /// Each pass runs every machine until its next output. A machine that
    /// halts instead leaves the signal untouched for its successor.
    pub fn run_feedback(&mut self, input: Word) -> Result<Word> {
        let last = self.machines.len() - 1;
        let mut signal = input;
        let mut passes = 0usize;

        loop {
            passes += 1;
            for (i, machine) in self.machines.iter_mut().enumerate() {
                let output = machine
                    .run_until_output([signal])
                    .map_err(|e| e.with_context("amplifier", i.to_string()))?;
                // The signal travels through the return value
                machine.drain_output();

                if machine.is_halted() {
                    if i == last {
                        info!("feedback chain settled after {} passes", passes);
                        return machine
                            .last_output()
                            .ok_or_else(|| silent_amplifier(i).with_operation("chain::run_feedback"));
                    }
                    continue;
                }

                if let Some(value) = output {
                    signal = value;
                }
            }
        }
    }

    /// Clear every machine and seed it with a new phase setting
    pub fn reseed(&mut self, phases: &[Word]) -> Result<()> {
        if phases.len() != self.machines.len() {
            return Err(Error::invalid_argument(format!(
                "expected {} phase settings, got {}",
                self.machines.len(),
                phases.len()
            ))
            .with_operation("chain::reseed"));
        }

        for (machine, &phase) in self.machines.iter_mut().zip(phases) {
            machine.reset();
            machine.feed(phase);
        }
        Ok(())
    }
}

fn silent_amplifier(index: usize) -> Error {
    Error::new(
        ErrorKind::Unexpected,
        format!("amplifier {} halted without producing output", index),
    )
    .with_context("amplifier", index.to_string())
}

// =============================================================================
// Phase search
// =============================================================================

/// Try every ordering of `candidates` and return the highest signal with the
/// phase settings that produced it. The chain input is always zero.
pub fn best_phases(program: &Program, candidates: &[Word], feedback: bool) -> Result<(Word, Vec<Word>)> {
    let mut chain = Chain::new(program, candidates)?;
    let mut best: Option<(Word, Vec<Word>)> = None;

    for phases in permutations(candidates) {
        chain.reseed(&phases)?;
        let signal = if feedback {
            chain.run_feedback(0)?
        } else {
            chain.run_serial(0)?
        };

        if best.as_ref().map_or(true, |(top, _)| signal > *top) {
            debug!("new best {} from {:?}", signal, phases);
            best = Some((signal, phases));
        }
    }

    best.ok_or_else(|| Error::invalid_argument("no phase candidates").with_operation("chain::best_phases"))
}

/// All orderings of `items`, Heap's algorithm
fn permutations(items: &[Word]) -> Vec<Vec<Word>> {
    let mut current = items.to_vec();
    let mut counters = vec![0; current.len()];
    let mut out = vec![current.clone()];

    let mut i = 1;
    while i < current.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            current.swap(j, i);
            out.push(current.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    out
}

// =============================================================================
// Threaded feedback
// =============================================================================

/// Feedback chain with each machine owned by its own blocking task.
///
/// Machine *i* reads from channel *i* through its input provider and writes
/// to channel *i + 1* (wrapping) through its output sink. The result matches
/// [`Chain::run_feedback`].
pub async fn run_feedback_threaded(program: &Program, phases: &[Word], input: Word) -> Result<Word> {
    if phases.is_empty() {
        return Err(Error::invalid_argument("a chain needs at least one phase setting")
            .with_operation("chain::run_feedback_threaded"));
    }

    let count = phases.len();
    let (senders, receivers): (Vec<_>, Vec<_>) =
        (0..count).map(|_| mpsc::unbounded_channel::<Word>()).unzip();

    for (sender, &phase) in senders.iter().zip(phases) {
        sender
            .send(phase)
            .map_err(|e| Error::channel_closed("phase").set_source(e))?;
    }
    senders[0]
        .send(input)
        .map_err(|e| Error::channel_closed("input").set_source(e))?;

    let mut handles = Vec::with_capacity(count);
    for (i, mut rx) in receivers.into_iter().enumerate() {
        let tx = senders[(i + 1) % count].clone();
        let program = program.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let mut machine = Machine::with_config(program, MachineConfig::strict())
                .with_input_provider(move || rx.blocking_recv())
                .with_output(move |value| {
                    // The downstream machine may already have halted
                    let _ = tx.send(value);
                });

            machine.run_to_halt([]).map_err(|e| {
                let e = e.with_context("amplifier", i.to_string());
                if e.kind() == ErrorKind::InputUnderrun {
                    Error::channel_closed(format!("amplifier {} input", i)).set_source(e)
                } else {
                    e
                }
            })?;
            Ok::<_, Error>(machine.last_output())
        }));
    }
    // Only the machines hold senders now, so a finished upstream closes its channel
    drop(senders);

    let mut last = None;
    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle
            .await
            .map_err(|e| Error::unexpected(format!("amplifier {} task panicked", i)).set_source(e))??;
        if i == count - 1 {
            last = output;
        }
    }

    last.ok_or_else(|| silent_amplifier(count - 1).with_operation("chain::run_feedback_threaded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";
    const SERIAL_REVERSED: &str =
        "3,23,3,24,1002,24,10,24,1002,23,-1,23,101,5,23,23,1,24,23,23,4,23,99,0,0";
    const FEEDBACK: &str =
        "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

    fn program(text: &str) -> Program {
        text.parse().unwrap()
    }

    #[test]
    fn test_serial_chain() {
        let mut chain = Chain::new(&program(SERIAL), &[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.run_serial(0).unwrap(), 43210);
        assert!(chain.machines().iter().all(|m| m.buffered_output() == 0));

        let mut chain = Chain::new(&program(SERIAL_REVERSED), &[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(chain.run_serial(0).unwrap(), 54321);
    }

    #[test]
    fn test_feedback_chain() {
        let mut chain = Chain::new(&program(FEEDBACK), &[9, 8, 7, 6, 5]).unwrap();
        assert_eq!(chain.run_feedback(0).unwrap(), 139629729);
        assert!(chain.machines().iter().all(|m| m.is_halted()));
        assert!(chain.machines().iter().all(|m| m.buffered_output() == 0));

        let mut pair = Chain::new(&program(FEEDBACK), &[9, 8]).unwrap();
        assert_eq!(pair.run_feedback(0).unwrap(), 4774);
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(Chain::new(&program(SERIAL), &[]).is_err_and(|e| e.kind() == ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_silent_amplifier() {
        let mut chain = Chain::new(&program("3,0,99"), &[1]).unwrap();
        let err = chain.run_serial(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.context_value("amplifier"), Some("0"));
    }

    #[test]
    fn test_serial_underrun_is_error() {
        // Reads three values but only gets phase and signal
        let mut chain = Chain::new(&program("3,0,3,0,3,0,4,0,99"), &[1]).unwrap();
        assert!(chain.run_serial(0).is_err_and(|e| e.kind() == ErrorKind::InputUnderrun));
    }

    #[test]
    fn test_reseed() {
        let mut chain = Chain::new(&program(SERIAL), &[0, 1, 2, 3, 4]).unwrap();
        chain.run_serial(0).unwrap();
        chain.reseed(&[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(chain.run_serial(0).unwrap(), 43210);
        assert!(chain.reseed(&[1, 2]).is_err_and(|e| e.kind() == ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_permutations() {
        let perms = permutations(&[1, 2, 3]);
        assert_eq!(perms.len(), 6);
        let mut sorted = perms.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 6);
        assert_eq!(permutations(&[7]), vec![vec![7]]);
    }

    #[test]
    fn test_best_phases() {
        let (signal, phases) = best_phases(&program(SERIAL), &[0, 1, 2, 3, 4], false).unwrap();
        assert_eq!(signal, 43210);
        assert_eq!(phases, vec![4, 3, 2, 1, 0]);

        let (signal, phases) = best_phases(&program(FEEDBACK), &[5, 6, 7, 8, 9], true).unwrap();
        assert_eq!(signal, 139629729);
        assert_eq!(phases, vec![9, 8, 7, 6, 5]);
    }

    #[test]
    fn test_threaded_feedback() {
        let signal = tokio_test::block_on(run_feedback_threaded(&program(FEEDBACK), &[9, 8, 7, 6, 5], 0)).unwrap();
        assert_eq!(signal, 139629729);
    }

    #[test]
    fn test_threaded_serial_program() {
        // A chain of run-once amplifiers also works threaded: the first
        // machine's extra feedback value is simply never read
        let signal = tokio_test::block_on(run_feedback_threaded(&program(SERIAL), &[4, 3, 2, 1, 0], 0)).unwrap();
        assert_eq!(signal, 43210);
    }

    #[test]
    fn test_threaded_closed_channel() {
        // Phase 0 reads forever, phase 1 halts at once and closes the loop
        let result = tokio_test::block_on(run_feedback_threaded(
            &program("3,20,1005,20,10,3,21,1105,1,5,99"),
            &[0, 1],
            0,
        ));
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::ChannelClosed));
    }
}
