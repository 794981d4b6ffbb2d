//! # Machine
//!
//! The execution controller: owns working memory, the instruction pointer,
//! the relative base and the I/O bridge, and drives fetch, decode and
//! execute until the program halts or the caller asked to be handed control
//! back.
//!
//! ## States
//!
//! ```text
//!   Standby --run--> Running --output / input needed--> Paused --run--> Running
//!                       |
//!                       +--halt--> Halted      (terminal, runs return last output)
//!                       +--error-> Failed      (terminal until reset)
//! ```
//!
//! Suspension is a plain return from the run call. Resuming continues from
//! exactly the same pointer, base and memory, so splitting a run into pieces
//! produces the same outputs as one uninterrupted run fed the same input.

use crate::config::{MachineConfig, UnderrunPolicy};
use crate::error::{self, Error, Result};
use crate::exec::{self, Effect};
use crate::io::IoBridge;
use crate::memory::{Memory, Param};
use crate::opcode::{Instruction, MAX_PARAMS};
use crate::program::{Program, Word};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Constructed or reset, never run
    Standby,
    /// Inside a run call
    Running,
    /// Suspended, resumable
    Paused,
    /// Executed its halt instruction
    Halted,
    /// Stopped by a decode or addressing error
    Failed,
}

impl State {
    /// Whether no run call can make further progress
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Halted | State::Failed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Standby => "standby",
            State::Running => "running",
            State::Paused => "paused",
            State::Halted => "halted",
            State::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Executed, nothing to report
    Continue,
    /// Executed an output instruction
    Output(Word),
    /// An input instruction found no value; nothing was executed
    NeedsInput,
    /// The machine is halted
    Halted,
}

/// Where the read instruction takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputSource {
    /// Queue only; suspend when empty
    Queue,
    /// Queue, then provider; suspend when both are empty
    Provider,
    /// Queue, then provider, then the underrun policy
    Fallback,
}

/// When a run call hands control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suspend {
    Never,
    OnOutput,
    OnInput,
}

impl Suspend {
    fn operation(self) -> &'static str {
        match self {
            Suspend::Never => "machine::run_to_halt",
            Suspend::OnOutput => "machine::run_until_output",
            Suspend::OnInput => "machine::run_until_input",
        }
    }
}

/// Serializable view of a machine's registers and memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: State,
    pub ip: Word,
    pub relative_base: Word,
    pub steps: u64,
    pub last_output: Option<Word>,
    pub pending_input: Vec<Word>,
    /// Working memory up to its last non-zero cell
    pub memory: Vec<Word>,
}

/// A pausable intcode machine
#[derive(Debug)]
pub struct Machine {
    memory: Memory,
    io: IoBridge,
    config: MachineConfig,
    state: State,
    ip: Word,
    relative_base: Word,
    steps: u64,
}

impl Machine {
    /// Create a machine with the default configuration
    pub fn new(program: impl Into<Program>) -> Self {
        Self::with_config(program, MachineConfig::default())
    }

    /// Create a machine with an explicit configuration
    pub fn with_config(program: impl Into<Program>, config: MachineConfig) -> Self {
        let program = program.into();
        Self {
            memory: Memory::new(program, config.scratch_cells),
            io: IoBridge::new(),
            config,
            state: State::Standby,
            ip: 0,
            relative_base: 0,
            steps: 0,
        }
    }

    /// Create a machine from program text
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(Program::parse(text)?))
    }

    /// Register the output sink, builder style
    pub fn with_output(mut self, sink: impl FnMut(Word) + Send + 'static) -> Self {
        self.set_output(sink);
        self
    }

    /// Register the input provider, builder style
    pub fn with_input_provider(mut self, provider: impl FnMut() -> Option<Word> + Send + 'static) -> Self {
        self.set_input_provider(provider);
        self
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Replace the output sink. With a sink registered the outbox stays empty.
    pub fn set_output(&mut self, sink: impl FnMut(Word) + Send + 'static) {
        self.io.set_sink(Box::new(sink));
    }

    /// Replace the input provider, consulted when the queue is empty and the
    /// run does not pause on input
    pub fn set_input_provider(&mut self, provider: impl FnMut() -> Option<Word> + Send + 'static) {
        self.io.set_provider(Box::new(provider));
    }

    /// Drop the output sink and input provider
    pub fn clear_callbacks(&mut self) {
        self.io.clear_callbacks();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// Address of the next instruction
    pub fn ip(&self) -> Word {
        self.ip
    }

    pub fn relative_base(&self) -> Word {
        self.relative_base
    }

    /// Instructions executed since construction or the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_output(&self) -> Option<Word> {
        self.io.last_output()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The immutable initial image
    pub fn program(&self) -> &Program {
        self.memory.program()
    }

    /// The whole working memory
    pub fn memory(&self) -> &[Word] {
        self.memory.as_slice()
    }

    /// Read a working memory cell
    pub fn peek(&self, address: Word) -> Result<Word> {
        self.memory.read(address).map_err(|e| e.with_operation("machine::peek"))
    }

    /// Overwrite a working memory cell, e.g. to patch parameters before a run
    pub fn poke(&mut self, address: Word, value: Word) -> Result<()> {
        self.memory.write(address, value).map_err(|e| e.with_operation("machine::poke"))
    }

    /// Capture registers and used memory
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            ip: self.ip,
            relative_base: self.relative_base,
            steps: self.steps,
            last_output: self.io.last_output(),
            pending_input: self.io.queued_input().copied().collect(),
            memory: self.memory.used().to_vec(),
        }
    }

    // =========================================================================
    // Input / output
    // =========================================================================

    /// Queue one input value
    pub fn feed(&mut self, value: Word) {
        self.io.push_input(value);
    }

    /// Queue several input values, in order
    pub fn feed_all(&mut self, values: impl IntoIterator<Item = Word>) {
        self.io.extend_input(values);
    }

    /// Queue each byte of `text` as one input value
    pub fn feed_ascii(&mut self, text: &str) {
        self.io.extend_input(text.bytes().map(Word::from));
    }

    /// Queued input not yet consumed
    pub fn pending_input(&self) -> usize {
        self.io.pending_input()
    }

    /// Pop the oldest buffered output
    pub fn take_output(&mut self) -> Option<Word> {
        self.io.take_output()
    }

    /// Take all buffered output
    pub fn drain_output(&mut self) -> Vec<Word> {
        self.io.drain_output()
    }

    /// Outputs waiting in the outbox
    pub fn buffered_output(&self) -> usize {
        self.io.buffered_output()
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Queue `input`, then run until the program halts.
    ///
    /// Returns the last output produced so far.
    pub fn run_to_halt(&mut self, input: impl IntoIterator<Item = Word>) -> Result<Option<Word>> {
        self.run(Suspend::Never, input)
    }

    /// Queue `input`, then run until the next output instruction has executed
    /// or the program halts.
    pub fn run_until_output(&mut self, input: impl IntoIterator<Item = Word>) -> Result<Option<Word>> {
        self.run(Suspend::OnOutput, input)
    }

    /// Queue `input`, then run until an input instruction finds the queue
    /// empty or the program halts. The pending input instruction is retried
    /// on the next run.
    pub fn run_until_input(&mut self, input: impl IntoIterator<Item = Word>) -> Result<Option<Word>> {
        self.run(Suspend::OnInput, input)
    }

    /// Execute exactly one instruction.
    ///
    /// Input comes from the queue, then the provider; when both are empty the
    /// instruction is not executed and `Step::NeedsInput` is returned.
    pub fn step(&mut self) -> Result<Step> {
        match self.state {
            State::Halted => return Ok(Step::Halted),
            State::Failed => return Err(error::already_failed().with_operation("machine::step")),
            _ => {}
        }

        self.transition(State::Running);
        match self.execute_next(InputSource::Provider) {
            Ok(Step::Halted) => {
                self.transition(State::Halted);
                Ok(Step::Halted)
            }
            Ok(step) => {
                self.transition(State::Paused);
                Ok(step)
            }
            Err(err) => Err(self.fail(err.with_operation("machine::step"))),
        }
    }

    /// Back to a fresh standby machine over the same program. Queued input,
    /// buffered output and the last output are cleared; callbacks are kept.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.io.reset();
        self.ip = 0;
        self.relative_base = 0;
        self.steps = 0;
        debug!("machine reset: {} -> standby", self.state);
        self.state = State::Standby;
    }

    fn run(&mut self, suspend: Suspend, input: impl IntoIterator<Item = Word>) -> Result<Option<Word>> {
        match self.state {
            State::Halted => return Ok(self.io.last_output()),
            State::Failed => return Err(error::already_failed().with_operation(suspend.operation())),
            _ => {}
        }

        self.io.extend_input(input);
        self.transition(State::Running);

        let source = match suspend {
            Suspend::OnInput => InputSource::Queue,
            Suspend::Never | Suspend::OnOutput => InputSource::Fallback,
        };

        loop {
            match self.execute_next(source) {
                Ok(Step::Continue) => {}
                Ok(Step::Output(value)) => {
                    if suspend == Suspend::OnOutput {
                        self.transition(State::Paused);
                        return Ok(Some(value));
                    }
                }
                Ok(Step::NeedsInput) => {
                    self.transition(State::Paused);
                    return Ok(self.io.last_output());
                }
                Ok(Step::Halted) => {
                    self.transition(State::Halted);
                    return Ok(self.io.last_output());
                }
                Err(err) => return Err(self.fail(err.with_operation(suspend.operation()))),
            }
        }
    }

    fn execute_next(&mut self, source: InputSource) -> Result<Step> {
        let ip = self.ip;
        let at_ip = |e: Error| e.with_context("ip", ip.to_string());

        let instruction = self
            .memory
            .read(ip)
            .and_then(Instruction::decode)
            .map_err(at_ip)?;

        let arity = instruction.opcode.arity();
        let mut params = [Param::default(); MAX_PARAMS];
        for (i, param) in params.iter_mut().enumerate().take(arity) {
            *param = self
                .memory
                .resolve(ip + 1 + i as Word, instruction.modes[i], self.relative_base)
                .map_err(at_ip)?;
        }
        let params = &params[..arity];

        trace!(
            "{ip:>6}: {:<4} {:?} rb={}",
            instruction.opcode.mnemonic(),
            params,
            self.relative_base
        );

        let width = instruction.width() as Word;
        let step = match exec::execute(instruction.opcode, params) {
            Effect::Store { address, value } => {
                self.memory.write(address, value).map_err(at_ip)?;
                self.ip += width;
                Step::Continue
            }
            Effect::Input { address } => {
                let Some(value) = self.next_input(source, ip)? else {
                    return Ok(Step::NeedsInput);
                };
                self.memory.write(address, value).map_err(at_ip)?;
                self.ip += width;
                Step::Continue
            }
            Effect::Output(value) => {
                self.ip += width;
                self.io.emit(value);
                Step::Output(value)
            }
            Effect::Jump(target) => {
                self.ip = target;
                Step::Continue
            }
            Effect::AdjustBase(delta) => {
                self.relative_base = self.relative_base.wrapping_add(delta);
                self.ip += width;
                Step::Continue
            }
            Effect::Advance => {
                self.ip += width;
                Step::Continue
            }
            Effect::Halt => Step::Halted,
        };

        self.steps += 1;
        Ok(step)
    }

    fn next_input(&mut self, source: InputSource, ip: Word) -> Result<Option<Word>> {
        if let Some(value) = self.io.pop_input() {
            return Ok(Some(value));
        }

        match source {
            InputSource::Queue => Ok(None),
            InputSource::Provider => Ok(self.io.provide()),
            InputSource::Fallback => match self.io.provide() {
                Some(value) => Ok(Some(value)),
                None => match self.config.underrun {
                    UnderrunPolicy::Zero => {
                        warn!("input underrun at ip {ip}, reading 0");
                        Ok(Some(0))
                    }
                    UnderrunPolicy::Error => Err(error::input_underrun(ip)),
                },
            },
        }
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            debug!("machine {} -> {} (ip {}, steps {})", self.state, next, self.ip, self.steps);
            self.state = next;
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        if err.is_fatal() {
            debug!("machine failed: {}", err);
            self.transition(State::Failed);
        } else {
            self.transition(State::Paused);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::{Arc, Mutex};

    const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
    const COMPARE_TO_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
        1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,999,1105,1,46,1101,1000,1,20,\
        4,20,1105,1,46,98,99";

    fn machine(text: &str) -> Machine {
        Machine::parse(text).unwrap()
    }

    fn run_all(text: &str, input: &[Word]) -> Vec<Word> {
        let mut m = machine(text);
        m.run_to_halt(input.iter().copied()).unwrap();
        m.drain_output()
    }

    #[test]
    fn test_add_in_place() {
        let mut m = machine("1,0,0,0,99");
        m.run_to_halt([]).unwrap();
        assert_eq!(&m.memory()[..5], &[2, 0, 0, 0, 99]);
        assert!(m.is_halted());
        assert_eq!(m.steps(), 2);
    }

    #[test]
    fn test_echo_input() {
        let mut m = machine("3,0,4,0,99");
        assert_eq!(m.run_to_halt([7]).unwrap(), Some(7));
        assert_eq!(m.drain_output(), vec![7]);
    }

    #[test]
    fn test_immediate_add_into_scratch() {
        let mut m = machine("1101,100,-1,4,0");
        assert_eq!(m.run_to_halt([]).unwrap(), None);
        assert_eq!(m.peek(4).unwrap(), 99);
        assert_eq!(m.state(), State::Halted);
    }

    #[test]
    fn test_relative_write_targets_base_plus_offset() {
        let mut m = machine("109,10,203,0,204,0,99");
        assert_eq!(m.run_to_halt([42]).unwrap(), Some(42));
        assert_eq!(m.peek(10).unwrap(), 42);
        assert_eq!(m.peek(0).unwrap(), 109);
        assert_eq!(m.relative_base(), 10);
    }

    #[test]
    fn test_addressing_modes_agree() {
        let position = machine("1,5,6,7,99,20,22,0");
        let immediate = machine("1101,20,22,7,99,0,0,0");
        let relative = machine("109,8,22201,0,1,2,99,0,20,22,0");

        let results: Vec<Word> = [(position, 7), (immediate, 7), (relative, 10)]
            .into_iter()
            .map(|(mut m, target)| {
                m.run_to_halt([]).unwrap();
                m.peek(target).unwrap()
            })
            .collect();
        assert_eq!(results, vec![42, 42, 42]);
    }

    #[test]
    fn test_self_modifying_program() {
        // The first add overwrites the halt at cell 4 with a multiply
        let mut m = machine("1,1,1,4,99,5,6,0,99");
        m.run_to_halt([]).unwrap();
        assert_eq!(&m.memory()[..9], &[30, 1, 1, 4, 2, 5, 6, 0, 99]);
        assert_eq!(m.program().as_slice(), &[1, 1, 1, 4, 99, 5, 6, 0, 99]);
    }

    #[test]
    fn test_comparisons_and_jumps() {
        assert_eq!(run_all("3,9,8,9,10,9,4,9,99,-1,8", &[8]), vec![1]);
        assert_eq!(run_all("3,9,8,9,10,9,4,9,99,-1,8", &[7]), vec![0]);
        assert_eq!(run_all("3,3,1107,-1,8,3,4,3,99", &[5]), vec![1]);
        assert_eq!(run_all("3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9", &[0]), vec![0]);
        assert_eq!(run_all("3,3,1105,-1,9,1101,0,0,12,4,12,99,1", &[3]), vec![1]);

        assert_eq!(run_all(COMPARE_TO_EIGHT, &[7]), vec![999]);
        assert_eq!(run_all(COMPARE_TO_EIGHT, &[8]), vec![1000]);
        assert_eq!(run_all(COMPARE_TO_EIGHT, &[9]), vec![1001]);
    }

    #[test]
    fn test_large_values_and_quine() {
        assert_eq!(run_all("104,1125899906842624,99", &[]), vec![1125899906842624]);
        assert_eq!(run_all("1102,34915192,34915192,7,4,7,99,0", &[]), vec![1219070632396864]);

        let program = Program::parse(QUINE).unwrap();
        assert_eq!(run_all(QUINE, &[]), program.as_slice().to_vec());
    }

    #[test]
    fn test_patch_before_run() {
        let mut m = machine("1,9,10,3,2,3,11,0,99,30,40,50");
        m.poke(1, 9).unwrap();
        m.poke(2, 9).unwrap();
        m.run_to_halt([]).unwrap();
        assert_eq!(m.peek(0).unwrap(), 3000);
        assert_eq!(m.program().get(1), Some(9));

        m.reset();
        m.run_to_halt([]).unwrap();
        assert_eq!(m.peek(0).unwrap(), 3500);
    }

    #[test]
    fn test_pause_on_output_matches_uninterrupted_run() {
        let expected = run_all(QUINE, &[]);

        let mut m = machine(QUINE);
        let mut outputs = Vec::new();
        while !m.is_halted() {
            if let Some(value) = m.run_until_output([]).unwrap() {
                if !m.is_halted() {
                    assert_eq!(m.state(), State::Paused);
                    outputs.push(value);
                }
            }
        }
        assert_eq!(outputs, expected);
        assert_eq!(m.drain_output(), expected);
    }

    #[test]
    fn test_pause_on_input_does_not_consume() {
        let mut m = machine(COMPARE_TO_EIGHT);
        assert_eq!(m.run_until_input([]).unwrap(), None);
        assert_eq!(m.state(), State::Paused);
        let paused_at = m.ip();
        let steps = m.steps();

        // Still nothing to read
        m.run_until_input([]).unwrap();
        assert_eq!(m.ip(), paused_at);
        assert_eq!(m.steps(), steps);

        assert_eq!(m.run_until_input([8]).unwrap(), Some(1000));
        assert!(m.is_halted());
        assert_eq!(m.drain_output(), run_all(COMPARE_TO_EIGHT, &[8]));
    }

    #[test]
    fn test_run_until_input_skips_provider() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut m = machine("3,0,4,0,99").with_input_provider(move || {
            *counter.lock().unwrap() += 1;
            Some(5)
        });

        m.run_until_input([]).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(m.state(), State::Paused);

        assert_eq!(m.run_to_halt([]).unwrap(), Some(5));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_queue_before_provider() {
        let mut m = machine("3,0,3,1,4,0,4,1,99").with_input_provider(|| Some(-3));
        m.run_to_halt([11]).unwrap();
        assert_eq!(m.drain_output(), vec![11, -3]);
    }

    #[test]
    fn test_output_sink_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut m = machine(QUINE).with_output(move |v| sink.lock().unwrap().push(v));

        m.run_to_halt([]).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), Program::parse(QUINE).unwrap().as_slice());
        assert!(m.drain_output().is_empty());
        assert_eq!(m.last_output(), Some(99));
    }

    #[test]
    fn test_underrun_policies() {
        let mut lenient = machine("3,0,4,0,99");
        assert_eq!(lenient.run_to_halt([]).unwrap(), Some(0));

        let mut strict = Machine::with_config(Program::parse("3,0,4,0,99").unwrap(), MachineConfig::strict());
        let err = strict.run_to_halt([]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputUnderrun);
        assert_eq!(err.context_value("ip"), Some("0"));
        assert!(err.is_fatal());
        assert_eq!(strict.state(), State::Failed);
    }

    #[test]
    fn test_halted_run_is_a_no_op() {
        let mut m = machine("3,0,4,0,99");
        m.run_to_halt([7]).unwrap();
        let steps = m.steps();

        assert_eq!(m.run_to_halt([1, 2]).unwrap(), Some(7));
        assert_eq!(m.run_until_output([]).unwrap(), Some(7));
        assert_eq!(m.run_until_input([]).unwrap(), Some(7));
        assert_eq!(m.step().unwrap(), Step::Halted);
        assert_eq!(m.steps(), steps);
        assert_eq!(m.pending_input(), 0);
    }

    #[test]
    fn test_reset_after_halt() {
        let mut m = machine("3,0,4,0,99");
        m.run_to_halt([7]).unwrap();

        m.reset();
        assert_eq!(m.state(), State::Standby);
        assert_eq!(m.last_output(), None);
        assert_eq!(m.steps(), 0);
        assert_eq!(&m.memory()[..5], &[3, 0, 4, 0, 99]);

        assert_eq!(m.run_to_halt([9]).unwrap(), Some(9));
        assert_eq!(m.drain_output(), vec![9]);
    }

    #[test]
    fn test_reset_keeps_callbacks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut m = machine("104,1,99").with_output(move |v| sink.lock().unwrap().push(v));

        m.run_to_halt([]).unwrap();
        m.reset();
        m.run_to_halt([]).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);

        m.clear_callbacks();
        m.reset();
        m.run_to_halt([]).unwrap();
        assert_eq!(m.drain_output(), vec![1]);
    }

    #[test]
    fn test_state_transitions() {
        let mut m = machine("104,1,104,2,99");
        assert_eq!(m.state(), State::Standby);

        assert_eq!(m.run_until_output([]).unwrap(), Some(1));
        assert_eq!(m.state(), State::Paused);
        assert_eq!(m.run_until_output([]).unwrap(), Some(2));
        assert_eq!(m.state(), State::Paused);
        assert_eq!(m.run_until_output([]).unwrap(), Some(2));
        assert_eq!(m.state(), State::Halted);
        assert!(m.state().is_terminal());
    }

    #[test]
    fn test_single_step() {
        let mut m = machine("3,0,4,0,99");
        assert_eq!(m.step().unwrap(), Step::NeedsInput);
        assert_eq!(m.ip(), 0);

        m.feed(6);
        assert_eq!(m.step().unwrap(), Step::Continue);
        assert_eq!(m.step().unwrap(), Step::Output(6));
        assert_eq!(m.state(), State::Paused);
        assert_eq!(m.step().unwrap(), Step::Halted);
        assert!(m.is_halted());
        assert_eq!(m.steps(), 3);
    }

    #[test]
    fn test_invalid_opcode_fails_machine() {
        let mut m = machine("1101,1,1,5,42,0");
        let err = m.run_to_halt([]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOpcode);
        assert_eq!(err.context_value("ip"), Some("4"));
        assert_eq!(err.operation(), "machine::run_to_halt");
        assert!(err.is_fatal());
        assert_eq!(m.state(), State::Failed);

        let err = m.run_to_halt([]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MachineFailed);
        assert!(m.step().is_err_and(|e| e.kind() == ErrorKind::MachineFailed));

        m.reset();
        assert_eq!(m.state(), State::Standby);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut m = Machine::with_config(
            Program::parse("1,1000,0,0,99").unwrap(),
            MachineConfig::default().with_scratch(10),
        );
        let err = m.run_to_halt([]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressOutOfBounds);
        assert_eq!(err.context_value("capacity"), Some("15"));

        assert!(machine("109,-5,204,0,99")
            .run_to_halt([])
            .is_err_and(|e| e.kind() == ErrorKind::NegativeAddress));

        // Jumping to a negative address fails at the next fetch
        assert!(machine("1106,0,-2")
            .run_to_halt([])
            .is_err_and(|e| e.kind() == ErrorKind::NegativeAddress));
    }

    #[test]
    fn test_running_off_the_end() {
        let mut m = Machine::with_config(Program::parse("1101,1,1,0").unwrap(), MachineConfig::default().with_scratch(0));
        // ip 4 is past a zero-scratch memory
        assert!(m.run_to_halt([]).is_err_and(|e| e.kind() == ErrorKind::AddressOutOfBounds));
    }

    #[test]
    fn test_determinism() {
        let mut a = machine(COMPARE_TO_EIGHT);
        let mut b = machine(COMPARE_TO_EIGHT);
        a.run_to_halt([3]).unwrap();
        b.run_to_halt([3]).unwrap();
        assert_eq!(a.drain_output(), b.drain_output());
        assert_eq!(a.memory(), b.memory());
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_feed_ascii() {
        let mut m = machine("3,0,3,1,4,0,4,1,99");
        m.feed_ascii("Hi");
        assert_eq!(m.pending_input(), 2);
        m.run_to_halt([]).unwrap();
        assert_eq!(m.buffered_output(), 2);
        assert_eq!(m.drain_output(), vec![72, 105]);
        assert_eq!(m.buffered_output(), 0);
    }

    #[test]
    fn test_snapshot() {
        let mut m = machine("109,3,203,10,99");
        m.run_until_input([]).unwrap();
        m.feed(1);

        let snapshot = m.snapshot();
        assert_eq!(snapshot.state, State::Paused);
        assert_eq!(snapshot.ip, 2);
        assert_eq!(snapshot.relative_base, 3);
        assert_eq!(snapshot.pending_input, vec![1]);
        assert_eq!(snapshot.memory, vec![109, 3, 203, 10, 99]);

        m.run_to_halt([]).unwrap();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["state"], "halted");
        assert_eq!(json["memory"][13], 1);
    }
}
