//! # Intcode CLI
//!
//! Command-line interface for the intcode machine.
//!
//! Usage:
//!   intcode run <file> [-i 1,2,3] [--ascii] [--interactive]
//!   intcode disasm <file>
//!   intcode chain <file> --phases 0,1,2,3,4 [--feedback] [--threaded] [--best]
//!   intcode network <file> [--nodes 50] [--until first|repeat]
//!
//! Examples:
//!   intcode run diagnostics.txt -i 5
//!   intcode -v run droid.txt --ascii --interactive
//!   intcode chain amps.txt --phases 5,6,7,8,9 --feedback --best
//!   intcode network nic.txt --until repeat

use clap::{Parser, Subcommand, ValueEnum};
use intcode_net::{best_phases, run_feedback_threaded, Chain, Network, NetworkConfig, StopCondition};
use intcode_vm::{Error, ErrorKind, Machine, MachineConfig, Program, Result, Step, UnderrunPolicy, Word};
use log::{debug, warn, LevelFilter};
use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "intcode")]
#[command(author, version, about = "Intcode - a pausable stored-program integer machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only print results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program to halt
    Run {
        /// Path to the comma-separated program
        file: String,

        /// Input values, queued before the run
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        input: Vec<Word>,

        /// Text queued as input, one value per byte, after --input
        #[arg(long)]
        ascii_in: Option<String>,

        /// Print outputs below 128 as characters
        #[arg(long)]
        ascii: bool,

        /// Fail on input underrun instead of reading zero
        #[arg(long)]
        strict: bool,

        /// Scratch cells past the end of the program
        #[arg(long)]
        scratch: Option<usize>,

        /// Stop with an error after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Read further input from stdin, one line per request
        #[arg(long)]
        interactive: bool,

        /// Print outputs and the final machine snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a listing of a program
    Disasm {
        /// Path to the comma-separated program
        file: String,
    },
    /// Run an amplifier chain, one machine per phase setting
    Chain {
        /// Path to the comma-separated program
        file: String,

        /// Phase settings, or the candidates with --best
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        phases: Vec<Word>,

        /// Signal fed to the first amplifier
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        input: Word,

        /// Loop the last output back into the first amplifier
        #[arg(long)]
        feedback: bool,

        /// Feedback chain with one thread per machine
        #[arg(long)]
        threaded: bool,

        /// Search every ordering of the phases for the highest signal
        #[arg(long, conflicts_with = "threaded")]
        best: bool,
    },
    /// Run a packet network of machines
    Network {
        /// Path to the comma-separated program
        file: String,

        /// Number of machines
        #[arg(long, default_value_t = 50)]
        nodes: usize,

        /// When to stop
        #[arg(long, value_enum, default_value_t = Until::First)]
        until: Until,

        /// Give up after this many rounds
        #[arg(long, default_value_t = 100_000)]
        max_rounds: usize,

        /// Print the stopping event as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Until {
    /// First packet sent to the NAT
    First,
    /// NAT delivers the same y twice in a row
    Repeat,
}

impl From<Until> for StopCondition {
    fn from(until: Until) -> Self {
        match until {
            Until::First => StopCondition::FirstNatPacket,
            Until::Repeat => StopCondition::RepeatedNatDelivery,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

// =============================================================================
// run
// =============================================================================

struct RunOptions {
    input: Vec<Word>,
    ascii_in: Option<String>,
    ascii: bool,
    strict: bool,
    scratch: Option<usize>,
    max_steps: Option<u64>,
    interactive: bool,
    json: bool,
}

fn run_program_file(file: &str, opts: RunOptions, quiet: bool) -> Result<()> {
    let program = Program::from_file(file)?;

    let mut config = if opts.strict {
        MachineConfig::strict()
    } else {
        MachineConfig::default()
    };
    if let Some(scratch) = opts.scratch {
        config = config.with_scratch(scratch);
    }

    if !quiet && !opts.json {
        println!("Running {} ({} cells)\n", file, program.len());
    }

    let mut machine = Machine::with_config(program, config);
    machine.feed_all(opts.input);
    if let Some(text) = &opts.ascii_in {
        machine.feed_ascii(text);
    }

    // Interactive programs prompt before reading, so print as we go
    let echoed = Arc::new(Mutex::new(Vec::new()));
    if opts.interactive {
        machine.set_input_provider(stdin_provider(opts.ascii));
        machine.set_output(echo_sink(opts.ascii, Arc::clone(&echoed)));
    }

    match opts.max_steps {
        Some(limit) => run_with_budget(&mut machine, limit)?,
        None => {
            machine.run_to_halt([])?;
        }
    }

    let mut outputs = echoed.lock().map(|mut values| std::mem::take(&mut *values)).unwrap_or_default();
    outputs.extend(machine.drain_output());
    if opts.json {
        let report = serde_json::json!({
            "outputs": outputs,
            "snapshot": machine.snapshot(),
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::unexpected("failed to serialize report").set_source(e))?;
        println!("{}", text);
    } else {
        if !opts.interactive {
            print!("{}", render(&outputs, opts.ascii));
        }
        if !quiet {
            println!("\nHalted after {} steps", machine.steps());
        }
    }

    Ok(())
}

/// Single-step until halt, feeding zero on underrun unless the machine is strict
fn run_with_budget(machine: &mut Machine, limit: u64) -> Result<()> {
    while machine.steps() < limit {
        match machine.step()? {
            Step::Halted => return Ok(()),
            Step::NeedsInput => match machine.config().underrun {
                UnderrunPolicy::Zero => {
                    warn!("input underrun at ip {}, reading 0", machine.ip());
                    machine.feed(0);
                }
                UnderrunPolicy::Error => {
                    return Err(intcode_vm::error::input_underrun(machine.ip()).with_operation("cli::run"));
                }
            },
            Step::Continue | Step::Output(_) => {}
        }
    }

    Err(Error::new(
        ErrorKind::BudgetExhausted,
        format!("program did not halt within {} steps", limit),
    )
    .with_operation("cli::run")
    .with_context("ip", machine.ip().to_string()))
}

/// Prints each value as it arrives and keeps it for the final report
fn echo_sink(ascii: bool, collected: Arc<Mutex<Vec<Word>>>) -> impl FnMut(Word) + Send + 'static {
    move |value| {
        print!("{}", render(&[value], ascii));
        if let Ok(mut values) = collected.lock() {
            values.push(value);
        }
    }
}

/// Reads a line per request; ascii mode hands it out a byte at a time
fn stdin_provider(ascii: bool) -> impl FnMut() -> Option<Word> + Send + 'static {
    let mut buffered: VecDeque<Word> = VecDeque::new();
    move || {
        loop {
            if let Some(value) = buffered.pop_front() {
                return Some(value);
            }

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("failed to read stdin: {}", e);
                    return None;
                }
            }

            if ascii {
                let line = line.trim_end_matches(['\r', '\n']);
                buffered.extend(line.bytes().map(Word::from));
                buffered.push_back(Word::from(b'\n'));
            } else {
                match line.trim().parse::<Word>() {
                    Ok(value) => return Some(value),
                    Err(e) => warn!("ignoring {:?}: {}", line.trim(), e),
                }
            }
        }
    }
}

/// One value per line, or characters for ascii values below 128
fn render(values: &[Word], ascii: bool) -> String {
    let mut out = String::new();
    for &value in values {
        match u8::try_from(value) {
            Ok(byte) if ascii && byte.is_ascii() => out.push(char::from(byte)),
            _ => {
                out.push_str(&value.to_string());
                out.push('\n');
            }
        }
    }
    out
}

// =============================================================================
// chain / network
// =============================================================================

async fn run_chain(
    file: &str,
    phases: &[Word],
    input: Word,
    feedback: bool,
    threaded: bool,
    best: bool,
) -> Result<()> {
    let program = Program::from_file(file)?;

    if best {
        let (signal, phases) = best_phases(&program, phases, feedback)?;
        let phases = phases.iter().map(Word::to_string).collect::<Vec<_>>().join(",");
        println!("{} (phases {})", signal, phases);
        return Ok(());
    }

    let signal = if threaded {
        run_feedback_threaded(&program, phases, input).await?
    } else {
        let mut chain = Chain::new(&program, phases)?;
        if feedback {
            chain.run_feedback(input)?
        } else {
            chain.run_serial(input)?
        }
    };

    println!("{}", signal);
    Ok(())
}

fn run_network(file: &str, config: NetworkConfig, until: Until, json: bool) -> Result<()> {
    let program = Program::from_file(file)?;
    let mut network = Network::new(&program, config)?;
    let event = network.run(until.into())?;
    debug!("network stopped after {} rounds", network.rounds());

    if json {
        let text = serde_json::to_string_pretty(&event)
            .map_err(|e| Error::unexpected("failed to serialize event").set_source(e))?;
        println!("{}", text);
    } else {
        println!("{}", event.packet().y);
    }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            file,
            input,
            ascii_in,
            ascii,
            strict,
            scratch,
            max_steps,
            interactive,
            json,
        } => {
            let opts = RunOptions {
                input,
                ascii_in,
                ascii,
                strict,
                scratch,
                max_steps,
                interactive,
                json,
            };
            // Stdin reads block, keep them off the runtime's workers
            let quiet = cli.quiet;
            tokio::task::spawn_blocking(move || run_program_file(&file, opts, quiet))
                .await
                .map_err(|e| Error::unexpected("run task panicked").set_source(e))?
        }
        Commands::Disasm { file } => {
            let program = Program::from_file(&file)?;
            program.pretty_print();
            Ok(())
        }
        Commands::Chain {
            file,
            phases,
            input,
            feedback,
            threaded,
            best,
        } => run_chain(&file, &phases, input, feedback, threaded, best).await,
        Commands::Network {
            file,
            nodes,
            until,
            max_rounds,
            json,
        } => {
            let config = NetworkConfig::default()
                .with_nodes(nodes)
                .with_max_rounds(max_rounds);
            run_network(&file, config, until, json)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
