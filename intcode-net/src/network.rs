//! # Packet Network
//!
//! One machine per address, driven round-robin. Each round a machine with
//! an empty queue is handed the idle value, runs until it blocks on input,
//! and every complete `(dest, x, y)` triple it produced is routed to the
//! destination's queue straight away.
//!
//! Address 255 is the NAT. It keeps only the latest packet and, once a whole
//! round passes with every queue empty and nothing sent, delivers that
//! packet to address 0.

use intcode_vm::{Error, Machine, MachineConfig, Program, Result, Word, DEFAULT_SCRATCH_CELLS};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// The NAT's address
pub const NAT_ADDRESS: Word = 255;

/// Network settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of machines, addressed `0..nodes`
    pub nodes: usize,
    /// Value handed to a machine whose queue is empty
    pub idle_input: Word,
    /// Rounds before the run gives up
    pub max_rounds: usize,
    /// Scratch cells per machine
    pub scratch_cells: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            nodes: 50,
            idle_input: -1,
            max_rounds: 100_000,
            scratch_cells: DEFAULT_SCRATCH_CELLS,
        }
    }
}

impl NetworkConfig {
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(Error::config_invalid("a network needs at least one node"));
        }
        if self.nodes as Word >= NAT_ADDRESS {
            return Err(Error::config_invalid(format!(
                "{} nodes would collide with the NAT address {}",
                self.nodes, NAT_ADDRESS
            )));
        }
        Ok(())
    }
}

/// A routed triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub dest: Word,
    pub x: Word,
    pub y: Word,
}

/// When [`Network::run`] stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// The first packet addressed to the NAT
    #[default]
    FirstNatPacket,
    /// The NAT delivers the same `y` to address 0 twice in a row
    RepeatedNatDelivery,
}

/// What stopped the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEvent {
    FirstNatPacket(Packet),
    RepeatedNatDelivery(Packet),
}

impl NetworkEvent {
    pub fn packet(&self) -> Packet {
        match self {
            Self::FirstNatPacket(packet) | Self::RepeatedNatDelivery(packet) => *packet,
        }
    }
}

// =============================================================================
// NAT
// =============================================================================

/// Idle monitor holding the latest packet sent to address 255
#[derive(Debug, Clone, Default)]
pub struct Nat {
    latest: Option<Packet>,
    received: usize,
    last_delivered: Option<Packet>,
    deliveries: usize,
}

impl Nat {
    /// Keep `packet`, dropping any earlier one
    pub fn receive(&mut self, packet: Packet) {
        self.received += 1;
        self.latest = Some(packet);
    }

    /// The packet the NAT would deliver next
    pub fn latest(&self) -> Option<Packet> {
        self.latest
    }

    /// Packets received so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Deliveries to address 0 so far
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    /// Turn the latest packet into a delivery for address 0.
    ///
    /// Returns the delivered packet and whether its `y` matches the previous
    /// delivery's. `None` when nothing has been received yet.
    fn wake(&mut self) -> Option<(Packet, bool)> {
        let packet = Packet {
            dest: 0,
            ..self.latest?
        };
        let repeated = self.last_delivered.is_some_and(|last| last.y == packet.y);
        self.last_delivered = Some(packet);
        self.deliveries += 1;
        Some((packet, repeated))
    }
}

// =============================================================================
// Network
// =============================================================================

/// Outcome of one round-robin pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Round {
    /// Packets produced this round, in send order
    pub sent: Vec<Packet>,
    /// No queue had input and nothing was sent
    pub idle: bool,
    /// What the NAT delivered at the end of an idle round, plus whether its
    /// `y` repeated the previous delivery
    pub nat_delivery: Option<(Packet, bool)>,
}

/// Machines plus the partial packets each one has emitted so far
#[derive(Debug)]
pub struct Network {
    config: NetworkConfig,
    nodes: Vec<Machine>,
    partial: Vec<Vec<Word>>,
    nat: Nat,
    rounds: usize,
}

impl Network {
    /// Boot `config.nodes` machines, each given its address as first input
    pub fn new(program: &Program, config: NetworkConfig) -> Result<Self> {
        config.validate().map_err(|e| e.with_operation("network::new"))?;

        let machine_config = MachineConfig::default().with_scratch(config.scratch_cells);
        let nodes = (0..config.nodes)
            .map(|address| {
                let mut machine = Machine::with_config(program.clone(), machine_config);
                machine.feed(address as Word);
                machine
            })
            .collect();

        info!("network booted with {} nodes", config.nodes);
        Ok(Self {
            config,
            nodes,
            partial: vec![Vec::new(); config.nodes],
            nat: Nat::default(),
            rounds: 0,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn nat(&self) -> &Nat {
        &self.nat
    }

    pub fn nodes(&self) -> &[Machine] {
        &self.nodes
    }

    /// Rounds completed so far
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Run rounds until `stop` is met or the round budget runs out
    pub fn run(&mut self, stop: StopCondition) -> Result<NetworkEvent> {
        while self.rounds < self.config.max_rounds {
            let round = self.round()?;

            if stop == StopCondition::FirstNatPacket {
                if let Some(packet) = round.sent.iter().find(|p| p.dest == NAT_ADDRESS) {
                    info!("first NAT packet after {} rounds: {:?}", self.rounds, packet);
                    return Ok(NetworkEvent::FirstNatPacket(*packet));
                }
            }

            if stop == StopCondition::RepeatedNatDelivery {
                if let Some((packet, true)) = round.nat_delivery {
                    info!("NAT repeated y={} after {} rounds", packet.y, self.rounds);
                    return Ok(NetworkEvent::RepeatedNatDelivery(packet));
                }
            }
        }

        Err(Error::budget_exhausted(self.config.max_rounds)
            .with_operation("network::run")
            .with_context("nat_packets", self.nat.received().to_string()))
    }

    /// One pass over every node in address order
    pub fn round(&mut self) -> Result<Round> {
        let mut round = Round {
            idle: true,
            ..Round::default()
        };

        for address in 0..self.nodes.len() {
            let node = &mut self.nodes[address];
            if node.is_halted() {
                continue;
            }
            if node.pending_input() == 0 {
                node.feed(self.config.idle_input);
            } else {
                round.idle = false;
            }

            node.run_until_input([]).map_err(|e| {
                Error::machine_failed(format!("node {} failed: {}", address, e.message()))
                    .with_operation("network::round")
                    .with_context("node", address.to_string())
                    .set_source(e)
            })?;

            let outputs = node.drain_output();
            let partial = &mut self.partial[address];
            partial.extend(outputs);

            let complete = partial.len() - partial.len() % 3;
            let packets: Vec<Packet> = partial
                .drain(..complete)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| Packet {
                    dest: c[0],
                    x: c[1],
                    y: c[2],
                })
                .collect();

            for packet in packets {
                debug!("node {} -> {:?}", address, packet);
                self.route(packet);
                round.sent.push(packet);
            }
        }

        if !round.sent.is_empty() {
            round.idle = false;
        }

        if round.idle {
            if let Some((packet, repeated)) = self.nat.wake() {
                debug!("network idle, NAT delivers {:?}", packet);
                self.route(packet);
                round.nat_delivery = Some((packet, repeated));
            }
        }

        self.rounds += 1;
        Ok(round)
    }

    fn route(&mut self, packet: Packet) {
        if packet.dest == NAT_ADDRESS {
            self.nat.receive(packet);
            return;
        }

        match usize::try_from(packet.dest).ok().and_then(|d| self.nodes.get_mut(d)) {
            Some(node) if node.is_halted() => warn!("dropping packet for halted node {}", packet.dest),
            Some(node) => node.feed_all([packet.x, packet.y]),
            None => warn!("dropping packet for unknown address {}", packet.dest),
        }
    }
}
