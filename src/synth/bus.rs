use std::collections::VecDeque;

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::warn;

use crate::{
    analysis::TapWriter,
    graph::node::{GraphNode, RenderCtx},
    synth::{chain::SignalChain, message::BusCommand, voice::VoiceId},
    MAX_BLOCK_SIZE,
};

/*
Mix Bus
=======

The shared output bus lives on the audio thread; the control thread edits it
through a `BusHandle`. Two lock-free rings connect them:

    control ──BusCommand──→ audio      (connect / release / disconnect)
    control ←─Box<Chain>─── audio      (disconnected chains, to be dropped)

Disconnected chains travel back so the audio callback never frees memory.
If the command ring is full the handle keeps a local backlog and retries on
the next send or flush, so no edit is ever lost.

The handle counts chains it has handed over and not yet collected back. At
most CHAIN_CAPACITY are out at once, which keeps two promises:

  - the bus's chain list never grows past its preallocated capacity
  - the return ring (also CHAIN_CAPACITY) always has room for a retiring
    chain

A connect past the limit is parked on the control side. Release and
disconnect for a parked voice are applied to it right there, and parked
chains go out in order as collected ones make room.

Every block the bus sums all connected chains and copies the mix into the
analyser tap, so each voice shows up in the visualization.
*/

const BUS_QUEUE_SIZE: usize = 256;
const CHAIN_CAPACITY: usize = 64;

pub struct MixBus {
    sample_rate: f32,
    chains: Vec<Box<SignalChain>>,
    commands: Consumer<BusCommand>,
    retired: Producer<Box<SignalChain>>,
    tap: TapWriter,
    voice_buffer: Vec<f32>,
}

pub struct BusHandle {
    sample_rate: f32,
    commands: Producer<BusCommand>,
    retired: Consumer<Box<SignalChain>>,
    backlog: VecDeque<BusCommand>,
    parked: VecDeque<Box<SignalChain>>,
    /// Chains sent towards the bus and not yet collected back.
    in_flight: usize,
}

/// Create a connected bus/handle pair feeding `tap`.
pub fn mix_bus(sample_rate: f32, tap: TapWriter) -> (MixBus, BusHandle) {
    let (command_tx, command_rx) = RingBuffer::<BusCommand>::new(BUS_QUEUE_SIZE);
    let (retired_tx, retired_rx) = RingBuffer::<Box<SignalChain>>::new(CHAIN_CAPACITY);

    let bus = MixBus {
        sample_rate,
        chains: Vec::with_capacity(CHAIN_CAPACITY),
        commands: command_rx,
        retired: retired_tx,
        tap,
        voice_buffer: vec![0.0; MAX_BLOCK_SIZE],
    };
    let handle = BusHandle {
        sample_rate,
        commands: command_tx,
        retired: retired_rx,
        backlog: VecDeque::new(),
        parked: VecDeque::new(),
        in_flight: 0,
    };
    (bus, handle)
}

impl MixBus {
    /// Render one block of the mix. `out.len()` must not exceed `MAX_BLOCK_SIZE`.
    pub fn render_block(&mut self, out: &mut [f32]) {
        self.apply_commands();

        let frames = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..frames];
        out.fill(0.0);

        let ctx = RenderCtx::new(self.sample_rate, 0.0);
        for chain in self.chains.iter_mut() {
            let voice = &mut self.voice_buffer[..frames];
            chain.render_block(voice, &ctx);
            for (o, v) in out.iter_mut().zip(voice.iter()) {
                *o += v;
            }
        }

        self.tap.push_block(out);
    }

    /// Render an arbitrary-length buffer in `MAX_BLOCK_SIZE` pieces.
    pub fn render(&mut self, out: &mut [f32]) {
        for block in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(block);
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                BusCommand::Connect(chain) => {
                    debug_assert!(self.chains.len() < CHAIN_CAPACITY, "mix bus over capacity");
                    self.chains.push(chain);
                }
                BusCommand::Release(id) => {
                    if let Some(chain) = self.chains.iter_mut().find(|c| c.id() == id) {
                        chain.release();
                    }
                }
                BusCommand::Disconnect(id) => {
                    if let Some(index) = self.chains.iter().position(|c| c.id() == id) {
                        let chain = self.chains.swap_remove(index);
                        // The handle keeps at most CHAIN_CAPACITY chains out, so
                        // this always has room.
                        let _ = self.retired.push(chain);
                    }
                }
            }
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn connected(&self) -> usize {
        self.chains.len()
    }

    pub fn is_connected(&self, id: VoiceId) -> bool {
        self.chains.iter().any(|c| c.id() == id)
    }
}

impl BusHandle {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Queue a graph edit. Edits for one voice are applied in send order.
    pub fn send(&mut self, command: BusCommand) {
        self.drain_backlog();
        match command {
            BusCommand::Connect(chain) => {
                if self.parked.is_empty() && self.in_flight < CHAIN_CAPACITY {
                    self.enqueue(BusCommand::Connect(chain));
                } else {
                    warn!(voice = %chain.id(), parked = self.parked.len() + 1, "mix bus full, parking voice");
                    self.parked.push_back(chain);
                }
            }
            BusCommand::Release(id) => match self.parked_index(id) {
                Some(index) => self.parked[index].release(),
                None => self.enqueue(BusCommand::Release(id)),
            },
            BusCommand::Disconnect(id) => match self.parked_index(id) {
                // Never reached the audio thread, so it can be dropped here.
                Some(index) => drop(self.parked.remove(index)),
                None => self.enqueue(BusCommand::Disconnect(id)),
            },
        }
    }

    /// Retry deferred edits and parked voices. Returns how many edits are
    /// still waiting for ring space.
    pub fn flush(&mut self) -> usize {
        self.drain_backlog();
        self.unpark();
        self.backlog.len()
    }

    /// Drop chains the audio thread has disconnected, then let parked voices
    /// take their place. Returns how many were dropped.
    pub fn collect_retired(&mut self) -> usize {
        let mut count = 0;
        while let Ok(chain) = self.retired.pop() {
            drop(chain);
            count += 1;
        }
        self.in_flight = self.in_flight.saturating_sub(count);
        self.unpark();
        count
    }

    pub fn backlog(&self) -> usize {
        self.backlog.len()
    }

    /// Voices waiting for room on the bus.
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    fn parked_index(&self, id: VoiceId) -> Option<usize> {
        self.parked.iter().position(|c| c.id() == id)
    }

    fn unpark(&mut self) {
        while self.in_flight < CHAIN_CAPACITY {
            match self.parked.pop_front() {
                Some(chain) => self.enqueue(BusCommand::Connect(chain)),
                None => break,
            }
        }
    }

    fn enqueue(&mut self, command: BusCommand) {
        if let BusCommand::Connect(_) = command {
            self.in_flight += 1;
        }
        if !self.backlog.is_empty() {
            self.backlog.push_back(command);
            return;
        }
        if let Err(PushError::Full(command)) = self.commands.push(command) {
            warn!(?command, "mix bus queue full, deferring");
            self.backlog.push_back(command);
        }
    }

    fn drain_backlog(&mut self) {
        while let Some(command) = self.backlog.pop_front() {
            if let Err(PushError::Full(command)) = self.commands.push(command) {
                self.backlog.push_front(command);
                break;
            }
        }
    }
}
