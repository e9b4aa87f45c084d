//! The wiring layer of the datapath.
//!
//! All signals live in a [`SignalBank`] arena; units refer to their
//! endpoints through the copyable [`OutPin`] and [`InPin`] indices rather
//! than pointers, so the processor stays the single owner of every unit.
//! Driving an output copies the value into every subscribed input and
//! queues the input's owning unit for notification. The processor drains
//! the queue after each unit it runs: combinational units recompute on
//! notification, clocked units ignore it, which is what breaks every cycle
//! in the graph and guarantees the drain terminates.

use crate::common::Word;

use super::UnitId;

/// Handle to an output signal (the driving end of a wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutPin(usize);

/// Handle to an input signal (a receiving end of a wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InPin(usize);

struct OutputSignal {
    value: Word,
    subscribers: Vec<InPin>,
}

struct InputSignal {
    value: Word,
    owner: UnitId,
    connected: bool,
}

/// Arena of every signal in the datapath, plus the pending-notification
/// stack.
pub struct SignalBank {
    outputs: Vec<OutputSignal>,
    inputs: Vec<InputSignal>,
    pending: Vec<UnitId>,
}

impl SignalBank {
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            inputs: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Allocates an output signal, initially zero.
    pub fn output(&mut self) -> OutPin {
        self.outputs.push(OutputSignal {
            value: Word::ZERO,
            subscribers: Vec::new(),
        });
        OutPin(self.outputs.len() - 1)
    }

    /// Allocates an input signal owned by `owner`, initially zero.
    pub fn input(&mut self, owner: UnitId) -> InPin {
        self.input_with(owner, Word::ZERO)
    }

    /// Allocates an input signal with a fixed initial value. Used for
    /// constant operands that are never driven.
    pub fn input_with(&mut self, owner: UnitId, value: Word) -> InPin {
        self.inputs.push(InputSignal {
            value,
            owner,
            connected: false,
        });
        InPin(self.inputs.len() - 1)
    }

    /// Subscribes `input` to `output`. Connections are made once, at
    /// construction; an input accepts at most one driver.
    pub fn connect(&mut self, output: OutPin, input: InPin) {
        debug_assert!(
            !self.inputs[input.0].connected,
            "input signal connected to a second output"
        );
        self.inputs[input.0].connected = true;
        self.outputs[output.0].subscribers.push(input);
    }

    /// Drives `output` to `value`: every subscribed input takes the value
    /// and its owner is queued for notification, whether or not the value
    /// changed.
    pub fn drive(&mut self, output: OutPin, value: Word) {
        self.outputs[output.0].value = value;
        for i in 0..self.outputs[output.0].subscribers.len() {
            let input = self.outputs[output.0].subscribers[i];
            self.inputs[input.0].value = value;
            self.pending.push(self.inputs[input.0].owner);
        }
    }

    /// Writes an input directly, bypassing its driver. Used by the
    /// forwarding unit to patch latch inputs in the priority phase.
    pub fn poke(&mut self, input: InPin, value: Word) {
        self.inputs[input.0].value = value;
        self.pending.push(self.inputs[input.0].owner);
    }

    /// Current value of an input signal.
    pub fn get(&self, input: InPin) -> Word {
        self.inputs[input.0].value
    }

    /// Current value of an output signal.
    pub fn get_out(&self, output: OutPin) -> Word {
        self.outputs[output.0].value
    }

    /// Pops the most recently queued notification, depth-first.
    pub fn take_pending(&mut self) -> Option<UnitId> {
        self.pending.pop()
    }
}

impl Default for SignalBank {
    fn default() -> Self {
        Self::new()
    }
}
