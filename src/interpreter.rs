//! [`Vm`] implementation: drives a [`State`] through the fetch-decode-execute
//! loop until the top-level function returns or a fatal error halts it.

use std::rc::Rc;

use tracing::trace;

use crate::config::VmLimits;
use crate::error::VmResult;
use crate::opcode::Opcode;
use crate::prototype::Prototype;
use crate::state::State;

mod control;
mod dispatch;
mod load;
mod misc;
mod table_ops;

/// Outcome of a single dispatch step.
pub(crate) enum Control {
    Continue,
    Halt,
}

/// Terminal outcome of running a chunk to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// The top-level function reached a `RETURN` instruction.
    Return,
}

/// A single-threaded execution context: one [`State`] driven by the
/// dispatcher.
pub struct Vm {
    state: State,
}

impl Vm {
    pub fn new(proto: Rc<Prototype>) -> Self {
        Self { state: State::new(proto) }
    }

    /// Construct a `Vm` whose stack is sized per `limits.stack_margin`.
    pub fn with_limits(proto: Rc<Prototype>, limits: &VmLimits) -> Self {
        Self { state: State::with_limits(proto, limits) }
    }

    pub fn from_state(state: State) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Run the fetch-decode-execute loop until `RETURN` or a fatal error.
    pub fn run(&mut self) -> VmResult<ProgramState> {
        loop {
            let pc_before = self.state.pc();
            let instruction = self.state.fetch().map_err(|e| {
                tracing::error!(pc = pc_before, error = %e, "chunk fetch failed");
                e
            })?;
            trace!(pc = pc_before, op = instruction.opcode().name(), "dispatch");

            if instruction.opcode() == Opcode::Return {
                return Ok(ProgramState::Return);
            }

            match dispatch::step(&mut self.state, instruction) {
                Ok(Control::Continue) => {}
                Ok(Control::Halt) => return Ok(ProgramState::Return),
                Err(e) => {
                    let located = if e.pc.is_none() {
                        crate::error::VmError::at(e.kind.clone(), pc_before)
                    } else {
                        e
                    };
                    tracing::error!(pc = pc_before, error = %located, "dispatch failed");
                    return Err(located);
                }
            }
        }
    }
}

/// Load a chunk and run its top-level function to completion.
pub fn load_and_run(bytes: &[u8]) -> VmResult<ProgramState> {
    load_and_run_with_limits(bytes, &VmLimits::default())
}

/// Load a chunk and run its top-level function to completion, applying
/// `limits` to both the chunk reader and the `Vm`'s stack sizing.
pub fn load_and_run_with_limits(bytes: &[u8], limits: &VmLimits) -> VmResult<ProgramState> {
    let proto = crate::chunk::load_with_limits(bytes, limits)?;
    Vm::with_limits(proto, limits).run()
}
