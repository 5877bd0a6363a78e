//! Loop commands: run the machine for a number of cycles or instructions, or
//! until something stops it.
use crate::debugger::breakpoints::Breakpoints;
use crate::debugger::{Machine, Status};
use crate::errors::MachineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operator request to stop a running loop, shared with the signal handler
/// and the raw mode keyboard.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    Cycles(u64),
    Instructions(u64),
    /// Until a breakpoint, a halt or cancellation.
    Unbounded,
}

/// Why a loop command returned control to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Breakpoint(u16),
    Halted,
    /// Halted with halt-on-stop configured.
    Exit,
    Interrupted,
}

pub(super) const fn stop_reason(status: Status) -> Option<StopReason> {
    match status {
        Status::Running => None,
        Status::Halted => Some(StopReason::Halted),
        Status::Exit => Some(StopReason::Exit),
    }
}

impl Machine {
    /// Runs until `limit` is used up or a stop condition occurs.
    ///
    /// Before every step the loop checks for a breakpoint at the PC, which
    /// only counts while the micro-sequencer sits at the fetch boundary. A hit
    /// consumes the breakpoint: breakpoints are one-shot. Cancellation is
    /// checked before every cycle, also inside an instruction, so at most the
    /// cycle in progress completes after [`CancellationToken::cancel`].
    ///
    /// # Errors
    /// - See [`Machine::step_cycle`]
    pub fn run(
        &mut self,
        limit: RunLimit,
        breakpoints: &mut Breakpoints,
        cancel: &CancellationToken,
    ) -> Result<StopReason, MachineError> {
        let mut remaining = match limit {
            RunLimit::Cycles(n) | RunLimit::Instructions(n) => Some(n),
            RunLimit::Unbounded => None,
        };
        loop {
            if remaining == Some(0) {
                return Ok(StopReason::Completed);
            }
            let pc = self.lines().pc;
            if self.at_fetch_boundary() && breakpoints.remove(pc).is_ok() {
                return Ok(StopReason::Breakpoint(pc));
            }
            let stopped = match limit {
                RunLimit::Instructions(_) => self.step_instr(cancel)?,
                RunLimit::Cycles(_) | RunLimit::Unbounded => {
                    if cancel.is_cancelled() {
                        return Ok(StopReason::Interrupted);
                    }
                    stop_reason(self.step_cycle(false)?)
                }
            };
            if let Some(reason) = stopped {
                return Ok(reason);
            }
            remaining = remaining.map(|n| n - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::test_helpers::{FakeCore, reset_machine};
    use googletest::prelude::*;

    const NOPS: [u16; 6] = [0x1021; 6];

    #[gtest]
    pub fn test_cycle_limit() {
        let (mut machine, _) = reset_machine(&NOPS);
        let before = machine.cycles();
        let reason = machine
            .run(RunLimit::Cycles(7), &mut Breakpoints::new(), &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Completed));
        expect_that!(machine.cycles() - before, eq(7));
    }

    #[gtest]
    pub fn test_instruction_limit() {
        let (mut machine, _) = reset_machine(&NOPS);
        let before = machine.cycles();
        let reason = machine
            .run(
                RunLimit::Instructions(3),
                &mut Breakpoints::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        expect_that!(reason, eq(StopReason::Completed));
        expect_that!(machine.cycles() - before, eq(3 * FakeCore::CYCLES_PER_INSTRUCTION));
        expect_that!(machine.lines().pc, eq(0x3003));
        expect_that!(machine.at_fetch_boundary(), eq(true));
    }

    #[gtest]
    pub fn test_zero_count_does_nothing() {
        let (mut machine, _) = reset_machine(&NOPS);
        let before = machine.cycles();
        let reason = machine
            .run(RunLimit::Cycles(0), &mut Breakpoints::new(), &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Completed));
        expect_that!(machine.cycles(), eq(before));
    }

    #[gtest]
    pub fn test_unbounded_run_stops_on_halt() {
        let (mut machine, _) = reset_machine(&[0x1021, 0x1021, 0xF025]);
        let reason = machine
            .run(RunLimit::Unbounded, &mut Breakpoints::new(), &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Halted));
        expect_that!(machine.lines().pc, eq(0x3003));
    }

    #[gtest]
    pub fn test_breakpoint_stops_before_instruction_at_address() {
        let (mut machine, _) = reset_machine(&NOPS);
        let mut breakpoints = Breakpoints::new();
        breakpoints.insert(0x3002).unwrap();
        let reason = machine
            .run(RunLimit::Unbounded, &mut breakpoints, &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Breakpoint(0x3002)));
        expect_that!(machine.lines().pc, eq(0x3002));
        expect_that!(machine.at_fetch_boundary(), eq(true));
    }

    #[gtest]
    pub fn test_breakpoint_is_ignored_mid_instruction() {
        // fetch increments the PC on its first cycle, so PC passes x3001 while
        // the micro-sequencer is still inside the first instruction
        let (mut machine, _) = reset_machine(&NOPS);
        machine
            .run(RunLimit::Cycles(1), &mut Breakpoints::new(), &CancellationToken::new())
            .unwrap();
        expect_that!(machine.lines().pc, eq(0x3001));
        expect_that!(machine.at_fetch_boundary(), eq(false));

        let mut breakpoints = Breakpoints::new();
        breakpoints.insert(0x3001).unwrap();
        let reason = machine
            .run(RunLimit::Cycles(3), &mut breakpoints, &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Completed));
        expect_that!(breakpoints.is_set(0x3001), eq(true));
    }

    /// Breakpoints are one-shot: a hit removes the breakpoint, continuing again
    /// runs past the same address. This is the documented contract, not an
    /// oversight of the test.
    #[gtest]
    pub fn test_breakpoint_hit_consumes_breakpoint() {
        let (mut machine, _) = reset_machine(&[0x0FFF]);
        let mut breakpoints = Breakpoints::new();
        breakpoints.insert(0x3000).unwrap();
        let cancel = CancellationToken::new();

        let reason = machine.run(RunLimit::Unbounded, &mut breakpoints, &cancel).unwrap();
        expect_that!(reason, eq(StopReason::Breakpoint(0x3000)));
        expect_that!(breakpoints.is_set(0x3000), eq(false));
        expect_that!(breakpoints.is_empty(), eq(true));

        let reason = machine.run(RunLimit::Instructions(1), &mut breakpoints, &cancel).unwrap();
        expect_that!(reason, eq(StopReason::Completed));
        expect_that!(machine.lines().pc, eq(0x3001));
    }

    #[gtest]
    pub fn test_breakpoint_discards_remaining_count() {
        let (mut machine, _) = reset_machine(&NOPS);
        let mut breakpoints = Breakpoints::new();
        breakpoints.insert(0x3001).unwrap();
        let before = machine.cycles();
        let reason = machine
            .run(RunLimit::Instructions(4), &mut breakpoints, &CancellationToken::new())
            .unwrap();
        expect_that!(reason, eq(StopReason::Breakpoint(0x3001)));
        expect_that!(machine.cycles() - before, eq(FakeCore::CYCLES_PER_INSTRUCTION));
    }

    #[gtest]
    pub fn test_cancellation_stops_within_one_cycle() {
        let (mut machine, probe) = reset_machine(&NOPS);
        let cancel = CancellationToken::new();
        let before = machine.cycles();
        probe.borrow_mut().cancel_on_poll = Some((8, cancel.clone()));
        let reason = machine
            .run(RunLimit::Unbounded, &mut Breakpoints::new(), &cancel)
            .unwrap();
        expect_that!(reason, eq(StopReason::Interrupted));
        expect_that!(machine.cycles() - before, eq(8));
    }

    #[gtest]
    pub fn test_cancellation_inside_instruction() {
        let (mut machine, probe) = reset_machine(&NOPS);
        let cancel = CancellationToken::new();
        let before = machine.cycles();
        probe.borrow_mut().cancel_on_poll = Some((7, cancel.clone()));
        let reason = machine
            .run(RunLimit::Instructions(5), &mut Breakpoints::new(), &cancel)
            .unwrap();
        expect_that!(reason, eq(StopReason::Interrupted));
        expect_that!(machine.cycles() - before, eq(7));
        expect_that!(machine.at_fetch_boundary(), eq(false));
    }

    #[gtest]
    pub fn test_pending_cancellation_runs_nothing() {
        let (mut machine, _) = reset_machine(&NOPS);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let before = machine.cycles();
        let reason = machine
            .run(RunLimit::Cycles(3), &mut Breakpoints::new(), &cancel)
            .unwrap();
        expect_that!(reason, eq(StopReason::Interrupted));
        expect_that!(machine.cycles(), eq(before));
    }

    #[gtest]
    pub fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let handler_copy = token.clone();
        handler_copy.cancel();
        expect_that!(token.is_cancelled(), eq(true));
        token.reset();
        expect_that!(handler_copy.is_cancelled(), eq(false));
    }
}
