//! Contract of the synchronous hardware model driven by the monitor.
//!
//! The model itself (combinational and sequential logic evaluated per half
//! clock edge) lives outside this crate. The monitor only sets [`InputLines`],
//! calls [`HardwareModel::evaluate`] and reads back [`DebugLines`].

/// Input ports the monitor drives before each evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputLines {
    pub clock: bool,
    pub reset: bool,
    pub reset_vector: u16,
    pub int_vector: u8,
    pub int_priority: u8,
    pub int_data: u16,
    pub device_ready: bool,
    /// Pulsed for one cycle after the model acknowledged an interrupt.
    pub int_ack_clear: bool,
}

/// Debug outputs exposed by the model after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugLines {
    pub pc: u16,
    pub ir: u16,
    pub micro_pc: u8,
    pub psr: u16,
    pub registers: [u16; 8],
    pub halt: bool,
    /// Serial transmit line, idles high.
    pub uart_txd: bool,
    pub int_ack: bool,
    pub bus: u16,
    pub mar: u16,
    pub mdr: u16,
    pub dsr: u16,
    pub ddr: u16,
    pub mcr: u16,
}

impl Default for DebugLines {
    fn default() -> Self {
        Self {
            pc: 0,
            ir: 0,
            micro_pc: 0,
            psr: 0,
            registers: [0; 8],
            halt: false,
            uart_txd: true,
            int_ack: false,
            bus: 0,
            mar: 0,
            mdr: 0,
            dsr: 0,
            ddr: 0,
            mcr: 0,
        }
    }
}

/// A memory access asserted by the model during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryRequest {
    pub enable: bool,
    pub write_enable: bool,
    pub address: u16,
    pub data_in: u16,
}

/// Answer to a [`MemoryRequest`], `ready` is only set for enabled requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryResponse {
    pub data_out: u16,
    pub ready: bool,
}

/// Memory hook the model calls synchronously from inside [`HardwareModel::evaluate`].
pub trait MemoryPort {
    fn access(&mut self, request: MemoryRequest) -> MemoryResponse;
}

/// The opaque synchronous hardware model.
pub trait HardwareModel {
    fn inputs_mut(&mut self) -> &mut InputLines;
    fn outputs(&self) -> &DebugLines;
    /// Settles outputs for the current inputs, serving memory accesses through `memory`.
    fn evaluate(&mut self, memory: &mut dyn MemoryPort);
    /// Records the current signal values at `time` to the waveform sink, if the model has one.
    fn dump_trace(&mut self, _time: u64) {}
}

/// Connects to the hardware model linked into this build.
///
/// # Errors
/// - [`MachineError::ModelUnavailable`](crate::errors::MachineError::ModelUnavailable)
///   when the crate was built without the `verilated` feature
/// - [`MachineError::Model`](crate::errors::MachineError::Model) when the linked model
///   could not be constructed or its trace file could not be opened
pub fn connect(
    trace: Option<&std::path::Path>,
) -> Result<Box<dyn HardwareModel>, crate::errors::MachineError> {
    #[cfg(feature = "verilated")]
    {
        Ok(Box::new(super::verilated::VerilatedCore::new(trace)?))
    }
    #[cfg(not(feature = "verilated"))]
    {
        let _ = trace;
        Err(crate::errors::MachineError::ModelUnavailable)
    }
}
