//! Binding to the Verilator build of the iit3503 core.
//!
//! The generated C++ model is wrapped by a small C ABI shim linked as
//! `libiit3503`. The shim copies the port values from and to the plain structs
//! below and calls back into Rust for every memory access it sees during
//! `eval()`.
use crate::errors::MachineError;
use crate::hardware::model::{DebugLines, HardwareModel, InputLines, MemoryPort, MemoryRequest};
use std::ffi::{CString, c_char, c_int, c_void};
use std::path::Path;
use std::ptr::NonNull;

#[repr(C)]
#[derive(Default)]
struct RawInputs {
    clock: u8,
    reset: u8,
    reset_vector: u16,
    int_vector: u8,
    int_priority: u8,
    int_data: u16,
    device_ready: u8,
    int_ack_clear: u8,
}

#[repr(C)]
#[derive(Default)]
struct RawOutputs {
    pc: u16,
    ir: u16,
    micro_pc: u8,
    psr: u16,
    registers: [u16; 8],
    halt: u8,
    uart_txd: u8,
    int_ack: u8,
    bus: u16,
    mar: u16,
    mdr: u16,
    dsr: u16,
    ddr: u16,
    mcr: u16,
}

#[repr(C)]
struct RawMemoryRequest {
    enable: u8,
    write_enable: u8,
    address: u16,
    data_in: u16,
}

#[repr(C)]
struct RawMemoryResponse {
    data_out: u16,
    ready: u8,
}

type MemoryCallback = extern "C" fn(*mut c_void, RawMemoryRequest) -> RawMemoryResponse;

#[link(name = "iit3503")]
unsafe extern "C" {
    fn iit3503_new() -> *mut c_void;
    fn iit3503_free(model: *mut c_void);
    fn iit3503_eval(
        model: *mut c_void,
        inputs: *const RawInputs,
        outputs: *mut RawOutputs,
        memory: MemoryCallback,
        context: *mut c_void,
    );
    fn iit3503_trace_open(model: *mut c_void, path: *const c_char) -> c_int;
    fn iit3503_trace_dump(model: *mut c_void, time: u64);
}

extern "C" fn serve_memory(context: *mut c_void, raw: RawMemoryRequest) -> RawMemoryResponse {
    // SAFETY: `context` is the `&mut &mut dyn MemoryPort` handed to `iit3503_eval`
    // by `evaluate`, it outlives the call that invokes this callback.
    let memory = unsafe { &mut *context.cast::<&mut dyn MemoryPort>() };
    let response = memory.access(MemoryRequest {
        enable: raw.enable != 0,
        write_enable: raw.write_enable != 0,
        address: raw.address,
        data_in: raw.data_in,
    });
    RawMemoryResponse {
        data_out: response.data_out,
        ready: u8::from(response.ready),
    }
}

pub struct VerilatedCore {
    handle: NonNull<c_void>,
    inputs: InputLines,
    outputs: DebugLines,
    tracing: bool,
}

impl VerilatedCore {
    /// # Errors
    /// - [`MachineError::Model`] when the model cannot be created or the trace
    ///   file cannot be opened
    pub fn new(trace: Option<&Path>) -> Result<Self, MachineError> {
        // SAFETY: plain constructor without preconditions, null signals failure.
        let handle = NonNull::new(unsafe { iit3503_new() })
            .ok_or_else(|| MachineError::Model("Could not allocate the model".to_string()))?;
        let mut core = Self {
            handle,
            inputs: InputLines::default(),
            outputs: DebugLines::default(),
            tracing: false,
        };
        if let Some(path) = trace {
            let c_path = CString::new(path.to_string_lossy().as_bytes())
                .map_err(|e| MachineError::Model(format!("Invalid trace path: {e}")))?;
            // SAFETY: handle is live, the path is NUL terminated and copied by the shim.
            if unsafe { iit3503_trace_open(core.handle.as_ptr(), c_path.as_ptr()) } != 0 {
                return Err(MachineError::Model(format!(
                    "Could not open trace file '{}'",
                    path.display()
                )));
            }
            core.tracing = true;
        }
        Ok(core)
    }
}

impl Drop for VerilatedCore {
    fn drop(&mut self) {
        // SAFETY: handle came from `iit3503_new` and is freed exactly once,
        // the shim closes an open trace file.
        unsafe { iit3503_free(self.handle.as_ptr()) };
    }
}

impl HardwareModel for VerilatedCore {
    fn inputs_mut(&mut self) -> &mut InputLines {
        &mut self.inputs
    }

    fn outputs(&self) -> &DebugLines {
        &self.outputs
    }

    fn evaluate(&mut self, mut memory: &mut dyn MemoryPort) {
        let inputs = RawInputs {
            clock: u8::from(self.inputs.clock),
            reset: u8::from(self.inputs.reset),
            reset_vector: self.inputs.reset_vector,
            int_vector: self.inputs.int_vector,
            int_priority: self.inputs.int_priority,
            int_data: self.inputs.int_data,
            device_ready: u8::from(self.inputs.device_ready),
            int_ack_clear: u8::from(self.inputs.int_ack_clear),
        };
        let mut settled = RawOutputs::default();
        let context = (&raw mut memory).cast::<c_void>();
        // SAFETY: all pointers are valid for the duration of the call, the
        // callback only runs inside it.
        unsafe {
            iit3503_eval(
                self.handle.as_ptr(),
                &raw const inputs,
                &raw mut settled,
                serve_memory,
                context,
            );
        }
        self.outputs = DebugLines {
            pc: settled.pc,
            ir: settled.ir,
            micro_pc: settled.micro_pc,
            psr: settled.psr,
            registers: settled.registers,
            halt: settled.halt != 0,
            uart_txd: settled.uart_txd != 0,
            int_ack: settled.int_ack != 0,
            bus: settled.bus,
            mar: settled.mar,
            mdr: settled.mdr,
            dsr: settled.dsr,
            ddr: settled.ddr,
            mcr: settled.mcr,
        };
    }

    fn dump_trace(&mut self, time: u64) {
        if self.tracing {
            // SAFETY: handle is live and a trace file is open.
            unsafe { iit3503_trace_dump(self.handle.as_ptr(), time) };
        }
    }
}
