use crate::hardware::model::InputLines;

/// Vector raised for keyboard input.
pub const KEYBOARD_VECTOR: u8 = 0x80;
/// Priority raised for keyboard input.
pub const KEYBOARD_PRIORITY: u8 = 4;

/// Pending interrupt signal lines.
///
/// There is a single device ready line: raising again before the model
/// acknowledged overwrites vector, priority and data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptController {
    vector: u8,
    priority: u8,
    data: u16,
    device_ready: bool,
    acknowledged: bool,
}

impl InterruptController {
    pub const fn raise(&mut self, vector: u8, priority: u8, data: u16) {
        self.vector = vector;
        self.priority = priority;
        self.data = data;
        self.device_ready = true;
    }

    pub const fn raise_keyboard(&mut self, character: u8) {
        self.raise(KEYBOARD_VECTOR, KEYBOARD_PRIORITY, character as u16);
    }

    /// Called when the model asserted its acknowledge line, drops device ready.
    pub const fn acknowledge(&mut self) {
        self.device_ready = false;
        self.acknowledged = true;
    }

    /// Drives the interrupt inputs of the model. The acknowledge clear line is
    /// pulsed for exactly one drive after [`InterruptController::acknowledge`].
    pub const fn drive(&mut self, inputs: &mut InputLines) {
        inputs.int_vector = self.vector;
        inputs.int_priority = self.priority;
        inputs.int_data = self.data;
        inputs.device_ready = self.device_ready;
        inputs.int_ack_clear = self.acknowledged;
        self.acknowledged = false;
    }
}
