//! Bit level receiver for the model's asynchronous serial transmit line.
//!
//! The line is sampled once per simulated clock cycle. A falling edge while
//! idle arms the receiver, the first data bit is sampled one and a half bit
//! periods later, then every bit period, LSB first. The stop bit is covered by
//! the countdown after the last data bit, so transitions inside a frame never
//! start a new one.

/// Clock and baud rate the receiver's countdowns derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartTiming {
    pub clock_hz: u32,
    pub baud: u32,
}

impl UartTiming {
    /// Ticks between two data bit samples.
    #[must_use]
    pub const fn bit_period(self) -> u32 {
        (self.clock_hz + self.baud / 2) / self.baud - 1
    }
    /// Ticks from the start bit edge to the first data bit sample.
    #[must_use]
    pub const fn start_delay(self) -> u32 {
        (3 * (self.clock_hz / 2) + self.baud / 2) / self.baud - 1
    }
}

impl Default for UartTiming {
    fn default() -> Self {
        Self {
            clock_hz: 50_000_000,
            baud: 115_200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UartReceiver {
    timing: UartTiming,
    shift: u8,
    bits_remaining: u8,
    countdown: u32,
}

impl Default for UartReceiver {
    fn default() -> Self {
        Self::new(UartTiming::default())
    }
}

impl UartReceiver {
    #[must_use]
    pub const fn new(timing: UartTiming) -> Self {
        Self {
            timing,
            shift: 0,
            bits_remaining: 0,
            countdown: 0,
        }
    }

    /// Advances the receiver by one clock tick with the current line level.
    /// Returns the received byte on the tick that samples the last data bit.
    pub fn tick(&mut self, rxd: bool) -> Option<u8> {
        if self.countdown > 0 {
            self.countdown -= 1;
        } else if self.bits_remaining > 0 {
            self.countdown = self.timing.bit_period();
            self.shift = (self.shift >> 1) | (u8::from(rxd) << 7);
            self.bits_remaining -= 1;
            if self.bits_remaining == 0 {
                return Some(std::mem::take(&mut self.shift));
            }
        } else if !rxd {
            self.countdown = self.timing.start_delay();
            self.bits_remaining = 8;
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use googletest::prelude::*;

    /// Line levels for one frame at `timing`: start bit, 8 data bits LSB first, stop bit.
    pub(crate) fn frame(timing: UartTiming, byte: u8) -> Vec<bool> {
        let ticks_per_bit = timing.bit_period() as usize + 1;
        let mut levels = vec![false; ticks_per_bit];
        for bit in 0..8 {
            levels.extend(std::iter::repeat_n((byte >> bit) & 1 == 1, ticks_per_bit));
        }
        levels.extend(std::iter::repeat_n(true, ticks_per_bit));
        levels
    }

    fn receive(receiver: &mut UartReceiver, levels: &[bool]) -> Vec<u8> {
        levels.iter().filter_map(|&level| receiver.tick(level)).collect()
    }

    #[gtest]
    pub fn test_default_timing_constants() {
        let timing = UartTiming::default();
        expect_that!(timing.bit_period(), eq(433));
        expect_that!(timing.start_delay(), eq(650));
    }

    #[gtest]
    pub fn test_receives_one_frame() {
        let timing = UartTiming::default();
        let mut receiver = UartReceiver::new(timing);
        let mut levels = vec![true; 100];
        levels.extend(frame(timing, b'A'));
        levels.extend(vec![true; 1000]);
        assert_eq!(receive(&mut receiver, &levels), vec![b'A']);
        expect_that!((receiver.bits_remaining, receiver.countdown), eq((0, 0)));
    }

    #[gtest]
    pub fn test_receives_back_to_back_frames() {
        let timing = UartTiming::default();
        let mut receiver = UartReceiver::new(timing);
        let mut levels = frame(timing, 0x00);
        levels.extend(frame(timing, 0xFF));
        levels.extend(frame(timing, 0xA5));
        levels.extend(vec![true; 10]);
        assert_eq!(receive(&mut receiver, &levels), vec![0x00, 0xFF, 0xA5]);
    }

    #[gtest]
    pub fn test_glitches_inside_frame_are_ignored() {
        let timing = UartTiming::default();
        let mut receiver = UartReceiver::new(timing);
        let mut levels = frame(timing, 0x5A);
        // toggle the line between sample points of each data bit
        let ticks_per_bit = timing.bit_period() as usize + 1;
        for bit in 1..=8 {
            let glitch = bit * ticks_per_bit + 3;
            levels[glitch] = !levels[glitch];
        }
        levels.extend(vec![true; 10]);
        assert_eq!(receive(&mut receiver, &levels), vec![0x5A]);
    }

    #[gtest]
    pub fn test_idle_line_produces_nothing() {
        let mut receiver = UartReceiver::default();
        expect_that!(receive(&mut receiver, &[true; 5000]).is_empty(), eq(true));
    }
}
