/// Interprets the lowest `width` bits of `bits` as a two's complement number.
///
/// Bits above `width` are ignored, so callers can pass a whole instruction word
/// masked or unmasked.
#[must_use]
pub const fn sign_extend(bits: u16, width: u8) -> i16 {
    debug_assert!(width > 0 && width <= 16, "width must be within 1..=16");
    let shift = 16 - width as u32;
    #[expect(
        clippy::cast_possible_wrap,
        reason = "reinterpreting the shifted bits as signed is the point of the conversion"
    )]
    let shifted = (bits << shift) as i16;
    shifted >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        nine_bit_minus_one = { 0x1FF, 9, -1 },
        nine_bit_max = { 0x0FF, 9, 255 },
        nine_bit_min = { 0x100, 9, -256 },
        five_bit_minus_three = { 0b1_1101, 5, -3 },
        six_bit_positive = { 0b01_0101, 6, 21 },
        eleven_bit_min = { 0x400, 11, -1024 },
        upper_bits_ignored = { 0xFE01, 9, 1 },
        full_width = { 0x8000, 16, i16::MIN },
    )]
    fn test_sign_extend(bits: u16, width: u8, expected: i16) {
        assert_eq!(sign_extend(bits, width), expected);
    }
}
