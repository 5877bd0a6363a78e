use crate::errors::CommandError;

/// Whitespace separated tokens of a command line, consumed front to back.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    #[must_use]
    pub const fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// The next token, or `""` once the line is used up.
    pub fn next_token(&mut self) -> &'a str {
        let trimmed = self.rest.trim_start();
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        token
    }

    /// True when only whitespace is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rest.trim_start().is_empty()
    }

    /// Parses the next token as unsigned hexadecimal, `x` and `0x` prefixes allowed.
    ///
    /// # Errors
    /// - [`CommandError::InvalidHex`] with the offending token, empty if there is none
    pub fn next_hex(&mut self) -> Result<usize, CommandError> {
        let token = self.next_token();
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .or_else(|| token.strip_prefix('x'))
            .or_else(|| token.strip_prefix('X'))
            .unwrap_or(token);
        parse_digits(digits, 16).ok_or_else(|| CommandError::InvalidHex(token.to_string()))
    }

    /// # Errors
    /// - [`CommandError::InvalidDec`] with the offending token, empty if there is none
    pub fn next_dec(&mut self) -> Result<usize, CommandError> {
        let token = self.next_token();
        parse_digits(token, 10).ok_or_else(|| CommandError::InvalidDec(token.to_string()))
    }

    /// A hexadecimal 16 bit address.
    ///
    /// # Errors
    /// - See [`Tokens::next_hex`]
    /// - [`CommandError::AddressOutOfRange`] if the value does not fit 16 bits
    pub fn next_address(&mut self) -> Result<u16, CommandError> {
        let value = self.next_hex()?;
        u16::try_from(value).map_err(|_| CommandError::AddressOutOfRange(value))
    }

    /// An optional decimal count, `default` if the line is used up.
    ///
    /// # Errors
    /// - See [`Tokens::next_dec`]
    pub fn next_count(&mut self, default: usize) -> Result<usize, CommandError> {
        if self.is_empty() {
            Ok(default)
        } else {
            self.next_dec()
        }
    }
}

fn parse_digits(digits: &str, radix: u32) -> Option<usize> {
    // from_str_radix also takes a sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    usize::from_str_radix(digits, radix).ok()
}
