//! Character display trait
//!
//! The display driver itself lives outside the core. The controller only
//! needs to clear the screen and put text at a position.

/// Errors that can occur while talking to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Bus or pin write failed
    Bus,
    /// Cursor position outside the panel
    InvalidPosition,
    /// Text did not fit the formatting buffer
    BufferOverflow,
}

/// Trait for a character display (HD44780-style 2x8, 2x16, ...)
pub trait CharDisplay {
    /// Clear the entire screen and home the cursor
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Move the cursor
    ///
    /// - `row`: Row number (0-based)
    /// - `col`: Column number (0-based)
    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), DisplayError>;

    /// Write ASCII text at the cursor position
    fn write_text(&mut self, text: &str) -> Result<(), DisplayError>;
}

/// Helper trait for line-oriented output
pub trait CharDisplayExt: CharDisplay {
    /// Write `text` starting at the first column of `row`
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), DisplayError> {
        self.set_cursor(row, 0)?;
        self.write_text(text)
    }

    /// Write two lines, top row first
    fn write_lines(&mut self, top: &str, bottom: &str) -> Result<(), DisplayError> {
        self.write_line(0, top)?;
        self.write_line(1, bottom)
    }
}

// Blanket implementation for all CharDisplay types
impl<T: CharDisplay> CharDisplayExt for T {}
