//! HD44780 character LCD driver
//!
//! 4-bit parallel bus, write-only (R/W tied to ground), so every command is
//! followed by a fixed delay instead of a busy-flag poll.
//!
//! Rows are addressed through the controller's DDRAM layout: row 0 starts at
//! 0x00, row 1 at 0x40, rows 2 and 3 (on 4-line panels) at 0x14 and 0x54.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use sonar_core::traits::{CharDisplay, DisplayError};

/// HD44780 commands
mod cmd {
    pub const CLEAR: u8 = 0x01;
    pub const ENTRY_MODE: u8 = 0x04;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const FUNCTION_SET: u8 = 0x20;
    pub const SET_DDRAM: u8 = 0x80;

    // ENTRY_MODE flags
    pub const ENTRY_INCREMENT: u8 = 0x02;

    // DISPLAY_CONTROL flags
    pub const DISPLAY_ON: u8 = 0x04;

    // FUNCTION_SET flags
    pub const TWO_LINES: u8 = 0x08;
}

/// DDRAM address of the first column of each row
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Power-on settling time (ms)
const POWER_ON_MS: u32 = 50;

/// Execution time of ordinary commands and data writes (µs)
const COMMAND_US: u32 = 50;

/// Execution time of clear and home (µs)
const CLEAR_US: u32 = 2_000;

/// Pins of a 4-bit HD44780 bus
pub struct LcdBus<RS, EN, D4, D5, D6, D7> {
    /// Register select: low = command, high = data
    pub rs: RS,
    /// Enable strobe; data is latched on its falling edge
    pub en: EN,
    /// Data line 4
    pub d4: D4,
    /// Data line 5
    pub d5: D5,
    /// Data line 6
    pub d6: D6,
    /// Data line 7
    pub d7: D7,
}

/// HD44780 driver
pub struct Hd44780<RS, EN, D4, D5, D6, D7, D> {
    bus: LcdBus<RS, EN, D4, D5, D6, D7>,
    delay: D,
    rows: u8,
    cols: u8,
    /// Cursor column, tracked to reject writes past the end of a row
    col: u8,
}

impl<RS, EN, D4, D5, D6, D7, D> Hd44780<RS, EN, D4, D5, D6, D7, D>
where
    RS: OutputPin,
    EN: OutputPin,
    D4: OutputPin,
    D5: OutputPin,
    D6: OutputPin,
    D7: OutputPin,
    D: DelayNs,
{
    /// Create a driver for a panel of `rows` x `cols` characters
    ///
    /// Call [`Self::init`] before writing anything.
    pub fn new(bus: LcdBus<RS, EN, D4, D5, D6, D7>, delay: D, rows: u8, cols: u8) -> Self {
        Self {
            bus,
            delay,
            rows: rows.min(ROW_OFFSETS.len() as u8),
            cols,
            col: 0,
        }
    }

    /// Run the 4-bit initialisation sequence and clear the screen
    ///
    /// Leaves the display on with the cursor hidden and the address
    /// auto-incrementing.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.bus.en.set_low().map_err(|_| DisplayError::Bus)?;
        self.bus.rs.set_low().map_err(|_| DisplayError::Bus)?;
        self.delay.delay_ms(POWER_ON_MS);

        // Force 8-bit mode from any state, then switch to 4-bit
        self.write_nibble(0x3)?;
        self.delay.delay_us(4_500);
        self.write_nibble(0x3)?;
        self.delay.delay_us(150);
        self.write_nibble(0x3)?;
        self.delay.delay_us(COMMAND_US);
        self.write_nibble(0x2)?;
        self.delay.delay_us(COMMAND_US);

        let lines = if self.rows > 1 { cmd::TWO_LINES } else { 0 };
        self.command(cmd::FUNCTION_SET | lines)?;
        self.command(cmd::DISPLAY_CONTROL | cmd::DISPLAY_ON)?;
        self.clear()?;
        self.command(cmd::ENTRY_MODE | cmd::ENTRY_INCREMENT)
    }

    /// Move the cursor using 1-based line and column numbers
    ///
    /// `(1, 1)` is the top-left character.
    pub fn set_position(&mut self, line: u8, column: u8) -> Result<(), DisplayError> {
        if line == 0 || column == 0 {
            return Err(DisplayError::InvalidPosition);
        }
        self.set_cursor(line - 1, column - 1)
    }

    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.bus.rs.set_low().map_err(|_| DisplayError::Bus)?;
        self.write_byte(byte)
    }

    fn data(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.bus.rs.set_high().map_err(|_| DisplayError::Bus)?;
        self.write_byte(byte)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.write_nibble(byte >> 4)?;
        self.write_nibble(byte & 0x0F)?;
        self.delay.delay_us(COMMAND_US);
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8) -> Result<(), DisplayError> {
        set_level(&mut self.bus.d4, nibble & 0x1 != 0)?;
        set_level(&mut self.bus.d5, nibble & 0x2 != 0)?;
        set_level(&mut self.bus.d6, nibble & 0x4 != 0)?;
        set_level(&mut self.bus.d7, nibble & 0x8 != 0)?;

        self.bus.en.set_high().map_err(|_| DisplayError::Bus)?;
        self.delay.delay_us(1);
        self.bus.en.set_low().map_err(|_| DisplayError::Bus)?;
        self.delay.delay_us(1);
        Ok(())
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), DisplayError> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| DisplayError::Bus)
}

impl<RS, EN, D4, D5, D6, D7, D> CharDisplay for Hd44780<RS, EN, D4, D5, D6, D7, D>
where
    RS: OutputPin,
    EN: OutputPin,
    D4: OutputPin,
    D5: OutputPin,
    D6: OutputPin,
    D7: OutputPin,
    D: DelayNs,
{
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::CLEAR)?;
        self.delay.delay_us(CLEAR_US);
        self.col = 0;
        Ok(())
    }

    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), DisplayError> {
        if row >= self.rows || col >= self.cols {
            return Err(DisplayError::InvalidPosition);
        }
        self.command(cmd::SET_DDRAM | (ROW_OFFSETS[row as usize] + col))?;
        self.col = col;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), DisplayError> {
        for ch in text.chars() {
            if self.col >= self.cols {
                return Err(DisplayError::InvalidPosition);
            }
            let byte = if ch.is_ascii() && !ch.is_ascii_control() {
                ch as u8
            } else {
                b'?'
            };
            self.data(byte)?;
            self.col += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use heapless::Vec;

    /// Bus lines as seen by the controller, plus every latched nibble
    #[derive(Default)]
    struct BusState {
        lines: [bool; 6],
        latched: Vec<(bool, u8), 512>,
        fail: bool,
    }

    const RS: usize = 0;
    const EN: usize = 1;
    const D4: usize = 2;

    #[derive(Debug)]
    struct BusError;

    impl embedded_hal::digital::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Mock pin wired to one line of the shared bus
    struct MockPin<'a> {
        bus: &'a RefCell<BusState>,
        line: usize,
    }

    impl ErrorType for MockPin<'_> {
        type Error = BusError;
    }

    impl OutputPin for MockPin<'_> {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            let mut bus = self.bus.borrow_mut();
            if bus.fail {
                return Err(BusError);
            }
            if self.line == EN && bus.lines[EN] {
                // Falling edge of EN latches the data lines
                let nibble = (0..4).fold(0u8, |n, i| n | ((bus.lines[D4 + i] as u8) << i));
                let rs = bus.lines[RS];
                let _ = bus.latched.push((rs, nibble));
            }
            bus.lines[self.line] = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            let mut bus = self.bus.borrow_mut();
            if bus.fail {
                return Err(BusError);
            }
            bus.lines[self.line] = true;
            Ok(())
        }
    }

    /// Mock delay accumulating the requested time
    struct MockDelay<'a> {
        total_ns: &'a Cell<u64>,
    }

    impl DelayNs for MockDelay<'_> {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns.set(self.total_ns.get() + ns as u64);
        }
    }

    type TestLcd<'a> = Hd44780<
        MockPin<'a>,
        MockPin<'a>,
        MockPin<'a>,
        MockPin<'a>,
        MockPin<'a>,
        MockPin<'a>,
        MockDelay<'a>,
    >;

    fn lcd<'a>(bus: &'a RefCell<BusState>, elapsed: &'a Cell<u64>) -> TestLcd<'a> {
        let pin = |line| MockPin { bus, line };
        Hd44780::new(
            LcdBus {
                rs: pin(RS),
                en: pin(EN),
                d4: pin(D4),
                d5: pin(D4 + 1),
                d6: pin(D4 + 2),
                d7: pin(D4 + 3),
            },
            MockDelay { total_ns: elapsed },
            2,
            16,
        )
    }

    /// Reassemble latched nibbles into (rs, byte) pairs, skipping `skip` nibbles
    fn bytes(bus: &RefCell<BusState>, skip: usize) -> Vec<(bool, u8), 256> {
        let bus = bus.borrow();
        bus.latched[skip..]
            .chunks(2)
            .map(|pair| (pair[0].0, (pair[0].1 << 4) | pair[1].1))
            .collect()
    }

    #[test]
    fn test_init_sequence() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.init().unwrap();

        let nibbles: Vec<u8, 4> = bus.borrow().latched[..4].iter().map(|&(_, n)| n).collect();
        assert_eq!(nibbles.as_slice(), &[0x3u8, 0x3, 0x3, 0x2]);
        assert_eq!(
            bytes(&bus, 4).as_slice(),
            &[(false, 0x28u8), (false, 0x0C), (false, 0x01), (false, 0x06)]
        );
        // At least the 50 ms power-on wait
        assert!(elapsed.get() >= 50_000_000);
    }

    #[test]
    fn test_write_text_sends_data() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.write_text("Hi").unwrap();

        assert_eq!(bytes(&bus, 0).as_slice(), &[(true, b'H'), (true, b'i')]);
    }

    #[test]
    fn test_non_ascii_replaced() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.write_text("µ").unwrap();
        assert_eq!(bytes(&bus, 0).as_slice(), &[(true, b'?')]);
    }

    #[test]
    fn test_set_cursor_second_row() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.set_cursor(1, 3).unwrap();
        assert_eq!(bytes(&bus, 0).as_slice(), &[(false, 0x80u8 | 0x43)]);
    }

    #[test]
    fn test_one_based_position() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.set_position(2, 1).unwrap();
        assert_eq!(bytes(&bus, 0).as_slice(), &[(false, 0xC0u8)]);
        assert_eq!(lcd.set_position(0, 1), Err(DisplayError::InvalidPosition));
    }

    #[test]
    fn test_position_out_of_panel() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        assert_eq!(lcd.set_cursor(2, 0), Err(DisplayError::InvalidPosition));
        assert_eq!(lcd.set_cursor(0, 16), Err(DisplayError::InvalidPosition));
        assert!(bus.borrow().latched.is_empty());
    }

    #[test]
    fn test_write_past_row_end() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        lcd.set_cursor(0, 14).unwrap();
        assert_eq!(lcd.write_text("abc"), Err(DisplayError::InvalidPosition));
    }

    #[test]
    fn test_bus_error() {
        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        bus.borrow_mut().fail = true;
        assert_eq!(lcd.clear(), Err(DisplayError::Bus));
    }

    #[test]
    fn test_renders_core_screen() {
        use sonar_core::display::Screen;
        use sonar_core::Distance;

        let bus = RefCell::new(BusState::default());
        let elapsed = Cell::new(0);
        let mut lcd = lcd(&bus, &elapsed);

        Screen::Reading(Distance::from_mm(15))
            .render(&mut lcd)
            .unwrap();

        let sent = bytes(&bus, 0);
        let text: Vec<u8, 32> = sent.iter().filter(|(rs, _)| *rs).map(|&(_, b)| b).collect();
        assert_eq!(text.as_slice(), b"Distance  1.5 cm");
        assert_eq!(sent[0], (false, 0x80));
        assert_eq!(sent[9], (false, 0xC0));
    }
}
