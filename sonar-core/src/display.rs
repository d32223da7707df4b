//! Screen contents
//!
//! Every screen is two fixed-width lines written from the first column of
//! each row. Lines are padded to [`FIELD_WIDTH`] so a short text fully
//! overwrites a longer one left over from the previous iteration.

use core::fmt::Write;

use heapless::String;

use crate::distance::Distance;
use crate::traits::{CharDisplay, CharDisplayExt, DisplayError};

/// Visible characters per field
pub const FIELD_WIDTH: usize = 8;

/// Rows every screen writes to
pub const SCREEN_ROWS: u8 = 2;

/// Formatting buffer for one line
pub type Line = String<16>;

/// Startup banner
pub const BANNER: [&str; 2] = ["HC-SR04 ", "SENSOR! "];

/// Label above a reading
pub const DISTANCE_LABEL: &str = "Distance";

/// Reading beyond the rated range
pub const OUT_OF_RANGE: [&str; 2] = ["Out of  ", " Range!!"];

/// No echo within the wait budget
pub const NO_ECHO: [&str; 2] = ["No echo ", "  Retry "];

/// What the display shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Startup banner
    Banner,
    /// An in-range reading
    Reading(Distance),
    /// A reading beyond the rated range
    OutOfRange,
    /// The sensor did not answer
    NoEcho,
}

impl Screen {
    /// Draw the screen
    pub fn render<D: CharDisplay>(&self, display: &mut D) -> Result<(), DisplayError> {
        match self {
            Screen::Banner => display.write_lines(BANNER[0], BANNER[1]),
            Screen::OutOfRange => display.write_lines(OUT_OF_RANGE[0], OUT_OF_RANGE[1]),
            Screen::NoEcho => display.write_lines(NO_ECHO[0], NO_ECHO[1]),
            Screen::Reading(distance) => {
                let value = format_distance(*distance)?;
                display.write_lines(DISTANCE_LABEL, &value)
            }
        }
    }
}

/// Format a distance as centimetres with one decimal
///
/// The integer part is right-aligned to three digits: 15 mm → `"  1.5 cm"`.
pub fn format_distance(distance: Distance) -> Result<Line, DisplayError> {
    let (cm, tenths) = distance.cm_tenths();
    let mut line = Line::new();
    write!(line, "{:>3}.{} cm", cm, tenths).map_err(|_| DisplayError::BufferOverflow)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Mock display remembering the last text per row
    #[derive(Default)]
    struct MockDisplay {
        rows: [Line; 2],
        row: usize,
    }

    impl CharDisplay for MockDisplay {
        fn clear(&mut self) -> Result<(), DisplayError> {
            self.rows = Default::default();
            Ok(())
        }

        fn set_cursor(&mut self, row: u8, _col: u8) -> Result<(), DisplayError> {
            self.row = row as usize;
            self.rows[self.row].clear();
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<(), DisplayError> {
            self.rows[self.row]
                .push_str(text)
                .map_err(|_| DisplayError::BufferOverflow)
        }
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(Distance::from_mm(15)).unwrap(), "  1.5 cm");
        assert_eq!(format_distance(Distance::from_mm(1)).unwrap(), "  0.1 cm");
        assert_eq!(format_distance(Distance::from_mm(4000)).unwrap(), "400.0 cm");
        assert_eq!(format_distance(Distance::from_mm(1234)).unwrap(), "123.4 cm");
    }

    #[test]
    fn test_format_beyond_three_digits() {
        assert_eq!(format_distance(Distance::from_mm(17_013)).unwrap(), "1701.3 cm");
        assert!(format_distance(Distance::from_mm(u32::MAX)).is_ok());
    }

    #[test]
    fn test_screens_fit_screen_rows() {
        assert_eq!(BANNER.len(), SCREEN_ROWS as usize);
        assert_eq!(OUT_OF_RANGE.len(), SCREEN_ROWS as usize);
        assert_eq!(NO_ECHO.len(), SCREEN_ROWS as usize);
    }

    #[test]
    fn test_fixed_texts_fill_field() {
        for text in BANNER.iter().chain(OUT_OF_RANGE.iter()).chain(NO_ECHO.iter()) {
            assert_eq!(text.len(), FIELD_WIDTH);
        }
        assert_eq!(DISTANCE_LABEL.len(), FIELD_WIDTH);
    }

    #[test]
    fn test_render_reading() {
        let mut display = MockDisplay::default();
        Screen::Reading(Distance::from_mm(15))
            .render(&mut display)
            .unwrap();
        assert_eq!(display.rows[0], "Distance");
        assert_eq!(display.rows[1], "  1.5 cm");
    }

    #[test]
    fn test_render_out_of_range() {
        let mut display = MockDisplay::default();
        Screen::OutOfRange.render(&mut display).unwrap();
        assert_eq!(display.rows[0], "Out of  ");
        assert_eq!(display.rows[1], " Range!!");
    }

    #[test]
    fn test_render_banner() {
        let mut display = MockDisplay::default();
        Screen::Banner.render(&mut display).unwrap();
        assert_eq!(display.rows[0], "HC-SR04 ");
        assert_eq!(display.rows[1], "SENSOR! ");
    }

    proptest! {
        #[test]
        fn prop_in_range_fills_field(mm in 0u32..=9999) {
            let line = format_distance(Distance::from_mm(mm)).unwrap();
            prop_assert_eq!(line.len(), FIELD_WIDTH);
            prop_assert!(line.ends_with(" cm"));
        }
    }
}
