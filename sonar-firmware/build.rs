//! Build script for sonar-firmware
//!
//! - Sets up linker search paths and scripts for the RP2040
//! - Validates sonar.toml at compile time
//! - Generates `board_config.rs` with the validated configuration as consts

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sonar_core::config::{
    BoardPins, EchoWait, LcdPins, PinAssignmentError, PinConfig, Polarity, SonarConfig,
};

/// GPIOs on the RP2040
const GPIO_COUNT: u8 = 30;

/// sonar.toml as written by the user
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    sonar: SonarConfig,
    pins: PinSection,
    lcd: LcdSection,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PinSection {
    trigger: String,
    echo: String,
    sense: String,
    backlight: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LcdSection {
    rows: u8,
    cols: u8,
    rs: String,
    en: String,
    d4: String,
    d5: String,
    d6: String,
    d7: String,
}

fn main() {
    setup_linker();
    let (config, pins, lcd) = validate_config();
    generate_board_config(&config, &pins, &lcd);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    if env::var("CARGO_FEATURE_DEFMT").is_ok() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate sonar.toml configuration at compile time
fn validate_config() -> (SonarConfig, BoardPins, LcdSection) {
    // Re-run if sonar.toml changes
    println!("cargo:rerun-if-changed=sonar.toml");

    let config_path = Path::new("sonar.toml");

    // Check if config file exists
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: sonar.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a sonar.toml configuration file.          ║\n\
            ║  Please create one in the sonar-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    // Read the config file
    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read sonar.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Parse TOML syntax and structure
    let file: ConfigFile = match toml::from_str(&config_content) {
        Ok(file) => file,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid sonar.toml                                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    if let Err(e) = file.sonar.validate() {
        errors.push(format!("[sonar] {:?}", e));
    }

    let pins = parse_pins(&file.pins, &file.lcd, &mut errors);

    if pins.backlight.inverted {
        errors.push(
            "[pins] backlight must not be inverted; set sonar.backlight_polarity".to_string(),
        );
    }
    if pins.echo.inverted || pins.trigger.inverted {
        errors.push("[pins] trigger and echo follow the sensor's levels and cannot be inverted".to_string());
    }
    if file.lcd.rows < sonar_core::display::SCREEN_ROWS || file.lcd.rows > 4 {
        errors.push(format!(
            "[lcd] rows must be {}-4",
            sonar_core::display::SCREEN_ROWS
        ));
    }
    if (file.lcd.cols as usize) < sonar_core::display::FIELD_WIDTH {
        errors.push(format!(
            "[lcd] cols must be at least {}",
            sonar_core::display::FIELD_WIDTH
        ));
    }

    match pins.validate(GPIO_COUNT) {
        Ok(()) => {}
        Err(PinAssignmentError::Duplicate(pin)) => {
            errors.push(format!("gpio{} is assigned more than once", pin))
        }
        Err(PinAssignmentError::OutOfRange(pin)) => {
            errors.push(format!("gpio{} does not exist (RP2040 has gpio0-gpio29)", pin))
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in sonar.toml                      ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=sonar.toml validated successfully");
    (file.sonar, pins, file.lcd)
}

/// Parse every pin string, collecting errors
fn parse_pins(pins: &PinSection, lcd: &LcdSection, errors: &mut Vec<String>) -> BoardPins {
    let mut parse = |section: &str, name: &str, value: &str| {
        PinConfig::parse(value).unwrap_or_else(|| {
            errors.push(format!("[{}] {} = \"{}\" is not a valid pin", section, name, value));
            PinConfig::default()
        })
    };

    BoardPins {
        trigger: parse("pins", "trigger", &pins.trigger),
        echo: parse("pins", "echo", &pins.echo),
        sense: parse("pins", "sense", &pins.sense),
        backlight: parse("pins", "backlight", &pins.backlight),
        lcd: LcdPins {
            rs: parse("lcd", "rs", &lcd.rs),
            en: parse("lcd", "en", &lcd.en),
            data: [
                parse("lcd", "d4", &lcd.d4),
                parse("lcd", "d5", &lcd.d5),
                parse("lcd", "d6", &lcd.d6),
                parse("lcd", "d7", &lcd.d7),
            ],
        },
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write `board_config.rs` into OUT_DIR
fn generate_board_config(config: &SonarConfig, pins: &BoardPins, lcd: &LcdSection) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let echo_wait = match config.echo_wait {
        EchoWait::Forever => "EchoWait::Forever".to_string(),
        EchoWait::Timeout { micros } => format!("EchoWait::Timeout {{ micros: {} }}", micros),
    };
    let polarity = match config.backlight_polarity {
        Polarity::ActiveHigh => "Polarity::ActiveHigh",
        Polarity::ActiveLow => "Polarity::ActiveLow",
    };

    let source = format!(
        "// Generated by build.rs from sonar.toml. Do not edit.\n\
         \n\
         use sonar_core::config::{{\n    \
             BoardPins, EchoWait, LcdPins, PinConfig, Polarity, SonarConfig, TriggerTiming,\n\
         }};\n\
         \n\
         /// Measurement loop configuration\n\
         pub const SONAR: SonarConfig = SonarConfig {{\n    \
             max_range_mm: {max_range},\n    \
             trigger: TriggerTiming {{\n        \
                 settle_low_us: {settle},\n        \
                 pulse_high_us: {pulse},\n        \
                 trailing_low_us: {trailing},\n    \
             }},\n    \
             echo_wait: {echo_wait},\n    \
             backlight_iterations: {backlight},\n    \
             backlight_polarity: {polarity},\n    \
             loop_interval_ms: {interval},\n    \
             banner_ms: {banner},\n\
         }};\n\
         \n\
         /// Pin assignment\n\
         pub const PINS: BoardPins = BoardPins {{\n    \
             trigger: {trigger},\n    \
             echo: {echo},\n    \
             sense: {sense},\n    \
             backlight: {backlight_pin},\n    \
             lcd: LcdPins {{\n        \
                 rs: {rs},\n        \
                 en: {en},\n        \
                 data: [{d4}, {d5}, {d6}, {d7}],\n    \
             }},\n\
         }};\n\
         \n\
         /// LCD rows\n\
         pub const LCD_ROWS: u8 = {rows};\n\
         \n\
         /// LCD columns\n\
         pub const LCD_COLS: u8 = {cols};\n",
        max_range = config.max_range_mm,
        settle = config.trigger.settle_low_us,
        pulse = config.trigger.pulse_high_us,
        trailing = config.trigger.trailing_low_us,
        echo_wait = echo_wait,
        backlight = config.backlight_iterations,
        polarity = polarity,
        interval = config.loop_interval_ms,
        banner = config.banner_ms,
        trigger = pin_literal(&pins.trigger),
        echo = pin_literal(&pins.echo),
        sense = pin_literal(&pins.sense),
        backlight_pin = pin_literal(&pins.backlight),
        rs = pin_literal(&pins.lcd.rs),
        en = pin_literal(&pins.lcd.en),
        d4 = pin_literal(&pins.lcd.data[0]),
        d5 = pin_literal(&pins.lcd.data[1]),
        d6 = pin_literal(&pins.lcd.data[2]),
        d7 = pin_literal(&pins.lcd.data[3]),
        rows = lcd.rows,
        cols = lcd.cols,
    );

    fs::write(out_dir.join("board_config.rs"), source).unwrap();
}

fn pin_literal(pin: &PinConfig) -> String {
    format!(
        "PinConfig {{ pin: {}, inverted: {}, pull_up: {} }}",
        pin.pin, pin.inverted, pin.pull_up
    )
}
