//! HID keyboard report encoding and press/release sequencing
//!
//! Boot-keyboard reports are level-triggered: a report describes the full set
//! of keys held down, not an edge. Every press therefore needs a paired
//! all-zero release report or the host will auto-repeat the key.

pub mod keymap;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::configfs::hid::HidFunction;
use crate::configfs::node::Value;
use crate::error::{GadgetError, Result};

use keymap::KeyStroke;

/// First report byte carrying a usage code (after modifier + reserved)
const KEY_SLOT_OFFSET: usize = 2;

/// Maximum simultaneous usage codes in a boot-keyboard report
const MAX_KEY_SLOTS: usize = 6;

/// Encode the press report for one character.
///
/// Byte 0 is the modifier bitmask, byte 1 reserved zero, usage codes fill
/// slots from byte 2 (at most six), and the whole report is zero-padded to
/// `report_length`.
pub fn encode_press(c: char, report_length: usize) -> Result<Vec<u8>> {
    let stroke = keymap::lookup(c).ok_or(GadgetError::UnsupportedCharacter(c))?;
    Ok(encode_stroke(stroke, report_length))
}

fn encode_stroke(stroke: KeyStroke, report_length: usize) -> Vec<u8> {
    let mut report = vec![0u8; report_length];
    if !report.is_empty() {
        report[0] = stroke.modifier;
    }
    let slots_end = report_length.min(KEY_SLOT_OFFSET + MAX_KEY_SLOTS);
    if KEY_SLOT_OFFSET < slots_end {
        report[KEY_SLOT_OFFSET] = stroke.usage;
    }
    report
}

/// The all-zero release report.
pub fn release_report(report_length: usize) -> Vec<u8> {
    vec![0u8; report_length]
}

/// A writable HID keyboard device
///
/// Wraps the `/dev/hidgN` character device of a bound HID function. The
/// report length must match the `report_length` the function was configured
/// with - the kernel rejects short writes.
pub struct Keyboard {
    device: File,
    path: PathBuf,
    report_length: usize,
}

impl Keyboard {
    /// Open a HID gadget character device for writing.
    pub fn open(path: impl Into<PathBuf>, report_length: usize) -> Result<Self> {
        let path = path.into();
        let device = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| GadgetError::from_io(&path, e))?;
        debug!("keyboard device {} ({} byte reports)", path.display(), report_length);
        Ok(Self {
            device,
            path,
            report_length,
        })
    }

    /// Open the device backing `function`, taking the report length from its
    /// `report_length` attribute.
    pub fn for_function(function: &HidFunction) -> Result<Self> {
        let report_length = match function.get("report_length")? {
            Value::Int(n) if n > 0 => n as usize,
            other => {
                return Err(GadgetError::InvalidValue {
                    attr: "report_length".to_string(),
                    reason: format!("expected positive integer, got {:?}", other),
                })
            }
        };
        Self::open(function.device()?, report_length)
    }

    /// Device path this keyboard writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the press report for `c`.
    ///
    /// Must be followed by [`Keyboard::release`] or the host will treat the
    /// key as held.
    pub fn press(&mut self, c: char) -> Result<()> {
        let report = encode_press(c, self.report_length)?;
        self.write_report(&report)
    }

    /// Write the all-zero release report.
    ///
    /// Takes the character so an unmapped input fails the same way press
    /// does, before anything is written.
    pub fn release(&mut self, c: char) -> Result<()> {
        keymap::lookup(c).ok_or(GadgetError::UnsupportedCharacter(c))?;
        let report = release_report(self.report_length);
        self.write_report(&report)
    }

    /// Press and immediately release one character (two report writes).
    pub fn press_and_release(&mut self, c: char) -> Result<()> {
        self.press(c)?;
        self.release(c)
    }

    /// Type a string, one press/release pair per character.
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            self.press_and_release(c)?;
        }
        Ok(())
    }

    /// Single best-effort write, one report per syscall. No retry: reports
    /// fit the kernel buffer, partial writes are not expected.
    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        trace!("report {:02X?}", report);
        self.device.write_all(report)?;
        Ok(())
    }
}
