//! Linux USB gadget configuration and HID keyboard emulation
//!
//! This crate drives the kernel's ConfigFS USB gadget interface: it builds
//! the gadget directory tree (device descriptors, configurations, HID and
//! mass-storage functions), binds the gadget to a USB device controller and
//! sends HID keyboard input reports through the resulting character device.
//!
//! Typical flow:
//! 1. [`configfs::UsbGadget::create`], set descriptors/strings
//! 2. create a function ([`configfs::HidFunction`]), link it into a
//!    configuration, [`configfs::UsbGadget::activate`]
//! 3. open the device with [`keyboard::Keyboard`] and type
//! 4. [`configfs::UsbGadget::deactivate`] + `destroy` to tear down

pub mod configfs;
pub mod error;
pub mod keyboard;

pub use error::{GadgetError, Result};
