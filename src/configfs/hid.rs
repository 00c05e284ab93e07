//! HID function directory (`functions/hid.<name>`)

use std::ops::Deref;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::configfs::function::GadgetFunction;
use crate::configfs::gadget::UsbGadget;
use crate::configfs::node::{attr_table, AttrTable, AttrType, Node};
use crate::configfs::report_desc;
use crate::error::{GadgetError, Result};

fn hid_attrs() -> AttrTable {
    attr_table(&[
        ("protocol", AttrType::Int),
        ("subclass", AttrType::Int),
        ("report_length", AttrType::Int),
    ])
}

/// A `hid.<name>` function
///
/// Exists independently of any configuration until linked. The kernel
/// exposes the function as a `/dev/hidgN` character device once the gadget
/// is bound; [`HidFunction::device`] resolves which one.
#[derive(Debug)]
pub struct HidFunction {
    node: Node,
}

impl Deref for HidFunction {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl GadgetFunction for HidFunction {
    fn node(&self) -> &Node {
        &self.node
    }
}

impl HidFunction {
    /// Create (or re-enter) `functions/hid.<name>` under the gadget.
    pub fn create(gadget: &UsbGadget, name: &str) -> Result<Self> {
        let functions = gadget.ensure_subdir("functions")?;
        let node = Node::ensure_with(functions.path().join(format!("hid.{}", name)), hid_attrs())?;
        debug!("HID function at {}", node.path().display());
        Ok(Self { node })
    }

    /// Re-enter an existing `functions/hid.<name>`; fails if absent.
    pub fn open(gadget: &UsbGadget, name: &str) -> Result<Self> {
        let functions = gadget.subdir("functions")?;
        let node = Node::open_with(functions.path().join(format!("hid.{}", name)), hid_attrs())?;
        Ok(Self { node })
    }

    /// Write the boot-keyboard defaults: protocol 0, subclass 0, an 8-byte
    /// report and the matching report descriptor.
    pub fn set_keyboard_defaults(&self) -> Result<()> {
        self.node.set("protocol", 0i64)?;
        self.node.set("subclass", 0i64)?;
        self.node
            .set("report_length", report_desc::KEYBOARD_REPORT_LENGTH as i64)?;
        self.node.set("report_desc", report_desc::KEYBOARD)?;
        Ok(())
    }

    /// Resolve the kernel character device backing this function.
    ///
    /// Reads the `dev` attribute (`major:minor`) and asks udev for the
    /// device node path, e.g. `/dev/hidg0`.
    pub fn device(&self) -> Result<PathBuf> {
        let dev = match self.node.get("dev")? {
            crate::configfs::node::Value::Str(s) => s,
            other => {
                return Err(GadgetError::DeviceResolution(format!(
                    "unexpected dev attribute value {:?}",
                    other
                )))
            }
        };
        resolve_char_device(dev.trim())
    }
}

/// Ask udev for the device node of a character device index (`major:minor`).
fn resolve_char_device(dev: &str) -> Result<PathBuf> {
    let sys_path = format!("/sys/dev/char/{}", dev);
    let output = Command::new("udevadm")
        .args(["info", "-r", "-q", "name", &sys_path])
        .output()
        .map_err(|e| GadgetError::DeviceResolution(format!("udevadm spawn failed: {}", e)))?;

    if !output.status.success() {
        return Err(GadgetError::DeviceResolution(format!(
            "udevadm exited with {} for {}",
            output.status, sys_path
        )));
    }

    let name = String::from_utf8(output.stdout)
        .map_err(|e| GadgetError::DeviceResolution(format!("udevadm output not UTF-8: {}", e)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(GadgetError::DeviceResolution(format!(
            "udevadm returned no name for {}",
            sys_path
        )));
    }
    Ok(PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configfs::node::Value;
    use tempfile::tempdir;

    #[test]
    fn create_and_reopen() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();

        let func = HidFunction::create(&gadget, "k0").unwrap();
        assert_eq!(func.name(), "hid.k0");
        assert!(func.node().path().ends_with("g1/functions/hid.k0"));

        HidFunction::open(&gadget, "k0").unwrap();
        let err = HidFunction::open(&gadget, "k9").unwrap_err();
        assert!(matches!(err, GadgetError::NotFound(_)));
    }

    #[test]
    fn keyboard_defaults() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        func.set_keyboard_defaults().unwrap();
        assert_eq!(func.get("protocol").unwrap(), Value::Int(0));
        assert_eq!(func.get("subclass").unwrap(), Value::Int(0));
        assert_eq!(func.get("report_length").unwrap(), Value::Int(8));
        assert_eq!(func.get_bytes("report_desc").unwrap(), report_desc::KEYBOARD);
    }
}
