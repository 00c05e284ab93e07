//! Mass storage function directory (`functions/mass_storage.<name>`)

use std::ops::Deref;

use tracing::debug;

use crate::configfs::function::GadgetFunction;
use crate::configfs::gadget::UsbGadget;
use crate::configfs::node::{attr_table, AttrTable, AttrType, Node};
use crate::error::Result;

fn lun_attrs() -> AttrTable {
    attr_table(&[
        ("cdrom", AttrType::Bool),
        ("ro", AttrType::Bool),
        ("removable", AttrType::Bool),
        ("nofua", AttrType::Bool),
    ])
}

/// A `mass_storage.<name>` function
#[derive(Debug)]
pub struct MsdFunction {
    node: Node,
}

impl Deref for MsdFunction {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl GadgetFunction for MsdFunction {
    fn node(&self) -> &Node {
        &self.node
    }
}

impl MsdFunction {
    /// Create (or re-enter) `functions/mass_storage.<name>` under the gadget.
    pub fn create(gadget: &UsbGadget, name: &str) -> Result<Self> {
        let functions = gadget.ensure_subdir("functions")?;
        let node = Node::ensure(functions.path().join(format!("mass_storage.{}", name)))?;
        debug!("MSD function at {}", node.path().display());
        Ok(Self { node })
    }

    /// Re-enter an existing `functions/mass_storage.<name>`; fails if absent.
    pub fn open(gadget: &UsbGadget, name: &str) -> Result<Self> {
        let functions = gadget.subdir("functions")?;
        let node = Node::open(functions.path().join(format!("mass_storage.{}", name)))?;
        Ok(Self { node })
    }

    /// Logical unit `lun.<index>` of this function.
    ///
    /// The kernel creates `lun.0` with the function; higher indices are
    /// instantiated by the mkdir here.
    pub fn lun(&self, index: u8) -> Result<MsdLun> {
        let node = Node::ensure_with(self.node.path().join(format!("lun.{}", index)), lun_attrs())?;
        Ok(MsdLun { node })
    }
}

/// One logical unit of a mass storage function
///
/// Boolean-typed flags `cdrom`/`ro`/`removable`/`nofua` plus the untyped
/// `file` attribute holding the backing image path (writing it is what
/// attaches the medium).
#[derive(Debug)]
pub struct MsdLun {
    node: Node,
}

impl Deref for MsdLun {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configfs::node::Value;
    use tempfile::tempdir;

    #[test]
    fn lun_flags_are_boolean_typed() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let msd = MsdFunction::create(&gadget, "usb0").unwrap();
        assert_eq!(msd.name(), "mass_storage.usb0");

        let lun = msd.lun(0).unwrap();
        lun.set("cdrom", true).unwrap();
        lun.set("ro", true).unwrap();
        lun.set("removable", false).unwrap();
        assert_eq!(lun.get("cdrom").unwrap(), Value::Bool(true));
        assert_eq!(lun.get("removable").unwrap(), Value::Bool(false));
    }

    #[test]
    fn lun_backing_file_is_plain_string() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let msd = MsdFunction::create(&gadget, "usb0").unwrap();

        let lun = msd.lun(1).unwrap();
        assert!(lun.path().ends_with("mass_storage.usb0/lun.1"));
        lun.set("file", "/var/lib/images/boot.iso").unwrap();
        assert_eq!(
            lun.get("file").unwrap(),
            Value::Str("/var/lib/images/boot.iso".to_string())
        );
    }
}
