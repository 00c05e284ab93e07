//! USB gadget function trait

use crate::configfs::node::Node;

/// A function directory under `<gadget>/functions/`.
///
/// Functions exist independently of any configuration until linked. The
/// symlink machinery in [`crate::configfs::UsbGadget`] only needs the backing
/// node; everything else is variant-specific.
pub trait GadgetFunction {
    /// Backing configfs node (`functions/<type>.<name>`).
    fn node(&self) -> &Node;

    /// Function basename, e.g. `hid.k0`. Also the symlink name inside a
    /// configuration.
    fn name(&self) -> &str {
        self.node()
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}
