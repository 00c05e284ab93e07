//! ConfigFS USB gadget object model
//!
//! Structure mirrors the kernel's directory layout:
//! ```text
//! UsbGadget (<configfs_root>/<name>)
//!     ├── GadgetConfig (configs/<c.N>, function symlinks + strings)
//!     ├── HidFunction (functions/hid.<name>)
//!     └── MsdFunction (functions/mass_storage.<name>)
//!             └── MsdLun (lun.<N>)
//! ```
//! All entities are typed [`node::Node`]s; attribute access goes through the
//! node's get/set with the coercion tables declared per entity.

pub mod function;
pub mod gadget;
pub mod hid;
pub mod msd;
pub mod node;
pub mod report_desc;

pub use function::GadgetFunction;
pub use gadget::{GadgetConfig, UsbGadget, CONFIGFS_ROOT, UDC_CLASS_DIR};
pub use hid::HidFunction;
pub use msd::{MsdFunction, MsdLun};
pub use node::{attr_table, merged, AttrTable, AttrType, Node, Value};
