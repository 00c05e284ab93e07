//! USB gadget lifecycle: creation, linking, UDC binding, teardown

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::configfs::function::GadgetFunction;
use crate::configfs::node::{attr_table, AttrTable, AttrType, Node};
use crate::error::{GadgetError, Result};

/// ConfigFS mount point for USB gadgets
pub const CONFIGFS_ROOT: &str = "/sys/kernel/config/usb_gadget";

/// Sysfs class directory listing available USB device controllers
pub const UDC_CLASS_DIR: &str = "/sys/class/udc";

/// USB Vendor ID (Linux Foundation) - default value
pub const DEFAULT_VENDOR_ID: u16 = 0x1d6b;

/// USB Product ID (Multifunction Composite Gadget) - default value
pub const DEFAULT_PRODUCT_ID: u16 = 0x0104;

fn gadget_attrs() -> AttrTable {
    attr_table(&[
        ("idVendor", AttrType::Hex),
        ("idProduct", AttrType::Hex),
        ("bcdDevice", AttrType::Hex),
        ("bcdUSB", AttrType::Hex),
    ])
}

fn config_attrs() -> AttrTable {
    attr_table(&[
        ("bmAttributes", AttrType::Hex),
        ("MaxPower", AttrType::Int),
    ])
}

/// A USB gadget rooted at `<configfs_root>/<name>`
///
/// Creation only makes the directory; device descriptors and strings are set
/// afterwards through the [`Node`] interface:
///
/// ```no_run
/// # use usbgadget::configfs::UsbGadget;
/// let gadget = UsbGadget::create("g1")?;
/// gadget.set("idVendor", 0x1d6bi64)?;
/// gadget.set("idProduct", 0x0104i64)?;
/// gadget.strings("0x409")?.set("manufacturer", "Acme")?;
/// # Ok::<(), usbgadget::GadgetError>(())
/// ```
#[derive(Debug)]
pub struct UsbGadget {
    node: Node,
    udc_class: PathBuf,
}

impl Deref for UsbGadget {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl UsbGadget {
    /// Create (or re-enter) a gadget under the default configfs mount.
    pub fn create(name: &str) -> Result<Self> {
        Self::create_at(name, Path::new(CONFIGFS_ROOT))
    }

    /// Create (or re-enter) a gadget under an explicit configfs root.
    ///
    /// The root itself must already exist - it is the kernel's mount point,
    /// not something this library may create.
    pub fn create_at(name: &str, root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(GadgetError::NotFound(root.to_path_buf()));
        }
        let node = Node::ensure_with(root.join(name), gadget_attrs())?;
        info!("gadget at {}", node.path().display());
        Ok(Self {
            node,
            udc_class: PathBuf::from(UDC_CLASS_DIR),
        })
    }

    /// Override the controller scan directory used by [`UsbGadget::activate`].
    ///
    /// Useful in containers where `/sys/class/udc` is bind-mounted elsewhere.
    pub fn set_udc_class_dir(&mut self, dir: impl Into<PathBuf>) {
        self.udc_class = dir.into();
    }

    /// Gadget-level localized strings directory (`strings/<lang>`).
    pub fn strings(&self, lang: &str) -> Result<Node> {
        let strings = self.node.ensure_subdir("strings")?;
        strings.ensure_subdir(lang)
    }

    /// Enter (creating if absent) the configuration `configs/<name>`.
    pub fn config(&self, name: &str) -> Result<GadgetConfig> {
        let configs = self.node.ensure_subdir("configs")?;
        let node = Node::ensure_with(configs.path().join(name), config_attrs())?;
        Ok(GadgetConfig { node })
    }

    /// Link a function into a configuration.
    ///
    /// Realized as a symlink named after the function's basename. At most one
    /// link per (configuration, function) pair.
    pub fn link(&self, function: &dyn GadgetFunction, config: &GadgetConfig) -> Result<()> {
        let target = function.node().path();
        if !target.exists() {
            return Err(GadgetError::DanglingFunction(target.to_path_buf()));
        }

        let link = config.path().join(function.name());
        if link.symlink_metadata().is_ok() {
            return Err(GadgetError::AlreadyLinked {
                function: function.name().to_string(),
                config: config_name(config),
            });
        }

        std::os::unix::fs::symlink(target, &link)
            .map_err(|e| GadgetError::from_io(&link, e))?;
        debug!("linked {} -> {}", link.display(), target.display());
        Ok(())
    }

    /// Remove the symlink created by [`UsbGadget::link`].
    pub fn unlink(&self, function: &dyn GadgetFunction, config: &GadgetConfig) -> Result<()> {
        let link = config.path().join(function.name());
        if link.symlink_metadata().is_err() {
            return Err(GadgetError::NotLinked {
                function: function.name().to_string(),
                config: config_name(config),
            });
        }

        fs::remove_file(&link).map_err(|e| GadgetError::from_io(&link, e))?;
        debug!("unlinked {}", link.display());
        Ok(())
    }

    /// Bind the gadget to a USB device controller.
    ///
    /// With no explicit device the first controller in the UDC class
    /// directory is picked - stable only insofar as the kernel's enumeration
    /// order is; pass the name explicitly to select a specific controller.
    pub fn activate(&self, device: Option<&str>) -> Result<()> {
        let udc = match device {
            Some(name) => name.to_string(),
            None => first_udc(&self.udc_class)?,
        };
        info!("binding gadget to UDC {}", udc);
        self.node.set("UDC", udc)
    }

    /// Unbind from the controller. No-op when already unbound.
    pub fn deactivate(&self) -> Result<()> {
        if let Some(udc) = self.bound_udc()? {
            info!("unbinding gadget from UDC {}", udc);
            let path = self.node.path().join("UDC");
            // Single unbuffered newline write so the kernel detaches
            // immediately; plain truncating open like `open(.., 'wb')`.
            let mut file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&path)
                .map_err(|e| GadgetError::from_io(&path, e))?;
            file.write_all(b"\n")
                .map_err(|e| GadgetError::from_io(&path, e))?;
        }
        Ok(())
    }

    /// Controller the gadget is currently bound to, if any.
    pub fn bound_udc(&self) -> Result<Option<String>> {
        match self.node.get("UDC") {
            Ok(crate::configfs::node::Value::Str(s)) if !s.trim().is_empty() => Ok(Some(s)),
            Ok(_) | Err(GadgetError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the gadget is bound to a controller.
    pub fn is_bound(&self) -> bool {
        matches!(self.bound_udc(), Ok(Some(_)))
    }

    /// Tear down the whole gadget tree in dependency order.
    ///
    /// Symlinks before directories, children before parents: per
    /// configuration first the function links, then the per-language string
    /// dirs, then the configuration dir; afterwards the function dirs, the
    /// gadget string dirs and finally the gadget dir itself. The first
    /// failure aborts the pass and leaves the tree partially torn down -
    /// there is no rollback. A function still linked from a configuration
    /// this gadget does not own surfaces as `DirectoryNotEmpty`.
    pub fn destroy(self) -> Result<()> {
        let root = self.node.path();

        let configs = root.join("configs");
        if configs.is_dir() {
            for config in list_dir(&configs)? {
                for entry in list_entries(&config)? {
                    let is_link = entry
                        .symlink_metadata()
                        .map(|m| m.file_type().is_symlink())
                        .unwrap_or(false);
                    if is_link {
                        fs::remove_file(&entry).map_err(|e| GadgetError::from_io(&entry, e))?;
                    }
                }
                remove_language_dirs(&config.join("strings"))?;
                remove_dir(&config)?;
            }
            remove_default_group(&configs);
        }

        let functions = root.join("functions");
        if functions.is_dir() {
            for function in list_dir(&functions)? {
                remove_dir(&function)?;
            }
            remove_default_group(&functions);
        }

        remove_language_dirs(&root.join("strings"))?;
        remove_dir(root)?;
        info!("destroyed gadget {}", root.display());
        Ok(())
    }
}

/// A configuration directory (`configs/<c.N>`) owning function links and
/// localized strings
#[derive(Debug)]
pub struct GadgetConfig {
    node: Node,
}

impl Deref for GadgetConfig {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl GadgetConfig {
    /// Configuration-level localized strings directory.
    pub fn strings(&self, lang: &str) -> Result<Node> {
        let strings = self.node.ensure_subdir("strings")?;
        strings.ensure_subdir(lang)
    }
}

fn config_name(config: &GadgetConfig) -> String {
    config
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First entry of the UDC class directory.
fn first_udc(class_dir: &Path) -> Result<String> {
    let entries = fs::read_dir(class_dir).map_err(|_| GadgetError::NoControllerAvailable)?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .next()
        .ok_or(GadgetError::NoControllerAvailable)
}

/// Subdirectories of `path`, in enumeration order.
fn list_dir(path: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_entries(path)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

fn list_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(path).map_err(|e| GadgetError::from_io(path, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GadgetError::from_io(path, e))?;
        out.push(entry.path());
    }
    Ok(out)
}

fn remove_language_dirs(strings: &Path) -> Result<()> {
    if strings.is_dir() {
        for lang in list_dir(strings)? {
            remove_dir(&lang)?;
        }
        remove_default_group(strings);
    }
    Ok(())
}

/// Best-effort removal of a configfs default group.
///
/// On a live configfs mount `strings`, `configs` and `functions` are
/// kernel-owned and cannot be rmdir'd; the gadget rmdir succeeds with them
/// in place. On a regular filesystem they are plain directories and have to
/// go before the parent can be removed.
fn remove_default_group(path: &Path) {
    let _ = fs::remove_dir(path);
}

fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir(path).map_err(|e| GadgetError::from_io(path, e))?;
    debug!("removed {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configfs::hid::HidFunction;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn create_requires_existing_root() {
        let dir = tempdir().unwrap();
        let err = UsbGadget::create_at("g1", &dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GadgetError::NotFound(_)));
    }

    #[test]
    fn link_unlink_round_trip() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let config = gadget.config("c.1").unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        gadget.link(&func, &config).unwrap();
        let link = config.path().join("hid.k0");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());

        gadget.unlink(&func, &config).unwrap();
        assert!(link.symlink_metadata().is_err());
    }

    #[test]
    fn double_link_fails() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let config = gadget.config("c.1").unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        gadget.link(&func, &config).unwrap();
        let err = gadget.link(&func, &config).unwrap_err();
        assert!(matches!(err, GadgetError::AlreadyLinked { .. }));
    }

    #[test]
    fn unlink_without_link_fails() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let config = gadget.config("c.1").unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        let err = gadget.unlink(&func, &config).unwrap_err();
        assert!(matches!(err, GadgetError::NotLinked { .. }));
    }

    #[test]
    fn link_to_removed_function_fails() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let config = gadget.config("c.1").unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        fs::remove_dir(func.node().path()).unwrap();
        let err = gadget.link(&func, &config).unwrap_err();
        assert!(matches!(err, GadgetError::DanglingFunction(_)));
    }

    #[test]
    fn activate_without_controller_fails_and_leaves_udc_untouched() {
        let dir = tempdir().unwrap();
        let udc_class = tempdir().unwrap();
        let mut gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        gadget.set_udc_class_dir(udc_class.path());

        let err = gadget.activate(None).unwrap_err();
        assert!(matches!(err, GadgetError::NoControllerAvailable));
        assert!(!gadget.path().join("UDC").exists());
    }

    #[test]
    fn activate_picks_first_controller() {
        let dir = tempdir().unwrap();
        let udc_class = tempdir().unwrap();
        fs::create_dir(udc_class.path().join("fe980000.usb")).unwrap();

        let mut gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        gadget.set_udc_class_dir(udc_class.path());

        gadget.activate(None).unwrap();
        assert_eq!(gadget.bound_udc().unwrap().as_deref(), Some("fe980000.usb"));
        assert!(gadget.is_bound());
    }

    #[test]
    fn deactivate_clears_binding() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        gadget.set("UDC", "fe980000.usb").unwrap();

        gadget.deactivate().unwrap();
        assert!(!gadget.is_bound());

        // Second call is a no-op.
        gadget.deactivate().unwrap();
    }

    #[test]
    fn destroy_leaves_no_residue() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let gadget_path = gadget.path().to_path_buf();

        let config = gadget.config("c.1").unwrap();
        config.strings("0x409").unwrap();
        gadget.strings("0x409").unwrap();

        let linked = HidFunction::create(&gadget, "k0").unwrap();
        let unlinked = HidFunction::create(&gadget, "k1").unwrap();
        gadget.link(&linked, &config).unwrap();
        drop((config, linked, unlinked));

        gadget.destroy().unwrap();
        assert!(!gadget_path.exists());
    }

    #[test]
    fn destroy_propagates_directory_not_empty() {
        let dir = tempdir().unwrap();
        let gadget = UsbGadget::create_at("g1", dir.path()).unwrap();
        let func = HidFunction::create(&gadget, "k0").unwrap();

        // Stray content inside the function dir blocks the rmdir.
        File::create(func.node().path().join("stray")).unwrap();
        drop(func);

        let err = gadget.destroy().unwrap_err();
        assert!(matches!(err, GadgetError::DirectoryNotEmpty(_)));
    }
}
