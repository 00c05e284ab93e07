//! Typed ConfigFS directory node
//!
//! A [`Node`] wraps one directory inside the configfs tree and exposes the
//! kernel attribute files next to it as typed key/value pairs. Coercion rules
//! are declared up front in an [`AttrTable`]; undeclared attributes read and
//! write as plain strings.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GadgetError, Result};

/// Declared coercion rule for one attribute file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// "1"/"0" on disk, nonzero integer reads as true
    Bool,
    /// Decimal on disk, `0x` prefix accepted on read
    Int,
    /// `0xNNNN` (uppercase) on disk, decimal accepted on read
    Hex,
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int(n as i64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

/// Attribute name to coercion rule mapping
pub type AttrTable = HashMap<&'static str, AttrType>;

/// Build an attribute table from static pairs.
pub fn attr_table(pairs: &[(&'static str, AttrType)]) -> AttrTable {
    pairs.iter().copied().collect()
}

/// Merge a base table with entity-specific overrides.
///
/// Overrides win on conflict. Entity variants compose their tables through
/// this at construction instead of walking a type hierarchy.
pub fn merged(base: &AttrTable, overrides: &[(&'static str, AttrType)]) -> AttrTable {
    let mut table = base.clone();
    table.extend(overrides.iter().copied());
    table
}

/// One directory in the configfs tree plus its attribute coercion table
#[derive(Debug, Clone)]
pub struct Node {
    path: PathBuf,
    attrs: AttrTable,
}

impl Node {
    /// Wrap an existing directory; fails with `NotFound` if it is absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(path, AttrTable::new())
    }

    /// Wrap an existing directory with a declared attribute table.
    pub fn open_with(path: impl Into<PathBuf>, attrs: AttrTable) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(GadgetError::NotFound(path));
        }
        Ok(Self { path, attrs })
    }

    /// Wrap a directory, creating it first if absent.
    ///
    /// The mkdir is non-recursive: the parent must already exist. In configfs
    /// the mkdir itself is what instantiates the kernel object.
    pub fn ensure(path: impl Into<PathBuf>) -> Result<Self> {
        Self::ensure_with(path, AttrTable::new())
    }

    /// Like [`Node::ensure`] with a declared attribute table.
    pub fn ensure_with(path: impl Into<PathBuf>, attrs: AttrTable) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            fs::create_dir(&path).map_err(|e| GadgetError::from_io(&path, e))?;
            debug!("created {}", path.display());
        }
        Ok(Self { path, attrs })
    }

    /// Directory this node is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open an existing subdirectory as an untyped node.
    pub fn subdir(&self, name: &str) -> Result<Node> {
        Node::open(self.path.join(name))
    }

    /// Open a subdirectory, creating it if absent.
    pub fn ensure_subdir(&self, name: &str) -> Result<Node> {
        Node::ensure(self.path.join(name))
    }

    /// Check whether `name` exists under this node. No side effects.
    pub fn exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    /// Read and coerce an attribute file.
    pub fn get(&self, name: &str) -> Result<Value> {
        let path = self.path.join(name);
        let text = read_text(&path)?;

        match self.attrs.get(name) {
            Some(AttrType::Bool) => {
                let n = parse_int(&text).ok_or_else(|| invalid(name, &text))?;
                Ok(Value::Bool(n != 0))
            }
            Some(AttrType::Int) | Some(AttrType::Hex) => {
                let n = parse_int(&text).ok_or_else(|| invalid(name, &text))?;
                Ok(Value::Int(n))
            }
            None => Ok(Value::Str(text)),
        }
    }

    /// Read an attribute file as raw bytes, no trim or coercion.
    pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path.join(name);
        fs::read(&path).map_err(|e| GadgetError::from_io(&path, e))
    }

    /// Coerce and write an attribute file.
    ///
    /// Strings go through the text path (newline-terminated, one write
    /// syscall), byte values are written raw. Bool and integer values need a
    /// declared coercion rule or the call fails with `InvalidValue`.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let path = self.path.join(name);
        debug!("{} = {:?}", path.display(), value);

        match value {
            Value::Str(s) => write_text(&path, &s),
            Value::Bytes(b) => write_raw(&path, &b),
            Value::Bool(b) => match self.attrs.get(name) {
                Some(AttrType::Bool) => write_text(&path, if b { "1" } else { "0" }),
                _ => Err(GadgetError::InvalidValue {
                    attr: name.to_string(),
                    reason: "attribute is not declared boolean".to_string(),
                }),
            },
            Value::Int(n) => match self.attrs.get(name) {
                Some(AttrType::Hex) => write_text(&path, &format!("0x{:X}", n)),
                Some(AttrType::Int) => write_text(&path, &n.to_string()),
                _ => Err(GadgetError::InvalidValue {
                    attr: name.to_string(),
                    reason: "attribute is not declared integer or hex".to_string(),
                }),
            },
        }
    }
}

fn invalid(attr: &str, text: &str) -> GadgetError {
    GadgetError::InvalidValue {
        attr: attr.to_string(),
        reason: format!("cannot parse {:?} as integer", text),
    }
}

/// Base-agnostic integer parse: `0x` prefix selects hex, otherwise decimal.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Read an attribute file as text, right-trimmed.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim_end().to_string())
        .map_err(|e| GadgetError::from_io(path, e))
}

/// Write a text attribute.
///
/// Sysfs/configfs attributes take effect on the first write() syscall, so the
/// full buffer including the trailing newline goes out in a single call.
pub(crate) fn write_text(path: &Path, content: &str) -> Result<()> {
    let mut buf = content.as_bytes().to_vec();
    if !content.ends_with('\n') {
        buf.push(b'\n');
    }
    write_raw(path, &buf)
}

/// Write a binary attribute (e.g. a HID report descriptor).
pub(crate) fn write_raw(path: &Path, data: &[u8]) -> Result<()> {
    // Plain O_WRONLY: O_TRUNC can fail on write-only attribute files.
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .or_else(|e| {
            if path.exists() {
                Err(e)
            } else {
                File::create(path)
            }
        })
        .map_err(|e| GadgetError::from_io(path, e))?;

    file.write_all(data)
        .map_err(|e| GadgetError::from_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn typed_node(dir: &Path) -> Node {
        Node::ensure_with(
            dir.join("node"),
            attr_table(&[
                ("idVendor", AttrType::Hex),
                ("MaxPower", AttrType::Int),
                ("removable", AttrType::Bool),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn open_fails_on_missing_dir() {
        let dir = tempdir().unwrap();
        let err = Node::open(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GadgetError::NotFound(_)));
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g");
        Node::ensure(&path).unwrap();
        Node::ensure(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn ensure_does_not_create_parents() {
        let dir = tempdir().unwrap();
        let err = Node::ensure(dir.path().join("a/b")).unwrap_err();
        assert!(matches!(err, GadgetError::NotFound(_)));
    }

    #[test]
    fn hex_round_trip() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("idVendor", 0x1D6Bi64).unwrap();
        let on_disk = fs::read_to_string(node.path().join("idVendor")).unwrap();
        assert_eq!(on_disk, "0x1D6B\n");
        assert_eq!(node.get("idVendor").unwrap(), Value::Int(7531));
    }

    #[test]
    fn bool_round_trip() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("removable", true).unwrap();
        assert_eq!(node.get("removable").unwrap(), Value::Bool(true));

        node.set("removable", false).unwrap();
        assert_eq!(node.get("removable").unwrap(), Value::Bool(false));
    }

    #[test]
    fn int_round_trip() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("MaxPower", 250i64).unwrap();
        let on_disk = fs::read_to_string(node.path().join("MaxPower")).unwrap();
        assert_eq!(on_disk, "250\n");
        assert_eq!(node.get("MaxPower").unwrap(), Value::Int(250));
    }

    #[test]
    fn undeclared_attribute_reads_as_trimmed_string() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("serialnumber", "0123456789").unwrap();
        assert_eq!(
            node.get("serialnumber").unwrap(),
            Value::Str("0123456789".to_string())
        );
    }

    #[test]
    fn typed_value_without_rule_is_rejected() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        let err = node.set("serialnumber", 42i64).unwrap_err();
        assert!(matches!(err, GadgetError::InvalidValue { .. }));

        let err = node.set("serialnumber", true).unwrap_err();
        assert!(matches!(err, GadgetError::InvalidValue { .. }));
    }

    #[test]
    fn bytes_written_raw() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("report_desc", &[0x05u8, 0x01, 0x09][..]).unwrap();
        assert_eq!(node.get_bytes("report_desc").unwrap(), vec![0x05, 0x01, 0x09]);
    }

    #[test]
    fn get_missing_attribute() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());
        let err = node.get("bcdUSB").unwrap_err();
        assert!(matches!(err, GadgetError::NotFound(_)));
    }

    #[test]
    fn unparseable_typed_attribute() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());

        node.set("idVendor", "not-a-number").unwrap();
        let err = node.get("idVendor").unwrap_err();
        assert!(matches!(err, GadgetError::InvalidValue { .. }));
    }

    #[test]
    fn merged_table_overrides_base() {
        let base = attr_table(&[("a", AttrType::Int), ("b", AttrType::Int)]);
        let table = merged(&base, &[("b", AttrType::Hex), ("c", AttrType::Bool)]);
        assert_eq!(table["a"], AttrType::Int);
        assert_eq!(table["b"], AttrType::Hex);
        assert_eq!(table["c"], AttrType::Bool);
    }

    #[test]
    fn exists_has_no_side_effects() {
        let dir = tempdir().unwrap();
        let node = typed_node(dir.path());
        assert!(!node.exists("configs"));
        assert!(!node.path().join("configs").exists());
    }
}
