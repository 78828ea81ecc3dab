use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;

/// Filesystem-backed key/value store used as the default KV engine.
#[derive(Clone)]
pub struct FsKv {
    root: PathBuf,
}

/// In-memory key/value store; contents vanish with the last clone.
#[derive(Clone, Default)]
pub struct MemKv {
    inner: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

/// Minimal key/value interface over byte keys and values.
pub trait Kv: Clone + Send + Sync + 'static {
    /// Get value bytes for `key`, if present.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Set value bytes for `key`, overwriting if it exists.
    fn put(&self, key: &[u8], val: &[u8]) -> io::Result<()>;
    /// Delete `key`; returns `true` if a value existed.
    fn delete(&self, key: &[u8]) -> bool;
}

/// Serde helpers layered on top of any [`Kv`] implementation.
///
/// Values are stored as JSON text so snapshots stay human readable.
pub trait KvSerde: Kv {
    /// Deserialize type `T` stored at `key`.
    fn get_t<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        match self.get(key) {
            Some(bytes) => {
                let v = serde_json::from_slice::<T>(&bytes).map_err(|source| StoreError::Corrupt {
                    key: String::from_utf8_lossy(key).into_owned(),
                    source,
                })?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }
    /// Serialize `val` and store it at `key`.
    fn put_t<T: Serialize>(&self, key: &[u8], val: &T) -> Result<(), StoreError> {
        let buf = serde_json::to_vec(val).map_err(StoreError::Encode)?;
        self.put(key, &buf).map_err(|source| StoreError::Write {
            key: String::from_utf8_lossy(key).into_owned(),
            source,
        })
    }
}
impl<T: Kv> KvSerde for T {}

/// Default KV type exported by this crate (FS-backed).
pub type DefaultKv = FsKv;

/// Open an FS-backed KV rooted at `dir` (created if missing).
pub fn open_default<P: AsRef<Path>>(dir: P) -> Result<DefaultKv, StoreError> {
    let root = dir.as_ref().to_path_buf();
    fs::create_dir_all(&root).map_err(|source| StoreError::Open { path: root.clone(), source })?;
    Ok(FsKv { root })
}

/// Build a namespaced key as bytes: `"{ns}:{key}"`.
pub fn ns(ns: &str, key: &str) -> Vec<u8> {
    let mut s = String::with_capacity(ns.len() + 1 + key.len());
    s.push_str(ns);
    s.push(':');
    s.push_str(key);
    s.into_bytes()
}

/* --------------------- impl FsKv --------------------- */

impl FsKv {
    /// Directory the values are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        // Windows-safe: map arbitrary bytes to a hex file name.
        let mut name = String::with_capacity(key.len() * 2);
        for &b in key {
            name.push(hex_digit(b >> 4));
            name.push(hex_digit(b & 0xF));
        }
        self.root.join(name)
    }
}

fn hex_digit(n: u8) -> char {
    match n {
        0..=9 => (b'0' + n) as char,
        10..=15 => (b'a' + (n - 10)) as char,
        _ => '?',
    }
}

impl Kv for FsKv {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        let mut f = fs::File::open(&path).ok()?;
        let mut buf = Vec::new();
        if f.read_to_end(&mut buf).is_ok() { Some(buf) } else { None }
    }

    fn put(&self, key: &[u8], val: &[u8]) -> io::Result<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.root)?;
        // Write temp then rename so a reader never sees half a snapshot.
        let tmp = path.with_extension("tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(val)?;
        f.sync_all()?;
        fs::rename(tmp, path)
    }

    fn delete(&self, key: &[u8]) -> bool {
        let path = self.path_for(key);
        fs::remove_file(path).is_ok()
    }
}

/* --------------------- impl MemKv --------------------- */

impl MemKv {
    /// Empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Kv for MemKv {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.get(key).cloned()
    }

    fn put(&self, key: &[u8], val: &[u8]) -> io::Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(key.to_vec(), val.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> bool {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_joins_with_colon() {
        assert_eq!(ns("automation", "scripts"), b"automation:scripts".to_vec());
    }

    #[test]
    fn fs_kv_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let kv = open_default(dir.path().join("kv")).unwrap();

        assert!(kv.get(b"a:b").is_none());
        kv.put(b"a:b", b"hello").unwrap();
        assert_eq!(kv.get(b"a:b").unwrap(), b"hello");
        // hex file name, no temp file left behind
        assert!(kv.root().join("613a62").exists());
        assert!(!kv.root().join("613a62.tmp").exists());

        assert!(kv.delete(b"a:b"));
        assert!(!kv.delete(b"a:b"));
    }

    #[test]
    fn serde_helpers_store_json_text() {
        let kv = MemKv::new();
        kv.put_t(b"k", &vec!["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(kv.get(b"k").unwrap(), br#"["x","y"]"#.to_vec());

        let back: Option<Vec<String>> = kv.get_t(b"k").unwrap();
        assert_eq!(back, Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let kv = MemKv::new();
        kv.put(b"k", b"{not json").unwrap();
        let err = kv.get_t::<Vec<String>>(b"k").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "k"));
    }
}
