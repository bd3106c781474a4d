use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GauthError;
use crate::key::TotpKey;
use crate::uri;

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "yml", "yaml"];

/// Rejects store paths whose extension is not txt/yml/yaml. Content is
/// line-oriented URI text whatever the extension says.
pub fn check_extension(path: &Path) -> Result<(), GauthError> {
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e))
        .unwrap_or(false);

    if supported {
        Ok(())
    } else {
        Err(GauthError::UnsupportedFileExtension {
            path: path.to_path_buf(),
        })
    }
}

/// Keys known to one invocation, in file order, unique by secret.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyStore {
    entries: Vec<TotpKey>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the store at `path`. A missing file is an empty store; the
    /// first line that is not a valid key URI aborts the load.
    pub fn load(path: &Path) -> Result<Self, GauthError> {
        check_extension(path)?;

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "key store not found, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(GauthError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut store = Self::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let key = uri::parse(line).map_err(|e| {
                GauthError::MalformedUri(format!("{}:{}: {e}", path.display(), index + 1))
            })?;

            if !store.add(key) {
                debug!(line = index + 1, "duplicate secret in key store, keeping first");
            }
        }

        debug!(path = %path.display(), keys = store.len(), "loaded key store");
        Ok(store)
    }

    /// Wraps a single key that did not come from a file.
    pub fn single(key: TotpKey) -> Self {
        Self { entries: vec![key] }
    }

    pub fn entries(&self) -> &[TotpKey] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_secret(&self, secret: &str) -> bool {
        self.entries.iter().any(|k| k.has_secret(secret))
    }

    /// Appends `key` unless its secret is already stored. Returns whether
    /// the key was added.
    pub fn add(&mut self, key: TotpKey) -> bool {
        if self.contains_secret(&key.secret) {
            return false;
        }
        self.entries.push(key);
        true
    }

    /// One key URI per line, no trailing newline.
    pub fn to_lines(&self) -> String {
        self.entries
            .iter()
            .map(|k| uri::serialize(k, None))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Overwrites `path` with the serialised store. The data goes to a
    /// sibling temporary file first, so an interrupted write leaves the
    /// previous store intact.
    pub fn save(&self, path: &Path) -> Result<(), GauthError> {
        check_extension(path)?;

        let io_err = |source| GauthError::Io {
            path: path.to_path_buf(),
            source,
        };

        let tmp_path = temporary_path(path);
        fs::write(&tmp_path, self.to_lines()).map_err(io_err)?;
        set_perms_restrictive(&tmp_path).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        debug!(path = %path.display(), keys = self.len(), "saved key store");
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
fn set_perms_restrictive(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_perms_restrictive(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &str = "otpauth://totp/GitHub:octocat?secret=JBSWY3DPEHPK3PXP&issuer=GitHub";
    const SECOND: &str = "otpauth://totp/mail?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&digits=8";

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::load(&dir.path().join("absent.txt")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn unsupported_extension_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        fs::write(&path, FIRST).unwrap();

        assert!(matches!(
            KeyStore::load(&path),
            Err(GauthError::UnsupportedFileExtension { .. })
        ));
        assert!(matches!(
            KeyStore::new().save(&dir.path().join("keys")),
            Err(GauthError::UnsupportedFileExtension { .. })
        ));
        assert!(!dir.path().join("keys").exists());
    }

    #[test]
    fn accepts_yaml_extensions() {
        for name in ["keys.txt", "keys.yml", "keys.yaml"] {
            assert!(check_extension(Path::new(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn two_line_store_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yml");
        fs::write(&path, format!("{FIRST}\n\n{SECOND}\n")).unwrap();

        let store = KeyStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].name, "octocat");
        assert_eq!(store.entries()[1].name, "mail");

        store.save(&path).unwrap();
        let reloaded = KeyStore::load(&path).unwrap();
        assert_eq!(reloaded, store);
        assert!(!temporary_path(&path).exists());
    }

    #[test]
    fn bad_line_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        fs::write(&path, format!("{FIRST}\nhttps://example.com\n{SECOND}")).unwrap();

        match KeyStore::load(&path) {
            Err(GauthError::MalformedUri(msg)) => assert!(msg.contains(":2:"), "{msg}"),
            other => panic!("expected malformed URI, got {other:?}"),
        }
    }

    #[test]
    fn add_ignores_duplicate_secret() {
        let mut store = KeyStore::new();
        let key = uri::parse(FIRST).unwrap();

        assert!(store.add(key.clone()));
        assert!(!store.add(key.clone().with_name("another label")));
        assert_eq!(store.len(), 1);
        assert!(store.contains_secret("jbswy3dpehpk3pxp"));
    }

    #[test]
    fn duplicate_lines_collapse_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        fs::write(&path, format!("{FIRST}\n{FIRST}")).unwrap();

        let store = KeyStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn saved_lines_have_no_trailing_newline() {
        let mut store = KeyStore::new();
        store.add(uri::parse(FIRST).unwrap());
        store.add(uri::parse(SECOND).unwrap());

        let lines = store.to_lines();
        assert_eq!(lines.lines().count(), 2);
        assert!(!lines.ends_with('\n'));
    }

    #[test]
    fn write_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("keys.txt");

        assert!(matches!(
            KeyStore::new().save(&path),
            Err(GauthError::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn saved_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        KeyStore::single(uri::parse(FIRST).unwrap())
            .save(&path)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
