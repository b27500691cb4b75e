//! Extension registry: load, unload, and hot-reload orchestration.
//!
//! An extension is a shared library exporting C-callable `load`/`unload`
//! entry points. On first load the entry point is called with
//! `reload = false`; the reload watch calls the outgoing module with
//! `unload(reload = true)` and the incoming one with `load(reload = true)`,
//! and extensions are expected to park cross-reload state in the data
//! registry and re-publish their APIs.

use crate::library::{resolve_module_path, LibraryDesc, LibraryError, SharedLibrary};
use crate::registry::ApiRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Signature both extension entry points must have.
pub type ExtensionEntry = unsafe extern "C" fn(registry: *const ApiRegistry, reload: bool);

const RELOAD_RETRY_ATTEMPTS: u32 = 10;
const RELOAD_RETRY_BASE_MS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("extension {name} not found on any search path")]
    NotFound { name: String },

    #[error("extension {name} is not loaded")]
    NotLoaded { name: String },

    #[error("extension {name} is missing required symbol {symbol}")]
    MissingSymbol { name: String, symbol: String },

    #[error("extension {name} did not become readable after reload")]
    ReloadTimeout { name: String },

    #[error(transparent)]
    Library(#[from] LibraryError),
}

struct Extension {
    name: String,
    load_symbol: String,
    unload_symbol: Option<String>,
    reloadable: bool,
    library: SharedLibrary,
    load_fn: ExtensionEntry,
    unload_fn: Option<ExtensionEntry>,
}

/// Orchestrates extension lifecycles over the shared library loader and
/// the API registry. Single-threaded cooperative use: all methods take
/// `&mut self` and run on the main loop.
pub struct ExtensionRegistry {
    api: Arc<ApiRegistry>,
    search_paths: Vec<PathBuf>,
    extensions: Vec<Extension>,
}

impl ExtensionRegistry {
    pub fn new(api: Arc<ApiRegistry>) -> Self {
        Self {
            api,
            search_paths: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Appends a directory to the search list used by `load`.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Loads an extension and calls its `load(registry, reload = false)`.
    pub fn load(
        &mut self,
        name: &str,
        load_symbol: &str,
        unload_symbol: Option<&str>,
        reloadable: bool,
    ) -> Result<(), ExtensionError> {
        if self.is_loaded(name) {
            log::warn!("[ExtensionRegistry::load] {} is already loaded", name);
            return Ok(());
        }

        let path = self.resolve(name)?;
        let library = SharedLibrary::load(&LibraryDesc {
            name: path,
            reloadable,
        })?;

        let load_fn = unsafe { library.load_function::<ExtensionEntry>(load_symbol) }.ok_or_else(
            || ExtensionError::MissingSymbol {
                name: name.to_string(),
                symbol: load_symbol.to_string(),
            },
        )?;
        let unload_fn =
            unload_symbol.and_then(|sym| unsafe { library.load_function::<ExtensionEntry>(sym) });

        unsafe { load_fn(Arc::as_ptr(&self.api), false) };
        log::info!(
            "[ExtensionRegistry::load] loaded {} (reloadable: {})",
            name,
            reloadable
        );

        self.extensions.push(Extension {
            name: name.to_string(),
            load_symbol: load_symbol.to_string(),
            unload_symbol: unload_symbol.map(str::to_string),
            reloadable,
            library,
            load_fn,
            unload_fn,
        });
        Ok(())
    }

    /// Calls the extension's `unload(registry, reload = false)` and
    /// releases the library.
    pub fn unload(&mut self, name: &str) -> Result<(), ExtensionError> {
        let index = self
            .extensions
            .iter()
            .position(|ext| ext.name == name)
            .ok_or_else(|| ExtensionError::NotLoaded {
                name: name.to_string(),
            })?;

        let extension = self.extensions.remove(index);
        if let Some(unload_fn) = extension.unload_fn {
            unsafe { unload_fn(Arc::as_ptr(&self.api), false) };
        }
        log::info!("[ExtensionRegistry::unload] unloaded {}", name);
        Ok(())
    }

    /// Reload watch, invoked each frame (or on demand): hot-swaps every
    /// reloadable extension whose file changed on disk. Returns the number
    /// of extensions swapped. A failed swap leaves that extension unloaded
    /// and is logged; it never leaves a half-initialized API behind.
    pub fn update(&mut self) -> usize {
        let mut reloaded = 0;
        let mut index = 0;
        while index < self.extensions.len() {
            let needs_reload =
                self.extensions[index].reloadable && self.extensions[index].library.has_changed();
            if !needs_reload {
                index += 1;
                continue;
            }

            let name = self.extensions[index].name.clone();
            match self.reload_at(index) {
                Ok(()) => {
                    log::info!("[ExtensionRegistry::update] reloaded {}", name);
                    reloaded += 1;
                    index += 1;
                }
                Err(e) => {
                    log::error!(
                        "[ExtensionRegistry::update] reload of {} failed, unloading: {}",
                        name,
                        e
                    );
                    self.extensions.remove(index);
                }
            }
        }
        reloaded
    }

    fn reload_at(&mut self, index: usize) -> Result<(), ExtensionError> {
        let api = Arc::as_ptr(&self.api);
        let extension = &mut self.extensions[index];

        if let Some(unload_fn) = extension.unload_fn {
            unsafe { unload_fn(api, true) };
        }

        if !wait_until_readable(extension.library.source_path()) {
            return Err(ExtensionError::ReloadTimeout {
                name: extension.name.clone(),
            });
        }

        extension.library.reload()?;

        let load_fn = unsafe {
            extension
                .library
                .load_function::<ExtensionEntry>(&extension.load_symbol)
        }
        .ok_or_else(|| ExtensionError::MissingSymbol {
            name: extension.name.clone(),
            symbol: extension.load_symbol.clone(),
        })?;
        extension.unload_fn = extension
            .unload_symbol
            .as_deref()
            .and_then(|sym| unsafe { extension.library.load_function::<ExtensionEntry>(sym) });
        extension.load_fn = load_fn;

        unsafe { (extension.load_fn)(api, true) };
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext.name == name)
    }

    pub fn loaded_extensions(&self) -> Vec<String> {
        self.extensions.iter().map(|ext| ext.name.clone()).collect()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, ExtensionError> {
        for path in &self.search_paths {
            if let Ok(resolved) = resolve_module_path(&path.join(name)) {
                return Ok(resolved);
            }
        }
        resolve_module_path(Path::new(name)).map_err(|_| ExtensionError::NotFound {
            name: name.to_string(),
        })
    }
}

/// Brief retry with backoff so the reload loop does not race a toolchain
/// still writing the module.
fn wait_until_readable(path: &Path) -> bool {
    for attempt in 0..RELOAD_RETRY_ATTEMPTS {
        if std::fs::File::open(path).is_ok() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(
            RELOAD_RETRY_BASE_MS << attempt.min(5),
        ));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::new(Arc::new(ApiRegistry::new()))
    }

    #[test]
    fn test_missing_extension_stays_unloaded() {
        let mut extensions = registry();
        let result = extensions.load("missing_ext", "load_ext", Some("unload_ext"), false);
        assert!(matches!(result, Err(ExtensionError::NotFound { .. })));
        assert!(!extensions.is_loaded("missing_ext"));
        assert!(extensions.loaded_extensions().is_empty());
    }

    #[test]
    fn test_search_paths_resolve_in_order() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");

        let in_second = second
            .path()
            .join("ext_demo")
            .with_extension(std::env::consts::DLL_EXTENSION);
        std::fs::write(&in_second, b"not a real library").expect("write");

        let mut extensions = registry();
        extensions.add_path(first.path());
        extensions.add_path(second.path());

        assert_eq!(extensions.resolve("ext_demo").expect("resolves"), in_second);

        let in_first = first
            .path()
            .join("ext_demo")
            .with_extension(std::env::consts::DLL_EXTENSION);
        std::fs::write(&in_first, b"not a real library").expect("write");
        assert_eq!(extensions.resolve("ext_demo").expect("resolves"), in_first);
    }

    #[test]
    fn test_corrupt_module_fails_open_not_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir
            .path()
            .join("bad_ext")
            .with_extension(std::env::consts::DLL_EXTENSION);
        std::fs::write(&path, b"definitely not a shared object").expect("write");

        let mut extensions = registry();
        extensions.add_path(dir.path());

        let result = extensions.load("bad_ext", "load_ext", None, false);
        assert!(matches!(
            result,
            Err(ExtensionError::Library(LibraryError::Open { .. }))
        ));
        assert!(!extensions.is_loaded("bad_ext"));
    }

    #[test]
    fn test_unload_unknown_errors() {
        let mut extensions = registry();
        assert!(matches!(
            extensions.unload("ghost"),
            Err(ExtensionError::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_wait_until_readable_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("module.bin");
        std::fs::write(&path, b"ready").expect("write");
        assert!(wait_until_readable(&path));
    }
}
