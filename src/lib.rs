//! Pilot Light - a modular runtime hosting an application and a set of
//! dynamically-loaded extensions.
//!
//! Modules find each other only through the versioned API registry and
//! park cross-reload state in the data registry; a small host drives the
//! cooperative main loop: pump events, begin the IO frame, run the app,
//! swap the profiler frame, then detect and apply module reloads.

pub mod config;
pub mod error;
pub mod extension;
pub mod io;
pub mod library;
pub mod logging;
pub mod memory;
pub mod physics;
pub mod platform;
pub mod profiling;
pub mod registry;
pub mod version;

pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use extension::{ExtensionError, ExtensionRegistry};
pub use io::{Io, IoConfig, KeyCode, MouseButton};
pub use library::{LibraryDesc, LibraryError, SharedLibrary};
pub use logging::{ChannelId, ChannelInit, LogContext, LogLevel};
pub use memory::MemoryTracker;
pub use physics::{PhysicsSettings, PhysicsWorld, RigidBodyDesc};
pub use profiling::ProfileContext;
pub use registry::{ApiRegistry, DataRegistry};
pub use version::{ApiVersion, RUNTIME_VERSION, RUNTIME_VERSION_STRING};

use anyhow::Result;
use std::sync::Arc;

/// Everything an application sees each frame.
pub struct RuntimeContext {
    pub api: Arc<ApiRegistry>,
    pub data: Arc<DataRegistry>,
    pub log: Arc<LogContext>,
    pub io: Io,
    pub profiler: ProfileContext,
    pub physics: PhysicsWorld,
}

/// The application hosted by the runtime. Mirrors the load/update/shutdown
/// contract extensions follow, minus the C ABI.
pub trait App {
    fn load(&mut self, _context: &mut RuntimeContext) {}

    /// Called once per frame after `new_frame`. Set `io.running` to false
    /// to leave the main loop.
    fn update(&mut self, context: &mut RuntimeContext);

    fn shutdown(&mut self, _context: &mut RuntimeContext) {}
}

/// The host: builds the registries, loads configured extensions, and
/// drives the main loop.
pub struct Runtime {
    context: RuntimeContext,
    extensions: ExtensionRegistry,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Runtime> {
        config.validate()?;

        let api = Arc::new(ApiRegistry::new());
        let data = Arc::new(DataRegistry::new());
        platform::register_all(&api);

        let log = Arc::new(LogContext::new());
        if let Some(level) = config.logging.parsed_level() {
            log.set_level(ChannelId::DEFAULT, level);
        }

        let mut extensions = ExtensionRegistry::new(Arc::clone(&api));
        for path in &config.extension_paths {
            extensions.add_path(path.clone());
        }
        for extension in &config.extensions {
            if let Err(e) = extensions.load(
                &extension.name,
                &extension.load_symbol,
                Some(&extension.unload_symbol),
                extension.reloadable,
            ) {
                // the feature area stays absent, everything else runs
                log::error!("[Runtime::new] failed to load extension {}: {}", extension.name, e);
            }
        }

        let context = RuntimeContext {
            api,
            data,
            log,
            io: Io::new(config.io),
            profiler: ProfileContext::new(platform::threads::hardware_thread_count()),
            physics: PhysicsWorld::new(config.physics.to_settings()),
        };

        log::info!(
            "[Runtime::new] runtime {} initialized ({} extensions loaded)",
            RUNTIME_VERSION_STRING,
            extensions.loaded_extensions().len()
        );

        Ok(Runtime {
            context,
            extensions,
        })
    }

    pub fn context(&mut self) -> &mut RuntimeContext {
        &mut self.context
    }

    pub fn extensions(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    /// Runs the cooperative main loop until `io.running` goes false.
    pub fn run<A: App>(mut self, mut app: A) -> Result<()> {
        log::info!("[Runtime::run] entering main loop");
        app.load(&mut self.context);

        while self.context.io.is_running() {
            self.context.profiler.begin_frame();
            self.context.io.new_frame();

            app.update(&mut self.context);

            self.context.profiler.end_frame();

            // apply hot reloads between frames
            self.extensions.update();
        }

        app.shutdown(&mut self.context);
        log::info!(
            "[Runtime::run] main loop exited after {} frames",
            self.context.io.frame_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingApp {
        updates: u64,
        limit: u64,
        loaded: bool,
        shutdown: bool,
    }

    impl App for CountingApp {
        fn load(&mut self, _context: &mut RuntimeContext) {
            self.loaded = true;
        }

        fn update(&mut self, context: &mut RuntimeContext) {
            self.updates += 1;
            if self.updates == self.limit {
                context.io.set_running(false);
            }
        }

        fn shutdown(&mut self, _context: &mut RuntimeContext) {
            self.shutdown = true;
        }
    }

    #[test]
    fn test_runtime_builds_with_defaults() {
        let runtime = Runtime::new(RuntimeConfig::default());
        assert!(runtime.is_ok());
    }

    #[test]
    fn test_main_loop_runs_until_stopped() {
        let runtime = Runtime::new(RuntimeConfig::default()).expect("builds");

        let mut app = CountingApp {
            updates: 0,
            limit: 50,
            loaded: false,
            shutdown: false,
        };

        // run consumes the runtime, so observe through a wrapper
        struct Probe<'a>(&'a mut CountingApp);
        impl App for Probe<'_> {
            fn load(&mut self, context: &mut RuntimeContext) {
                self.0.load(context);
            }
            fn update(&mut self, context: &mut RuntimeContext) {
                self.0.update(context);
            }
            fn shutdown(&mut self, context: &mut RuntimeContext) {
                self.0.shutdown(context);
            }
        }

        runtime.run(Probe(&mut app)).expect("loop exits cleanly");
        assert!(app.loaded);
        assert!(app.shutdown);
        assert_eq!(app.updates, 50);
    }

    #[test]
    fn test_missing_configured_extension_is_not_fatal() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [[extensions]]
            name = "not_really_there"
            "#,
        )
        .expect("parses");

        let mut runtime = Runtime::new(config).expect("builds anyway");
        assert!(runtime.extensions().loaded_extensions().is_empty());
    }

    #[test]
    fn test_context_exposes_subsystems() {
        let mut runtime = Runtime::new(RuntimeConfig::default()).expect("builds");
        let context = runtime.context();

        assert!(context.api.len() >= 3); // platform capabilities
        context.data.set_data(
            "probe",
            crate::registry::DataPtr::new(std::ptr::null_mut()),
        );
        assert!(context.data.get_data("probe").is_some());
        assert!(context.io.is_running());
    }
}
