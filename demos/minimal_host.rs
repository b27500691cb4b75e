//! Bare minimum host: build a runtime, run an app for 50 frames, exit.
//!
//! Run with `cargo run --example minimal_host`.

use pilot_light::{App, Runtime, RuntimeConfig, RuntimeContext};

struct MinimalApp {
    iteration: u64,
}

impl App for MinimalApp {
    fn update(&mut self, context: &mut RuntimeContext) {
        println!("iteration: {}", self.iteration);
        self.iteration += 1;

        // shut the main event loop down after 50 iterations
        if self.iteration == 50 {
            context.io.set_running(false);
        }
    }

    fn shutdown(&mut self, _context: &mut RuntimeContext) {
        println!("shutting down");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let runtime = Runtime::new(RuntimeConfig::default())?;
    runtime.run(MinimalApp { iteration: 0 })
}
