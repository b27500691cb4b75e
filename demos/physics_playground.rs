//! Drops a pile of random spheres and boxes onto a ground plane and logs
//! solver statistics until everything falls asleep.
//!
//! Run with `cargo run --example physics_playground`.

use glam::{Quat, Vec3};
use pilot_light::physics::{CollisionShape, HalfSpace, RigidBodyDesc};
use pilot_light::{App, Runtime, RuntimeConfig, RuntimeContext};
use rand::Rng;

struct Playground {
    handles: Vec<pilot_light::physics::BodyHandle>,
    elapsed: f32,
    last_report: f32,
}

impl App for Playground {
    fn load(&mut self, context: &mut RuntimeContext) {
        context.physics.add_half_space(HalfSpace {
            direction: Vec3::Y,
            offset: 0.0,
            friction: 0.9,
            restitution: 0.1,
        });

        let mut rng = rand::thread_rng();
        for index in 0..24 {
            let desc = if index % 2 == 0 {
                RigidBodyDesc {
                    shape: CollisionShape::Sphere {
                        radius: rng.gen_range(0.2..0.5),
                    },
                    restitution: rng.gen_range(0.1..0.6),
                    friction: 0.4,
                    ..Default::default()
                }
            } else {
                RigidBodyDesc {
                    shape: CollisionShape::Box {
                        extents: Vec3::splat(rng.gen_range(0.4..0.8)),
                    },
                    restitution: 0.05,
                    friction: 0.6,
                    ..Default::default()
                }
            };

            let position = Vec3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(2.0..12.0),
                rng.gen_range(-3.0..3.0),
            );
            self.handles
                .push(context.physics.add_body(&desc, position, Quat::IDENTITY));
        }

        log::info!("[Playground::load] {} bodies spawned", self.handles.len());
    }

    fn update(&mut self, context: &mut RuntimeContext) {
        context.profiler.begin_sample(0, "physics");
        context.physics.update(context.io.delta_time());
        context.profiler.end_sample(0);

        self.elapsed += context.io.delta_time();

        if self.elapsed - self.last_report >= 1.0 {
            self.last_report = self.elapsed;
            let stats = context.physics.stats();
            let awake = self
                .handles
                .iter()
                .filter(|&&handle| {
                    context
                        .physics
                        .body(handle)
                        .map(|body| body.is_awake)
                        .unwrap_or(false)
                })
                .count();
            log::info!(
                "[Playground::update] t={:.0}s awake={} contacts={} pos_its={} vel_its={}",
                self.elapsed,
                awake,
                stats.contact_count,
                stats.position_iterations,
                stats.velocity_iterations,
            );

            if awake == 0 || self.elapsed > 30.0 {
                context.io.set_running(false);
            }
        }
    }

    fn shutdown(&mut self, context: &mut RuntimeContext) {
        let resting = self
            .handles
            .iter()
            .filter(|&&handle| {
                context
                    .physics
                    .body(handle)
                    .map(|body| body.position.y < 2.0)
                    .unwrap_or(false)
            })
            .count();
        log::info!(
            "[Playground::shutdown] {}/{} bodies settled on the ground",
            resting,
            self.handles.len()
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let runtime = Runtime::new(RuntimeConfig::default())?;
    runtime.run(Playground {
        handles: Vec::new(),
        elapsed: 0.0,
        last_report: 0.0,
    })
}
