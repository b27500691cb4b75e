use criterion::{criterion_group, criterion_main, Criterion};
use glam::{Quat, Vec3};
use pilot_light::physics::{CollisionShape, HalfSpace, PhysicsWorld, RigidBodyDesc};

fn build_pile(body_count: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::default();
    world.add_half_space(HalfSpace {
        direction: Vec3::Y,
        offset: 0.0,
        friction: 0.8,
        restitution: 0.0,
    });

    let desc = RigidBodyDesc {
        shape: CollisionShape::Box {
            extents: Vec3::splat(0.5),
        },
        friction: 0.5,
        can_sleep: false,
        ..Default::default()
    };

    for index in 0..body_count {
        let column = (index % 4) as f32;
        let row = (index / 4) as f32;
        world.add_body(
            &desc,
            Vec3::new(column * 1.5 - 3.0, 0.25 + row * 0.6, 0.0),
            Quat::IDENTITY,
        );
    }
    world
}

fn bench_substep(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_substep");
    for body_count in [8usize, 32, 64] {
        group.bench_function(format!("{}_boxes", body_count), |b| {
            let mut world = build_pile(body_count);
            // settle the initial interpenetration out of the measurement
            for _ in 0..30 {
                world.update(1.0 / 60.0);
            }
            b.iter(|| world.update(1.0 / 60.0));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_substep);
criterion_main!(benches);
