//! Sweeps an IK target around a single leg and logs the solved joints.
//!
//! Usage: `leg_reach [alpha]` (defaults to 1.0). Run with `RUST_LOG=info` to see
//! the output.

use std::f32::consts::TAU;

use stride::prelude::*;

const STEPS: usize = 12;

fn main() -> Result<()> {
    env_logger::init();

    let alpha = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1.0);
    log::info!("Sweeping leg target with alpha {alpha}");

    let mut skeleton = Skeleton::new();
    let pelvis = skeleton.add_bone("pelvis", None, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))?;
    let hip = skeleton.add_bone("hip", Some(pelvis), Transform::from_position(Vec3::new(0.1, -0.1, 0.0)))?;
    let knee = skeleton.add_bone("knee", Some(hip), Transform::from_position(Vec3::new(0.0, -0.45, 0.02)))?;
    let ankle = skeleton.add_bone("ankle", Some(knee), Transform::from_position(Vec3::new(0.0, -0.45, -0.02)))?;
    let rest = skeleton.rest_pose()?;

    let settings = TwoBoneIkSettings { alpha };
    for step in 0..STEPS {
        skeleton.apply_pose(&rest)?;

        let angle = TAU * step as f32 / STEPS as f32;
        let target = Vec3::new(0.1, 0.35 + 0.3 * angle.sin(), 0.4 * angle.cos());
        let hint = skeleton.world_transform(knee).position + Vec3::Z;
        solve_two_bone_ik_on(&mut skeleton, hip, knee, ankle, target, Some(hint), &settings)?;

        let world = skeleton.compute_world_transforms();
        log::info!(
            "target {:.3} | knee {:.3} | ankle {:.3} | miss {:.4}",
            target,
            world[knee].position,
            world[ankle].position,
            world[ankle].position.distance(target)
        );
    }

    Ok(())
}
