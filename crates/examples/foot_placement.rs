//! Stands a two-legged skeleton on a staircase and logs where its feet land.

use stride::prelude::*;

/// Flat stairs rising along +X, `rise` per `run`.
struct Stairs {
    run: f32,
    rise: f32,
}

impl GroundProbe for Stairs {
    fn raycast_closest(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if direction.y >= 0.0 {
            return None;
        }
        let height = (origin.x / self.run).floor().max(0.0) * self.rise;
        let distance = (height - origin.y) / direction.y;
        (0.0..=max_distance).contains(&distance).then(|| RayHit {
            point: origin + direction * distance,
            normal: Vec3::Y,
        })
    }
}

fn add_leg(skeleton: &mut Skeleton, hips: usize, side: &str, x: f32) -> Result<usize> {
    let thigh = skeleton.add_bone(format!("{side}_thigh"), Some(hips), Transform::from_position(Vec3::new(x, -0.1, 0.0)))?;
    let knee = skeleton.add_bone(format!("{side}_knee"), Some(thigh), Transform::from_position(Vec3::new(0.0, -0.45, 0.02)))?;
    skeleton.add_bone(format!("{side}_foot"), Some(knee), Transform::from_position(Vec3::new(0.0, -0.45, -0.02)))
}

fn main() -> Result<()> {
    env_logger::init();

    let stairs = Stairs { run: 0.3, rise: 0.12 };

    for x in [0.05, 0.2, 0.35, 0.5] {
        let mut skeleton = Skeleton::new();
        let hips = skeleton.add_bone("hips", None, Transform::from_position(Vec3::new(x, 1.0, 0.0)))?;
        let left = add_leg(&mut skeleton, hips, "left", -0.1)?;
        let right = add_leg(&mut skeleton, hips, "right", 0.1)?;

        let placement = FootPlacement::new(hips, left, right).with_settings(FootPlacementSettings {
            foot_bone_height: 0.05,
            ..Default::default()
        });

        if !placement.update(&mut skeleton, &stairs)? {
            log::warn!("No ground under hips at x = {x}");
            continue;
        }

        log::info!(
            "hips x {x:.2}: hips {:.3} | left foot {:.3} | right foot {:.3}",
            skeleton.world_transform(hips).position,
            skeleton.world_transform(left).position,
            skeleton.world_transform(right).position
        );
    }

    Ok(())
}
