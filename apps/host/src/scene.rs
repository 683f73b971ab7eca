//! 演示场景
//!
//! 黑色背景、斜上方相机、一盏方向光，以及位于工作空间中心的一个红色球体。

use haptic_scene::{
    Color, HapticMaterial, InteractableObject, SceneError, SceneHandle, VisualMaterial, World,
};
use nalgebra::Vector3;
use tracing::info;

/// 球体半径（m）
pub const SPHERE_RADIUS: f64 = 0.03;

/// 构造演示场景
///
/// 场景构造失败是宿主程序唯一的致命错误。
pub fn build_demo_world() -> Result<World, SceneError> {
    info!("Creating 3D world");
    let mut world = World::new();
    world.background = Color::BLACK;

    info!("Setting up camera");
    world.camera.set(
        Vector3::new(0.5, 0.0, 0.3),
        Vector3::zeros(),
        Vector3::z(),
    )?;
    world.camera.set_clipping_planes(0.01, 10.0)?;
    world.camera.set_field_view_angle_deg(45.0)?;

    info!("Configuring lighting");
    world.light.enabled = true;
    world.light.set_dir(Vector3::new(-1.0, -1.0, -1.0))?;
    world.light.ambient = Color::gray(0.3);
    world.light.diffuse = Color::gray(0.7);
    world.light.specular = Color::WHITE;

    info!("Creating scene objects");
    let sphere = world.add_object(
        InteractableObject::sphere("sphere", SPHERE_RADIUS)
            .with_local_pos(Vector3::zeros())
            .with_material(HapticMaterial {
                stiffness: 1000.0,
                static_friction: 0.3,
                dynamic_friction: 0.2,
                viscosity: 0.1,
            })
            .with_visual(VisualMaterial {
                color: Color::RED_CRIMSON,
                specular_level: 0.8,
                shininess: 100,
            }),
    )?;
    sphere.set_haptic_enabled(true);
    sphere.set_visible(true);

    Ok(world)
}
