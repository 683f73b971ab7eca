//! # Haptic Scene
//!
//! 场景/渲染协作方的窄接口。
//!
//! 宿主运行时只通过 [`SceneHandle`] 推进场景全局状态和请求渲染，通过 [`Surface`]
//! 呈现帧；场景图、渲染管线本身不在范围内。[`World`] 是一个无窗口（headless）实现，
//! 持有相机、方向光和可交互物体，足以驱动触觉回路和渲染回路。

use std::sync::Arc;
use thiserror::Error;

mod atomic;
mod object;
mod surface;
mod world;

pub use atomic::AtomicVec3;
pub use object::{Color, HapticMaterial, InteractableObject, Shape, VisualMaterial};
pub use surface::{HeadlessSurface, Surface};
pub use world::{Camera, DirectionalLight, World};

/// 场景构造错误
///
/// 场景构造失败是宿主程序唯一的致命错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Invalid material: {0}")]
    InvalidMaterial(String),
    #[error("Invalid camera: {0}")]
    InvalidCamera(String),
    #[error("Invalid light: {0}")]
    InvalidLight(String),
}

/// 场景句柄
///
/// 两个回路共享读取；唯一的修改入口是触觉线程调用的 `advance_global_state()`，
/// 实现必须是无锁的。
pub trait SceneHandle: Send + Sync {
    /// 刷新所有物体的全局位姿（触觉回路第 1 步）
    fn advance_global_state(&self);

    /// 从当前视点渲染一帧
    fn render(&self, viewport_width: u32, viewport_height: u32);

    /// 添加物体（仅在构造阶段调用）
    fn add_object(&mut self, object: InteractableObject)
    -> Result<Arc<InteractableObject>, SceneError>;

    /// 场景中的全部可交互物体
    fn interactables(&self) -> &[Arc<InteractableObject>];
}
