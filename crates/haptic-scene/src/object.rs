//! 可交互物体

use crate::SceneError;
use crate::atomic::AtomicVec3;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// 物体几何形状
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Sphere { radius: f64 },
}

/// 触觉材质参数
///
/// 力学定律由工具（tool cursor）实现，物体只暴露参数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticMaterial {
    /// 刚度（N/m）
    pub stiffness: f64,
    /// 静摩擦系数
    pub static_friction: f64,
    /// 动摩擦系数
    pub dynamic_friction: f64,
    /// 粘滞系数（N·s/m）
    pub viscosity: f64,
}

impl Default for HapticMaterial {
    fn default() -> Self {
        Self {
            stiffness: 1000.0,
            static_friction: 0.3,
            dynamic_friction: 0.2,
            viscosity: 0.1,
        }
    }
}

impl HapticMaterial {
    pub fn validate(&self) -> Result<(), SceneError> {
        let fields = [
            ("stiffness", self.stiffness),
            ("static_friction", self.static_friction),
            ("dynamic_friction", self.dynamic_friction),
            ("viscosity", self.viscosity),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SceneError::InvalidMaterial(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// RGB 颜色（0.0 - 1.0）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED_CRIMSON: Color = Color::rgb(0.862_745, 0.078_431, 0.235_294);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }
}

/// 视觉材质
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualMaterial {
    pub color: Color,
    pub specular_level: f32,
    pub shininess: u32,
}

impl Default for VisualMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            specular_level: 0.5,
            shininess: 64,
        }
    }
}

/// 场景中工具可以接触的物体
///
/// 位置和使能标志使用原子量存储，添加到场景后以 `Arc` 在两个回路间共享。
#[derive(Debug)]
pub struct InteractableObject {
    name: String,
    shape: Shape,
    material: HapticMaterial,
    visual: VisualMaterial,
    local_pos: AtomicVec3,
    global_pos: AtomicVec3,
    haptic_enabled: AtomicBool,
    visible: AtomicBool,
}

impl InteractableObject {
    pub fn sphere(name: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Sphere { radius },
            material: HapticMaterial::default(),
            visual: VisualMaterial::default(),
            local_pos: AtomicVec3::default(),
            global_pos: AtomicVec3::default(),
            haptic_enabled: AtomicBool::new(true),
            visible: AtomicBool::new(true),
        }
    }

    pub fn with_material(mut self, material: HapticMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_visual(mut self, visual: VisualMaterial) -> Self {
        self.visual = visual;
        self
    }

    pub fn with_local_pos(self, pos: Vector3<f64>) -> Self {
        self.local_pos.store(pos);
        self
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        match self.shape {
            Shape::Sphere { radius } if !(radius.is_finite() && radius > 0.0) => {
                return Err(SceneError::InvalidShape(format!(
                    "sphere '{}' radius must be > 0, got {}",
                    self.name, radius
                )));
            },
            Shape::Sphere { .. } => {},
        }
        self.material.validate()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn material(&self) -> &HapticMaterial {
        &self.material
    }

    pub fn visual(&self) -> &VisualMaterial {
        &self.visual
    }

    pub fn local_pos(&self) -> Vector3<f64> {
        self.local_pos.load()
    }

    pub fn set_local_pos(&self, pos: Vector3<f64>) {
        self.local_pos.store(pos);
    }

    /// 最近一次 `advance_global_state()` 计算出的全局位置
    pub fn global_pos(&self) -> Vector3<f64> {
        self.global_pos.load()
    }

    pub(crate) fn update_global_pos(&self, parent: &Vector3<f64>) {
        self.global_pos.store(parent + self.local_pos.load());
    }

    pub fn is_haptic_enabled(&self) -> bool {
        self.haptic_enabled.load(Ordering::Acquire)
    }

    pub fn set_haptic_enabled(&self, enabled: bool) {
        self.haptic_enabled.store(enabled, Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }
}
