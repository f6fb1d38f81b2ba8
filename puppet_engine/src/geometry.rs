//! 几何工具
//!
//! IK 计算在单一运动平面（世界 XY）内进行，深度轴只参与投影。

use glam::{DMat4, DVec2, DVec3};

/// 目标点所在的世界平面深度（z = 0）
pub const TARGET_PLANE_Z: f64 = 0.0;

/// 射线与平面近似平行的阈值
const PARALLEL_EPSILON: f64 = 1e-9;

// ============================================================================
// 距离与裁剪
// ============================================================================

/// 平面距离：只使用 X/Y 两个平面内的轴
#[inline]
pub fn planar_distance(a: DVec3, b: DVec3) -> f64 {
    a.truncate().distance(b.truncate())
}

/// 将目标裁剪到以 origin 为圆心、max_radius 为半径的球内
///
/// 在半径内时原样返回；否则返回 origin → target 射线上距离恰为 max_radius 的点。
pub fn clamp_to_reachable_radius(target: DVec3, origin: DVec3, max_radius: f64) -> DVec3 {
    let max_radius = max_radius.max(0.0);
    let offset = target - origin;
    let distance = offset.length();

    if distance <= max_radius {
        return target;
    }

    origin + offset * (max_radius / distance)
}

// ============================================================================
// 相机与投影
// ============================================================================

/// 核心侧持有的相机模型（透视相机）
#[derive(Clone, Debug, PartialEq)]
pub struct CameraModel {
    pub position: DVec3,
    pub look_at: DVec3,
    pub up: DVec3,
    /// 垂直视场角（度）
    pub fov_y_degrees: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl CameraModel {
    /// 创建位于 (0, 0, 1) 朝向原点的透视相机
    pub fn perspective(fov_y_degrees: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 1.0),
            look_at: DVec3::ZERO,
            up: DVec3::Y,
            fov_y_degrees,
            aspect,
            near,
            far,
        }
    }

    pub fn with_position(mut self, position: DVec3, look_at: DVec3) -> Self {
        self.position = position;
        self.look_at = look_at;
        self
    }

    /// 视口尺寸变化时更新宽高比
    pub fn set_aspect(&mut self, aspect: f64) {
        self.aspect = aspect;
    }

    /// 投影参数是否有效
    pub fn is_valid(&self) -> bool {
        let forward = self.look_at - self.position;
        self.fov_y_degrees > 0.0
            && self.fov_y_degrees < 180.0
            && self.aspect.is_finite()
            && self.aspect > 0.0
            && self.near > 0.0
            && self.far > self.near
            && forward.is_finite()
            && forward.length_squared() > PARALLEL_EPSILON
            && forward.cross(self.up).length_squared() > PARALLEL_EPSILON
    }

    #[inline]
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.position, self.look_at, self.up)
    }

    #[inline]
    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh_gl(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::perspective(45.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

/// 客户端像素坐标 → 归一化设备坐标（NDC，Y 轴向上）
pub fn ndc_from_client(client: DVec2, origin: DVec2, size: DVec2) -> Option<DVec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let relative = (client - origin) / size;
    Some(DVec2::new(relative.x * 2.0 - 1.0, -(relative.y * 2.0) + 1.0))
}

/// 将 NDC 坐标反投影为射线并与 z = 0 平面求交
///
/// 相机无效、视线与平面平行或交点在相机后方时返回 None（本帧不更新）。
pub fn project_screen_to_world(ndc: DVec2, camera: &CameraModel) -> Option<DVec3> {
    if !camera.is_valid() || !ndc.is_finite() {
        return None;
    }

    let inverse = (camera.projection_matrix() * camera.view_matrix()).inverse();
    let near = inverse.project_point3(DVec3::new(ndc.x, ndc.y, -1.0));
    let far = inverse.project_point3(DVec3::new(ndc.x, ndc.y, 1.0));
    let direction = far - near;

    if !direction.is_finite() || direction.z.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = (TARGET_PLANE_Z - near.z) / direction.z;
    if t < 0.0 {
        return None;
    }

    let point = near + direction * t;
    point.is_finite().then_some(point)
}
