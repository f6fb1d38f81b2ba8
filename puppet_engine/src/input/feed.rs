//! 外部目标源
//!
//! 检测服务返回 `{ "x": .., "y": .. }`（可嵌套在某个字段下）。
//! 获取过程是异步的，可能跨越多帧；帧循环只做非阻塞读取。

use std::sync::mpsc::Receiver;

use glam::{DVec2, DVec3};
use serde::Deserialize;
use serde_json::Value;

use crate::config::FeedSpace;
use crate::geometry::{project_screen_to_world, CameraModel, TARGET_PLANE_Z};
use crate::{PuppetError, Result};

/// 非阻塞目标源
pub trait TargetSource {
    /// 取出下一条已完成的获取结果；没有新数据时返回 None
    fn try_next(&mut self) -> Option<Result<String>>;
}

impl TargetSource for Receiver<Result<String>> {
    fn try_next(&mut self) -> Option<Result<String>> {
        self.try_recv().ok()
    }
}

#[derive(Debug, Deserialize)]
struct FeedPoint {
    x: f64,
    y: f64,
}

/// 解析目标记录，field 为点分路径（如 "hand.tip"）
pub fn parse_feed_record(text: &str, field: Option<&str>) -> Result<DVec2> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| PuppetError::FeedParse(e.to_string()))?;

    let mut node = &root;
    if let Some(path) = field.filter(|p| !p.is_empty()) {
        for segment in path.split('.') {
            node = node.get(segment).ok_or_else(|| {
                PuppetError::FeedParse(format!("missing field '{segment}' in '{path}'"))
            })?;
        }
    }

    let point = FeedPoint::deserialize(node).map_err(|e| PuppetError::FeedParse(e.to_string()))?;
    let point = DVec2::new(point.x, point.y);
    if !point.is_finite() {
        return Err(PuppetError::FeedParse("non-finite coordinates".into()));
    }
    Ok(point)
}

/// 将目标源坐标转换为世界坐标
pub fn feed_point_to_world(point: DVec2, space: FeedSpace, camera: &CameraModel) -> Option<DVec3> {
    match space {
        FeedSpace::World => Some(point.extend(TARGET_PLANE_Z)),
        FeedSpace::Ndc => project_screen_to_world(point, camera),
        FeedSpace::Normalized => {
            let ndc = DVec2::new(point.x * 2.0 - 1.0, 1.0 - point.y * 2.0);
            project_screen_to_world(ndc, camera)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_parse_flat_record() {
        let point = parse_feed_record(r#"{"x": 0.25, "y": 0.75, "score": 0.9}"#, None).unwrap();
        assert_eq!(point, DVec2::new(0.25, 0.75));
    }

    #[test]
    fn test_parse_nested_record() {
        let text = r#"{"hand": {"tip": {"x": -1, "y": 2}}, "ts": 12}"#;
        assert_eq!(parse_feed_record(text, Some("hand.tip")).unwrap(), DVec2::new(-1.0, 2.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_feed_record("<html>", None), Err(PuppetError::FeedParse(_))));
        assert!(matches!(
            parse_feed_record(r#"{"x": 1}"#, None),
            Err(PuppetError::FeedParse(_))
        ));
        assert!(matches!(
            parse_feed_record(r#"{"hand": {"x": 1, "y": 1}}"#, Some("hand.tip")),
            Err(PuppetError::FeedParse(_))
        ));
        assert!(parse_feed_record(r#"{"x": "left", "y": 1}"#, None).is_err());
    }

    #[test]
    fn test_world_space_passthrough() {
        let camera = CameraModel::default();
        assert_eq!(
            feed_point_to_world(DVec2::new(0.3, -0.2), FeedSpace::World, &camera),
            Some(DVec3::new(0.3, -0.2, 0.0))
        );
    }

    #[test]
    fn test_normalized_center_projects_to_look_at() {
        let camera = CameraModel::perspective(45.0, 1.0, 0.1, 100.0)
            .with_position(DVec3::new(0.0, 0.0, 3.0), DVec3::ZERO);
        let world =
            feed_point_to_world(DVec2::new(0.5, 0.5), FeedSpace::Normalized, &camera).unwrap();
        assert!(world.length() < 1e-9);

        // 图像坐标 Y 向下：顶部对应世界 +Y
        let top =
            feed_point_to_world(DVec2::new(0.5, 0.0), FeedSpace::Normalized, &camera).unwrap();
        assert!(top.y > 0.0);
    }

    #[test]
    fn test_receiver_is_non_blocking() {
        let (tx, mut rx) = mpsc::channel::<Result<String>>();
        assert!(rx.try_next().is_none());

        tx.send(Ok(r#"{"x":1,"y":2}"#.to_string())).unwrap();
        assert!(matches!(rx.try_next(), Some(Ok(_))));
        assert!(rx.try_next().is_none());
    }
}
