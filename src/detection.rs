// 该文件是 Qiepian （切片） 项目的一部分。
// src/detection.rs - 全局坐标下的检测结果
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

/// 检测结果，整幅图像的像素坐标，中心点格式。
///
/// 靠近边缘的框可能部分超出图像，这里不做裁剪。
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 类别索引
  pub class_id: u32,
  /// 类别名称
  pub class_name: String,
  /// 中心点 x 坐标
  pub x_center: f32,
  /// 中心点 y 坐标
  pub y_center: f32,
  pub width: f32,
  pub height: f32,
  /// 置信度
  pub confidence: f32,
  /// 所属整幅图像的宽度
  pub image_width: u32,
  /// 所属整幅图像的高度
  pub image_height: u32,
}

impl Detection {
  /// 角点格式 [x_min, y_min, x_max, y_max]
  pub fn corners(&self) -> [f32; 4] {
    let half_w = self.width / 2.0;
    let half_h = self.height / 2.0;
    [
      self.x_center - half_w,
      self.y_center - half_h,
      self.x_center + half_w,
      self.y_center + half_h,
    ]
  }
}

/// 一幅图像的最终检测集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  pub items: Box<[Detection]>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl<'a> IntoIterator for &'a DetectionSet {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}
