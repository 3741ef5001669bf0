// 该文件是 Qiepian （切片） 项目的一部分。
// src/region.rs - 图像切片
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

use std::fmt;

use tracing::debug;

use crate::error::TilingError;

/// 图像中的矩形区域（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
  /// 左上角 x 偏移
  pub x: u32,
  /// 左上角 y 偏移
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl Region {
  pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 覆盖整幅图像的区域
  pub fn whole(width: u32, height: u32) -> Self {
    Self::new(0, 0, width, height)
  }

  pub fn right(&self) -> u32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> u32 {
    self.y + self.height
  }

  pub fn contains(&self, px: u32, py: u32) -> bool {
    px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
  }
}

impl fmt::Display for Region {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({}, {}, {}x{})",
      self.x, self.y, self.width, self.height
    )
  }
}

/// 将图像切分为相互重叠的区域，步长为切片大小的一半。
///
/// 先按行（y）后按列（x）生成，边界处的区域被裁剪到图像范围内，
/// 因此最后一行/列的区域可能小于 `slice_size`。
pub fn slice(
  image_width: u32,
  image_height: u32,
  slice_size: u32,
) -> Result<Vec<Region>, TilingError> {
  let step = slice_size / 2;
  if step == 0 {
    return Err(TilingError::invalid(format!(
      "切片大小必须不小于 2, 实际为 {}",
      slice_size
    )));
  }

  let mut regions = Vec::new();
  for y in (0..image_height).step_by(step as usize) {
    let bottom = y.saturating_add(slice_size).min(image_height);
    for x in (0..image_width).step_by(step as usize) {
      let right = x.saturating_add(slice_size).min(image_width);
      regions.push(Region::new(x, y, right - x, bottom - y));
    }
  }

  debug!(
    "图像 {}x{} 切分为 {} 个区域 (切片大小 {}, 步长 {})",
    image_width,
    image_height,
    regions.len(),
    slice_size,
    step
  );

  Ok(regions)
}
