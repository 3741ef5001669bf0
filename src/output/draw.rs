// 该文件是 Qiepian （切片） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, warn};

use crate::detection::{Detection, DetectionSet};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_OFFSET_Y: i32 = 5;
const SCORE_OFFSET_X: i32 = 20;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

// 未指定字体时依次尝试的系统字体
const SYSTEM_FONTS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 在图像上绘制检测框，没有可用字体时只画框不写标签
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  color: Rgb<u8>,
}

impl Default for Draw {
  /// 使用找到的第一个系统字体，都不可用时只画框
  fn default() -> Self {
    let candidates: Vec<&Path> = SYSTEM_FONTS.iter().map(|p| Path::new(*p)).collect();
    Self::with_font_candidates(&candidates)
  }
}

impl Draw {
  fn boxes_only() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      color: Rgb(BOX_COLOR),
    }
  }

  fn load_font(path: &Path) -> Result<FontVec, DrawError> {
    let data = std::fs::read(path)?;
    Ok(FontVec::try_from_vec(data)?)
  }

  pub fn with_font_file(path: &Path) -> Result<Self, DrawError> {
    let font = Self::load_font(path)?;
    debug!("加载标签字体: {}", path.display());
    Ok(Self {
      font: Some(font),
      ..Self::boxes_only()
    })
  }

  /// 依次尝试候选字体文件，跳过不存在或无效的文件
  pub fn with_font_candidates(candidates: &[&Path]) -> Self {
    for path in candidates {
      match Self::load_font(path) {
        Ok(font) => {
          debug!("使用系统字体: {}", path.display());
          return Self {
            font: Some(font),
            ..Self::boxes_only()
          };
        }
        Err(e) => debug!("跳过字体 {}: {}", path.display(), e),
      }
    }
    warn!("没有找到可用字体, 只绘制检测框, 可通过 ?font= 指定字体文件");
    Self::boxes_only()
  }

  /// 角点取整后的矩形，宽或高为 0 时返回 None
  fn box_rect(det: &Detection) -> Option<(i32, i32, u32, u32)> {
    let [x1, y1, x2, y2] = det.corners();
    let (x1, y1, x2, y2) = (x1 as i32, y1 as i32, x2 as i32, y2 as i32);
    if x2 <= x1 || y2 <= y1 {
      return None;
    }
    Some((x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
  }

  fn draw_detection(&self, image: &mut RgbImage, det: &Detection) {
    let Some((x, y, width, height)) = Self::box_rect(det) else {
      return;
    };

    // 2 像素边框
    draw_hollow_rect_mut(image, Rect::at(x, y).of_size(width, height), self.color);
    if width > 2 && height > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
      draw_hollow_rect_mut(image, inner, self.color);
    }

    let Some(font) = &self.font else {
      return;
    };

    // imageproc 以左上角定位文本，标签底边落在框上方 5 像素处
    let scale = PxScale::from(self.font_size);
    let text_y = y - LABEL_OFFSET_Y - self.font_size as i32;
    draw_text_mut(image, self.color, x, text_y, scale, font, &det.class_name);
    let score = format!(" {:.2}", det.confidence);
    draw_text_mut(image, self.color, x + SCORE_OFFSET_X, text_y, scale, font, &score);
  }

  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectionSet) {
    for det in result {
      self.draw_detection(image, det);
    }
  }

  pub fn draw_on_copy(&self, image: &RgbImage, result: &DetectionSet) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_detections(&mut annotated, result);
    annotated
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(x_center: f32, y_center: f32, width: f32, height: f32) -> Detection {
    Detection {
      class_id: 0,
      class_name: "ship".to_string(),
      x_center,
      y_center,
      width,
      height,
      confidence: 0.9,
      image_width: 40,
      image_height: 40,
    }
  }

  #[test]
  fn draws_two_pixel_green_border_from_center_form() {
    let image = RgbImage::new(40, 40);
    let set = DetectionSet::from(vec![det(20.0, 20.0, 10.0, 10.0)]);
    let annotated = Draw::boxes_only().draw_on_copy(&image, &set);

    let green = Rgb(BOX_COLOR);
    // box spans 15..=24 on both axes
    assert_eq!(*annotated.get_pixel(15, 20), green);
    assert_eq!(*annotated.get_pixel(16, 20), green);
    assert_eq!(*annotated.get_pixel(17, 20), Rgb([0, 0, 0]));
    assert_eq!(*annotated.get_pixel(20, 24), green);
    assert_eq!(*annotated.get_pixel(20, 20), Rgb([0, 0, 0]));
    // source image untouched
    assert_eq!(*image.get_pixel(15, 20), Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_past_the_edge_are_clipped_not_panicking() {
    let mut image = RgbImage::new(40, 40);
    let set = DetectionSet::from(vec![det(0.0, 0.0, 30.0, 30.0), det(39.0, 39.0, 0.2, 0.2)]);
    Draw::boxes_only().draw_detections(&mut image, &set);
    assert_eq!(*image.get_pixel(14, 5), Rgb(BOX_COLOR));
  }

  #[test]
  fn unusable_font_candidates_fall_back_to_boxes_only() {
    let dir = std::env::temp_dir().join(format!("qiepian-draw-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let garbage = dir.join("broken.ttf");
    std::fs::write(&garbage, b"not a font").unwrap();

    let draw = Draw::with_font_candidates(&[Path::new("/nonexistent/font.ttf"), garbage.as_path()]);
    assert!(draw.font.is_none());

    // still draws boxes
    let set = DetectionSet::from(vec![det(20.0, 20.0, 10.0, 10.0)]);
    let annotated = draw.draw_on_copy(&RgbImage::new(40, 40), &set);
    assert_eq!(*annotated.get_pixel(15, 20), Rgb(BOX_COLOR));

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn invalid_font_file_is_an_error() {
    let dir = std::env::temp_dir().join(format!("qiepian-font-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let garbage = dir.join("broken.ttf");
    std::fs::write(&garbage, b"not a font").unwrap();

    assert!(matches!(
      Draw::with_font_file(&garbage),
      Err(DrawError::InvalidFont(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn missing_font_file_is_an_error() {
    assert!(matches!(
      Draw::with_font_file(Path::new("/nonexistent/font.ttf")),
      Err(DrawError::IoError(_))
    ));
  }
}
