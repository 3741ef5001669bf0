// 该文件是 Qiepian （切片） 项目的一部分。
// src/adapter.rs - 模型调用与坐标映射
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

use image::RgbImage;
use tracing::{debug, error};

use crate::{
  detection::{Detection, DetectionSet},
  error::TilingError,
  model::{Model, ModelFrame, RawDetection},
  region::Region,
  report::{Report, summarize},
};

const UNKNOWN_CLASS: &str = "unknown";

/// 将区域内归一化的检测结果映射到整幅图像的像素坐标。
///
/// 归一化的分母是区域自身的宽高，而不是整幅图像的宽高。
pub fn remap(
  raw: &RawDetection,
  region: Region,
  class_name: &str,
  image_width: u32,
  image_height: u32,
) -> Detection {
  let region_w = region.width as f32;
  let region_h = region.height as f32;

  let x_pixel = raw.x_center * region_w;
  let y_pixel = raw.y_center * region_h;
  let w_pixel = raw.width * region_w;
  let h_pixel = raw.height * region_h;

  Detection {
    class_id: raw.class_id,
    class_name: class_name.to_string(),
    x_center: x_pixel + region.x as f32,
    y_center: y_pixel + region.y as f32,
    width: w_pixel,
    height: h_pixel,
    confidence: raw.confidence,
    image_width,
    image_height,
  }
}

/// 对单个区域推理并映射到全局坐标，模型错误附带区域信息向上传递
pub fn infer_region<M: Model>(
  model: &M,
  image: &RgbImage,
  region: Region,
  confidence: f32,
  slice_size: u32,
) -> Result<Vec<Detection>, TilingError> {
  let frame = ModelFrame::new(image, region);
  let output = model
    .infer(&frame, confidence, slice_size)
    .map_err(|e| {
      error!("区域 {} 推理失败: {}", region, e);
      TilingError::inference(region, e)
    })?;

  let (image_width, image_height) = image.dimensions();
  let detections: Vec<Detection> = output
    .iter()
    .map(|raw| {
      let name = model.class_name(raw.class_id).unwrap_or(UNKNOWN_CLASS);
      remap(raw, region, name, image_width, image_height)
    })
    .collect();

  debug!("区域 {} 检测到 {} 个物体", region, detections.len());
  Ok(detections)
}

/// 整幅图像一次推理，不切片也不做合并
pub fn infer_whole<M: Model, R: Report + ?Sized>(
  model: &M,
  image: &RgbImage,
  confidence: f32,
  target_size: u32,
  report: &R,
  image_id: &str,
) -> Result<DetectionSet, TilingError> {
  let (width, height) = image.dimensions();
  let detections = infer_region(model, image, Region::whole(width, height), confidence, target_size)?;
  report.report(&summarize(&detections, image_id));
  Ok(DetectionSet::from(detections))
}
