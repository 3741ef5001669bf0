// 该文件是 Qiepian （切片） 项目的一部分。
// src/tiling.rs - 切片推理流水线
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

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  adapter::infer_region,
  detection::DetectionSet,
  error::TilingError,
  merge::{DEFAULT_IOU_THRESHOLD, MergeStrategy, merge_with},
  model::Model,
  region::slice,
  report::{Report, summarize},
};

pub const DEFAULT_SLICE_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// 切片推理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingConfig {
  /// 切片边长，步长为其一半
  pub slice_size: u32,
  /// 置信度阈值 (0.0 - 1.0)
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  pub iou_threshold: f32,
  /// 整图推理时的模型输入尺寸
  pub whole_image_size: u32,
  pub merge: MergeStrategy,
}

impl Default for TilingConfig {
  fn default() -> Self {
    Self {
      slice_size: DEFAULT_SLICE_SIZE,
      confidence: DEFAULT_CONFIDENCE,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      whole_image_size: DEFAULT_SLICE_SIZE,
      merge: MergeStrategy::Agnostic,
    }
  }
}

impl TilingConfig {
  pub fn with_slice_size(mut self, slice_size: u32) -> Self {
    self.slice_size = slice_size;
    self
  }

  pub fn with_confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn with_merge(mut self, merge: MergeStrategy) -> Self {
    self.merge = merge;
    self
  }

  pub fn validate(&self) -> Result<(), TilingError> {
    if self.slice_size < 2 {
      return Err(TilingError::invalid(format!(
        "切片大小必须不小于 2, 实际为 {}",
        self.slice_size
      )));
    }
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(TilingError::invalid(format!(
        "置信度阈值必须在 0 到 1 之间, 实际为 {}",
        self.confidence
      )));
    }
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(TilingError::invalid(format!(
        "IOU 阈值必须在 0 到 1 之间, 实际为 {}",
        self.iou_threshold
      )));
    }
    Ok(())
  }
}

/// 协作式取消标记，在每个切片开始前检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
  }
}

/// 切片推理：切分图像，逐个区域推理并映射回全局坐标，最后用 NMS 合并。
///
/// 汇报端收到切片数量，以及合并前全部检测结果的摘要。
/// 任一区域推理失败时整幅图像的推理中止并返回错误。
/// 收到取消信号时停止推理，返回已收集结果的合并，而不是错误。
pub fn slice_and_infer<M: Model, R: Report + ?Sized>(
  model: &M,
  image: &RgbImage,
  config: &TilingConfig,
  report: &R,
  image_id: &str,
  cancel: &CancelToken,
) -> Result<DetectionSet, TilingError> {
  config.validate()?;

  let (width, height) = image.dimensions();
  let regions = slice(width, height, config.slice_size)?;
  report.report(&format!("Number of slices: {}", regions.len()));

  let mut detections = Vec::new();
  for (index, region) in regions.iter().enumerate() {
    if cancel.is_cancelled() {
      warn!(
        "收到取消信号, 已处理 {}/{} 个切片",
        index,
        regions.len()
      );
      break;
    }

    debug!("处理第 {} 个切片 {}", index + 1, region);
    let found = infer_region(model, image, *region, config.confidence, config.slice_size)?;
    detections.extend(found);
  }

  // 汇报的是合并前各切片的检测结果
  report.report(&summarize(&detections, image_id));

  let total = detections.len();
  let merged = merge_with(detections, config.iou_threshold, config.merge);
  info!("{}: 合并前 {} 个, 合并后 {} 个", image_id, total, merged.len());

  Ok(DetectionSet::from(merged))
}
