// 该文件是 Qiepian （切片） 项目的一部分。
// src/model.rs - 检测模型接口
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

use image::{RgbImage, SubImage};
use serde::Deserialize;

use crate::region::Region;

/// 送入模型的一帧：原图上的某个区域
pub struct ModelFrame<'a> {
  pub region: Region,
  pub view: SubImage<&'a RgbImage>,
}

impl<'a> ModelFrame<'a> {
  pub fn new(image: &'a RgbImage, region: Region) -> Self {
    let view = image::imageops::crop_imm(image, region.x, region.y, region.width, region.height);
    Self { region, view }
  }
}

/// 模型原始输出，坐标按所在区域的宽高归一化，中心点格式
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawDetection {
  pub class_id: u32,
  pub x_center: f32,
  pub y_center: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
  /// 没有检测结果时可能为 None
  pub items: Option<Box<[RawDetection]>>,
}

impl ModelOutput {
  pub fn empty() -> Self {
    Self { items: None }
  }

  pub fn iter(&self) -> impl Iterator<Item = &RawDetection> {
    self.items.iter().flat_map(|items| items.iter())
  }

  pub fn len(&self) -> usize {
    self.items.as_ref().map_or(0, |items| items.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl From<Vec<RawDetection>> for ModelOutput {
  fn from(items: Vec<RawDetection>) -> Self {
    Self {
      items: Some(items.into_boxed_slice()),
    }
  }
}

pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 对一个区域执行推理，`target_size` 为模型输入尺寸
  fn infer(
    &self,
    frame: &ModelFrame<'_>,
    confidence: f32,
    target_size: u32,
  ) -> Result<ModelOutput, Self::Error>;

  fn class_name(&self, class_id: u32) -> Option<&str>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn infer(
    &self,
    frame: &ModelFrame<'_>,
    confidence: f32,
    target_size: u32,
  ) -> Result<ModelOutput, Self::Error> {
    (**self).infer(frame, confidence, target_size)
  }

  fn class_name(&self, class_id: u32) -> Option<&str> {
    (**self).class_name(class_id)
  }
}

mod recorded;
pub use self::recorded::{RecordedModel, RecordedModelBuilder, RecordedModelError};
