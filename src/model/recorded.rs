// 该文件是 Qiepian （切片） 项目的一部分。
// src/model/recorded.rs - 回放已记录的模型输出
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

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Model, ModelFrame, ModelOutput, RawDetection},
  region::Region,
};

#[derive(Error, Debug)]
pub enum RecordedModelError {
  #[error("记录文件读取错误: {0}")]
  IoError(std::io::Error),
  #[error("记录文件解析错误: {0}")]
  JsonError(serde_json::Error),
  #[error("模型路径错误: {0}")]
  SchemeMismatch(String),
  #[error("区域 {0} 没有记录")]
  UnknownRegion(Region),
}

impl From<std::io::Error> for RecordedModelError {
  fn from(err: std::io::Error) -> Self {
    RecordedModelError::IoError(err)
  }
}

impl From<serde_json::Error> for RecordedModelError {
  fn from(err: serde_json::Error) -> Self {
    RecordedModelError::JsonError(err)
  }
}

#[derive(Debug, Deserialize)]
struct RecordedRegion {
  x: u32,
  y: u32,
  width: u32,
  height: u32,
  #[serde(default)]
  detections: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct RecordFile {
  names: HashMap<u32, String>,
  #[serde(default)]
  regions: Vec<RecordedRegion>,
}

/// 按区域回放事先记录的检测输出，用于离线后处理
#[derive(Debug, Clone, Default)]
pub struct RecordedModel {
  names: HashMap<u32, String>,
  regions: HashMap<Region, Box<[RawDetection]>>,
  strict: bool,
}

impl RecordedModel {
  pub fn new(names: HashMap<u32, String>) -> Self {
    Self {
      names,
      regions: HashMap::new(),
      strict: false,
    }
  }

  /// 未记录的区域是否视为错误
  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }

  pub fn with_region(mut self, region: Region, detections: Vec<RawDetection>) -> Self {
    self.regions.insert(region, detections.into_boxed_slice());
    self
  }

  pub fn from_json(json: &str) -> Result<Self, RecordedModelError> {
    let file: RecordFile = serde_json::from_str(json)?;
    let mut model = RecordedModel::new(file.names);
    for r in file.regions {
      model = model.with_region(Region::new(r.x, r.y, r.width, r.height), r.detections);
    }
    Ok(model)
  }
}

impl Model for RecordedModel {
  type Error = RecordedModelError;

  fn infer(
    &self,
    frame: &ModelFrame<'_>,
    confidence: f32,
    _target_size: u32,
  ) -> Result<ModelOutput, Self::Error> {
    let Some(items) = self.regions.get(&frame.region) else {
      if self.strict {
        return Err(RecordedModelError::UnknownRegion(frame.region));
      }
      debug!("区域 {} 没有记录, 视为无检测结果", frame.region);
      return Ok(ModelOutput::empty());
    };

    let items: Vec<RawDetection> = items
      .iter()
      .filter(|item| item.confidence >= confidence)
      .copied()
      .collect();
    debug!("区域 {} 回放 {} 个检测结果", frame.region, items.len());

    Ok(ModelOutput::from(items))
  }

  fn class_name(&self, class_id: u32) -> Option<&str> {
    self.names.get(&class_id).map(String::as_str)
  }
}

pub struct RecordedModelBuilder {
  path: String,
  strict: bool,
}

impl FromUrlWithScheme for RecordedModelBuilder {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for RecordedModelBuilder {
  type Error = RecordedModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordedModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let strict = url.query_pairs().any(|(k, _)| k == "strict");

    Ok(RecordedModelBuilder {
      path: url.path().to_string(),
      strict,
    })
  }
}

impl RecordedModelBuilder {
  pub fn build(self) -> Result<RecordedModel, RecordedModelError> {
    info!("加载记录文件: {}", self.path);
    let data = std::fs::read_to_string(&self.path)?;
    debug!("记录文件大小: {:.2} KB", data.len() as f64 / 1024.0);

    let model = RecordedModel::from_json(&data)?.strict(self.strict);
    info!(
      "记录加载完成: {} 个类别, {} 个区域",
      model.names.len(),
      model.regions.len()
    );
    Ok(model)
  }
}
