// 该文件是 Qiepian （切片） 项目的一部分。
// src/error.rs - 切片推理错误定义
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

use thiserror::Error;

use crate::region::Region;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum TilingError {
  #[error("参数无效: {0}")]
  InvalidArgument(String),
  #[error("模型推理失败, 区域 {region}: {source}")]
  ModelInference {
    region: Region,
    #[source]
    source: BoxError,
  },
}

impl TilingError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    TilingError::InvalidArgument(msg.into())
  }

  pub fn inference<E>(region: Region, err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    TilingError::ModelInference {
      region,
      source: Box::new(err),
    }
  }

  /// 出错区域（仅推理错误）
  pub fn region(&self) -> Option<Region> {
    match self {
      TilingError::ModelInference { region, .. } => Some(*region),
      TilingError::InvalidArgument(_) => None,
    }
  }
}
