// 该文件是 Qiepian （切片） 项目的一部分。
// src/task.rs - 推理任务
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

use tracing::{info, warn};

use crate::{
  adapter::infer_whole,
  detection::DetectionSet,
  input::ImageFrame,
  model::Model,
  output::Render,
  report::{Report, TracingReport},
  tiling::{CancelToken, TilingConfig, slice_and_infer},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: Option<O>) -> Result<TaskStats, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
  /// 完成推理的图像数
  pub images: usize,
  /// 跳过的（无法读取的）图像数
  pub skipped: usize,
  /// 合并后的检测总数
  pub detections: usize,
}

/// 输出失败只记录警告，不影响已得到的检测结果
fn render_best_effort<O, E>(output: Option<&O>, frame: &ImageFrame, result: &DetectionSet)
where
  O: Render<ImageFrame, DetectionSet, Error = E>,
  E: std::fmt::Display,
{
  if let Some(output) = output
    && let Err(e) = output.render_result(frame, result)
  {
    warn!("图像 {} 输出失败: {}", frame.id, e);
  }
}

/// 切片推理任务，任一图像推理失败时中止整个批次
pub struct TiledTask<R = TracingReport> {
  config: TilingConfig,
  cancel: CancelToken,
  report: R,
}

impl TiledTask {
  pub fn new(config: TilingConfig) -> Self {
    Self {
      config,
      cancel: CancelToken::new(),
      report: TracingReport,
    }
  }
}

impl<R> TiledTask<R> {
  pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn with_report<S: Report>(self, report: S) -> TiledTask<S> {
    TiledTask {
      config: self.config,
      cancel: self.cancel,
      report,
    }
  }
}

impl<I, E, M, O, R> Task<I, M, O> for TiledTask<R>
where
  I: Iterator<Item = Result<ImageFrame, E>>,
  E: std::fmt::Display,
  M: Model,
  O: Render<ImageFrame, DetectionSet>,
  O::Error: std::fmt::Display,
  R: Report,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: Option<O>) -> Result<TaskStats, Self::Error> {
    info!("开始切片推理任务...");
    self.config.validate()?;

    let mut stats = TaskStats::default();
    for frame in input {
      if self.cancel.is_cancelled() {
        warn!("收到取消信号，退出任务循环");
        break;
      }

      let frame = match frame {
        Ok(frame) => frame,
        Err(e) => {
          warn!("跳过无法读取的图像: {}", e);
          stats.skipped += 1;
          continue;
        }
      };

      let now = std::time::Instant::now();
      let result = slice_and_infer(
        &model,
        &frame.image,
        &self.config,
        &self.report,
        &frame.id,
        &self.cancel,
      )?;
      info!("{} 推理完成，耗时: {:.2?}", frame.id, now.elapsed());

      render_best_effort(output.as_ref(), &frame, &result);
      stats.images += 1;
      stats.detections += result.len();
    }

    info!("任务完成，共处理 {} 幅图像", stats.images);
    Ok(stats)
  }
}

/// 整图推理任务，不切片也不合并
pub struct WholeImageTask<R = TracingReport> {
  config: TilingConfig,
  report: R,
}

impl WholeImageTask {
  pub fn new(config: TilingConfig) -> Self {
    Self {
      config,
      report: TracingReport,
    }
  }
}

impl<R> WholeImageTask<R> {
  pub fn with_report<S: Report>(self, report: S) -> WholeImageTask<S> {
    WholeImageTask {
      config: self.config,
      report,
    }
  }
}

impl<I, E, M, O, R> Task<I, M, O> for WholeImageTask<R>
where
  I: Iterator<Item = Result<ImageFrame, E>>,
  E: std::fmt::Display,
  M: Model,
  O: Render<ImageFrame, DetectionSet>,
  O::Error: std::fmt::Display,
  R: Report,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: Option<O>) -> Result<TaskStats, Self::Error> {
    info!("开始整图推理任务...");
    self.config.validate()?;

    let mut stats = TaskStats::default();
    for frame in input {
      let frame = match frame {
        Ok(frame) => frame,
        Err(e) => {
          warn!("跳过无法读取的图像: {}", e);
          stats.skipped += 1;
          continue;
        }
      };

      let now = std::time::Instant::now();
      let result = infer_whole(
        &model,
        &frame.image,
        self.config.confidence,
        self.config.whole_image_size,
        &self.report,
        &frame.id,
      )?;
      info!("{} 推理完成，耗时: {:.2?}", frame.id, now.elapsed());

      render_best_effort(output.as_ref(), &frame, &result);
      stats.images += 1;
      stats.detections += result.len();
    }

    info!("任务完成，共处理 {} 幅图像", stats.images);
    Ok(stats)
  }
}
