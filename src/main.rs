// 该文件是 Qiepian （切片） 项目的一部分。
// src/main.rs - 切片推理命令行程序
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

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use qiepian::{
  FromUrl,
  input::ImageFileInput,
  merge::MergeStrategy,
  model::RecordedModelBuilder,
  output::OutputWrapper,
  task::{Task, TiledTask, WholeImageTask},
  tiling::{CancelToken, TilingConfig},
};

/// Qiepian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源，如 replay:///path/record.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源（图片文件或目录），如 image:///path/a.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，如 image: （在输入旁生成 *_with_boxes）、image:///out.jpg、record:///out.txt
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 切片大小（像素）
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub slice_size: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 整图推理，不切片
  #[arg(long)]
  pub whole: bool,

  /// 仅同类别的检测框相互抑制
  #[arg(long)]
  pub class_aware: bool,
}

impl Args {
  fn config(&self) -> TilingConfig {
    let merge = if self.class_aware {
      MergeStrategy::PerClass
    } else {
      MergeStrategy::Agnostic
    };
    TilingConfig::default()
      .with_slice_size(self.slice_size)
      .with_confidence(self.confidence)
      .with_iou_threshold(self.iou_threshold)
      .with_merge(merge)
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入来源: {}", args.input);
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }

  let config = args.config();
  config.validate()?;

  let input = ImageFileInput::from_url(&args.input)?;
  let model = RecordedModelBuilder::from_url(&args.model)?.build()?;
  let output = args
    .output
    .as_ref()
    .map(OutputWrapper::from_url)
    .transpose()?;
  if let Some(output) = &output {
    output.check_batch(input.remaining())?;
  }

  let stats = if args.whole {
    WholeImageTask::new(config).run_task(input, model, output)?
  } else {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
      warn!("收到中断信号，处理完当前切片后退出...");
      handler_token.cancel();
    })?;

    TiledTask::new(config)
      .with_cancel(cancel)
      .run_task(input, model, output)?
  };

  info!(
    "处理完成! 图像数: {}, 跳过: {}, 检测数: {}",
    stats.images, stats.skipped, stats.detections
  );

  Ok(())
}
