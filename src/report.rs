// 该文件是 Qiepian （切片） 项目的一部分。
// src/report.rs - 检测结果汇报
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

use tracing::info;

use crate::detection::Detection;

/// 接收一行格式化消息的汇报端
pub trait Report {
  fn report(&self, message: &str);
}

impl<F: Fn(&str)> Report for F {
  fn report(&self, message: &str) {
    self(message)
  }
}

/// 通过 tracing 输出汇报消息
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReport;

impl Report for TracingReport {
  fn report(&self, message: &str) {
    info!("{}", message);
  }
}

/// 生成检测结果摘要，类别按首次出现的顺序排列，数量大于 1 时加 "s"
pub fn summarize<'a, I>(detections: I, image_id: &str) -> String
where
  I: IntoIterator<Item = &'a Detection>,
{
  let mut counts: Vec<(&str, usize)> = Vec::new();
  for det in detections {
    match counts.iter_mut().find(|(name, _)| *name == det.class_name) {
      Some((_, count)) => *count += 1,
      None => counts.push((det.class_name.as_str(), 1)),
    }
  }

  if counts.is_empty() {
    return format!("No Results for image {}", image_id);
  }

  let mut message = format!("Results for {}:", image_id);
  for (name, count) in counts {
    let plural = if count > 1 { "s" } else { "" };
    message.push_str(&format!(" {} {}{}", count, name, plural));
  }
  message
}
