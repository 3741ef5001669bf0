// 该文件是 Qiepian （切片） 项目的一部分。
// src/output/record.rs - 检测结果文本记录
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionSet,
  input::ImageFrame,
  output::{OutputTarget, Render},
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每行一个检测结果: `名称, 置信度, 中心x, 中心y, 宽, 高`
pub struct RecordOutput {
  target: OutputTarget,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    Ok(RecordOutput {
      target: OutputTarget::from_url(uri),
    })
  }
}

impl RecordOutput {
  pub fn target(&self) -> &OutputTarget {
    &self.target
  }

  /// 默认与输入同名，扩展名为 txt
  pub fn output_path(&self, input: &Path) -> PathBuf {
    self.target.resolve(input, |input| input.with_extension("txt"))
  }

  pub fn format(result: &DetectionSet) -> String {
    let records: Vec<String> = result
      .iter()
      .map(|det| {
        format!(
          "{}, {:.4}, {:.2}, {:.2}, {:.2}, {:.2}",
          det.class_name, det.confidence, det.x_center, det.y_center, det.width, det.height
        )
      })
      .collect();
    records.join("\n")
  }
}

impl Render<ImageFrame, DetectionSet> for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectionSet) -> Result<(), Self::Error> {
    let path = self.output_path(&frame.path);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Self::format(result))?;
    info!("保存检测记录到文件: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::Detection;

  #[test]
  fn formats_one_line_per_detection() {
    let set = DetectionSet::from(vec![Detection {
      class_id: 1,
      class_name: "boat".to_string(),
      x_center: 10.0,
      y_center: 20.5,
      width: 4.0,
      height: 2.25,
      confidence: 0.875,
      image_width: 100,
      image_height: 100,
    }]);
    assert_eq!(RecordOutput::format(&set), "boat, 0.8750, 10.00, 20.50, 4.00, 2.25");
    assert_eq!(RecordOutput::format(&DetectionSet::default()), "");
  }

  #[test]
  fn writes_next_to_input_without_explicit_path() {
    let dir = std::env::temp_dir().join(format!("qiepian-record-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let frame = ImageFrame {
      id: "harbor.jpg".to_string(),
      path: dir.join("harbor.jpg"),
      image: image::RgbImage::new(4, 4),
    };

    let output = RecordOutput::from_url(&Url::parse("record:").unwrap()).unwrap();
    output.render_result(&frame, &DetectionSet::default()).unwrap();
    assert!(dir.join("harbor.txt").exists());

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn directory_target_writes_one_file_per_image() {
    let dir = std::env::temp_dir().join(format!("qiepian-record-dir-{}", std::process::id()));
    let out = dir.join("records");
    let url = Url::parse(&format!("record://{}/", out.display())).unwrap();
    let output = RecordOutput::from_url(&url).unwrap();

    for name in ["a.jpg", "b.jpg"] {
      let frame = ImageFrame {
        id: name.to_string(),
        path: dir.join("in").join(name),
        image: image::RgbImage::new(4, 4),
      };
      output.render_result(&frame, &DetectionSet::default()).unwrap();
    }
    assert!(out.join("a.txt").exists());
    assert!(out.join("b.txt").exists());

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
