// 该文件是 Qiepian （切片） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::FromUrl;
use crate::FromUrlWithScheme;
use crate::detection::DetectionSet;
use crate::input::ImageFrame;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

impl<Frame, Output, T: Render<Frame, Output>> Render<Frame, Output> for &T {
  type Error = T::Error;

  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error> {
    (**self).render_result(frame, result)
  }
}

/// 在输入路径的扩展名前插入 `_with_boxes`，没有扩展名时使用 jpg
pub fn with_boxes_path(input: &Path) -> PathBuf {
  let stem = input
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  let ext = input
    .extension()
    .map(|e| e.to_string_lossy().into_owned())
    .unwrap_or_else(|| "jpg".to_string());
  input.with_file_name(format!("{}_with_boxes.{}", stem, ext))
}

/// 输出写到哪里
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
  /// URL 路径为空，输出文件名由输入路径推导，写在输入旁边
  Beside,
  /// 单个文件，只适用于单幅输入
  File(PathBuf),
  /// 以 `/` 结尾的路径，每幅输入在该目录下各自生成一个文件
  Directory(PathBuf),
}

impl OutputTarget {
  pub fn from_url(url: &Url) -> Self {
    let path = url.path();
    if path.is_empty() {
      OutputTarget::Beside
    } else if path.ends_with('/') {
      OutputTarget::Directory(PathBuf::from(path))
    } else {
      OutputTarget::File(PathBuf::from(path))
    }
  }

  /// `derive` 给出输入旁边的默认输出路径，目录目标沿用其文件名
  pub fn resolve(&self, input: &Path, derive: impl FnOnce(&Path) -> PathBuf) -> PathBuf {
    match self {
      OutputTarget::Beside => derive(input),
      OutputTarget::File(path) => path.clone(),
      OutputTarget::Directory(dir) => match derive(input).file_name() {
        Some(name) => dir.join(name),
        None => dir.clone(),
      },
    }
  }

  /// 多幅输入共用一个输出文件时报错，避免相互覆盖
  pub fn check_batch(&self, images: usize) -> Result<(), OutputError> {
    match self {
      OutputTarget::File(path) if images > 1 => Err(OutputError::SharedOutputFile {
        path: path.clone(),
        images,
      }),
      _ => Ok(()),
    }
  }
}

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

mod record;
pub use self::record::{RecordOutput, RecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("检测记录输出错误: {0}")]
  RecordOutputError(#[from] RecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("{images} 幅图像不能写入同一个输出文件 {}, 请使用以 / 结尾的目录或空路径", .path.display())]
  SharedOutputFile { path: PathBuf, images: usize },
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  RecordOutput(RecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      RecordOutput::SCHEME => {
        let output = RecordOutput::from_url(url)?;
        Ok(OutputWrapper::RecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl OutputWrapper {
  pub fn target(&self) -> &OutputTarget {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output.target(),
      OutputWrapper::RecordOutput(output) => output.target(),
    }
  }

  /// 在处理任何图像之前检查输出目标能否容纳 `images` 幅图像的结果
  pub fn check_batch(&self, images: usize) -> Result<(), OutputError> {
    self.target().check_batch(images)
  }
}

impl Render<ImageFrame, DetectionSet> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectionSet) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::RecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn with_boxes_path_inserts_before_extension() {
    assert_eq!(
      with_boxes_path(Path::new("/data/street.png")),
      PathBuf::from("/data/street_with_boxes.png")
    );
    assert_eq!(
      with_boxes_path(Path::new("scan")),
      PathBuf::from("scan_with_boxes.jpg")
    );
  }

  #[test]
  fn target_follows_url_path_shape() {
    let target = |s: &str| OutputTarget::from_url(&Url::parse(s).unwrap());
    assert_eq!(target("record:"), OutputTarget::Beside);
    assert_eq!(target("record:///out/a.txt"), OutputTarget::File(PathBuf::from("/out/a.txt")));
    assert_eq!(target("record:///out/"), OutputTarget::Directory(PathBuf::from("/out/")));
  }

  #[test]
  fn directory_target_keeps_per_image_names() {
    let dir = OutputTarget::Directory(PathBuf::from("/out/"));
    assert_eq!(
      dir.resolve(Path::new("/in/a.png"), with_boxes_path),
      PathBuf::from("/out/a_with_boxes.png")
    );
    assert_eq!(
      dir.resolve(Path::new("/in/b.png"), with_boxes_path),
      PathBuf::from("/out/b_with_boxes.png")
    );
  }

  #[test]
  fn single_file_target_rejects_batches() {
    let url = Url::parse("record:///out/all.txt").unwrap();
    let output = OutputWrapper::from_url(&url).unwrap();
    assert!(output.check_batch(1).is_ok());
    assert!(matches!(
      output.check_batch(3),
      Err(OutputError::SharedOutputFile { images: 3, .. })
    ));

    let url = Url::parse("record:///out/").unwrap();
    assert!(OutputWrapper::from_url(&url).unwrap().check_batch(3).is_ok());
    let url = Url::parse("record:").unwrap();
    assert!(OutputWrapper::from_url(&url).unwrap().check_batch(3).is_ok());
  }

  #[test]
  fn wrapper_dispatches_on_scheme() {
    let url = Url::parse("record:///tmp/out.txt").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Ok(OutputWrapper::RecordOutput(_))
    ));

    let url = Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch)
    ));
  }
}
