// 该文件是 Qiepian （切片） 项目的一部分。
// src/input.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error ({0}): {1}")]
  ImageLoadError(PathBuf, image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

/// 一幅已解码的输入图像
#[derive(Debug, Clone)]
pub struct ImageFrame {
  /// 用于汇报的图像标识（文件名）
  pub id: String,
  pub path: PathBuf,
  pub image: RgbImage,
}

impl ImageFrame {
  pub fn load(path: &Path) -> Result<Self, ImageFileInputError> {
    let image = ImageReader::open(path)?
      .decode()
      .map_err(|e| ImageFileInputError::ImageLoadError(path.to_path_buf(), e))?;

    let id = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());

    Ok(ImageFrame {
      id,
      path: path.to_path_buf(),
      image: image.into_rgb8(),
    })
  }
}

fn is_image_file(path: &Path) -> bool {
  path.is_file()
    && path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
      .unwrap_or(false)
}

/// 单个图像文件或一个目录下的全部图像文件（按文件名排序）
pub struct ImageFileInput {
  paths: std::vec::IntoIter<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(Path::new(url.path()))
  }
}

impl ImageFileInput {
  pub fn open(path: &Path) -> Result<Self, ImageFileInputError> {
    let paths = if path.is_dir() {
      let mut paths = Vec::new();
      for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if is_image_file(&entry_path) {
          paths.push(entry_path);
        }
      }
      paths.sort();
      debug!("目录 {} 中找到 {} 幅图像", path.display(), paths.len());
      paths
    } else {
      vec![path.to_path_buf()]
    };

    Ok(ImageFileInput {
      paths: paths.into_iter(),
    })
  }
}

impl ImageFileInput {
  /// 尚未读取的图像数量
  pub fn remaining(&self) -> usize {
    self.paths.len()
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<ImageFrame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.paths.next().map(|path| ImageFrame::load(&path))
  }
}
