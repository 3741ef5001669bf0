// 该文件是 Qiepian （切片） 项目的一部分。
// src/output/save_image_file.rs - 保存标注后的图像文件
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
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionSet,
  input::ImageFrame,
  output::{
    Render,
    draw::{Draw, DrawError},
    OutputTarget, with_boxes_path,
  },
};

pub struct SaveImageFileOutput {
  target: OutputTarget,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let font = uri
      .query_pairs()
      .find(|(k, _)| k == "font")
      .map(|(_, v)| PathBuf::from(v.into_owned()));
    let draw = match font {
      Some(font) => Draw::with_font_file(&font)?,
      None => Draw::default(),
    };

    Ok(SaveImageFileOutput {
      target: OutputTarget::from_url(uri),
      draw,
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(target: OutputTarget, draw: Draw) -> Self {
    Self { target, draw }
  }

  pub fn target(&self) -> &OutputTarget {
    &self.target
  }

  /// 显式给出的文件优先，否则由输入路径推导 `_with_boxes` 文件名
  pub fn output_path(&self, input: &Path) -> PathBuf {
    self.target.resolve(input, with_boxes_path)
  }

  fn save_image(&self, image: image::RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image.save(path).map_err(SaveImageFileError::ImageError)?;

    warn!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<ImageFrame, DetectionSet> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectionSet) -> Result<(), Self::Error> {
    let image = self.draw.draw_on_copy(&frame.image, result);
    self.save_image(image, &self.output_path(&frame.path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::Detection;

  #[test]
  fn derives_output_path_unless_given() {
    let derived = SaveImageFileOutput::from_url(&Url::parse("image:").unwrap()).unwrap();
    assert_eq!(
      derived.output_path(Path::new("/in/a.png")),
      PathBuf::from("/in/a_with_boxes.png")
    );

    let explicit = SaveImageFileOutput::from_url(&Url::parse("image:///out/b.png").unwrap()).unwrap();
    assert_eq!(explicit.output_path(Path::new("/in/a.png")), PathBuf::from("/out/b.png"));

    let directory = SaveImageFileOutput::from_url(&Url::parse("image:///out/").unwrap()).unwrap();
    assert_eq!(
      directory.output_path(Path::new("/in/a.png")),
      PathBuf::from("/out/a_with_boxes.png")
    );
    assert_eq!(
      directory.output_path(Path::new("/in/c.jpg")),
      PathBuf::from("/out/c_with_boxes.jpg")
    );
  }

  #[test]
  fn saves_annotated_copy() {
    let dir = std::env::temp_dir().join(format!("qiepian-save-{}", std::process::id()));
    let out = dir.join("nested").join("result.png");
    let output = SaveImageFileOutput::new(OutputTarget::File(out.clone()), Draw::default());
    let frame = ImageFrame {
      id: "src.png".to_string(),
      path: dir.join("src.png"),
      image: image::RgbImage::new(32, 32),
    };
    let result = DetectionSet::from(vec![Detection {
      class_id: 0,
      class_name: "buoy".to_string(),
      x_center: 16.0,
      y_center: 16.0,
      width: 8.0,
      height: 8.0,
      confidence: 0.6,
      image_width: 32,
      image_height: 32,
    }]);

    output.render_result(&frame, &result).unwrap();
    let saved = image::open(&out).unwrap().into_rgb8();
    assert_eq!(*saved.get_pixel(12, 16), image::Rgb([0, 255, 0]));

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn rejects_other_schemes() {
    assert!(matches!(
      SaveImageFileOutput::from_url(&Url::parse("folder:///tmp").unwrap()),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
