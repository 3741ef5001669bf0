// 该文件是 Qiepian （切片） 项目的一部分。
// src/merge.rs - 跨切片的非极大值抑制
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

use tracing::debug;

use crate::detection::Detection;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;

/// 合并时哪些框之间会相互抑制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
  /// 不区分类别
  #[default]
  Agnostic,
  /// 仅同类别的框相互抑制
  PerClass,
}

/// 计算两个角点格式边界框的 IoU，并集为 0 时返回 0
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union == 0.0 {
    0.0
  } else {
    intersection / union
  }
}

/// 贪心非极大值抑制，不区分类别
pub fn merge(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  merge_with(detections, iou_threshold, MergeStrategy::Agnostic)
}

/// 贪心非极大值抑制。
///
/// 按置信度降序（相同置信度保持原有顺序）依次选出最高的框，
/// 剩余框只与本轮选出的框比较，IoU 不小于阈值的被丢弃。
/// 输出按选出顺序排列。
pub fn merge_with(
  mut detections: Vec<Detection>,
  iou_threshold: f32,
  strategy: MergeStrategy,
) -> Vec<Detection> {
  let total = detections.len();
  // sort_by 是稳定排序
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut result = Vec::new();

  while !detections.is_empty() {
    let best = detections.remove(0);
    let best_corners = best.corners();

    detections.retain(|det| {
      if strategy == MergeStrategy::PerClass && det.class_id != best.class_id {
        return true;
      }
      iou(&best_corners, &det.corners()) < iou_threshold
    });

    result.push(best);
  }

  debug!("NMS: {} -> {} 个检测结果", total, result.len());
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
    Detection {
      class_id,
      class_name: format!("class{}", class_id),
      x_center: (x1 + x2) / 2.0,
      y_center: (y1 + y2) / 2.0,
      width: x2 - x1,
      height: y2 - y1,
      confidence,
      image_width: 100,
      image_height: 100,
    }
  }

  #[test]
  fn iou_of_identical_and_disjoint_boxes() {
    let a = [0.0, 0.0, 10.0, 10.0];
    assert_eq!(iou(&a, &a), 1.0);
    assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    assert_eq!(iou(&a, &[0.0, 0.0, 10.0, 5.0]), 0.5);
  }

  #[test]
  fn zero_union_yields_zero() {
    let p = [5.0, 5.0, 5.0, 5.0];
    assert_eq!(iou(&p, &p), 0.0);

    let merged = merge(
      vec![det(0, 5.0, 5.0, 5.0, 5.0, 0.9), det(0, 5.0, 5.0, 5.0, 5.0, 0.8)],
      DEFAULT_IOU_THRESHOLD,
    );
    assert_eq!(merged.len(), 2);
  }

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(merge(Vec::new(), DEFAULT_IOU_THRESHOLD).is_empty());
  }

  #[test]
  fn keeps_highest_confidence_of_cluster() {
    let merged = merge(
      vec![
        det(0, 0.0, 0.0, 10.0, 10.0, 0.6),
        det(0, 1.0, 1.0, 11.0, 11.0, 0.9),
        det(0, 50.0, 50.0, 60.0, 60.0, 0.7),
      ],
      DEFAULT_IOU_THRESHOLD,
    );
    let confidences: Vec<f32> = merged.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.9, 0.7]);
  }

  #[test]
  fn iou_equal_to_threshold_is_suppressed() {
    // 3x1 boxes overlapping by 2: inter 2, union 4
    let a = det(0, 0.0, 0.0, 3.0, 1.0, 0.9);
    let b = det(0, 1.0, 0.0, 4.0, 1.0, 0.8);
    assert_eq!(iou(&a.corners(), &b.corners()), 0.5);

    let merged = merge(vec![a.clone(), b.clone()], 0.5);
    assert_eq!(merged, vec![a.clone()]);

    let merged = merge(vec![a, b], 0.51);
    assert_eq!(merged.len(), 2);
  }

  #[test]
  fn ties_keep_input_order() {
    let first = det(1, 0.0, 0.0, 10.0, 10.0, 0.5);
    let second = det(2, 0.0, 0.0, 10.0, 10.0, 0.5);
    let merged = merge(vec![first.clone(), second], DEFAULT_IOU_THRESHOLD);
    assert_eq!(merged, vec![first]);
  }

  #[test]
  fn suppressed_boxes_do_not_suppress_others() {
    // d overlaps only c, which a removes
    let a = det(0, 0.0, 0.0, 10.0, 10.0, 0.9);
    let c = det(0, 2.0, 0.0, 12.0, 10.0, 0.8);
    let d = det(0, 9.0, 0.0, 19.0, 10.0, 0.7);
    let merged = merge(vec![d.clone(), c, a.clone()], DEFAULT_IOU_THRESHOLD);
    assert_eq!(merged, vec![a, d]);
  }

  #[test]
  fn merge_is_idempotent() {
    let input = vec![
      det(0, 0.0, 0.0, 10.0, 10.0, 0.9),
      det(0, 4.0, 0.0, 14.0, 10.0, 0.85),
      det(0, 8.0, 0.0, 18.0, 10.0, 0.8),
      det(1, 30.0, 30.0, 40.0, 40.0, 0.4),
      det(1, 31.0, 31.0, 41.0, 41.0, 0.45),
    ];
    let once = merge(input, DEFAULT_IOU_THRESHOLD);
    let twice = merge(once.clone(), DEFAULT_IOU_THRESHOLD);
    assert_eq!(once, twice);
  }

  #[test]
  fn per_class_strategy_keeps_other_classes() {
    let person = det(0, 0.0, 0.0, 10.0, 10.0, 0.9);
    let bag = det(1, 0.0, 0.0, 10.0, 10.0, 0.8);

    let agnostic = merge_with(
      vec![person.clone(), bag.clone()],
      DEFAULT_IOU_THRESHOLD,
      MergeStrategy::Agnostic,
    );
    assert_eq!(agnostic.len(), 1);

    let per_class = merge_with(vec![person, bag], DEFAULT_IOU_THRESHOLD, MergeStrategy::PerClass);
    assert_eq!(per_class.len(), 2);
  }
}
