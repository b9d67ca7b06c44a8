// 该文件是 Linshao （林哨） 项目的一部分。
// src/danger.rs - 危险等级映射与逐帧聚合
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// 危险等级，HIGH > MEDIUM > LOW
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DangerLevel {
  Low,
  Medium,
  High,
}

impl DangerLevel {
  /// 下发给单片机的单字节指令
  pub fn signal_byte(self) -> u8 {
    match self {
      DangerLevel::High => b'H',
      DangerLevel::Medium => b'M',
      DangerLevel::Low => b'L',
    }
  }
}

impl fmt::Display for DangerLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      DangerLevel::Low => "LOW",
      DangerLevel::Medium => "MEDIUM",
      DangerLevel::High => "HIGH",
    };
    write!(f, "{}", text)
  }
}

/// 检测器给出的单个目标
#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
  pub label: String,
  pub bbox: [i32; 4], // [x_min, y_min, x_max, y_max]
}

/// 一个周期的聚合结果；label 仅在 MEDIUM/HIGH 时有值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
  pub level: DangerLevel,
  pub label: Option<String>,
}

/// 标签到危险等级的映射表，未登记的标签一律视为 LOW
#[derive(Debug, Clone)]
pub struct DangerMap {
  map: HashMap<String, DangerLevel>,
}

impl Default for DangerMap {
  fn default() -> Self {
    let map = [
      ("dog", DangerLevel::Low),
      ("cat", DangerLevel::Low),
      ("cow", DangerLevel::Medium),
      ("horse", DangerLevel::Medium),
      ("elephant", DangerLevel::High),
      ("bear", DangerLevel::High),
      ("lion", DangerLevel::High),
      ("tiger", DangerLevel::High),
    ]
    .into_iter()
    .map(|(label, level)| (label.to_string(), level))
    .collect();

    DangerMap { map }
  }
}

impl DangerMap {
  /// 从 JSON 读入映射表（标签 → "LOW"/"MEDIUM"/"HIGH"）
  pub fn from_json_reader<R: std::io::Read>(reader: R) -> serde_json::Result<Self> {
    let map = serde_json::from_reader(reader)?;
    Ok(DangerMap { map })
  }

  pub fn lookup(&self, label: &str) -> DangerLevel {
    self.map.get(label).copied().unwrap_or(DangerLevel::Low)
  }

  /// 按到达顺序归并一帧的检测结果。
  ///
  /// 第一个 HIGH 一旦记录就不再被任何后续目标替换；
  /// MEDIUM 仅在当前等级尚未到 HIGH 时覆盖（后到的 MEDIUM 会换掉标签）；
  /// LOW 不产生代表标签。该顺序决定了告警里点名的是哪只动物。
  pub fn aggregate(&self, detections: &[Detection]) -> Aggregation {
    let mut level = DangerLevel::Low;
    let mut label = None;

    for detection in detections {
      match self.lookup(&detection.label) {
        DangerLevel::High if level != DangerLevel::High => {
          level = DangerLevel::High;
          label = Some(detection.label.clone());
        }
        DangerLevel::Medium if level != DangerLevel::High => {
          level = DangerLevel::Medium;
          label = Some(detection.label.clone());
        }
        _ => {}
      }
    }

    Aggregation { level, label }
  }
}
