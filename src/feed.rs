// 该文件是 Linshao （林哨） 项目的一部分。
// src/feed.rs - 外部检测器输出的回放输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use thiserror::Error;
use tracing::warn;

use crate::danger::Detection;

#[derive(Error, Debug)]
pub enum FeedError {
  #[error("I/O 错误: {0}")]
  Io(#[from] io::Error),
}

/// 检测批次输入：每行一个 JSON 数组，对应一帧。
/// 格式: [{"label":"tiger","bbox":[x1,y1,x2,y2]}, ...]
/// 解析不了的行记日志后跳过，输入中断即任务结束。
pub struct DetectionFeed {
  lines: Box<dyn Iterator<Item = io::Result<String>> + Send>,
}

impl DetectionFeed {
  /// "-" 表示从标准输入读取
  pub fn open(source: &str) -> Result<Self, FeedError> {
    if source == "-" {
      Ok(Self::from_reader(io::stdin()))
    } else {
      Ok(Self::from_reader(File::open(source)?))
    }
  }

  pub fn from_reader<R: io::Read + Send + 'static>(reader: R) -> Self {
    DetectionFeed {
      lines: Box::new(BufReader::new(reader).lines()),
    }
  }
}

impl Iterator for DetectionFeed {
  type Item = Vec<Detection>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(line) => line,
        Err(e) => {
          warn!("读取检测输入失败: {}", e);
          return None;
        }
      };
      if line.trim().is_empty() {
        continue;
      }
      match serde_json::from_str::<Vec<Detection>>(&line) {
        Ok(detections) => return Some(detections),
        Err(e) => {
          warn!("跳过无法解析的检测行: {}", e);
        }
      }
    }
  }
}
