// 该文件是 Linshao （林哨） 项目的一部分。
// src/location.rs - 共享位置快照存储
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;
use std::sync::{Arc, Mutex};

/// 最近一次已知位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationState {
  Pending,
  Acquiring,
  Known { lat: String, lng: String },
}

impl LocationState {
  /// 已定位时给出地图链接，否则为 None
  pub fn maps_url(&self) -> Option<String> {
    match self {
      LocationState::Known { lat, lng } => Some(format!(
        "https://www.google.com/maps?q={},{}",
        urlencoding::encode(lat),
        urlencoding::encode(lng)
      )),
      _ => None,
    }
  }
}

impl fmt::Display for LocationState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LocationState::Pending => write!(f, "Location pending..."),
      LocationState::Acquiring => write!(f, "GPS acquiring signal..."),
      LocationState::Known { lat, lng } => write!(f, "{},{}", lat, lng),
    }
  }
}

/// 位置存储：遥测读取线程写入，决策周期随时读取。
/// 整个状态在一把锁下整体替换，读方拿到的永远是完整快照，
/// 不会出现新纬度配旧经度。
#[derive(Debug, Clone)]
pub struct LocationStore {
  inner: Arc<Mutex<LocationState>>,
}

impl Default for LocationStore {
  fn default() -> Self {
    Self::new()
  }
}

impl LocationStore {
  pub fn new() -> Self {
    LocationStore {
      inner: Arc::new(Mutex::new(LocationState::Pending)),
    }
  }

  pub fn set(&self, state: LocationState) {
    *self.inner.lock().unwrap() = state;
  }

  pub fn get(&self) -> LocationState {
    self.inner.lock().unwrap().clone()
  }
}
