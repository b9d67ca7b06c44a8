// 该文件是 Linshao （林哨） 项目的一部分。
// src/cooldown.rs - 按标签的告警冷却登记
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// 记录每个标签最近一次成功告警的时间。
///
/// `try_acquire` 只做判定不做记录；记录由 `record_success` 单独完成，
/// 且只在被守护的动作（发送）确认成功之后调用。发送失败不消耗冷却窗口，
/// 否则一次失败就会把后续真正的高危告警压掉整整一个冷却期。
#[derive(Debug, Default)]
pub struct AlertCooldownRegistry {
  last_sent: HashMap<String, DateTime<Utc>>,
}

impl AlertCooldownRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// 该标签此刻是否允许告警：从未成功发送过，或距上次成功已满冷却时间
  pub fn try_acquire(&self, label: &str, now: DateTime<Utc>, cooldown: Duration) -> bool {
    match self.last_sent.get(label) {
      Some(last) => now.signed_duration_since(*last) >= cooldown,
      None => true,
    }
  }

  pub fn record_success(&mut self, label: &str, now: DateTime<Utc>) {
    self.last_sent.insert(label.to_string(), now);
  }

  /// 剩余冷却秒数，用于压制日志
  pub fn remaining_secs(&self, label: &str, now: DateTime<Utc>, cooldown: Duration) -> i64 {
    match self.last_sent.get(label) {
      Some(last) => (cooldown - now.signed_duration_since(*last))
        .num_seconds()
        .max(0),
      None => 0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
  }

  #[test]
  fn first_acquisition_is_granted() {
    let registry = AlertCooldownRegistry::new();
    assert!(registry.try_acquire("tiger", t0(), Duration::seconds(60)));
  }

  #[test]
  fn acquire_alone_does_not_consume_the_window() {
    let registry = AlertCooldownRegistry::new();
    assert!(registry.try_acquire("tiger", t0(), Duration::seconds(60)));
    // 没有 record_success，再次判定仍然放行
    assert!(registry.try_acquire("tiger", t0(), Duration::seconds(60)));
  }

  #[test]
  fn window_boundary() {
    let mut registry = AlertCooldownRegistry::new();
    let cooldown = Duration::seconds(60);

    assert!(registry.try_acquire("tiger", t0(), cooldown));
    registry.record_success("tiger", t0());

    assert!(!registry.try_acquire("tiger", t0() + Duration::seconds(59), cooldown));
    assert!(registry.try_acquire("tiger", t0() + Duration::seconds(60), cooldown));
    assert!(registry.try_acquire("tiger", t0() + Duration::seconds(61), cooldown));
  }

  #[test]
  fn labels_cool_down_independently() {
    let mut registry = AlertCooldownRegistry::new();
    let cooldown = Duration::seconds(60);

    registry.record_success("tiger", t0());
    assert!(!registry.try_acquire("tiger", t0() + Duration::seconds(10), cooldown));
    assert!(registry.try_acquire("lion", t0() + Duration::seconds(10), cooldown));
  }

  #[test]
  fn remaining_secs_counts_down_to_zero() {
    let mut registry = AlertCooldownRegistry::new();
    let cooldown = Duration::seconds(60);

    assert_eq!(registry.remaining_secs("tiger", t0(), cooldown), 0);
    registry.record_success("tiger", t0());
    assert_eq!(
      registry.remaining_secs("tiger", t0() + Duration::seconds(15), cooldown),
      45
    );
    assert_eq!(
      registry.remaining_secs("tiger", t0() + Duration::seconds(300), cooldown),
      0
    );
  }
}
