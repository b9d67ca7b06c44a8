// 该文件是 Linshao （林哨） 项目的一部分。
// src/actuator.rs - 危险等级到硬件信号的翻译
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::danger::DangerLevel;
use crate::telemetry::TelemetryLink;

/// 把聚合后的危险等级翻译成单字节指令写到串口。
/// 自身无状态也无失败面，硬件异常统一由链路层消化。
pub struct ActuatorDriver {
  link: TelemetryLink,
}

impl ActuatorDriver {
  pub fn new(link: TelemetryLink) -> Self {
    ActuatorDriver { link }
  }

  /// 每个周期都要调用一次，LOW 也要下发
  pub fn emit(&self, level: DangerLevel) {
    self.link.write(level.signal_byte());
  }
}
