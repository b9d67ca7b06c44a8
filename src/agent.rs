// 该文件是 Linshao （林哨） 项目的一部分。
// src/agent.rs - 决策周期与巡逻任务
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{thread, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::actuator::ActuatorDriver;
use crate::danger::{Aggregation, DangerLevel, DangerMap, Detection};
use crate::location::LocationStore;
use crate::notify::{DispatchOutcome, NotificationDispatcher};

/// 单个决策周期的结果，供日志与测试检视
#[derive(Debug)]
pub struct CycleOutcome {
  pub aggregation: Aggregation,
  pub dispatch: Option<DispatchOutcome>,
}

/// 决策代理：每帧执行 聚合 → 驱动执行器 → 视情告警。
/// 周期自身不持有别的可变状态，位置只在告警时读一次快照。
pub struct Agent {
  danger_map: DangerMap,
  actuator: ActuatorDriver,
  dispatcher: NotificationDispatcher,
  location: LocationStore,
}

impl Agent {
  pub fn new(
    danger_map: DangerMap,
    actuator: ActuatorDriver,
    dispatcher: NotificationDispatcher,
    location: LocationStore,
  ) -> Self {
    Agent {
      danger_map,
      actuator,
      dispatcher,
      location,
    }
  }

  /// 处理一帧检测结果。执行器每个周期都驱动一次；
  /// 只有 HIGH 且有代表标签时才走告警分发。
  pub fn run_cycle(&mut self, detections: &[Detection]) -> CycleOutcome {
    let aggregation = self.danger_map.aggregate(detections);

    self.actuator.emit(aggregation.level);

    let dispatch = match (aggregation.level, &aggregation.label) {
      (DangerLevel::High, Some(label)) => {
        let location = self.location.get();
        Some(
          self
            .dispatcher
            .maybe_alert(label, aggregation.level, &location, Utc::now()),
        )
      }
      _ => None,
    };

    CycleOutcome {
      aggregation,
      dispatch,
    }
  }
}

/// 巡逻任务：从检测批次迭代器逐帧驱动决策代理，
/// 支持 Ctrl-C 中断与最大帧数限制。
#[derive(Default, Debug)]
pub struct PatrolTask {
  frame_number: Option<usize>,
}

impl PatrolTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn run<I>(self, input: I, mut agent: Agent) -> Result<()>
  where
    I: IntoIterator<Item = Vec<Detection>>,
  {
    info!("开始巡逻任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .expect("Error setting Ctrl-C handler");

    let mut frame_index = 0;
    for detections in input {
      frame_index = (frame_index + 1) % usize::MAX;
      let outcome = agent.run_cycle(&detections);
      info!(
        "第 {} 帧: {} 个目标，危险等级 {}",
        frame_index,
        detections.len(),
        outcome.aggregation.level
      );
      match &outcome.dispatch {
        Some(DispatchOutcome::Sent { sid }) => info!("告警已发出: {}", sid),
        Some(DispatchOutcome::Suppressed { remaining_secs }) => {
          info!("告警被冷却压制，剩余 {}s", remaining_secs)
        }
        Some(DispatchOutcome::Failed(e)) => warn!("告警发送失败: {}", e),
        None => {}
      }
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}
