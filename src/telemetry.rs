// 该文件是 Linshao （林哨） 项目的一部分。
// src/telemetry.rs - 串口遥测链路
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::location::{LocationState, LocationStore};

/// 无数据时读取线程的轮询间隔
const POLL_INTERVAL_MS: u64 = 100;
/// 单次串口读取的超时
const READ_TIMEOUT_MS: u64 = 1_000;
/// 打开串口后等待单片机复位完成的时间
const SETTLE_DELAY_SECS: u64 = 2;

/// 解析一行遥测文本得到的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
  Coordinates { lat: String, lng: String },
  AcquiringSignal,
  RawMessage(String),
}

/// 解析单行遥测。残缺的 GPS 负载（缺逗号、两侧非数字）返回 None，
/// 由调用方告警后丢弃，读取循环绝不因此中断。
pub fn parse_telemetry_line(line: &str) -> Option<TelemetryEvent> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  if let Some(payload) = line.strip_prefix("GPS:") {
    if payload == "WAITING" {
      return Some(TelemetryEvent::AcquiringSignal);
    }
    let (lat, lng) = payload.split_once(',')?;
    let (lat, lng) = (lat.trim(), lng.trim());
    if lat.parse::<f64>().is_err() || lng.parse::<f64>().is_err() {
      return None;
    }
    return Some(TelemetryEvent::Coordinates {
      lat: lat.to_string(),
      lng: lng.to_string(),
    });
  }

  Some(TelemetryEvent::RawMessage(line.to_string()))
}

type SharedPort = Arc<Mutex<Box<dyn serialport::SerialPort>>>;

/// 硬件链路状态：启动时一次性决定，之后所有依赖方按该状态分支
#[derive(Clone)]
pub enum HardwareLinkState {
  Connected(SharedPort),
  Disconnected,
}

/// 串口遥测链路。读取线程与指令写入共用同一个句柄，
/// 句柄本身上锁串行化访问。
#[derive(Clone)]
pub struct TelemetryLink {
  state: HardwareLinkState,
}

impl TelemetryLink {
  /// 连接串口。任何失败都只记日志并降级到模拟模式，
  /// 绝不让检测/决策循环跟着失败。
  pub fn connect(port: &str, baud: u32) -> Self {
    match serialport::new(port, baud)
      .timeout(Duration::from_millis(READ_TIMEOUT_MS))
      .open()
    {
      Ok(handle) => {
        // 打开串口会复位 Arduino，等它跑完引导
        thread::sleep(Duration::from_secs(SETTLE_DELAY_SECS));
        info!("串口已连接: {} @ {}", port, baud);
        TelemetryLink {
          state: HardwareLinkState::Connected(Arc::new(Mutex::new(handle))),
        }
      }
      Err(e) => {
        warn!("串口 {} 连接失败，进入模拟模式: {}", port, e);
        TelemetryLink::disconnected()
      }
    }
  }

  /// 无硬件的模拟模式链路：所有操作均为空操作
  pub fn disconnected() -> Self {
    TelemetryLink {
      state: HardwareLinkState::Disconnected,
    }
  }

  pub fn is_connected(&self) -> bool {
    matches!(self.state, HardwareLinkState::Connected(_))
  }

  /// 发送单字节指令。断开时为空操作；写入错误只记日志，
  /// 不向决策周期传播。
  pub fn write(&self, byte: u8) {
    let HardwareLinkState::Connected(port) = &self.state else {
      return;
    };
    let mut port = port.lock().unwrap();
    if let Err(e) = port.write_all(&[byte]) {
      warn!("串口写入失败: {}", e);
    }
  }

  /// 启动后台读取线程，持续把 GPS 事件写入位置存储。
  /// 断开时不启动任何线程。线程随进程一起退出，无需取消。
  pub fn spawn_reader(&self, store: LocationStore) {
    let HardwareLinkState::Connected(port) = &self.state else {
      return;
    };
    let port = Arc::clone(port);
    thread::spawn(move || reader_loop(port, store));
  }
}

fn reader_loop(port: SharedPort, store: LocationStore) {
  let mut pending: Vec<u8> = Vec::new();
  let mut chunk = [0u8; 256];

  loop {
    // 锁的作用域只覆盖这一次探测+读取，写入方不会被长期挡住
    let read = {
      let mut port = port.lock().unwrap();
      match port.bytes_to_read() {
        Ok(0) => 0,
        Ok(_) => match port.read(&mut chunk) {
          Ok(n) => n,
          Err(e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
          Err(e) => {
            warn!("串口读取失败: {}", e);
            0
          }
        },
        Err(e) => {
          warn!("串口状态查询失败: {}", e);
          0
        }
      }
    };

    if read == 0 {
      thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
      continue;
    }

    pending.extend_from_slice(&chunk[..read]);
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
      let raw: Vec<u8> = pending.drain(..=pos).collect();
      let line = String::from_utf8_lossy(&raw);
      apply_line(line.trim(), &store);
    }
  }
}

/// 把一行遥测落到位置存储上；非 GPS 行只记日志
fn apply_line(line: &str, store: &LocationStore) {
  match parse_telemetry_line(line) {
    Some(TelemetryEvent::Coordinates { lat, lng }) => {
      info!("GPS 更新: {},{}", lat, lng);
      info!("  Google Maps: https://www.google.com/maps?q={},{}", lat, lng);
      store.set(LocationState::Known { lat, lng });
    }
    Some(TelemetryEvent::AcquiringSignal) => {
      info!("GPS 正在搜星...");
      store.set(LocationState::Acquiring);
    }
    Some(TelemetryEvent::RawMessage(text)) => {
      info!("Arduino: {}", text);
    }
    None => {
      if !line.is_empty() {
        warn!("丢弃残缺遥测行: {:?}", line);
      }
    }
  }
}
