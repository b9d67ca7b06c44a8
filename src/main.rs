// 该文件是 Linshao （林哨） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::fs::File;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use linshao::{
  actuator::ActuatorDriver,
  agent::{Agent, PatrolTask},
  danger::DangerMap,
  feed::DetectionFeed,
  location::LocationStore,
  notify::{NotificationDispatcher, SmsTransport, Transport},
  telemetry::TelemetryLink,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("Linshao 动物入侵告警代理");
  info!("========================");
  info!("检测输入: {}", args.feed);
  info!("冷却时间: {}s", args.cooldown);

  // 串口链路：没给端口或者打不开，都进模拟模式继续跑
  let link = match &args.port {
    Some(port) => TelemetryLink::connect(port, args.baud),
    None => {
      warn!("未指定串口，进入模拟模式");
      TelemetryLink::disconnected()
    }
  };

  // 位置存储由后台读取线程持续刷新
  let location = LocationStore::new();
  link.spawn_reader(location.clone());

  let danger_map = match &args.danger_map {
    Some(path) => {
      let file = File::open(path).with_context(|| format!("无法打开映射表 {}", path))?;
      DangerMap::from_json_reader(file).with_context(|| format!("无法解析映射表 {}", path))?
    }
    None => DangerMap::default(),
  };

  // 短信凭证走环境变量，号码走参数；缺任何一样都只写日志不发送
  let credentials = (
    std::env::var("TWILIO_ACCOUNT_SID"),
    std::env::var("TWILIO_AUTH_TOKEN"),
    args.sms_from.clone(),
    args.sms_to.clone(),
  );
  let (transport, sms_from, sms_to): (Option<Box<dyn Transport>>, String, String) =
    match credentials {
      (Ok(sid), Ok(token), Some(from), Some(to)) => {
        info!("短信通道已配置: {} -> {}", from, to);
        (Some(Box::new(SmsTransport::new(&sid, &token))), from, to)
      }
      _ => {
        warn!("短信凭证或号码未配置，告警只写日志");
        (None, String::new(), String::new())
      }
    };

  let dispatcher = NotificationDispatcher::new(transport, sms_from, sms_to, args.cooldown);

  let agent = Agent::new(
    danger_map,
    ActuatorDriver::new(link.clone()),
    dispatcher,
    location,
  );

  let feed =
    DetectionFeed::open(&args.feed).with_context(|| format!("无法打开检测输入 {}", args.feed))?;

  let frame_number = (args.max_frames > 0).then_some(args.max_frames as usize);
  PatrolTask::default()
    .with_frame_number(frame_number)
    .run(feed, agent)?;

  Ok(())
}
