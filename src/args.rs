// 该文件是 Linshao （林哨） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;

/// Linshao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测输入来源（JSON 行文件，"-" 表示标准输入）
  /// 每行一个 JSON 数组: [{"label":"tiger","bbox":[x1,y1,x2,y2]}, ...]
  #[arg(long, default_value = "-", value_name = "SOURCE")]
  pub feed: String,

  /// 串口设备路径（如 /dev/ttyUSB0 或 COM3）；缺省时直接进入模拟模式
  #[arg(long, value_name = "PORT")]
  pub port: Option<String>,

  /// 串口波特率
  #[arg(long, default_value = "9600", value_name = "BAUD")]
  pub baud: u32,

  /// 同一标签两次成功告警之间的最短间隔（秒）
  #[arg(long, default_value = "60", value_name = "SECONDS")]
  pub cooldown: i64,

  /// 危险等级映射表（JSON 文件，标签 → "LOW"/"MEDIUM"/"HIGH"）；
  /// 缺省时使用内置映射表
  #[arg(long, value_name = "FILE")]
  pub danger_map: Option<String>,

  /// 告警短信发送方号码
  #[arg(long, value_name = "PHONE")]
  pub sms_from: Option<String>,

  /// 告警短信接收方号码
  #[arg(long, value_name = "PHONE")]
  pub sms_to: Option<String>,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,
}
