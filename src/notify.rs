// 该文件是 Linshao （林哨） 项目的一部分。
// src/notify.rs - 外部通知通道与告警分发
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration as StdDuration;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::cooldown::AlertCooldownRegistry;
use crate::danger::DangerLevel;
use crate::location::LocationState;

/// 通知通道调用的超时上限，绝不允许拖住决策周期
const TRANSPORT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("通知通道未配置")]
  Unconfigured,
  #[error("请求失败: {0}")]
  Http(String),
  #[error("服务端拒绝 ({status}): {body}")]
  Rejected { status: u16, body: String },
}

/// 外部通知通道。只约定调用契约：给出收发双方与正文，
/// 成功返回服务商的消息标识，内部协议不在本层关心范围内。
pub trait Transport {
  fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TransportError>;
}

/// Twilio 风格的短信 REST 通道
pub struct SmsTransport {
  agent: ureq::Agent,
  endpoint: String,
  auth_header: String,
}

impl SmsTransport {
  pub fn new(account_sid: &str, auth_token: &str) -> Self {
    let agent = ureq::AgentBuilder::new()
      .timeout(StdDuration::from_secs(TRANSPORT_TIMEOUT_SECS))
      .build();
    let endpoint = format!(
      "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
      account_sid
    );
    let credentials = base64::engine::general_purpose::STANDARD
      .encode(format!("{}:{}", account_sid, auth_token));

    SmsTransport {
      agent,
      endpoint,
      auth_header: format!("Basic {}", credentials),
    }
  }
}

impl Transport for SmsTransport {
  fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TransportError> {
    let form = format!(
      "From={}&To={}&Body={}",
      urlencoding::encode(from),
      urlencoding::encode(to),
      urlencoding::encode(body)
    );

    let response = self
      .agent
      .post(&self.endpoint)
      .set("Authorization", &self.auth_header)
      .set("Content-Type", "application/x-www-form-urlencoded")
      .send_string(&form);

    match response {
      Ok(resp) => {
        let text = resp
          .into_string()
          .map_err(|e| TransportError::Http(e.to_string()))?;
        // 回执里带消息 sid，取不到也不算失败
        let sid = serde_json::from_str::<serde_json::Value>(&text)
          .ok()
          .and_then(|v| v.get("sid").and_then(|s| s.as_str()).map(str::to_string))
          .unwrap_or_default();
        Ok(sid)
      }
      Err(ureq::Error::Status(status, resp)) => Err(TransportError::Rejected {
        status,
        body: resp.into_string().unwrap_or_default(),
      }),
      Err(e) => Err(TransportError::Http(e.to_string())),
    }
  }
}

/// 一次告警分发的结局
#[derive(Debug)]
pub enum DispatchOutcome {
  Sent { sid: String },
  Suppressed { remaining_secs: i64 },
  Failed(TransportError),
}

/// 告警分发器：先问冷却登记，再发正式通知，
/// 只有发送确认成功才记入冷却。
pub struct NotificationDispatcher {
  transport: Option<Box<dyn Transport>>,
  from: String,
  to: String,
  cooldown: Duration,
  registry: AlertCooldownRegistry,
}

impl NotificationDispatcher {
  pub fn new(
    transport: Option<Box<dyn Transport>>,
    from: String,
    to: String,
    cooldown_secs: i64,
  ) -> Self {
    NotificationDispatcher {
      transport,
      from,
      to,
      cooldown: Duration::seconds(cooldown_secs),
      registry: AlertCooldownRegistry::new(),
    }
  }

  /// 仅在 HIGH 且存在代表标签时由决策周期调用。
  /// 失败（含通道未配置）不消耗冷却窗口，下个周期可以立即重试。
  pub fn maybe_alert(
    &mut self,
    label: &str,
    level: DangerLevel,
    location: &LocationState,
    now: DateTime<Utc>,
  ) -> DispatchOutcome {
    if !self.registry.try_acquire(label, now, self.cooldown) {
      let remaining_secs = self.registry.remaining_secs(label, now, self.cooldown);
      info!("{} 告警仍在冷却中（剩余 {}s）", label, remaining_secs);
      return DispatchOutcome::Suppressed { remaining_secs };
    }

    let body = format_alert(label, level, location, now);

    let Some(transport) = &self.transport else {
      warn!("通知通道未配置，本次告警未发送");
      return DispatchOutcome::Failed(TransportError::Unconfigured);
    };

    match transport.send(&self.from, &self.to, &body) {
      Ok(sid) => {
        self.registry.record_success(label, now);
        info!("短信告警已发送: {}", sid);
        DispatchOutcome::Sent { sid }
      }
      Err(e) => {
        warn!("短信发送失败: {}", e);
        DispatchOutcome::Failed(e)
      }
    }
  }
}

/// 拼装告警正文：等级、动物名（大写）、位置引用与时间戳
fn format_alert(
  label: &str,
  level: DangerLevel,
  location: &LocationState,
  now: DateTime<Utc>,
) -> String {
  let location_line = match location.maps_url() {
    Some(url) => format!("Location: {}", url),
    None => format!("Location: {}", location),
  };

  format!(
    "ANIMAL ALERT!\n\nDanger Level: {}\nAnimal: {}\n{}\n\nTime: {}",
    level,
    label.to_uppercase(),
    location_line,
    now.format("%Y-%m-%d %H:%M:%S")
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use std::sync::{Arc, Mutex};
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// 记录发送正文、可配置先失败几次的假通道
  struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    failures_left: AtomicUsize,
  }

  impl MockTransport {
    fn new(failures: usize) -> (Self, Arc<Mutex<Vec<String>>>) {
      let sent = Arc::new(Mutex::new(Vec::new()));
      let transport = MockTransport {
        sent: Arc::clone(&sent),
        failures_left: AtomicUsize::new(failures),
      };
      (transport, sent)
    }
  }

  impl Transport for MockTransport {
    fn send(&self, _from: &str, _to: &str, body: &str) -> Result<String, TransportError> {
      if self
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
      {
        return Err(TransportError::Http("connection reset".to_string()));
      }
      self.sent.lock().unwrap().push(body.to_string());
      Ok("SM-test".to_string())
    }
  }

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
  }

  fn dispatcher(transport: Option<Box<dyn Transport>>) -> NotificationDispatcher {
    NotificationDispatcher::new(
      transport,
      "+10000000000".to_string(),
      "+10000000001".to_string(),
      60,
    )
  }

  #[test]
  fn sent_then_suppressed_within_cooldown() {
    let (transport, sent) = MockTransport::new(0);
    let mut dispatcher = dispatcher(Some(Box::new(transport)));

    let first = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(first, DispatchOutcome::Sent { .. }));

    let second = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(
      second,
      DispatchOutcome::Suppressed { remaining_secs: 60 }
    ));

    assert_eq!(sent.lock().unwrap().len(), 1);
  }

  #[test]
  fn failed_send_does_not_consume_cooldown() {
    let (transport, sent) = MockTransport::new(1);
    let mut dispatcher = dispatcher(Some(Box::new(transport)));

    let first = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(first, DispatchOutcome::Failed(TransportError::Http(_))));

    // 同一时间戳立即重试必须放行并成功
    let second = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(second, DispatchOutcome::Sent { .. }));
    assert_eq!(sent.lock().unwrap().len(), 1);
  }

  #[test]
  fn unconfigured_transport_fails_without_consuming_cooldown() {
    let mut dispatcher = dispatcher(None);

    let first = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(
      first,
      DispatchOutcome::Failed(TransportError::Unconfigured)
    ));
    let second = dispatcher.maybe_alert("tiger", DangerLevel::High, &LocationState::Pending, t0());
    assert!(matches!(
      second,
      DispatchOutcome::Failed(TransportError::Unconfigured)
    ));
  }

  #[test]
  fn alert_body_with_known_location_embeds_maps_link() {
    let (transport, sent) = MockTransport::new(0);
    let mut dispatcher = dispatcher(Some(Box::new(transport)));

    let location = LocationState::Known {
      lat: "12.9716".to_string(),
      lng: "77.5946".to_string(),
    };
    dispatcher.maybe_alert("tiger", DangerLevel::High, &location, t0());

    let sent = sent.lock().unwrap();
    let body = &sent[0];
    assert!(body.contains("Danger Level: HIGH"));
    assert!(body.contains("Animal: TIGER"));
    assert!(body.contains("Location: https://www.google.com/maps?q=12.9716,77.5946"));
    assert!(body.contains("Time: 2026-03-01 12:00:00"));
  }

  #[test]
  fn alert_body_without_fix_uses_raw_state_text() {
    let (transport, sent) = MockTransport::new(0);
    let mut dispatcher = dispatcher(Some(Box::new(transport)));

    dispatcher.maybe_alert("lion", DangerLevel::High, &LocationState::Acquiring, t0());

    let sent = sent.lock().unwrap();
    assert!(sent[0].contains("Location: GPS acquiring signal..."));
  }

  #[test]
  fn cooldown_expiry_allows_the_next_alert() {
    let (transport, sent) = MockTransport::new(0);
    let mut dispatcher = dispatcher(Some(Box::new(transport)));

    dispatcher.maybe_alert("bear", DangerLevel::High, &LocationState::Pending, t0());
    let later = t0() + Duration::seconds(61);
    let outcome = dispatcher.maybe_alert("bear", DangerLevel::High, &LocationState::Pending, later);
    assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
    assert_eq!(sent.lock().unwrap().len(), 2);
  }
}
