// User-facing summary messages

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Language of the messages returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ko,
    En,
}

impl Locale {
    /// Guidance returned when no tokens matched
    pub fn no_tokens(&self) -> &'static str {
        match self {
            Locale::Ko => "발송할 FCM 토큰이 없습니다. deviceName을 확인하거나, 앱에서 먼저 알림 권한 및 토큰 등록을 해 주세요.",
            Locale::En => "No FCM tokens to send to. Check deviceName, or allow notifications and register a token in the app first.",
        }
    }

    /// Summary of a completed fan-out
    pub fn summary(&self, success: usize, failure: usize, total: usize) -> String {
        match self {
            Locale::Ko => format!(
                "발송 완료: 성공 {}, 실패 {} (총 {}개 기기)",
                success, failure, total
            ),
            Locale::En => format!(
                "Sent: {} succeeded, {} failed ({} devices total)",
                success, failure, total
            ),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" | "ko-kr" | "korean" => Ok(Locale::Ko),
            "en" | "en-us" | "english" => Ok(Locale::En),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}
