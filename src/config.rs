use std::time::Duration;

use crate::voice::VoiceConfig;

/// 기본 통화방 이름 카탈로그. `MARUBOT_CHANNEL_NAMES`로 교체할 수 있다.
const DEFAULT_CHANNEL_NAMES: &[&str] = &[
    "말랑한 방",
    "아늑한 방",
    "조용한 방",
    "왁자지껄한 방",
    "게임하는 방",
    "공부하는 방",
    "야식 먹는 방",
    "새벽 감성 방",
];

pub struct Config {
    pub discord_token: String,
    pub trigger_channel: String,
    pub voice_category: Option<String>,
    pub delete_delay_ms: u64,
    pub channel_names: Vec<String>,
    pub afk_timeout_secs: u64,
    pub log_channel_id: Option<u64>,
    pub db_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        let channel_names = std::env::var("MARUBOT_CHANNEL_NAMES")
            .map(|v| parse_catalog(&v))
            .unwrap_or_default();
        Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .expect("DISCORD_TOKEN 환경변수가 필요합니다"),
            trigger_channel: std::env::var("MARUBOT_TRIGGER_CHANNEL")
                .unwrap_or_else(|_| "➕ 통화방 만들기".to_string()),
            voice_category: std::env::var("MARUBOT_VOICE_CATEGORY").ok(),
            delete_delay_ms: std::env::var("MARUBOT_DELETE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            channel_names: if channel_names.is_empty() {
                default_catalog()
            } else {
                channel_names
            },
            afk_timeout_secs: std::env::var("MARUBOT_AFK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            log_channel_id: std::env::var("MARUBOT_LOG_CHANNEL_ID")
                .ok()
                .and_then(|v| v.parse().ok()),
            db_path: std::env::var("MARUBOT_DB_PATH").unwrap_or_else(|_| "marubot.db".to_string()),
        }
    }

    pub fn voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            trigger_name: self.trigger_channel.clone(),
            category_name: self.voice_category.clone(),
            delete_delay: Duration::from_millis(self.delete_delay_ms),
            catalog: self.channel_names.clone(),
        }
    }
}

/// 쉼표 구분 카탈로그 파싱. 빈 항목은 버린다.
pub fn parse_catalog(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn default_catalog() -> Vec<String> {
    DEFAULT_CHANNEL_NAMES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        assert_eq!(
            parse_catalog("Alpha, Beta ,,Gamma"),
            vec!["Alpha", "Beta", "Gamma"]
        );
        assert!(parse_catalog("  ,, ").is_empty());
    }

    #[test]
    fn test_default_catalog_nonempty() {
        assert!(!default_catalog().is_empty());
    }
}
