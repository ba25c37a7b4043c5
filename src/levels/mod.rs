pub mod db;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serenity::model::id::{GuildId, UserId};
use tokio::sync::RwLock;

/// 같은 멤버의 연속 메시지에 XP를 주지 않는 간격.
pub const MESSAGE_COOLDOWN: Duration = Duration::from_secs(60);
/// 음성 채널 1분당 XP.
pub const VOICE_XP_PER_MINUTE: i64 = 5;

/// `level`에 도달하는 데 필요한 누적 XP.
/// 레벨 l에서 l+1로 가는 비용은 5l² + 50l + 100.
pub fn xp_for_level(level: u32) -> i64 {
    (0..level as i64).map(|l| 5 * l * l + 50 * l + 100).sum()
}

pub fn level_from_xp(xp: i64) -> u32 {
    let mut level = 0;
    while xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// 메시지 한 건의 XP. 15~25 사이 무작위.
pub fn message_xp() -> i64 {
    rand::thread_rng().gen_range(15..=25)
}

pub type CooldownMap = Arc<RwLock<HashMap<(GuildId, UserId), Instant>>>;

pub fn new_cooldown_map() -> CooldownMap {
    Arc::new(RwLock::new(HashMap::new()))
}

/// 쿨다운 검사. XP를 줘도 되면 타임스탬프를 갱신하고 true를 돌려준다.
pub async fn check_cooldown(
    map: &CooldownMap,
    guild_id: GuildId,
    user_id: UserId,
    cooldown: Duration,
) -> bool {
    let now = Instant::now();
    let mut entries = map.write().await;
    match entries.get(&(guild_id, user_id)) {
        Some(last) if now.duration_since(*last) < cooldown => false,
        _ => {
            entries.insert((guild_id, user_id), now);
            true
        }
    }
}

/// 음성 체류 시간 추적. 입장 시각을 기록하고 퇴장 시 체류 시간을 돌려준다.
pub type VoiceSessions = Arc<RwLock<HashMap<(GuildId, UserId), Instant>>>;

pub fn new_voice_sessions() -> VoiceSessions {
    Arc::new(RwLock::new(HashMap::new()))
}

pub async fn voice_session_start(sessions: &VoiceSessions, guild_id: GuildId, user_id: UserId) {
    let mut entries = sessions.write().await;
    entries.entry((guild_id, user_id)).or_insert_with(Instant::now);
}

pub async fn voice_session_end(
    sessions: &VoiceSessions,
    guild_id: GuildId,
    user_id: UserId,
) -> Option<Duration> {
    let mut entries = sessions.write().await;
    entries
        .remove(&(guild_id, user_id))
        .map(|start| start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_curve_base() {
        assert_eq!(xp_for_level(0), 0);
        assert_eq!(xp_for_level(1), 100);
        assert_eq!(xp_for_level(2), 255); // 100 + 155
    }

    #[test]
    fn test_level_from_xp() {
        assert_eq!(level_from_xp(0), 0);
        assert_eq!(level_from_xp(99), 0);
        assert_eq!(level_from_xp(100), 1);
        assert_eq!(level_from_xp(254), 1);
        assert_eq!(level_from_xp(255), 2);
    }

    #[test]
    fn test_level_curve_monotonic() {
        let mut prev = 0;
        for level in 1..50 {
            let need = xp_for_level(level);
            assert!(need > prev);
            prev = need;
        }
    }

    #[test]
    fn test_message_xp_range() {
        for _ in 0..100 {
            let xp = message_xp();
            assert!((15..=25).contains(&xp));
        }
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_award() {
        let map = new_cooldown_map();
        let gid = GuildId::new(1);
        let uid = UserId::new(2);
        assert!(check_cooldown(&map, gid, uid, MESSAGE_COOLDOWN).await);
        assert!(!check_cooldown(&map, gid, uid, MESSAGE_COOLDOWN).await);
        // 다른 멤버는 영향 없음
        assert!(check_cooldown(&map, gid, UserId::new(3), MESSAGE_COOLDOWN).await);
    }

    #[tokio::test]
    async fn test_voice_session_roundtrip() {
        let sessions = new_voice_sessions();
        let gid = GuildId::new(1);
        let uid = UserId::new(2);
        assert!(voice_session_end(&sessions, gid, uid).await.is_none());
        voice_session_start(&sessions, gid, uid).await;
        assert!(voice_session_end(&sessions, gid, uid).await.is_some());
        assert!(voice_session_end(&sessions, gid, uid).await.is_none());
    }
}
