use std::collections::HashMap;
use std::sync::Arc;

use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::RwLock;
use tokio::task::AbortHandle;

use super::pool::NamePool;

/// 봇이 만든 통화방 하나의 기록.
pub struct TrackedChannel {
    pub channel_id: ChannelId,
    pub owner_id: UserId,
    pub name: String,
    /// 빈 채널 삭제 타이머. 채널이 비어있는 동안에만 존재한다.
    pub pending_delete: Option<AbortHandle>,
}

/// 길드별 음성 채널 런타임 상태. 길드 attach 시점에 만들어진다.
pub struct GuildVoiceState {
    pub trigger_channel_id: ChannelId,
    pub trigger_position: u16,
    pub category_id: Option<ChannelId>,
    pub tracked: HashMap<ChannelId, TrackedChannel>,
    pub pool: NamePool,
}

pub type VoiceManager = Arc<RwLock<HashMap<GuildId, GuildVoiceState>>>;

pub fn new_voice_manager() -> VoiceManager {
    Arc::new(RwLock::new(HashMap::new()))
}

pub async fn is_tracked(manager: &VoiceManager, guild_id: GuildId, channel_id: ChannelId) -> bool {
    let guilds = manager.read().await;
    guilds
        .get(&guild_id)
        .map_or(false, |g| g.tracked.contains_key(&channel_id))
}

pub async fn is_trigger(manager: &VoiceManager, guild_id: GuildId, channel_id: ChannelId) -> bool {
    let guilds = manager.read().await;
    guilds
        .get(&guild_id)
        .map_or(false, |g| g.trigger_channel_id == channel_id)
}

/// 기록 제거. 살아있는 삭제 타이머가 있으면 중단한다.
/// 이미 제거된 채널에 다시 호출해도 안전하다.
pub async fn untrack(manager: &VoiceManager, guild_id: GuildId, channel_id: ChannelId) {
    let mut guilds = manager.write().await;
    let Some(guild) = guilds.get_mut(&guild_id) else {
        return;
    };
    if let Some(rec) = guild.tracked.remove(&channel_id) {
        if let Some(handle) = rec.pending_delete {
            handle.abort();
        }
        guild.pool.release(&rec.name);
    }
}

/// 삭제 타이머 취소 (인원이 다시 들어온 경우). 타이머가 없으면 아무 일도 없다.
pub async fn cancel_pending(manager: &VoiceManager, guild_id: GuildId, channel_id: ChannelId) {
    let mut guilds = manager.write().await;
    let Some(rec) = guilds
        .get_mut(&guild_id)
        .and_then(|g| g.tracked.get_mut(&channel_id))
    else {
        return;
    };
    if let Some(handle) = rec.pending_delete.take() {
        handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> GuildVoiceState {
        GuildVoiceState {
            trigger_channel_id: ChannelId::new(10),
            trigger_position: 0,
            category_id: None,
            tracked: HashMap::new(),
            pool: NamePool::new(vec!["Alpha".into(), "Beta".into()]).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_untrack_twice_is_safe() {
        let manager = new_voice_manager();
        let gid = GuildId::new(1);
        let ch = ChannelId::new(100);
        {
            let mut guilds = manager.write().await;
            let mut state = test_state();
            let name = state.pool.allocate();
            state.tracked.insert(
                ch,
                TrackedChannel {
                    channel_id: ch,
                    owner_id: UserId::new(7),
                    name,
                    pending_delete: None,
                },
            );
            guilds.insert(gid, state);
        }

        untrack(&manager, gid, ch).await;
        untrack(&manager, gid, ch).await;

        let guilds = manager.read().await;
        let state = guilds.get(&gid).unwrap();
        assert!(state.tracked.is_empty());
        // Name went back to the pool on the first untrack
        assert_eq!(state.pool.in_use_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_pending_without_timer_is_noop() {
        let manager = new_voice_manager();
        let gid = GuildId::new(1);
        let ch = ChannelId::new(100);
        {
            let mut guilds = manager.write().await;
            let mut state = test_state();
            let name = state.pool.allocate();
            state.tracked.insert(
                ch,
                TrackedChannel {
                    channel_id: ch,
                    owner_id: UserId::new(7),
                    name,
                    pending_delete: None,
                },
            );
            guilds.insert(gid, state);
        }

        cancel_pending(&manager, gid, ch).await;
        assert!(is_tracked(&manager, gid, ch).await);
    }
}
