use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::all::{Context, EditMember};
use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::RwLock;
use tracing::{info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// (길드, 멤버) → AFK 채널 입장 시각.
pub type AfkTracker = Arc<RwLock<HashMap<(GuildId, UserId), Instant>>>;

pub fn new_afk_tracker() -> AfkTracker {
    Arc::new(RwLock::new(HashMap::new()))
}

/// 음성 전이마다 호출해 AFK 채널 체류 기록을 갱신한다.
pub async fn note_transition(
    tracker: &AfkTracker,
    guild_id: GuildId,
    user_id: UserId,
    afk_channel: Option<ChannelId>,
    new_channel: Option<ChannelId>,
) {
    let Some(afk_channel) = afk_channel else {
        return;
    };
    let mut entries = tracker.write().await;
    if new_channel == Some(afk_channel) {
        entries.entry((guild_id, user_id)).or_insert_with(Instant::now);
    } else {
        entries.remove(&(guild_id, user_id));
    }
}

/// 주기 스캔 루프. 길드마다 AFK 채널에 `timeout` 이상 머문 멤버를 끊는다.
/// 길드 ID를 끝까지 들고 다니며, "첫 번째 길드" 같은 가정은 하지 않는다.
pub fn spawn_sweep(ctx: Context, tracker: AfkTracker, timeout: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            sweep_once(&ctx, &tracker, timeout).await;
        }
    });
}

async fn sweep_once(ctx: &Context, tracker: &AfkTracker, timeout: Duration) {
    // 캐시 가드를 await 너머로 들고 가지 않도록 먼저 스냅샷을 뜬다
    let mut occupants: Vec<(GuildId, UserId)> = Vec::new();
    for guild_id in ctx.cache.guilds() {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            continue;
        };
        let Some(afk_channel) = guild.afk_metadata.as_ref().map(|m| m.afk_channel_id) else {
            continue;
        };
        for vs in guild.voice_states.values() {
            if vs.channel_id == Some(afk_channel) {
                occupants.push((guild_id, vs.user_id));
            }
        }
    }

    let expired: Vec<(GuildId, UserId)> = {
        let mut entries = tracker.write().await;
        // 재시작 등으로 기록이 없는 체류자는 지금부터 센다
        for key in &occupants {
            entries.entry(*key).or_insert_with(Instant::now);
        }
        entries.retain(|key, _| occupants.contains(key));
        entries
            .iter()
            .filter(|(_, since)| since.elapsed() >= timeout)
            .map(|(key, _)| *key)
            .collect()
    };

    for (guild_id, user_id) in expired {
        match guild_id
            .edit_member(&ctx.http, user_id, EditMember::new().disconnect_member())
            .await
        {
            Ok(_) => {
                info!("AFK 시간 초과로 연결 해제: {user_id} (길드 {guild_id})");
                tracker.write().await.remove(&(guild_id, user_id));
            }
            Err(e) => warn!("AFK 연결 해제 실패 ({user_id}): {e}"),
        }
    }
}
