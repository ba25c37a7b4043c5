use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, CreateMessage};
use tracing::{debug, warn};

use crate::levels::{self, VOICE_XP_PER_MINUTE};
use crate::utils::embed;
use crate::voice::discord::DiscordGateway;
use crate::voice::gateway::VoiceError;
use crate::voice::{self, VoiceTransition};
use crate::{afk, Data, Error};

pub async fn handle(
    ctx: &serenity::Context,
    gateway: &Arc<DiscordGateway>,
    old: &Option<serenity::VoiceState>,
    new: &serenity::VoiceState,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = match new.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };
    let user_id = new.user_id;
    let is_bot = new.member.as_ref().map_or(false, |m| m.user.bot);

    let old_channel = old.as_ref().and_then(|v| v.channel_id);
    let transition = voice::normalize(old_channel, new.channel_id);
    if transition == VoiceTransition::NoOp {
        return Ok(());
    }

    // 통화방 코어. 이벤트 하나의 실패가 다음 이벤트를 막으면 안 되므로
    // 여기서 로그만 남기고 삼킨다.
    if !is_bot {
        if let Err(e) = voice::handle_transition(
            gateway,
            &data.voice_manager,
            &data.voice_config,
            guild_id,
            user_id,
            transition,
        )
        .await
        {
            match e {
                VoiceError::NotFound => debug!("음성 전이 처리 중 대상 소실 (무해)"),
                e => warn!("음성 전이 처리 실패 (길드 {guild_id}): {e}"),
            }
        }
    }

    // 음성 활동 감사 로그
    if let Some(log_channel) = data.log_channel_id {
        send_audit_log(ctx, log_channel, guild_id, user_id.get(), transition).await;
    }

    if is_bot {
        return Ok(());
    }

    // 음성 XP: 입장 시 세션 시작, 퇴장 시 체류 시간만큼 적립
    match transition {
        VoiceTransition::Joined { .. } => {
            levels::voice_session_start(&data.voice_sessions, guild_id, user_id).await;
        }
        VoiceTransition::Left { .. } => {
            if let Some(stayed) = levels::voice_session_end(&data.voice_sessions, guild_id, user_id).await
            {
                let minutes = stayed.as_secs() as i64 / 60;
                let xp = minutes * VOICE_XP_PER_MINUTE;
                if xp > 0 {
                    if let Err(e) = data.level_db.add_voice_xp(
                        &guild_id.to_string(),
                        &user_id.to_string(),
                        xp,
                        stayed.as_secs() as i64,
                    ) {
                        warn!("음성 XP 적립 실패: {e}");
                    }
                }
            }
        }
        VoiceTransition::Moved { .. } | VoiceTransition::NoOp => {}
    }

    // AFK 체류 추적
    let afk_channel = ctx
        .cache
        .guild(guild_id)
        .and_then(|g| g.afk_metadata.as_ref().map(|m| m.afk_channel_id));
    afk::note_transition(&data.afk_tracker, guild_id, user_id, afk_channel, new.channel_id).await;

    Ok(())
}

async fn send_audit_log(
    ctx: &serenity::Context,
    log_channel: serenity::ChannelId,
    guild_id: serenity::GuildId,
    user_id: u64,
    transition: VoiceTransition,
) {
    let channel_name = |id: serenity::ChannelId| -> String {
        ctx.cache
            .guild(guild_id)
            .and_then(|g| g.channels.get(&id).map(|c| c.name.clone()))
            .unwrap_or_else(|| format!("#{id}"))
    };

    let log_embed = match transition {
        VoiceTransition::Joined { channel } => embed::voice_joined(user_id, &channel_name(channel)),
        VoiceTransition::Left { channel } => embed::voice_left(user_id, &channel_name(channel)),
        VoiceTransition::Moved { from, to } => {
            embed::voice_moved(user_id, &channel_name(from), &channel_name(to))
        }
        VoiceTransition::NoOp => return,
    };

    if let Err(e) = log_channel
        .send_message(&ctx.http, CreateMessage::new().embed(log_embed))
        .await
    {
        warn!("음성 로그 전송 실패: {e}");
    }
}
