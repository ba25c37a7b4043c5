use std::collections::HashMap;

use async_trait::async_trait;
use serenity::all::{
    ChannelType, Context, CreateChannel, EditChannel, EditMember, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId,
};
use serenity::http::HttpError;
use serenity::model::id::{ChannelId, GuildId, UserId};

use super::gateway::{VoiceChannelInfo, VoiceError, VoiceGateway};

/// 디스코드 무응답 에러 코드: 대상이 음성 채널에 접속해 있지 않음
const ERR_TARGET_NOT_CONNECTED: isize = 40032;

/// serenity 기반 게이트웨이 구현. 코어의 유일한 프로덕션 API 표면.
pub struct DiscordGateway {
    ctx: Context,
}

impl DiscordGateway {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }
}

fn map_api_error(e: serenity::Error) -> VoiceError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &e {
        return match resp.status_code.as_u16() {
            403 => VoiceError::Permission(resp.error.message.clone()),
            404 => VoiceError::NotFound,
            429 => VoiceError::RateLimited,
            _ => VoiceError::Api(e.to_string()),
        };
    }
    VoiceError::Api(e.to_string())
}

#[async_trait]
impl VoiceGateway for DiscordGateway {
    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        category_id: Option<ChannelId>,
        owner_id: UserId,
    ) -> Result<ChannelId, VoiceError> {
        let overwrites = vec![
            // 만든 사람에게 자기 방 관리 권한
            PermissionOverwrite {
                allow: Permissions::VIEW_CHANNEL
                    | Permissions::CONNECT
                    | Permissions::MANAGE_CHANNELS
                    | Permissions::MOVE_MEMBERS,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(owner_id),
            },
            // @everyone은 보기/접속만
            PermissionOverwrite {
                allow: Permissions::VIEW_CHANNEL | Permissions::CONNECT,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
            },
        ];

        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Voice)
            .permissions(overwrites)
            .audit_log_reason("통화방 자동 생성");
        if let Some(cat) = category_id {
            builder = builder.category(cat);
        }

        let channel = guild_id
            .create_channel(&self.ctx.http, builder)
            .await
            .map_err(map_api_error)?;
        Ok(channel.id)
    }

    async fn create_plain_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        category_id: Option<ChannelId>,
    ) -> Result<ChannelId, VoiceError> {
        let mut builder = CreateChannel::new(name).kind(ChannelType::Voice);
        if let Some(cat) = category_id {
            builder = builder.category(cat);
        }
        let channel = guild_id
            .create_channel(&self.ctx.http, builder)
            .await
            .map_err(map_api_error)?;
        Ok(channel.id)
    }

    async fn delete_channel(&self, channel_id: ChannelId, reason: &str) -> Result<(), VoiceError> {
        self.ctx
            .http
            .delete_channel(channel_id, Some(reason))
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn set_channel_position(
        &self,
        channel_id: ChannelId,
        position: u16,
    ) -> Result<(), VoiceError> {
        channel_id
            .edit(&self.ctx.http, EditChannel::new().position(position))
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), VoiceError> {
        match guild_id
            .edit_member(
                &self.ctx.http,
                user_id,
                EditMember::new().voice_channel(channel_id),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)))
                if resp.error.code == ERR_TARGET_NOT_CONNECTED =>
            {
                // 이동 전에 통화를 끊은 경우
                Err(VoiceError::NotFound)
            }
            Err(e) => Err(map_api_error(e)),
        }
    }

    async fn member_count(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, VoiceError> {
        let guild = self
            .ctx
            .cache
            .guild(guild_id)
            .ok_or_else(|| VoiceError::Api(format!("캐시에 없는 길드: {guild_id}")))?;
        Ok(guild
            .voice_states
            .values()
            .filter(|vs| vs.channel_id == Some(channel_id))
            .count())
    }

    async fn list_voice_channels(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<VoiceChannelInfo>, VoiceError> {
        let channels = guild_id
            .channels(&self.ctx.http)
            .await
            .map_err(map_api_error)?;

        let counts: HashMap<ChannelId, usize> = match self.ctx.cache.guild(guild_id) {
            Some(guild) => {
                let mut counts = HashMap::new();
                for vs in guild.voice_states.values() {
                    if let Some(ch) = vs.channel_id {
                        *counts.entry(ch).or_insert(0) += 1;
                    }
                }
                counts
            }
            None => HashMap::new(),
        };

        Ok(channels
            .values()
            .filter(|ch| ch.kind == ChannelType::Voice)
            .map(|ch| VoiceChannelInfo {
                id: ch.id,
                name: ch.name.clone(),
                position: ch.position,
                member_count: counts.get(&ch.id).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn find_category(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, VoiceError> {
        let channels = guild_id
            .channels(&self.ctx.http)
            .await
            .map_err(map_api_error)?;
        Ok(channels
            .values()
            .find(|ch| ch.kind == ChannelType::Category && ch.name == name)
            .map(|ch| ch.id))
    }
}
