use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

async fn help_impl(ctx: Context<'_>) -> Result<(), Error> {
    let level_cmds = "\
`/rank` (`/lv`) — 레벨과 순위 확인
`/leaderboard` (`/lb`) — 서버 XP 상위 10명";

    let voice_info = "\
트리거 채널에 들어가면 전용 통화방이 만들어지고, 만든 사람에게 방 관리 권한이 주어집니다.
방이 비면 잠시 뒤 자동으로 정리됩니다.";

    let embed = CreateEmbed::new()
        .title("MaruBot 도움말")
        .field("레벨", level_cmds, false)
        .field("통화방", voice_info, false)
        .color(0x5865F2);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 봇 명령어 도움말
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    help_impl(ctx).await
}
