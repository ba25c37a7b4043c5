use serenity::builder::CreateEmbed;

use crate::levels::db::LevelRow;
use crate::levels::{level_from_xp, xp_for_level};

pub fn voice_joined(user_id: u64, channel_name: &str) -> CreateEmbed {
    CreateEmbed::new()
        .description(format!("🔊 <@{user_id}> 님이 **{channel_name}**에 입장"))
        .color(0x57F287)
}

pub fn voice_left(user_id: u64, channel_name: &str) -> CreateEmbed {
    CreateEmbed::new()
        .description(format!("🔇 <@{user_id}> 님이 **{channel_name}**에서 퇴장"))
        .color(0xED4245)
}

pub fn voice_moved(user_id: u64, from_name: &str, to_name: &str) -> CreateEmbed {
    CreateEmbed::new()
        .description(format!(
            "↪️ <@{user_id}> 님이 **{from_name}** → **{to_name}** 이동"
        ))
        .color(0x5865F2)
}

pub fn rank_card(user_id: u64, row: &LevelRow, rank: Option<u32>) -> CreateEmbed {
    let level = level_from_xp(row.xp);
    let next = xp_for_level(level + 1);
    let rank_text = rank.map_or("-".to_string(), |r| format!("#{r}"));

    CreateEmbed::new()
        .title("📊 레벨 정보")
        .description(format!("<@{user_id}>"))
        .field("레벨", level.to_string(), true)
        .field("순위", rank_text, true)
        .field("XP", format!("{} / {next}", row.xp), true)
        .field("메시지", row.messages.to_string(), true)
        .field("통화 시간", format_voice_time(row.voice_seconds), true)
        .color(0x5865F2)
}

pub fn leaderboard(rows: &[LevelRow]) -> CreateEmbed {
    let mut description = String::new();
    if rows.is_empty() {
        description.push_str("아직 기록이 없습니다.");
    } else {
        for (i, row) in rows.iter().enumerate() {
            let medal = match i {
                0 => "🥇",
                1 => "🥈",
                2 => "🥉",
                _ => "▫️",
            };
            description.push_str(&format!(
                "{medal} **{}.** <@{}> — 레벨 {} ({} XP)\n",
                i + 1,
                row.user_id,
                level_from_xp(row.xp),
                row.xp
            ));
        }
    }

    CreateEmbed::new()
        .title("🏆 리더보드")
        .description(description)
        .color(0xFEE75C)
}

fn format_voice_time(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}시간 {minutes}분")
    } else {
        format!("{minutes}분")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_voice_time() {
        assert_eq!(format_voice_time(0), "0분");
        assert_eq!(format_voice_time(59), "0분");
        assert_eq!(format_voice_time(60), "1분");
        assert_eq!(format_voice_time(3660), "1시간 1분");
    }
}
