use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

pub struct LevelRow {
    pub user_id: String,
    pub xp: i64,
    pub messages: i64,
    pub voice_seconds: i64,
}

pub struct LevelDb {
    conn: Mutex<Connection>,
}

impl LevelDb {
    pub fn new(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS levels (
                guild_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                xp INTEGER NOT NULL DEFAULT 0,
                messages INTEGER NOT NULL DEFAULT 0,
                voice_seconds INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_levels_guild_xp
                ON levels(guild_id, xp DESC);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 메시지 XP 적립. 갱신된 누적 XP를 돌려준다 (레벨업 판정용).
    pub fn add_message_xp(
        &self,
        guild_id: &str,
        user_id: &str,
        xp: i64,
    ) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "INSERT INTO levels (guild_id, user_id, xp, messages) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(guild_id, user_id) DO UPDATE SET
                xp = xp + excluded.xp,
                messages = messages + 1
             RETURNING xp",
            params![guild_id, user_id, xp],
            |row| row.get(0),
        )
    }

    /// 음성 XP 적립. 갱신된 누적 XP를 돌려준다.
    pub fn add_voice_xp(
        &self,
        guild_id: &str,
        user_id: &str,
        xp: i64,
        seconds: i64,
    ) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "INSERT INTO levels (guild_id, user_id, xp, voice_seconds) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(guild_id, user_id) DO UPDATE SET
                xp = xp + excluded.xp,
                voice_seconds = voice_seconds + excluded.voice_seconds
             RETURNING xp",
            params![guild_id, user_id, xp, seconds],
            |row| row.get(0),
        )
    }

    pub fn get(&self, guild_id: &str, user_id: &str) -> Option<LevelRow> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id, xp, messages, voice_seconds FROM levels
             WHERE guild_id = ?1 AND user_id = ?2",
            params![guild_id, user_id],
            |row| {
                Ok(LevelRow {
                    user_id: row.get(0)?,
                    xp: row.get(1)?,
                    messages: row.get(2)?,
                    voice_seconds: row.get(3)?,
                })
            },
        )
        .optional()
        .unwrap_or_else(|e| {
            tracing::error!("레벨 조회 실패: {e}");
            None
        })
    }

    /// 길드 내 순위 (1부터). 기록이 없으면 None.
    pub fn rank_of(&self, guild_id: &str, user_id: &str) -> Option<u32> {
        let conn = self.conn.lock().unwrap();
        let xp: i64 = conn
            .query_row(
                "SELECT xp FROM levels WHERE guild_id = ?1 AND user_id = ?2",
                params![guild_id, user_id],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                tracing::error!("순위 조회 실패: {e}");
                None
            })?;

        conn.query_row(
            "SELECT 1 + COUNT(*) FROM levels WHERE guild_id = ?1 AND xp > ?2",
            params![guild_id, xp],
            |row| row.get(0),
        )
        .ok()
    }

    pub fn top(&self, guild_id: &str, limit: usize) -> Vec<LevelRow> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT user_id, xp, messages, voice_seconds FROM levels
             WHERE guild_id = ?1 ORDER BY xp DESC LIMIT ?2",
        ) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("리더보드 쿼리 준비 실패: {e}");
                return Vec::new();
            }
        };

        let rows = match stmt.query_map(params![guild_id, limit], |row| {
            Ok(LevelRow {
                user_id: row.get(0)?,
                xp: row.get(1)?,
                messages: row.get(2)?,
                voice_seconds: row.get(3)?,
            })
        }) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("리더보드 쿼리 실행 실패: {e}");
                return Vec::new();
            }
        };

        rows.filter_map(|r| r.ok()).collect()
    }
}
