//! Cache Adapter (C4), feature `cache`.
//!
//! Backed by Redis via `redis`'s `ConnectionManager`, matching
//! `CACHE_HOST`/`CACHE_PORT`/`CACHE_PASSWORD` wiring from §4.14. All
//! values are byte strings on the wire (§4.4); structured values are
//! serialized by the caller before `set_ex`.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

pub struct CacheAdapter {
    conn: ConnectionManager,
}

impl CacheAdapter {
    pub async fn connect(
        host: &str,
        port: u16,
        password: Option<&str>,
    ) -> redis::RedisResult<Self> {
        let auth = password.map(|p| format!(":{p}@")).unwrap_or_default();
        let url = format!("redis://{auth}{host}:{port}");
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn del(&self, key: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    pub async fn incr(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await
    }

    pub async fn scan(&self, prefix: &str) -> redis::RedisResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    pub async fn ping(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async(&mut conn).await
    }
}
