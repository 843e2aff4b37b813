//! Cache generation lifecycle.
//!
//! A generation is a named set of cached responses. Generations are created
//! on install, enumerated and deleted wholesale on activation. Activation
//! also marks one generation live so it survives a restart.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of one cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// Currently served to clients.
    pub live: bool,
}

impl CacheDb {
    /// Create a generation if it does not exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a generation exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry it owns.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE generation = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Mark `name` as the only live generation.
    ///
    /// Returns false, changing nothing, if the generation does not exist.
    pub async fn set_live_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                if exists {
                    tx.execute("UPDATE cache_generations SET live = (name = ?1)", params![name])?;
                }
                tx.commit()?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Name of the live generation, if one has been activated.
    pub async fn live_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT name FROM cache_generations WHERE live = 1 ORDER BY created_at DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                );
                match result {
                    Ok(name) => Ok(Some(name)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation with its entry count.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash), g.live
                     FROM cache_generations g
                     LEFT JOIN cache_entries e ON e.generation = g.name
                     GROUP BY g.name, g.created_at, g.live
                     ORDER BY g.created_at, g.name",
                )?;
                let generations = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                            live: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_generation_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("a350-checklist-v1").await.unwrap();
        db.open_generation("a350-checklist-v1").await.unwrap();

        assert_eq!(db.generation_names().await.unwrap(), vec!["a350-checklist-v1".to_string()]);
        assert!(db.has_generation("a350-checklist-v1").await.unwrap());
        assert!(!db.has_generation("a350-checklist-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());
        assert_eq!(db.generation_names().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_generations_counts_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();

        let generations = db.generations().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].name, "v1");
        assert_eq!(generations[0].entries, 0);
        assert!(!generations[0].live);
    }

    #[tokio::test]
    async fn test_live_generation_moves_on_activation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.live_generation().await.unwrap(), None);

        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();
        assert!(db.set_live_generation("v1").await.unwrap());
        assert_eq!(db.live_generation().await.unwrap().as_deref(), Some("v1"));

        assert!(!db.set_live_generation("v3").await.unwrap());
        assert_eq!(db.live_generation().await.unwrap().as_deref(), Some("v1"));

        assert!(db.set_live_generation("v2").await.unwrap());
        let live: Vec<_> = db.generations().await.unwrap().into_iter().filter(|g| g.live).map(|g| g.name).collect();
        assert_eq!(live, vec!["v2".to_string()]);

        db.delete_generation("v2").await.unwrap();
        assert_eq!(db.live_generation().await.unwrap(), None);
    }
}
