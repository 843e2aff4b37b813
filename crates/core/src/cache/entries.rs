//! Cached response CRUD operations.
//!
//! Entries are keyed by (generation, url). Writing an entry creates its
//! generation when missing, mirroring `caches.open(name).put(...)`.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use super::response::{Response, ResponseType};
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const UPSERT_ENTRY: &str = "INSERT INTO cache_entries (
        key_hash, generation, url, status, response_type, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(key_hash) DO UPDATE SET
        status = excluded.status,
        response_type = excluded.response_type,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_GENERATION: &str = "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)";

fn write_entry(
    conn: &rusqlite::Connection, generation: &str, url: &str, response: &Response, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
    conn.execute(
        UPSERT_ENTRY,
        params![
            compute_entry_key(generation, url),
            generation,
            url,
            response.status,
            response.response_type.as_str(),
            headers_json,
            response.body.as_ref(),
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response for `url` in `generation`, replacing any previous entry.
    pub async fn put_entry(&self, generation: &str, url: &str, response: &Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let url = url.to_string();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_GENERATION, params![generation, now])?;
                write_entry(conn, &generation, &url, &response, &now)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of responses in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, generation: &str, entries: Vec<(String, Response)>) -> Result<usize, Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_GENERATION, params![generation, now])?;
                for (url, response) in &entries {
                    write_entry(&tx, &generation, url, response, &now)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the cached response for `url` in `generation`.
    pub async fn match_entry(&self, generation: &str, url: &str) -> Result<Option<Response>, Error> {
        let key = compute_entry_key(generation, url);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, response_type, headers_json, body
                     FROM cache_entries WHERE key_hash = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u16>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                        ))
                    },
                );

                match result {
                    Ok((url, status, response_type, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json).unwrap_or_else(|e| {
                            tracing::warn!(%url, "discarding malformed cached headers: {e}");
                            Vec::new()
                        });
                        Ok(Some(Response {
                            url,
                            status,
                            response_type: ResponseType::parse(&response_type),
                            headers,
                            body: Bytes::from(body),
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the URLs cached in `generation`.
    pub async fn entry_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE generation = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
