//! FTS5-based search implementation using SQLite full-text search

use super::{SearchResult, SearchVault};
use crate::library::{EntityKind, SearchEntry};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::{debug, warn};

/// FTS5 search vault using SQLite's full-text search with trigram tokenizer
pub struct Fts5SearchVault {
    conn: Mutex<Connection>,
}

impl Fts5SearchVault {
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
                entity_id UNINDEXED,
                kind UNINDEXED,
                matched_text,
                tokenize='trigram'
            );
        "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn kind_to_str(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
            EntityKind::Track => "track",
        }
    }

    /// Builds the MATCH expression: the query becomes a quoted phrase, with a
    /// trailing `*` kept outside the quotes as a prefix marker.
    fn match_expression(query: &str) -> String {
        let (body, prefix) = match query.strip_suffix('*') {
            Some(body) => (body, "*"),
            None => (query, ""),
        };
        format!("\"{}\"{}", body.replace('"', "\"\""), prefix)
    }
}

impl SearchVault for Fts5SearchVault {
    fn search(
        &self,
        query: &str,
        max_results: usize,
        filter: Option<EntityKind>,
    ) -> Option<Vec<SearchResult>> {
        let conn = self.conn.lock().unwrap();
        let match_expr = Self::match_expression(query);

        let sql = match filter {
            Some(_) => {
                r#"SELECT entity_id, kind, matched_text
                   FROM search_index
                   WHERE search_index MATCH ?1 AND kind = ?2
                   ORDER BY bm25(search_index)
                   LIMIT ?3"#
            }
            None => {
                r#"SELECT entity_id, kind, matched_text
                   FROM search_index
                   WHERE search_index MATCH ?1
                   ORDER BY bm25(search_index)
                   LIMIT ?2"#
            }
        };

        let mut stmt = match conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!("FTS5 search query prepare failed: {}", e);
                return None;
            }
        };

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        };
        let rows = match filter {
            Some(kind) => stmt.query_map(
                params![match_expr, Self::kind_to_str(kind), max_results],
                map_row,
            ),
            None => stmt.query_map(params![match_expr, max_results], map_row),
        };

        // A MATCH parse error surfaces when the query runs
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                debug!("FTS5 query '{}' rejected: {}", match_expr, e);
                return None;
            }
        };

        let mut results = Vec::new();
        for row in rows {
            match row {
                Ok((entity_id, kind_str, matched_text)) => {
                    if let Some(kind) = EntityKind::from_str_name(&kind_str) {
                        results.push(SearchResult {
                            kind,
                            entity_id,
                            matched_text,
                        });
                    }
                }
                Err(e) => {
                    debug!("FTS5 query '{}' rejected: {}", match_expr, e);
                    return None;
                }
            }
        }
        Some(results)
    }

    fn rebuild_index(&self, entries: &[SearchEntry]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM search_index", [])?;
        {
            let mut stmt = conn.prepare(
                "INSERT INTO search_index (entity_id, kind, matched_text) VALUES (?1, ?2, ?3)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    Self::kind_to_str(entry.kind),
                    entry.text
                ])?;
            }
        }
        debug!("FTS5 search index built with {} items", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{music_search, partial_entity_search};

    fn vault_with(entries: &[(EntityKind, &str, &str)]) -> Fts5SearchVault {
        let vault = Fts5SearchVault::new().unwrap();
        let entries: Vec<SearchEntry> = entries
            .iter()
            .map(|(kind, id, text)| SearchEntry {
                kind: *kind,
                id: id.to_string(),
                text: text.to_string(),
            })
            .collect();
        vault.rebuild_index(&entries).unwrap();
        vault
    }

    fn sample_vault() -> Fts5SearchVault {
        vault_with(&[
            (EntityKind::Artist, "ar1", "Stereolab"),
            (EntityKind::Artist, "ar2", "Stereo Total"),
            (EntityKind::Album, "al1", "Dots and Loops Stereolab"),
            (EntityKind::Track, "tr1", "Brakhage"),
        ])
    }

    #[test]
    fn search_matches_substring() {
        let vault = sample_vault();
        let results = vault.search("stereolab", 10, None).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.entity_id.as_str()).collect();
        assert!(ids.contains(&"ar1"));
        assert!(ids.contains(&"al1"));
        assert!(!ids.contains(&"tr1"));
    }

    #[test]
    fn kind_filter_limits_results() {
        let vault = sample_vault();
        let results = vault
            .search("stereo", 10, Some(EntityKind::Artist))
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.kind == EntityKind::Artist));
    }

    #[test]
    fn no_match_is_not_invalid() {
        let vault = sample_vault();
        let results = vault.search("zzzzzz", 10, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn prefix_wildcard_matches_through_helper() {
        let vault = sample_vault();
        let results = partial_entity_search(&vault, "brak", EntityKind::Track);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id, "tr1");
        assert_eq!(results[0].matched_text, "Brakhage");
    }

    #[test]
    fn music_search_end_to_end() {
        let vault = sample_vault();
        let results = music_search(&vault, "stereolab", 10).unwrap();
        assert!(!results.is_empty());
        assert!(music_search(&vault, "* *", 10).is_none());
    }

    #[test]
    fn max_results_caps_output() {
        let entries: Vec<(EntityKind, String, String)> = (0..40)
            .map(|i| {
                (
                    EntityKind::Artist,
                    format!("ar{}", i),
                    format!("repetition band {}", i),
                )
            })
            .collect();
        let borrowed: Vec<(EntityKind, &str, &str)> = entries
            .iter()
            .map(|(kind, id, text)| (*kind, id.as_str(), text.as_str()))
            .collect();
        let vault = vault_with(&borrowed);
        let results = vault.search("repetition", 25, None).unwrap();
        assert_eq!(results.len(), 25);
    }
}
