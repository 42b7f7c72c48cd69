//! Durable storage for novels and chapters.
//!
//! Every method is a single atomic call. Multi-statement writes run inside
//! one SQLite transaction; nothing spans more than one call.

use crate::error::StoreError;
use crate::models::{Chapter, Novel, NovelStatus, Stats};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS novels (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    original_title TEXT,
    cover TEXT,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    summary TEXT NOT NULL,
    author TEXT,
    status TEXT,
    genres TEXT,
    chapters_count INTEGER NOT NULL DEFAULT 0,
    last_read_chapter_number INTEGER,
    last_read_timestamp INTEGER,
    last_updated INTEGER NOT NULL,
    date_added INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chapters (
    id TEXT NOT NULL,
    novel_id TEXT NOT NULL REFERENCES novels(id),
    number INTEGER NOT NULL,
    title TEXT NOT NULL,
    original_title TEXT,
    content TEXT NOT NULL,
    date_translated INTEGER NOT NULL,
    word_count INTEGER,
    url TEXT,
    next_chapter_url TEXT,
    PRIMARY KEY (novel_id, id),
    UNIQUE (novel_id, number)
);

CREATE INDEX IF NOT EXISTS idx_chapters_url ON chapters(novel_id, url);
"#;

const NOVEL_COLUMNS: &str = "id, title, original_title, cover, source, url, summary, author, status, \
     genres, chapters_count, last_read_chapter_number, last_read_timestamp, last_updated, date_added";

const CHAPTER_COLUMNS: &str = "id, novel_id, number, title, original_title, content, date_translated, \
     word_count, url, next_chapter_url";

/// Chapter columns with the content left out, for listings.
const CHAPTER_SUMMARY_COLUMNS: &str = "id, novel_id, number, title, original_title, '' AS content, \
     date_translated, word_count, url, next_chapter_url";

/// Ordering applied to novel listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NovelOrder {
    /// Newest additions first.
    #[default]
    DateAdded,
    /// Most recently updated first.
    RecentlyUpdated,
    /// Most recently read first; novels never read are left out.
    RecentlyRead,
}

/// Filter for [`NovelStore::list_novels`].
#[derive(Debug, Clone, Default)]
pub struct NovelFilter {
    /// Only novels carrying this genre.
    pub genre: Option<String>,
    /// Only novels from one of these source tags.
    pub sources: Option<Vec<String>>,
    pub order: NovelOrder,
    pub limit: Option<usize>,
}

/// CRUD over novels and chapters.
pub trait NovelStore: Send + Sync {
    /// Checks that the store is reachable.
    fn ping(&self) -> Result<(), StoreError>;

    fn stats(&self) -> Result<Stats, StoreError>;

    fn get_novel(&self, id: &str) -> Result<Option<Novel>, StoreError>;

    fn list_novels(&self, filter: &NovelFilter) -> Result<Vec<Novel>, StoreError>;

    /// Finds novels whose title or original title contains `query`.
    fn search_novels(&self, query: &str) -> Result<Vec<Novel>, StoreError>;

    fn create_novel(&self, novel: &Novel) -> Result<(), StoreError>;

    /// Replaces the mutable fields of an existing novel.
    ///
    /// `last_read_chapter_number` is left alone; only
    /// [`update_last_read`](Self::update_last_read) moves it.
    fn update_novel(&self, novel: &Novel) -> Result<(), StoreError>;

    /// Deletes a novel together with its chapters.
    fn delete_novel(&self, id: &str) -> Result<(), StoreError>;

    fn update_last_read(&self, novel_id: &str, chapter_number: i64, timestamp: i64) -> Result<(), StoreError>;

    /// Lists a novel's chapters in order, without their content.
    fn list_chapters(&self, novel_id: &str) -> Result<Vec<Chapter>, StoreError>;

    /// Returns the chapter with the highest number.
    fn last_chapter(&self, novel_id: &str) -> Result<Option<Chapter>, StoreError>;

    fn chapter_by_number(&self, novel_id: &str, number: i64) -> Result<Option<Chapter>, StoreError>;

    fn chapter_by_url(&self, novel_id: &str, url: &str) -> Result<Option<Chapter>, StoreError>;

    /// Inserts a chapter and bumps the owning novel's `last_updated`.
    fn create_chapter(&self, chapter: &Chapter) -> Result<(), StoreError>;

    fn update_chapter(&self, chapter: &Chapter) -> Result<(), StoreError>;
}

/// SQLite-backed [`NovelStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        info!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_novels(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Novel>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let novels = stmt
            .query_map(params, novel_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(novels)
    }

    fn query_chapter(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<Chapter>, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row(sql, params, chapter_from_row).optional()?)
    }
}

fn novel_from_row(row: &Row<'_>) -> rusqlite::Result<Novel> {
    let genres: Option<String> = row.get(9)?;
    let genres = match genres.as_deref() {
        None | Some("") => Vec::new(),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
    };
    let status: Option<String> = row.get(8)?;

    Ok(Novel {
        id: row.get(0)?,
        title: row.get(1)?,
        original_title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        cover: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        source: row.get(4)?,
        url: row.get(5)?,
        summary: row.get(6)?,
        author: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        status: NovelStatus::classify(status.as_deref().unwrap_or_default()),
        genres,
        chapters_count: row.get(10)?,
        last_read_chapter_number: row.get::<_, Option<i64>>(11)?.unwrap_or_default(),
        last_read_timestamp: row.get::<_, Option<i64>>(12)?.unwrap_or_default(),
        last_updated: row.get(13)?,
        date_added: row.get(14)?,
    })
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        original_title: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        content: row.get(5)?,
        date_translated: row.get(6)?,
        word_count: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        next_chapter_url: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}

/// Maps a constraint violation on insert to [`StoreError::Conflict`].
fn insert_error(err: rusqlite::Error, what: String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(what)
        }
        other => StoreError::Sqlite(other),
    }
}

/// Escapes `%`, `_` and `\` for a LIKE pattern using `\` as escape.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl NovelStore for SqliteStore {
    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
    }

    fn stats(&self) -> Result<Stats, StoreError> {
        let conn = self.conn()?;
        let novel_count = conn.query_row("SELECT COUNT(*) FROM novels", [], |r| r.get(0))?;
        let chapter_count = conn.query_row("SELECT COUNT(*) FROM chapters", [], |r| r.get(0))?;
        Ok(Stats {
            novel_count,
            chapter_count,
        })
    }

    fn get_novel(&self, id: &str) -> Result<Option<Novel>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM novels WHERE id = ?1", NOVEL_COLUMNS);
        Ok(conn.query_row(&sql, [id], novel_from_row).optional()?)
    }

    fn list_novels(&self, filter: &NovelFilter) -> Result<Vec<Novel>, StoreError> {
        let (condition, order) = match filter.order {
            NovelOrder::DateAdded => ("", "date_added DESC"),
            NovelOrder::RecentlyUpdated => ("", "last_updated DESC"),
            NovelOrder::RecentlyRead => ("WHERE last_read_timestamp > 0", "last_read_timestamp DESC"),
        };
        let sql = format!(
            "SELECT {} FROM novels {} ORDER BY {}, id",
            NOVEL_COLUMNS, condition, order
        );

        let novels = self
            .query_novels(&sql, [])?
            .into_iter()
            .filter(|n| filter.genre.as_ref().is_none_or(|g| n.genres.contains(g)))
            .filter(|n| filter.sources.as_ref().is_none_or(|s| s.contains(&n.source)))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(novels)
    }

    fn search_novels(&self, query: &str) -> Result<Vec<Novel>, StoreError> {
        let sql = format!(
            "SELECT {} FROM novels \
             WHERE title LIKE ?1 ESCAPE '\\' OR original_title LIKE ?1 ESCAPE '\\' \
             ORDER BY title",
            NOVEL_COLUMNS
        );
        self.query_novels(&sql, [like_pattern(query)])
    }

    fn create_novel(&self, novel: &Novel) -> Result<(), StoreError> {
        let genres = serde_json::to_string(&novel.genres)?;
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO novels ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            NOVEL_COLUMNS
        );
        conn.execute(
            &sql,
            params![
                novel.id,
                novel.title,
                novel.original_title,
                novel.cover,
                novel.source,
                novel.url,
                novel.summary,
                novel.author,
                novel.status.as_str(),
                genres,
                novel.chapters_count,
                novel.last_read_chapter_number,
                novel.last_read_timestamp,
                novel.last_updated,
                novel.date_added,
            ],
        )
        .map_err(|e| insert_error(e, format!("novel {}", novel.id)))?;
        Ok(())
    }

    fn update_novel(&self, novel: &Novel) -> Result<(), StoreError> {
        let genres = serde_json::to_string(&novel.genres)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE novels SET title = ?2, original_title = ?3, cover = ?4, source = ?5, url = ?6, \
             summary = ?7, author = ?8, status = ?9, genres = ?10, chapters_count = ?11, \
             last_read_timestamp = ?12, last_updated = ?13 \
             WHERE id = ?1",
            params![
                novel.id,
                novel.title,
                novel.original_title,
                novel.cover,
                novel.source,
                novel.url,
                novel.summary,
                novel.author,
                novel.status.as_str(),
                genres,
                novel.chapters_count,
                novel.last_read_timestamp,
                novel.last_updated,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("novel {}", novel.id)));
        }
        Ok(())
    }

    fn delete_novel(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chapters WHERE novel_id = ?1", [id])?;
        let deleted = tx.execute("DELETE FROM novels WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("novel {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    fn update_last_read(&self, novel_id: &str, chapter_number: i64, timestamp: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE novels SET last_read_chapter_number = ?2, last_read_timestamp = ?3 WHERE id = ?1",
            params![novel_id, chapter_number, timestamp],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("novel {}", novel_id)));
        }
        Ok(())
    }

    fn list_chapters(&self, novel_id: &str) -> Result<Vec<Chapter>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM chapters WHERE novel_id = ?1 ORDER BY number",
            CHAPTER_SUMMARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let chapters = stmt
            .query_map([novel_id], chapter_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    fn last_chapter(&self, novel_id: &str) -> Result<Option<Chapter>, StoreError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE novel_id = ?1 ORDER BY number DESC LIMIT 1",
            CHAPTER_COLUMNS
        );
        self.query_chapter(&sql, [novel_id])
    }

    fn chapter_by_number(&self, novel_id: &str, number: i64) -> Result<Option<Chapter>, StoreError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE novel_id = ?1 AND number = ?2",
            CHAPTER_COLUMNS
        );
        self.query_chapter(&sql, params![novel_id, number])
    }

    fn chapter_by_url(&self, novel_id: &str, url: &str) -> Result<Option<Chapter>, StoreError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE novel_id = ?1 AND url = ?2 ORDER BY number LIMIT 1",
            CHAPTER_COLUMNS
        );
        self.query_chapter(&sql, params![novel_id, url])
    }

    fn create_chapter(&self, chapter: &Chapter) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let sql = format!(
            "INSERT INTO chapters ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            CHAPTER_COLUMNS
        );
        tx.execute(
            &sql,
            params![
                chapter.id,
                chapter.novel_id,
                chapter.number,
                chapter.title,
                chapter.original_title,
                chapter.content,
                chapter.date_translated,
                chapter.word_count,
                chapter.url,
                chapter.next_chapter_url,
            ],
        )
        .map_err(|e| {
            insert_error(
                e,
                format!("chapter {} of novel {}", chapter.number, chapter.novel_id),
            )
        })?;

        tx.execute(
            "UPDATE novels SET last_updated = ?2 WHERE id = ?1",
            params![chapter.novel_id, chapter.date_translated],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_chapter(&self, chapter: &Chapter) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE chapters SET number = ?3, title = ?4, original_title = ?5, content = ?6, \
             date_translated = ?7, word_count = ?8, url = ?9, next_chapter_url = ?10 \
             WHERE novel_id = ?1 AND id = ?2",
            params![
                chapter.novel_id,
                chapter.id,
                chapter.number,
                chapter.title,
                chapter.original_title,
                chapter.content,
                chapter.date_translated,
                chapter.word_count,
                chapter.url,
                chapter.next_chapter_url,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!(
                "chapter {} of novel {}",
                chapter.id, chapter.novel_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn novel(id: &str, source: &str, genres: &[&str]) -> Novel {
        Novel {
            id: id.to_string(),
            title: format!("Title {}", id),
            original_title: format!("原题 {}", id),
            cover: String::new(),
            source: source.to_string(),
            url: format!("https://example.com/book/{}.htm", id),
            summary: "<p>Summary</p>".to_string(),
            author: "Author".to_string(),
            status: NovelStatus::Ongoing,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            chapters_count: 10,
            last_read_chapter_number: 0,
            last_read_timestamp: 0,
            last_updated: 100,
            date_added: 100,
        }
    }

    fn chapter(novel_id: &str, number: i64) -> Chapter {
        Chapter {
            id: format!("c{}", number),
            novel_id: novel_id.to_string(),
            number,
            title: format!("Chapter {}", number),
            original_title: String::new(),
            content: "<p>Text</p>".to_string(),
            date_translated: 200 + number,
            word_count: 1,
            url: format!("https://example.com/txt/{}/c{}", novel_id, number),
            next_chapter_url: format!("https://example.com/txt/{}/c{}", novel_id, number + 1),
        }
    }

    #[test]
    fn test_novel_round_trip_and_update() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut n = novel("42", "shuhaige", &["Action", "Drama"]);
        store.create_novel(&n).unwrap();

        assert_eq!(store.get_novel("42").unwrap(), Some(n.clone()));
        assert!(store.get_novel("43").unwrap().is_none());

        n.title = "New".to_string();
        n.status = NovelStatus::Completed;
        store.update_novel(&n).unwrap();
        let stored = store.get_novel("42").unwrap().unwrap();
        assert_eq!(stored.title, "New");
        assert_eq!(stored.status, NovelStatus::Completed);

        store.update_last_read("42", 7, 500).unwrap();
        n.last_read_chapter_number = 1;
        store.update_novel(&n).unwrap();
        assert_eq!(store.get_novel("42").unwrap().unwrap().last_read_chapter_number, 7);

        let missing = novel("missing", "shuhaige", &[]);
        assert!(matches!(store.update_novel(&missing), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_novel_is_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_novel(&novel("42", "shuhaige", &[])).unwrap();
        assert!(matches!(
            store.create_novel(&novel("42", "shuhaige", &[])),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_chapters() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_novel(&novel("n1", "69shuba", &[])).unwrap();
        for number in 1..=3 {
            store.create_chapter(&chapter("n1", number)).unwrap();
        }

        let last = store.last_chapter("n1").unwrap().unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(store.get_novel("n1").unwrap().unwrap().last_updated, 203);
        assert_eq!(store.get_novel("n1").unwrap().unwrap().chapters_count, 10);

        let listed = store.list_chapters("n1").unwrap();
        assert_eq!(listed.iter().map(|c| c.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(listed.iter().all(|c| c.content.is_empty()));

        let by_url = store
            .chapter_by_url("n1", "https://example.com/txt/n1/c2")
            .unwrap()
            .unwrap();
        assert_eq!(by_url.number, 2);
        assert!(store.chapter_by_url("n2", "https://example.com/txt/n1/c2").unwrap().is_none());

        let mut first = store.chapter_by_number("n1", 1).unwrap().unwrap();
        assert_eq!(first.content, "<p>Text</p>");
        first.next_chapter_url = "https://example.com/other".to_string();
        store.update_chapter(&first).unwrap();
        assert_eq!(
            store.chapter_by_number("n1", 1).unwrap().unwrap().next_chapter_url,
            "https://example.com/other"
        );

        assert!(store.last_chapter("n2").unwrap().is_none());
    }

    #[test]
    fn test_chapter_number_unique_per_novel() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_novel(&novel("n1", "69shuba", &[])).unwrap();
        store.create_chapter(&chapter("n1", 1)).unwrap();

        let mut dup = chapter("n1", 1);
        dup.id = "other".to_string();
        assert!(matches!(store.create_chapter(&dup), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_list_filters_and_search() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut a = novel("a", "69shuba", &["Action"]);
        a.date_added = 1;
        a.last_read_timestamp = 50;
        let mut b = novel("b", "syosetu", &["Drama"]);
        b.date_added = 2;
        b.title = "100% Pure_Title".to_string();
        store.create_novel(&a).unwrap();
        store.create_novel(&b).unwrap();

        let all = store.list_novels(&NovelFilter::default()).unwrap();
        assert_eq!(all.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);

        let action = NovelFilter {
            genre: Some("Action".to_string()),
            ..NovelFilter::default()
        };
        assert_eq!(store.list_novels(&action).unwrap().len(), 1);

        let japanese = NovelFilter {
            sources: Some(vec!["syosetu".to_string()]),
            ..NovelFilter::default()
        };
        assert_eq!(store.list_novels(&japanese).unwrap()[0].id, "b");

        let read = NovelFilter {
            order: NovelOrder::RecentlyRead,
            ..NovelFilter::default()
        };
        assert_eq!(store.list_novels(&read).unwrap().len(), 1);

        let limited = NovelFilter {
            limit: Some(1),
            ..NovelFilter::default()
        };
        assert_eq!(store.list_novels(&limited).unwrap().len(), 1);

        assert_eq!(store.search_novels("100%").unwrap().len(), 1);
        assert_eq!(store.search_novels("原题").unwrap().len(), 2);
        assert!(store.search_novels("0%P").unwrap().is_empty());
    }

    #[test]
    fn test_delete_and_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_novel(&novel("n1", "69shuba", &[])).unwrap();
        store.create_chapter(&chapter("n1", 1)).unwrap();
        store.update_last_read("n1", 1, 300).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!((stats.novel_count, stats.chapter_count), (1, 1));
        assert_eq!(store.get_novel("n1").unwrap().unwrap().last_read_chapter_number, 1);

        store.delete_novel("n1").unwrap();
        assert_eq!(store.stats().unwrap().chapter_count, 0);
        assert!(matches!(store.delete_novel("n1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_open_file_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_novel(&novel("n1", "69shuba", &[])).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        store.ping().unwrap();
        assert!(store.get_novel("n1").unwrap().is_some());
    }
}
