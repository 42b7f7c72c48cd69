//! Chapter-advancement and translation pipeline.
//!
//! Each operation runs under a per-key lock for its whole duration:
//!
//! - `extract:<url>` for novel extraction, since no novel id exists yet
//! - `translateChapter:<novel id>` for both chapter operations
//! - `refreshNovel:<novel id>` and `translateChapter:<novel id>` for
//!   refresh and delete, which rewrite or remove the whole novel row
//!
//! A second caller on a held key fails with [`PipelineError::LockBusy`]
//! instead of queuing. The lock is released when the operation returns,
//! fails, or its future is dropped.
//!
//! Store writes are single atomic calls. The genre merge and the refresh
//! forward-pointer backfill are secondary writes whose failure is logged and
//! does not abort the operation; a genre merge may therefore land without
//! the chapter that proposed it.

use crate::error::PipelineError;
use crate::fetcher::PageFetcher;
use crate::lock::{KeyGuard, KeyedLock};
use crate::models::{Chapter, Novel};
use crate::providers::TranslationProvider;
use crate::sources::{Source, SourceRegistry};
use crate::store::NovelStore;
use crate::utils::{count_words, merge_genres};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Collaborators the pipeline is built from.
pub struct PipelineDeps {
    pub store: Arc<dyn NovelStore>,
    pub sources: Arc<SourceRegistry>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub provider: Arc<dyn TranslationProvider>,
    pub locks: Arc<KeyedLock>,
}

/// Coordinates fetching, extraction, translation and persistence.
pub struct TranslationPipeline {
    store: Arc<dyn NovelStore>,
    sources: Arc<SourceRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    provider: Arc<dyn TranslationProvider>,
    locks: Arc<KeyedLock>,
    lock_timeout: Duration,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn require(field: &str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl TranslationPipeline {
    pub fn new(deps: PipelineDeps, lock_timeout: Duration) -> Self {
        Self {
            store: deps.store,
            sources: deps.sources,
            fetcher: deps.fetcher,
            provider: deps.provider,
            locks: deps.locks,
            lock_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn NovelStore> {
        &self.store
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    async fn acquire(&self, key: String) -> Result<KeyGuard, PipelineError> {
        match self.locks.try_acquire(&key, self.lock_timeout).await {
            Some(guard) => {
                debug!(key = guard.key(), "lock acquired");
                Ok(guard)
            }
            None => {
                info!(key = %key, "lock busy");
                Err(PipelineError::LockBusy)
            }
        }
    }

    /// Takes both per-novel keys, always in the same order.
    async fn acquire_novel(&self, novel_id: &str) -> Result<(KeyGuard, KeyGuard), PipelineError> {
        let refresh = self.acquire(format!("refreshNovel:{}", novel_id)).await?;
        let translate = self.acquire(format!("translateChapter:{}", novel_id)).await?;
        Ok((refresh, translate))
    }

    fn source(&self, tag: &str) -> Result<&dyn Source, PipelineError> {
        self.sources
            .get(tag)
            .ok_or_else(|| PipelineError::Adapter(format!("unknown source: {}", tag)))
    }

    fn load_novel(&self, novel_id: &str) -> Result<Novel, PipelineError> {
        self.store
            .get_novel(novel_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("novel {} not found", novel_id)))
    }

    /// Uses supplied content verbatim, fetching only when none was given.
    async fn content(&self, supplied: Option<String>, url: &str) -> Result<String, PipelineError> {
        match supplied {
            Some(html) => Ok(html),
            None => Ok(self.fetcher.fetch(url).await?),
        }
    }

    /// Merges proposed genres into the novel and persists it if anything
    /// changed. Persistence failure is logged, not returned.
    fn merge_novel_genres(&self, novel: &mut Novel, proposed: &[String]) {
        let before = novel.genres.clone();
        merge_genres(&mut novel.genres, proposed);
        if novel.genres == before {
            return;
        }

        if let Err(e) = self.store.update_novel(novel) {
            warn!(novel_id = %novel.id, error = %e, "failed to persist merged genres");
        }
    }

    /// Extracts a novel from its landing page, or returns the stored one if
    /// it was extracted before.
    pub async fn extract_novel_details(
        &self,
        source_url: &str,
        source_tag: &str,
        html_content: Option<String>,
    ) -> Result<Novel, PipelineError> {
        require("url", source_url)?;
        require("source", source_tag)?;
        let _guard = self.acquire(format!("extract:{}", source_url)).await?;

        let source = self.source(source_tag)?;
        let novel_id = source.novel_id(source_url);
        if novel_id.is_empty() {
            return Err(PipelineError::Adapter(format!(
                "unrecognised {} novel URL: {}",
                source_tag, source_url
            )));
        }

        if let Some(existing) = self.store.get_novel(&novel_id)? {
            debug!(novel_id = %novel_id, "novel already extracted");
            return Ok(existing);
        }

        let html = self.content(html_content, source_url).await?;

        let cover = source.cover_image_url(&html).unwrap_or_else(|e| {
            warn!(novel_id = %novel_id, error = %e, "no cover image");
            String::new()
        });

        let details = self.provider.translate_novel_details(&html).await?;

        let mut genres = Vec::new();
        merge_genres(&mut genres, &details.genres);

        let timestamp = now();
        let novel = Novel {
            id: novel_id,
            title: details.title_translated,
            original_title: details.title_original,
            cover,
            source: source_tag.to_string(),
            url: source_url.to_string(),
            summary: details.summary_translated,
            author: details.author_translated,
            status: details.status,
            genres,
            chapters_count: details.number_of_chapters,
            last_read_chapter_number: 0,
            last_read_timestamp: 0,
            last_updated: timestamp,
            date_added: timestamp,
        };
        self.store.create_novel(&novel)?;

        info!(novel_id = %novel.id, title = %novel.title, source = source_tag, "extracted novel");
        Ok(novel)
    }

    /// Translates chapter 1 of a novel, or returns it if it already exists.
    pub async fn translate_first_chapter(
        &self,
        novel_id: &str,
        chapter_url: &str,
        html_content: Option<String>,
    ) -> Result<Chapter, PipelineError> {
        require("novel_id", novel_id)?;
        require("chapter_url", chapter_url)?;
        let _guard = self.acquire(format!("translateChapter:{}", novel_id)).await?;

        if let Some(first) = self.store.chapter_by_number(novel_id, 1)? {
            debug!(novel_id, "first chapter already translated");
            return Ok(first);
        }

        let mut novel = self.load_novel(novel_id)?;
        let source = self.source(&novel.source)?;
        let chapter_id = source.chapter_id(chapter_url);
        if chapter_id.is_empty() {
            return Err(PipelineError::Adapter(format!(
                "unrecognised {} chapter URL: {}",
                novel.source, chapter_url
            )));
        }

        let html = self.content(html_content, chapter_url).await?;
        let next_chapter_url = self.next_link(source, &html, chapter_url);

        let translated = self
            .provider
            .translate_novel_chapter(&novel.genres, &html)
            .await?;
        self.merge_novel_genres(&mut novel, &translated.new_genres);

        let chapter = Chapter {
            id: chapter_id,
            novel_id: novel.id.clone(),
            number: 1,
            title: translated.title_translated,
            original_title: translated.title_original,
            word_count: count_words(&translated.content_translated),
            content: translated.content_translated,
            date_translated: now(),
            url: chapter_url.to_string(),
            next_chapter_url,
        };
        self.store.create_chapter(&chapter)?;

        info!(novel_id, chapter_id = %chapter.id, "translated first chapter");
        Ok(chapter)
    }

    /// Translates the chapter after the last stored one, following its
    /// forward pointer.
    pub async fn translate_chapter(
        &self,
        novel_id: &str,
        html_content: Option<String>,
    ) -> Result<Chapter, PipelineError> {
        require("novel_id", novel_id)?;
        let _guard = self.acquire(format!("translateChapter:{}", novel_id)).await?;

        let mut novel = self.load_novel(novel_id)?;
        let last = self.store.last_chapter(novel_id)?.ok_or_else(|| {
            PipelineError::NotFound(format!(
                "novel {} has no chapters; translate the first chapter first",
                novel_id
            ))
        })?;

        let chapter_url = last.next_chapter_url.clone();
        if chapter_url.trim().is_empty() {
            return Err(PipelineError::NotFound(format!(
                "no next chapter known after chapter {} of novel {}",
                last.number, novel_id
            )));
        }

        if let Some(existing) = self.store.chapter_by_url(novel_id, &chapter_url)? {
            debug!(novel_id, url = %chapter_url, "chapter already translated");
            return Ok(existing);
        }

        let source = self.source(&novel.source)?;
        let chapter_id = source.chapter_id(&chapter_url);
        if chapter_id.is_empty() {
            return Err(PipelineError::Adapter(format!(
                "unrecognised {} chapter URL: {}",
                novel.source, chapter_url
            )));
        }

        let html = self.content(html_content, &chapter_url).await?;
        let next_chapter_url = self.next_link(source, &html, &chapter_url);

        let translated = self
            .provider
            .translate_novel_chapter(&novel.genres, &html)
            .await?;
        self.merge_novel_genres(&mut novel, &translated.new_genres);

        let chapter = Chapter {
            id: chapter_id,
            novel_id: novel.id.clone(),
            number: last.number + 1,
            title: translated.title_translated,
            original_title: translated.title_original,
            word_count: count_words(&translated.content_translated),
            content: translated.content_translated,
            date_translated: now(),
            url: chapter_url,
            next_chapter_url,
        };
        self.store.create_chapter(&chapter)?;

        info!(novel_id, number = chapter.number, chapter_id = %chapter.id, "translated chapter");
        Ok(chapter)
    }

    /// Re-reads a novel's landing page and overwrites its metadata.
    ///
    /// When the reported chapter count grew, the last stored chapter's page
    /// is fetched again to pick up a next link published since.
    pub async fn refresh_novel(
        &self,
        novel_id: &str,
        html_content: Option<String>,
    ) -> Result<Novel, PipelineError> {
        require("novel_id", novel_id)?;
        let (_refresh, _translate) = self.acquire_novel(novel_id).await?;

        let mut novel = self.load_novel(novel_id)?;
        let source = self.source(&novel.source)?;
        let html = self.content(html_content, &novel.url).await?;

        let cover = match source.cover_image_url(&html) {
            Ok(cover) => cover,
            Err(e) => {
                warn!(novel_id, error = %e, "no cover image, keeping stored one");
                novel.cover.clone()
            }
        };
        let details = self.provider.translate_novel_details(&html).await?;

        if details.number_of_chapters > novel.chapters_count {
            info!(
                novel_id,
                stored = novel.chapters_count,
                reported = details.number_of_chapters,
                "new chapters published upstream"
            );
            if let Err(e) = self.backfill_next_link(source, novel_id).await {
                warn!(novel_id, error = %e, "failed to backfill next chapter link");
            }
        }

        let timestamp = now();
        novel.title = details.title_translated;
        novel.original_title = details.title_original;
        novel.summary = details.summary_translated;
        novel.cover = cover;
        novel.author = details.author_translated;
        novel.status = details.status;
        novel.chapters_count = details.number_of_chapters;
        novel.last_updated = timestamp;
        novel.last_read_timestamp = timestamp;
        self.store.update_novel(&novel)?;

        info!(novel_id, "refreshed novel");
        self.load_novel(novel_id)
    }

    /// Deletes a novel and its chapters, holding both per-novel keys.
    pub async fn delete_novel(&self, novel_id: &str) -> Result<(), PipelineError> {
        require("novel_id", novel_id)?;
        let (_refresh, _translate) = self.acquire_novel(novel_id).await?;

        self.load_novel(novel_id)?;
        self.store.delete_novel(novel_id)?;
        info!(novel_id, "deleted novel");
        Ok(())
    }

    /// Extracts the next chapter link, treating a miss as "not yet known".
    fn next_link(&self, source: &dyn Source, html: &str, current_url: &str) -> String {
        match source.next_chapter_url(html, current_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = current_url, error = %e, "next chapter link not found");
                String::new()
            }
        }
    }

    async fn backfill_next_link(&self, source: &dyn Source, novel_id: &str) -> Result<(), PipelineError> {
        let Some(mut last) = self.store.last_chapter(novel_id)? else {
            return Ok(());
        };

        let html = self.fetcher.fetch(&last.url).await?;
        let next = source.next_chapter_url(&html, &last.url)?;
        if next == last.next_chapter_url {
            return Ok(());
        }

        info!(novel_id, number = last.number, next = %next, "backfilled next chapter link");
        last.next_chapter_url = next;
        self.store.update_chapter(&last)?;
        Ok(())
    }
}
