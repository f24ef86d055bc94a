use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::{
    AccessGrant, RepoId, RepoListing, SearchEntryId, SearchHistoryEntry,
    TrendingQuery, UserId,
};

use super::{MemoryStore, newest_first, take};
use crate::catalog::filter::CatalogFilter;
use crate::database::ports::catalog::CatalogRepository;
use crate::database::ports::search_history::SearchHistoryRepository;
use crate::error::{CoreError, Result};

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_repo(&self, repo: &RepoListing) -> Result<()> {
        let mut state = self.lock();
        if state
            .repos
            .iter()
            .any(|r| r.seller_id == repo.seller_id && r.slug == repo.slug)
        {
            return Err(CoreError::conflict(
                "A repository with this slug already exists",
            ));
        }
        state.repos.push(repo.clone());
        Ok(())
    }

    async fn get_repo(&self, id: RepoId) -> Result<Option<RepoListing>> {
        Ok(self.lock().repos.iter().find(|r| r.id == id).cloned())
    }

    async fn update_repo(&self, repo: &RepoListing) -> Result<()> {
        let mut state = self.lock();
        let stored = state.repo_mut(repo.id)?;
        stored.title = repo.title.clone();
        stored.description = repo.description.clone();
        stored.language = repo.language.clone();
        stored.tags = repo.tags.clone();
        stored.price = repo.price;
        stored.visibility = repo.visibility;
        stored.source_url = repo.source_url.clone();
        stored.updated_at = repo.updated_at;
        Ok(())
    }

    async fn delete_repo(&self, id: RepoId) -> Result<()> {
        let mut state = self.lock();
        let before = state.repos.len();
        state.repos.retain(|r| r.id != id);
        if state.repos.len() == before {
            return Err(CoreError::not_found("Repository"));
        }
        let removed: Vec<_> = state
            .comments
            .iter()
            .filter(|c| c.repo_id == id)
            .map(|c| c.id)
            .collect();
        state.votes.retain(|(comment_id, _), _| !removed.contains(comment_id));
        state.comments.retain(|c| c.repo_id != id);
        state.reviews.retain(|r| r.repo_id != id);
        state.access.retain(|g| g.repo_id != id);
        state.orders.retain(|o| o.repo_id != id);
        Ok(())
    }

    async fn slugs_with_prefix(
        &self,
        seller_id: UserId,
        prefix: &str,
    ) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .repos
            .iter()
            .filter(|r| r.seller_id == seller_id && r.slug.starts_with(prefix))
            .map(|r| r.slug.clone())
            .collect())
    }

    async fn search(&self, filter: &CatalogFilter) -> Result<(Vec<RepoListing>, i64)> {
        let state = self.lock();
        let mut matches: Vec<RepoListing> = state
            .repos
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(state);

        filter.sort(&mut matches);
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(take(filter.offset()))
            .take(take(filter.per_page))
            .collect();
        Ok((page, total))
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<RepoListing>> {
        let state = self.lock();
        Ok(newest_first(
            &state.repos,
            |r| r.seller_id == seller_id,
            |r| r.created_at,
        ))
    }

    async fn has_access(&self, user_id: UserId, repo_id: RepoId) -> Result<bool> {
        Ok(self
            .lock()
            .access
            .iter()
            .any(|g| g.user_id == user_id && g.repo_id == repo_id))
    }

    async fn grant_access(&self, grant: &AccessGrant) -> Result<bool> {
        let mut state = self.lock();
        if !state.repos.iter().any(|r| r.id == grant.repo_id) {
            return Err(CoreError::not_found("Repository"));
        }
        if state
            .access
            .iter()
            .any(|g| g.user_id == grant.user_id && g.repo_id == grant.repo_id)
        {
            return Ok(false);
        }
        state.access.push(grant.clone());
        Ok(true)
    }

    async fn access_count(&self, repo_id: RepoId) -> Result<i64> {
        Ok(self
            .lock()
            .access
            .iter()
            .filter(|g| g.repo_id == repo_id)
            .count() as i64)
    }

    async fn list_owned(&self, user_id: UserId) -> Result<Vec<RepoListing>> {
        let state = self.lock();
        let grants = newest_first(
            &state.access,
            |g| g.user_id == user_id,
            |g| g.granted_at,
        );
        Ok(grants
            .iter()
            .filter_map(|g| state.repos.iter().find(|r| r.id == g.repo_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SearchHistoryRepository for MemoryStore {
    async fn record(
        &self,
        user_id: UserId,
        query: &str,
        filters: &serde_json::Value,
        at: DateTime<Utc>,
        cap: i64,
    ) -> Result<SearchHistoryEntry> {
        let mut state = self.lock();

        let latest = state
            .searches
            .iter_mut()
            .filter(|e| e.user_id == user_id)
            .max_by_key(|e| e.searched_at);
        if let Some(entry) = latest
            && entry.query == query
        {
            entry.searched_at = at;
            entry.filters = filters.clone();
            return Ok(entry.clone());
        }

        let entry = SearchHistoryEntry {
            id: SearchEntryId::new(),
            user_id,
            query: query.to_string(),
            filters: filters.clone(),
            searched_at: at,
        };
        state.searches.push(entry.clone());

        let keep: Vec<SearchEntryId> = newest_first(
            &state.searches,
            |e| e.user_id == user_id,
            |e| e.searched_at,
        )
        .into_iter()
        .take(take(cap))
        .map(|e| e.id)
        .collect();
        state
            .searches
            .retain(|e| e.user_id != user_id || keep.contains(&e.id));
        Ok(entry)
    }

    async fn recent(&self, user_id: UserId, limit: i64) -> Result<Vec<SearchHistoryEntry>> {
        let state = self.lock();
        let mut entries =
            newest_first(&state.searches, |e| e.user_id == user_id, |e| e.searched_at);
        entries.truncate(take(limit));
        Ok(entries)
    }

    async fn clear(&self, user_id: UserId) -> Result<u64> {
        let mut state = self.lock();
        let before = state.searches.len();
        state.searches.retain(|e| e.user_id != user_id);
        Ok((before - state.searches.len()) as u64)
    }

    async fn delete_entry(&self, user_id: UserId, id: SearchEntryId) -> Result<bool> {
        let mut state = self.lock();
        let before = state.searches.len();
        state
            .searches
            .retain(|e| !(e.user_id == user_id && e.id == id));
        Ok(state.searches.len() != before)
    }

    async fn trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TrendingQuery>> {
        let state = self.lock();
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for entry in state.searches.iter().filter(|e| e.searched_at >= since) {
            *counts.entry(entry.query.as_str()).or_default() += 1;
        }
        let mut trending: Vec<TrendingQuery> = counts
            .into_iter()
            .map(|(query, searches)| TrendingQuery {
                query: query.to_string(),
                searches,
            })
            .collect();
        trending.sort_by(|a, b| {
            b.searches.cmp(&a.searches).then_with(|| a.query.cmp(&b.query))
        });
        trending.truncate(take(limit));
        Ok(trending)
    }
}
