use std::sync::{Arc, LazyLock};

use regex::Regex;
use repomart_model::{
    CatalogQuery, Cents, Page, RepoDraft, RepoId, RepoListing, RepoPatch, User,
    Visibility,
};
use tracing::{info, warn};
use url::Url;

use super::filter::{CatalogFilter, parse_tags};
use super::slug::{slugify, unique_slug};
use crate::application::unit_of_work::AppUnitOfWork;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::search_history::SearchHistoryService;
use crate::settings::MarketplaceSettings;

const MAX_DESCRIPTION_LEN: usize = 20_000;
const MAX_LANGUAGE_LEN: usize = 40;
const MAX_TAGS: usize = 10;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]{1,32}$").expect("tag pattern is valid")
});

#[derive(Debug, Clone)]
pub struct CatalogService {
    uow: Arc<AppUnitOfWork>,
    settings: Arc<MarketplaceSettings>,
    clock: Arc<dyn Clock>,
    history: SearchHistoryService,
}

/// Listing fields after validation.
struct ValidListing {
    title: String,
    description: String,
    language: String,
    tags: Vec<String>,
    price: Cents,
    visibility: Visibility,
    source_url: Option<String>,
}

impl CatalogService {
    pub fn new(
        uow: Arc<AppUnitOfWork>,
        settings: Arc<MarketplaceSettings>,
        clock: Arc<dyn Clock>,
        history: SearchHistoryService,
    ) -> Self {
        Self {
            uow,
            settings,
            clock,
            history,
        }
    }

    fn validate(&self, draft: RepoDraft) -> Result<ValidListing> {
        let title = draft.title.trim().to_string();
        let title_len = title.chars().count();
        if !(3..=120).contains(&title_len) {
            return Err(CoreError::validation(
                "Title must be between 3 and 120 characters",
            ));
        }

        let description = draft.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(CoreError::validation(format!(
                "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let language = draft.language.trim().to_string();
        if language.is_empty() || language.chars().count() > MAX_LANGUAGE_LEN {
            return Err(CoreError::validation(format!(
                "Language must be between 1 and {MAX_LANGUAGE_LEN} characters"
            )));
        }

        let tags = parse_tags(&draft.tags.join(","));
        if tags.is_empty() || tags.len() > MAX_TAGS {
            return Err(CoreError::validation(format!(
                "Between 1 and {MAX_TAGS} tags are required"
            )));
        }
        if let Some(bad) = tags.iter().find(|tag| !TAG_PATTERN.is_match(tag)) {
            return Err(CoreError::validation(format!(
                "Invalid tag '{bad}': use up to 32 lowercase letters, digits or hyphens"
            )));
        }

        let price = draft.price;
        let (min, max) = (self.settings.min_price, self.settings.max_price);
        if !price.is_zero() && (price < min || price > max) {
            return Err(CoreError::validation(format!(
                "Price must be 0 or between {min} and {max}"
            )));
        }

        let source_url = match draft.source_url.map(|u| u.trim().to_string()) {
            Some(raw) if !raw.is_empty() => {
                let url = Url::parse(&raw).map_err(|_| {
                    CoreError::validation("source_url must be a valid URL")
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(CoreError::validation(
                        "source_url must use http or https",
                    ));
                }
                Some(url.to_string())
            }
            _ => None,
        };

        Ok(ValidListing {
            title,
            description,
            language,
            tags,
            price,
            visibility: draft.visibility,
            source_url,
        })
    }

    fn require_seller(user: &User) -> Result<()> {
        if !user.role.is_seller() {
            return Err(CoreError::forbidden("Seller account required"));
        }
        Ok(())
    }

    async fn owned_repo(&self, seller: &User, repo_id: RepoId) -> Result<RepoListing> {
        let repo = self
            .uow
            .catalog
            .get_repo(repo_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Repository"))?;
        if repo.seller_id != seller.id {
            return Err(CoreError::forbidden("Only the owner can modify this repository"));
        }
        Ok(repo)
    }

    pub async fn create(&self, seller: &User, draft: RepoDraft) -> Result<RepoListing> {
        Self::require_seller(seller)?;
        let valid = self.validate(draft)?;

        let base = slugify(&valid.title);
        let taken = self.uow.catalog.slugs_with_prefix(seller.id, &base).await?;
        let now = self.clock.now();
        let repo = RepoListing {
            id: RepoId::new(),
            seller_id: seller.id,
            slug: unique_slug(&base, &taken),
            title: valid.title,
            description: valid.description,
            language: valid.language,
            tags: valid.tags,
            price: valid.price,
            visibility: valid.visibility,
            source_url: valid.source_url,
            sales_count: 0,
            revenue: Cents::ZERO,
            rating_avg: None,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.uow.catalog.insert_repo(&repo).await?;
        info!(repo_id = %repo.id, seller_id = %seller.id, slug = %repo.slug, "repository listed");
        Ok(repo)
    }

    /// Apply a partial update. The slug stays stable across title changes.
    pub async fn update(
        &self,
        seller: &User,
        repo_id: RepoId,
        patch: RepoPatch,
    ) -> Result<RepoListing> {
        let mut repo = self.owned_repo(seller, repo_id).await?;

        let merged = RepoDraft {
            title: patch.title.unwrap_or_else(|| repo.title.clone()),
            description: patch.description.unwrap_or_else(|| repo.description.clone()),
            language: patch.language.unwrap_or_else(|| repo.language.clone()),
            tags: patch.tags.unwrap_or_else(|| repo.tags.clone()),
            price: patch.price.unwrap_or(repo.price),
            visibility: patch.visibility.unwrap_or(repo.visibility),
            source_url: patch.source_url.or_else(|| repo.source_url.clone()),
        };
        let valid = self.validate(merged)?;

        repo.title = valid.title;
        repo.description = valid.description;
        repo.language = valid.language;
        repo.tags = valid.tags;
        repo.price = valid.price;
        repo.visibility = valid.visibility;
        repo.source_url = valid.source_url;
        repo.updated_at = self.clock.now();

        self.uow.catalog.update_repo(&repo).await?;
        Ok(repo)
    }

    /// Remove a listing. Listings that anyone holds access to are made
    /// private instead so existing buyers keep their copy. Returns the
    /// listing when it was retained.
    pub async fn delete(
        &self,
        seller: &User,
        repo_id: RepoId,
    ) -> Result<Option<RepoListing>> {
        let mut repo = self.owned_repo(seller, repo_id).await?;

        let holders = self.uow.catalog.access_count(repo_id).await?;
        if repo.sales_count > 0 || holders > 0 {
            repo.visibility = Visibility::Private;
            repo.updated_at = self.clock.now();
            self.uow.catalog.update_repo(&repo).await?;
            info!(repo_id = %repo.id, holders, "repository retained as private");
            return Ok(Some(repo));
        }

        self.uow.catalog.delete_repo(repo_id).await?;
        info!(repo_id = %repo_id, "repository deleted");
        Ok(None)
    }

    /// Private listings resolve only for the owner, access holders and
    /// staff; everyone else gets `NotFound`.
    pub async fn get(&self, repo_id: RepoId, viewer: Option<&User>) -> Result<RepoListing> {
        let repo = self
            .uow
            .catalog
            .get_repo(repo_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Repository"))?;

        if repo.visibility != Visibility::Private {
            return Ok(repo);
        }
        if let Some(user) = viewer {
            if user.id == repo.seller_id || user.role.can_moderate() {
                return Ok(repo);
            }
            if self.uow.catalog.has_access(user.id, repo_id).await? {
                return Ok(repo);
            }
        }
        Err(CoreError::not_found("Repository"))
    }

    pub async fn search(
        &self,
        query: &CatalogQuery,
        viewer: Option<&User>,
    ) -> Result<Page<RepoListing>> {
        let filter = CatalogFilter::from_query(query, viewer)?;
        let (items, total) = self.uow.catalog.search(&filter).await?;

        if let (Some(user), Some(text)) = (viewer, filter.text.as_deref())
            && let Err(err) = self
                .history
                .record(user, text, filter.history_filters())
                .await
        {
            warn!(user_id = %user.id, error = %err, "failed to record search history");
        }

        Ok(Page {
            items,
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    /// Listings the user holds access to.
    pub async fn list_owned(&self, user: &User) -> Result<Vec<RepoListing>> {
        self.uow.catalog.list_owned(user.id).await
    }

    /// The seller's own listings, every visibility.
    pub async fn list_mine(&self, seller: &User) -> Result<Vec<RepoListing>> {
        Self::require_seller(seller)?;
        self.uow.catalog.list_by_seller(seller.id).await
    }

    pub async fn has_access(&self, user: &User, repo_id: RepoId) -> Result<bool> {
        self.uow.catalog.has_access(user.id, repo_id).await
    }
}

#[cfg(test)]
mod tests {
    use repomart_model::SortOrder;

    use super::*;
    use crate::test_support::TestMarket;

    fn draft(title: &str, price: i64) -> RepoDraft {
        RepoDraft {
            title: title.into(),
            description: "Batteries included".into(),
            language: "Rust".into(),
            tags: vec!["CLI".into(), "cli".into(), "tooling".into()],
            price: Cents(price),
            visibility: Visibility::Public,
            source_url: Some("https://example.com/src".into()),
        }
    }

    #[tokio::test]
    async fn create_normalizes_and_slugs() {
        let market = TestMarket::new();
        let seller = market.seller("ada").await;

        let first = market.catalog.create(&seller, draft("Fast Parser", 500)).await.unwrap();
        let second = market.catalog.create(&seller, draft("Fast  Parser!", 700)).await.unwrap();

        assert_eq!(first.slug, "fast-parser");
        assert_eq!(second.slug, "fast-parser-2");
        assert_eq!(first.tags, vec!["cli", "tooling"]);
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let market = TestMarket::new();
        let seller = market.seller("val").await;

        let cases = [
            draft("ab", 500),
            draft("Okay title", 50),
            draft("Okay title", 2_000_000),
            RepoDraft { tags: vec![], ..draft("Okay title", 500) },
            RepoDraft { tags: vec!["bad tag".into()], ..draft("Okay title", 500) },
            RepoDraft { language: " ".into(), ..draft("Okay title", 500) },
            RepoDraft { source_url: Some("ftp://x.org".into()), ..draft("Okay title", 500) },
        ];
        for case in cases {
            assert!(matches!(
                market.catalog.create(&seller, case).await,
                Err(CoreError::Validation(_))
            ));
        }
        assert!(market.catalog.create(&seller, draft("Free thing", 0)).await.is_ok());

        let buyer = market.buyer("notaseller").await;
        assert!(matches!(
            market.catalog.create(&buyer, draft("Some repo", 500)).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn only_owner_can_update() {
        let market = TestMarket::new();
        let seller = market.seller("owner").await;
        let intruder = market.seller("intruder").await;
        let repo = market.listing(&seller, "Owned Repo", 500).await;

        let patch = RepoPatch { price: Some(Cents(900)), ..Default::default() };
        assert!(matches!(
            market.catalog.update(&intruder, repo.id, patch.clone()).await,
            Err(CoreError::Forbidden(_))
        ));
        let updated = market.catalog.update(&seller, repo.id, patch).await.unwrap();
        assert_eq!(updated.price, Cents(900));
        assert_eq!(updated.slug, repo.slug);
    }

    #[tokio::test]
    async fn private_listings_are_hidden() {
        let market = TestMarket::new();
        let seller = market.seller("hider").await;
        let repo = market.listing(&seller, "Secret Sauce", 500).await;
        market
            .catalog
            .update(
                &seller,
                repo.id,
                RepoPatch { visibility: Some(Visibility::Private), ..Default::default() },
            )
            .await
            .unwrap();

        let stranger = market.buyer("stranger").await;
        let moderator = market.moderator("mod").await;
        assert!(matches!(
            market.catalog.get(repo.id, Some(&stranger)).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(market.catalog.get(repo.id, None).await.is_err());
        assert!(market.catalog.get(repo.id, Some(&seller)).await.is_ok());
        assert!(market.catalog.get(repo.id, Some(&moderator)).await.is_ok());
    }

    #[tokio::test]
    async fn delete_keeps_listings_with_holders() {
        let market = TestMarket::new();
        let seller = market.seller("deleter").await;
        let buyer = market.buyer("holder").await;
        let sold = market.listing(&seller, "Sold Repo", 0).await;
        let unsold = market.listing(&seller, "Unsold Repo", 500).await;
        market.checkout.start_checkout(&buyer, sold.id).await.unwrap();

        let retained = market.catalog.delete(&seller, sold.id).await.unwrap();
        assert_eq!(retained.map(|r| r.visibility), Some(Visibility::Private));
        assert!(market.catalog.get(sold.id, Some(&buyer)).await.is_ok());

        assert!(market.catalog.delete(&seller, unsold.id).await.unwrap().is_none());
        assert!(matches!(
            market.catalog.get(unsold.id, Some(&seller)).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_filters_sorts_and_records_history() {
        let market = TestMarket::new();
        let seller = market.seller("searcher").await;
        market.listing(&seller, "Async Runtime", 900).await;
        market.listing(&seller, "Async Logger", 100).await;
        market.listing(&seller, "Image Codec", 500).await;
        let viewer = market.buyer("looker").await;

        let query = CatalogQuery {
            q: Some("  async ".into()),
            sort: SortOrder::PriceAsc,
            ..Default::default()
        };
        let page = market.catalog.search(&query, Some(&viewer)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "Async Logger");

        let history = market.search_history.recent(&viewer, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "async");

        let paged = CatalogQuery { per_page: Some(1), page: Some(2), ..Default::default() };
        let page = market.catalog.search(&paged, None).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages(), 3);

        let beyond = CatalogQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        let page = market.catalog.search(&beyond, None).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }
}
