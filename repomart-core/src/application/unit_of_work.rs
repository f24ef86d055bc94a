use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::database::memory::MemoryStore;
use crate::database::ports::{
    catalog::CatalogRepository, comments::CommentsRepository,
    orders::OrdersRepository, payouts::PayoutsRepository,
    reports::ReportsRepository, reviews::ReviewsRepository,
    search_history::SearchHistoryRepository, sellers::SellersRepository,
    sessions::SessionsRepository, users::UsersRepository,
};
use crate::database::postgres::PostgresDatabase;

/// Aggregates all repository ports used by application services.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub users: Arc<dyn UsersRepository>,
    pub sessions: Arc<dyn SessionsRepository>,
    pub sellers: Arc<dyn SellersRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub search_history: Arc<dyn SearchHistoryRepository>,
    pub orders: Arc<dyn OrdersRepository>,
    pub payouts: Arc<dyn PayoutsRepository>,
    pub comments: Arc<dyn CommentsRepository>,
    pub reviews: Arc<dyn ReviewsRepository>,
    pub reports: Arc<dyn ReportsRepository>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("users", &type_name_of_val(self.users.as_ref()))
            .field("sessions", &type_name_of_val(self.sessions.as_ref()))
            .field("sellers", &type_name_of_val(self.sellers.as_ref()))
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .field(
                "search_history",
                &type_name_of_val(self.search_history.as_ref()),
            )
            .field("orders", &type_name_of_val(self.orders.as_ref()))
            .field("payouts", &type_name_of_val(self.payouts.as_ref()))
            .field("comments", &type_name_of_val(self.comments.as_ref()))
            .field("reviews", &type_name_of_val(self.reviews.as_ref()))
            .field("reports", &type_name_of_val(self.reports.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    /// Wire every port to its PostgreSQL repository.
    pub fn from_postgres(db: &PostgresDatabase) -> Self {
        Self {
            users: Arc::new(db.users_repository()),
            sessions: Arc::new(db.sessions_repository()),
            sellers: Arc::new(db.sellers_repository()),
            catalog: Arc::new(db.catalog_repository()),
            search_history: Arc::new(db.search_history_repository()),
            orders: Arc::new(db.orders_repository()),
            payouts: Arc::new(db.payouts_repository()),
            comments: Arc::new(db.comments_repository()),
            reviews: Arc::new(db.reviews_repository()),
            reports: Arc::new(db.reports_repository()),
        }
    }

    /// Wire every port to the same in-process store.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            sellers: store.clone(),
            catalog: store.clone(),
            search_history: store.clone(),
            orders: store.clone(),
            payouts: store.clone(),
            comments: store.clone(),
            reviews: store.clone(),
            reports: store,
        }
    }
}
