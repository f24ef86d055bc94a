macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions shared by the server and its clients
pub mod v1 {
    pub const ROOT: &str = "/api/v1";

    pub mod auth {
        pub const REGISTER: &str = v1_path!("/auth/register");
        pub const LOGIN: &str = v1_path!("/auth/login");
        pub const LOGOUT: &str = v1_path!("/auth/logout");
        pub const LOGOUT_ALL: &str = v1_path!("/auth/logout-all");
        pub const ME: &str = v1_path!("/auth/me");
        pub const CHANGE_PASSWORD: &str = v1_path!("/auth/password");
    }

    pub mod sellers {
        pub const ONBOARD: &str = v1_path!("/sellers/onboard");
        pub const PROFILE: &str = v1_path!("/sellers/me");
        pub const DASHBOARD: &str = v1_path!("/sellers/me/dashboard");
        pub const LISTINGS: &str = v1_path!("/sellers/me/repos");
        pub const PAYOUTS: &str = v1_path!("/sellers/me/payouts");
        pub const LEDGER: &str = v1_path!("/sellers/me/ledger");
        pub const STOREFRONT: &str = v1_path!("/stores/{store_name}");
    }

    pub mod repos {
        pub const COLLECTION: &str = v1_path!("/repos");
        pub const ITEM: &str = v1_path!("/repos/{id}");
        pub const COMMENTS: &str = v1_path!("/repos/{id}/comments");
        pub const REVIEWS: &str = v1_path!("/repos/{id}/reviews");
        pub const LIBRARY: &str = v1_path!("/library");
    }

    pub mod search {
        pub const HISTORY: &str = v1_path!("/search/history");
        pub const HISTORY_ITEM: &str = v1_path!("/search/history/{id}");
        pub const TRENDING: &str = v1_path!("/search/trending");
    }

    pub mod orders {
        pub const CHECKOUT: &str = v1_path!("/checkout");
        pub const COLLECTION: &str = v1_path!("/orders");
        pub const ITEM: &str = v1_path!("/orders/{id}");
        pub const CONFIRM: &str = v1_path!("/orders/{id}/confirm");
        pub const WEBHOOK: &str = v1_path!("/payments/webhook");
    }

    pub mod comments {
        pub const ITEM: &str = v1_path!("/comments/{id}");
        pub const VOTE: &str = v1_path!("/comments/{id}/vote");
        pub const FLAG: &str = v1_path!("/comments/{id}/flag");
        pub const UNFLAG: &str = v1_path!("/comments/{id}/unflag");
    }

    pub mod reviews {
        pub const ITEM: &str = v1_path!("/reviews/{id}");
        pub const FLAG: &str = v1_path!("/reviews/{id}/flag");
        pub const UNFLAG: &str = v1_path!("/reviews/{id}/unflag");
    }

    pub mod moderation {
        pub const QUEUE: &str = v1_path!("/moderation/queue");
    }

    pub mod admin {
        pub const OVERVIEW: &str = v1_path!("/admin/overview");
        pub const SALES: &str = v1_path!("/admin/sales");
        pub const TOP_SELLERS: &str = v1_path!("/admin/top-sellers");
        pub const TOP_REPOSITORIES: &str = v1_path!("/admin/top-repositories");
        pub const USERS: &str = v1_path!("/admin/users");
        pub const USER_ROLE: &str = v1_path!("/admin/users/{id}/role");
        pub const USER_BAN: &str = v1_path!("/admin/users/{id}/ban");
        pub const USER_UNBAN: &str = v1_path!("/admin/users/{id}/unban");
        pub const PAYOUTS: &str = v1_path!("/admin/payouts");
        pub const PAYOUT_APPROVE: &str = v1_path!("/admin/payouts/{id}/approve");
        pub const PAYOUT_REJECT: &str = v1_path!("/admin/payouts/{id}/reject");
        pub const ORDER_REFUND: &str = v1_path!("/admin/orders/{id}/refund");
        pub const PURGE_SESSIONS: &str = v1_path!("/admin/sessions/purge");
    }
}

/// Helpers for filling route templates on the client side.
pub mod utils {
    /// Replace a single path parameter (e.g. `"{id}"`) with the provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }

    /// Append query parameters to the provided route.
    pub fn with_query(route: &str, params: &[(&str, &str)]) -> String {
        if params.is_empty() {
            return route.to_string();
        }
        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{route}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_fill_parameters() {
        let path = utils::replace_param(v1::repos::COMMENTS, "{id}", "abc");
        assert_eq!(path, "/api/v1/repos/abc/comments");
        assert_eq!(
            utils::with_query(v1::repos::COLLECTION, &[("q", "cli"), ("page", "2")]),
            "/api/v1/repos?q=cli&page=2"
        );
        assert_eq!(utils::with_query(v1::search::TRENDING, &[]), v1::search::TRENDING);
    }
}
