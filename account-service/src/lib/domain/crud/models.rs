use std::fmt;

use crate::user::errors::UserError;

/// A persisted resource that can be served by the generic CRUD layer.
pub trait Resource: Send + Sync + 'static {
    /// Identifier used in `/:id` routes.
    type Id: fmt::Display + Send + Sync + 'static;
    /// Input accepted by `create_one`.
    type Create: Send + 'static;
    /// Partial update accepted by `update_one`.
    type Patch: Send + 'static;

    /// Lower-case singular name, used in logs.
    const NAME: &'static str;

    /// Public field names a listing may be sorted by.
    const SORTABLE: &'static [&'static str];
}

/// One sort criterion, in the order given by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Paging and ordering applied by a store when listing resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    pub sort: Vec<SortKey>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    /// Build a query from raw request parameters.
    ///
    /// `sort` is a comma separated list of field names, each optionally
    /// prefixed with `-` for descending order (`-createdAt,name`).
    ///
    /// # Arguments
    /// * `page` - Requested page, defaults to 1
    /// * `limit` - Page size, defaults to 100 and is capped at 1000
    /// * `sort` - Raw sort expression
    /// * `sortable` - Fields the resource allows sorting by
    ///
    /// # Errors
    /// * `Validation` - Zero page/limit or a field outside `sortable`
    pub fn parse(
        page: Option<u32>,
        limit: Option<u32>,
        sort: Option<&str>,
        sortable: &[&str],
    ) -> Result<Self, UserError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(UserError::Validation("page must be at least 1".to_string()));
        }

        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit == 0 {
            return Err(UserError::Validation("limit must be at least 1".to_string()));
        }

        let mut keys = Vec::new();
        for raw in sort.unwrap_or_default().split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (field, descending) = match raw.strip_prefix('-') {
                Some(field) => (field, true),
                None => (raw, false),
            };
            if !sortable.contains(&field) {
                return Err(UserError::Validation(format!(
                    "Cannot sort by '{}'",
                    field
                )));
            }
            keys.push(SortKey {
                field: field.to_string(),
                descending,
            });
        }

        Ok(Self {
            page,
            limit: limit.min(Self::MAX_LIMIT),
            sort: keys,
        })
    }

    /// Number of records to skip before the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
            sort: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[&str] = &["name", "createdAt"];

    #[test]
    fn test_defaults() {
        let query = ListQuery::parse(None, None, None, SORTABLE).unwrap();
        assert_eq!(query, ListQuery::default());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_limit_is_capped_and_offset_follows_page() {
        let query = ListQuery::parse(Some(3), Some(5000), None, SORTABLE).unwrap();
        assert_eq!(query.limit, ListQuery::MAX_LIMIT);
        assert_eq!(query.offset(), 2000);
    }

    #[test]
    fn test_sort_keys_keep_order_and_direction() {
        let query = ListQuery::parse(None, None, Some("-createdAt, name"), SORTABLE).unwrap();
        assert_eq!(
            query.sort,
            vec![
                SortKey {
                    field: "createdAt".to_string(),
                    descending: true
                },
                SortKey {
                    field: "name".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_sort_field_and_zero_values() {
        assert!(matches!(
            ListQuery::parse(None, None, Some("password"), SORTABLE),
            Err(UserError::Validation(_))
        ));
        assert!(ListQuery::parse(Some(0), None, None, SORTABLE).is_err());
        assert!(ListQuery::parse(None, Some(0), None, SORTABLE).is_err());
    }
}
