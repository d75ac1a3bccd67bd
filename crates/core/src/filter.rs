//! List filter shared by every `find_*` / `count_*` store operation.

use crate::design::FrameVisibility;

/// Selection and pagination for store queries. Unset fields do not
/// constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub id: Option<String>,
    pub short_id: Option<String>,
    /// Matches either the regular id or the short id.
    pub regular_or_short_id: Option<String>,
    /// Matches rows owned by this user as well as unowned (shared) rows.
    pub user_id: Option<String>,
    pub visibility: Option<FrameVisibility>,
}

impl Filter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_id_or_short_id(id: impl Into<String>) -> Self {
        Self {
            regular_or_short_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_visibility(mut self, visibility: FrameVisibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Same selection with limit and offset cleared, for totals.
    pub fn without_pagination(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_pagination_keeps_selection() {
        let filter = Filter::by_id_or_short_id("abcd1234")
            .with_user("user_1")
            .with_limit(20)
            .with_offset(40);
        let total = filter.without_pagination();

        assert_eq!(total.limit, None);
        assert_eq!(total.offset, None);
        assert_eq!(total.regular_or_short_id.as_deref(), Some("abcd1234"));
        assert_eq!(total.user_id.as_deref(), Some("user_1"));
        assert_eq!(filter.limit, Some(20));
    }
}
