//! # Listing Order
//!
//! Default orderings per listing context, plus parsing of an explicit
//! `?sort=` override such as `-sticky,created`.

use crate::error::{AppError, Result};

/// Number of items in the RSS and Atom feeds.
pub const FEED_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// Site-wide topic listing
    Topics,
    /// Topics of a single forum
    ForumTopics,
    Posts,
    Feed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Sticky,
    Created,
    Name,
    Title,
}

impl SortField {
    fn parse(kind: ListingKind, name: &str) -> Option<Self> {
        let field = match name {
            "sticky" => SortField::Sticky,
            "created" | "pub_date" => SortField::Created,
            "name" => SortField::Name,
            "title" => SortField::Title,
            _ => return None,
        };
        let allowed = match kind {
            ListingKind::Topics | ListingKind::ForumTopics => {
                matches!(field, SortField::Sticky | SortField::Created | SortField::Name)
            }
            ListingKind::Posts | ListingKind::Feed => {
                matches!(field, SortField::Created | SortField::Title)
            }
        };
        allowed.then_some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: Direction,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self { field, direction: Direction::Asc }
    }

    pub const fn desc(field: SortField) -> Self {
        Self { field, direction: Direction::Desc }
    }
}

/// Ordered list of sort keys; storage adds `id` ascending as the last tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec(Vec<SortKey>);

impl OrderSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// Parses `field[,field...]` where a leading `-` means descending.
    pub fn parse(kind: ListingKind, raw: &str) -> Result<Self> {
        let mut keys = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (direction, name) = match part.strip_prefix('-') {
                Some(rest) => (Direction::Desc, rest),
                None => (Direction::Asc, part),
            };
            let field = SortField::parse(kind, name)
                .ok_or_else(|| AppError::invalid(format!("cannot sort by '{}'", name)))?;
            if keys.iter().any(|k: &SortKey| k.field == field) {
                return Err(AppError::invalid(format!("'{}' given twice in sort", name)));
            }
            keys.push(SortKey { field, direction });
        }
        if keys.is_empty() {
            return Err(AppError::invalid("empty sort"));
        }
        Ok(Self(keys))
    }
}

/// Sticky topics always come first; feeds show newest first.
pub fn default_ordering(kind: ListingKind) -> OrderSpec {
    use SortField::*;
    match kind {
        ListingKind::Topics => OrderSpec(vec![SortKey::desc(Sticky), SortKey::asc(Created)]),
        ListingKind::ForumTopics => OrderSpec(vec![SortKey::desc(Sticky), SortKey::desc(Created)]),
        ListingKind::Posts => OrderSpec(vec![SortKey::asc(Created)]),
        ListingKind::Feed => OrderSpec(vec![SortKey::desc(Created)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_defaults_put_sticky_first() {
        for kind in [ListingKind::Topics, ListingKind::ForumTopics] {
            let order = default_ordering(kind);
            assert_eq!(order.keys()[0], SortKey::desc(SortField::Sticky));
        }
        assert_eq!(
            default_ordering(ListingKind::Topics).keys()[1],
            SortKey::asc(SortField::Created)
        );
    }

    #[test]
    fn posts_are_conversational_and_feeds_newest_first() {
        assert_eq!(
            default_ordering(ListingKind::Posts).keys(),
            &[SortKey::asc(SortField::Created)]
        );
        assert_eq!(
            default_ordering(ListingKind::Feed).keys(),
            &[SortKey::desc(SortField::Created)]
        );
    }

    #[test]
    fn parses_explicit_sort() {
        let order = OrderSpec::parse(ListingKind::Topics, "-sticky, name").unwrap();
        assert_eq!(
            order.keys(),
            &[SortKey::desc(SortField::Sticky), SortKey::asc(SortField::Name)]
        );
        let legacy = OrderSpec::parse(ListingKind::Posts, "-pub_date").unwrap();
        assert_eq!(legacy.keys(), &[SortKey::desc(SortField::Created)]);
    }

    #[test]
    fn rejects_fields_foreign_to_the_listing() {
        assert!(OrderSpec::parse(ListingKind::Posts, "sticky").is_err());
        assert!(OrderSpec::parse(ListingKind::Topics, "title").is_err());
        assert!(OrderSpec::parse(ListingKind::Topics, "id; drop table").is_err());
        assert!(OrderSpec::parse(ListingKind::Topics, "name,-name").is_err());
        assert!(OrderSpec::parse(ListingKind::Topics, " , ").is_err());
    }
}
