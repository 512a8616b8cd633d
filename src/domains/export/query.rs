use crate::domains::export::config::CollectionConfig;
use crate::domains::export::types::{
    FieldSelection, OrderBy, PopulateSpec, QueryDescriptor, WhereClause,
};
use crate::types::PageRequest;

/// Locale the export feature pins filtered collections to.
const EXPORT_LOCALE: &str = "en";

/// Turns a collection's config plus a pagination request into a
/// store-agnostic query descriptor.
///
/// Never fails: a missing config for a collection id is the orchestrator's
/// precondition, not this builder's. The sort key is fixed to the primary
/// identifier ascending so pagination stays deterministic across pages.
pub fn build_query(config: &CollectionConfig, page: PageRequest) -> QueryDescriptor {
    QueryDescriptor {
        select: if config.scalar_columns.is_empty() {
            FieldSelection::All
        } else {
            FieldSelection::Fields(config.scalar_columns.clone())
        },
        populate: config
            .relations
            .iter()
            .map(|(name, relation)| {
                (
                    name.clone(),
                    PopulateSpec {
                        select: relation.columns.clone(),
                    },
                )
            })
            .collect(),
        where_clause: build_where(config),
        order_by: OrderBy::default(),
        limit: page.limit,
        offset: page.offset,
    }
}

/// The filter shared by the row query and the count query.
pub fn build_where(config: &CollectionConfig) -> WhereClause {
    WhereClause {
        locale: config
            .locale_filtered
            .then(|| EXPORT_LOCALE.to_string()),
    }
}
