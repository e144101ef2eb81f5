use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::codec::{JsonCodec, TextCodec};
use crate::navigator::Navigator;
use crate::store::{UrlState, UrlStateOptions};

pub const QUERY_KEY: &str = "q";
pub const FILTERS_KEY: &str = "filters";

/// Portfolio filter selection. `None` on the tri-state flags means "don't care".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFilters {
    pub categories: BTreeSet<String>,
    pub technologies: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_live_demo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_github: Option<bool>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Selected categories and technologies plus every set flag.
    pub fn active_count(&self) -> usize {
        self.categories.len()
            + self.technologies.len()
            + [self.featured, self.has_live_demo, self.has_github]
                .iter()
                .filter(|f| f.is_some())
                .count()
    }

    pub fn toggle_category(&mut self, category: &str) {
        toggle(&mut self.categories, category);
    }

    pub fn toggle_technology(&mut self, technology: &str) {
        toggle(&mut self.technologies, technology);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn toggle(set: &mut BTreeSet<String>, item: &str) {
    if !set.remove(item) {
        set.insert(item.to_string());
    }
}

/// Free-text query (`q`) and structured filters (`filters`) for the portfolio
/// search page. Both rewrite history in place.
pub struct SearchUrlState {
    query: UrlState<String, TextCodec>,
    filters: UrlState<SearchFilters, JsonCodec>,
}

impl SearchUrlState {
    pub fn mount(nav: Rc<dyn Navigator>) -> Self {
        let query = UrlState::mount(
            nav.clone(),
            QUERY_KEY,
            UrlStateOptions::new(String::new())
                .with_codec(TextCodec)
                .replace(),
        );
        let filters = UrlState::mount(
            nav,
            FILTERS_KEY,
            UrlStateOptions::new(SearchFilters::default()).replace(),
        );
        Self { query, filters }
    }

    pub fn query(&self) -> String {
        self.query.get()
    }

    pub fn set_query(&self, q: impl Into<String>) {
        self.query.set(q.into());
    }

    pub fn filters(&self) -> SearchFilters {
        self.filters.get()
    }

    pub fn set_filters(&self, filters: SearchFilters) {
        self.filters.set(filters);
    }

    pub fn update_filters(&self, f: impl FnOnce(&mut SearchFilters)) {
        self.filters.update(f);
    }

    pub fn clear_all(&self) {
        self.query.reset();
        self.filters.reset();
    }

    pub fn query_state(&self) -> &UrlState<String, TextCodec> {
        &self.query
    }

    pub fn filters_state(&self) -> &UrlState<SearchFilters, JsonCodec> {
        &self.filters
    }
}
