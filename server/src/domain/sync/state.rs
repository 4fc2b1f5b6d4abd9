//! Client-side filter builder state
//!
//! Mirrors what a filter toolbar edits: the filter tree, the sort list and
//! the page. Every change to the filter or the sort sends the page back to 1.

use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::domain::query::{
    Combinator, FilterCondition, FilterNode, FilterValue, Operator, PageRequest, SearchQuery,
    SortSpec, filter,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    filter: Option<FilterNode>,
    sort: Vec<SortSpec>,
    page: u32,
    page_size: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// One edit applied to a [`FilterState`]
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddCondition(FilterCondition),
    RemoveCondition(String),
    SetCondition {
        field: String,
        operator: Operator,
        value: Option<FilterValue>,
    },
    AddGroup {
        combinator: Combinator,
        conditions: Vec<FilterCondition>,
    },
    WrapInGroup(Combinator),
    SetFilter(Option<FilterNode>),
    ResetFilters,
    SetPage(u32),
    SetPageSize(u32),
    SetSorting(Vec<SortSpec>),
    AddSort(SortSpec),
    ResetSorting,
    ResetAll,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            filter: None,
            sort: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Rebuild a state from its parts (page and size are clamped to at least 1)
    pub fn from_parts(
        filter: Option<FilterNode>,
        sort: Vec<SortSpec>,
        page: u32,
        page_size: u32,
    ) -> Self {
        Self {
            filter,
            sort,
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn filter(&self) -> Option<&FilterNode> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The canonical query this state stands for
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            page: PageRequest::new(self.page, self.page_size),
            date_range: None,
        }
    }

    pub fn add_condition(&mut self, condition: FilterCondition) {
        self.filter = Some(filter::add_condition(self.filter.take(), condition));
        self.page = 1;
    }

    pub fn remove_condition(&mut self, field: &str) {
        self.filter = filter::remove_condition(self.filter.take(), field);
        self.page = 1;
    }

    pub fn set_condition(&mut self, field: &str, operator: Operator, value: Option<FilterValue>) {
        self.filter = Some(filter::set_condition(
            self.filter.take(),
            field,
            operator,
            value,
        ));
        self.page = 1;
    }

    /// AND a group of conditions onto the filter; an empty list changes nothing
    pub fn add_group(&mut self, combinator: Combinator, conditions: Vec<FilterCondition>) {
        if conditions.is_empty() {
            return;
        }
        self.filter = Some(filter::add_group(self.filter.take(), combinator, conditions));
        self.page = 1;
    }

    pub fn wrap_in_group(&mut self, combinator: Combinator) {
        self.filter = filter::wrap_in_group(self.filter.take(), combinator);
        self.page = 1;
    }

    pub fn set_filter(&mut self, node: Option<FilterNode>) {
        self.filter = node;
        self.page = 1;
    }

    pub fn reset_filters(&mut self) {
        self.filter = None;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, size: u32) {
        self.page_size = size.max(1);
        self.page = 1;
    }

    pub fn set_sorting(&mut self, sort: Vec<SortSpec>) {
        self.sort = sort;
        self.page = 1;
    }

    /// Append a sort key, replacing any existing key on the same field
    pub fn add_sort(&mut self, spec: SortSpec) {
        self.sort.retain(|s| s.field != spec.field);
        self.sort.push(spec);
        self.page = 1;
    }

    pub fn reset_sorting(&mut self) {
        self.sort.clear();
        self.page = 1;
    }

    /// Back to no filter, no sort, page 1 (the page size is kept)
    pub fn reset_all(&mut self) {
        self.filter = None;
        self.sort.clear();
        self.page = 1;
    }

    pub fn has_filters(&self) -> bool {
        self.filter.is_some()
    }

    pub fn has_sorting(&self) -> bool {
        !self.sort.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_filters() && !self.has_sorting() && self.page == 1
    }

    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::AddCondition(c) => self.add_condition(c),
            Mutation::RemoveCondition(field) => self.remove_condition(&field),
            Mutation::SetCondition {
                field,
                operator,
                value,
            } => self.set_condition(&field, operator, value),
            Mutation::AddGroup {
                combinator,
                conditions,
            } => self.add_group(combinator, conditions),
            Mutation::WrapInGroup(combinator) => self.wrap_in_group(combinator),
            Mutation::SetFilter(node) => self.set_filter(node),
            Mutation::ResetFilters => self.reset_filters(),
            Mutation::SetPage(page) => self.set_page(page),
            Mutation::SetPageSize(size) => self.set_page_size(size),
            Mutation::SetSorting(sort) => self.set_sorting(sort),
            Mutation::AddSort(spec) => self.add_sort(spec),
            Mutation::ResetSorting => self.reset_sorting(),
            Mutation::ResetAll => self.reset_all(),
        }
    }
}
