//! Filter query language.
//!
//! `parser` turns a filter string into clauses, `predicate` compiles them to
//! a backend-neutral tree with indexed parameter slots, `sql` and `eval`
//! are the two backend adapters, and `pipeline` ties them to an executor
//! with pagination.

pub mod eval;
pub mod parser;
pub mod pipeline;
pub mod predicate;
pub mod sql;

pub use parser::{AssigneeRef, FilterClause, IdRef, parse};
pub use pipeline::{
    DEFAULT_LIST_FILTER, DEFAULT_PAGE_SIZE, Pagination, SearchResult, list_issues, search,
    search_issues,
};
pub use predicate::{CompiledFilter, Field, Operator, Predicate, Value, compile, compile_str};
