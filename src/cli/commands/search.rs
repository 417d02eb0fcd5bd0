//! Search command implementation.

use crate::cli::SearchArgs;
use crate::cli::commands::{CommandContext, join_words, print_search_result};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::query::search_issues;

/// Execute the search command.
///
/// # Errors
///
/// Returns a validation error for an empty query, or the query error.
pub fn execute(args: &SearchArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let query = join_words(&args.query);
    let pagination = ctx.pagination(args.page.limit, args.page.page_token.clone());

    let result = search_issues(&ctx.storage, &query, &ctx.identity, &pagination)?;
    print_search_result(&result, json)
}
