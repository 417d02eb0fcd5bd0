//! List command implementation.

use tracing::debug;

use crate::cli::ListArgs;
use crate::cli::commands::{CommandContext, join_words, print_search_result};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::query::list_issues;

/// Execute the list command. No filter words means `is:open`.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened or the query fails.
pub fn execute(args: &ListArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let filter = join_words(&args.filter);
    let pagination = ctx.pagination(args.page.limit, args.page.page_token.clone());
    debug!(%filter, page_size = pagination.page_size, "Listing issues");

    let result = list_issues(&ctx.storage, &filter, &ctx.identity, &pagination)?;
    print_search_result(&result, json)
}
