//! Inspect command handler

use std::sync::Arc;
use tracing::info;

use domscope::{MarkupParser, TagSoupParser, TreeBuilder};

use super::read_markup;
use crate::commands::{FormatArg, InspectArgs};
use crate::error::CliResult;
use crate::output::{collect_rows, render_text};

/// Execute the inspect command, returning the rendered output
pub fn execute_inspect(args: &InspectArgs) -> CliResult<String> {
    let markup = read_markup(&args.file)?;
    let parser: Arc<dyn MarkupParser> = if args.strict {
        Arc::new(TagSoupParser::strict())
    } else {
        Arc::new(TagSoupParser::new())
    };
    let nodes = parser.parse(&markup)?;
    let tree = TreeBuilder::default().build(&nodes)?;
    info!(
        file = %args.file.display(),
        nodes = tree.len(),
        "parsed markup"
    );

    let rows = collect_rows(&tree, &tree.document_order());
    match args.format {
        FormatArg::Text => Ok(render_text(&rows, true)),
        FormatArg::Json => Ok(serde_json::to_string_pretty(&rows)? + "\n"),
    }
}
