//! Find command handler

use tracing::debug;

use domscope::{FindParams, MatchMethod};

use super::load_page;
use crate::commands::{FindArgs, FormatArg};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{collect_rows, render_text};

/// Build find parameters from command-line arguments
pub fn params_from_args(args: &FindArgs) -> CliResult<FindParams> {
    let method = MatchMethod::from(args.method);
    let mut builder = FindParams::builder().index(args.index);
    if let Some(id) = &args.id {
        builder = builder.id_matching(id.as_str(), method);
    }
    if let Some(tag) = &args.tag {
        builder = builder.tag(tag.as_str());
    }
    if let Some(text) = &args.text {
        builder = builder.inner_text(text.as_str());
    }
    for predicate in &args.attributes {
        let (name, value) = predicate.split_once('=').ok_or_else(|| {
            CliError::invalid_argument(format!("--attr expects name=value, got '{predicate}'"))
        })?;
        builder = builder.attribute_matching(name, value, method);
    }
    Ok(builder.build()?)
}

/// Execute the find command against a static page, returning the rendered
/// output
pub fn execute_find(config: &CliConfig, args: &FindArgs) -> CliResult<String> {
    let params = params_from_args(args)?;
    let mut page = load_page(&args.file, config)?;
    debug!(query = %params, find_timeout_ms = page.config().find_timeout_ms, "running find");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let found = runtime.block_on(async {
        let mut elements = page.elements();
        if args.all {
            elements.find_all(&params).await
        } else {
            elements.find(&params).await.map(|node| vec![node])
        }
    })?;

    let rows = collect_rows(page.tree(), &found);
    match args.format {
        FormatArg::Text => Ok(render_text(&rows, false)),
        FormatArg::Json => Ok(serde_json::to_string_pretty(&rows)? + "\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MethodArg;
    use domscope::{DomscopeError, EngineConfig};
    use std::io::Write;
    use std::path::PathBuf;

    fn args(file: PathBuf) -> FindArgs {
        FindArgs {
            file,
            id: None,
            method: MethodArg::Literal,
            tag: None,
            text: None,
            index: 0,
            attributes: Vec::new(),
            all: false,
            format: FormatArg::Text,
        }
    }

    fn markup_file(markup: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{markup}").unwrap();
        file
    }

    #[test]
    fn test_params_from_args() {
        let mut find = args(PathBuf::from("x.html"));
        find.id = Some("name".to_string());
        find.method = MethodArg::EndsWith;
        find.attributes = vec!["type=text".to_string()];
        let params = params_from_args(&find).unwrap();
        assert_eq!(params.id_or_name().unwrap().method(), MatchMethod::EndsWith);
        assert_eq!(params.attribute_names(), vec!["type"]);

        find.attributes = vec!["broken".to_string()];
        assert!(matches!(
            params_from_args(&find),
            Err(CliError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_find_middle_of_nested_ids() {
        let file = markup_file(
            r#"<div id="control1"><div id="control1"><div id="control1"/></div></div>"#,
        );
        let mut find = args(file.path().to_path_buf());
        find.id = Some("control1".to_string());
        find.method = MethodArg::EndsWith;
        find.index = 1;
        find.format = FormatArg::Json;
        let out = execute_find(&CliConfig::new(), &find).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["node"]["index"], 1);
    }

    #[test]
    fn test_find_all_and_miss() {
        let file = markup_file("<ul><li>a</li><li>b</li></ul>");
        let mut find = args(file.path().to_path_buf());
        find.tag = Some("li".to_string());
        find.all = true;
        let out = execute_find(&CliConfig::new(), &find).unwrap();
        assert_eq!(out.lines().count(), 2);

        find.tag = Some("ol".to_string());
        find.all = false;
        let err = execute_find(&CliConfig::new(), &find).unwrap_err();
        assert!(err.to_string().contains("tag='ol'"));
    }

    #[test]
    fn test_find_uses_configured_timeout() {
        let file = markup_file("<ul><li>a</li></ul>");
        let mut find = args(file.path().to_path_buf());
        find.tag = Some("ol".to_string());
        let config = CliConfig::new().with_engine(EngineConfig::new().with_find_timeout(1234));
        match execute_find(&config, &find).unwrap_err() {
            CliError::Domscope(DomscopeError::NotFound {
                timeout_ms,
                attempts,
                ..
            }) => {
                assert_eq!(timeout_ms, 1234);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
