use anyhow::Context;
use lineage_analyzer::{SimpleDefinitionFile, create_flat_result};
use lineage_core::format;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CreateFlatResultArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct Summary {
    project: String,
    packages: usize,
    excluded: usize,
    issues: usize,
    result_file: String,
}

pub fn handle(args: &CreateFlatResultArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let definition = SimpleDefinitionFile::read(&args.definition_file).with_context(|| {
        format!(
            "failed to read definition file '{}'",
            args.definition_file.display()
        )
    })?;
    let result = create_flat_result(&definition)?;
    format::write_value(&args.result_file, &result).with_context(|| {
        format!("failed to write result file '{}'", args.result_file.display())
    })?;

    let analyzer = &result.analyzer.result;
    let summary = Summary {
        project: definition.project_id().to_string(),
        packages: analyzer.packages.len(),
        excluded: analyzer
            .packages
            .keys()
            .filter(|id| result.is_excluded(id))
            .count(),
        issues: analyzer.issues.values().map(Vec::len).sum(),
        result_file: args.result_file.display().to_string(),
    };
    output(&summary, flags.format)
}
