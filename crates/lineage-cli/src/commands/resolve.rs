use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use lineage_config::LineageConfig;
use lineage_core::{AnalyzerResult, PipelineResult, format};
use lineage_provenance::{
    NestedProvenanceResolver, PackageProvenanceResolver, Progress as ResolutionEvent,
    ProvenanceCache, ProvenanceResolver, ResolutionInput,
};
use lineage_store::{ArtifactStore, CompressedFileStorage, LocalFileStorage};
use lineage_vcs::{GitVcs, HttpDownloader, VcsRegistry};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ResolveArgs;
use crate::output::output;
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct Summary {
    resolved: usize,
    failed: usize,
    nested_repositories: usize,
    incomplete_nested: usize,
    result_file: String,
}

pub async fn handle(
    args: &ResolveArgs,
    config: &LineageConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let mut document: PipelineResult = format::read_value(&args.input)
        .with_context(|| format!("failed to read result file '{}'", args.input.display()))?;

    let resolver = build_resolver(args, config)?;
    let analyzer = if args.skip_excluded {
        without_excluded(&document)
    } else {
        document.analyzer.result.clone()
    };

    let total = ResolutionInput::from_result(&analyzer).len();
    let progress = Progress::bar(u64::try_from(total).unwrap_or(u64::MAX), "resolving provenance");
    let result = resolver
        .resolve_all(&analyzer, |event| match event {
            ResolutionEvent::Package(provenance) => {
                progress.inc(1);
                progress.set_message(&provenance.id().to_string());
            }
            ResolutionEvent::Nested(nested) => {
                progress.inc_length(1);
                progress.inc(1);
                progress.set_message(&nested.provenance.vcs_info.url);
            }
        })
        .await;

    let failed = result
        .package_provenances
        .iter()
        .filter(|provenance| !provenance.is_resolved())
        .count();
    let summary = Summary {
        resolved: result.package_provenances.len() - failed,
        failed,
        nested_repositories: result
            .nested_provenances
            .iter()
            .map(|nested| nested.nested_provenance.len())
            .sum(),
        incomplete_nested: result
            .nested_provenances
            .iter()
            .filter(|nested| !nested.is_complete())
            .count(),
        result_file: String::new(),
    };
    progress.finish_ok(&format!("{} resolved, {failed} failed", summary.resolved));

    document.provenance = Some(result);
    let target = args.output.as_ref().unwrap_or(&args.input);
    format::write_value(target, &document)
        .with_context(|| format!("failed to write result file '{}'", target.display()))?;

    output(
        &Summary {
            result_file: target.display().to_string(),
            ..summary
        },
        flags.format,
    )
}

fn build_resolver(args: &ResolveArgs, config: &LineageConfig) -> anyhow::Result<ProvenanceResolver> {
    let mut settings = config.resolver.clone();
    if let Some(max_concurrency) = args.max_concurrency {
        settings.max_concurrency = max_concurrency.max(1);
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.timeout_secs = timeout_secs.max(1);
    }

    let registry =
        VcsRegistry::new().with(Arc::new(GitVcs::new(config.storage.checkout_dir())));
    let downloader = HttpDownloader::new(config.download.timeout(), &config.download.user_agent)
        .context("failed to create the HTTP client")?;

    let mut package = PackageProvenanceResolver::new(registry.clone(), Arc::new(downloader))
        .with_origins(settings.source_code_origins.clone());
    if args.store_sources {
        package = package.with_source_store(open_store(
            &config.storage.sources_dir(),
            config.storage.compress,
        )?);
    }
    let mut nested = NestedProvenanceResolver::new(registry, settings.max_concurrency)
        .with_max_depth(settings.max_nested_depth);

    if settings.cache_results && !args.no_cache {
        let cache = ProvenanceCache::new(open_store(
            &config.storage.cache_dir(),
            config.storage.compress,
        )?);
        package = package.with_cache(cache.clone());
        nested = nested.with_cache(cache);
    } else {
        tracing::debug!("provenance cache disabled");
    }

    Ok(ProvenanceResolver::new(package, nested)
        .with_max_concurrency(settings.max_concurrency)
        .with_timeout(settings.timeout()))
}

fn open_store(root: &Path, compress: bool) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let store: Arc<dyn ArtifactStore> = if compress {
        Arc::new(CompressedFileStorage::new(root)?)
    } else {
        Arc::new(LocalFileStorage::new(root)?)
    };
    tracing::debug!(root = %root.display(), compress, "opened store");
    Ok(store)
}

/// The analyzer result without packages that only occur in excluded scopes.
fn without_excluded(document: &PipelineResult) -> AnalyzerResult {
    let mut analyzer = document.analyzer.result.clone();
    analyzer.packages.retain(|id, _| !document.is_excluded(id));
    analyzer
}
