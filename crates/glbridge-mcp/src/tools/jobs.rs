//! CI job and pipeline tools.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};

use glbridge_core::api::ListJobsOptions;
use glbridge_core::paginate::{effective_limit, limited, paginate_scoped, ListOptions};
use glbridge_core::{Error, Id, OptionalBool, Result, ResultExt};

use super::{take, DEFAULT_LIMIT};
use crate::encode::ToolOutput;
use crate::parse::parse_build_states;
use crate::registry::{ToolContext, ToolHints, ToolRegistry};
use crate::tool_args;

pub(super) fn register(registry: &mut ToolRegistry) {
    registry
        .register(
            "list_pipeline_jobs",
            "List the jobs of a pipeline.",
            ToolHints::READ_ONLY,
            list_pipeline_jobs,
        )
        .register(
            "list_downstream_pipelines",
            "List the pipelines triggered by the bridge jobs of a pipeline.",
            ToolHints::READ_ONLY,
            list_downstream_pipelines,
        )
        .register(
            "get_job",
            "Get a single job.",
            ToolHints::READ_ONLY,
            get_job,
        )
        .register(
            "download_job_artifacts_file",
            "Download one file from the artifacts of a job and return it as text.",
            ToolHints::READ_ONLY,
            download_job_artifacts_file,
        )
        .register(
            "download_job_log",
            "Download the log of a job.",
            ToolHints::READ_ONLY,
            download_job_log,
        )
        .register(
            "retry_job",
            "Retry a job. The retry runs as a new job.",
            ToolHints::MUTATING,
            retry_job,
        )
        .register(
            "trigger_manual_job",
            "Start a manual job.",
            ToolHints::MUTATING,
            trigger_manual_job,
        );
}

tool_args! {
    pub struct ListPipelineJobsArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Pipeline ID
        pipeline_id: u64 [required],
        /// Comma-separated job states, e.g. "failed,manual"; empty means every state
        scope: String,
        /// Include retried jobs
        include_retried: OptionalBool,
        /// Maximum number of jobs to return
        limit: i64,
    }
}

tool_args! {
    pub struct PipelineArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Pipeline ID
        pipeline_id: u64 [required],
        /// Maximum number of pipelines to return
        limit: i64,
    }
}

tool_args! {
    pub struct JobArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Job ID
        job_id: u64 [required],
    }
}

tool_args! {
    pub struct DownloadArtifactArgs {
        /// Project ID or path
        project_id: Id [required],
        /// Job ID
        job_id: u64 [required],
        /// Path of the file inside the artifacts archive
        artifact_path: String [required],
    }
}

async fn list_pipeline_jobs(ctx: Arc<ToolContext>, args: ListPipelineJobsArgs) -> Result<ToolOutput> {
    let svc = ctx.client.jobs.as_ref();
    let pipeline = args.pipeline_id;
    let opts = ListJobsOptions {
        scope: parse_build_states(&args.scope),
        include_retried: args.include_retried.get(),
        list: ListOptions::max_page(),
    };

    let jobs = paginate_scoped(args.project_id.clone(), opts, move |project, opts| async move {
        svc.list_pipeline_jobs(&project, pipeline, opts).await
    });
    let jobs = take(jobs, args.limit, DEFAULT_LIMIT)
        .await
        .with_context(|| format!("list jobs of pipeline {} in {}", pipeline, args.project_id))?;
    ToolOutput::list(jobs)
}

async fn list_downstream_pipelines(ctx: Arc<ToolContext>, args: PipelineArgs) -> Result<ToolOutput> {
    let svc = ctx.client.jobs.as_ref();
    let pipeline = args.pipeline_id;

    let bridges = paginate_scoped(
        args.project_id.clone(),
        ListOptions::max_page(),
        move |project, opts| async move { svc.list_pipeline_bridges(&project, pipeline, opts).await },
    );
    // Bridges that never triggered anything carry no downstream pipeline.
    let downstream = bridges
        .try_filter_map(|bridge| async move { Ok::<_, Error>(bridge.downstream_pipeline) })
        .boxed();
    let pipelines: Vec<_> = limited(downstream, effective_limit(args.limit, DEFAULT_LIMIT))
        .try_collect()
        .await
        .with_context(|| {
            format!(
                "list downstream pipelines of pipeline {} in {}",
                pipeline, args.project_id
            )
        })?;
    ToolOutput::list(pipelines)
}

async fn get_job(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    let job = ctx
        .client
        .jobs
        .get_job(&args.project_id, args.job_id)
        .await
        .with_context(|| format!("get job {} in {}", args.job_id, args.project_id))?;
    ToolOutput::json(&job)
}

async fn download_job_artifacts_file(
    ctx: Arc<ToolContext>,
    args: DownloadArtifactArgs,
) -> Result<ToolOutput> {
    let content = ctx
        .client
        .jobs
        .get_artifact_file(&args.project_id, args.job_id, &args.artifact_path)
        .await
        .with_context(|| {
            format!(
                "download artifact {} of job {} in {}",
                args.artifact_path, args.job_id, args.project_id
            )
        })?;
    Ok(ToolOutput::text(content))
}

async fn download_job_log(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    let log = ctx
        .client
        .jobs
        .get_job_log(&args.project_id, args.job_id)
        .await
        .with_context(|| format!("download log of job {} in {}", args.job_id, args.project_id))?;
    Ok(ToolOutput::text(log))
}

async fn retry_job(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    let job = ctx
        .client
        .jobs
        .retry_job(&args.project_id, args.job_id)
        .await
        .with_context(|| format!("retry job {} in {}", args.job_id, args.project_id))?;
    ToolOutput::json(&job)
}

async fn trigger_manual_job(ctx: Arc<ToolContext>, args: JobArgs) -> Result<ToolOutput> {
    let job = ctx
        .client
        .jobs
        .play_job(&args.project_id, args.job_id)
        .await
        .with_context(|| format!("play job {} in {}", args.job_id, args.project_id))?;
    ToolOutput::json(&job)
}
