//! Command execution.

use std::path::PathBuf;

use super::output::{render_answer, render_architecture, render_repo_list, render_status, OutputFormat};
use super::parser::{Cli, Commands};
use crate::agent::{AgentLoop, FinalizerMode};
use crate::architecture;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::error::Result;
use crate::ingest::{FsSourceProvider, IndexPipeline};
use crate::oracle::OpenAiOracle;
use crate::store::CorpusStore;
use crate::vector::DenseVectorIndex;

/// Default data directory under the working directory.
const DEFAULT_DATA_DIR: &str = ".repoqa";

/// Executes a parsed CLI invocation and returns the rendered output.
///
/// # Errors
///
/// Returns the underlying engine error; the caller renders it for the
/// selected format.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let mut store = CorpusStore::open(data_dir.join("corpus.db"))?;
    let mut index = DenseVectorIndex::open(data_dir.join("vectors.db"))?;
    let embedder = create_embedder()?;
    let config = Config::from_env()?;

    match &cli.command {
        Commands::Index { path } => {
            let provider = FsSourceProvider::new(path)?;
            let mut pipeline =
                IndexPipeline::new(&mut store, &mut index, embedder.as_ref(), &config);
            let meta = pipeline.index(&provider)?;
            let status = pipeline.status(&meta.repo_id)?;
            Ok(render_status(&meta.repo_id, &status, format))
        }

        Commands::Ask {
            repo,
            question,
            plain,
        } => {
            let oracle = OpenAiOracle::new(&config);
            let mode = if *plain {
                FinalizerMode::Plain
            } else {
                FinalizerMode::Structured
            };
            let agent = AgentLoop::new(&store, &index, embedder.as_ref(), &oracle, &config)
                .with_finalizer_mode(mode);
            let state = agent.answer(question, repo).await?;
            Ok(render_answer(&state, format, cli.verbose))
        }

        Commands::Architecture { repo } => {
            let oracle = OpenAiOracle::new(&config);
            let report = architecture::generate_summary(&store, &oracle, repo).await?;
            Ok(render_architecture(&report, format))
        }

        Commands::List => {
            let repos = store.list_repos()?;
            Ok(render_repo_list(&repos, format))
        }

        Commands::Status { repo } => {
            let pipeline = IndexPipeline::new(&mut store, &mut index, embedder.as_ref(), &config);
            let status = pipeline.status(repo)?;
            Ok(render_status(repo, &status, format))
        }

        Commands::Delete { repo } => {
            let mut pipeline =
                IndexPipeline::new(&mut store, &mut index, embedder.as_ref(), &config);
            pipeline.delete(repo)?;
            Ok(format!("Repository {repo} deleted."))
        }
    }
}
