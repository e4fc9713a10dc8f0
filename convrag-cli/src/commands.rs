use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use convrag::{
    ConversationId, DocumentParser, Generator, InMemoryVectorStore, PlainTextParser, RagConfig,
    RagError, RagPipeline, StrategyRegistry, VectorStore,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

#[cfg(feature = "qdrant")]
use crate::cli::RemoveArgs;
use crate::cli::{Commands, SessionArgs, StoreArgs};

/// Stand-in generator for `retrieve`, which never generates.
struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> convrag::Result<String> {
        Err(RagError::GeneratorError {
            generator: DISABLED_GENERATOR.to_string(),
            message: "generation is disabled for this command".to_string(),
        })
    }

    fn name(&self) -> &str {
        DISABLED_GENERATOR
    }
}

const DISABLED_GENERATOR: &str = "disabled";

#[derive(Clone, Copy)]
enum Mode {
    Answer,
    Retrieve,
}

pub async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ask(args) => session(args, Mode::Answer).await,
        Commands::Retrieve(args) => session(args, Mode::Retrieve).await,
        #[cfg(feature = "qdrant")]
        Commands::Remove(args) => remove(args).await,
    }
}

#[cfg_attr(not(feature = "qdrant"), allow(unused_variables))]
fn open_store(args: &StoreArgs) -> anyhow::Result<Arc<dyn VectorStore>> {
    #[cfg(feature = "qdrant")]
    if let Some(url) = &args.qdrant_url {
        info!(url = %url, "using qdrant vector store");
        return Ok(Arc::new(convrag::qdrant::QdrantVectorStore::new(url)?));
    }
    Ok(Arc::new(InMemoryVectorStore::new()))
}

fn env_credential(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Fill API keys left out of the config file from the environment.
fn apply_env_credentials(config: &mut RagConfig) {
    if config.embedder.api_key.is_none() && config.embedder.strategy == "openai" {
        config.embedder.api_key = env_credential("OPENAI_API_KEY");
    }
    if config.generator.api_key.is_none() && config.generator.strategy == "openai" {
        config.generator.api_key = env_credential("OPENAI_API_KEY");
    }
    if config.reranker.api_key.is_none() && config.reranker.strategy == "http" {
        config.reranker.api_key = env_credential("RERANK_API_KEY");
    }
}

fn load_config(args: &SessionArgs, mode: Mode) -> anyhow::Result<RagConfig> {
    let mut config = match &args.config {
        Some(path) => RagConfig::load(path)?,
        None => RagConfig::default(),
    };
    if matches!(mode, Mode::Retrieve) {
        config.generator.strategy = DISABLED_GENERATOR.to_string();
    }
    apply_env_credentials(&mut config);
    Ok(config)
}

async fn session(args: SessionArgs, mode: Mode) -> anyhow::Result<()> {
    let config = load_config(&args, mode)?;
    let mut registry = StrategyRegistry::with_defaults();
    registry.register_generator(DISABLED_GENERATOR, |_| {
        Ok(Arc::new(DisabledGenerator) as Arc<dyn Generator>)
    });

    let pipeline = RagPipeline::from_config(config, open_store(&args.store)?, &registry)?;
    let conversation_id = ConversationId(args.conversation);

    let raw = std::fs::read(&args.file)
        .with_context(|| format!("failed to read document '{}'", args.file.display()))?;
    let text = PlainTextParser.parse_to_text(&raw)?;
    let report = pipeline.process_document(conversation_id, &text).await?;
    info!(
        conversation_id = %report.conversation_id,
        fragment_count = report.fragment_count,
        file = %args.file.display(),
        "document ready"
    );

    let result = if args.queries.is_empty() {
        repl(&pipeline, conversation_id, mode).await
    } else {
        for query in &args.queries {
            answer(&pipeline, conversation_id, query, mode).await?;
        }
        Ok(())
    };

    pipeline.close().await?;
    result
}

async fn answer(
    pipeline: &RagPipeline,
    conversation_id: ConversationId,
    query: &str,
    mode: Mode,
) -> anyhow::Result<()> {
    let output = match mode {
        Mode::Answer => {
            let response = pipeline.process_query(conversation_id, query).await?;
            serde_json::to_string_pretty(&response)?
        }
        Mode::Retrieve => {
            let contexts = pipeline.retrieve(conversation_id, query).await?;
            serde_json::to_string_pretty(&serde_json::json!({
                "query": query,
                "contexts": contexts,
            }))?
        }
    };
    println!("{output}");
    Ok(())
}

async fn repl(
    pipeline: &RagPipeline,
    conversation_id: ConversationId,
    mode: Mode,
) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("convrag> ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if matches!(query, "exit" | "quit") {
                    break;
                }
                let _ = editor.add_history_entry(query);
                // A failed query should not end the session.
                if let Err(e) = answer(pipeline, conversation_id, query, mode).await {
                    eprintln!("error: {e:#}");
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(feature = "qdrant")]
async fn remove(args: RemoveArgs) -> anyhow::Result<()> {
    let conversation_id = ConversationId(args.conversation);
    let store = convrag::qdrant::QdrantVectorStore::new(&args.qdrant_url)?;
    convrag::IndexManager::new(Arc::new(store)).remove(conversation_id).await?;
    info!(%conversation_id, url = %args.qdrant_url, "conversation removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_mode_disables_generation() {
        let args = SessionArgs {
            config: None,
            conversation: 1,
            file: "doc.md".into(),
            queries: Vec::new(),
            store: StoreArgs::default(),
        };
        let config = load_config(&args, Mode::Retrieve).unwrap();
        assert_eq!(config.generator.strategy, DISABLED_GENERATOR);

        let config = load_config(&args, Mode::Answer).unwrap();
        assert_eq!(config.generator.strategy, "openai");
    }
}
