use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use localqa_context::budget::allocate;
use localqa_context::{compose_prompt, NOT_SPECIFIED};
use localqa_core::config::{expand_path, Config};
use localqa_core::corpus::DirectoryCorpus;
use localqa_core::traits::CorpusProvider;
use localqa_core::types::SessionContext;
use localqa_rank::{EvidenceSelector, JsonlTraceSink};

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} ask <question> [data_dir] [--after <document_id>]");
    eprintln!("       {prog} stats [data_dir]");
    eprintln!("Example: {prog} ask 'What is the total due?' ../dev_data/txt");
    std::process::exit(1);
}

fn data_dir(arg: Option<&String>, config: &Config, cwd: &Path) -> anyhow::Result<PathBuf> {
    match arg {
        Some(dir) => Ok(expand_path(dir)),
        None => config.path("corpus.data_dir", cwd),
    }
}

fn load_corpus(dir: &Path) -> anyhow::Result<DirectoryCorpus> {
    DirectoryCorpus::load(dir).with_context(|| format!("loading corpus from {}", dir.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let cwd = env::current_dir()?;

    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        usage(&prog);
    }
    let cmd = args.remove(0);

    let mut session = SessionContext::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--after" => {
                let Some(id) = args.get(i + 1) else {
                    eprintln!("Error: --after requires a document id");
                    std::process::exit(1);
                };
                session = SessionContext::following(id.clone());
                i += 1;
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }
    tracing::debug!(command = %cmd, args = ?positional, "parsed arguments");

    match cmd.as_str() {
        "ask" => {
            let Some(question) = positional.first() else { usage(&prog) };
            let dir = data_dir(positional.get(1), &config, &cwd)?;
            let corpus = load_corpus(&dir)?;

            let mut selector = EvidenceSelector::new(settings.retrieval.clone());
            if settings.trace.enabled {
                let sink = JsonlTraceSink::new(config.path("trace.path", &cwd)?);
                selector = selector.with_trace_sink(Box::new(sink));
            }
            let selection = selector.select(question, &corpus, &session);

            println!("Question: {question}");
            println!("Corpus: {} ({} documents)", dir.display(), corpus.len());
            println!(
                "Outcome: {:?} (gate: {:?}, ranked hits: {})",
                selection.outcome, selection.gate.reason, selection.ranked_count
            );
            if !selection.has_evidence() {
                println!("\n{NOT_SPECIFIED}");
                return Ok(());
            }
            println!("\nEvidence:");
            for (n, hit) in selection.evidence.iter().enumerate() {
                let page = hit.page_number().map(|p| format!(" p.{p}")).unwrap_or_default();
                let preview: String = hit.text().chars().take(120).collect();
                println!("  {}. score={:.4}  {}{}", n + 1, hit.final_score, hit.chunk_id, page);
                println!("     {}", preview.replace('\n', " "));
            }
            let rendered = allocate(&selection, &settings.retrieval.budget);
            let prompt = compose_prompt(question, &rendered.text);
            println!("\nPrompt ({} evidence chars):\n{prompt}", rendered.char_count());
        }
        "stats" => {
            let dir = data_dir(positional.first(), &config, &cwd)?;
            let corpus = load_corpus(&dir)?;
            let documents = corpus.eligible_documents();
            let chunks: usize = documents.iter().map(|d| d.chunk_count()).sum();
            println!("Corpus: {}", dir.display());
            println!("Documents: {}", documents.len());
            println!("Chunks: {chunks}");
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            usage(&prog);
        }
    }
    Ok(())
}
