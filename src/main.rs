//! ollama-agents command-line entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (`--config` path or `config/default.toml`)
//!   3. Init logger once (`--verbose` > `RUST_LOG` > config level)
//!   4. Build the model client and agent context
//!   5. Run the selected agent

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::BufReader;
use tracing::info;

use ollama_agents::agents::basic::{self, BasicAgent};
use ollama_agents::agents::classify::{self, ClassificationAgent};
use ollama_agents::agents::codegen::{self, CodeGenAgent};
use ollama_agents::agents::core::interactive::{QUIT_WORDS, run_loop};
use ollama_agents::agents::creative::{self, CreativeAgent};
use ollama_agents::agents::extract::{self, ExtractionAgent};
use ollama_agents::agents::fact_check::{self, FactCheckAgent};
use ollama_agents::agents::knowledge_graph::{self, KnowledgeGraphAgent};
use ollama_agents::agents::rag::kb::{self, KnowledgeBase};
use ollama_agents::agents::rag::multidoc::{self, MultiDocAgent};
use ollama_agents::agents::rag::{self, RagSystem};
use ollama_agents::agents::sentiment::SentimentAgent;
#[cfg(feature = "plugin-sql")]
use ollama_agents::agents::sql::SqlAgent;
use ollama_agents::agents::summarize::{self, SummarizationAgent, SummaryType};
use ollama_agents::agents::tool_memory::{self, ToolMemoryAgent};
use ollama_agents::agents::translate::{self, TranslationAgent};
use ollama_agents::agents::web_search::{self, WebSearchAgent};
use ollama_agents::agents::{AgentContext, preview};
use ollama_agents::config;
use ollama_agents::error::AppError;
use ollama_agents::llm::providers;
use ollama_agents::logger;

#[derive(Parser)]
#[command(name = "ollama-agents")]
#[command(version)]
#[command(about = "Single-task LLM agents backed by a local Ollama server")]
#[command(long_about = r#"
Each subcommand runs one agent against the configured model.

Example usage:
  ollama-agents explain "Rust ownership"
  ollama-agents summarize --file notes.txt --type bullets
  ollama-agents rag --file handbook.md "What is the leave policy?"
  ollama-agents sql "Who earns the most?"
"#)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for this crate (ignores RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured model
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the model server is reachable
    Ping,

    /// Explain one or more topics in simple terms
    Explain {
        /// Topics to explain (demo topics when omitted)
        topics: Vec<String>,

        /// Ad-hoc template with a `{{subject}}` placeholder
        #[arg(long)]
        custom_prompt: Option<String>,

        /// Value for `{{subject}}` in the custom prompt
        #[arg(long)]
        subject: Option<String>,
    },

    /// Generate code from a description
    Codegen { description: Option<String> },

    /// Write a short story and a poem from an idea
    Creative {
        /// Story idea
        idea: Option<String>,
    },

    /// Extract company facts from text
    Extract { text: Option<String> },

    /// Classify text into a topic category
    Classify { text: Option<String> },

    /// Translate text into another language
    Translate {
        text: Option<String>,

        /// Target language
        #[arg(short, long, default_value = translate::DEFAULT_TARGET_LANGUAGE)]
        to: String,
    },

    /// Analyse sentiment (interactive when no input is given)
    Sentiment {
        /// Text to analyse
        text: Option<String>,

        /// Run the built-in examples
        #[arg(long)]
        examples: bool,

        /// Analyse each line of a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Summarise text or a file
    Summarize {
        /// File to summarise (demo text when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// brief, detailed, bullets, keywords or abstract
        #[arg(short = 't', long = "type", default_value = "brief")]
        summary_type: SummaryType,

        /// Produce every summary type
        #[arg(long)]
        multi: bool,

        /// Write the summary to this file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Extract a knowledge graph from text and query it
    Kg {
        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long)]
        question: Option<String>,
    },

    /// Answer questions over one document
    Rag {
        /// Document to index
        #[arg(short, long)]
        file: PathBuf,

        /// Questions (default questions when omitted)
        questions: Vec<String>,
    },

    /// Answer a question over several documents
    Multidoc {
        /// Documents to index
        #[arg(short, long, required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        question: Option<String>,
    },

    /// Query the built-in knowledge base
    Kb {
        /// Questions (interactive when omitted)
        questions: Vec<String>,

        /// Run the scripted demo
        #[arg(long)]
        demo: bool,

        /// Write the interaction log to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Ask questions about the demo company database
    #[cfg(feature = "plugin-sql")]
    Sql {
        /// Questions (interactive when omitted)
        questions: Vec<String>,

        /// Run the built-in question set and report timings
        #[arg(long)]
        performance: bool,

        /// Print database analytics
        #[arg(long)]
        analytics: bool,

        /// Print suggested questions
        #[arg(long)]
        suggest: bool,

        /// Print the database schema
        #[arg(long)]
        schema: bool,

        /// Export the query history to this directory afterwards
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Web search agent with conversation memory
    WebSearch {
        /// Questions (interactive when omitted)
        questions: Vec<String>,

        /// Run the demo queries
        #[arg(long)]
        demo: bool,
    },

    /// Verify a claim with web evidence and a critic model
    FactCheck { claim: Option<String> },

    /// Exchange-rate tool agent with conversation memory
    ToolMemory {
        /// Questions (interactive when omitted)
        questions: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.model.as_deref())?;

    logger::init(&config.log_level, cli.verbose)?;

    info!(
        provider = %config.llm.provider,
        model = %config.active_model(),
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        verbose = cli.verbose,
        "config loaded"
    );

    let llm = providers::build(&config.llm, config.llm_api_key.clone())?;
    let ctx = AgentContext::new(config, llm);

    dispatch(ctx, cli.command).await
}

async fn dispatch(ctx: AgentContext, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Ping => {
            ctx.llm.ping().await?;
            println!("✓ {} is reachable", ctx.llm.model_name());
        }

        Commands::Explain { topics, custom_prompt, subject } => {
            let agent = BasicAgent::new(ctx);
            if let Some(template) = custom_prompt {
                let subject = subject.as_deref().unwrap_or(basic::DEMO_SUBJECT);
                println!("{}", agent.custom_query(&template, &[("subject", subject)]).await);
            } else if let [topic] = topics.as_slice() {
                println!("{}", agent.explain_topic(topic).await);
            } else {
                let topics = if topics.is_empty() {
                    basic::DEMO_TOPICS.iter().map(|t| t.to_string()).collect()
                } else {
                    topics
                };
                for (topic, answer) in agent.batch_explain(&topics).await {
                    println!("=== {topic} ===\n{}\n", preview(&answer, basic::PREVIEW_CHARS));
                }
            }
        }

        Commands::Codegen { description } => {
            let description = description.as_deref().unwrap_or(codegen::DEMO_DESCRIPTION);
            println!("{}", CodeGenAgent::new(ctx).generate_code(description).await);
        }

        Commands::Creative { idea } => {
            let idea = idea.as_deref().unwrap_or(creative::DEMO_IDEA);
            let work = CreativeAgent::new(ctx).create(idea).await?;
            println!("=== Story ===\n{}\n\n=== Poem ===\n{}", work.story, work.poem);
        }

        Commands::Extract { text } => {
            let text = text.as_deref().unwrap_or(extract::DEMO_TEXT);
            println!("{}", ExtractionAgent::new(ctx).extract(text).await);
        }

        Commands::Classify { text } => {
            let text = text.as_deref().unwrap_or(classify::DEMO_TEXT);
            println!("{}", ClassificationAgent::new(ctx).classify(text).await);
        }

        Commands::Translate { text, to } => {
            let text = text.as_deref().unwrap_or(translate::DEMO_TEXT);
            println!("{}", TranslationAgent::new(ctx).translate(text, &to).await);
        }

        Commands::Sentiment { text, examples, file } => {
            let agent = SentimentAgent::new(ctx);
            if examples {
                for (text, result) in agent.analyze_examples().await {
                    println!("{text}\n  -> {result}\n");
                }
            } else if let Some(path) = file {
                for item in agent.analyze_file(&path).await? {
                    println!("[{}] {}\n  -> {}\n", item.line, preview(&item.text, 80), item.result);
                }
            } else if let Some(text) = text {
                println!("{}", agent.analyze(&text).await);
            } else {
                interactive("Text: ", async |line: &str| agent.analyze(line).await).await?;
            }
        }

        Commands::Summarize { file, summary_type, multi, save } => {
            let agent = SummarizationAgent::new(ctx);
            if multi {
                let content = match &file {
                    Some(path) => tokio::fs::read_to_string(path).await?,
                    None => summarize::DEMO_CONTENT.to_string(),
                };
                for result in agent.multi_type_summary(&content).await {
                    println!("=== {} ===\n{}\n", result.summary_type, result.summary.as_deref().unwrap_or("-"));
                }
            } else {
                let result = match &file {
                    Some(path) => agent.summarize_from_file(path, summary_type).await,
                    None => agent.summarize(summarize::DEMO_CONTENT, summary_type).await,
                };
                match (&result.summary, &result.error) {
                    (Some(summary), _) => println!("{summary}"),
                    (None, Some(err)) => eprintln!("summary failed: {err}"),
                    (None, None) => {}
                }
                if let Some(path) = save {
                    summarize::save_summary(&result, &path, true)?;
                    println!("saved to {}", path.display());
                }
            }
        }

        Commands::Kg { text, question } => {
            let mut agent = KnowledgeGraphAgent::new(ctx);
            let added = agent.build_graph_from_text(text.as_deref().unwrap_or(knowledge_graph::DEMO_TEXT)).await?;
            println!("{added} relation(s) extracted:");
            for edge in agent.graph().edges() {
                println!("  {edge}");
            }
            let question = question.as_deref().unwrap_or(knowledge_graph::DEMO_QUESTION);
            println!("\nQ: {question}\n{}", agent.query(question).await);
        }

        Commands::Rag { file, questions } => {
            let mut system = RagSystem::new(ctx);
            let chunks = system.load_documents(&file);
            system.create_vectorstore(chunks).await?;
            let questions = if questions.is_empty() {
                rag::DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
            } else {
                questions
            };
            for q in &questions {
                let answer = system.query(q).await;
                println!("Q: {q}\nA: {}", answer.answer);
                println!("Sources: {}\n", answer.unique_sources().join(", "));
            }
        }

        Commands::Multidoc { files, question } => {
            let mut agent = MultiDocAgent::new(ctx);
            let chunks = agent.load_documents(&files)?;
            agent.create_vectorstore(chunks).await?;
            let question = question.as_deref().unwrap_or(multidoc::DEMO_QUESTION);
            let answer = agent.query(question).await;
            println!("Q: {question}\nA: {}", answer.answer);
            println!("Sources: {}", answer.unique_sources().join(", "));
        }

        Commands::Kb { questions, demo, export } => {
            let mut base = KnowledgeBase::with_defaults(ctx).await?;
            if demo {
                for q in kb::DEMO_QUERIES {
                    print_kb_answer(&base.query(q).await);
                }
                let (texts, metadata): (Vec<String>, Vec<_>) = kb::DEMO_EXTRA_DOCUMENTS
                    .iter()
                    .map(|(text, source, topic)| (text.to_string(), kb::demo_metadata(source, topic)))
                    .unzip();
                let added = base.add_documents(&texts, &metadata).await?;
                println!("added {added} chunk(s)\n");
                print_kb_answer(&base.query(kb::DEMO_FOLLOW_UP).await);
            } else if questions.is_empty() {
                interactive("Question: ", async |line: &str| {
                    let answer = base.query(line).await;
                    format!("{}\n({} source(s))", answer.answer, answer.sources.len())
                })
                .await?;
            } else {
                for q in &questions {
                    print_kb_answer(&base.query(q).await);
                }
            }
            let stats = base.stats();
            println!(
                "{} interaction(s), {:.1} source(s) on average",
                stats.total_interactions, stats.average_sources
            );
            if let Some(path) = export {
                base.export_log(&path)?;
                println!("log written to {}", path.display());
            }
        }

        #[cfg(feature = "plugin-sql")]
        Commands::Sql { questions, performance, analytics, suggest, schema, export } => {
            let mut agent = SqlAgent::new(ctx)?;
            if schema {
                println!("{}", agent.schema()?);
            } else if suggest {
                for q in agent.suggest_questions() {
                    println!("- {q}");
                }
            } else if analytics {
                print_json(&agent.analytics()?)?;
            } else if performance {
                let report = agent.test_performance().await;
                for r in &report.results {
                    println!("{} {} ({:.2}s)\n  -> {}", if r.success { "✓" } else { "✗" }, r.question, r.processing_time, r.answer);
                }
                println!(
                    "\n{}/{} succeeded, {:.2}s total, {:.2}s average",
                    report.successful, report.total_questions, report.total_time, report.average_time
                );
            } else if questions.is_empty() {
                interactive("Question: ", async |line: &str| agent.query(line).await.answer).await?;
            } else {
                for q in &questions {
                    let result = agent.query(q).await;
                    println!("Q: {q}\nA: {}\n", result.answer);
                }
            }
            if let Some(dir) = export {
                let path = agent.export_history(&dir)?;
                println!("history written to {}", path.display());
            }
        }

        Commands::WebSearch { questions, demo } => {
            let mut agent = WebSearchAgent::new(ctx)?;
            if demo || !questions.is_empty() {
                let queries: Vec<String> = if demo {
                    web_search::DEMO_QUERIES.iter().map(|q| q.to_string()).collect()
                } else {
                    questions
                };
                for q in &queries {
                    let response = agent.query(q).await;
                    println!("Q: {q}\nA: {}\n", response.output);
                }
            } else {
                interactive("You: ", async |line: &str| {
                    if line.eq_ignore_ascii_case("clear") {
                        agent.clear_memory();
                        return "Memory cleared.".to_string();
                    }
                    agent.query(line).await.output
                })
                .await?;
            }
        }

        Commands::FactCheck { claim } => {
            let agent = FactCheckAgent::new(ctx)?;
            let report = agent.check(claim.as_deref().unwrap_or(fact_check::DEMO_CLAIM)).await?;
            println!("Claim: {}\n\nEvidence:\n{}\n\nVerdict:\n{}", report.claim, report.evidence, report.verdict);
        }

        Commands::ToolMemory { questions } => {
            let mut agent = ToolMemoryAgent::new(ctx);
            if questions.is_empty() {
                let outcome = agent.ask(tool_memory::DEMO_QUESTION).await?;
                println!("Q: {}\nA: {}", tool_memory::DEMO_QUESTION, outcome.output);
                interactive("You: ", async |line: &str| match agent.ask(line).await {
                    Ok(outcome) => outcome.output,
                    Err(e) => format!("error: {e}"),
                })
                .await?;
            } else {
                for q in &questions {
                    let outcome = agent.ask(q).await?;
                    println!("Q: {q}\nA: {}\n", outcome.output);
                }
            }
        }
    }
    Ok(())
}

/// Drive `handle` from stdin until EOF or a quit word.
async fn interactive<F>(prompt: &str, handle: F) -> Result<(), AppError>
where
    F: AsyncFnMut(&str) -> String,
{
    println!("Type 'quit' or 'ออก' to exit.");
    let handled = run_loop(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), prompt, QUIT_WORDS, handle).await?;
    info!(handled, "interactive session ended");
    Ok(())
}

fn print_kb_answer(answer: &kb::KbAnswer) {
    println!("Q: {}\nA: {}", answer.question, answer.answer);
    for source in &answer.sources {
        println!("  - {}", preview(&source.content, 80));
    }
    println!();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}
