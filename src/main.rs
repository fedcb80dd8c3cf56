use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use surveyor::agent::{QueryOptions, ResearchAgent, ResearchOutcome, ResearchResults};
use surveyor::command::{parse_command, Command, HELP_TEXT};
use surveyor::config::AppConfig;
use surveyor::progress::{LogObserver, SharedObserver};
use surveyor::report::ReportFormat;
use surveyor::retrieval::validate_query;
use surveyor::session::{SessionStore, DEFAULT_QUERY_K};
use surveyor::util::{arxiv_categories, estimate_reading_time, suggest_related_keywords, truncate_text};

/// Survey recent arXiv papers on a topic with LLM summaries and trend analysis
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Research query or topic
    query: Option<String>,
    /// Maximum number of papers to retrieve (default from config: 15)
    #[arg(long)]
    max_papers: Option<usize>,
    /// Number of days to look back (default from config: 730)
    #[arg(long)]
    days_back: Option<i64>,
    /// Skip the per-paper deep analysis pass
    #[arg(long)]
    no_deep_analysis: bool,
    /// Run the interactive command loop
    #[arg(short, long)]
    interactive: bool,
    /// Compare two research topics
    #[arg(long, num_args = 2, value_names = ["TOPIC1", "TOPIC2"])]
    compare: Option<Vec<String>>,
    /// Store the results of the query as a named session
    #[arg(long, value_name = "NAME")]
    store: Option<String>,
    /// Also export the results as md, bib or json
    #[arg(long, default_value = "md")]
    format: ReportFormat,
    /// List stored sessions and exit
    #[arg(long)]
    list_sessions: bool,
    /// Directory holding stored sessions (overrides config)
    #[arg(long)]
    sessions_dir: Option<PathBuf>,
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // Reject bad input before touching config or providers
    if let Some(query) = &args.query {
        validate_query(query)?;
    }
    if let Some(topics) = &args.compare {
        for topic in topics {
            validate_query(topic)?;
        }
    }

    let mut config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(dir) = &args.sessions_dir {
        config.session.persist_root = dir.clone();
    }

    if args.list_sessions {
        let store = SessionStore::new(config.session.persist_root.clone(), None);
        print_sessions(&store, &store.list()?);
        return Ok(());
    }

    if !args.interactive && args.compare.is_none() && args.query.is_none() {
        Args::command().print_help()?;
        return Ok(());
    }

    let observer: SharedObserver = Arc::new(LogObserver);
    let agent = ResearchAgent::from_config(&config, observer)?;

    if args.store.is_some() && !agent.sessions().has_embedder() {
        bail!("--store needs an embedding API key (session.api_key or OPENAI_API_KEY)");
    }

    if args.interactive {
        return interactive_mode(&agent);
    }

    if let Some(topics) = &args.compare {
        let results = agent.compare_topics(&topics[0], &topics[1], args.max_papers)?;
        println!("Comparison report saved to: {}", results.report_path.display());
        return Ok(());
    }

    if let Some(query) = &args.query {
        let options = QueryOptions {
            max_papers: args.max_papers,
            days_back: args.days_back,
            deep_analysis: !args.no_deep_analysis,
        };
        let Some(results) = run_query(&agent, query, &options)? else {
            return Ok(());
        };

        if args.format != ReportFormat::Markdown {
            let path = agent.export(&results, args.format)?;
            println!("{} export saved to: {}", args.format, path.display());
        }
        if let Some(name) = &args.store {
            let metadata = agent.store_session(name, &results)?;
            println!("Session '{}' stored with {} papers", metadata.session_name, metadata.num_papers);
        }
    }

    Ok(())
}

fn run_query(agent: &ResearchAgent, query: &str, options: &QueryOptions) -> Result<Option<ResearchResults>> {
    info!("Research query: {}", query);
    match agent.run_research_query(query, options)? {
        ResearchOutcome::Completed(results) => {
            let words = results.report.split_whitespace().count();
            println!(
                "Report saved to: {} ({} read)",
                results.report_path.display(),
                estimate_reading_time(words)
            );
            Ok(Some(*results))
        }
        ResearchOutcome::NoPapers { suggestions } => {
            println!("No papers found. Try adjusting your query.");
            if !suggestions.is_empty() {
                println!("\nSuggestions:");
                for suggestion in suggestions {
                    println!("  - {}", suggestion);
                }
            }
            let related = suggest_related_keywords(query);
            if !related.is_empty() {
                println!("Related keywords: {}", related.join(", "));
            }
            Ok(None)
        }
    }
}

fn print_sessions(store: &SessionStore, sessions: &[String]) {
    if sessions.is_empty() {
        println!("No stored sessions found in {}", store.root().display());
        return;
    }
    println!("Stored research sessions in {}:", store.root().display());
    for session in sessions {
        println!("  {}", session);
    }
}

fn interactive_mode(agent: &ResearchAgent) -> Result<()> {
    println!("Interactive mode. Type /help for commands.");

    let mut state = InteractiveState::default();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\nquery> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };

        // Workflow errors are reported and the loop continues
        match handle_command(agent, parse_command(&line?), &mut state) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => warn!("{:#}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

#[derive(Default)]
struct InteractiveState {
    current: Option<ResearchResults>,
    active_session: Option<String>,
}

/// Run one command; `Ok(false)` ends the loop
fn handle_command(agent: &ResearchAgent, command: Command, state: &mut InteractiveState) -> Result<bool> {
    match command {
        Command::Empty => {}
        Command::Exit => return Ok(false),
        Command::Help => {
            println!("{}", HELP_TEXT);
            println!("\nCommon categories:");
            for (code, description) in arxiv_categories() {
                println!("  {:<16} {}", code, description);
            }
        }
        Command::Invalid(message) => println!("{}", message),
        Command::Search(query) => {
            if let Some(results) = run_query(agent, &query, &QueryOptions::default())? {
                state.current = Some(results);
            }
        }
        Command::Compare(first, second) => {
            let results = agent.compare_topics(&first, &second, None)?;
            println!("Comparison report saved to: {}", results.report_path.display());
        }
        Command::Store(name) => match &state.current {
            Some(results) => {
                let metadata = agent.store_session(&name, results)?;
                println!("Session '{}' stored with {} papers", name, metadata.num_papers);
                state.active_session = Some(name);
            }
            None => println!("No active results to store"),
        },
        Command::Load(name) => {
            println!("{}", agent.export_session_summary(&name)?);
            state.active_session = Some(name);
        }
        Command::Query(text) => match &state.active_session {
            Some(name) => {
                let hits = agent.query_session(name, &text, DEFAULT_QUERY_K)?;
                if hits.is_empty() {
                    println!("No results");
                }
                for (i, hit) in hits.iter().enumerate() {
                    println!("{}. Relevance: {:.3}", i + 1, hit.score);
                    println!("Type: {}", hit.kind.as_str());
                    println!("{}\n", truncate_text(&hit.text, 300));
                }
            }
            None => println!("No active session; use /load NAME or /store NAME first"),
        },
        Command::Update(name) => match &state.current {
            Some(results) => {
                let added = agent.update_session(&name, &results.papers)?;
                println!("Added {} new papers to session '{}'", added, name);
            }
            None => println!("No active results to add"),
        },
        Command::Export(format) => match &state.current {
            Some(results) => {
                let path = agent.export(results, format)?;
                println!("{} export saved to: {}", format, path.display());
            }
            None => println!("No active results to export"),
        },
        Command::Delete(name) => {
            agent.delete_session(&name)?;
            if state.active_session.as_deref() == Some(name.as_str()) {
                state.active_session = None;
            }
            println!("Session '{}' deleted", name);
        }
        Command::List => print_sessions(agent.sessions(), &agent.list_sessions()?),
    }
    Ok(true)
}
