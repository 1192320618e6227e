mod config;
mod error;
mod export;
mod instrumentation;
mod llm;
mod research;
mod search;
mod server;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::Config;
use llm::GEMINI_MODELS;
use research::types::{AcademicLevel, ResearchRequest, DEFAULT_WORD_COUNT};
use research::Aggregator;

#[derive(Parser)]
#[command(
    name = "research-assistant",
    about = "Generate research content, videos, documents and expert leads for a topic"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose per-step output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a single topic
    Research {
        /// The research topic
        topic: String,

        #[arg(long, value_enum, default_value_t = AcademicLevel::Phd)]
        level: AcademicLevel,

        /// Field or domain of research
        #[arg(long, default_value = "")]
        area: String,

        /// Comma-separated keywords
        #[arg(long, default_value = "")]
        keywords: String,

        #[arg(
            long,
            default_value_t = DEFAULT_WORD_COUNT,
            value_parser = clap::value_parser!(u32).range(1000..=5000)
        )]
        word_count: u32,

        /// Skip the YouTube fan-out
        #[arg(long)]
        no_videos: bool,

        /// Skip live web search
        #[arg(long)]
        no_web_search: bool,

        /// Gemini model to use instead of the first in the priority list
        #[arg(long)]
        model: Option<String>,

        /// Write the full result as JSON to this file or directory
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write a plain-text summary to this file or directory
        #[arg(long)]
        export_summary: Option<PathBuf>,
    },
    /// Serve the session-scoped HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: String,
    },
    /// List Gemini models in priority order
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "research_assistant=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Models => {
            for (i, model) in GEMINI_MODELS.iter().enumerate() {
                println!("{}. {}", i + 1, model);
            }
        }
        Commands::Serve { addr } => {
            let config = Config::from_env()?;
            let aggregator = Aggregator::from_config(&config)?;
            server::serve(&addr, aggregator).await?;
        }
        Commands::Research {
            topic,
            level,
            area,
            keywords,
            word_count,
            no_videos,
            no_web_search,
            model,
            export_json,
            export_summary,
        } => {
            let mut config = Config::from_env()?;
            config.include_videos &= !no_videos;
            config.include_web_search &= !no_web_search;
            if model.is_some() {
                config.model = model;
            }

            let request = ResearchRequest {
                topic: topic.trim().to_string(),
                academic_level: level,
                research_area: area,
                keywords,
                word_count,
            };
            request.validate()?;

            let aggregator = Aggregator::from_config(&config)?;
            let (result, run_log) = aggregator.run_with_log(&request).await;

            let Some(data) = result.data else {
                anyhow::bail!(
                    "Error: {}",
                    result.error.unwrap_or_else(|| "unknown failure".into())
                );
            };

            println!("\n{}\n", data.content);
            if cli.verbose {
                for video in &data.videos {
                    eprintln!("[video] {} ({})", video.title, video.url);
                }
                for doc in &data.documents {
                    eprintln!("[document] {} {}", doc.title, doc.url);
                }
                for link in &data.links {
                    eprintln!("[link] {} {}", link.title, link.url);
                }
                for profile in &data.linkedin_profiles {
                    eprintln!("[profile] {} {}", profile.name, profile.linkedin_url);
                }
            }
            println!("{}", run_log.summary());

            if let Some(path) = export_json {
                let path = export_path(path, &export::json_file_name(&data.topic));
                std::fs::write(&path, export::to_json(&data)?)
                    .context(format!("Failed to write {}", path.display()))?;
                eprintln!("Saved {}", path.display());
            }
            if let Some(path) = export_summary {
                let path = export_path(path, &export::summary_file_name(&data.topic));
                std::fs::write(&path, export::to_summary(&data))
                    .context(format!("Failed to write {}", path.display()))?;
                eprintln!("Saved {}", path.display());
            }
        }
    }

    Ok(())
}

/// Directories get the topic-derived file name appended.
fn export_path(path: PathBuf, file_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(file_name)
    } else {
        path
    }
}
