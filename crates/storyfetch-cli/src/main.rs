//! storyfetch CLI - download stories and list channels from the command line

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::time::Duration;
use storyfetch::{
    fetch_page, strip_html, Extractor, FetchOptions, FfnetExtractor, SolverConfig, Story,
    DEFAULT_SOLVER_PORT,
};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for story and channel subcommands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// storyfetch - story extraction through a Cloudflare challenge solver
#[derive(Parser, Debug)]
#[command(name = "storyfetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    fetch: FetchArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// FlareSolverr port on localhost
    #[arg(long, global = true, env = "FLARESOLVERR_PORT", default_value_t = DEFAULT_SOLVER_PORT)]
    flaresolverr_port: u16,

    /// Fetch directly, without FlareSolverr
    #[arg(long, global = true)]
    no_flaresolverr: bool,

    /// Challenge-solving budget per request, in milliseconds
    #[arg(long, global = true, default_value_t = 60_000)]
    max_timeout: u64,

    /// Attempts per page through FlareSolverr
    #[arg(long, global = true, default_value_t = 3)]
    max_retries: u32,

    /// Custom User-Agent for direct fetches
    #[arg(long, global = true)]
    user_agent: Option<String>,
}

impl FetchArgs {
    fn solver(&self) -> Option<SolverConfig> {
        if self.no_flaresolverr {
            return None;
        }
        Some(
            SolverConfig::for_port(self.flaresolverr_port)
                .max_timeout(Duration::from_millis(self.max_timeout))
                .max_retries(self.max_retries),
        )
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: self.user_agent.clone(),
            request_timeout: None,
            solver: self.solver(),
        }
    }

    fn extractor(&self) -> Option<FfnetExtractor> {
        let mut builder = FfnetExtractor::builder();
        if let Some(config) = self.solver() {
            builder = builder.solver(config);
        }
        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        match builder.build() {
            Ok(extractor) => Some(extractor),
            Err(e) => {
                eprintln!("Error: {}", e);
                None
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a story and print it as markdown with metadata frontmatter
    Story {
        /// Story or chapter URL
        url: String,

        /// Only scan the story page, skip chapters
        #[arg(long)]
        metadata_only: bool,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
    /// List the stories behind an author or collection URL
    Channel {
        /// Author or collection URL
        url: String,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
    /// Fetch a page through the fetcher chain and print its HTML
    Fetch {
        /// URL to fetch
        url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyfetch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Story {
            url,
            metadata_only,
            output,
        } => run_story(&cli.fetch, &url, metadata_only, output).await,
        Commands::Channel { url, output } => run_channel(&cli.fetch, &url, output).await,
        Commands::Fetch { url } => run_fetch(&cli.fetch, &url).await,
    };

    if !ok {
        std::process::exit(1);
    }
}

async fn run_story(args: &FetchArgs, url: &str, metadata_only: bool, output: OutputFormat) -> bool {
    let Some(mut extractor) = args.extractor() else {
        return false;
    };
    if !extractor.supports(url) {
        eprintln!("Error: unsupported site: {}", url);
        return false;
    }

    extractor.initialize(url);
    if !extractor.scan_story().await {
        extractor.shutdown().await;
        eprintln!("Error: failed to scan story: {}", url);
        return false;
    }

    let mut chapters = Vec::new();
    if !metadata_only {
        for index in 1..=extractor.chapter_urls().len() {
            match extractor.extract_chapter(index).await {
                Some(chapter) => chapters.push(chapter),
                None => warn!(index, "Skipping chapter"),
            }
        }
    }
    extractor.shutdown().await;

    let Some(story) = extractor.story_mut() else {
        return false;
    };
    story.chapters = chapters;

    match output {
        OutputFormat::Md => writeln_safe(&format_story_md(story)),
        OutputFormat::Json => match serde_json::to_string_pretty(&*story) {
            Ok(json) => writeln_safe(&json),
            Err(e) => {
                eprintln!("Error serializing story: {}", e);
                return false;
            }
        },
    }
    true
}

async fn run_channel(args: &FetchArgs, url: &str, output: OutputFormat) -> bool {
    let Some(extractor) = args.extractor() else {
        return false;
    };
    let urls = extractor.scan_channel(url).await;
    extractor.shutdown().await;

    let Some(urls) = urls else {
        eprintln!("Error: failed to scan channel: {}", url);
        return false;
    };

    match output {
        OutputFormat::Md => {
            if !urls.is_empty() {
                writeln_safe(&urls.join("\n"));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&urls) {
            Ok(json) => writeln_safe(&json),
            Err(e) => {
                eprintln!("Error serializing channel: {}", e);
                return false;
            }
        },
    }
    true
}

async fn run_fetch(args: &FetchArgs, url: &str) -> bool {
    match fetch_page(url, &args.options()).await {
        Ok(page) => {
            writeln_safe(&page.html);
            true
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

/// Format a story as markdown with YAML frontmatter
fn format_story_md(story: &Story) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    match story.metadata {
        Some(ref metadata) => {
            output.push_str(&format!("url: {}\n", metadata.url));
            output.push_str(&format!("title: {}\n", yaml_string(&metadata.title)));
            output.push_str(&format!("author: {}\n", yaml_string(&metadata.author)));
            output.push_str(&format!("date_published: {}\n", metadata.date_published));
            output.push_str(&format!("date_updated: {}\n", metadata.date_updated));
            output.push_str(&format!("chapters: {}\n", metadata.chapter_count));
            output.push_str(&format!("words: {}\n", metadata.word_count));
        }
        None => output.push_str(&format!("url: {}\n", story.url)),
    }
    output.push_str("---\n");

    if let Some(ref metadata) = story.metadata {
        output.push_str(&format!("# {}\n", metadata.title));
        if !metadata.summary.is_empty() {
            output.push_str(&format!("\n{}\n", metadata.summary));
        }
    }

    for (index, chapter) in story.chapters.iter().enumerate() {
        let title = chapter
            .title
            .clone()
            .unwrap_or_else(|| format!("Chapter {}", index + 1));
        output.push_str(&format!("\n## {}\n\n{}\n", title, strip_html(&chapter.content)));
    }

    output
}

/// Quote a frontmatter value when YAML would misread it
fn yaml_string(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c));
    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storyfetch::{Chapter, StoryMetadata};

    fn metadata() -> StoryMetadata {
        StoryMetadata {
            url: "https://www.fanfiction.net/s/12345/".to_string(),
            title: "The Long Road".to_string(),
            author: "Writer".to_string(),
            summary: "Two travellers and a map.".to_string(),
            date_published: NaiveDate::from_ymd_opt(2011, 3, 31).unwrap(),
            date_updated: NaiveDate::from_ymd_opt(2012, 7, 4).unwrap(),
            chapter_count: 2,
            word_count: 4200,
        }
    }

    #[test]
    fn test_format_story_md() {
        let mut story = Story::new("https://www.fanfiction.net/s/12345/1/The-Long-Road");
        story.metadata = Some(metadata());
        story.chapters = vec![
            Chapter {
                title: Some("Beginnings".to_string()),
                content: "<p>It was a dark night.</p><p>Then dawn.</p>".to_string(),
            },
            Chapter {
                title: None,
                content: "<p>The end.</p>".to_string(),
            },
        ];

        let output = format_story_md(&story);

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://www.fanfiction.net/s/12345/\n"));
        assert!(output.contains("title: The Long Road\n"));
        assert!(output.contains("date_published: 2011-03-31\n"));
        assert!(output.contains("date_updated: 2012-07-04\n"));
        assert!(output.contains("chapters: 2\n"));
        assert!(output.contains("words: 4200\n"));
        assert!(output.contains("---\n# The Long Road\n\nTwo travellers and a map.\n"));
        assert!(output.contains("\n## Beginnings\n\nIt was a dark night."));
        assert!(output.contains("\n## Chapter 2\n\nThe end.\n"));
        assert!(!output.contains("<p>"));
    }

    #[test]
    fn test_format_story_md_without_metadata() {
        let story = Story::new("https://www.fanfiction.net/s/1/");
        let output = format_story_md(&story);
        assert_eq!(output, "---\nurl: https://www.fanfiction.net/s/1/\n---\n");
    }

    #[test]
    fn test_format_story_md_metadata_only() {
        let mut story = Story::new("https://www.fanfiction.net/s/12345/");
        story.metadata = Some(metadata());
        let output = format_story_md(&story);
        assert!(!output.contains("## "));
    }

    #[test]
    fn test_yaml_string() {
        assert_eq!(yaml_string("Plain title"), "Plain title");
        assert_eq!(yaml_string("Part 1: Arrival"), "\"Part 1: Arrival\"");
        assert_eq!(yaml_string("\"Quoted\""), "\"\\\"Quoted\\\"\"");
        assert_eq!(yaml_string("*Stars*"), "\"*Stars*\"");
        assert_eq!(yaml_string(""), "\"\"");
    }

    #[test]
    fn test_cli_parses_story_command() {
        let cli = Cli::try_parse_from([
            "storyfetch",
            "story",
            "https://www.fanfiction.net/s/1/",
            "--metadata-only",
            "--output",
            "json",
            "--flaresolverr-port",
            "8192",
        ])
        .unwrap();

        assert_eq!(cli.fetch.flaresolverr_port, 8192);
        match cli.command {
            Commands::Story {
                url,
                metadata_only,
                output,
            } => {
                assert_eq!(url, "https://www.fanfiction.net/s/1/");
                assert!(metadata_only);
                assert_eq!(output, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_args_solver() {
        let cli = Cli::try_parse_from([
            "storyfetch",
            "--max-timeout",
            "30000",
            "--max-retries",
            "5",
            "fetch",
            "https://example.com/",
        ])
        .unwrap();
        let solver = cli.fetch.solver().unwrap();
        assert_eq!(solver.max_timeout, Duration::from_millis(30_000));
        assert_eq!(solver.max_retries, 5);

        let cli = Cli::try_parse_from(["storyfetch", "fetch", "https://example.com/", "--no-flaresolverr"])
            .unwrap();
        assert!(cli.fetch.solver().is_none());
        assert!(cli.fetch.options().solver.is_none());
    }
}
