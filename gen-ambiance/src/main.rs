mod client;
mod download;
mod output;
mod poll;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::AmbianceClient;
use gateway_client::{
    Ambiance, Config, FileBlob, Generation, GatewayError, GenerationOptions, GenerationRequest,
    GenerationResult, OutputFormat, PollableTask, ProviderKind,
};
use log::{info, warn};
use poll::{PollError, PollPolicy, wait_for_completion};
use std::path::{Path, PathBuf};

const CLIENT_ID: &str = "gen-ambiance";

#[derive(Parser, Debug)]
#[command(
    name = "gen-ambiance",
    about = "Generate ambient music and soundscapes",
    long_about = "Sends one generation request to a configured provider (Suno, Stability AI or a local MusicGen server), waits for the result and saves the audio"
)]
#[command(version)]
struct Args {
    /// Enable debug mode for verbose output
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate audio for an ambiance
    Generate(GenerateArgs),
    /// Check (or wait for) a task from an asynchronous provider
    Status(StatusArgs),
    /// List available ambiances
    Ambiances,
    /// List provider profiles
    Profiles,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Ambiance id (see `gen-ambiance ambiances`)
    ambiance: String,

    /// Profile to use (overrides default from config)
    #[arg(short, long)]
    profile: Option<String>,

    /// Request kind used to pick the default profile
    #[arg(short, long, default_value = "music")]
    kind: String,

    /// Custom prompt (replaces the ambiance prompt)
    #[arg(long)]
    prompt: Option<String>,

    /// Custom style tags
    #[arg(long)]
    style: Option<String>,

    /// Track title
    #[arg(long)]
    title: Option<String>,

    /// Styles to steer away from
    #[arg(long)]
    negative_tags: Option<String>,

    /// Style adherence, 0 to 1
    #[arg(long)]
    style_weight: Option<f64>,

    /// Creative deviation, 0 to 1
    #[arg(long)]
    weirdness: Option<f64>,

    /// Audio adherence, 0 to 1
    #[arg(long)]
    audio_weight: Option<f64>,

    /// Duration in seconds
    #[arg(long)]
    duration: Option<u32>,

    /// Output format (mp3 or wav)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Reference audio sent with multipart profiles
    #[arg(long)]
    upload: Option<PathBuf>,

    /// Where to save the audio
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Return the task id without waiting (asynchronous profiles)
    #[arg(long)]
    no_wait: bool,

    #[command(flatten)]
    poll: PollArgs,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct StatusArgs {
    /// Task id returned by `generate`
    task_id: String,

    /// Profile that issued the task (overrides default from config)
    #[arg(short, long)]
    profile: Option<String>,

    /// Keep checking until the task settles
    #[arg(short, long)]
    wait: bool,

    #[command(flatten)]
    poll: PollArgs,

    /// Where to save the audio
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct PollArgs {
    /// Maximum number of status checks
    #[arg(long, default_value_t = 60)]
    max_attempts: u32,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    interval: u64,
}

impl PollArgs {
    fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, self.interval)
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the default profile for a request kind
    SetDefault {
        /// Request kind (music or sound)
        kind: String,
        /// Profile name
        profile: String,
    },
    /// Store an API key for a profile
    SetKey {
        /// Profile name
        profile: String,
        /// API key
        key: String,
    },
    /// Point a profile at another base URL
    SetUrl {
        /// Profile name
        profile: String,
        /// Base URL
        url: String,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Self::Generate(args) => args.json,
            Self::Status(args) => args.json,
            _ => false,
        }
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle config subcommands
fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut config = Config::load()?;
            let path = Config::config_path()?;
            for provider in config.providers.values_mut() {
                if provider.api_key.is_some() {
                    provider.api_key = Some("********".to_string());
                }
            }
            println!("Config file: {}", path.display());
            println!();
            println!("{:#?}", config);
        }
        ConfigAction::SetDefault { kind, profile } => {
            let mut config = Config::load()?;
            let provider = ProviderKind::from_str(profile)?;
            if provider.request_kind() != kind.as_str() {
                anyhow::bail!(
                    "Profile '{}' serves '{}' requests, not '{}'",
                    provider.name(),
                    provider.request_kind(),
                    kind
                );
            }
            config
                .defaults
                .insert(kind.clone(), provider.name().to_string());
            config.save()?;
            println!("Default profile for {} set to: {}", kind, provider.name());
        }
        ConfigAction::SetKey { profile, key } => {
            let mut config = Config::load()?;
            config.provider_config_mut(profile)?.api_key = Some(key.clone());
            config.save()?;
            println!("API key stored for: {}", profile);
        }
        ConfigAction::SetUrl { profile, url } => {
            let mut config = Config::load()?;
            config.provider_config_mut(profile)?.base_url = Some(url.clone());
            config.save()?;
            println!("Base URL for {} set to: {}", profile, url);
        }
    }
    Ok(())
}

fn list_ambiances() -> Result<()> {
    let config = Config::load().context("Failed to load gen-ambiance configuration")?;
    let custom = config.custom_ambiances();
    println!("Available ambiances:");
    for ambiance in config.all_ambiances() {
        let marker = if custom.iter().any(|c| c.id == ambiance.id) {
            " (custom)"
        } else {
            ""
        };
        println!(
            "  {:<22} {} [{}]{}",
            ambiance.id, ambiance.name, ambiance.style_label, marker
        );
    }
    Ok(())
}

fn list_profiles() -> Result<()> {
    let config = Config::load().context("Failed to load gen-ambiance configuration")?;
    println!("Provider profiles:");
    for provider in ProviderKind::ALL {
        let name = provider.name();
        let default_marker = if config.get_default_for_kind(provider.request_kind()) == name {
            " (default)"
        } else {
            ""
        };
        let detail = if provider.is_available(config.get_provider_config(name)) {
            match config.profile(name) {
                Ok(profile) => format!(
                    "{}, {}",
                    if profile.is_async() { "async" } else { "sync" },
                    profile.base_url
                ),
                Err(e) => e.to_string(),
            }
        } else {
            format!(
                "missing API key (set {} or run `gen-ambiance config set-key {}`)",
                provider.env_var().unwrap_or_default(),
                name
            )
        };
        println!(
            "  {} - {} / {}{}",
            name,
            provider.request_kind(),
            detail,
            default_marker
        );
    }
    Ok(())
}

/// Caller options from the command line.
///
/// Profiles without ambiance templates still get the catalogue prompt.
fn generation_options(
    args: &GenerateArgs,
    known: Option<&Ambiance>,
    templated: bool,
) -> GenerationOptions {
    let prompt = args.prompt.clone().or_else(|| {
        if templated {
            None
        } else {
            known.and_then(|a| a.prompt.clone())
        }
    });

    GenerationOptions {
        ambiance_or_doc_type: args.ambiance.clone(),
        prompt,
        style: args.style.clone(),
        title: args.title.clone(),
        negative_tags: args.negative_tags.clone(),
        style_weight: args.style_weight,
        weirdness_constraint: args.weirdness,
        audio_weight: args.audio_weight,
        duration: args.duration,
        output_format: args.format,
    }
}

/// Build the normalized request for the client's profile
fn build_request(args: &GenerateArgs, client: &AmbianceClient) -> Result<GenerationRequest> {
    let profile = client.profile();
    let known = client.ambiance(&args.ambiance);
    if known.is_none() {
        warn!(
            "Unknown ambiance '{}'; {} will use its generic template",
            args.ambiance, profile.name
        );
    }

    let mut request = generation_options(args, known, !profile.templates.is_empty())
        .into_request(profile.kind.clone())
        .with_client_id(CLIENT_ID);

    if let Some(path) = &args.upload {
        request = request.with_file(read_upload(path)?);
    }

    Ok(request)
}

fn read_upload(path: &Path) -> Result<FileBlob> {
    let bytes = std::fs::read(path).context(format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid upload filename")?
        .to_string();
    Ok(FileBlob {
        field: "audio".to_string(),
        file_name,
        content_type: output::content_type_for(path).map(str::to_string),
        bytes,
    })
}

/// Report a settled task: save its artifact or turn its failure into an error
async fn finish_task(
    task: &PollableTask,
    output: Option<&Path>,
    stem: &str,
    format: OutputFormat,
    json: bool,
) -> Result<()> {
    let Some(result) = GenerationResult::from_task(task) else {
        if json {
            print_json(task)?;
        } else {
            println!("Task {} is {}", task.task_id, task.status.label());
        }
        return Ok(());
    };

    match &result {
        GenerationResult::Completed { artifact } => {
            let delivery = output::deliver(artifact, output, stem, format).await?;
            if json {
                print_json(&result)?;
            } else {
                println!("{}", delivery);
            }
            Ok(())
        }
        GenerationResult::Failed { message, .. } => {
            if json {
                print_json(&result)?;
            }
            anyhow::bail!("Task {} failed: {}", task.task_id, message)
        }
    }
}

async fn run_generate(args: &GenerateArgs) -> Result<()> {
    let kind = match &args.profile {
        Some(name) => ProviderKind::from_str(name)?.request_kind(),
        None => args.kind.as_str(),
    };
    let client = AmbianceClient::new(args.profile.as_deref(), kind)?;
    let request = build_request(args, &client)?;
    let format = args.format.unwrap_or_default();

    info!(
        "Generating '{}' with {}",
        args.ambiance,
        client.profile().name
    );
    let generation = client
        .generate(&request)
        .await
        .context(format!("Generation with '{}' failed", client.profile().name))?;

    match generation {
        Generation::Completed(artifact) => {
            let delivery =
                output::deliver(&artifact, args.output.as_deref(), &args.ambiance, format).await?;
            if args.json {
                print_json(&GenerationResult::Completed { artifact })?;
            } else {
                println!("{}", delivery);
            }
            Ok(())
        }
        Generation::Pending(task) if args.no_wait => {
            if args.json {
                print_json(&task)?;
            } else {
                println!("Task queued: {}", task.task_id);
                println!("Check it with: gen-ambiance status {} --wait", task.task_id);
            }
            Ok(())
        }
        Generation::Pending(task) => {
            println!("Task queued: {}", task.task_id);
            let task = wait_for_completion(
                client.gateway(),
                &task.task_id,
                &args.poll.policy(),
                |attempt, task| info!("[{}] {}", attempt, task.status.label()),
            )
            .await?;
            finish_task(&task, args.output.as_deref(), &args.ambiance, format, args.json).await
        }
    }
}

async fn run_status(args: &StatusArgs) -> Result<()> {
    let client = AmbianceClient::new(args.profile.as_deref(), "music")?;
    client.resume(&args.task_id)?;

    let task = if args.wait {
        wait_for_completion(
            client.gateway(),
            &args.task_id,
            &args.poll.policy(),
            |attempt, task| info!("[{}] {}", attempt, task.status.label()),
        )
        .await?
    } else {
        client.gateway().poll_status(&args.task_id).await?
    };

    finish_task(
        &task,
        args.output.as_deref(),
        &args.task_id,
        OutputFormat::default(),
        args.json,
    )
    .await
}

async fn run(command: &Commands) -> Result<()> {
    match command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Status(args) => run_status(args).await,
        Commands::Ambiances => list_ambiances(),
        Commands::Profiles => list_profiles(),
        Commands::Config { action } => handle_config_command(action),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let result = run(&args.command).await;

    if let Err(e) = &result {
        if args.command.wants_json() {
            if let Some(gateway_err) = e.downcast_ref::<GatewayError>() {
                print_json(&GenerationResult::from_error(gateway_err))?;
            } else if let Some(PollError::Exhausted { task, .. }) = e.downcast_ref::<PollError>() {
                print_json(task)?;
            }
        }
    }

    result
}
