//! CLI argument parsing with clap derive

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::{
    model::FileInput,
    provider::{CaptionProvider, HttpCaptionProvider, PlaceholderProvider},
    services::{InMemoryPreviewService, PreviewService, TempDirPreviewService},
    session::CaptionSession,
    settings::{AppSettings, ProviderKind},
    shell,
    state_machine::CaptionWorkflow,
    store::SettingsStore,
};

/// Generate bilingual (English/Malay) alt text for images
#[derive(Parser)]
#[command(
    name = "hurai",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Caption a single image and print the result
    Caption(CaptionArgs),

    /// Interactive session: set a key, pick files, submit, cancel
    Shell(ShellArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Clone, Default)]
pub struct ConnectionArgs {
    /// Caption service base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Use the offline placeholder provider instead of the caption service
    #[arg(long)]
    pub placeholder: bool,
}

#[derive(Args)]
pub struct CaptionArgs {
    /// Image to caption (.jpg, .jpeg or .png)
    pub image: PathBuf,

    /// HuggingFace Inference API key
    #[arg(long, env = "HUGGING_FACE_API_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Media type to declare instead of the one derived from the extension
    #[arg(long, value_name = "TYPE")]
    pub media_type: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct ShellArgs {
    /// HuggingFace Inference API key to start with
    #[arg(long, env = "HUGGING_FACE_API_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Directory for preview files
    #[arg(long, value_name = "DIR")]
    pub preview_dir: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show,
    /// Print the settings file location
    Path,
    /// Write default settings to the settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let store = match &self.config {
            Some(path) => SettingsStore::new(path.clone()),
            None => SettingsStore::default_location()?,
        };
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        match self.command {
            Command::Caption(args) => run_caption(&store, args, &mut out).await,
            Command::Shell(args) => run_shell(&store, args, &mut out).await,
            Command::Config(command) => run_config(&store, command, &mut out),
        }
    }
}

async fn run_caption(store: &SettingsStore, args: CaptionArgs, out: &mut impl Write) -> Result<()> {
    let settings = resolve_settings(store, &args.connection)?;
    let previews: Arc<dyn PreviewService> = Arc::new(InMemoryPreviewService::default());
    let mut session = CaptionSession::new(CaptionWorkflow::new(previews), build_provider(&settings)?);

    let input = read_file_input(&args.image, args.media_type.as_deref())?;
    let workflow = session.workflow_mut();
    workflow.set_credential(args.key.unwrap_or_default());
    workflow.select_file(Some(input))?;

    if session.submit().is_some() {
        session.settle().await;
    }

    let workflow = session.workflow();
    if let Some(error) = workflow.error() {
        anyhow::bail!("{error}");
    }
    let Some(result) = workflow.result() else {
        anyhow::bail!("no caption received");
    };

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
    } else {
        for line in result.display_lines() {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

async fn run_shell(store: &SettingsStore, args: ShellArgs, out: &mut impl Write) -> Result<()> {
    let mut settings = resolve_settings(store, &args.connection)?;
    if args.preview_dir.is_some() {
        settings.preview_dir = args.preview_dir;
    }
    let previews: Arc<dyn PreviewService> =
        Arc::new(TempDirPreviewService::new(settings.preview_dir()));
    let mut session = CaptionSession::new(CaptionWorkflow::new(previews), build_provider(&settings)?);
    if let Some(key) = args.key {
        session.workflow_mut().set_credential(key);
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    // returning drops the session, which removes any preview file
    shell::run(&mut session, stdin, out, interrupted).await
}

fn run_config(store: &SettingsStore, command: ConfigCommand, out: &mut impl Write) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let settings = store.load()?.with_env()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", store.path().display())?;
        }
        ConfigCommand::Init { force } => {
            if store.path().exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    store.path().display()
                );
            }
            store.save(&AppSettings::default())?;
            writeln!(out, "Wrote {}", store.path().display())?;
        }
    }
    Ok(())
}

/// File, then `HURAI_*` environment, then command-line flags.
pub fn resolve_settings(store: &SettingsStore, connection: &ConnectionArgs) -> Result<AppSettings> {
    let mut settings = store.load()?.with_env()?;
    if let Some(base_url) = &connection.base_url {
        settings.base_url = base_url.clone();
    }
    if connection.placeholder {
        settings.provider = ProviderKind::Placeholder;
    }
    tracing::debug!(?settings, "settings resolved");
    Ok(settings)
}

pub fn build_provider(settings: &AppSettings) -> Result<Arc<dyn CaptionProvider>> {
    let provider: Arc<dyn CaptionProvider> = match settings.provider {
        ProviderKind::Http => Arc::new(HttpCaptionProvider::new(settings)?),
        ProviderKind::Placeholder => Arc::new(PlaceholderProvider),
    };
    tracing::debug!(provider = provider.display_name(), "provider ready");
    Ok(provider)
}

/// Reads an image from disk the way a file picker would hand it over.
pub fn read_file_input(path: &Path, media_type: Option<&str>) -> Result<FileInput> {
    let data = std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = media_type
        .map(str::to_string)
        .unwrap_or_else(|| media_type_for_path(path).to_string());
    Ok(FileInput::new(name, media_type, data))
}

pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
