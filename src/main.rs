use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use tivohome::common::types::TargetView;
use tivohome::core::config::{Settings, settings_path};
use tivohome::core::{launch, prefs, uninstall};
use tivohome::daemon;

#[derive(Parser)]
#[command(name = "tivohome")]
#[command(version, about = "TiVo Stream 4K home redirection daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (the default when no subcommand is given).
    Run,
    /// Best-effort removal of the pre-loaded OEM apps.
    UninstallOem,
    /// Launch Channels DVR, optionally straight into a view.
    Launch {
        #[arg(value_enum, long)]
        view: Option<ViewArg>,
    },
    /// Set or clear the auto-launch suppression flag.
    Suppress {
        #[arg(value_enum)]
        state: OnOff,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Guide,
    DvrLibrary,
    Live,
}

impl From<ViewArg> for TargetView {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Guide => TargetView::Guide,
            ViewArg::DvrLibrary => TargetView::DvrLibrary,
            ViewArg::Live => TargetView::Live,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OnOff {
    On,
    Off,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(settings_path())?;

    let base_filter = EnvFilter::new(settings.daemon.log_level.clone());
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter);
    let timer = tracing_subscriber::fmt::time::UtcTime::new(
        time::format_description::parse("[hour]:[minute]:[second]").unwrap(),
    );

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_level(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            tracing::info!(
                "tivohome v{} started (redirect={}, channels={}, persistence={}ms)",
                env!("CARGO_PKG_VERSION"),
                settings.target.redirect_package,
                settings.target.channels_package,
                settings.daemon.persistence_ms
            );
            daemon::run::run_with_settings(settings, filter_handle).await
        }
        Commands::UninstallOem => {
            let mut port = uninstall::ShellUninstallPort;
            let results = uninstall::uninstall_oem_packages(&mut port, &settings.oem).await;
            for (pkg, outcome) in &results {
                println!("{pkg}: {outcome}");
            }
            Ok(())
        }
        Commands::Launch { view } => {
            if !launch::launch_view(&settings.target, view.map(Into::into)).await {
                anyhow::bail!("Channels launch failed");
            }
            Ok(())
        }
        Commands::Suppress { state } => prefs::set_suppressed(matches!(state, OnOff::On)),
    }
}
