use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunnel_dashboard::dashboard::{Dashboard, DashboardConfig};
use tunnel_dashboard::forms::{self, ConfirmPrompt, DialogPrompt, SubmitOutcome, TerminalPrompt};
use tunnel_dashboard::page::{self, FormDescriptor, PageDescriptor};
use tunnel_dashboard::poller::{HttpStatusSource, StatusPoller, StatusSource};

#[derive(Parser)]
#[command(name = "tunnel-dashboard")]
#[command(about = "Headless driver for the tunnel management dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a rendered page and keep its tunnel cards up to date
    Watch {
        /// Page descriptor (JSON) listing cards, charts and forms
        #[arg(short, long)]
        page: PathBuf,

        /// Base URL of the dashboard backend
        #[arg(short, long, default_value = "http://localhost:5000")]
        base_url: String,

        /// Interval between status polls in seconds
        #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Per-request timeout in seconds (no timeout when omitted)
        #[arg(long)]
        request_timeout: Option<u64>,

        /// Path to store log files
        #[arg(short, long, default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Fetch and print the status of a single tunnel
    Status {
        /// Tunnel name
        name: String,

        /// Base URL of the dashboard backend
        #[arg(short, long, default_value = "http://localhost:5000")]
        base_url: String,
    },
    /// Validate the tunnel creation form
    ValidateTunnel {
        /// Value of the tunnel name field
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// Validate the service addition form
    ValidateService {
        /// Service name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Local port the service listens on
        #[arg(short, long, default_value = "")]
        port: String,

        /// Public domain routed to the service
        #[arg(short, long, default_value = "")]
        domain: String,
    },
    /// Ask for confirmation, then submit a delete form from a page
    Delete {
        /// Page descriptor (JSON) containing the form
        #[arg(short, long)]
        page: PathBuf,

        /// Id of the form to submit
        #[arg(short, long)]
        form: String,

        /// Confirmation message
        #[arg(short, long, default_value = "¿Estás seguro de que quieres eliminar este elemento?")]
        message: String,

        /// Ask on the terminal instead of a dialog window
        #[arg(long, default_value = "false")]
        no_gui: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            page,
            base_url,
            interval,
            request_timeout,
            log_dir,
        } => {
            // Set up logging
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = RollingFileAppender::new(Rotation::HOURLY, &log_dir, "tunnel-dashboard.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();

            let config = DashboardConfig {
                base_url,
                poll_interval: Duration::from_secs(interval),
                request_timeout: request_timeout.map(Duration::from_secs),
            };

            info!("Starting tunnel dashboard");
            info!("Page: {:?}", page);
            info!("Backend: {}", config.base_url);
            info!("Polling interval: {}s", interval);

            // Attach behavior to the rendered page
            let mut dashboard = Dashboard::from_descriptor(page::load_page(&page)?);
            let report = dashboard.bootstrap();
            if !report.polling {
                info!("Page has no tunnel cards, nothing to poll");
                return Ok(());
            }

            // Create poller
            let dashboard = Arc::new(Mutex::new(dashboard));
            let source = Arc::new(HttpStatusSource::new(&config)?);
            let poller = StatusPoller::new(dashboard, source, config.poll_interval)?;

            // Poll until Ctrl+C
            info!("Press Ctrl+C to stop");
            tokio::select! {
                _ = poller.start() => {}
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Shutting down...");
                }
            }
            Ok(())
        }
        Commands::Status { name, base_url } => {
            init_console_logging();
            let source = HttpStatusSource::new(&DashboardConfig {
                base_url,
                ..Default::default()
            })?;
            let status = source.fetch_status(&name).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::ValidateTunnel { name } => {
            init_console_logging();
            let form = FormDescriptor::new(forms::CREATE_TUNNEL_FORM).with_field(forms::FIELD_TUNNEL_NAME, &name);
            run_form(form);
            Ok(())
        }
        Commands::ValidateService { name, port, domain } => {
            init_console_logging();
            let form = FormDescriptor::new(forms::ADD_SERVICE_FORM)
                .with_field(forms::FIELD_SERVICE_NAME, &name)
                .with_field(forms::FIELD_SERVICE_PORT, &port)
                .with_field(forms::FIELD_DOMAIN, &domain);
            run_form(form);
            Ok(())
        }
        Commands::Delete {
            page,
            form,
            message,
            no_gui,
        } => {
            init_console_logging();
            let mut dashboard = Dashboard::from_descriptor(page::load_page(&page)?);
            dashboard.bootstrap();

            // The dialog blocks, keep it off the async workers
            let prompt = confirm_prompt(no_gui);
            let target = form.clone();
            let dashboard = tokio::task::spawn_blocking(move || {
                dashboard.confirm_deletion(prompt.as_ref(), &target, &message);
                dashboard
            })
            .await?;

            match dashboard.form(&form) {
                Some(f) if f.submitted => println!("Form {} submitted", form),
                Some(_) => println!("Cancelled"),
                None => anyhow::bail!("Page has no form with id {}", form),
            }
            Ok(())
        }
    }
}

fn confirm_prompt(no_gui: bool) -> Box<dyn ConfirmPrompt + Send> {
    if no_gui {
        Box::new(TerminalPrompt)
    } else {
        Box::new(DialogPrompt::default())
    }
}

fn init_console_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(fmt::layer())
        .init();
}

/// Bootstrap a page holding just `form`, submit it and report the result.
fn run_form(form: FormDescriptor) {
    let id = form.id.clone();
    let mut dashboard = Dashboard::from_descriptor(PageDescriptor {
        forms: vec![form],
        ..Default::default()
    });
    dashboard.bootstrap();

    match dashboard.submit_form(&id) {
        Some(SubmitOutcome::Proceed) => {
            if let Some(form) = dashboard.form(&id) {
                println!("OK: {} ({})", id, form.submit_button.label);
            }
        }
        Some(SubmitOutcome::Prevented) => {
            println!("Submission of {} blocked:", id);
            for field in dashboard.form(&id).into_iter().flat_map(|f| f.fields.iter()) {
                if let Some(feedback) = &field.feedback {
                    println!("  {}: {}", field.name, feedback.text);
                }
            }
        }
        None => {}
    }
}
