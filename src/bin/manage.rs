//! Blogicum management CLI
//!
//! ```bash
//! manage migrate
//! manage createsuperuser --username admin --email admin@example.com
//! manage runserver --addr 0.0.0.0:8000
//! manage clearsessions
//! manage check
//! ```

use anyhow::{Context, bail};
use blogicum::apps::users::models::{NewUser, User};
use blogicum::config::database::{connect, migrate};
use blogicum::config::templates::{build_engine, template_names};
use blogicum::config::urls::url_patterns;
use blogicum::{Application, Settings};
use blogicum_auth::{Argon2Hasher, DatabaseSessionBackend, SessionBackend};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "manage")]
#[command(about = "Blogicum project management interface", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the web server
	Runserver {
		/// Address to listen on (defaults to the `bind_address` setting)
		#[arg(long, value_name = "ADDR")]
		addr: Option<SocketAddr>,
	},

	/// Apply database migrations
	Migrate,

	/// Create a staff account
	Createsuperuser {
		#[arg(long, value_name = "USERNAME")]
		username: String,

		#[arg(long, value_name = "EMAIL", default_value = "")]
		email: String,

		#[arg(long, value_name = "PASSWORD", env = "BLOGICUM_SUPERUSER_PASSWORD", hide_env_values = true)]
		password: String,
	},

	/// Remove expired sessions
	Clearsessions,

	/// Validate settings, routes and templates
	Check,
}

fn init_tracing(settings: &Settings, verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		let level = match verbosity {
			0 => settings.log_level.as_str(),
			1 => "debug",
			_ => "trace",
		};
		EnvFilter::new(level)
	});
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutdown signal received");
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
	match cli.command {
		Commands::Runserver { addr } => {
			let addr = match addr {
				Some(addr) => addr,
				None => settings
					.bind_address
					.parse()
					.with_context(|| format!("invalid bind_address {:?}", settings.bind_address))?,
			};
			let app = Application::from_settings(settings).await?;
			app.serve(addr, shutdown_signal()).await?;
		}
		Commands::Migrate => {
			let pool = connect(&settings.database_url).await?;
			migrate(&pool).await?;
			println!("Migrations applied to {}", settings.database_url);
		}
		Commands::Createsuperuser {
			username,
			email,
			password,
		} => {
			let pool = connect(&settings.database_url).await?;
			migrate(&pool).await?;
			if User::username_exists(&pool, &username).await? {
				bail!("user {:?} already exists", username);
			}
			let mut new_user = NewUser::new(username, password);
			new_user.email = email;
			new_user.is_staff = true;
			let user = User::create(&pool, Arc::new(Argon2Hasher::new()), &new_user).await?;
			println!("Superuser {} created (id {})", user.username, user.id);
		}
		Commands::Clearsessions => {
			let pool = connect(&settings.database_url).await?;
			let removed = DatabaseSessionBackend::new(pool).clear_expired().await?;
			println!("Removed {} expired session(s)", removed);
		}
		Commands::Check => {
			let router = url_patterns(&settings)?;
			build_engine(router.resolver())?;
			println!(
				"System check identified no issues ({} routes, {} templates).",
				router.routes().len(),
				template_names().count()
			);
		}
	}
	Ok(())
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let settings = match Settings::load() {
		Ok(settings) => settings,
		Err(e) => {
			eprintln!("Error: {}", e);
			process::exit(1);
		}
	};
	init_tracing(&settings, cli.verbosity);

	if let Err(e) = run(cli, settings).await {
		tracing::error!(error = %e, "command failed");
		eprintln!("Error: {:#}", e);
		process::exit(1);
	}
}
