//! Payroll Client CLI
//! Mission: Drive the auth API from a terminal - login, session bootstrap
//! and password management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payroll_backend::client::{
    ClientConfig, ClientError, HttpAuthClient, Role, SessionContext, SessionState, TokenStore,
};

#[derive(Parser, Debug)]
#[command(name = "payroll")]
#[command(about = "Terminal client for the payroll auth API")]
struct Args {
    /// API base URL
    #[arg(long, env = "PAYROLL_API_URL")]
    api_url: Option<String>,

    /// Path of the persisted token slot
    #[arg(long, env = "PAYROLL_TOKEN_PATH")]
    token_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session token
    Login { email: String, password: String },
    /// Create an account (signs you in immediately)
    Signup {
        email: String,
        password: String,
        /// Requested role: admin or employee
        #[arg(long, default_value = "employee")]
        role: String,
    },
    /// Clear the session and the persisted token
    Logout,
    /// Re-establish the session from the persisted token and print it
    Whoami,
    /// Change the signed-in account's password
    ChangePassword {
        old_password: String,
        new_password: String,
    },
    /// Request a password reset
    ForgotPassword { email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    init_tracing();

    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    if let Some(path) = args.token_path {
        config.token_path = path.into();
    }

    let client = Arc::new(HttpAuthClient::new(&config.base_url)?);
    let tokens = TokenStore::new(config.token_path);
    let session = SessionContext::new(client.clone(), tokens);

    match args.command {
        Command::Login { email, password } => match client.login(&email, &password).await {
            Ok(success) => {
                session.persist_token(&success.token)?;
                let landing = success.user.role.landing_page();
                session.login(success.user.clone());
                println!(
                    "Signed in as {} ({})",
                    success.user.email,
                    success.user.role.as_str()
                );
                println!("Landing page: {landing}");
            }
            Err(e) => fail(e),
        },
        Command::Signup {
            email,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            match client.signup(&email, &password, Some(role)).await {
                Ok(success) => {
                    session.persist_token(&success.token)?;
                    let landing = success.user.role.landing_page();
                    session.login(success.user.clone());
                    println!(
                        "Account created for {} ({})",
                        success.user.email,
                        success.user.role.as_str()
                    );
                    println!("Landing page: {landing}");
                }
                Err(e) => fail(e),
            }
        }
        Command::Logout => {
            session.logout()?;
            println!("Signed out");
        }
        Command::Whoami => match session.bootstrap().await {
            SessionState::Authenticated(user) => {
                println!("{} ({})", user.email, user.role.as_str());
                println!("Landing page: {}", user.role.landing_page());
            }
            _ => println!("Not signed in"),
        },
        Command::ChangePassword {
            old_password,
            new_password,
        } => {
            let Some(token) = session.persisted_token() else {
                eprintln!("Not signed in");
                std::process::exit(1);
            };
            match client
                .change_password(&token, &old_password, &new_password)
                .await
            {
                Ok(message) => println!("{message}"),
                Err(e) => fail(e),
            }
        }
        Command::ForgotPassword { email } => match client.forgot_password(&email).await {
            Ok(message) => println!("{message}"),
            Err(e) => fail(e),
        },
    }

    Ok(())
}

fn fail(e: ClientError) -> ! {
    eprintln!("{}", e.user_message());
    std::process::exit(1);
}

fn parse_role(raw: &str) -> Result<Role> {
    match raw.to_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "employee" => Ok(Role::Employee),
        other => anyhow::bail!("unknown role '{other}' (expected admin or employee)"),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payroll=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
