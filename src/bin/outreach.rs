//! outreach CLI — operator interface to the outreach engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

use outreach_rs::channel::{ConsoleProvider, Providers};
use outreach_rs::config::Config;
use outreach_rs::db::Db;
use outreach_rs::db::queue::QUEUE_NAME;
use outreach_rs::ingest::{Ingestor, parse_rows};
use outreach_rs::model::{ContactId, ContactStatus, Job, JobType};
use outreach_rs::queue::JobQueue;
use outreach_rs::reply::{InboundMessage, ReplyHandler};
use outreach_rs::store::{ContactStore, OutreachLedger};
use outreach_rs::telemetry::{TelemetryConfig, init_telemetry};
use outreach_rs::worker::{Worker, WorkerConfig};

#[derive(Parser)]
#[command(name = "outreach", about = "Outreach campaign engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the send worker daemon
    Serve,
    /// Ingest a CSV contact feed
    Ingest {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Enqueue a campaign message to stored contacts
    Enqueue {
        /// Channel: sms or email
        channel: JobType,
        /// Message body
        message: String,
        /// Maximum contacts to target
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Simulate an inbound reply (the webhook path)
    Inbound {
        /// Sender address (phone number)
        from: String,
        /// Message body
        body: String,
    },
    /// Contact operations
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },
}

#[derive(Subcommand)]
enum ContactAction {
    /// List contacts, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a contact with its outreach history
    Show {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cmd_serve().await,
        Command::Ingest { file } => {
            let db = connect().await?;
            cmd_ingest(db, file).await
        }
        Command::Enqueue {
            channel,
            message,
            limit,
        } => {
            let db = connect().await?;
            cmd_enqueue(db, channel, message, limit).await
        }
        Command::Inbound { from, body } => {
            let db = connect().await?;
            cmd_inbound(db, from, body).await
        }
        Command::Contacts { action } => {
            let db = connect().await?;
            match action {
                ContactAction::List { limit } => cmd_contacts_list(&db, limit).await,
                ContactAction::Show { id } => cmd_contacts_show(&db, id).await,
            }
        }
    }
}

async fn connect() -> anyhow::Result<Arc<Db>> {
    let config = Config::from_env()?;
    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    db.create_queue(QUEUE_NAME).await?;
    Ok(Arc::new(db))
}

async fn cmd_serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "outreach".to_string(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    db.create_queue(QUEUE_NAME).await?;
    let db = Arc::new(db);

    // Real provider integrations are deployment-specific; the console
    // provider logs sends so the pipeline can run end to end locally.
    let providers = Providers::new(
        Arc::new(ConsoleProvider::new("sms")),
        Arc::new(ConsoleProvider::new("email")),
    );

    let worker = Worker::new(
        db.clone(),
        db.clone(),
        providers,
        WorkerConfig {
            visibility_timeout: Duration::from_secs(config.visibility_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_attempts,
            base_backoff: Duration::from_secs(config.base_backoff_secs),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
        },
    );

    let w = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        w.shutdown();
    });

    worker.run().await?;
    Ok(())
}

async fn cmd_ingest(db: Arc<Db>, file: PathBuf) -> anyhow::Result<()> {
    let reader = std::fs::File::open(&file)?;
    let rows = parse_rows(reader)?;
    let total = rows.len();

    let ingestor = Ingestor::new(db);
    let summary = ingestor.ingest(rows).await?;

    println!("Processed {total} row(s)");
    println!("  added:      {}", summary.new_contacts_added);
    println!("  duplicates: {}", summary.duplicates_found);
    println!("  rejected:   {}", summary.rejected.len());
    for rejected in &summary.rejected {
        let email = rejected.row.get("email").map(String::as_str).unwrap_or("-");
        println!("    {} ({})", email, rejected.reason);
    }
    Ok(())
}

async fn cmd_enqueue(
    db: Arc<Db>,
    channel: JobType,
    message: String,
    limit: i64,
) -> anyhow::Result<()> {
    let contacts = db.list(limit).await?;

    let mut enqueued = 0usize;
    let mut skipped = 0usize;
    for contact in &contacts {
        // Opt-out is sticky: opted-out contacts never get new jobs.
        if contact.status == ContactStatus::OptedOut {
            skipped += 1;
            continue;
        }

        let job = Job {
            job_type: channel,
            contact: contact.into(),
            message: message.clone(),
        };
        let id = db.enqueue(&job).await?;
        println!("Enqueued job {} for {} ({})", id, contact.name, contact.id);
        enqueued += 1;
    }

    println!("{enqueued} job(s) enqueued, {skipped} opted-out contact(s) skipped");
    Ok(())
}

async fn cmd_inbound(db: Arc<Db>, from: String, body: String) -> anyhow::Result<()> {
    let handler = ReplyHandler::new(db.clone(), db);

    // Webhook contract: the transport is acknowledged regardless of the
    // internal outcome, so internal failures are printed, not propagated.
    match handler.handle(InboundMessage { from, body }).await {
        Ok(outcome) => println!("{outcome:?}"),
        Err(e) => eprintln!("inbound processing failed (acknowledged anyway): {e}"),
    }
    Ok(())
}

async fn cmd_contacts_list(db: &Db, limit: i64) -> anyhow::Result<()> {
    let contacts = db.list(limit).await?;

    if contacts.is_empty() {
        println!("No contacts found.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<20}  {:<28}  {:<14}  {:<10}  CREATED",
        "ID", "NAME", "EMAIL", "PHONE", "STATUS"
    );
    println!("{}", "-".repeat(100));

    for contact in &contacts {
        println!(
            "{:<6}  {:<20}  {:<28}  {:<14}  {:<10}  {}",
            contact.id,
            contact.name,
            contact.email.as_deref().unwrap_or("-"),
            contact.phone.as_deref().unwrap_or("-"),
            contact.status,
            contact.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!("\n{} contact(s)", contacts.len());
    Ok(())
}

async fn cmd_contacts_show(db: &Db, id: i64) -> anyhow::Result<()> {
    let id = ContactId(id);
    let contact = db.get(id).await?;

    println!("ID:           {}", contact.id);
    println!("Name:         {}", contact.name);
    println!("Email:        {}", contact.email.as_deref().unwrap_or("-"));
    println!("Phone:        {}", contact.phone.as_deref().unwrap_or("-"));
    println!(
        "Organization: {}",
        contact.organization.as_deref().unwrap_or("-")
    );
    println!("Status:       {}", contact.status);
    println!(
        "Custom:       {}",
        serde_json::to_string_pretty(&contact.custom_fields)?
    );
    println!("Created:      {}", contact.created_at);
    println!("Updated:      {}", contact.updated_at);

    let history = db.history(id).await?;
    if !history.is_empty() {
        println!("---");
        for record in &history {
            println!(
                "{}  {:<12}  {:<10}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.record_type,
                record.status,
                record.content
            );
        }
        println!("{} history entr(ies)", history.len());
    }

    Ok(())
}
