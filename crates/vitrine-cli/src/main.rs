//! Vitrine CLI: manage photos, posts, and profiles from the command line.
//!
//! Backends are selected from the environment (see `Config::from_env`). With the
//! default in-memory document store nothing outlives the process; set
//! `DOCUMENT_STORE=postgres` and `DATABASE_URL` to keep records.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use vitrine_cli::{format_record_table, init_tracing, read_local_file};
use vitrine_client::{GalleryView, PhotoUploads};
use vitrine_core::models::{
    MetadataPatch, PostForm, ProfileForm, UploadPhase, UploadProgress, UploadRecord,
};
use vitrine_core::{Config, LogFormat};
use vitrine_services::Services;

#[derive(Parser)]
#[command(name = "vitrine", about = "Photo gallery, posts, and profiles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more images, one after another
    Upload {
        /// Owner (user id) of the uploaded photos
        #[arg(long)]
        owner: String,
        /// Image files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List an owner's photos, newest first
    List {
        #[arg(long)]
        owner: String,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Filter an owner's photos by name, alt text, or caption
    Search {
        #[arg(long)]
        owner: String,
        query: String,
    },
    /// Delete a photo and its stored blob
    Delete {
        /// Photo record id
        id: String,
    },
    /// Set the caption and/or alt text of a photo
    Caption {
        id: String,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        alt_text: Option<String>,
    },
    /// Post operations
    Post {
        #[command(subcommand)]
        sub: PostCommands,
    },
    /// Profile operations
    Profile {
        #[command(subcommand)]
        sub: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum PostCommands {
    Create {
        #[arg(long)]
        author: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    List {
        #[arg(long)]
        author: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    Show {
        uid: String,
    },
    /// Create or update a profile
    Set {
        uid: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "User")]
        name: String,
        #[arg(long)]
        address: String,
        /// YYYY-MM-DD
        #[arg(long)]
        birth_date: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn report_progress(progress: UploadProgress) {
    match progress.phase {
        UploadPhase::Success => eprintln!("  100% done"),
        UploadPhase::Error => eprintln!("  failed at {:.0}%", progress.percentage),
        _ => eprintln!(
            "  {:>3.0}% ({} / {} bytes)",
            progress.percentage, progress.bytes_transferred, progress.total_bytes
        ),
    }
}

/// Photo state bound to `owner` with the owner's records loaded.
async fn load_photos(services: &Services, owner: &str) -> anyhow::Result<PhotoUploads> {
    let photos = PhotoUploads::new(services.uploads.clone());
    photos.set_owner(Some(owner.to_string()));
    photos.load().await;
    let snapshot = photos.snapshot();
    if let Some(error) = snapshot.error {
        anyhow::bail!("{}", error);
    }
    Ok(photos)
}

/// Photo state for the owner of record `id`, plus that record.
async fn photos_for_record(
    services: &Services,
    id: &str,
) -> anyhow::Result<(PhotoUploads, UploadRecord)> {
    let record = services
        .uploads
        .get(id)
        .await?
        .with_context(|| format!("Photo {} not found", id))?;
    let photos = load_photos(services, &record.owner_id).await?;
    Ok((photos, record))
}

fn holder_error(photos: &PhotoUploads) -> anyhow::Error {
    let message = photos.snapshot().error.unwrap_or_else(|| "request failed".to_string());
    anyhow::anyhow!(message)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format == LogFormat::Json);

    let cli = Cli::parse();
    let services = Services::initialize(&config)
        .await
        .context("Failed to initialize services")?;

    match cli.command {
        Commands::Upload { owner, files } => {
            let mut local = Vec::with_capacity(files.len());
            for path in &files {
                local.push(read_local_file(path).await?);
            }

            let photos = PhotoUploads::new(services.uploads.clone());
            photos.set_owner(Some(owner));
            let mut updates = photos.subscribe();
            let printer = tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let progress = updates.borrow_and_update().progress;
                    if let Some(progress) = progress {
                        report_progress(progress);
                    }
                }
            });
            let outcomes = photos.upload_batch(&local, &services.upload_policy).await;
            printer.abort();
            let outcomes = outcomes?;

            let report: Vec<_> = outcomes
                .iter()
                .map(|o| match &o.result {
                    Ok(record) => serde_json::json!({
                        "file": o.file_name,
                        "success": true,
                        "record": record,
                    }),
                    Err(e) => serde_json::json!({
                        "file": o.file_name,
                        "success": false,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            print_json(&report)?;
        }
        Commands::List { owner, format } => {
            let records = load_photos(&services, &owner).await?.snapshot().records;
            match format.as_str() {
                "json" => print_json(&records)?,
                _ => print!("{}", format_record_table(&records.iter().collect::<Vec<_>>())),
            }
        }
        Commands::Search { owner, query } => {
            let records = load_photos(&services, &owner).await?.snapshot().records;
            let mut gallery = GalleryView::new();
            gallery.set_search(query);
            println!("{}", gallery.summary(&records));
            print!("{}", format_record_table(&gallery.visible(&records)));
        }
        Commands::Delete { id } => {
            let (photos, record) = photos_for_record(&services, &id).await?;
            if !photos.remove(&record.id, &record.storage_key).await {
                return Err(holder_error(&photos));
            }
            print_json(&serde_json::json!({ "success": true, "message": format!("Photo {} deleted", id) }))?;
        }
        Commands::Caption {
            id,
            caption,
            alt_text,
        } => {
            let patch = MetadataPatch { alt_text, caption };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update: pass --caption and/or --alt-text");
            }
            let (photos, _) = photos_for_record(&services, &id).await?;
            if !photos.edit_metadata(&id, &patch).await {
                return Err(holder_error(&photos));
            }
            let updated = photos.snapshot().records.into_iter().find(|r| r.id == id);
            print_json(&updated)?;
        }
        Commands::Post { sub } => match sub {
            PostCommands::Create {
                author,
                email,
                title,
                content,
            } => {
                let post = services
                    .posts
                    .create_post(&author, email.as_deref(), &PostForm::new(title, content))
                    .await?;
                print_json(&post)?;
            }
            PostCommands::List { author } => {
                print_json(&services.posts.try_list_by_author(&author).await?)?;
            }
            PostCommands::Delete { id } => {
                services.posts.delete_post(&id).await?;
                print_json(&serde_json::json!({ "success": true, "message": format!("Post {} deleted", id) }))?;
            }
        },
        Commands::Profile { sub } => match sub {
            ProfileCommands::Show { uid } => {
                let profile = services
                    .profiles
                    .get_profile(&uid)
                    .await?
                    .with_context(|| format!("No profile for {}", uid))?;
                print_json(&profile)?;
            }
            ProfileCommands::Set {
                uid,
                email,
                name,
                address,
                birth_date,
            } => {
                let form = ProfileForm::new(address, birth_date);
                let profile = services
                    .profiles
                    .create_or_update(&uid, &email, &name, Some(&form))
                    .await?;
                print_json(&profile)?;
            }
        },
    }

    Ok(())
}
