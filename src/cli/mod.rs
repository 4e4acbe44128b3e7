//! Command-line surface.
//!
//! Each invocation loads the active identity's snapshot (remote row when a
//! session exists, local entries otherwise), runs one operation through the
//! record store, and flushes the persister before exit.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::errors::AppError;
use crate::extract::ExtractionClient;
use crate::models::{CandidateMember, ImportDocument, Member, MemberUpdate, VoucherType};
use crate::persist::{LocalStore, PersistTarget, Persister};
use crate::remote::RemoteClient;
use crate::share;
use crate::store::{MergeOutcome, MergePolicy, RecordStore};

#[derive(Parser, Debug)]
#[command(name = "checkout-swift")]
#[command(about = "Member ledger for a retail checkout")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records, optionally filtered
    List {
        /// Match name (case-insensitive) or phone substring
        #[arg(long)]
        search: Option<String>,
        /// Only records with this birthday month; omit the value for the
        /// current month
        #[arg(long, value_name = "MONTH", num_args = 0..=1, default_missing_value = "now")]
        birthday: Option<String>,
    },
    /// Add a single record
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, value_name = "MONTH", default_value = "")]
        birthday_month: String,
        #[arg(long)]
        vip: bool,
        #[arg(long, value_enum, default_value = "none")]
        voucher: VoucherType,
        /// Skip the duplicate-phone check
        #[arg(long)]
        allow_duplicate: bool,
    },
    /// Edit an existing record
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, value_name = "MONTH")]
        birthday_month: Option<String>,
        #[arg(long)]
        vip: Option<bool>,
        #[arg(long)]
        used: Option<bool>,
        #[arg(long, value_enum)]
        voucher: Option<VoucherType>,
        /// Reject a phone change that collides with another record
        #[arg(long)]
        check_duplicates: bool,
    },
    /// Delete a record
    Delete { id: String },
    /// Flip a record's used flag
    ToggleUsed { id: String },
    /// Show or set the store name
    StoreName { name: Option<String> },
    /// Import records from a JSON file
    Import {
        file: PathBuf,
        /// Keep records whose phone already exists
        #[arg(long)]
        keep_duplicates: bool,
    },
    /// Export the collection to a JSON file
    Export {
        /// Defaults to checkout-members[-store]-YYYY-MM-DD.json
        file: Option<PathBuf>,
    },
    /// Print a shareable link for the collection
    Share,
    /// Merge records from a share link into the collection
    ImportLink {
        /// Full URL or bare token
        link: String,
        #[arg(long)]
        keep_duplicates: bool,
    },
    /// Extract records from free text or an image via the AI service
    Parse {
        /// Text to parse; reads stdin when neither this nor --file/--image given
        text: Option<String>,
        /// Read the text from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Parse an image instead of text
        #[arg(long, conflicts_with_all = ["text", "file"])]
        image: Option<PathBuf>,
        #[arg(long)]
        keep_duplicates: bool,
    },
    /// Extract a voucher from free text via the AI service
    Voucher { text: String },
    /// Register a cloud account and switch to it
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in to a cloud account and switch to it
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out; guest data on this device is untouched
    Logout,
    /// Show the active identity
    Whoami,
    /// Delete all records and the store name
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Loaded state for one invocation.
struct App {
    store: RecordStore,
    persister: Persister,
}

pub async fn run(config: Config) -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Signup { email, password } => {
            let remote = remote_client(&config)?;
            let session = remote.sign_up(&email, &password).await?;
            println!("Signed up as {}", session.username);
            let snapshot = remote.fetch_snapshot(&session).await?;
            println!(
                "Cloud account holds {} record(s); guest data stays on this device",
                snapshot.members.len()
            );
            Ok(())
        }
        Command::Login { email, password } => {
            let remote = remote_client(&config)?;
            let session = remote.sign_in(&email, &password).await?;
            println!("Signed in as {}", session.username);
            let snapshot = remote.fetch_snapshot(&session).await?;
            println!("Cloud account holds {} record(s)", snapshot.members.len());
            Ok(())
        }
        Command::Logout => {
            let remote = remote_client(&config)?;
            match remote.current_session().await {
                Some(session) => {
                    remote.sign_out().await?;
                    println!("Signed out {}; back to guest mode", session.username);
                }
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Whoami => {
            let session = match optional_remote_client(&config) {
                Some(remote) => remote.current_session().await,
                None => None,
            };
            match session {
                Some(session) => println!("Signed in as {} (cloud sync on)", session.username),
                None => println!("Guest mode (device-local data)"),
            }
            Ok(())
        }
        Command::Voucher { text } => {
            let client = extraction_client(&config)?;
            match client.parse_voucher_from_text(&text).await {
                Some(parsed) => {
                    let voucher = crate::models::Voucher::from(parsed);
                    println!("{}", serde_json::to_string_pretty(&voucher)?);
                }
                None => println!("Could not parse a voucher from the input"),
            }
            Ok(())
        }
        command => {
            let app = load_app(&config).await?;
            let mutated = dispatch(&app, &config, command).await?;
            if mutated {
                app.persister.shutdown().await?;
            }
            Ok(())
        }
    }
}

/// Run one store-backed command; returns whether the collection changed.
async fn dispatch(app: &App, config: &Config, command: Command) -> Result<bool, AppError> {
    let store = &app.store;
    match command {
        Command::List { search, birthday } => {
            let members = match (search, birthday) {
                (Some(term), _) => store.search(&term),
                (None, Some(month)) => {
                    let month = if month == "now" {
                        chrono::Local::now().month().to_string()
                    } else {
                        month
                    };
                    store.birthday_members(&month)
                }
                (None, None) => store.members(),
            };
            for member in &members {
                print_member(member);
            }
            println!(
                "{} record(s) shown; {} of {} not yet used",
                members.len(),
                store.active_count(),
                store.len()
            );
            Ok(false)
        }
        Command::Add {
            name,
            phone,
            note,
            birthday_month,
            vip,
            voucher,
            allow_duplicate,
        } => {
            let member = store.add_single(
                CandidateMember {
                    id: None,
                    name,
                    phone,
                    is_used: false,
                    voucher_type: voucher,
                    is_vip: vip,
                    birthday_month: Some(birthday_month),
                    note: Some(note),
                    created_at: None,
                },
                !allow_duplicate,
            )?;
            println!("Added {} ({})", member.name, member.id);
            Ok(true)
        }
        Command::Edit {
            id,
            name,
            phone,
            note,
            birthday_month,
            vip,
            used,
            voucher,
            check_duplicates,
        } => {
            let update = MemberUpdate {
                name,
                phone,
                is_used: used,
                voucher_type: voucher,
                is_vip: vip,
                birthday_month,
                note,
            };
            let member = store.update_member(&id, update, check_duplicates)?;
            println!("Updated {} ({})", member.name, member.id);
            Ok(true)
        }
        Command::Delete { id } => {
            store.delete_member(&id)?;
            println!("Deleted {}", id);
            Ok(true)
        }
        Command::ToggleUsed { id } => {
            let current = store
                .get_member(&id)
                .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;
            let update = MemberUpdate {
                is_used: Some(!current.is_used),
                ..Default::default()
            };
            let member = store.update_member(&id, update, false)?;
            println!(
                "{} is now {}",
                member.name,
                if member.is_used { "used" } else { "not used" }
            );
            Ok(true)
        }
        Command::StoreName { name } => match name {
            Some(name) => {
                store.set_store_name(name.clone());
                println!("Store name set to {:?}", name);
                Ok(true)
            }
            None => {
                println!("{}", store.store_name());
                Ok(false)
            }
        },
        Command::Import {
            file,
            keep_duplicates,
        } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let document = ImportDocument::from_json(&text)?;
            let mut policy = MergePolicy::import();
            if keep_duplicates {
                policy = policy.keep_duplicates();
            }
            let count = document.candidates.len();
            let outcome = store.merge_import(document.candidates, &document.store_name, policy);
            report_merge(&outcome, count);
            Ok(true)
        }
        Command::Export { file } => {
            let snapshot = store.snapshot();
            let path = file.unwrap_or_else(|| {
                PathBuf::from(snapshot.export_file_name(chrono::Local::now().date_naive()))
            });
            tokio::fs::write(&path, snapshot.to_export_json()?).await?;
            println!("Exported {} record(s) to {}", snapshot.members.len(), path.display());
            Ok(false)
        }
        Command::Share => {
            let url = share::encode_share_link(
                &store.snapshot(),
                &config.share_base_url,
                config.max_share_url_len,
            )?;
            println!("{}", url);
            Ok(false)
        }
        Command::ImportLink {
            link,
            keep_duplicates,
        } => {
            let document = share::share_param_from_url(&link)
                .and_then(share::decode_share_param);
            let Some(document) = document else {
                println!("Link carries no readable data; nothing imported");
                return Ok(false);
            };
            let mut policy = MergePolicy::share_link();
            if keep_duplicates {
                policy = policy.keep_duplicates();
            }
            let count = document.candidates.len();
            println!(
                "Link contains {} record(s); merging into the current collection",
                count
            );
            let outcome = store.merge_import(document.candidates, &document.store_name, policy);
            report_merge(&outcome, count);
            Ok(true)
        }
        Command::Parse {
            text,
            file,
            image,
            keep_duplicates,
        } => {
            let client = extraction_client(config)?;
            let candidates = match (text, file, image) {
                (_, _, Some(path)) => {
                    let bytes = tokio::fs::read(&path).await?;
                    client
                        .parse_members_from_image(&bytes, mime_for_path(&path))
                        .await
                }
                (Some(text), _, _) => client.parse_members_from_text(&text).await,
                (None, Some(path), _) => {
                    let text = tokio::fs::read_to_string(&path).await?;
                    client.parse_members_from_text(&text).await
                }
                (None, None, None) => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    client.parse_members_from_text(&text).await
                }
            };
            if candidates.is_empty() {
                println!("Could not extract any records from the input");
                return Ok(false);
            }
            let mut policy = MergePolicy::import();
            if keep_duplicates {
                policy = policy.keep_duplicates();
            }
            let count = candidates.len();
            let outcome = store.merge_import(candidates, "", policy);
            report_merge(&outcome, count);
            Ok(true)
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(AppError::Validation(
                    "Pass --yes to delete all records".to_string(),
                ));
            }
            store.clear();
            println!("All records cleared");
            Ok(true)
        }
        // Handled in run()
        Command::Signup { .. }
        | Command::Login { .. }
        | Command::Logout
        | Command::Whoami
        | Command::Voucher { .. } => unreachable!("session commands never reach dispatch"),
    }
}

async fn load_app(config: &Config) -> Result<App, AppError> {
    let local = LocalStore::new(&config.data_dir);
    let remote = optional_remote_client(config);

    let session = match &remote {
        Some(remote) => remote.current_session().await,
        None => None,
    };

    let snapshot = match (&remote, &session) {
        (Some(remote), Some(session)) => remote.fetch_snapshot(session).await?,
        _ => local.load().await,
    };

    let store = RecordStore::from_snapshot(snapshot);
    let target = PersistTarget::select(local, remote.zip(session));
    let persister = Persister::spawn(store.clone(), target, config.debounce);

    Ok(App { store, persister })
}

fn optional_remote_client(config: &Config) -> Option<RemoteClient> {
    match (&config.remote_url, &config.remote_anon_key) {
        (Some(url), Some(key)) => Some(RemoteClient::new(url, key, &config.data_dir)),
        _ => None,
    }
}

fn remote_client(config: &Config) -> Result<RemoteClient, AppError> {
    optional_remote_client(config).ok_or_else(|| {
        AppError::Validation(
            "Remote sync is not configured (set CHECKOUT_SUPABASE_URL and CHECKOUT_SUPABASE_ANON_KEY)"
                .to_string(),
        )
    })
}

fn extraction_client(config: &Config) -> Result<ExtractionClient, AppError> {
    let api_key = config.extraction_api_key.as_deref().ok_or_else(|| {
        AppError::Validation(
            "AI extraction is not configured (set CHECKOUT_GEMINI_API_KEY)".to_string(),
        )
    })?;
    Ok(ExtractionClient::new(
        &config.extraction_url,
        api_key,
        &config.extraction_model,
    ))
}

fn report_merge(outcome: &MergeOutcome, batch_size: usize) {
    if batch_size == 0 {
        println!("No records found in the input");
        return;
    }
    if outcome.all_duplicates() {
        println!(
            "All {} record(s) were duplicate phone numbers; nothing added",
            outcome.duplicates
        );
        return;
    }
    if outcome.duplicates > 0 {
        println!(
            "Added {} record(s) ({} duplicate(s) skipped)",
            outcome.accepted_count(),
            outcome.duplicates
        );
    } else {
        println!("Added {} record(s)", outcome.accepted_count());
    }
}

fn print_member(member: &Member) {
    let mut flags = Vec::new();
    if member.is_vip {
        flags.push("VIP".to_string());
    }
    if member.is_used {
        flags.push("used".to_string());
    }
    match member.voucher_type {
        VoucherType::None => {}
        VoucherType::Electronic => flags.push("e-voucher".to_string()),
        VoucherType::Paper => flags.push("paper voucher".to_string()),
    }
    if !member.birthday_month.is_empty() {
        flags.push(format!("bday {}", member.birthday_month));
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    let note = if member.note.is_empty() {
        String::new()
    } else {
        format!("  # {}", member.note)
    };
    println!(
        "{}  {}  {}{}{}",
        member.id, member.name, member.phone, flags, note
    );
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
