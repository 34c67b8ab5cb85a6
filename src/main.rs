use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{CommandFactory, Parser};
use clipdex::api::client::send_request;
use clipdex::api::protocol::{JobInfo, Request, Response};
use clipdex::api::server::ApiServer;
use clipdex::cli::{Cli, ClipAction, Commands, ProfileAction};
use clipdex::config::Config;
use clipdex::job::state::JobStatus;
use clipdex::search::SearchMode;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let socket = cli
        .socket
        .clone()
        .or_else(|| config.server.socket.clone())
        .unwrap_or_else(ApiServer::default_socket_path);

    match cli.command {
        Commands::Serve => {
            clipdex::app::run_serve(config, cli.socket).await?;
        }
        Commands::Profile { action } => {
            handle_profile_command(&socket, action).await?;
        }
        Commands::Upload {
            profile,
            file,
            watch,
        } => {
            handle_upload(&socket, profile, &file, watch, cli.quiet).await?;
        }
        Commands::Status { job_id } => match job_id {
            Some(job_id) => {
                let response = send_request(&socket, Request::JobStatus { job_id }).await?;
                match expect_ok(response)? {
                    Response::Job { job } => print_job(&job),
                    other => print_unexpected(&other),
                }
            }
            None => {
                let response = send_request(&socket, Request::Status).await?;
                match expect_ok(response)? {
                    Response::Status {
                        model_name,
                        model_ready,
                        jobs_total,
                        jobs_active,
                    } => {
                        println!("model:        {model_name}");
                        println!("model ready:  {model_ready}");
                        println!("jobs:         {jobs_total} total, {jobs_active} active");
                    }
                    other => print_unexpected(&other),
                }
            }
        },
        Commands::Jobs => {
            let response = send_request(&socket, Request::ListJobs).await?;
            match expect_ok(response)? {
                Response::Jobs { jobs } => {
                    if jobs.is_empty() {
                        println!("no jobs");
                    }
                    for job in jobs {
                        print_job(&job);
                    }
                }
                other => print_unexpected(&other),
            }
        }
        Commands::Cancel { job_id } => {
            expect_ok(send_request(&socket, Request::CancelJob { job_id }).await?)?;
            if !cli.quiet {
                println!("cancellation requested for {job_id}");
            }
        }
        Commands::CancelAll => {
            let response = send_request(&socket, Request::CancelAllJobs).await?;
            match expect_ok(response)? {
                Response::CancelledAll { cancelled } => {
                    println!("cancellation requested for {cancelled} job(s)");
                }
                other => print_unexpected(&other),
            }
        }
        Commands::ClearJobs => {
            expect_ok(send_request(&socket, Request::ClearJobs).await?)?;
            if !cli.quiet {
                println!("job table cleared");
            }
        }
        Commands::Search {
            query,
            profile,
            mode,
            limit,
        } => {
            let mode: SearchMode = mode.parse().unwrap_or_default();
            let response = send_request(
                &socket,
                Request::Search {
                    query,
                    profile_id: profile,
                    mode,
                    limit,
                },
            )
            .await?;
            match expect_ok(response)? {
                Response::SearchResults { results } => {
                    if results.is_empty() {
                        println!("no matches");
                    }
                    for clip in results {
                        println!(
                            "{}  {}  [{:.2}s – {:.2}s]",
                            clip.id.to_string().dimmed(),
                            clip.transcript,
                            clip.start_s,
                            clip.end_s
                        );
                    }
                }
                other => print_unexpected(&other),
            }
        }
        Commands::Clip { action } => {
            handle_clip_command(&socket, action, cli.quiet).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "clipdex",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load config from an explicit path or the default location.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

/// Turn a protocol-level error response into a process error.
fn expect_ok(response: Response) -> Result<Response> {
    match response {
        Response::Error { message } => Err(anyhow::anyhow!(message)),
        other => Ok(other),
    }
}

fn print_unexpected(response: &Response) {
    eprintln!("unexpected response from daemon: {response:?}");
}

fn print_job(job: &JobInfo) {
    let status = match job.status {
        JobStatus::Done => job.status.to_string().green().to_string(),
        JobStatus::Error => job.status.to_string().red().to_string(),
        JobStatus::Cancelled => job.status.to_string().yellow().to_string(),
        _ => job.status.to_string(),
    };
    println!(
        "{}  {:<9}  {:>3}%  {}",
        job.id.to_string().dimmed(),
        status,
        job.progress,
        job.message
    );
}

async fn handle_profile_command(socket: &Path, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Create { name } => {
            let response = send_request(socket, Request::CreateProfile { name }).await?;
            match expect_ok(response)? {
                Response::Profile { profile } => {
                    println!("{}  {}", profile.id, profile.name);
                }
                other => print_unexpected(&other),
            }
        }
        ProfileAction::List => {
            let response = send_request(socket, Request::ListProfiles).await?;
            match expect_ok(response)? {
                Response::Profiles { profiles } => {
                    if profiles.is_empty() {
                        println!("no profiles");
                    }
                    for profile in profiles {
                        println!("{}  {}", profile.id.to_string().dimmed(), profile.name);
                    }
                }
                other => print_unexpected(&other),
            }
        }
        ProfileAction::Delete { profile_id } => {
            let response = send_request(socket, Request::DeleteProfile { profile_id }).await?;
            match expect_ok(response)? {
                Response::Deleted { deleted } => {
                    println!("deleted profile and {deleted} clip(s)");
                }
                other => print_unexpected(&other),
            }
        }
    }
    Ok(())
}

async fn handle_upload(
    socket: &Path,
    profile: Uuid,
    file: &Path,
    watch: bool,
    quiet: bool,
) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.wav".to_string());

    let response = send_request(
        socket,
        Request::Submit {
            profile_id: profile,
            filename,
            audio_base64: BASE64.encode(&bytes),
        },
    )
    .await?;

    let job_id = match expect_ok(response)? {
        Response::Submitted { job_id, audio } => {
            if !quiet {
                println!(
                    "uploaded {} ({:.1}s), job {}",
                    audio.orig_filename, audio.duration_s, job_id
                );
            }
            job_id
        }
        other => {
            print_unexpected(&other);
            return Ok(());
        }
    };

    if watch {
        watch_job(socket, job_id).await?;
    }
    Ok(())
}

/// Poll one job until it reaches a terminal state, printing progress.
async fn watch_job(socket: &Path, job_id: Uuid) -> Result<()> {
    loop {
        let response = send_request(socket, Request::JobStatus { job_id }).await?;
        let job = match expect_ok(response)? {
            Response::Job { job } => job,
            other => {
                print_unexpected(&other);
                return Ok(());
            }
        };

        eprint!("\r{:>3}%  {:<40}", job.progress, job.message);
        if job.status.is_terminal() {
            eprintln!();
            print_job(&job);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    }
    Ok(())
}

async fn handle_clip_command(socket: &Path, action: ClipAction, quiet: bool) -> Result<()> {
    match action {
        ClipAction::Delete { clip_ids } => {
            let response = send_request(socket, Request::BulkDeleteClips { clip_ids }).await?;
            match expect_ok(response)? {
                Response::Deleted { deleted } => println!("deleted {deleted} clip(s)"),
                other => print_unexpected(&other),
            }
        }
        ClipAction::Export { clip_id, output } => {
            let response = send_request(socket, Request::ExportClip { clip_id }).await?;
            match expect_ok(response)? {
                Response::ClipAudio { path, filename } => {
                    let destination = output.unwrap_or_else(|| PathBuf::from(&filename));
                    std::fs::copy(&path, &destination)?;
                    if !quiet {
                        println!("wrote {}", destination.display());
                    }
                }
                other => print_unexpected(&other),
            }
        }
    }
    Ok(())
}
