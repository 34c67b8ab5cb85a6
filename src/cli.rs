//! Command-line interface for clipdex
//!
//! Provides argument parsing using clap derive macros. Most subcommands are
//! thin clients talking to the daemon over its Unix socket.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use uuid::Uuid;

/// Searchable voice clips over a local daemon
#[derive(Parser, Debug)]
#[command(
    name = "clipdex",
    version,
    about = "Searchable voice clips: upload, transcribe, search"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Daemon socket path override
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon (loads the model, serves the API socket)
    Serve,

    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Upload a WAV file and start a transcription job
    Upload {
        /// Profile to attach the upload to
        profile: Uuid,
        /// WAV file to upload
        file: PathBuf,
        /// Poll the job until it finishes, printing progress
        #[arg(long)]
        watch: bool,
    },

    /// Show daemon status, or one job's status
    Status {
        /// Job id (omit for daemon status)
        job_id: Option<Uuid>,
    },

    /// List all jobs
    Jobs,

    /// Request cancellation of a job
    Cancel {
        /// Job id
        job_id: Uuid,
    },

    /// Request cancellation of every unfinished job
    CancelAll,

    /// Drop all job entries from the daemon's table
    ClearJobs,

    /// Search clips
    Search {
        /// Query text
        query: String,
        /// Restrict to one profile
        #[arg(long)]
        profile: Option<Uuid>,
        /// Match mode: basic, ko_sound, or jp_sound
        #[arg(long, default_value = "basic")]
        mode: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage clips
    Clip {
        #[command(subcommand)]
        action: ClipAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Profile management actions
#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Create a profile
    Create {
        /// Profile name
        name: String,
    },
    /// List profiles
    List,
    /// Delete a profile and all of its clips and uploads
    Delete {
        /// Profile id
        profile_id: Uuid,
    },
}

/// Clip management actions
#[derive(Subcommand, Debug)]
pub enum ClipAction {
    /// Delete clips by id
    Delete {
        /// Clip ids
        #[arg(required = true)]
        clip_ids: Vec<Uuid>,
    },
    /// Cut a clip's audio to a WAV file
    Export {
        /// Clip id
        clip_id: Uuid,
        /// Destination file (default: the clip's download name in the
        /// current directory)
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
