use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "watchmark",
    version,
    about = "Track playback progress and navigate episodes of movies and TV shows"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Offline season catalog (JSON); TMDB is used when omitted and TMDB_API_KEY is set"
    )]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Record a playback position for a content key")]
    Update {
        key: String,
        position: f64,
        duration: f64,
    },
    List,
    Show {
        key: String,
    },
    #[command(about = "Unfinished titles, most recent first")]
    Continue,
    Unwatch {
        key: String,
    },
    Watched {
        show_id: String,
        #[arg(long)]
        total: Option<u32>,
    },
    Next {
        key: String,
    },
    Previous {
        key: String,
    },
    Seasons {
        show_id: String,
    },
    Tui,
}
