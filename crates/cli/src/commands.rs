use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Export a campaign's record sets to CSV artifacts
    Export {
        #[arg(long, help = "Path to a JSON job payload file")]
        payload: Option<String>,

        #[arg(long, help = "Inline JSON job payload")]
        payload_json: Option<String>,
    },
    /// Mark (or unmark) a campaign's contacts for a second pass
    SecondPass {
        #[arg(long, help = "Path to a JSON job payload file")]
        payload: Option<String>,

        #[arg(long, help = "Inline JSON job payload")]
        payload_json: Option<String>,
    },
}
