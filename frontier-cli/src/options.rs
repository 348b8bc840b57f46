use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(
    name = "frontier",
    about = "Interactive shell for the dynamic multiple-LCS engine."
)]
pub struct Options {
    /// Minimum number of edit commands for the run to count as a success;
    /// the exit status is nonzero when the stream ends or the budget runs
    /// out before this many edits were processed.
    #[structopt(default_value = "1000000")]
    pub min_edits: usize,

    #[structopt(short = "t", long = "time-limit", default_value = "600")]
    /// Wall clock budget in seconds. The shell stops once it is exceeded,
    /// whatever is left on the stream.
    pub time_limit: u64,

    #[structopt(long)]
    /// Re-compute every edit with the quadratic reference, assert
    /// agreement and echo the strings. Slow; testing only.
    pub check: bool,

    #[structopt(short = "s", long)]
    /// Hide the progress spinner.
    pub silent: bool,
}
