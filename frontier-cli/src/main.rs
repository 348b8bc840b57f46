use std::io::{self, BufRead};
use std::time::Instant;

use console::style;
use indicatif::ProgressBar;
use log::info;
use structopt::StructOpt;

use frontier::engine::Mlcs;
use frontier::naive::naive_mlcs;

use crate::options::Options;
use crate::parse::{parse_line, Command};

mod options;
mod parse;

fn main() {
    env_logger::init();
    let opt = Options::from_args();
    let edits = run(&opt);
    println!("{}", edits);
    std::process::exit(if edits < opt.min_edits { 1 } else { 0 });
}

fn run(opt: &Options) -> usize {
    let start = Instant::now();
    let spinner = if opt.silent {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.enable_steady_tick(250);

    let mut engine: Option<Mlcs> = None;
    let mut edits = 0usize;
    let mut resets = 0usize;

    let stdin = io::stdin();
    'stream: for line in stdin.lock().lines() {
        let line = line.expect("Broken input stream.");
        let commands = match parse_line(&line) {
            Ok(commands) => commands,
            Err(rest) => {
                spinner.finish_and_clear();
                eprintln!(
                    "{} {}",
                    style("Unreadable command:").red().bold(),
                    style(rest).red()
                );
                std::process::exit(1);
            }
        };

        for cmd in commands {
            let edited = matches!(cmd, Command::Append { .. } | Command::Pop { .. });
            match cmd {
                Command::Reset { dim, sigma } => {
                    resets += 1;
                    engine = Some(Mlcs::new(dim, sigma));
                }
                Command::Append { string, letter } => {
                    edits += 1;
                    engine
                        .as_mut()
                        .expect("Edit before any K command.")
                        .append(string, letter);
                }
                Command::Pop { string } => {
                    edits += 1;
                    engine
                        .as_mut()
                        .expect("Edit before any K command.")
                        .pop(string);
                }
                Command::End => break 'stream,
            }

            if edited {
                if opt.check {
                    verify(engine.as_ref().unwrap());
                }
                spinner.inc(1);
                if edits % 10_000 == 0 {
                    spinner.set_message(&format!("{} edits, {} resets", edits, resets));
                }
            }
            if start.elapsed().as_secs() >= opt.time_limit {
                info!("wall clock budget exhausted after {} edits", edits);
                break 'stream;
            }
        }
    }

    spinner.finish_and_clear();
    if !opt.silent {
        eprintln!(
            "{} edits over {} resets in {:.2?}",
            edits,
            resets,
            start.elapsed()
        );
    }
    edits
}

/// Recompute the answer with the reference table and compare, echoing both
/// so a diverging trace can be replayed.
fn verify(m: &Mlcs) {
    let strings: Vec<Vec<u8>> = (0..m.dim()).map(|j| m.string(j).bytes()).collect();
    let reference = naive_mlcs(&strings);
    println!("[CHECK] {} = {}", m.len(), reference);
    for (j, s) in strings.iter().enumerate() {
        println!("[CHECK] {} : {}", j, String::from_utf8_lossy(s));
    }
    assert!(
        m.len() == reference,
        "Engine and reference disagree: {} != {}",
        m.len(),
        reference
    );
    m.check_fronts();
}
