use anyhow::Context as _;
use clap::Parser;
use gramfit::{syntax, Analysis, ParserKind};
use std::{
    io::{self, BufRead},
    path::PathBuf,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "Select a parser (T: for LL(1), B: for SLR(1), Q: quit):";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// The start symbol. Defaults to `S`, or to the first left-hand side.
    #[arg(long)]
    start: Option<String>,

    /// Parse STRINGS (or the lines of stdin) with this parser instead of
    /// prompting for one.
    #[arg(long, value_enum)]
    parser: Option<ParserArg>,

    /// Do not print the analysis report.
    #[arg(short, long)]
    quiet: bool,

    /// Candidate strings, used together with `--parser`.
    strings: Vec<String>,
}

#[derive(Debug, Copy, Clone, clap::ValueEnum)]
enum ParserArg {
    Ll1,
    Slr1,
}

impl From<ParserArg> for ParserKind {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Ll1 => ParserKind::LL1,
            ParserArg::Slr1 => ParserKind::SLR1,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let started = Instant::now();
    let grammar = syntax::load_file(&args.input, args.start.as_deref())?;
    tracing::info!(elapsed = ?started.elapsed(), "loaded grammar");

    let started = Instant::now();
    let analysis = Analysis::new(&grammar);
    tracing::info!(elapsed = ?started.elapsed(), "analyzed grammar");

    if !args.quiet {
        print_report(&analysis);
    }

    match args.parser {
        Some(kind) => run_batch(&analysis, kind.into(), &args.strings),
        None => run_interactive(&analysis, args.quiet),
    }
}

fn print_report(analysis: &Analysis<'_>) {
    let g = analysis.grammar();
    println!("{}", g);
    println!("## first sets:");
    println!("{}", analysis.first_sets().display(g));
    println!("## follow sets:");
    println!("{}", analysis.follow_sets().display(g));
    println!("{}", analysis.ll1_verdict().display(g));
    if analysis.is_slr1() {
        println!("the grammar is SLR(1)");
    } else {
        println!("the grammar is not SLR(1):");
        for conflict in analysis.slr_conflicts() {
            println!("- {}", conflict.display(g));
        }
    }
    println!();
}

fn print_tables(analysis: &Analysis<'_>, kind: ParserKind) {
    let g = analysis.grammar();
    match kind {
        ParserKind::LL1 => {
            if let Some(table) = analysis.ll1_table() {
                println!("{}", table.display(g));
            }
        }
        ParserKind::SLR1 => println!("{}", analysis.slr_automaton().display(g)),
    }
}

fn run_batch(analysis: &Analysis<'_>, kind: ParserKind, strings: &[String]) -> anyhow::Result<()> {
    let mut inputs = strings.to_vec();
    if inputs.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("failed to read from stdin")?;
            if !line.trim().is_empty() {
                inputs.push(line.trim().to_owned());
            }
        }
    }

    let mut accepted = 0;
    for input in &inputs {
        let verdict = analysis.parse_str(kind, input)?;
        accepted += usize::from(verdict.is_accept());
        println!("{}", verdict);
    }
    tracing::info!(%kind, accepted, total = inputs.len(), "parsed candidate strings");
    Ok(())
}

fn run_interactive(analysis: &Analysis<'_>, quiet: bool) -> anyhow::Result<()> {
    let available = analysis.available();
    match (
        available.contains(&ParserKind::LL1),
        available.contains(&ParserKind::SLR1),
    ) {
        (true, true) => (),
        (true, false) => println!("Grammar is LL(1) (SLR(1) not available)."),
        (false, true) => println!("Grammar is SLR(1) (LL(1) not available)."),
        (false, false) => println!("Grammar is neither LL(1) nor SLR(1)."),
    }
    println!("{}", PROMPT);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while let Some(choice) = lines.next() {
        let choice = choice.context("failed to read from stdin")?;
        let kind = match choice.trim().to_ascii_uppercase().as_str() {
            "Q" => break,
            "T" => ParserKind::LL1,
            "B" => ParserKind::SLR1,
            _ => {
                println!("Invalid option. Use T, B or Q.");
                continue;
            }
        };

        if available.contains(&kind) {
            if !quiet {
                print_tables(analysis, kind);
            }
            for line in lines.by_ref() {
                let line = line.context("failed to read from stdin")?;
                let input = line.trim();
                if input.is_empty() {
                    break;
                }
                let verdict = analysis.parse_str(kind, input)?;
                println!("{}", verdict);
            }
        } else {
            println!("The {} parser is not available for this grammar.", kind);
        }

        println!("{}", PROMPT);
    }

    Ok(())
}
