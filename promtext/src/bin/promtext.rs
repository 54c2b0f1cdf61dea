use anyhow::Result;
use clap::Parser;

#[derive(Debug, Parser)]
struct Args {
    /// Exposition document to parse
    #[clap(short, long, required = true)]
    input: String,

    /// Emit single-line JSON instead of pretty-printing
    #[clap(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let data = std::fs::read_to_string(&args.input)?;

    let families = promtext::parse(&data)?;

    let rendered = if args.compact {
        serde_json::to_string(&families)?
    } else {
        serde_json::to_string_pretty(&families)?
    };
    println!("{}", rendered);

    Ok(())
}
