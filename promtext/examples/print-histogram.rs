use anyhow::{anyhow, Result};
use indoc::indoc;
use promtext::parser::MetricType;

const SHADES: &[&'static str] = &[
    "\u{2591}", "\u{2592}", "\u{2593}",
    "\u{25A3}", "\u{25A9}", "\u{25A4}"
];

fn main() -> Result<()> {
    let prom_data = indoc! {r#"
        # HELP req_latency Request latency distribution.
        # TYPE req_latency histogram
        req_latency_bucket{le="0.5"} 5
        req_latency_bucket{le="1.0"} 7
        req_latency_bucket{le="+Inf"} 15
        req_latency_sum 2
        req_latency_count 15
    "#};

    let mut args = std::env::args();

    let progname = args.next().ok_or(anyhow!("ARGV[0] was not set??"))?;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" => {
                println!("Usage: {} [--print-exposition]", progname);
                return Ok(());
            }
            "--print-exposition" => {
                println!("Exposition:\n\n{}", prom_data);
            }
            arg => return Err(anyhow!("Unknown argument: {}", arg)),
        }
    }

    let families = promtext::parse(prom_data)?;

    let histogram = families.first().ok_or(anyhow!("empty exposition?"))?;

    assert_eq!(MetricType::Histogram, histogram.metric_type);

    let aggregate = histogram.metrics.first().ok_or(anyhow!("no samples?"))?;
    let buckets = aggregate.buckets.as_ref().ok_or(anyhow!("no buckets?"))?;

    let sample_count: usize = aggregate
        .count
        .as_ref()
        .ok_or(anyhow!("no count?"))?
        .parse()?;

    // sort thresholds numerically, the map keys are raw label strings
    let mut thresholds: Vec<(f64, usize)> = buckets
        .iter()
        .map(|(le, count)| {
            let le = match le.as_str() {
                "+Inf" => f64::INFINITY,
                le => le.parse()?,
            };
            Ok((le, count.parse()?))
        })
        .collect::<Result<_>>()?;
    thresholds.sort_by(|a, b| a.0.total_cmp(&b.0));

    let factor = match sample_count {
        sample_count if sample_count < 25 => 2,
        _ => 1,
    };

    print!("Distribution of «{}»: ", histogram.name);
    thresholds.iter().zip(SHADES).fold(0, |acc, (&(_, count), shade)| {
        print!("{}", shade.repeat((count - acc) * factor));
        count
    });
    print!("\t");

    println!(
        "[ {} ]",
        thresholds
            .iter()
            .zip(SHADES.iter().cycle())
            .map(|((le, _), shade)| format!("{} ≤ {}", shade, le))
            .collect::<Vec<_>>()
            .join("  ")
    );

    Ok(())
}
