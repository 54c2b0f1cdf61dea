use anyhow::{anyhow, Result};
use indoc::indoc;
use promtext::parser::{MetricFamily, MetricType};

trait QuantileTable {
    fn quantile_table(&self) -> Result<String>;
}

impl QuantileTable for MetricFamily {
    fn quantile_table(&self) -> Result<String> {
        if self.metric_type != MetricType::Summary {
            Err(anyhow!("QuantileTable only supports Summary types"))?
        }

        let aggregate = self.metrics.first().ok_or(anyhow!("no samples?"))?;
        let quantiles = aggregate.quantiles.as_ref().ok_or(anyhow!("no quantiles?"))?;

        let mut out = format!("{}: {}\n", self.name, self.help);
        for (quantile, value) in quantiles {
            out.push_str(&format!("  q{:<5} {}\n", quantile, value));
        }
        if let (Some(count), Some(sum)) = (aggregate.count.as_ref(), aggregate.sum.as_ref()) {
            out.push_str(&format!("  count {}, sum {}\n", count, sum));
        }

        Ok(out)
    }
}

fn main() -> Result<()> {
    let prom_data = indoc! {r#"
        # HELP rpc_duration_seconds A summary of the RPC duration in seconds.
        # TYPE rpc_duration_seconds summary
        rpc_duration_seconds{quantile="0.5"} 4773
        rpc_duration_seconds{quantile="0.9"} 9001
        rpc_duration_seconds{quantile="0.99"} 76656
        rpc_duration_seconds_sum 1.7560473e+07
        rpc_duration_seconds_count 2693
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

    let summary = families.first().ok_or(anyhow!("empty exposition?"))?;

    print!("{}", summary.quantile_table()?);

    Ok(())
}
