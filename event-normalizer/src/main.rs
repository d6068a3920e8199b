use std::io::{self, BufRead, BufWriter, Write};

use event_normalizer::{
    config::Config,
    error::Error,
    metric_consts::BATCH_SIZE,
    EventNormalizer, NormalizedEvent,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    // stdout carries the events
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

/// Reads one JSON event per line on stdin and writes the normalized events, one per
/// line, to stdout. Unreadable lines are logged and skipped.
fn main() -> Result<(), Error> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_with_defaults()?;
    let normalizer = EventNormalizer::new(config.normalize);

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut lines = stdin.lock().lines().enumerate();
    let batch_size = config.batch_size.max(1);

    while let Some(batch) = read_batch(&mut lines, batch_size)? {
        if batch.is_empty() {
            continue;
        }
        metrics::gauge!(BATCH_SIZE).set(batch.len() as f64);

        let (line_numbers, payloads): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        for (line, result) in line_numbers.into_iter().zip(normalizer.decode_batch(&payloads)) {
            match result {
                Ok(normalized) => write_event(&mut out, normalized, &config)?,
                Err(e) => error!(line = line, "dropping unreadable event: {}", e),
            }
        }
        out.flush()?;
    }

    info!("Input exhausted, shutting down");
    Ok(())
}

/// Up to `size` input lines with their 1-based line numbers, blank lines left out.
/// `None` once the input is exhausted.
fn read_batch(
    lines: &mut impl Iterator<Item = (usize, io::Result<String>)>,
    size: usize,
) -> io::Result<Option<Vec<(usize, String)>>> {
    let mut batch = Vec::with_capacity(size);
    let mut read = 0;
    for (index, line) in lines.by_ref().take(size) {
        read += 1;
        let line = line?;
        if !line.trim().is_empty() {
            batch.push((index + 1, line));
        }
    }
    Ok((read > 0).then_some(batch))
}

fn write_event(
    out: &mut impl Write,
    normalized: NormalizedEvent,
    config: &Config,
) -> Result<(), Error> {
    let event = if config.embed_errors {
        normalized.into_event()
    } else {
        normalized.event
    };

    if config.pretty {
        serde_json::to_writer_pretty(&mut *out, &event)?;
    } else {
        serde_json::to_writer(&mut *out, &event)?;
    }
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batches_carry_input_line_numbers() {
        let input = "{\"a\": 1}\n\n{\"b\": 2}\n   \n{\"c\": 3}\n";
        let mut lines = input.as_bytes().lines().enumerate();

        let first = read_batch(&mut lines, 2).unwrap().unwrap();
        assert_eq!(first, vec![(1, "{\"a\": 1}".to_string())]);

        let second = read_batch(&mut lines, 2).unwrap().unwrap();
        assert_eq!(second, vec![(3, "{\"b\": 2}".to_string())]);

        let third = read_batch(&mut lines, 2).unwrap().unwrap();
        assert_eq!(third, vec![(5, "{\"c\": 3}".to_string())]);

        assert_eq!(read_batch(&mut lines, 2).unwrap(), None);
    }

    #[test]
    fn blank_batches_do_not_end_the_input() {
        let input = "\n\n\n{\"a\": 1}\n";
        let mut lines = input.as_bytes().lines().enumerate();

        assert_eq!(read_batch(&mut lines, 2).unwrap(), Some(vec![]));
        assert_eq!(
            read_batch(&mut lines, 2).unwrap(),
            Some(vec![(4, "{\"a\": 1}".to_string())])
        );
        assert_eq!(read_batch(&mut lines, 2).unwrap(), None);
    }
}
