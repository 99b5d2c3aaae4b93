use futures::{
    StreamExt,
    stream::{self, TryStreamExt},
};
use kslack_core::{Config, Reorderable, TokioClock, reorder};
use std::time::Duration;

// Define your event type
#[derive(Debug, Clone)]
struct Reading {
    time: i64,
    celsius: f64,
}

impl Reorderable for Reading {
    fn timestamp(&self) -> i64 {
        self.time
    }

    fn correlation(&self) -> f64 {
        self.celsius
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Sensor readings as they arrive over a lossy link, with the
    // arrival delay before each one.
    let arrivals = [
        (0, 1000),
        (20, 1200),
        (20, 1100),
        (20, 1400),
        (20, 1050),
        (20, 1300),
        (20, 1600),
    ];

    let input = stream::iter(arrivals)
        .then(|(delay, time)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            eyre::Ok(Reading {
                time,
                celsius: 21.5,
            })
        })
        .boxed();

    // Run the reordering algorithm
    let config = Config::with_batch_size(100).with_max_k(500).with_timeout(2000);
    let output = reorder(input, config, TokioClock::starting_at(1000))?;

    // Print the events in timestamp order
    output
        .try_for_each(|reading| async move {
            println!("{} {:.1}", reading.time, reading.celsius);
            Ok(())
        })
        .await?;

    Ok(())
}
