use std::time::Instant;

use futures::executor::block_on;
use pool_ordering::{config::Args, prelude::*, Mode, PrettyDuration};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn main() -> Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();
    args.apply()?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let data: Vec<(u32, u64)> = (0..args.len)
        .map(|_| (rng.random_range(0..1024), rng.random()))
        .collect();
    let ordered = from_vec(data).order_by(|x| x.0).then_by_descending(|x| x.1);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let summary = block_on(async {
        Ok::<_, OrderError>(match args.mode {
            Mode::Full => {
                let sorted = ordered.to_vec(&cancel).await?;
                format!("sorted {} elements", sorted.len())
            }
            Mode::Partial => {
                let window = ordered.skip(args.skip).take(args.take).to_vec(&cancel).await?;
                format!("window of {} elements, first {:?}", window.len(), window.first())
            }
            Mode::Select => {
                let element = ordered.element_at(args.take, &cancel).await?;
                format!("element {} is {element:?}", args.take)
            }
            Mode::Streaming => {
                let first = ordered.first(&cancel).await?;
                let last = ordered.last(&cancel).await?;
                format!("first {first:?}, last {last:?}")
            }
        })
    })?;

    println!("{:?}: {summary} in {}", args.mode, PrettyDuration(start.elapsed()));
    Ok(())
}
