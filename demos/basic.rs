use futures::{executor::block_on, StreamExt};
use pool_ordering::prelude::*;

fn main() -> Result<()> {
    // A small table of (name, score) rows.
    let rows = from_vec(vec![
        ("mira", 82),
        ("theo", 95),
        ("ada", 82),
        ("jun", 71),
        ("lee", 95),
    ]);
    let cancel = CancellationToken::new();

    // Highest score first, ties broken alphabetically.
    let ranked = rows.order_by_descending(|r| r.1).then_by(|r| r.0);

    block_on(async {
        let mut cursor = ranked.cursor(&cancel);
        while let Some(row) = cursor.next().await {
            let (name, score) = row?;
            println!("{name:>6} {score}");
        }

        println!("Top two: {:?}", ranked.take(2).to_vec(&cancel).await?);
        println!("Third place: {:?}", ranked.element_at(2, &cancel).await?);
        println!("Lowest: {:?}", ranked.last(&cancel).await?);
        Ok::<_, OrderError>(())
    })
}
