use futures::executor::block_on;
use pool_ordering::prelude::*;
use proptest::prelude::*;

type Row = (u8, u8, u8, u16);

/// Rows with few distinct keys so ties are common at every level; the last field records
/// arrival order.
fn rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((0u8..6, 0u8..3, 0u8..3), 0..64).prop_map(|v| {
        v.into_iter()
            .enumerate()
            .map(|(i, (a, b, c))| (a, b, c, i as u16))
            .collect()
    })
}

fn reference(rows: &[Row]) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    // `sort_by` is stable.
    sorted.sort_by(|x, y| x.0.cmp(&y.0).then(y.1.cmp(&x.1)).then(x.2.cmp(&y.2)));
    sorted
}

fn ordered(rows: &[Row]) -> pool_ordering::OrderedSequence<Row> {
    from_slice(rows)
        .order_by(|r| r.0)
        .then_by_descending(|r| r.1)
        .then_by(|r| r.2)
}

proptest! {
    #[test]
    fn full_sort_matches_stable_reference(rows in rows()) {
        let cancel = CancellationToken::new();
        let sorted = block_on(ordered(&rows).to_vec(&cancel)).unwrap();
        prop_assert_eq!(sorted, reference(&rows));
    }

    #[test]
    fn ties_keep_arrival_order(rows in rows()) {
        let cancel = CancellationToken::new();
        let sorted = block_on(from_slice(&rows).order_by(|r| r.0).to_vec(&cancel)).unwrap();
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                prop_assert!(pair[0].3 < pair[1].3);
            }
        }
    }

    #[test]
    fn each_then_by_refines_its_parent(rows in rows()) {
        let cancel = CancellationToken::new();
        let one = from_slice(&rows).order_by(|r| r.0);
        let two = one.then_by_descending(|r| r.1);
        let three = two.then_by(|r| r.2);
        prop_assert_eq!(three.key_spec().depth(), 3);

        // Dropping the deepest level must only reorder rows that tie on every remaining level.
        let coarse = block_on(two.to_vec(&cancel)).unwrap();
        let fine = block_on(three.to_vec(&cancel)).unwrap();
        let key = |r: &Row| (r.0, r.1);
        prop_assert_eq!(
            coarse.iter().map(key).collect::<Vec<_>>(),
            fine.iter().map(key).collect::<Vec<_>>()
        );
        let first = block_on(one.to_vec(&cancel)).unwrap();
        prop_assert_eq!(
            first.iter().map(|r| r.0).collect::<Vec<_>>(),
            fine.iter().map(|r| r.0).collect::<Vec<_>>()
        );
    }

    #[test]
    fn take_and_skip_match_reference(rows in rows(), n in 0usize..70) {
        let cancel = CancellationToken::new();
        let expected = reference(&rows);
        let split = n.min(expected.len());

        let taken = block_on(ordered(&rows).take(n).to_vec(&cancel)).unwrap();
        prop_assert_eq!(&taken[..], &expected[..split]);

        let skipped = block_on(ordered(&rows).skip(n).to_vec(&cancel)).unwrap();
        prop_assert_eq!(&skipped[..], &expected[split..]);
    }

    #[test]
    fn windows_match_reference(rows in rows(), skip in 0usize..70, take in 0usize..70) {
        let cancel = CancellationToken::new();
        let expected = reference(&rows);
        let lo = skip.min(expected.len());
        let hi = skip.saturating_add(take).min(expected.len());
        let view = ordered(&rows).skip(skip).take(take);

        prop_assert_eq!(&block_on(view.to_vec(&cancel)).unwrap()[..], &expected[lo..hi]);
        prop_assert_eq!(block_on(view.count(true, &cancel)).unwrap(), Some(hi - lo));
        prop_assert_eq!(block_on(view.first(&cancel)).unwrap(), expected[lo..hi].first().copied());
        prop_assert_eq!(block_on(view.last(&cancel)).unwrap(), expected[lo..hi].last().copied());
    }

    #[test]
    fn element_at_matches_reference(rows in rows(), i in 0usize..70) {
        let cancel = CancellationToken::new();
        let expected = reference(&rows);
        let selected = block_on(ordered(&rows).element_at(i, &cancel)).unwrap();
        prop_assert_eq!(selected, expected.get(i).copied());
    }

    #[test]
    fn first_and_last_match_reference(rows in rows()) {
        let cancel = CancellationToken::new();
        let expected = reference(&rows);
        let seq = ordered(&rows);
        prop_assert_eq!(block_on(seq.first(&cancel)).unwrap(), expected.first().copied());
        prop_assert_eq!(block_on(seq.last(&cancel)).unwrap(), expected.last().copied());
    }
}
