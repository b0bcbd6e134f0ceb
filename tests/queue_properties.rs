//! Property tests for the task queue

mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use rezerwacje::queue::TaskQueue;

use common::{create_test_city, create_test_task};

fn slot(index: u8) -> String {
    format!("{:02}:{:02}", 8 + index / 4, (index % 4) * 15)
}

/// Queue contents predicted from the push sequence, oldest first
fn expected_order(pushes: &[u8], capacity: usize) -> Vec<String> {
    let mut model: Vec<String> = Vec::new();
    for &index in pushes {
        let slot = slot(index);
        if let Some(pos) = model.iter().position(|s| *s == slot) {
            model.remove(pos);
        } else if model.len() == capacity {
            model.remove(0);
        }
        model.push(slot);
    }
    model
}

proptest! {
    #[test]
    fn prop_never_exceeds_capacity(pushes in prop::collection::vec(0u8..24, 0..64), capacity in 1usize..8) {
        let entity = create_test_city("WRO", "10");
        let queue = TaskQueue::with_capacity(capacity);

        for index in pushes {
            queue.push(create_test_task(&entity, "2024-05-22", &slot(index)));
            prop_assert!(queue.len() <= capacity);
        }
    }

    #[test]
    fn prop_pops_freshest_first(pushes in prop::collection::vec(0u8..24, 0..64), capacity in 1usize..8) {
        let entity = create_test_city("WRO", "10");
        let queue = TaskQueue::with_capacity(capacity);

        for &index in &pushes {
            queue.push(create_test_task(&entity, "2024-05-22", &slot(index)));
        }

        let mut expected = expected_order(&pushes, capacity);
        expected.reverse();

        let mut popped = Vec::new();
        while let Some(task) = queue.pop() {
            popped.push(task.slot);
        }
        prop_assert_eq!(popped, expected);
    }

    #[test]
    fn prop_no_duplicates_unbounded(pushes in prop::collection::vec(0u8..24, 0..64)) {
        let entity = create_test_city("WRO", "10");
        let queue = TaskQueue::new();

        for &index in &pushes {
            queue.push(create_test_task(&entity, "2024-05-22", &slot(index)));
        }

        let distinct: HashSet<u8> = pushes.iter().copied().collect();
        prop_assert_eq!(queue.len(), distinct.len());

        let mut seen = HashSet::new();
        while let Some(task) = queue.pop() {
            prop_assert!(seen.insert(task.slot));
        }
        prop_assert!(queue.is_empty());
    }
}

#[test]
fn test_capacity_two_keeps_two_latest_dates() {
    let entity = create_test_city("WRO", "10");
    let queue = TaskQueue::with_capacity(2);

    for date in ["2024-05-20", "2024-05-21", "2024-05-22"] {
        queue.push(create_test_task(&entity, date, "09:00"));
    }

    let dates: Vec<String> = std::iter::from_fn(|| queue.pop())
        .map(|task| task.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2024-05-22", "2024-05-21"]);
}
