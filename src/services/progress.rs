use serde::Serialize;

use crate::models::Task;

/// Completion counts over a set of tasks. Presentation only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub percentage: u32,
}

/// Counts tasks and completed tasks; the percentage is rounded to the nearest
/// integer with halves rounding up, and is 0 for an empty set.
pub fn aggregate<'a, I>(tasks: I) -> Progress
where
    I: IntoIterator<Item = &'a Task>,
{
    let (total, completed) = tasks.into_iter().fold((0usize, 0usize), |(total, done), task| {
        (total + 1, done + usize::from(task.completed))
    });

    let percentage = if total == 0 {
        0
    } else {
        ((200 * completed + total) / (2 * total)) as u32
    };

    Progress {
        total,
        completed,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(states: &[bool]) -> Vec<Task> {
        states
            .iter()
            .enumerate()
            .map(|(i, completed)| Task {
                id: i as i64,
                column_id: 1,
                title: format!("task {}", i),
                description: None,
                priority: Default::default(),
                due_date: None,
                completed: *completed,
                position: i as i64,
            })
            .collect()
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(
            aggregate(&Vec::<Task>::new()),
            Progress {
                total: 0,
                completed: 0,
                percentage: 0
            }
        );
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(aggregate(&tasks(&[true, false, false])).percentage, 33);
        assert_eq!(aggregate(&tasks(&[true, true, false])).percentage, 67);
        assert_eq!(aggregate(&tasks(&[true, false])).percentage, 50);
        // 1/8 = 12.5%
        let mut eighth = vec![false; 8];
        eighth[0] = true;
        assert_eq!(aggregate(&tasks(&eighth)).percentage, 13);
    }

    #[test]
    fn repeated_calls_agree() {
        let set = tasks(&[true, false, true, true]);
        let first = aggregate(&set);
        assert_eq!(first, aggregate(&set));
        assert_eq!(first.completed, 3);
        assert_eq!(first.percentage, 75);
    }
}
