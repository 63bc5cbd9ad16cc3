//! Keyed list reconciliation
//!
//! Given the parts rendered for an old key sequence and a new key sequence,
//! works out which parts to update, move, create and remove so that the
//! container ends up in the new order. Runs in linear time and keeps moves
//! minimal for the common edits: prefix or suffix insert and delete, a
//! moved item, a swap.
//!
//! The algorithm walks both sequences from the head and the tail at once:
//!
//! 1. skip old slots already consumed by an earlier move;
//! 2. equal head keys: update in place;
//! 3. equal tail keys: update in place;
//! 4. old head is the new tail: update, move after everything placed so far;
//! 5. old tail is the new head: update, move before the old head;
//! 6. otherwise consult key→index maps (built once per call): drop old parts
//!    whose keys are gone, else reuse or create the part for the new head.
//!
//! Leftover new keys are created, leftover old parts removed. Duplicate keys
//! are not supported.

use std::collections::HashMap;
use std::hash::Hash;

/// Operations the reconciler asks of a container
pub trait ListOps<P> {
    type Error;

    /// Give `part` the new value at `index`
    fn update(&mut self, part: P, index: usize) -> Result<(), Self::Error>;

    /// Create a part for the new value at `index`, placed before `before`
    /// (the container end when `None`)
    fn create(&mut self, before: Option<P>, index: usize) -> Result<P, Self::Error>;

    /// Move `part` before `before` (the container end when `None`)
    fn move_before(&mut self, part: P, before: Option<P>) -> Result<(), Self::Error>;

    fn remove(&mut self, part: P) -> Result<(), Self::Error>;
}

fn same_key<K: Eq>(a: Option<&K>, b: Option<&K>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn generate_map<K: Eq + Hash>(keys: &[K], start: usize, end: usize) -> HashMap<&K, usize> {
    (start..=end)
        .filter_map(|i| keys.get(i).map(|key| (key, i)))
        .collect()
}

/// Reconcile `old_parts` (rendered for `old_keys`) against `new_keys`.
///
/// Returns the parts in new order, one per new key.
pub fn reconcile<P, K, O>(
    old_parts: &[P],
    old_keys: &[K],
    new_keys: &[K],
    ops: &mut O,
) -> Result<Vec<P>, O::Error>
where
    P: Copy,
    K: Eq + Hash,
    O: ListOps<P> + ?Sized,
{
    let mut old: Vec<Option<P>> = old_parts.iter().copied().map(Some).collect();
    let mut new: Vec<Option<P>> = vec![None; new_keys.len()];

    let mut old_head = 0isize;
    let mut old_tail = old.len() as isize - 1;
    let mut new_head = 0isize;
    let mut new_tail = new_keys.len() as isize - 1;

    let mut new_key_to_index: Option<HashMap<&K, usize>> = None;
    let mut old_key_to_index: Option<HashMap<&K, usize>> = None;

    while old_head <= old_tail && new_head <= new_tail {
        let (oh, ot) = (old_head as usize, old_tail as usize);
        let (nh, nt) = (new_head as usize, new_tail as usize);

        let (Some(head_part), Some(tail_part)) = (old[oh], old[ot]) else {
            if old[oh].is_none() {
                old_head += 1;
            } else {
                old_tail -= 1;
            }
            continue;
        };

        if same_key(old_keys.get(oh), new_keys.get(nh)) {
            ops.update(head_part, nh)?;
            new[nh] = Some(head_part);
            old_head += 1;
            new_head += 1;
        } else if same_key(old_keys.get(ot), new_keys.get(nt)) {
            ops.update(tail_part, nt)?;
            new[nt] = Some(tail_part);
            old_tail -= 1;
            new_tail -= 1;
        } else if same_key(old_keys.get(oh), new_keys.get(nt)) {
            ops.update(head_part, nt)?;
            ops.move_before(head_part, new.get(nt + 1).copied().flatten())?;
            new[nt] = Some(head_part);
            old_head += 1;
            new_tail -= 1;
        } else if same_key(old_keys.get(ot), new_keys.get(nh)) {
            ops.update(tail_part, nh)?;
            ops.move_before(tail_part, Some(head_part))?;
            new[nh] = Some(tail_part);
            old_tail -= 1;
            new_head += 1;
        } else {
            let wanted = new_key_to_index.get_or_insert_with(|| generate_map(new_keys, nh, nt));
            let kept = |key: Option<&K>| key.map_or(false, |key| wanted.contains_key(key));

            if !kept(old_keys.get(oh)) {
                ops.remove(head_part)?;
                old_head += 1;
            } else if !kept(old_keys.get(ot)) {
                ops.remove(tail_part)?;
                old_tail -= 1;
            } else {
                let reusable = old_key_to_index.get_or_insert_with(|| generate_map(old_keys, oh, ot));
                let old_index = new_keys.get(nh).and_then(|key| reusable.get(key)).copied();
                match old_index.and_then(|i| old[i].map(|part| (i, part))) {
                    Some((i, part)) => {
                        ops.update(part, nh)?;
                        ops.move_before(part, Some(head_part))?;
                        old[i] = None;
                        new[nh] = Some(part);
                    }
                    None => {
                        new[nh] = Some(ops.create(Some(head_part), nh)?);
                    }
                }
                new_head += 1;
            }
        }
    }

    let anchor = new.get((new_tail + 1) as usize).copied().flatten();
    while new_head <= new_tail {
        let nh = new_head as usize;
        new[nh] = Some(ops.create(anchor, nh)?);
        new_head += 1;
    }
    while old_head <= old_tail {
        if let Some(part) = old[old_head as usize] {
            ops.remove(part)?;
        }
        old_head += 1;
    }

    Ok(new.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Update(usize, usize),
        Create(usize),
        Move(usize),
        Remove(usize),
    }

    /// Simulated container: parts are ids, `order` is their placement
    struct Recorder {
        order: Vec<usize>,
        next: usize,
        log: Vec<Op>,
    }

    impl Recorder {
        fn new(len: usize) -> Self {
            Self {
                order: (0..len).collect(),
                next: len,
                log: Vec::new(),
            }
        }

        fn place(&mut self, part: usize, before: Option<usize>) {
            self.order.retain(|&p| p != part);
            let at = before
                .and_then(|b| self.order.iter().position(|&p| p == b))
                .unwrap_or(self.order.len());
            self.order.insert(at, part);
        }

        fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
            self.log.iter().filter(|op| pred(op)).count()
        }
    }

    impl ListOps<usize> for Recorder {
        type Error = ();

        fn update(&mut self, part: usize, index: usize) -> Result<(), ()> {
            self.log.push(Op::Update(part, index));
            Ok(())
        }

        fn create(&mut self, before: Option<usize>, _index: usize) -> Result<usize, ()> {
            let part = self.next;
            self.next += 1;
            self.place(part, before);
            self.log.push(Op::Create(part));
            Ok(part)
        }

        fn move_before(&mut self, part: usize, before: Option<usize>) -> Result<(), ()> {
            self.place(part, before);
            self.log.push(Op::Move(part));
            Ok(())
        }

        fn remove(&mut self, part: usize) -> Result<(), ()> {
            self.order.retain(|&p| p != part);
            self.log.push(Op::Remove(part));
            Ok(())
        }
    }

    /// Parts start as ids `0..old.len()`, one per old key
    fn run(old: &[i32], new: &[i32]) -> (Vec<usize>, Recorder) {
        let mut recorder = Recorder::new(old.len());
        let parts: Vec<usize> = (0..old.len()).collect();
        let result = reconcile(&parts, old, new, &mut recorder).unwrap();
        assert_eq!(result, recorder.order, "returned parts match placement");
        (result, recorder)
    }

    #[test]
    fn test_reorder_with_insert() {
        let (parts, rec) = run(&[0, 1, 2, 3, 4], &[2, 0, 3, 5, 1, 4]);
        assert_eq!(parts, vec![2, 0, 3, 5, 1, 4]);
        assert_eq!(rec.count(|op| matches!(op, Op::Create(_))), 1);
        assert_eq!(rec.count(|op| matches!(op, Op::Move(_))), 2);
        assert_eq!(rec.count(|op| matches!(op, Op::Remove(_))), 0);
        assert_eq!(rec.count(|op| matches!(op, Op::Update(..))), 5);
    }

    #[test]
    fn test_prefix_and_suffix_insert() {
        let (parts, rec) = run(&[1, 2, 3], &[0, 1, 2, 3]);
        assert_eq!(parts, vec![3, 0, 1, 2]);
        assert_eq!(rec.log.last(), Some(&Op::Create(3)));
        assert_eq!(rec.count(|op| matches!(op, Op::Move(_))), 0);

        let (parts, rec) = run(&[1, 2, 3], &[1, 2, 3, 4]);
        assert_eq!(parts, vec![0, 1, 2, 3]);
        assert_eq!(rec.count(|op| matches!(op, Op::Move(_))), 0);
    }

    #[test]
    fn test_prefix_and_suffix_delete() {
        let (parts, rec) = run(&[0, 1, 2, 3], &[2, 3]);
        assert_eq!(parts, vec![2, 3]);
        assert_eq!(rec.count(|op| matches!(op, Op::Remove(_))), 2);
        assert_eq!(rec.count(|op| matches!(op, Op::Move(_))), 0);

        let (parts, rec) = run(&[0, 1, 2, 3], &[0, 1]);
        assert_eq!(parts, vec![0, 1]);
        assert_eq!(rec.log[2..], [Op::Remove(2), Op::Remove(3)]);
    }

    #[test]
    fn test_swap() {
        let (parts, rec) = run(&[0, 1, 2, 3, 4], &[0, 3, 2, 1, 4]);
        assert_eq!(parts, vec![0, 3, 2, 1, 4]);
        assert_eq!(rec.count(|op| matches!(op, Op::Move(_))), 2);
        assert_eq!(rec.count(|op| matches!(op, Op::Create(_))), 0);
    }

    #[test]
    fn test_replace_everything() {
        let (parts, rec) = run(&[0, 1], &[7, 8, 9]);
        assert_eq!(parts, vec![2, 3, 4]);
        assert_eq!(rec.count(|op| matches!(op, Op::Remove(_))), 2);
        assert_eq!(rec.count(|op| matches!(op, Op::Create(_))), 3);
    }

    #[test]
    fn test_empty_sides() {
        let (parts, _) = run(&[], &[1, 2]);
        assert_eq!(parts, vec![0, 1]);
        let (parts, rec) = run(&[1, 2], &[]);
        assert!(parts.is_empty());
        assert_eq!(rec.order, Vec::<usize>::new());
    }
}
